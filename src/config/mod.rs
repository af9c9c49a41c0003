//! Configuration module for rs232.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `RS232_CONFIG` environment variable (explicit path)
//! 2. `./rs232.toml` (current directory)
//! 3. `rs232.toml` in the platform config directory
//!    (`~/.config/rs232/` on Linux, `%APPDATA%\rs232\config\` on Windows)
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! Configuration values can be overridden via environment variables.
//! The pattern is: `RS232_<SECTION>_<KEY>`
//!
//! Examples:
//! - `RS232_SERIAL_PORT=COM3`
//! - `RS232_SESSION_BAUD_RATE=115200`
//! - `RS232_LOGGING_LEVEL=rs232_session=debug`
//!
//! # Example
//!
//! ```toml
//! [serial]
//! port = "/dev/ttyUSB0"
//! report = true
//!
//! [session]
//! baud_rate = 115200
//! parity = "none"
//! stop_bits = "one"
//! read_total_timeout_constant = 500
//! delimiter = "\n"
//!
//! [logging]
//! level = "info"
//! format = "compact"
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, unescape, ConfigLoader,
};
pub use schema::{Config, LogFormat, LoggingConfig, SerialConfig};
