//! RS-232 Session Library
//!
//! A blocking, line-oriented session over a serial port: open a port with
//! line parameters and timeouts, write delimiter-framed text, read whatever
//! arrives within the timeout window, and release the port when done.
//!
//! # Modules
//!
//! - `config`: Configuration management with TOML support
//! - `error`: Session error handling
//! - `port`: Port backend abstraction (native `serialport` and an in-memory mock)
//! - `session`: The serial session, its options and framing rules
//! - `status`: Numeric OS status codes as reported by the last port call
//!
//! # Example
//!
//! ```
//! use rs232_session::{MockBackend, Session, SessionOptions};
//!
//! let backend = MockBackend::echo();
//! let mut session = Session::open_with(backend, "COM1", &SessionOptions::default())?;
//!
//! session.write("PING")?;
//! assert_eq!(session.read()?, b"PING\r\n");
//! # Ok::<(), rs232_session::SessionError>(())
//! ```

pub mod config;
pub mod error;
pub mod port;
pub mod session;
pub mod status;

// Re-export commonly used types for convenience
pub use config::{Config, ConfigError, ConfigLoader};
pub use error::{ConfigStep, Operation, SessionError, SessionResult};
pub use port::{
    AccessMode, AcquireOptions, DataBits, Disposition, FlowControl, LineSettings, LineState,
    MockBackend, MockOperation, Parity, PortBackend, PortError, PortHandle, SerialPortBackend,
    ShareMode, StopBits, Timeouts,
};
pub use session::{trim_delimiter, Session, SessionConfig, SessionOptions};
pub use status::Status;
