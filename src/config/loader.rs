//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::{Config, LogFormat};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "RS232";

/// Config file name
const CONFIG_FILE_NAME: &str = "rs232.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "RS232_CONFIG";

/// Application name used for the platform config directory
const APP_NAME: &str = "rs232";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `RS232_CONFIG` environment variable (explicit path)
    /// 2. `./rs232.toml` (current directory)
    /// 3. `rs232.toml` in the platform config directory
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables can override any config file values.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = if let Some(ref path) = config_path {
            load_from_file(path)?
        } else {
            Config::default()
        };

        apply_env_overrides(&mut config)?;
        validate(&config)?;

        Ok(Self { config_path, config })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        validate(&config)?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    pub fn with_defaults() -> Self {
        let mut config = Config::default();
        // Still apply env overrides even with defaults; a bad override leaves defaults in place.
        if apply_env_overrides(&mut config).is_err() || validate(&config).is_err() {
            config = Config::default();
        }

        Self {
            config_path: None,
            config,
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get a mutable reference to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Save the current configuration to file.
    pub fn save(&self) -> ConfigResult<()> {
        let path = self
            .config_path
            .as_ref()
            .ok_or_else(|| ConfigError::MissingRequired("No config file path set".to_string()))?;

        save_to_file(&self.config, path)
    }

    /// Save the current configuration to a specific file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        save_to_file(&self.config, path.as_ref())
    }

    /// Reload configuration from file (if path is set).
    pub fn reload(&mut self) -> ConfigResult<()> {
        if let Some(ref path) = self.config_path {
            let mut config = load_from_file(path)?;
            apply_env_overrides(&mut config)?;
            validate(&config)?;
            self.config = config;
        }
        Ok(())
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    // 1. Explicit environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Current directory
    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. Platform config directory
    if let Some(app_config) = get_default_config_path() {
        if app_config.exists() {
            return Some(app_config);
        }
    }

    // 4. No config file found - will use defaults
    None
}

/// Get the default config directory for creating new config files.
pub fn get_default_config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the default config file path for creating new config files.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_default_config_dir().map(|d| d.join(CONFIG_FILE_NAME))
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(toml::from_str(&content)?)
}

/// Save configuration to a file.
fn save_to_file(config: &Config, path: &Path) -> ConfigResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Check that the session options resolve.
fn validate(config: &Config) -> ConfigResult<()> {
    config.session.resolve()?;
    Ok(())
}

/// Read and parse one override variable, if set.
fn env_value<T: FromStr>(key: &str, what: &str) -> ConfigResult<Option<T>> {
    let var = format!("{}_{}", ENV_PREFIX, key);
    match std::env::var(&var) {
        Ok(val) => val
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::env_parse(var, format!("Invalid {what}"))),
        Err(_) => Ok(None),
    }
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `RS232_<SECTION>_<KEY>`
/// For example:
/// - `RS232_SERIAL_PORT=/dev/ttyUSB0`
/// - `RS232_SESSION_BAUD_RATE=115200`
/// - `RS232_SESSION_DELIMITER=\n` (backslash escapes are expanded)
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    // Serial overrides
    if let Ok(val) = std::env::var(format!("{}_SERIAL_PORT", ENV_PREFIX)) {
        config.serial.port = Some(val);
    }
    if let Ok(val) = std::env::var(format!("{}_SERIAL_REPORT", ENV_PREFIX)) {
        config.serial.report = val.to_lowercase() == "true" || val == "1";
    }

    // Session overrides
    if let Some(baud) = env_value("SESSION_BAUD_RATE", "baud rate")? {
        config.session.baud_rate = Some(baud);
    }
    if let Some(size) = env_value("SESSION_BYTE_SIZE", "byte size")? {
        config.session.byte_size = Some(size);
    }
    if let Some(parity) = env_value("SESSION_PARITY", "parity")? {
        config.session.parity = Some(parity);
    }
    if let Some(stop_bits) = env_value("SESSION_STOP_BITS", "stop bits")? {
        config.session.stop_bits = Some(stop_bits);
    }
    if let Some(ms) = env_value("SESSION_READ_INTERVAL_TIMEOUT", "timeout")? {
        config.session.read_interval_timeout = Some(ms);
    }
    if let Some(ms) = env_value("SESSION_READ_TOTAL_TIMEOUT_MULTIPLIER", "timeout")? {
        config.session.read_total_timeout_multiplier = Some(ms);
    }
    if let Some(ms) = env_value("SESSION_READ_TOTAL_TIMEOUT_CONSTANT", "timeout")? {
        config.session.read_total_timeout_constant = Some(ms);
    }
    if let Some(ms) = env_value("SESSION_WRITE_TOTAL_TIMEOUT_MULTIPLIER", "timeout")? {
        config.session.write_total_timeout_multiplier = Some(ms);
    }
    if let Some(ms) = env_value("SESSION_WRITE_TOTAL_TIMEOUT_CONSTANT", "timeout")? {
        config.session.write_total_timeout_constant = Some(ms);
    }
    if let Ok(val) = std::env::var(format!("{}_SESSION_DELIMITER", ENV_PREFIX)) {
        config.session.delimiter = Some(unescape(&val));
    }

    // Logging overrides
    if let Ok(val) = std::env::var(format!("{}_LOGGING_LEVEL", ENV_PREFIX)) {
        config.logging.level = val;
    }
    if let Ok(val) = std::env::var(format!("{}_LOGGING_FORMAT", ENV_PREFIX)) {
        config.logging.format = match val.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            "compact" => LogFormat::Compact,
            "full" => LogFormat::Full,
            _ => {
                return Err(ConfigError::env_parse(
                    format!("{}_LOGGING_FORMAT", ENV_PREFIX),
                    "Expected pretty, compact or full",
                ))
            }
        };
    }

    Ok(())
}

/// Expand `\r`, `\n`, `\t`, `\0` and `\\` in a delimiter typed on a command line.
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
