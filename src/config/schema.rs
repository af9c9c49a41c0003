//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! All configuration sections are defined here with appropriate defaults.

use crate::session::SessionOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which port to use and how to report on it
    pub serial: SerialConfig,
    /// Line parameters, timeouts and delimiter for new sessions
    pub session: SessionOptions,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Serial port selection section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Port used when none is given on the command line
    pub port: Option<String>,
    /// Emit byte counts for every read and write
    pub report: bool,
    /// Port aliases for convenience
    pub port_aliases: HashMap<String, String>,
}

impl SerialConfig {
    /// Resolve a port name through aliases
    pub fn resolve_port(&self, name: &str) -> String {
        self.port_aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset, e.g. "info" or "rs232_session=debug"
    pub level: String,
    /// Log format: "pretty", "compact" or "full"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line format with colors
    Pretty,
    /// Single-line format without span context
    #[default]
    Compact,
    /// Single-line format with span context
    Full,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::Parity;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.serial.port, None);
        assert!(!config.serial.report);
        assert_eq!(config.session, SessionOptions::default());
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn test_port_alias_resolution() {
        let mut config = SerialConfig::default();
        config
            .port_aliases
            .insert("arduino".to_string(), "COM3".to_string());

        assert_eq!(config.resolve_port("arduino"), "COM3");
        assert_eq!(config.resolve_port("COM5"), "COM5");
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.session.baud_rate = Some(19200);
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[serial]"));
        assert!(toml_str.contains("[session]"));
        assert!(toml_str.contains("baud_rate = 19200"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [serial]
            port = "/dev/ttyUSB0"

            [session]
            baud_rate = 4800
            parity = "even"
            delimiter = "\n"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.serial.port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(config.session.baud_rate, Some(4800));
        assert_eq!(config.session.parity, Some(Parity::Even));
        assert_eq!(config.session.delimiter.as_deref(), Some("\n"));
        // Defaults should still work
        assert_eq!(config.session.read_interval_timeout, None);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_unknown_session_key_rejected() {
        let toml_str = r#"
            [session]
            baudrate = 4800
        "#;
        assert!(toml::from_str::<Config>(toml_str).is_err());
    }
}
