//! Port-specific error types.
//!
//! Defines error types for backend operations, separate from session-level
//! errors. Each variant can be reduced to the raw [`Status`] the session
//! records as its last status.

use crate::status::Status;
use thiserror::Error;

/// Errors reported by a port backend.
#[derive(Debug, Error)]
pub enum PortError {
    /// The specified serial port was not found on the system.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// An I/O error occurred during port operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A parameter could not be applied to the port.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The backend does not support the requested setting.
    #[error("Unsupported setting: {0}")]
    Unsupported(String),

    /// Operation timed out.
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The handle was acquired without the access this operation needs.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// The write budget expired before every byte went out.
    #[error("Short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    /// A raw status reported by the backend without further detail.
    #[error("Backend reported status {0}")]
    Status(Status),

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a NotFound error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Create a Config error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an Unsupported error from a message.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    /// Create a Timeout error from a duration.
    pub fn timeout(duration: std::time::Duration) -> Self {
        Self::Timeout(duration)
    }

    /// Whether this error only means the timeout budget ran out.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::TimedOut,
            Self::Serial(e) => matches!(
                e.kind(),
                serialport::ErrorKind::Io(std::io::ErrorKind::TimedOut)
            ),
            Self::Status(status) => *status == Status::SEM_TIMEOUT,
            _ => false,
        }
    }

    /// The status code this error leaves behind.
    pub fn status(&self) -> Status {
        match self {
            Self::NotFound(_) => Status::FILE_NOT_FOUND,
            Self::Io(e) => Status::from_io(e),
            Self::Config(_) => Status::INVALID_PARAMETER,
            Self::Unsupported(_) => Status::NOT_SUPPORTED,
            Self::Timeout(_) | Self::ShortWrite { .. } => Status::SEM_TIMEOUT,
            Self::AccessDenied(_) => Status::ACCESS_DENIED,
            Self::Status(status) => *status,
            Self::Serial(e) => match e.kind() {
                serialport::ErrorKind::NoDevice => Status::FILE_NOT_FOUND,
                serialport::ErrorKind::InvalidInput => Status::INVALID_PARAMETER,
                serialport::ErrorKind::Io(kind) => Status::from_io(&std::io::Error::from(kind)),
                _ => Status::GEN_FAILURE,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PortError::not_found("/dev/ttyUSB0");
        assert_eq!(err.to_string(), "Serial port not found: /dev/ttyUSB0");

        let err = PortError::config("Invalid baud rate");
        assert_eq!(err.to_string(), "Configuration error: Invalid baud rate");

        let err = PortError::ShortWrite { written: 3, expected: 6 };
        assert_eq!(err.to_string(), "Short write: 3 of 6 bytes");
    }

    #[test]
    fn test_timeout_error() {
        let duration = std::time::Duration::from_millis(500);
        let err = PortError::timeout(duration);
        assert!(err.to_string().contains("500ms"));
        assert!(err.is_timeout());
        assert_eq!(err.status(), Status::SEM_TIMEOUT);
    }

    #[test]
    fn test_io_timeout_is_timeout() {
        let err = PortError::Io(std::io::Error::new(std::io::ErrorKind::TimedOut, "late"));
        assert!(err.is_timeout());

        let err = PortError::Io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"));
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(PortError::not_found("COM9").status(), Status::FILE_NOT_FOUND);
        assert_eq!(PortError::config("x").status(), Status::INVALID_PARAMETER);
        assert_eq!(PortError::unsupported("mark parity").status(), Status::NOT_SUPPORTED);
        assert_eq!(PortError::Status(Status(1167)).status(), Status(1167));

        let serial = serialport::Error::new(serialport::ErrorKind::NoDevice, "unplugged");
        assert_eq!(PortError::Serial(serial).status(), Status::FILE_NOT_FOUND);
    }
}
