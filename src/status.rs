//! Raw backend status codes.
//!
//! Every backend operation leaves a status behind, whether it succeeded or
//! not. The session keeps the most recent one for diagnostics even though
//! failures are also reported as typed errors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A numeric status code reported by the port backend.
///
/// Zero means success. Non-zero values are either raw OS error codes or one
/// of the well-known codes below, which follow the Win32 numbering so that
/// values look the same regardless of which backend produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Status(pub u32);

impl Status {
    pub const SUCCESS: Status = Status(0);
    pub const FILE_NOT_FOUND: Status = Status(2);
    pub const ACCESS_DENIED: Status = Status(5);
    pub const INVALID_HANDLE: Status = Status(6);
    pub const GEN_FAILURE: Status = Status(31);
    pub const NOT_SUPPORTED: Status = Status(50);
    pub const INVALID_PARAMETER: Status = Status(87);
    pub const SEM_TIMEOUT: Status = Status(121);

    /// Raw numeric value.
    pub fn code(self) -> u32 {
        self.0
    }

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    /// Build a status from an `std::io::Error`, preferring the OS code.
    pub fn from_io(err: &std::io::Error) -> Self {
        if let Some(raw) = err.raw_os_error() {
            return Status(raw as u32);
        }
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::FILE_NOT_FOUND,
            std::io::ErrorKind::PermissionDenied => Self::ACCESS_DENIED,
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => Self::SEM_TIMEOUT,
            std::io::ErrorKind::InvalidInput => Self::INVALID_PARAMETER,
            std::io::ErrorKind::Unsupported => Self::NOT_SUPPORTED,
            _ => Self::GEN_FAILURE,
        }
    }
}

impl From<u32> for Status {
    fn from(code: u32) -> Self {
        Status(code)
    }
}

/// Formats as `"<decimal> | 0x<hex>"`, e.g. `"5 | 0x00000005"`.
impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | 0x{:08x}", self.0, self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(Status::SUCCESS.to_string(), "0 | 0x00000000");
        assert_eq!(Status::ACCESS_DENIED.to_string(), "5 | 0x00000005");
        assert_eq!(Status(0xdead_beef).to_string(), "3735928559 | 0xdeadbeef");
    }

    #[test]
    fn test_status_from_io_kind() {
        let err = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow");
        assert_eq!(Status::from_io(&err), Status::SEM_TIMEOUT);

        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(Status::from_io(&err), Status::FILE_NOT_FOUND);
    }

    #[test]
    fn test_status_from_raw_os_error() {
        let err = std::io::Error::from_raw_os_error(13);
        assert_eq!(Status::from_io(&err), Status(13));
        assert!(!Status::from_io(&err).is_success());
    }
}
