use crate::port::PortError;
use crate::status::Status;
use std::fmt;
use thiserror::Error;

/// A specialized `Result` type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// The configuration step that failed while opening a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigStep {
    /// Validating the caller's options before touching the port.
    Options,
    GetLineState,
    SetLineState,
    SetTimeouts,
}

impl fmt::Display for ConfigStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Options => "options",
            Self::GetLineState => "get line state",
            Self::SetLineState => "set line state",
            Self::SetTimeouts => "set timeouts",
        };
        f.write_str(name)
    }
}

/// Session operations, as named in usage errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Write,
    Read,
    Query,
    Close,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Write => "write",
            Self::Read => "read",
            Self::Query => "query",
            Self::Close => "close",
        };
        f.write_str(name)
    }
}

/// Errors returned by [`Session`](crate::Session) operations.
///
/// Every variant that came from the backend keeps the backend error as its
/// source, and [`SessionError::status`] recovers the raw status code.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The port could not be acquired.
    #[error("Failed to open serial port {address}: {source}")]
    Open {
        address: String,
        #[source]
        source: PortError,
    },

    /// The port was acquired but its line state or timeouts could not be applied.
    #[error("Failed to configure serial port ({step}): {source}")]
    Configuration {
        step: ConfigStep,
        #[source]
        source: PortError,
    },

    #[error("Write failed: {0}")]
    Write(#[source] PortError),

    #[error("Read failed: {0}")]
    Read(#[source] PortError),

    #[error("Close failed: {0}")]
    Close(#[source] PortError),

    /// The session was already closed.
    #[error("Cannot {operation}: the session is closed")]
    Usage { operation: Operation },
}

impl SessionError {
    /// Create an option validation error.
    pub fn invalid_option(message: impl Into<String>) -> Self {
        Self::Configuration {
            step: ConfigStep::Options,
            source: PortError::config(message),
        }
    }

    /// The status code behind this error.
    pub fn status(&self) -> Status {
        match self {
            Self::Open { source, .. } | Self::Configuration { source, .. } => source.status(),
            Self::Write(source) | Self::Read(source) | Self::Close(source) => source.status(),
            Self::Usage { .. } => Status::INVALID_HANDLE,
        }
    }

    /// Whether the error is a usage error rather than a backend failure.
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage { .. })
    }
}
