//! Shared test utilities for rs232 session tests.
//!
//! This module provides common test infrastructure including:
//! - Mock backends with pre-programmed replies
//! - Session constructors with and without echo
//! - Assertions on framed output

#![allow(dead_code)]

use rs232_session::{MockBackend, Session, SessionOptions};

/// Address used by every mock session.
pub const MOCK_PORT: &str = "MOCK0";

/// Create a mock backend with pre-programmed replies, queued back to back.
///
/// # Example
/// ```ignore
/// let backend = create_backend_with_replies(vec![b"OK\r\n", b"READY\r\n"]);
/// ```
pub fn create_backend_with_replies(replies: Vec<&[u8]>) -> MockBackend {
    let backend = MockBackend::new();
    for reply in replies {
        backend.enqueue_read(reply);
    }
    backend
}

/// Open a session on `backend` with default options.
pub fn open_session(backend: &MockBackend) -> Session {
    open_session_with(backend, &SessionOptions::default())
}

/// Open a session on `backend` with the given options.
pub fn open_session_with(backend: &MockBackend, options: &SessionOptions) -> Session {
    Session::open_with(backend.clone(), MOCK_PORT, options).expect("mock session should open")
}

/// Open a session whose writes come straight back as reads.
pub fn echo_session() -> (MockBackend, Session) {
    let backend = MockBackend::echo();
    let session = open_session(&backend);
    (backend, session)
}

/// Assert that the last write carried exactly `expected`.
pub fn assert_last_write(backend: &MockBackend, expected: &[u8]) {
    let log = backend.write_log();
    let last = log.last().expect("nothing was written");
    assert_eq!(
        last.as_slice(),
        expected,
        "last write was {:?}",
        String::from_utf8_lossy(last)
    );
}
