//! Mock port backend for testing.
//!
//! Provides a `MockBackend` that simulates a serial device without requiring
//! actual hardware. Handles it hands out share their state with the backend,
//! so a test can keep the backend and inspect everything a session did.

use super::error::PortError;
use super::traits::{AcquireOptions, LineState, PortBackend, PortHandle, Timeouts};
use crate::status::Status;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Backend operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOperation {
    Acquire,
    GetLineState,
    SetLineState,
    SetTimeouts,
    Write,
    Read,
    Release,
}

/// Inner state of the mock, shared by the backend and its handles.
#[derive(Debug, Default)]
struct MockPortState {
    /// Bytes to be returned by read operations.
    read_queue: VecDeque<u8>,
    /// Every buffer passed to a write, in order.
    write_log: Vec<Vec<u8>>,
    /// Buffer lengths offered to each read.
    read_requests: Vec<usize>,
    /// Loop written bytes back into the read queue.
    echo: bool,
    /// Accept at most this many bytes per write.
    write_limit: Option<usize>,
    /// One-shot failures, consumed in order per operation.
    failures: Vec<(MockOperation, Status)>,
    /// Ports that do not exist.
    missing: Vec<String>,
    line_state: LineState,
    line_state_writes: usize,
    timeouts: Option<Timeouts>,
    acquired: Vec<(String, AcquireOptions)>,
    releases: usize,
    last_status: Status,
}

impl MockPortState {
    /// Consume a pending failure for `op`, recording the resulting status.
    fn check(&mut self, op: MockOperation) -> Result<(), PortError> {
        if let Some(pos) = self.failures.iter().position(|(o, _)| *o == op) {
            let (_, status) = self.failures.remove(pos);
            self.last_status = status;
            return Err(PortError::Status(status));
        }
        self.last_status = Status::SUCCESS;
        Ok(())
    }
}

/// Mock port backend for testing.
///
/// This implementation allows you to:
/// - Enqueue data to be returned by read operations
/// - Echo writes back as if a loopback plug were fitted
/// - Inspect what was written and how the port was configured
/// - Inject a failure status into any single backend operation
///
/// # Example
/// ```
/// use rs232_session::port::{AcquireOptions, MockBackend, PortBackend, PortHandle};
///
/// let mut backend = MockBackend::new();
/// backend.enqueue_read(b"Hello, World!");
///
/// let mut port = backend.acquire("MOCK0", &AcquireOptions::default()).unwrap();
/// let mut buffer = [0u8; 13];
/// let n = port.read_bytes(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"Hello, World!");
///
/// port.write_bytes(b"Response").unwrap();
/// assert_eq!(backend.write_log(), vec![b"Response".to_vec()]);
/// ```
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockPortState>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that loops every write back into the read queue.
    pub fn echo() -> Self {
        let backend = Self::new();
        backend.set_echo(true);
        backend
    }

    /// Enqueue bytes to be returned by subsequent reads.
    pub fn enqueue_read(&self, data: &[u8]) {
        self.state.lock().read_queue.extend(data);
    }

    pub fn set_echo(&self, echo: bool) {
        self.state.lock().echo = echo;
    }

    /// Accept at most `limit` bytes per write, simulating an expired write budget.
    pub fn set_write_limit(&self, limit: Option<usize>) {
        self.state.lock().write_limit = limit;
    }

    /// Make the next `op` fail with `status`.
    pub fn fail_next(&self, op: MockOperation, status: Status) {
        self.state.lock().failures.push((op, status));
    }

    /// Make acquiring `address` fail as if the device were absent.
    pub fn set_missing(&self, address: impl Into<String>) {
        self.state.lock().missing.push(address.into());
    }

    /// Line state the port reports before anyone configures it.
    pub fn set_line_state(&self, state: LineState) {
        self.state.lock().line_state = state;
    }

    pub fn line_state(&self) -> LineState {
        self.state.lock().line_state
    }

    /// How many times the line state was written.
    pub fn line_state_writes(&self) -> usize {
        self.state.lock().line_state_writes
    }

    /// The last timeout block applied, if any.
    pub fn timeouts(&self) -> Option<Timeouts> {
        self.state.lock().timeouts
    }

    /// Get a copy of all data written to the port.
    pub fn write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// Buffer lengths offered to each read call.
    pub fn read_requests(&self) -> Vec<usize> {
        self.state.lock().read_requests.clone()
    }

    /// Addresses and options of every successful acquire.
    pub fn acquisitions(&self) -> Vec<(String, AcquireOptions)> {
        self.state.lock().acquired.clone()
    }

    /// Number of handles released.
    pub fn releases(&self) -> usize {
        self.state.lock().releases
    }

    /// Get the number of bytes available to read.
    pub fn available_bytes(&self) -> usize {
        self.state.lock().read_queue.len()
    }
}

impl PortBackend for MockBackend {
    type Handle = MockHandle;

    fn acquire(
        &mut self,
        address: &str,
        options: &AcquireOptions,
    ) -> Result<Self::Handle, PortError> {
        let mut state = self.state.lock();
        state.check(MockOperation::Acquire)?;
        if state.missing.iter().any(|m| m == address) {
            state.last_status = Status::FILE_NOT_FOUND;
            return Err(PortError::not_found(address));
        }
        state.acquired.push((address.to_string(), *options));

        Ok(MockHandle {
            name: address.to_string(),
            released: false,
            state: Arc::clone(&self.state),
        })
    }

    fn last_error(&self) -> Status {
        self.state.lock().last_status
    }
}

/// A port handed out by [`MockBackend`].
pub struct MockHandle {
    name: String,
    released: bool,
    state: Arc<Mutex<MockPortState>>,
}

impl MockHandle {
    fn ensure_open(&self) -> Result<(), PortError> {
        if self.released {
            return Err(PortError::Status(Status::INVALID_HANDLE));
        }
        Ok(())
    }
}

impl PortHandle for MockHandle {
    fn get_line_state(&mut self) -> Result<LineState, PortError> {
        self.ensure_open()?;
        let mut state = self.state.lock();
        state.check(MockOperation::GetLineState)?;
        Ok(state.line_state)
    }

    fn set_line_state(&mut self, line: &LineState) -> Result<(), PortError> {
        self.ensure_open()?;
        let mut state = self.state.lock();
        state.check(MockOperation::SetLineState)?;
        state.line_state = *line;
        state.line_state_writes += 1;
        Ok(())
    }

    fn set_timeouts(&mut self, timeouts: &Timeouts) -> Result<(), PortError> {
        self.ensure_open()?;
        let mut state = self.state.lock();
        state.check(MockOperation::SetTimeouts)?;
        state.timeouts = Some(*timeouts);
        Ok(())
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        self.ensure_open()?;
        let mut state = self.state.lock();
        state.check(MockOperation::Write)?;

        let accepted = state.write_limit.map_or(data.len(), |limit| limit.min(data.len()));
        let sent = &data[..accepted];
        state.write_log.push(sent.to_vec());
        if state.echo {
            state.read_queue.extend(sent);
        }
        Ok(accepted)
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        self.ensure_open()?;
        let mut state = self.state.lock();
        state.check(MockOperation::Read)?;
        state.read_requests.push(buffer.len());

        // An empty queue behaves like an expired read timeout.
        let n = buffer.len().min(state.read_queue.len());
        for (slot, byte) in buffer.iter_mut().zip(state.read_queue.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn release(&mut self) -> Result<(), PortError> {
        self.ensure_open()?;
        let mut state = self.state.lock();
        state.check(MockOperation::Release)?;
        state.releases += 1;
        self.released = true;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for MockHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockHandle")
            .field("name", &self.name)
            .field("released", &self.released)
            .finish()
    }
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend")
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(backend: &mut MockBackend) -> MockHandle {
        backend.acquire("MOCK0", &AcquireOptions::default()).unwrap()
    }

    #[test]
    fn test_enqueue_and_read() {
        let mut backend = MockBackend::new();
        backend.enqueue_read(b"Hello");
        let mut port = open(&mut backend);

        let mut buffer = [0u8; 10];
        let n = port.read_bytes(&mut buffer).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&buffer[..n], b"Hello");
        assert_eq!(backend.read_requests(), vec![10]);
    }

    #[test]
    fn test_write_logging() {
        let mut backend = MockBackend::new();
        let mut port = open(&mut backend);
        port.write_bytes(b"Test1").unwrap();
        port.write_bytes(b"Test2").unwrap();

        let log = backend.write_log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0], b"Test1");
        assert_eq!(log[1], b"Test2");
    }

    #[test]
    fn test_echo() {
        let mut backend = MockBackend::echo();
        let mut port = open(&mut backend);
        port.write_bytes(b"PING\r\n").unwrap();
        assert_eq!(backend.available_bytes(), 6);
    }

    #[test]
    fn test_empty_read_is_zero_bytes() {
        let mut backend = MockBackend::new();
        let mut port = open(&mut backend);
        let mut buffer = [0u8; 10];
        assert_eq!(port.read_bytes(&mut buffer).unwrap(), 0);
    }

    #[test]
    fn test_partial_read() {
        let mut backend = MockBackend::new();
        backend.enqueue_read(b"Hello, World!");
        let mut port = open(&mut backend);

        let mut buffer = [0u8; 5];
        let n = port.read_bytes(&mut buffer).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&buffer[..n], b"Hello");
        assert_eq!(backend.available_bytes(), 8);
    }

    #[test]
    fn test_injected_failure_is_one_shot() {
        let mut backend = MockBackend::new();
        backend.fail_next(MockOperation::Write, Status::GEN_FAILURE);
        let mut port = open(&mut backend);

        let err = port.write_bytes(b"x").unwrap_err();
        assert_eq!(err.status(), Status::GEN_FAILURE);
        assert_eq!(backend.last_error(), Status::GEN_FAILURE);

        assert_eq!(port.write_bytes(b"x").unwrap(), 1);
        assert_eq!(backend.last_error(), Status::SUCCESS);
    }

    #[test]
    fn test_missing_port() {
        let mut backend = MockBackend::new();
        backend.set_missing("COM7");
        let err = backend.acquire("COM7", &AcquireOptions::default()).unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
        assert!(backend.acquisitions().is_empty());
    }

    #[test]
    fn test_write_limit() {
        let mut backend = MockBackend::new();
        backend.set_write_limit(Some(3));
        let mut port = open(&mut backend);
        assert_eq!(port.write_bytes(b"ABCDEF").unwrap(), 3);
        assert_eq!(backend.write_log(), vec![b"ABC".to_vec()]);
    }

    #[test]
    fn test_use_after_release() {
        let mut backend = MockBackend::new();
        let mut port = open(&mut backend);
        port.release().unwrap();
        assert_eq!(backend.releases(), 1);

        let mut buffer = [0u8; 4];
        let err = port.read_bytes(&mut buffer).unwrap_err();
        assert_eq!(err.status(), Status::INVALID_HANDLE);
    }
}
