//! Serial sessions.
//!
//! A [`Session`] owns one open port, one I/O buffer and the configuration the
//! port was opened with. Writes are framed with the session delimiter; reads
//! return exactly the bytes the backend reported, never anything left over in
//! the buffer from an earlier, longer message.
//!
//! ```text
//! write("PING") ──> "PING\r\n" ──> buffer[..6] ──> PortHandle::write_bytes
//! read()        <── buffer[..n] <── PortHandle::read_bytes (n = reported count)
//! ```
//!
//! Sessions are not synchronized. Every I/O method takes `&mut self`, so
//! sharing one between threads requires an external lock.

pub mod framing;
pub mod options;

pub use framing::trim_delimiter;
pub use options::{SessionConfig, SessionOptions};

use crate::error::{ConfigStep, Operation, SessionError, SessionResult};
use crate::port::{PortBackend, PortError, PortHandle, SerialPortBackend};
use crate::status::Status;
use tracing::{debug, info, warn};

/// Buffer size every session starts with.
pub const INITIAL_BUFFER_CAPACITY: usize = 128;

/// Target of the byte-count events emitted while reporting is enabled.
pub const REPORT_TARGET: &str = "rs232_session::report";

/// An open serial port with delimiter framing.
pub struct Session {
    /// `None` once closed.
    handle: Option<Box<dyn PortHandle>>,
    address: String,
    /// Staging area for writes and landing area for reads. Only grows.
    buffer: Vec<u8>,
    config: SessionConfig,
    delimiter: Vec<u8>,
    report: bool,
    last_count: usize,
    last_status: Status,
}

impl Session {
    /// Open `address` on the native serial backend.
    ///
    /// # Example
    /// ```no_run
    /// use rs232_session::{Session, SessionOptions};
    ///
    /// let mut session = Session::open("/dev/ttyUSB0", &SessionOptions::new().baud_rate(115200))?;
    /// let reply = session.query_line("*IDN?")?.to_vec();
    /// session.close()?;
    /// # Ok::<(), rs232_session::SessionError>(())
    /// ```
    pub fn open(address: &str, options: &SessionOptions) -> SessionResult<Self> {
        Self::open_with(SerialPortBackend::new(), address, options)
    }

    /// Open `address` on the given backend.
    ///
    /// Acquires the port, overlays the requested line parameters onto its
    /// current line state, applies the timeouts and allocates the buffer.
    /// Any failing step aborts the open and releases the port.
    ///
    /// # Errors
    ///
    /// - `SessionError::Configuration` with `ConfigStep::Options` for invalid options
    /// - `SessionError::Open` if the port cannot be acquired
    /// - `SessionError::Configuration` if the line state or timeouts cannot be applied
    pub fn open_with<B: PortBackend>(
        mut backend: B,
        address: &str,
        options: &SessionOptions,
    ) -> SessionResult<Self> {
        let config = options.resolve()?;

        let handle = backend
            .acquire(address, &config.acquire)
            .map_err(|source| {
                warn!(address, status = %source.status(), "failed to acquire port: {source}");
                SessionError::Open {
                    address: address.to_string(),
                    source,
                }
            })?;
        info!(address, handle = ?handle, "acquired port handle");

        // From here on, an early return drops the session, which releases the handle.
        let mut session = Self {
            handle: Some(Box::new(handle)),
            address: address.to_string(),
            buffer: Vec::new(),
            delimiter: config.delimiter.clone(),
            config,
            report: false,
            last_count: 0,
            last_status: Status::SUCCESS,
        };
        session.configure()?;
        session.grow_buffer(INITIAL_BUFFER_CAPACITY);
        Ok(session)
    }

    fn configure(&mut self) -> SessionResult<()> {
        let result = self.port().and_then(|port| port.get_line_state());
        let mut state = self
            .record(result)
            .map_err(|source| configuration(ConfigStep::GetLineState, source))?;

        state.overlay(&self.config.line_settings());
        debug!(address = %self.address, ?state, "applying line state");
        let result = self.port().and_then(|port| port.set_line_state(&state));
        self.record(result)
            .map_err(|source| configuration(ConfigStep::SetLineState, source))?;

        let timeouts = self.config.timeouts;
        let result = self.port().and_then(|port| port.set_timeouts(&timeouts));
        self.record(result)
            .map_err(|source| configuration(ConfigStep::SetTimeouts, source))?;
        Ok(())
    }

    /// Write `text` followed by exactly one delimiter.
    ///
    /// A trailing line ending (and a trailing delimiter) in `text` is removed
    /// first, so callers may pass text with or without one. Returns the
    /// number of bytes written, delimiter included.
    ///
    /// # Errors
    ///
    /// - `SessionError::Usage` if the session is closed
    /// - `SessionError::Write` if the backend fails or accepts fewer bytes than framed
    pub fn write(&mut self, text: impl AsRef<[u8]>) -> SessionResult<usize> {
        let text = text.as_ref();
        self.ensure_open(Operation::Write)?;

        let len = framing::framed_len(text, &self.delimiter);
        self.grow_buffer(len);
        framing::frame_into(text, &self.delimiter, &mut self.buffer);

        let result = match self.handle.as_mut() {
            Some(handle) => handle.write_bytes(&self.buffer[..len]),
            None => {
                return Err(SessionError::Usage {
                    operation: Operation::Write,
                })
            }
        };
        let written = match self.record(result) {
            Ok(n) => n,
            Err(e) => {
                self.last_count = 0;
                return Err(SessionError::Write(e));
            }
        };
        self.last_count = written;
        self.report_count("write", written);

        if written < len {
            return Err(SessionError::Write(PortError::ShortWrite {
                written,
                expected: len,
            }));
        }
        Ok(written)
    }

    /// Read whatever arrives before the read timeouts expire.
    ///
    /// Returns exactly the bytes the backend reported, delimiter included.
    /// An empty slice means nothing arrived in time, which is not an error.
    ///
    /// # Errors
    ///
    /// - `SessionError::Usage` if the session is closed
    /// - `SessionError::Read` if the backend fails for a reason other than a timeout
    pub fn read(&mut self) -> SessionResult<&[u8]> {
        let result = match self.handle.as_mut() {
            Some(handle) => handle.read_bytes(&mut self.buffer),
            None => {
                return Err(SessionError::Usage {
                    operation: Operation::Read,
                })
            }
        };
        let count = match self.record(result) {
            Ok(n) => n.min(self.buffer.len()),
            Err(e) if e.is_timeout() => 0,
            Err(e) => {
                self.last_count = 0;
                return Err(SessionError::Read(e));
            }
        };
        self.last_count = count;
        self.report_count("read", count);
        Ok(&self.buffer[..count])
    }

    /// Like [`read`](Self::read), with one trailing delimiter removed.
    pub fn read_line(&mut self) -> SessionResult<&[u8]> {
        let count = self.read()?.len();
        Ok(framing::trim_delimiter(&self.buffer[..count], &self.delimiter))
    }

    /// Write `text`, then read the reply.
    pub fn query(&mut self, text: impl AsRef<[u8]>) -> SessionResult<&[u8]> {
        self.ensure_open(Operation::Query)?;
        self.write(text)?;
        self.read()
    }

    /// Like [`query`](Self::query), with one trailing delimiter removed from the reply.
    pub fn query_line(&mut self, text: impl AsRef<[u8]>) -> SessionResult<&[u8]> {
        self.ensure_open(Operation::Query)?;
        self.write(text)?;
        self.read_line()
    }

    /// Release the port. The session is closed afterwards even if the
    /// backend reports a failure.
    ///
    /// # Errors
    ///
    /// - `SessionError::Usage` if the session is already closed
    /// - `SessionError::Close` if the backend fails to release the port
    pub fn close(&mut self) -> SessionResult<()> {
        let mut handle = self.handle.take().ok_or(SessionError::Usage {
            operation: Operation::Close,
        })?;
        let result = handle.release();
        self.record(result).map_err(SessionError::Close)?;
        info!(address = %self.address, "closed port");
        Ok(())
    }

    /// Make the buffer at least `min_size` bytes long.
    ///
    /// Does nothing if it already is. Otherwise the buffer is replaced by a
    /// zeroed one of exactly `min_size` bytes; previous contents are lost.
    pub fn grow_buffer(&mut self, min_size: usize) {
        if self.buffer.len() < min_size {
            debug!(from = self.buffer.len(), to = min_size, "growing buffer");
            self.buffer = vec![0; min_size];
        }
    }

    pub fn buffer_capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Byte count of the most recent read or write.
    pub fn last_count(&self) -> usize {
        self.last_count
    }

    /// Status of the most recent backend operation.
    pub fn last_status(&self) -> Status {
        self.last_status
    }

    pub fn delimiter(&self) -> &[u8] {
        &self.delimiter
    }

    /// Replace the delimiter used by later writes and line reads.
    ///
    /// # Errors
    ///
    /// - `SessionError::Configuration` with `ConfigStep::Options` if `delimiter` is empty
    pub fn set_delimiter(&mut self, delimiter: impl Into<Vec<u8>>) -> SessionResult<()> {
        let delimiter = delimiter.into();
        if delimiter.is_empty() {
            return Err(SessionError::invalid_option("delimiter must not be empty"));
        }
        self.delimiter = delimiter;
        Ok(())
    }

    pub fn report(&self) -> bool {
        self.report
    }

    /// Emit a byte-count event on [`REPORT_TARGET`] after every read and write.
    pub fn set_report(&mut self, report: bool) {
        self.report = report;
    }

    /// The configuration the session was opened with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Name the backend gave the open port, `None` once closed.
    pub fn port_name(&self) -> Option<&str> {
        self.handle.as_deref().map(|handle| handle.name())
    }

    fn ensure_open(&self, operation: Operation) -> SessionResult<()> {
        if self.handle.is_none() {
            return Err(SessionError::Usage { operation });
        }
        Ok(())
    }

    fn port(&mut self) -> Result<&mut (dyn PortHandle + 'static), PortError> {
        self.handle
            .as_deref_mut()
            .ok_or(PortError::Status(Status::INVALID_HANDLE))
    }

    /// Remember the status a backend call left behind.
    fn record<T>(&mut self, result: Result<T, PortError>) -> Result<T, PortError> {
        match &result {
            Ok(_) => self.last_status = Status::SUCCESS,
            Err(e) => {
                self.last_status = e.status();
                if !e.is_timeout() {
                    warn!(
                        address = %self.address,
                        status = %self.last_status,
                        "backend error: {e}"
                    );
                }
            }
        }
        result
    }

    fn report_count(&self, operation: &str, count: usize) {
        if self.report {
            info!(
                target: REPORT_TARGET,
                address = %self.address,
                count,
                "{operation} count {count}"
            );
        }
    }
}

fn configuration(step: ConfigStep, source: PortError) -> SessionError {
    SessionError::Configuration { step, source }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            match handle.release() {
                Ok(()) => debug!(address = %self.address, "released port on drop"),
                Err(e) => warn!(
                    address = %self.address,
                    status = %e.status(),
                    "failed to release port on drop: {e}"
                ),
            }
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.address)
            .field("open", &self.is_open())
            .field("buffer_capacity", &self.buffer.len())
            .field("delimiter", &String::from_utf8_lossy(&self.delimiter))
            .field("report", &self.report)
            .field("last_count", &self.last_count)
            .field("last_status", &self.last_status)
            .finish()
    }
}
