//! Native serial port backend.
//!
//! Wraps the `serialport` crate behind [`PortBackend`]/[`PortHandle`]. The
//! crate only knows a single per-call timeout, so the interval, multiplier
//! and constant model of [`Timeouts`] is enforced here by re-arming that
//! timeout between partial transfers.
//!
//! Opening goes through `serialport`'s builder, which programs the device
//! with 9600 baud, 8 data bits, no parity, one stop bit and no flow control
//! before anything else happens. The line state read back right after
//! acquire is therefore those builder values, not whatever the device was
//! set to before it was opened; earlier flow control settings are not
//! preserved.

use super::error::PortError;
use super::traits::{
    AcquireOptions, AccessMode, Disposition, LineState, PortBackend, PortHandle, ShareMode,
    Timeouts, ATTRIBUTE_NORMAL,
};
use crate::status::Status;
use std::io::{Read, Write};
use std::time::{Duration, Instant};
use tracing::debug;

/// How long one blocking call may wait when no total timeout is configured.
const UNBOUNDED_SLICE: Duration = Duration::from_secs(1);

/// Backend that opens real serial devices.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialPortBackend;

impl SerialPortBackend {
    pub fn new() -> Self {
        Self
    }
}

/// List the names of the serial ports present on this system.
pub fn available_ports() -> Result<Vec<String>, PortError> {
    Ok(serialport::available_ports()?
        .into_iter()
        .map(|info| info.port_name)
        .collect())
}

impl PortBackend for SerialPortBackend {
    type Handle = SerialPortHandle;

    fn acquire(
        &mut self,
        address: &str,
        options: &AcquireOptions,
    ) -> Result<Self::Handle, PortError> {
        if options.disposition != Disposition::OpenExisting {
            return Err(PortError::unsupported(format!(
                "serial ports can only be opened as existing devices, not {:?}",
                options.disposition
            )));
        }
        if options.attributes != ATTRIBUTE_NORMAL {
            debug!(attributes = options.attributes, "ignoring attribute flags");
        }

        let builder = serialport::new(address, LineState::default().baud_rate)
            .timeout(UNBOUNDED_SLICE);
        let port = open_port(builder, options.share).map_err(|e| open_error(address, e))?;

        Ok(SerialPortHandle {
            port: Some(port),
            name: address.to_string(),
            access: options.access,
            timeouts: Timeouts::default(),
        })
    }

    fn last_error(&self) -> Status {
        Status::from_io(&std::io::Error::last_os_error())
    }
}

/// Missing devices surface as `NoDevice` on some platforms and as a plain
/// `ENOENT` I/O error on others.
fn open_error(address: &str, err: serialport::Error) -> PortError {
    match err.kind() {
        serialport::ErrorKind::NoDevice
        | serialport::ErrorKind::Io(std::io::ErrorKind::NotFound) => PortError::not_found(address),
        serialport::ErrorKind::InvalidInput => PortError::config(err.to_string()),
        _ => PortError::Serial(err),
    }
}

#[cfg(unix)]
fn open_port(
    builder: serialport::SerialPortBuilder,
    share: ShareMode,
) -> serialport::Result<Box<dyn serialport::SerialPort>> {
    let mut tty = builder.open_native()?;
    tty.set_exclusive(share == ShareMode::Exclusive)?;
    Ok(Box::new(tty))
}

#[cfg(not(unix))]
fn open_port(
    builder: serialport::SerialPortBuilder,
    share: ShareMode,
) -> serialport::Result<Box<dyn serialport::SerialPort>> {
    if share == ShareMode::Shared {
        return Err(serialport::Error::new(
            serialport::ErrorKind::InvalidInput,
            "COM ports cannot be opened in shared mode",
        ));
    }
    builder.open()
}

/// An open serial device.
pub struct SerialPortHandle {
    /// `None` once released.
    port: Option<Box<dyn serialport::SerialPort>>,
    name: String,
    access: AccessMode,
    timeouts: Timeouts,
}

impl SerialPortHandle {
    fn port_mut(&mut self) -> Result<&mut Box<dyn serialport::SerialPort>, PortError> {
        self.port
            .as_mut()
            .ok_or(PortError::Status(Status::INVALID_HANDLE))
    }

    /// Get a reference to the underlying serialport implementation.
    ///
    /// Returns `None` after release.
    pub fn as_raw(&self) -> Option<&dyn serialport::SerialPort> {
        self.port.as_deref()
    }
}

fn is_timeout(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
    )
}

impl PortHandle for SerialPortHandle {
    fn get_line_state(&mut self) -> Result<LineState, PortError> {
        let port = self.port_mut()?;
        Ok(LineState {
            baud_rate: port.baud_rate()?,
            data_bits: port.data_bits()?.into(),
            stop_bits: port.stop_bits()?.into(),
            parity: port.parity()?.into(),
            flow_control: port.flow_control()?.into(),
        })
    }

    fn set_line_state(&mut self, state: &LineState) -> Result<(), PortError> {
        // Convert everything first so an unsupported value leaves the port untouched.
        let parity: serialport::Parity = state.parity.try_into()?;
        let stop_bits: serialport::StopBits = state.stop_bits.try_into()?;
        if state.baud_rate == 0 {
            return Err(PortError::config("baud rate must be positive"));
        }

        let port = self.port_mut()?;
        port.set_baud_rate(state.baud_rate)?;
        port.set_data_bits(state.data_bits.into())?;
        port.set_stop_bits(stop_bits)?;
        port.set_parity(parity)?;
        port.set_flow_control(state.flow_control.into())?;
        Ok(())
    }

    fn set_timeouts(&mut self, timeouts: &Timeouts) -> Result<(), PortError> {
        self.port_mut()?;
        self.timeouts = *timeouts;
        Ok(())
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        if !self.access.can_write() {
            return Err(PortError::AccessDenied(format!(
                "{} was opened without write access",
                self.name
            )));
        }
        let deadline = self.timeouts.write_total(data.len()).map(|d| Instant::now() + d);
        let port = self.port_mut()?;

        let mut written = 0;
        while written < data.len() {
            let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            if remaining.is_some_and(|r| r.is_zero()) {
                break;
            }
            port.set_timeout(remaining.unwrap_or(UNBOUNDED_SLICE))?;
            match port.write(&data[written..]) {
                Ok(n) => written += n,
                Err(e) if is_timeout(&e) => continue,
                Err(e) => return Err(PortError::Io(e)),
            }
        }

        if written == data.len() {
            port.flush().map_err(PortError::Io)?;
        }
        Ok(written)
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        if !self.access.can_read() {
            return Err(PortError::AccessDenied(format!(
                "{} was opened without read access",
                self.name
            )));
        }
        let deadline = self.timeouts.read_total(buffer.len()).map(|d| Instant::now() + d);
        let interval = self.timeouts.interval();
        let port = self.port_mut()?;

        let mut filled = 0;
        while filled < buffer.len() {
            let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            if remaining.is_some_and(|r| r.is_zero()) {
                break;
            }
            let mut wait = remaining.unwrap_or(UNBOUNDED_SLICE);
            if filled > 0 {
                if let Some(gap) = interval {
                    wait = wait.min(gap);
                }
            }
            port.set_timeout(wait)?;

            match port.read(&mut buffer[filled..]) {
                Ok(n) if n > 0 => filled += n,
                Ok(_) => {
                    if filled > 0 && interval.is_some() {
                        break;
                    }
                }
                Err(e) if is_timeout(&e) => {
                    // The gap after the last byte exceeded the interval.
                    if filled > 0 && interval.is_some() {
                        break;
                    }
                }
                Err(e) => return Err(PortError::Io(e)),
            }
        }
        Ok(filled)
    }

    fn release(&mut self) -> Result<(), PortError> {
        match self.port.take() {
            Some(port) => {
                drop(port);
                Ok(())
            }
            None => Err(PortError::Status(Status::INVALID_HANDLE)),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for SerialPortHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPortHandle")
            .field("name", &self.name)
            .field("open", &self.port.is_some())
            .field("access", &self.access)
            .finish()
    }
}
