//! Core traits for the port backend.
//!
//! A [`PortBackend`] acquires ports; the [`PortHandle`] it returns performs
//! every later operation on that one port. Real hardware and the mock
//! backend implement the same pair, so the session never knows which one it
//! is talking to.

use super::error::PortError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How the port is opened for data transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    Read,
    Write,
    #[default]
    ReadWrite,
}

impl AccessMode {
    pub fn can_read(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    pub fn can_write(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}

/// Whether other openers may share the port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareMode {
    #[default]
    Exclusive,
    Shared,
}

/// What to do depending on whether the port already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    #[default]
    OpenExisting,
    OpenAlways,
    CreateNew,
    CreateAlways,
    TruncateExisting,
}

/// Attribute flags passed through to the acquire call.
pub const ATTRIBUTE_NORMAL: u32 = 0x0000_0080;

/// Parameters for acquiring a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquireOptions {
    pub access: AccessMode,
    pub share: ShareMode,
    pub disposition: Disposition,
    pub attributes: u32,
}

impl Default for AcquireOptions {
    fn default() -> Self {
        Self {
            access: AccessMode::ReadWrite,
            share: ShareMode::Exclusive,
            disposition: Disposition::OpenExisting,
            attributes: ATTRIBUTE_NORMAL,
        }
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl DataBits {
    pub fn bits(self) -> u8 {
        match self {
            Self::Five => 5,
            Self::Six => 6,
            Self::Seven => 7,
            Self::Eight => 8,
        }
    }
}

impl TryFrom<u8> for DataBits {
    type Error = PortError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            5 => Ok(Self::Five),
            6 => Ok(Self::Six),
            7 => Ok(Self::Seven),
            8 => Ok(Self::Eight),
            other => Err(PortError::config(format!("invalid byte size: {other}"))),
        }
    }
}

impl FromStr for DataBits {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "5" | "five" => Ok(Self::Five),
            "6" | "six" => Ok(Self::Six),
            "7" | "seven" => Ok(Self::Seven),
            "8" | "eight" => Ok(Self::Eight),
            other => Err(PortError::config(format!("invalid byte size: {other}"))),
        }
    }
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

impl From<serialport::DataBits> for DataBits {
    fn from(bits: serialport::DataBits) -> Self {
        match bits {
            serialport::DataBits::Five => DataBits::Five,
            serialport::DataBits::Six => DataBits::Six,
            serialport::DataBits::Seven => DataBits::Seven,
            serialport::DataBits::Eight => DataBits::Eight,
        }
    }
}

/// Flow control modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::Software => serialport::FlowControl::Software,
            FlowControl::Hardware => serialport::FlowControl::Hardware,
        }
    }
}

impl From<serialport::FlowControl> for FlowControl {
    fn from(flow: serialport::FlowControl) -> Self {
        match flow {
            serialport::FlowControl::None => FlowControl::None,
            serialport::FlowControl::Software => FlowControl::Software,
            serialport::FlowControl::Hardware => FlowControl::Hardware,
        }
    }
}

/// Parity checking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parity {
    None,
    Odd,
    Even,
    Mark,
    Space,
}

impl FromStr for Parity {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "n" => Ok(Self::None),
            "odd" | "o" => Ok(Self::Odd),
            "even" | "e" => Ok(Self::Even),
            "mark" | "m" => Ok(Self::Mark),
            "space" | "s" => Ok(Self::Space),
            other => Err(PortError::config(format!("invalid parity: {other}"))),
        }
    }
}

impl TryFrom<Parity> for serialport::Parity {
    type Error = PortError;

    fn try_from(parity: Parity) -> Result<Self, Self::Error> {
        match parity {
            Parity::None => Ok(serialport::Parity::None),
            Parity::Odd => Ok(serialport::Parity::Odd),
            Parity::Even => Ok(serialport::Parity::Even),
            Parity::Mark | Parity::Space => Err(PortError::unsupported(format!(
                "{parity:?} parity is not available on this platform"
            ))),
        }
    }
}

impl From<serialport::Parity> for Parity {
    fn from(parity: serialport::Parity) -> Self {
        match parity {
            serialport::Parity::None => Parity::None,
            serialport::Parity::Odd => Parity::Odd,
            serialport::Parity::Even => Parity::Even,
        }
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopBits {
    One,
    OnePointFive,
    Two,
}

impl FromStr for StopBits {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "one" => Ok(Self::One),
            "1.5" | "one_point_five" => Ok(Self::OnePointFive),
            "2" | "two" => Ok(Self::Two),
            other => Err(PortError::config(format!("invalid stop bits: {other}"))),
        }
    }
}

impl TryFrom<StopBits> for serialport::StopBits {
    type Error = PortError;

    fn try_from(bits: StopBits) -> Result<Self, Self::Error> {
        match bits {
            StopBits::One => Ok(serialport::StopBits::One),
            StopBits::Two => Ok(serialport::StopBits::Two),
            StopBits::OnePointFive => Err(PortError::unsupported(
                "1.5 stop bits are not available on this platform",
            )),
        }
    }
}

impl From<serialport::StopBits> for StopBits {
    fn from(bits: serialport::StopBits) -> Self {
        match bits {
            serialport::StopBits::One => StopBits::One,
            serialport::StopBits::Two => StopBits::Two,
        }
    }
}

/// The line parameters a session sets on open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSettings {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub parity: Parity,
}

/// A backend's line-state block.
///
/// Obtained from [`PortHandle::get_line_state`], modified through
/// [`LineState::overlay`], and handed back unchanged otherwise. Fields the
/// session never touches (such as flow control) round-trip as read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineState {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub parity: Parity,
    pub flow_control: FlowControl,
}

impl LineState {
    /// Replace the four line parameters, keeping everything else as read.
    pub fn overlay(&mut self, settings: &LineSettings) {
        self.baud_rate = settings.baud_rate;
        self.data_bits = settings.data_bits;
        self.stop_bits = settings.stop_bits;
        self.parity = settings.parity;
    }
}

impl Default for LineState {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            flow_control: FlowControl::None,
        }
    }
}

/// Timeout parameters, all in milliseconds.
///
/// A read may block for `read_multiplier * requested_bytes + read_constant`
/// in total, and gives up early once `read_interval` passes between two
/// received bytes. Writes are bounded the same way by the write pair. A zero
/// multiplier together with a zero constant disables the total bound; a zero
/// interval disables the inter-byte bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    pub read_interval: u32,
    pub read_multiplier: u32,
    pub read_constant: u32,
    pub write_multiplier: u32,
    pub write_constant: u32,
}

impl Timeouts {
    /// Total read budget for a request of `len` bytes, if bounded.
    pub fn read_total(&self, len: usize) -> Option<Duration> {
        total_budget(self.read_multiplier, self.read_constant, len)
    }

    /// Total write budget for `len` bytes, if bounded.
    pub fn write_total(&self, len: usize) -> Option<Duration> {
        total_budget(self.write_multiplier, self.write_constant, len)
    }

    /// Maximum gap between two received bytes, if bounded.
    pub fn interval(&self) -> Option<Duration> {
        (self.read_interval > 0).then(|| Duration::from_millis(u64::from(self.read_interval)))
    }
}

fn total_budget(multiplier: u32, constant: u32, len: usize) -> Option<Duration> {
    if multiplier == 0 && constant == 0 {
        return None;
    }
    let per_byte = u64::from(multiplier).saturating_mul(len as u64);
    Some(Duration::from_millis(per_byte.saturating_add(u64::from(constant))))
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            read_interval: 50,
            read_multiplier: 50,
            read_constant: 10,
            write_multiplier: 50,
            write_constant: 10,
        }
    }
}

/// Acquires port handles.
pub trait PortBackend {
    type Handle: PortHandle + 'static;

    /// Open the port named by `address`.
    fn acquire(
        &mut self,
        address: &str,
        options: &AcquireOptions,
    ) -> Result<Self::Handle, PortError>;

    /// Out-of-band status of the most recent call, for platforms that report
    /// errors that way. Backends that return every status inline keep the
    /// default.
    fn last_error(&self) -> crate::status::Status {
        crate::status::Status::SUCCESS
    }
}

/// Operations on one acquired port.
///
/// Reads and writes block until the configured [`Timeouts`] allow no more.
pub trait PortHandle: Send + fmt::Debug {
    /// Read the current line-state block.
    fn get_line_state(&mut self) -> Result<LineState, PortError>;

    /// Apply a line-state block.
    fn set_line_state(&mut self, state: &LineState) -> Result<(), PortError>;

    /// Apply the timeout block.
    fn set_timeouts(&mut self, timeouts: &Timeouts) -> Result<(), PortError>;

    /// Write `data`, returning how many bytes went out.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Read into `buffer`, returning how many bytes arrived. Zero means the
    /// timeout expired with nothing received.
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Release the port. The handle must not be used afterwards.
    fn release(&mut self) -> Result<(), PortError>;

    /// The name/path of this port.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let timeouts = Timeouts::default();
        assert_eq!(timeouts.read_interval, 50);
        assert_eq!(timeouts.read_multiplier, 50);
        assert_eq!(timeouts.read_constant, 10);
        assert_eq!(timeouts.write_multiplier, 50);
        assert_eq!(timeouts.write_constant, 10);
    }

    #[test]
    fn test_timeout_budgets() {
        let timeouts = Timeouts::default();
        assert_eq!(timeouts.read_total(4), Some(Duration::from_millis(210)));
        assert_eq!(timeouts.write_total(0), Some(Duration::from_millis(10)));
        assert_eq!(timeouts.interval(), Some(Duration::from_millis(50)));

        let unbounded = Timeouts {
            read_interval: 0,
            read_multiplier: 0,
            read_constant: 0,
            write_multiplier: 0,
            write_constant: 0,
        };
        assert_eq!(unbounded.read_total(128), None);
        assert_eq!(unbounded.interval(), None);
    }

    #[test]
    fn test_overlay_keeps_flow_control() {
        let mut state = LineState {
            baud_rate: 115200,
            data_bits: DataBits::Seven,
            stop_bits: StopBits::Two,
            parity: Parity::Even,
            flow_control: FlowControl::Hardware,
        };
        state.overlay(&LineSettings {
            baud_rate: 19200,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
        });

        assert_eq!(state.baud_rate, 19200);
        assert_eq!(state.parity, Parity::None);
        assert_eq!(state.data_bits, DataBits::Eight);
        assert_eq!(state.stop_bits, StopBits::One);
        assert_eq!(state.flow_control, FlowControl::Hardware);
    }

    #[test]
    fn test_data_bits_conversion() {
        let bits = DataBits::Eight;
        let serialport_bits: serialport::DataBits = bits.into();
        assert_eq!(serialport_bits, serialport::DataBits::Eight);
        assert_eq!(DataBits::try_from(5u8).unwrap(), DataBits::Five);
        assert!(DataBits::try_from(9u8).is_err());
    }

    #[test]
    fn test_parity_conversion() {
        let parity: serialport::Parity = Parity::Even.try_into().unwrap();
        assert_eq!(parity, serialport::Parity::Even);

        let mark: Result<serialport::Parity, _> = Parity::Mark.try_into();
        assert!(matches!(mark, Err(PortError::Unsupported(_))));
    }

    #[test]
    fn test_stop_bits_conversion() {
        let stop_bits: serialport::StopBits = StopBits::Two.try_into().unwrap();
        assert_eq!(stop_bits, serialport::StopBits::Two);

        let half: Result<serialport::StopBits, _> = StopBits::OnePointFive.try_into();
        assert!(half.is_err());
    }

    #[test]
    fn test_parse_line_parameters() {
        assert_eq!("E".parse::<Parity>().unwrap(), Parity::Even);
        assert_eq!("space".parse::<Parity>().unwrap(), Parity::Space);
        assert_eq!("1.5".parse::<StopBits>().unwrap(), StopBits::OnePointFive);
        assert_eq!("seven".parse::<DataBits>().unwrap(), DataBits::Seven);
        assert!("sometimes".parse::<Parity>().is_err());
    }

    #[test]
    fn test_access_mode() {
        assert!(AccessMode::ReadWrite.can_read());
        assert!(AccessMode::ReadWrite.can_write());
        assert!(!AccessMode::Read.can_write());
        assert!(!AccessMode::Write.can_read());
    }
}
