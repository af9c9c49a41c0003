//! Session options and their resolved form.
//!
//! [`SessionOptions`] is what callers and config files provide: every field is
//! optional. [`SessionConfig`] is what a session runs with, after defaults
//! have been filled in and values validated.

use crate::error::{SessionError, SessionResult};
use crate::port::{
    AccessMode, AcquireOptions, DataBits, Disposition, LineSettings, Parity, ShareMode, StopBits,
    Timeouts, ATTRIBUTE_NORMAL,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const DEFAULT_BYTE_SIZE: u8 = 8;
pub const DEFAULT_DELIMITER: &str = "\r\n";

/// Options for opening a session. Unset fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionOptions {
    pub access: Option<AccessMode>,
    pub share: Option<ShareMode>,
    pub disposition: Option<Disposition>,
    pub attributes: Option<u32>,

    pub baud_rate: Option<u32>,
    /// Data bits per character, 5 through 8.
    pub byte_size: Option<u8>,
    pub stop_bits: Option<StopBits>,
    pub parity: Option<Parity>,

    pub read_interval_timeout: Option<u32>,
    pub read_total_timeout_multiplier: Option<u32>,
    pub read_total_timeout_constant: Option<u32>,
    pub write_total_timeout_multiplier: Option<u32>,
    pub write_total_timeout_constant: Option<u32>,

    pub delimiter: Option<String>,
}

impl SessionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn access(mut self, access: AccessMode) -> Self {
        self.access = Some(access);
        self
    }

    pub fn share(mut self, share: ShareMode) -> Self {
        self.share = Some(share);
        self
    }

    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = Some(baud_rate);
        self
    }

    pub fn byte_size(mut self, byte_size: u8) -> Self {
        self.byte_size = Some(byte_size);
        self
    }

    pub fn stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = Some(stop_bits);
        self
    }

    pub fn parity(mut self, parity: Parity) -> Self {
        self.parity = Some(parity);
        self
    }

    /// Set all five timeouts at once.
    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.read_interval_timeout = Some(timeouts.read_interval);
        self.read_total_timeout_multiplier = Some(timeouts.read_multiplier);
        self.read_total_timeout_constant = Some(timeouts.read_constant);
        self.write_total_timeout_multiplier = Some(timeouts.write_multiplier);
        self.write_total_timeout_constant = Some(timeouts.write_constant);
        self
    }

    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    /// Layer `overrides` on top of these options; set fields in `overrides` win.
    pub fn overridden_by(self, overrides: &SessionOptions) -> Self {
        let o = overrides.clone();
        Self {
            access: o.access.or(self.access),
            share: o.share.or(self.share),
            disposition: o.disposition.or(self.disposition),
            attributes: o.attributes.or(self.attributes),
            baud_rate: o.baud_rate.or(self.baud_rate),
            byte_size: o.byte_size.or(self.byte_size),
            stop_bits: o.stop_bits.or(self.stop_bits),
            parity: o.parity.or(self.parity),
            read_interval_timeout: o.read_interval_timeout.or(self.read_interval_timeout),
            read_total_timeout_multiplier: o
                .read_total_timeout_multiplier
                .or(self.read_total_timeout_multiplier),
            read_total_timeout_constant: o
                .read_total_timeout_constant
                .or(self.read_total_timeout_constant),
            write_total_timeout_multiplier: o
                .write_total_timeout_multiplier
                .or(self.write_total_timeout_multiplier),
            write_total_timeout_constant: o
                .write_total_timeout_constant
                .or(self.write_total_timeout_constant),
            delimiter: o.delimiter.or(self.delimiter),
        }
    }

    /// Fill in defaults and validate.
    pub fn resolve(&self) -> SessionResult<SessionConfig> {
        let defaults = Timeouts::default();
        let baud_rate = self.baud_rate.unwrap_or(DEFAULT_BAUD_RATE);
        if baud_rate == 0 {
            return Err(SessionError::invalid_option("baud rate must be positive"));
        }
        let data_bits = DataBits::try_from(self.byte_size.unwrap_or(DEFAULT_BYTE_SIZE))
            .map_err(|source| SessionError::Configuration {
                step: crate::error::ConfigStep::Options,
                source,
            })?;
        let delimiter = self
            .delimiter
            .clone()
            .unwrap_or_else(|| DEFAULT_DELIMITER.to_string())
            .into_bytes();
        if delimiter.is_empty() {
            return Err(SessionError::invalid_option("delimiter must not be empty"));
        }

        Ok(SessionConfig {
            acquire: AcquireOptions {
                access: self.access.unwrap_or_default(),
                share: self.share.unwrap_or_default(),
                disposition: self.disposition.unwrap_or_default(),
                attributes: self.attributes.unwrap_or(ATTRIBUTE_NORMAL),
            },
            baud_rate,
            data_bits,
            stop_bits: self.stop_bits.unwrap_or(StopBits::One),
            parity: self.parity.unwrap_or(Parity::None),
            timeouts: Timeouts {
                read_interval: self.read_interval_timeout.unwrap_or(defaults.read_interval),
                read_multiplier: self
                    .read_total_timeout_multiplier
                    .unwrap_or(defaults.read_multiplier),
                read_constant: self
                    .read_total_timeout_constant
                    .unwrap_or(defaults.read_constant),
                write_multiplier: self
                    .write_total_timeout_multiplier
                    .unwrap_or(defaults.write_multiplier),
                write_constant: self
                    .write_total_timeout_constant
                    .unwrap_or(defaults.write_constant),
            },
            delimiter,
        })
    }
}

/// Fully resolved session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub acquire: AcquireOptions,
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub parity: Parity,
    pub timeouts: Timeouts,
    /// Initial delimiter; always non-empty.
    pub delimiter: Vec<u8>,
}

impl SessionConfig {
    /// The line fields to overlay onto the port's current state.
    pub fn line_settings(&self) -> LineSettings {
        LineSettings {
            baud_rate: self.baud_rate,
            data_bits: self.data_bits,
            stop_bits: self.stop_bits,
            parity: self.parity,
        }
    }
}
