//! Port backend layer.
//!
//! Provides the backend traits the session is written against, a native
//! implementation over the `serialport` crate, and a mock for tests.

pub mod error;
pub mod mock;
pub mod native;
pub mod traits;

pub use error::PortError;
pub use mock::{MockBackend, MockHandle, MockOperation};
pub use native::{available_ports, SerialPortBackend, SerialPortHandle};
pub use traits::*;
