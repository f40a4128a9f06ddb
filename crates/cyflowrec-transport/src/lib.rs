//! Serial device transport.
//!
//! Opens the instrument's serial device, puts the line into raw mode and
//! exposes a blocking readiness wait with a timeout. This is the lowest layer
//! of cyflowrec; the frame reader builds on the [`ByteChannel`] trait provided
//! here.

pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod serial;

pub use error::{Result, TransportError};
pub use traits::ByteChannel;

#[cfg(unix)]
pub use serial::{LineSettings, SerialPort};
#[cfg(unix)]
pub use traits::poll_readable;
