//! Receives files sent by a laboratory instrument over a serial line.
//!
//! # Crate Structure
//!
//! - [`transport`]: Serial device access and readiness polling
//! - [`frame`]: Timeout-driven read events
//! - [`receiver`]: Protocol state machine and storage writer

/// Re-export transport types.
pub mod transport {
    pub use cyflowrec_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use cyflowrec_frame::*;
}

/// Re-export receiver types.
pub mod receiver {
    pub use cyflowrec_receiver::*;
}
