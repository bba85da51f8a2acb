//! Client for NetSDR software-defined receivers.
//!
//! Connects to a receiver's control port, configures and tunes it, and
//! records the IQ sample stream it sends over UDP.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP control and UDP data channels
//! - [`frame`]: message and sample wire formats
//! - [`session`]: the session engine that ties them together

/// Re-export transport types.
pub mod transport {
    pub use netsdr_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use netsdr_frame::*;
}

/// Re-export session types.
pub mod session {
    pub use netsdr_session::*;
}
