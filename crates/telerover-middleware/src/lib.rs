//! `telerover-middleware` – routes frames between the rover and its peers.
//!
//! # Modules
//!
//! - [`relay`] – [`Relay`]: one Tokio broadcast channel per peer channel;
//!   the sink every rover emission goes through.
//! - [`dispatch`] – decodes raw frames and routes them to rover operations.
//! - [`session`] – [`Session`]: connect / message / disconnect lifecycle
//!   around the shared rover.

pub mod dispatch;
pub mod relay;
pub mod session;

pub use relay::{DEFAULT_CAPACITY, Relay};
pub use session::Session;
