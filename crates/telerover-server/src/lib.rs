//! `telerover-server` – the WebSocket transport.
//!
//! Boots a TCP listener (default port `3001`) and upgrades every connection
//! to a WebSocket. The request path picks the peer's [`Channel`]:
//!
//! | Path | Channel |
//! |---|---|
//! | `/mission-control` | [`Channel::Control`] |
//! | `/simulator` | [`Channel::Backend`] |
//!
//! Any other path is refused with `404 Not Found` during the handshake.
//! Frames are pumped between the socket and the [`Session`]'s relay until the
//! peer leaves.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use telerover_hal::RoverLayout;
//! use telerover_middleware::{Relay, Session};
//! use telerover_server::RoverServer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let relay = Arc::new(Relay::default());
//!     let session = Session::new(&RoverLayout::default(), relay)?;
//!     RoverServer::new(session).run().await?;
//!     Ok(())
//! }
//! ```
//!
//! [`Channel`]: telerover_types::Channel
//! [`Channel::Control`]: telerover_types::Channel::Control
//! [`Channel::Backend`]: telerover_types::Channel::Backend
//! [`Session`]: telerover_middleware::Session

pub mod server;

pub use server::{DEFAULT_BIND_ADDRESS, DEFAULT_PORT, RoverServer};
