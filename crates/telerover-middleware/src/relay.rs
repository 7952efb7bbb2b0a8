//! [`Relay`] – per-channel broadcast hub between the rover and its peers.
//!
//! Each [`Channel`] owns one [`tokio::sync::broadcast`] channel. A connected
//! peer subscribes to the channel it joined and forwards everything it
//! receives to its socket. Sending with nobody subscribed is a silent no-op:
//! a disconnected peer misses the frame.

use telerover_types::{Channel, MessageSink, Outbound};
use tokio::sync::broadcast;
use tracing::{error, trace};

/// Default channel capacity (number of buffered frames before a slow peer
/// starts missing them).
pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug)]
pub struct Relay {
    control: broadcast::Sender<String>,
    backend: broadcast::Sender<String>,
}

impl Relay {
    /// Create a relay whose per-channel buffers hold `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        let (control, _) = broadcast::channel(capacity.max(1));
        let (backend, _) = broadcast::channel(capacity.max(1));
        Self { control, backend }
    }

    /// Subscribe to every frame sent on `channel` from now on.
    pub fn subscribe(&self, channel: Channel) -> broadcast::Receiver<String> {
        self.sender(channel).subscribe()
    }

    /// Broadcast raw text on `channel`.
    ///
    /// Returns the number of peers that were handed the frame; `0` when
    /// nobody is connected.
    pub fn send(&self, channel: Channel, text: String) -> usize {
        match self.sender(channel).send(text) {
            Ok(n) => n,
            Err(broadcast::error::SendError(_)) => {
                trace!(%channel, "no peer connected; frame dropped");
                0
            }
        }
    }

    /// Number of peers currently subscribed to `channel`.
    pub fn peer_count(&self, channel: Channel) -> usize {
        self.sender(channel).receiver_count()
    }

    fn sender(&self, channel: Channel) -> &broadcast::Sender<String> {
        match channel {
            Channel::Control => &self.control,
            Channel::Backend => &self.backend,
        }
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl MessageSink for Relay {
    fn deliver(&self, message: &Outbound) {
        match message.to_json() {
            Ok(text) => {
                self.send(message.channel(), text);
            }
            Err(e) => error!(error = %e, "failed to serialize outbound message"),
        }
    }
}
