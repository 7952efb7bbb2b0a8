//! [`Session`] – the connection lifecycle around one shared [`Rover`].
//!
//! All rover access goes through a single `tokio::sync::Mutex`, so one
//! inbound message is handled to completion (including every emission it
//! causes) before the next one starts.
//!
//! | Event | Control | Backend |
//! |---|---|---|
//! | connect | announce mounted peripherals | reopen live streams, replay motor targets |
//! | message | [`dispatch`] a `ControlRequest` | [`dispatch`] a `BackendReport` |
//! | disconnect | close every camera stream | drop every stored frame |

use std::sync::Arc;

use telerover_hal::{Rover, RoverLayout};
use telerover_types::{Channel, ControlMessage, Emitted, Outbox, RoverError};
use tokio::sync::Mutex;
use tracing::info;

use crate::dispatch::dispatch;
use crate::relay::Relay;

#[derive(Debug, Clone)]
pub struct Session {
    rover: Arc<Mutex<Rover>>,
    relay: Arc<Relay>,
    peripherals: Vec<String>,
    outbox: Outbox,
}

impl Session {
    /// Build a rover from `layout` whose emissions go to `relay`.
    pub fn new(layout: &RoverLayout, relay: Arc<Relay>) -> Result<Self, RoverError> {
        let outbox = Outbox::new(relay.clone());
        let rover = Rover::new(layout, outbox.clone())?;
        Ok(Self {
            rover: Arc::new(Mutex::new(rover)),
            relay,
            peripherals: Vec::new(),
            outbox,
        })
    }

    /// Peripherals announced to Control on every connect.
    pub fn with_peripherals(mut self, peripherals: Vec<String>) -> Self {
        self.peripherals = peripherals;
        self
    }

    pub fn rover(&self) -> &Arc<Mutex<Rover>> {
        &self.rover
    }

    pub fn relay(&self) -> &Arc<Relay> {
        &self.relay
    }

    /// A peer joined `channel`.
    ///
    /// The peer must already be subscribed to the relay, otherwise it misses
    /// the resynchronisation messages.
    pub async fn on_connect(&self, channel: Channel) -> Emitted {
        let rover = self.rover.lock().await;
        info!(%channel, peers = self.relay.peer_count(channel), "peer connected");
        match channel {
            Channel::Control => self
                .peripherals
                .iter()
                .map(|peripheral| {
                    self.outbox.emit(ControlMessage::MountedPeripheralReport {
                        peripheral: peripheral.clone(),
                    })
                })
                .collect(),
            Channel::Backend => rover.resync_backend(),
        }
    }

    /// A text frame arrived on `channel`.
    pub async fn on_message(&self, channel: Channel, text: &str) -> Emitted {
        let mut rover = self.rover.lock().await;
        dispatch(&mut rover, channel, text)
    }

    /// A peer left `channel`.
    pub async fn on_disconnect(&self, channel: Channel) -> Emitted {
        let mut rover = self.rover.lock().await;
        info!(%channel, "peer disconnected");
        match channel {
            Channel::Control => rover.release_streams(),
            Channel::Backend => rover.clear_frames(),
        }
    }

    /// Engage the emergency stop outside of any peer's request.
    pub async fn emergency_stop(&self) -> Emitted {
        self.rover.lock().await.set_emergency_stopped(true)
    }
}
