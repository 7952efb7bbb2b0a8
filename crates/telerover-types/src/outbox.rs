//! Outbound message seam.
//!
//! Entity controllers never reach a transport directly. The rover hands each
//! of them an [`Outbox`] at construction; the outbox forwards every message
//! to whatever [`MessageSink`] the process wired in (the relay in
//! production, a [`RecordingSink`] in tests).

use std::sync::{Arc, Mutex};

use crate::{Channel, Outbound};

/// Messages emitted by one operation, in emission order.
pub type Emitted = Vec<Outbound>;

/// Destination for outbound messages.
///
/// Delivery is fire-and-forget: a sink with no connected peer simply drops
/// the message.
pub trait MessageSink: Send + Sync {
    fn deliver(&self, message: &Outbound);
}

/// Cloneable handle that entity controllers emit through.
#[derive(Clone)]
pub struct Outbox {
    sink: Arc<dyn MessageSink>,
}

impl Outbox {
    pub fn new(sink: Arc<dyn MessageSink>) -> Self {
        Self { sink }
    }

    /// An outbox whose messages go nowhere.
    pub fn detached() -> Self {
        Self::new(Arc::new(NullSink))
    }

    /// Deliver `message` and hand it back so the caller can report it.
    pub fn emit(&self, message: impl Into<Outbound>) -> Outbound {
        let message = message.into();
        self.sink.deliver(&message);
        message
    }
}

impl std::fmt::Debug for Outbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outbox").finish_non_exhaustive()
    }
}

struct NullSink;

impl MessageSink for NullSink {
    fn deliver(&self, _message: &Outbound) {}
}

/// In-memory sink that records every delivered message. Intended for
/// headless tests.
#[derive(Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<Outbound>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<Outbound> {
        match self.messages.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    /// Remove and return the messages addressed to `channel`, keeping the rest.
    pub fn take_for(&self, channel: Channel) -> Vec<Outbound> {
        let (matching, rest): (Vec<_>, Vec<_>) =
            self.take().into_iter().partition(|m| m.channel() == channel);
        if let Ok(mut guard) = self.messages.lock() {
            *guard = rest;
        }
        matching
    }
}

impl MessageSink for RecordingSink {
    fn deliver(&self, message: &Outbound) {
        if let Ok(mut guard) = self.messages.lock() {
            guard.push(message.clone());
        }
    }
}
