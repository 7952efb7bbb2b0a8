//! `telerover-types` – shared vocabulary of the rover control plane.
//!
//! Every other crate in the workspace speaks in terms of the types defined
//! here:
//!
//! - [`message`] – the typed wire protocol exchanged with Control and the
//!   Backend.
//! - [`outbox`] – the [`MessageSink`] seam through which entity controllers
//!   emit outbound messages.
//! - [`Channel`], [`OperationMode`], [`RunMode`] and the [`RoverError`]
//!   taxonomy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod message;
pub mod outbox;

pub use message::{
    BackendMessage, BackendReport, CartesianPoint, ControlMessage, ControlRequest, Inbound,
    Outbound, PolarPoint,
};
pub use outbox::{Emitted, MessageSink, Outbox, RecordingSink};

/// One of the two independently addressable peer channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Channel {
    /// The human-operator console ("mission control").
    Control,
    /// The hardware or simulation backend.
    Backend,
}

impl Channel {
    /// Both channels, Control first.
    pub const ALL: [Channel; 2] = [Channel::Control, Channel::Backend];

    /// URL path a peer connects to in order to join this channel.
    pub fn path(self) -> &'static str {
        match self {
            Channel::Control => "/mission-control",
            Channel::Backend => "/simulator",
        }
    }

    /// Resolve a request path to its channel. Trailing slashes are ignored.
    pub fn from_path(path: &str) -> Option<Self> {
        let trimmed = path.trim_end_matches('/');
        Self::ALL.into_iter().find(|c| c.path() == trimmed)
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Control => write!(f, "control"),
            Channel::Backend => write!(f, "backend"),
        }
    }
}

/// Who is in charge of driving the rover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationMode {
    #[default]
    Teleoperation,
    Autonomous,
}

/// How a motor interprets its targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunMode {
    /// Run with the target power.
    #[default]
    RunWithPower,
    /// Servo towards the target position. Requires an encoder.
    RunToPosition,
    /// Hold the target velocity. Requires an encoder.
    RunWithVelocity,
}

impl RunMode {
    /// Whether a motor needs an encoder to run in this mode.
    pub fn requires_encoder(self) -> bool {
        !matches!(self, RunMode::RunWithPower)
    }
}

/// Error taxonomy for everything that can go wrong while handling a message.
///
/// None of these are fatal to a connection: the session boundary logs them
/// and drops the offending message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoverError {
    #[error("Out of range: power {value} for motor '{motor}' is outside [-1, 1]")]
    OutOfRange { motor: String, value: f64 },

    #[error("Invalid operation on {component}: {details}")]
    InvalidOperation { component: String, details: String },

    #[error("Unsupported operation on {component}: {details}")]
    Unsupported { component: String, details: String },

    #[error("Unknown message type: {0}")]
    UnknownMessageType(String),

    #[error("Malformed message: {0}")]
    Malformed(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl RoverError {
    /// Shorthand for an [`RoverError::InvalidOperation`].
    pub fn invalid(component: impl Into<String>, details: impl Into<String>) -> Self {
        RoverError::InvalidOperation {
            component: component.into(),
            details: details.into(),
        }
    }
}
