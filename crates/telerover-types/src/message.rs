//! Typed wire protocol.
//!
//! Every frame on either channel is a JSON object whose `type` field names
//! the message. Each direction has its own closed enum so that handlers are
//! matched exhaustively at compile time:
//!
//! | Enum | Direction |
//! |---|---|
//! | [`ControlRequest`] | Control → server |
//! | [`BackendReport`] | Backend → server |
//! | [`ControlMessage`] | server → Control |
//! | [`BackendMessage`] | server → Backend |

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{Channel, OperationMode, RoverError};

/// One ranging sample in sensor-native polar form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolarPoint {
    /// Range in metres.
    pub r: f64,
    /// Bearing in radians.
    pub theta: f64,
}

/// One ranging sample projected onto the sensor plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CartesianPoint {
    pub x: f64,
    pub y: f64,
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// A message type that can arrive on a channel.
pub trait Inbound: DeserializeOwned {
    /// Every `type` value this enum understands.
    const DISCRIMINATORS: &'static [&'static str];

    /// The `type` value of this message.
    fn discriminator(&self) -> &'static str;

    /// Decode a raw text frame.
    ///
    /// # Errors
    ///
    /// * [`RoverError::Malformed`] – the frame is not a JSON object with a
    ///   string `type`, or a known `type` has a bad body.
    /// * [`RoverError::UnknownMessageType`] – the `type` is not one of
    ///   [`Inbound::DISCRIMINATORS`].
    fn decode(text: &str) -> Result<Self, RoverError> {
        let document: Value = serde_json::from_str(text)
            .map_err(|e| RoverError::Malformed(format!("not a JSON document: {e}")))?;
        let kind = match document.get("type").and_then(Value::as_str) {
            Some(kind) => kind.to_string(),
            None => return Err(RoverError::Malformed("missing string field `type`".into())),
        };
        if !Self::DISCRIMINATORS.contains(&kind.as_str()) {
            return Err(RoverError::UnknownMessageType(kind));
        }
        serde_json::from_value(document).map_err(|e| RoverError::Malformed(format!("{kind}: {e}")))
    }
}

/// Commands sent by the operator console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ControlRequest {
    OperationModeRequest { mode: OperationMode },
    EmergencyStopRequest { stop: bool },
    DriveRequest { straight: f64, steer: f64 },
    MotorPowerRequest { motor: String, power: f64 },
    MotorPositionRequest { motor: String, position: f64 },
    MotorVelocityRequest { motor: String, velocity: f64 },
    JointPowerRequest { joint: String, power: f64 },
    JointPositionRequest { joint: String, position: f64 },
    CameraStreamOpenRequest {
        camera: String,
        fps: f64,
        #[serde(deserialize_with = "dimension")]
        width: u32,
        #[serde(deserialize_with = "dimension")]
        height: u32,
    },
    CameraStreamCloseRequest { camera: String },
}

/// Accept a pixel dimension written either as an integer or as a float
/// with no fractional part (`500` or `500.0`).
fn dimension<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&value) {
        Ok(value as u32)
    } else {
        Err(D::Error::custom(format!(
            "expected a non-negative whole number of pixels, got {value}"
        )))
    }
}

impl ControlRequest {
    /// Whether this command moves an actuator. Motion commands are dropped
    /// while the emergency stop is engaged.
    pub fn is_motion(&self) -> bool {
        matches!(
            self,
            ControlRequest::DriveRequest { .. }
                | ControlRequest::MotorPowerRequest { .. }
                | ControlRequest::MotorPositionRequest { .. }
                | ControlRequest::MotorVelocityRequest { .. }
                | ControlRequest::JointPowerRequest { .. }
                | ControlRequest::JointPositionRequest { .. }
        )
    }
}

impl Inbound for ControlRequest {
    const DISCRIMINATORS: &'static [&'static str] = &[
        "operationModeRequest",
        "emergencyStopRequest",
        "driveRequest",
        "motorPowerRequest",
        "motorPositionRequest",
        "motorVelocityRequest",
        "jointPowerRequest",
        "jointPositionRequest",
        "cameraStreamOpenRequest",
        "cameraStreamCloseRequest",
    ];

    fn discriminator(&self) -> &'static str {
        match self {
            ControlRequest::OperationModeRequest { .. } => "operationModeRequest",
            ControlRequest::EmergencyStopRequest { .. } => "emergencyStopRequest",
            ControlRequest::DriveRequest { .. } => "driveRequest",
            ControlRequest::MotorPowerRequest { .. } => "motorPowerRequest",
            ControlRequest::MotorPositionRequest { .. } => "motorPositionRequest",
            ControlRequest::MotorVelocityRequest { .. } => "motorVelocityRequest",
            ControlRequest::JointPowerRequest { .. } => "jointPowerRequest",
            ControlRequest::JointPositionRequest { .. } => "jointPositionRequest",
            ControlRequest::CameraStreamOpenRequest { .. } => "cameraStreamOpenRequest",
            ControlRequest::CameraStreamCloseRequest { .. } => "cameraStreamCloseRequest",
        }
    }
}

/// Telemetry sent by the hardware or simulation backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BackendReport {
    SimMotorStatusReport {
        motor: String,
        #[serde(default)]
        power: Option<f64>,
        #[serde(default)]
        position: Option<f64>,
        #[serde(default)]
        velocity: Option<f64>,
    },
    SimCameraStreamReport {
        camera: String,
        /// Base64-encoded frame, or `null` for "no current frame".
        #[serde(default)]
        data: Option<String>,
    },
    SimLidarReport { points: Vec<PolarPoint> },
}

impl Inbound for BackendReport {
    const DISCRIMINATORS: &'static [&'static str] = &[
        "simMotorStatusReport",
        "simCameraStreamReport",
        "simLidarReport",
    ];

    fn discriminator(&self) -> &'static str {
        match self {
            BackendReport::SimMotorStatusReport { .. } => "simMotorStatusReport",
            BackendReport::SimCameraStreamReport { .. } => "simCameraStreamReport",
            BackendReport::SimLidarReport { .. } => "simLidarReport",
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Telemetry pushed to the operator console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ControlMessage {
    /// `position` and `velocity` are `null` for motors without an encoder.
    MotorStatusReport {
        motor: String,
        power: f64,
        position: Option<f64>,
        velocity: Option<f64>,
    },
    CameraStreamReport { camera: String, data: Option<String> },
    LidarReport { points: Vec<CartesianPoint> },
    MountedPeripheralReport { peripheral: String },
}

/// Commands pushed to the hardware or simulation backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BackendMessage {
    SimMotorPowerRequest { motor: String, power: f64 },
    SimMotorPositionRequest { motor: String, position: f64 },
    SimMotorVelocityRequest { motor: String, velocity: f64 },
    /// Opens a stream, or updates the parameters of an open one.
    SimCameraStreamOpenRequest {
        camera: String,
        fps: f64,
        width: u32,
        height: u32,
    },
    SimCameraStreamCloseRequest { camera: String },
}

/// A server-originated message together with its destination.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outbound {
    Control(ControlMessage),
    Backend(BackendMessage),
}

impl Outbound {
    /// The channel this message is addressed to.
    pub fn channel(&self) -> Channel {
        match self {
            Outbound::Control(_) => Channel::Control,
            Outbound::Backend(_) => Channel::Backend,
        }
    }

    /// Serialize to the JSON text sent on the wire.
    pub fn to_json(&self) -> Result<String, RoverError> {
        serde_json::to_string(self).map_err(|e| RoverError::Malformed(e.to_string()))
    }
}

impl From<ControlMessage> for Outbound {
    fn from(message: ControlMessage) -> Self {
        Outbound::Control(message)
    }
}

impl From<BackendMessage> for Outbound {
    fn from(message: BackendMessage) -> Self {
        Outbound::Backend(message)
    }
}
