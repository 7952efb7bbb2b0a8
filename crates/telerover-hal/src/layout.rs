//! [`RoverLayout`] – which motors and cameras a rover is built from.
//!
//! The layout is plain data so it can be loaded from the `[rover]` table of
//! the server configuration file. [`RoverLayout::default`] describes the
//! stock rover: four skid-steer wheels, a three-joint arm, a differential
//! wrist and two cameras.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use telerover_types::RoverError;

/// One motor slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotorSpec {
    pub name: String,
    #[serde(default)]
    pub has_encoder: bool,
}

impl MotorSpec {
    pub fn new(name: impl Into<String>, has_encoder: bool) -> Self {
        Self {
            name: name.into(),
            has_encoder,
        }
    }
}

/// Two motors sharing one mechanism. Driving them with opposite signs rolls
/// the mechanism; equal signs pitch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifferentialSpec {
    pub roll_joint: String,
    pub pitch_joint: String,
    pub left_motor: String,
    pub right_motor: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoverLayout {
    pub motors: Vec<MotorSpec>,
    pub cameras: Vec<String>,
    /// Drive motors on the left side, all receiving the left wheel power.
    pub left_drive: Vec<String>,
    /// Drive motors on the right side.
    pub right_drive: Vec<String>,
    pub differential: Option<DifferentialSpec>,
}

impl Default for RoverLayout {
    fn default() -> Self {
        Self {
            motors: vec![
                MotorSpec::new("frontLeftWheel", false),
                MotorSpec::new("frontRightWheel", false),
                MotorSpec::new("rearLeftWheel", false),
                MotorSpec::new("rearRightWheel", false),
                MotorSpec::new("armBase", true),
                MotorSpec::new("shoulder", true),
                MotorSpec::new("elbow", true),
                MotorSpec::new("differentialLeft", true),
                MotorSpec::new("differentialRight", true),
            ],
            cameras: vec!["front".to_string(), "rear".to_string()],
            left_drive: vec!["frontLeftWheel".to_string(), "rearLeftWheel".to_string()],
            right_drive: vec!["frontRightWheel".to_string(), "rearRightWheel".to_string()],
            differential: Some(DifferentialSpec {
                roll_joint: "differentialRoll".to_string(),
                pitch_joint: "differentialPitch".to_string(),
                left_motor: "differentialLeft".to_string(),
                right_motor: "differentialRight".to_string(),
            }),
        }
    }
}

impl RoverLayout {
    /// Check that every name is unique and every referenced motor exists.
    ///
    /// # Errors
    ///
    /// [`RoverError::InvalidOperation`] naming the first offending entry.
    pub fn validate(&self) -> Result<(), RoverError> {
        let mut motors = HashSet::new();
        for spec in &self.motors {
            if !motors.insert(spec.name.as_str()) {
                return Err(RoverError::invalid("layout", format!("duplicate motor '{}'", spec.name)));
            }
        }

        let mut cameras = HashSet::new();
        for name in &self.cameras {
            if !cameras.insert(name.as_str()) {
                return Err(RoverError::invalid("layout", format!("duplicate camera '{name}'")));
            }
        }

        let mut referenced: Vec<&str> = self
            .left_drive
            .iter()
            .chain(&self.right_drive)
            .map(String::as_str)
            .collect();
        if let Some(diff) = &self.differential {
            if diff.roll_joint == diff.pitch_joint {
                return Err(RoverError::invalid(
                    "layout",
                    "differential roll and pitch joints must differ",
                ));
            }
            referenced.push(&diff.left_motor);
            referenced.push(&diff.right_motor);
        }
        for name in referenced {
            if !motors.contains(name) {
                return Err(RoverError::invalid("layout", format!("unknown motor '{name}'")));
            }
        }
        Ok(())
    }
}
