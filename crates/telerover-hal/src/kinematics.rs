//! Drive and joint kinematics on top of the [`Rover`] aggregate.
//!
//! # Skid-steer drive
//!
//! `drive(straight, steer)` maps to `left = straight + steer` and
//! `right = straight - steer`. When `|straight| + |steer| > 1` both inputs are
//! scaled by the same factor first, so no wheel power ever exceeds 1 and the
//! straight/steer ratio is preserved.
//!
//! # Joints
//!
//! A joint name normally addresses the motor of the same name. The two joints
//! of the differential pair are composite: roll drives the pair with opposite
//! signs, pitch with equal signs. Position control of the composite joints is
//! not supported.

use telerover_types::{Emitted, RoverError, RunMode};

use crate::rover::Rover;

/// Wheel powers for a skid-steer command, as `(left, right)`.
///
/// Non-finite inputs yield non-finite powers; [`Rover::drive`] rejects them.
pub fn wheel_powers(straight: f64, steer: f64) -> (f64, f64) {
    // Bring both inputs into [-1, 1] first so the magnitude cannot overflow.
    let largest = straight.abs().max(steer.abs());
    let (straight, steer) = if largest > 1.0 {
        (straight / largest, steer / largest)
    } else {
        (straight, steer)
    };
    let magnitude = straight.abs() + steer.abs();
    let left = straight + steer;
    let right = straight - steer;
    if magnitude > 1.0 {
        // Dividing the sums rather than the inputs keeps |result| <= 1 exact.
        (left / magnitude, right / magnitude)
    } else {
        (left, right)
    }
}

/// Which half of the differential pair a joint name addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Composite {
    Roll,
    Pitch,
}

impl Rover {
    /// Drive the rover with normalised straight and steer inputs.
    ///
    /// Every drive motor is forced into power mode. The command is applied
    /// to all drive motors or to none of them.
    ///
    /// # Errors
    ///
    /// [`RoverError::OutOfRange`] when an input is not finite;
    /// [`RoverError::InvalidOperation`] when a drive motor is missing.
    pub fn drive(&mut self, straight: f64, steer: f64) -> Result<Emitted, RoverError> {
        let (left, right) = wheel_powers(straight, steer);
        for power in [left, right] {
            if !power.is_finite() || power.abs() > 1.0 {
                return Err(RoverError::OutOfRange {
                    motor: "drive".to_string(),
                    value: power,
                });
            }
        }
        for name in self.left_drive.iter().chain(&self.right_drive) {
            self.motor(name)?;
        }

        let left_drive = self.left_drive.clone();
        let right_drive = self.right_drive.clone();
        let mut emitted = Vec::new();
        for name in &left_drive {
            emitted.extend(self.run_motor_with_power(name, left)?);
        }
        for name in &right_drive {
            emitted.extend(self.run_motor_with_power(name, right)?);
        }
        Ok(emitted)
    }

    /// Run `joint` with `power` in power mode.
    pub fn run_joint_with_power(&mut self, joint: &str, power: f64) -> Result<Emitted, RoverError> {
        let Some((composite, left_motor, right_motor)) = self.composite(joint) else {
            return self.run_motor_with_power(joint, power);
        };
        let (left, right) = match composite {
            Composite::Roll => (power, -power),
            Composite::Pitch => (power, power),
        };
        let mut emitted = self.run_motor_with_power(&left_motor, left)?;
        emitted.extend(self.run_motor_with_power(&right_motor, right)?);
        Ok(emitted)
    }

    /// Run `joint` to `position` in position mode.
    ///
    /// # Errors
    ///
    /// [`RoverError::Unsupported`] for the composite joints of the
    /// differential pair; [`RoverError::InvalidOperation`] for unknown or
    /// encoderless motors.
    pub fn run_joint_to_position(
        &mut self,
        joint: &str,
        position: f64,
    ) -> Result<Emitted, RoverError> {
        if self.composite(joint).is_some() {
            return Err(RoverError::Unsupported {
                component: joint.to_string(),
                details: "position control of a differential joint".to_string(),
            });
        }
        self.run_motor_to_position(joint, position)
    }

    /// Set a motor's target power, then force power mode.
    pub fn run_motor_with_power(&mut self, name: &str, power: f64) -> Result<Emitted, RoverError> {
        let motor = self.motor_mut(name)?;
        let mut emitted = motor.set_target_power(power)?;
        emitted.extend(motor.set_mode(RunMode::RunWithPower)?);
        Ok(emitted)
    }

    /// Set a motor's target position, then force position mode.
    pub fn run_motor_to_position(
        &mut self,
        name: &str,
        position: f64,
    ) -> Result<Emitted, RoverError> {
        let motor = self.motor_mut(name)?;
        let mut emitted = motor.set_target_position(position)?;
        emitted.extend(motor.set_mode(RunMode::RunToPosition)?);
        Ok(emitted)
    }

    /// Set a motor's target velocity, then force velocity mode.
    pub fn run_motor_with_velocity(
        &mut self,
        name: &str,
        velocity: f64,
    ) -> Result<Emitted, RoverError> {
        let motor = self.motor_mut(name)?;
        let mut emitted = motor.set_target_velocity(velocity)?;
        emitted.extend(motor.set_mode(RunMode::RunWithVelocity)?);
        Ok(emitted)
    }

    fn composite(&self, joint: &str) -> Option<(Composite, String, String)> {
        let diff = self.differential.as_ref()?;
        let composite = if joint == diff.roll_joint {
            Composite::Roll
        } else if joint == diff.pitch_joint {
            Composite::Pitch
        } else {
            return None;
        };
        Some((composite, diff.left_motor.clone(), diff.right_motor.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::layout::RoverLayout;
    use telerover_types::{BackendMessage, Outbound, Outbox, RecordingSink};

    const TOLERANCE: f64 = 1e-12;

    fn rover() -> (Rover, Arc<RecordingSink>) {
        let sink = RecordingSink::new();
        let rover = Rover::new(&RoverLayout::default(), Outbox::new(sink.clone())).unwrap();
        (rover, sink)
    }

    fn power_of(rover: &Rover, name: &str) -> f64 {
        rover.motor(name).unwrap().target_power()
    }

    #[test]
    fn small_inputs_are_not_rescaled() {
        let (left, right) = wheel_powers(0.3, 0.2);
        assert!((left - 0.5).abs() < TOLERANCE);
        assert!((right - 0.1).abs() < TOLERANCE);

        let (left, right) = wheel_powers(0.5, -0.5);
        assert!((left - 0.0).abs() < TOLERANCE);
        assert!((right - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn large_inputs_are_rescaled_preserving_ratio() {
        let (left, right) = wheel_powers(0.6, 0.6);
        assert!((left - 1.0).abs() < TOLERANCE);
        assert!(right.abs() < TOLERANCE);

        let (left, right) = wheel_powers(2.0, -1.0);
        assert!((left - 1.0 / 3.0).abs() < TOLERANCE);
        assert!((right - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn wheel_power_never_exceeds_one() {
        let samples = [-7.3, -1.0, -0.61, -0.2, 0.0, 0.1, 0.49, 0.9999, 1.0, 3.7, 1e9];
        for &straight in &samples {
            for &steer in &samples {
                let (left, right) = wheel_powers(straight, steer);
                assert!(left.abs() <= 1.0, "left {left} for ({straight}, {steer})");
                assert!(right.abs() <= 1.0, "right {right} for ({straight}, {steer})");
            }
        }
    }

    #[test]
    fn drive_sets_every_side_motor() {
        let (mut rover, sink) = rover();
        let emitted = rover.drive(0.6, 0.6).unwrap();

        assert_eq!(emitted.len(), 4);
        assert_eq!(sink.take(), emitted);
        assert!((power_of(&rover, "frontLeftWheel") - 1.0).abs() < TOLERANCE);
        assert!((power_of(&rover, "rearLeftWheel") - 1.0).abs() < TOLERANCE);
        assert!(power_of(&rover, "frontRightWheel").abs() < TOLERANCE);
        assert!(power_of(&rover, "rearRightWheel").abs() < TOLERANCE);
    }

    #[test]
    fn huge_finite_inputs_do_not_overflow() {
        let (left, right) = wheel_powers(1e308, -1e308);
        assert!(left.abs() < TOLERANCE);
        assert!((right - 1.0).abs() < TOLERANCE);

        let (left, right) = wheel_powers(f64::MAX, f64::MAX);
        assert!((left - 1.0).abs() < TOLERANCE);
        assert!(right.abs() < TOLERANCE);
    }

    #[test]
    fn huge_drive_command_moves_both_sides() {
        let (mut rover, _) = rover();
        let emitted = rover.drive(1e308, -1e308).unwrap();
        assert_eq!(emitted.len(), 4);
        assert!(power_of(&rover, "frontLeftWheel").abs() < TOLERANCE);
        assert!(power_of(&rover, "rearLeftWheel").abs() < TOLERANCE);
        assert!((power_of(&rover, "frontRightWheel") - 1.0).abs() < TOLERANCE);
        assert!((power_of(&rover, "rearRightWheel") - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn rejected_drive_leaves_every_wheel_untouched() {
        let (mut rover, sink) = rover();
        rover.drive(0.5, 0.0).unwrap();
        sink.take();

        for (straight, steer) in [
            (f64::INFINITY, 0.0),
            (f64::INFINITY, f64::NEG_INFINITY),
            (0.3, f64::NAN),
        ] {
            assert!(matches!(
                rover.drive(straight, steer),
                Err(RoverError::OutOfRange { .. })
            ));
        }

        assert!(sink.take().is_empty());
        for wheel in ["frontLeftWheel", "rearLeftWheel", "frontRightWheel", "rearRightWheel"] {
            assert!((power_of(&rover, wheel) - 0.5).abs() < TOLERANCE, "{wheel}");
        }
    }

    #[test]
    fn drive_with_missing_wheel_writes_nothing() {
        let (mut rover, sink) = rover();
        rover.right_drive.push("spareWheel".to_string());
        assert!(matches!(
            rover.drive(0.4, 0.0),
            Err(RoverError::InvalidOperation { .. })
        ));
        assert!(sink.take().is_empty());
        assert_eq!(power_of(&rover, "frontLeftWheel"), 0.0);
    }

    #[test]
    fn drive_with_nan_is_rejected() {
        let (mut rover, _) = rover();
        assert!(matches!(
            rover.drive(f64::NAN, 0.0),
            Err(RoverError::OutOfRange { .. })
        ));
    }

    #[test]
    fn plain_joint_maps_to_motor() {
        let (mut rover, _) = rover();
        let emitted = rover.run_joint_with_power("shoulder", -0.4).unwrap();
        assert_eq!(
            emitted,
            vec![Outbound::Backend(BackendMessage::SimMotorPowerRequest {
                motor: "shoulder".into(),
                power: -0.4,
            })]
        );
    }

    #[test]
    fn joint_power_leaves_position_mode_with_one_message() {
        let (mut rover, _) = rover();
        rover.run_joint_to_position("elbow", 15.0).unwrap();
        let emitted = rover.run_joint_with_power("elbow", 0.2).unwrap();
        assert_eq!(emitted.len(), 1);
        assert_eq!(rover.motor("elbow").unwrap().mode(), RunMode::RunWithPower);
    }

    #[test]
    fn differential_roll_uses_opposite_signs() {
        let (mut rover, _) = rover();
        rover.run_joint_with_power("differentialRoll", 0.5).unwrap();
        assert!((power_of(&rover, "differentialLeft") - 0.5).abs() < TOLERANCE);
        assert!((power_of(&rover, "differentialRight") + 0.5).abs() < TOLERANCE);
    }

    #[test]
    fn differential_pitch_uses_equal_signs() {
        let (mut rover, _) = rover();
        rover.run_joint_with_power("differentialPitch", -0.25).unwrap();
        assert!((power_of(&rover, "differentialLeft") + 0.25).abs() < TOLERANCE);
        assert!((power_of(&rover, "differentialRight") + 0.25).abs() < TOLERANCE);
    }

    #[test]
    fn differential_position_fails_fast() {
        let (mut rover, sink) = rover();
        for joint in ["differentialRoll", "differentialPitch"] {
            assert!(matches!(
                rover.run_joint_to_position(joint, 10.0),
                Err(RoverError::Unsupported { .. })
            ));
        }
        assert!(sink.take().is_empty());
    }

    #[test]
    fn joint_to_position_on_encoderless_motor_fails() {
        let (mut rover, _) = rover();
        assert!(matches!(
            rover.run_joint_to_position("frontLeftWheel", 10.0),
            Err(RoverError::InvalidOperation { .. })
        ));
        assert_eq!(
            rover.motor("frontLeftWheel").unwrap().mode(),
            RunMode::RunWithPower
        );
    }

    #[test]
    fn position_then_mode_emits_single_position_request() {
        let (mut rover, _) = rover();
        let emitted = rover.run_motor_to_position("armBase", 90.0).unwrap();
        assert_eq!(
            emitted,
            vec![Outbound::Backend(BackendMessage::SimMotorPositionRequest {
                motor: "armBase".into(),
                position: 90.0,
            })]
        );
    }

    #[test]
    fn velocity_then_mode_emits_single_velocity_request() {
        let (mut rover, _) = rover();
        let emitted = rover.run_motor_with_velocity("elbow", 12.5).unwrap();
        assert_eq!(
            emitted,
            vec![Outbound::Backend(BackendMessage::SimMotorVelocityRequest {
                motor: "elbow".into(),
                velocity: 12.5,
            })]
        );
        assert!(rover.run_motor_with_velocity("rearLeftWheel", 1.0).is_err());
    }
}
