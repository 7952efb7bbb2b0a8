//! [`Motor`] – state machine for a single rover motor.
//!
//! A motor runs in one of three [`RunMode`]s. Target mutations forward the
//! new target to the Backend when it is relevant to the current mode, and
//! Backend-sourced readings are echoed to Control as a status report.
//!
//! Motors without an encoder can only run with power: every position or
//! velocity field, and every mode that needs one, is rejected with
//! [`RoverError::InvalidOperation`].

use telerover_types::{
    BackendMessage, ControlMessage, Emitted, Outbound, Outbox, RoverError, RunMode,
};

/// A virtual motor on the rover.
#[derive(Debug)]
pub struct Motor {
    name: String,
    has_encoder: bool,
    mode: RunMode,
    target_power: f64,
    current_power: f64,
    target_position: f64,
    current_position: f64,
    target_velocity: f64,
    current_velocity: f64,
    outbox: Outbox,
}

impl Motor {
    /// Create an idle motor in power mode with all targets at zero.
    pub fn new(name: impl Into<String>, has_encoder: bool, outbox: Outbox) -> Self {
        Self {
            name: name.into(),
            has_encoder,
            mode: RunMode::RunWithPower,
            target_power: 0.0,
            current_power: 0.0,
            target_position: 0.0,
            current_position: 0.0,
            target_velocity: 0.0,
            current_velocity: 0.0,
            outbox,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_encoder(&self) -> bool {
        self.has_encoder
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Power in [-1, 1] the motor is asked to run with.
    pub fn target_power(&self) -> f64 {
        self.target_power
    }

    /// Power as last reported by the Backend.
    pub fn current_power(&self) -> f64 {
        self.current_power
    }

    /// Position in degrees the motor is asked to reach.
    pub fn target_position(&self) -> Result<f64, RoverError> {
        self.ensure_encoder()?;
        Ok(self.target_position)
    }

    /// Position in degrees as last reported by the Backend.
    pub fn current_position(&self) -> Result<f64, RoverError> {
        self.ensure_encoder()?;
        Ok(self.current_position)
    }

    /// Velocity in degrees per second the motor is asked to hold.
    pub fn target_velocity(&self) -> Result<f64, RoverError> {
        self.ensure_encoder()?;
        Ok(self.target_velocity)
    }

    /// Velocity in degrees per second as last reported by the Backend.
    pub fn current_velocity(&self) -> Result<f64, RoverError> {
        self.ensure_encoder()?;
        Ok(self.current_velocity)
    }

    // -----------------------------------------------------------------------
    // Operator-side mutations
    // -----------------------------------------------------------------------

    /// Set the target power.
    ///
    /// # Errors
    ///
    /// [`RoverError::OutOfRange`] when `|power| > 1` or `power` is not a
    /// number. The stored target is left untouched.
    pub fn set_target_power(&mut self, power: f64) -> Result<Emitted, RoverError> {
        if power.is_nan() || power.abs() > 1.0 {
            return Err(RoverError::OutOfRange {
                motor: self.name.clone(),
                value: power,
            });
        }
        self.target_power = power;
        if self.mode == RunMode::RunWithPower {
            return Ok(vec![self.emit_power_request()]);
        }
        Ok(Vec::new())
    }

    /// Switch the run mode and push the target that belongs to the new mode.
    ///
    /// Setting the mode the motor is already in emits nothing.
    ///
    /// # Errors
    ///
    /// [`RoverError::InvalidOperation`] when the mode needs an encoder this
    /// motor does not have. The mode is left unchanged.
    pub fn set_mode(&mut self, mode: RunMode) -> Result<Emitted, RoverError> {
        if mode == self.mode {
            return Ok(Vec::new());
        }
        if mode.requires_encoder() {
            self.ensure_encoder()?;
        }
        self.mode = mode;
        Ok(vec![self.emit_mode_request()])
    }

    /// Set the target position. Forwarded immediately in position mode.
    pub fn set_target_position(&mut self, position: f64) -> Result<Emitted, RoverError> {
        self.ensure_encoder()?;
        self.target_position = position;
        if self.mode == RunMode::RunToPosition {
            return Ok(vec![self.emit_position_request()]);
        }
        Ok(Vec::new())
    }

    /// Set the target velocity. Forwarded immediately in velocity mode.
    pub fn set_target_velocity(&mut self, velocity: f64) -> Result<Emitted, RoverError> {
        self.ensure_encoder()?;
        self.target_velocity = velocity;
        if self.mode == RunMode::RunWithVelocity {
            return Ok(vec![self.emit_velocity_request()]);
        }
        Ok(Vec::new())
    }

    // -----------------------------------------------------------------------
    // Backend-side readings
    // -----------------------------------------------------------------------

    pub fn report_current_power(&mut self, power: f64) -> Emitted {
        self.current_power = power;
        vec![self.emit_status_report()]
    }

    pub fn report_current_position(&mut self, position: f64) -> Result<Emitted, RoverError> {
        self.ensure_encoder()?;
        self.current_position = position;
        Ok(vec![self.emit_status_report()])
    }

    pub fn report_current_velocity(&mut self, velocity: f64) -> Result<Emitted, RoverError> {
        self.ensure_encoder()?;
        self.current_velocity = velocity;
        Ok(vec![self.emit_status_report()])
    }

    /// Zero the target power and force power mode, emitting exactly one
    /// power request. Cannot fail: zero is in range and power mode needs no
    /// encoder.
    pub fn stop(&mut self) -> Emitted {
        self.target_power = 0.0;
        self.mode = RunMode::RunWithPower;
        vec![self.emit_power_request()]
    }

    /// Re-send the commands a freshly connected Backend needs to match this
    /// motor: the target power always, plus the mode-specific target.
    pub fn resync(&self) -> Emitted {
        let mut emitted = vec![self.emit_power_request()];
        if self.mode != RunMode::RunWithPower {
            emitted.push(self.emit_mode_request());
        }
        emitted
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    fn ensure_encoder(&self) -> Result<(), RoverError> {
        if self.has_encoder {
            Ok(())
        } else {
            Err(RoverError::invalid(&self.name, "motor has no encoder"))
        }
    }

    fn emit_mode_request(&self) -> Outbound {
        match self.mode {
            RunMode::RunWithPower => self.emit_power_request(),
            RunMode::RunToPosition => self.emit_position_request(),
            RunMode::RunWithVelocity => self.emit_velocity_request(),
        }
    }

    fn emit_power_request(&self) -> Outbound {
        self.outbox.emit(BackendMessage::SimMotorPowerRequest {
            motor: self.name.clone(),
            power: self.target_power,
        })
    }

    fn emit_position_request(&self) -> Outbound {
        self.outbox.emit(BackendMessage::SimMotorPositionRequest {
            motor: self.name.clone(),
            position: self.target_position,
        })
    }

    fn emit_velocity_request(&self) -> Outbound {
        self.outbox.emit(BackendMessage::SimMotorVelocityRequest {
            motor: self.name.clone(),
            velocity: self.target_velocity,
        })
    }

    fn emit_status_report(&self) -> Outbound {
        let (position, velocity) = if self.has_encoder {
            (Some(self.current_position), Some(self.current_velocity))
        } else {
            (None, None)
        };
        self.outbox.emit(ControlMessage::MotorStatusReport {
            motor: self.name.clone(),
            power: self.current_power,
            position,
            velocity,
        })
    }
}
