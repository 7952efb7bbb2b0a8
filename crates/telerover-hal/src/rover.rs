//! [`Rover`] – the aggregate that owns every piece of rover state.
//!
//! The rover is the only place where several entities are touched at once:
//! the emergency stop, and the resynchronisation steps that run when a peer
//! connects or leaves. Drive and joint kinematics live in
//! [`kinematics`][crate::kinematics].

use std::collections::BTreeMap;

use telerover_types::{Emitted, OperationMode, Outbox, RoverError};
use tracing::{debug, info};

use crate::camera::Camera;
use crate::layout::{DifferentialSpec, RoverLayout};
use crate::lidar::LidarSensor;
use crate::motor::Motor;

/// Virtual representation of the rover and its hardware.
#[derive(Debug)]
pub struct Rover {
    motors: BTreeMap<String, Motor>,
    cameras: BTreeMap<String, Camera>,
    lidar: LidarSensor,
    emergency_stopped: bool,
    operation_mode: OperationMode,
    pub(crate) left_drive: Vec<String>,
    pub(crate) right_drive: Vec<String>,
    pub(crate) differential: Option<DifferentialSpec>,
}

impl Rover {
    /// Build a rover from `layout`. Every entity emits through `outbox`.
    ///
    /// # Errors
    ///
    /// [`RoverError::InvalidOperation`] when the layout is inconsistent.
    pub fn new(layout: &RoverLayout, outbox: Outbox) -> Result<Self, RoverError> {
        layout.validate()?;
        let motors = layout
            .motors
            .iter()
            .map(|spec| {
                let motor = Motor::new(spec.name.clone(), spec.has_encoder, outbox.clone());
                (spec.name.clone(), motor)
            })
            .collect();
        let cameras = layout
            .cameras
            .iter()
            .map(|name| (name.clone(), Camera::new(name.clone(), outbox.clone())))
            .collect();
        Ok(Self {
            motors,
            cameras,
            lidar: LidarSensor::new(outbox),
            emergency_stopped: false,
            operation_mode: OperationMode::default(),
            left_drive: layout.left_drive.clone(),
            right_drive: layout.right_drive.clone(),
            differential: layout.differential.clone(),
        })
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    pub fn motor(&self, name: &str) -> Result<&Motor, RoverError> {
        self.motors
            .get(name)
            .ok_or_else(|| RoverError::invalid(name, "no such motor"))
    }

    pub fn motor_mut(&mut self, name: &str) -> Result<&mut Motor, RoverError> {
        self.motors
            .get_mut(name)
            .ok_or_else(|| RoverError::invalid(name, "no such motor"))
    }

    pub fn camera(&self, name: &str) -> Result<&Camera, RoverError> {
        self.cameras
            .get(name)
            .ok_or_else(|| RoverError::invalid(name, "no such camera"))
    }

    pub fn camera_mut(&mut self, name: &str) -> Result<&mut Camera, RoverError> {
        self.cameras
            .get_mut(name)
            .ok_or_else(|| RoverError::invalid(name, "no such camera"))
    }

    pub fn motors(&self) -> impl Iterator<Item = &Motor> {
        self.motors.values()
    }

    pub fn cameras(&self) -> impl Iterator<Item = &Camera> {
        self.cameras.values()
    }

    pub fn lidar(&self) -> &LidarSensor {
        &self.lidar
    }

    pub fn lidar_mut(&mut self) -> &mut LidarSensor {
        &mut self.lidar
    }

    // -----------------------------------------------------------------------
    // Global state
    // -----------------------------------------------------------------------

    pub fn emergency_stopped(&self) -> bool {
        self.emergency_stopped
    }

    /// Engage or release the emergency stop.
    ///
    /// Engaging zeroes every motor's target power and forces power mode,
    /// producing exactly one power request per motor. It does so on every
    /// engage, not only on the first.
    pub fn set_emergency_stopped(&mut self, stopped: bool) -> Emitted {
        self.emergency_stopped = stopped;
        if !stopped {
            info!("emergency stop released");
            return Vec::new();
        }

        info!(motors = self.motors.len(), "emergency stop engaged");
        let mut emitted = Vec::with_capacity(self.motors.len());
        for motor in self.motors.values_mut() {
            emitted.extend(motor.stop());
        }
        emitted
    }

    pub fn operation_mode(&self) -> OperationMode {
        self.operation_mode
    }

    pub fn set_operation_mode(&mut self, mode: OperationMode) {
        if mode != self.operation_mode {
            info!(from = ?self.operation_mode, to = ?mode, "operation mode changed");
        }
        self.operation_mode = mode;
    }

    // -----------------------------------------------------------------------
    // Connection lifecycle
    // -----------------------------------------------------------------------

    /// Control left: stop every stream so the Backend stops producing frames
    /// nobody receives.
    pub fn release_streams(&mut self) -> Emitted {
        self.cameras
            .values_mut()
            .flat_map(|camera| camera.set_streaming(false))
            .collect()
    }

    /// Backend connected: replay open streams and motor targets.
    pub fn resync_backend(&self) -> Emitted {
        let mut emitted: Emitted = self.cameras.values().flat_map(Camera::resync).collect();
        emitted.extend(self.motors.values().flat_map(Motor::resync));
        debug!(messages = emitted.len(), "backend resynchronised");
        emitted
    }

    /// Backend left: drop every stored frame and tell Control there is none.
    pub fn clear_frames(&mut self) -> Emitted {
        self.cameras
            .values_mut()
            .flat_map(|camera| camera.set_frame(None))
            .collect()
    }
}
