//! [`LidarSensor`] – latest scan of the planar ranging sensor.
//!
//! Scans are stored exactly as the sensor produces them (polar samples) and
//! projected to Cartesian coordinates only when reported to Control.

use telerover_types::{CartesianPoint, ControlMessage, Emitted, Outbox, PolarPoint};

/// Project a polar sample onto the sensor plane.
pub fn to_cartesian(point: PolarPoint) -> CartesianPoint {
    let (sin, cos) = point.theta.sin_cos();
    CartesianPoint {
        x: point.r * cos,
        y: point.r * sin,
    }
}

#[derive(Debug)]
pub struct LidarSensor {
    points: Vec<PolarPoint>,
    outbox: Outbox,
}

impl LidarSensor {
    pub fn new(outbox: Outbox) -> Self {
        Self {
            points: Vec::new(),
            outbox,
        }
    }

    /// The most recent scan in polar form.
    pub fn points(&self) -> &[PolarPoint] {
        &self.points
    }

    /// Replace the whole scan and report its projection to Control.
    pub fn set_points(&mut self, points: Vec<PolarPoint>) -> Emitted {
        self.points = points;
        let projected = self.points.iter().copied().map(to_cartesian).collect();
        vec![self.outbox.emit(ControlMessage::LidarReport { points: projected })]
    }
}
