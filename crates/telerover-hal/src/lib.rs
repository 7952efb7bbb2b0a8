//! `telerover-hal` – the rover's canonical in-memory state.
//!
//! Each entity controller owns one slice of state, validates mutations, and
//! emits the messages that describe the new state through the
//! [`Outbox`][telerover_types::Outbox] it was built with:
//!
//! - [`motor`] – [`Motor`]: power / position / velocity state machine.
//! - [`camera`] – [`Camera`]: stream parameters and the latest frame.
//! - [`lidar`] – [`LidarSensor`]: the latest polar scan.
//! - [`rover`] – [`Rover`]: the aggregate, emergency stop, and
//!   reconnect resynchronisation.
//! - [`kinematics`] – skid-steer drive and (composite) joint control.
//! - [`layout`] – [`RoverLayout`]: which entities a rover is built from.

pub mod camera;
pub mod kinematics;
pub mod layout;
pub mod lidar;
pub mod motor;
pub mod rover;

pub use camera::Camera;
pub use layout::{DifferentialSpec, MotorSpec, RoverLayout};
pub use lidar::LidarSensor;
pub use motor::Motor;
pub use rover::Rover;
