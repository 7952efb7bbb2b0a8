//! Message dispatch: decoded requests → rover operations.
//!
//! Control and Backend traffic have separate handler tables
//! ([`handle_control`] and [`handle_backend`]); both are exhaustive matches
//! over the closed message enums, so a new message type cannot be added
//! without a handler.
//!
//! [`dispatch`] is the boundary that never fails: it decodes a raw frame,
//! runs the handler, and logs (then drops) anything that goes wrong.

use telerover_hal::Rover;
use telerover_hal::camera::decode_frame;
use telerover_types::{
    BackendReport, Channel, ControlRequest, Emitted, Inbound, RoverError,
};
use tracing::{debug, warn};

/// Route one Control command to the rover.
///
/// Motion commands are accepted but have no effect while the emergency stop
/// is engaged.
pub fn handle_control(rover: &mut Rover, request: ControlRequest) -> Result<Emitted, RoverError> {
    if request.is_motion() && rover.emergency_stopped() {
        debug!(kind = request.discriminator(), "emergency stop engaged; motion command dropped");
        return Ok(Vec::new());
    }

    match request {
        ControlRequest::OperationModeRequest { mode } => {
            rover.set_operation_mode(mode);
            Ok(Vec::new())
        }
        ControlRequest::EmergencyStopRequest { stop } => Ok(rover.set_emergency_stopped(stop)),
        ControlRequest::DriveRequest { straight, steer } => rover.drive(straight, steer),
        ControlRequest::MotorPowerRequest { motor, power } => {
            rover.run_motor_with_power(&motor, power)
        }
        ControlRequest::MotorPositionRequest { motor, position } => {
            rover.run_motor_to_position(&motor, position)
        }
        ControlRequest::MotorVelocityRequest { motor, velocity } => {
            rover.run_motor_with_velocity(&motor, velocity)
        }
        ControlRequest::JointPowerRequest { joint, power } => {
            rover.run_joint_with_power(&joint, power)
        }
        ControlRequest::JointPositionRequest { joint, position } => {
            rover.run_joint_to_position(&joint, position)
        }
        ControlRequest::CameraStreamOpenRequest {
            camera,
            fps,
            width,
            height,
        } => {
            let camera = rover.camera_mut(&camera)?;
            let mut emitted = camera.set_stream_parameters(fps, width, height);
            emitted.extend(camera.set_streaming(true));
            Ok(emitted)
        }
        ControlRequest::CameraStreamCloseRequest { camera } => {
            Ok(rover.camera_mut(&camera)?.set_streaming(false))
        }
    }
}

/// Route one Backend report to the rover.
pub fn handle_backend(rover: &mut Rover, report: BackendReport) -> Result<Emitted, RoverError> {
    match report {
        BackendReport::SimMotorStatusReport {
            motor,
            power,
            position,
            velocity,
        } => {
            let motor = rover.motor_mut(&motor)?;
            let mut emitted = Vec::new();
            if let Some(power) = power {
                emitted.extend(motor.report_current_power(power));
            }
            if let Some(position) = position {
                emitted.extend(motor.report_current_position(position)?);
            }
            if let Some(velocity) = velocity {
                emitted.extend(motor.report_current_velocity(velocity)?);
            }
            Ok(emitted)
        }
        BackendReport::SimCameraStreamReport { camera, data } => {
            let frame = match data {
                Some(encoded) => Some(decode_frame(&encoded).map_err(|e| {
                    RoverError::Malformed(format!("camera '{camera}' frame is not base64: {e}"))
                })?),
                None => None,
            };
            Ok(rover.camera_mut(&camera)?.set_frame(frame))
        }
        BackendReport::SimLidarReport { points } => Ok(rover.lidar_mut().set_points(points)),
    }
}

/// Decode and handle one raw text frame received on `channel`.
///
/// Never fails: unknown message types, malformed bodies and rejected
/// mutations are logged and the frame is dropped.
pub fn dispatch(rover: &mut Rover, channel: Channel, text: &str) -> Emitted {
    let result = match channel {
        Channel::Control => ControlRequest::decode(text).and_then(|request| {
            debug!(%channel, kind = request.discriminator(), "handling message");
            handle_control(rover, request)
        }),
        Channel::Backend => BackendReport::decode(text).and_then(|report| {
            debug!(%channel, kind = report.discriminator(), "handling message");
            handle_backend(rover, report)
        }),
    };

    match result {
        Ok(emitted) => emitted,
        Err(RoverError::UnknownMessageType(kind)) => {
            warn!(%channel, kind = %kind, "unknown message type");
            Vec::new()
        }
        Err(e) => {
            warn!(%channel, error = %e, "message dropped");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use telerover_hal::RoverLayout;
    use telerover_types::{
        BackendMessage, ControlMessage, OperationMode, Outbound, Outbox, RecordingSink, RunMode,
    };

    fn rover() -> (Rover, Arc<RecordingSink>) {
        let sink = RecordingSink::new();
        let rover = Rover::new(&RoverLayout::default(), Outbox::new(sink.clone())).unwrap();
        (rover, sink)
    }

    #[test]
    fn drive_request_reaches_wheels() {
        let (mut rover, sink) = rover();
        let emitted = dispatch(
            &mut rover,
            Channel::Control,
            r#"{"type":"driveRequest","straight":0.6,"steer":0.6}"#,
        );
        assert_eq!(emitted.len(), 4);
        assert_eq!(sink.take().len(), 4);
        assert!((rover.motor("frontLeftWheel").unwrap().target_power() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn motor_power_request_forces_power_mode() {
        let (mut rover, _) = rover();
        dispatch(
            &mut rover,
            Channel::Control,
            r#"{"type":"motorPositionRequest","motor":"elbow","position":40}"#,
        );
        assert_eq!(rover.motor("elbow").unwrap().mode(), RunMode::RunToPosition);

        let emitted = dispatch(
            &mut rover,
            Channel::Control,
            r#"{"type":"motorPowerRequest","motor":"elbow","power":-0.3}"#,
        );
        assert_eq!(
            emitted,
            vec![Outbound::Backend(BackendMessage::SimMotorPowerRequest {
                motor: "elbow".into(),
                power: -0.3,
            })]
        );
        assert_eq!(rover.motor("elbow").unwrap().mode(), RunMode::RunWithPower);
    }

    #[test]
    fn motor_velocity_request_reads_velocity_field() {
        let (mut rover, _) = rover();
        let emitted = dispatch(
            &mut rover,
            Channel::Control,
            r#"{"type":"motorVelocityRequest","motor":"shoulder","velocity":20}"#,
        );
        assert_eq!(
            emitted,
            vec![Outbound::Backend(BackendMessage::SimMotorVelocityRequest {
                motor: "shoulder".into(),
                velocity: 20.0,
            })]
        );
    }

    #[test]
    fn out_of_range_power_is_dropped_without_state_change() {
        let (mut rover, sink) = rover();
        let emitted = dispatch(
            &mut rover,
            Channel::Control,
            r#"{"type":"motorPowerRequest","motor":"elbow","power":1.5}"#,
        );
        assert!(emitted.is_empty());
        assert!(sink.take().is_empty());
        assert_eq!(rover.motor("elbow").unwrap().target_power(), 0.0);
    }

    #[test]
    fn unknown_type_and_unknown_names_are_non_fatal() {
        let (mut rover, sink) = rover();
        assert!(dispatch(&mut rover, Channel::Control, r#"{"type":"warpRequest"}"#).is_empty());
        assert!(dispatch(
            &mut rover,
            Channel::Control,
            r#"{"type":"motorPowerRequest","motor":"tail","power":0.1}"#
        )
        .is_empty());
        assert!(dispatch(
            &mut rover,
            Channel::Control,
            r#"{"type":"cameraStreamCloseRequest","camera":"thermal"}"#
        )
        .is_empty());
        assert!(dispatch(&mut rover, Channel::Backend, "{").is_empty());
        assert!(sink.take().is_empty());
    }

    #[test]
    fn backend_types_are_unknown_on_control_channel() {
        let (mut rover, sink) = rover();
        let emitted = dispatch(
            &mut rover,
            Channel::Control,
            r#"{"type":"simLidarReport","points":[{"r":1,"theta":0}]}"#,
        );
        assert!(emitted.is_empty());
        assert!(sink.take().is_empty());
        assert!(rover.lidar().points().is_empty());
    }

    #[test]
    fn emergency_stop_suppresses_motion_commands() {
        let (mut rover, sink) = rover();
        let stop = dispatch(
            &mut rover,
            Channel::Control,
            r#"{"type":"emergencyStopRequest","stop":true}"#,
        );
        assert_eq!(stop.len(), 9);
        sink.take();

        let motion = [
            r#"{"type":"driveRequest","straight":1,"steer":0}"#,
            r#"{"type":"motorPowerRequest","motor":"elbow","power":0.5}"#,
            r#"{"type":"motorPositionRequest","motor":"elbow","position":10}"#,
            r#"{"type":"motorVelocityRequest","motor":"elbow","velocity":10}"#,
            r#"{"type":"jointPowerRequest","joint":"differentialRoll","power":0.5}"#,
            r#"{"type":"jointPositionRequest","joint":"shoulder","position":10}"#,
        ];
        for text in motion {
            assert!(dispatch(&mut rover, Channel::Control, text).is_empty(), "{text}");
        }
        assert!(sink.take().is_empty());
        for motor in rover.motors() {
            assert_eq!(motor.target_power(), 0.0);
            assert_eq!(motor.mode(), RunMode::RunWithPower);
        }
        assert_eq!(rover.motor("elbow").unwrap().target_position().unwrap(), 0.0);
    }

    #[test]
    fn camera_commands_still_work_during_emergency_stop() {
        let (mut rover, _) = rover();
        dispatch(
            &mut rover,
            Channel::Control,
            r#"{"type":"emergencyStopRequest","stop":true}"#,
        );
        let emitted = dispatch(
            &mut rover,
            Channel::Control,
            r#"{"type":"cameraStreamOpenRequest","camera":"front","fps":30,"width":500,"height":250}"#,
        );
        assert_eq!(
            emitted,
            vec![Outbound::Backend(BackendMessage::SimCameraStreamOpenRequest {
                camera: "front".into(),
                fps: 30.0,
                width: 500,
                height: 250,
            })]
        );
    }

    #[test]
    fn releasing_emergency_stop_restores_motion() {
        let (mut rover, _) = rover();
        dispatch(&mut rover, Channel::Control, r#"{"type":"emergencyStopRequest","stop":true}"#);
        dispatch(&mut rover, Channel::Control, r#"{"type":"emergencyStopRequest","stop":false}"#);
        let emitted = dispatch(
            &mut rover,
            Channel::Control,
            r#"{"type":"jointPowerRequest","joint":"armBase","power":0.5}"#,
        );
        assert_eq!(emitted.len(), 1);
    }

    #[test]
    fn operation_mode_request_switches_mode() {
        let (mut rover, _) = rover();
        dispatch(
            &mut rover,
            Channel::Control,
            r#"{"type":"operationModeRequest","mode":"autonomous"}"#,
        );
        assert_eq!(rover.operation_mode(), OperationMode::Autonomous);
    }

    #[test]
    fn differential_position_request_is_dropped() {
        let (mut rover, sink) = rover();
        let emitted = dispatch(
            &mut rover,
            Channel::Control,
            r#"{"type":"jointPositionRequest","joint":"differentialPitch","position":10}"#,
        );
        assert!(emitted.is_empty());
        assert!(sink.take().is_empty());
    }

    #[test]
    fn motor_status_report_emits_one_report_per_field() {
        let (mut rover, _) = rover();
        let emitted = dispatch(
            &mut rover,
            Channel::Backend,
            r#"{"type":"simMotorStatusReport","motor":"elbow","power":0.2,"position":33,"velocity":4}"#,
        );
        assert_eq!(emitted.len(), 3);
        assert_eq!(
            emitted[2],
            Outbound::Control(ControlMessage::MotorStatusReport {
                motor: "elbow".into(),
                power: 0.2,
                position: Some(33.0),
                velocity: Some(4.0),
            })
        );
    }

    #[test]
    fn encoderless_position_report_keeps_earlier_fields() {
        let (mut rover, _) = rover();
        let emitted = dispatch(
            &mut rover,
            Channel::Backend,
            r#"{"type":"simMotorStatusReport","motor":"rearLeftWheel","power":0.7,"position":3}"#,
        );
        assert!(emitted.is_empty(), "errors are swallowed at the boundary");
        assert!((rover.motor("rearLeftWheel").unwrap().current_power() - 0.7).abs() < 1e-12);
    }

    #[test]
    fn camera_frame_is_relayed_to_control() {
        let (mut rover, sink) = rover();
        let emitted = dispatch(
            &mut rover,
            Channel::Backend,
            r#"{"type":"simCameraStreamReport","camera":"front","data":"/9j/"}"#,
        );
        assert_eq!(
            emitted,
            vec![Outbound::Control(ControlMessage::CameraStreamReport {
                camera: "front".into(),
                data: Some("/9j/".into()),
            })]
        );
        assert_eq!(sink.take_for(Channel::Control).len(), 1);
        assert_eq!(
            rover.camera("front").unwrap().stream_data(),
            Some(&[0xff, 0xd8, 0xff][..])
        );
    }

    #[test]
    fn invalid_base64_frame_is_dropped() {
        let (mut rover, _) = rover();
        rover.camera_mut("front").unwrap().set_frame(Some(vec![9]));
        let emitted = dispatch(
            &mut rover,
            Channel::Backend,
            r#"{"type":"simCameraStreamReport","camera":"front","data":"%%%"}"#,
        );
        assert!(emitted.is_empty());
        assert_eq!(rover.camera("front").unwrap().stream_data(), Some(&[9][..]));
    }

    #[test]
    fn lidar_report_is_projected() {
        let (mut rover, _) = rover();
        let emitted = dispatch(
            &mut rover,
            Channel::Backend,
            r#"{"type":"simLidarReport","points":[{"r":2,"theta":0}]}"#,
        );
        let Outbound::Control(ControlMessage::LidarReport { points }) = &emitted[0] else {
            panic!("expected lidar report, got {emitted:?}");
        };
        assert!((points[0].x - 2.0).abs() < 1e-12);
        assert!(points[0].y.abs() < 1e-12);
        assert_eq!(rover.lidar().points().len(), 1);
    }
}
