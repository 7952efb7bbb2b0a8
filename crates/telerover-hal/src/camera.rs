//! [`Camera`] – stream state for one rover camera.
//!
//! The server holds at most one frame per camera: each new frame replaces the
//! previous one and is forwarded to Control straight away.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use telerover_types::{BackendMessage, ControlMessage, Emitted, Outbound, Outbox};

/// A virtual camera on the rover.
#[derive(Debug)]
pub struct Camera {
    name: String,
    stream_fps: f64,
    stream_width: u32,
    stream_height: u32,
    is_streaming: bool,
    stream_data: Option<Vec<u8>>,
    outbox: Outbox,
}

impl Camera {
    /// Create a camera that is not streaming and has no parameters yet.
    pub fn new(name: impl Into<String>, outbox: Outbox) -> Self {
        Self {
            name: name.into(),
            stream_fps: 0.0,
            stream_width: 0,
            stream_height: 0,
            is_streaming: false,
            stream_data: None,
            outbox,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stream_fps(&self) -> f64 {
        self.stream_fps
    }

    pub fn stream_width(&self) -> u32 {
        self.stream_width
    }

    pub fn stream_height(&self) -> u32 {
        self.stream_height
    }

    pub fn is_streaming(&self) -> bool {
        self.is_streaming
    }

    /// The most recent frame, if any.
    pub fn stream_data(&self) -> Option<&[u8]> {
        self.stream_data.as_deref()
    }

    /// Store new stream parameters. A live stream is updated in place on the
    /// Backend.
    pub fn set_stream_parameters(&mut self, fps: f64, width: u32, height: u32) -> Emitted {
        self.stream_fps = fps;
        self.stream_width = width;
        self.stream_height = height;
        if self.is_streaming {
            return vec![self.emit_open_request()];
        }
        Vec::new()
    }

    /// Ask the Backend to open or close the stream.
    ///
    /// Every write is forwarded, even when the value does not change.
    pub fn set_streaming(&mut self, streaming: bool) -> Emitted {
        self.is_streaming = streaming;
        let message = if streaming {
            self.emit_open_request()
        } else {
            self.outbox.emit(BackendMessage::SimCameraStreamCloseRequest {
                camera: self.name.clone(),
            })
        };
        vec![message]
    }

    /// Replace the current frame and report it to Control. `None` reports a
    /// `null` frame.
    pub fn set_frame(&mut self, frame: Option<Vec<u8>>) -> Emitted {
        self.stream_data = frame;
        let data = self.stream_data.as_ref().map(|bytes| STANDARD.encode(bytes));
        vec![self.outbox.emit(ControlMessage::CameraStreamReport {
            camera: self.name.clone(),
            data,
        })]
    }

    /// Re-open the stream on a freshly connected Backend.
    pub fn resync(&self) -> Emitted {
        if self.is_streaming {
            vec![self.emit_open_request()]
        } else {
            Vec::new()
        }
    }

    fn emit_open_request(&self) -> Outbound {
        self.outbox.emit(BackendMessage::SimCameraStreamOpenRequest {
            camera: self.name.clone(),
            fps: self.stream_fps,
            width: self.stream_width,
            height: self.stream_height,
        })
    }
}

/// Decode a base64 frame as sent by the Backend.
pub fn decode_frame(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(data)
}
