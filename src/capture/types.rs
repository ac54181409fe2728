use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::decode::InversionMode;

use super::error::CaptureFailure;

/// Tunables for a capture session.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Resolution asked for on the first (preferred) stream request.
    pub target_width: u32,
    pub target_height: u32,
    /// Upper bound on waiting for the stream to report frame dimensions.
    /// Some platforms never report them but still deliver frames.
    pub metadata_timeout: Duration,
    pub metadata_poll_interval: Duration,
    /// One sample per display refresh.
    pub sample_interval: Duration,
    pub inversion: InversionMode,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            target_width: 1280,
            target_height: 720,
            metadata_timeout: Duration::from_millis(3000),
            metadata_poll_interval: Duration::from_millis(50),
            sample_interval: Duration::from_millis(16),
            inversion: InversionMode::DontInvert,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FacingMode {
    /// Rear camera on phones.
    Environment,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamConstraints {
    Preferred {
        facing: FacingMode,
        width: u32,
        height: u32,
    },
    /// Whatever camera the platform hands out first.
    Any,
}

impl StreamConstraints {
    pub fn preferred(config: &CaptureConfig) -> Self {
        StreamConstraints::Preferred {
            facing: FacingMode::Environment,
            width: config.target_width,
            height: config.target_height,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct FrameDimensions {
    pub width: u32,
    pub height: u32,
}

/// What a stream reports about itself once acquired.
#[derive(Debug, Clone, Default)]
pub struct StreamInfo {
    pub label: String,
    pub track_count: usize,
    pub settings: Option<FrameDimensions>,
}

/// RGBA scratch buffer reused across samples. Reallocated only when the
/// native frame size changes.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resize(&mut self, dims: FrameDimensions) {
        if dims.width == self.width && dims.height == self.height {
            return;
        }
        self.width = dims.width;
        self.height = dims.height;
        self.pixels = vec![0; dims.width as usize * dims.height as usize * 4];
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// The buffer holds a full frame.
    Ready,
    /// Not enough data buffered yet; try again next tick.
    Pending,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum PermissionState {
    #[default]
    Unrequested,
    Granted,
    Denied,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    #[default]
    Idle,
    Starting,
    Active,
    PermissionDenied,
    Unsupported,
    Decoded,
    Stopped,
}

/// Observable view of the current session, kept in a watch channel.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub session_id: Option<String>,
    pub phase: SessionPhase,
    pub permission: PermissionState,
    pub frames_sampled: u64,
    pub error: Option<CaptureFailure>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CaptureEvent {
    #[serde(rename_all = "camelCase")]
    PhaseChanged {
        session_id: String,
        phase: SessionPhase,
        permission: PermissionState,
    },
    #[serde(rename_all = "camelCase")]
    Diagnostic { session_id: String, message: String },
    #[serde(rename_all = "camelCase")]
    Decoded { session_id: String, payload: String },
    #[serde(rename_all = "camelCase")]
    Failed {
        session_id: String,
        error: CaptureFailure,
    },
}
