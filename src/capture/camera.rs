use super::error::AcquireReason;
use super::types::{FrameBuffer, FrameDimensions, FrameStatus, StreamConstraints, StreamInfo};

/// Platform camera capability.
///
/// All methods block; callers run them on the blocking pool.
pub trait CameraBackend: Send + Sync + 'static {
    type Stream: FrameSource;

    /// Whether the platform exposes camera capture at all.
    fn is_supported(&self) -> bool;

    fn request_stream(&self, constraints: &StreamConstraints) -> Result<Self::Stream, AcquireReason>;
}

/// A live stream bound to a frame sink.
pub trait FrameSource: Send + Sync + 'static {
    fn describe(&self) -> StreamInfo;

    /// Native frame size, once the stream has reported it.
    fn dimensions(&self) -> Option<FrameDimensions>;

    /// Copy the current frame into `buffer`, resizing it to the native
    /// resolution. Returns [`FrameStatus::Pending`] when a full frame is not
    /// buffered yet.
    fn read_frame(&mut self, buffer: &mut FrameBuffer) -> FrameStatus;

    /// Release every track held by the stream.
    fn stop(&mut self);
}
