//! The camera the app actually ships with.
//!
//! Desktop builds with `native-camera` (the default) read frames through
//! `nokhwa`. Elsewhere the platform reports no capture capability and every
//! session ends in `Unsupported`.

#[cfg(all(
    feature = "native-camera",
    not(any(target_os = "android", target_os = "ios"))
))]
pub use native::NativeCamera as PlatformCamera;

#[cfg(not(all(
    feature = "native-camera",
    not(any(target_os = "android", target_os = "ios"))
)))]
pub use unavailable::UnavailableCamera as PlatformCamera;

#[cfg(not(all(
    feature = "native-camera",
    not(any(target_os = "android", target_os = "ios"))
)))]
mod unavailable {
    use crate::capture::camera::{CameraBackend, FrameSource};
    use crate::capture::error::AcquireReason;
    use crate::capture::types::{
        FrameBuffer, FrameDimensions, FrameStatus, StreamConstraints, StreamInfo,
    };

    #[derive(Debug, Default)]
    pub struct UnavailableCamera;

    impl UnavailableCamera {
        pub fn new() -> Self {
            Self
        }
    }

    impl CameraBackend for UnavailableCamera {
        type Stream = NoStream;

        fn is_supported(&self) -> bool {
            false
        }

        fn request_stream(&self, _constraints: &StreamConstraints) -> Result<NoStream, AcquireReason> {
            Err(AcquireReason::DeviceNotFound)
        }
    }

    /// Cannot be constructed.
    pub enum NoStream {}

    impl FrameSource for NoStream {
        fn describe(&self) -> StreamInfo {
            match *self {}
        }

        fn dimensions(&self) -> Option<FrameDimensions> {
            match *self {}
        }

        fn read_frame(&mut self, _buffer: &mut FrameBuffer) -> FrameStatus {
            match *self {}
        }

        fn stop(&mut self) {
            match *self {}
        }
    }
}

#[cfg(all(
    feature = "native-camera",
    not(any(target_os = "android", target_os = "ios"))
))]
mod native {
    use std::sync::mpsc::{self, RecvTimeoutError, Sender, SyncSender};
    use std::thread::{self, JoinHandle};
    use std::time::Duration;

    use log::{debug, info, warn};
    use nokhwa::pixel_format::RgbAFormat;
    use nokhwa::utils::{
        ApiBackend, CameraFormat, CameraIndex, CameraInfo, FrameFormat, RequestedFormat,
        RequestedFormatType, Resolution,
    };
    use nokhwa::{Camera, NokhwaError};

    use crate::capture::camera::{CameraBackend, FrameSource};
    use crate::capture::error::AcquireReason;
    use crate::capture::types::{
        FacingMode, FrameBuffer, FrameDimensions, FrameStatus, StreamConstraints, StreamInfo,
    };

    type RawFrame = (FrameDimensions, Vec<u8>);

    /// How long the OS permission prompt may stay unanswered.
    const PERMISSION_PROMPT_TIMEOUT: Duration = Duration::from_secs(120);

    enum CameraCommand {
        Frame(SyncSender<Option<RawFrame>>),
        Stop,
    }

    #[derive(Debug, Default)]
    pub struct NativeCamera;

    impl NativeCamera {
        pub fn new() -> Self {
            Self
        }
    }

    impl CameraBackend for NativeCamera {
        type Stream = NativeStream;

        fn is_supported(&self) -> bool {
            nokhwa::query(ApiBackend::Auto).is_ok()
        }

        fn request_stream(&self, constraints: &StreamConstraints) -> Result<NativeStream, AcquireReason> {
            ensure_permission()?;

            let cameras = nokhwa::query(ApiBackend::Auto).map_err(|err| classify(&err))?;
            let (info, requested) = match constraints {
                StreamConstraints::Preferred {
                    facing,
                    width,
                    height,
                } => {
                    let info = pick_facing(&cameras, *facing)
                        .ok_or(AcquireReason::ConstraintsUnsatisfiable)?;
                    let format = CameraFormat::new(
                        Resolution::new(*width, *height),
                        FrameFormat::MJPEG,
                        30,
                    );
                    (
                        info,
                        RequestedFormat::new::<RgbAFormat>(RequestedFormatType::Closest(format)),
                    )
                }
                StreamConstraints::Any => {
                    let info = cameras.first().ok_or(AcquireReason::DeviceNotFound)?;
                    (
                        info,
                        RequestedFormat::new::<RgbAFormat>(
                            RequestedFormatType::AbsoluteHighestFrameRate,
                        ),
                    )
                }
            };

            NativeStream::open(info.human_name(), info.index().clone(), requested)
        }
    }

    /// Shows the OS prompt when access is still undecided and blocks for the answer.
    fn ensure_permission() -> Result<(), AcquireReason> {
        if nokhwa::nokhwa_check() {
            return Ok(());
        }
        info!("Requesting camera permission");
        await_permission(
            |on_answer| nokhwa::nokhwa_initialize(on_answer),
            PERMISSION_PROMPT_TIMEOUT,
        )
    }

    type PermissionCallback = Box<dyn Fn(bool) + Send + Sync + 'static>;

    /// Only an explicit "no" counts as a denial.
    fn await_permission<F>(prompt: F, timeout: Duration) -> Result<(), AcquireReason>
    where
        F: FnOnce(PermissionCallback),
    {
        let (tx, rx) = mpsc::sync_channel::<bool>(1);
        prompt(Box::new(move |granted| {
            let _ = tx.try_send(granted);
        }));

        match rx.recv_timeout(timeout) {
            Ok(true) => Ok(()),
            Ok(false) => Err(AcquireReason::PermissionDenied),
            Err(RecvTimeoutError::Timeout) => Err(AcquireReason::Other(
                "camera permission prompt went unanswered".into(),
            )),
            Err(RecvTimeoutError::Disconnected) => Err(AcquireReason::Other(
                "camera permission request ended without an answer".into(),
            )),
        }
    }

    fn pick_facing(cameras: &[CameraInfo], facing: FacingMode) -> Option<&CameraInfo> {
        let hints: &[&str] = match facing {
            FacingMode::Environment => &["back", "rear", "environment"],
            FacingMode::User => &["front", "user", "facetime"],
        };
        cameras.iter().find(|info| {
            let name = info.human_name().to_lowercase();
            hints.iter().any(|hint| name.contains(hint))
        })
    }

    fn classify(err: &NokhwaError) -> AcquireReason {
        let message = err.to_string();
        let lower = message.to_lowercase();
        if lower.contains("permission") || lower.contains("denied") || lower.contains("not authorized") {
            AcquireReason::PermissionDenied
        } else if lower.contains("busy") || lower.contains("in use") {
            AcquireReason::DeviceBusy
        } else if lower.contains("not found") || lower.contains("no such device") {
            AcquireReason::DeviceNotFound
        } else if lower.contains("format") || lower.contains("resolution") {
            AcquireReason::ConstraintsUnsatisfiable
        } else {
            AcquireReason::Other(message)
        }
    }

    /// A camera owned by a dedicated `camera-worker` thread. Device handles
    /// are not `Send` on every backend, so they never leave that thread.
    pub struct NativeStream {
        label: String,
        dimensions: FrameDimensions,
        tx: Sender<CameraCommand>,
        worker: Option<JoinHandle<()>>,
    }

    impl NativeStream {
        fn open(
            label: String,
            index: CameraIndex,
            requested: RequestedFormat<'static>,
        ) -> Result<Self, AcquireReason> {
            let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<FrameDimensions, AcquireReason>>(1);
            let (tx, rx) = mpsc::channel::<CameraCommand>();

            let worker = thread::Builder::new()
                .name("camera-worker".to_string())
                .spawn(move || {
                    let mut camera = match Camera::new(index, requested) {
                        Ok(camera) => camera,
                        Err(err) => {
                            let _ = ready_tx.send(Err(classify(&err)));
                            return;
                        }
                    };
                    if let Err(err) = camera.open_stream() {
                        let _ = ready_tx.send(Err(classify(&err)));
                        return;
                    }

                    let resolution = camera.resolution();
                    let _ = ready_tx.send(Ok(FrameDimensions {
                        width: resolution.width(),
                        height: resolution.height(),
                    }));

                    while let Ok(cmd) = rx.recv() {
                        match cmd {
                            CameraCommand::Frame(reply) => {
                                let frame = camera
                                    .frame()
                                    .and_then(|buffer| buffer.decode_image::<RgbAFormat>())
                                    .map(|image| {
                                        let dims = FrameDimensions {
                                            width: image.width(),
                                            height: image.height(),
                                        };
                                        (dims, image.into_raw())
                                    });
                                match frame {
                                    Ok(frame) => {
                                        let _ = reply.send(Some(frame));
                                    }
                                    Err(err) => {
                                        debug!("camera frame unavailable: {err}");
                                        let _ = reply.send(None);
                                    }
                                }
                            }
                            CameraCommand::Stop => break,
                        }
                    }

                    if let Err(err) = camera.stop_stream() {
                        warn!("Failed to stop camera stream: {err}");
                    }
                    info!("Camera worker exited");
                })
                .map_err(|err| AcquireReason::Other(format!("failed to spawn camera worker: {err}")))?;

            let dimensions = match ready_rx.recv() {
                Ok(Ok(dimensions)) => dimensions,
                Ok(Err(reason)) => {
                    let _ = worker.join();
                    return Err(reason);
                }
                Err(_) => {
                    let _ = worker.join();
                    return Err(AcquireReason::Other("camera worker exited during startup".into()));
                }
            };

            Ok(Self {
                label,
                dimensions,
                tx,
                worker: Some(worker),
            })
        }
    }

    impl FrameSource for NativeStream {
        fn describe(&self) -> StreamInfo {
            StreamInfo {
                label: self.label.clone(),
                track_count: usize::from(self.worker.is_some()),
                settings: Some(self.dimensions),
            }
        }

        fn dimensions(&self) -> Option<FrameDimensions> {
            self.worker.as_ref().map(|_| self.dimensions)
        }

        fn read_frame(&mut self, buffer: &mut FrameBuffer) -> FrameStatus {
            if self.worker.is_none() {
                return FrameStatus::Pending;
            }
            let (reply_tx, reply_rx) = mpsc::sync_channel(1);
            if self.tx.send(CameraCommand::Frame(reply_tx)).is_err() {
                return FrameStatus::Pending;
            }
            let Ok(Some((dims, pixels))) = reply_rx.recv() else {
                return FrameStatus::Pending;
            };

            buffer.resize(dims);
            if buffer.pixels().len() != pixels.len() {
                return FrameStatus::Pending;
            }
            buffer.pixels_mut().copy_from_slice(&pixels);
            FrameStatus::Ready
        }

        fn stop(&mut self) {
            if let Some(worker) = self.worker.take() {
                let _ = self.tx.send(CameraCommand::Stop);
                if worker.join().is_err() {
                    warn!("Camera worker panicked during shutdown");
                }
            }
        }
    }

    impl Drop for NativeStream {
        fn drop(&mut self) {
            self.stop();
        }
    }

}

#[cfg(all(
    test,
    not(all(
        feature = "native-camera",
        not(any(target_os = "android", target_os = "ios"))
    ))
))]
mod tests {
    use super::*;
    use crate::capture::camera::CameraBackend;
    use crate::capture::types::StreamConstraints;

    #[test]
    fn camera_less_build_reports_no_capability() {
        let camera = PlatformCamera::new();
        assert!(!camera.is_supported());
        assert!(camera.request_stream(&StreamConstraints::Any).is_err());
    }
}
