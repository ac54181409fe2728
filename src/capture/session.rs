use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::decode::FrameDecoder;

use super::camera::{CameraBackend, FrameSource};
use super::error::{AcquireReason, CaptureError, CaptureErrorKind};
use super::types::{
    CaptureConfig, CaptureEvent, FrameBuffer, FrameStatus, PermissionState, SessionPhase,
    SessionStatus, StreamConstraints,
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Decoded(String),
    Failed(CaptureError),
    /// Torn down before a code was read.
    Cancelled,
}

enum Sample {
    Pending,
    Empty,
    Decoded(String),
}

/// One attempt to acquire a camera and read a code from it.
///
/// The session owns the stream exclusively. Whatever path `run` exits
/// through, the stream is released, and dropping the session releases it too.
pub struct CaptureSession<C: CameraBackend> {
    id: String,
    permission: PermissionState,
    phase: SessionPhase,
    source: Option<C::Stream>,
    frames_sampled: u64,
    liveness: CancellationToken,
    status_tx: watch::Sender<SessionStatus>,
    events: mpsc::UnboundedSender<CaptureEvent>,
}

impl<C: CameraBackend> CaptureSession<C> {
    pub fn new(
        liveness: CancellationToken,
        status_tx: watch::Sender<SessionStatus>,
        events: mpsc::UnboundedSender<CaptureEvent>,
    ) -> Self {
        let id = Uuid::new_v4().to_string();
        status_tx.send_replace(SessionStatus {
            session_id: Some(id.clone()),
            ..SessionStatus::default()
        });

        Self {
            id,
            permission: PermissionState::Unrequested,
            phase: SessionPhase::Idle,
            source: None,
            frames_sampled: 0,
            liveness,
            status_tx,
            events,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn frames_sampled(&self) -> u64 {
        self.frames_sampled
    }

    /// Drive the session to a decoded payload, a classified failure, or
    /// cancellation.
    pub async fn run<D: FrameDecoder>(
        mut self,
        camera: Arc<C>,
        decoder: Arc<D>,
        config: CaptureConfig,
    ) -> SessionOutcome {
        self.set_phase(SessionPhase::Starting);
        self.diagnostic("starting camera");

        match self.acquire(&camera, &config).await {
            Ok(Some(stream)) => self.source = Some(stream),
            Ok(None) => return self.cancelled(),
            Err(err) => return self.fail(err),
        }

        self.permission = PermissionState::Granted;
        self.describe_stream();

        self.wait_for_metadata(&config).await;
        if self.liveness.is_cancelled() {
            return self.cancelled();
        }

        self.set_phase(SessionPhase::Active);
        self.sample_loop(decoder, &config).await
    }

    /// Release the stream and cancel any pending tick. Safe to call any
    /// number of times, including before acquisition finished.
    pub fn stop(&mut self) {
        self.liveness.cancel();
        self.release();
    }

    fn release(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.stop();
            log_debug!("session {} released its camera stream", self.id);
        }
    }

    async fn acquire(
        &mut self,
        camera: &Arc<C>,
        config: &CaptureConfig,
    ) -> Result<Option<C::Stream>, CaptureError> {
        if !camera.is_supported() {
            return Err(CaptureError::capability_missing());
        }
        self.diagnostic("camera capability available");

        self.diagnostic("requesting rear camera");
        let first = match self
            .request(camera, StreamConstraints::preferred(config))
            .await
        {
            Some(result) => result,
            None => return Ok(None),
        };

        let result = match first {
            Ok(stream) => {
                self.diagnostic("rear camera acquired");
                Ok(stream)
            }
            Err(reason) => {
                self.diagnostic(format!("rear camera unavailable: {reason}"));
                self.diagnostic("requesting any camera");
                match self.request(camera, StreamConstraints::Any).await {
                    Some(Ok(stream)) => {
                        self.diagnostic("fallback camera acquired");
                        Ok(stream)
                    }
                    Some(Err(reason)) => Err(reason),
                    None => return Ok(None),
                }
            }
        };

        match result {
            Ok(stream) => Ok(Some(stream)),
            Err(reason) => {
                if reason == AcquireReason::PermissionDenied {
                    self.permission = PermissionState::Denied;
                }
                Err(CaptureError::classify(reason))
            }
        }
    }

    /// Runs one blocking stream request. Returns `None` when the session is
    /// torn down first; a stream that arrives afterwards is stopped on the
    /// spot so the camera never stays on.
    async fn request(
        &mut self,
        camera: &Arc<C>,
        constraints: StreamConstraints,
    ) -> Option<Result<C::Stream, AcquireReason>> {
        if self.liveness.is_cancelled() {
            return None;
        }

        let backend = Arc::clone(camera);
        let mut job = tokio::task::spawn_blocking(move || backend.request_stream(&constraints));

        tokio::select! {
            joined = &mut job => match joined {
                Ok(Ok(mut stream)) if self.liveness.is_cancelled() => {
                    stream.stop();
                    None
                }
                Ok(result) => Some(result),
                Err(err) => Some(Err(AcquireReason::Other(format!(
                    "camera request worker failed: {err}"
                )))),
            },
            _ = self.liveness.cancelled() => {
                log_info!("session {} torn down while acquiring; discarding late stream", self.id);
                tokio::spawn(async move {
                    if let Ok(Ok(mut stream)) = job.await {
                        stream.stop();
                    }
                });
                None
            }
        }
    }

    fn describe_stream(&self) {
        let Some(source) = self.source.as_ref() else {
            return;
        };
        let info = source.describe();
        self.diagnostic(format!("stream '{}' with {} track(s)", info.label, info.track_count));
        if let Some(settings) = info.settings {
            self.diagnostic(format!("resolution {}x{}", settings.width, settings.height));
        }
    }

    async fn wait_for_metadata(&mut self, config: &CaptureConfig) {
        let deadline = Instant::now() + config.metadata_timeout;
        loop {
            if let Some(dims) = self.source.as_ref().and_then(|source| source.dimensions()) {
                self.diagnostic(format!("video metadata: {}x{}", dims.width, dims.height));
                return;
            }
            if Instant::now() >= deadline {
                self.diagnostic("metadata timeout, sampling anyway");
                return;
            }
            tokio::select! {
                _ = self.liveness.cancelled() => return,
                _ = tokio::time::sleep(config.metadata_poll_interval) => {}
            }
        }
    }

    async fn sample_loop<D: FrameDecoder>(
        &mut self,
        decoder: Arc<D>,
        config: &CaptureConfig,
    ) -> SessionOutcome {
        let mut ticker = tokio::time::interval(config.sample_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut buffer = FrameBuffer::new();
        let inversion = config.inversion;

        loop {
            tokio::select! {
                biased;
                _ = self.liveness.cancelled() => return self.cancelled(),
                _ = ticker.tick() => {}
            }

            let Some(mut source) = self.source.take() else {
                return self.cancelled();
            };
            let decoder = Arc::clone(&decoder);
            let mut frame = buffer;

            let job = tokio::task::spawn_blocking(move || {
                let sample = match source.read_frame(&mut frame) {
                    FrameStatus::Pending => Sample::Pending,
                    FrameStatus::Ready => match decoder.decode(
                        frame.pixels(),
                        frame.width(),
                        frame.height(),
                        inversion,
                    ) {
                        Some(code) if !code.text.is_empty() => Sample::Decoded(code.text),
                        _ => Sample::Empty,
                    },
                };
                (source, frame, sample)
            });

            let (source, frame, sample) = match job.await {
                Ok(parts) => parts,
                Err(err) => {
                    log_warn!("session {} frame worker failed: {err}", self.id);
                    return self.fail(CaptureError::classify(AcquireReason::Other(format!(
                        "frame worker failed: {err}"
                    ))));
                }
            };
            self.source = Some(source);
            buffer = frame;

            match sample {
                Sample::Pending => continue,
                Sample::Empty => self.count_sample(&buffer),
                Sample::Decoded(payload) => {
                    self.count_sample(&buffer);
                    if self.liveness.is_cancelled() {
                        return self.cancelled();
                    }
                    return self.decoded(payload);
                }
            }
        }
    }

    fn count_sample(&mut self, buffer: &FrameBuffer) {
        if self.frames_sampled == 0 {
            self.diagnostic(format!(
                "first sample: {}x{}",
                buffer.width(),
                buffer.height()
            ));
        }
        self.frames_sampled += 1;
        let frames = self.frames_sampled;
        self.status_tx.send_modify(|status| status.frames_sampled = frames);
    }

    fn decoded(&mut self, payload: String) -> SessionOutcome {
        self.diagnostic(format!("code found: {payload}"));
        self.release();
        self.set_phase(SessionPhase::Decoded);
        self.emit(CaptureEvent::Decoded {
            session_id: self.id.clone(),
            payload: payload.clone(),
        });
        self.liveness.cancel();
        log_info!(
            "session {} decoded a code after {} sample(s)",
            self.id,
            self.frames_sampled
        );
        SessionOutcome::Decoded(payload)
    }

    fn fail(&mut self, err: CaptureError) -> SessionOutcome {
        self.release();
        log_warn!("session {} failed: {err} ({:?})", self.id, err.reason());

        if self.liveness.is_cancelled() {
            return self.cancelled();
        }

        self.diagnostic(format!("error: {err}"));
        let failure = err.to_failure();
        self.status_tx
            .send_modify(|status| status.error = Some(failure.clone()));
        self.set_phase(match err.kind() {
            CaptureErrorKind::Unsupported => SessionPhase::Unsupported,
            CaptureErrorKind::PermissionDenied | CaptureErrorKind::DeviceUnavailable => {
                SessionPhase::PermissionDenied
            }
        });
        self.emit(CaptureEvent::Failed {
            session_id: self.id.clone(),
            error: failure,
        });
        self.liveness.cancel();
        SessionOutcome::Failed(err)
    }

    fn cancelled(&mut self) -> SessionOutcome {
        self.stop();
        self.phase = SessionPhase::Stopped;
        let permission = self.permission;
        self.status_tx.send_modify(|status| {
            status.phase = SessionPhase::Stopped;
            status.permission = permission;
        });
        log_debug!("session {} stopped", self.id);
        SessionOutcome::Cancelled
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        self.phase = phase;
        let permission = self.permission;
        self.status_tx.send_modify(|status| {
            status.phase = phase;
            status.permission = permission;
        });
        self.emit(CaptureEvent::PhaseChanged {
            session_id: self.id.clone(),
            phase,
            permission,
        });
    }

    fn diagnostic(&self, message: impl Into<String>) {
        let message = message.into();
        log_debug!("[scanner {}] {}", self.id, message);
        self.emit(CaptureEvent::Diagnostic {
            session_id: self.id.clone(),
            message,
        });
    }

    fn emit(&self, event: CaptureEvent) {
        let _ = self.events.send(event);
    }
}

impl<C: CameraBackend> Drop for CaptureSession<C> {
    fn drop(&mut self) {
        self.release();
    }
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::testing::{FakeCamera, FakeDecoder};
    use super::*;

    fn fast_config() -> CaptureConfig {
        CaptureConfig {
            metadata_timeout: Duration::from_millis(30),
            metadata_poll_interval: Duration::from_millis(5),
            sample_interval: Duration::from_millis(1),
            ..CaptureConfig::default()
        }
    }

    fn new_session() -> (
        CaptureSession<FakeCamera>,
        CancellationToken,
        watch::Receiver<SessionStatus>,
        mpsc::UnboundedReceiver<CaptureEvent>,
    ) {
        let token = CancellationToken::new();
        let (status_tx, status_rx) = watch::channel(SessionStatus::default());
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let session = CaptureSession::new(token.clone(), status_tx, events_tx);
        (session, token, status_rx, events_rx)
    }

    #[test]
    fn stop_before_acquisition_is_a_no_op() {
        let (mut session, token, _status, _events) = new_session();
        session.stop();
        session.stop();
        assert!(token.is_cancelled());
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert_eq!(session.frames_sampled(), 0);
    }

    #[test]
    fn held_stream_is_stopped_exactly_once() {
        let camera = FakeCamera::working();
        let (mut session, _token, _status, _events) = new_session();
        session.source = Some(camera.request_stream(&StreamConstraints::Any).unwrap());

        session.stop();
        session.stop();
        drop(session);

        assert_eq!(camera.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn decodes_after_pending_and_empty_frames() {
        let camera = Arc::new(FakeCamera {
            pending_frames: 3,
            ..FakeCamera::working()
        });
        let decoder = Arc::new(FakeDecoder::from_call(4, "INV-0042"));
        let (session, _token, status, mut events) = new_session();

        let outcome = session
            .run(Arc::clone(&camera), Arc::clone(&decoder), fast_config())
            .await;

        assert_eq!(outcome, SessionOutcome::Decoded("INV-0042".into()));
        assert_eq!(decoder.calls(), 4);
        assert_eq!(camera.released.load(Ordering::SeqCst), 1);

        let status = status.borrow().clone();
        assert_eq!(status.phase, SessionPhase::Decoded);
        assert_eq!(status.permission, PermissionState::Granted);
        assert_eq!(status.frames_sampled, 4);

        let mut decoded = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, CaptureEvent::Decoded { .. }) {
                decoded += 1;
            }
        }
        assert_eq!(decoded, 1);
    }

    #[tokio::test]
    async fn missing_metadata_times_out_and_keeps_sampling() {
        let camera = Arc::new(FakeCamera::default());
        let decoder = Arc::new(FakeDecoder::from_call(1, "ROOM-12"));
        let (session, _token, _status, mut events) = new_session();

        let outcome = session.run(camera, decoder, fast_config()).await;
        assert_eq!(outcome, SessionOutcome::Decoded("ROOM-12".into()));

        let mut saw_timeout = false;
        while let Ok(event) = events.try_recv() {
            if let CaptureEvent::Diagnostic { message, .. } = event {
                saw_timeout |= message.contains("metadata timeout");
            }
        }
        assert!(saw_timeout);
    }

    #[tokio::test]
    async fn unsupported_platform_never_requests_a_stream() {
        let camera = Arc::new(FakeCamera {
            unsupported: true,
            ..FakeCamera::working()
        });
        let (session, _token, status, _events) = new_session();

        let outcome = session
            .run(Arc::clone(&camera), Arc::new(FakeDecoder::never()), fast_config())
            .await;

        assert!(matches!(
            outcome,
            SessionOutcome::Failed(CaptureError::Unsupported { .. })
        ));
        assert!(camera.requests().is_empty());
        assert_eq!(status.borrow().phase, SessionPhase::Unsupported);
    }

    #[tokio::test]
    async fn cancelled_session_releases_stream() {
        let camera = Arc::new(FakeCamera::working());
        let (session, token, mut status, mut events) = new_session();
        let task = tokio::spawn(session.run(
            Arc::clone(&camera),
            Arc::new(FakeDecoder::never()),
            fast_config(),
        ));

        tokio::time::timeout(
            Duration::from_secs(2),
            status.wait_for(|s| s.phase == SessionPhase::Active),
        )
        .await
        .unwrap()
        .unwrap();
        token.cancel();

        assert_eq!(task.await.unwrap(), SessionOutcome::Cancelled);
        assert_eq!(camera.released.load(Ordering::SeqCst), 1);
        while let Ok(event) = events.try_recv() {
            assert!(!matches!(
                event,
                CaptureEvent::Decoded { .. } | CaptureEvent::Failed { .. }
            ));
        }
    }
}
