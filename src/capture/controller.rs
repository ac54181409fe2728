use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::decode::{FrameDecoder, InversionMode};

use super::camera::CameraBackend;
use super::session::{CaptureSession, SessionOutcome};
use super::types::{CaptureConfig, CaptureEvent, SessionStatus};

/// Owns at most one live capture session.
pub struct ScannerController<C: CameraBackend, D: FrameDecoder> {
    camera: Arc<C>,
    decoder: Arc<D>,
    config: CaptureConfig,
    events: mpsc::UnboundedSender<CaptureEvent>,
    status_tx: watch::Sender<SessionStatus>,
    handle: Option<JoinHandle<SessionOutcome>>,
    cancel_token: Option<CancellationToken>,
}

impl<C: CameraBackend, D: FrameDecoder> ScannerController<C, D> {
    pub fn new(
        camera: C,
        decoder: D,
        config: CaptureConfig,
        events: mpsc::UnboundedSender<CaptureEvent>,
    ) -> Self {
        let (status_tx, _) = watch::channel(SessionStatus::default());
        Self {
            camera: Arc::new(camera),
            decoder: Arc::new(decoder),
            config,
            events,
            status_tx,
            handle: None,
            cancel_token: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }

    pub fn status(&self) -> SessionStatus {
        self.status_tx.borrow().clone()
    }

    /// Takes effect from the next session.
    pub fn set_inversion(&mut self, inversion: InversionMode) {
        self.config.inversion = inversion;
    }

    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Spawn a fresh session. Returns its id.
    pub fn start(&mut self) -> Result<String> {
        if self.is_active() {
            bail!("scanner already active");
        }

        let cancel_token = CancellationToken::new();
        let session: CaptureSession<C> = CaptureSession::new(
            cancel_token.clone(),
            self.status_tx.clone(),
            self.events.clone(),
        );
        let session_id = session.id().to_string();
        info!("Starting capture session {session_id}");

        let handle = tokio::spawn(session.run(
            Arc::clone(&self.camera),
            Arc::clone(&self.decoder),
            self.config.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(session_id)
    }

    /// Tear down the current session, if any, and wait for it to release the
    /// camera. Idempotent.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            let outcome = handle
                .await
                .context("capture session task failed to join")?;
            info!("Capture session ended: {outcome:?}");
        }
        Ok(())
    }

    /// Discard the current session and start over.
    pub async fn retry(&mut self) -> Result<String> {
        self.stop().await?;
        self.start()
    }
}

impl<C: CameraBackend, D: FrameDecoder> Drop for ScannerController<C, D> {
    fn drop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }
}
