use std::sync::Arc;

use anyhow::{bail, Result};
use log::info;
use tokio::sync::{watch, Mutex};

use crate::api::EquipmentLookup;

use super::FlowState;

struct FlowInner {
    state: FlowState,
    /// Bumped on every transition out of `Scanning`; a lookup whose
    /// generation no longer matches lands after a reset and is dropped.
    generation: u64,
}

/// Drives a decoded payload through lookup to a displayable result.
pub struct ScanFlow<L: EquipmentLookup> {
    lookup: Arc<L>,
    inner: Arc<Mutex<FlowInner>>,
    state_tx: Arc<watch::Sender<FlowState>>,
}

impl<L: EquipmentLookup> Clone for ScanFlow<L> {
    fn clone(&self) -> Self {
        Self {
            lookup: Arc::clone(&self.lookup),
            inner: Arc::clone(&self.inner),
            state_tx: Arc::clone(&self.state_tx),
        }
    }
}

impl<L: EquipmentLookup> ScanFlow<L> {
    pub fn new(lookup: Arc<L>) -> Self {
        let (state_tx, _) = watch::channel(FlowState::Scanning);
        Self {
            lookup,
            inner: Arc::new(Mutex::new(FlowInner {
                state: FlowState::Scanning,
                generation: 0,
            })),
            state_tx: Arc::new(state_tx),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<FlowState> {
        self.state_tx.subscribe()
    }

    pub async fn state(&self) -> FlowState {
        self.inner.lock().await.state.clone()
    }

    /// Look up `code` and settle on `Result` or `Error`. Only accepted from
    /// `Scanning`; the payload is passed on exactly as decoded.
    pub async fn resolve(&self, code: String) -> Result<FlowState> {
        if code.trim().is_empty() {
            bail!("decoded payload is empty");
        }

        let generation = {
            let mut inner = self.inner.lock().await;
            match inner.state {
                FlowState::Scanning => {}
                FlowState::Loading { .. } => bail!("lookup already in progress"),
                _ => bail!("a scan result is already shown; scan again first"),
            }
            inner.generation += 1;
            self.publish(&mut inner, FlowState::Loading { code: code.clone() });
            inner.generation
        };

        info!("Looking up scanned code {code}");
        let outcome = self.lookup.scan_equipment(&code).await;

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            info!("Dropping lookup for {code}; flow was reset");
            return Ok(inner.state.clone());
        }
        if let Err(err) = &outcome {
            info!("Lookup for {code} failed: {err}");
        }
        self.publish(&mut inner, FlowState::from_lookup(code, outcome));
        Ok(inner.state.clone())
    }

    /// Back to `Scanning` from any state.
    pub async fn scan_again(&self) -> FlowState {
        let mut inner = self.inner.lock().await;
        inner.generation += 1;
        self.publish(&mut inner, FlowState::Scanning);
        inner.state.clone()
    }

    fn publish(&self, inner: &mut FlowInner, state: FlowState) {
        inner.state = state.clone();
        self.state_tx.send_replace(state);
    }
}
