//! Continuous position updates and one-shot position requests
//!
//! `PositionSession` owns the "last known position" exclusively; other
//! components read it through snapshots (`last_known`, `subscribe`) and
//! never mutate it. Device updates are validated before publishing;
//! invalid coordinates are transient provider glitches, so they are
//! dropped silently rather than surfaced as errors.

use crate::constants::timeouts;
use crate::coord::Coordinates;
use crate::error::{Error, Result};
use crate::permission::PermissionState;
use crate::race;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Trait for the device position API
pub trait PositionBackend: Send + Sync + 'static {
    /// Whether the device's location service is globally enabled
    fn is_service_enabled(&self) -> bool;

    /// Begin continuous updates; the returned stream ends when the device
    /// stops delivering
    fn start_updates(&self) -> mpsc::Receiver<Coordinates>;

    /// Stop continuous updates
    fn stop_updates(&self);

    /// Request a single position fix
    fn request_once(&self) -> impl Future<Output = Result<Coordinates>> + Send;
}

/// Owns the continuous-update lifecycle and the last known position
pub struct PositionSession<B> {
    backend: Arc<B>,
    last_known: Arc<watch::Sender<Option<Coordinates>>>,
    pump: Mutex<Option<JoinHandle<()>>>,
    timeout: Duration,
}

impl<B: PositionBackend> PositionSession<B> {
    /// Create a session with the default one-shot timeout
    pub fn new(backend: Arc<B>) -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            backend,
            last_known: Arc::new(tx),
            pump: Mutex::new(None),
            timeout: timeouts::POSITION,
        }
    }

    /// Override the one-shot request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Start continuous updates (idempotent)
    ///
    /// Gated on the device location service being enabled and the given
    /// permission snapshot being authorized.
    pub async fn start(&self, permission: PermissionState) -> Result<()> {
        if !self.backend.is_service_enabled() {
            return Err(Error::LocationDisabled);
        }
        if !permission.is_authorized() {
            return Err(Error::PermissionDenied);
        }

        let mut pump = self.pump.lock().await;
        let running = pump
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false);
        if running {
            return Ok(());
        }

        let mut updates = self.backend.start_updates();
        let last_known = Arc::clone(&self.last_known);
        *pump = Some(tokio::spawn(async move {
            while let Some(coords) = updates.recv().await {
                if coords.validate().is_ok() {
                    last_known.send_replace(Some(coords));
                } else {
                    debug!(lat = coords.lat, lng = coords.lng, "dropping invalid position update");
                }
            }
        }));
        info!("position updates started");
        Ok(())
    }

    /// Stop continuous updates (idempotent)
    pub async fn stop(&self) {
        let handle = self.pump.lock().await.take();
        if let Some(handle) = handle {
            self.backend.stop_updates();
            handle.abort();
            let _ = handle.await;
            info!("position updates stopped");
        }
    }

    /// Forget the last known position (used when authorization is revoked)
    pub fn discard_last_known(&self) {
        self.last_known.send_replace(None);
    }

    /// Snapshot of the last known position
    pub fn last_known(&self) -> Option<Coordinates> {
        *self.last_known.borrow()
    }

    /// Whether a position fix is currently available
    pub fn is_position_available(&self) -> bool {
        self.last_known().is_some()
    }

    /// Watch position changes
    pub fn subscribe(&self) -> watch::Receiver<Option<Coordinates>> {
        self.last_known.subscribe()
    }

    /// Resolve the current position once
    ///
    /// Returns the last known position immediately when present; otherwise
    /// issues a single device request raced against the timeout.
    pub async fn current_position_once(
        &self,
        permission: PermissionState,
    ) -> Result<Coordinates> {
        if let Some(coords) = self.last_known() {
            return Ok(coords);
        }
        if !self.backend.is_service_enabled() {
            return Err(Error::LocationDisabled);
        }
        if !permission.is_authorized() {
            return Err(Error::PermissionDenied);
        }

        let backend = Arc::clone(&self.backend);
        let coords = race::run(async move { backend.request_once().await }, self.timeout).await?;
        coords.validate()?;
        Ok(coords)
    }
}
