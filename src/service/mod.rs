//! Composition-root facade
//!
//! `LocationService` is explicitly constructed with its backends injected:
//! there is no global instance; the application's composition root owns it
//! for the life of the process. It wires the runner, serializer,
//! coordinator, and session together and exposes the surface that UI and
//! feature collaborators consume.

use crate::config::Config;
use crate::coord::Coordinates;
use crate::error::Result;
use crate::geocode::nominatim::NominatimBackend;
use crate::geocode::{GeocodeBackend, GeocodeRunner};
use crate::permission::{
    AccessDecision, PermissionBackend, PermissionCoordinator, PermissionState,
};
use crate::position::{PositionBackend, PositionSession};
use crate::queue::RequestSerializer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Result of a routing computation
///
/// Produced by a separate routing collaborator and consumed read-only by
/// the UI; defined here only to fix the interface boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResult {
    pub distance_meters: f64,
    pub duration: Duration,
    pub path: Vec<Coordinates>,
    pub advisories: Vec<String>,
}

/// The location-resolution surface exposed to UI and feature collaborators
pub struct LocationService<G, P, L> {
    runner: Arc<GeocodeRunner<G>>,
    serializer: RequestSerializer<G>,
    coordinator: PermissionCoordinator<P, L>,
    session: Arc<PositionSession<L>>,
    search_center: Coordinates,
}

impl<P, L> LocationService<NominatimBackend, P, L>
where
    P: PermissionBackend,
    L: PositionBackend,
{
    /// Build a service against the configured Nominatim instance
    pub fn with_nominatim(config: &Config, permissions: Arc<P>, device: Arc<L>) -> Self {
        let geocoder = Arc::new(NominatimBackend::with_base_url(
            config.geocoding.provider_url.clone(),
        ));
        Self::new(config, geocoder, permissions, device)
    }
}

impl<G, P, L> LocationService<G, P, L>
where
    G: GeocodeBackend,
    P: PermissionBackend,
    L: PositionBackend,
{
    /// Wire the components from config and injected backends
    pub fn new(config: &Config, geocoder: Arc<G>, permissions: Arc<P>, device: Arc<L>) -> Self {
        let runner = Arc::new(
            GeocodeRunner::new(geocoder)
                .with_timeout(config.geocode_timeout())
                .with_service_radius(config.service_area.radius_meters),
        );
        let serializer =
            RequestSerializer::with_cooldown(Arc::clone(&runner), config.queue_cooldown());
        let session =
            Arc::new(PositionSession::new(device).with_timeout(config.position_timeout()));
        let coordinator = PermissionCoordinator::new(permissions, Arc::clone(&session))
            .with_prompt_timeout(config.permission_timeout());

        Self {
            runner,
            serializer,
            coordinator,
            session,
            search_center: config.service_center(),
        }
    }

    /// Negotiate location permission with the user
    pub async fn request_permission(&self) -> Result<AccessDecision> {
        self.coordinator.request_access().await
    }

    /// Device callback: authorization changed
    pub async fn on_authorization_changed(&self, new_state: PermissionState) {
        self.coordinator.on_authorization_changed(new_state).await
    }

    /// Start continuous position updates under the current permission
    pub async fn start_position_updates(&self) -> Result<()> {
        self.session.start(self.coordinator.state()).await
    }

    /// Stop continuous position updates
    pub async fn stop_position_updates(&self) {
        self.session.stop().await
    }

    /// Resolve an address string to coordinates within the service area
    pub async fn resolve_coordinate(&self, address: &str) -> Result<Coordinates> {
        self.runner
            .resolve_coordinate(address, self.search_center)
            .await
    }

    /// Resolve coordinates to an address (direct, non-queued path)
    pub async fn resolve_address(&self, coords: Coordinates) -> Result<String> {
        Ok(self.runner.resolve_address(coords).await?.formatted())
    }

    /// Resolve coordinates to an address through the serialized queue
    ///
    /// Use this for bursts (a moving map cursor); requests are processed
    /// one at a time in order, with a cooldown between them.
    pub async fn enqueue_resolve_address(&self, coords: Coordinates) -> Result<String> {
        Ok(self.serializer.enqueue(coords).await?.formatted())
    }

    /// Cancel every queued reverse lookup
    pub async fn clear_queue(&self) {
        self.serializer.clear().await
    }

    /// Resolve the current position once, with timeout fallback
    pub async fn current_position_once(&self) -> Result<Coordinates> {
        self.session
            .current_position_once(self.coordinator.state())
            .await
    }

    /// Last known position, if any
    pub fn current_position(&self) -> Option<Coordinates> {
        self.session.last_known()
    }

    /// Current permission state snapshot
    pub fn permission_state(&self) -> PermissionState {
        self.coordinator.state()
    }

    /// Whether a position fix is available
    pub fn is_position_available(&self) -> bool {
        self.session.is_position_available()
    }
}
