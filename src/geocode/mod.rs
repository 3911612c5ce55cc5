//! Geocoding: address sanitization, resolution, and the provider boundary
//!
//! `GeocodeRunner` wraps forward and reverse provider calls in the result
//! race so every call is latency-bounded, and translates provider failures
//! into the crate's error taxonomy. Each invocation owns its own race and
//! provider call; the provider handle itself is shared behind an `Arc` and
//! must be safe for concurrent use (the reqwest-backed Nominatim backend is).

pub mod nominatim;

use crate::constants::address::{ALLOWED_PUNCTUATION, MAX_LEN};
use crate::constants::geo::SERVICE_AREA_RADIUS_METERS;
use crate::constants::timeouts;
use crate::coord::Coordinates;
use crate::error::{Error, Result};
use crate::race;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Placeholder shown when a reverse lookup yields no usable components
pub const UNKNOWN_ADDRESS: &str = "Unknown address";

/// Separator between address components
const COMPONENT_SEPARATOR: &str = ", ";

/// Raw address fields as reported by a reverse-geocoding provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddressComponents {
    pub street_number: Option<String>,
    pub street: Option<String>,
    pub locality: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
}

/// A resolved postal address: ordered, non-empty text components
///
/// The formatted form joins components with `", "`. An address with no
/// components formats as the `UNKNOWN_ADDRESS` sentinel, never as an
/// empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAddress {
    components: Vec<String>,
}

impl ResolvedAddress {
    /// Build from provider components, dropping empty fields and keeping
    /// the street-number, street, locality, region, postal-code order
    pub fn from_components(raw: AddressComponents) -> Self {
        let components = [
            raw.street_number,
            raw.street,
            raw.locality,
            raw.region,
            raw.postal_code,
        ]
        .into_iter()
        .flatten()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

        Self { components }
    }

    /// Whether any component was resolved
    pub fn is_known(&self) -> bool {
        !self.components.is_empty()
    }

    /// The ordered components
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// The joined display form; never empty
    pub fn formatted(&self) -> String {
        if self.components.is_empty() {
            UNKNOWN_ADDRESS.to_string()
        } else {
            self.components.join(COMPONENT_SEPARATOR)
        }
    }
}

impl std::fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.formatted())
    }
}

/// Trait for geocoding providers
///
/// Implementations must be thread-safe (Send + Sync); a single instance is
/// shared by every concurrent resolution.
pub trait GeocodeBackend: Send + Sync + 'static {
    /// Forward geocode a sanitized query, biased toward a circular region
    ///
    /// Returns the best match, or None if the provider found nothing.
    fn search(
        &self,
        query: &str,
        center: Coordinates,
        radius_meters: f64,
    ) -> impl Future<Output = Result<Option<Coordinates>>> + Send;

    /// Reverse geocode coordinates into address components
    ///
    /// Returns None if the provider has no address for the location.
    fn reverse(
        &self,
        coords: Coordinates,
    ) -> impl Future<Output = Result<Option<AddressComponents>>> + Send;
}

/// Sanitize a free-form address string
///
/// Trims surrounding whitespace, truncates to `MAX_LEN` characters, and
/// drops every character that is not alphanumeric, whitespace, or in the
/// punctuation allow-list. Fails with `InvalidAddress` when nothing
/// survives, before any provider contact.
pub fn sanitize_address(input: &str) -> Result<String> {
    let sanitized: String = input
        .trim()
        .chars()
        .take(MAX_LEN)
        .filter(|c| {
            c.is_alphanumeric() || c.is_whitespace() || ALLOWED_PUNCTUATION.contains(c)
        })
        .collect();
    let sanitized = sanitized.trim().to_string();

    if sanitized.is_empty() {
        return Err(Error::InvalidAddress(
            "address is empty after sanitization".to_string(),
        ));
    }
    Ok(sanitized)
}

/// Runs geocoding operations under the result race with taxonomy mapping
pub struct GeocodeRunner<B> {
    backend: Arc<B>,
    timeout: Duration,
    service_radius_meters: f64,
}

impl<B: GeocodeBackend> GeocodeRunner<B> {
    /// Create a runner with the default timeout and service radius
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            timeout: timeouts::GEOCODE,
            service_radius_meters: SERVICE_AREA_RADIUS_METERS,
        }
    }

    /// Override the per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the service-area radius
    pub fn with_service_radius(mut self, radius_meters: f64) -> Self {
        self.service_radius_meters = radius_meters;
        self
    }

    /// Resolve an address string to coordinates
    ///
    /// Sanitization and center validation fail fast, before any suspension.
    /// The provider search is biased to the service circle around
    /// `search_center`; a match outside that circle fails with
    /// `OutsideServiceArea`.
    pub async fn resolve_coordinate(
        &self,
        address: &str,
        search_center: Coordinates,
    ) -> Result<Coordinates> {
        let query = sanitize_address(address)?;
        search_center.validate()?;

        let backend = Arc::clone(&self.backend);
        let radius = self.service_radius_meters;
        let coords = race::run(
            async move {
                backend
                    .search(&query, search_center, radius)
                    .await
                    .map_err(as_geocoding_failure)?
                    .ok_or_else(|| {
                        Error::GeocodingFailed("no match for address".to_string())
                    })
            },
            self.timeout,
        )
        .await?;

        coords.validate()?;
        if coords.distance_meters(&search_center) > self.service_radius_meters {
            return Err(Error::OutsideServiceArea);
        }
        Ok(coords)
    }

    /// Resolve coordinates to a postal address
    ///
    /// The coordinate invariant is checked first; provider failure or an
    /// empty result maps to `GeocodingFailed`.
    pub async fn resolve_address(&self, coords: Coordinates) -> Result<ResolvedAddress> {
        coords.validate()?;

        let backend = Arc::clone(&self.backend);
        let components = race::run(
            async move {
                backend
                    .reverse(coords)
                    .await
                    .map_err(as_geocoding_failure)?
                    .ok_or_else(|| {
                        Error::GeocodingFailed("no address at location".to_string())
                    })
            },
            self.timeout,
        )
        .await?;

        Ok(ResolvedAddress::from_components(components))
    }
}

/// Collapse plumbing errors into `GeocodingFailed`; taxonomy errors pass through
fn as_geocoding_failure(err: Error) -> Error {
    match err {
        Error::Timeout
        | Error::Cancelled
        | Error::InvalidAddress(_)
        | Error::OutsideServiceArea
        | Error::GeocodingFailed(_) => err,
        other => Error::GeocodingFailed(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted backend for runner tests; counts provider contacts
    struct MockBackend {
        search_result: Option<Coordinates>,
        reverse_result: Option<AddressComponents>,
        calls: AtomicUsize,
    }

    impl MockBackend {
        fn new() -> Self {
            Self {
                search_result: Some(Coordinates::new(40.7128, -74.0060)),
                reverse_result: Some(AddressComponents {
                    street_number: Some("350".to_string()),
                    street: Some("5th Ave".to_string()),
                    locality: Some("New York".to_string()),
                    region: Some("NY".to_string()),
                    postal_code: Some("10118".to_string()),
                }),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl GeocodeBackend for MockBackend {
        async fn search(
            &self,
            _query: &str,
            _center: Coordinates,
            _radius_meters: f64,
        ) -> Result<Option<Coordinates>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.search_result)
        }

        async fn reverse(&self, _coords: Coordinates) -> Result<Option<AddressComponents>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reverse_result.clone())
        }
    }

    #[test]
    fn test_sanitize_keeps_allowed_characters() {
        let out = sanitize_address("350 5th Ave, New York (Suite #21-B) './\"'").unwrap();
        assert_eq!(out, "350 5th Ave, New York (Suite #21-B) './\"'");
    }

    #[test]
    fn test_sanitize_strips_disallowed() {
        let out = sanitize_address("12 Main St! @<script>\u{1F600}\u{0007}").unwrap();
        assert_eq!(out, "12 Main St script");
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = "a".repeat(500);
        let out = sanitize_address(&long).unwrap();
        assert_eq!(out.chars().count(), MAX_LEN);
    }

    #[test]
    fn test_sanitize_empty_fails() {
        assert!(matches!(
            sanitize_address("   "),
            Err(Error::InvalidAddress(_))
        ));
        assert!(matches!(
            sanitize_address("!!!@@@\u{1F600}"),
            Err(Error::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_resolved_address_formatting() {
        let addr = ResolvedAddress::from_components(AddressComponents {
            street_number: Some("350".to_string()),
            street: Some("5th Ave".to_string()),
            locality: Some("New York".to_string()),
            region: None,
            postal_code: Some("10118".to_string()),
        });
        assert_eq!(addr.formatted(), "350, 5th Ave, New York, 10118");
        assert!(addr.is_known());
    }

    #[test]
    fn test_resolved_address_unknown_sentinel() {
        let addr = ResolvedAddress::from_components(AddressComponents::default());
        assert_eq!(addr.formatted(), UNKNOWN_ADDRESS);
        assert!(!addr.is_known());

        // Blank components count as absent.
        let addr = ResolvedAddress::from_components(AddressComponents {
            street: Some("   ".to_string()),
            ..Default::default()
        });
        assert!(!addr.is_known());
        assert!(!addr.formatted().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_coordinate_happy_path() {
        let backend = Arc::new(MockBackend::new());
        let runner = GeocodeRunner::new(Arc::clone(&backend));
        let center = Coordinates::new(40.7, -74.0);

        let coords = runner.resolve_coordinate("350 5th Ave", center).await.unwrap();
        assert_eq!(coords, Coordinates::new(40.7128, -74.0060));
    }

    #[tokio::test]
    async fn test_invalid_address_skips_provider() {
        let backend = Arc::new(MockBackend::new());
        let runner = GeocodeRunner::new(Arc::clone(&backend));
        let center = Coordinates::new(40.7, -74.0);

        let result = runner.resolve_coordinate("\u{0007}\u{0007}", center).await;
        assert!(matches!(result, Err(Error::InvalidAddress(_))));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_result_outside_service_area() {
        let mut backend = MockBackend::new();
        // Provider returns a match on another continent.
        backend.search_result = Some(Coordinates::new(48.8566, 2.3522));
        let runner = GeocodeRunner::new(Arc::new(backend));
        let center = Coordinates::new(40.7, -74.0);

        let result = runner.resolve_coordinate("350 5th Ave", center).await;
        assert!(matches!(result, Err(Error::OutsideServiceArea)));
    }

    #[tokio::test]
    async fn test_no_match_maps_to_geocoding_failed() {
        let mut backend = MockBackend::new();
        backend.search_result = None;
        let runner = GeocodeRunner::new(Arc::new(backend));
        let center = Coordinates::new(40.7, -74.0);

        let result = runner.resolve_coordinate("nowhere", center).await;
        assert!(matches!(result, Err(Error::GeocodingFailed(_))));
    }

    #[tokio::test]
    async fn test_resolve_address_happy_path() {
        let runner = GeocodeRunner::new(Arc::new(MockBackend::new()));
        let addr = runner
            .resolve_address(Coordinates::new(40.7128, -74.0060))
            .await
            .unwrap();
        assert_eq!(addr.formatted(), "350, 5th Ave, New York, NY, 10118");
    }

    #[tokio::test]
    async fn test_resolve_address_rejects_invalid_coordinates() {
        let backend = Arc::new(MockBackend::new());
        let runner = GeocodeRunner::new(Arc::clone(&backend));

        let result = runner.resolve_address(Coordinates::new(999.0, 999.0)).await;
        assert!(matches!(result, Err(Error::InvalidAddress(_))));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resolve_address_empty_result_fails() {
        let mut backend = MockBackend::new();
        backend.reverse_result = None;
        let runner = GeocodeRunner::new(Arc::new(backend));

        let result = runner.resolve_address(Coordinates::new(40.7, -74.0)).await;
        assert!(matches!(result, Err(Error::GeocodingFailed(_))));
    }

    #[tokio::test]
    async fn test_provider_timeout_surfaces_as_timeout() {
        struct SlowBackend;
        impl GeocodeBackend for SlowBackend {
            async fn search(
                &self,
                _query: &str,
                _center: Coordinates,
                _radius_meters: f64,
            ) -> Result<Option<Coordinates>> {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(None)
            }
            async fn reverse(
                &self,
                _coords: Coordinates,
            ) -> Result<Option<AddressComponents>> {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(None)
            }
        }

        let runner = GeocodeRunner::new(Arc::new(SlowBackend))
            .with_timeout(Duration::from_millis(50));
        let result = runner.resolve_address(Coordinates::new(40.7, -74.0)).await;
        assert!(matches!(result, Err(Error::Timeout)));
    }
}
