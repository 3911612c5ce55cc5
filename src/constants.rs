//! Centralized constants for the pinpoint crate
//!
//! This module consolidates tunables that are used across multiple modules
//! to avoid duplication and ensure consistency. Most of them also have
//! config-file counterparts; see `config::defaults`.

/// Timeout bounds for raced operations
pub mod timeouts {
    use std::time::Duration;

    /// Default bound for forward/reverse geocoding calls
    pub const GEOCODE: Duration = Duration::from_secs(10);

    /// Default bound for one-shot position requests
    pub const POSITION: Duration = Duration::from_secs(10);

    /// Bound for routing-class operations (consumed at the boundary only)
    pub const ROUTING: Duration = Duration::from_secs(15);

    /// How long a pending permission request waits for the device callback
    /// before falling back to the last known state
    pub const PERMISSION_PROMPT: Duration = Duration::from_secs(10);

    /// Cooldown between serialized reverse-geocoding requests
    pub const QUEUE_COOLDOWN: Duration = Duration::from_millis(100);
}

/// Geographic constants
pub mod geo {
    /// Mean Earth radius in meters (WGS84 approximation)
    pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

    /// Meters per degree of latitude (approximate, varies slightly with latitude)
    pub const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

    /// Radius of the circular region forward geocoding is biased to,
    /// centered on the service-area center
    pub const SERVICE_AREA_RADIUS_METERS: f64 = 50_000.0;
}

/// Address sanitization limits
pub mod address {
    /// Maximum address length after trimming; longer input is truncated
    pub const MAX_LEN: usize = 200;

    /// Punctuation kept by the sanitizer, in addition to alphanumerics
    /// and whitespace
    pub const ALLOWED_PUNCTUATION: &[char] =
        &[',', '-', '.', '/', '(', ')', '#', '\'', '"'];
}

/// External API endpoints
pub mod api {
    /// OpenStreetMap Nominatim geocoding API
    pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
}
