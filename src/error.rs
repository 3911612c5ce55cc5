//! Error types for pinpoint

use thiserror::Error;

/// Main error type for location-resolution operations
///
/// Provider failures are translated into this taxonomy at the boundary of
/// each bounded operation; raw provider errors never reach callers.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location services are disabled")]
    LocationDisabled,

    #[error("Geocoding failed: {0}")]
    GeocodingFailed(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Location is outside the service area")]
    OutsideServiceArea,

    #[error("Operation timed out")]
    Timeout,

    #[error("Operation was cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Result type alias for pinpoint operations
pub type Result<T> = std::result::Result<T, Error>;
