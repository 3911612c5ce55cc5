//! Default configuration values
//!
//! Named constants for all tunable parameters

/// Default geocoding provider base URL (Nominatim)
pub const DEFAULT_PROVIDER_URL: &str = "https://nominatim.openstreetmap.org";

/// Default service-area radius in meters
pub const DEFAULT_SEARCH_RADIUS_METERS: f64 = 50_000.0;

/// Default geocoding timeout in seconds
pub const DEFAULT_GEOCODE_TIMEOUT_SECS: u64 = 10;

/// Default cooldown between serialized reverse lookups in milliseconds
pub const DEFAULT_QUEUE_COOLDOWN_MS: u64 = 100;

/// Default one-shot position timeout in seconds
pub const DEFAULT_POSITION_TIMEOUT_SECS: u64 = 10;

/// Default permission-prompt wait deadline in seconds
pub const DEFAULT_PERMISSION_TIMEOUT_SECS: u64 = 10;

/// Default routing-class timeout in seconds
pub const DEFAULT_ROUTING_TIMEOUT_SECS: u64 = 15;

/// Default service-area center latitude (NYC)
pub const DEFAULT_CENTER_LAT: f64 = 40.7128;

/// Default service-area center longitude (NYC)
pub const DEFAULT_CENTER_LNG: f64 = -74.0060;

/// Config file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Application directory name (for XDG paths)
pub const APP_DIR_NAME: &str = "pinpoint";
