//! Configuration management
//!
//! Loads and saves configuration from XDG-compliant paths.
//! Config location: ~/.config/pinpoint/config.toml

pub mod defaults;

use crate::coord::Coordinates;
use crate::error::{Error, Result};
use defaults::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Geocoding provider settings
    #[serde(default)]
    pub geocoding: GeocodingConfig,

    /// Reverse-lookup queue settings
    #[serde(default)]
    pub queue: QueueConfig,

    /// Position and permission settings
    #[serde(default)]
    pub position: PositionConfig,

    /// Routing-class operation settings (boundary only)
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Service-area settings
    #[serde(default)]
    pub service_area: ServiceAreaConfig,
}

/// Geocoding provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// Provider base URL
    #[serde(default = "default_provider_url")]
    pub provider_url: String,

    /// Timeout for forward/reverse calls in seconds
    #[serde(default = "default_geocode_timeout")]
    pub timeout_secs: u64,
}

/// Reverse-lookup queue settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Cooldown between serialized requests in milliseconds
    #[serde(default = "default_queue_cooldown")]
    pub cooldown_ms: u64,
}

/// Position and permission settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionConfig {
    /// Timeout for one-shot position requests in seconds
    #[serde(default = "default_position_timeout")]
    pub timeout_secs: u64,

    /// How long to wait for the permission prompt in seconds
    #[serde(default = "default_permission_timeout")]
    pub permission_timeout_secs: u64,
}

/// Routing-class operation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Timeout for routing-class operations in seconds
    #[serde(default = "default_routing_timeout")]
    pub timeout_secs: u64,
}

/// Service-area settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceAreaConfig {
    /// Center latitude
    #[serde(default = "default_center_lat")]
    pub center_lat: f64,

    /// Center longitude
    #[serde(default = "default_center_lng")]
    pub center_lng: f64,

    /// Radius forward geocoding is constrained to, in meters
    #[serde(default = "default_search_radius")]
    pub radius_meters: f64,
}

// Default value functions for serde
fn default_provider_url() -> String {
    DEFAULT_PROVIDER_URL.to_string()
}
fn default_geocode_timeout() -> u64 {
    DEFAULT_GEOCODE_TIMEOUT_SECS
}
fn default_queue_cooldown() -> u64 {
    DEFAULT_QUEUE_COOLDOWN_MS
}
fn default_position_timeout() -> u64 {
    DEFAULT_POSITION_TIMEOUT_SECS
}
fn default_permission_timeout() -> u64 {
    DEFAULT_PERMISSION_TIMEOUT_SECS
}
fn default_routing_timeout() -> u64 {
    DEFAULT_ROUTING_TIMEOUT_SECS
}
fn default_center_lat() -> f64 {
    DEFAULT_CENTER_LAT
}
fn default_center_lng() -> f64 {
    DEFAULT_CENTER_LNG
}
fn default_search_radius() -> f64 {
    DEFAULT_SEARCH_RADIUS_METERS
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            provider_url: default_provider_url(),
            timeout_secs: default_geocode_timeout(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: default_queue_cooldown(),
        }
    }
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_position_timeout(),
            permission_timeout_secs: default_permission_timeout(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_routing_timeout(),
        }
    }
}

impl Default for ServiceAreaConfig {
    fn default() -> Self {
        Self {
            center_lat: default_center_lat(),
            center_lng: default_center_lng(),
            radius_meters: default_search_radius(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(APP_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default path
    ///
    /// Creates default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

            toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(&path, content)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Service-area center as coordinates
    pub fn service_center(&self) -> Coordinates {
        Coordinates::new(self.service_area.center_lat, self.service_area.center_lng)
    }

    /// Geocoding timeout as a duration
    pub fn geocode_timeout(&self) -> Duration {
        Duration::from_secs(self.geocoding.timeout_secs)
    }

    /// Queue cooldown as a duration
    pub fn queue_cooldown(&self) -> Duration {
        Duration::from_millis(self.queue.cooldown_ms)
    }

    /// One-shot position timeout as a duration
    pub fn position_timeout(&self) -> Duration {
        Duration::from_secs(self.position.timeout_secs)
    }

    /// Permission-prompt deadline as a duration
    pub fn permission_timeout(&self) -> Duration {
        Duration::from_secs(self.position.permission_timeout_secs)
    }
}
