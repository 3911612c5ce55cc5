//! pinpoint: asynchronous location resolution
//!
//! A library that resolves human-readable addresses and geographic
//! coordinates on behalf of client features (a ride-booking UI, a map
//! renderer) while respecting device permission state, provider rate
//! limits, and strict latency bounds.
//!
//! ## Components
//!
//! - Permission negotiation state machine ([`permission`])
//! - Bounded-latency resolution: provider call raced against a timeout
//!   with guaranteed single outcome ([`race`], [`geocode`])
//! - Single-flight FIFO queue for burst reverse lookups ([`queue`])
//! - Continuous/one-shot position sessions ([`position`])
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pinpoint::geocode::nominatim::NominatimBackend;
//! use pinpoint::geocode::GeocodeRunner;
//! use pinpoint::Coordinates;
//! use std::sync::Arc;
//!
//! # async fn example() -> pinpoint::Result<()> {
//! let runner = GeocodeRunner::new(Arc::new(NominatimBackend::new()));
//! let center = Coordinates::new(40.7128, -74.0060); // NYC
//!
//! // Forward geocoding, biased to the service area around `center`
//! let coords = runner.resolve_coordinate("350 5th Ave", center).await?;
//!
//! // Reverse geocoding, latency-bounded
//! let address = runner.resolve_address(coords).await?;
//! println!("{}", address);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod coord;
pub mod error;
pub mod geocode;
pub mod permission;
pub mod position;
pub mod queue;
pub mod race;
pub mod service;

// Re-export commonly used types
pub use config::Config;
pub use coord::Coordinates;
pub use error::{Error, Result};
pub use geocode::{GeocodeRunner, ResolvedAddress};
pub use permission::{AccessDecision, PermissionCoordinator, PermissionState};
pub use position::PositionSession;
pub use queue::RequestSerializer;
pub use service::{LocationService, RouteResult};
