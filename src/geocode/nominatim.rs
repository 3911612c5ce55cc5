//! Nominatim geocoding backend (OpenStreetMap)
//!
//! Uses the free Nominatim API. Rate limit: 1 request per second, which is
//! why burst reverse lookups go through the request serializer rather than
//! hitting this backend directly.

use crate::constants::api::NOMINATIM_URL;
use crate::constants::geo::METERS_PER_DEGREE_LAT;
use crate::coord::Coordinates;
use crate::error::{Error, Result};
use crate::geocode::{AddressComponents, GeocodeBackend};
use serde::Deserialize;

const USER_AGENT: &str = "pinpoint/0.1.0";

/// Nominatim geocoding backend
#[derive(Debug, Clone)]
pub struct NominatimBackend {
    client: reqwest::Client,
    base_url: String,
}

/// Nominatim search response item
#[derive(Debug, Deserialize)]
struct SearchResult {
    lat: String,
    lon: String,
}

/// Nominatim reverse response with address details
#[derive(Debug, Deserialize)]
struct ReverseResult {
    #[serde(default)]
    address: Option<NominatimAddress>,
    /// Present on "unable to geocode" responses
    #[serde(default)]
    error: Option<String>,
}

/// The `address` object from `addressdetails=1`
#[derive(Debug, Deserialize, Default)]
struct NominatimAddress {
    house_number: Option<String>,
    road: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    state: Option<String>,
    postcode: Option<String>,
}

impl NominatimBackend {
    /// Create a backend against the public Nominatim instance
    pub fn new() -> Self {
        Self::with_base_url(NOMINATIM_URL)
    }

    /// Create a backend against a specific Nominatim instance
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Parse lat/lng strings to f64
    fn parse_coords(lat: &str, lng: &str) -> Result<Coordinates> {
        let lat: f64 = lat
            .parse()
            .map_err(|_| Error::GeocodingFailed(format!("Invalid latitude: {}", lat)))?;
        let lng: f64 = lng
            .parse()
            .map_err(|_| Error::GeocodingFailed(format!("Invalid longitude: {}", lng)))?;
        Ok(Coordinates::new(lat, lng))
    }

    /// Bounding box covering a circle around `center`, as Nominatim's
    /// `viewbox` parameter (`left,top,right,bottom`)
    fn viewbox(center: Coordinates, radius_meters: f64) -> String {
        let dlat = radius_meters / METERS_PER_DEGREE_LAT;
        // Longitude degrees shrink with latitude; clamp the cosine so the
        // box stays finite near the poles.
        let cos_lat = center.lat.to_radians().cos().max(0.01);
        let dlng = radius_meters / (METERS_PER_DEGREE_LAT * cos_lat);

        format!(
            "{},{},{},{}",
            center.lng - dlng,
            center.lat + dlat,
            center.lng + dlng,
            center.lat - dlat
        )
    }
}

impl Default for NominatimBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GeocodeBackend for NominatimBackend {
    async fn search(
        &self,
        query: &str,
        center: Coordinates,
        radius_meters: f64,
    ) -> Result<Option<Coordinates>> {
        let url = format!(
            "{}/search?q={}&format=json&limit=1&viewbox={}&bounded=1",
            self.base_url,
            urlencoding::encode(query),
            Self::viewbox(center, radius_meters)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::GeocodingFailed(format!("Nominatim request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::GeocodingFailed(format!(
                "Nominatim returned status: {}",
                response.status()
            )));
        }

        let results: Vec<SearchResult> = response.json().await.map_err(|e| {
            Error::GeocodingFailed(format!("Failed to parse Nominatim response: {}", e))
        })?;

        match results.into_iter().next() {
            Some(result) => Ok(Some(Self::parse_coords(&result.lat, &result.lon)?)),
            None => Ok(None),
        }
    }

    async fn reverse(&self, coords: Coordinates) -> Result<Option<AddressComponents>> {
        let url = format!(
            "{}/reverse?lat={}&lon={}&format=json&addressdetails=1",
            self.base_url, coords.lat, coords.lng
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::GeocodingFailed(format!("Nominatim request failed: {}", e)))?;

        if !response.status().is_success() {
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }
            return Err(Error::GeocodingFailed(format!(
                "Nominatim returned status: {}",
                response.status()
            )));
        }

        let result: ReverseResult = response.json().await.map_err(|e| {
            Error::GeocodingFailed(format!("Failed to parse Nominatim response: {}", e))
        })?;

        if result.error.is_some() {
            return Ok(None);
        }

        let Some(address) = result.address else {
            return Ok(None);
        };

        // Nominatim reports the locality under different keys depending on
        // the place type.
        let locality = address.city.or(address.town).or(address.village);

        Ok(Some(AddressComponents {
            street_number: address.house_number,
            street: address.road,
            locality,
            region: address.state,
            postal_code: address.postcode,
        }))
    }
}
