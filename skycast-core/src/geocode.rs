//! Reverse geocoding: coordinates to a city/country pair.
//! Uses the Google Geocoding API (`status` + `results[].address_components`).

use async_trait::async_trait;
use serde::Deserialize;
use std::{fmt, sync::Arc};

use crate::{
    error::{Error, Result},
    http::HttpJsonClient,
    model::{Coordinates, ResolvedLocation},
};

const GEOCODE_PATH: &str = "/maps/api/geocode/json";
const UNKNOWN: &str = "Unknown";

#[async_trait]
pub trait ReverseGeocoder: Send + Sync + fmt::Debug {
    async fn reverse(&self, coords: Coordinates) -> Result<ResolvedLocation>;
}

#[derive(Clone)]
pub struct GoogleGeocoder {
    api_key: Option<String>,
    base_url: String,
    http: Arc<dyn HttpJsonClient>,
}

impl fmt::Debug for GoogleGeocoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleGeocoder")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GoogleGeocoder {
    pub fn new(api_key: Option<String>, base_url: String, http: Arc<dyn HttpJsonClient>) -> Self {
        Self { api_key, base_url, http }
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    address_components: Vec<AddressComponent>,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    long_name: String,
    #[serde(default)]
    types: Vec<String>,
}

fn component(components: &[AddressComponent], kind: &str) -> String {
    components
        .iter()
        .find(|c| c.types.iter().any(|t| t == kind))
        .map(|c| c.long_name.clone())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

#[async_trait]
impl ReverseGeocoder for GoogleGeocoder {
    async fn reverse(&self, coords: Coordinates) -> Result<ResolvedLocation> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            Error::Configuration(
                "No API key configured for provider 'google'.\n\
                 Hint: run `skycast configure google` or set SKYCAST_GEOCODING_API_KEY."
                    .to_string(),
            )
        })?;

        let url = format!("{}{}", self.base_url.trim_end_matches('/'), GEOCODE_PATH);
        let latlng = format!("{},{}", coords.latitude, coords.longitude);

        let res = self.http.get(&url, &[("latlng", latlng.as_str()), ("key", api_key)]).await?;
        if !res.is_success() {
            tracing::debug!(status = res.status, "reverse geocode returned non-success status");
            return Err(Error::provider("Failed to fetch location data"));
        }

        let body: GeocodeResponse = serde_json::from_str(&res.body).map_err(|e| {
            tracing::debug!("reverse geocode parse error: {e}");
            Error::provider("Failed to fetch location data")
        })?;

        if body.status != "OK" {
            tracing::debug!(status = %body.status, "reverse geocode status not OK");
            return Err(Error::provider("Unable to retrieve your location details"));
        }

        let Some(first) = body.results.first() else {
            tracing::debug!("reverse geocode returned no results");
            return Err(Error::provider("Failed to fetch location data"));
        };
        let components = first.address_components.as_slice();

        let location = ResolvedLocation {
            city: component(components, "locality"),
            country: component(components, "country"),
        };

        tracing::info!(city = %location.city, country = %location.country, "reverse geocoded");
        Ok(location)
    }
}
