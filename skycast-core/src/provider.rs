use crate::{
    Config,
    error::Result,
    http::HttpJsonClient,
    model::{CitySuggestion, HourlyForecastPoint, TrackedCity},
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug, sync::Arc};

pub mod openweather;

/// Number of suggestions requested per search.
pub const SUGGESTION_LIMIT: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    /// Weather, forecast and city search.
    OpenWeather,
    /// Reverse geocoding.
    Google,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "openweather",
            ProviderId::Google => "google",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenWeather, ProviderId::Google]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "openweather" => Ok(ProviderId::OpenWeather),
            "google" => Ok(ProviderId::Google),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: openweather, google."
            )),
        }
    }
}

/// Remote weather service as seen by the store.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn suggest_cities(&self, query: &str, limit: u32) -> Result<Vec<CitySuggestion>>;

    /// The returned city carries `city_name` as its display name.
    async fn current_weather(&self, city_name: &str) -> Result<TrackedCity>;

    /// Forecast points in provider (chronological) order.
    async fn hourly_forecast(&self, city_name: &str) -> Result<Vec<HourlyForecastPoint>>;
}

/// Construct the weather provider from config.
///
/// A missing API key is not an error here; every call on the provider fails
/// with a configuration error instead, before touching the network.
pub fn provider_from_config(
    config: &Config,
    http: Arc<dyn HttpJsonClient>,
) -> Arc<dyn WeatherProvider> {
    let api_key = config.provider_api_key(ProviderId::OpenWeather).map(str::to_owned);

    Arc::new(OpenWeatherProvider::new(
        api_key,
        config.endpoints.openweather_base_url.clone(),
        http,
    ))
}
