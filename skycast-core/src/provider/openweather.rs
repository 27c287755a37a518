use async_trait::async_trait;
use serde::{Deserialize, de::DeserializeOwned};
use std::{fmt, sync::Arc};

use crate::{
    error::{Error, Result},
    http::{HttpJsonClient, HttpResponse, truncate_body},
    model::{CitySuggestion, HourlyForecastPoint, TrackedCity, WeatherSnapshot},
};

use super::WeatherProvider;

const CURRENT_PATH: &str = "/data/2.5/weather";
const FORECAST_PATH: &str = "/data/2.5/forecast";
const GEO_DIRECT_PATH: &str = "/geo/1.0/direct";

#[derive(Clone)]
pub struct OpenWeatherProvider {
    api_key: Option<String>,
    base_url: String,
    http: Arc<dyn HttpJsonClient>,
}

impl fmt::Debug for OpenWeatherProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenWeatherProvider")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl OpenWeatherProvider {
    pub fn new(api_key: Option<String>, base_url: String, http: Arc<dyn HttpJsonClient>) -> Self {
        Self { api_key, base_url, http }
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            Error::Configuration(
                "No API key configured for provider 'openweather'.\n\
                 Hint: run `skycast configure openweather` or set SKYCAST_WEATHER_API_KEY."
                    .to_string(),
            )
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        what: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let res = self.http.get(&url, query).await?;

        if !res.is_success() {
            return Err(Error::provider(failure_message(what, &res)));
        }

        serde_json::from_str(&res.body)
            .map_err(|e| Error::provider(format!("Failed to parse OpenWeather {what} JSON: {e}")))
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn suggest_cities(&self, query: &str, limit: u32) -> Result<Vec<CitySuggestion>> {
        let api_key = self.api_key()?;
        let limit = limit.to_string();

        let parsed: Vec<OwGeoEntry> = self
            .get_json(
                "city search",
                GEO_DIRECT_PATH,
                &[("q", query), ("limit", limit.as_str()), ("appid", api_key)],
            )
            .await?;

        Ok(parsed
            .into_iter()
            .map(|e| CitySuggestion { name: e.name, country: e.country })
            .collect())
    }

    async fn current_weather(&self, city_name: &str) -> Result<TrackedCity> {
        let api_key = self.api_key()?;

        let parsed: OwCurrentResponse = self
            .get_json(
                "current weather",
                CURRENT_PATH,
                &[("q", city_name), ("appid", api_key), ("units", "metric")],
            )
            .await?;

        let condition = parsed.weather.into_iter().next().ok_or_else(|| {
            Error::provider("OpenWeather current weather response contained no conditions")
        })?;

        Ok(TrackedCity {
            id: parsed.id.to_string(),
            name: city_name.to_string(),
            weather: Some(WeatherSnapshot {
                icon: condition.icon,
                main: condition.main,
                description: condition.description,
                temperature: parsed.main.temp,
                feels_like: parsed.main.feels_like,
                max_temp: parsed.main.temp_max,
            }),
            timezone: parsed.timezone,
        })
    }

    async fn hourly_forecast(&self, city_name: &str) -> Result<Vec<HourlyForecastPoint>> {
        let api_key = self.api_key()?;

        let parsed: OwForecastResponse = self
            .get_json(
                "forecast",
                FORECAST_PATH,
                &[("q", city_name), ("appid", api_key), ("units", "metric")],
            )
            .await?;

        Ok(parsed
            .list
            .into_iter()
            .map(|e| HourlyForecastPoint { time: e.dt_txt, temperature: e.main.temp })
            .collect())
    }
}

/// Prefer the provider's own message ("city not found") over the raw body.
fn failure_message(what: &str, res: &HttpResponse) -> String {
    match serde_json::from_str::<OwErrorBody>(&res.body) {
        Ok(err) if !err.message.is_empty() => err.message,
        _ => format!(
            "OpenWeather {what} request failed with status {}: {}",
            res.status,
            truncate_body(&res.body),
        ),
    }
}

#[derive(Debug, Deserialize)]
struct OwErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct OwGeoEntry {
    name: String,
    #[serde(default)]
    country: String,
}

#[derive(Debug, Deserialize)]
struct OwCondition {
    icon: String,
    main: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    temp_max: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    id: u64,
    weather: Vec<OwCondition>,
    main: OwMain,
    timezone: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct OwForecastMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt_txt: String,
    main: OwForecastMain,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    list: Vec<OwForecastEntry>,
}
