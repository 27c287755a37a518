//! In-memory fakes for the ports, shared by unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::{
    collections::{HashMap, VecDeque},
    sync::atomic::{AtomicUsize, Ordering},
};
use tokio::sync::oneshot;

use crate::{
    error::{Error, Result},
    http::{HttpJsonClient, HttpResponse},
    model::{CitySuggestion, HourlyForecastPoint, TrackedCity, WeatherSnapshot},
    provider::WeatherProvider,
    storage::KeyValueStore,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
}

/// Replays queued responses in order and records every request.
#[derive(Debug, Default)]
pub struct ScriptedHttp {
    responses: Mutex<VecDeque<HttpResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedHttp {
    pub fn push_json(&self, status: u16, body: serde_json::Value) {
        self.push_raw(status, &body.to_string());
    }

    pub fn push_raw(&self, status: u16, body: &str) {
        self.responses.lock().push_back(HttpResponse { status, body: body.to_string() });
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl HttpJsonClient for ScriptedHttp {
    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<HttpResponse> {
        self.requests.lock().push(RecordedRequest {
            url: url.to_string(),
            query: query.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        });
        self.responses
            .lock()
            .pop_front()
            .ok_or_else(|| Error::provider("no scripted response"))
    }
}

pub fn snapshot(temperature: f64) -> WeatherSnapshot {
    WeatherSnapshot {
        icon: "01d".into(),
        main: "Clear".into(),
        description: "clear sky".into(),
        temperature,
        feels_like: temperature - 1.0,
        max_temp: temperature + 2.0,
    }
}

pub fn city(id: &str, name: &str, temperature: f64) -> TrackedCity {
    TrackedCity {
        id: id.into(),
        name: name.into(),
        weather: Some(snapshot(temperature)),
        timezone: Some(0),
    }
}

/// Scriptable weather provider.
///
/// Responses are keyed by the lowercased query. A gate registered for a query
/// holds the next call for that query until the returned sender fires, which
/// lets tests decide the arrival order of concurrent requests.
#[derive(Debug, Default)]
pub struct FakeProvider {
    weather: Mutex<HashMap<String, Result<TrackedCity>>>,
    suggestions: Mutex<HashMap<String, Result<Vec<CitySuggestion>>>>,
    forecasts: Mutex<VecDeque<Result<Vec<HourlyForecastPoint>>>>,
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    calls: AtomicUsize,
}

impl FakeProvider {
    pub fn set_weather(&self, query: &str, result: Result<TrackedCity>) {
        self.weather.lock().insert(query.to_lowercase(), result);
    }

    pub fn set_suggestions(&self, query: &str, result: Result<Vec<CitySuggestion>>) {
        self.suggestions.lock().insert(query.to_lowercase(), result);
    }

    pub fn push_forecast(&self, result: Result<Vec<HourlyForecastPoint>>) {
        self.forecasts.lock().push_back(result);
    }

    pub fn gate(&self, query: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().insert(query.to_lowercase(), rx);
        tx
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self, query: &str) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().remove(&query.to_lowercase());
        if let Some(rx) = gate {
            let _ = rx.await;
        }
    }
}

#[async_trait]
impl WeatherProvider for FakeProvider {
    async fn suggest_cities(&self, query: &str, _limit: u32) -> Result<Vec<CitySuggestion>> {
        self.enter(query).await;
        self.suggestions
            .lock()
            .get(&query.to_lowercase())
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn current_weather(&self, city_name: &str) -> Result<TrackedCity> {
        self.enter(city_name).await;
        let scripted = self.weather.lock().get(&city_name.to_lowercase()).cloned();
        match scripted {
            Some(Ok(mut city)) => {
                city.name = city_name.to_string();
                Ok(city)
            }
            Some(Err(e)) => Err(e),
            None => Err(Error::provider("city not found")),
        }
    }

    async fn hourly_forecast(&self, city_name: &str) -> Result<Vec<HourlyForecastPoint>> {
        self.enter(city_name).await;
        self.forecasts
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(Error::provider("city not found")))
    }
}

/// Key-value store whose writes always fail.
#[derive(Debug, Default)]
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn set(&self, key: &str, _value: &str) -> Result<()> {
        Err(Error::persistence(format!("disk full while writing {key}")))
    }

    fn remove(&self, _key: &str) -> Result<()> {
        Ok(())
    }
}
