//! The weather state store: tracked cities, suggestions, forecasts and the
//! request status, reconciled against provider responses.
//!
//! State lives behind a mutex that is never held across an `.await`. Provider
//! calls run unlocked; their results are applied under the lock, and any
//! change to the tracked list is persisted before the lock is released, so
//! each write is a full, consistent snapshot.
//!
//! `status` is a single flag shared by weather, suggestion and forecast
//! requests. A failed forecast therefore shows as `failed` even if a weather
//! fetch that raced with it succeeded.

use parking_lot::{Mutex, MutexGuard};
use std::{collections::HashMap, sync::Arc};

use crate::{
    error::{Error, Result},
    model::{CitySuggestion, HourlyForecastPoint, RequestStatus, TrackedCity},
    provider::{SUGGESTION_LIMIT, WeatherProvider},
    storage::Persistence,
};

/// Everything a view renders from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherState {
    pub cities: Vec<TrackedCity>,
    pub suggestions: Vec<CitySuggestion>,
    /// Keyed by the city name the forecast was requested with.
    pub hourly_forecast: HashMap<String, Vec<HourlyForecastPoint>>,
    pub status: RequestStatus,
    pub error: Option<String>,
}

impl WeatherState {
    fn start_request(&mut self) {
        self.status = RequestStatus::Loading;
        self.error = None;
    }

    fn fail(&mut self, err: &Error) {
        self.status = RequestStatus::Failed;
        self.error = Some(err.to_string());
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.cities.iter().position(|c| c.id == id)
    }
}

/// Issued by [`WeatherStore::begin_search`]. A search result carrying a
/// ticket is applied only while no newer ticket has been issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTicket(u64);

#[derive(Debug, Default)]
struct Inner {
    view: WeatherState,
    search_generation: u64,
}

#[derive(Debug)]
pub struct WeatherStore {
    provider: Arc<dyn WeatherProvider>,
    persistence: Persistence,
    inner: Mutex<Inner>,
}

impl WeatherStore {
    /// Builds the store from the persisted city list.
    pub fn new(provider: Arc<dyn WeatherProvider>, persistence: Persistence) -> Self {
        let mut cities: Vec<TrackedCity> = Vec::new();
        for city in persistence.load_cities() {
            if cities.iter().any(|c| c.id == city.id) {
                tracing::warn!(id = %city.id, "dropping duplicate persisted city");
                continue;
            }
            cities.push(city);
        }
        tracing::debug!(count = cities.len(), "loaded tracked cities");

        let view = WeatherState { cities, ..WeatherState::default() };
        Self { provider, persistence, inner: Mutex::new(Inner { view, search_generation: 0 }) }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock()
    }

    // Write failures are logged; the in-memory list stays authoritative.
    fn persist(&self, cities: &[TrackedCity]) {
        if let Err(e) = self.persistence.save_cities(cities) {
            tracing::warn!(error = %e, "failed to persist tracked cities");
        }
    }

    pub fn snapshot(&self) -> WeatherState {
        self.lock().view.clone()
    }

    pub fn cities(&self) -> Vec<TrackedCity> {
        self.lock().view.cities.clone()
    }

    pub fn suggestions(&self) -> Vec<CitySuggestion> {
        self.lock().view.suggestions.clone()
    }

    pub fn hourly_forecast(&self, city_name: &str) -> Option<Vec<HourlyForecastPoint>> {
        self.lock().view.hourly_forecast.get(city_name).cloned()
    }

    pub fn status(&self) -> RequestStatus {
        self.lock().view.status
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().view.error.clone()
    }

    /// Tracked city whose display name matches, ignoring case.
    pub fn find_by_name(&self, name: &str) -> Option<TrackedCity> {
        let needle = name.to_lowercase();
        self.lock().view.cities.iter().find(|c| c.name.to_lowercase() == needle).cloned()
    }

    /// Replace the suggestion list with the provider's answer for `query`.
    ///
    /// Overlapping calls are not ordered: whichever response arrives last
    /// wins. On failure the previous suggestions are kept.
    pub async fn search_cities(&self, query: &str) -> Result<Vec<CitySuggestion>> {
        let result = self.provider.suggest_cities(query, SUGGESTION_LIMIT).await;

        let mut inner = self.lock();
        match result {
            Ok(suggestions) => {
                inner.view.suggestions = suggestions.clone();
                Ok(suggestions)
            }
            Err(e) => {
                inner.view.fail(&e);
                Err(e)
            }
        }
    }

    /// Invalidates every ticket issued before this one.
    pub fn begin_search(&self) -> SearchTicket {
        let mut inner = self.lock();
        inner.search_generation += 1;
        SearchTicket(inner.search_generation)
    }

    pub fn is_current(&self, ticket: SearchTicket) -> bool {
        self.lock().search_generation == ticket.0
    }

    /// Like [`search_cities`](Self::search_cities), but the outcome is
    /// dropped if `ticket` was superseded while the request was in flight.
    /// Returns `Ok(None)` for a dropped outcome, error or not.
    pub async fn search_cities_for(
        &self,
        ticket: SearchTicket,
        query: &str,
    ) -> Result<Option<Vec<CitySuggestion>>> {
        let result = self.provider.suggest_cities(query, SUGGESTION_LIMIT).await;

        let mut inner = self.lock();
        if inner.search_generation != ticket.0 {
            tracing::debug!(query, "dropping superseded search result");
            return Ok(None);
        }
        match result {
            Ok(suggestions) => {
                inner.view.suggestions = suggestions.clone();
                Ok(Some(suggestions))
            }
            Err(e) => {
                inner.view.fail(&e);
                Err(e)
            }
        }
    }

    /// Fetch current conditions for `city_name`.
    ///
    /// A city already tracked under the returned id is replaced in place and
    /// the list persisted. An untracked result is only returned; use
    /// [`add_city`](Self::add_city) to track it.
    pub async fn fetch_weather(&self, city_name: &str) -> Result<TrackedCity> {
        self.lock().view.start_request();

        let result = self.provider.current_weather(city_name).await;

        let mut inner = self.lock();
        match result {
            Ok(city) => {
                inner.view.status = RequestStatus::Idle;
                if let Some(idx) = inner.view.position(&city.id) {
                    inner.view.cities[idx] = city.clone();
                    self.persist(&inner.view.cities);
                }
                Ok(city)
            }
            Err(e) => {
                inner.view.fail(&e);
                Err(e)
            }
        }
    }

    /// Append `city` unless its id is already tracked. Returns whether the
    /// list changed.
    pub fn add_city(&self, city: TrackedCity) -> bool {
        let mut inner = self.lock();
        if inner.view.position(&city.id).is_some() {
            return false;
        }

        tracing::info!(id = %city.id, name = %city.name, "tracking city");
        inner.view.cities.push(city);
        self.persist(&inner.view.cities);
        true
    }

    /// Replace the tracked entry with the same id. Returns whether it existed.
    pub fn update_city(&self, city: TrackedCity) -> bool {
        let mut inner = self.lock();
        let Some(idx) = inner.view.position(&city.id) else {
            return false;
        };

        inner.view.cities[idx] = city;
        self.persist(&inner.view.cities);
        true
    }

    /// Stop tracking `id`. Absent ids leave state and storage untouched.
    pub fn remove_city(&self, id: &str) -> bool {
        let mut inner = self.lock();
        let Some(idx) = inner.view.position(id) else {
            return false;
        };

        let removed = inner.view.cities.remove(idx);
        tracing::info!(id = %removed.id, name = %removed.name, "stopped tracking city");
        self.persist(&inner.view.cities);
        true
    }

    /// Fetch the forecast and store it under `city_name`, replacing any
    /// previous sequence for that name.
    pub async fn fetch_hourly_forecast(&self, city_name: &str) -> Result<Vec<HourlyForecastPoint>> {
        let result = self.provider.hourly_forecast(city_name).await;

        let mut inner = self.lock();
        match result {
            Ok(points) => {
                inner.view.hourly_forecast.insert(city_name.to_string(), points.clone());
                Ok(points)
            }
            Err(e) => {
                inner.view.fail(&e);
                Err(e)
            }
        }
    }

    /// Fetch weather for a picked suggestion and track it if it is new.
    pub async fn select_suggestion(&self, suggestion: &CitySuggestion) -> Result<TrackedCity> {
        let city = self.fetch_weather(&suggestion.query()).await?;
        self.add_city(city.clone());
        Ok(city)
    }

    /// Fetch weather for every tracked city that has no snapshot yet.
    pub async fn hydrate_missing(&self) -> Vec<Result<TrackedCity>> {
        let names: Vec<String> = self
            .lock()
            .view
            .cities
            .iter()
            .filter(|c| c.weather.is_none())
            .map(|c| c.name.clone())
            .collect();

        self.fetch_many(names).await
    }

    /// Re-fetch every tracked city concurrently.
    pub async fn refresh_all(&self) -> Vec<Result<TrackedCity>> {
        let names: Vec<String> = self.lock().view.cities.iter().map(|c| c.name.clone()).collect();
        self.fetch_many(names).await
    }

    /// Current weather and hourly forecast for one city, requested together.
    pub async fn load_detail(
        &self,
        city_name: &str,
    ) -> (Result<TrackedCity>, Result<Vec<HourlyForecastPoint>>) {
        tokio::join!(self.fetch_weather(city_name), self.fetch_hourly_forecast(city_name))
    }

    async fn fetch_many(&self, names: Vec<String>) -> Vec<Result<TrackedCity>> {
        futures::future::join_all(names.iter().map(|name| self.fetch_weather(name))).await
    }
}
