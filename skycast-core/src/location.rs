//! Resolves the user's approximate city once per session.

use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};
use tokio::sync::Mutex;

use crate::{
    config::LocationConfig,
    error::{Error, Result},
    geocode::ReverseGeocoder,
    model::{Coordinates, ResolvedLocation},
    storage::Persistence,
};

/// Device position. Denied and unavailable are reported as
/// [`Error::GeolocationDenied`] and [`Error::GeolocationUnavailable`].
#[async_trait]
pub trait CoordinateSource: Send + Sync + Debug {
    async fn current_position(&self) -> Result<Coordinates>;
}

/// Position taken from the `[location]` config table.
#[derive(Debug, Clone)]
pub struct ConfiguredCoordinates {
    enabled: bool,
    coords: Option<Coordinates>,
}

impl ConfiguredCoordinates {
    pub fn from_config(cfg: &LocationConfig) -> Self {
        Self { enabled: cfg.enabled, coords: cfg.coordinates() }
    }
}

#[async_trait]
impl CoordinateSource for ConfiguredCoordinates {
    async fn current_position(&self) -> Result<Coordinates> {
        if !self.enabled {
            return Err(Error::GeolocationDenied);
        }
        self.coords.ok_or(Error::GeolocationUnavailable)
    }
}

#[derive(Debug)]
pub struct LocationResolver {
    persistence: Persistence,
    source: Arc<dyn CoordinateSource>,
    geocoder: Arc<dyn ReverseGeocoder>,
    outcome: Mutex<Option<Result<ResolvedLocation>>>,
}

impl LocationResolver {
    pub fn new(
        persistence: Persistence,
        source: Arc<dyn CoordinateSource>,
        geocoder: Arc<dyn ReverseGeocoder>,
    ) -> Self {
        Self { persistence, source, geocoder, outcome: Mutex::new(None) }
    }

    /// Persisted location if any, otherwise coordinates + reverse geocoding.
    ///
    /// The first outcome, success or failure, is kept for the rest of the
    /// session; later calls return it without touching the device or network.
    pub async fn resolve(&self) -> Result<ResolvedLocation> {
        let mut outcome = self.outcome.lock().await;
        if let Some(done) = outcome.as_ref() {
            return done.clone();
        }

        let result = self.resolve_uncached().await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "location could not be resolved");
        }
        *outcome = Some(result.clone());
        result
    }

    /// Drop the persisted location and the session outcome so the next
    /// `resolve` starts over.
    pub async fn forget(&self) -> Result<()> {
        let mut outcome = self.outcome.lock().await;
        *outcome = None;
        self.persistence.clear_location()
    }

    async fn resolve_uncached(&self) -> Result<ResolvedLocation> {
        if let Some(cached) = self.persistence.load_location() {
            tracing::debug!(city = %cached.city, "using persisted location");
            return Ok(cached);
        }

        let coords = self.source.current_position().await?;
        let location = self.geocoder.reverse(coords).await?;

        if let Err(e) = self.persistence.save_location(&location) {
            tracing::warn!(error = %e, "failed to persist resolved location");
        }

        Ok(location)
    }
}
