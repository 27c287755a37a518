//! Core library for the SkyCast weather dashboard.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The weather state store (tracked cities, suggestions, forecasts, status)
//! - Provider clients behind narrow ports (weather, reverse geocoding, HTTP)
//! - Location resolution and local persistence
//!
//! It is used by `skycast-cli`, but any front end can own a [`WeatherStore`]
//! and render from its state.

pub mod config;
pub mod error;
pub mod geocode;
pub mod http;
pub mod location;
pub mod model;
pub mod provider;
pub mod search;
pub mod storage;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{Config, Endpoints, LocationConfig, ProviderConfig};
pub use error::{Error, Result};
pub use geocode::{GoogleGeocoder, ReverseGeocoder};
pub use http::{HttpJsonClient, HttpResponse, ReqwestClient};
pub use location::{ConfiguredCoordinates, CoordinateSource, LocationResolver};
pub use model::{
    CitySuggestion, Coordinates, HourlyForecastPoint, RequestStatus, ResolvedLocation,
    TrackedCity, WeatherSnapshot,
};
pub use provider::{ProviderId, WeatherProvider, provider_from_config};
pub use search::SuggestionSearch;
pub use storage::{FileStore, KeyValueStore, MemoryStore, Persistence};
pub use store::{SearchTicket, WeatherState, WeatherStore};
