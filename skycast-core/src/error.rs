use thiserror::Error;

/// Errors surfaced by the dashboard core.
///
/// Every variant carries plain strings so an outcome can be cloned and kept
/// around (the location resolver memoises its first result for the session).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A credential or setting required before any network call is missing.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Non-2xx response, malformed payload or an unknown city.
    #[error("{0}")]
    Provider(String),

    #[error("Location permission denied")]
    GeolocationDenied,

    #[error("Location service unavailable")]
    GeolocationUnavailable,

    /// Reading or writing the local key-value store failed.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn provider(msg: impl Into<String>) -> Self {
        Error::Provider(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Error::Persistence(msg.into())
    }

    /// Short placeholder text for views that cannot show the full error.
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::Configuration(_) => "SkyCast is not configured. Run `skycast configure` first.",
            Error::Provider(_) => "Failed to fetch weather data",
            Error::GeolocationDenied => "Unable to retrieve your location",
            Error::GeolocationUnavailable => "Geolocation is not supported on this device",
            Error::Persistence(_) => "Saved data could not be read or written",
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}
