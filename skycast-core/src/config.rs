use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::PathBuf};

use crate::{model::Coordinates, provider::ProviderId};

pub const WEATHER_API_KEY_ENV: &str = "SKYCAST_WEATHER_API_KEY";
pub const GEOCODING_API_KEY_ENV: &str = "SKYCAST_GEOCODING_API_KEY";

pub const DEFAULT_OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org";
pub const DEFAULT_GEOCODING_BASE_URL: &str = "https://maps.googleapis.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration for a single provider (e.g., API key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
}

/// Base URLs of the remote services, overridable for local testing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub openweather_base_url: String,
    pub geocoding_base_url: String,
    pub timeout_secs: u64,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            openweather_base_url: DEFAULT_OPENWEATHER_BASE_URL.to_string(),
            geocoding_base_url: DEFAULT_GEOCODING_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Where the device "is". `enabled = false` behaves like a denied permission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub enabled: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self { enabled: true, latitude: None, longitude: None }
    }
}

impl LocationConfig {
    pub fn coordinates(&self) -> Option<Coordinates> {
        Some(Coordinates { latitude: self.latitude?, longitude: self.longitude? })
    }
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Example TOML:
    /// [providers.openweather]
    /// api_key = "..."
    /// [providers.google]
    /// api_key = "..."
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    #[serde(default)]
    pub endpoints: Endpoints,

    #[serde(default)]
    pub location: LocationConfig,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "skycast", "skycast")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Directory holding the persisted city list and resolved location.
    pub fn data_dir() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().to_path_buf())
    }

    /// Apply credential overrides from the process environment.
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_env_pairs(std::env::vars());
        self
    }

    pub(crate) fn apply_env_pairs<I, K, V>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let env: HashMap<String, String> =
            pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect();

        for (var, id) in [
            (WEATHER_API_KEY_ENV, ProviderId::OpenWeather),
            (GEOCODING_API_KEY_ENV, ProviderId::Google),
        ] {
            if let Some(key) = env.get(var).map(|v| v.trim()).filter(|v| !v.is_empty()) {
                self.upsert_provider_api_key(id, key.to_string());
            }
        }
    }

    /// Set or replace a provider API key.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.providers.insert(provider_id.as_str().to_string(), ProviderConfig { api_key });
    }

    /// Returns API key for a provider, if present and non-blank.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.providers
            .get(provider_id.as_str())
            .map(|cfg| cfg.api_key.trim())
            .filter(|key| !key.is_empty())
    }

    pub fn is_provider_configured(&self, provider_id: ProviderId) -> bool {
        self.provider_api_key(provider_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderId;

    #[test]
    fn empty_config_has_no_credentials() {
        let cfg = Config::default();

        assert!(!cfg.is_provider_configured(ProviderId::OpenWeather));
        assert!(!cfg.is_provider_configured(ProviderId::Google));
        assert_eq!(cfg.endpoints, Endpoints::default());
        assert!(cfg.location.enabled);
    }

    #[test]
    fn set_api_key_for_provider() {
        let mut cfg = Config::default();

        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "OPEN_KEY".into());

        assert_eq!(cfg.provider_api_key(ProviderId::OpenWeather), Some("OPEN_KEY"));
        assert!(cfg.is_provider_configured(ProviderId::OpenWeather));
        assert!(!cfg.is_provider_configured(ProviderId::Google));
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::Google, "   ".into());

        assert_eq!(cfg.provider_api_key(ProviderId::Google), None);
    }

    #[test]
    fn env_overrides_file_keys() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "FROM_FILE".into());

        cfg.apply_env_pairs([
            (WEATHER_API_KEY_ENV, "FROM_ENV"),
            (GEOCODING_API_KEY_ENV, " GEO "),
            ("UNRELATED", "x"),
        ]);

        assert_eq!(cfg.provider_api_key(ProviderId::OpenWeather), Some("FROM_ENV"));
        assert_eq!(cfg.provider_api_key(ProviderId::Google), Some("GEO"));
    }

    #[test]
    fn empty_env_value_is_ignored() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "FROM_FILE".into());

        cfg.apply_env_pairs([(WEATHER_API_KEY_ENV, "")]);

        assert_eq!(cfg.provider_api_key(ProviderId::OpenWeather), Some("FROM_FILE"));
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [providers.openweather]
            api_key = "abc"

            [location]
            latitude = 51.5
            longitude = -0.12
            "#,
        )
        .unwrap();

        assert_eq!(cfg.provider_api_key(ProviderId::OpenWeather), Some("abc"));
        assert_eq!(cfg.endpoints.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(cfg.location.enabled);
        assert_eq!(
            cfg.location.coordinates(),
            Some(Coordinates { latitude: 51.5, longitude: -0.12 })
        );
    }

    #[test]
    fn coordinates_need_both_axes() {
        let loc = LocationConfig { enabled: true, latitude: Some(1.0), longitude: None };
        assert!(loc.coordinates().is_none());
    }
}
