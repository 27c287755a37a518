use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A city on the user's watch list.
///
/// Identity is the provider-assigned `id`; `name` is only what the user
/// searched for and is used as the query for later fetches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedCity {
    #[serde(deserialize_with = "deserialize_city_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub weather: Option<WeatherSnapshot>,
    /// Offset from UTC in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<i32>,
}

impl TrackedCity {
    /// Current wall-clock time in the city, if its UTC offset is known.
    pub fn local_time(&self, now: DateTime<Utc>) -> Option<DateTime<FixedOffset>> {
        let offset = FixedOffset::east_opt(self.timezone?)?;
        Some(now.with_timezone(&offset))
    }
}

/// Current conditions for a city. Always replaced as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub icon: String,
    pub main: String,
    pub description: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub max_temp: f64,
}

impl WeatherSnapshot {
    pub fn icon_url(&self) -> Option<String> {
        if self.icon.is_empty() {
            return None;
        }
        Some(format!("https://openweathermap.org/img/wn/{}@2x.png", self.icon))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitySuggestion {
    pub name: String,
    pub country: String,
}

impl CitySuggestion {
    /// Query string used when the user picks this suggestion.
    pub fn query(&self) -> String {
        format!("{}, {}", self.name, self.country)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyForecastPoint {
    /// Provider timestamp label, kept opaque.
    pub time: String,
    pub temperature: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub city: String,
    pub country: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Idle,
    Loading,
    Failed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Idle => "idle",
            RequestStatus::Loading => "loading",
            RequestStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Lists written by older clients store the provider's numeric id verbatim.
fn deserialize_city_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn london() -> TrackedCity {
        TrackedCity {
            id: "2643743".into(),
            name: "London".into(),
            weather: Some(WeatherSnapshot {
                icon: "04d".into(),
                main: "Clouds".into(),
                description: "broken clouds".into(),
                temperature: 12.3,
                feels_like: 11.1,
                max_temp: 13.9,
            }),
            timezone: Some(0),
        }
    }

    #[test]
    fn numeric_id_is_normalised_to_string() {
        let city: TrackedCity =
            serde_json::from_str(r#"{"id": 2643743, "name": "London", "weather": null}"#).unwrap();
        assert_eq!(city.id, "2643743");
        assert!(city.weather.is_none());
        assert!(city.timezone.is_none());
    }

    #[test]
    fn tracked_list_survives_json() {
        let list = vec![london(), TrackedCity { id: "1".into(), name: "Nowhere".into(), weather: None, timezone: None }];
        let json = serde_json::to_string(&list).unwrap();
        let back: Vec<TrackedCity> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, list);
    }

    #[test]
    fn local_time_applies_offset() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut tokyo = london();
        tokyo.timezone = Some(9 * 3600);

        let local = tokyo.local_time(now).unwrap();
        assert_eq!(local.format("%H:%M").to_string(), "21:00");

        tokyo.timezone = None;
        assert!(tokyo.local_time(now).is_none());
    }

    #[test]
    fn icon_url_uses_provider_cdn() {
        let snapshot = london().weather.unwrap();
        assert_eq!(
            snapshot.icon_url().as_deref(),
            Some("https://openweathermap.org/img/wn/04d@2x.png")
        );
    }

    #[test]
    fn suggestion_query_includes_country() {
        let s = CitySuggestion { name: "Paris".into(), country: "FR".into() };
        assert_eq!(s.query(), "Paris, FR");
    }

    #[test]
    fn status_serialises_lowercase() {
        assert_eq!(serde_json::to_string(&RequestStatus::Failed).unwrap(), "\"failed\"");
        assert_eq!(RequestStatus::default(), RequestStatus::Idle);
    }
}
