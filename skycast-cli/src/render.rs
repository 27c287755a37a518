use chrono::{DateTime, Utc};
use skycast_core::{
    CitySuggestion, Error, HourlyForecastPoint, RequestStatus, ResolvedLocation, TrackedCity,
    WeatherState,
};
use std::fmt::Write;

const BAR_WIDTH: f64 = 30.0;

/// Header line: where the user is, or why we don't know.
pub fn location_line(location: &Result<ResolvedLocation, Error>) -> String {
    match location {
        Ok(loc) => format!("📍 {}, {}", loc.city, loc.country),
        Err(Error::Provider(msg)) => format!("📍 {msg}"),
        Err(e) => format!("📍 {}", e.user_message()),
    }
}

pub fn city_card(city: &TrackedCity, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    let clock = city
        .local_time(now)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string());
    let _ = writeln!(out, "{}  [{}]  {clock}", city.name, city.id);

    match &city.weather {
        Some(w) => {
            let _ = writeln!(
                out,
                "  {:.1}°C  {}  (feels like {:.1}°)",
                w.temperature, w.main, w.feels_like
            );
            let _ = writeln!(out, "  {}. The high temp will be: {:.1}°", w.description, w.max_temp);
            if let Some(url) = w.icon_url() {
                let _ = writeln!(out, "  icon: {url}");
            }
        }
        None => {
            let _ = writeln!(out, "  Weather data not available");
        }
    }
    out
}

pub fn city_list(state: &WeatherState, now: DateTime<Utc>) -> String {
    if state.cities.is_empty() {
        return "No cities tracked yet. Try `skycast search <name> --add`.\n".to_string();
    }

    let mut out = String::new();
    for city in &state.cities {
        out.push_str(&city_card(city, now));
        out.push('\n');
    }
    out.push_str(&status_line(state));
    out
}

pub fn status_line(state: &WeatherState) -> String {
    match (state.status, &state.error) {
        (RequestStatus::Failed, Some(msg)) => format!("status: failed ({msg})\n"),
        (status, _) => format!("status: {status}\n"),
    }
}

pub fn suggestions(list: &[CitySuggestion]) -> String {
    if list.is_empty() {
        return "No matching cities.\n".to_string();
    }
    list.iter().enumerate().fold(String::new(), |mut out, (i, s)| {
        let _ = writeln!(out, "{:>2}. {}, {}", i + 1, s.name, s.country);
        out
    })
}

/// Temperature per forecast point as a horizontal bar, scaled between the
/// coldest and warmest point.
pub fn forecast_chart(points: &[HourlyForecastPoint]) -> String {
    if points.is_empty() {
        return "Fetching hourly forecast...\n".to_string();
    }

    let (min, max) = points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        (lo.min(p.temperature), hi.max(p.temperature))
    });
    let span = (max - min).max(f64::EPSILON);

    let mut out = String::new();
    for p in points {
        let len = 1 + ((p.temperature - min) / span * BAR_WIDTH).round() as usize;
        let _ = writeln!(out, "{:<19} {:>6.1}°C {}", p.time, p.temperature, "█".repeat(len));
    }
    out
}
