use chrono::NaiveDateTime;
use reqwest::Url;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::fetch::FetchError;

pub const OPEN_METEO_ENDPOINT: &str = "https://api.open-meteo.com/v1/forecast";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, String> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(format!("location out of range: {latitude}, {longitude}"));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// Current conditions as reported by Open-Meteo.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Observation {
    #[serde(rename = "temperature")]
    pub temperature_c: f64,
    #[serde(rename = "weathercode")]
    pub code: u16,
    #[serde(rename = "windspeed")]
    pub wind_kmh: f64,
    #[serde(rename = "time")]
    pub observed_at: String,
}

impl Observation {
    pub fn condition(&self) -> &'static str {
        describe_code(self.code)
    }

    /// Local `HH:MM` of the observation, or the raw timestamp when it does
    /// not parse.
    pub fn observed_clock(&self) -> String {
        NaiveDateTime::parse_from_str(&self.observed_at, "%Y-%m-%dT%H:%M")
            .map(|time| time.format("%H:%M").to_string())
            .unwrap_or_else(|_| self.observed_at.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WeatherView {
    Loading,
    LocationUnavailable(String),
    Ready(Observation),
    Failed(String),
}

impl WeatherView {
    pub fn from_result(result: Result<Observation, FetchError>) -> Self {
        match result {
            Ok(observation) => WeatherView::Ready(observation),
            Err(err) => WeatherView::Failed(format!("Could not load weather: {err}")),
        }
    }

    pub fn location_missing() -> Self {
        WeatherView::LocationUnavailable(
            "Location not configured. Set [weather] latitude and longitude to see weather."
                .to_string(),
        )
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current_weather: Option<Observation>,
    #[serde(default)]
    reason: Option<String>,
}

pub fn forecast_url(location: Location) -> String {
    let latitude = format!("{:.4}", location.latitude);
    let longitude = format!("{:.4}", location.longitude);
    match Url::parse_with_params(
        OPEN_METEO_ENDPOINT,
        &[
            ("latitude", latitude.as_str()),
            ("longitude", longitude.as_str()),
            ("current_weather", "true"),
            ("timezone", "auto"),
        ],
    ) {
        Ok(url) => url.to_string(),
        Err(_) => format!(
            "{OPEN_METEO_ENDPOINT}?latitude={latitude}&longitude={longitude}&current_weather=true&timezone=auto"
        ),
    }
}

pub fn parse_forecast(body: &str) -> Result<Observation, FetchError> {
    let response: ForecastResponse =
        serde_json::from_str(body).map_err(|err| FetchError::Parse(err.to_string()))?;
    match response.current_weather {
        Some(observation) => Ok(observation),
        None => Err(match response.reason {
            Some(reason) => FetchError::Api(reason),
            None => FetchError::Parse("missing current_weather".to_string()),
        }),
    }
}

pub struct WeatherClient {
    client: Client,
}

impl WeatherClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn fetch(&self, location: Location) -> Result<Observation, FetchError> {
        let url = forecast_url(location);
        debug!(%url, "fetching weather");
        let response = self.client.get(&url).send()?;
        let status = response.status();
        let body = response.text()?;

        match parse_forecast(&body) {
            Ok(observation) => Ok(observation),
            Err(_) if !status.is_success() => {
                warn!(status = status.as_u16(), "weather request rejected");
                Err(FetchError::Status {
                    status: status.as_u16(),
                })
            }
            Err(err) => Err(err),
        }
    }
}

/// WMO weather interpretation codes.
pub fn describe_code(code: u16) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 | 48 => "Fog",
        51 | 53 | 55 => "Drizzle",
        56 | 57 => "Freezing drizzle",
        61 | 63 | 65 => "Rain",
        66 | 67 => "Freezing rain",
        71 | 73 | 75 => "Snow",
        77 => "Snow grains",
        80..=82 => "Rain showers",
        85 | 86 => "Snow showers",
        95 => "Thunderstorm",
        96 | 99 => "Thunderstorm with hail",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::{forecast_url, parse_forecast, Location, WeatherView};
    use crate::fetch::FetchError;

    #[test]
    fn builds_url_with_four_decimals() {
        let location = Location::new(52.520008, 13.404954).expect("location");
        let url = forecast_url(location);
        assert!(url.starts_with("https://api.open-meteo.com/v1/forecast?"));
        assert!(url.contains("latitude=52.5200"));
        assert!(url.contains("longitude=13.4050"));
        assert!(url.contains("current_weather=true"));
    }

    #[test]
    fn rejects_out_of_range_location() {
        assert!(Location::new(91.0, 0.0).is_err());
        assert!(Location::new(0.0, -181.0).is_err());
    }

    #[test]
    fn parses_current_weather() {
        let body = r#"{"latitude":52.52,"current_weather":{"temperature":21.4,"windspeed":9.7,"winddirection":250,"weathercode":3,"time":"2026-10-16T14:30"}}"#;
        let observation = parse_forecast(body).expect("payload should parse");
        assert_eq!(observation.temperature_c, 21.4);
        assert_eq!(observation.code, 3);
        assert_eq!(observation.condition(), "Overcast");
        assert_eq!(observation.observed_clock(), "14:30");
    }

    #[test]
    fn malformed_payload_becomes_failed_view() {
        let err = parse_forecast(r#"{"error":true,"reason":"Latitude must be in range"}"#)
            .expect_err("payload has no weather");
        assert!(matches!(err, FetchError::Api(_)));

        let view = WeatherView::from_result(parse_forecast("<html>"));
        match view {
            WeatherView::Failed(message) => assert!(message.starts_with("Could not load weather")),
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
