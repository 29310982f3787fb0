//! OpenWeatherMap Capability
//!
//! Current conditions for a named location, metric units.

use async_trait::async_trait;
use serde::Deserialize;

use agent_core::{Capability, Result as CoreResult};

use crate::error::{Result, ToolError};

const API_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    main: Main,
    #[serde(default)]
    weather: Vec<Condition>,
    #[serde(default)]
    wind: Wind,
}

#[derive(Debug, Deserialize)]
struct Main {
    temp: f64,
    humidity: u32,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

#[derive(Debug, Default, Deserialize)]
struct Wind {
    #[serde(default)]
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

fn format_report(location: &str, report: &WeatherResponse) -> String {
    let status = report
        .weather
        .first()
        .map_or("unknown conditions", |c| c.description.as_str());
    format!(
        "Current weather in {location}: {}°C, {status}, Humidity: {}%, Wind Speed: {} m/s",
        report.main.temp, report.main.humidity, report.wind.speed
    )
}

pub struct OpenWeatherMap {
    client: reqwest::Client,
    api_key: String,
}

impl OpenWeatherMap {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
        }
    }

    async fn current(&self, location: &str) -> Result<String> {
        let failed = |cause: String| ToolError::Weather {
            location: location.to_string(),
            cause,
        };

        let response = self
            .client
            .get(API_URL)
            .query(&[("q", location), ("appid", self.api_key.as_str()), ("units", "metric")])
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let cause = response
                .json::<ErrorResponse>()
                .await
                .map_or_else(|_| status.to_string(), |body| body.message);
            return Err(failed(cause));
        }

        let report: WeatherResponse = response.json().await.map_err(|e| failed(e.to_string()))?;
        Ok(format_report(location, &report))
    }
}

#[async_trait]
impl Capability for OpenWeatherMap {
    async fn run(&self, input: &str) -> CoreResult<String> {
        let location = input.trim().trim_matches(|c| c == '"' || c == '\'');
        Ok(self.current(location).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_format() {
        let body = r#"{
            "weather": [{"id": 800, "main": "Clear", "description": "clear sky"}],
            "main": {"temp": 21.5, "feels_like": 21.0, "humidity": 40},
            "wind": {"speed": 3.6, "deg": 200},
            "name": "Beijing"
        }"#;
        let report: WeatherResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            format_report("Beijing", &report),
            "Current weather in Beijing: 21.5°C, clear sky, Humidity: 40%, Wind Speed: 3.6 m/s"
        );
    }

    #[test]
    fn test_error_body() {
        let body: ErrorResponse =
            serde_json::from_str(r#"{"cod": "404", "message": "city not found"}"#).unwrap();
        assert_eq!(body.message, "city not found");
    }
}
