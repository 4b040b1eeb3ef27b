use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use crate::{
    error::{PipelineError, Result},
    model::WeatherReading,
};

use super::WeatherProvider;

const WEATHER_PATH: &str = "/data/2.5/weather";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    url: String,
    city: String,
    api_key: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(base_url: &str, city: &str, api_key: &str) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            url: format!("{}{}", base_url.trim_end_matches('/'), WEATHER_PATH),
            city: city.to_string(),
            api_key: api_key.to_string(),
            http,
        })
    }

    async fn get(&self) -> reqwest::Result<reqwest::Response> {
        self.http
            .get(&self.url)
            .query(&[("q", self.city.as_str()), ("appid", self.api_key.as_str())])
            .send()
            .await
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn is_ready(&self) -> Result<bool> {
        match self.get().await {
            Ok(res) => {
                let status = res.status();
                debug!(%status, city = %self.city, "OpenWeather readiness probe");
                Ok(status == StatusCode::OK)
            }
            Err(e) => {
                warn!(error = %e, "OpenWeather readiness probe could not connect");
                Ok(false)
            }
        }
    }

    async fn fetch(&self) -> Result<WeatherReading> {
        let res = self.get().await?;

        let status = res.status();
        let body = res.text().await?;

        debug!(%status, body = %body, "OpenWeather current weather response");

        if !status.is_success() {
            return Err(PipelineError::Extraction(format!(
                "OpenWeather current request failed with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        parse_weather_body(&body)
    }
}

/// Parse a response body into a [`WeatherReading`].
///
/// Only checks that the body is a JSON object; field-level validation happens
/// in the transform stage.
pub fn parse_weather_body(body: &str) -> Result<WeatherReading> {
    let payload: serde_json::Value = serde_json::from_str(body).map_err(|e| {
        PipelineError::Extraction(format!("Failed to parse OpenWeather current JSON: {e}"))
    })?;

    if !payload.is_object() {
        return Err(PipelineError::Extraction(format!(
            "OpenWeather response is not a JSON object: {}",
            truncate_body(body)
        )));
    }

    Ok(WeatherReading::new(payload))
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
