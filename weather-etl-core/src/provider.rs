use async_trait::async_trait;
use std::fmt::Debug;

use crate::{config::PipelineConfig, error::Result, model::WeatherReading};

pub mod openweather;

pub use openweather::{OpenWeatherProvider, parse_weather_body};

/// Source of current-weather readings for one configured city.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Readiness check. `Ok(false)` means "not ready yet", not a failure.
    async fn is_ready(&self) -> Result<bool>;

    async fn fetch(&self) -> Result<WeatherReading>;
}

/// Construct the OpenWeather provider for a validated config.
pub fn provider_from_config(config: &PipelineConfig) -> Result<Box<dyn WeatherProvider>> {
    let provider = OpenWeatherProvider::new(config.base_url(), config.city(), config.api_key())?;
    Ok(Box::new(provider))
}
