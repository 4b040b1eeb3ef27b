//! Core library for the daily weather ETL job.
//!
//! This crate defines:
//! - Validated configuration assembled from a TOML file and the environment
//! - The OpenWeather probe and extractor behind the `WeatherProvider` trait
//! - The transform from raw payload to a single CSV row
//! - Local and object-storage sinks
//! - The linear task runner with retries, and the daily schedule
//!
//! It is used by `weather-etl-cli`, but can also be driven by an external scheduler.

pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod provider;
pub mod schedule;
pub mod sink;
pub mod transform;

pub use config::{ConfigFile, PipelineConfig, StorageConfig};
pub use error::{PipelineError, Result};
pub use model::{TransformedRecord, WeatherReading};
pub use pipeline::{Pipeline, ProbePolicy, RetryPolicy, RunReport, TaskId};
pub use provider::{OpenWeatherProvider, WeatherProvider};
pub use sink::{LocalSink, ObjectStoreSink, Sink};
