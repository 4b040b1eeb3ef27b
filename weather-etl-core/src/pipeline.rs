//! Linear three-task runner: probe, extract, transform-and-load.

use chrono::{DateTime, Utc};
use std::{fmt, future::Future, time::Duration};
use tokio::time::{Instant, sleep};
use tracing::{info, warn};

use crate::{
    config::PipelineConfig,
    error::{PipelineError, Result},
    model::WeatherReading,
    provider::{WeatherProvider, provider_from_config},
    sink::{LocalSink, ObjectStoreSink, Sink},
    transform::{output_file_stem, to_csv, transform},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskId {
    IsWeatherApiReady,
    ExtractWeatherData,
    TransformLoadWeatherData,
}

impl TaskId {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskId::IsWeatherApiReady => "is_weather_api_ready",
            TaskId::ExtractWeatherData => "extract_weather_data",
            TaskId::TransformLoadWeatherData => "transform_load_weather_data",
        }
    }

    /// Tasks in execution order.
    pub const fn all() -> &'static [TaskId] {
        &[TaskId::IsWeatherApiReady, TaskId::ExtractWeatherData, TaskId::TransformLoadWeatherData]
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { retries: 2, retry_delay: Duration::from_secs(120) }
    }
}

/// How long a single probe attempt keeps poking before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePolicy {
    pub poke_interval: Duration,
    pub timeout: Duration,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self { poke_interval: Duration::from_secs(5), timeout: Duration::from_secs(20) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub file_name: String,
    pub locations: Vec<String>,
}

#[derive(Debug)]
pub struct Pipeline {
    city: String,
    provider: Box<dyn WeatherProvider>,
    sinks: Vec<Box<dyn Sink>>,
    retry: RetryPolicy,
    probe: ProbePolicy,
}

impl Pipeline {
    pub fn new(
        city: &str,
        provider: Box<dyn WeatherProvider>,
        sinks: Vec<Box<dyn Sink>>,
        retry: RetryPolicy,
        probe: ProbePolicy,
    ) -> Self {
        Self { city: city.to_string(), provider, sinks, retry, probe }
    }

    /// OpenWeather provider, local directory sink and S3 sink, in that order.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let provider = provider_from_config(config)?;
        let sinks: Vec<Box<dyn Sink>> = vec![
            Box::new(LocalSink::new(config.local_dir())),
            Box::new(ObjectStoreSink::s3(config.storage())?),
        ];

        Ok(Self::new(config.city(), provider, sinks, config.retry(), config.probe()))
    }

    /// Run all three tasks once. `captured_at` stamps the output file name.
    pub async fn run(&self, captured_at: DateTime<Utc>) -> Result<RunReport> {
        with_retries(TaskId::IsWeatherApiReady, self.retry, || self.wait_until_ready()).await?;

        let reading =
            with_retries(TaskId::ExtractWeatherData, self.retry, || self.provider.fetch()).await?;

        let reading = &reading;
        with_retries(TaskId::TransformLoadWeatherData, self.retry, move || {
            self.transform_load(reading, captured_at)
        })
        .await
    }

    async fn wait_until_ready(&self) -> Result<()> {
        let started = Instant::now();
        let mut pokes = 0u32;

        loop {
            pokes += 1;
            if self.provider.is_ready().await? {
                return Ok(());
            }

            if started.elapsed().saturating_add(self.probe.poke_interval) >= self.probe.timeout {
                return Err(PipelineError::Unavailable(format!(
                    "no HTTP 200 after {pokes} poke(s) within {:?}",
                    self.probe.timeout
                )));
            }

            sleep(self.probe.poke_interval).await;
        }
    }

    async fn transform_load(
        &self,
        reading: &WeatherReading,
        captured_at: DateTime<Utc>,
    ) -> Result<RunReport> {
        let record = transform(reading)?;
        let contents = to_csv(&record)?;

        let stem = output_file_stem(&self.city, captured_at);
        let file_name = format!("{stem}.csv");

        let mut locations = Vec::with_capacity(self.sinks.len());
        for sink in &self.sinks {
            let location = sink.put(&file_name, contents.clone()).await?;
            info!(sink = sink.name(), %location, "CSV written");
            locations.push(location);
        }

        info!("CSV file saved successfully at {stem}");

        Ok(RunReport { file_name, locations })
    }
}

/// Run `task` up to `policy.retries + 1` times, sleeping between attempts.
async fn with_retries<T, F, Fut>(task: TaskId, policy: RetryPolicy, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.retries + 1;
    let mut attempt = 1;

    loop {
        info!(%task, attempt, "Starting task");

        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts => {
                warn!(%task, attempt, error = %e, "Task failed, retrying in {:?}", policy.retry_delay);
                sleep(policy.retry_delay).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(PipelineError::TaskFailed {
                    task,
                    attempts: attempt,
                    source: Box::new(e),
                });
            }
        }
    }
}
