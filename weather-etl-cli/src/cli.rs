use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;
use inquire::Text;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use weather_etl_core::{ConfigFile, Pipeline, PipelineConfig, schedule};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-etl-cli", version, about = "Daily weather ETL job")]
pub struct Cli {
    /// Path to the config file; defaults to the platform config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging (includes raw API responses).
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the pipeline once: probe, extract, transform and load.
    Run,

    /// Run the pipeline every day at 00:00 UTC. Missed days are not replayed.
    Schedule,

    /// Interactively edit the non-secret settings in the config file.
    Configure,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        setup_logging(self.log_level());

        let config_path = match &self.config {
            Some(path) => path.clone(),
            None => ConfigFile::default_path()?,
        };
        debug!(path = %config_path.display(), "Using config file");

        match self.command {
            Command::Configure => configure(&config_path),
            Command::Run => {
                let pipeline = load_pipeline(&config_path)?;
                let report = pipeline.run(Utc::now()).await.context("Weather pipeline run failed")?;

                let stem = report.file_name.trim_end_matches(".csv");
                println!("{}", format!("CSV file saved successfully at {stem}").green());
                for location in &report.locations {
                    println!("  {location}");
                }
                Ok(())
            }
            Command::Schedule => {
                let pipeline = load_pipeline(&config_path)?;

                tokio::select! {
                    _ = schedule::run_daily(&pipeline) => Ok(()),
                    signal = tokio::signal::ctrl_c() => {
                        signal.context("Failed to listen for CTRL+C")?;
                        info!("Received CTRL+C, stopping scheduler");
                        Ok(())
                    }
                }
            }
        }
    }

    fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }
}

fn load_pipeline(config_path: &Path) -> anyhow::Result<Pipeline> {
    let file = ConfigFile::load(config_path)?;
    let config = PipelineConfig::from_env(file)?;
    debug!(?config, "Resolved pipeline configuration");

    Ok(Pipeline::from_config(&config)?)
}

fn configure(config_path: &Path) -> anyhow::Result<()> {
    let mut cfg = ConfigFile::load(config_path)?;

    let city = Text::new("City:").with_default(&cfg.api.city).prompt()?;
    cfg.api.city = city;

    let local_dir = cfg.output.local_dir.display().to_string();
    cfg.output.local_dir =
        PathBuf::from(Text::new("Local output directory:").with_default(&local_dir).prompt()?);

    let bucket = cfg.storage.bucket.clone().unwrap_or_default();
    cfg.storage.bucket = non_empty(
        Text::new("S3 bucket (blank to rely on S3_BUCKET_NAME):")
            .with_default(&bucket)
            .prompt()?,
    );

    let region = Text::new("S3 region:").with_default(&cfg.storage.region).prompt()?;
    cfg.storage.region = region;

    let endpoint = cfg.storage.endpoint.clone().unwrap_or_default();
    cfg.storage.endpoint = non_empty(
        Text::new("Custom S3 endpoint (blank for AWS):")
            .with_default(&endpoint)
            .prompt()?,
    );

    cfg.save(config_path)?;

    println!("Saved configuration to {}", config_path.display());
    println!(
        "API key and cloud credentials are read from OPENWEATHERMAP_API_KEY, \
         ACCESS_KEY_ID, SECRET_ACCESS_KEY and SESSION_TOKEN."
    );
    Ok(())
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Set up structured logging; `RUST_LOG` takes precedence over the flags.
fn setup_logging(log_level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("weather_etl_core={log_level},weather_etl_cli={log_level}"))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}
