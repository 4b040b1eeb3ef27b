use anyhow::{Context, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    error::{PipelineError, Result},
    pipeline::{ProbePolicy, RetryPolicy},
};

pub const ENV_API_KEY: &str = "OPENWEATHERMAP_API_KEY";
pub const ENV_BUCKET: &str = "S3_BUCKET_NAME";
pub const ENV_ACCESS_KEY_ID: &str = "ACCESS_KEY_ID";
pub const ENV_SECRET_ACCESS_KEY: &str = "SECRET_ACCESS_KEY";
pub const ENV_SESSION_TOKEN: &str = "SESSION_TOKEN";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    pub base_url: String,
    pub city: String,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: "https://api.openweathermap.org".to_string(),
            city: "jakarta".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub local_dir: PathBuf,
}

impl Default for OutputSection {
    fn default() -> Self {
        let local_dir = ProjectDirs::from("dev", "weather-etl", "weather-etl")
            .map(|dirs| dirs.data_dir().join("output"))
            .unwrap_or_else(|| PathBuf::from("output"));
        Self { local_dir }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Overridden by `S3_BUCKET_NAME` when set.
    pub bucket: Option<String>,
    pub region: String,
    /// Custom endpoint for S3-compatible stores.
    pub endpoint: Option<String>,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self { bucket: None, region: "us-east-1".to_string(), endpoint: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub retries: u32,
    pub retry_delay_secs: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self { retries: 2, retry_delay_secs: 120 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSection {
    pub poke_interval_secs: u64,
    pub timeout_secs: u64,
}

impl Default for ProbeSection {
    fn default() -> Self {
        Self { poke_interval_secs: 5, timeout_secs: 20 }
    }
}

/// Configuration stored on disk. Secrets never live here.
///
/// Example TOML:
/// [api]
/// city = "jakarta"
///
/// [storage]
/// bucket = "my-weather-bucket"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ConfigFile {
    pub api: ApiSection,
    pub output: OutputSection,
    pub storage: StorageSection,
    pub retry: RetrySection,
    pub probe: ProbeSection,
}

impl ConfigFile {
    /// Load config from `path`, or return defaults if the file doesn't exist yet.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: ConfigFile = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Default path to the config file.
    pub fn default_path() -> anyhow::Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-etl", "weather-etl")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// Cloud credentials passed through to the object store.
#[derive(Clone, PartialEq)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub credentials: AwsCredentials,
}

/// Validated, read-only configuration for a pipeline run.
#[derive(Clone, PartialEq)]
pub struct PipelineConfig {
    base_url: String,
    city: String,
    api_key: String,
    local_dir: PathBuf,
    storage: StorageConfig,
    retry: RetryPolicy,
    probe: ProbePolicy,
}

impl PipelineConfig {
    /// Combine the on-disk file with secrets from `env` and validate the result.
    ///
    /// `env` is usually `|k| std::env::var(k).ok()`.
    pub fn resolve<F>(file: ConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let base_url = file.api.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(PipelineError::Config("api.base_url must not be empty".into()));
        }

        let city = file.api.city.trim().to_string();
        if city.is_empty() {
            return Err(PipelineError::Config("api.city must not be empty".into()));
        }

        let api_key = lookup(ENV_API_KEY).ok_or_else(|| missing_env(ENV_API_KEY))?;

        let bucket = lookup(ENV_BUCKET)
            .or_else(|| file.storage.bucket.clone().filter(|b| !b.trim().is_empty()))
            .ok_or_else(|| {
                PipelineError::Config(format!(
                    "No storage bucket configured.\n\
                     Hint: set {ENV_BUCKET} or run `weather-etl-cli configure`."
                ))
            })?;

        let credentials = AwsCredentials {
            access_key_id: lookup(ENV_ACCESS_KEY_ID)
                .ok_or_else(|| missing_env(ENV_ACCESS_KEY_ID))?,
            secret_access_key: lookup(ENV_SECRET_ACCESS_KEY)
                .ok_or_else(|| missing_env(ENV_SECRET_ACCESS_KEY))?,
            session_token: lookup(ENV_SESSION_TOKEN),
        };

        Ok(Self {
            base_url,
            city,
            api_key,
            local_dir: file.output.local_dir,
            storage: StorageConfig {
                bucket,
                region: file.storage.region,
                endpoint: file.storage.endpoint,
                credentials,
            },
            retry: RetryPolicy {
                retries: file.retry.retries,
                retry_delay: Duration::from_secs(file.retry.retry_delay_secs),
            },
            probe: ProbePolicy {
                poke_interval: Duration::from_secs(file.probe.poke_interval_secs),
                timeout: Duration::from_secs(file.probe.timeout_secs),
            },
        })
    }

    /// Resolve against the process environment.
    pub fn from_env(file: ConfigFile) -> Result<Self> {
        Self::resolve(file, |k| std::env::var(k).ok())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn local_dir(&self) -> &Path {
        &self.local_dir
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    pub fn probe(&self) -> ProbePolicy {
        self.probe
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("base_url", &self.base_url)
            .field("city", &self.city)
            .field("api_key", &"***")
            .field("local_dir", &self.local_dir)
            .field("storage", &self.storage)
            .field("retry", &self.retry)
            .field("probe", &self.probe)
            .finish()
    }
}

fn missing_env(var: &str) -> PipelineError {
    PipelineError::Config(format!("Environment variable {var} is not set"))
}
