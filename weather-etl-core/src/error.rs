use thiserror::Error;

use crate::pipeline::TaskId;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Weather API is not ready: {0}")]
    Unavailable(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Missing field `{field}` in weather payload")]
    MissingField { field: String },

    #[error("Invalid field `{field}` in weather payload: expected {expected}")]
    InvalidField { field: String, expected: &'static str },

    #[error("CSV encoding failed: {0}")]
    Csv(String),

    #[error("Write to {sink} sink failed: {reason}")]
    Sink { sink: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Task `{task}` failed after {attempts} attempt(s): {source}")]
    TaskFailed {
        task: TaskId,
        attempts: u32,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    pub fn sink(sink: impl Into<String>, reason: impl ToString) -> Self {
        PipelineError::Sink { sink: sink.into(), reason: reason.to_string() }
    }
}

impl From<csv::Error> for PipelineError {
    fn from(e: csv::Error) -> Self {
        PipelineError::Csv(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
