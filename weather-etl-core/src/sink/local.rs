use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

use crate::error::{PipelineError, Result};

use super::Sink;

/// Writes artifacts into a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalSink {
    dir: PathBuf,
}

impl LocalSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl Sink for LocalSink {
    fn name(&self) -> &str {
        "local"
    }

    async fn put(&self, file_name: &str, contents: Vec<u8>) -> Result<String> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| PipelineError::sink(self.name(), format!("{}: {e}", self.dir.display())))?;

        // Stage under a temporary name so a failed write never leaves a
        // truncated file at the final path.
        let path = self.dir.join(file_name);
        let staged = self.dir.join(format!("{file_name}.tmp"));

        if let Err(e) = fs::write(&staged, contents).await {
            let _ = fs::remove_file(&staged).await;
            return Err(PipelineError::sink(self.name(), format!("{}: {e}", staged.display())));
        }

        if let Err(e) = fs::rename(&staged, &path).await {
            let _ = fs::remove_file(&staged).await;
            return Err(PipelineError::sink(self.name(), format!("{}: {e}", path.display())));
        }

        Ok(path.display().to_string())
    }
}
