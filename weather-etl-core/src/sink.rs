use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::Result;

pub mod local;
pub mod remote;

pub use local::LocalSink;
pub use remote::ObjectStoreSink;

/// Destination for the finished CSV artifact.
#[async_trait]
pub trait Sink: Send + Sync + Debug {
    /// Short name used in logs and errors, e.g. "local" or "s3".
    fn name(&self) -> &str;

    /// Write `contents` under `file_name` and return the location written.
    async fn put(&self, file_name: &str, contents: Vec<u8>) -> Result<String>;
}
