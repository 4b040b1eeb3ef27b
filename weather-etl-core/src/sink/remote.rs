use async_trait::async_trait;
use object_store::{ObjectStore, PutPayload, aws::AmazonS3Builder, path::Path};
use std::sync::Arc;

use crate::{
    config::StorageConfig,
    error::{PipelineError, Result},
};

use super::Sink;

/// Writes artifacts as objects into a bucket.
#[derive(Debug, Clone)]
pub struct ObjectStoreSink {
    bucket: String,
    store: Arc<dyn ObjectStore>,
}

impl ObjectStoreSink {
    /// Build an S3 client from the configured bucket and credentials.
    pub fn s3(config: &StorageConfig) -> Result<Self> {
        let creds = &config.credentials;

        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&config.bucket)
            .with_region(&config.region)
            .with_access_key_id(&creds.access_key_id)
            .with_secret_access_key(&creds.secret_access_key);

        if let Some(token) = &creds.session_token {
            builder = builder.with_token(token);
        }
        if let Some(endpoint) = &config.endpoint {
            builder = builder.with_endpoint(endpoint).with_allow_http(endpoint.starts_with("http://"));
        }

        let store = builder
            .build()
            .map_err(|e| PipelineError::Config(format!("Invalid object storage settings: {e}")))?;

        Ok(Self::with_store(&config.bucket, Arc::new(store)))
    }

    /// Wrap an existing store, e.g. an in-memory one.
    pub fn with_store(bucket: &str, store: Arc<dyn ObjectStore>) -> Self {
        Self { bucket: bucket.to_string(), store }
    }
}

#[async_trait]
impl Sink for ObjectStoreSink {
    fn name(&self) -> &str {
        "s3"
    }

    async fn put(&self, file_name: &str, contents: Vec<u8>) -> Result<String> {
        let location = Path::from(file_name);

        self.store
            .put(&location, PutPayload::from(contents))
            .await
            .map_err(|e| PipelineError::sink(self.name(), e))?;

        Ok(format!("s3://{}/{}", self.bucket, location))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AwsCredentials;
    use object_store::memory::InMemory;

    #[tokio::test]
    async fn puts_object_under_file_name() {
        let store = Arc::new(InMemory::new());
        let sink = ObjectStoreSink::with_store("weather-bucket", store.clone());

        let location = sink.put("report.csv", b"City\nJakarta\n".to_vec()).await.unwrap();
        assert_eq!(location, "s3://weather-bucket/report.csv");

        let bytes = store.get(&Path::from("report.csv")).await.unwrap().bytes().await.unwrap();
        assert_eq!(bytes.as_ref(), b"City\nJakarta\n");
    }

    #[test]
    fn builds_s3_client_from_config() {
        let config = StorageConfig {
            bucket: "weather-bucket".into(),
            region: "ap-southeast-3".into(),
            endpoint: Some("http://localhost:9000".into()),
            credentials: AwsCredentials {
                access_key_id: "AKIA".into(),
                secret_access_key: "SECRET".into(),
                session_token: Some("TOKEN".into()),
            },
        };

        let sink = ObjectStoreSink::s3(&config).unwrap();
        assert_eq!(sink.bucket, "weather-bucket");
        assert_eq!(sink.name(), "s3");
    }
}
