//! S3-compatible remote mirror

use crate::archive::store::{ObjectStore, StoreError, StoreResult};
use crate::config::RemoteConfig;
use crate::ConfigError;
use async_trait::async_trait;
use s3::creds::Credentials;
use s3::region::Region;
use s3::Bucket;
use tracing::debug;

/// Remote store writing to an S3 bucket under a key prefix
pub struct S3Store {
    bucket: Box<Bucket>,
    prefix: String,
}

impl S3Store {
    /// Builds the store from the `[remote]` section
    ///
    /// Credentials are read from `AWS_ACCESS_KEY_ID` and
    /// `AWS_SECRET_ACCESS_KEY`.
    pub fn from_config(config: &RemoteConfig) -> Result<Self, ConfigError> {
        let access_key = std::env::var("AWS_ACCESS_KEY_ID")
            .map_err(|_| ConfigError::Remote("AWS_ACCESS_KEY_ID not set".to_string()))?;
        let secret_key = std::env::var("AWS_SECRET_ACCESS_KEY")
            .map_err(|_| ConfigError::Remote("AWS_SECRET_ACCESS_KEY not set".to_string()))?;

        let credentials = Credentials::new(Some(&access_key), Some(&secret_key), None, None, None)
            .map_err(|e| ConfigError::Remote(format!("Invalid S3 credentials: {}", e)))?;

        let region = match &config.endpoint {
            Some(endpoint) => Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config
                .region
                .parse()
                .map_err(|e| ConfigError::Remote(format!("Unknown region '{}': {}", config.region, e)))?,
        };

        let bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| ConfigError::Remote(format!("Failed to open bucket: {}", e)))?;

        // Path-style addressing for custom endpoints (MinIO, R2, ...)
        let bucket = if config.endpoint.is_some() {
            bucket.with_path_style()
        } else {
            bucket
        };

        Ok(Self {
            bucket,
            prefix: config.prefix.clone(),
        })
    }

    /// Full object key for a relative path
    pub fn key_for(&self, path: &str) -> String {
        object_key(&self.prefix, path)
    }
}

fn object_key(prefix: &str, path: &str) -> String {
    let path = path.trim_start_matches('/');
    if prefix.is_empty() {
        path.to_string()
    } else if prefix.ends_with('/') {
        format!("{}{}", prefix, path)
    } else {
        format!("{}/{}", prefix, path)
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn describe(&self) -> String {
        format!("s3://{}/{}", self.bucket.name(), self.prefix)
    }

    async fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> StoreResult<()> {
        let key = self.key_for(path);
        debug!(key = %key, content_type, "Uploading object");

        let response = self
            .bucket
            .put_object_with_content_type(&key, bytes, content_type)
            .await
            .map_err(|e| StoreError::Remote(format!("PUT {} failed: {}", key, e)))?;

        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(StoreError::Remote(format!(
                "PUT {} returned HTTP {}",
                key, status
            )));
        }

        Ok(())
    }
}
