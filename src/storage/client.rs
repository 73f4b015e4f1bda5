use async_trait::async_trait;

use crate::config::StorageConfig;
use crate::error::AppError;

/// Trait for document content storage operations (S3-compatible).
///
/// Abstracted as a trait so tests can use a mock without a real S3 instance.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Upload content to the given key.
    async fn put_object(&self, key: &str, content: Vec<u8>, content_type: &str)
        -> Result<(), AppError>;

    /// Retrieve content by key. Returns `None` if the object doesn't exist.
    async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>, AppError>;

    /// Remove the object at the given key. Removing a missing key succeeds.
    async fn delete_object(&self, key: &str) -> Result<(), AppError>;
}

/// S3 implementation of StorageClient.
pub struct S3StorageClient {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3StorageClient {
    /// Create a new S3 storage client from the `storage` configuration section.
    ///
    /// Credentials come from the usual AWS provider chain. A custom endpoint
    /// (MinIO, LocalStack) and region override are honoured when set.
    pub async fn from_config(config: &StorageConfig) -> Result<Self, AppError> {
        if config.bucket.is_empty() {
            return Err(AppError::Config("storage.bucket is empty".into()));
        }

        let mut config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

        if let Some(endpoint) = &config.endpoint {
            config_loader = config_loader.endpoint_url(endpoint);
        }
        if let Some(region) = &config.region {
            config_loader = config_loader.region(aws_config::Region::new(region.clone()));
        }

        let sdk_config = config_loader.load().await;
        let client = aws_sdk_s3::Client::from_conf(
            aws_sdk_s3::config::Builder::from(&sdk_config)
                .force_path_style(config.force_path_style)
                .build(),
        );

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
        })
    }
}

#[async_trait]
impl StorageClient for S3StorageClient {
    async fn put_object(
        &self,
        key: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<(), AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(content.into())
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to put object '{}': {}", key, e)))?;

        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => {
                let bytes = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| AppError::Storage(format!("Failed to read body: {}", e)))?;
                Ok(Some(bytes.into_bytes().to_vec()))
            }
            Err(e) => {
                let service_err = e.into_service_error();
                if service_err.is_no_such_key() {
                    Ok(None)
                } else {
                    Err(AppError::Storage(format!(
                        "Failed to get object '{}': {}",
                        key, service_err
                    )))
                }
            }
        }
    }

    async fn delete_object(&self, key: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                AppError::Storage(format!("Failed to delete object '{}': {}", key, e))
            })?;

        Ok(())
    }
}
