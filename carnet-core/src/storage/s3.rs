/*!
Amazon S3 blob store.

Implements the async port with the official AWS SDK; wrap in
[`super::BlockingBlob`] to use it behind the sync [`super::BlobStore`] port.
Failures are propagated to the caller unretried; retry policy belongs to the
layer that owns the request.
*/

use async_trait::async_trait;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use tracing::{debug, info};

use super::AsyncBlobStore;
use crate::{BackupError, Result};

/// Blob store backed by one S3 bucket.
///
/// Uses the standard AWS credential provider chain (environment variables,
/// credentials file, instance roles).
#[derive(Debug, Clone)]
pub struct S3BlobStore {
    client: S3Client,
    bucket: String,
}

impl S3BlobStore {
    /// Create a store for the given bucket, loading AWS configuration from
    /// the environment.
    pub async fn new(bucket: String) -> Result<Self> {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;

        if sdk_config.credentials_provider().is_none() {
            return Err(BackupError::storage(
                "AWS credentials not found; set AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY and AWS_REGION",
            ));
        }

        let client = S3Client::new(&sdk_config);
        info!(bucket = %bucket, "initialized S3 blob store");

        Ok(Self { client, bucket })
    }

    /// Create a store with an explicit SDK configuration.
    pub fn with_config(bucket: String, config: aws_config::SdkConfig) -> Self {
        let client = S3Client::new(&config);
        info!(bucket = %bucket, "initialized S3 blob store with custom config");
        Self { client, bucket }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn map_error<E>(operation: &str, key: &str, err: &E) -> BackupError
    where
        E: ProvideErrorMetadata,
    {
        let code = err.code().unwrap_or("unknown");
        let message = err.message().unwrap_or("no detail");
        BackupError::storage(format!("S3 {operation} failed for {key}: {code}: {message}"))
    }
}

#[async_trait]
impl AsyncBlobStore for S3BlobStore {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()> {
        debug!(bucket = %self.bucket, key = %key, size = data.len(), "S3 put_object");
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| Self::map_error("put_object", key, &e))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        debug!(bucket = %self.bucket, key = %key, "S3 get_object");
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Self::map_error("get_object", key, &e))?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| BackupError::storage(format!("S3 body read failed for {key}: {e}")))?;
        Ok(bytes.into_bytes().to_vec())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                if err
                    .as_service_error()
                    .map(|e| e.is_not_found())
                    .unwrap_or(false)
                {
                    Ok(false)
                } else {
                    Err(Self::map_error("head_object", key, &err))
                }
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        debug!(bucket = %self.bucket, key = %key, "S3 delete_object");
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Self::map_error("delete_object", key, &e))?;
        Ok(())
    }
}
