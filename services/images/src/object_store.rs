use crate::config::S3Config;
use crate::keys::public_url;
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use tracing::{debug, info, instrument};

/// Content type recorded on every stored image
const IMAGE_CONTENT_TYPE: &str = "image/jpeg";

/// Blob storage used by the upload pipeline
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `key` and return the object's public URL
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<String>;
}

/// S3-backed object store
pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
    region: String,
}

impl S3ObjectStore {
    /// Create a new S3 object store
    pub async fn new(config: &S3Config) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));

        // Static keys win over the default credential chain
        if !config.access_key.is_empty() {
            loader = loader.credentials_provider(Credentials::new(
                config.access_key.clone(),
                config.secret_key.clone(),
                None,
                None,
                "image-service",
            ));
        }

        let aws_config = loader.load().await;
        let client = S3Client::new(&aws_config);

        info!(
            bucket = %config.bucket,
            region = %config.region,
            "S3 object store initialized"
        );

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
            region: config.region.clone(),
        })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self, body), fields(bucket = %self.bucket, size_bytes = body.len()))]
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<String> {
        debug!(key = %key, "Uploading image to S3");

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(IMAGE_CONTENT_TYPE)
            .send()
            .await
            .context("Failed to upload image to S3")?;

        let url = public_url(&self.bucket, &self.region, key);

        info!(key = %key, url = %url, "Image uploaded successfully");

        Ok(url)
    }
}
