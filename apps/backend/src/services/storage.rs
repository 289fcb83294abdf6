//! S3/R2 storage service for card images.

use aws_sdk_s3::{
    config::{Credentials, Region},
    primitives::ByteStream,
    Client, Config,
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("S3 error: {0}")]
    S3(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("File not found: {0}")]
    NotFound(String),
}

/// Image formats accepted for card pictures, as (MIME type, file extension).
const IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

/// Downloaded object with its stored content type.
#[derive(Debug)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// S3/R2 storage service for card image uploads and downloads.
pub struct StorageService {
    client: Client,
    bucket: String,
}

impl StorageService {
    /// Create a storage service from environment variables.
    ///
    /// Returns `Ok(None)` when S3_BUCKET is unset, which disables image
    /// endpoints instead of failing startup.
    ///
    /// Env vars:
    /// - S3_BUCKET: Bucket name
    /// - S3_REGION: Region (use "auto" for Cloudflare R2)
    /// - S3_ENDPOINT: Custom endpoint URL (required for R2)
    /// - S3_ACCESS_KEY: Access key ID
    /// - S3_SECRET_KEY: Secret access key
    pub fn from_env() -> Result<Option<Self>, StorageError> {
        let Ok(bucket) = std::env::var("S3_BUCKET") else {
            return Ok(None);
        };

        let region = std::env::var("S3_REGION").unwrap_or_else(|_| "auto".to_string());

        let endpoint = std::env::var("S3_ENDPOINT").ok();

        let access_key = std::env::var("S3_ACCESS_KEY")
            .map_err(|_| StorageError::Config("S3_ACCESS_KEY not set".to_string()))?;

        let secret_key = std::env::var("S3_SECRET_KEY")
            .map_err(|_| StorageError::Config("S3_SECRET_KEY not set".to_string()))?;

        Ok(Some(Self::new(
            bucket,
            region,
            endpoint,
            access_key,
            secret_key,
        )))
    }

    /// Build a client for an explicit bucket and credentials.
    ///
    /// A custom endpoint switches to path-style addressing.
    pub fn new(
        bucket: String,
        region: String,
        endpoint: Option<String>,
        access_key: String,
        secret_key: String,
    ) -> Self {
        let credentials = Credentials::new(
            access_key,
            secret_key,
            None,  // session token
            None,  // expiry
            "env", // provider name
        );

        let mut config_builder = Config::builder()
            .region(Region::new(region))
            .credentials_provider(credentials)
            .behavior_version_latest();

        if let Some(endpoint_url) = endpoint {
            config_builder = config_builder
                .endpoint_url(endpoint_url)
                .force_path_style(true);
        }

        let client = Client::from_conf(config_builder.build());

        Self { client, bucket }
    }

    /// Upload an object.
    pub async fn put_object(
        &self,
        key: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(content))
            .send()
            .await
            .map_err(|e| StorageError::S3(e.to_string()))?;

        tracing::info!("Uploaded object to S3: {}", key);
        Ok(())
    }

    /// Download an object together with its content type.
    pub async fn get_object(&self, key: &str) -> Result<StoredObject, StorageError> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let err_str = e.to_string();
                if err_str.contains("NoSuchKey") || err_str.contains("not found") {
                    StorageError::NotFound(key.to_string())
                } else {
                    StorageError::S3(err_str)
                }
            })?;

        let content_type = response.content_type().map(String::from);
        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::S3(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(StoredObject {
            bytes,
            content_type,
        })
    }

    /// Delete an object. Deleting a missing key is not an error.
    pub async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::S3(e.to_string()))?;

        tracing::info!("Deleted object from S3: {}", key);
        Ok(())
    }

    /// Generate a fresh key for a card image.
    ///
    /// Format: `{user_id}/cards/{card_id}/{uuid}.{ext}`
    pub fn make_image_key(user_id: Uuid, card_id: i64, extension: &str) -> String {
        format!("{}/cards/{}/{}.{}", user_id, card_id, Uuid::new_v4(), extension)
    }
}

/// File extension for an accepted image MIME type.
///
/// Parameters such as `; charset=...` are ignored.
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    IMAGE_TYPES
        .iter()
        .find(|(accepted, _)| *accepted == mime)
        .map(|(_, ext)| *ext)
}
