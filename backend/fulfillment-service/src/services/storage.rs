/// Blob storage access for purchasable files
///
/// Download links are presigned `GetObject` requests: the URL carries its own
/// expiry and signature, so nothing about it can be derived from the public
/// product identifiers.
use crate::config::StorageSettings;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use std::time::Duration;

#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Mint a fresh signed URL for `file_ref`, valid for `ttl`
    async fn create_signed_download_url(&self, file_ref: &str, ttl: Duration) -> Result<String>;
}

/// Map a product file reference to an object key.
///
/// Older catalog entries store the public URL the file was uploaded under;
/// only its last path segment identifies the object, under `key_prefix`.
/// Bare references are already keys.
pub fn resolve_object_key(file_ref: &str, key_prefix: &str) -> Option<String> {
    let file_ref = file_ref.trim();
    if file_ref.is_empty() {
        return None;
    }

    match url::Url::parse(file_ref) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {
            let segment = parsed
                .path_segments()?
                .filter(|s| !s.is_empty())
                .last()?
                .to_string();
            let file_name = urlencoding::decode(&segment)
                .map(|s| s.into_owned())
                .unwrap_or(segment);
            Some(format!("{}{}", key_prefix, file_name))
        }
        _ => {
            let key = file_ref.trim_start_matches('/');
            (!key.is_empty()).then(|| key.to_string())
        }
    }
}

/// S3-compatible storage (AWS S3, MinIO, Supabase S3 gateway)
#[derive(Clone)]
pub struct S3BlobStorage {
    client: Client,
    bucket: String,
    key_prefix: String,
}

impl S3BlobStorage {
    pub fn new(client: Client, bucket: impl Into<String>, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            key_prefix: key_prefix.into(),
        }
    }

    /// Initialize the S3 client from configuration
    ///
    /// Explicit credentials are used when both are set, otherwise the default
    /// AWS credential chain applies.
    pub async fn from_settings(config: &StorageSettings) -> Self {
        use aws_sdk_s3::config::{Credentials, Region};

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let (Some(access_key_id), Some(secret_access_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            let credentials = Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "fulfillment_service_s3",
            );
            loader = loader.credentials_provider(credentials);
        }

        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let shared = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(config.force_path_style)
            .build();

        Self::new(
            Client::from_conf(s3_config),
            config.bucket.clone(),
            config.key_prefix.clone(),
        )
    }
}

#[async_trait]
impl BlobStorage for S3BlobStorage {
    async fn create_signed_download_url(&self, file_ref: &str, ttl: Duration) -> Result<String> {
        let key = resolve_object_key(file_ref, &self.key_prefix)
            .ok_or_else(|| AppError::Storage(format!("Unresolvable file reference: {file_ref}")))?;

        let presigning_config = PresigningConfig::expires_in(ttl)
            .map_err(|e| AppError::Storage(format!("Failed to create presigning config: {e}")))?;

        let file_name = key.rsplit('/').next().unwrap_or(key.as_str()).replace('"', "");

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .response_content_disposition(format!("attachment; filename=\"{file_name}\""))
            .presigned(presigning_config)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to presign download URL: {e}")))?;

        Ok(presigned.uri().to_string())
    }
}
