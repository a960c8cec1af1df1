//! S3-compatible image storage.
//!
//! Profile, branch, aesthetician and service pictures live in one bucket under
//! `{kind}/{owner_id}/{uuid}.{ext}`; the database stores the public URL.

use anyhow::{Context, Result};
use aws_sdk_s3::{
    Client,
    config::{Builder as S3Builder, Credentials, Region},
    primitives::ByteStream,
};
use salon_common::config::StorageConfig;
use uuid::Uuid;

/// What an image is attached to. Used as the key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    User,
    Branch,
    Aesthetician,
    Service,
}

impl ImageKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::User => "users",
            Self::Branch => "branches",
            Self::Aesthetician => "aestheticians",
            Self::Service => "services",
        }
    }
}

const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/gif"];

/// Resolve the content type of an upload, preferring the client's header and
/// falling back to the file extension. Non-images are rejected.
pub fn image_content_type(filename: Option<&str>, declared: Option<&str>) -> Option<&'static str> {
    let guessed = filename.and_then(|f| mime_guess::from_path(f).first_raw());
    [declared, guessed]
        .into_iter()
        .flatten()
        .find_map(|ct| ALLOWED_IMAGE_TYPES.iter().copied().find(|allowed| *allowed == ct))
}

/// Object key for a new image.
pub fn image_key(kind: ImageKind, owner_id: Uuid, content_type: &str) -> String {
    let ext = match content_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "bin",
    };
    format!("{}/{}/{}.{}", kind.prefix(), owner_id, Uuid::now_v7(), ext)
}

#[derive(Clone)]
pub struct ImageStore {
    inner: Client,
    bucket: String,
    base_url: String,
}

impl ImageStore {
    pub fn new(cfg: &StorageConfig) -> Self {
        let creds = Credentials::new(
            &cfg.access_key,
            &cfg.secret_key,
            None, // session token
            None, // expiry
            "salon-storage",
        );

        let s3_cfg = S3Builder::new()
            .endpoint_url(&cfg.endpoint)
            .credentials_provider(creds)
            .region(Region::new(cfg.region.clone()))
            // Force path-style URLs (required for MinIO)
            .force_path_style(true)
            .build();

        let base_url = cfg
            .public_url
            .clone()
            .unwrap_or_else(|| format!("{}/{}", cfg.endpoint.trim_end_matches('/'), cfg.bucket));

        Self {
            inner: Client::from_conf(s3_cfg),
            bucket: cfg.bucket.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Upload an image and return its public URL.
    pub async fn put_image(
        &self,
        kind: ImageKind,
        owner_id: Uuid,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String> {
        let key = image_key(kind, owner_id, content_type);

        self.inner
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .with_context(|| format!("Failed to upload {key} to object storage"))?;

        Ok(self.public_url(&key))
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }

    /// Inverse of [`Self::public_url`]; None for URLs this store didn't issue.
    pub fn key_from_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        url.strip_prefix(self.base_url.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|key| !key.is_empty())
    }

    /// Delete the object behind a previously issued URL.
    pub async fn delete_by_url(&self, url: &str) -> Result<()> {
        let Some(key) = self.key_from_url(url) else {
            return Ok(());
        };

        self.inner
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("Failed to delete {key} from object storage"))?;

        Ok(())
    }

    /// Ensure the bucket exists; create it if absent.
    pub async fn ensure_bucket(&self) -> Result<()> {
        match self.inner.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => {
                tracing::debug!(bucket = %self.bucket, "Bucket already exists");
                Ok(())
            }
            Err(_) => {
                tracing::info!(bucket = %self.bucket, "Bucket does not exist, creating");
                self.inner
                    .create_bucket()
                    .bucket(&self.bucket)
                    .send()
                    .await
                    .context("Failed to create object storage bucket")?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(public_url: Option<&str>) -> ImageStore {
        ImageStore::new(&StorageConfig {
            endpoint: "http://localhost:9000".into(),
            bucket: "salon-images".into(),
            access_key: "minio".into(),
            secret_key: "minio123".into(),
            region: "us-east-1".into(),
            public_url: public_url.map(str::to_string),
        })
    }

    #[test]
    fn content_type_prefers_declared_image_type() {
        assert_eq!(image_content_type(Some("a.png"), Some("image/webp")), Some("image/webp"));
        assert_eq!(image_content_type(Some("a.png"), Some("application/octet-stream")), Some("image/png"));
        assert_eq!(image_content_type(Some("notes.pdf"), None), None);
        assert_eq!(image_content_type(None, None), None);
    }

    #[test]
    fn keys_are_namespaced_by_kind_and_owner() {
        let owner = Uuid::from_u128(7);
        let key = image_key(ImageKind::Branch, owner, "image/png");
        assert!(key.starts_with(&format!("branches/{owner}/")));
        assert!(key.ends_with(".png"));
    }

    #[test]
    fn urls_round_trip_to_keys() {
        let s = store(None);
        let url = s.public_url("users/1/a.png");
        assert_eq!(url, "http://localhost:9000/salon-images/users/1/a.png");
        assert_eq!(s.key_from_url(&url), Some("users/1/a.png"));

        let cdn = store(Some("https://cdn.example.com/"));
        assert_eq!(cdn.public_url("x.png"), "https://cdn.example.com/x.png");
        assert_eq!(cdn.key_from_url("https://elsewhere.com/x.png"), None);
    }
}
