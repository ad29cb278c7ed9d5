//! Asset fetching.
//!
//! One retrieval per request, no retries. Every store failure (missing key,
//! access denied, network error) becomes [`FetchError::NotFound`] with the
//! store's own message kept as detail; the pipeline does not distinguish them.
//!
//! | Store | Use |
//! |---|---|
//! | [`S3Store`] | Production: `aws-sdk-s3` `GetObject` |
//! | [`FsStore`] | Local runs of the `transform` command: files under a root directory |
//! | [`MemoryStore`] | Tests and embedding |

use crate::config::StorageConfig;
use async_trait::async_trait;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use bytes::Bytes;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors reported by an [`ObjectStore`] implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("no such key: {key}")]
    NotFound { key: String },
    #[error("invalid key: {key}")]
    InvalidKey { key: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage service error: {0}")]
    Service(String),
}

/// Errors surfaced by [`fetch`].
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("{detail}")]
    NotFound { key: String, detail: String },
    #[error("fetch cancelled")]
    Cancelled,
}

/// Raw bytes of a stored object, owned by the fetcher until handed on.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAsset {
    pub key: String,
    pub bytes: Bytes,
}

/// Read access to a bucket/key object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError>;
}

/// Fetch `key` from `bucket`, giving up as soon as `cancel` fires.
pub async fn fetch(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    cancel: &CancellationToken,
) -> Result<RawAsset, FetchError> {
    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(FetchError::Cancelled),
        result = store.get_object(bucket, key) => result,
    };

    match result {
        Ok(bytes) => {
            tracing::info!(bucket, key, size = bytes.len(), "fetched object");
            Ok(RawAsset {
                key: key.to_string(),
                bytes,
            })
        }
        Err(err) => {
            tracing::warn!(bucket, key, error = %err, "object fetch failed");
            Err(FetchError::NotFound {
                key: key.to_string(),
                detail: err.to_string(),
            })
        }
    }
}

// =============================================================================
// S3
// =============================================================================

/// S3 (or S3-compatible) object store.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: aws_sdk_s3::Client,
}

impl S3Store {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }

    /// Build a client for the configured region and optional endpoint.
    ///
    /// Credentials come from the standard AWS provider chain (the execution
    /// role when running at the edge).
    pub async fn from_config(config: &StorageConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.endpoint.is_some())
            .build();
        Self::new(aws_sdk_s3::Client::from_conf(s3_config))
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| match err.as_service_error() {
                Some(service) if service.is_no_such_key() => StoreError::NotFound {
                    key: key.to_string(),
                },
                _ => StoreError::Service(DisplayErrorContext(&err).to_string()),
            })?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Service(format!("failed to read object body: {e}")))?;
        Ok(body.into_bytes())
    }
}

// =============================================================================
// Filesystem
// =============================================================================

/// Serves objects from `root/<key>`; the bucket name is ignored.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a key under the root, refusing anything that could escape it.
    fn resolve(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(StoreError::InvalidKey {
                key: key.to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for FsStore {
    async fn get_object(&self, _bucket: &str, key: &str) -> Result<Bytes, StoreError> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound {
                key: key.to_string(),
            }),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// Fixed set of objects keyed by `(bucket, key)`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    objects: HashMap<(String, String), Bytes>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, bucket: &str, key: &str, data: impl Into<Bytes>) -> Self {
        self.insert(bucket, key, data);
        self
    }

    pub fn insert(&mut self, bucket: &str, key: &str, data: impl Into<Bytes>) {
        self.objects
            .insert((bucket.to_string(), key.to_string()), data.into());
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError> {
        self.objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                key: key.to_string(),
            })
    }
}
