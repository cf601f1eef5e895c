//! The gateway: upload and download composition.
//!
//! Each call is an independent unit of work: validate, provision (uploads
//! only), transfer. Retries are internal; callers observe a single success
//! or a single classified failure.

use std::{path::PathBuf, sync::Arc};

use anyhow::anyhow;
use bytes::Bytes;
use opentelemetry::{metrics::Meter, KeyValue};
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
    backend::{ObjectAttributes, StorageBackend},
    backends::local::LocalBackend,
    config::BlobStorageConfig,
    error::{Error, Result},
    metrics::{GatewayMetrics, Timer},
    retry::RetryPolicy,
    sanitize::ObjectKey,
};

/// Cache directive attached to every uploaded object. Keys are unique per
/// upload, so stored objects are immutable and long-lived caching is safe.
const CACHE_CONTROL: &str = "public, max-age=31536000";

/// A single file upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Logical bucket the object belongs to.
    pub container_name: String,

    /// Raw file payload.
    pub data: Bytes,

    /// Client-supplied filename; arbitrary and untrusted.
    pub original_name: String,
}

/// Successful upload outcome.
#[derive(Debug, Clone)]
pub struct UploadResult {
    /// Dereferenceable locator for the stored object. The caller is
    /// responsible for persisting it; the gateway keeps no record.
    pub url: String,

    pub size_bytes: u64,

    pub sha256_hash: String,
}

/// A single file download.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub container_name: String,

    /// A previously issued object key.
    pub blob_name: String,

    /// Local path the object is written to.
    pub destination: PathBuf,
}

/// Stateless gateway over an injected storage backend.
///
/// Cheap to clone; all methods take `&self` and calls may run concurrently.
/// One slow transfer never stalls another: both provisioning and
/// transmission only await backend I/O.
#[derive(Clone)]
pub struct BlobGateway {
    backend: Arc<dyn StorageBackend>,
    provision_retry: RetryPolicy,
    metrics: Option<GatewayMetrics>,
}

impl BlobGateway {
    /// Build a gateway from configuration, constructing the backend the
    /// config names. Fails here, not on first use, when the configuration
    /// is unusable (unknown scheme, missing connection string).
    pub fn new(config: &BlobStorageConfig) -> Result<Self> {
        config.validate()?;
        let backend: Arc<dyn StorageBackend> = match config.scheme()? {
            "file" => Arc::new(LocalBackend::new(file_root(&config.path)?)),
            #[cfg(feature = "azure")]
            "azure" | "az" => {
                let connection_string =
                    config.connection_string.as_deref().ok_or_else(|| Error::Config {
                        reason: "azure storage requires a connection string".to_string(),
                    })?;
                Arc::new(crate::backends::azure::AzureBackend::new(
                    connection_string,
                    &config.transport_retry,
                )?)
            }
            other => {
                return Err(Error::UnsupportedScheme {
                    scheme: other.to_string(),
                })
            }
        };
        Ok(Self {
            backend,
            provision_retry: config.provision_retry.clone(),
            metrics: None,
        })
    }

    /// Build a gateway around an existing backend. This is the seam tests
    /// and embedding applications use to substitute their own client.
    pub fn with_backend(backend: Arc<dyn StorageBackend>, provision_retry: RetryPolicy) -> Self {
        Self {
            backend,
            provision_retry,
            metrics: None,
        }
    }

    /// Enable operation metrics on the given meter.
    pub fn with_metrics(mut self, meter: &Meter) -> Self {
        self.metrics = Some(GatewayMetrics::new(meter));
        self
    }

    /// Upload a file and return its locator.
    ///
    /// Validates the request, derives a fresh [`ObjectKey`], provisions the
    /// container with bounded retry, and writes the object with its MIME
    /// type and cache directive. Succeeds only on a positive backend
    /// acknowledgment.
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadResult> {
        let _timer = self.start_timer("upload");
        let result = self.upload_inner(request).await;
        if result.is_err() {
            self.record_error("upload");
        }
        result
    }

    async fn upload_inner(&self, request: UploadRequest) -> Result<UploadResult> {
        let UploadRequest {
            container_name,
            data,
            original_name,
        } = request;

        if container_name.is_empty() {
            return Err(Error::Validation {
                reason: "container name is required".to_string(),
            });
        }
        if data.is_empty() {
            return Err(Error::Validation {
                reason: format!("file buffer is empty for {original_name}"),
            });
        }
        if original_name.is_empty() {
            return Err(Error::Validation {
                reason: "original filename is required".to_string(),
            });
        }

        let key = ObjectKey::generate(&original_name);
        debug!(container = %container_name, key = %key, "starting upload");

        self.provision_container(&container_name).await?;

        let attrs = ObjectAttributes {
            content_type: mime_guess::from_path(&original_name)
                .first_or_octet_stream()
                .to_string(),
            cache_control: CACHE_CONTROL.to_string(),
        };
        let size_bytes = data.len() as u64;
        let sha256_hash = format!("{:x}", Sha256::digest(&data));

        let receipt = self
            .backend
            .put(&container_name, key.as_str(), data, &attrs)
            .await
            .map_err(|err| {
                error!(container = %container_name, key = %key, error = %err, "upload failed");
                Error::from_put(err)
            })?;

        if !receipt.is_acknowledged() {
            error!(container = %container_name, key = %key, "backend returned no acknowledgment");
            return Err(Error::Transfer {
                source: anyhow!("upload of '{key}' completed without a backend acknowledgment"),
            });
        }

        info!(container = %container_name, key = %key, size_bytes, "upload complete");
        Ok(UploadResult {
            url: self.backend.object_url(&container_name, key.as_str()),
            size_bytes,
            sha256_hash,
        })
    }

    /// Download an object to a local path.
    ///
    /// Probes existence first: a missing key fails with [`Error::NotFound`]
    /// before any read, and the destination is never created or modified.
    pub async fn download(&self, request: DownloadRequest) -> Result<()> {
        let _timer = self.start_timer("download");
        let result = self.download_inner(request).await;
        if result.is_err() {
            self.record_error("download");
        }
        result
    }

    async fn download_inner(&self, request: DownloadRequest) -> Result<()> {
        let DownloadRequest {
            container_name,
            blob_name,
            destination,
        } = request;

        if container_name.is_empty() || blob_name.is_empty() || destination.as_os_str().is_empty()
        {
            return Err(Error::Validation {
                reason: "container name, blob name, and download path are required".to_string(),
            });
        }

        let present = self
            .backend
            .exists(&container_name, &blob_name)
            .await
            .map_err(|err| Error::from_transfer(&container_name, &blob_name, err))?;
        if !present {
            return Err(Error::NotFound {
                container: container_name,
                key: blob_name,
            });
        }

        let data = self
            .backend
            .get(&container_name, &blob_name)
            .await
            .map_err(|err| Error::from_transfer(&container_name, &blob_name, err))?;

        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|err| Error::Transfer { source: err.into() })?;
            }
        }
        tokio::fs::write(&destination, &data)
            .await
            .map_err(|err| Error::Transfer { source: err.into() })?;

        info!(
            container = %container_name,
            key = %blob_name,
            destination = %destination.display(),
            "download complete"
        );
        Ok(())
    }

    /// Create the container if absent, retrying per the configured policy.
    /// Safe to repeat; races between concurrent callers are resolved by the
    /// backend's idempotent create semantics.
    async fn provision_container(&self, container: &str) -> Result<()> {
        let max_attempts = self.provision_retry.attempts();
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.backend.ensure_container(container).await {
                Ok(()) => return Ok(()),
                Err(err) if attempt < max_attempts => {
                    warn!(
                        container = %container,
                        attempt,
                        max_attempts,
                        delay_ms = self.provision_retry.delay.as_millis() as u64,
                        error = %err,
                        "container provisioning failed, retrying"
                    );
                    tokio::time::sleep(self.provision_retry.delay).await;
                }
                Err(err) => {
                    error!(container = %container, attempt, error = %err, "container provisioning failed");
                    return Err(Error::from_provisioning(container, err));
                }
            }
        }
    }

    fn start_timer(&self, op: &'static str) -> Option<Timer> {
        self.metrics
            .as_ref()
            .map(|m| Timer::start_with_labels(&m.operations, &[KeyValue::new("op", op)]))
    }

    fn record_error(&self, op: &'static str) {
        if let Some(metrics) = &self.metrics {
            metrics.errors.add(1, &[KeyValue::new("op", op)]);
        }
    }
}

/// Resolve a `file://` storage root to a filesystem path.
fn file_root(path: &str) -> Result<PathBuf> {
    let url = Url::parse(path).map_err(|e| Error::Config {
        reason: format!("invalid storage path '{path}': {e}"),
    })?;
    url.to_file_path().map_err(|_| Error::Config {
        reason: format!("storage path '{path}' is not an absolute file path"),
    })
}
