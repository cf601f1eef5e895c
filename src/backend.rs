//! Storage backend abstraction.
//!
//! The gateway talks to object storage through this trait only. A concrete
//! client is constructed once by the composition root and injected; tests
//! substitute a fake.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::BackendError;

/// Transfer metadata attached to every uploaded object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectAttributes {
    pub content_type: String,
    pub cache_control: String,
}

/// Positive acknowledgment of a completed write.
///
/// A backend that returns without error but with neither field populated
/// has not acknowledged the write; the gateway treats that as a failure.
#[derive(Debug, Clone, Default)]
pub struct PutReceipt {
    pub etag: Option<String>,
    pub version: Option<String>,
}

impl PutReceipt {
    pub fn is_acknowledged(&self) -> bool {
        self.etag.is_some() || self.version.is_some()
    }
}

/// Minimal contract the gateway requires from an object store.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Create the container if it does not exist. Calling this for an
    /// existing container is a success; concurrent callers are resolved by
    /// the backend's own idempotent semantics.
    async fn ensure_container(&self, container: &str) -> Result<(), BackendError>;

    /// Write an object and return the backend's acknowledgment.
    async fn put(
        &self,
        container: &str,
        key: &str,
        data: Bytes,
        attrs: &ObjectAttributes,
    ) -> Result<PutReceipt, BackendError>;

    /// Read an entire object.
    ///
    /// Returns `BackendError::NotFound` if the object doesn't exist.
    async fn get(&self, container: &str, key: &str) -> Result<Bytes, BackendError>;

    /// Probe object existence without reading it.
    async fn exists(&self, container: &str, key: &str) -> Result<bool, BackendError>;

    /// Dereferenceable locator for a stored object.
    fn object_url(&self, container: &str, key: &str) -> String;
}
