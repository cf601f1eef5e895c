//! Local filesystem backend.
//!
//! Containers are directories under a fixed root; objects are plain files.
//! Useful for development and tests, and as the reference semantics for the
//! [`StorageBackend`] contract.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};

use crate::{
    backend::{ObjectAttributes, PutReceipt, StorageBackend},
    error::BackendError,
};

pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, container: &str, key: &str) -> PathBuf {
        self.root.join(container).join(key)
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    async fn ensure_container(&self, container: &str) -> Result<(), BackendError> {
        // create_dir_all is the idempotent create-if-absent here.
        tokio::fs::create_dir_all(self.root.join(container))
            .await
            .map_err(BackendError::from)
    }

    async fn put(
        &self,
        container: &str,
        key: &str,
        data: Bytes,
        _attrs: &ObjectAttributes,
    ) -> Result<PutReceipt, BackendError> {
        let path = self.object_path(container, key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&path, &data).await?;

        // Filesystems have no server-side etag; a content hash stands in as
        // the write acknowledgment.
        let etag = format!("{:x}", Sha256::digest(&data));
        Ok(PutReceipt {
            etag: Some(etag),
            version: None,
        })
    }

    async fn get(&self, container: &str, key: &str) -> Result<Bytes, BackendError> {
        let path = self.object_path(container, key);
        let data = tokio::fs::read(&path).await?;
        Ok(Bytes::from(data))
    }

    async fn exists(&self, container: &str, key: &str) -> Result<bool, BackendError> {
        let path = self.object_path(container, key);
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn object_url(&self, container: &str, key: &str) -> String {
        format!("file://{}", self.object_path(container, key).display())
    }
}
