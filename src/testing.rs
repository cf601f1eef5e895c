//! In-memory fake backend for gateway tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    backend::{ObjectAttributes, PutReceipt, StorageBackend},
    error::BackendError,
};

/// Test double with per-operation call counters and injectable failures.
#[derive(Default)]
pub struct FakeBackend {
    blobs: Mutex<HashMap<(String, String), Bytes>>,

    /// Number of `ensure_container` calls that fail before one succeeds.
    pub ensure_failures: AtomicU32,

    /// When set, every call fails as if the backend were unreachable.
    pub unreachable: AtomicBool,

    /// When cleared, `put` succeeds but returns an empty receipt.
    pub acknowledge_puts: AtomicBool,

    pub ensure_calls: AtomicU32,
    pub put_calls: AtomicU32,
    pub get_calls: AtomicU32,
    pub exists_calls: AtomicU32,

    pub last_attributes: Mutex<Option<ObjectAttributes>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        let backend = Self::default();
        backend.acknowledge_puts.store(true, Ordering::SeqCst);
        backend
    }

    pub fn failing_provisioning(times: u32) -> Self {
        let backend = Self::new();
        backend.ensure_failures.store(times, Ordering::SeqCst);
        backend
    }

    pub fn offline() -> Self {
        let backend = Self::new();
        backend.unreachable.store(true, Ordering::SeqCst);
        backend
    }

    pub fn insert_blob(&self, container: &str, key: &str, data: Bytes) {
        self.blobs
            .lock()
            .unwrap()
            .insert((container.to_string(), key.to_string()), data);
    }

    pub fn stored_keys(&self, container: &str) -> Vec<String> {
        self.blobs
            .lock()
            .unwrap()
            .keys()
            .filter(|(c, _)| c == container)
            .map(|(_, k)| k.clone())
            .collect()
    }

    pub fn backend_calls(&self) -> u32 {
        self.ensure_calls.load(Ordering::SeqCst) +
            self.put_calls.load(Ordering::SeqCst) +
            self.get_calls.load(Ordering::SeqCst) +
            self.exists_calls.load(Ordering::SeqCst)
    }

    fn check_reachable(&self) -> Result<(), BackendError> {
        if self.unreachable.load(Ordering::SeqCst) {
            Err(BackendError::unreachable(anyhow::anyhow!(
                "connection refused"
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StorageBackend for FakeBackend {
    async fn ensure_container(&self, _container: &str) -> Result<(), BackendError> {
        self.ensure_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        let remaining = self.ensure_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.ensure_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(BackendError::backend(anyhow::anyhow!(
                "simulated provisioning outage"
            )));
        }
        Ok(())
    }

    async fn put(
        &self,
        container: &str,
        key: &str,
        data: Bytes,
        attrs: &ObjectAttributes,
    ) -> Result<PutReceipt, BackendError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        *self.last_attributes.lock().unwrap() = Some(attrs.clone());
        self.insert_blob(container, key, data);
        if self.acknowledge_puts.load(Ordering::SeqCst) {
            Ok(PutReceipt {
                etag: Some(format!("etag-{key}")),
                version: None,
            })
        } else {
            Ok(PutReceipt::default())
        }
    }

    async fn get(&self, container: &str, key: &str) -> Result<Bytes, BackendError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        self.blobs
            .lock()
            .unwrap()
            .get(&(container.to_string(), key.to_string()))
            .cloned()
            .ok_or(BackendError::NotFound)
    }

    async fn exists(&self, container: &str, key: &str) -> Result<bool, BackendError> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        Ok(self
            .blobs
            .lock()
            .unwrap()
            .contains_key(&(container.to_string(), key.to_string())))
    }

    fn object_url(&self, container: &str, key: &str) -> String {
        format!("fake://{container}/{key}")
    }
}
