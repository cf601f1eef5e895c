//! Blob storage gateway.
//!
//! A library-level pathway between request handlers holding a raw file
//! payload and the object storage backend. It owns three concerns:
//!
//! - turning arbitrary client filenames into backend-safe, collision-free
//!   object keys
//! - making sure the target container exists before a transfer, with
//!   bounded retry
//! - executing the transfer and classifying failures precisely enough for
//!   callers to decide between retrying and surfacing a fatal error
//!
//! The gateway does not authenticate callers, persist metadata, or expose
//! any wire surface; it returns a URL the caller stores elsewhere.
//!
//! # Usage
//!
//! ```rust,no_run
//! use blob_gateway::{BlobGateway, BlobStorageConfig, UploadRequest};
//!
//! # async fn example() -> Result<(), blob_gateway::Error> {
//! let config = BlobStorageConfig::from_env()?;
//! let gateway = BlobGateway::new(&config)?;
//!
//! let result = gateway
//!     .upload(UploadRequest {
//!         container_name: "resumes".to_string(),
//!         data: bytes::Bytes::from_static(b"%PDF-1.7 ..."),
//!         original_name: "Jane Doe Resume.pdf".to_string(),
//!     })
//!     .await?;
//! println!("stored at {}", result.url);
//! # Ok(())
//! # }
//! ```
//!
//! Callers match on [`Error`] kinds to react: [`Error::Validation`] and
//! [`Error::NotFound`] are never worth retrying, the rest have already
//! exhausted the gateway's internal bounded retries.

mod backend;
mod backends;
mod config;
mod error;
mod metrics;
mod retry;
mod sanitize;
mod storage;
#[cfg(test)]
mod testing;
mod time;

#[cfg(feature = "azure")]
pub use backends::azure::AzureBackend;
pub use backend::{ObjectAttributes, PutReceipt, StorageBackend};
pub use backends::local::LocalBackend;
pub use config::{BlobStorageConfig, TransportRetryConfig, CONNECTION_STRING_ENV};
pub use error::{BackendError, Error, Result};
pub use metrics::{GatewayMetrics, Timer};
pub use retry::RetryPolicy;
pub use sanitize::ObjectKey;
pub use storage::{BlobGateway, DownloadRequest, UploadRequest, UploadResult};
