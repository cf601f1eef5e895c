//! Azure Blob Storage backend using object_store for data I/O and
//! azure_storage_blobs for container management, which object_store does
//! not expose.

use std::time::Duration;

use async_trait::async_trait;
use azure_storage::ConnectionString;
use azure_storage_blobs::prelude::*;
use bytes::Bytes;
use object_store::{
    azure::{MicrosoftAzure, MicrosoftAzureBuilder},
    path::Path as ObjectPath,
    Attribute,
    Attributes,
    ObjectStore,
    PutOptions,
    RetryConfig,
};
use tracing::debug;

use crate::{
    backend::{ObjectAttributes, PutReceipt, StorageBackend},
    config::TransportRetryConfig,
    error::{BackendError, Error},
};

#[derive(Debug)]
pub struct AzureBackend {
    /// Storage account name, from the connection string.
    account: String,

    /// Shared key, from the connection string.
    access_key: String,

    /// Base endpoint for public object URLs.
    blob_endpoint: String,

    /// Azure SDK client, used only for container create-if-absent.
    service: BlobServiceClient,

    /// Transport retry applied to every object_store client.
    retry: RetryConfig,
}

impl AzureBackend {
    /// Build a backend from an Azure storage connection string.
    ///
    /// The connection string must carry `AccountName` and `AccountKey`;
    /// anything else is a configuration error surfaced at construction,
    /// not on first use.
    pub fn new(connection_string: &str, transport: &TransportRetryConfig) -> Result<Self, Error> {
        let parsed = ConnectionString::new(connection_string).map_err(|e| Error::Config {
            reason: format!("malformed connection string: {e}"),
        })?;
        let account = parsed
            .account_name
            .ok_or_else(|| Error::Config {
                reason: "connection string is missing AccountName".to_string(),
            })?
            .to_string();
        let access_key = parsed
            .account_key
            .ok_or_else(|| Error::Config {
                reason: "connection string is missing AccountKey".to_string(),
            })?
            .to_string();
        let blob_endpoint = parsed
            .blob_endpoint
            .map(str::to_string)
            .unwrap_or_else(|| format!("https://{account}.blob.core.windows.net"));

        let credentials = parsed.storage_credentials().map_err(|e| Error::Config {
            reason: format!("unusable storage credentials: {e}"),
        })?;
        let service = BlobServiceClient::new(account.clone(), credentials);

        let mut retry = RetryConfig::default();
        retry.max_retries = transport.max_retries;
        retry.retry_timeout = Duration::from_secs(transport.attempt_timeout_secs);

        debug!(account = %account, "created azure blob backend");

        Ok(Self {
            account,
            access_key,
            blob_endpoint,
            service,
            retry,
        })
    }

    /// object_store clients are container-scoped; building one is pure
    /// configuration, no network.
    fn container_store(&self, container: &str) -> Result<MicrosoftAzure, BackendError> {
        MicrosoftAzureBuilder::new()
            .with_account(self.account.as_str())
            .with_access_key(self.access_key.as_str())
            .with_container_name(container)
            .with_retry(self.retry.clone())
            .build()
            .map_err(BackendError::from)
    }
}

#[async_trait]
impl StorageBackend for AzureBackend {
    async fn ensure_container(&self, container: &str) -> Result<(), BackendError> {
        let result = self
            .service
            .container_client(container)
            .create()
            .public_access(PublicAccess::Container)
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(err) if container_already_exists(&err) => Ok(()),
            Err(err) => Err(BackendError::from(err)),
        }
    }

    async fn put(
        &self,
        container: &str,
        key: &str,
        data: Bytes,
        attrs: &ObjectAttributes,
    ) -> Result<PutReceipt, BackendError> {
        let store = self.container_store(container)?;

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, attrs.content_type.clone().into());
        attributes.insert(Attribute::CacheControl, attrs.cache_control.clone().into());
        let mut options = PutOptions::default();
        options.attributes = attributes;

        let result = store
            .put_opts(&ObjectPath::from(key), data.into(), options)
            .await
            .map_err(BackendError::from)?;

        Ok(PutReceipt {
            etag: result.e_tag,
            version: result.version,
        })
    }

    async fn get(&self, container: &str, key: &str) -> Result<Bytes, BackendError> {
        let store = self.container_store(container)?;
        let result = store
            .get(&ObjectPath::from(key))
            .await
            .map_err(BackendError::from)?;
        result.bytes().await.map_err(BackendError::from)
    }

    async fn exists(&self, container: &str, key: &str) -> Result<bool, BackendError> {
        let store = self.container_store(container)?;
        match store.head(&ObjectPath::from(key)).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(err) => Err(BackendError::from(err)),
        }
    }

    fn object_url(&self, container: &str, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.blob_endpoint.trim_end_matches('/'),
            container,
            key
        )
    }
}

/// Container creation races and repeats resolve to success; the backend
/// reports an existing container as HTTP 409.
fn container_already_exists(err: &azure_core::Error) -> bool {
    err.as_http_error()
        .map(|http| http.status() == azure_core::StatusCode::Conflict)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONNECTION_STRING: &str =
        "DefaultEndpointsProtocol=https;AccountName=recruiterfiles;AccountKey=dGVzdC1rZXk=;EndpointSuffix=core.windows.net";

    #[test]
    fn test_object_url_uses_account_endpoint() {
        let backend =
            AzureBackend::new(CONNECTION_STRING, &TransportRetryConfig::default()).unwrap();
        assert_eq!(
            backend.object_url("profile-pics", "cat-12345-abc123.png"),
            "https://recruiterfiles.blob.core.windows.net/profile-pics/cat-12345-abc123.png"
        );
    }

    #[test]
    fn test_missing_account_name_is_a_config_error() {
        let err = AzureBackend::new(
            "DefaultEndpointsProtocol=https;AccountKey=dGVzdC1rZXk=",
            &TransportRetryConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
