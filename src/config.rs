//! Gateway configuration.
//!
//! Configuration is read once at process start. The storage credential is
//! required for remote backends and its absence is a construction-time
//! failure; the gateway never fails lazily on first use.

use std::env;

use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    retry::RetryPolicy,
};

/// Environment variable holding the Azure storage connection string,
/// consulted when the config itself carries none.
pub const CONNECTION_STRING_ENV: &str = "AZURE_STORAGE_CONNECTION_STRING";

/// Prefix for environment-based configuration overrides.
const ENV_PREFIX: &str = "BLOB_GATEWAY_";

/// Bounded retry the storage client applies to each individual transfer
/// attempt at the transport layer. Distinct from [`RetryPolicy`], which
/// governs container provisioning; these are the only two retry points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportRetryConfig {
    pub max_retries: usize,
    pub attempt_timeout_secs: u64,
}

impl Default for TransportRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            attempt_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobStorageConfig {
    /// Storage root: `file:///path` for the filesystem backend, or
    /// `azure://` for Azure Blob Storage (account and credentials come
    /// from the connection string).
    #[serde(default = "default_storage_path")]
    pub path: String,

    /// Backend connection string. When unset, read from
    /// `AZURE_STORAGE_CONNECTION_STRING`.
    #[serde(default)]
    pub connection_string: Option<String>,

    /// Container provisioning retry.
    #[serde(default)]
    pub provision_retry: RetryPolicy,

    /// Per-attempt transport retry.
    #[serde(default)]
    pub transport_retry: TransportRetryConfig,
}

impl Default for BlobStorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            connection_string: None,
            provision_retry: RetryPolicy::default(),
            transport_retry: TransportRetryConfig::default(),
        }
    }
}

impl BlobStorageConfig {
    /// Load configuration from a YAML file, with `BLOB_GATEWAY_*`
    /// environment variables taking precedence.
    pub fn from_path(path: &str) -> Result<BlobStorageConfig> {
        let config_str = std::fs::read_to_string(path).map_err(|e| Error::Config {
            reason: format!("cannot read config file {path}: {e}"),
        })?;
        let mut config: BlobStorageConfig = Figment::new()
            .merge(Yaml::string(&config_str))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| Error::Config {
                reason: e.to_string(),
            })?;
        config.fill_connection_string_from_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the environment alone.
    pub fn from_env() -> Result<BlobStorageConfig> {
        let mut config: BlobStorageConfig = Figment::new()
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| Error::Config {
                reason: e.to_string(),
            })?;
        config.fill_connection_string_from_env();
        config.validate()?;
        Ok(config)
    }

    fn fill_connection_string_from_env(&mut self) {
        if self.connection_string.is_none() {
            self.connection_string = env::var(CONNECTION_STRING_ENV).ok();
        }
    }

    /// URI scheme of the configured storage root.
    pub fn scheme(&self) -> Result<&str> {
        let mut parts = self.path.splitn(2, "://");
        match (parts.next(), parts.next()) {
            (Some(scheme), Some(_)) if !scheme.is_empty() => Ok(scheme),
            _ => Err(Error::Config {
                reason: format!(
                    "storage path '{}' is missing a scheme (expected scheme://...)",
                    self.path
                ),
            }),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self.scheme()? {
            "file" => Ok(()),
            "azure" | "az" => {
                if !cfg!(feature = "azure") {
                    return Err(Error::UnsupportedScheme {
                        scheme: "azure (feature not enabled)".to_string(),
                    });
                }
                match &self.connection_string {
                    Some(cs) if !cs.is_empty() => Ok(()),
                    _ => Err(Error::Config {
                        reason: format!(
                            "azure storage requires a connection string; set it in the config or in {CONNECTION_STRING_ENV}"
                        ),
                    }),
                }
            }
            other => Err(Error::UnsupportedScheme {
                scheme: other.to_string(),
            }),
        }
    }
}

/// Default storage root (local filesystem under the working directory).
pub fn default_storage_path() -> String {
    format!(
        "file://{}",
        env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join("storage/blobs")
            .to_str()
            .unwrap_or("./storage/blobs")
    )
}
