//! Error taxonomy for gateway operations.
//!
//! Backend SDK errors never cross the public API. Each backend converts its
//! own failures into [`BackendError`] through the `From` impls in this
//! module; that conversion is the only place backend-specific detail is
//! inspected. The gateway then lifts a `BackendError` into the public
//! [`Error`] according to the phase the call was in (provisioning vs.
//! transfer).

use std::fmt;

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Caller-visible failure kinds.
///
/// `Validation` and `NotFound` are never retried by the gateway;
/// `Connectivity`, `Provisioning` and `Transfer` have already exhausted the
/// gateway's internal bounded retries by the time the caller sees them.
#[derive(Debug)]
pub enum Error {
    /// Missing or empty request field. Raised before any backend call.
    Validation { reason: String },

    /// The storage backend could not be reached at all.
    Connectivity { source: anyhow::Error },

    /// The backend was reachable but container setup failed after
    /// exhausting retries.
    Provisioning {
        container: String,
        source: anyhow::Error,
    },

    /// The object write or read itself failed, or completed without a
    /// backend acknowledgment.
    Transfer { source: anyhow::Error },

    /// Download requested for a key that does not exist.
    NotFound { container: String, key: String },

    /// The gateway could not be constructed from its configuration.
    Config { reason: String },

    /// The configured storage scheme is not available in this build.
    UnsupportedScheme { scheme: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Validation { reason } => write!(f, "validation failed: {}", reason),
            Error::Connectivity { source } => write!(
                f,
                "cannot connect to the storage backend: {}; check the connection string and network configuration",
                source
            ),
            Error::Provisioning { container, source } => {
                write!(f, "provisioning container '{}' failed: {}", container, source)
            }
            Error::Transfer { source } => write!(f, "transfer failed: {}", source),
            Error::NotFound { container, key } => {
                write!(f, "blob '{}' not found in container '{}'", key, container)
            }
            Error::Config { reason } => write!(f, "invalid configuration: {}", reason),
            Error::UnsupportedScheme { scheme } => {
                write!(f, "unsupported storage scheme: {}", scheme)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connectivity { source } |
            Error::Provisioning { source, .. } |
            Error::Transfer { source } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl Error {
    /// Lift a backend failure observed while provisioning a container.
    pub(crate) fn from_provisioning(container: &str, err: BackendError) -> Self {
        match err {
            BackendError::Unreachable { source } => Error::Connectivity { source },
            other => Error::Provisioning {
                container: container.to_string(),
                source: other.into_source(),
            },
        }
    }

    /// Lift a backend failure observed while writing an object. An upload
    /// has no meaningful not-found case, so everything that is not a
    /// connectivity failure is a transfer failure.
    pub(crate) fn from_put(err: BackendError) -> Self {
        match err {
            BackendError::Unreachable { source } => Error::Connectivity { source },
            other => Error::Transfer {
                source: other.into_source(),
            },
        }
    }

    /// Lift a backend failure observed while transferring object data.
    pub(crate) fn from_transfer(container: &str, key: &str, err: BackendError) -> Self {
        match err {
            BackendError::Unreachable { source } => Error::Connectivity { source },
            BackendError::NotFound => Error::NotFound {
                container: container.to_string(),
                key: key.to_string(),
            },
            BackendError::Backend { source } => Error::Transfer { source },
        }
    }
}

/// Failure classes a [`StorageBackend`](crate::StorageBackend) can emit.
#[derive(Debug)]
pub enum BackendError {
    /// The addressed object does not exist.
    NotFound,

    /// The backend could not be reached (connection refused, reset, or
    /// timed out at the transport layer).
    Unreachable { source: anyhow::Error },

    /// Any other backend-reported failure.
    Backend { source: anyhow::Error },
}

impl BackendError {
    pub fn backend(source: impl Into<anyhow::Error>) -> Self {
        BackendError::Backend {
            source: source.into(),
        }
    }

    pub fn unreachable(source: impl Into<anyhow::Error>) -> Self {
        BackendError::Unreachable {
            source: source.into(),
        }
    }

    fn into_source(self) -> anyhow::Error {
        match self {
            BackendError::NotFound => anyhow::anyhow!("object not found"),
            BackendError::Unreachable { source } | BackendError::Backend { source } => source,
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::NotFound => write!(f, "object not found"),
            BackendError::Unreachable { source } => write!(f, "backend unreachable: {}", source),
            BackendError::Backend { source } => write!(f, "backend error: {}", source),
        }
    }
}

impl std::error::Error for BackendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BackendError::NotFound => None,
            BackendError::Unreachable { source } | BackendError::Backend { source } => {
                Some(source.as_ref())
            }
        }
    }
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::NotFound => BackendError::NotFound,
            kind if is_connection_kind(kind) => BackendError::unreachable(err),
            _ => BackendError::backend(err),
        }
    }
}

#[cfg(feature = "azure")]
impl From<object_store::Error> for BackendError {
    fn from(err: object_store::Error) -> Self {
        if matches!(err, object_store::Error::NotFound { .. }) {
            return BackendError::NotFound;
        }
        if has_connection_io_source(&err) {
            BackendError::unreachable(err)
        } else {
            BackendError::backend(err)
        }
    }
}

#[cfg(feature = "azure")]
impl From<azure_core::Error> for BackendError {
    fn from(err: azure_core::Error) -> Self {
        use azure_core::error::ErrorKind;

        let not_found = matches!(
            err.kind(),
            ErrorKind::HttpResponse { status, .. } if *status == azure_core::StatusCode::NotFound
        );
        if not_found {
            return BackendError::NotFound;
        }
        let unreachable =
            matches!(err.kind(), ErrorKind::Io) || has_connection_io_source(&err);
        if unreachable {
            BackendError::unreachable(err)
        } else {
            BackendError::backend(err)
        }
    }
}

fn is_connection_kind(kind: std::io::ErrorKind) -> bool {
    use std::io::ErrorKind;
    matches!(
        kind,
        ErrorKind::ConnectionRefused |
            ErrorKind::ConnectionReset |
            ErrorKind::ConnectionAborted |
            ErrorKind::NotConnected |
            ErrorKind::TimedOut
    )
}

/// Walk an error's source chain looking for a connection-class io error.
#[cfg(feature = "azure")]
fn has_connection_io_source(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            if is_connection_kind(io.kind()) {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_not_found_maps_to_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(BackendError::from(io), BackendError::NotFound));
    }

    #[test]
    fn test_connection_refused_maps_to_unreachable() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(matches!(
            BackendError::from(io),
            BackendError::Unreachable { .. }
        ));
    }

    #[test]
    fn test_unreachable_lifts_to_connectivity_in_both_phases() {
        let err = Error::from_provisioning(
            "resumes",
            BackendError::unreachable(anyhow::anyhow!("refused")),
        );
        assert!(matches!(err, Error::Connectivity { .. }));

        let err = Error::from_transfer(
            "resumes",
            "a.pdf",
            BackendError::unreachable(anyhow::anyhow!("refused")),
        );
        assert!(matches!(err, Error::Connectivity { .. }));
    }

    #[test]
    fn test_phase_lifting() {
        let err = Error::from_provisioning(
            "resumes",
            BackendError::backend(anyhow::anyhow!("backend down")),
        );
        assert!(matches!(err, Error::Provisioning { .. }));

        let err =
            Error::from_transfer("resumes", "a.pdf", BackendError::backend(anyhow::anyhow!("eof")));
        assert!(matches!(err, Error::Transfer { .. }));

        let err = Error::from_transfer("resumes", "a.pdf", BackendError::NotFound);
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_display_includes_backend_detail() {
        let err = Error::Transfer {
            source: anyhow::anyhow!("socket closed mid-write"),
        };
        assert!(err.to_string().contains("socket closed mid-write"));

        let err = Error::Connectivity {
            source: anyhow::anyhow!("connection refused"),
        };
        assert!(err.to_string().contains("check the connection string"));
    }
}
