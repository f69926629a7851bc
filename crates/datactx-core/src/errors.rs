//! Errors reported by external collaborators.
//!
//! The data layer never implements config execution or filesystem scanning
//! itself. Collaborators surface their failures as [`ApiError`], which carries
//! the collaborator operation name so callers can tell a failed config
//! evaluation from a failed glob.

use std::sync::Arc;

use thiserror::Error;

/// Failure reported by an external collaborator.
#[derive(Clone, Debug, Error)]
#[error("{operation} failed: {message}")]
pub struct ApiError {
    /// Collaborator operation that failed (e.g. `get_config`).
    pub operation: String,
    /// Human-readable description.
    pub message: String,
    /// Original error, shared so the value stays cheap to clone.
    #[source]
    pub source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl ApiError {
    /// Create an error without an underlying source.
    #[must_use]
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an underlying error.
    #[must_use]
    pub fn with_source<E>(operation: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            operation: operation.into(),
            message: source.to_string(),
            source: Some(Arc::new(source)),
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source("io", err)
    }
}

/// Result type for collaborator calls.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn display_includes_operation() {
        let err = ApiError::new("get_config", "config file threw");
        assert_eq!(err.to_string(), "get_config failed: config file threw");
        assert!(err.source().is_none());
    }

    #[test]
    fn with_source_keeps_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "cypress.config.js");
        let err = ApiError::with_source("find_specs", io);
        assert_eq!(err.operation, "find_specs");
        assert!(err.message.contains("cypress.config.js"));
        assert!(err.source().is_some());
    }

    #[test]
    fn io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ApiError = io.into();
        assert_eq!(err.operation, "io");
    }

    #[test]
    fn clones_share_source() {
        let io = std::io::Error::other("boom");
        let err = ApiError::with_source("scan", io);
        let cloned = err.clone();
        let (Some(a), Some(b)) = (&err.source, &cloned.source) else {
            panic!("source missing");
        };
        assert!(Arc::ptr_eq(a, b));
    }
}
