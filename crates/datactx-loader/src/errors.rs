//! Loader and registry error types.

use std::sync::Arc;

use thiserror::Error;

/// Why a single `load` did not produce a value.
///
/// `Clone` because one settled result is handed to every waiter of a key.
#[derive(Clone, Debug, Error)]
pub enum LoadError {
    /// The batch function succeeded but its result had no entry for the key.
    #[error("key not found in batch result: {key}")]
    KeyNotFound {
        /// `Debug` rendering of the key.
        key: String,
    },

    /// The batch function failed. Every key of the batch sees the same error.
    #[error("batch fetch failed: {0}")]
    BatchFetch(Arc<dyn std::error::Error + Send + Sync>),

    /// The key was cleared while still waiting in an undispatched window.
    #[error("key cleared before dispatch: {key}")]
    Cleared {
        /// `Debug` rendering of the key.
        key: String,
    },

    /// The dispatcher went away without settling the key.
    #[error("batch dispatcher dropped before settling the key")]
    Dropped,

    /// `load` was called outside a Tokio runtime.
    #[error("load called outside an async runtime")]
    NoRuntime,
}

impl LoadError {
    /// The batch function's error, if this is a batch failure.
    pub fn fetch_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::BatchFetch(err) => Some(err.as_ref()),
            _ => None,
        }
    }

    /// Error category string for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::KeyNotFound { .. } => "key_not_found",
            Self::BatchFetch(_) => "batch_fetch",
            Self::Cleared { .. } => "cleared",
            Self::Dropped => "dropped",
            Self::NoRuntime => "no_runtime",
        }
    }
}

/// Registry lookups that cannot return a loader.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The kind was first registered with different key/value types.
    #[error("loader kind '{kind}' holds {registered}, requested {requested}")]
    TypeMismatch {
        /// Loader kind name.
        kind: &'static str,
        /// Key/value types of the first registration.
        registered: &'static str,
        /// Key/value types of this request.
        requested: &'static str,
    },
}
