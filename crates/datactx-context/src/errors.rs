//! Context error types.

use datactx_core::ApiError;
use datactx_loader::{LoadError, RegistryError};
use datactx_settings::SettingsError;
use thiserror::Error;

/// Errors surfaced by the data context and its data sources.
#[derive(Debug, Error)]
pub enum ContextError {
    /// A batch load failed.
    #[error("{0}")]
    Load(#[from] LoadError),

    /// The loader registry could not hand out a loader.
    #[error("{0}")]
    Registry(#[from] RegistryError),

    /// An external collaborator failed outside of a batch load.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// The operation needs an active project and none is set.
    #[error("Cannot {operation} without an active project")]
    NoActiveProject {
        /// What was attempted.
        operation: &'static str,
    },

    /// A config value had an unexpected shape.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Settings could not be loaded.
    #[error("{0}")]
    Settings(#[from] SettingsError),
}

impl ContextError {
    /// The collaborator error behind this failure, looking through batch
    /// loads whose fetch failed with an [`ApiError`].
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            Self::Load(load) => load.fetch_error()?.downcast_ref::<ApiError>(),
            _ => None,
        }
    }
}

/// Result type for context operations.
pub type Result<T> = std::result::Result<T, ContextError>;
