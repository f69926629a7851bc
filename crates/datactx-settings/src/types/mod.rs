//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and `#[serde(default)]`,
//! so partial JSON files are accepted and missing fields keep their defaults.

mod loader;

pub use loader::*;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings for one data context.
///
/// ```json
/// {
///   "appServerPort": 4455,
///   "loader": { "maxBatchSize": 50 }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataContextSettings {
    /// Port of the app server, if already assigned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_server_port: Option<u16>,
    /// Port of the GraphQL server, if already assigned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gql_server_port: Option<u16>,
    /// Batch loader behavior.
    pub loader: LoaderSettings,
    /// Root event bus sizing.
    pub event_bus: EventBusSettings,
}

impl DataContextSettings {
    /// Reject values the data layer cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.loader.max_batch_size == Some(0) {
            return Err(SettingsError::InvalidValue(
                "loader.maxBatchSize must be at least 1".into(),
            ));
        }
        if self.event_bus.capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "eventBus.capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
