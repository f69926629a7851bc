//! Batch loader and event bus settings.

use serde::{Deserialize, Serialize};

/// Batch loader behavior shared by every loader a context creates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoaderSettings {
    /// Upper bound on keys per fetch. `None` sends each window whole.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_batch_size: Option<usize>,
    /// Memoize resolved values across windows.
    pub cache: bool,
    /// Extra time a window stays open, in milliseconds. `0` closes the window
    /// on the next scheduler turn.
    pub batch_delay_ms: u64,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            max_batch_size: None,
            cache: true,
            batch_delay_ms: 0,
        }
    }
}

/// Root event bus settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventBusSettings {
    /// Broadcast channel capacity. Slower subscribers lag past this.
    pub capacity: usize,
}

impl Default for EventBusSettings {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}
