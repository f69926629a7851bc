//! # datactx-settings
//!
//! Settings for the data context, loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`DataContextSettings::default()`]
//! 2. **User file** — `~/.datactx/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** — `DATACTX_*` overrides (highest priority)
//!
//! There is no global settings instance: the embedding application loads
//! settings once and hands them to the context it constructs.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = DataContextSettings::default();
        let _path = settings_path();
    }

    #[test]
    fn default_settings_are_valid() {
        let settings = DataContextSettings::default();
        assert_eq!(settings.app_server_port, None);
        assert_eq!(settings.gql_server_port, None);
        assert!(settings.loader.cache);
        assert_eq!(settings.loader.max_batch_size, None);
        assert_eq!(settings.loader.batch_delay_ms, 0);
        assert_eq!(settings.event_bus.capacity, 1024);
        assert!(settings.validate().is_ok());
    }
}
