//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`DataContextSettings::default()`]
//! 2. If the settings file exists, deep-merge user values over defaults
//! 3. Apply `DATACTX_*` environment variable overrides (highest priority)
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::DataContextSettings;

/// Resolve the path to the settings file (`~/.datactx/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".datactx").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<DataContextSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON or out-of-range values, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<DataContextSettings> {
    let mut settings = read_layers(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

fn read_layers(path: &Path) -> Result<DataContextSettings> {
    let defaults = serde_json::to_value(DataContextSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Invalid values are ignored with a warning (fall back to file/default).
pub fn apply_env_overrides(settings: &mut DataContextSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary variable source.
///
/// Split out from [`apply_env_overrides`] so tests can supply variables
/// without touching the process environment.
pub fn apply_overrides<F>(settings: &mut DataContextSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    // ── Ports ───────────────────────────────────────────────────────
    if let Some(v) = read_u16(&lookup, "DATACTX_APP_SERVER_PORT", 1, 65535) {
        settings.app_server_port = Some(v);
    }
    if let Some(v) = read_u16(&lookup, "DATACTX_GQL_SERVER_PORT", 1, 65535) {
        settings.gql_server_port = Some(v);
    }

    // ── Loader ──────────────────────────────────────────────────────
    if let Some(v) = read_usize(&lookup, "DATACTX_MAX_BATCH_SIZE", 1, 100_000) {
        settings.loader.max_batch_size = Some(v);
    }
    if let Some(v) = read_u64(&lookup, "DATACTX_BATCH_DELAY_MS", 0, 60_000) {
        settings.loader.batch_delay_ms = v;
    }
    if let Some(v) = read_bool(&lookup, "DATACTX_LOADER_CACHE") {
        settings.loader.cache = v;
    }

    // ── Event bus ───────────────────────────────────────────────────
    if let Some(v) = read_usize(&lookup, "DATACTX_BUS_CAPACITY", 1, 1_048_576) {
        settings.event_bus.capacity = v;
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Variable readers (thin wrappers) ────────────────────────────────────────

fn read_bool<F: Fn(&str) -> Option<String>>(lookup: &F, name: &str) -> Option<bool> {
    let val = lookup(name)?;
    let result = parse_bool(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
    }
    result
}

fn read_u16<F: Fn(&str) -> Option<String>>(
    lookup: &F,
    name: &str,
    min: u16,
    max: u16,
) -> Option<u16> {
    let val = lookup(name)?;
    let result = parse_u16_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u16 env var, ignoring");
    }
    result
}

fn read_u64<F: Fn(&str) -> Option<String>>(
    lookup: &F,
    name: &str,
    min: u64,
    max: u64,
) -> Option<u64> {
    let val = lookup(name)?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

fn read_usize<F: Fn(&str) -> Option<String>>(
    lookup: &F,
    name: &str,
    min: usize,
    max: usize,
) -> Option<usize> {
    let val = lookup(name)?;
    let result = parse_usize_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid usize env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SettingsError;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"loader": {"cache": true, "batchDelayMs": 0}});
        let source = serde_json::json!({"loader": {"batchDelayMs": 5}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["loader"]["batchDelayMs"], 5);
        assert_eq!(merged["loader"]["cache"], true);
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_array_replace() {
        let target = serde_json::json!({"items": [1, 2, 3]});
        let source = serde_json::json!({"items": [4]});
        let merged = deep_merge(target, source);
        assert_eq!(merged["items"], serde_json::json!([4]));
    }

    #[test]
    fn merge_primitive_replaces_object() {
        let target = serde_json::json!({"a": {"nested": true}});
        let source = serde_json::json!({"a": 42});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 42);
    }

    // ── file layer ──────────────────────────────────────────────────

    #[test]
    fn load_missing_file_returns_defaults() {
        let settings = read_layers(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings, DataContextSettings::default());
    }

    #[test]
    fn load_partial_json_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"gqlServerPort": 52200, "loader": {"maxBatchSize": 25}}"#,
        )
        .unwrap();

        let settings = read_layers(&path).unwrap();
        assert_eq!(settings.gql_server_port, Some(52200));
        assert_eq!(settings.loader.max_batch_size, Some(25));
        assert!(settings.loader.cache);
        assert_eq!(settings.app_server_port, None);
    }

    #[test]
    fn load_invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();

        assert_matches!(read_layers(&path), Err(SettingsError::Json(_)));
    }

    #[test]
    fn load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"eventBus": {"capacity": 0}}"#).unwrap();

        assert_matches!(
            load_settings_from_path(&path),
            Err(SettingsError::InvalidValue(_))
        );
    }

    // ── overrides ───────────────────────────────────────────────────

    #[test]
    fn overrides_apply() {
        let mut settings = DataContextSettings::default();
        apply_overrides(
            &mut settings,
            vars(&[
                ("DATACTX_APP_SERVER_PORT", "4455"),
                ("DATACTX_MAX_BATCH_SIZE", "10"),
                ("DATACTX_BATCH_DELAY_MS", "3"),
                ("DATACTX_LOADER_CACHE", "off"),
                ("DATACTX_BUS_CAPACITY", "16"),
            ]),
        );
        assert_eq!(settings.app_server_port, Some(4455));
        assert_eq!(settings.loader.max_batch_size, Some(10));
        assert_eq!(settings.loader.batch_delay_ms, 3);
        assert!(!settings.loader.cache);
        assert_eq!(settings.event_bus.capacity, 16);
    }

    #[test]
    fn invalid_overrides_ignored() {
        let mut settings = DataContextSettings::default();
        apply_overrides(
            &mut settings,
            vars(&[
                ("DATACTX_GQL_SERVER_PORT", "0"),
                ("DATACTX_MAX_BATCH_SIZE", "lots"),
                ("DATACTX_LOADER_CACHE", "maybe"),
            ]),
        );
        assert_eq!(settings, DataContextSettings::default());
    }

    // ── parsing ─────────────────────────────────────────────────────

    #[test]
    fn parse_bool_variants() {
        for val in &["true", "1", "yes", "on", "TRUE"] {
            assert_eq!(parse_bool(val), Some(true), "failed for {val}");
        }
        for val in &["false", "0", "no", "off", "Off"] {
            assert_eq!(parse_bool(val), Some(false), "failed for {val}");
        }
        assert_eq!(parse_bool("2"), None);
    }

    #[test]
    fn parse_ranges() {
        assert_eq!(parse_u16_range("65535", 1, 65535), Some(65535));
        assert_eq!(parse_u16_range("99999", 1, 65535), None);
        assert_eq!(parse_u64_range("0", 0, 10), Some(0));
        assert_eq!(parse_u64_range("11", 0, 10), None);
        assert_eq!(parse_usize_range("abc", 1, 10), None);
    }
}
