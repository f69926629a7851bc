//! Boundary traits for the collaborators the context wires together.
//!
//! Config evaluation, spec scanning, globbing, and storybook discovery are
//! implemented outside this crate. The context only sees them through the
//! traits below, bundled into [`ExternalApis`] at construction. The one
//! concrete implementation shipped here is [`PackageJsonScanner`], which
//! answers dependency lookups from a project's `package.json`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use datactx_core::ApiResult;
use serde_json::Value;
use tracing::{debug, warn};

use crate::bus::EventBus;
use crate::types::{
    FindSpecsOptions, FullConfig, ProjectConfig, ProjectPreferences, SettingsOptions, SpecFile,
};

// ─────────────────────────────────────────────────────────────────────────────
// Collaborator traits
// ─────────────────────────────────────────────────────────────────────────────

/// Project config evaluation and spec discovery.
#[async_trait]
pub trait ProjectApi: Send + Sync {
    /// Evaluate the full config for the project at `project_root`.
    async fn get_config(
        &self,
        project_root: &str,
        options: &SettingsOptions,
    ) -> ApiResult<FullConfig>;

    /// Read lightweight project metadata. `None` when the project has no
    /// config file yet.
    async fn get_project_config(&self, project_root: &str) -> ApiResult<Option<ProjectConfig>>;

    /// Scan for spec files.
    async fn find_specs(&self, options: &FindSpecsOptions) -> ApiResult<Vec<SpecFile>>;

    /// Saved preferences, keyed by project title.
    async fn get_project_preferences_from_cache(
        &self,
    ) -> ApiResult<HashMap<String, ProjectPreferences>>;
}

/// Filesystem globbing.
#[async_trait]
pub trait FileApi: Send + Sync {
    /// Absolute paths matching `glob`.
    async fn get_files_by_glob(&self, glob: &str) -> ApiResult<Vec<String>>;

    /// Describe `file` as a spec of the project at `project_root`.
    fn normalize_file_to_spec(
        &self,
        file: &str,
        project_root: &str,
        component_folder: &str,
    ) -> SpecFile;
}

/// Storybook story discovery.
#[async_trait]
pub trait StorybookApi: Send + Sync {
    /// Every story in the active project.
    async fn get_stories(&self) -> ApiResult<Vec<SpecFile>>;
}

/// Answers whether a project depends on any of a set of packages.
pub trait DependencyScanner: Send + Sync {
    /// Whether the project at `project_root` declares any of `deps`.
    fn has_any_dependency(&self, project_root: &Path, deps: &[&str]) -> bool;
}

// ─────────────────────────────────────────────────────────────────────────────
// Bundles
// ─────────────────────────────────────────────────────────────────────────────

/// Collaborators supplied by the embedding application.
#[derive(Clone)]
pub struct ExternalApis {
    /// Config and spec access.
    pub project_api: Arc<dyn ProjectApi>,
    /// Globbing.
    pub file_api: Arc<dyn FileApi>,
    /// Storybook.
    pub storybook_api: Arc<dyn StorybookApi>,
    /// Dependency detection.
    pub dependency_api: Arc<dyn DependencyScanner>,
}

impl ExternalApis {
    /// Bundle collaborators, detecting dependencies from `package.json`.
    pub fn new(
        project_api: Arc<dyn ProjectApi>,
        file_api: Arc<dyn FileApi>,
        storybook_api: Arc<dyn StorybookApi>,
    ) -> Self {
        Self {
            project_api,
            file_api,
            storybook_api,
            dependency_api: Arc::new(PackageJsonScanner),
        }
    }

    /// Replace the dependency scanner.
    #[must_use]
    pub fn with_dependency_scanner(mut self, scanner: Arc<dyn DependencyScanner>) -> Self {
        self.dependency_api = scanner;
        self
    }
}

impl std::fmt::Debug for ExternalApis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalApis").finish_non_exhaustive()
    }
}

/// The boundary surface a context exposes: the root bus plus the external
/// collaborators.
#[derive(Clone, Debug)]
pub struct DataContextApis {
    /// Root event bus.
    pub bus_api: Arc<EventBus>,
    /// Config and spec access.
    pub project_api: Arc<dyn ProjectApi>,
    /// Globbing.
    pub file_api: Arc<dyn FileApi>,
    /// Storybook.
    pub storybook_api: Arc<dyn StorybookApi>,
    /// Dependency detection.
    pub dependency_api: Arc<dyn DependencyScanner>,
}

impl DataContextApis {
    pub(crate) fn new(bus: Arc<EventBus>, external: ExternalApis) -> Self {
        Self {
            bus_api: bus,
            project_api: external.project_api,
            file_api: external.file_api,
            storybook_api: external.storybook_api,
            dependency_api: external.dependency_api,
        }
    }
}

impl std::fmt::Debug for dyn ProjectApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ProjectApi")
    }
}

impl std::fmt::Debug for dyn FileApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FileApi")
    }
}

impl std::fmt::Debug for dyn StorybookApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StorybookApi")
    }
}

impl std::fmt::Debug for dyn DependencyScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DependencyScanner")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// package.json scanner
// ─────────────────────────────────────────────────────────────────────────────

const DEPENDENCY_SECTIONS: [&str; 3] = ["dependencies", "devDependencies", "peerDependencies"];

/// Detects dependencies declared in `<project_root>/package.json`.
///
/// A missing or unreadable manifest counts as declaring nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct PackageJsonScanner;

impl PackageJsonScanner {
    fn read_manifest(project_root: &Path) -> Option<Value> {
        let path = project_root.join("package.json");
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no readable package.json");
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "malformed package.json");
                None
            }
        }
    }
}

impl DependencyScanner for PackageJsonScanner {
    fn has_any_dependency(&self, project_root: &Path, deps: &[&str]) -> bool {
        let Some(manifest) = Self::read_manifest(project_root) else {
            return false;
        };
        DEPENDENCY_SECTIONS
            .iter()
            .filter_map(|section| manifest.get(section).and_then(Value::as_object))
            .any(|declared| deps.iter().any(|dep| declared.contains_key(*dep)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
