//! Project reads: config, specs, preferences, and code generation globs.
//!
//! Config evaluation is the expensive read here (it executes the project's
//! config file), so it goes through the [`PROJECT_CONFIG`] loader: concurrent
//! requests for the same root share one evaluation and the result stays
//! cached until [`ProjectDataSource::invalidate_config`] or a context-wide
//! clear.

use std::path::Path;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use datactx_loader::{BatchLoader, LoaderKind, batch_fn, positional};
use futures::future::try_join_all;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::context::DataContext;
use crate::errors::{ContextError, Result};
use crate::types::{
    CodeGenType, FRONTEND_FRAMEWORKS, FindSpecsOptions, FullConfig, LOOSE_COMPONENT_GLOB,
    ProjectPreferences, ResolvedConfigField, ResolvedFromConfig, STORYBOOK_GLOB, SettingsOptions,
    SpecFile, SpecType, TestingType,
};

/// Loader kind for evaluated project configs, keyed by project root.
pub const PROJECT_CONFIG: LoaderKind = LoaderKind::new("project-config");

/// Relay node type prefix of spec ids.
const SPEC_ID_PREFIX: &str = "Spec";

/// Project reads over a borrowed [`DataContext`].
#[derive(Clone, Copy, Debug)]
pub struct ProjectDataSource<'a> {
    ctx: &'a DataContext,
}

impl<'a> ProjectDataSource<'a> {
    /// View `ctx` as a project data source.
    pub fn new(ctx: &'a DataContext) -> Self {
        Self { ctx }
    }

    // ── metadata ────────────────────────────────────────────────────────────

    /// Dashboard project id, when the project declares one.
    pub async fn project_id(&self, project_root: &str) -> Result<Option<String>> {
        let config = self.ctx.apis().project_api.get_project_config(project_root).await?;
        Ok(config.and_then(|c| c.project_id))
    }

    /// Display title: the last component of the project root.
    pub fn project_title(&self, project_root: &str) -> String {
        Path::new(project_root)
            .file_name()
            .map_or_else(String::new, |name| name.to_string_lossy().into_owned())
    }

    /// Whether `testing_type` is set up. Projects without a config count as
    /// configured for both.
    pub async fn is_testing_type_configured(
        &self,
        project_root: &str,
        testing_type: TestingType,
    ) -> Result<bool> {
        let project_api = &self.ctx.apis().project_api;
        let Some(config) = project_api.get_project_config(project_root).await? else {
            return Ok(true);
        };
        Ok(match testing_type {
            TestingType::E2e => config.is_e2e_configured,
            TestingType::Component => config.is_ct_configured,
        })
    }

    /// Saved preferences for the project titled `project_title`.
    pub async fn get_project_preferences(
        &self,
        project_title: &str,
    ) -> Result<Option<ProjectPreferences>> {
        let project_api = &self.ctx.apis().project_api;
        let mut preferences = project_api.get_project_preferences_from_cache().await?;
        Ok(preferences.remove(project_title))
    }

    // ── config ──────────────────────────────────────────────────────────────

    /// The evaluated config for `project_root`, coalesced and cached per root.
    pub async fn get_config(&self, project_root: &str) -> Result<FullConfig> {
        let loader = self.config_loader()?;
        Ok(loader.load(project_root.to_string()).await?)
    }

    /// Drop the cached config for `project_root`, e.g. after its config file
    /// changed on disk. The next read evaluates it again.
    pub fn invalidate_config(&self, project_root: &str) -> Result<()> {
        if let Some(loader) = self.ctx.existing_loader::<String, FullConfig>(PROJECT_CONFIG)? {
            loader.clear(&project_root.to_string());
        }
        Ok(())
    }

    fn config_loader(&self) -> Result<BatchLoader<String, FullConfig>> {
        let api = Arc::clone(&self.ctx.apis().project_api);
        self.ctx.loader(
            PROJECT_CONFIG,
            batch_fn(move |roots: Vec<String>| {
                let api = Arc::clone(&api);
                async move {
                    debug!(roots = roots.len(), "evaluating project configs");
                    let options = SettingsOptions::default();
                    let configs =
                        try_join_all(roots.iter().map(|root| api.get_config(root, &options)))
                            .await?;
                    positional(roots, configs)
                }
            }),
        )
    }

    /// Resolved config as `{field, value, from}` rows.
    ///
    /// The `env` entry maps each variable to its own resolution record; it
    /// is collapsed into one row whose value maps variable names to values.
    pub async fn get_resolved_config_fields(
        &self,
        project_root: &str,
    ) -> Result<Vec<ResolvedConfigField>> {
        let config = self.get_config(project_root).await?;
        config
            .resolved
            .into_iter()
            .filter(|(field, value)| !(field == "env" && value.is_null()))
            .map(|(field, value)| {
                if field == "env" {
                    collapse_env(value)
                } else {
                    let resolved: ResolvedFromConfig =
                        serde_json::from_value(value).map_err(|e| {
                            ContextError::InvalidConfig(format!("resolved.{field}: {e}"))
                        })?;
                    Ok(ResolvedConfigField {
                        field,
                        value: resolved.value,
                        from: resolved.from,
                    })
                }
            })
            .collect()
    }

    // ── specs ───────────────────────────────────────────────────────────────

    /// Spec files of the project, optionally only those of `spec_type`.
    #[instrument(skip(self))]
    pub async fn find_specs(
        &self,
        project_root: &str,
        spec_type: Option<SpecType>,
    ) -> Result<Vec<SpecFile>> {
        let config = self.get_config(project_root).await?;
        let options = FindSpecsOptions {
            project_root: project_root.to_string(),
            fixtures_folder: config.fixtures_folder,
            support_file: config.support_file,
            test_files: config.test_files,
            ignore_test_files: config.ignore_test_files,
            // The configured component folder, not the project root.
            component_folder: config.component_folder,
            integration_folder: config.integration_folder.unwrap_or_default(),
        };
        let specs = self.ctx.apis().project_api.find_specs(&options).await?;
        debug!(found = specs.len(), "specs found");

        Ok(match spec_type {
            Some(wanted) => specs.into_iter().filter(|spec| spec.spec_type == wanted).collect(),
            None => specs,
        })
    }

    /// The spec identified by a Relay-style id, `base64("Spec:<absolute path>")`.
    ///
    /// `None` when no spec matches, malformed ids included.
    pub async fn get_current_spec_by_id(
        &self,
        project_root: &str,
        base64_id: &str,
    ) -> Result<Option<SpecFile>> {
        let Some(absolute) = decode_spec_id(base64_id) else {
            debug!(base64_id, "malformed spec id");
            return Ok(None);
        };
        let specs = self.find_specs(project_root, None).await?;
        Ok(specs.into_iter().find(|spec| spec.absolute == absolute))
    }

    // ── code generation ─────────────────────────────────────────────────────

    /// Component glob of the first known framework the project depends on.
    pub fn guess_glob(&self, project_root: &str) -> Option<&'static str> {
        let scanner = &self.ctx.apis().dependency_api;
        FRONTEND_FRAMEWORKS
            .iter()
            .find(|framework| scanner.has_any_dependency(Path::new(project_root), framework.deps))
            .map(|framework| framework.glob)
    }

    /// Glob of the files offered for code generation of `code_gen_type`.
    pub fn get_code_gen_glob(&self, code_gen_type: CodeGenType) -> Result<&'static str> {
        let project = self
            .ctx
            .active_project()
            .ok_or(ContextError::NoActiveProject { operation: "find glob" })?;

        if code_gen_type == CodeGenType::Story {
            return Ok(STORYBOOK_GLOB);
        }
        Ok(self.guess_glob(&project.project_root).unwrap_or(LOOSE_COMPONENT_GLOB))
    }

    /// Files matching `glob`, described as specs of the active project.
    ///
    /// The storybook glob lists every story regardless of the glob itself.
    pub async fn get_code_gen_candidates(&self, glob: &str) -> Result<Vec<SpecFile>> {
        let apis = self.ctx.apis();
        if glob == STORYBOOK_GLOB {
            return Ok(apis.storybook_api.get_stories().await?);
        }

        let project = self
            .ctx
            .active_project()
            .ok_or(ContextError::NoActiveProject {
                operation: "find components",
            })?;
        let config = self.get_config(&project.project_root).await?;
        // Relative to the configured component folder when there is one.
        let component_folder = config
            .component_folder
            .as_deref()
            .unwrap_or(&project.project_root);

        let files = apis.file_api.get_files_by_glob(glob).await?;
        Ok(files
            .iter()
            .map(|file| {
                apis.file_api
                    .normalize_file_to_spec(file, &project.project_root, component_folder)
            })
            .collect())
    }
}

fn collapse_env(value: Value) -> Result<ResolvedConfigField> {
    let Value::Object(vars) = value else {
        return Err(ContextError::InvalidConfig("resolved.env is not an object".into()));
    };
    let values: Map<String, Value> = vars
        .into_iter()
        .map(|(name, mut record)| {
            let value = record.get_mut("value").map(Value::take).unwrap_or(Value::Null);
            (name, value)
        })
        .collect();
    Ok(ResolvedConfigField {
        field: "env".into(),
        value: Value::Object(values),
        from: "env".into(),
    })
}

/// Absolute path carried by a spec id.
fn decode_spec_id(base64_id: &str) -> Option<String> {
    let decoded = String::from_utf8(STANDARD.decode(base64_id).ok()?).ok()?;
    match decoded.split_once(':') {
        Some((SPEC_ID_PREFIX, path)) => Some(path.to_string()),
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================
