//! In-memory collaborators for unit tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use datactx_core::{ApiError, ApiResult};
use parking_lot::Mutex;

use crate::apis::{DependencyScanner, ExternalApis, FileApi, ProjectApi, StorybookApi};
use crate::types::{
    FindSpecsOptions, FullConfig, ProjectConfig, ProjectPreferences, SettingsOptions, SpecFile,
    SpecType,
};

#[derive(Default)]
pub(crate) struct FakeApis {
    pub configs: Mutex<HashMap<String, FullConfig>>,
    pub project_configs: Mutex<HashMap<String, ProjectConfig>>,
    pub specs: Mutex<Vec<SpecFile>>,
    pub preferences: Mutex<HashMap<String, ProjectPreferences>>,
    pub files: Mutex<Vec<String>>,
    pub stories: Mutex<Vec<SpecFile>>,
    pub deps: Mutex<Vec<String>>,
    pub get_config_calls: Mutex<Vec<String>>,
    pub find_specs_calls: Mutex<Vec<FindSpecsOptions>>,
    pub glob_calls: Mutex<Vec<String>>,
}

impl FakeApis {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn external(self: &Arc<Self>) -> ExternalApis {
        ExternalApis::new(self.clone(), self.clone(), self.clone())
            .with_dependency_scanner(self.clone())
    }

    pub fn with_config(self: &Arc<Self>, config: FullConfig) -> Arc<Self> {
        let _ = self.configs.lock().insert(config.project_root.clone(), config);
        self.clone()
    }
}

pub(crate) fn spec(absolute: &str, spec_type: SpecType) -> SpecFile {
    let name = absolute.rsplit('/').next().unwrap_or(absolute).to_string();
    SpecFile {
        name: name.clone(),
        relative: format!("cypress/{name}"),
        absolute: absolute.to_string(),
        spec_type,
    }
}

#[async_trait]
impl ProjectApi for FakeApis {
    async fn get_config(
        &self,
        project_root: &str,
        _options: &SettingsOptions,
    ) -> ApiResult<FullConfig> {
        self.get_config_calls.lock().push(project_root.to_string());
        self.configs
            .lock()
            .get(project_root)
            .cloned()
            .ok_or_else(|| ApiError::new("get_config", format!("no config for {project_root}")))
    }

    async fn get_project_config(&self, project_root: &str) -> ApiResult<Option<ProjectConfig>> {
        Ok(self.project_configs.lock().get(project_root).cloned())
    }

    async fn find_specs(&self, options: &FindSpecsOptions) -> ApiResult<Vec<SpecFile>> {
        self.find_specs_calls.lock().push(options.clone());
        Ok(self.specs.lock().clone())
    }

    async fn get_project_preferences_from_cache(
        &self,
    ) -> ApiResult<HashMap<String, ProjectPreferences>> {
        Ok(self.preferences.lock().clone())
    }
}

#[async_trait]
impl FileApi for FakeApis {
    async fn get_files_by_glob(&self, glob: &str) -> ApiResult<Vec<String>> {
        self.glob_calls.lock().push(glob.to_string());
        Ok(self.files.lock().clone())
    }

    fn normalize_file_to_spec(
        &self,
        file: &str,
        project_root: &str,
        component_folder: &str,
    ) -> SpecFile {
        let relative = file
            .strip_prefix(project_root)
            .unwrap_or(file)
            .trim_start_matches('/')
            .to_string();
        SpecFile {
            name: relative.rsplit('/').next().unwrap_or(&relative).to_string(),
            relative: format!("{component_folder}|{relative}"),
            absolute: file.to_string(),
            spec_type: SpecType::Component,
        }
    }
}

#[async_trait]
impl StorybookApi for FakeApis {
    async fn get_stories(&self) -> ApiResult<Vec<SpecFile>> {
        Ok(self.stories.lock().clone())
    }
}

impl DependencyScanner for FakeApis {
    fn has_any_dependency(&self, _project_root: &Path, deps: &[&str]) -> bool {
        let installed = self.deps.lock();
        deps.iter().any(|dep| installed.iter().any(|have| have == dep))
    }
}
