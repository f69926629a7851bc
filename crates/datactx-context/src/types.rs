//! Domain types exchanged with external collaborators.
//!
//! Field names follow the camelCase JSON the front-end and the config
//! sandbox speak.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─────────────────────────────────────────────────────────────────────────────
// Testing and spec kinds
// ─────────────────────────────────────────────────────────────────────────────

/// Which kind of testing a project is set up for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestingType {
    /// End-to-end tests.
    E2e,
    /// Component tests.
    Component,
}

/// Kind of a spec file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecType {
    /// Spec under the integration folder.
    Integration,
    /// Component spec.
    Component,
}

/// What a code generator produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeGenType {
    /// A component spec.
    Component,
    /// A spec generated from a storybook story.
    Story,
}

// ─────────────────────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────────────────────

/// Options passed to the config sandbox when evaluating a project's config.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsOptions {
    /// Explicit config file name, overriding discovery.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<String>,
}

/// Fully resolved configuration for one project.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FullConfig {
    /// Absolute project root.
    pub project_root: String,
    /// Dashboard project id.
    pub project_id: Option<String>,
    /// Fixtures folder, `None` when disabled.
    pub fixtures_folder: Option<String>,
    /// Support file, `None` when disabled.
    pub support_file: Option<String>,
    /// Spec globs.
    pub test_files: Vec<String>,
    /// Globs excluded from the spec list.
    pub ignore_test_files: Vec<String>,
    /// Integration spec folder.
    pub integration_folder: Option<String>,
    /// Component spec folder.
    pub component_folder: Option<String>,
    /// Per-field resolution record. Every entry is `{value, from}` except
    /// `env`, which maps variable names to `{value, from}`.
    pub resolved: BTreeMap<String, Value>,
}

/// Where a resolved config value came from, with the value itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedFromConfig {
    /// The value.
    pub value: Value,
    /// Source (`default`, `config`, `env`, `cli`, `plugin`, ...).
    pub from: String,
}

/// One row of the resolved config view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedConfigField {
    /// Config field name.
    pub field: String,
    /// Resolved value. For `env`, an object of variable name to value.
    pub value: Value,
    /// Source of the value.
    pub from: String,
}

/// Lightweight project metadata read without evaluating the full config.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectConfig {
    /// Dashboard project id.
    pub project_id: Option<String>,
    /// Whether e2e testing is set up.
    #[serde(rename = "isE2EConfigured")]
    pub is_e2e_configured: bool,
    /// Whether component testing is set up.
    #[serde(rename = "isCTConfigured")]
    pub is_ct_configured: bool,
}

/// Saved per-project preferences.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectPreferences {
    /// Last chosen testing type.
    pub testing_type: Option<TestingType>,
    /// Last chosen browser path.
    pub browser_path: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Specs
// ─────────────────────────────────────────────────────────────────────────────

/// Arguments for the spec scan.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindSpecsOptions {
    /// Absolute project root.
    pub project_root: String,
    /// Fixtures folder, `None` when disabled.
    pub fixtures_folder: Option<String>,
    /// Support file, `None` when disabled.
    pub support_file: Option<String>,
    /// Spec globs.
    pub test_files: Vec<String>,
    /// Globs excluded from the spec list.
    pub ignore_test_files: Vec<String>,
    /// Component folder, `None` when disabled.
    pub component_folder: Option<String>,
    /// Integration folder, empty when unset.
    pub integration_folder: String,
}

/// A spec file found in a project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecFile {
    /// File name without directories.
    pub name: String,
    /// Path relative to the project root.
    pub relative: String,
    /// Absolute path.
    pub absolute: String,
    /// Spec kind.
    pub spec_type: SpecType,
}

/// The project the launchpad currently has open.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveProject {
    /// Absolute project root.
    pub project_root: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Frontend frameworks
// ─────────────────────────────────────────────────────────────────────────────

/// A frontend framework detectable from a project's dependencies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrontendFramework {
    /// Identifier.
    pub kind: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Packages whose presence identifies the framework.
    pub deps: &'static [&'static str],
    /// Glob matching the framework's component files.
    pub glob: &'static str,
}

/// Known frameworks, most specific first.
pub const FRONTEND_FRAMEWORKS: &[FrontendFramework] = &[
    FrontendFramework {
        kind: "cra",
        name: "Create React App",
        deps: &["react-scripts"],
        glob: "*.{jsx,tsx}",
    },
    FrontendFramework {
        kind: "vuecli",
        name: "Vue CLI",
        deps: &["@vue/cli-service"],
        glob: "*.vue",
    },
    FrontendFramework {
        kind: "react",
        name: "React.js",
        deps: &["react"],
        glob: "*.{jsx,tsx}",
    },
    FrontendFramework {
        kind: "vue",
        name: "Vue.js",
        deps: &["vue"],
        glob: "*.vue",
    },
    FrontendFramework {
        kind: "nextjs",
        name: "Next.js",
        deps: &["next"],
        glob: "*.{jsx,tsx}",
    },
    FrontendFramework {
        kind: "nuxtjs",
        name: "Nuxt.js",
        deps: &["nuxt"],
        glob: "*.vue",
    },
];

/// Glob matching storybook stories.
pub const STORYBOOK_GLOB: &str = "/**/*.stories.*";

/// Fallback glob when no framework is detected.
pub const LOOSE_COMPONENT_GLOB: &str = "/**/*.{js,jsx,ts,tsx,vue}";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_config_wire_names() {
        let config: ProjectConfig = serde_json::from_str(
            r#"{"projectId": "abc123", "isE2EConfigured": true, "isCTConfigured": false}"#,
        )
        .unwrap();
        assert_eq!(config.project_id.as_deref(), Some("abc123"));
        assert!(config.is_e2e_configured);
        assert!(!config.is_ct_configured);
    }

    #[test]
    fn full_config_accepts_partial_json() {
        let config: FullConfig =
            serde_json::from_str(r#"{"projectRoot": "/proj/a", "testFiles": ["**/*.cy.js"]}"#)
                .unwrap();
        assert_eq!(config.project_root, "/proj/a");
        assert_eq!(config.test_files, vec!["**/*.cy.js"]);
        assert!(config.fixtures_folder.is_none());
        assert!(config.resolved.is_empty());
    }

    #[test]
    fn spec_type_serializes_lowercase() {
        assert_eq!(serde_json::to_value(SpecType::Component).unwrap(), "component");
        assert_eq!(serde_json::to_value(TestingType::E2e).unwrap(), "e2e");
    }

    #[test]
    fn framework_table_is_consistent() {
        assert!(FRONTEND_FRAMEWORKS.iter().all(|f| !f.deps.is_empty()));
        let react = FRONTEND_FRAMEWORKS.iter().find(|f| f.kind == "react").unwrap();
        assert_eq!(react.glob, "*.{jsx,tsx}");
    }
}
