//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/fieldtree/fieldtree.toml`
//! 3. Local config: `<project_dir>/.fieldtree.toml`
//! 4. Environment variables: `FIELDTREE_*` prefix

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;

/// Schema handling options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SchemaConfig {
    /// Appended to `name` of duplicated nodes
    pub name_copy_suffix: String,
    /// Appended to `fieldLabel` of duplicated nodes
    pub label_copy_suffix: String,
    /// Session-only keys stripped from loaded and edited entries
    pub transient_keys: Vec<String>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            name_copy_suffix: "_copy".into(),
            label_copy_suffix: " Copy".into(),
            transient_keys: ["id", "parentId", "children", "expanded", "isExpanded", "animation"]
                .map(String::from)
                .to_vec(),
        }
    }
}

/// Raw schema config for intermediate parsing (arrays are Option to detect "not specified").
///
/// Used during layered config merging to distinguish between:
/// - `None` → field not specified, inherit from base
/// - `Some([])` → explicit empty array
/// - `Some([...])` → explicit values to merge
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSchemaConfig {
    pub name_copy_suffix: Option<String>,
    pub label_copy_suffix: Option<String>,
    pub transient_keys: Option<Vec<String>>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub data_dir: Option<PathBuf>,
    pub templates_file: Option<PathBuf>,
    pub editor: Option<String>,
    pub reorder_delay_ms: Option<u64>,
    #[serde(default)]
    pub schema: RawSchemaConfig,
}

impl SchemaConfig {
    /// Merge arrays with union semantics and negation support.
    ///
    /// - Items from overlay are added to base
    /// - Items prefixed with `!` remove the corresponding item from the result
    /// - Duplicates are de-duplicated
    ///
    /// # Examples
    /// ```ignore
    /// merge_array(&["a", "b"], &["c"])       // → ["a", "b", "c"]
    /// merge_array(&["a", "b"], &["!a", "c"]) // → ["b", "c"]
    /// ```
    pub fn merge_array(base: &[String], overlay: &[String]) -> Vec<String> {
        let mut result: HashSet<String> = base.iter().cloned().collect();

        for key in overlay {
            if let Some(negated) = key.strip_prefix('!') {
                result.remove(negated);
            } else {
                result.insert(key.clone());
            }
        }

        // Convert to sorted Vec for deterministic output
        let mut vec: Vec<String> = result.into_iter().collect();
        vec.sort();
        vec
    }

    /// Merge overlay config onto self (base).
    ///
    /// - Scalar options: overlay wins if Some, otherwise keep base
    /// - Arrays: union merge with negation support (if overlay specified)
    pub fn merge(&self, overlay: &RawSchemaConfig) -> Self {
        Self {
            name_copy_suffix: overlay
                .name_copy_suffix
                .clone()
                .unwrap_or_else(|| self.name_copy_suffix.clone()),
            label_copy_suffix: overlay
                .label_copy_suffix
                .clone()
                .unwrap_or_else(|| self.label_copy_suffix.clone()),
            transient_keys: overlay
                .transient_keys
                .as_ref()
                .map(|o| Self::merge_array(&self.transient_keys, o))
                .unwrap_or_else(|| self.transient_keys.clone()),
        }
    }

    /// Apply global config onto defaults.
    ///
    /// Unlike `merge()` which uses union semantics for arrays, a global array
    /// completely replaces the default one.
    pub fn apply_global(&self, global: &RawSchemaConfig) -> Self {
        Self {
            name_copy_suffix: global
                .name_copy_suffix
                .clone()
                .unwrap_or_else(|| self.name_copy_suffix.clone()),
            label_copy_suffix: global
                .label_copy_suffix
                .clone()
                .unwrap_or_else(|| self.label_copy_suffix.clone()),
            transient_keys: global
                .transient_keys
                .clone()
                .unwrap_or_else(|| self.transient_keys.clone()),
        }
    }
}

/// Unified configuration for fieldtree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Directory holding `<context>.json` schemas (default: ~/.fieldtree)
    pub data_dir: PathBuf,
    /// Extra field-type templates (TOML or JSON) merged over the built-ins
    pub templates_file: Option<PathBuf>,
    /// Editor command for `edit` (default: $VISUAL, $EDITOR, vim)
    pub editor: Option<String>,
    /// Delay before a deferred reorder is committed
    pub reorder_delay_ms: u64,
    pub schema: SchemaConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            templates_file: None,
            editor: None,
            reorder_delay_ms: 300,
            schema: SchemaConfig::default(),
        }
    }
}

/// Get the default data directory (~/.fieldtree).
fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".fieldtree"))
        .unwrap_or_else(|| PathBuf::from("~/.fieldtree"))
}

/// Get the XDG config directory for fieldtree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "fieldtree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("fieldtree.toml"))
}

/// Get the path to the local config file in a project directory.
pub fn local_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(".fieldtree.toml")
}

/// Expand `~`, `$VAR` and `${VAR}`; unknown variables leave the input unchanged.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        let expanded = expand_env_vars(self.data_dir.to_string_lossy().as_ref());
        self.data_dir = PathBuf::from(expanded);

        if let Some(file) = &self.templates_file {
            self.templates_file = Some(PathBuf::from(expand_env_vars(
                file.to_string_lossy().as_ref(),
            )));
        }
        if let Some(editor) = &self.editor {
            self.editor = Some(expand_env_vars(editor));
        }
    }

    /// Merge overlay config onto self (base) with union semantics for arrays.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            data_dir: overlay
                .data_dir
                .clone()
                .unwrap_or_else(|| self.data_dir.clone()),
            templates_file: overlay
                .templates_file
                .clone()
                .or_else(|| self.templates_file.clone()),
            editor: overlay.editor.clone().or_else(|| self.editor.clone()),
            reorder_delay_ms: overlay.reorder_delay_ms.unwrap_or(self.reorder_delay_ms),
            schema: self.schema.merge(&overlay.schema),
        }
    }

    /// Apply global config onto defaults with REPLACE semantics for arrays.
    fn apply_global(&self, global: &RawSettings) -> Self {
        Self {
            data_dir: global
                .data_dir
                .clone()
                .unwrap_or_else(|| self.data_dir.clone()),
            templates_file: global
                .templates_file
                .clone()
                .or_else(|| self.templates_file.clone()),
            editor: global.editor.clone().or_else(|| self.editor.clone()),
            reorder_delay_ms: global.reorder_delay_ms.unwrap_or(self.reorder_delay_ms),
            schema: self.schema.apply_global(&global.schema),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. Global config: `$XDG_CONFIG_HOME/fieldtree/fieldtree.toml` (arrays REPLACE defaults)
    /// 3. Local config: `<project_dir>/.fieldtree.toml` (arrays UNION with global, `!key` removes)
    /// 4. Environment variables: `FIELDTREE_*` prefix (REPLACES)
    pub fn load(project_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let global = global_config_path().filter(|p| p.exists());
        Self::load_from(global.as_deref(), project_dir)
    }

    /// Same as [`load`](Self::load) with an explicit global config file.
    pub fn load_from(
        global_path: Option<&Path>,
        project_dir: Option<&Path>,
    ) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(path) = global_path {
            let raw = load_raw_settings(path)?;
            current = current.apply_global(&raw);
        }

        if let Some(project) = project_dir {
            let local_path = local_config_path(project);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply FIELDTREE_* environment variables as explicit overrides.
    ///
    /// Nested keys use `__`: `FIELDTREE_SCHEMA__TRANSIENT_KEYS=id,expanded`.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let builder = Config::builder().add_source(
            Environment::with_prefix("FIELDTREE")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("schema.transient_keys"),
        );

        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get_string("data_dir") {
            settings.data_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("templates_file") {
            settings.templates_file = Some(PathBuf::from(val));
        }
        if let Ok(val) = config.get_string("editor") {
            settings.editor = Some(val);
        }
        if let Ok(val) = config.get_int("reorder_delay_ms") {
            settings.reorder_delay_ms = u64::try_from(val).unwrap_or(settings.reorder_delay_ms);
        }
        if let Ok(val) = config.get_string("schema.name_copy_suffix") {
            settings.schema.name_copy_suffix = val;
        }
        if let Ok(val) = config.get_string("schema.label_copy_suffix") {
            settings.schema.label_copy_suffix = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("schema.transient_keys") {
            settings.schema.transient_keys = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# fieldtree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/fieldtree/fieldtree.toml  (defines your baseline)
#   Local:  <project_dir>/.fieldtree.toml       (project-specific additions)
#   Env:    FIELDTREE_* environment variables  (explicit overrides)
#
# Array Merge Semantics:
#   Global config REPLACES compiled defaults.
#   Local config UNIONS with global.
#   Use "!key" in local config to REMOVE an inherited item:
#     transient_keys = ["collapsed", "!expanded"]

# Directory holding <context>.json schemas
# data_dir = "~/.fieldtree"

# Extra field-type templates (TOML [[template]] tables or a JSON array)
# templates_file = "~/.config/fieldtree/templates.toml"

# Editor for `fieldtree edit` (default: $VISUAL, $EDITOR, vim)
# editor = "vim"

# Delay in milliseconds before a deferred reorder is committed
# reorder_delay_ms = 300

[schema]
# Suffixes for duplicated nodes
# name_copy_suffix = "_copy"
# label_copy_suffix = " Copy"

# Session-only keys never stored on nodes
# transient_keys = ["id", "parentId", "children", "expanded", "isExpanded", "animation"]
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
