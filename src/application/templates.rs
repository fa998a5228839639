//! Field-type templates: labels, default properties and required flags.
//!
//! Built-in templates are compiled in as TOML. A user file (TOML with
//! `[[template]]` tables, or a JSON array) can add types or replace built-ins.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::node::{bucket_key, ADVANCED_KEY, LABEL_KEY, NAME_KEY};
use crate::domain::{FieldKind, RequiredProperties};
use crate::infrastructure::traits::FileSystem;

/// Where a property lives on the node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyScope {
    /// Top-level key of the entry
    #[default]
    Field,
    /// Inside the `<fieldType>_settings` bucket
    Settings,
    /// Inside `advanced_options`
    Advanced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDef {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub default: Value,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub scope: PropertyScope,
}

impl PropertyDef {
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldTemplate {
    #[serde(rename = "fieldType", alias = "field_type")]
    pub field_type: String,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "property", alias = "properties")]
    pub properties: Vec<PropertyDef>,
}

impl FieldTemplate {
    pub fn kind(&self) -> FieldKind {
        FieldKind::of(&self.field_type)
    }

    /// Initial property map for a new node of this type.
    ///
    /// Name and label are not included; they are numbered per tree.
    pub fn defaults(&self) -> Map<String, Value> {
        let mut map = Map::new();
        let settings = self.scoped(PropertyScope::Settings);
        let advanced = self.scoped(PropertyScope::Advanced);
        for prop in self
            .properties
            .iter()
            .filter(|p| p.scope == PropertyScope::Field)
            .filter(|p| p.name != NAME_KEY && p.name != LABEL_KEY)
        {
            map.insert(prop.name.clone(), prop.default.clone());
        }
        if !settings.is_empty() {
            map.insert(bucket_key(&self.field_type), Value::Object(settings));
        }
        if !advanced.is_empty() {
            map.insert(ADVANCED_KEY.into(), Value::Object(advanced));
        }
        map
    }

    /// Default contents of this type's settings bucket.
    pub fn settings_defaults(&self) -> Map<String, Value> {
        self.scoped(PropertyScope::Settings)
    }

    fn scoped(&self, scope: PropertyScope) -> Map<String, Value> {
        self.properties
            .iter()
            .filter(|p| p.scope == scope)
            .map(|p| (p.name.clone(), p.default.clone()))
            .collect()
    }
}

/// On-disk template file: `[[template]]` tables in TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateFile {
    #[serde(default, rename = "template")]
    pub templates: Vec<FieldTemplate>,
}

/// Field-type metadata needed by the editor.
pub trait FieldTypeCatalog: Send + Sync {
    fn template(&self, field_type: &str) -> Option<&FieldTemplate>;

    /// All known templates, in display order.
    fn templates(&self) -> &[FieldTemplate];

    /// Property name → label for every property any template marks required.
    fn required_properties(&self) -> RequiredProperties {
        let mut required = RequiredProperties::new();
        for prop in self
            .templates()
            .iter()
            .flat_map(|t| t.properties.iter())
            .filter(|p| p.required)
        {
            required
                .entry(prop.name.clone())
                .or_insert_with(|| prop.display_label().to_string());
        }
        required
    }
}

/// Ordered template catalog.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: Vec<FieldTemplate>,
}

impl TemplateRegistry {
    pub fn new(templates: Vec<FieldTemplate>) -> Self {
        let mut registry = Self::default();
        registry.merge(templates);
        registry
    }

    /// The compiled-in catalog.
    pub fn builtin() -> ApplicationResult<Self> {
        let file: TemplateFile =
            toml::from_str(BUILTIN_TEMPLATES).map_err(|e| ApplicationError::Template {
                message: format!("built-in templates: {e}"),
            })?;
        Ok(Self::new(file.templates))
    }

    /// Built-ins, overlaid with `path` if given.
    pub fn load(fs: &dyn FileSystem, path: Option<&Path>) -> ApplicationResult<Self> {
        let mut registry = Self::builtin()?;
        if let Some(path) = path {
            let templates = Self::read_file(fs, path)?;
            debug!(
                "templates: merging {} from {}",
                templates.len(),
                path.display()
            );
            registry.merge(templates);
        }
        Ok(registry)
    }

    fn read_file(fs: &dyn FileSystem, path: &Path) -> ApplicationResult<Vec<FieldTemplate>> {
        let content = fs
            .read_to_string(path)
            .with_path_context("read templates", path)?;
        let is_json = path.extension().is_some_and(|ext| ext == "json");
        let parsed = if is_json {
            serde_json::from_str::<Vec<FieldTemplate>>(&content).map_err(|e| e.to_string())
        } else {
            toml::from_str::<TemplateFile>(&content)
                .map(|f| f.templates)
                .map_err(|e| e.to_string())
        };
        parsed.map_err(|message| ApplicationError::Template {
            message: format!("parse {}: {}", path.display(), message),
        })
    }

    /// Add templates; one with a known field type replaces the existing one in place.
    pub fn merge(&mut self, templates: Vec<FieldTemplate>) {
        for template in templates {
            match self
                .templates
                .iter_mut()
                .find(|t| t.field_type == template.field_type)
            {
                Some(existing) => *existing = template,
                None => self.templates.push(template),
            }
        }
    }
}

impl FieldTypeCatalog for TemplateRegistry {
    fn template(&self, field_type: &str) -> Option<&FieldTemplate> {
        self.templates.iter().find(|t| t.field_type == field_type)
    }

    fn templates(&self) -> &[FieldTemplate] {
        &self.templates
    }
}

const BUILTIN_TEMPLATES: &str = r#"
[[template]]
fieldType = "section"
label = "Section"
description = "Top-level grouping of fields"
property = [
    { name = "fieldLabel", label = "Label", required = true },
    { name = "description", label = "Description", default = "" },
]

[[template]]
fieldType = "meta_box"
label = "Meta Box"
description = "Top-level panel attached to an edit screen"
property = [
    { name = "fieldLabel", label = "Label", required = true },
    { name = "context", label = "Context", default = "normal", scope = "settings" },
    { name = "priority", label = "Priority", default = "default", scope = "settings" },
]

[[template]]
fieldType = "group"
label = "Group"
description = "Nested set of fields stored together"
property = [
    { name = "name", label = "Name", required = true },
    { name = "layout", label = "Layout", default = "block", scope = "settings" },
]

[[template]]
fieldType = "repeater"
label = "Repeater"
description = "Repeatable set of fields"
property = [
    { name = "name", label = "Name", required = true },
    { name = "min_rows", label = "Minimum rows", default = 0, scope = "settings" },
    { name = "max_rows", label = "Maximum rows", default = 0, scope = "settings" },
    { name = "button_label", label = "Button label", default = "Add row", scope = "settings" },
]

[[template]]
fieldType = "text"
label = "Text"
property = [
    { name = "name", label = "Name", required = true },
    { name = "placeholder", label = "Placeholder", default = "" },
    { name = "default_value", label = "Default value", default = "" },
    { name = "max_length", label = "Maximum length", default = 0, scope = "settings" },
    { name = "css_class", label = "CSS class", default = "", scope = "advanced" },
]

[[template]]
fieldType = "textarea"
label = "Textarea"
property = [
    { name = "name", label = "Name", required = true },
    { name = "placeholder", label = "Placeholder", default = "" },
    { name = "rows", label = "Rows", default = 4, scope = "settings" },
]

[[template]]
fieldType = "number"
label = "Number"
property = [
    { name = "name", label = "Name", required = true },
    { name = "min", label = "Minimum", default = "", scope = "settings" },
    { name = "max", label = "Maximum", default = "", scope = "settings" },
    { name = "step", label = "Step", default = 1, scope = "settings" },
]

[[template]]
fieldType = "email"
label = "Email"
property = [
    { name = "name", label = "Name", required = true },
    { name = "placeholder", label = "Placeholder", default = "" },
]

[[template]]
fieldType = "url"
label = "URL"
property = [
    { name = "name", label = "Name", required = true },
    { name = "placeholder", label = "Placeholder", default = "https://" },
]

[[template]]
fieldType = "select"
label = "Select"
property = [
    { name = "name", label = "Name", required = true },
    { name = "options", label = "Options", default = [] },
    { name = "multiple", label = "Allow multiple", default = false, scope = "settings" },
]

[[template]]
fieldType = "checkbox"
label = "Checkbox"
property = [
    { name = "name", label = "Name", required = true },
    { name = "options", label = "Options", default = [] },
]

[[template]]
fieldType = "radio"
label = "Radio"
property = [
    { name = "name", label = "Name", required = true },
    { name = "options", label = "Options", default = [] },
    { name = "layout", label = "Layout", default = "vertical", scope = "settings" },
]

[[template]]
fieldType = "toggle"
label = "Toggle"
property = [
    { name = "name", label = "Name", required = true },
    { name = "default_value", label = "Default value", default = false },
]

[[template]]
fieldType = "date"
label = "Date"
property = [
    { name = "name", label = "Name", required = true },
    { name = "format", label = "Display format", default = "Y-m-d", scope = "settings" },
]

[[template]]
fieldType = "image"
label = "Image"
property = [
    { name = "name", label = "Name", required = true },
    { name = "return_format", label = "Return format", default = "url", scope = "settings" },
    { name = "preview_size", label = "Preview size", default = "thumbnail", scope = "settings" },
]
"#;
