use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const BUILTIN_CATALOG: &str = include_str!("../../config/modules.toml");

/// One page of a wizard as declared in the module catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub required: bool,
    pub order: i32,
}

impl StepDefinition {
    pub fn new(id: impl Into<String>, title: impl Into<String>, order: i32) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            enabled: true,
            required: false,
            order,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

fn default_enabled() -> bool {
    true
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowDefinition {
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusConfig {
    pub label: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDefinition {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub flows: BTreeMap<String, FlowDefinition>,
    #[serde(default)]
    pub statuses: BTreeMap<String, StatusConfig>,
    #[serde(default)]
    pub states: BTreeMap<String, String>,
}

/// Static module configuration. Loaded once at start-up and shared read-only.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleCatalog {
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleDefinition>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read module catalog `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse module catalog: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid module catalog: {0}")]
    Invalid(String),
}

impl ModuleCatalog {
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| CatalogError::ReadFile { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, CatalogError> {
        let catalog = toml::from_str::<Self>(raw)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn with_module(mut self, name: impl Into<String>, module: ModuleDefinition) -> Self {
        self.modules.insert(name.into(), module);
        self
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        for (module_name, module) in &self.modules {
            if module_name.trim().is_empty() {
                return Err(CatalogError::Invalid("module names must not be blank".to_string()));
            }
            if module.statuses.keys().any(|key| key.trim().is_empty()) {
                return Err(CatalogError::Invalid(format!(
                    "module `{module_name}` declares a blank status key"
                )));
            }
            if module.states.keys().any(|key| key.trim().is_empty()) {
                return Err(CatalogError::Invalid(format!(
                    "module `{module_name}` declares a blank state key"
                )));
            }

            for (flow_type, flow) in &module.flows {
                if flow_type.trim().is_empty() {
                    return Err(CatalogError::Invalid(format!(
                        "module `{module_name}` declares a blank flow type"
                    )));
                }

                let mut seen = HashSet::new();
                for step in &flow.steps {
                    if step.id.trim().is_empty() {
                        return Err(CatalogError::Invalid(format!(
                            "flow `{module_name}/{flow_type}` declares a step with a blank id"
                        )));
                    }
                    if !seen.insert(step.id.as_str()) {
                        return Err(CatalogError::Invalid(format!(
                            "flow `{module_name}/{flow_type}` declares step `{}` more than once",
                            step.id
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

impl ModuleDefinition {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into(), ..Self::default() }
    }

    pub fn with_flow(mut self, flow_type: impl Into<String>, steps: Vec<StepDefinition>) -> Self {
        self.flows.insert(flow_type.into(), FlowDefinition { steps });
        self
    }

    pub fn with_status(mut self, key: impl Into<String>, status: StatusConfig) -> Self {
        self.statuses.insert(key.into(), status);
        self
    }

    pub fn with_state(mut self, key: impl Into<String>, description: impl Into<String>) -> Self {
        self.states.insert(key.into(), description.into());
        self
    }
}

impl StatusConfig {
    pub fn labelled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            color: String::new(),
            icon: String::new(),
            description: String::new(),
        }
    }
}
