use anyhow::{anyhow, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const PROJECT_SCHEMA_VERSION: u32 = 1;

/// Separator between a module instance name and one of its slot names.
pub const SLOT_PATH_SEPARATOR: &str = "::";

/// Structural description of one module graph.
///
/// Layout and other presentation state is not part of the document.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct ProjectDocument {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_view: Option<String>,
    #[serde(default)]
    pub modules: Vec<ModuleEntry>,
    #[serde(default)]
    pub calls: Vec<CallEntry>,
    #[serde(default)]
    pub groups: Vec<GroupEntry>,
}

impl Default for ProjectDocument {
    fn default() -> Self {
        Self {
            schema_version: PROJECT_SCHEMA_VERSION,
            name: String::new(),
            main_view: None,
            modules: Vec::new(),
            calls: Vec::new(),
            groups: Vec::new(),
        }
    }
}

fn default_schema_version() -> u32 {
    PROJECT_SCHEMA_VERSION
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct ModuleEntry {
    pub class_name: String,
    pub name: String,
    /// Parameter values that differ from the class defaults.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct CallEntry {
    pub class_name: String,
    /// `module::slot` of the caller end.
    pub caller: String,
    /// `module::slot` of the callee end.
    pub callee: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct GroupEntry {
    pub name: String,
    #[serde(default)]
    pub modules: Vec<String>,
}

/// A `module::slot` reference split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotPath<'a> {
    pub module: &'a str,
    pub slot: &'a str,
}

impl<'a> SlotPath<'a> {
    pub fn parse(raw: &'a str) -> Result<Self> {
        let (module, slot) = raw
            .rsplit_once(SLOT_PATH_SEPARATOR)
            .ok_or_else(|| anyhow!("slot path '{raw}' is not of the form module::slot"))?;
        if module.is_empty() || slot.is_empty() {
            return Err(anyhow!("slot path '{raw}' has an empty module or slot name"));
        }
        Ok(Self { module, slot })
    }
}

pub fn slot_path(module: &str, slot: &str) -> String {
    format!("{module}{SLOT_PATH_SEPARATOR}{slot}")
}
