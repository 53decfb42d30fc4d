//! # MegaMol Protocol
//!
//! Serializable types shared by the graph engine and its front ends:
//!
//! - **Catalog** - module and call class descriptions (the "stock")
//! - **Project** - the persisted structural description of one graph
//! - **Edits** - structural commands addressed by instance names
//! - **Envelopes** - machine-readable error reports

use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

mod catalog;
mod edit;
mod project;

pub use catalog::{
    CallDescription, CatalogDocument, ModuleDescription, ParameterDescription, SlotDescription,
    SlotKind,
};
pub use edit::{EditBatch, EditCommand};
pub use project::{
    slot_path, CallEntry, GroupEntry, ModuleEntry, ProjectDocument, SlotPath,
    PROJECT_SCHEMA_VERSION, SLOT_PATH_SEPARATOR,
};

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
    pub hint: Option<String>,
}

/// Which document a JSON schema is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Project,
    Catalog,
    Edits,
}

pub fn json_schema(kind: SchemaKind) -> Result<serde_json::Value> {
    let schema = match kind {
        SchemaKind::Project => schemars::schema_for!(ProjectDocument),
        SchemaKind::Catalog => schemars::schema_for!(CatalogDocument),
        SchemaKind::Edits => schemars::schema_for!(EditBatch),
    };
    serde_json::to_value(schema).map_err(Into::into)
}

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Into::into)
}

pub fn serialize_json_pretty<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}
