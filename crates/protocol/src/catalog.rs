use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Direction of a call slot.
///
/// A caller initiates requests along a call, a callee serves them.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    Caller,
    Callee,
}

impl SlotKind {
    /// The kind a peer slot must have to be connected by a call.
    pub fn opposite(self) -> Self {
        match self {
            Self::Caller => Self::Callee,
            Self::Callee => Self::Caller,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Caller => "caller",
            Self::Callee => "callee",
        }
    }
}

impl std::fmt::Display for SlotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct SlotDescription {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub kind: SlotKind,
    /// Call class names this slot accepts, in preference order.
    #[serde(default)]
    pub compatible_calls: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct ParameterDescription {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Free-form type tag ("bool", "float", "enum", ...), carried but not interpreted.
    #[serde(default)]
    pub type_name: String,
    #[serde(default)]
    pub default_value: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct ModuleDescription {
    pub class_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub plugin_name: String,
    #[serde(default)]
    pub is_view: bool,
    #[serde(default)]
    pub parameters: Vec<ParameterDescription>,
    #[serde(default)]
    pub slots: Vec<SlotDescription>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct CallDescription {
    pub class_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub plugin_name: String,
    /// Named callbacks the call exposes to the runtime dispatcher.
    #[serde(default)]
    pub functions: Vec<String>,
}

/// The stock of known module and call classes.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, JsonSchema)]
pub struct CatalogDocument {
    #[serde(default)]
    pub modules: Vec<ModuleDescription>,
    #[serde(default)]
    pub calls: Vec<CallDescription>,
}
