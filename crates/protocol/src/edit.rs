use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One structural edit addressed by instance names.
///
/// Slots are written as `module::slot`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EditCommand {
    AddModule {
        class_name: String,
        #[serde(default)]
        name: Option<String>,
    },
    DeleteModule {
        module: String,
    },
    RenameModule {
        module: String,
        new_name: String,
    },
    SetParameter {
        module: String,
        parameter: String,
        value: String,
    },
    AddCall {
        from: String,
        to: String,
    },
    DeleteCall {
        caller: String,
        callee: String,
    },
    AddGroup {
        #[serde(default)]
        name: Option<String>,
    },
    DeleteGroup {
        group: String,
    },
    AddModuleToGroup {
        group: String,
        module: String,
    },
    RemoveModuleFromGroup {
        module: String,
    },
    SetMainView {
        module: String,
    },
}

impl EditCommand {
    pub fn action_name(&self) -> &'static str {
        match self {
            Self::AddModule { .. } => "add_module",
            Self::DeleteModule { .. } => "delete_module",
            Self::RenameModule { .. } => "rename_module",
            Self::SetParameter { .. } => "set_parameter",
            Self::AddCall { .. } => "add_call",
            Self::DeleteCall { .. } => "delete_call",
            Self::AddGroup { .. } => "add_group",
            Self::DeleteGroup { .. } => "delete_group",
            Self::AddModuleToGroup { .. } => "add_module_to_group",
            Self::RemoveModuleFromGroup { .. } => "remove_module_from_group",
            Self::SetMainView { .. } => "set_main_view",
        }
    }
}

/// A batch of edits applied in order.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, JsonSchema)]
pub struct EditBatch {
    #[serde(default)]
    pub edits: Vec<EditCommand>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_are_tagged_by_action() {
        let raw = r#"
        {
          "edits": [
            { "action": "add_module", "class_name": "View3D" },
            { "action": "add_call", "from": "View3D::rendering", "to": "SphereRenderer::rendering" },
            { "action": "add_module_to_group", "group": "render", "module": "View3D" }
          ]
        }
        "#;
        let batch: EditBatch = serde_json::from_str(raw).unwrap();
        assert_eq!(batch.edits.len(), 3);
        assert_eq!(
            batch.edits[0],
            EditCommand::AddModule {
                class_name: "View3D".to_string(),
                name: None
            }
        );
        let actions: Vec<_> = batch.edits.iter().map(EditCommand::action_name).collect();
        assert_eq!(actions, vec!["add_module", "add_call", "add_module_to_group"]);
    }
}
