use crate::catalog::Catalog;
use crate::error::{GraphError, Result};
use crate::graph::Graph;
use crate::id::Uid;
use megamol_protocol::{EditCommand, SlotPath};
use serde::Serialize;

/// What a successfully applied [`EditCommand`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EditOutcome {
    ModuleAdded { uid: Uid, name: String },
    ModuleDeleted { clean: bool },
    ModuleRenamed { name: String },
    ParameterSet,
    CallAdded { uid: Uid, class_name: String },
    CallDeleted { clean: bool },
    GroupAdded { uid: Uid, name: String },
    GroupDeleted,
    ModuleGrouped { group: Uid },
    ModuleUngrouped { changed: bool },
    MainViewSet,
}

impl Graph {
    /// Apply one name-addressed edit.
    pub fn apply(&mut self, catalog: &Catalog, edit: &EditCommand) -> Result<EditOutcome> {
        log::debug!("Applying edit '{}'", edit.action_name());
        match edit {
            EditCommand::AddModule { class_name, name } => {
                let uid = self.add_module(catalog, class_name, name.as_deref())?;
                let name = self.module(uid).map(|m| m.name.clone()).unwrap_or_default();
                Ok(EditOutcome::ModuleAdded { uid, name })
            }
            EditCommand::DeleteModule { module } => {
                let uid = self.module_uid(module)?;
                let clean = self.delete_module(uid)?;
                Ok(EditOutcome::ModuleDeleted { clean })
            }
            EditCommand::RenameModule { module, new_name } => {
                let uid = self.module_uid(module)?;
                let name = self.rename_module(uid, new_name)?;
                Ok(EditOutcome::ModuleRenamed { name })
            }
            EditCommand::SetParameter {
                module,
                parameter,
                value,
            } => {
                let uid = self.module_uid(module)?;
                self.set_parameter_value(uid, parameter, value)?;
                Ok(EditOutcome::ParameterSet)
            }
            EditCommand::AddCall { from, to } => {
                let a = self.slot_uid(from)?;
                let b = self.slot_uid(to)?;
                let uid = self.add_call(catalog, a, b)?;
                let class_name = self
                    .call(uid)
                    .map(|c| c.class_name.clone())
                    .unwrap_or_default();
                Ok(EditOutcome::CallAdded { uid, class_name })
            }
            EditCommand::DeleteCall { caller, callee } => {
                let caller_slot = self.slot_uid(caller)?;
                let callee_slot = self.slot_uid(callee)?;
                let uid = self
                    .call_between(caller_slot, callee_slot)
                    .map(|c| c.uid)
                    .ok_or_else(|| {
                        GraphError::not_found(format!("call from '{caller}' to '{callee}'"))
                    })?;
                let clean = self.delete_call(uid)?;
                Ok(EditOutcome::CallDeleted { clean })
            }
            EditCommand::AddGroup { name } => {
                let uid = self.add_group(name.as_deref());
                let name = self.group(uid).map(|g| g.name.clone()).unwrap_or_default();
                Ok(EditOutcome::GroupAdded { uid, name })
            }
            EditCommand::DeleteGroup { group } => {
                let uid = self
                    .find_group_by_name(group)
                    .map(|g| g.uid)
                    .ok_or_else(|| GraphError::not_found(format!("group '{group}'")))?;
                self.delete_group(uid)?;
                Ok(EditOutcome::GroupDeleted)
            }
            EditCommand::AddModuleToGroup { group, module } => {
                let uid = self.module_uid(module)?;
                let group = self.add_module_to_group_named(group, uid)?;
                Ok(EditOutcome::ModuleGrouped { group })
            }
            EditCommand::RemoveModuleFromGroup { module } => {
                let uid = self.module_uid(module)?;
                let changed = self.remove_module_from_group(uid)?;
                Ok(EditOutcome::ModuleUngrouped { changed })
            }
            EditCommand::SetMainView { module } => {
                let uid = self.module_uid(module)?;
                self.set_main_view(uid)?;
                Ok(EditOutcome::MainViewSet)
            }
        }
    }

    /// Apply edits in order, stopping at the first failure.
    ///
    /// Edits before the failing one stay applied.
    pub fn apply_all(&mut self, catalog: &Catalog, edits: &[EditCommand]) -> Result<Vec<EditOutcome>> {
        let mut outcomes = Vec::with_capacity(edits.len());
        for (index, edit) in edits.iter().enumerate() {
            let outcome = self.apply(catalog, edit).map_err(|e| GraphError::Edit {
                index,
                action: edit.action_name().to_string(),
                source: Box::new(e),
            })?;
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    fn module_uid(&self, name: &str) -> Result<Uid> {
        self.find_module_by_name(name)
            .map(|m| m.uid)
            .ok_or_else(|| GraphError::not_found(format!("module '{name}'")))
    }

    fn slot_uid(&self, raw: &str) -> Result<Uid> {
        let path = SlotPath::parse(raw).map_err(|e| GraphError::InvalidName(e.to_string()))?;
        let module = self.module_uid(path.module)?;
        self.find_slot(module, path.slot)
            .map(|s| s.uid)
            .ok_or_else(|| GraphError::not_found(format!("slot '{raw}'")))
    }
}
