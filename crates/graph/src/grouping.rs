use crate::error::{GraphError, Result};
use crate::graph::{numeric_suffix, unique_name, Graph};
use crate::id::Uid;
use crate::types::Group;

impl Graph {
    /// Create an empty group.
    ///
    /// Without a name the group is called `<prefix><N>`; a requested name
    /// that is taken gets a numeric suffix.
    pub fn add_group(&mut self, name: Option<&str>) -> Uid {
        let name = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(requested) => unique_name(requested, self.groups.values().map(|g| g.name.as_str())),
            None => self.generate_group_name(),
        };
        let uid = self.next_id();
        log::info!("Added group '{}' (uid {}) to project '{}'", name, uid, self.name());
        self.groups.insert(uid, Group::new(uid, name));
        self.mark_dirty();
        uid
    }

    /// Disband a group; its modules become top-level.
    pub fn delete_group(&mut self, uid: Uid) -> Result<()> {
        let Some(group) = self.groups.remove(&uid) else {
            log::warn!("Invalid group uid {uid}");
            return Err(GraphError::not_found(format!("group {uid}")));
        };
        for module in &group.modules {
            if let Some(m) = self.module_mut(*module) {
                m.group = None;
            }
        }
        self.restore_all_interface_states();
        self.mark_dirty();
        log::info!("Deleted group '{}' (uid {}) from project '{}'", group.name, uid, self.name());
        Ok(())
    }

    /// Move a module into a group, leaving its previous group first.
    ///
    /// Returns `Ok(false)` if the module already belonged to the group.
    pub fn add_module_to_group(&mut self, group: Uid, module: Uid) -> Result<bool> {
        if !self.groups.contains_key(&group) {
            return Err(GraphError::not_found(format!("group {group}")));
        }
        let current = self
            .module(module)
            .ok_or_else(|| GraphError::not_found(format!("module {module}")))?
            .group;
        if current == Some(group) {
            return Ok(false);
        }

        if current.is_some() {
            self.detach_module_from_group(module);
        }
        if let Some(g) = self.groups.get_mut(&group) {
            g.add_module(module);
        }
        if let Some(m) = self.module_mut(module) {
            m.group = Some(group);
        }
        self.mark_dirty();
        log::info!("Added module {} to group {}", module, group);

        self.restore_all_interface_states();
        if current.is_some() {
            self.remove_empty_groups();
        }
        Ok(true)
    }

    /// Like [`Graph::add_module_to_group`], addressing the group by name and
    /// creating it when missing. Returns the group's ID.
    pub fn add_module_to_group_named(&mut self, group_name: &str, module: Uid) -> Result<Uid> {
        if self.module(module).is_none() {
            return Err(GraphError::not_found(format!("module {module}")));
        }
        let group = match self.find_group_by_name(group_name) {
            Some(g) => g.uid,
            None => self.add_group(Some(group_name)),
        };
        self.add_module_to_group(group, module)?;
        Ok(group)
    }

    /// Make a grouped module top-level again. `Ok(false)` if it had no group.
    pub fn remove_module_from_group(&mut self, module: Uid) -> Result<bool> {
        let grouped = self
            .module(module)
            .ok_or_else(|| GraphError::not_found(format!("module {module}")))?
            .group
            .is_some();
        if !grouped {
            return Ok(false);
        }
        self.detach_module_from_group(module);
        self.restore_all_interface_states();
        self.remove_empty_groups();
        Ok(true)
    }

    /// Delete every group without modules. Returns how many were removed.
    pub fn remove_empty_groups(&mut self) -> usize {
        let empty: Vec<Uid> = self
            .groups
            .values()
            .filter(|g| g.is_empty())
            .map(|g| g.uid)
            .collect();
        for uid in &empty {
            if let Some(group) = self.groups.remove(uid) {
                log::info!("Removed empty group '{}' (uid {})", group.name, uid);
            }
        }
        if !empty.is_empty() {
            self.mark_dirty();
        }
        empty.len()
    }

    pub fn group(&self, uid: Uid) -> Option<&Group> {
        self.groups.get(&uid)
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn find_group_by_name(&self, name: &str) -> Option<&Group> {
        self.groups.values().find(|g| g.name == name)
    }

    /// Unlink a module from its group, including interface membership of
    /// its slots. Returns the group it left.
    pub(crate) fn detach_module_from_group(&mut self, module: Uid) -> Option<Uid> {
        let m = self.module_mut(module)?;
        let group = m.group.take()?;
        let slots: Vec<Uid> = m.slots.iter().map(|s| s.uid).collect();
        if let Some(g) = self.groups.get_mut(&group) {
            g.remove_module(module);
            for slot in slots {
                g.remove_interface_member(slot);
            }
            g.prune_empty_interfaces();
        }
        self.mark_dirty();
        log::info!("Removed module {} from group {}", module, group);
        Some(group)
    }

    fn generate_group_name(&self) -> String {
        let prefix = &self.config.group_name_prefix;
        let highest = self
            .groups
            .values()
            .filter_map(|g| numeric_suffix(&g.name, prefix))
            .max()
            .unwrap_or(0);
        format!("{prefix}{}", highest + 1)
    }
}
