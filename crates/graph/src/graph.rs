use crate::catalog::Catalog;
use crate::config::{GraphConfig, UncleanDeletionPolicy};
use crate::error::{GraphError, Result};
use crate::id::{IdAllocator, Uid};
use crate::slot::CallSlot;
use crate::types::{Call, Group, InterfaceSlot, Module, Parameter};
use std::collections::{BTreeMap, HashMap};

/// One editable module graph.
///
/// Modules, calls and groups live in ID-keyed arenas. Slots know their
/// module's ID, calls and interface slots know slot IDs; everything is
/// resolved through the registries at use time.
#[derive(Debug)]
pub struct Graph {
    uid: Uid,
    name: String,
    pub(crate) config: GraphConfig,
    pub(crate) ids: IdAllocator,
    pub(crate) modules: BTreeMap<Uid, Module>,
    pub(crate) calls: BTreeMap<Uid, Call>,
    pub(crate) groups: BTreeMap<Uid, Group>,
    /// Slot ID -> owning module ID
    pub(crate) slot_owner: HashMap<Uid, Uid>,
    pub(crate) main_view: Option<Uid>,
    dirty: bool,
}

impl Graph {
    pub fn new(name: impl Into<String>) -> Self {
        let ids = IdAllocator::new();
        Self {
            uid: ids.next_id(),
            name: name.into(),
            config: GraphConfig::default(),
            ids,
            modules: BTreeMap::new(),
            calls: BTreeMap::new(),
            groups: BTreeMap::new(),
            slot_owner: HashMap::new(),
            main_view: None,
            dirty: false,
        }
    }

    pub fn with_config(name: impl Into<String>, config: GraphConfig) -> Result<Self> {
        config.validate().map_err(GraphError::Config)?;
        let mut graph = Self::new(name);
        graph.config = config;
        Ok(graph)
    }

    pub fn uid(&self) -> Uid {
        self.uid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Whether the graph changed since the last `clear_dirty`.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn next_id(&self) -> Uid {
        self.ids.next_id()
    }

    // ---------------------------------------------------------------
    // Module registry
    // ---------------------------------------------------------------

    /// Instantiate a module class from the stock.
    ///
    /// The instance is named `requested_name` (or the class name); a taken
    /// name gets a numeric suffix.
    pub fn add_module(
        &mut self,
        catalog: &Catalog,
        class_name: &str,
        requested_name: Option<&str>,
    ) -> Result<Uid> {
        let Some(desc) = catalog.module(class_name) else {
            log::error!("Unable to find module in stock: {class_name}");
            return Err(GraphError::ClassNotFound(class_name.to_string()));
        };

        let base = requested_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&desc.class_name);
        let name = self.unique_module_name(base, None);

        let uid = self.next_id();
        let slots: Vec<CallSlot> = desc
            .slots
            .iter()
            .map(|s| {
                let owner = format!("{}::{}", desc.class_name, s.name);
                let mut slot = CallSlot::new(
                    self.next_id(),
                    uid,
                    s.name.clone(),
                    s.kind,
                    catalog.resolve_calls(&owner, &s.compatible_calls),
                );
                slot.description = s.description.clone();
                slot
            })
            .collect();
        let parameters = desc
            .parameters
            .iter()
            .map(|p| Parameter {
                name: p.name.clone(),
                description: p.description.clone(),
                type_name: p.type_name.clone(),
                default_value: p.default_value.clone(),
                value: p.default_value.clone(),
            })
            .collect();

        for slot in &slots {
            self.slot_owner.insert(slot.uid, uid);
        }
        self.modules.insert(
            uid,
            Module {
                uid,
                class_name: desc.class_name.clone(),
                description: desc.description.clone(),
                plugin_name: desc.plugin_name.clone(),
                is_view: desc.is_view,
                name,
                group: None,
                slots,
                parameters,
            },
        );
        self.mark_dirty();

        log::info!(
            "Added module '{}' (uid {}) as '{}' to project '{}'",
            class_name,
            uid,
            self.modules[&uid].name,
            self.name
        );
        Ok(uid)
    }

    /// Remove a module together with its calls and group membership.
    ///
    /// Returns `Ok(false)` when references to the module survived the
    /// cascade and the policy is `LogAndContinue`.
    pub fn delete_module(&mut self, uid: Uid) -> Result<bool> {
        let Some(module) = self.modules.get(&uid) else {
            log::warn!("Invalid module uid {uid}");
            return Err(GraphError::not_found(format!("module {uid}")));
        };
        let label = format!("'{}' (uid {})", module.name, uid);
        let grouped = module.group.is_some();
        let slot_ids: Vec<Uid> = module.slots.iter().map(|s| s.uid).collect();
        let snapshot = self.strict_snapshot();

        if grouped {
            self.detach_module_from_group(uid);
        }
        for slot in slot_ids {
            self.release_slot_calls(slot);
        }
        self.purge_disconnected();
        self.restore_all_interface_states();
        self.remove_empty_groups();

        let leftovers = self.module_references(uid);
        if !self.tolerate_leftovers(&format!("module {label}"), leftovers) {
            // Strict policy: the module stays registered, cascade included.
            self.roll_back(snapshot);
            return Err(GraphError::UncleanDeletion(format!(
                "{leftovers} references pointing to module {label}"
            )));
        }

        if let Some(module) = self.modules.remove(&uid) {
            for slot in &module.slots {
                self.slot_owner.remove(&slot.uid);
            }
        }
        if self.main_view == Some(uid) {
            self.main_view = None;
        }
        self.mark_dirty();
        log::info!("Deleted module {} from project '{}'", label, self.name);
        Ok(leftovers == 0)
    }

    pub fn module(&self, uid: Uid) -> Option<&Module> {
        self.modules.get(&uid)
    }

    pub(crate) fn module_mut(&mut self, uid: Uid) -> Option<&mut Module> {
        self.modules.get_mut(&uid)
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn find_module_by_name(&self, name: &str) -> Option<&Module> {
        self.modules.values().find(|m| m.name == name)
    }

    /// Rename a module, suffixing `new_name` if another module holds it.
    ///
    /// Returns the name actually assigned.
    pub fn rename_module(&mut self, uid: Uid, new_name: &str) -> Result<String> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(GraphError::InvalidName(
                "module name must not be empty".to_string(),
            ));
        }
        if !self.modules.contains_key(&uid) {
            return Err(GraphError::not_found(format!("module {uid}")));
        }
        let unique = self.unique_module_name(new_name, Some(uid));
        let module = self
            .modules
            .get_mut(&uid)
            .ok_or_else(|| GraphError::not_found(format!("module {uid}")))?;
        if module.name != unique {
            log::info!("Renamed module '{}' (uid {}) to '{}'", module.name, uid, unique);
            module.name = unique.clone();
            self.dirty = true;
        }
        Ok(unique)
    }

    pub fn set_parameter_value(&mut self, module: Uid, parameter: &str, value: &str) -> Result<()> {
        let m = self
            .modules
            .get_mut(&module)
            .ok_or_else(|| GraphError::not_found(format!("module {module}")))?;
        let module_name = &m.name;
        let param = m.parameters.iter_mut().find(|p| p.name == parameter).ok_or_else(|| {
            GraphError::not_found(format!("parameter '{parameter}' of module '{module_name}'"))
        })?;
        if param.value != value {
            param.value = value.to_string();
            self.dirty = true;
        }
        Ok(())
    }

    /// Mark a view module as the graph's main view instance.
    pub fn set_main_view(&mut self, module: Uid) -> Result<()> {
        let m = self
            .modules
            .get(&module)
            .ok_or_else(|| GraphError::not_found(format!("module {module}")))?;
        if !m.is_view {
            return Err(GraphError::incompatible(format!(
                "module '{}' of class '{}' is not a view",
                m.name, m.class_name
            )));
        }
        if self.main_view != Some(module) {
            self.main_view = Some(module);
            self.mark_dirty();
        }
        Ok(())
    }

    pub fn clear_main_view(&mut self) {
        if self.main_view.take().is_some() {
            self.mark_dirty();
        }
    }

    pub fn main_view(&self) -> Option<&Module> {
        self.main_view.and_then(|uid| self.modules.get(&uid))
    }

    pub fn is_main_view_set(&self) -> bool {
        self.main_view.is_some()
    }

    // ---------------------------------------------------------------
    // Slots
    // ---------------------------------------------------------------

    pub fn slot(&self, uid: Uid) -> Option<&CallSlot> {
        let owner = self.slot_owner.get(&uid)?;
        self.modules.get(owner)?.slot(uid)
    }

    pub(crate) fn slot_mut(&mut self, uid: Uid) -> Option<&mut CallSlot> {
        let owner = *self.slot_owner.get(&uid)?;
        self.modules.get_mut(&owner)?.slot_mut(uid)
    }

    pub fn find_slot(&self, module: Uid, slot_name: &str) -> Option<&CallSlot> {
        self.modules.get(&module)?.slot_by_name(slot_name)
    }

    /// Group of the module owning `slot`.
    pub fn slot_group(&self, slot: Uid) -> Option<Uid> {
        let owner = self.slot_owner.get(&slot)?;
        self.modules.get(owner)?.group
    }

    /// Interface slot proxying `slot` in its module's group.
    pub fn interface_slot_of(&self, slot: Uid) -> Option<&InterfaceSlot> {
        let group = self.slot_group(slot)?;
        self.groups.get(&group)?.interface_slot_of(slot)
    }

    pub fn interface_slot(&self, uid: Uid) -> Option<&InterfaceSlot> {
        self.groups.values().find_map(|g| g.interface_slot(uid))
    }

    /// `module::slot` label used in logs and documents.
    pub(crate) fn slot_label(&self, slot: Uid) -> String {
        match self
            .slot_owner
            .get(&slot)
            .and_then(|owner| self.modules.get(owner))
        {
            Some(m) => match m.slot(slot) {
                Some(s) => megamol_protocol::slot_path(&m.name, &s.name),
                None => format!("{}::<slot {slot}>", m.name),
            },
            None => format!("<slot {slot}>"),
        }
    }

    // ---------------------------------------------------------------
    // Naming
    // ---------------------------------------------------------------

    pub(crate) fn unique_module_name(&self, base: &str, exclude: Option<Uid>) -> String {
        unique_name(
            base,
            self.modules
                .values()
                .filter(|m| Some(m.uid) != exclude)
                .map(|m| m.name.as_str()),
        )
    }

    // ---------------------------------------------------------------
    // Reference accounting
    // ---------------------------------------------------------------

    /// Count references to `module` and its slots held anywhere else.
    pub(crate) fn module_references(&self, module: Uid) -> usize {
        let Some(m) = self.modules.get(&module) else {
            return 0;
        };
        let is_own = |slot: Option<Uid>| slot.is_some_and(|s| m.slot(s).is_some());

        let from_slots: usize = m.slots.iter().map(|s| s.connected_calls.len()).sum();
        let from_calls = self
            .calls
            .values()
            .filter(|c| is_own(c.caller) || is_own(c.callee))
            .count();
        let from_groups: usize = self
            .groups
            .values()
            .map(|g| {
                usize::from(g.contains_module(module))
                    + g.interface_slots
                        .iter()
                        .flat_map(|i| i.slots.iter())
                        .filter(|&&s| m.slot(s).is_some())
                        .count()
            })
            .sum();
        from_slots + from_calls + from_groups
    }

    /// Registries before a deletion that the strict policy may refuse.
    pub(crate) fn strict_snapshot(&self) -> Option<Snapshot> {
        if self.config.unclean_deletion != UncleanDeletionPolicy::Strict {
            return None;
        }
        Some(Snapshot {
            modules: self.modules.clone(),
            calls: self.calls.clone(),
            groups: self.groups.clone(),
            slot_owner: self.slot_owner.clone(),
            main_view: self.main_view,
            dirty: self.dirty,
        })
    }

    pub(crate) fn roll_back(&mut self, snapshot: Option<Snapshot>) {
        let Some(snapshot) = snapshot else {
            return;
        };
        self.modules = snapshot.modules;
        self.calls = snapshot.calls;
        self.groups = snapshot.groups;
        self.slot_owner = snapshot.slot_owner;
        self.main_view = snapshot.main_view;
        self.dirty = snapshot.dirty;
        log::debug!("Rolled back refused deletion in project '{}'", self.name);
    }

    /// Apply the unclean-deletion policy; `true` lets the deletion go ahead.
    pub(crate) fn tolerate_leftovers(&self, what: &str, leftovers: usize) -> bool {
        if leftovers == 0 {
            return true;
        }
        match self.config.unclean_deletion {
            UncleanDeletionPolicy::LogAndContinue => {
                log::error!("Unclean deletion. Found {leftovers} references pointing to {what}");
                true
            }
            UncleanDeletionPolicy::Strict => {
                log::error!("Refusing unclean deletion of {what}: {leftovers} references left");
                false
            }
        }
    }
}

/// Copy of the registries taken by [`Graph::strict_snapshot`].
#[derive(Debug)]
pub(crate) struct Snapshot {
    modules: BTreeMap<Uid, Module>,
    calls: BTreeMap<Uid, Call>,
    groups: BTreeMap<Uid, Group>,
    slot_owner: HashMap<Uid, Uid>,
    main_view: Option<Uid>,
    dirty: bool,
}

/// `base` if free, else `base_N` with N one above the highest numeric
/// suffix already in use.
pub(crate) fn unique_name<'a>(base: &str, existing: impl Iterator<Item = &'a str>) -> String {
    let prefix = format!("{base}_");
    let mut taken = false;
    let mut highest = 0u64;
    for name in existing {
        if name == base {
            taken = true;
        } else if let Some(n) = numeric_suffix(name, &prefix) {
            highest = highest.max(n);
        }
    }
    if taken {
        format!("{prefix}{}", highest + 1)
    } else {
        base.to_string()
    }
}

pub(crate) fn numeric_suffix(name: &str, prefix: &str) -> Option<u64> {
    let tail = name.strip_prefix(prefix)?;
    if tail.is_empty() || !tail.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    tail.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (Catalog, Graph, Uid, Uid) {
        let catalog = Catalog::from_json_str(include_str!("../tests/fixtures/catalog.json")).unwrap();
        let mut graph = Graph::new("corrupt");
        let view = graph.add_module(&catalog, "View3D", None).unwrap();
        let renderer = graph.add_module(&catalog, "SphereRenderer", None).unwrap();
        (catalog, graph, view, renderer)
    }

    fn slot_of(graph: &Graph, module: Uid, name: &str) -> Uid {
        graph.find_slot(module, name).unwrap().uid
    }

    #[test]
    fn unique_name_keeps_free_base() {
        assert_eq!(unique_name("Foo", ["Bar", "Foo_3"].into_iter()), "Foo");
    }

    #[test]
    fn unique_name_suffixes_after_highest() {
        assert_eq!(unique_name("Foo", ["Foo"].into_iter()), "Foo_1");
        assert_eq!(unique_name("Foo", ["Foo", "Foo_1", "Foo_4"].into_iter()), "Foo_5");
        assert_eq!(unique_name("Foo", ["Foo", "Foo_x", "Foo_+2"].into_iter()), "Foo_1");
    }

    #[test]
    fn unique_name_is_deterministic() {
        let existing = ["Foo", "Foo_2"];
        let first = unique_name("Foo", existing.into_iter());
        let second = unique_name("Foo", existing.into_iter());
        assert_eq!(first, second);
    }

    #[test]
    fn numeric_suffix_requires_digits() {
        assert_eq!(numeric_suffix("Group_12", "Group_"), Some(12));
        assert_eq!(numeric_suffix("Group_", "Group_"), None);
        assert_eq!(numeric_suffix("Group_1a", "Group_"), None);
        assert_eq!(numeric_suffix("Other_1", "Group_"), None);
    }

    #[test]
    fn strict_policy_rejects_leftovers() {
        let graph = Graph::with_config("strict", GraphConfig::strict()).unwrap();
        assert!(graph.tolerate_leftovers("module x", 0));
        assert!(!graph.tolerate_leftovers("module x", 2));

        let lenient = Graph::new("lenient");
        assert!(lenient.tolerate_leftovers("module x", 2));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = GraphConfig {
            group_name_prefix: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            Graph::with_config("bad", config),
            Err(GraphError::Config(_))
        ));
    }

    #[test]
    fn stale_group_reference_is_tolerated_by_default() {
        let (_catalog, mut graph, view, renderer) = fixture();
        let group = graph.add_group(Some("stale"));
        graph.groups.get_mut(&group).unwrap().modules.push(view);
        graph.groups.get_mut(&group).unwrap().modules.push(renderer);
        graph.modules.get_mut(&renderer).unwrap().group = Some(group);

        assert_eq!(graph.module_references(view), 1);
        assert!(!graph.delete_module(view).unwrap());
        assert!(graph.module(view).is_none());
    }

    #[test]
    fn stale_group_reference_blocks_strict_deletion() {
        let (catalog, _graph, _, _) = fixture();
        let mut graph = Graph::with_config("strict", GraphConfig::strict()).unwrap();
        let view = graph.add_module(&catalog, "View3D", None).unwrap();
        let group = graph.add_group(Some("stale"));
        graph.groups.get_mut(&group).unwrap().modules.push(view);

        let err = graph.delete_module(view).unwrap_err();
        assert!(matches!(err, GraphError::UncleanDeletion(_)));
        assert!(graph.module(view).is_some());
    }

    #[test]
    fn foreign_slot_listing_a_call_is_reported() {
        let (catalog, mut graph, view, renderer) = fixture();
        let other = graph.add_module(&catalog, "SphereRenderer", None).unwrap();
        let call = graph
            .add_call(
                &catalog,
                slot_of(&graph, view, "rendering"),
                slot_of(&graph, renderer, "rendering"),
            )
            .unwrap();
        let foreign = slot_of(&graph, other, "rendering");
        graph.slot_mut(foreign).unwrap().connected_calls.push(call);

        assert!(!graph.delete_call(call).unwrap());
        assert!(graph.call(call).is_none());

        graph.config.unclean_deletion = UncleanDeletionPolicy::Strict;
        let second = graph
            .add_call(
                &catalog,
                slot_of(&graph, view, "rendering"),
                slot_of(&graph, renderer, "rendering"),
            )
            .unwrap();
        graph.slot_mut(foreign).unwrap().connected_calls.push(second);
        assert!(matches!(
            graph.delete_call(second),
            Err(GraphError::UncleanDeletion(_))
        ));
        assert!(graph.call(second).is_some());
    }

    #[test]
    fn refused_strict_deletion_keeps_calls_and_groups() {
        let (catalog, _graph, _, _) = fixture();
        let mut graph = Graph::with_config("strict", GraphConfig::strict()).unwrap();
        let view = graph.add_module(&catalog, "View3D", None).unwrap();
        let renderer = graph.add_module(&catalog, "SphereRenderer", None).unwrap();
        let call = graph
            .add_call(
                &catalog,
                slot_of(&graph, view, "rendering"),
                slot_of(&graph, renderer, "rendering"),
            )
            .unwrap();
        let views = graph.add_module_to_group_named("views", view).unwrap();
        let stale = graph.add_group(Some("stale"));
        graph.groups.get_mut(&stale).unwrap().modules.push(view);
        graph.clear_dirty();

        let err = graph.delete_module(view).unwrap_err();
        assert!(matches!(err, GraphError::UncleanDeletion(_)));

        assert!(graph.module(view).is_some());
        assert_eq!(graph.module(view).unwrap().group(), Some(views));
        assert!(graph.group(views).unwrap().contains_module(view));
        assert!(graph.is_call_connected(call));
        assert_eq!(graph.module_calls(view), vec![call]);
        assert_eq!(graph.group(views).unwrap().interface_slots().len(), 1);
        assert!(!graph.is_dirty());
    }

    #[test]
    fn refused_batch_deletion_keeps_every_call() {
        let (catalog, _graph, _, _) = fixture();
        let mut graph = Graph::with_config("strict", GraphConfig::strict()).unwrap();
        let r1 = graph.add_module(&catalog, "SphereRenderer", None).unwrap();
        let r2 = graph.add_module(&catalog, "SphereRenderer", None).unwrap();
        let source = graph.add_module(&catalog, "MMPLDDataSource", None).unwrap();
        let stray = graph.add_module(&catalog, "MMPLDDataSource", None).unwrap();
        let group = graph.add_module_to_group_named("render", r1).unwrap();
        graph.add_module_to_group(group, r2).unwrap();
        let source_slot = slot_of(&graph, source, "getdata");
        let c1 = graph
            .add_call(&catalog, slot_of(&graph, r1, "getdata"), source_slot)
            .unwrap();
        let c2 = graph
            .add_call(&catalog, slot_of(&graph, r2, "getdata"), source_slot)
            .unwrap();
        let stray_slot = slot_of(&graph, stray, "getdata");
        graph.slot_mut(stray_slot).unwrap().connected_calls.push(c2);

        let err = graph.delete_call(c1).unwrap_err();
        assert!(matches!(err, GraphError::UncleanDeletion(_)));

        assert!(graph.is_call_connected(c1));
        assert!(graph.is_call_connected(c2));
        assert_eq!(graph.slot(source_slot).unwrap().connected_calls(), &[c1, c2]);
        assert_eq!(graph.group(group).unwrap().interface_slots()[0].slots().len(), 2);
    }
}
