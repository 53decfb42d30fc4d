use crate::id::Uid;
use crate::slot::CallSlot;
use megamol_protocol::SlotKind;
use serde::{Deserialize, Serialize};

/// Module parameter materialised from its class description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub description: String,
    pub type_name: String,
    pub default_value: String,
    pub value: String,
}

impl Parameter {
    pub fn is_default(&self) -> bool {
        self.value == self.default_value
    }
}

/// Node of the graph: one instantiated processing unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub(crate) uid: Uid,
    pub(crate) class_name: String,
    pub(crate) description: String,
    pub(crate) plugin_name: String,
    pub(crate) is_view: bool,

    /// Instance name, unique within the graph
    pub(crate) name: String,

    /// Owning group, if any
    pub(crate) group: Option<Uid>,

    pub(crate) slots: Vec<CallSlot>,
    pub(crate) parameters: Vec<Parameter>,
}

impl Module {
    pub fn uid(&self) -> Uid {
        self.uid
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    pub fn is_view(&self) -> bool {
        self.is_view
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name qualified by the root namespace, e.g. `::View3D_1`
    pub fn full_name(&self) -> String {
        format!("::{}", self.name)
    }

    pub fn group(&self) -> Option<Uid> {
        self.group
    }

    pub fn slots(&self) -> &[CallSlot] {
        &self.slots
    }

    pub fn slots_of_kind(&self, kind: SlotKind) -> impl Iterator<Item = &CallSlot> {
        self.slots.iter().filter(move |s| s.kind == kind)
    }

    pub fn slot(&self, uid: Uid) -> Option<&CallSlot> {
        self.slots.iter().find(|s| s.uid == uid)
    }

    pub fn slot_by_name(&self, name: &str) -> Option<&CallSlot> {
        self.slots.iter().find(|s| s.name == name)
    }

    pub(crate) fn slot_mut(&mut self, uid: Uid) -> Option<&mut CallSlot> {
        self.slots.iter_mut().find(|s| s.uid == uid)
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Lifecycle of a call edge. `Removed` is the absence of the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallState {
    Unbound,
    Bound,
    Disconnected,
}

/// Typed edge from one caller slot to one callee slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Call {
    pub(crate) uid: Uid,
    pub(crate) class_name: String,
    pub(crate) description: String,
    pub(crate) plugin_name: String,
    pub(crate) functions: Vec<String>,
    pub(crate) caller: Option<Uid>,
    pub(crate) callee: Option<Uid>,
    pub(crate) was_bound: bool,
}

impl Call {
    pub fn uid(&self) -> Uid {
        self.uid
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    pub fn functions(&self) -> &[String] {
        &self.functions
    }

    /// Slot at the caller end
    pub fn caller(&self) -> Option<Uid> {
        self.caller
    }

    /// Slot at the callee end
    pub fn callee(&self) -> Option<Uid> {
        self.callee
    }

    pub fn endpoint(&self, kind: SlotKind) -> Option<Uid> {
        match kind {
            SlotKind::Caller => self.caller,
            SlotKind::Callee => self.callee,
        }
    }

    pub fn state(&self) -> CallState {
        match (self.caller, self.callee) {
            (Some(_), Some(_)) => CallState::Bound,
            _ if self.was_bound => CallState::Disconnected,
            _ => CallState::Unbound,
        }
    }

    pub(crate) fn bind(&mut self, caller: Uid, callee: Uid) {
        self.caller = Some(caller);
        self.callee = Some(callee);
        self.was_bound = true;
    }

    /// Clear the endpoint that refers to `slot`.
    pub(crate) fn release_slot(&mut self, slot: Uid) {
        if self.caller == Some(slot) {
            self.caller = None;
        }
        if self.callee == Some(slot) {
            self.callee = None;
        }
    }
}

/// Group boundary proxy for same-kind module slots whose peers lie outside
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceSlot {
    pub(crate) uid: Uid,
    pub(crate) group: Uid,
    pub(crate) kind: SlotKind,
    pub(crate) slots: Vec<Uid>,
}

impl InterfaceSlot {
    pub fn uid(&self) -> Uid {
        self.uid
    }

    pub fn group(&self) -> Uid {
        self.group
    }

    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    /// Member module slots
    pub fn slots(&self) -> &[Uid] {
        &self.slots
    }

    pub fn contains_slot(&self, slot: Uid) -> bool {
        self.slots.contains(&slot)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Organisational container of modules; has no effect on call semantics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub(crate) uid: Uid,
    pub(crate) name: String,
    pub(crate) modules: Vec<Uid>,
    pub(crate) interface_slots: Vec<InterfaceSlot>,
}

impl Group {
    pub(crate) fn new(uid: Uid, name: String) -> Self {
        Self {
            uid,
            name,
            modules: Vec::new(),
            interface_slots: Vec::new(),
        }
    }

    pub fn uid(&self) -> Uid {
        self.uid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn modules(&self) -> &[Uid] {
        &self.modules
    }

    pub fn contains_module(&self, module: Uid) -> bool {
        self.modules.contains(&module)
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn interface_slots(&self) -> &[InterfaceSlot] {
        &self.interface_slots
    }

    pub fn interface_slot(&self, uid: Uid) -> Option<&InterfaceSlot> {
        self.interface_slots.iter().find(|i| i.uid == uid)
    }

    /// The interface slot that proxies `slot`, if any.
    pub fn interface_slot_of(&self, slot: Uid) -> Option<&InterfaceSlot> {
        self.interface_slots.iter().find(|i| i.contains_slot(slot))
    }

    pub(crate) fn add_module(&mut self, module: Uid) -> bool {
        if self.contains_module(module) {
            return false;
        }
        self.modules.push(module);
        true
    }

    pub(crate) fn remove_module(&mut self, module: Uid) -> bool {
        let before = self.modules.len();
        self.modules.retain(|&m| m != module);
        before != self.modules.len()
    }

    pub(crate) fn interface_slot_mut(&mut self, uid: Uid) -> Option<&mut InterfaceSlot> {
        self.interface_slots.iter_mut().find(|i| i.uid == uid)
    }

    /// Drop `slot` from whichever interface slot holds it.
    pub(crate) fn remove_interface_member(&mut self, slot: Uid) -> bool {
        let mut removed = false;
        for interface in &mut self.interface_slots {
            let before = interface.slots.len();
            interface.slots.retain(|&s| s != slot);
            removed |= before != interface.slots.len();
        }
        removed
    }

    /// Delete interface slots without members, returning how many went.
    pub(crate) fn prune_empty_interfaces(&mut self) -> usize {
        let before = self.interface_slots.len();
        self.interface_slots.retain(|i| !i.is_empty());
        before - self.interface_slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::IdAllocator;

    #[test]
    fn call_state_follows_endpoints() {
        let ids = IdAllocator::new();
        let mut call = Call {
            uid: ids.next_id(),
            class_name: "CallRender3D".to_string(),
            description: String::new(),
            plugin_name: String::new(),
            functions: Vec::new(),
            caller: None,
            callee: None,
            was_bound: false,
        };
        assert_eq!(call.state(), CallState::Unbound);

        let caller = ids.next_id();
        let callee = ids.next_id();
        call.bind(caller, callee);
        assert_eq!(call.state(), CallState::Bound);
        assert_eq!(call.endpoint(SlotKind::Caller), Some(caller));

        call.release_slot(callee);
        assert_eq!(call.state(), CallState::Disconnected);
        assert_eq!(call.caller(), Some(caller));
    }

    #[test]
    fn group_membership_and_interfaces() {
        let ids = IdAllocator::new();
        let mut group = Group::new(ids.next_id(), "Group_1".to_string());
        let module = ids.next_id();
        assert!(group.add_module(module));
        assert!(!group.add_module(module));

        let slot = ids.next_id();
        let interface = InterfaceSlot {
            uid: ids.next_id(),
            group: group.uid,
            kind: SlotKind::Caller,
            slots: vec![slot],
        };
        group.interface_slots.push(interface);
        assert!(group.interface_slot_of(slot).is_some());

        assert!(group.remove_interface_member(slot));
        assert_eq!(group.prune_empty_interfaces(), 1);
        assert!(group.interface_slots().is_empty());

        assert!(group.remove_module(module));
        assert!(group.is_empty());
    }
}
