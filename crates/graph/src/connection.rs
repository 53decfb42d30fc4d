use crate::catalog::Catalog;
use crate::error::{GraphError, Result};
use crate::graph::Graph;
use crate::id::Uid;
use crate::slot::{compatible_call_index, shares_call_class};
use crate::types::{Call, InterfaceSlot};
use megamol_protocol::SlotKind;
use std::collections::HashSet;

/// Logical end of a call: a module slot, or the interface slot proxying it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Endpoint {
    Slot(Uid),
    Interface(Uid),
}

impl Graph {
    /// Connect two slots with the first call class both accept.
    ///
    /// A caller slot that is already bound loses its previous call.
    pub fn add_call(&mut self, catalog: &Catalog, slot_a: Uid, slot_b: Uid) -> Result<Uid> {
        let a = self
            .slot(slot_a)
            .ok_or_else(|| GraphError::not_found(format!("slot {slot_a}")))?;
        let b = self
            .slot(slot_b)
            .ok_or_else(|| GraphError::not_found(format!("slot {slot_b}")))?;

        let Some(index) = compatible_call_index(a, b) else {
            log::warn!(
                "Unable to find compatible call between '{}' and '{}'",
                self.slot_label(slot_a),
                self.slot_label(slot_b)
            );
            return Err(GraphError::incompatible(format!(
                "no call connects '{}' ({}) with '{}' ({})",
                self.slot_label(slot_a),
                a.kind,
                self.slot_label(slot_b),
                b.kind
            )));
        };
        let desc = catalog
            .call(index)
            .ok_or_else(|| GraphError::ClassNotFound(format!("call stock index {}", index.0)))?;
        let (caller, callee) = match a.kind {
            SlotKind::Caller => (slot_a, slot_b),
            SlotKind::Callee => (slot_b, slot_a),
        };

        let superseded: Vec<Uid> = self
            .slot(caller)
            .map(|s| s.connected_calls.clone())
            .unwrap_or_default();
        // Only the caller's own call goes; siblings behind a shared
        // interface keep theirs.
        let mut replaced = false;
        for old in superseded {
            if self.calls.contains_key(&old) {
                self.remove_call(old)?;
                replaced = true;
            }
        }
        if replaced {
            self.restore_all_interface_states();
        }

        let uid = self.next_id();
        let mut call = Call {
            uid,
            class_name: desc.class_name.clone(),
            description: desc.description.clone(),
            plugin_name: desc.plugin_name.clone(),
            functions: desc.functions.clone(),
            caller: None,
            callee: None,
            was_bound: false,
        };

        let caller_bound = self
            .slot_mut(caller)
            .is_some_and(|s| s.connect_call(uid));
        let callee_bound = caller_bound && self.slot_mut(callee).is_some_and(|s| s.connect_call(uid));
        if !callee_bound {
            if caller_bound {
                if let Some(slot) = self.slot_mut(caller) {
                    slot.disconnect_call(uid);
                }
            }
            log::warn!("Unable to connect call: {}", call.class_name);
            return Err(GraphError::BindFailed(format!(
                "'{}' could not be bound between '{}' and '{}'",
                call.class_name,
                self.slot_label(caller),
                self.slot_label(callee)
            )));
        }

        call.bind(caller, callee);
        log::info!(
            "Added call '{}' (uid {}) from '{}' to '{}' in project '{}'",
            call.class_name,
            uid,
            self.slot_label(caller),
            self.slot_label(callee),
            self.name()
        );
        self.calls.insert(uid, call);
        self.mark_dirty();

        let caller_group = self.slot_group(caller);
        let callee_group = self.slot_group(callee);
        if caller_group != callee_group {
            for group in [caller_group, callee_group].into_iter().flatten() {
                self.restore_interface_state(group);
            }
        }
        Ok(uid)
    }

    /// Connect slots and/or interface slots.
    ///
    /// Either endpoint may be an interface slot, in which case the call is
    /// fanned out to the member slots. Returns the calls created.
    pub fn add_call_between(&mut self, catalog: &Catalog, a: Uid, b: Uid) -> Result<Vec<Uid>> {
        match (self.classify(a)?, self.classify(b)?) {
            (Endpoint::Slot(a), Endpoint::Slot(b)) => Ok(vec![self.add_call(catalog, a, b)?]),
            (Endpoint::Interface(iface), Endpoint::Slot(slot))
            | (Endpoint::Slot(slot), Endpoint::Interface(iface)) => {
                self.connect_slot_to_interface(catalog, slot, iface)
            }
            (Endpoint::Interface(a), Endpoint::Interface(b)) => {
                self.connect_interfaces(catalog, a, b)
            }
        }
    }

    /// Delete a call, plus every call that runs between the same logical
    /// endpoints when one of them is an interface slot.
    pub fn delete_call(&mut self, uid: Uid) -> Result<bool> {
        let Some(call) = self.calls.get(&uid) else {
            log::warn!("Invalid call uid {uid}");
            return Err(GraphError::not_found(format!("call {uid}")));
        };

        let caller = call.caller.map(|s| self.resolve_endpoint(s));
        let callee = call.callee.map(|s| self.resolve_endpoint(s));
        let proxied = [caller, callee]
            .iter()
            .any(|e| matches!(e, Some(Endpoint::Interface(_))));

        let mut batch = vec![uid];
        if proxied && caller.is_some() && callee.is_some() {
            for other in self.calls.values().filter(|c| c.uid != uid) {
                let other_caller = other.caller.map(|s| self.resolve_endpoint(s));
                let other_callee = other.callee.map(|s| self.resolve_endpoint(s));
                if other_caller == caller && other_callee == callee {
                    batch.push(other.uid);
                }
            }
        }

        let snapshot = self.strict_snapshot();
        let mut clean = true;
        for call in batch {
            match self.remove_call(call) {
                Ok(removed) => clean &= removed,
                Err(e) => {
                    self.roll_back(snapshot);
                    return Err(e);
                }
            }
        }
        self.restore_all_interface_states();
        Ok(clean)
    }

    /// Remove every call that is not bound at both ends. Returns the count.
    pub fn purge_disconnected(&mut self) -> usize {
        let stale: Vec<Uid> = self
            .calls
            .keys()
            .copied()
            .filter(|&c| !self.is_call_connected(c))
            .collect();
        let mut removed = 0;
        for call in stale {
            match self.remove_call(call) {
                Ok(_) => removed += 1,
                Err(e) => log::error!("Failed to purge call {call}: {e}"),
            }
        }
        if removed > 0 {
            log::debug!("Purged {removed} disconnected calls");
            self.restore_all_interface_states();
        }
        removed
    }

    /// Both endpoints exist and list the call.
    pub fn is_call_connected(&self, uid: Uid) -> bool {
        let Some(call) = self.calls.get(&uid) else {
            return false;
        };
        let bound = |slot: Option<Uid>| {
            slot.and_then(|s| self.slot(s))
                .is_some_and(|s| s.is_call_connected(uid))
        };
        bound(call.caller) && bound(call.callee)
    }

    pub fn call(&self, uid: Uid) -> Option<&Call> {
        self.calls.get(&uid)
    }

    pub fn calls(&self) -> impl Iterator<Item = &Call> {
        self.calls.values()
    }

    pub fn call_count(&self) -> usize {
        self.calls.len()
    }

    pub fn call_between(&self, caller: Uid, callee: Uid) -> Option<&Call> {
        self.calls
            .values()
            .find(|c| c.caller == Some(caller) && c.callee == Some(callee))
    }

    /// Calls with an endpoint on one of `module`'s slots.
    pub fn module_calls(&self, module: Uid) -> Vec<Uid> {
        let Some(m) = self.modules.get(&module) else {
            return Vec::new();
        };
        let mut calls: Vec<Uid> = m
            .slots
            .iter()
            .flat_map(|s| s.connected_calls.iter().copied())
            .collect();
        calls.sort();
        calls.dedup();
        calls
    }

    /// Detach every call bound to `slot`, leaving those calls disconnected.
    pub(crate) fn release_slot_calls(&mut self, slot: Uid) {
        let released = self
            .slot_mut(slot)
            .map(|s| s.disconnect_all())
            .unwrap_or_default();
        for call in released {
            if let Some(c) = self.calls.get_mut(&call) {
                c.release_slot(slot);
            }
        }
    }

    /// Unbind and drop a single call. `Ok(false)` reports tolerated leftovers.
    ///
    /// Leftovers are slots other than the call's own ends that list it; under
    /// the strict policy they leave the call untouched.
    fn remove_call(&mut self, uid: Uid) -> Result<bool> {
        let Some(call) = self.calls.get(&uid) else {
            return Ok(true);
        };
        let ends: Vec<Uid> = [call.caller, call.callee].into_iter().flatten().collect();
        let what = format!("call '{}' (uid {uid})", call.class_name);

        let leftovers = self
            .modules
            .values()
            .flat_map(|m| m.slots.iter())
            .filter(|s| !ends.contains(&s.uid) && s.is_call_connected(uid))
            .count();
        if !self.tolerate_leftovers(&what, leftovers) {
            return Err(GraphError::UncleanDeletion(format!(
                "{leftovers} references pointing to {what}"
            )));
        }

        for slot in ends {
            if let Some(s) = self.slot_mut(slot) {
                s.disconnect_call(uid);
            }
        }
        self.calls.remove(&uid);
        self.mark_dirty();
        log::info!("Deleted {} from project '{}'", what, self.name());
        Ok(leftovers == 0)
    }

    fn classify(&self, uid: Uid) -> Result<Endpoint> {
        if self.slot_owner.contains_key(&uid) {
            Ok(Endpoint::Slot(uid))
        } else if self.interface_slot(uid).is_some() {
            Ok(Endpoint::Interface(uid))
        } else {
            Err(GraphError::not_found(format!("slot or interface slot {uid}")))
        }
    }

    fn resolve_endpoint(&self, slot: Uid) -> Endpoint {
        match self.interface_slot_of(slot) {
            Some(iface) => Endpoint::Interface(iface.uid),
            None => Endpoint::Slot(slot),
        }
    }

    /// Same kind as the interface and a shared call class with every member.
    pub(crate) fn interface_accepts(&self, iface: &InterfaceSlot, slot: Uid) -> bool {
        let Some(candidate) = self.slot(slot) else {
            return false;
        };
        candidate.kind == iface.kind
            && iface
                .slots
                .iter()
                .filter_map(|&m| self.slot(m))
                .all(|member| shares_call_class(member, candidate))
    }

    fn connect_slot_to_interface(
        &mut self,
        catalog: &Catalog,
        slot: Uid,
        iface_uid: Uid,
    ) -> Result<Vec<Uid>> {
        let iface = self
            .interface_slot(iface_uid)
            .cloned()
            .ok_or_else(|| GraphError::not_found(format!("interface slot {iface_uid}")))?;
        if self.interface_slot_of(slot).is_some() {
            return Err(GraphError::incompatible(format!(
                "'{}' is already proxied by an interface slot",
                self.slot_label(slot)
            )));
        }

        if self.slot_group(slot) == Some(iface.group) {
            // Inside the group: join the interface and reach its outside peer.
            if !self.interface_accepts(&iface, slot) {
                return Err(GraphError::incompatible(format!(
                    "'{}' does not fit interface slot {}",
                    self.slot_label(slot),
                    iface_uid
                )));
            }
            let peer = iface
                .slots
                .iter()
                .filter(|&&m| m != slot)
                .filter_map(|&m| self.slot(m))
                .flat_map(|m| m.connected_calls.iter())
                .filter_map(|c| self.calls.get(c))
                .filter_map(|c| c.endpoint(iface.kind.opposite()))
                .find(|&p| self.slot_group(p) != Some(iface.group));
            let Some(peer) = peer else {
                return Err(GraphError::not_found(format!(
                    "interface slot {iface_uid} has no connected peer"
                )));
            };
            let call = self.add_call(catalog, slot, peer)?;
            self.move_into_interface(iface.group, iface_uid, slot);
            return Ok(vec![call]);
        }

        // Outside the group: connect to the members behind the interface.
        let mut created = Vec::new();
        let mut bound_callers = HashSet::new();
        for member in iface.slots {
            let caller = match iface.kind {
                SlotKind::Caller => member,
                SlotKind::Callee => slot,
            };
            if bound_callers.contains(&caller) {
                continue;
            }
            match self.add_call(catalog, slot, member) {
                Ok(call) => {
                    bound_callers.insert(caller);
                    created.push(call);
                }
                Err(e) => log::warn!("Skipping interface member {member}: {e}"),
            }
        }
        if created.is_empty() {
            return Err(GraphError::incompatible(format!(
                "'{}' cannot be connected to any member of interface slot {}",
                self.slot_label(slot),
                iface_uid
            )));
        }
        Ok(created)
    }

    fn connect_interfaces(&mut self, catalog: &Catalog, a: Uid, b: Uid) -> Result<Vec<Uid>> {
        let (Some(ia), Some(ib)) = (
            self.interface_slot(a).cloned(),
            self.interface_slot(b).cloned(),
        ) else {
            return Err(GraphError::not_found(format!("interface slots {a} and {b}")));
        };
        if ia.group == ib.group {
            return Err(GraphError::incompatible(
                "interface slots of the same group cannot be connected",
            ));
        }

        let mut created = Vec::new();
        let mut bound_callers = HashSet::new();
        for &sa in &ia.slots {
            for &sb in &ib.slots {
                let caller = if ia.kind == SlotKind::Caller { sa } else { sb };
                if bound_callers.contains(&caller) {
                    continue;
                }
                match self.add_call(catalog, sa, sb) {
                    Ok(call) => {
                        bound_callers.insert(caller);
                        created.push(call);
                    }
                    Err(e) => log::warn!("Skipping interface pair {sa}/{sb}: {e}"),
                }
            }
        }
        if created.is_empty() {
            return Err(GraphError::incompatible(format!(
                "no member of interface slot {a} can be connected to interface slot {b}"
            )));
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CallState;

    fn fixture() -> (Catalog, Graph, Uid, Uid) {
        let catalog = Catalog::from_json_str(include_str!("../tests/fixtures/catalog.json")).unwrap();
        let mut graph = Graph::new("connections");
        let renderer = graph.add_module(&catalog, "SphereRenderer", None).unwrap();
        let source = graph.add_module(&catalog, "MMPLDDataSource", None).unwrap();
        let caller = graph.find_slot(renderer, "getdata").unwrap().uid;
        let callee = graph.find_slot(source, "getdata").unwrap().uid;
        (catalog, graph, caller, callee)
    }

    #[test]
    fn purge_removes_disconnected_calls() {
        let (catalog, mut graph, caller, callee) = fixture();
        let call = graph.add_call(&catalog, caller, callee).unwrap();
        assert_eq!(graph.call(call).unwrap().state(), CallState::Bound);

        graph.release_slot_calls(caller);
        assert_eq!(graph.call(call).unwrap().state(), CallState::Disconnected);
        assert!(!graph.is_call_connected(call));

        assert_eq!(graph.purge_disconnected(), 1);
        assert!(graph.call(call).is_none());
        assert!(!graph.slot(callee).unwrap().calls_connected());
        assert_eq!(graph.purge_disconnected(), 0);
    }

    #[test]
    fn occupied_caller_refuses_the_bind() {
        let (catalog, mut graph, caller, callee) = fixture();
        // A listing with no registered call behind it cannot be superseded.
        let phantom = graph.next_id();
        graph.slot_mut(caller).unwrap().connected_calls.push(phantom);

        let err = graph.add_call(&catalog, caller, callee).unwrap_err();
        assert!(matches!(err, GraphError::BindFailed(_)));
        assert_eq!(graph.call_count(), 0);
        assert_eq!(graph.slot(caller).unwrap().connected_calls(), &[phantom]);
        assert!(!graph.slot(callee).unwrap().calls_connected());
    }

    #[test]
    fn refused_callee_releases_the_caller() {
        let (catalog, mut graph, caller, callee) = fixture();
        let upcoming = Uid::from_raw(graph.ids.issued());
        graph.slot_mut(callee).unwrap().connected_calls.push(upcoming);

        let err = graph.add_call(&catalog, caller, callee).unwrap_err();
        assert!(matches!(err, GraphError::BindFailed(_)));
        assert_eq!(graph.call_count(), 0);
        assert!(!graph.slot(caller).unwrap().calls_connected());
        assert!(graph.call(upcoming).is_none());
    }
}
