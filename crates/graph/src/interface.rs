use crate::graph::Graph;
use crate::id::Uid;
use crate::slot::{shares_call_class, CallSlot};
use crate::types::InterfaceSlot;
use std::collections::HashSet;

impl Graph {
    /// Recompute the interface slots of one group from its live calls.
    ///
    /// A member module slot is proxied iff at least one of its calls leads
    /// to a module outside the group. New boundary slots join the first
    /// interface slot of the same kind whose members all share a call class
    /// with them, or get a fresh one. Empty interface slots are dropped.
    /// Returns `false` for an unknown group.
    pub fn restore_interface_state(&mut self, group_uid: Uid) -> bool {
        let Some(group) = self.groups.get(&group_uid) else {
            return false;
        };

        let mut boundary = Vec::new();
        for module in group.modules.iter().filter_map(|m| self.modules.get(m)) {
            for slot in &module.slots {
                if self.has_outside_peer(slot, group_uid) {
                    boundary.push(slot.uid);
                }
            }
        }
        let keep: HashSet<Uid> = boundary.iter().copied().collect();

        let Some(group) = self.groups.get_mut(&group_uid) else {
            return false;
        };
        for interface in &mut group.interface_slots {
            interface.slots.retain(|s| keep.contains(s));
        }

        let mut created = 0usize;
        for slot_uid in boundary {
            if group.interface_slot_of(slot_uid).is_some() {
                continue;
            }
            let Some(slot) = self
                .slot_owner
                .get(&slot_uid)
                .and_then(|owner| self.modules.get(owner))
                .and_then(|m| m.slot(slot_uid))
            else {
                continue;
            };

            let target = group.interface_slots.iter().position(|iface| {
                iface.kind == slot.kind
                    && iface.slots.iter().all(|&member| {
                        self.slot_owner
                            .get(&member)
                            .and_then(|owner| self.modules.get(owner))
                            .and_then(|m| m.slot(member))
                            .is_some_and(|member| shares_call_class(member, slot))
                    })
            });
            match target {
                Some(idx) => group.interface_slots[idx].slots.push(slot_uid),
                None => {
                    group.interface_slots.push(InterfaceSlot {
                        uid: self.ids.next_id(),
                        group: group_uid,
                        kind: slot.kind,
                        slots: vec![slot_uid],
                    });
                    created += 1;
                }
            }
        }
        let pruned = group.prune_empty_interfaces();
        if created > 0 || pruned > 0 {
            log::debug!(
                "Group '{}': {} interface slots created, {} pruned",
                group.name,
                created,
                pruned
            );
        }
        true
    }

    /// Recompute interface slots of every group.
    pub fn restore_all_interface_states(&mut self) {
        let groups: Vec<Uid> = self.groups.keys().copied().collect();
        for group in groups {
            self.restore_interface_state(group);
        }
    }

    /// Move a boundary slot into a specific interface slot of its group,
    /// provided the interface still exists and accepts it.
    pub(crate) fn move_into_interface(&mut self, group_uid: Uid, iface_uid: Uid, slot: Uid) {
        let Some(iface) = self.interface_slot(iface_uid).cloned() else {
            return;
        };
        if iface.group != group_uid || iface.contains_slot(slot) {
            return;
        }
        let Some(current) = self.interface_slot_of(slot).map(|i| i.uid) else {
            return;
        };
        if !self.interface_accepts(&iface, slot) {
            return;
        }
        let Some(group) = self.groups.get_mut(&group_uid) else {
            return;
        };
        if let Some(from) = group.interface_slot_mut(current) {
            from.slots.retain(|&s| s != slot);
        }
        if let Some(to) = group.interface_slot_mut(iface_uid) {
            to.slots.push(slot);
        }
        group.prune_empty_interfaces();
    }

    /// Whether one of the slot's calls reaches a module outside `group`.
    pub(crate) fn has_outside_peer(&self, slot: &CallSlot, group: Uid) -> bool {
        slot.connected_calls.iter().any(|call| {
            self.calls
                .get(call)
                .and_then(|c| c.endpoint(slot.kind.opposite()))
                .and_then(|peer| self.slot_owner.get(&peer))
                .and_then(|owner| self.modules.get(owner))
                .is_some_and(|peer_module| peer_module.group != Some(group))
        })
    }
}
