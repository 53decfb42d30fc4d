use crate::catalog::CallIndex;
use crate::id::Uid;
use megamol_protocol::SlotKind;
use serde::{Deserialize, Serialize};

/// Named connection point of a module.
///
/// A caller slot binds at most one call, a callee slot any number (fan-in).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSlot {
    pub(crate) uid: Uid,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) kind: SlotKind,
    /// Compatible call classes in declared preference order
    pub(crate) compatible_calls: Vec<CallIndex>,
    pub(crate) parent_module: Uid,
    pub(crate) connected_calls: Vec<Uid>,
}

impl CallSlot {
    pub(crate) fn new(
        uid: Uid,
        parent_module: Uid,
        name: impl Into<String>,
        kind: SlotKind,
        compatible_calls: Vec<CallIndex>,
    ) -> Self {
        Self {
            uid,
            name: name.into(),
            description: String::new(),
            kind,
            compatible_calls,
            parent_module,
            connected_calls: Vec::new(),
        }
    }

    pub fn uid(&self) -> Uid {
        self.uid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    pub fn compatible_calls(&self) -> &[CallIndex] {
        &self.compatible_calls
    }

    pub fn parent_module(&self) -> Uid {
        self.parent_module
    }

    pub fn connected_calls(&self) -> &[Uid] {
        &self.connected_calls
    }

    pub fn calls_connected(&self) -> bool {
        !self.connected_calls.is_empty()
    }

    pub fn is_call_connected(&self, call: Uid) -> bool {
        self.connected_calls.contains(&call)
    }

    /// Whether another call could be bound right now.
    pub fn has_capacity(&self) -> bool {
        match self.kind {
            SlotKind::Caller => self.connected_calls.is_empty(),
            SlotKind::Callee => true,
        }
    }

    pub(crate) fn connect_call(&mut self, call: Uid) -> bool {
        if self.connected_calls.contains(&call) || !self.has_capacity() {
            return false;
        }
        self.connected_calls.push(call);
        true
    }

    pub(crate) fn disconnect_call(&mut self, call: Uid) -> bool {
        let before = self.connected_calls.len();
        self.connected_calls.retain(|&c| c != call);
        before != self.connected_calls.len()
    }

    pub(crate) fn disconnect_all(&mut self) -> Vec<Uid> {
        std::mem::take(&mut self.connected_calls)
    }
}

/// Pick the call class that bridges two slots.
///
/// The slots must be of opposite kind. The first entry of `a`'s list that
/// `b` also accepts wins, so the result follows `a`'s declared order.
pub fn compatible_call_index(a: &CallSlot, b: &CallSlot) -> Option<CallIndex> {
    if a.kind == b.kind {
        return None;
    }
    a.compatible_calls
        .iter()
        .copied()
        .find(|idx| b.compatible_calls.contains(idx))
}

/// Whether two slots of the same kind accept a common call class and may
/// therefore share an interface slot.
pub fn shares_call_class(a: &CallSlot, b: &CallSlot) -> bool {
    a.kind == b.kind
        && a
            .compatible_calls
            .iter()
            .any(|idx| b.compatible_calls.contains(idx))
}
