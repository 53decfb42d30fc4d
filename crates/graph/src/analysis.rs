use crate::error::{GraphError, Result};
use crate::graph::Graph;
use crate::id::Uid;
use crate::slot::shares_call_class;
use crate::types::Group;
use megamol_protocol::SlotKind;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap, HashSet};
use thiserror::Error;

/// Module-level view of the call graph: nodes carry module IDs, edges run
/// from caller module to callee module and carry the call ID.
pub struct DependencyGraph {
    pub graph: DiGraph<Uid, Uid>,
    pub index: HashMap<Uid, NodeIndex>,
}

impl DependencyGraph {
    pub fn node(&self, module: Uid) -> Option<NodeIndex> {
        self.index.get(&module).copied()
    }
}

/// Broken structural invariant reported by [`Graph::check_invariants`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("call {call} is not bound at both ends")]
    DisconnectedCall { call: Uid },

    #[error("caller slot {slot} holds {count} calls")]
    OverboundCaller { slot: Uid, count: usize },

    #[error("slot {slot} lists unknown call {call}")]
    DanglingSlotCall { slot: Uid, call: Uid },

    #[error("module name '{0}' is used more than once")]
    DuplicateModuleName(String),

    #[error("group name '{0}' is used more than once")]
    DuplicateGroupName(String),

    #[error("group {0} has no modules")]
    EmptyGroup(Uid),

    #[error("module {module} and group {group} disagree on membership")]
    MembershipMismatch { module: Uid, group: Uid },

    #[error("slot {slot} in group {group} has {expected} interface membership")]
    InterfaceMismatch {
        group: Uid,
        slot: Uid,
        expected: &'static str,
    },

    #[error("interface slot {interface} mixes incompatible members")]
    MixedInterface { interface: Uid },
}

impl Graph {
    /// Project the graph onto modules for petgraph algorithms.
    pub fn dependency_graph(&self) -> DependencyGraph {
        let mut graph = DiGraph::with_capacity(self.modules.len(), self.calls.len());
        let index: HashMap<Uid, NodeIndex> = self
            .modules
            .keys()
            .map(|&uid| (uid, graph.add_node(uid)))
            .collect();

        for call in self.calls.values() {
            let (Some(caller), Some(callee)) = (call.caller, call.callee) else {
                continue;
            };
            let from = self.slot_owner.get(&caller).and_then(|m| index.get(m));
            let to = self.slot_owner.get(&callee).and_then(|m| index.get(m));
            if let (Some(&from), Some(&to)) = (from, to) {
                graph.add_edge(from, to, call.uid);
            }
        }
        DependencyGraph { graph, index }
    }

    /// Modules that `module` calls, in ID order.
    pub fn callee_modules(&self, module: Uid) -> Vec<Uid> {
        self.neighbour_modules(module, Direction::Outgoing)
    }

    /// Modules that call `module`, in ID order.
    pub fn caller_modules(&self, module: Uid) -> Vec<Uid> {
        self.neighbour_modules(module, Direction::Incoming)
    }

    fn neighbour_modules(&self, module: Uid, direction: Direction) -> Vec<Uid> {
        let deps = self.dependency_graph();
        let Some(node) = deps.node(module) else {
            return Vec::new();
        };
        let found: BTreeSet<Uid> = deps
            .graph
            .edges_directed(node, direction)
            .map(|e| match direction {
                Direction::Outgoing => deps.graph[e.target()],
                Direction::Incoming => deps.graph[e.source()],
            })
            .collect();
        found.into_iter().collect()
    }

    /// Every module reachable through callee edges within `max_depth` hops,
    /// paired with its distance.
    pub fn reachable_callees(&self, module: Uid, max_depth: usize) -> Vec<(Uid, usize)> {
        let deps = self.dependency_graph();
        let Some(start) = deps.node(module) else {
            return Vec::new();
        };
        let mut visited = HashSet::from([start]);
        let mut frontier = vec![start];
        let mut result = Vec::new();
        for depth in 1..=max_depth {
            let mut next = Vec::new();
            for node in frontier {
                for target in deps.graph.neighbors_directed(node, Direction::Outgoing) {
                    if visited.insert(target) {
                        result.push((deps.graph[target], depth));
                        next.push(target);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        result.sort();
        result
    }

    /// Arrange modules in layers for display.
    ///
    /// Layer 0 holds modules nobody calls (typically views); every other
    /// module sits one layer below the deepest module calling it. Modules
    /// within a layer are ordered by ID.
    pub fn dependency_layers(&self) -> Result<Vec<Vec<Uid>>> {
        let deps = self.dependency_graph();
        let order = toposort(&deps.graph, None).map_err(|cycle| {
            let uid = deps.graph[cycle.node_id()];
            let name = self
                .module(uid)
                .map(|m| m.name().to_string())
                .unwrap_or_else(|| uid.to_string());
            GraphError::Cycle(format!("module '{name}' is part of a call cycle"))
        })?;

        let mut depth: HashMap<NodeIndex, usize> = HashMap::with_capacity(order.len());
        for node in order {
            let layer = deps
                .graph
                .neighbors_directed(node, Direction::Incoming)
                .filter_map(|pred| depth.get(&pred))
                .map(|d| d + 1)
                .max()
                .unwrap_or(0);
            depth.insert(node, layer);
        }

        let layer_count = depth.values().max().map_or(0, |d| d + 1);
        let mut layers = vec![Vec::new(); layer_count];
        for (node, layer) in depth {
            layers[layer].push(deps.graph[node]);
        }
        for layer in &mut layers {
            layer.sort();
        }
        Ok(layers)
    }

    /// Audit the registries. An empty result means the graph is consistent.
    pub fn check_invariants(&self) -> Vec<Violation> {
        let mut violations = Vec::new();

        for call in self.calls.values() {
            if !self.is_call_connected(call.uid) {
                violations.push(Violation::DisconnectedCall { call: call.uid });
            }
        }

        let mut module_names = HashSet::new();
        for module in self.modules.values() {
            if !module_names.insert(module.name.as_str()) {
                violations.push(Violation::DuplicateModuleName(module.name.clone()));
            }
            for slot in &module.slots {
                if slot.kind == SlotKind::Caller && slot.connected_calls.len() > 1 {
                    violations.push(Violation::OverboundCaller {
                        slot: slot.uid,
                        count: slot.connected_calls.len(),
                    });
                }
                for call in &slot.connected_calls {
                    if !self.calls.contains_key(call) {
                        violations.push(Violation::DanglingSlotCall {
                            slot: slot.uid,
                            call: *call,
                        });
                    }
                }
            }
            if let Some(group) = module.group {
                if !self.groups.get(&group).is_some_and(|g| g.contains_module(module.uid)) {
                    violations.push(Violation::MembershipMismatch {
                        module: module.uid,
                        group,
                    });
                }
            }
        }

        let mut group_names = HashSet::new();
        for group in self.groups.values() {
            if !group_names.insert(group.name.as_str()) {
                violations.push(Violation::DuplicateGroupName(group.name.clone()));
            }
            if group.is_empty() {
                violations.push(Violation::EmptyGroup(group.uid));
            }
            for &module in &group.modules {
                if self.module(module).and_then(|m| m.group) != Some(group.uid) {
                    violations.push(Violation::MembershipMismatch {
                        module,
                        group: group.uid,
                    });
                }
            }
            for iface in &group.interface_slots {
                let members: Vec<_> = iface.slots.iter().filter_map(|&s| self.slot(s)).collect();
                let consistent = members.len() == iface.slots.len()
                    && members.iter().all(|m| {
                        m.kind == iface.kind
                            && members
                                .iter()
                                .all(|other| shares_call_class(m, other))
                    });
                if !consistent {
                    violations.push(Violation::MixedInterface {
                        interface: iface.uid,
                    });
                }
            }
            self.audit_interface_membership(group, &mut violations);
        }
        violations
    }

    fn audit_interface_membership(&self, group: &Group, out: &mut Vec<Violation>) {
        for module in group.modules.iter().filter_map(|m| self.modules.get(m)) {
            for slot in &module.slots {
                let crossing = self.has_outside_peer(slot, group.uid);
                let proxied = group.interface_slot_of(slot.uid).is_some();
                if crossing != proxied {
                    out.push(Violation::InterfaceMismatch {
                        group: group.uid,
                        slot: slot.uid,
                        expected: if crossing { "missing" } else { "stale" },
                    });
                }
            }
        }
    }
}
