use crate::catalog::Catalog;
use crate::config::GraphConfig;
use crate::error::{GraphError, Result};
use crate::graph::Graph;
use crate::id::Uid;
use megamol_protocol::{
    slot_path, CallEntry, GroupEntry, ModuleEntry, ProjectDocument, SlotPath,
    PROJECT_SCHEMA_VERSION,
};
use std::collections::HashMap;

impl Graph {
    /// Capture the structure of the graph as a project document.
    ///
    /// Calls that are not bound at both ends are left out.
    pub fn serialize(&self) -> ProjectDocument {
        let modules = self
            .modules
            .values()
            .map(|m| ModuleEntry {
                class_name: m.class_name.clone(),
                name: m.name.clone(),
                parameters: m
                    .parameters
                    .iter()
                    .filter(|p| !p.is_default())
                    .map(|p| (p.name.clone(), p.value.clone()))
                    .collect(),
            })
            .collect();

        let calls = self
            .calls
            .values()
            .filter_map(|c| {
                let caller = c.caller.and_then(|s| self.slot_path_of(s))?;
                let callee = c.callee.and_then(|s| self.slot_path_of(s))?;
                Some(CallEntry {
                    class_name: c.class_name.clone(),
                    caller,
                    callee,
                })
            })
            .collect();

        let groups = self
            .groups
            .values()
            .map(|g| GroupEntry {
                name: g.name.clone(),
                modules: g
                    .modules
                    .iter()
                    .filter_map(|m| self.module(*m))
                    .map(|m| m.name.clone())
                    .collect(),
            })
            .collect();

        ProjectDocument {
            schema_version: PROJECT_SCHEMA_VERSION,
            name: self.name().to_string(),
            main_view: self.main_view().map(|m| m.name.clone()),
            modules,
            calls,
            groups,
        }
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.serialize())?)
    }

    /// Rebuild a graph from a project document.
    ///
    /// Names in the document must be unique and resolvable against the
    /// catalog. The returned graph starts out clean.
    pub fn deserialize(
        catalog: &Catalog,
        config: GraphConfig,
        doc: &ProjectDocument,
    ) -> Result<Self> {
        if doc.schema_version > PROJECT_SCHEMA_VERSION {
            return Err(GraphError::invalid_project(format!(
                "schema version {} is newer than supported version {}",
                doc.schema_version, PROJECT_SCHEMA_VERSION
            )));
        }
        let mut graph = Graph::with_config(doc.name.clone(), config)?;

        let mut by_name: HashMap<&str, Uid> = HashMap::with_capacity(doc.modules.len());
        for entry in &doc.modules {
            if by_name.contains_key(entry.name.as_str()) {
                return Err(GraphError::invalid_project(format!(
                    "module name '{}' appears twice",
                    entry.name
                )));
            }
            let uid = graph
                .add_module(catalog, &entry.class_name, Some(entry.name.as_str()))
                .map_err(|e| match e {
                    GraphError::ClassNotFound(class) => GraphError::invalid_project(format!(
                        "module '{}' has unknown class '{}'",
                        entry.name, class
                    )),
                    other => other,
                })?;
            for (param, value) in &entry.parameters {
                graph
                    .set_parameter_value(uid, param, value)
                    .map_err(|e| GraphError::invalid_project(format!("{e}")))?;
            }
            by_name.insert(entry.name.as_str(), uid);
        }

        for entry in &doc.calls {
            let caller = resolve_slot(&graph, &by_name, &entry.caller)?;
            let callee = resolve_slot(&graph, &by_name, &entry.callee)?;
            let call = graph.add_call(catalog, caller, callee).map_err(|e| {
                GraphError::invalid_project(format!(
                    "call '{}' from '{}' to '{}': {e}",
                    entry.class_name, entry.caller, entry.callee
                ))
            })?;
            if let Some(created) = graph.call(call) {
                if created.class_name != entry.class_name {
                    log::warn!(
                        "Call from '{}' to '{}' resolved to '{}' instead of '{}'",
                        entry.caller,
                        entry.callee,
                        created.class_name,
                        entry.class_name
                    );
                }
            }
        }

        for entry in &doc.groups {
            if graph.find_group_by_name(&entry.name).is_some() {
                return Err(GraphError::invalid_project(format!(
                    "group name '{}' appears twice",
                    entry.name
                )));
            }
            let group = graph.add_group(Some(entry.name.as_str()));
            for module in &entry.modules {
                let uid = by_name.get(module.as_str()).copied().ok_or_else(|| {
                    GraphError::invalid_project(format!(
                        "group '{}' lists unknown module '{}'",
                        entry.name, module
                    ))
                })?;
                graph.add_module_to_group(group, uid)?;
            }
        }
        let swept = graph.remove_empty_groups();
        if swept > 0 {
            log::warn!("Dropped {swept} empty groups while loading '{}'", doc.name);
        }

        if let Some(view) = &doc.main_view {
            let uid = by_name.get(view.as_str()).copied().ok_or_else(|| {
                GraphError::invalid_project(format!("main view '{view}' is not a module"))
            })?;
            graph
                .set_main_view(uid)
                .map_err(|e| GraphError::invalid_project(format!("{e}")))?;
        }

        graph.clear_dirty();
        log::info!(
            "Loaded project '{}': {} modules, {} calls, {} groups",
            graph.name(),
            graph.module_count(),
            graph.call_count(),
            graph.group_count()
        );
        Ok(graph)
    }

    pub fn from_json_str(catalog: &Catalog, config: GraphConfig, raw: &str) -> Result<Self> {
        let doc: ProjectDocument = serde_json::from_str(raw)?;
        Self::deserialize(catalog, config, &doc)
    }

    fn slot_path_of(&self, slot: Uid) -> Option<String> {
        let module = self.module(*self.slot_owner.get(&slot)?)?;
        Some(slot_path(&module.name, &module.slot(slot)?.name))
    }
}

fn resolve_slot(graph: &Graph, modules: &HashMap<&str, Uid>, raw: &str) -> Result<Uid> {
    let path = SlotPath::parse(raw).map_err(|e| GraphError::invalid_project(e.to_string()))?;
    let module = modules.get(path.module).copied().ok_or_else(|| {
        GraphError::invalid_project(format!("slot path '{raw}' names an unknown module"))
    })?;
    graph
        .find_slot(module, path.slot)
        .map(|s| s.uid)
        .ok_or_else(|| GraphError::invalid_project(format!("slot path '{raw}' names an unknown slot")))
}
