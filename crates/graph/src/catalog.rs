use crate::error::{GraphError, Result};
use megamol_protocol::{CallDescription, CatalogDocument, ModuleDescription};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Position of a call description in the call stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallIndex(pub usize);

/// Validated, indexed stock of module and call classes.
///
/// The catalog is supplied from outside the engine; graphs only read it.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    modules: Vec<ModuleDescription>,
    calls: Vec<CallDescription>,
    module_index: HashMap<String, usize>,
    call_index: HashMap<String, CallIndex>,
}

impl Catalog {
    pub fn new(doc: CatalogDocument) -> Result<Self> {
        let mut module_index = HashMap::with_capacity(doc.modules.len());
        for (idx, module) in doc.modules.iter().enumerate() {
            if module.class_name.trim().is_empty() {
                return Err(GraphError::invalid_catalog(format!(
                    "module description #{idx} has an empty class name"
                )));
            }
            if module_index.insert(module.class_name.clone(), idx).is_some() {
                return Err(GraphError::invalid_catalog(format!(
                    "duplicate module class '{}'",
                    module.class_name
                )));
            }
            validate_module(module)?;
        }

        let mut call_index = HashMap::with_capacity(doc.calls.len());
        for (idx, call) in doc.calls.iter().enumerate() {
            if call.class_name.trim().is_empty() {
                return Err(GraphError::invalid_catalog(format!(
                    "call description #{idx} has an empty class name"
                )));
            }
            if call_index
                .insert(call.class_name.clone(), CallIndex(idx))
                .is_some()
            {
                return Err(GraphError::invalid_catalog(format!(
                    "duplicate call class '{}'",
                    call.class_name
                )));
            }
        }

        Ok(Self {
            modules: doc.modules,
            calls: doc.calls,
            module_index,
            call_index,
        })
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let doc: CatalogDocument = serde_json::from_str(raw)?;
        Self::new(doc)
    }

    pub fn module(&self, class_name: &str) -> Option<&ModuleDescription> {
        self.module_index
            .get(class_name)
            .map(|&idx| &self.modules[idx])
    }

    pub fn call(&self, index: CallIndex) -> Option<&CallDescription> {
        self.calls.get(index.0)
    }

    pub fn call_index(&self, class_name: &str) -> Option<CallIndex> {
        self.call_index.get(class_name).copied()
    }

    pub fn modules(&self) -> &[ModuleDescription] {
        &self.modules
    }

    pub fn calls(&self) -> &[CallDescription] {
        &self.calls
    }

    /// Map call class names onto stock indices, keeping their order.
    ///
    /// Names missing from the call stock are skipped.
    pub fn resolve_calls(&self, owner: &str, class_names: &[String]) -> Vec<CallIndex> {
        let mut resolved = Vec::with_capacity(class_names.len());
        for name in class_names {
            match self.call_index(name) {
                Some(idx) if !resolved.contains(&idx) => resolved.push(idx),
                Some(_) => {}
                None => log::warn!("{owner}: compatible call '{name}' is not in the call stock"),
            }
        }
        resolved
    }
}

fn validate_module(module: &ModuleDescription) -> Result<()> {
    let mut slot_names = HashSet::new();
    for slot in &module.slots {
        if slot.name.is_empty() || slot.name.contains(megamol_protocol::SLOT_PATH_SEPARATOR) {
            return Err(GraphError::invalid_catalog(format!(
                "module class '{}' has an invalid slot name '{}'",
                module.class_name, slot.name
            )));
        }
        if !slot_names.insert(slot.name.as_str()) {
            return Err(GraphError::invalid_catalog(format!(
                "module class '{}' declares slot '{}' twice",
                module.class_name, slot.name
            )));
        }
    }

    let mut param_names = HashSet::new();
    for param in &module.parameters {
        if !param_names.insert(param.name.as_str()) {
            return Err(GraphError::invalid_catalog(format!(
                "module class '{}' declares parameter '{}' twice",
                module.class_name, param.name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use megamol_protocol::{SlotDescription, SlotKind};

    fn call(name: &str) -> CallDescription {
        CallDescription {
            class_name: name.to_string(),
            description: String::new(),
            plugin_name: "core".to_string(),
            functions: vec!["GetData".to_string()],
        }
    }

    fn module(name: &str, slots: Vec<SlotDescription>) -> ModuleDescription {
        ModuleDescription {
            class_name: name.to_string(),
            description: String::new(),
            plugin_name: "core".to_string(),
            is_view: false,
            parameters: Vec::new(),
            slots,
        }
    }

    fn slot(name: &str, kind: SlotKind) -> SlotDescription {
        SlotDescription {
            name: name.to_string(),
            description: String::new(),
            kind,
            compatible_calls: vec!["CallB".to_string(), "Missing".to_string(), "CallA".to_string()],
        }
    }

    #[test]
    fn resolve_calls_keeps_declared_order_and_drops_unknown() {
        let catalog = Catalog::new(CatalogDocument {
            modules: vec![],
            calls: vec![call("CallA"), call("CallB")],
        })
        .unwrap();

        let names = vec![
            "CallB".to_string(),
            "Missing".to_string(),
            "CallA".to_string(),
            "CallB".to_string(),
        ];
        assert_eq!(
            catalog.resolve_calls("Test::slot", &names),
            vec![CallIndex(1), CallIndex(0)]
        );
    }

    #[test]
    fn duplicate_classes_are_rejected() {
        let dup_calls = CatalogDocument {
            modules: vec![],
            calls: vec![call("CallA"), call("CallA")],
        };
        assert!(matches!(
            Catalog::new(dup_calls),
            Err(GraphError::InvalidCatalog(_))
        ));

        let dup_modules = CatalogDocument {
            modules: vec![module("Foo", vec![]), module("Foo", vec![])],
            calls: vec![],
        };
        assert!(Catalog::new(dup_modules).is_err());
    }

    #[test]
    fn duplicate_slot_names_are_rejected() {
        let doc = CatalogDocument {
            modules: vec![module(
                "Foo",
                vec![slot("out", SlotKind::Caller), slot("out", SlotKind::Callee)],
            )],
            calls: vec![],
        };
        assert!(Catalog::new(doc).is_err());
    }

    #[test]
    fn lookup_by_class_name() {
        let catalog = Catalog::new(CatalogDocument {
            modules: vec![module("Foo", vec![slot("in", SlotKind::Callee)])],
            calls: vec![call("CallA")],
        })
        .unwrap();
        assert!(catalog.module("Foo").is_some());
        assert!(catalog.module("Bar").is_none());
        assert_eq!(catalog.call_index("CallA"), Some(CallIndex(0)));
        assert_eq!(catalog.call(CallIndex(0)).unwrap().class_name, "CallA");
        assert!(catalog.call(CallIndex(7)).is_none());
    }
}
