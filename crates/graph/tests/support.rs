#![allow(dead_code)]

use megamol_graph::{Catalog, Graph, Uid};

pub const CATALOG_JSON: &str = include_str!("fixtures/catalog.json");

pub fn catalog() -> Catalog {
    Catalog::from_json_str(CATALOG_JSON).expect("fixture catalog must load")
}

pub fn add(graph: &mut Graph, catalog: &Catalog, class_name: &str) -> Uid {
    graph
        .add_module(catalog, class_name, None)
        .unwrap_or_else(|e| panic!("add_module({class_name}) failed: {e}"))
}

pub fn slot(graph: &Graph, module: Uid, name: &str) -> Uid {
    graph
        .find_slot(module, name)
        .unwrap_or_else(|| panic!("module {module} has no slot '{name}'"))
        .uid()
}

pub fn connect(graph: &mut Graph, catalog: &Catalog, from: (Uid, &str), to: (Uid, &str)) -> Uid {
    let a = slot(graph, from.0, from.1);
    let b = slot(graph, to.0, to.1);
    graph
        .add_call(catalog, a, b)
        .unwrap_or_else(|e| panic!("add_call failed: {e}"))
}

/// View3D -> SphereRenderer -> MMPLDDataSource, all top-level.
pub struct Pipeline {
    pub view: Uid,
    pub renderer: Uid,
    pub source: Uid,
    pub render_call: Uid,
    pub data_call: Uid,
}

pub fn pipeline(graph: &mut Graph, catalog: &Catalog) -> Pipeline {
    let view = add(graph, catalog, "View3D");
    let renderer = add(graph, catalog, "SphereRenderer");
    let source = add(graph, catalog, "MMPLDDataSource");
    let render_call = connect(graph, catalog, (view, "rendering"), (renderer, "rendering"));
    let data_call = connect(graph, catalog, (renderer, "getdata"), (source, "getdata"));
    Pipeline {
        view,
        renderer,
        source,
        render_call,
        data_call,
    }
}

pub fn assert_consistent(graph: &Graph) {
    let violations = graph.check_invariants();
    assert!(violations.is_empty(), "invariant violations: {violations:?}");
}

/// Interface slots of every group as (group, interface, kind, members).
pub fn interface_snapshot(graph: &Graph) -> Vec<(Uid, Uid, String, Vec<Uid>)> {
    graph
        .groups()
        .flat_map(|g| {
            g.interface_slots()
                .iter()
                .map(move |i| (g.uid(), i.uid(), i.kind().to_string(), i.slots().to_vec()))
        })
        .collect()
}
