use megamol_graph::{EditOutcome, Graph, GraphConfig, GraphError};
use megamol_protocol::{EditCommand, ProjectDocument};
use pretty_assertions::assert_eq;
use serde_json::json;

mod support;

fn sample_graph() -> Graph {
    let catalog = support::catalog();
    let mut graph = Graph::new("spheres");
    let p = support::pipeline(&mut graph, &catalog);
    graph
        .set_parameter_value(p.source, "filename", "/data/run.mmpld")
        .unwrap();
    graph.add_module_to_group_named("render", p.renderer).unwrap();
    graph.set_main_view(p.view).unwrap();
    graph
}

#[test]
fn serialize_describes_structure_by_name() {
    let doc = sample_graph().serialize();
    let value = serde_json::to_value(&doc).unwrap();

    assert_eq!(
        value,
        json!({
            "schema_version": 1,
            "name": "spheres",
            "main_view": "View3D",
            "modules": [
                { "class_name": "View3D", "name": "View3D" },
                { "class_name": "SphereRenderer", "name": "SphereRenderer" },
                {
                    "class_name": "MMPLDDataSource",
                    "name": "MMPLDDataSource",
                    "parameters": { "filename": "/data/run.mmpld" }
                }
            ],
            "calls": [
                {
                    "class_name": "CallRender3D",
                    "caller": "View3D::rendering",
                    "callee": "SphereRenderer::rendering"
                },
                {
                    "class_name": "MultiParticleDataCall",
                    "caller": "SphereRenderer::getdata",
                    "callee": "MMPLDDataSource::getdata"
                }
            ],
            "groups": [ { "name": "render", "modules": ["SphereRenderer"] } ]
        })
    );
}

#[test]
fn deserialized_project_matches_its_source() {
    let catalog = support::catalog();
    let original = sample_graph();
    let raw = original.to_json_string().unwrap();

    let restored = Graph::from_json_str(&catalog, GraphConfig::default(), &raw).unwrap();

    assert_eq!(restored.serialize(), original.serialize());
    assert!(!restored.is_dirty());
    assert_eq!(restored.main_view().map(|m| m.name()), Some("View3D"));
    let group = restored.find_group_by_name("render").unwrap();
    assert_eq!(group.interface_slots().len(), 2);
    support::assert_consistent(&restored);
}

#[test]
fn unknown_class_makes_project_invalid() {
    let catalog = support::catalog();
    let doc: ProjectDocument = serde_json::from_value(json!({
        "name": "broken",
        "modules": [ { "class_name": "Volume", "name": "vol" } ]
    }))
    .unwrap();

    let err = Graph::deserialize(&catalog, GraphConfig::default(), &doc).unwrap_err();
    assert!(matches!(err, GraphError::InvalidProject(_)));
}

#[test]
fn dangling_references_make_project_invalid() {
    let catalog = support::catalog();
    let bad_slot = json!({
        "modules": [
            { "class_name": "View3D", "name": "view" },
            { "class_name": "SphereRenderer", "name": "spheres" }
        ],
        "calls": [
            { "class_name": "CallRender3D", "caller": "view::render", "callee": "spheres::rendering" }
        ]
    });
    let duplicate = json!({
        "modules": [
            { "class_name": "View3D", "name": "view" },
            { "class_name": "View3D", "name": "view" }
        ]
    });
    let bad_group = json!({
        "modules": [ { "class_name": "View3D", "name": "view" } ],
        "groups": [ { "name": "g", "modules": ["ghost"] } ]
    });
    let not_a_view = json!({
        "main_view": "spheres",
        "modules": [ { "class_name": "SphereRenderer", "name": "spheres" } ]
    });

    for raw in [bad_slot, duplicate, bad_group, not_a_view] {
        let result = Graph::from_json_str(&catalog, GraphConfig::default(), &raw.to_string());
        assert!(
            matches!(result, Err(GraphError::InvalidProject(_))),
            "expected invalid project for {raw}"
        );
    }
}

#[test]
fn newer_schema_is_rejected() {
    let catalog = support::catalog();
    let doc = ProjectDocument {
        schema_version: 99,
        ..ProjectDocument::default()
    };
    assert!(matches!(
        Graph::deserialize(&catalog, GraphConfig::default(), &doc),
        Err(GraphError::InvalidProject(_))
    ));
}

#[test]
fn edits_build_a_project_by_name() {
    let catalog = support::catalog();
    let mut graph = Graph::new("edited");
    let edits: Vec<EditCommand> = serde_json::from_value(json!([
        { "action": "add_module", "class_name": "View3D", "name": "view" },
        { "action": "add_module", "class_name": "SphereRenderer" },
        { "action": "add_module", "class_name": "MMPLDDataSource", "name": "data" },
        { "action": "add_call", "from": "view::rendering", "to": "SphereRenderer::rendering" },
        { "action": "add_call", "from": "SphereRenderer::getdata", "to": "data::getdata" },
        { "action": "set_parameter", "module": "SphereRenderer", "parameter": "scaling", "value": "2" },
        { "action": "add_module_to_group", "group": "render", "module": "SphereRenderer" },
        { "action": "set_main_view", "module": "view" }
    ]))
    .unwrap();

    let outcomes = graph.apply_all(&catalog, &edits).unwrap();

    assert_eq!(outcomes.len(), 8);
    assert!(matches!(
        &outcomes[0],
        EditOutcome::ModuleAdded { name, .. } if name == "view"
    ));
    assert!(matches!(
        &outcomes[4],
        EditOutcome::CallAdded { class_name, .. } if class_name == "MultiParticleDataCall"
    ));
    assert_eq!(graph.call_count(), 2);
    assert_eq!(graph.find_group_by_name("render").unwrap().modules().len(), 1);
    assert!(graph.is_dirty());
    support::assert_consistent(&graph);

    let cleanup: Vec<EditCommand> = serde_json::from_value(json!([
        { "action": "delete_call", "caller": "view::rendering", "callee": "SphereRenderer::rendering" },
        { "action": "remove_module_from_group", "module": "SphereRenderer" },
        { "action": "rename_module", "module": "data", "new_name": "view" },
        { "action": "delete_module", "module": "SphereRenderer" }
    ]))
    .unwrap();
    let outcomes = graph.apply_all(&catalog, &cleanup).unwrap();
    assert_eq!(
        outcomes,
        vec![
            EditOutcome::CallDeleted { clean: true },
            EditOutcome::ModuleUngrouped { changed: true },
            EditOutcome::ModuleRenamed {
                name: "view_1".to_string()
            },
            EditOutcome::ModuleDeleted { clean: true },
        ]
    );
    assert_eq!(graph.call_count(), 0);
    assert_eq!(graph.group_count(), 0);
}

#[test]
fn failing_edit_reports_its_position() {
    let catalog = support::catalog();
    let mut graph = Graph::new("edited");
    let edits = vec![
        EditCommand::AddModule {
            class_name: "View3D".to_string(),
            name: None,
        },
        EditCommand::AddModule {
            class_name: "MMPLDDataSource".to_string(),
            name: None,
        },
        EditCommand::AddCall {
            from: "View3D::rendering".to_string(),
            to: "MMPLDDataSource::getdata".to_string(),
        },
        EditCommand::DeleteModule {
            module: "View3D".to_string(),
        },
    ];

    let err = graph.apply_all(&catalog, &edits).unwrap_err();
    match &err {
        GraphError::Edit { index, action, .. } => {
            assert_eq!(*index, 2);
            assert_eq!(action, "add_call");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.code(), "incompatible");
    assert_eq!(graph.module_count(), 2);
}
