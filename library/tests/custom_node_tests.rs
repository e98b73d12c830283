//! Integration tests for the custom node lifecycle: authoring, placement,
//! hot updates, import/export, and persistence across restarts.

use library::create_node_registry;
use library::custom::{
    CustomNodeDefinition, CustomNodeManager, InMemoryStore, JsonFileStore, PortSpec,
};
use library::graph::Graph;
use library::model::{PinDataType, PinValue, PropertyDefinition, PropertyValue};
use library::registry::NodeRegistry;

use uuid::Uuid;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Helper: a graph, a registry preloaded with the built-ins, and a manager
/// backed by in-memory storage.
fn setup() -> (Graph, NodeRegistry, CustomNodeManager) {
    init_logging();
    (
        Graph::new(),
        create_node_registry(),
        CustomNodeManager::new(Box::new(InMemoryStore::new())),
    )
}

/// Helper: "double" multiplies its single input by two.
fn double_definition() -> CustomNodeDefinition {
    CustomNodeDefinition::new("double", "Double")
        .with_inputs(vec![
            PortSpec::new("input", PinDataType::Scalar).with_default(PropertyValue::from(0.0)),
        ])
        .with_outputs(vec![PortSpec::new("result", PinDataType::Scalar)])
        .with_code("result = input * 2")
}

fn add_node(graph: &mut Graph, registry: &NodeRegistry, type_id: &str) -> Uuid {
    let node = registry.create_node(type_id, None).expect("known type");
    graph.add_node(node).expect("add node")
}

fn add_constant(graph: &mut Graph, registry: &NodeRegistry, value: f64) -> Uuid {
    let id = add_node(graph, registry, "data.constant");
    graph
        .set_property(id, "value", PropertyValue::from(value))
        .expect("set value");
    id
}

/// Helper: feed `input` through one "double" node and return its result.
fn run_double_chain(registry: &NodeRegistry, input: f64) -> PinValue {
    let mut graph = Graph::new();
    let src = add_constant(&mut graph, registry, input);
    let node = add_node(&mut graph, registry, "double");
    graph.connect(src, "value", node, "input").expect("connect");
    graph.evaluate().expect("pass");
    graph.output_value(node, "result")
}

#[test]
fn test_custom_node_evaluates_in_a_graph() {
    let (mut graph, mut registry, mut manager) = setup();
    manager
        .create_custom_node(double_definition(), &mut registry)
        .expect("create");

    let source = add_constant(&mut graph, &registry, 5.0);
    let double = add_node(&mut graph, &registry, "double");
    let sink = add_node(&mut graph, &registry, "data.output");
    graph
        .connect(source, "value", double, "input")
        .expect("connect");
    graph
        .connect(double, "result", sink, "value")
        .expect("connect");

    graph.evaluate().expect("pass");
    assert_eq!(graph.output_value(double, "result"), PinValue::Scalar(10.0));
    assert_eq!(graph.output_value(sink, "value"), PinValue::Scalar(10.0));
}

#[test]
fn test_hot_update_rewires_behavior_without_touching_identity() {
    let (mut graph, mut registry, mut manager) = setup();
    let created = manager
        .create_custom_node(double_definition(), &mut registry)
        .expect("create");

    let first_src = add_constant(&mut graph, &registry, 2.0);
    let second_src = add_constant(&mut graph, &registry, 5.0);
    let first = add_node(&mut graph, &registry, "double");
    let second = add_node(&mut graph, &registry, "double");
    graph
        .connect(first_src, "value", first, "input")
        .expect("connect");
    graph
        .connect(second_src, "value", second, "input")
        .expect("connect");
    graph.evaluate().expect("pass");
    assert_eq!(graph.output_value(first, "result"), PinValue::Scalar(4.0));
    assert_eq!(graph.output_value(second, "result"), PinValue::Scalar(10.0));

    let connection_count = graph.connections().len();

    // Edit the body, persist it, then push the edit into the live instances.
    let mut edited = created.clone();
    edited.evaluate_code = "result = input * 3".to_string();
    let updated = manager
        .update_custom_node(edited, &mut registry)
        .expect("update");
    let summary = manager
        .update_all_custom_node_instances("double", &updated, &mut registry, &mut graph)
        .expect("hot update");

    // Both instances re-ran with the new behavior; nothing structural moved.
    assert_eq!(summary.evaluated, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(graph.output_value(first, "result"), PinValue::Scalar(6.0));
    assert_eq!(graph.output_value(second, "result"), PinValue::Scalar(15.0));
    assert_eq!(graph.connections().len(), connection_count);
    assert!(graph.node(first).is_some());
    assert!(graph.node(second).is_some());
}

#[test]
fn test_unresolvable_name_fails_only_that_instance() {
    let (mut graph, mut registry, mut manager) = setup();
    manager
        .create_custom_node(double_definition(), &mut registry)
        .expect("create");

    // Compiles fine; "missing" is only looked up when the node runs.
    let shaky = CustomNodeDefinition::new("shaky", "Shaky")
        .with_inputs(vec![
            PortSpec::new("input", PinDataType::Scalar).with_default(PropertyValue::from(1.0)),
        ])
        .with_outputs(vec![PortSpec::new("result", PinDataType::Scalar)])
        .with_code("result = input * missing");
    manager
        .create_custom_node(shaky, &mut registry)
        .expect("create");

    let src = add_constant(&mut graph, &registry, 5.0);
    let bad = add_node(&mut graph, &registry, "shaky");
    let good = add_node(&mut graph, &registry, "double");
    graph.connect(src, "value", bad, "input").expect("connect");
    graph.connect(src, "value", good, "input").expect("connect");

    let summary = graph.evaluate().expect("pass");
    assert_eq!(summary.failed, 1);
    assert_eq!(graph.output_value(bad, "result"), PinValue::None);
    assert_eq!(graph.output_value(good, "result"), PinValue::Scalar(10.0));
}

#[test]
fn test_import_without_body_names_the_missing_field() {
    let (_graph, mut registry, mut manager) = setup();
    let builtin_count = registry.len();

    let err = manager
        .import_definition(r#"{"name":"broken"}"#, &mut registry)
        .unwrap_err();
    assert!(err.to_string().contains("evaluateCode"));
    assert_eq!(registry.len(), builtin_count);
}

#[test]
fn test_exported_definition_behaves_identically_after_import() {
    let (_graph, mut registry, mut manager) = setup();
    let def = manager
        .create_custom_node(double_definition(), &mut registry)
        .expect("create");
    let json = manager.export_definition(def.id).expect("export");

    let mut other_registry = create_node_registry();
    let mut other_manager = CustomNodeManager::new(Box::new(InMemoryStore::new()));
    let imported = other_manager
        .import_definition(&json, &mut other_registry)
        .expect("import");

    assert_eq!(imported.id, def.id);
    assert_eq!(run_double_chain(&registry, 7.0), PinValue::Scalar(14.0));
    assert_eq!(run_double_chain(&other_registry, 7.0), PinValue::Scalar(14.0));
}

#[test]
fn test_numeric_properties_are_in_scope() {
    let (mut graph, mut registry, mut manager) = setup();
    let amp = CustomNodeDefinition::new("amp", "Amplifier")
        .with_inputs(vec![
            PortSpec::new("input", PinDataType::Scalar).with_default(PropertyValue::from(0.0)),
        ])
        .with_outputs(vec![PortSpec::new("result", PinDataType::Scalar)])
        .with_properties(vec![PropertyDefinition::float(
            "gain", "Gain", 3.0, 0.0, 10.0, 0.1,
        )])
        .with_code("result = input * gain");
    manager
        .create_custom_node(amp, &mut registry)
        .expect("create");

    let src = add_constant(&mut graph, &registry, 2.0);
    let node = add_node(&mut graph, &registry, "amp");
    graph.connect(src, "value", node, "input").expect("connect");
    graph.evaluate().expect("pass");
    assert_eq!(graph.output_value(node, "result"), PinValue::Scalar(6.0));

    // Property edits dirty the node like any other edit.
    graph
        .set_property(node, "gain", PropertyValue::from(4.0))
        .expect("set gain");
    graph.evaluate().expect("pass");
    assert_eq!(graph.output_value(node, "result"), PinValue::Scalar(8.0));
}

#[test]
fn test_definitions_survive_restart_via_file_store() {
    init_logging();
    let path = std::env::temp_dir().join(format!("custom_nodes_test_{}.json", Uuid::new_v4()));

    {
        let store = JsonFileStore::open(&path).expect("open");
        let mut manager = CustomNodeManager::new(Box::new(store));
        let mut registry = create_node_registry();
        manager
            .create_custom_node(double_definition(), &mut registry)
            .expect("create");
    }

    // A fresh session sees the stored definition and can place it right away.
    let store = JsonFileStore::open(&path).expect("reopen");
    let manager = CustomNodeManager::new(Box::new(store));
    let mut registry = create_node_registry();
    assert_eq!(manager.load_custom_nodes(&mut registry).expect("load"), 1);
    assert_eq!(run_double_chain(&registry, 3.0), PinValue::Scalar(6.0));

    std::fs::remove_file(&path).expect("cleanup");
}

#[test]
fn test_multiple_outputs_and_locals() {
    let (mut graph, mut registry, mut manager) = setup();
    let split = CustomNodeDefinition::new("sum_diff", "Sum / Diff")
        .with_inputs(vec![
            PortSpec::new("a", PinDataType::Scalar).with_default(PropertyValue::from(0.0)),
            PortSpec::new("b", PinDataType::Scalar).with_default(PropertyValue::from(0.0)),
        ])
        .with_outputs(vec![
            PortSpec::new("sum", PinDataType::Scalar),
            PortSpec::new("diff", PinDataType::Scalar),
        ])
        .with_code("total = a + b\nsum = total\ndiff = a - b");
    manager
        .create_custom_node(split, &mut registry)
        .expect("create");

    let a = add_constant(&mut graph, &registry, 5.0);
    let b = add_constant(&mut graph, &registry, 3.0);
    let node = add_node(&mut graph, &registry, "sum_diff");
    graph.connect(a, "value", node, "a").expect("connect");
    graph.connect(b, "value", node, "b").expect("connect");

    graph.evaluate().expect("pass");
    // "total" is a local; it feeds the later statements and emits nothing.
    assert_eq!(graph.output_value(node, "sum"), PinValue::Scalar(8.0));
    assert_eq!(graph.output_value(node, "diff"), PinValue::Scalar(2.0));
}

#[test]
fn test_fan_in_broadcasts_through_a_custom_node() {
    let (mut graph, mut registry, mut manager) = setup();
    manager
        .create_custom_node(double_definition(), &mut registry)
        .expect("create");

    let one = add_constant(&mut graph, &registry, 1.0);
    let two = add_constant(&mut graph, &registry, 2.0);
    let node = add_node(&mut graph, &registry, "double");
    graph.connect(one, "value", node, "input").expect("connect");
    graph.connect(two, "value", node, "input").expect("connect");

    graph.evaluate().expect("pass");
    assert_eq!(
        graph.output_value(node, "result"),
        PinValue::List(vec![PinValue::Scalar(2.0), PinValue::Scalar(4.0)])
    );
}
