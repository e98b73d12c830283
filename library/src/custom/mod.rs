//! Runtime-authored node types: definitions, persistence, compilation, and
//! propagation of edits to live instances.

pub mod definition;
pub mod expr;
pub mod store;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GraphError;
use crate::graph::broadcast::{broadcast, pack};
use crate::graph::context::{EvaluationContext, NodeEvaluator};
use crate::graph::{Graph, PassSummary};
use crate::model::pin_value::PinValue;
use crate::registry::{NodeRegistry, NodeTypeDescriptor};

pub use definition::{CustomNodeDefinition, PortSpec};
pub use expr::Program;
pub use store::{InMemoryStore, JsonFileStore, KeyValueStore, CUSTOM_NODES_KEY};

/// Version of the persisted envelope format.
pub const STORAGE_VERSION: u32 = 1;

/// Envelope persisted under [`CUSTOM_NODES_KEY`].
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredDefinitions {
    version: u32,
    #[serde(default)]
    nodes: Vec<CustomNodeDefinition>,
}

/// Turns custom node definitions into live registry types and keeps
/// storage, registry, and already-placed instances in sync.
pub struct CustomNodeManager {
    store: Box<dyn KeyValueStore>,
}

impl CustomNodeManager {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Compile a definition and register the resulting type. Does not touch
    /// storage; this is the shared path for loading and importing.
    pub fn register_custom_node(
        &self,
        def: &CustomNodeDefinition,
        registry: &mut NodeRegistry,
    ) -> Result<(), GraphError> {
        def.validate()?;
        let descriptor = build_descriptor(def)?;
        registry.register(descriptor);
        info!(
            "CustomNodeManager: registered custom node type '{}' (version {})",
            def.name, def.version
        );
        Ok(())
    }

    /// Validate, stamp, persist, and register a brand-new definition.
    /// Returns the stored form (timestamps filled in).
    pub fn create_custom_node(
        &mut self,
        mut def: CustomNodeDefinition,
        registry: &mut NodeRegistry,
    ) -> Result<CustomNodeDefinition, GraphError> {
        def.validate()?;
        let mut stored = self.read_stored()?;
        if registry.contains(&def.name) || stored.nodes.iter().any(|n| n.name == def.name) {
            return Err(GraphError::validation(format!(
                "A node type named '{}' already exists",
                def.name
            )));
        }

        let now = epoch_millis();
        def.created_at = now;
        def.updated_at = now;

        let descriptor = build_descriptor(&def)?;
        stored.nodes.push(def.clone());
        self.write_stored(&stored)?;
        registry.register(descriptor);
        info!("CustomNodeManager: created custom node type '{}'", def.name);
        Ok(def)
    }

    /// Persist an edited definition and re-register its type. The creation
    /// timestamp is preserved; the update timestamp is stamped fresh, and
    /// the patch version is bumped when the caller did not change it.
    ///
    /// Already-placed instances keep their old behavior until
    /// [`CustomNodeManager::update_all_custom_node_instances`] runs.
    pub fn update_custom_node(
        &mut self,
        mut def: CustomNodeDefinition,
        registry: &mut NodeRegistry,
    ) -> Result<CustomNodeDefinition, GraphError> {
        def.validate()?;
        let mut stored = self.read_stored()?;
        let index = stored
            .nodes
            .iter()
            .position(|n| n.id == def.id)
            .ok_or_else(|| {
                GraphError::validation(format!("No stored custom node with id {}", def.id))
            })?;

        def.created_at = stored.nodes[index].created_at;
        if def.version == stored.nodes[index].version {
            def.version = bump_patch(&def.version);
        }
        def.updated_at = epoch_millis();

        let descriptor = build_descriptor(&def)?;
        stored.nodes[index] = def.clone();
        self.write_stored(&stored)?;
        registry.register(descriptor);
        info!(
            "CustomNodeManager: updated custom node type '{}' to version {}",
            def.name, def.version
        );
        Ok(def)
    }

    /// Remove a definition from storage. The live registry keeps the type,
    /// so already-placed instances work until the graph is reloaded.
    pub fn delete_custom_node(&mut self, id: Uuid) -> Result<(), GraphError> {
        let mut stored = self.read_stored()?;
        let before = stored.nodes.len();
        stored.nodes.retain(|n| n.id != id);
        if stored.nodes.len() == before {
            warn!("CustomNodeManager: delete of unknown custom node {}", id);
            return Ok(());
        }
        self.write_stored(&stored)?;
        info!("CustomNodeManager: deleted custom node {}", id);
        Ok(())
    }

    /// Push an edited definition into every live instance of the type:
    /// re-register, swap each instance's behavior in place (identity and
    /// connections untouched), and run one evaluation pass.
    pub fn update_all_custom_node_instances(
        &self,
        type_name: &str,
        def: &CustomNodeDefinition,
        registry: &mut NodeRegistry,
        graph: &mut Graph,
    ) -> Result<PassSummary, GraphError> {
        def.validate()?;
        let descriptor = build_descriptor(def)?;
        let behavior = descriptor.behavior();
        registry.register(descriptor);

        let updated = graph.replace_behavior_for_type(type_name, behavior);
        info!(
            "CustomNodeManager: hot-updated {} instance(s) of '{}'",
            updated.len(),
            type_name
        );
        graph.evaluate()
    }

    /// Pretty-printed JSON of one stored definition.
    pub fn export_definition(&self, id: Uuid) -> Result<String, GraphError> {
        let stored = self.read_stored()?;
        let def = stored.nodes.iter().find(|n| n.id == id).ok_or_else(|| {
            GraphError::validation(format!("No stored custom node with id {}", id))
        })?;
        Ok(serde_json::to_string_pretty(def)?)
    }

    /// Parse, validate, persist, and register a definition from JSON. An
    /// existing definition with the same id is replaced; a name collision
    /// with a different id is rejected.
    pub fn import_definition(
        &mut self,
        json: &str,
        registry: &mut NodeRegistry,
    ) -> Result<CustomNodeDefinition, GraphError> {
        let def: CustomNodeDefinition = serde_json::from_str(json)?;
        def.validate()?;
        let descriptor = build_descriptor(&def)?;

        let mut stored = self.read_stored()?;
        match stored.nodes.iter().position(|n| n.id == def.id) {
            Some(index) => stored.nodes[index] = def.clone(),
            None => {
                if stored.nodes.iter().any(|n| n.name == def.name) {
                    return Err(GraphError::validation(format!(
                        "A custom node named '{}' already exists",
                        def.name
                    )));
                }
                stored.nodes.push(def.clone());
            }
        }
        self.write_stored(&stored)?;
        registry.register(descriptor);
        info!("CustomNodeManager: imported custom node type '{}'", def.name);
        Ok(def)
    }

    /// Register every stored definition, typically at startup. Definitions
    /// that fail validation or compilation are skipped with a warning.
    /// Returns how many types were registered.
    pub fn load_custom_nodes(&self, registry: &mut NodeRegistry) -> Result<usize, GraphError> {
        let stored = self.read_stored()?;
        let mut count = 0;
        for def in &stored.nodes {
            match self.register_custom_node(def, registry) {
                Ok(()) => count += 1,
                Err(e) => warn!(
                    "CustomNodeManager: skipping stored definition '{}': {}",
                    def.name, e
                ),
            }
        }
        info!("CustomNodeManager: loaded {} custom node type(s)", count);
        Ok(count)
    }

    fn read_stored(&self) -> Result<StoredDefinitions, GraphError> {
        match self.store.get(CUSTOM_NODES_KEY)? {
            Some(text) => {
                let stored: StoredDefinitions = serde_json::from_str(&text)?;
                if stored.version > STORAGE_VERSION {
                    return Err(GraphError::validation(format!(
                        "Unsupported custom node storage version {}",
                        stored.version
                    )));
                }
                Ok(stored)
            }
            None => Ok(StoredDefinitions {
                version: STORAGE_VERSION,
                nodes: Vec::new(),
            }),
        }
    }

    fn write_stored(&mut self, stored: &StoredDefinitions) -> Result<(), GraphError> {
        let text = serde_json::to_string(stored)?;
        self.store.set(CUSTOM_NODES_KEY, &text)
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn bump_patch(version: &str) -> String {
    let parts: Vec<u64> = version.split('.').filter_map(|p| p.parse().ok()).collect();
    if parts.len() == 3 {
        format!("{}.{}.{}", parts[0], parts[1], parts[2] + 1)
    } else {
        version.to_string()
    }
}

/// Compile a definition's body and assemble the registry descriptor.
fn build_descriptor(def: &CustomNodeDefinition) -> Result<NodeTypeDescriptor, GraphError> {
    let program = Program::compile(&def.evaluate_code)?;
    let evaluator = CompiledNodeEvaluator {
        program,
        input_names: def.inputs.iter().map(|p| p.name.clone()).collect(),
        output_names: def.outputs.iter().map(|p| p.name.clone()).collect(),
        property_names: def.properties.iter().map(|p| p.name.clone()).collect(),
    };

    let display_name = if def.label.is_empty() {
        &def.name
    } else {
        &def.label
    };

    Ok(
        NodeTypeDescriptor::new(&def.name, display_name, &def.category, Arc::new(evaluator))
            .with_description(&def.description)
            .with_icon(&def.icon)
            .with_inputs(def.inputs.iter().map(PortSpec::to_input_definition).collect())
            .with_outputs(def.outputs.iter().map(PortSpec::to_output_definition).collect())
            .with_properties(def.properties.clone()),
    )
}

/// Bridges a compiled program to the node evaluation surface.
///
/// Inputs are broadcast element-wise; the program runs once per output
/// index with that index's input values and the node's numeric properties
/// in scope. Statement targets are matched to output pins by name; a bare
/// trailing expression feeds the first output.
struct CompiledNodeEvaluator {
    program: Program,
    input_names: Vec<String>,
    output_names: Vec<String>,
    property_names: Vec<String>,
}

impl NodeEvaluator for CompiledNodeEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext) -> Result<(), GraphError> {
        let inputs: Vec<(Vec<PinValue>, PinValue)> = self
            .input_names
            .iter()
            .map(|name| (ctx.input_values(name), ctx.input_default(name)))
            .collect();

        // Numeric properties sit below the inputs in the scope, so an input
        // with the same name shadows the property.
        let mut base_scope: HashMap<String, f64> = HashMap::new();
        for name in &self.property_names {
            if let Some(value) = ctx.property(name).to_scalar() {
                base_scope.insert(name.clone(), value);
            }
        }

        let rows = if self.input_names.is_empty() {
            vec![self.program.run(&base_scope)?]
        } else {
            broadcast(&inputs, |args| {
                let mut scope = base_scope.clone();
                for (name, value) in self.input_names.iter().zip(args) {
                    if let Some(v) = value.to_scalar() {
                        scope.insert(name.clone(), v);
                    }
                }
                self.program.run(&scope)
            })?
        };

        for (index, name) in self.output_names.iter().enumerate() {
            let mut column = Vec::with_capacity(rows.len());
            let mut assigned = false;
            for row in &rows {
                let mut cell = PinValue::None;
                for (target, value) in row {
                    let matches = match target {
                        Some(t) => t == name,
                        None => index == 0,
                    };
                    if matches {
                        cell = PinValue::Scalar(*value);
                        assigned = true;
                    }
                }
                column.push(cell);
            }
            if assigned {
                ctx.set_output(name, pack(column));
            } else {
                ctx.set_output(name, PinValue::None);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::connection::PinDataType;
    use crate::model::property::PropertyValue;

    fn setup() -> (CustomNodeManager, NodeRegistry) {
        let manager = CustomNodeManager::new(Box::new(InMemoryStore::new()));
        (manager, NodeRegistry::new())
    }

    fn double_definition() -> CustomNodeDefinition {
        CustomNodeDefinition::new("double", "Double")
            .with_inputs(vec![PortSpec::new("input", PinDataType::Scalar)
                .with_default(PropertyValue::from(0.0))])
            .with_outputs(vec![PortSpec::new("result", PinDataType::Scalar)])
            .with_code("result = input * 2")
    }

    #[test]
    fn test_create_persists_and_registers() {
        let (mut manager, mut registry) = setup();
        let def = manager
            .create_custom_node(double_definition(), &mut registry)
            .expect("create");

        assert!(registry.contains("double"));
        assert!(def.created_at > 0);
        assert_eq!(def.created_at, def.updated_at);

        let exported = manager.export_definition(def.id).expect("export");
        assert!(exported.contains("\"double\""));
    }

    #[test]
    fn test_create_rejects_duplicate_name() {
        let (mut manager, mut registry) = setup();
        manager
            .create_custom_node(double_definition(), &mut registry)
            .expect("create");

        let err = manager
            .create_custom_node(double_definition(), &mut registry)
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_create_rejects_uncompilable_body_without_persisting() {
        let (mut manager, mut registry) = setup();
        let def = double_definition().with_code("result = = 2");
        let err = manager.create_custom_node(def, &mut registry).unwrap_err();
        assert!(err.to_string().contains("Compilation error"));
        assert!(!registry.contains("double"));
        assert_eq!(
            manager.load_custom_nodes(&mut registry).expect("load"),
            0
        );
    }

    #[test]
    fn test_update_preserves_created_at_and_bumps_patch() {
        let (mut manager, mut registry) = setup();
        let created = manager
            .create_custom_node(double_definition(), &mut registry)
            .expect("create");

        let mut edited = created.clone();
        edited.evaluate_code = "result = input * 3".to_string();
        let updated = manager
            .update_custom_node(edited, &mut registry)
            .expect("update");

        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.version, "1.0.1");
        assert!(updated.updated_at >= created.updated_at);
    }

    #[test]
    fn test_update_keeps_caller_supplied_version() {
        let (mut manager, mut registry) = setup();
        let created = manager
            .create_custom_node(double_definition(), &mut registry)
            .expect("create");

        let mut edited = created.clone();
        edited.version = "2.0.0".to_string();
        let updated = manager
            .update_custom_node(edited, &mut registry)
            .expect("update");
        assert_eq!(updated.version, "2.0.0");
    }

    #[test]
    fn test_update_unknown_id_is_rejected() {
        let (mut manager, mut registry) = setup();
        let err = manager
            .update_custom_node(double_definition(), &mut registry)
            .unwrap_err();
        assert!(err.to_string().contains("No stored custom node"));
    }

    #[test]
    fn test_delete_keeps_live_registry_type() {
        let (mut manager, mut registry) = setup();
        let def = manager
            .create_custom_node(double_definition(), &mut registry)
            .expect("create");

        manager.delete_custom_node(def.id).expect("delete");
        assert!(registry.contains("double"));

        let mut fresh = NodeRegistry::new();
        assert_eq!(manager.load_custom_nodes(&mut fresh).expect("load"), 0);
    }

    #[test]
    fn test_import_missing_evaluate_code_leaves_registry_unchanged() {
        let (mut manager, mut registry) = setup();
        let err = manager
            .import_definition(r#"{"name":"broken"}"#, &mut registry)
            .unwrap_err();
        assert!(err.to_string().contains("evaluateCode"));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_export_import_round_trip() {
        let (mut manager, mut registry) = setup();
        let def = manager
            .create_custom_node(double_definition(), &mut registry)
            .expect("create");
        let json = manager.export_definition(def.id).expect("export");

        let (mut other_manager, mut other_registry) = setup();
        let imported = other_manager
            .import_definition(&json, &mut other_registry)
            .expect("import");

        assert_eq!(imported, def);
        assert!(other_registry.contains("double"));
    }

    #[test]
    fn test_load_skips_invalid_definitions() {
        let (mut manager, mut registry) = setup();
        manager
            .create_custom_node(double_definition(), &mut registry)
            .expect("create");

        // Corrupt one stored body behind the manager's back.
        let mut stored = manager.read_stored().expect("read");
        let mut broken = double_definition();
        broken.name = "broken".to_string();
        broken.evaluate_code = "result = = 2".to_string();
        stored.nodes.push(broken);
        manager.write_stored(&stored).expect("write");

        let mut fresh = NodeRegistry::new();
        assert_eq!(manager.load_custom_nodes(&mut fresh).expect("load"), 1);
        assert!(fresh.contains("double"));
        assert!(!fresh.contains("broken"));
    }

    #[test]
    fn test_unsupported_storage_version_is_rejected() {
        let mut store = InMemoryStore::new();
        store
            .set(CUSTOM_NODES_KEY, r#"{"version":99,"nodes":[]}"#)
            .expect("set");
        let manager = CustomNodeManager::new(Box::new(store));

        let mut registry = NodeRegistry::new();
        let err = manager.load_custom_nodes(&mut registry).unwrap_err();
        assert!(err.to_string().contains("storage version"));
    }

    #[test]
    fn test_bump_patch() {
        assert_eq!(bump_patch("1.0.0"), "1.0.1");
        assert_eq!(bump_patch("0.2.9"), "0.2.10");
        assert_eq!(bump_patch("weird"), "weird");
    }
}
