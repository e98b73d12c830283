//! The node type registry: the directory of instantiable node types.

pub mod builtin;

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};
use uuid::Uuid;

use crate::graph::context::NodeEvaluator;
use crate::graph::node::Node;
use crate::model::connection::PinDefinition;
use crate::model::property::PropertyDefinition;

/// Descriptor of a node type.
///
/// Describes what a node of this type looks like (pins, default properties,
/// metadata) and carries the behavior attached to new instances. Node
/// instances reference their descriptor by `type_id`.
#[derive(Clone)]
pub struct NodeTypeDescriptor {
    /// Unique type identifier (e.g. "data.constant", "math.add")
    pub type_id: String,
    /// Human-readable name (e.g. "Constant", "Add")
    pub display_name: String,
    /// Category for grouping when browsing types
    pub category: String,
    /// Description shown in tooltips
    pub description: String,
    /// Icon hint for browsing UIs; carries no runtime meaning
    pub icon: String,
    /// Input pin definitions
    pub inputs: Vec<PinDefinition>,
    /// Output pin definitions
    pub outputs: Vec<PinDefinition>,
    /// Default properties for new instances of this node type
    pub properties: Vec<PropertyDefinition>,
    behavior: Arc<dyn NodeEvaluator>,
}

impl NodeTypeDescriptor {
    pub fn new(
        type_id: &str,
        display_name: &str,
        category: &str,
        behavior: Arc<dyn NodeEvaluator>,
    ) -> Self {
        Self {
            type_id: type_id.to_string(),
            display_name: display_name.to_string(),
            category: category.to_string(),
            description: String::new(),
            icon: String::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            properties: Vec::new(),
            behavior,
        }
    }

    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = desc.to_string();
        self
    }

    pub fn with_icon(mut self, icon: &str) -> Self {
        self.icon = icon.to_string();
        self
    }

    pub fn with_inputs(mut self, inputs: Vec<PinDefinition>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<PinDefinition>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_properties(mut self, props: Vec<PropertyDefinition>) -> Self {
        self.properties = props;
        self
    }

    pub(crate) fn behavior(&self) -> Arc<dyn NodeEvaluator> {
        Arc::clone(&self.behavior)
    }

    /// Construct a node of this type: declared ports and properties wired
    /// up, behavior attached, dirty until the first pass.
    pub fn instantiate(&self, id: Uuid) -> Node {
        let mut node = Node::new(id, &self.type_id, &self.display_name, self.behavior());
        for definition in &self.inputs {
            node.add_input(definition.clone());
        }
        for definition in &self.outputs {
            node.add_output(definition.clone());
        }
        for definition in &self.properties {
            node.add_property(definition);
        }
        node
    }
}

/// Registry of all node types known to the runtime, built-in and custom.
///
/// Constructed explicitly and passed where needed; there is no global
/// instance. Registering a type that already exists replaces it, which is
/// how custom node updates roll out to future instances.
pub struct NodeRegistry {
    types: HashMap<String, NodeTypeDescriptor>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            types: HashMap::new(),
        }
    }

    pub fn register(&mut self, descriptor: NodeTypeDescriptor) {
        if self.types.contains_key(&descriptor.type_id) {
            debug!(
                "NodeRegistry: replacing node type '{}'",
                descriptor.type_id
            );
        } else {
            debug!("NodeRegistry: registered node type '{}'", descriptor.type_id);
        }
        self.types.insert(descriptor.type_id.clone(), descriptor);
    }

    /// Instantiate a node of the given type, `None` if the type is unknown.
    /// A fresh id is generated unless one is supplied (document loading).
    pub fn create_node(&self, type_id: &str, id: Option<Uuid>) -> Option<Node> {
        match self.types.get(type_id) {
            Some(descriptor) => {
                Some(descriptor.instantiate(id.unwrap_or_else(Uuid::new_v4)))
            }
            None => {
                warn!("NodeRegistry: unknown node type '{}'", type_id);
                None
            }
        }
    }

    pub fn get_metadata(&self, type_id: &str) -> Option<&NodeTypeDescriptor> {
        self.types.get(type_id)
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.types.contains_key(type_id)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// All registered types, sorted by type id.
    pub fn get_all_types(&self) -> Vec<&NodeTypeDescriptor> {
        let mut types: Vec<_> = self.types.values().collect();
        types.sort_by(|a, b| a.type_id.cmp(&b.type_id));
        types
    }

    /// All types in a category, sorted by type id.
    pub fn get_types_by_category(&self, category: &str) -> Vec<&NodeTypeDescriptor> {
        let mut types: Vec<_> = self
            .types
            .values()
            .filter(|descriptor| descriptor.category == category)
            .collect();
        types.sort_by(|a, b| a.type_id.cmp(&b.type_id));
        types
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
