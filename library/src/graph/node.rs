//! Node instances: ports, properties, behavior, and tracked resources.

use std::sync::Arc;

use log::debug;
use uuid::Uuid;

use crate::graph::context::NodeEvaluator;
use crate::model::connection::PinDefinition;
use crate::model::pin_value::PinValue;
use crate::model::property::{PropertyDefinition, PropertyMap};

/// An externally-owned handle created during evaluation (buffer, file,
/// subscription). The graph only knows how to release it.
pub trait TrackedResource {
    fn release(&mut self);
}

/// Input port of a node instance.
#[derive(Clone, Debug)]
pub struct InputPort {
    pub definition: PinDefinition,
}

/// Output port of a node instance.
#[derive(Clone, Debug)]
pub struct OutputPort {
    pub definition: PinDefinition,
    /// Last computed value. Only current while the owning node is clean.
    pub value: PinValue,
}

/// A live node in the graph.
///
/// All node types share this single structure. The `type_id` field references
/// a `NodeTypeDescriptor` registered in the `NodeRegistry`; the attached
/// `NodeEvaluator` supplies the behavior and can be swapped at runtime
/// without touching identity, ports, or connections.
pub struct Node {
    pub id: Uuid,
    /// References a NodeTypeDescriptor registered in the NodeRegistry.
    /// Examples: "data.constant", "math.add"
    pub type_id: String,
    pub label: String,
    pub properties: PropertyMap,
    inputs: Vec<InputPort>,
    outputs: Vec<OutputPort>,
    dirty: bool,
    behavior: Arc<dyn NodeEvaluator>,
    resources: Vec<Box<dyn TrackedResource>>,
}

impl Node {
    /// A fresh node starts dirty so it is picked up by the next pass.
    pub fn new(id: Uuid, type_id: &str, label: &str, behavior: Arc<dyn NodeEvaluator>) -> Self {
        Self {
            id,
            type_id: type_id.to_string(),
            label: label.to_string(),
            properties: PropertyMap::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            dirty: true,
            behavior,
            resources: Vec::new(),
        }
    }

    pub fn add_input(&mut self, definition: PinDefinition) {
        self.inputs.push(InputPort { definition });
    }

    pub fn add_output(&mut self, definition: PinDefinition) {
        self.outputs.push(OutputPort {
            definition,
            value: PinValue::None,
        });
    }

    pub fn add_property(&mut self, definition: &PropertyDefinition) {
        self.properties
            .set(definition.name.clone(), definition.default_value.clone());
    }

    pub fn inputs(&self) -> &[InputPort] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[OutputPort] {
        &self.outputs
    }

    pub fn input(&self, name: &str) -> Option<&InputPort> {
        self.inputs.iter().find(|port| port.definition.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&OutputPort> {
        self.outputs.iter().find(|port| port.definition.name == name)
    }

    pub(crate) fn input_mut(&mut self, name: &str) -> Option<&mut InputPort> {
        self.inputs
            .iter_mut()
            .find(|port| port.definition.name == name)
    }

    pub(crate) fn output_mut(&mut self, name: &str) -> Option<&mut OutputPort> {
        self.outputs
            .iter_mut()
            .find(|port| port.definition.name == name)
    }

    /// Current value of an output port, `PinValue::None` if the port is
    /// unknown or has not produced a value yet.
    pub fn output_value(&self, name: &str) -> PinValue {
        self.output(name)
            .map(|port| port.value.clone())
            .unwrap_or(PinValue::None)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    pub(crate) fn behavior(&self) -> Arc<dyn NodeEvaluator> {
        Arc::clone(&self.behavior)
    }

    pub(crate) fn replace_behavior(&mut self, behavior: Arc<dyn NodeEvaluator>) {
        self.behavior = behavior;
    }

    /// Record a resource to be released exactly once when this node is
    /// disposed or removed.
    pub fn track_resource(&mut self, resource: Box<dyn TrackedResource>) {
        self.resources.push(resource);
    }

    pub(crate) fn clear_outputs(&mut self) {
        for port in &mut self.outputs {
            port.value = PinValue::None;
        }
    }

    /// Release all tracked resources. Safe to call more than once; resources
    /// are drained on the first call.
    pub fn dispose(&mut self) {
        if self.resources.is_empty() {
            return;
        }
        let count = self.resources.len();
        for mut resource in self.resources.drain(..) {
            resource.release();
        }
        debug!("Node '{}' ({}) released {} resource(s)", self.label, self.id, count);
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        self.dispose();
    }
}
