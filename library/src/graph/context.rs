//! Evaluation context — the view a node behavior gets during a single pass.

use std::collections::HashMap;

use log::warn;
use uuid::Uuid;

use crate::error::GraphError;
use crate::graph::node::{Node, TrackedResource};
use crate::model::pin_value::PinValue;
use crate::model::property::PropertyMap;

/// Per-type evaluation logic. One instance is shared by every node of the
/// type and replaced wholesale on hot-update, so implementations hold no
/// per-node state; anything per-node lives on the `Node` itself.
pub trait NodeEvaluator: Send + Sync {
    fn evaluate(&self, ctx: &mut EvaluationContext) -> Result<(), GraphError>;
}

/// Context for evaluating one node.
///
/// Created fresh per node per pass. Upstream values are resolved before the
/// behavior runs, so the behavior never reaches into the graph itself.
pub struct EvaluationContext<'a> {
    node: &'a mut Node,
    /// Resolved upstream values per input pin, in connection order.
    inputs: HashMap<String, Vec<PinValue>>,
    dirty_requested: bool,
}

impl<'a> EvaluationContext<'a> {
    pub(crate) fn new(node: &'a mut Node, inputs: HashMap<String, Vec<PinValue>>) -> Self {
        Self {
            node,
            inputs,
            dirty_requested: false,
        }
    }

    pub fn node_id(&self) -> Uuid {
        self.node.id
    }

    /// Single-value view of an input pin: the first upstream value if
    /// connected, else the pin's declared default, else the zero-equivalent
    /// of its data type.
    pub fn input_value(&self, name: &str) -> PinValue {
        match self.inputs.get(name) {
            Some(values) if !values.is_empty() => values[0].clone(),
            _ => self.input_default(name),
        }
    }

    /// Fan-in view of an input pin: every upstream value in connection order.
    /// Upstream `List` values contribute their elements, so the result is
    /// always flat. Unconnected pins yield their default as a single element,
    /// or nothing if no default is declared.
    pub fn input_values(&self, name: &str) -> Vec<PinValue> {
        match self.inputs.get(name) {
            Some(values) => values
                .iter()
                .flat_map(|value| value.clone().into_list())
                .collect(),
            None => match self.node.input(name) {
                Some(port) if port.definition.default_value.is_some() => {
                    vec![port.definition.fallback_value()]
                }
                _ => vec![],
            },
        }
    }

    /// Default for an input pin if declared, otherwise the zero-equivalent
    /// of its data type. `PinValue::None` for unknown pins.
    pub fn input_default(&self, name: &str) -> PinValue {
        match self.node.input(name) {
            Some(port) => port.definition.fallback_value(),
            None => PinValue::None,
        }
    }

    /// Current value of a node property, `PinValue::None` if absent.
    pub fn property(&self, name: &str) -> PinValue {
        match self.node.properties.get(name) {
            Some(value) => PinValue::from(value),
            None => PinValue::None,
        }
    }

    pub fn properties(&self) -> &PropertyMap {
        &self.node.properties
    }

    /// Write an output pin. Unknown pins are ignored with a warning.
    pub fn set_output(&mut self, name: &str, value: PinValue) {
        match self.node.output_mut(name) {
            Some(port) => port.value = value,
            None => warn!(
                "Node '{}' has no output pin '{}', value dropped",
                self.node.type_id, name
            ),
        }
    }

    /// Record a resource to be released when the node is disposed.
    pub fn track_resource(&mut self, resource: Box<dyn TrackedResource>) {
        self.node.track_resource(resource);
    }

    /// Request re-evaluation of this node. Marks raised during a pass are
    /// deferred: they take effect after the current pass completes and never
    /// re-run a node within the same pass.
    pub fn mark_dirty(&mut self) {
        self.dirty_requested = true;
    }

    pub(crate) fn dirty_requested(&self) -> bool {
        self.dirty_requested
    }
}
