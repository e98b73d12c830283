//! Data nodes: sources and sinks.

use std::sync::Arc;

use crate::error::GraphError;
use crate::graph::broadcast::pack;
use crate::graph::context::{EvaluationContext, NodeEvaluator};
use crate::model::property::{PropertyDefinition, PropertyValue};
use crate::registry::NodeTypeDescriptor;

use super::{inp, out};

pub(super) fn descriptors() -> Vec<NodeTypeDescriptor> {
    use crate::model::connection::PinDataType::*;
    let nc = "Data";

    vec![
        NodeTypeDescriptor::new("data.constant", "Constant", nc, Arc::new(ConstantEvaluator))
            .with_description("Emits the configured value.")
            .with_outputs(vec![out("value", "Value", Any)])
            .with_properties(vec![PropertyDefinition::float(
                "value", "Value", 0.0, -10000.0, 10000.0, 0.01,
            )]),
        NodeTypeDescriptor::new("data.output", "Output", nc, Arc::new(OutputEvaluator))
            .with_description("Captures incoming values so they can be read back.")
            .with_inputs(vec![inp("value", "Value", Any)])
            .with_outputs(vec![out("value", "Value", Any)]),
    ]
}

/// Emits the node's "value" property on its output pin.
struct ConstantEvaluator;

impl NodeEvaluator for ConstantEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext) -> Result<(), GraphError> {
        let value = ctx.property("value");
        ctx.set_output("value", value);
        Ok(())
    }
}

/// Passes the aggregated input through, making it observable on the node.
struct OutputEvaluator;

impl NodeEvaluator for OutputEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext) -> Result<(), GraphError> {
        let values = ctx.input_values("value");
        ctx.set_output("value", pack(values));
        Ok(())
    }
}
