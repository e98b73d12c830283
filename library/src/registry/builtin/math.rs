//! Math nodes: scalar arithmetic over broadcast inputs.

use std::sync::Arc;

use crate::error::GraphError;
use crate::graph::broadcast::{broadcast, pack};
use crate::graph::context::{EvaluationContext, NodeEvaluator};
use crate::model::connection::PinDataType;
use crate::model::pin_value::PinValue;
use crate::model::property::PropertyValue;
use crate::registry::NodeTypeDescriptor;

use super::{inp_with_default, out};

pub(super) fn descriptors() -> Vec<NodeTypeDescriptor> {
    let nc = "Math";

    vec![
        binary(nc, "math.add", "Add", "Adds a and b.", |a, b| a + b),
        binary(nc, "math.subtract", "Subtract", "Subtracts b from a.", |a, b| a - b),
        binary(nc, "math.multiply", "Multiply", "Multiplies a by b.", |a, b| a * b),
        // Division by zero follows IEEE semantics and yields an infinity.
        binary(nc, "math.divide", "Divide", "Divides a by b.", |a, b| a / b),
        NodeTypeDescriptor::new("math.clamp", "Clamp", nc, Arc::new(ClampEvaluator))
            .with_description("Clamps value to the [min, max] range.")
            .with_inputs(vec![
                inp_with_default("value", "Value", PinDataType::Scalar, PropertyValue::from(0.0)),
                inp_with_default("min", "Min", PinDataType::Scalar, PropertyValue::from(0.0)),
                inp_with_default("max", "Max", PinDataType::Scalar, PropertyValue::from(1.0)),
            ])
            .with_outputs(vec![out("result", "Result", PinDataType::Scalar)]),
    ]
}

fn binary(
    category: &str,
    type_id: &str,
    display_name: &str,
    description: &str,
    op: fn(f64, f64) -> f64,
) -> NodeTypeDescriptor {
    NodeTypeDescriptor::new(type_id, display_name, category, Arc::new(BinaryMathEvaluator { op }))
        .with_description(description)
        .with_inputs(vec![
            inp_with_default("a", "A", PinDataType::Scalar, PropertyValue::from(0.0)),
            inp_with_default("b", "B", PinDataType::Scalar, PropertyValue::from(0.0)),
        ])
        .with_outputs(vec![out("result", "Result", PinDataType::Scalar)])
}

fn scalar_arg(value: &PinValue, pin: &str) -> Result<f64, GraphError> {
    value.to_scalar().ok_or_else(|| {
        GraphError::evaluation(format!("Input '{}' is not numeric: {:?}", pin, value))
    })
}

/// Shared body of the two-operand math nodes.
struct BinaryMathEvaluator {
    op: fn(f64, f64) -> f64,
}

impl NodeEvaluator for BinaryMathEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext) -> Result<(), GraphError> {
        let inputs = [
            (ctx.input_values("a"), ctx.input_default("a")),
            (ctx.input_values("b"), ctx.input_default("b")),
        ];
        let results = broadcast(&inputs, |args| {
            let a = scalar_arg(&args[0], "a")?;
            let b = scalar_arg(&args[1], "b")?;
            Ok(PinValue::Scalar((self.op)(a, b)))
        })?;
        ctx.set_output("result", pack(results));
        Ok(())
    }
}

struct ClampEvaluator;

impl NodeEvaluator for ClampEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext) -> Result<(), GraphError> {
        let inputs = [
            (ctx.input_values("value"), ctx.input_default("value")),
            (ctx.input_values("min"), ctx.input_default("min")),
            (ctx.input_values("max"), ctx.input_default("max")),
        ];
        let results = broadcast(&inputs, |args| {
            let value = scalar_arg(&args[0], "value")?;
            let min = scalar_arg(&args[1], "min")?;
            let max = scalar_arg(&args[2], "max")?;
            Ok(PinValue::Scalar(value.max(min).min(max)))
        })?;
        ctx.set_output("result", pack(results));
        Ok(())
    }
}
