//! Built-in node types, grouped per category.
//!
//! These are the starter types every registry ships with. They exist to
//! exercise the runtime; anything richer is expected to arrive as a custom
//! node definition.

mod data;
mod math;

use crate::model::connection::{PinDataType, PinDefinition};
use crate::model::property::PropertyValue;
use crate::registry::{NodeRegistry, NodeTypeDescriptor};

// --- Helpers ---

fn inp(name: &str, display_name: &str, data_type: PinDataType) -> PinDefinition {
    PinDefinition::input(name, display_name, data_type)
}

fn inp_with_default(
    name: &str,
    display_name: &str,
    data_type: PinDataType,
    default: PropertyValue,
) -> PinDefinition {
    PinDefinition::input(name, display_name, data_type).with_default(default)
}

fn out(name: &str, display_name: &str, data_type: PinDataType) -> PinDefinition {
    PinDefinition::output(name, display_name, data_type)
}

// --- Registration ---

/// Register every built-in node type.
pub fn register_builtin_nodes(registry: &mut NodeRegistry) {
    for descriptor in all_descriptors() {
        registry.register(descriptor);
    }
}

fn all_descriptors() -> Vec<NodeTypeDescriptor> {
    let mut descriptors = Vec::new();
    descriptors.extend(data::descriptors());
    descriptors.extend(math::descriptors());
    descriptors
}
