pub mod custom;
pub mod error;
pub mod graph;
pub mod model;
pub mod registry;

pub use error::GraphError;
pub use graph::Graph;

use registry::builtin::register_builtin_nodes;
use registry::NodeRegistry;

/// A registry preloaded with the built-in node types.
pub fn create_node_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    register_builtin_nodes(&mut registry);
    registry
}
