//! The data-flow graph and its evaluation machinery.

pub mod broadcast;
pub mod context;
pub mod node;

mod analysis;
mod document;
mod evaluator;

pub use evaluator::PassSummary;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::{debug, warn};
use uuid::Uuid;

use crate::error::GraphError;
use crate::graph::context::NodeEvaluator;
use crate::graph::evaluator::Evaluator;
use crate::graph::node::Node;
use crate::model::connection::{Connection, PinId};
use crate::model::pin_value::PinValue;
use crate::model::property::PropertyValue;

/// The data-flow graph: nodes, connections, and dirty-tracking state.
///
/// All mutation goes through this type so that dirty propagation, evaluation
/// order invalidation, and change notification stay consistent. Readers get
/// shared references only.
pub struct Graph {
    nodes: HashMap<Uuid, Node>,
    /// Insertion order; keeps passes and saved documents deterministic.
    node_order: Vec<Uuid>,
    connections: Vec<Connection>,
    evaluator: Evaluator,
    change_listener: Option<Box<dyn FnMut()>>,
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("node_order", &self.node_order)
            .field("connections", &self.connections)
            .finish_non_exhaustive()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            node_order: Vec::new(),
            connections: Vec::new(),
            evaluator: Evaluator::new(),
            change_listener: None,
        }
    }

    pub fn node(&self, id: Uuid) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Node ids in insertion order.
    pub fn node_ids(&self) -> Vec<Uuid> {
        self.node_order.clone()
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.node_order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Current value of a node's output port, `PinValue::None` if the node or
    /// port is unknown or has not been evaluated yet.
    pub fn output_value(&self, node_id: Uuid, pin_name: &str) -> PinValue {
        self.node(node_id)
            .map(|node| node.output_value(pin_name))
            .unwrap_or(PinValue::None)
    }

    /// Add a node. The node enters the graph dirty and is picked up by the
    /// next pass.
    pub fn add_node(&mut self, node: Node) -> Result<Uuid, GraphError> {
        let id = node.id;
        if self.nodes.contains_key(&id) {
            return Err(GraphError::validation(format!("Node {} already exists", id)));
        }
        debug!("Graph: added node '{}' ({})", node.label, node.type_id);
        self.nodes.insert(id, node);
        self.node_order.push(id);
        self.evaluator.invalidate_order();
        self.mark_dirty(id);
        self.trigger_change();
        Ok(id)
    }

    /// Remove a node, disconnecting every edge that touches it and releasing
    /// its tracked resources. Downstream targets are marked dirty.
    pub fn remove_node(&mut self, id: Uuid) -> Result<(), GraphError> {
        if !self.nodes.contains_key(&id) {
            return Err(GraphError::validation(format!("Node {} not found", id)));
        }

        let removed: Vec<Connection> = self
            .connections
            .iter()
            .filter(|c| c.from.node_id == id || c.to.node_id == id)
            .cloned()
            .collect();
        self.connections
            .retain(|c| c.from.node_id != id && c.to.node_id != id);
        self.evaluator.invalidate_order();

        for conn in &removed {
            if conn.from.node_id == id {
                self.mark_dirty(conn.to.node_id);
            }
        }

        if let Some(mut node) = self.nodes.remove(&id) {
            debug!("Graph: removed node '{}' ({})", node.label, node.type_id);
            node.dispose();
        }
        self.node_order.retain(|&n| n != id);
        self.evaluator.forget(id);
        self.trigger_change();
        Ok(())
    }

    /// Connect an output pin to an input pin. Validates both endpoints,
    /// fan-in constraints, and acyclicity; on success the target node is
    /// marked dirty.
    pub fn connect(
        &mut self,
        source: Uuid,
        output: &str,
        target: Uuid,
        input: &str,
    ) -> Result<Uuid, GraphError> {
        let connection = Connection::new(PinId::new(source, output), PinId::new(target, input));
        let id = connection.id;
        self.insert_connection(connection)?;
        self.mark_dirty(target);
        self.trigger_change();
        Ok(id)
    }

    pub(crate) fn insert_connection(&mut self, connection: Connection) -> Result<(), GraphError> {
        analysis::validate_connection(self, &connection)?;
        debug!(
            "Graph: connected {}.{} -> {}.{}",
            connection.from.node_id,
            connection.from.pin_name,
            connection.to.node_id,
            connection.to.pin_name
        );
        self.connections.push(connection);
        self.evaluator.invalidate_order();
        Ok(())
    }

    /// Remove a connection by id, marking the target node dirty.
    pub fn disconnect(&mut self, connection_id: Uuid) -> Result<(), GraphError> {
        let index = self
            .connections
            .iter()
            .position(|c| c.id == connection_id)
            .ok_or_else(|| {
                GraphError::validation(format!("Connection {} not found", connection_id))
            })?;
        let connection = self.connections.remove(index);
        debug!(
            "Graph: disconnected {}.{} -> {}.{}",
            connection.from.node_id,
            connection.from.pin_name,
            connection.to.node_id,
            connection.to.pin_name
        );
        self.evaluator.invalidate_order();
        self.mark_dirty(connection.to.node_id);
        self.trigger_change();
        Ok(())
    }

    /// Set a node property and mark the node dirty.
    pub fn set_property(
        &mut self,
        id: Uuid,
        name: &str,
        value: PropertyValue,
    ) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or_else(|| GraphError::validation(format!("Node {} not found", id)))?;
        node.properties.set(name.to_string(), value);
        self.mark_dirty(id);
        self.trigger_change();
        Ok(())
    }

    /// Override the default value of an input pin and mark the node dirty.
    pub fn set_input_default(
        &mut self,
        id: Uuid,
        pin_name: &str,
        value: PropertyValue,
    ) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or_else(|| GraphError::validation(format!("Node {} not found", id)))?;
        let port = node.input_mut(pin_name).ok_or_else(|| {
            GraphError::validation(format!("Node {} has no input pin '{}'", id, pin_name))
        })?;
        port.definition.default_value = Some(value);
        self.mark_dirty(id);
        self.trigger_change();
        Ok(())
    }

    /// Rename a node. Labels carry no evaluation meaning, so the node stays
    /// clean; observers are still notified.
    pub fn set_label(&mut self, id: Uuid, label: &str) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or_else(|| GraphError::validation(format!("Node {} not found", id)))?;
        node.label = label.to_string();
        self.trigger_change();
        Ok(())
    }

    /// Mark a node and its entire downstream closure dirty. Marking is
    /// monotonic within a pass: once marked, a node stays marked until it is
    /// evaluated.
    pub fn mark_dirty(&mut self, id: Uuid) {
        if !self.nodes.contains_key(&id) {
            warn!("Graph: mark_dirty on unknown node {}", id);
            return;
        }
        if self.evaluator.is_marked(id) {
            return;
        }
        let mut affected = vec![id];
        affected.extend(analysis::downstream_closure(self, id));
        for node_id in affected {
            self.evaluator.mark(node_id);
            if let Some(node) = self.nodes.get_mut(&node_id) {
                node.set_dirty(true);
            }
        }
    }

    /// True if any node is waiting to be evaluated.
    pub fn needs_evaluation(&self) -> bool {
        self.evaluator.has_marks()
    }

    /// Swap the behavior of every node of the given type in place. Identity,
    /// ports, connections, and property values are untouched; each affected
    /// node is marked dirty. Returns the ids of the updated nodes.
    pub(crate) fn replace_behavior_for_type(
        &mut self,
        type_id: &str,
        behavior: Arc<dyn NodeEvaluator>,
    ) -> Vec<Uuid> {
        let ids: Vec<Uuid> = self
            .node_order
            .iter()
            .filter(|id| {
                self.nodes
                    .get(id)
                    .map(|node| node.type_id == type_id)
                    .unwrap_or(false)
            })
            .copied()
            .collect();
        for id in &ids {
            if let Some(node) = self.nodes.get_mut(id) {
                node.replace_behavior(Arc::clone(&behavior));
            }
            self.mark_dirty(*id);
        }
        ids
    }

    /// Register the observer called after every change to the graph. Replaces
    /// any previous listener.
    pub fn set_change_listener<F: FnMut() + 'static>(&mut self, listener: F) {
        self.change_listener = Some(Box::new(listener));
    }

    /// Notify the registered observer. Called automatically after structural
    /// edits, property edits, and at the end of every evaluation pass.
    pub fn trigger_change(&mut self) {
        if let Some(listener) = self.change_listener.as_mut() {
            listener();
        }
    }

    /// Release the tracked resources of every node. Idempotent.
    pub fn dispose(&mut self) {
        for node in self.nodes.values_mut() {
            node.dispose();
        }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
