//! Graph analysis utilities for the data-flow graph.
//!
//! Connection validation, cycle detection, and the topological order used by
//! the evaluator to schedule passes.

use std::collections::{HashMap, HashSet, VecDeque};
use uuid::Uuid;

use crate::error::GraphError;
use crate::graph::Graph;
use crate::model::connection::Connection;

/// Validate a connection before adding it.
///
/// Checks:
/// - Both nodes and both pins exist
/// - No self-connections
/// - No duplicate edges
/// - Single-connection pins stay single
/// - No cycles
pub(crate) fn validate_connection(graph: &Graph, conn: &Connection) -> Result<(), GraphError> {
    // Check nodes exist
    let source = graph
        .node(conn.from.node_id)
        .ok_or_else(|| GraphError::validation(format!("Source node {} not found", conn.from.node_id)))?;
    let target = graph
        .node(conn.to.node_id)
        .ok_or_else(|| GraphError::validation(format!("Destination node {} not found", conn.to.node_id)))?;

    // Check pins exist
    if source.output(&conn.from.pin_name).is_none() {
        return Err(GraphError::validation(format!(
            "Source node has no output pin '{}'",
            conn.from.pin_name
        )));
    }
    let input = target.input(&conn.to.pin_name).ok_or_else(|| {
        GraphError::validation(format!(
            "Destination node has no input pin '{}'",
            conn.to.pin_name
        ))
    })?;

    // No self-connections
    if conn.from.node_id == conn.to.node_id {
        return Err(GraphError::cycle("Cannot connect a node to itself"));
    }

    // No duplicate edges
    if graph
        .connections()
        .iter()
        .any(|c| c.from == conn.from && c.to == conn.to && c.id != conn.id)
    {
        return Err(GraphError::validation(format!(
            "{}.{} is already connected to {}.{}",
            conn.from.node_id, conn.from.pin_name, conn.to.node_id, conn.to.pin_name
        )));
    }

    // Single-connection pins accept at most one incoming edge
    if !input.definition.allows_fan_in
        && graph
            .connections()
            .iter()
            .any(|c| c.to == conn.to && c.id != conn.id)
    {
        return Err(GraphError::validation(format!(
            "Input pin {}.{} accepts a single connection",
            conn.to.node_id, conn.to.pin_name
        )));
    }

    // Check for cycles: would adding this connection create a cycle?
    if would_create_cycle(graph, conn.from.node_id, conn.to.node_id) {
        return Err(GraphError::cycle("Connection would create a cycle"));
    }

    Ok(())
}

/// Check if connecting from_node → to_node would create a cycle.
/// Returns true if to_node can already reach from_node via existing connections.
fn would_create_cycle(graph: &Graph, from_node: Uuid, to_node: Uuid) -> bool {
    // BFS from to_node: if from_node is reachable, adding from→to creates a cycle.
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(to_node);

    while let Some(current) = queue.pop_front() {
        if current == from_node {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        for conn in graph.connections() {
            if conn.from.node_id == current {
                queue.push_back(conn.to.node_id);
            }
        }
    }
    false
}

/// Every node reachable downstream of `start`, excluding `start` itself.
pub(crate) fn downstream_closure(graph: &Graph, start: Uuid) -> HashSet<Uuid> {
    let mut reached = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        for conn in graph.connections() {
            if conn.from.node_id == current && reached.insert(conn.to.node_id) {
                queue.push_back(conn.to.node_id);
            }
        }
    }
    reached.remove(&start);
    reached
}

/// Topological sort of all nodes in the graph.
///
/// Returns nodes in dependency order (sources first, sinks last), stable with
/// respect to insertion order among independent nodes. Returns Err if there's
/// a cycle, which `validate_connection` should have made impossible.
pub(crate) fn topological_sort(graph: &Graph) -> Result<Vec<Uuid>, GraphError> {
    let node_ids = graph.node_ids();
    let mut in_degree: HashMap<Uuid, usize> = HashMap::new();
    let mut adj: HashMap<Uuid, Vec<Uuid>> = HashMap::new();

    for &id in &node_ids {
        in_degree.insert(id, 0);
        adj.insert(id, Vec::new());
    }

    for conn in graph.connections() {
        if let Some(neighbors) = adj.get_mut(&conn.from.node_id) {
            neighbors.push(conn.to.node_id);
        }
        if let Some(deg) = in_degree.get_mut(&conn.to.node_id) {
            *deg += 1;
        }
    }

    // Kahn's algorithm, seeded in insertion order for deterministic passes
    let mut queue: VecDeque<Uuid> = node_ids
        .iter()
        .filter(|id| in_degree.get(id) == Some(&0))
        .copied()
        .collect();

    let mut sorted = Vec::new();

    while let Some(node) = queue.pop_front() {
        sorted.push(node);
        if let Some(neighbors) = adj.get(&node) {
            for &neighbor in neighbors {
                if let Some(deg) = in_degree.get_mut(&neighbor) {
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push_back(neighbor);
                    }
                }
            }
        }
    }

    if sorted.len() != node_ids.len() {
        return Err(GraphError::cycle("Cycle detected in graph"));
    }

    Ok(sorted)
}
