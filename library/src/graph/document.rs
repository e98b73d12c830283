//! Graph documents: JSON persistence of nodes and connections.
//!
//! A document stores structure and data (ids, types, labels, properties,
//! input defaults, connections), never runtime state. Loading rebuilds every
//! node through the registry, so loaded graphs start fully dirty and the
//! first pass recomputes all values.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GraphError;
use crate::graph::Graph;
use crate::model::connection::Connection;
use crate::model::property::{PropertyMap, PropertyValue};
use crate::registry::NodeRegistry;

const DOCUMENT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphDocument {
    version: u32,
    nodes: Vec<NodeRecord>,
    connections: Vec<Connection>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeRecord {
    id: Uuid,
    #[serde(rename = "type")]
    type_id: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    properties: PropertyMap,
    #[serde(default)]
    input_defaults: HashMap<String, PropertyValue>,
}

impl Graph {
    pub fn save(&self) -> Result<String, GraphError> {
        let nodes = self
            .nodes()
            .map(|node| NodeRecord {
                id: node.id,
                type_id: node.type_id.clone(),
                label: node.label.clone(),
                properties: node.properties.clone(),
                input_defaults: node
                    .inputs()
                    .iter()
                    .filter_map(|port| {
                        port.definition
                            .default_value
                            .clone()
                            .map(|value| (port.definition.name.clone(), value))
                    })
                    .collect(),
            })
            .collect();

        let document = GraphDocument {
            version: DOCUMENT_VERSION,
            nodes,
            connections: self.connections().to_vec(),
        };
        Ok(serde_json::to_string(&document)?)
    }

    /// Rebuild a graph from a saved document. Every node type must be present
    /// in the registry.
    pub fn load(json_str: &str, registry: &NodeRegistry) -> Result<Self, GraphError> {
        let document: GraphDocument = serde_json::from_str(json_str)?;
        if document.version != DOCUMENT_VERSION {
            return Err(GraphError::validation(format!(
                "Unsupported graph document version {}",
                document.version
            )));
        }

        let mut graph = Graph::new();
        for record in document.nodes {
            let mut node = registry.create_node(&record.type_id, Some(record.id)).ok_or_else(
                || GraphError::validation(format!("Unknown node type '{}'", record.type_id)),
            )?;
            if !record.label.is_empty() {
                node.label = record.label;
            }
            for (name, value) in record.properties.iter() {
                node.properties.set(name.clone(), value.clone());
            }
            for (pin_name, value) in record.input_defaults {
                if let Some(port) = node.input_mut(&pin_name) {
                    port.definition.default_value = Some(value);
                }
            }
            graph.add_node(node)?;
        }

        for connection in document.connections {
            graph.insert_connection(connection)?;
        }
        Ok(graph)
    }
}
