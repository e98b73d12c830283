//! Persisted custom node definitions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GraphError;
use crate::model::connection::{PinDataType, PinDefinition};
use crate::model::property::{PropertyDefinition, PropertyValue};

/// Declaration of one input or output port on a custom node type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortSpec {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub data_type: PinDataType,
    #[serde(default)]
    pub default_value: Option<PropertyValue>,
    #[serde(default = "default_true")]
    pub allows_fan_in: bool,
}

fn default_true() -> bool {
    true
}

impl PortSpec {
    pub fn new(name: &str, data_type: PinDataType) -> Self {
        Self {
            name: name.to_string(),
            label: String::new(),
            data_type,
            default_value: None,
            allows_fan_in: true,
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn with_default(mut self, value: PropertyValue) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn single_connection(mut self) -> Self {
        self.allows_fan_in = false;
        self
    }

    fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.name
        } else {
            &self.label
        }
    }

    pub(crate) fn to_input_definition(&self) -> PinDefinition {
        let mut definition = PinDefinition::input(&self.name, self.display_label(), self.data_type);
        if let Some(value) = &self.default_value {
            definition = definition.with_default(value.clone());
        }
        if !self.allows_fan_in {
            definition = definition.single_connection();
        }
        definition
    }

    pub(crate) fn to_output_definition(&self) -> PinDefinition {
        PinDefinition::output(&self.name, self.display_label(), self.data_type)
    }
}

/// A runtime-authored node type, stored as data: ports, properties, and the
/// body source text compiled at registration.
///
/// Every field except `name` and `evaluateCode` tolerates absence when
/// parsing, so imports of hand-written JSON degrade to defaults instead of
/// failing in the parser; [`CustomNodeDefinition::validate`] reports the
/// genuinely required fields by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomNodeDefinition {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Type name, also the registry key. Must be a bare identifier so
    /// bodies and port references can name it.
    #[serde(default)]
    pub name: String,
    /// Display name; falls back to `name` when empty.
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub inputs: Vec<PortSpec>,
    #[serde(default)]
    pub outputs: Vec<PortSpec>,
    #[serde(default)]
    pub properties: Vec<PropertyDefinition>,
    /// Body source text, compiled when the type is registered.
    #[serde(default)]
    pub evaluate_code: String,
    #[serde(default = "default_version")]
    pub version: String,
    /// Unix epoch milliseconds, stamped on create.
    #[serde(default)]
    pub created_at: u64,
    /// Unix epoch milliseconds, stamped on every update.
    #[serde(default)]
    pub updated_at: u64,
}

fn default_category() -> String {
    "Custom".to_string()
}

fn default_version() -> String {
    "1.0.0".to_string()
}

impl CustomNodeDefinition {
    pub fn new(name: &str, label: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            label: label.to_string(),
            category: default_category(),
            icon: String::new(),
            description: String::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            properties: Vec::new(),
            evaluate_code: String::new(),
            version: default_version(),
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn with_icon(mut self, icon: &str) -> Self {
        self.icon = icon.to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_inputs(mut self, inputs: Vec<PortSpec>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<PortSpec>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_properties(mut self, properties: Vec<PropertyDefinition>) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_code(mut self, code: &str) -> Self {
        self.evaluate_code = code.to_string();
        self
    }

    /// Check the invariants persistence and registration rely on. Runs
    /// before any registry or storage mutation.
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.name.is_empty() {
            return Err(GraphError::validation(
                "Custom node definition is missing required field 'name'",
            ));
        }
        if !is_bare_identifier(&self.name) {
            return Err(GraphError::validation(format!(
                "Custom node name '{}' is not a valid identifier",
                self.name
            )));
        }
        if self.evaluate_code.trim().is_empty() {
            return Err(GraphError::validation(
                "Custom node definition is missing required field 'evaluateCode'",
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for port in self.inputs.iter().chain(self.outputs.iter()) {
            if !is_bare_identifier(&port.name) {
                return Err(GraphError::validation(format!(
                    "Port name '{}' is not a valid identifier",
                    port.name
                )));
            }
            if !seen.insert(port.name.clone()) {
                return Err(GraphError::validation(format!(
                    "Duplicate port name '{}'",
                    port.name
                )));
            }
        }
        for property in &self.properties {
            if !is_bare_identifier(&property.name) {
                return Err(GraphError::validation(format!(
                    "Property name '{}' is not a valid identifier",
                    property.name
                )));
            }
        }
        Ok(())
    }
}

/// True for names of the form `[A-Za-z_][A-Za-z0-9_]*`.
fn is_bare_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
