//! Connection model for the data-flow graph.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::pin_value::PinValue;
use crate::model::property::PropertyValue;

/// Data type for a pin.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PinDataType {
    /// Floating point scalar (f64)
    Scalar,
    /// Integer value (i64)
    Integer,
    /// Boolean value
    Boolean,
    /// Text string
    String,
    /// 2D vector
    Vec2,
    /// 3D vector
    Vec3,
    /// RGBA color
    Color,
    /// List/array of values
    List,
    /// Accepts any type (generic)
    Any,
}

impl PinDataType {
    /// Zero-equivalent used for an unconnected input with no declared default.
    pub fn zero_value(&self) -> PinValue {
        match self {
            PinDataType::Scalar => PinValue::Scalar(0.0),
            PinDataType::Integer => PinValue::Integer(0),
            PinDataType::Boolean => PinValue::Boolean(false),
            PinDataType::String => PinValue::String(String::new()),
            PinDataType::Vec2 => PinValue::Vec2(0.0, 0.0),
            PinDataType::Vec3 => PinValue::Vec3(0.0, 0.0, 0.0),
            PinDataType::Color => PinValue::Color(crate::model::property::Color::BLACK),
            PinDataType::List => PinValue::List(vec![]),
            PinDataType::Any => PinValue::None,
        }
    }
}

impl Default for PinDataType {
    fn default() -> Self {
        PinDataType::Any
    }
}

/// Definition of a pin on a node type.
#[derive(Clone, Debug)]
pub struct PinDefinition {
    /// Internal name used for connections (e.g. "value", "a")
    pub name: String,
    /// Display name shown when browsing types (e.g. "Value", "A")
    pub display_name: String,
    /// Data type of this pin
    pub data_type: PinDataType,
    /// Default value when no connection is present (for input pins)
    pub default_value: Option<PropertyValue>,
    /// Whether an input pin accepts multiple incoming connections
    pub allows_fan_in: bool,
}

impl PinDefinition {
    pub fn input(name: &str, display_name: &str, data_type: PinDataType) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            data_type,
            default_value: None,
            allows_fan_in: true,
        }
    }

    pub fn output(name: &str, display_name: &str, data_type: PinDataType) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            data_type,
            default_value: None,
            allows_fan_in: false,
        }
    }

    pub fn with_default(mut self, value: PropertyValue) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Restrict an input pin to a single incoming connection.
    pub fn single_connection(mut self) -> Self {
        self.allows_fan_in = false;
        self
    }

    /// Default if declared, otherwise the zero-equivalent of the pin's type.
    pub fn fallback_value(&self) -> PinValue {
        match &self.default_value {
            Some(value) => PinValue::from(value),
            None => self.data_type.zero_value(),
        }
    }
}

/// Identifies a specific pin on a specific node.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PinId {
    pub node_id: Uuid,
    pub pin_name: String,
}

impl PinId {
    pub fn new(node_id: Uuid, pin_name: &str) -> Self {
        Self {
            node_id,
            pin_name: pin_name.to_string(),
        }
    }
}

/// A connection between two pins (an edge in the data-flow graph).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Connection {
    pub id: Uuid,
    /// Source pin (output)
    pub from: PinId,
    /// Destination pin (input)
    pub to: PinId,
}

impl Connection {
    pub fn new(from: PinId, to: PinId) -> Self {
        Self {
            id: Uuid::new_v4(),
            from,
            to,
        }
    }
}
