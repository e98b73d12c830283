//! PinValue — the typed value flowing through ports during evaluation.

use crate::model::property::{Color, PropertyValue};

/// The value carried by a node's output port.
///
/// Each variant corresponds to a `PinDataType` and holds the concrete
/// runtime value for that type. Unlike `PropertyValue`, pin values are
/// transient and never serialized.
#[derive(Clone, Debug, PartialEq)]
pub enum PinValue {
    /// Single floating-point number.
    Scalar(f64),
    /// Integer.
    Integer(i64),
    /// Boolean.
    Boolean(bool),
    /// Text string.
    String(String),
    /// 2D vector.
    Vec2(f64, f64),
    /// 3D vector.
    Vec3(f64, f64, f64),
    /// RGBA color.
    Color(Color),
    /// Ordered collection, produced by fan-in broadcasting.
    List(Vec<PinValue>),
    /// No value / unconnected pin.
    None,
}

impl PinValue {
    /// Extract as scalar, returning default if not numeric.
    pub fn as_scalar(&self, default: f64) -> f64 {
        match self {
            PinValue::Scalar(v) => *v,
            PinValue::Integer(v) => *v as f64,
            _ => default,
        }
    }

    /// Extract as scalar if the value is numeric. Booleans coerce to 0 or 1.
    pub fn to_scalar(&self) -> Option<f64> {
        match self {
            PinValue::Scalar(v) => Some(*v),
            PinValue::Integer(v) => Some(*v as f64),
            PinValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Extract as String.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            PinValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, PinValue::None)
    }

    /// Flatten into list elements: a `List` yields its items, `None` yields
    /// nothing, and any other value yields itself.
    pub fn into_list(self) -> Vec<PinValue> {
        match self {
            PinValue::List(items) => items,
            PinValue::None => vec![],
            other => vec![other],
        }
    }
}

impl From<&PropertyValue> for PinValue {
    fn from(value: &PropertyValue) -> Self {
        match value {
            PropertyValue::Number(n) => PinValue::Scalar(n.into_inner()),
            PropertyValue::Integer(i) => PinValue::Integer(*i),
            PropertyValue::String(s) => PinValue::String(s.clone()),
            PropertyValue::Boolean(b) => PinValue::Boolean(*b),
            PropertyValue::Vec2(v) => PinValue::Vec2(v.x.into_inner(), v.y.into_inner()),
            PropertyValue::Vec3(v) => {
                PinValue::Vec3(v.x.into_inner(), v.y.into_inner(), v.z.into_inner())
            }
            PropertyValue::Color(c) => PinValue::Color(*c),
            PropertyValue::Array(items) => PinValue::List(items.iter().map(PinValue::from).collect()),
            // Maps have no runtime pin representation.
            PropertyValue::Map(_) => PinValue::None,
        }
    }
}

impl From<PropertyValue> for PinValue {
    fn from(value: PropertyValue) -> Self {
        PinValue::from(&value)
    }
}
