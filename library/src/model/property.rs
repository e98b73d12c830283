use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use ordered_float::OrderedFloat;

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub struct Vec2 {
    pub x: OrderedFloat<f64>,
    pub y: OrderedFloat<f64>,
}

impl Vec2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: OrderedFloat(x),
            y: OrderedFloat(y),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub struct Vec3 {
    pub x: OrderedFloat<f64>,
    pub y: OrderedFloat<f64>,
    pub z: OrderedFloat<f64>,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x: OrderedFloat(x),
            y: OrderedFloat(y),
            z: OrderedFloat(z),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0,
        g: 0,
        b: 0,
        a: 255,
    };
}

impl Default for Color {
    fn default() -> Self {
        Self {
            r: 255,
            g: 255,
            b: 255,
            a: 255,
        }
    }
}

/// A serializable property value. Used for node properties, port defaults,
/// and everything else that ends up in a persisted document.
///
/// Untagged, so documents stay plain JSON. Variant order matters for
/// deserialization: `Integer` before `Number` keeps whole numbers intact,
/// `Vec3` before `Vec2` so a `{x, y, z}` object is not a `Vec2` with an
/// ignored `z`.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
#[serde(untagged)]
pub enum PropertyValue {
    Integer(i64),
    Number(OrderedFloat<f64>),
    String(String),
    Boolean(bool),
    Vec3(Vec3),
    Vec2(Vec2),
    Color(Color),
    Array(Vec<PropertyValue>),
    Map(HashMap<String, PropertyValue>),
}

impl Default for PropertyValue {
    fn default() -> Self {
        PropertyValue::Number(OrderedFloat(0.0))
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Number(OrderedFloat(value))
    }
}

impl From<f32> for PropertyValue {
    fn from(value: f32) -> Self {
        PropertyValue::Number(OrderedFloat(value as f64))
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

impl From<Vec2> for PropertyValue {
    fn from(value: Vec2) -> Self {
        PropertyValue::Vec2(value)
    }
}

impl From<Vec3> for PropertyValue {
    fn from(value: Vec3) -> Self {
        PropertyValue::Vec3(value)
    }
}

impl From<Color> for PropertyValue {
    fn from(value: Color) -> Self {
        PropertyValue::Color(value)
    }
}

// Define a trait for type-safe extraction from PropertyValue
pub trait TryGetProperty<T> {
    fn try_get(p: &PropertyValue) -> Option<T>;
}

// Implement for f64
impl TryGetProperty<f64> for f64 {
    fn try_get(p: &PropertyValue) -> Option<f64> {
        match p {
            PropertyValue::Number(v) => Some(v.into_inner()),
            PropertyValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }
}

// Implement for f32
impl TryGetProperty<f32> for f32 {
    fn try_get(p: &PropertyValue) -> Option<f32> {
        match p {
            PropertyValue::Number(v) => Some(v.into_inner() as f32),
            PropertyValue::Integer(v) => Some(*v as f32),
            _ => None,
        }
    }
}

// Implement for i64
impl TryGetProperty<i64> for i64 {
    fn try_get(p: &PropertyValue) -> Option<i64> {
        match p {
            PropertyValue::Integer(v) => Some(*v),
            PropertyValue::Number(v) => {
                // Only convert if it's a whole number and fits in i64
                if v.fract().abs() < f64::EPSILON
                    && *v >= OrderedFloat(i64::MIN as f64)
                    && *v <= OrderedFloat(i64::MAX as f64)
                {
                    Some(v.into_inner() as i64)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

// Implement for String
impl TryGetProperty<String> for String {
    fn try_get(p: &PropertyValue) -> Option<String> {
        match p {
            PropertyValue::String(v) => Some(v.clone()),
            _ => None,
        }
    }
}

// Implement for bool
impl TryGetProperty<bool> for bool {
    fn try_get(p: &PropertyValue) -> Option<bool> {
        match p {
            PropertyValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }
}

// Implement for Vec<PropertyValue>
impl TryGetProperty<Vec<PropertyValue>> for Vec<PropertyValue> {
    fn try_get(p: &PropertyValue) -> Option<Vec<PropertyValue>> {
        match p {
            PropertyValue::Array(v) => Some(v.clone()),
            _ => None,
        }
    }
}

// Implement for Vec2
impl TryGetProperty<Vec2> for Vec2 {
    fn try_get(p: &PropertyValue) -> Option<Vec2> {
        match p {
            PropertyValue::Vec2(v) => Some(*v),
            _ => None,
        }
    }
}

// Implement for Vec3
impl TryGetProperty<Vec3> for Vec3 {
    fn try_get(p: &PropertyValue) -> Option<Vec3> {
        match p {
            PropertyValue::Vec3(v) => Some(*v),
            _ => None,
        }
    }
}

// Implement for Color
impl TryGetProperty<Color> for Color {
    fn try_get(p: &PropertyValue) -> Option<Color> {
        match p {
            PropertyValue::Color(v) => Some(*v),
            _ => None,
        }
    }
}

impl PropertyValue {
    pub fn get_as<T: TryGetProperty<T>>(&self) -> Option<T> {
        T::try_get(self)
    }
}

/// UI hint for editing a property. Carries no runtime meaning.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyUiType {
    Float { min: f64, max: f64, step: f64 },
    Integer { min: i64, max: i64 },
    Text,
    MultilineText,
    Bool,
    Dropdown { options: Vec<String> },
    Vec2,
    Vec3,
    Color,
}

impl Default for PropertyUiType {
    fn default() -> Self {
        PropertyUiType::Text
    }
}

/// Declared property of a node type: name, editing hint, and default value.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDefinition {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub ui_type: PropertyUiType,
    #[serde(default)]
    pub default_value: PropertyValue,
}

impl PropertyDefinition {
    pub fn new(
        name: &str,
        label: &str,
        ui_type: PropertyUiType,
        default_value: PropertyValue,
    ) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            ui_type,
            default_value,
        }
    }

    pub fn float(name: &str, label: &str, default: f64, min: f64, max: f64, step: f64) -> Self {
        Self::new(
            name,
            label,
            PropertyUiType::Float { min, max, step },
            PropertyValue::from(default),
        )
    }

    pub fn text(name: &str, label: &str, default: &str) -> Self {
        Self::new(name, label, PropertyUiType::Text, PropertyValue::from(default))
    }
}

/// Property values of a node instance, keyed by property name.
#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Eq, Debug)]
#[serde(transparent)]
pub struct PropertyMap {
    properties: HashMap<String, PropertyValue>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self {
            properties: HashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    pub fn set(&mut self, key: String, value: PropertyValue) {
        self.properties.insert(key, value);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.properties.iter()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|pv| pv.get_as::<f64>())
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|pv| pv.get_as::<i64>())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|pv| pv.get_as::<bool>())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|pv| pv.get_as::<String>())
    }
}
