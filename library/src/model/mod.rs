pub mod connection;
pub mod pin_value;
pub mod property;

pub use connection::{Connection, PinDataType, PinDefinition, PinId};
pub use pin_value::PinValue;
pub use property::{
    Color, PropertyDefinition, PropertyMap, PropertyUiType, PropertyValue, Vec2, Vec3,
};
