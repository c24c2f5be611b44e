//! Reflected Properties
//!
//! Script-visible property values and the generic attribute reflection
//! used by the HTML element classes. A reflected property has no storage
//! of its own: the getter reads the attribute and the setter writes it.

use std::borrow::Cow;
use std::fmt;

use crate::attributes::ElementAttributes;
use crate::document::Document;
use crate::{DomResult, NodeIndex};

/// Dynamically typed property value
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
}

impl PropertyValue {
    /// Truthiness
    pub fn as_bool(&self) -> bool {
        match self {
            Self::Str(value) => !value.is_empty(),
            Self::Num(value) => *value != 0.0 && !value.is_nan(),
            Self::Bool(value) => *value,
            Self::Null => false,
        }
    }

    /// Numeric conversion, `NaN` when the value is not a number
    pub fn as_number(&self) -> f64 {
        match self {
            Self::Str(value) => parse_number(value),
            Self::Num(value) => *value,
            Self::Bool(value) => f64::from(u8::from(*value)),
            Self::Null => 0.0,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(value) => f.write_str(value),
            Self::Num(value) => f.write_str(&format_number(*value)),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Null => f.write_str("null"),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Num(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        Self::Num(f64::from(value))
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Format a number the way script stringifies it: integral values carry
/// no fraction.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if value == value.trunc() && value.abs() < 1e21 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Parse a string the way script's `Number()` does. Blank is `0`.
pub fn parse_number(value: &str) -> f64 {
    let value = value.trim();
    if value.is_empty() {
        return 0.0;
    }
    match value {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).map_or(f64::NAN, |n| n as f64);
    }
    // f64::from_str also accepts "inf" and "nan", which script does not
    if !value
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
    {
        return f64::NAN;
    }
    value.parse().unwrap_or(f64::NAN)
}

/// How a reflected property maps onto its attribute
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Reflection {
    /// Attribute text, `default` when absent or empty
    Str(&'static str),
    /// Attribute parsed as a number, `default` when absent or empty
    Num(f64),
    /// Attribute presence
    Bool,
    /// Keyword pair: `on` reads as true, anything else as false, absent
    /// reads as `default`
    Keywords { default: bool, on: &'static str, off: &'static str },
}

/// A property reflected onto an attribute
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Reflected {
    pub property: &'static str,
    attribute: Option<&'static str>,
    pub reflection: Reflection,
}

impl Reflected {
    pub const fn string(property: &'static str, default: &'static str) -> Self {
        Self { property, attribute: None, reflection: Reflection::Str(default) }
    }

    pub const fn number(property: &'static str, default: f64) -> Self {
        Self { property, attribute: None, reflection: Reflection::Num(default) }
    }

    pub const fn boolean(property: &'static str) -> Self {
        Self { property, attribute: None, reflection: Reflection::Bool }
    }

    pub const fn keywords(
        property: &'static str,
        default: bool,
        on: &'static str,
        off: &'static str,
    ) -> Self {
        Self { property, attribute: None, reflection: Reflection::Keywords { default, on, off } }
    }

    /// Reflect onto an attribute not named after the property
    pub const fn attribute(mut self, attribute: &'static str) -> Self {
        self.attribute = Some(attribute);
        self
    }

    /// The attribute name, the lower-cased property name unless overridden
    pub fn attribute_name(&self) -> Cow<'static, str> {
        match self.attribute {
            Some(attribute) => Cow::Borrowed(attribute),
            None => Cow::Owned(self.property.to_lowercase()),
        }
    }

    pub fn get(&self, document: &Document, element: NodeIndex) -> PropertyValue {
        let name = self.attribute_name();
        let value = document.get_attribute(element, &name);
        match self.reflection {
            Reflection::Keywords { default, on, .. } => {
                PropertyValue::Bool(value.map_or(default, |value| value == on))
            }
            Reflection::Bool => PropertyValue::Bool(value.is_some()),
            Reflection::Num(default) => PropertyValue::Num(match value.filter(|v| !v.is_empty()) {
                Some(value) => parse_number(&value),
                None => default,
            }),
            Reflection::Str(default) => {
                let value = value.filter(|v| !v.is_empty());
                PropertyValue::Str(value.unwrap_or_else(|| default.to_string()))
            }
        }
    }

    pub fn set(
        &self,
        document: &mut Document,
        element: NodeIndex,
        value: &PropertyValue,
    ) -> DomResult<()> {
        let name = self.attribute_name();
        match self.reflection {
            Reflection::Keywords { on, off, .. } => {
                document.set_attribute(element, &name, if value.as_bool() { on } else { off })
            }
            Reflection::Bool if value.as_bool() => document.set_attribute(element, &name, ""),
            Reflection::Bool => document.remove_attribute(element, &name),
            Reflection::Str(_) | Reflection::Num(_) => {
                document.set_attribute(element, &name, &value.to_string())
            }
        }
    }
}

/// Find `property` in a reflection table
pub(crate) fn find(table: &'static [Reflected], property: &str) -> Option<&'static Reflected> {
    table.iter().find(|reflected| reflected.property == property)
}
