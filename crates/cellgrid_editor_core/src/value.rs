// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed attribute values and their textual literal form.
//!
//! Values are written and read as RON literals, one per field. Decoding is a
//! pure parse: nothing in a scene file is ever executed.

use crate::entity::EntityId;
use crate::math::Transform;
use glam::{Vec2, Vec3, Vec4};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tolerance used when comparing numeric values against type defaults.
pub const VALUE_EPSILON: f32 = 1e-5;

/// Errors produced while encoding or decoding a literal.
#[derive(Debug, Error)]
pub enum ValueError {
    /// The text is not a valid literal
    #[error("invalid literal `{text}`: {source}")]
    Decode {
        /// Offending text
        text: String,
        /// Parser error
        #[source]
        source: ron::error::SpannedError,
    },

    /// The value could not be written
    #[error("failed to encode value: {0}")]
    Encode(#[from] ron::Error),
}

/// An ordered set of named attribute values.
pub type AttributeMap = IndexMap<String, Value>;

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    /// Absent / null
    #[default]
    None,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point
    Float(f32),
    /// Text
    Str(String),
    /// 2-vector
    Vec2(Vec2),
    /// 3-vector
    Vec3(Vec3),
    /// RGBA colour, components in `0..=1`
    Color(Vec4),
    /// Heterogeneous tuple
    Tuple(Vec<Value>),
    /// Full transform (used by undo records)
    Transform(Transform),
    /// Reference to another entity (used by undo records)
    Entity(EntityId),
}

impl Value {
    /// Encode as a single-line literal.
    pub fn encode(&self) -> Result<String, ValueError> {
        Ok(ron::to_string(self)?)
    }

    /// Decode a literal.
    pub fn decode(text: &str) -> Result<Self, ValueError> {
        ron::from_str(text.trim()).map_err(|source| ValueError::Decode {
            text: text.to_string(),
            source,
        })
    }

    /// Decode a literal, keeping the raw text as a string on failure.
    ///
    /// The second element is `false` when the fallback was taken.
    pub fn decode_or_raw(text: &str) -> (Self, bool) {
        match Self::decode(text) {
            Ok(value) => (value, true),
            Err(err) => {
                tracing::debug!("Keeping raw field text: {}", err);
                (Self::Str(text.to_string()), false)
            }
        }
    }

    /// Whether this is [`Value::None`].
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Borrow as a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Read as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Read as a 3-vector. A single number is splatted.
    pub fn as_vec3(&self) -> Option<Vec3> {
        match self {
            Self::Vec3(v) => Some(*v),
            Self::Float(f) => Some(Vec3::splat(*f)),
            Self::Int(i) => Some(Vec3::splat(*i as f32)),
            Self::Tuple(items) if items.len() == 3 => {
                let mut out = [0.0; 3];
                for (slot, item) in out.iter_mut().zip(items) {
                    *slot = item.as_f32()?;
                }
                Some(Vec3::from(out))
            }
            _ => None,
        }
    }

    /// Read as a float.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f32),
            _ => None,
        }
    }

    /// Read as an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Equality with numeric tolerance.
    pub fn approx_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Float(a), Self::Float(b)) => (a - b).abs() <= VALUE_EPSILON,
            (Self::Vec2(a), Self::Vec2(b)) => a.abs_diff_eq(*b, VALUE_EPSILON),
            (Self::Vec3(a), Self::Vec3(b)) => a.abs_diff_eq(*b, VALUE_EPSILON),
            (Self::Color(a), Self::Color(b)) => a.abs_diff_eq(*b, VALUE_EPSILON),
            (Self::Transform(a), Self::Transform(b)) => a.approx_eq(b, VALUE_EPSILON),
            (Self::Tuple(a), Self::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.approx_eq(y))
            }
            _ => self == other,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Vec3> for Value {
    fn from(value: Vec3) -> Self {
        Self::Vec3(value)
    }
}

/// Build an RGBA colour from hue (degrees), saturation and value.
pub fn hsv(hue: f32, saturation: f32, value: f32) -> Vec4 {
    let h = hue.rem_euclid(360.0) / 60.0;
    let c = value * saturation;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let m = value - c;
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    Vec4::new(r + m, g + m, b + m, 1.0)
}

/// Split one delimited row into its raw fields.
///
/// Delimiters inside double-quoted strings are ignored; backslash escapes
/// inside strings are kept verbatim for the literal decoder.
pub fn split_row(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut escaped = false;

    for ch in line.chars() {
        if in_string {
            current.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        if ch == delimiter {
            fields.push(std::mem::take(&mut current));
        } else {
            if ch == '"' {
                in_string = true;
            }
            current.push(ch);
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_literals() {
        assert_eq!(Value::decode("Float(1.5)").unwrap(), Value::Float(1.5));
        assert_eq!(Value::decode("Bool(true)").unwrap(), Value::Bool(true));
        assert_eq!(
            Value::decode("Str(\"brick\")").unwrap(),
            Value::Str("brick".into())
        );
        assert_eq!(
            Value::decode(" Vec3((1.0, 2.0, -3.0)) ").unwrap(),
            Value::Vec3(Vec3::new(1.0, 2.0, -3.0))
        );
        assert_eq!(Value::decode("None").unwrap(), Value::None);
    }

    #[test]
    fn test_encode_decode_nested() {
        let value = Value::Tuple(vec![
            Value::Int(3),
            Value::Str("a;b".into()),
            Value::Color(Vec4::new(1.0, 0.0, 0.0, 1.0)),
        ]);
        let text = value.encode().unwrap();
        assert!(!text.contains('\n'));
        assert_eq!(Value::decode(&text).unwrap(), value);
    }

    #[test]
    fn test_invalid_literal_falls_back_to_raw() {
        assert!(Value::decode("lit_with_shadows_shader").is_err());
        let (value, ok) = Value::decode_or_raw("lit_with_shadows_shader");
        assert!(!ok);
        assert_eq!(value, Value::Str("lit_with_shadows_shader".into()));
    }

    #[test]
    fn test_split_row_respects_strings() {
        let fields = split_row("WhiteCube;Str(\"a;b\");;Float(2.0)", ';');
        assert_eq!(fields, vec!["WhiteCube", "Str(\"a;b\")", "", "Float(2.0)"]);

        let escaped = split_row("Str(\"say \\\"hi;\\\"\");x", ';');
        assert_eq!(escaped.len(), 2);
        assert_eq!(escaped[1], "x");
    }

    #[test]
    fn test_approx_eq_and_accessors() {
        assert!(Value::Float(1.0).approx_eq(&Value::Float(1.000_001)));
        assert!(!Value::Float(1.0).approx_eq(&Value::Float(1.1)));
        assert_eq!(Value::Float(2.0).as_vec3(), Some(Vec3::splat(2.0)));
        assert_eq!(
            Value::Tuple(vec![Value::Int(1), Value::Float(2.0), Value::Int(3)]).as_vec3(),
            Some(Vec3::new(1.0, 2.0, 3.0))
        );
        assert_eq!(Value::Str("x".into()).as_vec3(), None);
    }

    #[test]
    fn test_hsv() {
        let red = hsv(0.0, 1.0, 1.0);
        assert!(red.abs_diff_eq(Vec4::new(1.0, 0.0, 0.0, 1.0), 1e-6));
        let grey = hsv(20.0, 0.0, 0.5);
        assert!(grey.abs_diff_eq(Vec4::new(0.5, 0.5, 0.5, 1.0), 1e-6));
    }
}
