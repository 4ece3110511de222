// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Helpers over `serde_json::Value` with JSON Schema semantics.

use core::cmp::Ordering;
use serde_json::{Number, Value};

/// The primitive JSON Schema types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PrimitiveType {
    Array = 1,
    Boolean = 1 << 1,
    Integer = 1 << 2,
    Null = 1 << 3,
    Number = 1 << 4,
    Object = 1 << 5,
    String = 1 << 6,
}

impl PrimitiveType {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "array" => PrimitiveType::Array,
            "boolean" => PrimitiveType::Boolean,
            "integer" => PrimitiveType::Integer,
            "null" => PrimitiveType::Null,
            "number" => PrimitiveType::Number,
            "object" => PrimitiveType::Object,
            "string" => PrimitiveType::String,
            _ => return None,
        })
    }

    pub const fn name(self) -> &'static str {
        match self {
            PrimitiveType::Array => "array",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Integer => "integer",
            PrimitiveType::Null => "null",
            PrimitiveType::Number => "number",
            PrimitiveType::Object => "object",
            PrimitiveType::String => "string",
        }
    }
}

/// A small bit set of [`PrimitiveType`]s, in declaration order for messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeSet {
    bits: u8,
    order: Vec<PrimitiveType>,
}

impl TypeSet {
    pub fn insert(&mut self, t: PrimitiveType) {
        if self.bits & t as u8 == 0 {
            self.bits |= t as u8;
            self.order.push(t);
        }
    }

    pub fn contains(&self, t: PrimitiveType) -> bool {
        self.bits & t as u8 != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = PrimitiveType> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Whether `value` is an instance of any member type.
    ///
    /// `legacy_integers` selects the Draft 4 rule, where `1.0` is a number but not an integer.
    pub fn matches(&self, value: &Value, legacy_integers: bool) -> bool {
        match value {
            Value::Array(_) => self.contains(PrimitiveType::Array),
            Value::Bool(_) => self.contains(PrimitiveType::Boolean),
            Value::Null => self.contains(PrimitiveType::Null),
            Value::Object(_) => self.contains(PrimitiveType::Object),
            Value::String(_) => self.contains(PrimitiveType::String),
            Value::Number(n) => {
                self.contains(PrimitiveType::Number)
                    || (self.contains(PrimitiveType::Integer) && is_integer(n, legacy_integers))
            }
        }
    }
}

pub fn is_integer(n: &Number, legacy: bool) -> bool {
    if n.is_i64() || n.is_u64() {
        return true;
    }
    if legacy {
        return false;
    }
    n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
}

/// Orders two JSON numbers exactly when both are integers and by `f64` otherwise.
pub fn compare_numbers(a: &Number, b: &Number) -> Ordering {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x.cmp(&y);
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x.cmp(&y);
    }
    // One is a u64 beyond i64::MAX and the other a negative i64.
    match (a.as_u64(), b.as_i64(), a.as_i64(), b.as_u64()) {
        (Some(_), Some(y), _, _) if y < 0 => return Ordering::Greater,
        (_, _, Some(x), Some(_)) if x < 0 => return Ordering::Less,
        _ => {}
    }
    let x = a.as_f64().unwrap_or(f64::NAN);
    let y = b.as_f64().unwrap_or(f64::NAN);
    x.partial_cmp(&y).unwrap_or(Ordering::Equal)
}

/// Whether `value` is a multiple of `divisor` (which is strictly positive).
pub fn is_multiple_of(value: &Number, divisor: &Number) -> bool {
    if let (Some(v), Some(d)) = (value.as_i64(), divisor.as_i64()) {
        return d != 0 && v % d == 0;
    }
    if let (Some(v), Some(d)) = (value.as_u64(), divisor.as_u64()) {
        return d != 0 && v % d == 0;
    }
    let (Some(v), Some(d)) = (value.as_f64(), divisor.as_f64()) else {
        return false;
    };
    let quotient = v / d;
    if !quotient.is_finite() {
        return false;
    }
    let tolerance = f64::EPSILON * quotient.abs().max(1.0) * 4.0;
    (quotient - quotient.round()).abs() <= tolerance
}

/// Structural JSON equality where `1` and `1.0` are the same number.
pub fn equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y) == Ordering::Equal,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(key, l)| y.get(key).is_some_and(|r| equal(l, r)))
        }
        _ => a == b,
    }
}

/// Index of the first pair of equal items, if any.
pub fn first_duplicate(items: &[Value]) -> Option<(usize, usize)> {
    for (i, left) in items.iter().enumerate() {
        for (offset, right) in items[i + 1..].iter().enumerate() {
            if equal(left, right) {
                return Some((i, i + 1 + offset));
            }
        }
    }
    None
}

/// Compact JSON rendering used inside error messages.
pub fn render(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("{value:?}"))
}
