//! Dynamic values
//!
//! Every type in this crate is a predicate over [`Value`], the dynamic tree
//! of scalars, sequences, maps and schema objects that flows between the type
//! algebra and the property registry. The plain-data subset of a [`Value`]
//! (everything except [`Value::Object`]) is what gets encoded as JSON/YAML.
use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use indexmap::IndexMap;
use serde::{
    Serialize, Serializer,
    ser::{SerializeMap, SerializeSeq},
};
use strum::{Display, EnumIs, EnumString, EnumTryAs};

use crate::{
    schema::{Instance, PlainDataOptions},
    utils::{Error, Result},
};

/// Ordered map used for [`Value::Map`].
pub type ValueMap = IndexMap<Value, Value>;

/// A dynamically typed value.
#[derive(Debug, Clone, EnumIs, EnumTryAs)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    /// Keys keep their insertion order. Equality ignores order.
    Map(ValueMap),
    /// An instance of a schema class.
    Object(Arc<Instance>),
}

/// Builtin value kinds, usable as `IsA` targets next to schema classes.
///
/// [`Kind::Number`] is an interface: it is implemented by both integers and
/// floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIs)]
#[strum(serialize_all = "snake_case")]
pub enum Kind {
    Null,
    Bool,
    Int,
    Float,
    Number,
    Str,
    List,
    Map,
    Object,
}

impl Kind {
    /// Returns true if `value` is of this kind (or implements it, for [`Kind::Number`]).
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Kind::Number => matches!(value, Value::Int(_) | Value::Float(_)),
            kind => value.kind() == kind,
        }
    }

    /// Kinds whose values can be written as a single token.
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            Kind::Null | Kind::Bool | Kind::Int | Kind::Float | Kind::Number | Kind::Str
        )
    }
}

impl Value {
    /// The concrete kind of this value. Never [`Kind::Number`].
    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::Float(_) => Kind::Float,
            Value::Str(_) => Kind::Str,
            Value::List(_) => Kind::List,
            Value::Map(_) => Kind::Map,
            Value::Object(_) => Kind::Object,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Object(instance) => Some(instance),
            _ => None,
        }
    }

    /// Number of characters, items or entries for strings, lists and maps.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Str(s) => Some(s.chars().count()),
            Value::List(items) => Some(items.len()),
            Value::Map(map) => Some(map.len()),
            _ => None,
        }
    }

    /// Compare two values by their natural ordering.
    ///
    /// Integers and floats compare with each other, strings compare
    /// lexicographically. Any other pairing has no ordering.
    pub fn natural_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Invoke `message` on this value.
    ///
    /// Schema objects answer with their methods and property accessors
    /// (private methods are hidden when `public_only` is set). Builtin values
    /// answer a fixed set of messages: `len`/`size`, `is_empty`, `to_string`,
    /// `keys`, `values` and `abs`.
    ///
    /// Returns `None` when the value does not respond to `message`.
    pub fn send(&self, message: &str, public_only: bool) -> Option<Result<Value>> {
        if let Value::Object(instance) = self {
            return instance.send(message, public_only);
        }

        let response = match (message, self) {
            ("len" | "size", _) => Value::Int(self.len()? as i64),
            ("is_empty", _) => Value::Bool(self.len()? == 0),
            ("to_string", Value::Str(s)) => Value::Str(s.clone()),
            ("to_string", other) => Value::Str(other.to_string()),
            ("keys", Value::Map(map)) => Value::List(map.keys().cloned().collect()),
            ("values", Value::Map(map)) => Value::List(map.values().cloned().collect()),
            ("abs", Value::Int(i)) => i
                .checked_abs()
                .map_or(Value::Float((*i as f64).abs()), Value::Int),
            ("abs", Value::Float(f)) => Value::Float(f.abs()),
            _ => return None,
        };

        Some(Ok(response))
    }

    /// Read the attribute `name` of this value.
    ///
    /// Maps expose their string keys, schema objects expose their properties
    /// and public methods, everything else falls back to [`Value::send`].
    pub fn attribute(&self, name: &str) -> Option<Result<Value>> {
        match self {
            Value::Map(map) => map.get(&Value::Str(name.to_string())).cloned().map(Ok),
            _ => self.send(name, true),
        }
    }

    /// Copy this value without sharing any schema object with the original.
    pub fn deep_copy(&self) -> Value {
        match self {
            Value::Object(instance) => Value::Object(Arc::new(instance.deep_copy())),
            Value::List(items) => Value::List(items.iter().map(Value::deep_copy).collect()),
            Value::Map(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.deep_copy(), v.deep_copy()))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Convert this value into plain data, exporting nested schema objects
    /// with the default [`PlainDataOptions`].
    pub fn to_plain(&self) -> Result<Value> {
        self.to_plain_with(&PlainDataOptions::default())
    }

    /// Convert this value into plain data, exporting nested schema objects
    /// with `options`.
    pub fn to_plain_with(&self, options: &PlainDataOptions) -> Result<Value> {
        Ok(match self {
            Value::Object(instance) => instance.to_plain_data(options)?,
            Value::List(items) => Value::List(
                items
                    .iter()
                    .map(|v| v.to_plain_with(options))
                    .collect::<Result<_>>()?,
            ),
            Value::Map(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| Ok((k.to_plain_with(options)?, v.to_plain_with(options)?)))
                    .collect::<Result<_>>()?,
            ),
            other => other.clone(),
        })
    }

    /// Error describing that this value is not of the `expected` type.
    pub(crate) fn mismatch(&self, expected: impl Into<String>) -> Error {
        Error::Validation {
            type_name: expected.into(),
            value: self.to_string(),
            reason: Some(format!("found a value of kind `{}`", self.kind())),
            attribute: None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Str(s) => s.hash(state),
            Value::List(items) => items.hash(state),
            // Map equality ignores order, so only the size participates.
            Value::Map(map) => map.len().hash(state),
            Value::Object(instance) => instance.class().name().hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{:.1}", x),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Object(instance) => write!(f, "{}", instance),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Str(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(map) => {
                let mut entries = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    entries.serialize_entry(k, v)?;
                }
                entries.end()
            }
            Value::Object(instance) => instance
                .to_plain_data(&PlainDataOptions::default())
                .map_err(serde::ser::Error::custom)?
                .serialize(serializer),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (Value::Str(k), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<serde_yaml::Value> for Value {
    fn from(value: serde_yaml::Value) -> Self {
        match value {
            serde_yaml::Value::Null => Value::Null,
            serde_yaml::Value::Bool(b) => Value::Bool(b),
            serde_yaml::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_yaml::Value::String(s) => Value::Str(s),
            serde_yaml::Value::Sequence(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_yaml::Value::Mapping(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (Value::from(k), Value::from(v)))
                    .collect(),
            ),
            serde_yaml::Value::Tagged(tagged) => Value::from(tagged.value),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(value.into())
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        i64::try_from(value).map_or(Value::Float(value as f64), Value::Int)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<ValueMap> for Value {
    fn from(value: ValueMap) -> Self {
        Value::Map(value)
    }
}

impl From<Instance> for Value {
    fn from(value: Instance) -> Self {
        Value::Object(Arc::new(value))
    }
}

impl From<Arc<Instance>> for Value {
    fn from(value: Arc<Instance>) -> Self {
        Value::Object(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl TryFrom<Value> for i64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Int(i) => Ok(i),
            other => Err(other.mismatch("int")),
        }
    }
}

impl TryFrom<Value> for f64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Float(x) => Ok(x),
            Value::Int(i) => Ok(i as f64),
            other => Err(other.mismatch("float")),
        }
    }
}

impl TryFrom<Value> for bool {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(other.mismatch("bool")),
        }
    }
}

impl TryFrom<Value> for String {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(other.mismatch("str")),
        }
    }
}

impl TryFrom<Value> for Vec<Value> {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::List(items) => Ok(items),
            other => Err(other.mismatch("list")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_ordering_crosses_numeric_kinds() {
        assert_eq!(
            Value::Int(1).natural_cmp(&Value::Float(1.5)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::Str("b".into()).natural_cmp(&Value::Str("a".into())),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::Int(1).natural_cmp(&Value::Str("1".into())), None);
    }

    #[test]
    fn number_kind_is_an_interface() {
        assert!(Kind::Number.matches(&Value::Int(3)));
        assert!(Kind::Number.matches(&Value::Float(3.5)));
        assert!(!Kind::Number.matches(&Value::Str("3".into())));
        assert_eq!("number".parse::<Kind>().ok(), Some(Kind::Number));
    }

    #[test]
    fn builtin_messages() {
        let list = Value::List(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(list.send("len", true), Some(Ok(Value::Int(2))));
        assert_eq!(list.send("is_empty", true), Some(Ok(Value::Bool(false))));
        assert_eq!(Value::Int(-4).send("abs", true), Some(Ok(Value::Int(4))));
        assert_eq!(Value::Bool(true).send("len", true), None);
    }

    #[test]
    fn json_conversion_keeps_integers() {
        let json: serde_json::Value = serde_json::json!({"a": 1, "b": [1.5, "x", null]});
        let value = Value::from(json);
        let map = value.try_as_map_ref().expect("object becomes a map");
        assert_eq!(map.get(&Value::from("a")), Some(&Value::Int(1)));
        assert_eq!(
            map.get(&Value::from("b")),
            Some(&Value::List(vec![
                Value::Float(1.5),
                Value::from("x"),
                Value::Null
            ]))
        );
    }

    #[test]
    fn display_is_literal_like() {
        let mut map = ValueMap::new();
        map.insert(Value::from("k"), Value::Float(2.0));
        assert_eq!(Value::Map(map).to_string(), r#"{"k": 2.0}"#);
    }
}
