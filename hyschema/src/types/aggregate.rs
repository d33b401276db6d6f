//! Aggregate types
//!
//! Types that look inside a value:
//! - `AttrsType`: named attributes must exist and satisfy paired types.
//! - `RespondsType`: named messages must be answered with acceptable responses.
//! - `ArrayType` / `HashType`: container kind, optional length bounds and
//!   optional element types.
use std::fmt;

use crate::{
    types::{NamedTypes, Type, TypeKind, TypeLike, make},
    utils::AttributeMismatch,
    value::Value,
};

fn named_types<I, K, T>(pairs: I) -> NamedTypes
where
    I: IntoIterator<Item = (K, T)>,
    K: Into<String>,
    T: Into<TypeLike>,
{
    pairs
        .into_iter()
        .map(|(name, ty)| (name.into(), make(ty)))
        .collect()
}

fn fmt_named(f: &mut fmt::Formatter<'_>, named: &NamedTypes) -> fmt::Result {
    for (i, (name, ty)) in named.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}: {}", name, ty)?;
    }
    Ok(())
}

/// Checks a response obtained for `name`. `None` means the value did not
/// expose it at all.
fn inspect_attribute(
    name: &str,
    ty: &Type,
    response: Option<crate::utils::Result<Value>>,
) -> Option<AttributeMismatch> {
    match response {
        Some(Ok(value)) if ty.test(&value) => None,
        Some(Ok(value)) => Some(AttributeMismatch {
            name: name.to_string(),
            expected: ty.name(),
            actual: Some(value.to_string()),
        }),
        Some(Err(_)) | None => Some(AttributeMismatch {
            name: name.to_string(),
            expected: ty.name(),
            actual: None,
        }),
    }
}

#[derive(Clone, Default)]
pub struct AttrsType {
    pub attrs: NamedTypes,
}

impl AttrsType {
    pub fn test(&self, value: &Value) -> bool {
        self.mismatch(value).is_none()
    }

    /// The first attribute that is missing or does not satisfy its type.
    pub fn mismatch(&self, value: &Value) -> Option<AttributeMismatch> {
        self.attrs
            .iter()
            .find_map(|(name, ty)| inspect_attribute(name, ty, value.attribute(name)))
    }
}

impl fmt::Display for AttrsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Attrs(")?;
        fmt_named(f, &self.attrs)?;
        write!(f, ")")
    }
}

#[derive(Clone, Default)]
pub struct RespondsType {
    pub messages: NamedTypes,
    /// Only public methods may answer.
    pub public_only: bool,
}

impl RespondsType {
    pub fn test(&self, value: &Value) -> bool {
        self.mismatch(value).is_none()
    }

    /// The first message that is not answered, or answered with a response
    /// that does not satisfy its type.
    pub fn mismatch(&self, value: &Value) -> Option<AttributeMismatch> {
        self.messages
            .iter()
            .find_map(|(name, ty)| inspect_attribute(name, ty, value.send(name, self.public_only)))
    }
}

impl fmt::Display for RespondsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Responds(")?;
        fmt_named(f, &self.messages)?;
        if !self.public_only {
            write!(f, "; private")?;
        }
        write!(f, ")")
    }
}

/// Inclusive bounds on the number of items of a container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Length {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Length {
    pub fn exactly(n: usize) -> Self {
        Self {
            min: Some(n),
            max: Some(n),
        }
    }

    pub fn contains(&self, n: usize) -> bool {
        self.min.is_none_or(|min| n >= min) && self.max.is_none_or(|max| n <= max)
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (Some(min), Some(max)) if min == max => write!(f, "{}", min),
            (Some(min), Some(max)) => write!(f, "{}..={}", min, max),
            (Some(min), None) => write!(f, "{}..", min),
            (None, Some(max)) => write!(f, "..={}", max),
            (None, None) => write!(f, ".."),
        }
    }
}

fn length_accepts(length: &Option<Length>, n: usize) -> bool {
    length.as_ref().is_none_or(|length| length.contains(n))
}

/// A list, optionally with an item type and length bounds.
#[derive(Clone, Default)]
pub struct ArrayType {
    pub item: Option<Type>,
    pub length: Option<Length>,
}

impl ArrayType {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item(mut self, item: impl Into<TypeLike>) -> Self {
        self.item = Some(make(item));
        self
    }

    pub fn length(mut self, length: Length) -> Self {
        self.length = Some(length);
        self
    }

    pub fn test(&self, value: &Value) -> bool {
        let Value::List(items) = value else {
            return false;
        };

        if !length_accepts(&self.length, items.len()) {
            return false;
        }

        match &self.item {
            // Every item is visited; one counter-example is enough to fail.
            Some(item) => items.iter().fold(true, |ok, v| item.test(v) & ok),
            None => true,
        }
    }

    pub(crate) fn explain(&self, value: &Value) -> String {
        let Value::List(items) = value else {
            return format!("expected a list, found kind `{}`", value.kind());
        };

        if let Some(length) = self.length.filter(|l| !l.contains(items.len())) {
            return format!("length {} is outside of {}", items.len(), length);
        }

        match &self.item {
            Some(item) => match items.iter().position(|v| !item.test(v)) {
                Some(index) => format!(
                    "item #{} ({}) does not satisfy `{}`",
                    index, items[index], item
                ),
                None => "item check failed".to_string(),
            },
            None => "list check failed".to_string(),
        }
    }
}

impl fmt::Display for ArrayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Array")?;
        if let Some(item) = &self.item {
            write!(f, "<{}>", item)?;
        }
        if let Some(length) = &self.length {
            write!(f, "[{}]", length)?;
        }
        Ok(())
    }
}

impl From<ArrayType> for Type {
    fn from(value: ArrayType) -> Self {
        Type::new(TypeKind::Array(value))
    }
}

/// A map, optionally with key/value types and length bounds.
#[derive(Clone, Default)]
pub struct HashType {
    pub key: Option<Type>,
    pub value: Option<Type>,
    pub length: Option<Length>,
}

impl HashType {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(mut self, key: impl Into<TypeLike>) -> Self {
        self.key = Some(make(key));
        self
    }

    pub fn value(mut self, value: impl Into<TypeLike>) -> Self {
        self.value = Some(make(value));
        self
    }

    pub fn length(mut self, length: Length) -> Self {
        self.length = Some(length);
        self
    }

    fn entry_accepted(&self, key: &Value, value: &Value) -> bool {
        let key_ok = self.key.as_ref().is_none_or(|ty| ty.test(key));
        let value_ok = self.value.as_ref().is_none_or(|ty| ty.test(value));
        key_ok && value_ok
    }

    pub fn test(&self, value: &Value) -> bool {
        let Value::Map(map) = value else {
            return false;
        };

        length_accepts(&self.length, map.len())
            && map
                .iter()
                .fold(true, |ok, (k, v)| self.entry_accepted(k, v) & ok)
    }

    pub(crate) fn explain(&self, value: &Value) -> String {
        let Value::Map(map) = value else {
            return format!("expected a map, found kind `{}`", value.kind());
        };

        if let Some(length) = self.length.filter(|l| !l.contains(map.len())) {
            return format!("length {} is outside of {}", map.len(), length);
        }

        match map.iter().find(|(k, v)| !self.entry_accepted(k, v)) {
            Some((k, v)) => format!("entry {}: {} does not satisfy `{}`", k, v, self),
            None => "entry check failed".to_string(),
        }
    }
}

impl fmt::Display for HashType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash")?;
        match (&self.key, &self.value) {
            (None, None) => {}
            (key, value) => {
                let any = "any".to_string();
                write!(
                    f,
                    "<{}, {}>",
                    key.as_ref().map_or(any.clone(), Type::name),
                    value.as_ref().map_or(any, Type::name)
                )?;
            }
        }
        if let Some(length) = &self.length {
            write!(f, "[{}]", length)?;
        }
        Ok(())
    }
}

impl From<HashType> for Type {
    fn from(value: HashType) -> Self {
        Type::new(TypeKind::Hash(value))
    }
}

/// Values exposing every attribute of `pairs` with a value of the paired type.
pub fn attrs<I, K, T>(pairs: I) -> Type
where
    I: IntoIterator<Item = (K, T)>,
    K: Into<String>,
    T: Into<TypeLike>,
{
    Type::new(TypeKind::Attrs(AttrsType {
        attrs: named_types(pairs),
    }))
}

/// Values answering every message of `pairs` with a response of the paired type.
pub fn responds<I, K, T>(pairs: I, public_only: bool) -> Type
where
    I: IntoIterator<Item = (K, T)>,
    K: Into<String>,
    T: Into<TypeLike>,
{
    Type::new(TypeKind::Responds(RespondsType {
        messages: named_types(pairs),
        public_only,
    }))
}

/// Lists whose items all satisfy `item`.
pub fn array(item: impl Into<TypeLike>) -> Type {
    ArrayType::new().item(item).into()
}

/// Maps whose keys satisfy `key` and values satisfy `value`.
pub fn hash(key: impl Into<TypeLike>, value: impl Into<TypeLike>) -> Type {
    HashType::new().key(key).value(value).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        types::{
            builtin::{int, string},
            primary::bounded,
        },
        utils::Error,
        value::ValueMap,
    };

    fn list(items: &[i64]) -> Value {
        Value::List(items.iter().copied().map(Value::Int).collect())
    }

    #[test]
    fn unconstrained_array_checks_only_the_kind() {
        let ty: Type = ArrayType::new().into();
        assert!(ty.test(&Value::List(vec![Value::Null, Value::from("x")])));
        assert!(!ty.test(&Value::from("[]")));
    }

    #[test]
    fn sized_array() {
        let ty: Type = ArrayType::new()
            .item(int())
            .length(Length {
                min: Some(1),
                max: Some(2),
            })
            .into();
        assert!(ty.test(&list(&[1])));
        assert!(!ty.test(&list(&[])));
        assert!(!ty.test(&list(&[1, 2, 3])));
        assert_eq!(
            ty.explain(&list(&[1, 2, 3])).as_deref(),
            Some("length 3 is outside of 1..=2")
        );
    }

    #[test]
    fn array_explains_first_bad_item() {
        let ty = array(int());
        let value = Value::List(vec![Value::Int(1), Value::from("b"), Value::Null]);
        assert_eq!(
            ty.explain(&value).as_deref(),
            Some("item #1 (\"b\") does not satisfy `int`")
        );
    }

    #[test]
    fn hash_checks_keys_and_values() {
        let ty = hash(string(), int());
        let mut map = ValueMap::new();
        map.insert(Value::from("a"), Value::Int(1));
        assert!(ty.test(&Value::Map(map.clone())));
        map.insert(Value::Int(2), Value::Int(2));
        assert!(!ty.test(&Value::Map(map)));
        assert_eq!(ty.name(), "Hash<str, int>");
    }

    #[test]
    fn attrs_pinpoint_the_failing_attribute() {
        let ty = attrs([("len", bounded(Some(3.into()), None))]);
        assert!(ty.test(&Value::from("abcd")));
        let err = ty.check(Value::from("ab")).unwrap_err();
        match err {
            Error::Validation {
                attribute: Some(mismatch),
                ..
            } => {
                assert_eq!(mismatch.name, "len");
                assert_eq!(mismatch.actual.as_deref(), Some("2"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn attrs_read_map_keys() {
        let ty = attrs([("name", string())]);
        let mut map = ValueMap::new();
        map.insert(Value::from("name"), Value::from("felix"));
        assert!(ty.test(&Value::Map(map)));

        let mismatch = ty.attribute_mismatch(&Value::Map(ValueMap::new()));
        assert_eq!(
            mismatch,
            Some(AttributeMismatch {
                name: "name".to_string(),
                expected: "str".to_string(),
                actual: None,
            })
        );
    }

    #[test]
    fn responds_to_builtin_messages() {
        let ty = responds([("is_empty", false)], true);
        assert!(ty.test(&list(&[1])));
        assert!(!ty.test(&list(&[])));
        assert!(!ty.test(&Value::Bool(true)));
    }
}
