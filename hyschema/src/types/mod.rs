//! Types module
//!
//! A [`Type`] is a named predicate over [`Value`] with two optional
//! capabilities: parsing a value out of a string ([`Type::from_string`]) and
//! converting a value into plain data ([`Type::to_data`]). Types are built in
//! layers:
//!
//! - Primary types: exact matches, kind/class membership, free predicates and
//!   bounds (see `primary.rs`).
//! - Combinators: union, intersection and exclusive-or over member types
//!   (see `combinator.rs`).
//! - Aggregate types: attribute/message checks and sized containers (see
//!   `aggregate.rs`).
//!
//! Types are immutable once built and cheap to clone; they are usually built
//! once, cached as named entries of a [`crate::factory::TypeFactory`], and
//! shared afterwards.
use std::{fmt, sync::Arc};

use indexmap::IndexMap;
use smallvec::SmallVec;
use strum::EnumIs;

use crate::{
    schema::{ClassRef, DEFAULT_CLASS_KEY, PlainDataOptions},
    utils::{AttributeMismatch, Capability, Error, Result},
    value::{Kind, Value},
};

pub mod aggregate;
pub mod builtin;
pub mod combinator;
pub mod parser;
pub mod primary;

pub use aggregate::{ArrayType, AttrsType, HashType, Length, RespondsType, array, attrs, hash, responds};
pub use combinator::{intersection, maybe, union, xor};
pub use primary::{Bounds, IsATarget, bounded, is, is_a, predicate};

/// Free-form predicate used by [`TypeKind::Where`].
pub type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Explicit string parser attached to a type.
pub type FromStringFn = Arc<dyn Fn(&str) -> Result<Value> + Send + Sync>;

/// Explicit plain-data conversion attached to a type.
pub type ToDataFn = Arc<dyn Fn(&Value) -> Result<Value> + Send + Sync>;

/// Member list of a combinator.
pub type Members = SmallVec<[Type; 4]>;

/// The structural variants of a [`Type`].
#[derive(Clone, EnumIs)]
pub enum TypeKind {
    /// Exact equality against a value.
    Is(Value),
    /// Membership in a builtin kind or a schema class (subclasses included).
    IsA(IsATarget),
    /// Arbitrary predicate.
    Where(Predicate),
    /// Inclusive bounds under the natural ordering of the value.
    Bounded(Bounds),
    /// At least one member accepts the value.
    Union(Members),
    /// Every member accepts the value.
    Intersection(Members),
    /// Exactly one member accepts the value.
    Xor(Members),
    /// Every named attribute exists and satisfies its paired type.
    Attrs(AttrsType),
    /// Every named message is answered with a response satisfying its paired type.
    Responds(RespondsType),
    Array(ArrayType),
    Hash(HashType),
}

#[derive(Clone)]
struct TypeInner {
    name: Option<String>,
    kind: TypeKind,
    from_string: Option<FromStringFn>,
    to_data: Option<ToDataFn>,
}

/// A named, composable predicate over [`Value`].
///
/// `test` is total and pure: it never fails and depends only on the value
/// and the type's configuration. `check` turns a failed test into an
/// [`Error::Validation`].
#[derive(Clone)]
pub struct Type(Arc<TypeInner>);

impl Type {
    pub fn new(kind: TypeKind) -> Self {
        Self(Arc::new(TypeInner {
            name: None,
            kind,
            from_string: None,
            to_data: None,
        }))
    }

    fn modify(self, f: impl FnOnce(&mut TypeInner)) -> Self {
        let mut inner = Arc::unwrap_or_clone(self.0);
        f(&mut inner);
        Self(Arc::new(inner))
    }

    /// Give this type a display name.
    pub fn named(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.modify(|inner| inner.name = Some(name))
    }

    /// Attach an explicit string parser. Parsed values are still checked.
    pub fn with_from_string(
        self,
        f: impl Fn(&str) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        self.modify(|inner| inner.from_string = Some(Arc::new(f)))
    }

    /// Attach an explicit plain-data conversion.
    pub fn with_to_data(self, f: impl Fn(&Value) -> Result<Value> + Send + Sync + 'static) -> Self {
        self.modify(|inner| inner.to_data = Some(Arc::new(f)))
    }

    /// Display name: the explicit name when one was given, a structural
    /// description otherwise.
    pub fn name(&self) -> String {
        self.to_string()
    }

    pub fn kind(&self) -> &TypeKind {
        &self.0.kind
    }

    pub fn test(&self, value: &Value) -> bool {
        match &self.0.kind {
            TypeKind::Is(expected) => value == expected,
            TypeKind::IsA(target) => target.matches(value),
            TypeKind::Where(predicate) => predicate(value),
            TypeKind::Bounded(bounds) => bounds.contains(value),
            TypeKind::Union(members) => members.iter().any(|m| m.test(value)),
            TypeKind::Intersection(members) => members.iter().all(|m| m.test(value)),
            TypeKind::Xor(members) => members.iter().filter(|m| m.test(value)).count() == 1,
            TypeKind::Attrs(attrs) => attrs.test(value),
            TypeKind::Responds(responds) => responds.test(value),
            TypeKind::Array(array) => array.test(value),
            TypeKind::Hash(hash) => hash.test(value),
        }
    }

    /// Describe why `value` is rejected, or `None` if it is accepted.
    pub fn explain(&self, value: &Value) -> Option<String> {
        if self.test(value) {
            return None;
        }

        Some(match &self.0.kind {
            TypeKind::Is(expected) => format!("expected exactly {}", expected),
            TypeKind::IsA(target) => {
                format!("expected an instance of `{}`, found kind `{}`", target, value.kind())
            }
            TypeKind::Where(_) => "predicate returned false".to_string(),
            TypeKind::Bounded(bounds) => match value.natural_cmp(value) {
                Some(_) => format!("outside of bounds {}", bounds),
                None => format!("kind `{}` has no natural ordering", value.kind()),
            },
            TypeKind::Union(members) => {
                format!("none of the {} member types accepted the value", members.len())
            }
            TypeKind::Intersection(members) => {
                match members.iter().find(|m| !m.test(value)) {
                    Some(member) => format!("rejected by member `{}`", member),
                    None => "rejected by a member".to_string(),
                }
            }
            TypeKind::Xor(members) => format!(
                "exactly one member must accept the value, {} of {} did",
                members.iter().filter(|m| m.test(value)).count(),
                members.len()
            ),
            TypeKind::Attrs(_) | TypeKind::Responds(_) => match self.attribute_mismatch(value) {
                Some(mismatch) => mismatch.to_string(),
                None => "attribute check failed".to_string(),
            },
            TypeKind::Array(array) => array.explain(value),
            TypeKind::Hash(hash) => hash.explain(value),
        })
    }

    /// The attribute responsible for an `Attrs`/`Responds` rejection.
    pub fn attribute_mismatch(&self, value: &Value) -> Option<AttributeMismatch> {
        match &self.0.kind {
            TypeKind::Attrs(attrs) => attrs.mismatch(value),
            TypeKind::Responds(responds) => responds.mismatch(value),
            TypeKind::Intersection(members) => members
                .iter()
                .filter(|m| !m.test(value))
                .find_map(|m| m.attribute_mismatch(value)),
            _ => None,
        }
    }

    pub(crate) fn validation_error(&self, value: &Value) -> Error {
        Error::Validation {
            type_name: self.name(),
            value: value.to_string(),
            reason: self.explain(value),
            attribute: self.attribute_mismatch(value),
        }
    }

    pub(crate) fn parse_error(&self, input: &str) -> Error {
        Error::Parse {
            type_name: self.name(),
            input: input.to_string(),
        }
    }

    /// Return `value` unchanged if it satisfies this type.
    pub fn check(&self, value: Value) -> Result<Value> {
        if self.test(&value) {
            Ok(value)
        } else {
            Err(self.validation_error(&value))
        }
    }

    /// Like [`Type::check`], with the failure message produced by `formatter`.
    pub fn check_with<F>(&self, value: Value, formatter: F) -> Result<Value>
    where
        F: FnOnce(&Type, &Value) -> String,
    {
        if self.test(&value) {
            return Ok(value);
        }

        Err(Error::Validation {
            type_name: self.name(),
            value: value.to_string(),
            reason: Some(formatter(self, &value)),
            attribute: self.attribute_mismatch(&value),
        })
    }

    /// Whether [`Type::from_string`] is supported.
    pub fn has_from_string(&self) -> bool {
        if self.0.from_string.is_some() {
            return true;
        }

        match &self.0.kind {
            TypeKind::Is(value) => value.kind().is_scalar(),
            TypeKind::IsA(IsATarget::Kind(kind)) => *kind != Kind::Object,
            TypeKind::IsA(IsATarget::Class(_)) => false,
            TypeKind::Where(_) => false,
            TypeKind::Bounded(_) => true,
            TypeKind::Union(members) | TypeKind::Intersection(members) | TypeKind::Xor(members) => {
                members.iter().any(Type::has_from_string)
            }
            TypeKind::Attrs(_) | TypeKind::Responds(_) => false,
            TypeKind::Array(_) | TypeKind::Hash(_) => true,
        }
    }

    /// Parse a value of this type out of its textual form.
    ///
    /// Fails with [`Error::Capability`] when the type cannot parse strings,
    /// [`Error::Parse`] when the input is not understood, and
    /// [`Error::Validation`] when the parsed value fails [`Type::check`].
    pub fn from_string(&self, input: &str) -> Result<Value> {
        let parsed = match &self.0.from_string {
            Some(parse) => parse(input)?,
            None => self.intrinsic_from_string(input)?,
        };

        self.check(parsed)
    }

    fn intrinsic_from_string(&self, input: &str) -> Result<Value> {
        match &self.0.kind {
            TypeKind::Is(value) if value.kind().is_scalar() => {
                parser::parse_scalar(value.kind(), input).ok_or_else(|| self.parse_error(input))
            }
            TypeKind::IsA(IsATarget::Kind(Kind::List)) => {
                parser::parse_list(self, input, None).map(Value::List)
            }
            TypeKind::IsA(IsATarget::Kind(Kind::Map)) => {
                parser::parse_map(self, input, None, None).map(Value::Map)
            }
            TypeKind::IsA(IsATarget::Kind(kind)) if kind.is_scalar() => {
                parser::parse_scalar(*kind, input).ok_or_else(|| self.parse_error(input))
            }
            TypeKind::Bounded(bounds) => parser::parse_scalar(bounds.parse_kind(), input)
                .ok_or_else(|| self.parse_error(input)),
            TypeKind::Union(members) | TypeKind::Intersection(members) | TypeKind::Xor(members)
                if self.has_from_string() =>
            {
                combinator::members_from_string(self, members, input)
            }
            TypeKind::Array(array) => {
                parser::parse_list(self, input, array.item.as_ref()).map(Value::List)
            }
            TypeKind::Hash(hash) => {
                parser::parse_map(self, input, hash.key.as_ref(), hash.value.as_ref())
                    .map(Value::Map)
            }
            _ => Err(Error::Capability {
                type_name: self.name(),
                capability: Capability::FromString,
            }),
        }
    }

    /// Whether this type carries its own plain-data conversion, either
    /// explicitly or through its members.
    pub fn has_to_data(&self) -> bool {
        if self.0.to_data.is_some() {
            return true;
        }

        match &self.0.kind {
            TypeKind::Union(members) | TypeKind::Intersection(members) | TypeKind::Xor(members) => {
                members.iter().any(Type::has_to_data)
            }
            TypeKind::Array(array) => array.item.as_ref().is_some_and(Type::has_to_data),
            TypeKind::Hash(hash) => {
                hash.key.as_ref().is_some_and(Type::has_to_data)
                    || hash.value.as_ref().is_some_and(Type::has_to_data)
            }
            _ => false,
        }
    }

    /// Convert `value` into plain data.
    ///
    /// An explicit hook wins; otherwise a schema object exports itself;
    /// otherwise containers and combinators delegate to their members; any
    /// other value is returned unchanged.
    pub fn to_data(&self, value: &Value) -> Result<Value> {
        self.to_data_with(value, &PlainDataOptions::default())
    }

    /// Same as [`Type::to_data`], exporting nested schema objects with
    /// `options`.
    pub fn to_data_with(&self, value: &Value, options: &PlainDataOptions) -> Result<Value> {
        if let Some(convert) = &self.0.to_data {
            return convert(value);
        }

        if let Value::Object(instance) = value {
            return instance.to_plain_data(options);
        }

        match (&self.0.kind, value) {
            (
                TypeKind::Array(ArrayType {
                    item: Some(item), ..
                }),
                Value::List(items),
            ) => Ok(Value::List(
                items
                    .iter()
                    .map(|v| item.to_data_with(v, options))
                    .collect::<Result<_>>()?,
            )),
            (TypeKind::Hash(hash), Value::Map(map)) => Ok(Value::Map(
                map.iter()
                    .map(|(k, v)| {
                        Ok((
                            data_with(hash.key.as_ref(), k, options)?,
                            data_with(hash.value.as_ref(), v, options)?,
                        ))
                    })
                    .collect::<Result<_>>()?,
            )),
            (
                TypeKind::Union(members) | TypeKind::Intersection(members) | TypeKind::Xor(members),
                _,
            ) => match members.iter().find(|m| m.has_to_data() && m.test(value)) {
                Some(member) => member.to_data_with(value, options),
                None => value.to_plain_with(options),
            },
            _ => value.to_plain_with(options),
        }
    }

    /// Convert plain data back into a value of this type.
    ///
    /// This is the inverse of [`Type::to_data`] used when loading documents:
    /// maps become instances of the schema class named by an `IsA`, containers
    /// and combinators recurse into their members, and strings are parsed when
    /// the type supports it. Values the conversion does not understand are
    /// returned unchanged, leaving the final verdict to [`Type::check`].
    pub fn from_data(&self, raw: Value) -> Result<Value> {
        self.from_data_with(raw, DEFAULT_CLASS_KEY)
    }

    /// Same as [`Type::from_data`], reading the class of nested documents
    /// under `class_key`. A nested document naming a subclass of the `IsA`
    /// target loads as that subclass.
    pub fn from_data_with(&self, raw: Value, class_key: &str) -> Result<Value> {
        if self.test(&raw) {
            return Ok(raw);
        }

        match (&self.0.kind, raw) {
            (TypeKind::IsA(IsATarget::Class(class)), raw @ Value::Map(_)) => {
                Ok(Value::from(class.from_plain_data_with(&raw, class_key)?))
            }
            (
                TypeKind::Array(ArrayType {
                    item: Some(item), ..
                }),
                Value::List(items),
            ) => Ok(Value::List(
                items
                    .into_iter()
                    .map(|v| item.from_data_with(v, class_key))
                    .collect::<Result<_>>()?,
            )),
            (TypeKind::Hash(hash), Value::Map(map)) => Ok(Value::Map(
                map.into_iter()
                    .map(|(k, v)| {
                        Ok((
                            from_data_with(hash.key.as_ref(), k, class_key)?,
                            from_data_with(hash.value.as_ref(), v, class_key)?,
                        ))
                    })
                    .collect::<Result<_>>()?,
            )),
            (
                TypeKind::Union(members) | TypeKind::Intersection(members) | TypeKind::Xor(members),
                raw,
            ) => {
                for member in members {
                    if let Ok(value) = member.from_data_with(raw.clone(), class_key) {
                        if self.test(&value) {
                            return Ok(value);
                        }
                    }
                }
                Ok(raw)
            }
            (_, Value::Str(s)) if self.has_from_string() => match self.from_string(&s) {
                Ok(value) => Ok(value),
                Err(_) => Ok(Value::Str(s)),
            },
            (_, raw) => Ok(raw),
        }
    }
}

fn data_with(ty: Option<&Type>, value: &Value, options: &PlainDataOptions) -> Result<Value> {
    match ty {
        Some(ty) => ty.to_data_with(value, options),
        None => value.to_plain_with(options),
    }
}

fn from_data_with(ty: Option<&Type>, value: Value, class_key: &str) -> Result<Value> {
    match ty {
        Some(ty) => ty.from_data_with(value, class_key),
        None => Ok(value),
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.0.name {
            return write!(f, "{}", name);
        }

        match &self.0.kind {
            TypeKind::Is(value) => write!(f, "Is({})", value),
            TypeKind::IsA(target) => write!(f, "IsA({})", target),
            TypeKind::Where(_) => write!(f, "Where(<predicate>)"),
            TypeKind::Bounded(bounds) => write!(f, "Bounded({})", bounds),
            TypeKind::Union(members) => combinator::fmt_members(f, members, " | "),
            TypeKind::Intersection(members) => combinator::fmt_members(f, members, " & "),
            TypeKind::Xor(members) => combinator::fmt_members(f, members, " ^ "),
            TypeKind::Attrs(attrs) => write!(f, "{}", attrs),
            TypeKind::Responds(responds) => write!(f, "{}", responds),
            TypeKind::Array(array) => write!(f, "{}", array),
            TypeKind::Hash(hash) => write!(f, "{}", hash),
        }
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({})", self)
    }
}

/// Anything that can be coerced into a [`Type`] with [`make`].
#[derive(Clone, Debug)]
pub enum TypeLike {
    Type(Type),
    Kind(Kind),
    Class(ClassRef),
    Value(Value),
}

/// Coerce `value` into a type.
///
/// Types are returned as is, kinds and schema classes are wrapped in
/// [`is_a`], and any other value becomes an exact match with [`is`].
pub fn make(value: impl Into<TypeLike>) -> Type {
    match value.into() {
        TypeLike::Type(ty) => ty,
        TypeLike::Kind(kind) => is_a(kind),
        TypeLike::Class(class) => is_a(class),
        TypeLike::Value(value) => is(value),
    }
}

impl From<Type> for TypeLike {
    fn from(value: Type) -> Self {
        TypeLike::Type(value)
    }
}

impl From<&Type> for TypeLike {
    fn from(value: &Type) -> Self {
        TypeLike::Type(value.clone())
    }
}

impl From<Kind> for TypeLike {
    fn from(value: Kind) -> Self {
        TypeLike::Kind(value)
    }
}

impl From<ClassRef> for TypeLike {
    fn from(value: ClassRef) -> Self {
        TypeLike::Class(value)
    }
}

impl From<&ClassRef> for TypeLike {
    fn from(value: &ClassRef) -> Self {
        TypeLike::Class(value.clone())
    }
}

impl From<Value> for TypeLike {
    fn from(value: Value) -> Self {
        TypeLike::Value(value)
    }
}

impl From<ArrayType> for TypeLike {
    fn from(value: ArrayType) -> Self {
        TypeLike::Type(value.into())
    }
}

impl From<HashType> for TypeLike {
    fn from(value: HashType) -> Self {
        TypeLike::Type(value.into())
    }
}

impl From<i64> for TypeLike {
    fn from(value: i64) -> Self {
        TypeLike::Value(value.into())
    }
}

impl From<i32> for TypeLike {
    fn from(value: i32) -> Self {
        TypeLike::Value(value.into())
    }
}

impl From<bool> for TypeLike {
    fn from(value: bool) -> Self {
        TypeLike::Value(value.into())
    }
}

impl From<&str> for TypeLike {
    fn from(value: &str) -> Self {
        TypeLike::Value(value.into())
    }
}

impl From<String> for TypeLike {
    fn from(value: String) -> Self {
        TypeLike::Value(value.into())
    }
}

/// Map of attribute or message names to types, as accepted by [`attrs`] and [`responds`].
pub type NamedTypes = IndexMap<String, Type>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::builtin::{int, string};

    #[test]
    fn check_returns_the_value_unchanged() {
        assert_eq!(int().check(Value::Int(5)), Ok(Value::Int(5)));
        let err = int().check(Value::from("5")).unwrap_err();
        match err {
            Error::Validation {
                type_name, value, ..
            } => {
                assert_eq!(type_name, "int");
                assert_eq!(value, "\"5\"");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn check_with_uses_the_formatter() {
        let err = int()
            .check_with(Value::Null, |ty, v| format!("{} wanted, got {}", ty, v))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Value null does not satisfy type `int`: int wanted, got null"
        );
    }

    #[test]
    fn make_coerces_kinds_and_values() {
        assert!(make(Kind::Str).test(&Value::from("x")));
        assert!(make(3).test(&Value::Int(3)));
        assert!(!make(3).test(&Value::Int(4)));
        let ty = string();
        assert_eq!(make(&ty).name(), "str");
    }

    #[test]
    fn where_types_have_no_parser() {
        let ty = predicate(|v| v.is_null());
        assert!(!ty.has_from_string());
        assert_eq!(
            ty.from_string("x"),
            Err(Error::Capability {
                type_name: "Where(<predicate>)".to_string(),
                capability: Capability::FromString,
            })
        );
    }

    #[test]
    fn explicit_parser_results_are_checked() {
        let ty = int().with_from_string(|_| Ok(Value::from("nope")));
        assert!(ty.from_string("1").unwrap_err().is_validation());
    }

    #[test]
    fn explicit_to_data_wins() {
        let ty = int().with_to_data(|v| Ok(Value::Str(v.to_string())));
        assert!(ty.has_to_data());
        assert_eq!(ty.to_data(&Value::Int(7)), Ok(Value::from("7")));
        assert!(!int().has_to_data());
        assert_eq!(int().to_data(&Value::Int(7)), Ok(Value::Int(7)));
    }
}
