//! Primary types
//!
//! Single-condition predicates: exact match ([`is`]), kind or class
//! membership ([`is_a`]), free predicates ([`predicate`]) and inclusive bounds
//! ([`bounded`]).
use std::{cmp::Ordering, fmt, sync::Arc};

use crate::{
    schema::ClassRef,
    types::{Type, TypeKind},
    value::{Kind, Value},
};

/// What an `IsA` type tests membership of.
#[derive(Clone, Debug)]
pub enum IsATarget {
    /// A builtin kind, or the [`Kind::Number`] interface.
    Kind(Kind),
    /// A schema class. Instances of subclasses are members too.
    Class(ClassRef),
}

impl IsATarget {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            IsATarget::Kind(kind) => kind.matches(value),
            IsATarget::Class(class) => value
                .as_instance()
                .is_some_and(|instance| instance.class().is_subclass_of(class)),
        }
    }
}

impl fmt::Display for IsATarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IsATarget::Kind(kind) => write!(f, "{}", kind),
            IsATarget::Class(class) => write!(f, "{}", class.name()),
        }
    }
}

impl From<Kind> for IsATarget {
    fn from(value: Kind) -> Self {
        IsATarget::Kind(value)
    }
}

impl From<ClassRef> for IsATarget {
    fn from(value: ClassRef) -> Self {
        IsATarget::Class(value)
    }
}

impl From<&ClassRef> for IsATarget {
    fn from(value: &ClassRef) -> Self {
        IsATarget::Class(value.clone())
    }
}

/// Inclusive bounds. Either side may be open.
///
/// `min <= max` is not validated; inverted bounds simply accept nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bounds {
    pub min: Option<Value>,
    pub max: Option<Value>,
}

impl Bounds {
    pub fn new(min: Option<Value>, max: Option<Value>) -> Self {
        Self { min, max }
    }

    /// Returns true if `value` is ordered and lies within the bounds.
    pub fn contains(&self, value: &Value) -> bool {
        // Unordered values (maps, objects, NaN) never fit.
        if value.natural_cmp(value).is_none() {
            return false;
        }

        let above_min = self.min.as_ref().is_none_or(|min| {
            matches!(
                value.natural_cmp(min),
                Some(Ordering::Greater | Ordering::Equal)
            )
        });
        let below_max = self.max.as_ref().is_none_or(|max| {
            matches!(value.natural_cmp(max), Some(Ordering::Less | Ordering::Equal))
        });

        above_min && below_max
    }

    /// The kind strings are parsed as by `from_string`.
    pub(crate) fn parse_kind(&self) -> Kind {
        let textual = [&self.min, &self.max]
            .into_iter()
            .flatten()
            .any(Value::is_str);

        if textual { Kind::Str } else { Kind::Number }
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.min, &self.max) {
            (Some(min), Some(max)) => write!(f, "{}..={}", min, max),
            (Some(min), None) => write!(f, "{}..", min),
            (None, Some(max)) => write!(f, "..={}", max),
            (None, None) => write!(f, ".."),
        }
    }
}

/// Exact match against `value`.
pub fn is(value: impl Into<Value>) -> Type {
    Type::new(TypeKind::Is(value.into()))
}

/// Membership in a builtin kind or schema class.
pub fn is_a(target: impl Into<IsATarget>) -> Type {
    Type::new(TypeKind::IsA(target.into()))
}

/// Accept every value `f` returns true for. `f` must not panic.
pub fn predicate(f: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Type {
    Type::new(TypeKind::Where(Arc::new(f)))
}

/// Inclusive bounds under the natural ordering of values.
pub fn bounded(min: Option<Value>, max: Option<Value>) -> Type {
    Type::new(TypeKind::Bounded(Bounds::new(min, max)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_bounds_accept_only_the_bound() {
        let ty = bounded(Some(0.into()), Some(0.into()));
        assert!(ty.test(&Value::Int(0)));
        assert!(!ty.test(&Value::Int(-1)));
        assert!(!ty.test(&Value::Int(1)));
        assert!(ty.test(&Value::Float(0.0)));
    }

    #[test]
    fn open_bounds() {
        let at_least_two = bounded(Some(2.into()), None);
        assert!(at_least_two.test(&Value::Int(1_000)));
        assert!(!at_least_two.test(&Value::Float(1.5)));
        assert!(!at_least_two.test(&Value::from("3")));

        let unbounded = bounded(None, None);
        assert!(unbounded.test(&Value::from("anything")));
        assert!(!unbounded.test(&Value::Null));
        assert!(!unbounded.test(&Value::Float(f64::NAN)));
    }

    #[test]
    fn textual_bounds_parse_strings() {
        let ty = bounded(Some("a".into()), Some("m".into()));
        assert_eq!(ty.from_string("hello"), Ok(Value::from("hello")));
        assert!(ty.from_string("zebra").unwrap_err().is_validation());
    }

    #[test]
    fn is_uses_structural_equality() {
        let ty = is(Value::List(vec![Value::Int(1)]));
        assert!(ty.test(&Value::List(vec![Value::Int(1)])));
        assert!(!ty.test(&Value::List(vec![Value::Float(1.0)])));
        assert_eq!(ty.name(), "Is([1])");
    }

    #[test]
    fn is_a_reports_the_kind_found() {
        let ty = is_a(Kind::Int);
        assert_eq!(
            ty.explain(&Value::Bool(true)).as_deref(),
            Some("expected an instance of `int`, found kind `bool`")
        );
        assert_eq!(ty.explain(&Value::Int(1)), None);
    }

    #[test]
    fn scalar_is_parses_its_own_kind() {
        assert_eq!(is(3).from_string("3"), Ok(Value::Int(3)));
        assert!(is(3).from_string("4").unwrap_err().is_validation());
        assert!(is(3).from_string("x").unwrap_err().is_parse());
    }
}
