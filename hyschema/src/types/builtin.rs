//! Named builtin types. These back the default entries of the
//! [`crate::factory::TypeFactory`].
use crate::{
    types::{
        Type,
        aggregate::{ArrayType, HashType, Length, attrs},
        combinator::intersection,
        primary::{bounded, is, is_a, predicate},
    },
    value::{Kind, Value},
};

/// Accepts everything. Strings parse to themselves.
pub fn any() -> Type {
    predicate(|_| true)
        .named("any")
        .with_from_string(|s| Ok(Value::Str(s.to_string())))
}

pub fn null() -> Type {
    is(Value::Null).named("null")
}

pub fn boolean() -> Type {
    is_a(Kind::Bool).named("bool")
}

pub fn true_() -> Type {
    is(true).named("true")
}

pub fn false_() -> Type {
    is(false).named("false")
}

pub fn int() -> Type {
    is_a(Kind::Int).named("int")
}

fn int_within(name: &str, min: Option<i64>, max: Option<i64>) -> Type {
    intersection([int(), bounded(min.map(Value::Int), max.map(Value::Int))]).named(name)
}

pub fn pos_int() -> Type {
    int_within("pos_int", Some(1), None)
}

pub fn neg_int() -> Type {
    int_within("neg_int", None, Some(-1))
}

pub fn non_neg_int() -> Type {
    int_within("non_neg_int", Some(0), None)
}

pub fn non_pos_int() -> Type {
    int_within("non_pos_int", None, Some(0))
}

pub fn float() -> Type {
    is_a(Kind::Float).named("float")
}

/// Integers and floats.
pub fn num() -> Type {
    is_a(Kind::Number).named("num")
}

pub fn string() -> Type {
    is_a(Kind::Str).named("str")
}

pub fn non_empty_str() -> Type {
    intersection([string(), length(Length {
        min: Some(1),
        max: None,
    })])
    .named("non_empty_str")
}

/// Any list.
pub fn list() -> Type {
    Type::from(ArrayType::new()).named("array")
}

/// Any map.
pub fn map() -> Type {
    Type::from(HashType::new()).named("hash")
}

/// Values whose `len` lies within `length`.
pub fn length(length: Length) -> Type {
    let name = format!("length({})", length);
    attrs([(
        "len",
        bounded(
            length.min.map(Value::from),
            length.max.map(Value::from),
        ),
    )])
    .named(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_parses_and_rejects_strings() {
        assert!(int().test(&Value::Int(5)));
        assert!(!int().test(&Value::from("5")));
        assert_eq!(int().from_string("5"), Ok(Value::Int(5)));
    }

    #[test]
    fn signed_ranges() {
        assert!(pos_int().test(&Value::Int(1)));
        assert!(!pos_int().test(&Value::Int(0)));
        assert!(non_neg_int().test(&Value::Int(0)));
        assert!(neg_int().test(&Value::Int(-1)));
        assert!(non_pos_int().test(&Value::Int(0)));
        assert!(!non_pos_int().test(&Value::Float(-1.0)));
        assert!(non_neg_int().from_string("-3").unwrap_err().is_parse());
    }

    #[test]
    fn non_empty_strings() {
        assert!(non_empty_str().test(&Value::from("a")));
        assert!(!non_empty_str().test(&Value::from("")));
        assert_eq!(non_empty_str().from_string("x"), Ok(Value::from("x")));
    }

    #[test]
    fn num_accepts_both_numeric_kinds() {
        assert_eq!(num().from_string("2"), Ok(Value::Int(2)));
        assert_eq!(num().from_string("2.5"), Ok(Value::Float(2.5)));
        assert_eq!(float().from_string("2"), Ok(Value::Float(2.0)));
    }

    #[test]
    fn length_applies_to_lists_and_strings() {
        let ty = length(Length::exactly(2));
        assert_eq!(ty.name(), "length(2)");
        assert!(ty.test(&Value::from("ab")));
        assert!(ty.test(&Value::List(vec![Value::Null, Value::Null])));
        assert!(!ty.test(&Value::Int(2)));
    }
}
