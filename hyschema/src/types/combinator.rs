//! Combinators
//!
//! Boolean composition of types. All three combinators evaluate their members
//! with [`Type::test`].
use std::fmt;

use log::trace;
use smallvec::smallvec;

use crate::{
    types::{Type, TypeKind, TypeLike, make, primary::is},
    utils::Result,
    value::Value,
};

fn members<I>(types: I) -> super::Members
where
    I: IntoIterator,
    I::Item: Into<TypeLike>,
{
    types.into_iter().map(make).collect()
}

/// Accept values accepted by any member. Evaluation stops at the first success.
pub fn union<I>(types: I) -> Type
where
    I: IntoIterator,
    I::Item: Into<TypeLike>,
{
    Type::new(TypeKind::Union(members(types)))
}

/// Accept values accepted by every member.
pub fn intersection<I>(types: I) -> Type
where
    I: IntoIterator,
    I::Item: Into<TypeLike>,
{
    Type::new(TypeKind::Intersection(members(types)))
}

/// Accept values accepted by exactly one member.
pub fn xor<I>(types: I) -> Type
where
    I: IntoIterator,
    I::Item: Into<TypeLike>,
{
    Type::new(TypeKind::Xor(members(types)))
}

/// `null` or a value of `ty`.
pub fn maybe(ty: impl Into<TypeLike>) -> Type {
    let ty = make(ty);
    let name = format!("maybe({})", ty);
    Type::new(TypeKind::Union(smallvec![is(Value::Null), ty])).named(name)
}

/// Try each parsing member in declaration order and keep the first result the
/// combinator itself accepts.
pub(crate) fn members_from_string(combinator: &Type, members: &[Type], input: &str) -> Result<Value> {
    for member in members.iter().filter(|m| m.has_from_string()) {
        match member.from_string(input) {
            Ok(value) if combinator.test(&value) => return Ok(value),
            Ok(value) => trace!(
                "Member `{}` parsed {:?} into {} which `{}` rejects",
                member, input, value, combinator
            ),
            Err(err) => trace!("Member `{}` could not parse {:?}: {}", member, input, err),
        }
    }

    Err(combinator.parse_error(input))
}

pub(crate) fn fmt_members(f: &mut fmt::Formatter<'_>, members: &[Type], sep: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, member) in members.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        write!(f, "{}", member)?;
    }
    write!(f, ")")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        types::{
            builtin::{int, non_neg_int, string},
            primary::bounded,
        },
        utils::Error,
    };

    #[test]
    fn xor_requires_exactly_one_member() {
        let ty = xor([is(1), is(2)]);
        assert!(ty.test(&Value::Int(1)));
        assert!(!ty.test(&Value::Int(3)));

        let overlapping = xor([
            bounded(Some(0.into()), Some(10.into())),
            bounded(Some(5.into()), Some(15.into())),
        ]);
        assert!(overlapping.test(&Value::Int(2)));
        assert!(!overlapping.test(&Value::Int(7)));
        assert!(overlapping.test(&Value::Int(12)));
    }

    #[test]
    fn union_parses_with_first_accepting_member() {
        let ty = union([int(), string()]);
        assert_eq!(ty.from_string("12"), Ok(Value::Int(12)));
        assert_eq!(ty.from_string("twelve"), Ok(Value::from("twelve")));
    }

    #[test]
    fn intersection_parse_failure_names_the_input() {
        let ty = intersection([non_neg_int(), bounded(None, Some(10.into()))]);
        assert_eq!(ty.from_string("3"), Ok(Value::Int(3)));
        assert_eq!(
            ty.from_string("11"),
            Err(Error::Parse {
                type_name: ty.name(),
                input: "11".to_string(),
            })
        );
    }

    #[test]
    fn maybe_accepts_null() {
        let ty = maybe(int());
        assert_eq!(ty.name(), "maybe(int)");
        assert!(ty.test(&Value::Null));
        assert!(ty.test(&Value::Int(1)));
        assert!(!ty.test(&Value::from("1")));
        assert_eq!(ty.from_string("null"), Ok(Value::Null));
        assert_eq!(ty.from_string("4"), Ok(Value::Int(4)));
    }

    #[test]
    fn structural_names() {
        assert_eq!(union([is(1), is(2)]).name(), "(Is(1) | Is(2))");
        assert_eq!(xor([int(), string()]).name(), "(int ^ str)");
    }
}
