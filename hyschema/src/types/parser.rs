//! String-literal parsing
//!
//! Textual forms are what CLI flags, environment variables and inline
//! configuration hand us. Scalars use their usual literal syntax. Containers
//! are sniffed: input starting with `[` or `{` is first read as a JSON/YAML
//! flow literal, and when that fails (or the input is not sniffed) it is read
//! with the simple comma-delimited grammar:
//!
//! ```text
//! list := item ("," item)*
//! map  := key ":" value ("," key ":" value)*   // split on the last ':'
//! ```
use chumsky::prelude::*;
use log::trace;

use crate::{
    types::Type,
    utils::Result,
    value::{Kind, Value, ValueMap},
};

const TRUE_TOKENS: &[&str] = &["true", "t", "yes", "y", "on", "1"];
const FALSE_TOKENS: &[&str] = &["false", "f", "no", "n", "off", "0"];
const NULL_TOKENS: &[&str] = &["", "null", "nil", "none", "~"];

/// Parse an integer literal. Accepts a sign, `_` separators and the
/// `0x`/`0o`/`0b` radix prefixes.
pub fn parse_int(input: &str) -> Option<i64> {
    let cleaned: String = input.trim().chars().filter(|c| *c != '_').collect();
    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.strip_prefix('+').unwrap_or(&cleaned)),
    };

    let (radix, digits) = match digits.get(..2).map(str::to_ascii_lowercase).as_deref() {
        Some("0x") => (16, &digits[2..]),
        Some("0o") => (8, &digits[2..]),
        Some("0b") => (2, &digits[2..]),
        _ => (10, digits),
    };

    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }

    let magnitude = i128::from_str_radix(digits, radix).ok()?;
    i64::try_from(if negative { -magnitude } else { magnitude }).ok()
}

pub fn parse_float(input: &str) -> Option<f64> {
    let cleaned: String = input.trim().chars().filter(|c| *c != '_').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

pub fn parse_bool(input: &str) -> Option<bool> {
    let token = input.trim().to_ascii_lowercase();
    if TRUE_TOKENS.contains(&token.as_str()) {
        Some(true)
    } else if FALSE_TOKENS.contains(&token.as_str()) {
        Some(false)
    } else {
        None
    }
}

pub fn parse_null(input: &str) -> Option<()> {
    let token = input.trim().to_ascii_lowercase();
    NULL_TOKENS.contains(&token.as_str()).then_some(())
}

/// Parse a single token as a value of the scalar `kind`.
///
/// Returns `None` for non-scalar kinds or when the token is not understood.
pub fn parse_scalar(kind: Kind, input: &str) -> Option<Value> {
    match kind {
        Kind::Null => parse_null(input).map(|_| Value::Null),
        Kind::Bool => parse_bool(input).map(Value::Bool),
        Kind::Int => parse_int(input).map(Value::Int),
        Kind::Float => parse_float(input).map(Value::Float),
        Kind::Number => parse_int(input)
            .map(Value::Int)
            .or_else(|| parse_float(input).map(Value::Float)),
        Kind::Str => Some(Value::Str(input.to_string())),
        Kind::List | Kind::Map | Kind::Object => None,
    }
}

/// First significant character of the input.
fn sniff(input: &str) -> Option<char> {
    input.trim_start().chars().next()
}

/// Read a JSON/YAML flow literal.
fn parse_literal(input: &str) -> Option<Value> {
    match serde_yaml::from_str::<serde_yaml::Value>(input) {
        Ok(value) => Some(value.into()),
        Err(err) => {
            trace!("{:?} is not a valid literal: {}", input, err);
            None
        }
    }
}

/// Comma-separated segments. Trailing empty segments are dropped.
fn segments<'src>() -> impl Parser<'src, &'src str, Vec<&'src str>, extra::Err<Rich<'src, char>>> + Clone
{
    none_of(",")
        .repeated()
        .to_slice()
        .separated_by(just(','))
        .collect::<Vec<_>>()
}

fn split_segments(input: &str) -> Option<Vec<&str>> {
    let mut parts = segments().parse(input).into_result().ok()?;
    while parts.last().is_some_and(|part| part.trim().is_empty()) {
        parts.pop();
    }
    Some(parts)
}

/// Interpret a literal element (or key) with `ty`: accepted values are kept,
/// strings are parsed when `ty` knows how.
fn coerce(ty: Option<&Type>, value: Value) -> Option<Value> {
    let Some(ty) = ty else {
        return Some(value);
    };

    if ty.test(&value) {
        return Some(value);
    }

    match &value {
        Value::Str(s) if ty.has_from_string() => ty.from_string(s).ok(),
        // Keys of a flow map are scalars; numbers and booleans may still be
        // wanted as strings.
        Value::Int(_) | Value::Float(_) | Value::Bool(_) if ty.has_from_string() => {
            ty.from_string(&value.to_string()).ok()
        }
        _ => None,
    }
}

fn parse_token(ty: Option<&Type>, token: &str) -> Option<Value> {
    let token = token.trim();
    match ty {
        Some(ty) if ty.has_from_string() => ty.from_string(token).ok(),
        Some(_) => None,
        None => Some(Value::Str(token.to_string())),
    }
}

fn literal_list(input: &str, item: Option<&Type>) -> Option<Vec<Value>> {
    match parse_literal(input)? {
        Value::List(items) => items.into_iter().map(|v| coerce(item, v)).collect(),
        _ => None,
    }
}

fn simple_list(input: &str, item: Option<&Type>) -> Option<Vec<Value>> {
    split_segments(input)?
        .into_iter()
        .map(|segment| parse_token(item, segment))
        .collect()
}

/// Parse the textual form of a list for `ty`, whose items satisfy `item`.
pub fn parse_list(ty: &Type, input: &str, item: Option<&Type>) -> Result<Vec<Value>> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }

    if sniff(input) == Some('[') {
        if let Some(items) = literal_list(input, item) {
            return Ok(items);
        }
        trace!(
            "{:?} looks like a list literal but does not parse as `{}`, falling back to the simple parser",
            input, ty
        );
    }

    simple_list(input, item).ok_or_else(|| ty.parse_error(input))
}

fn literal_map(input: &str, key: Option<&Type>, value: Option<&Type>) -> Option<ValueMap> {
    match parse_literal(input)? {
        Value::Map(map) => map
            .into_iter()
            .map(|(k, v)| Some((coerce(key, k)?, coerce(value, v)?)))
            .collect(),
        _ => None,
    }
}

fn simple_map(input: &str, key: Option<&Type>, value: Option<&Type>) -> Option<ValueMap> {
    split_segments(input)?
        .into_iter()
        .map(|segment| {
            let (k, v) = segment.rsplit_once(':')?;
            Some((parse_token(key, k)?, parse_token(value, v)?))
        })
        .collect()
}

/// Parse the textual form of a map for `ty`.
pub fn parse_map(
    ty: &Type,
    input: &str,
    key: Option<&Type>,
    value: Option<&Type>,
) -> Result<ValueMap> {
    if input.trim().is_empty() {
        return Ok(ValueMap::new());
    }

    if sniff(input) == Some('{') {
        if let Some(map) = literal_map(input, key, value) {
            return Ok(map);
        }
        trace!(
            "{:?} looks like a map literal but does not parse as `{}`, falling back to the simple parser",
            input, ty
        );
    }

    simple_map(input, key, value).ok_or_else(|| ty.parse_error(input))
}
