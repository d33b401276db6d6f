//! Type factory registry
//!
//! A [`TypeFactory`] maps a canonical name and a set of aliases to a
//! constructor producing a configured [`Type`]. Names and aliases share one
//! namespace: registering a name that is already taken (as a name or as an
//! alias) fails with [`Error::RegistryConflict`].
//!
//! The process-wide factory returned by [`global`] is pre-populated with the
//! builtin types:
//!
//! ```rust
//! # use hyschema::{factory, value::Value};
//! let int = factory::global().make_type("integer", &[]).unwrap();
//! assert!(int.test(&Value::Int(5)));
//! assert_eq!(int.from_string("5"), Ok(Value::Int(5)));
//! ```
use std::{collections::HashMap, sync::Arc};

use indexmap::IndexMap;
use log::debug;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::{
    types::{
        ArrayType, HashType, Length, Type, TypeLike, attrs, bounded, builtin, intersection,
        is, is_a, make, maybe, responds, union, xor,
    },
    utils::{Error, Result},
    value::{Kind, Value},
};

/// Builds a type out of positional arguments.
pub type Constructor = Arc<dyn Fn(&[TypeLike]) -> Result<Type> + Send + Sync>;

#[derive(Clone)]
struct Entry {
    aliases: SmallVec<[String; 2]>,
    constructor: Constructor,
}

#[derive(Default)]
struct Tables {
    /// Canonical name to entry, in registration order.
    entries: IndexMap<String, Entry>,
    /// Every name and alias to its canonical name.
    lookup: HashMap<String, String>,
}

/// A registry of named type constructors.
///
/// # A note on concurrency
/// Reads take a shared lock and may happen from any thread. Registration
/// takes an exclusive lock; it is meant to happen while the program sets
/// itself up, before the factory is shared with workers.
#[derive(Default)]
pub struct TypeFactory {
    tables: RwLock<Tables>,
}

static GLOBAL: Lazy<TypeFactory> = Lazy::new(|| match TypeFactory::with_builtins() {
    Ok(factory) => factory,
    Err(err) => unreachable!("builtin type names are distinct: {}", err),
});

/// The process-wide factory, pre-populated with the builtin types.
pub fn global() -> &'static TypeFactory {
    &GLOBAL
}

impl TypeFactory {
    /// Create an empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a factory holding the builtin types.
    pub fn with_builtins() -> Result<Self> {
        let factory = Self::new();
        factory.install_builtins()?;
        Ok(factory)
    }

    /// Register `constructor` under `name` and every alias of `aliases`.
    ///
    /// Nothing is registered if any of the names is already taken.
    pub fn register<F>(&self, name: &str, aliases: &[&str], constructor: F) -> Result<()>
    where
        F: Fn(&[TypeLike]) -> Result<Type> + Send + Sync + 'static,
    {
        let mut tables = self.tables.write();

        let mut claimed: SmallVec<[&str; 4]> = SmallVec::new();
        for candidate in std::iter::once(name).chain(aliases.iter().copied()) {
            if tables.lookup.contains_key(candidate) || claimed.contains(&candidate) {
                return Err(Error::RegistryConflict {
                    registry: "type factory".to_string(),
                    name: candidate.to_string(),
                });
            }
            claimed.push(candidate);
        }

        for candidate in &claimed {
            tables
                .lookup
                .insert(candidate.to_string(), name.to_string());
        }
        tables.entries.insert(
            name.to_string(),
            Entry {
                aliases: aliases.iter().map(|a| a.to_string()).collect(),
                constructor: Arc::new(constructor),
            },
        );

        debug!("Registered type factory `{}` (aliases: {:?})", name, aliases);
        Ok(())
    }

    /// Canonical name behind `name`, which may be an alias.
    pub fn canonical_name(&self, name: &str) -> Option<String> {
        self.tables.read().lookup.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.read().lookup.contains_key(name)
    }

    /// Canonical names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.tables.read().entries.keys().cloned().collect()
    }

    pub fn aliases(&self, name: &str) -> Result<Vec<String>> {
        let tables = self.tables.read();
        let canonical = tables
            .lookup
            .get(name)
            .ok_or_else(|| Error::UnknownType(name.to_string()))?;
        Ok(tables.entries[canonical].aliases.to_vec())
    }

    /// Look up the constructor registered under `name` or one of its aliases.
    pub fn resolve(&self, name: &str) -> Result<Constructor> {
        let tables = self.tables.read();
        tables
            .lookup
            .get(name)
            .and_then(|canonical| tables.entries.get(canonical))
            .map(|entry| entry.constructor.clone())
            .ok_or_else(|| Error::UnknownType(name.to_string()))
    }

    /// Resolve `name` and build a type from `args`.
    pub fn make_type(&self, name: &str, args: &[TypeLike]) -> Result<Type> {
        // The lock is released before the constructor runs.
        let constructor = self.resolve(name)?;
        constructor(args)
    }

    /// Coerce `value` into a type. See [`crate::types::make`].
    pub fn make(&self, value: impl Into<TypeLike>) -> Type {
        make(value)
    }

    fn install_builtins(&self) -> Result<()> {
        fn fixed(
            factory: &TypeFactory,
            name: &'static str,
            aliases: &[&str],
            build: fn() -> Type,
        ) -> Result<()> {
            factory.register(name, aliases, move |args| {
                expect_arity(name, args, 0..=0)?;
                Ok(build())
            })
        }

        fixed(self, "any", &[], builtin::any)?;
        fixed(self, "null", &["nil"], builtin::null)?;
        fixed(self, "bool", &["boolean"], builtin::boolean)?;
        fixed(self, "true", &[], builtin::true_)?;
        fixed(self, "false", &[], builtin::false_)?;
        fixed(self, "int", &["integer"], builtin::int)?;
        fixed(self, "pos_int", &["positive_integer"], builtin::pos_int)?;
        fixed(self, "neg_int", &["negative_integer"], builtin::neg_int)?;
        fixed(self, "non_neg_int", &["unsigned", "index"], builtin::non_neg_int)?;
        fixed(self, "non_pos_int", &[], builtin::non_pos_int)?;
        fixed(self, "float", &[], builtin::float)?;
        fixed(self, "num", &["number", "numeric"], builtin::num)?;
        fixed(self, "str", &["string"], builtin::string)?;
        fixed(self, "non_empty_str", &[], builtin::non_empty_str)?;

        self.register("array", &["list", "vec"], |args| {
            expect_arity("array", args, 0..=1)?;
            Ok(match args.first() {
                Some(item) => ArrayType::new().item(item.clone()).into(),
                None => builtin::list(),
            })
        })?;

        self.register("hash", &["map", "dict"], |args| {
            match args {
                [] => Ok(builtin::map()),
                [key, value] => Ok(HashType::new().key(key.clone()).value(value.clone()).into()),
                _ => Err(invalid("hash", "expected no arguments or a key and a value type")),
            }
        })?;

        self.register("maybe", &["optional", "nullable"], |args| {
            expect_arity("maybe", args, 1..=1)?;
            Ok(maybe(args[0].clone()))
        })?;

        self.register("union", &["one_of", "any_of"], |args| {
            expect_arity("union", args, 1..=usize::MAX)?;
            Ok(union(args.iter().cloned()))
        })?;

        self.register("intersection", &["all_of"], |args| {
            expect_arity("intersection", args, 1..=usize::MAX)?;
            Ok(intersection(args.iter().cloned()))
        })?;

        self.register("xor", &["exactly_one_of"], |args| {
            expect_arity("xor", args, 1..=usize::MAX)?;
            Ok(xor(args.iter().cloned()))
        })?;

        self.register("is", &["eq"], |args| {
            expect_arity("is", args, 1..=1)?;
            Ok(is(value_arg("is", &args[0])?))
        })?;

        self.register("is_a", &["instance_of"], |args| {
            expect_arity("is_a", args, 1..=1)?;
            match &args[0] {
                TypeLike::Kind(kind) => Ok(is_a(*kind)),
                TypeLike::Class(class) => Ok(is_a(class)),
                TypeLike::Value(Value::Str(name)) => name
                    .parse::<Kind>()
                    .map(|kind| is_a(kind))
                    .map_err(|_| invalid("is_a", format!("`{}` is not a builtin kind", name))),
                _ => Err(invalid("is_a", "expected a kind or a schema class")),
            }
        })?;

        self.register("bounded", &["range"], |args| {
            expect_arity("bounded", args, 2..=2)?;
            let bound = |arg: &TypeLike| -> Result<Option<Value>> {
                Ok(match value_arg("bounded", arg)? {
                    Value::Null => None,
                    value => Some(value),
                })
            };
            Ok(bounded(bound(&args[0])?, bound(&args[1])?))
        })?;

        self.register("attrs", &["has_attrs"], |args| {
            Ok(attrs(named_pairs("attrs", args)?))
        })?;

        self.register("responds", &["respond_to"], |args| {
            Ok(responds(named_pairs("responds", args)?, true))
        })?;

        self.register("length", &[], |args| {
            let size = |arg: &TypeLike| -> Result<Option<usize>> {
                match value_arg("length", arg)? {
                    Value::Null => Ok(None),
                    Value::Int(n) => usize::try_from(n)
                        .map(Some)
                        .map_err(|_| invalid("length", "lengths cannot be negative")),
                    other => Err(invalid("length", format!("{} is not a length", other))),
                }
            };
            let length = match args {
                [exact] => match size(exact)? {
                    Some(n) => Length::exactly(n),
                    None => Length::default(),
                },
                [min, max] => Length {
                    min: size(min)?,
                    max: size(max)?,
                },
                _ => return Err(invalid("length", "expected an exact length or min and max")),
            };
            Ok(builtin::length(length))
        })?;

        Ok(())
    }
}

fn invalid(type_name: &str, reason: impl Into<String>) -> Error {
    Error::InvalidArguments {
        type_name: type_name.to_string(),
        reason: reason.into(),
    }
}

fn expect_arity(
    type_name: &str,
    args: &[TypeLike],
    arity: std::ops::RangeInclusive<usize>,
) -> Result<()> {
    if arity.contains(&args.len()) {
        return Ok(());
    }

    let expected = match (*arity.start(), *arity.end()) {
        (min, max) if min == max => format!("{}", min),
        (min, usize::MAX) => format!("at least {}", min),
        (min, max) => format!("{} to {}", min, max),
    };
    Err(invalid(
        type_name,
        format!("expected {} argument(s), got {}", expected, args.len()),
    ))
}

fn value_arg(type_name: &str, arg: &TypeLike) -> Result<Value> {
    match arg {
        TypeLike::Value(value) => Ok(value.clone()),
        other => Err(invalid(type_name, format!("expected a value, got {:?}", other))),
    }
}

/// Alternating `name, type, name, type, ...` arguments.
fn named_pairs(type_name: &str, args: &[TypeLike]) -> Result<Vec<(String, TypeLike)>> {
    if args.is_empty() || args.len() % 2 != 0 {
        return Err(invalid(
            type_name,
            "expected alternating attribute names and types",
        ));
    }

    args.chunks(2)
        .map(|pair| match &pair[0] {
            TypeLike::Value(Value::Str(name)) => Ok((name.clone(), pair[1].clone())),
            other => Err(invalid(
                type_name,
                format!("expected an attribute name, got {:?}", other),
            )),
        })
        .collect()
}
