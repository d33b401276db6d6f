//! Runtime type algebra and typed property schemas.
//!
//! [`types`] builds composable, named validators over dynamic [`value::Value`]s.
//! [`schema`] attaches typed properties to classes whose instances round-trip
//! through plain data, JSON and YAML.

pub mod factory;
pub mod schema;
pub mod types;
pub mod utils;
pub mod value;

pub use schema::{Instance, PlainDataOptions, PropOptions, SchemaClass, SchemaRegistry};
pub use types::{Type, TypeLike, make};
pub use utils::{Error, Result};
pub use value::{Kind, Value};
