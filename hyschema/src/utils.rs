use strum::{Display, EnumIs};
use thiserror::Error;

/// Optional operations a [`crate::types::Type`] may or may not support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Capability {
    #[strum(serialize = "from_string")]
    FromString,
    #[strum(serialize = "to_data")]
    ToData,
}

/// The specific attribute (or message response) that made an `Attrs` or
/// `Responds` type reject a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeMismatch {
    pub name: String,
    pub expected: String,
    /// `None` when the value does not expose the attribute at all.
    pub actual: Option<String>,
}

impl std::fmt::Display for AttributeMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.actual {
            Some(actual) => write!(
                f,
                "attribute `{}` = {} does not satisfy `{}`",
                self.name, actual, self.expected
            ),
            None => write!(
                f,
                "attribute `{}` is missing (expected `{}`)",
                self.name, self.expected
            ),
        }
    }
}

fn reason_suffix(reason: &Option<String>) -> String {
    match reason {
        Some(reason) => format!(": {}", reason),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs, Error)]
pub enum Error {
    /// A value failed a type check.
    #[error("Value {value} does not satisfy type `{type_name}`{}", reason_suffix(.reason))]
    Validation {
        type_name: String,
        value: String,
        reason: Option<String>,
        attribute: Option<AttributeMismatch>,
    },

    /// A value assigned to a property failed the property's type check. The store is left untouched.
    #[error(
        "Cannot set property `{class}.{prop}` to {value}: expected a value of type `{type_name}`{}",
        reason_suffix(.reason)
    )]
    PropValidation {
        class: String,
        prop: String,
        type_name: String,
        value: String,
        reason: Option<String>,
    },

    /// The type does not implement the requested optional operation. This is a configuration
    /// mistake rather than a bad input.
    #[error("Type `{type_name}` does not support `{capability}`")]
    Capability {
        type_name: String,
        capability: Capability,
    },

    /// A string could not be parsed into a value of the given type.
    #[error("Unable to parse {input:?} as a value of type `{type_name}`")]
    Parse { type_name: String, input: String },

    /// A type factory was handed arguments it cannot build a type from.
    #[error("Invalid arguments for type factory `{type_name}`: {reason}")]
    InvalidArguments { type_name: String, reason: String },

    /// A name (or alias) was registered twice.
    #[error("The name `{name}` is already registered in the {registry}")]
    RegistryConflict { registry: String, name: String },

    #[error("No type factory is registered under the name `{0}`")]
    UnknownType(String),

    #[error("No schema class is registered under the name `{0}`")]
    UnknownClass(String),

    #[error("Class `{class}` does not declare a property named `{prop}`")]
    UnknownProp { class: String, prop: String },

    #[error("Class `{class}` has no method or accessor named `{method}`")]
    UnknownMethod { class: String, method: String },

    /// A required property was absent from the construction values and has no default.
    #[error("Missing required value for property `{class}.{prop}`")]
    MissingValue { class: String, prop: String },

    /// A primary property (or a field read by a derived property) was read before being written.
    #[error("Property `{class}.{prop}` was read before any value was stored")]
    Unset { class: String, prop: String },

    /// Derived properties are computed from existing state and cannot be assigned.
    #[error("Property `{class}.{prop}` is derived and cannot be assigned")]
    DerivedProp { class: String, prop: String },

    /// The discriminator of a document does not name a registered schema class.
    #[error("Refusing to load document through discriminator `{key}`: {reason}")]
    UnsafeLoad { key: String, reason: String },

    /// JSON, YAML or TOML encoding/decoding failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, Error>;
