//! Property descriptors
//!
//! A [`Prop`] describes one named, typed property of a [`SchemaClass`].
//! Primary props store their value in the instance; derived props (those
//! with a [`Source`]) read existing state and are never stored nor
//! type-checked on read.
use std::{
    fmt,
    sync::{Arc, Weak},
};

use indexmap::IndexMap;

use crate::{
    schema::{ClassRef, DEFAULT_CLASS_KEY, Instance, MethodFn, PlainDataOptions, SchemaClass},
    types::{ToDataFn, Type, TypeLike, make},
    utils::{Error, Result},
    value::Value,
};

/// Where a derived property reads its value from.
#[derive(Clone)]
pub enum Source {
    /// A raw instance field (see [`Instance::set_field`]).
    Field(String),
    /// A method of the instance, or one of its primary properties.
    Method(String),
    /// A computation over the instance.
    Compute(MethodFn),
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Field(name) => f.debug_tuple("Field").field(name).finish(),
            Source::Method(name) => f.debug_tuple("Method").field(name).finish(),
            Source::Compute(_) => f.write_str("Compute(..)"),
        }
    }
}

/// Explicit plain-data conversion of a property.
#[derive(Clone)]
pub enum ToDataHook {
    /// The exported data is the response of the property value to this
    /// message (see [`Value::send`]).
    Method(String),
    /// The exported data is this function applied to the property value.
    Func(ToDataFn),
}

impl fmt::Debug for ToDataHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToDataHook::Method(name) => f.debug_tuple("Method").field(name).finish(),
            ToDataHook::Func(_) => f.write_str("Func(..)"),
        }
    }
}

/// Declaration options of [`SchemaClass::prop`].
#[derive(Debug, Clone)]
pub struct PropOptions {
    ty: TypeLike,
    default: Option<Value>,
    source: Option<Source>,
    to_data: Option<ToDataHook>,
    doc: Option<String>,
}

impl PropOptions {
    /// `ty` is coerced with [`make`]: a class becomes an `IsA`, a plain value
    /// an exact match.
    pub fn new(ty: impl Into<TypeLike>) -> Self {
        Self {
            ty: ty.into(),
            default: None,
            source: None,
            to_data: None,
            doc: None,
        }
    }

    /// Value used when construction values omit the property. Every instance
    /// receives its own deep copy.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    pub fn field(self, name: impl Into<String>) -> Self {
        self.source(Source::Field(name.into()))
    }

    pub fn method(self, name: impl Into<String>) -> Self {
        self.source(Source::Method(name.into()))
    }

    pub fn compute<F>(self, f: F) -> Self
    where
        F: Fn(&Instance) -> Result<Value> + Send + Sync + 'static,
    {
        self.source(Source::Compute(Arc::new(f)))
    }

    /// Export the property as the response of its value to the message `name`.
    pub fn to_data_method(mut self, name: impl Into<String>) -> Self {
        self.to_data = Some(ToDataHook::Method(name.into()));
        self
    }

    /// Export the property through `f`. Document the property with
    /// [`PropOptions::doc`] when `f` loses information, since such props do
    /// not survive a plain-data round-trip.
    pub fn to_data_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.to_data = Some(ToDataHook::Func(Arc::new(f)));
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}

pub struct Prop {
    defined_in: Weak<SchemaClass>,
    class_name: String,
    name: String,
    ty: Type,
    default: Option<Value>,
    source: Option<Source>,
    to_data: Option<ToDataHook>,
    doc: Option<String>,
}

impl Prop {
    pub(crate) fn new(class: &ClassRef, name: String, options: PropOptions) -> Self {
        let PropOptions {
            ty,
            default,
            source,
            to_data,
            doc,
        } = options;

        Self {
            defined_in: Arc::downgrade(class),
            class_name: class.name().to_string(),
            name,
            ty: make(ty),
            default,
            source,
            to_data,
            doc,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Primary props are stored in the instance. Derived ones have a source.
    pub fn is_primary(&self) -> bool {
        self.source.is_none()
    }

    /// Name of the class that declared this property.
    pub fn defined_in(&self) -> &str {
        &self.class_name
    }

    /// The class that declared this property, if it is still alive.
    pub fn defined_in_class(&self) -> Option<ClassRef> {
        self.defined_in.upgrade()
    }

    fn unset(&self) -> Error {
        Error::Unset {
            class: self.class_name.clone(),
            prop: self.name.clone(),
        }
    }

    /// Read the property from `instance`. Derived values are not type-checked.
    pub fn get(&self, instance: &Instance) -> Result<Value> {
        match &self.source {
            None => instance
                .values()
                .and_then(|values| values.get(&self.name))
                .cloned()
                .ok_or_else(|| self.unset()),
            Some(Source::Field(field)) => instance.field(field).cloned().ok_or_else(|| Error::Unset {
                class: self.class_name.clone(),
                prop: field.clone(),
            }),
            Some(Source::Method(method)) => call_source(instance, method),
            Some(Source::Compute(compute)) => compute(instance),
        }
    }

    /// Type-check `value` and store it. The store is untouched on failure.
    pub fn set(&self, instance: &mut Instance, value: Value) -> Result<()> {
        if !self.is_primary() {
            return Err(Error::DerivedProp {
                class: self.class_name.clone(),
                prop: self.name.clone(),
            });
        }

        let value = self.ty.check(value).map_err(|err| match err {
            Error::Validation {
                type_name,
                value,
                reason,
                ..
            } => Error::PropValidation {
                class: self.class_name.clone(),
                prop: self.name.clone(),
                type_name,
                value,
                reason,
            },
            other => other,
        })?;

        instance.store(self.name.clone(), value);
        Ok(())
    }

    /// Set the property from construction values, falling back to a copy of
    /// the default.
    pub fn set_from_values(
        &self,
        instance: &mut Instance,
        values: &IndexMap<String, Value>,
    ) -> Result<()> {
        match (values.get(&self.name), &self.default) {
            (Some(value), _) => self.set(instance, value.clone()),
            (None, Some(default)) => self.set(instance, default.deep_copy()),
            (None, None) => Err(Error::MissingValue {
                class: self.class_name.clone(),
                prop: self.name.clone(),
            }),
        }
    }

    /// Export the property of `instance` as plain data.
    pub fn to_data(&self, instance: &Instance) -> Result<Value> {
        self.to_data_with(instance, &PlainDataOptions::default())
    }

    /// Same as [`Prop::to_data`], exporting nested schema objects with
    /// `options`.
    ///
    /// A hook of the property wins. Otherwise a schema object exports itself
    /// before the type's own conversion is consulted.
    pub fn to_data_with(&self, instance: &Instance, options: &PlainDataOptions) -> Result<Value> {
        let value = self.get(instance)?;

        match &self.to_data {
            Some(ToDataHook::Method(message)) => respond(&value, message),
            Some(ToDataHook::Func(convert)) => convert(&value),
            None => match &value {
                Value::Object(object) => object.to_plain_data(options),
                _ => self.ty.to_data_with(&value, options),
            },
        }
    }

    /// Convert raw plain data into a value for this property.
    pub fn from_data(&self, raw: Value) -> Result<Value> {
        self.from_data_with(raw, DEFAULT_CLASS_KEY)
    }

    /// Same as [`Prop::from_data`], reading nested discriminators under
    /// `class_key`.
    pub fn from_data_with(&self, raw: Value, class_key: &str) -> Result<Value> {
        self.ty.from_data_with(raw, class_key)
    }
}

/// Methods first, then primary props. Derived props are not consulted, so a
/// method source never resolves to itself.
fn call_source(instance: &Instance, method: &str) -> Result<Value> {
    let class = instance.class();

    if let Some(found) = class.find_method(method) {
        return found.call(instance);
    }

    match class.prop_named(method) {
        Some(prop) if prop.is_primary() => prop.get(instance),
        _ => Err(Error::UnknownMethod {
            class: class.name().to_string(),
            method: method.to_string(),
        }),
    }
}

fn respond(value: &Value, message: &str) -> Result<Value> {
    value.send(message, false).unwrap_or_else(|| {
        Err(Error::UnknownMethod {
            class: match value {
                Value::Object(object) => object.class().name().to_string(),
                other => other.kind().to_string(),
            },
            method: message.to_string(),
        })
    })
}

impl fmt::Debug for Prop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prop")
            .field("defined_in", &self.class_name)
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("default", &self.default)
            .field("source", &self.source)
            .field("to_data", &self.to_data)
            .finish()
    }
}
