use std::fmt;

use indexmap::IndexMap;

use crate::{
    schema::{ClassRef, PlainDataOptions, Visibility},
    utils::{Error, Result},
    value::{Value, ValueMap},
};

/// An instance of a [`crate::schema::SchemaClass`].
///
/// Primary property values live in a store that is only allocated on the
/// first write. Raw fields, read by [`crate::schema::Source::Field`]
/// properties, are kept apart from it and are never exported.
#[derive(Clone)]
pub struct Instance {
    class: ClassRef,
    values: Option<IndexMap<String, Value>>,
    fields: IndexMap<String, Value>,
}

impl Instance {
    pub(crate) fn new(class: ClassRef) -> Self {
        Self {
            class,
            values: None,
            fields: IndexMap::new(),
        }
    }

    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    /// Stored primary values, `None` until the first one is written.
    pub fn values(&self) -> Option<&IndexMap<String, Value>> {
        self.values.as_ref()
    }

    pub(crate) fn store(&mut self, name: String, value: Value) {
        self.values.get_or_insert_with(IndexMap::new).insert(name, value);
    }

    /// Set every primary property, in registry order, from `values`.
    ///
    /// Stops at the first missing required value; properties set before it
    /// keep their value.
    pub fn initialize_from(&mut self, values: &IndexMap<String, Value>) -> Result<()> {
        for prop in self.class.props(false, true).into_values() {
            prop.set_from_values(self, values)?;
        }
        Ok(())
    }

    fn unknown_prop(&self, name: &str) -> Error {
        Error::UnknownProp {
            class: self.class.name().to_string(),
            prop: name.to_string(),
        }
    }

    /// Read the property `name`.
    pub fn get(&self, name: &str) -> Result<Value> {
        let prop = self
            .class
            .prop_named(name)
            .ok_or_else(|| self.unknown_prop(name))?;
        prop.get(self)
    }

    /// Read the property `name` and convert it into `T`.
    pub fn get_as<T>(&self, name: &str) -> Result<T>
    where
        T: TryFrom<Value, Error = Error>,
    {
        T::try_from(self.get(name)?)
    }

    /// Type-check and store `value` as the property `name`.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let prop = self
            .class
            .prop_named(name)
            .ok_or_else(|| self.unknown_prop(name))?;
        prop.set(self, value.into())
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Invoke `message` on this instance: methods first, then property
    /// accessors. Private methods do not answer when `public_only` is set.
    pub fn send(&self, message: &str, public_only: bool) -> Option<Result<Value>> {
        if let Some(method) = self.class.find_method(message) {
            if public_only && method.visibility() == Visibility::Private {
                return None;
            }
            return Some(method.call(self));
        }

        self.class.prop_named(message).map(|prop| prop.get(self))
    }

    /// Copy this instance, its values and fields included, without sharing
    /// nested instances with the original.
    pub fn deep_copy(&self) -> Instance {
        let copy = |map: &IndexMap<String, Value>| {
            map.iter()
                .map(|(k, v)| (k.clone(), v.deep_copy()))
                .collect::<IndexMap<_, _>>()
        };

        Instance {
            class: self.class.clone(),
            values: self.values.as_ref().map(copy),
            fields: copy(&self.fields),
        }
    }

    /// Export this instance as plain data: a map from property names to their
    /// exported values, plus the discriminator unless disabled.
    pub fn to_plain_data(&self, options: &PlainDataOptions) -> Result<Value> {
        let mut data = ValueMap::new();

        let nested = options.nested();
        for (name, prop) in self.class.props(options.only_own, options.only_primary) {
            data.insert(Value::Str(name), prop.to_data_with(self, &nested)?);
        }

        if options.add_class {
            data.insert(
                Value::Str(options.class_key.clone()),
                Value::Str(self.class.name().to_string()),
            );
        }

        Ok(Value::Map(data))
    }

    pub fn to_json(&self, options: &PlainDataOptions) -> Result<String> {
        serde_json::to_string(&self.to_plain_data(options)?)
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn to_json_pretty(&self, options: &PlainDataOptions) -> Result<String> {
        serde_json::to_string_pretty(&self.to_plain_data(options)?)
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn to_yaml(&self, options: &PlainDataOptions) -> Result<String> {
        serde_yaml::to_string(&self.to_plain_data(options)?)
            .map_err(|e| Error::Serialization(e.to_string()))
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        std::sync::Arc::ptr_eq(&self.class, &other.class)
            && self.values == other.values
            && self.fields == other.fields
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.class.name())?;

        let Some(values) = self.values.as_ref().filter(|values| !values.is_empty()) else {
            return write!(f, " {{}}");
        };

        write!(f, " {{ ")?;
        for (i, (name, value)) in values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", name, value)?;
        }
        write!(f, " }}")
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.class.name())
            .field("values", &self.values)
            .field("fields", &self.fields)
            .finish()
    }
}
