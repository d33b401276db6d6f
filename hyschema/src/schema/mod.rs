//! Schema classes
//!
//! A [`SchemaClass`] carries an ordered registry of typed properties
//! ([`Prop`]) and a table of named methods. Classes form single-inheritance
//! chains: a class sees every property of its ancestors, and a property
//! declared again on a subclass masks the inherited one.
//!
//! Classes are owned by an explicit [`SchemaRegistry`], which doubles as the
//! discriminator table used to load documents whose class is only known at
//! runtime.
//!
//! ```rust
//! # use hyschema::{schema::{SchemaRegistry, PropOptions, PlainDataOptions}, types::builtin::int};
//! let registry = SchemaRegistry::new();
//! let point = registry.define_class("Point", None).unwrap();
//! point.prop("x", PropOptions::new(int())).unwrap();
//! point.prop("y", PropOptions::new(int())).unwrap();
//!
//! let p = point.new_instance([("x", 1), ("y", 2)]).unwrap();
//! let data = p.to_plain_data(&PlainDataOptions::default()).unwrap();
//! assert_eq!(p.to_json(&PlainDataOptions::default()).unwrap(), r#"{"x":1,"y":2,"__class__":"Point"}"#);
//! assert_eq!(point.from_plain_data(&data).unwrap(), p);
//! ```
use std::{
    fmt,
    sync::{Arc, Weak},
};

use indexmap::IndexMap;
use log::{debug, trace};
use parking_lot::RwLock;
use strum::{Display, EnumIs};

use crate::{
    utils::{Error, Result},
    value::{Value, ValueMap},
};

pub mod instance;
pub mod options;
pub mod prop;

pub use instance::Instance;
pub use options::{DEFAULT_CLASS_KEY, PlainDataOptions};
pub use prop::{Prop, PropOptions, Source, ToDataHook};

/// Shared handle to a schema class.
pub type ClassRef = Arc<SchemaClass>;

/// Classes of a [`SchemaRegistry`], by name.
type ClassTable = RwLock<IndexMap<String, ClassRef>>;

/// Body of a method, or of a computed property.
pub type MethodFn = Arc<dyn Fn(&Instance) -> Result<Value> + Send + Sync>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIs)]
#[strum(serialize_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    /// Hidden from `Responds` types that only consider public messages, and
    /// from attribute reads.
    Private,
}

/// A named method of a schema class.
#[derive(Clone)]
pub struct Method {
    name: String,
    visibility: Visibility,
    body: MethodFn,
}

impl Method {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn call(&self, instance: &Instance) -> Result<Value> {
        (self.body)(instance)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("visibility", &self.visibility)
            .finish_non_exhaustive()
    }
}

/// A class whose instances are built from, and exported to, plain data.
///
/// # A note on concurrency
/// Properties and methods are meant to be declared while the program sets
/// itself up. Declarations take an exclusive lock, so concurrent declarations
/// do not corrupt the registry, but no ordering between them is promised and
/// instances built while declarations are still running may observe either
/// state. Declare schemas before spawning workers.
pub struct SchemaClass {
    name: String,
    parent: Option<ClassRef>,
    props: RwLock<IndexMap<String, Arc<Prop>>>,
    methods: RwLock<IndexMap<String, Method>>,
    registry: Weak<ClassTable>,
}

impl SchemaClass {
    fn new(name: String, parent: Option<ClassRef>, registry: Weak<ClassTable>) -> Self {
        Self {
            name,
            parent,
            props: Default::default(),
            methods: Default::default(),
            registry,
        }
    }

    /// Fully-qualified name, written as the discriminator of exported documents.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&ClassRef> {
        self.parent.as_ref()
    }

    /// Ancestors from the direct parent up to the root.
    pub fn ancestors(&self) -> impl Iterator<Item = &SchemaClass> {
        std::iter::successors(self.parent.as_deref(), |class| class.parent.as_deref())
    }

    /// Returns true if `self` is `other` or inherits from it.
    pub fn is_subclass_of(&self, other: &SchemaClass) -> bool {
        std::ptr::eq(self, other) || self.ancestors().any(|class| std::ptr::eq(class, other))
    }

    /// Declare a property on this class.
    ///
    /// Fails with [`Error::RegistryConflict`] if this class already declares
    /// `name` itself. Redeclaring a property inherited from an ancestor is
    /// allowed and masks the inherited declaration.
    pub fn prop(self: &Arc<Self>, name: impl Into<String>, options: PropOptions) -> Result<Arc<Prop>> {
        let name = name.into();
        let mut props = self.props.upgradable_read();

        if props.contains_key(&name) {
            return Err(Error::RegistryConflict {
                registry: format!("property registry of `{}`", self.name),
                name,
            });
        }

        let prop = Arc::new(Prop::new(self, name.clone(), options));
        debug!(
            "Declared {} property `{}.{}` of type `{}`",
            if prop.is_primary() { "primary" } else { "derived" },
            self.name,
            name,
            prop.ty()
        );

        props.with_upgraded(|props| props.insert(name, prop.clone()));
        Ok(prop)
    }

    /// Resolved properties of this class, in registry order.
    ///
    /// Ancestors come first (root down) unless `only_own` is set, then this
    /// class's own declarations overlay them. `only_primary` drops derived
    /// properties.
    pub fn props(&self, only_own: bool, only_primary: bool) -> IndexMap<String, Arc<Prop>> {
        let mut resolved = match (&self.parent, only_own) {
            (Some(parent), false) => parent.props(false, false),
            _ => IndexMap::new(),
        };

        for (name, prop) in self.props.read().iter() {
            resolved.insert(name.clone(), prop.clone());
        }

        if only_primary {
            resolved.retain(|_, prop| prop.is_primary());
        }

        resolved
    }

    /// The most derived declaration of `name` visible from this class.
    pub fn prop_named(&self, name: &str) -> Option<Arc<Prop>> {
        std::iter::once(self)
            .chain(self.ancestors())
            .find_map(|class| class.props.read().get(name).cloned())
    }

    /// Define a method. Fails if this class already defines `name`; methods of
    /// ancestors may be overridden.
    pub fn method<F>(&self, name: impl Into<String>, visibility: Visibility, body: F) -> Result<()>
    where
        F: Fn(&Instance) -> Result<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        let mut methods = self.methods.write();

        if methods.contains_key(&name) {
            return Err(Error::RegistryConflict {
                registry: format!("method table of `{}`", self.name),
                name,
            });
        }

        debug!("Defined {} method `{}.{}`", visibility, self.name, name);
        methods.insert(
            name.clone(),
            Method {
                name,
                visibility,
                body: Arc::new(body),
            },
        );
        Ok(())
    }

    /// The most derived definition of the method `name`.
    pub fn find_method(&self, name: &str) -> Option<Method> {
        std::iter::once(self)
            .chain(self.ancestors())
            .find_map(|class| class.methods.read().get(name).cloned())
    }

    /// Build an instance from `values`, setting every primary property in
    /// registry order. See [`Instance::initialize_from`].
    pub fn new_instance<I, K, V>(self: &Arc<Self>, values: I) -> Result<Instance>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let values: IndexMap<String, Value> = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let mut instance = Instance::new(self.clone());
        instance.initialize_from(&values)?;
        Ok(instance)
    }

    /// Rebuild an instance from plain data.
    ///
    /// Keys are matched against property names (a leading `:` is ignored);
    /// unknown keys are skipped. Each value goes through its property's
    /// conversion path, so maps stored under a property typed with another
    /// schema class become instances of that class. Values of props sourced
    /// from a field are written back to that field; other derived props are
    /// skipped.
    ///
    /// A document naming another class under [`DEFAULT_CLASS_KEY`] is loaded
    /// as that class, which must be a registered subclass of this one.
    pub fn from_plain_data(self: &Arc<Self>, data: &Value) -> Result<Instance> {
        self.from_plain_data_with(data, DEFAULT_CLASS_KEY)
    }

    /// Same as [`SchemaClass::from_plain_data`], reading the discriminator
    /// under `class_key`.
    pub fn from_plain_data_with(self: &Arc<Self>, data: &Value, class_key: &str) -> Result<Instance> {
        let Value::Map(map) = data else {
            return Err(data.mismatch(format!("{} document", self.name)));
        };

        match map.get(&Value::Str(class_key.to_string())) {
            Some(Value::Str(name)) if *name != self.name => {
                let class = self.subclass_named(name).map_err(|reason| Error::UnsafeLoad {
                    key: class_key.to_string(),
                    reason,
                })?;
                class.load_map(map, class_key)
            }
            _ => self.load_map(map, class_key),
        }
    }

    /// The registered class `name`, if it inherits from this one.
    fn subclass_named(&self, name: &str) -> std::result::Result<ClassRef, String> {
        let class = self
            .registry
            .upgrade()
            .and_then(|classes| classes.read().get(name).cloned())
            .ok_or_else(|| format!("`{}` is not a registered schema class", name))?;

        if !class.is_subclass_of(self) {
            return Err(format!("`{}` is not a subclass of `{}`", name, self.name));
        }

        trace!("Loading a `{}` document as `{}`", self.name, name);
        Ok(class)
    }

    fn load_map(self: &Arc<Self>, map: &ValueMap, class_key: &str) -> Result<Instance> {
        let props = self.props(false, false);
        let mut values = IndexMap::new();
        let mut fields = Vec::new();

        for (key, raw) in map {
            let Some(name) = key.as_str().map(|k| k.strip_prefix(':').unwrap_or(k)) else {
                continue;
            };
            let Some(prop) = props.get(name) else {
                continue;
            };

            match prop.source() {
                None => {
                    values.insert(name.to_string(), prop.from_data_with(raw.clone(), class_key)?);
                }
                Some(Source::Field(field)) => {
                    fields.push((field.clone(), prop.from_data_with(raw.clone(), class_key)?));
                }
                Some(_) => {}
            }
        }

        let mut instance = self.new_instance(values)?;
        for (field, value) in fields {
            instance.set_field(field, value);
        }
        Ok(instance)
    }

    pub fn from_json(self: &Arc<Self>, text: &str) -> Result<Instance> {
        let data: serde_json::Value =
            serde_json::from_str(text).map_err(|e| Error::Serialization(e.to_string()))?;
        self.from_plain_data(&data.into())
    }

    pub fn from_yaml(self: &Arc<Self>, text: &str) -> Result<Instance> {
        let data: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|e| Error::Serialization(e.to_string()))?;
        self.from_plain_data(&data.into())
    }
}

impl fmt::Debug for SchemaClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaClass")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .field("props", &self.props.read().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Owns the schema classes of an application, by name.
///
/// # A note on concurrency
/// Same contract as [`SchemaClass`]: define classes during startup, read from
/// anywhere afterwards.
#[derive(Default)]
pub struct SchemaRegistry {
    classes: Arc<ClassTable>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a new class named `name`, inheriting from `parent`.
    pub fn define_class(&self, name: impl Into<String>, parent: Option<&ClassRef>) -> Result<ClassRef> {
        let name = name.into();
        let mut classes = self.classes.upgradable_read();

        if classes.contains_key(&name) {
            return Err(Error::RegistryConflict {
                registry: "schema registry".to_string(),
                name,
            });
        }

        let class = Arc::new(SchemaClass::new(
            name.clone(),
            parent.cloned(),
            Arc::downgrade(&self.classes),
        ));
        debug!(
            "Defined schema class `{}`{}",
            name,
            parent.map_or(String::new(), |p| format!(" (inherits `{}`)", p.name()))
        );

        classes.with_upgraded(|classes| classes.insert(name, class.clone()));
        Ok(class)
    }

    pub fn get(&self, name: &str) -> Option<ClassRef> {
        self.classes.read().get(name).cloned()
    }

    pub fn resolve(&self, name: &str) -> Result<ClassRef> {
        self.get(name)
            .ok_or_else(|| Error::UnknownClass(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.read().contains_key(name)
    }

    pub fn class_names(&self) -> Vec<String> {
        self.classes.read().keys().cloned().collect()
    }

    /// Load a document whose class is named by its `class_key` entry.
    ///
    /// Only classes registered in this registry can be named; any other name
    /// is refused with [`Error::UnsafeLoad`] before the data reaches a class.
    /// That is the only guard: the chosen class still runs its own property
    /// conversions on attacker-controlled data, so do not feed this untrusted
    /// documents unless every registered class is safe to build from them.
    pub fn unsafe_load_from(&self, data: &Value, class_key: &str) -> Result<Instance> {
        let refuse = |reason: String| Error::UnsafeLoad {
            key: class_key.to_string(),
            reason,
        };

        let Value::Map(map) = data else {
            return Err(refuse(format!("expected a map, found kind `{}`", data.kind())));
        };

        let name = match map.get(&Value::Str(class_key.to_string())) {
            Some(Value::Str(name)) => name,
            Some(other) => return Err(refuse(format!("discriminator {} is not a class name", other))),
            None => return Err(refuse("the document has no discriminator".to_string())),
        };

        let class = self
            .get(name)
            .ok_or_else(|| refuse(format!("`{}` is not a registered schema class", name)))?;

        class.from_plain_data_with(data, class_key)
    }

    /// [`SchemaRegistry::unsafe_load_from`] for JSON text.
    pub fn unsafe_load_json(&self, text: &str, class_key: &str) -> Result<Instance> {
        let data: serde_json::Value =
            serde_json::from_str(text).map_err(|e| Error::Serialization(e.to_string()))?;
        self.unsafe_load_from(&data.into(), class_key)
    }

    /// [`SchemaRegistry::unsafe_load_from`] for YAML text.
    pub fn unsafe_load_yaml(&self, text: &str, class_key: &str) -> Result<Instance> {
        let data: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|e| Error::Serialization(e.to_string()))?;
        self.unsafe_load_from(&data.into(), class_key)
    }
}
