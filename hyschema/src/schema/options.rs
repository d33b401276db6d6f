use serde::{Deserialize, Serialize};

use crate::utils::{Error, Result};

/// Key under which exported documents name their class.
pub const DEFAULT_CLASS_KEY: &str = "__class__";

/// Options of [`crate::schema::Instance::to_plain_data`].
///
/// They can be written inline or loaded from a TOML table:
///
/// ```toml
/// only_primary = true
/// class_key = "type"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlainDataOptions {
    /// Export only the properties declared by the instance's own class.
    pub only_own: bool,
    /// Skip derived properties.
    pub only_primary: bool,
    /// Write the class name under `class_key`.
    pub add_class: bool,
    pub class_key: String,
}

impl Default for PlainDataOptions {
    fn default() -> Self {
        Self {
            only_own: false,
            only_primary: false,
            add_class: true,
            class_key: DEFAULT_CLASS_KEY.to_string(),
        }
    }
}

impl PlainDataOptions {
    pub fn only_own(mut self) -> Self {
        self.only_own = true;
        self
    }

    pub fn only_primary(mut self) -> Self {
        self.only_primary = true;
        self
    }

    pub fn without_class(mut self) -> Self {
        self.add_class = false;
        self
    }

    pub fn class_key(mut self, key: impl Into<String>) -> Self {
        self.class_key = key.into();
        self
    }

    /// Options for the schema objects nested in a document exported with
    /// `self`: they name their class under the same key and export every
    /// property.
    pub fn nested(&self) -> Self {
        Self {
            add_class: self.add_class,
            class_key: self.class_key.clone(),
            ..Self::default()
        }
    }

    /// Read options from a TOML document. Missing fields keep their default.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Serialization(e.to_string()))
    }
}
