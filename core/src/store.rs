//! Environment store - the run-scoped registry shared by every case.
//!
//! The store is a plain `key → value` map of strings. Cases read it through the
//! resolver and write into it through captures. There is exactly one store per
//! run and it is passed explicitly (`&mut EnvironmentStore`) to whatever needs
//! it; nothing in this workspace keeps it in a global.
//!
//! # Baselines and exports
//!
//! A run may start from a baseline file holding tokens and the server URL.
//! Two shapes are accepted:
//!
//! ```json
//! { "server": "http://localhost:8088", "org_member_token": "..." }
//! ```
//!
//! or a Postman-style environment export:
//!
//! ```json
//! { "values": [ { "key": "server", "value": "http://localhost:8088", "enabled": true } ] }
//! ```
//!
//! Exports are always written as a flat object with sorted keys.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;

/// Errors from loading or exporting an environment store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("I/O error on {path}: {message}")]
    Io {
        /// File involved
        path: String,
        /// Underlying error
        message: String,
    },

    /// The file is not valid JSON.
    #[error("Failed to parse environment: {0}")]
    Parse(String),

    /// Valid JSON, but not one of the accepted environment shapes.
    #[error("Invalid environment shape: {0}")]
    InvalidShape(String),
}

/// Mutable `key → value` registry for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentStore {
    values: HashMap<String, String>,
}

impl EnvironmentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a value. Absent keys yield `None`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Write a value, replacing any previous one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        tracing::trace!(key = %key, "environment set");
        self.values.insert(key, value);
    }

    /// Whether `key` has a value.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over all entries (unordered).
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterate over all keys (unordered).
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Parse a baseline from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Parse`] for malformed JSON and
    /// [`StoreError::InvalidShape`] when the document is neither a flat object
    /// nor a `{"values": [...]}` export.
    pub fn from_json_str(text: &str) -> Result<Self, StoreError> {
        let document: Value =
            serde_json::from_str(text).map_err(|e| StoreError::Parse(e.to_string()))?;

        let Value::Object(root) = document else {
            return Err(StoreError::InvalidShape(
                "expected a JSON object at the top level".to_string(),
            ));
        };

        match root.get("values") {
            Some(Value::Array(entries)) => Self::from_export_entries(entries),
            _ => Self::from_flat_object(&root),
        }
    }

    /// Load a baseline from a file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file cannot be read, otherwise the
    /// errors of [`EnvironmentStore::from_json_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| StoreError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let store = Self::from_json_str(&text)?;
        tracing::debug!(path = %path.display(), keys = store.len(), "Loaded environment baseline");
        Ok(store)
    }

    /// Serialize as a flat JSON object with sorted keys.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Parse`] if serialization fails.
    pub fn to_json_string(&self) -> Result<String, StoreError> {
        let sorted: BTreeMap<&str, &str> = self.iter().collect();
        serde_json::to_string_pretty(&sorted).map_err(|e| StoreError::Parse(e.to_string()))
    }

    /// Write the store to a file as a flat JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let text = self.to_json_string()?;
        std::fs::write(path, text).map_err(|e| StoreError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), keys = self.len(), "Exported environment");
        Ok(())
    }

    fn from_flat_object(root: &Map<String, Value>) -> Result<Self, StoreError> {
        let mut store = Self::new();
        for (key, value) in root {
            let value = scalar_to_string(value).ok_or_else(|| {
                StoreError::InvalidShape(format!("value for '{key}' must be a scalar"))
            })?;
            store.set(key.clone(), value);
        }
        Ok(store)
    }

    fn from_export_entries(entries: &[Value]) -> Result<Self, StoreError> {
        let mut store = Self::new();
        for (index, entry) in entries.iter().enumerate() {
            let key = entry["key"].as_str().ok_or_else(|| {
                StoreError::InvalidShape(format!("values[{index}] is missing a string 'key'"))
            })?;

            if entry["enabled"] == Value::Bool(false) {
                continue;
            }

            let value = match &entry["value"] {
                Value::Null => String::new(),
                other => scalar_to_string(other).ok_or_else(|| {
                    StoreError::InvalidShape(format!("values[{index}].value must be a scalar"))
                })?,
            };
            store.set(key, value);
        }
        Ok(store)
    }
}

impl<K, V> FromIterator<(K, V)> for EnvironmentStore
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut store = Self::new();
        for (key, value) in iter {
            store.set(key, value);
        }
        store
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
