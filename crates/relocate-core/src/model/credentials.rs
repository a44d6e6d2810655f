//! Provider credentials
//!
//! The shape of a credential set is decided by each integration through
//! `get_required_credentials()`, so this is a plain name → secret map.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Credential field name → secret value
///
/// Values are never printed: the `Debug` implementation only shows which
/// fields are present.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceCredentials {
    fields: BTreeMap<String, String>,
}

impl std::fmt::Debug for ServiceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for key in self.fields.keys() {
            map.entry(key, &"<REDACTED>");
        }
        map.finish()
    }
}

impl ServiceCredentials {
    /// Create an empty credential set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a field
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add or replace a field
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Get a field, treating empty values as absent
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Whether a non-empty value is present for `name`
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Field names in sorted order
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    /// Required fields that are absent or empty, in the order given
    pub fn missing(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|field| !self.contains(field))
            .map(|field| field.to_string())
            .collect()
    }

    /// Copy of this set holding only the named fields
    pub fn restricted_to(&self, fields: &[&str]) -> Self {
        Self {
            fields: self
                .fields
                .iter()
                .filter(|(key, _)| fields.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        }
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for ServiceCredentials
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}
