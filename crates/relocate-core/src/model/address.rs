//! Postal address value type

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A postal address as exchanged with the persistence and lookup layers
///
/// Integrations receive addresses by shared reference, so an address cannot
/// change underneath an update attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// Opaque identifier
    #[serde(default = "generated_id")]
    pub id: String,
    /// First address line
    pub line1: String,
    /// Second address line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    /// Town or city
    pub town: String,
    /// County or state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,
    /// Postcode
    pub postcode: String,
    /// Country
    #[serde(default = "default_country")]
    pub country: String,
    /// Creation timestamp
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn generated_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn default_country() -> String {
    "UK".to_string()
}

impl Address {
    /// Create a new address with a generated id and the default country
    pub fn new(
        line1: impl Into<String>,
        town: impl Into<String>,
        postcode: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: generated_id(),
            line1: line1.into(),
            line2: None,
            town: town.into(),
            county: None,
            postcode: postcode.into(),
            country: default_country(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the second address line
    pub fn with_line2(mut self, line2: impl Into<String>) -> Self {
        self.line2 = Some(line2.into());
        self
    }

    /// Set the county or state
    pub fn with_county(mut self, county: impl Into<String>) -> Self {
        self.county = Some(county.into());
        self
    }

    /// Set the country
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }

    /// Check that every required field is non-empty
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("line1", &self.line1),
            ("town", &self.town),
            ("postcode", &self.postcode),
            ("country", &self.country),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::invalid_input(format!(
                    "Address field '{}' cannot be empty",
                    field
                )));
            }
        }

        Ok(())
    }

    /// Single-line rendering used in messages and logs
    pub fn one_line(&self) -> String {
        let mut parts = vec![self.line1.as_str()];
        if let Some(line2) = self.line2.as_deref().filter(|s| !s.is_empty()) {
            parts.push(line2);
        }
        parts.push(self.town.as_str());
        if let Some(county) = self.county.as_deref().filter(|s| !s.is_empty()) {
            parts.push(county);
        }
        parts.push(self.postcode.as_str());
        parts.join(", ")
    }
}
