// # Web Form Descriptors
//
// Declarative description of the remote forms a browser-driven integration
// fills. The descriptor returned by `FormAutomation::get_web_form()` is the
// single source of truth for which fields exist and where they live; fill
// logic iterates it instead of hard-coding selectors at call sites.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::Address;

/// Data written into a form, keyed by field name
pub type FormData = BTreeMap<String, String>;

/// One input of a remote web form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    /// Logical field name matched against [`FormData`] keys
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Human-readable label, when the page provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Input kind (`text`, `password`, `select`, ...)
    pub kind: String,
    /// CSS locator
    pub locator: String,
    /// Current value
    #[serde(default)]
    pub value: String,
}

impl FormField {
    /// A named text input
    pub fn text(name: impl Into<String>, locator: impl Into<String>) -> Self {
        Self::new(name, "text", locator)
    }

    /// A named password input
    pub fn password(name: impl Into<String>, locator: impl Into<String>) -> Self {
        Self::new(name, "password", locator)
    }

    /// A named input of arbitrary kind
    pub fn new(
        name: impl Into<String>,
        kind: impl Into<String>,
        locator: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            label: None,
            kind: kind.into(),
            locator: locator.into(),
            value: String::new(),
        }
    }
}

/// A single form: where it lives, its ordered fields and its submit control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDescriptor {
    pub url: String,
    pub fields: Vec<FormField>,
    pub submit_locator: String,
}

impl FormDescriptor {
    /// Field with the given logical name
    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields
            .iter()
            .find(|field| field.name.as_deref() == Some(name))
    }

    /// Fields that have an entry in `data`, paired with the value to write
    ///
    /// Fields without a name, or whose name is absent from `data`, are
    /// skipped and left untouched on the page.
    pub fn fill_plan<'a>(&'a self, data: &'a FormData) -> Vec<(&'a FormField, &'a str)> {
        self.fields
            .iter()
            .filter_map(|field| {
                let name = field.name.as_deref()?;
                data.get(name).map(|value| (field, value.as_str()))
            })
            .collect()
    }
}

/// All forms a provider integration drives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceWebForm {
    /// Provider home page
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_form: Option<FormDescriptor>,
    pub address_form: FormDescriptor,
    /// Whether a human must confirm before the address form is submitted
    pub verification_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_form: Option<FormDescriptor>,
}

/// Declared fields that no longer appear on the live page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDrift {
    /// Declared locators absent from the page
    pub missing_locators: Vec<String>,
    /// Named page inputs the descriptor does not mention
    pub undeclared_fields: Vec<String>,
}

impl FormDrift {
    /// Whether the declared form still matches the page
    pub fn is_empty(&self) -> bool {
        self.missing_locators.is_empty()
    }
}

/// Compare a declared form with the fields observed on a live page
///
/// This is a detection aid: observed fields come from heuristics and are
/// never used to fill anything.
pub fn detect_form_drift(declared: &FormDescriptor, observed: &[FormField]) -> FormDrift {
    let missing_locators = declared
        .fields
        .iter()
        .filter(|field| !observed.iter().any(|seen| seen.locator == field.locator))
        .map(|field| field.locator.clone())
        .collect();

    let undeclared_fields = observed
        .iter()
        .filter(|seen| {
            !declared
                .fields
                .iter()
                .any(|field| field.locator == seen.locator)
        })
        .filter_map(|seen| seen.name.clone())
        .collect();

    FormDrift {
        missing_locators,
        undeclared_fields,
    }
}

/// Standard address-form data for a new address
///
/// Optional parts that are absent or empty are omitted, so the matching
/// fields on the page are left as they are.
pub fn address_form_data(address: &Address) -> FormData {
    let mut data = FormData::new();
    data.insert("line1".to_string(), address.line1.clone());
    if let Some(line2) = address.line2.as_ref().filter(|s| !s.is_empty()) {
        data.insert("line2".to_string(), line2.clone());
    }
    data.insert("town".to_string(), address.town.clone());
    if let Some(county) = address.county.as_ref().filter(|s| !s.is_empty()) {
        data.insert("county".to_string(), county.clone());
    }
    data.insert("postcode".to_string(), address.postcode.clone());
    data
}
