use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::field::FieldSpec;

/// Ordered list of identically-shaped sub-records nested in the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CollectionSpec {
    pub name: String,
    pub label: String,
    pub fields: Vec<FieldSpec>,
    /// Removal floor; also the number of items a fresh application starts with.
    #[serde(default)]
    pub min_items: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    /// Scalar field whose numeric value raises the minimum checked when
    /// leaving the owning step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items_field: Option<String>,
    /// Item field used as a stable key (e.g. a wealth-source code).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_field: Option<String>,
    /// Prefix for synthesized display codes such as `STH1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_prefix: Option<String>,
}

impl CollectionSpec {
    pub fn new(name: impl Into<String>, label: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            fields,
            min_items: 0,
            max_items: None,
            min_items_field: None,
            key_field: None,
            display_prefix: None,
        }
    }

    pub fn min_items(mut self, min: usize) -> Self {
        self.min_items = min;
        self
    }

    pub fn max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self
    }

    pub fn min_items_field(mut self, field: &str) -> Self {
        self.min_items_field = Some(field.to_string());
        self
    }

    pub fn key_field(mut self, field: &str) -> Self {
        self.key_field = Some(field.to_string());
        self
    }

    pub fn display_prefix(mut self, prefix: &str) -> Self {
        self.display_prefix = Some(prefix.to_string());
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Presentation-only code for the item at `index` (`STH1`, `STH2`, ...).
    pub fn display_code(&self, index: usize) -> Option<String> {
        self.display_prefix
            .as_ref()
            .map(|prefix| format!("{}{}", prefix, index + 1))
    }
}
