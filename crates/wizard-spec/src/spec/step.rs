use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::expr::Expr;

/// Fields and collections that switch on and off together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldGroup {
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collections: Vec<String>,
    pub active_if: Expr,
}

/// One page of the wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StepSpec {
    /// 1-based, contiguous position within the form.
    pub index: usize,
    pub id: String,
    pub title: String,
    /// Opaque to the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collections: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<FieldGroup>,
    /// Whole-step activation predicate; inactive steps are skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_if: Option<Expr>,
}

impl FieldGroup {
    pub fn new(id: impl Into<String>, active_if: Expr) -> Self {
        Self {
            id: id.into(),
            fields: Vec::new(),
            collections: Vec::new(),
            active_if,
        }
    }

    pub fn fields(mut self, names: &[&str]) -> Self {
        self.fields.extend(names.iter().map(|name| name.to_string()));
        self
    }

    pub fn collections(mut self, names: &[&str]) -> Self {
        self.collections
            .extend(names.iter().map(|name| name.to_string()));
        self
    }
}

impl StepSpec {
    pub fn new(index: usize, id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            index,
            id: id.into(),
            title: title.into(),
            icon: None,
            fields: Vec::new(),
            collections: Vec::new(),
            groups: Vec::new(),
            active_if: None,
        }
    }

    pub fn icon(mut self, icon: &str) -> Self {
        self.icon = Some(icon.to_string());
        self
    }

    pub fn fields(mut self, names: &[&str]) -> Self {
        self.fields.extend(names.iter().map(|name| name.to_string()));
        self
    }

    pub fn collections(mut self, names: &[&str]) -> Self {
        self.collections
            .extend(names.iter().map(|name| name.to_string()));
        self
    }

    pub fn group(mut self, group: FieldGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn active_if(mut self, expr: Expr) -> Self {
        self.active_if = Some(expr);
        self
    }

    /// Every field name owned by the step, grouped or not.
    pub fn all_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .chain(self.groups.iter().flat_map(|group| group.fields.iter()))
            .map(String::as_str)
    }

    /// Every collection name owned by the step, grouped or not.
    pub fn all_collections(&self) -> impl Iterator<Item = &str> {
        self.collections
            .iter()
            .chain(self.groups.iter().flat_map(|group| group.collections.iter()))
            .map(String::as_str)
    }
}
