use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::expr::Expr;

/// Value kinds a field may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Enum,
    /// ISO calendar date (`YYYY-MM-DD`).
    Date,
    Number,
    Integer,
    Boolean,
}

impl FieldKind {
    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Enum => "enum",
            FieldKind::Date => "date",
            FieldKind::Number => "number",
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
        }
    }

    /// Value used when neither the field nor the caller supplies a default.
    pub fn empty_value(&self) -> Value {
        match self {
            FieldKind::Boolean => Value::Bool(false),
            FieldKind::Number | FieldKind::Integer => Value::Null,
            _ => Value::String(String::new()),
        }
    }
}

/// Length, format and range constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct Constraint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_len: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_len: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// Declarative description of a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    /// Makes the field required only while the expression holds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_if: Option<Expr>,
    /// Field-level activation predicate. Inactive fields are never validated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_if: Option<Expr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<Constraint>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            required: false,
            required_if: None,
            visible_if: None,
            choices: None,
            default_value: None,
            constraint: None,
        }
    }

    pub fn text(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Text)
    }

    pub fn choice(name: impl Into<String>, label: impl Into<String>, choices: &[&str]) -> Self {
        let mut spec = Self::new(name, label, FieldKind::Enum);
        spec.choices = Some(choices.iter().map(|choice| choice.to_string()).collect());
        spec
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn required_if(mut self, expr: Expr) -> Self {
        self.required_if = Some(expr);
        self
    }

    pub fn visible_if(mut self, expr: Expr) -> Self {
        self.visible_if = Some(expr);
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = Some(constraint);
        self
    }

    pub fn pattern(self, pattern: &str) -> Self {
        let mut constraint = self.constraint.clone().unwrap_or_default();
        constraint.pattern = Some(pattern.to_string());
        self.constraint(constraint)
    }

    pub fn length(self, min_len: Option<usize>, max_len: Option<usize>) -> Self {
        let mut constraint = self.constraint.clone().unwrap_or_default();
        constraint.min_len = min_len;
        constraint.max_len = max_len;
        self.constraint(constraint)
    }

    pub fn range(self, min: Option<f64>, max: Option<f64>) -> Self {
        let mut constraint = self.constraint.clone().unwrap_or_default();
        constraint.min = min;
        constraint.max = max;
        self.constraint(constraint)
    }

    /// Initial value for a fresh application or collection item.
    pub fn initial_value(&self) -> Value {
        self.default_value
            .clone()
            .unwrap_or_else(|| self.kind.empty_value())
    }

    /// Every expression attached to the field.
    pub fn expressions(&self) -> impl Iterator<Item = &Expr> {
        self.required_if.iter().chain(self.visible_if.iter())
    }
}
