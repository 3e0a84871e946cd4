use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lightweight expression AST used for activation predicates, conditional
/// requirements and submit rules.
///
/// Paths are JSON pointers into the application view (see
/// [`Application::to_value`](crate::application::Application::to_value)).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Expr {
    LiteralBool { value: bool },
    Eq { path: String, value: Value },
    Ne { path: String, value: Value },
    In { path: String, values: Vec<Value> },
    IsSet { path: String },
    EqPath { left: String, right: String },
    Gte { path: String, value: f64 },
    Lte { path: String, value: f64 },
    And { expressions: Vec<Expr> },
    Or { expressions: Vec<Expr> },
    Not { expression: Box<Expr> },
}

impl Expr {
    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Expr::Eq {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn is_set(path: impl Into<String>) -> Self {
        Expr::IsSet { path: path.into() }
    }

    pub fn not(expression: Expr) -> Self {
        Expr::Not {
            expression: Box::new(expression),
        }
    }

    pub fn one_of<V: Into<Value>>(path: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Expr::In {
            path: path.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn all(expressions: Vec<Expr>) -> Self {
        Expr::And { expressions }
    }

    pub fn any(expressions: Vec<Expr>) -> Self {
        Expr::Or { expressions }
    }

    fn get_value<'a>(ctx: &'a Value, path: &str) -> Option<&'a Value> {
        ctx.pointer(path)
    }

    /// Evaluates the expression to a boolean if possible.
    ///
    /// `None` means a referenced path could not be resolved.
    pub fn evaluate(&self, ctx: &Value) -> Option<bool> {
        match self {
            Expr::LiteralBool { value } => Some(*value),
            Expr::Eq { path, value } => {
                let current = Self::get_value(ctx, path)?;
                Some(values_equal(current, value))
            }
            Expr::Ne { path, value } => {
                let current = Self::get_value(ctx, path)?;
                Some(!values_equal(current, value))
            }
            Expr::In { path, values } => {
                let current = Self::get_value(ctx, path)?;
                Some(values.iter().any(|candidate| values_equal(current, candidate)))
            }
            Expr::IsSet { path } => Some(
                Self::get_value(ctx, path)
                    .map(|value| !is_blank(value))
                    .unwrap_or(false),
            ),
            Expr::EqPath { left, right } => {
                let left_val = Self::get_value(ctx, left)?;
                let right_val = Self::get_value(ctx, right)?;
                Some(values_equal(left_val, right_val))
            }
            Expr::Gte { path, value } => {
                let current = as_number(Self::get_value(ctx, path)?)?;
                Some(current >= *value)
            }
            Expr::Lte { path, value } => {
                let current = as_number(Self::get_value(ctx, path)?)?;
                Some(current <= *value)
            }
            Expr::And { expressions } => {
                for expr in expressions {
                    match expr.evaluate(ctx) {
                        Some(true) => continue,
                        Some(false) => return Some(false),
                        None => return None,
                    }
                }
                Some(true)
            }
            Expr::Or { expressions } => {
                for expr in expressions {
                    if let Some(true) = expr.evaluate(ctx) {
                        return Some(true);
                    }
                }
                Some(false)
            }
            Expr::Not { expression } => expression.evaluate(ctx).map(|value| !value),
        }
    }

    /// Every JSON pointer the expression reads.
    pub fn paths(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_paths(&mut out);
        out
    }

    fn collect_paths<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::LiteralBool { .. } => {}
            Expr::Eq { path, .. }
            | Expr::Ne { path, .. }
            | Expr::In { path, .. }
            | Expr::IsSet { path }
            | Expr::Gte { path, .. }
            | Expr::Lte { path, .. } => out.push(path),
            Expr::EqPath { left, right } => {
                out.push(left);
                out.push(right);
            }
            Expr::And { expressions } | Expr::Or { expressions } => {
                for expr in expressions {
                    expr.collect_paths(out);
                }
            }
            Expr::Not { expression } => expression.collect_paths(out),
        }
    }

    /// Top-level names referenced by the expression (`/a/0/b` -> `a`).
    pub fn root_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .paths()
            .into_iter()
            .filter_map(root_segment)
            .map(String::from)
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

/// First segment of a JSON pointer.
pub(crate) fn root_segment(path: &str) -> Option<&str> {
    path.strip_prefix('/')
        .and_then(|rest| rest.split('/').next())
        .filter(|segment| !segment.is_empty())
}

/// Empty strings, whitespace and `null` count as "not provided".
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

// Enum values coming from select inputs are compared case-insensitively.
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::String(a), Value::String(b)) => a.trim().eq_ignore_ascii_case(b.trim()),
        _ => left == right,
    }
}
