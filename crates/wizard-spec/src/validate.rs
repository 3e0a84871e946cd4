use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::application::{Application, Item};
use crate::definition::Form;
use crate::error::{ErrorKind, ValidationError};
use crate::expr::is_blank;
use crate::spec::{CollectionSpec, Constraint, FieldKind, FieldSpec};
use crate::visibility::{is_field_active, is_item_field_active, is_required, is_step_active};

/// Summary handed to hosts that validate a whole record at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub missing_required: Vec<String>,
}

impl ValidationReport {
    pub fn from_errors(errors: Vec<ValidationError>) -> Self {
        let missing_required = errors
            .iter()
            .filter(|error| error.kind == ErrorKind::Required)
            .map(|error| error.path.clone())
            .collect();
        Self {
            valid: errors.is_empty(),
            errors,
            missing_required,
        }
    }
}

/// Checks one scalar field, honouring activation and conditional requirement.
pub fn validate_field(form: &Form, app: &Application, name: &str) -> Vec<ValidationError> {
    let Some(spec) = form.field(name) else {
        return Vec::new();
    };
    if !is_field_active(form, app, name) {
        return Vec::new();
    }
    let required = is_required(spec, &app.to_value());
    let value = app.field(name).unwrap_or(&Value::Null);
    check_value(form, name, spec, value, required, |kind, message| {
        ValidationError::field(name, kind, message)
    })
    .into_iter()
    .collect()
}

/// Count bounds plus per-item checks for one collection.
pub fn validate_collection(form: &Form, app: &Application, name: &str) -> Vec<ValidationError> {
    let Some(spec) = form.collection(name) else {
        return Vec::new();
    };
    if !is_field_active(form, app, name) {
        return Vec::new();
    }
    let items = app.collection(name);
    let mut errors = Vec::new();

    let minimum = effective_minimum(spec, app);
    if items.len() < minimum {
        errors.push(ValidationError::field(
            name,
            ErrorKind::BelowMinimumCount,
            format!(
                "{} needs at least {} item(s), found {}",
                spec.label,
                minimum,
                items.len()
            ),
        ));
    }
    if let Some(maximum) = spec.max_items
        && items.len() > maximum
    {
        errors.push(ValidationError::field(
            name,
            ErrorKind::AboveMaximumCount,
            format!("{} allows at most {} item(s)", spec.label, maximum),
        ));
    }

    for (index, item) in items.iter().enumerate() {
        errors.extend(validate_item(form, app, spec, index, item));
    }
    errors
}

/// Minimum item count when leaving the owning step.
///
/// A derived count field can raise the floor above `min_items`.
pub fn effective_minimum(spec: &CollectionSpec, app: &Application) -> usize {
    let derived = spec
        .min_items_field
        .as_ref()
        .and_then(|field| app.field(field))
        .and_then(|value| match value {
            Value::Number(number) => number.as_u64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        })
        .map(|count| count as usize)
        .unwrap_or(0);
    spec.min_items.max(derived)
}

pub(crate) fn validate_item(
    form: &Form,
    app: &Application,
    spec: &CollectionSpec,
    index: usize,
    item: &Item,
) -> Vec<ValidationError> {
    let ctx = app.item_context(item);
    spec.fields
        .iter()
        .filter(|field| is_item_field_active(form, field, app, item))
        .filter_map(|field| {
            let value = item.get(&field.name).unwrap_or(&Value::Null);
            let key = format!("{}/{}", spec.name, field.name);
            check_value(
                form,
                &key,
                field,
                value,
                is_required(field, &ctx),
                |kind, message| ValidationError::item(&spec.name, index, &field.name, kind, message),
            )
        })
        .collect()
}

/// Union of field and collection checks for the active shape of one step.
pub fn validate_step(form: &Form, app: &Application, index: usize) -> Vec<ValidationError> {
    let Some(step) = form.step(index) else {
        return Vec::new();
    };
    if !is_step_active(form, app, index) {
        return Vec::new();
    }
    let mut errors: Vec<ValidationError> = step
        .all_fields()
        .flat_map(|name| validate_field(form, app, name))
        .collect();
    for name in step.all_collections() {
        errors.extend(validate_collection(form, app, name));
    }
    errors
}

/// Union over every currently active step.
pub fn validate_all(form: &Form, app: &Application) -> Vec<ValidationError> {
    (1..=form.step_count())
        .flat_map(|index| validate_step(form, app, index))
        .collect()
}

fn check_value(
    form: &Form,
    key: &str,
    spec: &FieldSpec,
    value: &Value,
    required: bool,
    error: impl Fn(ErrorKind, String) -> ValidationError,
) -> Option<ValidationError> {
    let unchecked_box = spec.kind == FieldKind::Boolean && value == &Value::Bool(false);
    if is_blank(value) || unchecked_box {
        return required.then(|| error(ErrorKind::Required, format!("{} is required", spec.label)));
    }

    if !matches_type(spec.kind, value) {
        return Some(error(
            ErrorKind::TypeMismatch,
            format!("{} must be a {} value", spec.label, spec.kind.label()),
        ));
    }

    if spec.kind == FieldKind::Date
        && let Some(text) = value.as_str()
        && NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").is_err()
    {
        return Some(error(
            ErrorKind::PatternMismatch,
            format!("{} must be a date (YYYY-MM-DD)", spec.label),
        ));
    }

    if spec.kind == FieldKind::Enum
        && let Some(choices) = &spec.choices
        && let Some(text) = value.as_str()
        && !choices
            .iter()
            .any(|choice| choice.eq_ignore_ascii_case(text.trim()))
    {
        return Some(error(
            ErrorKind::InvalidChoice,
            format!("{} must be one of: {}", spec.label, choices.join(", ")),
        ));
    }

    spec.constraint
        .as_ref()
        .and_then(|constraint| enforce_constraint(form, key, spec, constraint, value))
        .map(|(kind, message)| error(kind, message))
}

fn matches_type(kind: FieldKind, value: &Value) -> bool {
    match kind {
        FieldKind::Text | FieldKind::Enum | FieldKind::Date => value.is_string(),
        FieldKind::Boolean => value.is_boolean(),
        FieldKind::Integer => {
            value.is_i64()
                || value.is_u64()
                || value
                    .as_str()
                    .is_some_and(|text| text.trim().parse::<i64>().is_ok())
        }
        FieldKind::Number => numeric(value).is_some(),
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn enforce_constraint(
    form: &Form,
    key: &str,
    spec: &FieldSpec,
    constraint: &Constraint,
    value: &Value,
) -> Option<(ErrorKind, String)> {
    let is_numeric = matches!(spec.kind, FieldKind::Number | FieldKind::Integer);
    if !is_numeric && let Some(text) = value.as_str() {
        let text = text.trim();
        if let Some(regex) = form.pattern(key)
            && !regex.is_match(text)
        {
            return Some((
                ErrorKind::PatternMismatch,
                format!("{} has an invalid format", spec.label),
            ));
        }
        let length = text.chars().count();
        if let Some(min_len) = constraint.min_len
            && length < min_len
        {
            return Some((
                ErrorKind::TooShort,
                format!("{} must be at least {} characters", spec.label, min_len),
            ));
        }
        if let Some(max_len) = constraint.max_len
            && length > max_len
        {
            return Some((
                ErrorKind::TooLong,
                format!("{} must be at most {} characters", spec.label, max_len),
            ));
        }
    }

    if let Some(number) = numeric(value).filter(|_| is_numeric) {
        if let Some(min) = constraint.min
            && number < min
        {
            return Some((
                ErrorKind::OutOfRange,
                format!("{} must be at least {}", spec.label, min),
            ));
        }
        if let Some(max) = constraint.max
            && number > max
        {
            return Some((
                ErrorKind::OutOfRange,
                format!("{} must be at most {}", spec.label, max),
            ));
        }
    }

    None
}
