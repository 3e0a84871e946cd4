use serde_json::Value;
use tracing::debug;

use crate::application::Application;
use crate::definition::Form;
use crate::spec::{DerivationPolicy, DerivationRule};

/// Address of a written value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRef<'a> {
    Scalar(&'a str),
    Item {
        collection: &'a str,
        index: usize,
        field: &'a str,
    },
}

impl FieldRef<'_> {
    pub fn path(&self) -> String {
        match self {
            FieldRef::Scalar(name) => format!("/{}", name),
            FieldRef::Item {
                collection,
                index,
                field,
            } => format!("/{}/{}/{}", collection, index, field),
        }
    }

    /// Key used for pinning manual overrides.
    pub(crate) fn pin_key(&self) -> String {
        self.path()
    }
}

/// Runs every rule whose source is `changed`, then the rules fed by what
/// those rules wrote. Returns the paths that received a new value.
///
/// Rule graphs are acyclic (checked at compile time), so propagation ends.
pub fn apply(form: &Form, app: &mut Application, changed: FieldRef<'_>) -> Vec<String> {
    let mut written = Vec::new();
    propagate(form, app, changed, &mut written);
    written
}

/// Evaluates every rule once against the current values (session start).
pub fn apply_all(form: &Form, app: &mut Application) -> Vec<String> {
    let mut written = Vec::new();
    for rule in form.derivations() {
        match rule.collection() {
            None => {
                let source = FieldRef::Scalar(rule.source());
                run_rule(form, app, rule, source, &mut written);
            }
            Some(collection) => {
                for index in 0..app.collection(collection).len() {
                    let source = FieldRef::Item {
                        collection,
                        index,
                        field: rule.source(),
                    };
                    run_rule(form, app, rule, source, &mut written);
                }
            }
        }
    }
    written
}

fn propagate(form: &Form, app: &mut Application, changed: FieldRef<'_>, written: &mut Vec<String>) {
    for rule in form.derivations() {
        let fires = match changed {
            FieldRef::Scalar(name) => rule.collection().is_none() && rule.source() == name,
            FieldRef::Item {
                collection, field, ..
            } => rule.collection() == Some(collection) && rule.source() == field,
        };
        if fires {
            run_rule(form, app, rule, changed, written);
        }
    }
}

fn run_rule(
    form: &Form,
    app: &mut Application,
    rule: &DerivationRule,
    source: FieldRef<'_>,
    written: &mut Vec<String>,
) {
    let target = match source {
        FieldRef::Scalar(_) => FieldRef::Scalar(rule.target()),
        FieldRef::Item {
            collection, index, ..
        } => FieldRef::Item {
            collection,
            index,
            field: rule.target(),
        },
    };
    let source_value = read(app, source).cloned().unwrap_or(Value::Null);
    // No table hit and no fallback clears the target.
    let value = rule.evaluate(&source_value).unwrap_or(Value::Null);
    let key = target.pin_key();
    if app.is_pinned(&key) {
        if form.derivation_policy() == DerivationPolicy::Pin {
            debug!(rule = rule.id(), target = %key, "derivation skipped for pinned field");
            return;
        }
        app.unpin(&key);
    }
    if read(app, target).unwrap_or(&Value::Null) == &value {
        return;
    }
    debug!(rule = rule.id(), target = %key, value = %value, "derived value written");
    write(app, target, value);
    written.push(target.path());
    propagate(form, app, target, written);
}

pub(crate) fn read<'a>(app: &'a Application, at: FieldRef<'_>) -> Option<&'a Value> {
    match at {
        FieldRef::Scalar(name) => app.field(name),
        FieldRef::Item {
            collection,
            index,
            field,
        } => app
            .collection(collection)
            .get(index)
            .and_then(|item| item.get(field)),
    }
}

pub(crate) fn write(app: &mut Application, at: FieldRef<'_>, value: Value) {
    match at {
        FieldRef::Scalar(name) => app.put_field(name, value),
        FieldRef::Item {
            collection,
            index,
            field,
        } => {
            if let Some(item) = app.collection_mut(collection).get_mut(index) {
                item.insert(field.to_string(), value);
            }
        }
    }
}
