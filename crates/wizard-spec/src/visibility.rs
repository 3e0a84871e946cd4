use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::application::{Application, Item};
use crate::definition::Form;
use crate::expr::Expr;
use crate::spec::FieldSpec;

pub type VisibilityMap = BTreeMap<String, bool>;

/// How an unresolvable expression is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityMode {
    #[default]
    Visible,
    Hidden,
}

impl VisibilityMode {
    fn resolve(&self, expr: Option<&Expr>, ctx: &Value) -> bool {
        match expr {
            None => true,
            Some(expr) => expr.evaluate(ctx).unwrap_or(match self {
                VisibilityMode::Visible => true,
                VisibilityMode::Hidden => false,
            }),
        }
    }
}

/// Activation state of every step, field and collection of a form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Visibility {
    pub steps: BTreeMap<usize, bool>,
    pub fields: VisibilityMap,
    pub collections: VisibilityMap,
}

impl Visibility {
    pub fn step(&self, index: usize) -> bool {
        self.steps.get(&index).copied().unwrap_or(false)
    }

    pub fn field(&self, name: &str) -> bool {
        self.fields.get(name).copied().unwrap_or(false)
    }

    pub fn collection(&self, name: &str) -> bool {
        self.collections.get(name).copied().unwrap_or(false)
    }
}

pub fn resolve_visibility(form: &Form, app: &Application, mode: VisibilityMode) -> Visibility {
    let ctx = app.to_value();
    let mut steps = BTreeMap::new();
    let mut fields = VisibilityMap::new();
    let mut collections = VisibilityMap::new();

    for step in form.steps() {
        let step_active = mode.resolve(step.active_if.as_ref(), &ctx);
        steps.insert(step.index, step_active);
        let groups: Vec<bool> = step
            .groups
            .iter()
            .map(|group| step_active && mode.resolve(Some(&group.active_if), &ctx))
            .collect();
        let scope_active = |name: &str| {
            form.owner(name)
                .map(|owner| owner.group.map(|group| groups[group]).unwrap_or(step_active))
                .unwrap_or(false)
        };
        for name in step.all_fields() {
            let visible = scope_active(name)
                && form
                    .field(name)
                    .map(|spec| mode.resolve(spec.visible_if.as_ref(), &ctx))
                    .unwrap_or(false);
            fields.insert(name.to_string(), visible);
        }
        for name in step.all_collections() {
            collections.insert(name.to_string(), scope_active(name));
        }
    }

    Visibility {
        steps,
        fields,
        collections,
    }
}

pub fn is_step_active(form: &Form, app: &Application, index: usize) -> bool {
    form.step(index)
        .map(|step| {
            form.visibility_mode()
                .resolve(step.active_if.as_ref(), &app.to_value())
        })
        .unwrap_or(false)
}

/// A field is active when its step, its group and its own predicate hold.
pub fn is_field_active(form: &Form, app: &Application, name: &str) -> bool {
    let Some(owner) = form.owner(name) else {
        return false;
    };
    let ctx = app.to_value();
    let mode = form.visibility_mode();
    let Some(step) = form.step(owner.step) else {
        return false;
    };
    if !mode.resolve(step.active_if.as_ref(), &ctx) {
        return false;
    }
    if let Some(group) = owner.group.and_then(|group| step.groups.get(group))
        && !mode.resolve(Some(&group.active_if), &ctx)
    {
        return false;
    }
    match form.field(name) {
        Some(spec) => mode.resolve(spec.visible_if.as_ref(), &ctx),
        // collections carry no predicate of their own
        None => form.collection(name).is_some(),
    }
}

/// Whether an active field must hold a value under the current state.
pub(crate) fn is_required(spec: &FieldSpec, ctx: &Value) -> bool {
    spec.required
        || spec
            .required_if
            .as_ref()
            .and_then(|expr| expr.evaluate(ctx))
            .unwrap_or(false)
}

/// Item-level field activity (item predicates may read `/item/...`).
pub(crate) fn is_item_field_active(
    form: &Form,
    spec: &FieldSpec,
    app: &Application,
    item: &Item,
) -> bool {
    form.visibility_mode()
        .resolve(spec.visible_if.as_ref(), &app.item_context(item))
}
