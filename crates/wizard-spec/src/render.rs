use handlebars::Handlebars;
use serde::Serialize;
use serde_json::{Value, json};

use crate::application::Item;
use crate::collection::display_codes;
use crate::error::ValidationError;
use crate::spec::FieldKind;
use crate::validate::effective_minimum;
use crate::visibility::{is_field_active, is_required, resolve_visibility};
use crate::wizard::{SessionStatus, Wizard};

const TEXT_TEMPLATE: &str = "\
Form: {{form_title}}
Step {{step}}/{{total}}: {{step_title}} ({{progress}}%)
{{#each fields}}{{#if active}} - {{label}}{{#if required}} *{{/if}}: {{display}}
{{/if}}{{/each}}\
{{#each collections}}{{#if active}} - {{label}} ({{count}} item(s), minimum {{minimum}})
{{#each items}}    [{{code}}] {{summary}}
{{/each}}{{/if}}{{/each}}\
{{#if errors}}Errors:
{{#each errors}}  {{path}}: {{message}}
{{/each}}{{/if}}\
Next: {{#if can_next}}enabled{{else}}disabled{{/if}}; Submit: {{#if can_submit}}enabled{{else}}disabled{{/if}}
";

/// One field of the current step.
#[derive(Debug, Clone, Serialize)]
pub struct RenderField {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub required: bool,
    pub active: bool,
    pub derived: bool,
    pub value: Value,
    pub display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderItem {
    pub index: usize,
    pub code: String,
    pub summary: String,
    pub values: Item,
}

/// One collection of the current step.
#[derive(Debug, Clone, Serialize)]
pub struct RenderCollection {
    pub name: String,
    pub label: String,
    pub active: bool,
    pub count: usize,
    pub minimum: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<usize>,
    pub items: Vec<RenderItem>,
}

/// Snapshot of the current step for hosts.
#[derive(Debug, Clone, Serialize)]
pub struct StepPayload {
    pub form_id: String,
    pub form_title: String,
    pub status: SessionStatus,
    pub step: usize,
    pub total: usize,
    pub step_id: String,
    pub step_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub progress: u8,
    pub active_steps: Vec<usize>,
    pub fields: Vec<RenderField>,
    pub collections: Vec<RenderCollection>,
    pub errors: Vec<ValidationError>,
    pub can_next: bool,
    pub can_submit: bool,
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => "-".into(),
        Value::String(text) if text.is_empty() => "-".into(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

pub fn build_step_payload(wizard: &Wizard) -> StepPayload {
    let form = wizard.form();
    let app = wizard.application();
    let ctx = app.to_value();
    let index = wizard.current_step();
    let visibility = resolve_visibility(form, app, form.visibility_mode());
    let step = form.step(index);

    let fields = step
        .into_iter()
        .flat_map(|step| step.all_fields())
        .filter_map(|name| form.field(name))
        .map(|spec| {
            let value = app.field(&spec.name).cloned().unwrap_or(Value::Null);
            let active = is_field_active(form, app, &spec.name);
            let required = active && is_required(spec, &ctx);
            RenderField {
                name: spec.name.clone(),
                label: spec.label.clone(),
                kind: spec.kind,
                required,
                active,
                derived: form.is_derived(None, &spec.name),
                display: display(&value),
                value,
                choices: spec.choices.clone(),
            }
        })
        .collect();

    let collections = step
        .into_iter()
        .flat_map(|step| step.all_collections())
        .filter_map(|name| form.collection(name))
        .map(|spec| {
            let codes = display_codes(form, app, &spec.name);
            let items = app
                .collection(&spec.name)
                .iter()
                .enumerate()
                .map(|(position, item)| RenderItem {
                    index: position,
                    code: codes
                        .get(position)
                        .cloned()
                        .flatten()
                        .unwrap_or_else(|| (position + 1).to_string()),
                    summary: spec
                        .fields
                        .iter()
                        .map(|field| {
                            format!(
                                "{}={}",
                                field.name,
                                display(item.get(&field.name).unwrap_or(&Value::Null))
                            )
                        })
                        .collect::<Vec<_>>()
                        .join(", "),
                    values: item.clone(),
                })
                .collect::<Vec<_>>();
            RenderCollection {
                name: spec.name.clone(),
                label: spec.label.clone(),
                active: visibility.collection(&spec.name),
                count: items.len(),
                minimum: effective_minimum(spec, app),
                maximum: spec.max_items,
                items,
            }
        })
        .collect();

    StepPayload {
        form_id: form.id().to_string(),
        form_title: form.title().to_string(),
        status: wizard.status(),
        step: index,
        total: wizard.step_count(),
        step_id: step.map(|step| step.id.clone()).unwrap_or_default(),
        step_title: step.map(|step| step.title.clone()).unwrap_or_default(),
        icon: step.and_then(|step| step.icon.clone()),
        progress: wizard.progress(),
        active_steps: visibility
            .steps
            .iter()
            .filter(|(_, active)| **active)
            .map(|(index, _)| *index)
            .collect(),
        fields,
        collections,
        errors: wizard.step_errors(),
        can_next: wizard.can_next(),
        can_submit: wizard.can_submit(),
    }
}

/// Structured JSON view of the payload.
pub fn render_json_ui(payload: &StepPayload) -> Value {
    serde_json::to_value(payload).unwrap_or_else(|err| json!({ "error": err.to_string() }))
}

/// Plain-text summary of the payload.
pub fn render_text(payload: &StepPayload) -> String {
    let mut engine = Handlebars::new();
    engine.register_escape_fn(handlebars::no_escape);
    engine
        .render_template(TEXT_TEMPLATE, payload)
        .unwrap_or_else(|err| format!("render error: {}", err))
}
