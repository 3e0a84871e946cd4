use std::sync::Arc;

use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

use wizard_spec::{
    DefinitionError, Form, FormSpec, SubmissionGate, ValidationReport, Wizard, WizardError,
    build_step_payload, render_json_ui, render_text,
};

pub mod aml;
pub mod corporate;
pub mod creator;
pub mod individual;
pub mod lien;
pub mod registry;
pub mod tables;

pub use creator::ReferenceIssuer;
pub use registry::AccountRegistry;

/// Identifiers of the built-in forms, in catalog order.
pub const FORM_IDS: [&str; 3] = [corporate::FORM_ID, individual::FORM_ID, lien::FORM_ID];

#[derive(Debug, Error)]
pub enum FacadeError {
    #[error("failed to parse answers: {0}")]
    AnswersParse(#[source] serde_json::Error),
    #[error("form '{0}' is not available")]
    FormUnavailable(String),
    #[error("built-in form '{id}' is malformed: {source}")]
    Embedded {
        id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid form definition: {0}")]
    Definition(#[from] DefinitionError),
    #[error(transparent)]
    Wizard(#[from] WizardError),
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
}

/// Definition of a built-in form.
pub fn form_spec(form_id: &str) -> Result<FormSpec, FacadeError> {
    match form_id {
        corporate::FORM_ID => Ok(corporate::form()),
        individual::FORM_ID => Ok(individual::form()),
        lien::FORM_ID => lien::form().map_err(|source| FacadeError::Embedded {
            id: form_id.to_string(),
            source,
        }),
        other => Err(FacadeError::FormUnavailable(other.to_string())),
    }
}

pub fn compile(form_id: &str) -> Result<Arc<Form>, FacadeError> {
    Ok(Arc::new(Form::compile(form_spec(form_id)?)?))
}

/// Fresh session on a built-in form.
pub fn start(form_id: &str) -> Result<Wizard, FacadeError> {
    Ok(Wizard::new(compile(form_id)?))
}

fn parse_answers(answers_json: &str) -> Result<Value, FacadeError> {
    if answers_json.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(answers_json).map_err(FacadeError::AnswersParse)
}

fn session_with_answers(
    form_id: &str,
    answers_json: &str,
) -> Result<(Wizard, Vec<String>), FacadeError> {
    let mut wizard = start(form_id)?;
    let answers = parse_answers(answers_json)?;
    let unknown = wizard.load_answers(&answers)?;
    if !unknown.is_empty() {
        debug!(form = form_id, ?unknown, "answers carry keys the form does not declare");
    }
    Ok((wizard, unknown))
}

fn respond(result: Result<Value, FacadeError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|error| {
            json!({"error": format!("json encode: {}", error)}).to_string()
        }),
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

fn respond_string(result: Result<String, FacadeError>) -> String {
    match result {
        Ok(value) => value,
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

fn with_entry(mut value: Value, key: &str, entry: Value) -> Value {
    if let Value::Object(map) = &mut value {
        map.insert(key.to_string(), entry);
    }
    value
}

pub fn list_forms() -> String {
    let forms: Result<Vec<Value>, FacadeError> = FORM_IDS
        .iter()
        .map(|id| {
            form_spec(id).map(|spec| {
                json!({
                    "id": spec.id,
                    "title": spec.title,
                    "version": spec.version,
                    "steps": spec.steps.len(),
                })
            })
        })
        .collect();
    respond(forms.map(Value::from))
}

pub fn describe(form_id: &str) -> String {
    respond(
        form_spec(form_id)
            .and_then(|spec| serde_json::to_value(spec).map_err(FacadeError::JsonEncode)),
    )
}

/// Whole-record validation of an answers object, as the submission gate
/// sees it.
pub fn validate_answers(form_id: &str, answers_json: &str) -> String {
    respond(
        session_with_answers(form_id, answers_json).and_then(|(wizard, unknown)| {
            let errors = SubmissionGate::new(wizard.form()).blocking_errors(wizard.application());
            let report = serde_json::to_value(ValidationReport::from_errors(errors))
                .map_err(FacadeError::JsonEncode)?;
            Ok(with_entry(report, "unknown_keys", json!(unknown)))
        }),
    )
}

fn step_session(form_id: &str, answers_json: &str, step: usize) -> Result<(Wizard, Value), FacadeError> {
    let (mut wizard, _) = session_with_answers(form_id, answers_json)?;
    let navigation = wizard.jump_to(step)?;
    let blocked_by = serde_json::to_value(&navigation.errors).map_err(FacadeError::JsonEncode)?;
    Ok((wizard, blocked_by))
}

/// JSON view of `step`. When earlier steps do not validate the view stays on
/// the step where navigation stopped and `blocked_by` lists why.
pub fn step_view(form_id: &str, answers_json: &str, step: usize) -> String {
    respond(
        step_session(form_id, answers_json, step).map(|(wizard, blocked_by)| {
            let view = render_json_ui(&build_step_payload(&wizard));
            let view = with_entry(view, "requested_step", json!(step));
            with_entry(view, "blocked_by", blocked_by)
        }),
    )
}

pub fn step_text(form_id: &str, answers_json: &str, step: usize) -> String {
    respond_string(
        step_session(form_id, answers_json, step)
            .map(|(wizard, _)| render_text(&build_step_payload(&wizard))),
    )
}

/// Walks an answers object to the last step and submits it.
pub fn submit_answers(form_id: &str, answers_json: &str, issuer: &ReferenceIssuer) -> String {
    respond(
        session_with_answers(form_id, answers_json).and_then(|(mut wizard, _)| {
            let last = wizard.step_count();
            let navigation = wizard.jump_to(last)?;
            if !navigation.errors.is_empty() || wizard.current_step() != last {
                return Ok(json!({
                    "status": "blocked",
                    "step": wizard.current_step(),
                    "errors": navigation.errors,
                }));
            }
            match wizard.submit(issuer) {
                Ok(receipt) => Ok(json!({
                    "status": "submitted",
                    "reference": receipt.reference,
                    "application": receipt.application,
                })),
                Err(WizardError::Blocked(errors)) => Ok(json!({
                    "status": "blocked",
                    "step": wizard.current_step(),
                    "errors": errors,
                })),
                Err(other) => Err(other.into()),
            }
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(payload: &str) -> Value {
        serde_json::from_str(payload).expect("valid json")
    }

    #[test]
    fn every_builtin_form_compiles() {
        for id in FORM_IDS {
            let form = compile(id).unwrap_or_else(|err| panic!("{id}: {err}"));
            assert_eq!(form.id(), id);
        }
    }

    #[test]
    fn list_forms_reports_step_counts() {
        let forms = parse(&list_forms());
        assert_eq!(forms[0]["id"], corporate::FORM_ID);
        assert_eq!(forms[0]["steps"], 7);
        assert_eq!(forms[1]["steps"], 8);
        assert_eq!(forms[2]["steps"], 3);
    }

    #[test]
    fn describe_returns_spec_json() {
        let spec = parse(&describe(lien::FORM_ID));
        assert_eq!(spec["id"], "lien-maintenance");
        assert_eq!(spec["steps"][0]["id"], "account");
    }

    #[test]
    fn unknown_form_is_an_error_payload() {
        let payload = parse(&describe("mortgage"));
        assert_eq!(payload["error"], "form 'mortgage' is not available");
    }

    #[test]
    fn validate_answers_lists_missing_fields_and_unknown_keys() {
        let answers = json!({ "account_number": "0123456789", "colour": "red" });
        let report = parse(&validate_answers(lien::FORM_ID, &answers.to_string()));
        assert_eq!(report["valid"], false);
        assert_eq!(report["unknown_keys"], json!(["colour"]));
        let missing = report["missing_required"].as_array().expect("array");
        assert!(missing.contains(&json!("/account_name")));
        assert!(missing.contains(&json!("/reason")));
        assert!(!missing.contains(&json!("/account_number")));
    }

    #[test]
    fn malformed_answers_are_reported() {
        let payload = parse(&validate_answers(lien::FORM_ID, "{not json"));
        assert!(
            payload["error"]
                .as_str()
                .is_some_and(|message| message.starts_with("failed to parse answers"))
        );
    }

    #[test]
    fn step_view_stops_where_navigation_is_blocked() {
        let view = parse(&step_view(lien::FORM_ID, "{}", 3));
        assert_eq!(view["requested_step"], 3);
        assert_eq!(view["step"], 1);
        assert!(!view["blocked_by"].as_array().expect("array").is_empty());
    }

    #[test]
    fn submit_answers_issues_a_reference() {
        let answers = json!({
            "account_number": "0123456789",
            "account_name": "ADA OBI",
            "available_balance": 150000,
            "lien_type": "PARTIAL",
            "lien_amount": 50000,
            "reason": "LOAN COLLATERAL",
            "start_date": "2026-10-01",
            "confirmed": true
        });
        let issuer = ReferenceIssuer::new();
        let receipt = parse(&submit_answers(lien::FORM_ID, &answers.to_string(), &issuer));
        assert_eq!(receipt["status"], "submitted");
        assert_eq!(receipt["reference"], "LM000001");
        assert_eq!(receipt["application"]["fields"]["lien_amount"], 50000);
        assert_eq!(issuer.issued(), 1);
    }

    #[test]
    fn submit_answers_reports_blocking_errors() {
        let issuer = ReferenceIssuer::new();
        let payload = parse(&submit_answers(lien::FORM_ID, "{}", &issuer));
        assert_eq!(payload["status"], "blocked");
        assert_eq!(payload["step"], 1);
        assert_eq!(issuer.issued(), 0);
    }
}
