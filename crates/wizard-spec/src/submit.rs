use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::application::{Application, SubmittedApplication};
use crate::definition::Form;
use crate::error::{ErrorKind, ValidationError};
use crate::validate::validate_all;

/// Failure reported by the external account-creation service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CreatorError {
    #[error("account creation rejected: {0}")]
    Rejected(String),
    #[error("account creation service unavailable: {0}")]
    Unavailable(String),
}

/// External collaborator that turns a finished application into an account.
pub trait AccountCreator {
    /// Returns the reference assigned to the created account.
    fn create(&self, application: &SubmittedApplication) -> Result<String, CreatorError>;
}

/// Outcome of a completed submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Receipt {
    pub reference: String,
    pub application: SubmittedApplication,
}

/// Final, authoritative re-validation before the terminal submit action.
///
/// It never trusts what earlier step transitions concluded: every active
/// step and every cross-step rule is checked again.
#[derive(Debug, Clone, Copy)]
pub struct SubmissionGate<'a> {
    form: &'a Form,
}

impl<'a> SubmissionGate<'a> {
    pub fn new(form: &'a Form) -> Self {
        Self { form }
    }

    /// Violations of the form's cross-step submit rules.
    pub fn rule_violations(&self, app: &Application) -> Vec<ValidationError> {
        let ctx = app.to_value();
        self.form
            .spec()
            .submit_rules
            .iter()
            .filter(|rule| rule.expr.evaluate(&ctx) != Some(true))
            .map(|rule| ValidationError::new(&rule.path, ErrorKind::RuleViolation, &rule.message))
            .collect()
    }

    pub fn blocking_errors(&self, app: &Application) -> Vec<ValidationError> {
        let mut errors = validate_all(self.form, app);
        errors.extend(self.rule_violations(app));
        errors
    }

    pub fn can_submit(&self, app: &Application) -> bool {
        self.blocking_errors(app).is_empty()
    }

    /// Freezes a copy of the application; the application itself is untouched.
    pub fn submit(&self, app: &Application) -> Result<SubmittedApplication, Vec<ValidationError>> {
        let errors = self.blocking_errors(app);
        if !errors.is_empty() {
            debug!(form = self.form.id(), errors = errors.len(), "submission blocked");
            return Err(errors);
        }
        Ok(app.freeze())
    }
}
