//! Step-sequencing state machine over one application.
//!
//! States are step indices `1..=N`. `next` is gated on the current step
//! validating clean, `back` is always allowed, and `submit` is only reachable
//! from the last active step through the [`SubmissionGate`].

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::{Application, Item};
use crate::collection;
use crate::definition::Form;
use crate::derive::{self, FieldRef};
use crate::error::{CollectionError, ValidationError};
use crate::lookup::{LookupError, LookupTicket, LookupTracker, Prefill, PrefillOutcome};
use crate::submit::{AccountCreator, CreatorError, Receipt, SubmissionGate};
use crate::validate::{validate_collection, validate_field, validate_step};
use crate::visibility::is_step_active;

/// Lifecycle of a wizard session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Submitted,
    Cancelled,
}

#[derive(Debug, Error)]
pub enum WizardError {
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("step {0} does not exist")]
    UnknownStep(usize),
    #[error(transparent)]
    Collection(#[from] CollectionError),
    #[error("session is {0:?}; no further changes are accepted")]
    SessionClosed(SessionStatus),
    #[error("submit is only available from step {last}; currently on step {current}")]
    InvalidTransition { current: usize, last: usize },
    #[error("submission blocked by {} validation error(s)", .0.len())]
    Blocked(Vec<ValidationError>),
    #[error(transparent)]
    Creator(#[from] CreatorError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// Result of a field write: derived paths that changed and the errors of
/// everything the write can affect.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FieldUpdate {
    pub derived: Vec<String>,
    pub errors: Vec<ValidationError>,
}

/// Result of a collection edit.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CollectionUpdate {
    /// Index of the added or selected item, if any.
    pub index: Option<usize>,
    pub derived: Vec<String>,
    pub errors: Vec<ValidationError>,
}

/// Result of a navigation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Navigation {
    pub step: usize,
    pub moved: bool,
    /// Errors blocking the move; empty when moved or at a boundary.
    pub errors: Vec<ValidationError>,
}

#[derive(Debug)]
pub struct Wizard {
    form: Arc<Form>,
    app: Application,
    current: usize,
    lowest_visited: usize,
    lookups: LookupTracker,
    status: SessionStatus,
}

impl Wizard {
    /// Starts a session with every default applied and derivations run once.
    pub fn new(form: Arc<Form>) -> Self {
        let mut app = Application::new(form.id());
        for field in &form.spec().fields {
            app.put_field(&field.name, field.initial_value());
        }
        for spec in &form.spec().collections {
            let items = app.collection_mut(&spec.name);
            for _ in 0..spec.min_items {
                items.push(collection::new_item(spec, Item::new()));
            }
        }
        derive::apply_all(&form, &mut app);

        let mut wizard = Self {
            form,
            app,
            current: 1,
            lowest_visited: 1,
            lookups: LookupTracker::default(),
            status: SessionStatus::Active,
        };
        if !is_step_active(&wizard.form, &wizard.app, 1)
            && let Some(first) = wizard.next_active_after(1)
        {
            wizard.current = first;
            wizard.lowest_visited = first;
        }
        debug!(form = wizard.form.id(), step = wizard.current, "wizard session started");
        wizard
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    pub fn application(&self) -> &Application {
        &self.app
    }

    pub fn current_step(&self) -> usize {
        self.current
    }

    pub fn step_count(&self) -> usize {
        self.form.step_count()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// `round(current / N * 100)`.
    pub fn progress(&self) -> u8 {
        let total = self.form.step_count().max(1);
        ((self.current as f64 / total as f64) * 100.0).round() as u8
    }

    fn ensure_active(&self) -> Result<(), WizardError> {
        match self.status {
            SessionStatus::Active => Ok(()),
            other => Err(WizardError::SessionClosed(other)),
        }
    }

    /// Errors for the written names plus everything that reads them.
    fn affected_errors<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Vec<ValidationError> {
        let mut affected = BTreeSet::new();
        for name in names {
            affected.insert(name.to_string());
            affected.extend(self.form.dependents(name).map(String::from));
            for spec in &self.form.spec().collections {
                if spec.min_items_field.as_deref() == Some(name) {
                    affected.insert(spec.name.clone());
                }
            }
        }
        affected
            .iter()
            .flat_map(|name| {
                if self.form.collection(name).is_some() {
                    validate_collection(&self.form, &self.app, name)
                } else {
                    validate_field(&self.form, &self.app, name)
                }
            })
            .collect()
    }

    /// Writes one scalar field, runs its derivations and re-validates
    /// everything the write can affect.
    pub fn set_field(&mut self, name: &str, value: Value) -> Result<FieldUpdate, WizardError> {
        self.ensure_active()?;
        if self.form.field(name).is_none() {
            return Err(WizardError::UnknownField(name.to_string()));
        }
        let mut derived = Vec::new();
        if self.app.field(name) != Some(&value) {
            if self.form.is_derived(None, name) {
                self.app.pin(&FieldRef::Scalar(name).pin_key());
            }
            self.app.put_field(name, value);
            derived = derive::apply(&self.form, &mut self.app, FieldRef::Scalar(name));
        }
        let names = std::iter::once(name).chain(
            derived
                .iter()
                .filter_map(|path| path.strip_prefix('/'))
                .filter(|path| !path.contains('/')),
        );
        let errors = self.affected_errors(names);
        Ok(FieldUpdate { derived, errors })
    }

    /// Releases a manual override and re-derives the field from its source.
    pub fn unpin(&mut self, name: &str) -> Result<FieldUpdate, WizardError> {
        self.ensure_active()?;
        if self.form.field(name).is_none() {
            return Err(WizardError::UnknownField(name.to_string()));
        }
        self.app.unpin(&FieldRef::Scalar(name).pin_key());
        let sources: Vec<String> = self
            .form
            .derivations()
            .iter()
            .filter(|rule| rule.collection().is_none() && rule.target() == name)
            .map(|rule| rule.source().to_string())
            .collect();
        let mut derived = Vec::new();
        for source in &sources {
            derived.extend(derive::apply(
                &self.form,
                &mut self.app,
                FieldRef::Scalar(source),
            ));
        }
        let errors = self.affected_errors([name]);
        Ok(FieldUpdate { derived, errors })
    }

    pub fn add_item(
        &mut self,
        collection: &str,
        defaults: Item,
    ) -> Result<CollectionUpdate, WizardError> {
        self.ensure_active()?;
        let index = collection::add_item(&self.form, &mut self.app, collection, defaults)?;
        Ok(CollectionUpdate {
            index: Some(index),
            derived: Vec::new(),
            errors: validate_collection(&self.form, &self.app, collection),
        })
    }

    pub fn remove_item(
        &mut self,
        collection: &str,
        index: usize,
    ) -> Result<CollectionUpdate, WizardError> {
        self.ensure_active()?;
        collection::remove_item(&self.form, &mut self.app, collection, index)?;
        Ok(CollectionUpdate {
            index: None,
            derived: Vec::new(),
            errors: validate_collection(&self.form, &self.app, collection),
        })
    }

    pub fn update_item(
        &mut self,
        collection: &str,
        index: usize,
        field: &str,
        value: Value,
    ) -> Result<CollectionUpdate, WizardError> {
        self.ensure_active()?;
        let derived =
            collection::update_item(&self.form, &mut self.app, collection, index, field, value)?;
        Ok(CollectionUpdate {
            index: Some(index),
            derived,
            errors: validate_collection(&self.form, &self.app, collection),
        })
    }

    /// Selects or deselects the item keyed by `key` (checkbox groups).
    pub fn toggle_keyed(
        &mut self,
        collection: &str,
        key: &str,
        on: bool,
    ) -> Result<CollectionUpdate, WizardError> {
        self.ensure_active()?;
        let index = collection::toggle_keyed(&self.form, &mut self.app, collection, key, on)?;
        Ok(CollectionUpdate {
            index,
            derived: Vec::new(),
            errors: validate_collection(&self.form, &self.app, collection),
        })
    }

    /// Errors blocking the current step.
    pub fn step_errors(&self) -> Vec<ValidationError> {
        validate_step(&self.form, &self.app, self.current)
    }

    pub fn can_next(&self) -> bool {
        self.step_errors().is_empty() && self.next_active_after(self.current).is_some()
    }

    fn next_active_after(&self, index: usize) -> Option<usize> {
        (index + 1..=self.form.step_count()).find(|step| is_step_active(&self.form, &self.app, *step))
    }

    fn previous_active_before(&self, index: usize) -> Option<usize> {
        (1..index)
            .rev()
            .find(|step| is_step_active(&self.form, &self.app, *step))
    }

    fn last_active(&self) -> usize {
        (1..=self.form.step_count())
            .rev()
            .find(|step| is_step_active(&self.form, &self.app, *step))
            .unwrap_or(self.form.step_count())
    }

    fn stay(&self) -> Navigation {
        Navigation {
            step: self.current,
            moved: false,
            errors: Vec::new(),
        }
    }

    /// Moves forward when the current step validates clean; otherwise a
    /// no-op that reports the blocking errors. Closed sessions never move.
    pub fn next(&mut self) -> Navigation {
        if self.status != SessionStatus::Active {
            return self.stay();
        }
        let errors = self.step_errors();
        if !errors.is_empty() {
            debug!(step = self.current, errors = errors.len(), "next blocked");
            return Navigation {
                step: self.current,
                moved: false,
                errors,
            };
        }
        match self.next_active_after(self.current) {
            Some(step) => {
                debug!(from = self.current, to = step, "step advanced");
                self.current = step;
                Navigation {
                    step,
                    moved: true,
                    errors: Vec::new(),
                }
            }
            None => self.stay(),
        }
    }

    /// Always allowed while the session is open; the step being left is not
    /// re-validated.
    pub fn back(&mut self) -> Navigation {
        if self.status != SessionStatus::Active {
            return self.stay();
        }
        match self.previous_active_before(self.current) {
            Some(step) => {
                debug!(from = self.current, to = step, "step reversed");
                self.current = step;
                self.lowest_visited = self.lowest_visited.min(step);
                Navigation {
                    step,
                    moved: true,
                    errors: Vec::new(),
                }
            }
            None => self.stay(),
        }
    }

    /// Arbitrary jump. Backward jumps always succeed; forward jumps require
    /// every active step from the lowest visited one up to `target - 1` to
    /// validate clean.
    pub fn jump_to(&mut self, target: usize) -> Result<Navigation, WizardError> {
        self.ensure_active()?;
        if target == 0 || target > self.form.step_count() {
            return Err(WizardError::UnknownStep(target));
        }
        if !is_step_active(&self.form, &self.app, target) {
            return Ok(self.stay());
        }
        if target > self.current {
            let errors: Vec<ValidationError> = (self.lowest_visited..target)
                .flat_map(|step| validate_step(&self.form, &self.app, step))
                .collect();
            if !errors.is_empty() {
                return Ok(Navigation {
                    step: self.current,
                    moved: false,
                    errors,
                });
            }
        }
        let moved = target != self.current;
        self.current = target;
        self.lowest_visited = self.lowest_visited.min(target);
        Ok(Navigation {
            step: target,
            moved,
            errors: Vec::new(),
        })
    }

    pub fn gate(&self) -> SubmissionGate<'_> {
        SubmissionGate::new(&self.form)
    }

    /// Submit is enabled only on the last active step with a clean gate.
    pub fn can_submit(&self) -> bool {
        self.status == SessionStatus::Active
            && self.current == self.last_active()
            && self.gate().can_submit(&self.app)
    }

    /// Hands a frozen copy to the account creator and closes the session.
    ///
    /// Any refusal leaves the application and the step index unchanged.
    pub fn submit(&mut self, creator: &dyn AccountCreator) -> Result<Receipt, WizardError> {
        self.ensure_active()?;
        let last = self.last_active();
        if self.current != last {
            return Err(WizardError::InvalidTransition {
                current: self.current,
                last,
            });
        }
        let frozen = self.gate().submit(&self.app).map_err(WizardError::Blocked)?;
        let reference = creator.create(&frozen)?;
        self.status = SessionStatus::Submitted;
        info!(form = self.form.id(), reference = %reference, "application submitted");
        Ok(Receipt {
            reference,
            application: frozen,
        })
    }

    /// Discards the session.
    pub fn cancel(&mut self) {
        if self.status == SessionStatus::Active {
            info!(form = self.form.id(), "wizard session cancelled");
            self.status = SessionStatus::Cancelled;
        }
    }

    /// Issues a new lookup request; every earlier ticket becomes stale.
    pub fn begin_lookup(&mut self, key: &str) -> LookupTicket {
        let ticket = self.lookups.issue(key);
        debug!(token = ticket.token(), key, "lookup issued");
        ticket
    }

    /// Applies a lookup response if its ticket is still the latest one.
    pub fn apply_lookup(
        &mut self,
        ticket: &LookupTicket,
        prefill: Prefill,
    ) -> Result<PrefillOutcome, WizardError> {
        self.ensure_active()?;
        if let Err(err) = self.lookups.check(ticket) {
            warn!(token = ticket.token(), key = ticket.key(), "stale lookup response discarded");
            return Err(err.into());
        }
        let mut outcome = PrefillOutcome::default();
        for (name, value) in prefill.fields {
            if self.form.field(&name).is_some() && self.form.prefill_allows(&name) {
                self.set_field(&name, value)?;
                outcome.applied.push(name);
            } else {
                outcome.skipped.push(name);
            }
        }
        for (name, items) in prefill.collections {
            if self.form.collection(&name).is_some() && self.form.prefill_allows(&name) {
                collection::replace_items(&self.form, &mut self.app, &name, items)?;
                outcome.applied.push(name);
            } else {
                outcome.skipped.push(name);
            }
        }
        debug!(
            token = ticket.token(),
            applied = outcome.applied.len(),
            skipped = outcome.skipped.len(),
            "lookup applied"
        );
        Ok(outcome)
    }

    /// Bulk import of an answers object (`{field: value, collection: [..]}`).
    ///
    /// Scalars are written in declaration order so derivations see their
    /// sources first. Returns the keys the form does not know.
    pub fn load_answers(&mut self, answers: &Value) -> Result<Vec<String>, WizardError> {
        self.ensure_active()?;
        let Some(map) = answers.as_object() else {
            return Ok(Vec::new());
        };
        let form = Arc::clone(&self.form);
        for field in &form.spec().fields {
            if let Some(value) = map.get(&field.name) {
                self.set_field(&field.name, value.clone())?;
            }
        }
        for spec in &form.spec().collections {
            if let Some(Value::Array(values)) = map.get(&spec.name) {
                let items = values
                    .iter()
                    .filter_map(Value::as_object)
                    .map(|object| {
                        object
                            .iter()
                            .map(|(key, value)| (key.clone(), value.clone()))
                            .collect::<Item>()
                    })
                    .collect();
                collection::replace_items(&form, &mut self.app, &spec.name, items)?;
            }
        }
        Ok(map
            .keys()
            .filter(|key| form.field(key).is_none() && form.collection(key).is_none())
            .cloned()
            .collect())
    }
}
