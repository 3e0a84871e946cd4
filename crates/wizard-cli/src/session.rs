use serde_json::Value;
use tracing::{debug, warn};

use account_forms::{AccountRegistry, ReferenceIssuer};
use wizard_spec::{FieldKind, Receipt, SessionStatus, Wizard, WizardError, run_lookup};

use crate::presenter::Presenter;
use crate::script::Action;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Whether the shell should keep reading actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// One wizard session plus the collaborators actions may reach.
pub struct Session {
    wizard: Wizard,
    registry: Option<AccountRegistry>,
    issuer: ReferenceIssuer,
    receipt: Option<Receipt>,
}

// Text-like fields keep what the user typed even when it parses as JSON
// (`set registration_number 123456`).
fn coerce(kind: Option<FieldKind>, value: Value) -> Value {
    match (kind, value) {
        (Some(FieldKind::Text | FieldKind::Enum | FieldKind::Date), Value::Number(number)) => {
            Value::String(number.to_string())
        }
        (Some(FieldKind::Text | FieldKind::Enum | FieldKind::Date), Value::Bool(flag)) => {
            Value::String(flag.to_string())
        }
        (_, value) => value,
    }
}

impl Session {
    pub fn new(wizard: Wizard, registry: Option<AccountRegistry>) -> Self {
        Self {
            wizard,
            registry,
            issuer: ReferenceIssuer::new(),
            receipt: None,
        }
    }

    pub fn wizard(&self) -> &Wizard {
        &self.wizard
    }

    pub fn receipt(&self) -> Option<&Receipt> {
        self.receipt.as_ref()
    }

    fn field_kind(&self, name: &str) -> Option<FieldKind> {
        self.wizard.form().field(name).map(|spec| spec.kind)
    }

    fn item_kind(&self, collection: &str, name: &str) -> Option<FieldKind> {
        self.wizard
            .form()
            .collection(collection)
            .and_then(|spec| spec.field(name))
            .map(|spec| spec.kind)
    }

    /// Applies one action. Refusals by the engine are reported and the
    /// session carries on; only I/O style failures are returned.
    pub fn apply(&mut self, action: Action, presenter: &Presenter) -> CliResult<Flow> {
        debug!(?action, step = self.wizard.current_step(), "applying action");
        let before = self.wizard.current_step();
        let result = self.dispatch(action, presenter);
        match result {
            Ok(Flow::Stop) => return Ok(Flow::Stop),
            Ok(Flow::Continue) => {}
            Err(err) => {
                warn!(error = %err, "action rejected");
                presenter.show_failure(&err);
            }
        }
        if self.wizard.status() != SessionStatus::Active {
            return Ok(Flow::Stop);
        }
        if presenter.is_verbose() || self.wizard.current_step() != before {
            presenter.show_step(&self.wizard);
        }
        Ok(Flow::Continue)
    }

    fn dispatch(&mut self, action: Action, presenter: &Presenter) -> Result<Flow, WizardError> {
        match action {
            Action::Set { field, value } => {
                let value = coerce(self.field_kind(&field), value);
                let update = self.wizard.set_field(&field, value)?;
                presenter.show_derived(&update.derived);
                presenter.show_errors(&update.errors);
            }
            Action::Unpin { field } => {
                let update = self.wizard.unpin(&field)?;
                presenter.show_derived(&update.derived);
            }
            Action::Add { collection, values } => {
                let values = values
                    .into_iter()
                    .map(|(name, value)| {
                        let kind = self.item_kind(&collection, &name);
                        (name, coerce(kind, value))
                    })
                    .collect();
                let update = self.wizard.add_item(&collection, values)?;
                if let Some(index) = update.index {
                    println!("Added {} item {}", collection, index);
                }
            }
            Action::Remove { collection, index } => {
                self.wizard.remove_item(&collection, index)?;
                println!("Removed {} item {}", collection, index);
            }
            Action::Update {
                collection,
                index,
                field,
                value,
            } => {
                let value = coerce(self.item_kind(&collection, &field), value);
                let update = self.wizard.update_item(&collection, index, &field, value)?;
                presenter.show_derived(&update.derived);
                presenter.show_errors(&update.errors);
            }
            Action::Toggle {
                collection,
                key,
                on,
            } => {
                self.wizard.toggle_keyed(&collection, &key, on)?;
            }
            Action::Next => presenter.show_navigation(&self.wizard.next()),
            Action::Back => presenter.show_navigation(&self.wizard.back()),
            Action::Goto(step) => presenter.show_navigation(&self.wizard.jump_to(step)?),
            Action::Show => presenter.show_step(&self.wizard),
            Action::Lookup(key) => self.lookup(&key, presenter)?,
            Action::Submit => {
                let receipt = self.wizard.submit(&self.issuer)?;
                presenter.show_receipt(&receipt);
                self.receipt = Some(receipt);
            }
            Action::Cancel => {
                self.wizard.cancel();
                println!("Cancelled");
            }
            Action::Quit => return Ok(Flow::Stop),
        }
        Ok(Flow::Continue)
    }

    fn lookup(&mut self, key: &str, presenter: &Presenter) -> Result<(), WizardError> {
        let Some(registry) = &self.registry else {
            println!("No registry loaded; pass --registry to enable lookups");
            return Ok(());
        };
        let ticket = self.wizard.begin_lookup(key);
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| wizard_spec::LookupError::Service(err.to_string()))?;
        let (ticket, response) = runtime.block_on(run_lookup(registry, ticket));
        let outcome = self.wizard.apply_lookup(&ticket, response?)?;
        presenter.show_prefill(&outcome);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_fields_keep_numeric_input_as_text() {
        assert_eq!(coerce(Some(FieldKind::Text), json!(123456)), json!("123456"));
        assert_eq!(coerce(Some(FieldKind::Integer), json!(12)), json!(12));
        assert_eq!(coerce(None, json!(true)), json!(true));
    }
}
