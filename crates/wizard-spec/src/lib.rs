#![allow(missing_docs)]

pub mod application;
pub mod collection;
pub mod definition;
pub mod derive;
pub mod error;
pub mod expr;
pub mod lookup;
pub mod render;
pub mod spec;
pub mod submit;
pub mod validate;
pub mod visibility;
pub mod wizard;

pub use application::{Application, Item, StaleRevision, SubmittedApplication};
pub use definition::{Form, Owner};
pub use derive::FieldRef;
pub use error::{CollectionError, DefinitionError, ErrorKind, ValidationError};
pub use expr::Expr;
pub use lookup::{
    LookupError, LookupService, LookupTicket, LookupTracker, Prefill, PrefillOutcome, run_lookup,
};
pub use render::{StepPayload, build_step_payload, render_json_ui, render_text};
pub use spec::{
    CollectionSpec, Constraint, DerivationPolicy, DerivationRule, FieldGroup, FieldKind,
    FieldSpec, FormSpec, PrefillPolicy, StepSpec, SubmitRule,
};
pub use submit::{AccountCreator, CreatorError, Receipt, SubmissionGate};
pub use validate::{
    ValidationReport, validate_all, validate_collection, validate_field, validate_step,
};
pub use visibility::{Visibility, VisibilityMap, VisibilityMode, resolve_visibility};
pub use wizard::{CollectionUpdate, FieldUpdate, Navigation, SessionStatus, Wizard, WizardError};

/// JSON schema describing [`FormSpec`] documents.
pub fn definition_schema() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(FormSpec)).unwrap_or_default()
}
