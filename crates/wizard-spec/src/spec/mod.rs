pub mod collection;
pub mod derivation;
pub mod field;
pub mod form;
pub mod step;

pub use collection::CollectionSpec;
pub use derivation::{DerivationPolicy, DerivationRule};
pub use field::{Constraint, FieldKind, FieldSpec};
pub use form::{FormSpec, PrefillPolicy, SubmitRule};
pub use step::{FieldGroup, StepSpec};
