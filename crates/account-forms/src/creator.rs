use std::sync::atomic::{AtomicU64, Ordering};

use tracing::info;
use wizard_spec::{AccountCreator, CreatorError, SubmittedApplication};

use crate::FORM_IDS;

/// Issues sequential references (`CA000001`, `IA000002`, ...) for the
/// built-in forms. Stands in for the core-banking account service.
#[derive(Debug, Default)]
pub struct ReferenceIssuer {
    issued: AtomicU64,
}

impl ReferenceIssuer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }
}

fn prefix(form_id: &str) -> String {
    form_id
        .split('-')
        .filter_map(|part| part.chars().next())
        .map(|letter| letter.to_ascii_uppercase())
        .collect()
}

impl AccountCreator for ReferenceIssuer {
    fn create(&self, application: &SubmittedApplication) -> Result<String, CreatorError> {
        if !FORM_IDS.contains(&application.form_id.as_str()) {
            return Err(CreatorError::Rejected(format!(
                "no account product for form '{}'",
                application.form_id
            )));
        }
        let sequence = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let reference = format!("{}{:06}", prefix(&application.form_id), sequence);
        info!(form = %application.form_id, reference = %reference, "account reference issued");
        Ok(reference)
    }
}
