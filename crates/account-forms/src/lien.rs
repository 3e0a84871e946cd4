use wizard_spec::FormSpec;

pub const FORM_ID: &str = "lien-maintenance";

const DEFINITION: &str = include_str!("../forms/lien_maintenance.json");

/// Three-step lien maintenance form: look the account up, describe the
/// lien, confirm.
pub fn form() -> Result<FormSpec, serde_json::Error> {
    serde_json::from_str(DEFINITION)
}
