use serde_json::json;

use account_forms::{AccountRegistry, lien, start};
use wizard_spec::{LookupError, WizardError, run_lookup};

const REGISTRY: &str = r#"{
    "0123456789": {
        "fields": {
            "account_name": "ADA OBI",
            "customer_id": "CIF-00912",
            "branch": "MARINA",
            "currency": "NGN",
            "available_balance": 150000.0,
            "lien_type": "PARTIAL"
        }
    },
    "0987654321": {
        "fields": { "account_name": "TUNDE BELLO", "available_balance": 500.0 }
    }
}"#;

#[tokio::test]
async fn lookup_prefills_allowed_account_fields() {
    let registry = AccountRegistry::from_json(REGISTRY).expect("registry");
    assert_eq!(registry.len(), 2);
    let mut wizard = start(lien::FORM_ID).expect("lien form");
    wizard
        .set_field("account_number", json!("0123456789"))
        .expect("account");

    let ticket = wizard.begin_lookup("0123456789");
    let (ticket, response) = run_lookup(&registry, ticket).await;
    let outcome = wizard
        .apply_lookup(&ticket, response.expect("record"))
        .expect("apply");

    assert_eq!(outcome.skipped, vec!["lien_type"]);
    let app = wizard.application();
    assert_eq!(app.field("account_name"), Some(&json!("ADA OBI")));
    assert_eq!(app.field("lien_type"), Some(&json!("FULL")));
    assert!(wizard.next().moved);
}

#[tokio::test]
async fn superseded_lookup_is_not_applied() {
    let registry = AccountRegistry::from_json(REGISTRY).expect("registry");
    let mut wizard = start(lien::FORM_ID).expect("lien form");

    let first = wizard.begin_lookup("0123456789");
    let second = wizard.begin_lookup("0987654321");
    let (first, stale) = run_lookup(&registry, first).await;
    let (second, fresh) = run_lookup(&registry, second).await;

    let err = wizard
        .apply_lookup(&first, stale.expect("record"))
        .expect_err("stale");
    assert!(matches!(err, WizardError::Lookup(LookupError::Stale { .. })));
    wizard
        .apply_lookup(&second, fresh.expect("record"))
        .expect("fresh");
    assert_eq!(
        wizard.application().field("account_name"),
        Some(&json!("TUNDE BELLO"))
    );
}

#[tokio::test]
async fn unknown_account_reports_not_found() {
    let registry = AccountRegistry::from_json(REGISTRY).expect("registry");
    let mut wizard = start(lien::FORM_ID).expect("lien form");
    let ticket = wizard.begin_lookup("1111111111");
    let (_, response) = run_lookup(&registry, ticket).await;
    assert_eq!(response, Err(LookupError::NotFound("1111111111".into())));
}
