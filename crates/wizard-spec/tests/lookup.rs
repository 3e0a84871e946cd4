use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use wizard_spec::{
    Form, FormSpec, Item, LookupError, LookupService, Prefill, Wizard, WizardError, run_lookup,
};

fn wizard() -> Wizard {
    let spec: FormSpec =
        serde_json::from_str(include_str!("fixtures/mini_form.json")).expect("deserialize");
    Wizard::new(Arc::new(Form::compile(spec).expect("compile")))
}

/// Answers after a per-key delay so responses can arrive out of order.
struct SlowRegistry {
    records: BTreeMap<String, (u64, Prefill)>,
}

impl SlowRegistry {
    fn new() -> Self {
        let mut records = BTreeMap::new();
        records.insert(
            "RC1001".to_string(),
            (
                60,
                Prefill {
                    fields: BTreeMap::from([("company_name".to_string(), json!("Old Record Ltd"))]),
                    ..Prefill::default()
                },
            ),
        );
        records.insert(
            "RC2002".to_string(),
            (
                5,
                Prefill {
                    fields: BTreeMap::from([
                        ("company_name".to_string(), json!("New Record Ltd")),
                        ("email".to_string(), json!("desk@newrecord.example")),
                        ("company_secret_code".to_string(), json!("x")),
                        ("monthly_deposit_count".to_string(), json!(9)),
                    ]),
                    collections: BTreeMap::from([(
                        "stakeholders".to_string(),
                        vec![Item::from([("name".to_string(), json!("Tunde"))])],
                    )]),
                },
            ),
        );
        Self { records }
    }
}

#[async_trait]
impl LookupService for SlowRegistry {
    async fn lookup(&self, key: &str) -> Result<Prefill, LookupError> {
        let (delay, prefill) = self
            .records
            .get(key)
            .cloned()
            .ok_or_else(|| LookupError::NotFound(key.to_string()))?;
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(prefill)
    }
}

#[tokio::test]
async fn late_response_for_an_older_request_is_discarded() {
    let registry = SlowRegistry::new();
    let mut wizard = wizard();

    let first = wizard.begin_lookup("RC1001");
    let second = wizard.begin_lookup("RC2002");
    let (old, new) = tokio::join!(run_lookup(&registry, first), run_lookup(&registry, second));

    let (ticket, response) = new;
    let outcome = wizard
        .apply_lookup(&ticket, response.expect("record"))
        .expect("current ticket");
    assert!(outcome.applied.contains(&"company_name".to_string()));

    let (ticket, response) = old;
    let err = wizard
        .apply_lookup(&ticket, response.expect("record"))
        .expect_err("stale");
    assert!(matches!(
        err,
        WizardError::Lookup(LookupError::Stale {
            token: 1,
            latest: 2,
            ..
        })
    ));
    assert_eq!(
        wizard.application().field("company_name"),
        Some(&json!("New Record Ltd"))
    );
}

#[tokio::test]
async fn prefill_policy_filters_names() {
    let registry = SlowRegistry::new();
    let mut wizard = wizard();
    let ticket = wizard.begin_lookup("RC2002");
    let (ticket, response) = run_lookup(&registry, ticket).await;
    let outcome = wizard
        .apply_lookup(&ticket, response.expect("record"))
        .expect("apply");

    assert_eq!(
        outcome.applied,
        vec!["company_name", "email", "stakeholders"]
    );
    assert_eq!(
        outcome.skipped,
        vec!["company_secret_code", "monthly_deposit_count"]
    );
    let app = wizard.application();
    assert_eq!(app.field("monthly_deposit_count"), Some(&json!(null)));
    assert_eq!(app.collection("stakeholders")[0].get("name"), Some(&json!("Tunde")));
}

#[tokio::test]
async fn missing_records_surface_as_lookup_errors() {
    let registry = SlowRegistry::new();
    let mut wizard = wizard();
    let ticket = wizard.begin_lookup("RC9999");
    let (_, response) = run_lookup(&registry, ticket).await;
    assert_eq!(response, Err(LookupError::NotFound("RC9999".into())));
}
