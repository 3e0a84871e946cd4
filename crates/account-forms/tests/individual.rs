use serde_json::json;

use account_forms::{individual, start};
use wizard_spec::{ErrorKind, Wizard, resolve_visibility, VisibilityMode};

fn session() -> Wizard {
    start(individual::FORM_ID).expect("individual form")
}

fn fill(wizard: &mut Wizard, answers: serde_json::Value) {
    let unknown = wizard.load_answers(&answers).expect("load");
    assert!(unknown.is_empty(), "unexpected keys {unknown:?}");
}

fn personal_to_employment() -> serde_json::Value {
    json!({
        "product": "SAVINGS",
        "title": "MRS",
        "surname": "Okafor",
        "first_name": "Chioma",
        "date_of_birth": "1988-04-12",
        "gender": "FEMALE",
        "mothers_maiden_name": "Eze",
        "phone": "08051234567",
        "residential_address": "4 Allen Avenue",
        "city": "Ikeja",
        "state": "Lagos",
        "id_type": "NATIONAL ID",
        "id_number": "NIN12345678",
        "id_issue_date": "2019-01-10",
        "bvn": "22123456789",
        "employment_status": "STUDENT"
    })
}

#[test]
fn individual_accounts_skip_the_joint_holder_step() {
    let mut wizard = session();
    assert_eq!(wizard.step_count(), 8);
    fill(&mut wizard, personal_to_employment());

    let visited: Vec<usize> = std::iter::from_fn(|| {
        let nav = wizard.next();
        nav.moved.then_some(nav.step)
    })
    .collect();

    assert_eq!(visited, vec![2, 3, 4, 5, 7, 8]);
    let visibility = resolve_visibility(wizard.form(), wizard.application(), VisibilityMode::Visible);
    assert!(!visibility.step(6));

    let back: Vec<usize> = std::iter::from_fn(|| {
        let nav = wizard.back();
        nav.moved.then_some(nav.step)
    })
    .collect();
    assert_eq!(back, vec![7, 5, 4, 3, 2, 1]);
}

#[test]
fn joint_accounts_require_a_holder_and_a_mandate() {
    let mut wizard = session();
    fill(&mut wizard, personal_to_employment());
    wizard.set_field("account_type", json!("JOINT")).expect("joint");
    let nav = wizard.jump_to(6).expect("jump");
    assert!(nav.moved);

    let blocked = wizard.next();
    assert!(!blocked.moved);
    assert!(
        blocked
            .errors
            .iter()
            .all(|error| error.path.starts_with("/joint_holders/0/"))
    );

    for (field, value) in [
        ("full_name", json!("Emeka Okafor")),
        ("relationship", json!("SPOUSE")),
        ("date_of_birth", json!("1985-09-30")),
    ] {
        wizard
            .update_item("joint_holders", 0, field, value)
            .expect("holder");
    }
    assert!(wizard.next().moved);
    assert!(wizard.next().moved);
    assert_eq!(wizard.current_step(), 8);

    fill(
        &mut wizard,
        json!({
            "monthly_deposit_count": 3,
            "monthly_deposit_amount": 90000,
            "declaration": true,
            "wealth_sources": [{ "code": "002", "value": 300000 }]
        }),
    );
    let errors = wizard.gate().blocking_errors(wizard.application());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::RuleViolation);
    assert_eq!(errors[0].path, "/joint_mandate");

    wizard
        .set_field("joint_mandate", json!("EITHER TO SIGN"))
        .expect("mandate");
    assert!(wizard.can_submit());
}

#[test]
fn employer_details_apply_only_to_the_employed() {
    let mut wizard = session();
    fill(&mut wizard, personal_to_employment());
    let update = wizard
        .set_field("employment_status", json!("SELF-EMPLOYED"))
        .expect("status");
    let required: Vec<&str> = update
        .errors
        .iter()
        .filter(|error| error.kind == ErrorKind::Required)
        .map(|error| error.path.as_str())
        .collect();
    assert_eq!(required, vec!["/employer_name", "/occupation"]);
}

#[test]
fn passport_holders_need_an_expiry_date() {
    let mut wizard = session();
    let update = wizard
        .set_field("id_type", json!("INTERNATIONAL PASSPORT"))
        .expect("id type");
    assert!(
        update
            .errors
            .iter()
            .any(|error| error.path == "/id_expiry_date" && error.kind == ErrorKind::Required)
    );
}
