use std::sync::Arc;

use serde_json::{Value, json};

use wizard_spec::{
    CollectionSpec, DefinitionError, DerivationRule, ErrorKind, Expr, FieldKind, FieldSpec, Form,
    FormSpec, StepSpec, ValidationReport, VisibilityMode, Wizard, resolve_visibility,
    validate_all, validate_field, validate_step,
};

fn personal_form() -> FormSpec {
    FormSpec::new("personal", "Personal", "1.0.0")
        .step(StepSpec::new(1, "personal", "Personal Details").fields(&[
            "surname",
            "bvn",
            "date_of_birth",
            "title",
            "dependants",
            "income",
            "consent",
            "employment_status",
            "employer",
            "spouse_name",
        ]))
        .fields([
            FieldSpec::text("surname", "Surname")
                .required()
                .length(Some(2), Some(12)),
            FieldSpec::text("bvn", "BVN").pattern(r"^\d{11}$"),
            FieldSpec::new("date_of_birth", "Date of birth", FieldKind::Date).required(),
            FieldSpec::choice("title", "Title", &["MR", "MRS", "MISS"]),
            FieldSpec::new("dependants", "Dependants", FieldKind::Integer).range(Some(0.0), Some(20.0)),
            FieldSpec::new("income", "Annual income", FieldKind::Number),
            FieldSpec::new("consent", "Consent", FieldKind::Boolean).required(),
            FieldSpec::choice(
                "employment_status",
                "Employment status",
                &["EMPLOYED", "SELF-EMPLOYED", "UNEMPLOYED"],
            ),
            FieldSpec::text("employer", "Employer")
                .required_if(Expr::eq("/employment_status", "EMPLOYED")),
            FieldSpec::text("spouse_name", "Spouse name")
                .required()
                .visible_if(Expr::eq("/title", "MRS")),
        ])
}

fn wizard_for(spec: FormSpec) -> Wizard {
    Wizard::new(Arc::new(Form::compile(spec).expect("compile")))
}

fn kinds(errors: &[wizard_spec::ValidationError], path: &str) -> Vec<ErrorKind> {
    errors
        .iter()
        .filter(|error| error.path == path)
        .map(|error| error.kind)
        .collect()
}

fn set(wizard: &mut Wizard, name: &str, value: Value) -> Vec<ErrorKind> {
    let update = wizard.set_field(name, value).expect("set field");
    kinds(&update.errors, &format!("/{}", name))
}

#[test]
fn blank_required_fields_report_required() {
    let wizard = wizard_for(personal_form());
    let errors = validate_step(wizard.form(), wizard.application(), 1);
    assert_eq!(kinds(&errors, "/surname"), vec![ErrorKind::Required]);
    assert_eq!(kinds(&errors, "/date_of_birth"), vec![ErrorKind::Required]);
    assert_eq!(kinds(&errors, "/consent"), vec![ErrorKind::Required]);
    assert!(kinds(&errors, "/bvn").is_empty());
    assert!(kinds(&errors, "/employer").is_empty());
}

#[test]
fn length_pattern_and_range_constraints() {
    let mut wizard = wizard_for(personal_form());
    assert_eq!(set(&mut wizard, "surname", json!("O")), vec![ErrorKind::TooShort]);
    assert_eq!(
        set(&mut wizard, "surname", json!("Oluwaseyitanfunmi")),
        vec![ErrorKind::TooLong]
    );
    assert!(set(&mut wizard, "surname", json!("Adeyemi")).is_empty());

    assert_eq!(
        set(&mut wizard, "bvn", json!("2234")),
        vec![ErrorKind::PatternMismatch]
    );
    assert!(set(&mut wizard, "bvn", json!("22345678901")).is_empty());

    assert_eq!(
        set(&mut wizard, "dependants", json!(21)),
        vec![ErrorKind::OutOfRange]
    );
    assert!(set(&mut wizard, "dependants", json!("3")).is_empty());
}

#[test]
fn type_choice_and_date_checks() {
    let mut wizard = wizard_for(personal_form());
    assert_eq!(
        set(&mut wizard, "income", json!("lots")),
        vec![ErrorKind::TypeMismatch]
    );
    assert!(set(&mut wizard, "income", json!("125000.50")).is_empty());
    assert_eq!(
        set(&mut wizard, "dependants", json!(2.5)),
        vec![ErrorKind::TypeMismatch]
    );

    assert_eq!(
        set(&mut wizard, "title", json!("SIR")),
        vec![ErrorKind::InvalidChoice]
    );
    assert!(set(&mut wizard, "title", json!("mr")).is_empty());

    assert_eq!(
        set(&mut wizard, "date_of_birth", json!("1990-02-30")),
        vec![ErrorKind::PatternMismatch]
    );
    assert!(set(&mut wizard, "date_of_birth", json!("1990-02-28")).is_empty());
}

#[test]
fn required_boolean_must_be_checked() {
    let mut wizard = wizard_for(personal_form());
    assert_eq!(
        set(&mut wizard, "consent", json!(false)),
        vec![ErrorKind::Required]
    );
    assert!(set(&mut wizard, "consent", json!(true)).is_empty());
    assert_eq!(
        set(&mut wizard, "consent", json!("yes")),
        vec![ErrorKind::TypeMismatch]
    );
}

#[test]
fn conditional_requirement_follows_its_predicate() {
    let mut wizard = wizard_for(personal_form());
    let update = wizard
        .set_field("employment_status", json!("EMPLOYED"))
        .expect("set");
    assert_eq!(kinds(&update.errors, "/employer"), vec![ErrorKind::Required]);

    wizard
        .set_field("employment_status", json!("UNEMPLOYED"))
        .expect("set");
    assert!(validate_field(wizard.form(), wizard.application(), "employer").is_empty());
}

#[test]
fn hidden_fields_are_never_validated() {
    let mut wizard = wizard_for(personal_form());
    let visibility = resolve_visibility(wizard.form(), wizard.application(), VisibilityMode::Visible);
    assert!(!visibility.field("spouse_name"));
    assert!(validate_field(wizard.form(), wizard.application(), "spouse_name").is_empty());

    let update = wizard.set_field("title", json!("MRS")).expect("set");
    assert_eq!(kinds(&update.errors, "/spouse_name"), vec![ErrorKind::Required]);
}

fn owner_form(mode: VisibilityMode) -> FormSpec {
    FormSpec::new("owners", "Owners", "1.0.0")
        .step(
            StepSpec::new(1, "owners", "Owners")
                .fields(&["owner_alias"])
                .collections(&["owners"]),
        )
        .fields([FieldSpec::text("owner_alias", "Alias of the first owner")
            .required()
            .visible_if(Expr::eq("/owners/0/name", "ADA"))])
        .collection(CollectionSpec::new(
            "owners",
            "Owners",
            vec![FieldSpec::text("name", "Name")],
        ))
        .unresolved_visibility(mode)
}

#[test]
fn unresolved_predicates_follow_the_form_visibility_mode() {
    let visible = wizard_for(owner_form(VisibilityMode::Visible));
    assert_eq!(
        kinds(
            &validate_step(visible.form(), visible.application(), 1),
            "/owner_alias"
        ),
        vec![ErrorKind::Required]
    );

    let mut hidden = wizard_for(owner_form(VisibilityMode::Hidden));
    assert!(validate_step(hidden.form(), hidden.application(), 1).is_empty());
    let view = resolve_visibility(hidden.form(), hidden.application(), VisibilityMode::Hidden);
    assert!(!view.field("owner_alias"));

    hidden
        .add_item(
            "owners",
            [("name".to_string(), json!("ADA"))].into_iter().collect(),
        )
        .expect("add owner");
    assert_eq!(
        kinds(
            &validate_step(hidden.form(), hidden.application(), 1),
            "/owner_alias"
        ),
        vec![ErrorKind::Required]
    );
}

#[test]
fn unresolved_visibility_is_read_from_definitions() {
    let spec: FormSpec = serde_json::from_value(json!({
        "id": "owners",
        "title": "Owners",
        "version": "1.0.0",
        "steps": [{ "index": 1, "id": "owners", "title": "Owners", "fields": [] }],
        "fields": [],
        "unresolved_visibility": "hidden"
    }))
    .expect("deserialize");
    assert_eq!(spec.unresolved_visibility, VisibilityMode::Hidden);
    let defaulted: FormSpec = serde_json::from_value(json!({
        "id": "owners",
        "title": "Owners",
        "version": "1.0.0",
        "steps": [],
        "fields": []
    }))
    .expect("deserialize");
    assert_eq!(defaulted.unresolved_visibility, VisibilityMode::Visible);
}

#[test]
fn report_lists_missing_required_paths() {
    let wizard = wizard_for(personal_form());
    let report = ValidationReport::from_errors(validate_all(wizard.form(), wizard.application()));
    assert!(!report.valid);
    assert_eq!(
        report.missing_required,
        vec!["/surname", "/date_of_birth", "/consent"]
    );
}

#[test]
fn item_fields_validate_with_item_paths() {
    let spec = FormSpec::new("directors", "Directors", "1.0.0")
        .step(StepSpec::new(1, "directors", "Directors").collections(&["directors"]))
        .collection(
            CollectionSpec::new(
                "directors",
                "Directors",
                vec![
                    FieldSpec::text("name", "Name").required(),
                    FieldSpec::choice("id_type", "ID type", &["PASSPORT", "NIN"]),
                    FieldSpec::text("passport_no", "Passport number")
                        .required_if(Expr::eq("/item/id_type", "PASSPORT")),
                ],
            )
            .min_items(1)
            .max_items(2),
        );
    let mut wizard = wizard_for(spec);
    wizard
        .update_item("directors", 0, "name", json!("Ngozi"))
        .expect("update");
    let update = wizard
        .update_item("directors", 0, "id_type", json!("PASSPORT"))
        .expect("update");
    assert_eq!(
        kinds(&update.errors, "/directors/0/passport_no"),
        vec![ErrorKind::Required]
    );

    wizard
        .add_item("directors", Default::default())
        .expect("second");
    let err = wizard
        .add_item("directors", Default::default())
        .expect_err("maximum");
    assert!(err.to_string().contains("cannot exceed 2"));
}

fn compile_err(spec: FormSpec) -> DefinitionError {
    Form::compile(spec).expect_err("definition rejected")
}

#[test]
fn definitions_with_broken_shape_are_rejected() {
    let no_steps = FormSpec::new("empty", "Empty", "1.0.0");
    assert!(matches!(compile_err(no_steps), DefinitionError::NoSteps(_)));

    let gap = FormSpec::new("gap", "Gap", "1.0.0")
        .step(StepSpec::new(1, "one", "One").fields(&["a"]))
        .step(StepSpec::new(3, "three", "Three"))
        .fields([FieldSpec::text("a", "A")]);
    assert!(matches!(
        compile_err(gap),
        DefinitionError::StepIndex {
            position: 2,
            found: 3
        }
    ));

    let twice = FormSpec::new("twice", "Twice", "1.0.0")
        .step(StepSpec::new(1, "one", "One").fields(&["a"]))
        .step(StepSpec::new(2, "two", "Two").fields(&["a"]))
        .fields([FieldSpec::text("a", "A")]);
    assert!(matches!(
        compile_err(twice),
        DefinitionError::MultipleOwners { .. }
    ));

    let orphan = FormSpec::new("orphan", "Orphan", "1.0.0")
        .step(StepSpec::new(1, "one", "One").fields(&["a"]))
        .fields([FieldSpec::text("a", "A"), FieldSpec::text("b", "B")]);
    assert!(matches!(compile_err(orphan), DefinitionError::Unowned(_)));
}

#[test]
fn definitions_with_bad_references_are_rejected() {
    let pattern = FormSpec::new("pattern", "Pattern", "1.0.0")
        .step(StepSpec::new(1, "one", "One").fields(&["a"]))
        .fields([FieldSpec::text("a", "A").pattern("([unclosed")]);
    assert!(matches!(
        compile_err(pattern),
        DefinitionError::Pattern { .. }
    ));

    let reference = FormSpec::new("reference", "Reference", "1.0.0")
        .step(StepSpec::new(1, "one", "One").fields(&["a"]))
        .fields([FieldSpec::text("a", "A").visible_if(Expr::is_set("/ghost"))]);
    assert!(matches!(
        compile_err(reference),
        DefinitionError::UnknownReference { .. }
    ));

    let cycle = FormSpec::new("cycle", "Cycle", "1.0.0")
        .step(StepSpec::new(1, "one", "One").fields(&["a", "b"]))
        .fields([FieldSpec::text("a", "A"), FieldSpec::text("b", "B")])
        .derivation(DerivationRule::lookup("a_to_b", "a", "b", [("x", "y")]))
        .derivation(DerivationRule::lookup("b_to_a", "b", "a", [("y", "x")]));
    assert!(matches!(
        compile_err(cycle),
        DefinitionError::DerivationCycle(_)
    ));
}
