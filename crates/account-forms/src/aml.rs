//! Anti-money-laundering step shared by the account-opening forms.

use wizard_spec::{CollectionSpec, Expr, FieldKind, FieldSpec, StepSpec};

use crate::tables::wealth_codes;

pub const FIELDS: [&str; 5] = [
    "monthly_deposit_count",
    "monthly_deposit_amount",
    "politically_exposed",
    "pep_details",
    "declaration",
];

pub fn step(index: usize) -> StepSpec {
    StepSpec::new(index, "aml", "Anti-Money-Laundering")
        .icon("shield")
        .fields(&FIELDS)
        .collections(&["wealth_sources"])
}

pub fn fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new(
            "monthly_deposit_count",
            "Expected deposits per month",
            FieldKind::Integer,
        )
        .required()
        .range(Some(0.0), None),
        FieldSpec::new(
            "monthly_deposit_amount",
            "Expected monthly deposit amount",
            FieldKind::Number,
        )
        .required()
        .range(Some(0.0), None),
        FieldSpec::new(
            "politically_exposed",
            "Politically exposed person",
            FieldKind::Boolean,
        ),
        FieldSpec::text("pep_details", "Position held")
            .visible_if(Expr::eq("/politically_exposed", true))
            .required(),
        FieldSpec::new(
            "declaration",
            "I confirm the information provided is accurate",
            FieldKind::Boolean,
        )
        .required(),
    ]
}

pub fn wealth_sources() -> CollectionSpec {
    CollectionSpec::new(
        "wealth_sources",
        "Sources of wealth",
        vec![
            FieldSpec::choice("code", "Source code", &wealth_codes()).required(),
            FieldSpec::text("description", "Description"),
            FieldSpec::new("value", "Estimated value", FieldKind::Number)
                .required()
                .range(Some(0.0), None),
        ],
    )
    .min_items(1)
    .key_field("code")
}
