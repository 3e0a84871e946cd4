use wizard_spec::{
    CollectionSpec, Expr, FieldGroup, FieldKind, FieldSpec, FormSpec, StepSpec, SubmitRule,
};

use crate::aml;
use crate::tables;

pub const FORM_ID: &str = "individual-account";

const PHONE: &str = r"^\+?[0-9]{7,15}$";
const BVN: &str = r"^[0-9]{11}$";

/// Eight-step individual / joint account-opening form. The joint-holder step
/// only applies to joint accounts.
pub fn form() -> FormSpec {
    let joint = Expr::eq("/account_type", "JOINT");
    FormSpec::new(FORM_ID, "Individual & Joint Account Opening", "1.0.0")
        .step(
            StepSpec::new(1, "account_type", "Account Type")
                .icon("wallet")
                .fields(&["account_type", "product", "currency", "joint_mandate"]),
        )
        .step(
            StepSpec::new(2, "personal", "Personal Details")
                .icon("user")
                .fields(&[
                    "title",
                    "surname",
                    "first_name",
                    "middle_name",
                    "date_of_birth",
                    "gender",
                    "marital_status",
                    "mothers_maiden_name",
                    "nationality",
                ]),
        )
        .step(
            StepSpec::new(3, "contact", "Contact & Address")
                .icon("home")
                .fields(&["email", "phone", "residential_address", "city", "state", "country"]),
        )
        .step(
            StepSpec::new(4, "identification", "Identification")
                .icon("id-card")
                .fields(&["id_type", "id_number", "id_issue_date", "id_expiry_date", "bvn"]),
        )
        .step(
            StepSpec::new(5, "employment", "Employment")
                .icon("briefcase")
                .fields(&["employment_status", "annual_income"])
                .group(
                    FieldGroup::new(
                        "employer_details",
                        Expr::one_of("/employment_status", ["EMPLOYED", "SELF-EMPLOYED"]),
                    )
                    .fields(&["employer_name", "occupation", "employer_address"]),
                ),
        )
        .step(
            StepSpec::new(6, "joint_holders", "Joint Account Holders")
                .icon("users")
                .collections(&["joint_holders"])
                .active_if(joint.clone()),
        )
        .step(
            StepSpec::new(7, "nominees", "Nominees")
                .icon("heart")
                .collections(&["nominees"]),
        )
        .step(aml::step(8))
        .fields(account_fields(joint))
        .fields(personal_fields())
        .fields(contact_fields())
        .fields(identification_fields())
        .fields(employment_fields())
        .fields(aml::fields())
        .collection(joint_holders())
        .collection(nominees())
        .collection(aml::wealth_sources())
        .derivation(tables::wealth_description_rule())
        .submit_rule(SubmitRule::new(
            "joint_mandate",
            "/joint_mandate",
            "joint accounts need an operating mandate",
            Expr::any(vec![
                Expr::eq("/account_type", "INDIVIDUAL"),
                Expr::is_set("/joint_mandate"),
            ]),
        ))
        .prefill(&["*"], &["bvn", "declaration"])
}

fn account_fields(joint: Expr) -> Vec<FieldSpec> {
    vec![
        FieldSpec::choice("account_type", "Account type", &["INDIVIDUAL", "JOINT"])
            .required()
            .default_value("INDIVIDUAL"),
        FieldSpec::choice(
            "product",
            "Product",
            &["SAVINGS", "CURRENT", "TARGET SAVINGS"],
        )
        .required(),
        FieldSpec::choice("currency", "Currency", &["NGN", "USD", "GBP", "EUR"])
            .required()
            .default_value("NGN"),
        FieldSpec::choice(
            "joint_mandate",
            "Operating mandate",
            &["EITHER TO SIGN", "BOTH TO SIGN"],
        )
        .visible_if(joint),
    ]
}

fn personal_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::choice("title", "Title", &["MR", "MRS", "MISS", "MS", "DR"]).required(),
        FieldSpec::text("surname", "Surname")
            .required()
            .length(Some(2), Some(50)),
        FieldSpec::text("first_name", "First name")
            .required()
            .length(Some(2), Some(50)),
        FieldSpec::text("middle_name", "Middle name").length(None, Some(50)),
        FieldSpec::new("date_of_birth", "Date of birth", FieldKind::Date).required(),
        FieldSpec::choice("gender", "Gender", &["MALE", "FEMALE"]).required(),
        FieldSpec::choice(
            "marital_status",
            "Marital status",
            &["SINGLE", "MARRIED", "DIVORCED", "WIDOWED"],
        ),
        FieldSpec::text("mothers_maiden_name", "Mother's maiden name").required(),
        FieldSpec::text("nationality", "Nationality")
            .required()
            .default_value("NIGERIAN"),
    ]
}

fn contact_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::text("email", "Email").pattern(r"^[^@\s]+@[^@\s]+\.[^@\s]+$"),
        FieldSpec::text("phone", "Mobile number")
            .required()
            .pattern(PHONE),
        FieldSpec::text("residential_address", "Residential address")
            .required()
            .length(None, Some(200)),
        FieldSpec::text("city", "City").required(),
        FieldSpec::text("state", "State").required(),
        FieldSpec::text("country", "Country")
            .required()
            .default_value("NIGERIA"),
    ]
}

fn identification_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::choice(
            "id_type",
            "Means of identification",
            &[
                "NATIONAL ID",
                "INTERNATIONAL PASSPORT",
                "DRIVERS LICENCE",
                "VOTERS CARD",
            ],
        )
        .required(),
        FieldSpec::text("id_number", "ID number").required(),
        FieldSpec::new("id_issue_date", "Issue date", FieldKind::Date).required(),
        FieldSpec::new("id_expiry_date", "Expiry date", FieldKind::Date).required_if(
            Expr::one_of("/id_type", ["INTERNATIONAL PASSPORT", "DRIVERS LICENCE"]),
        ),
        FieldSpec::text("bvn", "BVN").required().pattern(BVN),
    ]
}

fn employment_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::choice(
            "employment_status",
            "Employment status",
            &["EMPLOYED", "SELF-EMPLOYED", "UNEMPLOYED", "STUDENT", "RETIRED"],
        )
        .required(),
        FieldSpec::new("annual_income", "Annual income", FieldKind::Number)
            .range(Some(0.0), None),
        FieldSpec::text("employer_name", "Employer / business name").required(),
        FieldSpec::text("occupation", "Occupation").required(),
        FieldSpec::text("employer_address", "Employer address"),
    ]
}

fn joint_holders() -> CollectionSpec {
    CollectionSpec::new(
        "joint_holders",
        "Joint account holders",
        vec![
            FieldSpec::text("full_name", "Full name").required(),
            FieldSpec::text("relationship", "Relationship to applicant").required(),
            FieldSpec::new("date_of_birth", "Date of birth", FieldKind::Date).required(),
            FieldSpec::text("bvn", "BVN").pattern(BVN),
            FieldSpec::text("phone", "Phone").pattern(PHONE),
        ],
    )
    .min_items(1)
    .max_items(3)
    .display_prefix("JH")
}

fn nominees() -> CollectionSpec {
    CollectionSpec::new(
        "nominees",
        "Nominees",
        vec![
            FieldSpec::text("full_name", "Full name").required(),
            FieldSpec::text("relationship", "Relationship").required(),
            FieldSpec::text("phone", "Phone").pattern(PHONE),
            FieldSpec::new("share", "Share (%)", FieldKind::Number).range(Some(0.0), Some(100.0)),
        ],
    )
    .max_items(2)
}
