use wizard_spec::{
    CollectionSpec, Expr, FieldGroup, FieldKind, FieldSpec, FormSpec, StepSpec, SubmitRule,
};

use crate::aml;
use crate::tables::{self, category_names};

pub const FORM_ID: &str = "corporate-account";

const EMAIL: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";
const PHONE: &str = r"^\+?[0-9]{7,15}$";

/// Seven-step corporate account-opening form.
pub fn form() -> FormSpec {
    FormSpec::new(FORM_ID, "Corporate Account Opening", "1.0.0")
        .description("Account opening for companies, partnerships, trusts and societies.")
        .step(
            StepSpec::new(1, "company", "Company Details")
                .icon("building")
                .fields(&[
                    "company_name",
                    "registration_number",
                    "incorporation_date",
                    "category",
                    "category_description",
                    "required_relationships",
                    "business_nature",
                    "tax_id",
                    "email",
                    "phone",
                    "address",
                ]),
        )
        .step(
            StepSpec::new(2, "contacts", "Contact Personnel")
                .icon("phone")
                .collections(&["contacts"]),
        )
        .step(
            StepSpec::new(3, "associates", "Associated Companies")
                .icon("network")
                .collections(&["associated_companies"]),
        )
        .step(
            StepSpec::new(4, "stakeholders", "Stakeholders")
                .icon("users")
                .collections(&["stakeholders"]),
        )
        .step(
            StepSpec::new(5, "signatories", "Signatories")
                .icon("pen")
                .fields(&["signing_rule"])
                .collections(&["signatories"]),
        )
        .step(
            StepSpec::new(6, "account", "Account & Product")
                .icon("wallet")
                .fields(&["member_classification", "member_number", "account_officer"])
                .group(
                    FieldGroup::new(
                        "non_member_products",
                        Expr::eq("/member_classification", "NON-MEMBER"),
                    )
                    .fields(&["product_group", "product_sub_group", "currency"]),
                ),
        )
        .step(aml::step(7))
        .fields(company_fields())
        .fields([FieldSpec::choice(
            "signing_rule",
            "Signing mandate",
            &["ANY ONE", "ANY TWO", "ALL TO SIGN"],
        )
        .required()])
        .fields(account_fields())
        .fields(aml::fields())
        .collection(contacts())
        .collection(associated_companies())
        .collection(stakeholders())
        .collection(signatories())
        .collection(aml::wealth_sources())
        .derivation(tables::category_relationships_rule())
        .derivation(tables::category_description_rule())
        .derivation(tables::wealth_description_rule())
        .submit_rule(SubmitRule::new(
            "reachable",
            "/email",
            "provide a company email or phone number",
            Expr::any(vec![Expr::is_set("/email"), Expr::is_set("/phone")]),
        ))
        .prefill(
            &[
                "company_*",
                "registration_number",
                "incorporation_date",
                "email",
                "phone",
                "address",
                "contacts",
                "stakeholders",
            ],
            &[],
        )
}

fn company_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::text("company_name", "Company name")
            .required()
            .length(Some(3), Some(100)),
        FieldSpec::text("registration_number", "RC / BN number")
            .required()
            .pattern(r"^(?i)(RC|BN|IT)?[0-9]{4,8}$"),
        FieldSpec::new("incorporation_date", "Date of incorporation", FieldKind::Date).required(),
        FieldSpec::choice("category", "Entity category", &category_names())
            .required()
            .default_value("SOLE PROPRIETORSHIP"),
        FieldSpec::text("category_description", "Category description"),
        FieldSpec::new(
            "required_relationships",
            "Required stakeholders",
            FieldKind::Integer,
        ),
        FieldSpec::text("business_nature", "Nature of business").required(),
        FieldSpec::text("tax_id", "Tax identification number").pattern(r"^[0-9]{8}-[0-9]{4}$"),
        FieldSpec::text("email", "Company email").pattern(EMAIL),
        FieldSpec::text("phone", "Company phone").pattern(PHONE),
        FieldSpec::text("address", "Registered address")
            .required()
            .length(None, Some(200)),
    ]
}

fn account_fields() -> Vec<FieldSpec> {
    let member = Expr::eq("/member_classification", "MEMBER");
    vec![
        FieldSpec::choice(
            "member_classification",
            "Member classification",
            &["MEMBER", "NON-MEMBER"],
        )
        .required()
        .default_value("MEMBER"),
        FieldSpec::text("member_number", "Membership number")
            .visible_if(member.clone())
            .required_if(member),
        FieldSpec::text("account_officer", "Account officer"),
        FieldSpec::choice(
            "product_group",
            "Product group",
            &["SAVINGS", "CURRENT", "FIXED DEPOSIT"],
        )
        .required(),
        FieldSpec::text("product_sub_group", "Product sub-group").required(),
        FieldSpec::choice("currency", "Currency", &["NGN", "USD", "GBP", "EUR"]).required(),
    ]
}

fn contacts() -> CollectionSpec {
    CollectionSpec::new(
        "contacts",
        "Contact personnel",
        vec![
            FieldSpec::text("name", "Full name").required(),
            FieldSpec::text("designation", "Designation"),
            FieldSpec::text("phone", "Phone").required().pattern(PHONE),
            FieldSpec::text("email", "Email").pattern(EMAIL),
        ],
    )
    .min_items(1)
    .max_items(5)
}

fn associated_companies() -> CollectionSpec {
    CollectionSpec::new(
        "associated_companies",
        "Associated companies",
        vec![
            FieldSpec::text("company_name", "Company name").required(),
            FieldSpec::choice(
                "relationship",
                "Relationship",
                &["SUBSIDIARY", "PARENT", "AFFILIATE", "SISTER COMPANY"],
            )
            .required(),
            FieldSpec::text("registration_number", "RC number"),
        ],
    )
}

fn stakeholders() -> CollectionSpec {
    CollectionSpec::new(
        "stakeholders",
        "Stakeholders",
        vec![
            FieldSpec::text("full_name", "Full name").required(),
            FieldSpec::choice(
                "role",
                "Role",
                &["DIRECTOR", "SHAREHOLDER", "PARTNER", "TRUSTEE", "PROPRIETOR"],
            )
            .required(),
            FieldSpec::new("ownership", "Ownership (%)", FieldKind::Number)
                .range(Some(0.0), Some(100.0)),
            FieldSpec::text("bvn", "BVN").pattern(r"^[0-9]{11}$"),
            FieldSpec::text("nationality", "Nationality").default_value("NIGERIAN"),
        ],
    )
    .min_items(1)
    .min_items_field("required_relationships")
    .display_prefix("STH")
}

fn signatories() -> CollectionSpec {
    CollectionSpec::new(
        "signatories",
        "Signatories",
        vec![
            FieldSpec::text("full_name", "Full name").required(),
            FieldSpec::text("designation", "Designation"),
            FieldSpec::choice("class", "Signature class", &["A", "B", "C"]).required(),
            FieldSpec::text("status", "Status").default_value("New"),
        ],
    )
    .min_items(1)
    .max_items(6)
    .display_prefix("SIG")
}
