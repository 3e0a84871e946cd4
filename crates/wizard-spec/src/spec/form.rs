use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::expr::Expr;
use crate::spec::collection::CollectionSpec;
use crate::spec::derivation::{DerivationPolicy, DerivationRule};
use crate::spec::field::FieldSpec;
use crate::spec::step::StepSpec;
use crate::visibility::VisibilityMode;

/// Cross-step invariant checked only by the submission gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubmitRule {
    pub id: String,
    pub message: String,
    /// Path the resulting error is attached to.
    pub path: String,
    pub expr: Expr,
}

/// Which field names an external lookup result may prefill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct PrefillPolicy {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deny: Vec<String>,
}

/// Top-level wizard definition for one form type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FormSpec {
    pub id: String,
    pub title: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub steps: Vec<StepSpec>,
    pub fields: Vec<FieldSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collections: Vec<CollectionSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub derivations: Vec<DerivationRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub submit_rules: Vec<SubmitRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefill_policy: Option<PrefillPolicy>,
    #[serde(default)]
    pub derivation_policy: DerivationPolicy,
    /// Whether a predicate reading a missing path (an item that does not
    /// exist yet) counts as satisfied.
    #[serde(default)]
    pub unresolved_visibility: VisibilityMode,
}

impl SubmitRule {
    pub fn new(id: &str, path: &str, message: &str, expr: Expr) -> Self {
        Self {
            id: id.to_string(),
            message: message.to_string(),
            path: path.to_string(),
            expr,
        }
    }
}

impl FormSpec {
    pub fn new(id: impl Into<String>, title: impl Into<String>, version: &str) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            version: version.to_string(),
            description: None,
            steps: Vec::new(),
            fields: Vec::new(),
            collections: Vec::new(),
            derivations: Vec::new(),
            submit_rules: Vec::new(),
            prefill_policy: None,
            derivation_policy: DerivationPolicy::default(),
            unresolved_visibility: VisibilityMode::default(),
        }
    }

    pub fn description(mut self, text: &str) -> Self {
        self.description = Some(text.to_string());
        self
    }

    pub fn step(mut self, step: StepSpec) -> Self {
        self.steps.push(step);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = FieldSpec>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn collection(mut self, collection: CollectionSpec) -> Self {
        self.collections.push(collection);
        self
    }

    pub fn derivation(mut self, rule: DerivationRule) -> Self {
        self.derivations.push(rule);
        self
    }

    pub fn submit_rule(mut self, rule: SubmitRule) -> Self {
        self.submit_rules.push(rule);
        self
    }

    pub fn prefill(mut self, allow: &[&str], deny: &[&str]) -> Self {
        self.prefill_policy = Some(PrefillPolicy {
            allow: allow.iter().map(|pattern| pattern.to_string()).collect(),
            deny: deny.iter().map(|pattern| pattern.to_string()).collect(),
        });
        self
    }

    pub fn derivation_policy(mut self, policy: DerivationPolicy) -> Self {
        self.derivation_policy = policy;
        self
    }

    pub fn unresolved_visibility(mut self, mode: VisibilityMode) -> Self {
        self.unresolved_visibility = mode;
        self
    }
}
