use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How derived values interact with manual edits of their targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum DerivationPolicy {
    /// A source change always replaces the target value.
    #[default]
    Overwrite,
    /// A target written by hand keeps its value until it is unpinned.
    Pin,
}

/// Declarative derivation: maps a source value onto a target value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DerivationRule {
    Lookup {
        id: String,
        /// When set, `source` and `target` are fields of the same item in
        /// this collection.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        collection: Option<String>,
        source: String,
        target: String,
        table: BTreeMap<String, Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fallback: Option<Value>,
        #[serde(default)]
        case_insensitive: bool,
    },
}

impl DerivationRule {
    pub fn lookup<K, V>(
        id: &str,
        source: &str,
        target: &str,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        DerivationRule::Lookup {
            id: id.to_string(),
            collection: None,
            source: source.to_string(),
            target: target.to_string(),
            table: entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
            fallback: None,
            case_insensitive: false,
        }
    }

    pub fn in_collection(mut self, name: &str) -> Self {
        let DerivationRule::Lookup { collection, .. } = &mut self;
        *collection = Some(name.to_string());
        self
    }

    pub fn fallback(mut self, value: impl Into<Value>) -> Self {
        let DerivationRule::Lookup { fallback, .. } = &mut self;
        *fallback = Some(value.into());
        self
    }

    pub fn case_insensitive(mut self) -> Self {
        let DerivationRule::Lookup {
            case_insensitive, ..
        } = &mut self;
        *case_insensitive = true;
        self
    }

    pub fn id(&self) -> &str {
        match self {
            DerivationRule::Lookup { id, .. } => id,
        }
    }

    pub fn collection(&self) -> Option<&str> {
        match self {
            DerivationRule::Lookup { collection, .. } => collection.as_deref(),
        }
    }

    pub fn source(&self) -> &str {
        match self {
            DerivationRule::Lookup { source, .. } => source,
        }
    }

    pub fn target(&self) -> &str {
        match self {
            DerivationRule::Lookup { target, .. } => target,
        }
    }

    /// Pure evaluation of the rule for one source value.
    ///
    /// Returns `None` when the source misses the table and there is no
    /// fallback; the engine then clears the target.
    pub fn evaluate(&self, source_value: &Value) -> Option<Value> {
        match self {
            DerivationRule::Lookup {
                table,
                fallback,
                case_insensitive,
                ..
            } => {
                let key = match source_value {
                    Value::String(text) => text.trim().to_string(),
                    Value::Number(number) => number.to_string(),
                    Value::Bool(flag) => flag.to_string(),
                    _ => String::new(),
                };
                let hit = if *case_insensitive {
                    table
                        .iter()
                        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(&key))
                        .map(|(_, value)| value)
                } else {
                    table.get(&key)
                };
                hit.or(fallback.as_ref()).cloned()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn category_rule() -> DerivationRule {
        DerivationRule::lookup(
            "category_count",
            "category",
            "required_relationships",
            [("PARTNERSHIP", 2), ("LIMITED COMPANY", 3)],
        )
        .fallback(1)
        .case_insensitive()
    }

    #[test]
    fn lookup_hits_table_case_insensitively() {
        let rule = category_rule();
        assert_eq!(rule.evaluate(&json!("Partnership")), Some(json!(2)));
        assert_eq!(rule.evaluate(&json!(" LIMITED COMPANY ")), Some(json!(3)));
    }

    #[test]
    fn lookup_falls_back_for_unknown_keys() {
        assert_eq!(category_rule().evaluate(&json!("GUILD")), Some(json!(1)));
    }

    #[test]
    fn lookup_without_fallback_yields_nothing() {
        let rule = DerivationRule::lookup("wealth", "code", "description", [("001", "SAVINGS")]);
        assert_eq!(rule.evaluate(&json!("999")), None);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let rule = category_rule();
        for input in [json!("PARTNERSHIP"), json!("unknown"), json!(null)] {
            assert_eq!(rule.evaluate(&input), rule.evaluate(&input.clone()));
        }
    }
}
