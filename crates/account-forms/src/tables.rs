//! Reference tables behind the derived fields of the account forms.

use wizard_spec::DerivationRule;

/// Entity categories with their required relationship count and description.
pub const CATEGORIES: [(&str, u64, &str); 6] = [
    ("SOLE PROPRIETORSHIP", 1, "Business owned and run by one person"),
    ("PARTNERSHIP", 2, "Business owned by two or more partners"),
    ("LIMITED COMPANY", 3, "Incorporated company with limited liability"),
    ("NON-PROFIT", 2, "Registered charity, NGO or association"),
    ("TRUST", 2, "Assets held by trustees for beneficiaries"),
    ("COOPERATIVE", 3, "Member-owned cooperative society"),
];

/// Count used when the category is not in [`CATEGORIES`].
pub const DEFAULT_RELATIONSHIPS: u64 = 1;

pub const UNCLASSIFIED: &str = "Unclassified entity";

/// Wealth-source codes and their descriptions.
pub const WEALTH_SOURCES: [(&str, &str); 6] = [
    ("001", "SAVINGS"),
    ("002", "SALARY"),
    ("003", "LAND AND BUILDING"),
    ("004", "BUSINESS INCOME"),
    ("005", "INHERITANCE"),
    ("006", "INVESTMENT"),
];

pub fn category_names() -> Vec<&'static str> {
    CATEGORIES.iter().map(|(name, _, _)| *name).collect()
}

pub fn wealth_codes() -> Vec<&'static str> {
    WEALTH_SOURCES.iter().map(|(code, _)| *code).collect()
}

fn find_category(category: &str) -> Option<&'static (&'static str, u64, &'static str)> {
    let category = category.trim();
    CATEGORIES
        .iter()
        .find(|(name, _, _)| name.eq_ignore_ascii_case(category))
}

pub fn required_relationships(category: &str) -> u64 {
    find_category(category)
        .map(|(_, count, _)| *count)
        .unwrap_or(DEFAULT_RELATIONSHIPS)
}

pub fn category_description(category: &str) -> &'static str {
    find_category(category)
        .map(|(_, _, description)| *description)
        .unwrap_or(UNCLASSIFIED)
}

pub fn wealth_description(code: &str) -> Option<&'static str> {
    let code = code.trim();
    WEALTH_SOURCES
        .iter()
        .find(|(candidate, _)| *candidate == code)
        .map(|(_, description)| *description)
}

pub fn category_relationships_rule() -> DerivationRule {
    DerivationRule::lookup(
        "category_relationships",
        "category",
        "required_relationships",
        CATEGORIES.iter().map(|(name, count, _)| (*name, *count)),
    )
    .fallback(DEFAULT_RELATIONSHIPS)
    .case_insensitive()
}

pub fn category_description_rule() -> DerivationRule {
    DerivationRule::lookup(
        "category_description",
        "category",
        "category_description",
        CATEGORIES
            .iter()
            .map(|(name, _, description)| (*name, *description)),
    )
    .fallback(UNCLASSIFIED)
    .case_insensitive()
}

pub fn wealth_description_rule() -> DerivationRule {
    DerivationRule::lookup(
        "wealth_description",
        "code",
        "description",
        WEALTH_SOURCES.iter().copied(),
    )
    .in_collection("wealth_sources")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn relationship_counts_follow_the_category() {
        assert_eq!(required_relationships("PARTNERSHIP"), 2);
        assert_eq!(required_relationships("limited company"), 3);
        assert_eq!(required_relationships(" Trust "), 2);
        assert_eq!(required_relationships("SPACE AGENCY"), 1);
        assert_eq!(category_description("SPACE AGENCY"), UNCLASSIFIED);
    }

    #[test]
    fn wealth_codes_map_to_descriptions() {
        assert_eq!(wealth_description("003"), Some("LAND AND BUILDING"));
        assert_eq!(wealth_description("007"), None);
        assert_eq!(wealth_codes().len(), 6);
    }

    #[test]
    fn rules_agree_with_the_tables() {
        let rule = category_relationships_rule();
        for name in category_names() {
            assert_eq!(
                rule.evaluate(&json!(name)),
                Some(json!(required_relationships(name)))
            );
        }
        assert_eq!(rule.evaluate(&json!("")), Some(json!(1)));
        let rule = wealth_description_rule();
        assert_eq!(rule.collection(), Some("wealth_sources"));
        assert_eq!(rule.evaluate(&json!("006")), Some(json!("INVESTMENT")));
        assert_eq!(rule.evaluate(&json!("999")), None);
    }
}
