use std::collections::{BTreeMap, BTreeSet, HashMap};

use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;

use crate::error::DefinitionError;
use crate::expr::Expr;
use crate::spec::{
    CollectionSpec, DerivationPolicy, DerivationRule, FieldKind, FieldSpec, FormSpec, StepSpec,
};
use crate::visibility::VisibilityMode;

const RESERVED: &[&str] = &["item"];

/// Where a field or collection lives inside the step list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
    pub step: usize,
    /// Position of the owning group inside the step, if grouped.
    pub group: Option<usize>,
}

/// A checked, ready-to-run form definition.
///
/// Construction rejects every malformed definition so sessions never
/// discover one midway.
#[derive(Debug)]
pub struct Form {
    spec: FormSpec,
    fields: HashMap<String, usize>,
    collections: HashMap<String, usize>,
    owners: HashMap<String, Owner>,
    patterns: HashMap<String, Regex>,
    dependents: HashMap<String, BTreeSet<String>>,
    prefill_allow: Option<GlobSet>,
    prefill_deny: Option<GlobSet>,
}

impl Form {
    pub fn compile(spec: FormSpec) -> Result<Self, DefinitionError> {
        let mut fields = HashMap::new();
        let mut collections = HashMap::new();
        for (position, field) in spec.fields.iter().enumerate() {
            check_name(&field.name)?;
            if fields.insert(field.name.clone(), position).is_some() {
                return Err(DefinitionError::DuplicateName(field.name.clone()));
            }
        }
        for (position, collection) in spec.collections.iter().enumerate() {
            check_name(&collection.name)?;
            if fields.contains_key(&collection.name)
                || collections
                    .insert(collection.name.clone(), position)
                    .is_some()
            {
                return Err(DefinitionError::DuplicateName(collection.name.clone()));
            }
        }

        let owners = resolve_owners(&spec, &fields, &collections)?;

        let mut patterns = HashMap::new();
        for field in &spec.fields {
            check_field(field, &field.name, &mut patterns)?;
        }
        for collection in &spec.collections {
            check_collection(collection, &fields, &mut patterns)?;
        }

        let known = |name: &str| fields.contains_key(name) || collections.contains_key(name);
        let mut dependents: HashMap<String, BTreeSet<String>> = HashMap::new();
        for field in &spec.fields {
            for expr in field.expressions() {
                for name in expr.root_names() {
                    if !known(&name) {
                        return Err(DefinitionError::UnknownReference {
                            owner: field.name.clone(),
                            name,
                        });
                    }
                    dependents
                        .entry(name)
                        .or_default()
                        .insert(field.name.clone());
                }
            }
        }
        for collection in &spec.collections {
            for field in &collection.fields {
                for expr in field.expressions() {
                    for name in expr.root_names() {
                        if name != "item" && !known(&name) {
                            return Err(DefinitionError::UnknownReference {
                                owner: format!("{}/{}", collection.name, field.name),
                                name,
                            });
                        }
                    }
                }
            }
        }
        // A step or group predicate makes every member depend on the names it reads.
        for step in &spec.steps {
            let members: Vec<String> = step
                .all_fields()
                .chain(step.all_collections())
                .map(String::from)
                .collect();
            for name in step.active_if.iter().flat_map(Expr::root_names) {
                dependents
                    .entry(name)
                    .or_default()
                    .extend(members.iter().cloned());
            }
            for group in &step.groups {
                for name in group.active_if.root_names() {
                    dependents
                        .entry(name)
                        .or_default()
                        .extend(group.fields.iter().chain(&group.collections).cloned());
                }
            }
        }
        let step_exprs = spec.steps.iter().flat_map(|step| {
            step.active_if
                .iter()
                .map(move |expr| (step.id.clone(), expr))
                .chain(
                    step.groups
                        .iter()
                        .map(|group| (group.id.clone(), &group.active_if)),
                )
        });
        let rule_exprs = spec
            .submit_rules
            .iter()
            .map(|rule| (rule.id.clone(), &rule.expr));
        for (owner, expr) in step_exprs.chain(rule_exprs) {
            check_expr_references(&owner, expr, &known)?;
        }

        check_derivations(&spec, &fields, &collections)?;

        let (prefill_allow, prefill_deny) = match &spec.prefill_policy {
            Some(policy) => (
                build_globset(&policy.allow)?,
                build_globset(&policy.deny)?,
            ),
            None => (None, None),
        };

        Ok(Self {
            spec,
            fields,
            collections,
            owners,
            patterns,
            dependents,
            prefill_allow,
            prefill_deny,
        })
    }

    pub fn spec(&self) -> &FormSpec {
        &self.spec
    }

    pub fn id(&self) -> &str {
        &self.spec.id
    }

    pub fn title(&self) -> &str {
        &self.spec.title
    }

    pub fn step_count(&self) -> usize {
        self.spec.steps.len()
    }

    /// Step by 1-based index.
    pub fn step(&self, index: usize) -> Option<&StepSpec> {
        index
            .checked_sub(1)
            .and_then(|position| self.spec.steps.get(position))
    }

    pub fn steps(&self) -> &[StepSpec] {
        &self.spec.steps
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields
            .get(name)
            .map(|position| &self.spec.fields[*position])
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionSpec> {
        self.collections
            .get(name)
            .map(|position| &self.spec.collections[*position])
    }

    pub fn owner(&self, name: &str) -> Option<Owner> {
        self.owners.get(name).copied()
    }

    pub fn derivations(&self) -> &[DerivationRule] {
        &self.spec.derivations
    }

    pub fn derivation_policy(&self) -> DerivationPolicy {
        self.spec.derivation_policy
    }

    /// Treatment of predicates whose paths do not resolve yet.
    pub fn visibility_mode(&self) -> VisibilityMode {
        self.spec.unresolved_visibility
    }

    /// Whether some rule writes `name` (scalar) or `collection/field`.
    pub fn is_derived(&self, collection: Option<&str>, name: &str) -> bool {
        self.spec
            .derivations
            .iter()
            .any(|rule| rule.collection() == collection && rule.target() == name)
    }

    /// Compiled pattern for a scalar field (`name`) or item field
    /// (`collection/field`).
    pub(crate) fn pattern(&self, key: &str) -> Option<&Regex> {
        self.patterns.get(key)
    }

    /// Fields and collections whose requirement or activation reads `name`.
    pub fn dependents(&self, name: &str) -> impl Iterator<Item = &str> {
        self.dependents
            .get(name)
            .into_iter()
            .flat_map(|names| names.iter().map(String::as_str))
    }

    /// Whether an external lookup may prefill the field.
    pub fn prefill_allows(&self, name: &str) -> bool {
        if self.field(name).is_none() && self.collection(name).is_none() {
            return false;
        }
        if let Some(deny) = &self.prefill_deny
            && deny.is_match(name)
        {
            return false;
        }
        match &self.prefill_allow {
            Some(allow) => allow.is_match(name),
            None => true,
        }
    }
}

fn check_name(name: &str) -> Result<(), DefinitionError> {
    if RESERVED.contains(&name) {
        Err(DefinitionError::ReservedName(name.to_string()))
    } else {
        Ok(())
    }
}

fn resolve_owners(
    spec: &FormSpec,
    fields: &HashMap<String, usize>,
    collections: &HashMap<String, usize>,
) -> Result<HashMap<String, Owner>, DefinitionError> {
    if spec.steps.is_empty() {
        return Err(DefinitionError::NoSteps(spec.id.clone()));
    }
    let mut owners: HashMap<String, Owner> = HashMap::new();
    for (position, step) in spec.steps.iter().enumerate() {
        if step.index != position + 1 {
            return Err(DefinitionError::StepIndex {
                position: position + 1,
                found: step.index,
            });
        }
        let ungrouped = step
            .fields
            .iter()
            .map(|name| (name, None, false))
            .chain(step.collections.iter().map(|name| (name, None, true)));
        let grouped = step.groups.iter().enumerate().flat_map(|(group, spec)| {
            spec.fields
                .iter()
                .map(move |name| (name, Some(group), false))
                .chain(
                    spec.collections
                        .iter()
                        .map(move |name| (name, Some(group), true)),
                )
        });
        for (name, group, is_collection) in ungrouped.chain(grouped) {
            let declared = if is_collection {
                collections.contains_key(name)
            } else {
                fields.contains_key(name)
            };
            if !declared {
                return Err(if is_collection {
                    DefinitionError::UndeclaredCollection {
                        step: step.index,
                        name: name.clone(),
                    }
                } else {
                    DefinitionError::UndeclaredField {
                        step: step.index,
                        name: name.clone(),
                    }
                });
            }
            let owner = Owner {
                step: step.index,
                group,
            };
            if let Some(previous) = owners.insert(name.clone(), owner) {
                return Err(DefinitionError::MultipleOwners {
                    name: name.clone(),
                    first: previous.step,
                    second: step.index,
                });
            }
        }
    }
    let unowned = spec
        .fields
        .iter()
        .map(|field| &field.name)
        .chain(spec.collections.iter().map(|collection| &collection.name))
        .find(|name| !owners.contains_key(*name));
    if let Some(name) = unowned {
        return Err(DefinitionError::Unowned(name.clone()));
    }
    Ok(owners)
}

fn check_field(
    field: &FieldSpec,
    key: &str,
    patterns: &mut HashMap<String, Regex>,
) -> Result<(), DefinitionError> {
    if field.kind == FieldKind::Enum {
        let choices = field
            .choices
            .as_ref()
            .filter(|choices| !choices.is_empty())
            .ok_or_else(|| DefinitionError::MissingChoices(key.to_string()))?;
        if let Some(default) = field.default_value.as_ref().and_then(|value| value.as_str())
            && !default.is_empty()
            && !choices
                .iter()
                .any(|choice| choice.eq_ignore_ascii_case(default))
        {
            return Err(DefinitionError::DefaultNotInChoices(key.to_string()));
        }
    }
    if let Some(pattern) = field
        .constraint
        .as_ref()
        .and_then(|constraint| constraint.pattern.as_ref())
    {
        let regex = Regex::new(pattern).map_err(|source| DefinitionError::Pattern {
            field: key.to_string(),
            source,
        })?;
        patterns.insert(key.to_string(), regex);
    }
    Ok(())
}

fn check_collection(
    collection: &CollectionSpec,
    fields: &HashMap<String, usize>,
    patterns: &mut HashMap<String, Regex>,
) -> Result<(), DefinitionError> {
    let mut seen = BTreeSet::new();
    for field in &collection.fields {
        if !seen.insert(field.name.as_str()) {
            return Err(DefinitionError::DuplicateName(format!(
                "{}/{}",
                collection.name, field.name
            )));
        }
        check_field(
            field,
            &format!("{}/{}", collection.name, field.name),
            patterns,
        )?;
    }
    if let Some(key) = &collection.key_field
        && collection.field(key).is_none()
    {
        return Err(DefinitionError::CollectionField {
            collection: collection.name.clone(),
            name: key.clone(),
        });
    }
    if let Some(min_field) = &collection.min_items_field
        && !fields.contains_key(min_field)
    {
        return Err(DefinitionError::CollectionField {
            collection: collection.name.clone(),
            name: min_field.clone(),
        });
    }
    Ok(())
}

fn check_expr_references(
    owner: &str,
    expr: &Expr,
    known: &impl Fn(&str) -> bool,
) -> Result<(), DefinitionError> {
    match expr.root_names().into_iter().find(|name| !known(name)) {
        Some(name) => Err(DefinitionError::UnknownReference {
            owner: owner.to_string(),
            name,
        }),
        None => Ok(()),
    }
}

fn build_globset(patterns: &[String]) -> Result<Option<GlobSet>, DefinitionError> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| DefinitionError::PrefillGlob {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map(Some)
        .map_err(|source| DefinitionError::PrefillGlob {
            pattern: patterns.join(","),
            source,
        })
}

/// Graph node for a derivation endpoint: `name` or `collection[].field`.
fn node(rule: &DerivationRule, name: &str) -> String {
    match rule.collection() {
        Some(collection) => format!("{}[].{}", collection, name),
        None => name.to_string(),
    }
}

fn check_derivations(
    spec: &FormSpec,
    fields: &HashMap<String, usize>,
    collections: &HashMap<String, usize>,
) -> Result<(), DefinitionError> {
    let mut edges: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for rule in &spec.derivations {
        let exists = |name: &str| match rule.collection() {
            Some(collection) => collections
                .get(collection)
                .map(|position| spec.collections[*position].field(name).is_some())
                .unwrap_or(false),
            None => fields.contains_key(name),
        };
        for name in [rule.source(), rule.target()] {
            if !exists(name) {
                return Err(DefinitionError::DerivationField {
                    rule: rule.id().to_string(),
                    name: name.to_string(),
                });
            }
        }
        edges
            .entry(node(rule, rule.source()))
            .or_default()
            .push(node(rule, rule.target()));
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    fn visit(
        name: &str,
        edges: &BTreeMap<String, Vec<String>>,
        marks: &mut HashMap<String, Mark>,
    ) -> Result<(), DefinitionError> {
        match marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => return Err(DefinitionError::DerivationCycle(name.to_string())),
            None => {}
        }
        marks.insert(name.to_string(), Mark::Visiting);
        for next in edges.get(name).into_iter().flatten() {
            visit(next, edges, marks)?;
        }
        marks.insert(name.to_string(), Mark::Done);
        Ok(())
    }

    let mut marks = HashMap::new();
    for name in edges.keys() {
        visit(name, &edges, &mut marks)?;
    }
    Ok(())
}
