use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// One sub-record of a collection.
pub type Item = BTreeMap<String, Value>;

/// Rejected save attempt carrying an outdated revision.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("stale revision {given}; application is at revision {current}")]
pub struct StaleRevision {
    pub given: u64,
    pub current: u64,
}

/// The in-progress record assembled across all wizard steps.
///
/// Only the engine mutates it; hosts read it through the accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    form_id: String,
    fields: BTreeMap<String, Value>,
    collections: BTreeMap<String, Vec<Item>>,
    revision: u64,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pinned: BTreeSet<String>,
}

impl Application {
    pub(crate) fn new(form_id: &str) -> Self {
        Self {
            form_id: form_id.to_string(),
            fields: BTreeMap::new(),
            collections: BTreeMap::new(),
            revision: 0,
            pinned: BTreeSet::new(),
        }
    }

    pub fn form_id(&self) -> &str {
        &self.form_id
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Optimistic concurrency check for hosts that autosave.
    pub fn ensure_revision(&self, expected: u64) -> Result<(), StaleRevision> {
        if expected == self.revision {
            Ok(())
        } else {
            Err(StaleRevision {
                given: expected,
                current: self.revision,
            })
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    pub fn collection(&self, name: &str) -> &[Item] {
        self.collections
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn collections(&self) -> &BTreeMap<String, Vec<Item>> {
        &self.collections
    }

    pub fn is_pinned(&self, name: &str) -> bool {
        self.pinned.contains(name)
    }

    pub(crate) fn put_field(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
        self.revision += 1;
    }

    pub(crate) fn collection_mut(&mut self, name: &str) -> &mut Vec<Item> {
        self.revision += 1;
        self.collections.entry(name.to_string()).or_default()
    }

    pub(crate) fn pin(&mut self, name: &str) {
        self.pinned.insert(name.to_string());
    }

    pub(crate) fn unpin(&mut self, name: &str) -> bool {
        self.pinned.remove(name)
    }

    /// Drops pins below `prefix`; item positions shift after a removal.
    pub(crate) fn unpin_under(&mut self, prefix: &str) {
        self.pinned.retain(|key| !key.starts_with(prefix));
    }

    /// JSON view used for expression evaluation and host display.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        for (name, value) in &self.fields {
            map.insert(name.clone(), value.clone());
        }
        for (name, items) in &self.collections {
            let items = items
                .iter()
                .map(|item| Value::Object(item.clone().into_iter().collect()))
                .collect();
            map.insert(name.clone(), Value::Array(items));
        }
        Value::Object(map)
    }

    /// View used for item-level expressions: the root view plus `/item`.
    pub(crate) fn item_context(&self, item: &Item) -> Value {
        let mut ctx = self.to_value();
        if let Value::Object(map) = &mut ctx {
            map.insert(
                "item".into(),
                Value::Object(item.clone().into_iter().collect()),
            );
        }
        ctx
    }

    pub(crate) fn freeze(&self) -> SubmittedApplication {
        SubmittedApplication {
            form_id: self.form_id.clone(),
            revision: self.revision,
            fields: self.fields.clone(),
            collections: self.collections.clone(),
        }
    }
}

/// Frozen copy handed to the account-creation collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedApplication {
    pub form_id: String,
    pub revision: u64,
    pub fields: BTreeMap<String, Value>,
    pub collections: BTreeMap<String, Vec<Item>>,
}

impl SubmittedApplication {
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>, serde_cbor::Error> {
        serde_cbor::to_vec(self)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, serde_cbor::Error> {
        serde_cbor::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_mutation_bumps_the_revision() {
        let mut app = Application::new("f");
        app.put_field("a", json!("x"));
        app.collection_mut("c").push(Item::new());
        assert_eq!(app.revision(), 2);
        assert!(app.ensure_revision(2).is_ok());
        assert_eq!(
            app.ensure_revision(1),
            Err(StaleRevision {
                given: 1,
                current: 2
            })
        );
    }

    #[test]
    fn value_view_nests_collections() {
        let mut app = Application::new("f");
        app.put_field("name", json!("Acme"));
        app.collection_mut("contacts")
            .push(Item::from([("email".to_string(), json!("a@b.co"))]));
        let view = app.to_value();
        assert_eq!(view.pointer("/contacts/0/email"), Some(&json!("a@b.co")));
        assert_eq!(view["name"], "Acme");
    }

    #[test]
    fn frozen_copy_survives_cbor() {
        let mut app = Application::new("f");
        app.put_field("amount", json!(1200));
        let frozen = app.freeze();
        let bytes = frozen.to_cbor().expect("cbor");
        assert_eq!(SubmittedApplication::from_cbor(&bytes).expect("decode"), frozen);
    }
}
