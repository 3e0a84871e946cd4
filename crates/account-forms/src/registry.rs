use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::debug;
use wizard_spec::{LookupError, LookupService, Prefill};

/// In-memory customer records keyed by account or registration number.
#[derive(Debug, Clone, Default)]
pub struct AccountRegistry {
    records: BTreeMap<String, Prefill>,
}

impl AccountRegistry {
    /// Parses `{ "<key>": { "fields": {..}, "collections": {..} } }`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self {
            records: serde_json::from_str(json)?,
        })
    }

    pub fn insert(&mut self, key: impl Into<String>, record: Prefill) {
        self.records.insert(key.into(), record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl LookupService for AccountRegistry {
    async fn lookup(&self, key: &str) -> Result<Prefill, LookupError> {
        let key = key.trim();
        debug!(key, "registry lookup");
        self.records
            .get(key)
            .cloned()
            .ok_or_else(|| LookupError::NotFound(key.to_string()))
    }
}
