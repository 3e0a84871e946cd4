//! Prefill from an external record lookup (e.g. account number to customer
//! record).
//!
//! Lookups are asynchronous and may overlap when the user edits the search
//! key again. Only the response to the most recently issued request may be
//! applied; anything older is discarded.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::application::Item;

/// Partial application returned by a lookup.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Prefill {
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    #[serde(default)]
    pub collections: BTreeMap<String, Vec<Item>>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("lookup #{token} for '{key}' was superseded by request #{latest}")]
    Stale { key: String, token: u64, latest: u64 },
    #[error("no record found for '{0}'")]
    NotFound(String),
    #[error("lookup service failed: {0}")]
    Service(String),
}

#[async_trait]
pub trait LookupService: Send + Sync {
    async fn lookup(&self, key: &str) -> Result<Prefill, LookupError>;
}

/// Identifies one issued lookup request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTicket {
    token: u64,
    key: String,
}

impl LookupTicket {
    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Issues monotonically increasing request tokens (last request wins).
#[derive(Debug, Default, Clone)]
pub struct LookupTracker {
    latest: u64,
}

impl LookupTracker {
    pub fn issue(&mut self, key: &str) -> LookupTicket {
        self.latest += 1;
        LookupTicket {
            token: self.latest,
            key: key.to_string(),
        }
    }

    pub fn is_current(&self, ticket: &LookupTicket) -> bool {
        ticket.token == self.latest
    }

    pub fn check(&self, ticket: &LookupTicket) -> Result<(), LookupError> {
        if self.is_current(ticket) {
            Ok(())
        } else {
            Err(LookupError::Stale {
                key: ticket.key.clone(),
                token: ticket.token,
                latest: self.latest,
            })
        }
    }
}

/// Runs the lookup for `ticket`, handing the ticket back with the response
/// so the caller can check it is still current before applying.
pub async fn run_lookup(
    service: &dyn LookupService,
    ticket: LookupTicket,
) -> (LookupTicket, Result<Prefill, LookupError>) {
    let response = service.lookup(ticket.key()).await;
    (ticket, response)
}

/// Result of applying a prefill.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PrefillOutcome {
    pub applied: Vec<String>,
    /// Names refused by the prefill policy or unknown to the form.
    pub skipped: Vec<String>,
}
