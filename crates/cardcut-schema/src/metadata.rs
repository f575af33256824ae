//! Card metadata embedded as a JSON string in a node's `GMNotes`.
//!
//! Parsing is lazy and lenient: an empty blob, a blob that is not JSON, or
//! JSON without an `id` all mean "no metadata" rather than an error.

use crate::manifest::ObjectNode;
use crate::types::CardIdentity;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CardMetadata {
    pub id: CardIdentity,
}

impl CardMetadata {
    pub fn parse(notes: &str) -> Option<Self> {
        let trimmed = notes.trim();
        if trimmed.is_empty() {
            return None;
        }
        let mut value: Value = serde_json::from_str(trimmed).ok()?;
        // Some exports write numeric ids; normalize to the string form used for file names.
        if let Some(Value::Number(n)) = value.get("id") {
            let id = n.to_string();
            value["id"] = Value::String(id);
        }
        let meta: Self = serde_json::from_value(value).ok()?;
        if meta.id.trim().is_empty() {
            return None;
        }
        Some(meta)
    }
}

impl ObjectNode {
    pub fn metadata(&self) -> Option<CardMetadata> {
        CardMetadata::parse(&self.gm_notes)
    }

    /// The domain identifier from the metadata blob, if any.
    pub fn card_identity(&self) -> Option<CardIdentity> {
        self.metadata().map(|m| m.id)
    }
}
