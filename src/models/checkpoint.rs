//! Durable per-account sync state.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// The newest identifier delivered for one account.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Watermark {
    #[serde(
        default,
        deserialize_with = "lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_id: Option<u64>,

    /// Fields written by other tools, kept on rewrite
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Mapping of account to watermark, plus the time of the last change.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CheckpointState {
    #[serde(default, rename = "users")]
    pub accounts: BTreeMap<String, Watermark>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CheckpointState {
    /// Watermark for an account; `None` means never synced.
    pub fn last_id(&self, account: &str) -> Option<u64> {
        self.accounts.get(account).and_then(|w| w.last_id)
    }

    /// Move an account's watermark forward.
    ///
    /// Returns `false` and leaves the state untouched unless `id` is
    /// strictly greater than the current watermark.
    pub fn advance(&mut self, account: &str, id: u64) -> bool {
        if self.last_id(account).is_some_and(|current| current >= id) {
            return false;
        }
        self.accounts.entry(account.to_string()).or_default().last_id = Some(id);
        self.updated_at = Some(Utc::now());
        true
    }
}

/// Accept `last_id` as a number or a numeric string.
fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    Ok(match Option::<RawId>::deserialize(deserializer)? {
        Some(RawId::Number(id)) => Some(id),
        Some(RawId::Text(text)) => text.trim().parse().ok(),
        None => None,
    })
}
