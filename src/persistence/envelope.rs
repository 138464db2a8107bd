//! Versioned envelope wrapped around every stored value

use serde::{Deserialize, Serialize};

/// A stored value plus the instant it was written and the schema it was
/// written under.
///
/// Envelopes written by the first JavaScript release used `timestamp` and
/// `version`; both names are still accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedEnvelope<T> {
    pub value: T,
    #[serde(alias = "timestamp")]
    pub stored_at_epoch_ms: i64,
    #[serde(alias = "version")]
    pub schema_version: String,
}

impl<T> PersistedEnvelope<T> {
    /// True once the envelope is strictly older than the retention window
    pub fn is_expired(&self, now_ms: i64, retention_ms: i64) -> bool {
        is_expired(self.stored_at_epoch_ms, now_ms, retention_ms)
    }
}

/// Just the timestamp of an envelope, for scans that never touch the payload.
#[derive(Debug, Deserialize)]
pub(crate) struct EnvelopeStamp {
    #[serde(rename = "storedAtEpochMs", alias = "timestamp")]
    pub stored_at_epoch_ms: Option<i64>,
}

impl EnvelopeStamp {
    /// Parse a raw stored string; `None` for anything that isn't an
    /// envelope carrying a timestamp.
    pub fn read(raw: &str) -> Option<i64> {
        serde_json::from_str::<EnvelopeStamp>(raw)
            .ok()
            .and_then(|stamp| stamp.stored_at_epoch_ms)
    }
}

pub(crate) fn is_expired(stored_at_ms: i64, now_ms: i64, retention_ms: i64) -> bool {
    now_ms - stored_at_ms > retention_ms
}
