//! Daily Productivity - a stopwatch and task list widget
//!
//! Core modules:
//! - `stopwatch`: Wall-clock stopwatch engine and lap ledger
//! - `tasks`: To-do list
//! - `persistence`: Envelope store with expiry, quota recovery and backups
//! - `present`: View and confirmation ports the core renders through
//! - `app`: Composition root wiring components to one store
//! - `platform`: Browser/native platform abstraction

pub mod app;
pub mod error;
pub mod format;
pub mod persistence;
pub mod platform;
pub mod present;
pub mod settings;
pub mod stopwatch;
pub mod tasks;

#[cfg(test)]
pub(crate) mod testing;

pub use app::Widget;
pub use error::{Result, StoreError};
pub use persistence::Store;
pub use settings::Preferences;
pub use stopwatch::Stopwatch;
pub use tasks::TaskList;

use rand::Rng;

/// Widget configuration constants
pub mod consts {
    pub const APP_NAME: &str = "Daily Productivity";

    /// Display refresh interval while the stopwatch runs
    pub const TICK_INTERVAL_MS: u32 = 10;
    /// Periodic checkpoint while running, in elapsed seconds
    pub const CHECKPOINT_EVERY_SECS: u64 = 5;

    /// Envelopes older than this are dropped when the store opens (30 days)
    pub const RETENTION_MS: i64 = 30 * 24 * 60 * 60 * 1000;
    /// Share of stored envelopes evicted on a quota failure
    pub const EVICTION_FRACTION: f64 = 0.2;
    /// Written into every envelope
    pub const SCHEMA_VERSION: &str = "1.0.0";
}

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Identifier of the form `<epoch ms>-<9 base-36 chars>`
pub fn unique_id(now_ms: i64) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..9)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("{}-{}", now_ms, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_id_shape() {
        let id = unique_id(1_700_000_000_000);
        let (stamp, suffix) = id.split_once('-').unwrap();
        assert_eq!(stamp, "1700000000000");
        assert_eq!(suffix.len(), 9);
        assert!(suffix.bytes().all(|b| ID_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_unique_ids_differ() {
        assert_ne!(unique_id(5), unique_id(5));
    }
}
