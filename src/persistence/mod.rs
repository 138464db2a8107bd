//! Durable key-value storage for widget state
//!
//! Features:
//! - Versioned JSON envelope with a save timestamp
//! - Retention-window expiry on open
//! - Quota recovery by evicting the oldest envelopes
//! - Whole-widget backup export/import with per-key isolation

pub mod backend;
pub mod backup;
pub mod envelope;
pub mod store;

pub use backend::{FileBackend, MemoryBackend, StorageBackend};
pub use backup::{Backup, ImportReport};
pub use envelope::PersistedEnvelope;
pub use store::{StorageStats, Store};

/// Stable key namespace. Every key holds an independent envelope.
pub mod keys {
    pub const TASKS: &str = "productivity_tasks";
    pub const TIMER_STATE: &str = "productivity_timer_state";
    pub const LAPS: &str = "productivity_laps";
    pub const PREFERENCES: &str = "productivity_preferences";
    pub const VERSION: &str = "productivity_version";

    /// Every key owned by the widget
    pub const ALL: [&str; 5] = [TASKS, TIMER_STATE, LAPS, PREFERENCES, VERSION];
}
