//! Widget preferences
//!
//! Persisted separately from stopwatch and task state, under the
//! preferences key.

use serde::{Deserialize, Serialize};

use crate::consts::{CHECKPOINT_EVERY_SECS, TICK_INTERVAL_MS};
use crate::error::Result;
use crate::persistence::{Store, keys};

/// User preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Preferences {
    /// Display refresh interval while the stopwatch runs
    pub tick_interval_ms: u32,
    /// Periodic checkpoint every N elapsed seconds (0 disables it)
    pub checkpoint_every_secs: u64,
    /// Show toast notifications
    pub notifications: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            tick_interval_ms: TICK_INTERVAL_MS,
            checkpoint_every_secs: CHECKPOINT_EVERY_SECS,
            notifications: true,
        }
    }
}

impl Preferences {
    /// Load preferences, falling back to defaults
    pub fn load(store: &Store) -> Self {
        match store.try_get::<Preferences>(keys::PREFERENCES) {
            Ok(Some(prefs)) => {
                log::info!("Loaded preferences");
                prefs
            }
            Ok(None) => {
                log::info!("Using default preferences");
                Self::default()
            }
            Err(e) => {
                log::warn!("Stored preferences unreadable, using defaults: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &Store) -> Result<()> {
        store.set(keys::PREFERENCES, self)?;
        log::info!("Preferences saved");
        Ok(())
    }
}
