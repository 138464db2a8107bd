//! The envelope store shared by every widget component

use std::collections::BTreeMap;
use std::rc::Rc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::backend::{MemoryBackend, StorageBackend};
use super::backup::{Backup, ImportReport};
use super::envelope::{EnvelopeStamp, PersistedEnvelope, is_expired};
use super::keys;
use crate::consts::{EVICTION_FRACTION, RETENTION_MS, SCHEMA_VERSION};
use crate::error::{Result, StoreError};
use crate::platform::Clock;
use crate::stopwatch::{Lap, StopwatchState};
use crate::tasks::Task;

/// Key written and removed again to check that the medium accepts writes
const WRITE_CHECK_KEY: &str = "__productivity_write_check__";

/// Size breakdown of everything in the backend
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageStats {
    pub total_bytes: usize,
    pub item_count: usize,
    pub items: BTreeMap<String, usize>,
}

impl StorageStats {
    pub fn total_kib(&self) -> f64 {
        self.total_bytes as f64 / 1024.0
    }
}

/// Sole reader and writer of the storage medium.
///
/// Every value goes in wrapped in a [`PersistedEnvelope`]. Failures never
/// escape as panics: reads fall back to defaults and writes report a
/// [`StoreError`] the caller may log and move past.
pub struct Store {
    backend: Box<dyn StorageBackend>,
    clock: Rc<dyn Clock>,
    memory_only: bool,
}

impl Store {
    /// Open a store over `backend`.
    ///
    /// If the backend refuses a test write the store degrades to an
    /// in-memory map for the rest of the session. Opening also records the
    /// schema version and drops envelopes past the retention window.
    pub fn open(backend: Box<dyn StorageBackend>, clock: Rc<dyn Clock>) -> Self {
        let (backend, memory_only) = match check_writable(backend.as_ref()) {
            Ok(()) => (backend, false),
            Err(e) => {
                log::warn!("Storage unavailable, data will not be saved: {}", e);
                (
                    Box::new(MemoryBackend::new()) as Box<dyn StorageBackend>,
                    true,
                )
            }
        };

        Self::init(backend, clock, memory_only)
    }

    /// A store that never touches durable storage
    pub fn in_memory(clock: Rc<dyn Clock>) -> Self {
        Self::open(Box::new(MemoryBackend::new()), clock)
    }

    /// The degraded store used when the durable medium cannot even be
    /// reached. Reports itself as memory-only.
    pub fn memory_only(clock: Rc<dyn Clock>) -> Self {
        Self::init(Box::new(MemoryBackend::new()), clock, true)
    }

    fn init(backend: Box<dyn StorageBackend>, clock: Rc<dyn Clock>, memory_only: bool) -> Self {
        let store = Self {
            backend,
            clock,
            memory_only,
        };
        store.check_version();
        let expired = store.evict_expired();
        if expired > 0 {
            log::info!("Removed {} expired entries", expired);
        }
        store
    }

    /// True when the real medium could not be used and state lives only in
    /// memory
    pub fn is_memory_only(&self) -> bool {
        self.memory_only
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    fn check_version(&self) {
        let saved: Option<String> = self.get(keys::VERSION, None);
        if saved.as_deref() != Some(SCHEMA_VERSION) {
            log::info!(
                "Schema version {:?} -> {}, updating",
                saved.as_deref().unwrap_or("none"),
                SCHEMA_VERSION
            );
            if let Err(e) = self.set(keys::VERSION, SCHEMA_VERSION) {
                log::warn!("Could not record schema version: {}", e);
            }
        }
    }

    /// Wrap `value` in an envelope and write it under `key`.
    ///
    /// A quota failure evicts the oldest fifth of the stored envelopes and
    /// retries once; if that also fails the error is returned and nothing is
    /// written this round.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let envelope = PersistedEnvelope {
            value,
            stored_at_epoch_ms: self.clock.now_ms(),
            schema_version: SCHEMA_VERSION.to_string(),
        };
        let raw = serde_json::to_string(&envelope)?;

        match self.backend.set_item(key, &raw) {
            Err(e) if e.is_quota() => {
                let evicted = self.evict_oldest(EVICTION_FRACTION);
                log::warn!(
                    "Quota exceeded writing {}, evicted {} oldest entries and retrying",
                    key,
                    evicted
                );
                self.backend.set_item(key, &raw)
            }
            other => other,
        }
    }

    /// Read the value under `key`, or `default` when it is missing or
    /// cannot be decoded
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.try_get(key) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(e) => {
                log::warn!("Ignoring stored value: {}", e);
                default
            }
        }
    }

    /// Like [`get`](Self::get) but reports why a value is absent
    pub fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.backend.get_item(key)? else {
            return Ok(None);
        };
        serde_json::from_str::<PersistedEnvelope<T>>(&raw)
            .map(|envelope| Some(envelope.value))
            .map_err(|e| StoreError::CorruptEntry {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.backend.remove_item(key)
    }

    /// Remove every widget key
    pub fn clear_all(&self) -> Result<()> {
        for key in keys::ALL {
            self.backend.remove_item(key)?;
        }
        log::info!("All widget data cleared");
        Ok(())
    }

    /// All (key, storedAt) pairs for entries that are readable envelopes
    fn stamped_entries(&self) -> Vec<(String, i64)> {
        let keys = match self.backend.keys() {
            Ok(keys) => keys,
            Err(e) => {
                log::warn!("Could not list stored keys: {}", e);
                return Vec::new();
            }
        };
        keys.into_iter()
            .filter_map(|key| {
                let raw = self.backend.get_item(&key).ok()??;
                let stored_at = EnvelopeStamp::read(&raw)?;
                Some((key, stored_at))
            })
            .collect()
    }

    /// Delete envelopes older than the retention window. Returns how many
    /// were removed.
    pub fn evict_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut removed = 0;
        for (key, stored_at) in self.stamped_entries() {
            if is_expired(stored_at, now, RETENTION_MS) {
                match self.backend.remove_item(&key) {
                    Ok(()) => {
                        log::info!("Expired entry removed: {}", key);
                        removed += 1;
                    }
                    Err(e) => log::warn!("Could not remove expired {}: {}", key, e),
                }
            }
        }
        removed
    }

    /// Delete the oldest `ceil(n * fraction)` envelopes by save time.
    ///
    /// Entries that are not envelopes are never candidates. Returns the
    /// number of entries selected for removal.
    pub fn evict_oldest(&self, fraction: f64) -> usize {
        let mut stamped = self.stamped_entries();
        stamped.sort_by_key(|(_, stored_at)| *stored_at);

        let per_mille = (fraction.clamp(0.0, 1.0) * 1000.0).round() as usize;
        let count = (stamped.len() * per_mille).div_ceil(1000);

        for (key, _) in stamped.iter().take(count) {
            if let Err(e) = self.backend.remove_item(key) {
                log::warn!("Could not evict {}: {}", key, e);
            }
        }
        log::info!("Evicted {} old entries to free space", count);
        count
    }

    /// Snapshot of the domain keys for backup
    pub fn export_all(&self) -> Backup {
        Backup {
            tasks: self.get(keys::TASKS, Vec::<Task>::new()),
            timer_state: self.get(keys::TIMER_STATE, StopwatchState::default()),
            laps: self.get(keys::LAPS, Vec::<Lap>::new()),
            version: SCHEMA_VERSION.to_string(),
            export_date: crate::format::iso8601(self.clock.now_ms()),
        }
    }

    /// Restore domain keys from a backup object.
    ///
    /// Fails only when `snapshot` is not a JSON object. Each present key is
    /// validated and written on its own, so one malformed key never blocks
    /// the others; the report lists what was restored and what was not.
    pub fn import_all(&self, snapshot: &serde_json::Value) -> Result<ImportReport> {
        let Some(object) = snapshot.as_object() else {
            return Err(StoreError::MalformedImport(
                "backup is not a JSON object".to_string(),
            ));
        };

        let mut report = ImportReport::default();
        self.import_key::<Vec<Task>>(object, "tasks", keys::TASKS, &mut report);
        self.import_key::<StopwatchState>(object, "timerState", keys::TIMER_STATE, &mut report);
        self.import_key::<Vec<Lap>>(object, "laps", keys::LAPS, &mut report);
        log::info!(
            "Import finished: {} restored, {} rejected",
            report.restored.len(),
            report.rejected.len()
        );
        Ok(report)
    }

    /// Parse `raw` as JSON and [`import_all`](Self::import_all) it
    pub fn import_json(&self, raw: &str) -> Result<ImportReport> {
        let snapshot: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| StoreError::MalformedImport(e.to_string()))?;
        self.import_all(&snapshot)
    }

    fn import_key<T: DeserializeOwned + Serialize>(
        &self,
        object: &serde_json::Map<String, serde_json::Value>,
        field: &'static str,
        key: &str,
        report: &mut ImportReport,
    ) {
        let Some(raw) = object.get(field).filter(|v| !v.is_null()) else {
            return;
        };
        let value = match serde_json::from_value::<T>(raw.clone()) {
            Ok(value) => value,
            Err(e) => {
                let err = StoreError::MalformedImport(format!("{}: {}", field, e));
                log::warn!("{}", err);
                report.rejected.push((field, err.to_string()));
                return;
            }
        };
        match self.set(key, &value) {
            Ok(()) => report.restored.push(field),
            Err(e) => {
                log::warn!("Could not write imported {}: {}", field, e);
                report.rejected.push((field, e.to_string()));
            }
        }
    }

    /// Per-key sizes of everything in the backend
    pub fn stats(&self) -> StorageStats {
        let mut stats = StorageStats::default();
        for key in self.backend.keys().unwrap_or_default() {
            if let Ok(Some(value)) = self.backend.get_item(&key) {
                stats.total_bytes += value.len();
                stats.items.insert(key, value.len());
            }
        }
        stats.item_count = stats.items.len();
        stats
    }
}

fn check_writable(backend: &dyn StorageBackend) -> Result<()> {
    match backend.set_item(WRITE_CHECK_KEY, WRITE_CHECK_KEY) {
        // A full medium is still a usable one
        Err(e) if e.is_quota() => Ok(()),
        Err(e) => Err(StoreError::StorageUnavailable(e.to_string())),
        Ok(()) => backend
            .remove_item(WRITE_CHECK_KEY)
            .map_err(|e| StoreError::StorageUnavailable(e.to_string())),
    }
}
