//! Backup file format

use serde::{Deserialize, Serialize};

use crate::stopwatch::{Lap, StopwatchState};
use crate::tasks::Task;

/// Everything a user can back up, as written to the export file.
///
/// Imports accept any subset of `tasks`, `timerState` and `laps`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub tasks: Vec<Task>,
    pub timer_state: StopwatchState,
    pub laps: Vec<Lap>,
    pub version: String,
    /// ISO-8601 UTC instant of the export
    pub export_date: String,
}

impl Backup {
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Suggested download name, e.g. `productivity-backup-1700000000000.json`
    pub fn file_name(now_ms: i64) -> String {
        format!("productivity-backup-{}.json", now_ms)
    }
}

/// Outcome of an import: which backup fields were written and which were
/// rejected (with the reason).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub restored: Vec<&'static str>,
    pub rejected: Vec<(&'static str, String)>,
}

impl ImportReport {
    /// True when nothing was rejected
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }

    pub fn restored_any(&self) -> bool {
        !self.restored.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::persistence::{Store, keys};
    use crate::platform::ManualClock;

    fn sample_lap(seq: u32, elapsed: u64) -> Lap {
        Lap {
            id: format!("lap-{}", seq),
            sequence_number: seq,
            elapsed_at_capture: elapsed,
            captured_at_epoch_ms: 1_000 + elapsed as i64,
        }
    }

    fn sample_task(id: &str, completed: bool) -> Task {
        Task {
            id: id.to_string(),
            text: format!("task {}", id),
            completed,
            created_at: 5,
            completed_at: completed.then_some(9),
        }
    }

    #[test]
    fn test_export_import_roundtrip() {
        let clock = ManualClock::new(1_700_000_000_000);
        let source = Store::in_memory(Rc::new(clock.clone()));
        let tasks = vec![sample_task("b", true), sample_task("a", false)];
        let state = StopwatchState {
            elapsed_ms: 2_500,
            running: false,
            start_epoch_ms: 77,
        };
        let laps = vec![sample_lap(2, 2_500), sample_lap(1, 1_000)];
        source.set(keys::TASKS, &tasks).unwrap();
        source.set(keys::TIMER_STATE, &state).unwrap();
        source.set(keys::LAPS, &laps).unwrap();

        let backup = source.export_all();
        assert_eq!(backup.export_date, "2023-11-14T22:13:20.000Z");
        let json = backup.to_json_pretty().unwrap();

        let target = Store::in_memory(Rc::new(clock));
        let report = target.import_json(&json).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.restored, vec!["tasks", "timerState", "laps"]);

        let again = target.export_all();
        assert_eq!(again.tasks, tasks);
        assert_eq!(again.timer_state, state);
        assert_eq!(again.laps, laps);
    }

    #[test]
    fn test_partial_import_isolates_bad_keys() {
        let store = Store::in_memory(Rc::new(ManualClock::new(0)));
        let raw = r#"{
            "tasks": "definitely not a list",
            "timerState": {"elapsedMs": 4200, "running": true, "startEpochMs": 3},
            "laps": [{"id": "x", "sequenceNumber": 1, "elapsedAtCapture": 10, "capturedAtEpochMs": 20}]
        }"#;
        let report = store.import_json(raw).unwrap();
        assert_eq!(report.restored, vec!["timerState", "laps"]);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].0, "tasks");

        let backup = store.export_all();
        assert!(backup.tasks.is_empty());
        assert_eq!(backup.timer_state.elapsed_ms, 4_200);
        assert_eq!(backup.laps.len(), 1);
    }

    #[test]
    fn test_import_accepts_subset_and_legacy_names() {
        let store = Store::in_memory(Rc::new(ManualClock::new(0)));
        let raw = r#"{"timerState": {"elapsedTime": 900, "isRunning": false, "lastUpdated": 1}}"#;
        let report = store.import_json(raw).unwrap();
        assert_eq!(report.restored, vec!["timerState"]);
        assert_eq!(store.export_all().timer_state.elapsed_ms, 900);
    }

    #[test]
    fn test_import_rejects_non_objects() {
        let store = Store::in_memory(Rc::new(ManualClock::new(0)));
        assert!(store.import_json("[1, 2, 3]").is_err());
        assert!(store.import_json("not json at all").is_err());
        let empty = store.import_json("{}").unwrap();
        assert!(empty.is_clean());
        assert!(!empty.restored_any());
    }
}
