//! Stopwatch data model
//!
//! Everything here is persisted, so field names are part of the storage
//! and backup format.

use serde::{Deserialize, Serialize};

/// Where the stopwatch is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Nothing accumulated, not running
    Idle,
    /// Time accumulated, not running
    Paused,
    /// Accumulating
    Running,
}

/// Snapshot of the stopwatch as stored and rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StopwatchState {
    /// Accumulated running time
    #[serde(alias = "elapsedTime")]
    pub elapsed_ms: u64,
    #[serde(alias = "isRunning")]
    pub running: bool,
    /// Instant elapsed time is measured from while running
    pub start_epoch_ms: i64,
}

impl StopwatchState {
    pub fn status(&self) -> Status {
        if self.running {
            Status::Running
        } else if self.elapsed_ms > 0 {
            Status::Paused
        } else {
            Status::Idle
        }
    }
}

/// A captured elapsed time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lap {
    pub id: String,
    /// 1-based, in recording order
    #[serde(alias = "number")]
    pub sequence_number: u32,
    #[serde(alias = "time")]
    pub elapsed_at_capture: u64,
    #[serde(alias = "timestamp", default)]
    pub captured_at_epoch_ms: i64,
}
