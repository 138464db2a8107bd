//! Stopwatch
//!
//! Elapsed time follows the wall clock; laps are kept most-recent-first.

pub mod engine;
pub mod ledger;
pub mod state;
pub mod tick;

pub use engine::Stopwatch;
pub use ledger::{LapDelta, LapLedger};
pub use state::{Lap, Status, StopwatchState};
pub use tick::{ManualScheduler, TickScheduler, TickTimer};
