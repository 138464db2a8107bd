//! Ports between the pure state core and whatever displays it
//!
//! The core never touches a display surface. It pushes immutable snapshots
//! through these traits after every mutation, and asks a [`Confirm`] port
//! before anything destructive.

use crate::stopwatch::{LapLedger, StopwatchState};
use crate::tasks::{Task, TaskStats};

/// Toast severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

impl NoticeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeKind::Success => "success",
            NoticeKind::Error => "error",
            NoticeKind::Info => "info",
        }
    }
}

/// Transient user-facing notifications
pub trait Notify {
    fn notify(&mut self, message: &str, kind: NoticeKind) {
        let _ = (message, kind);
    }
}

/// Display surface for the stopwatch
pub trait StopwatchView: Notify {
    /// Current time readout; called on every tick
    fn render(&mut self, state: &StopwatchState);
    /// Lap list, most recent first
    fn render_laps(&mut self, laps: &LapLedger);
    /// Enable/disable start, pause and lap controls
    fn update_control_availability(&mut self, running: bool, elapsed_ms: u64);
}

/// Display surface for the task list
pub trait TaskView: Notify {
    fn render_tasks(&mut self, tasks: &[Task], stats: TaskStats);
}

/// Page header showing today's date
pub trait HeaderView {
    fn render_date(&mut self, label: &str);
}

/// Synchronous yes/no gate in front of destructive operations
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F: FnMut(&str) -> bool> Confirm for F {
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// A view that writes notifications to the log; for the native CLI
#[derive(Debug, Clone, Copy, Default)]
pub struct LogView;

impl Notify for LogView {
    fn notify(&mut self, message: &str, kind: NoticeKind) {
        match kind {
            NoticeKind::Error => log::warn!("{}", message),
            _ => log::info!("{}", message),
        }
    }
}

impl StopwatchView for LogView {
    fn render(&mut self, state: &StopwatchState) {
        log::debug!("Stopwatch at {}", crate::format::format_time(state.elapsed_ms));
    }
    fn render_laps(&mut self, laps: &LapLedger) {
        log::debug!("{} laps", laps.len());
    }
    fn update_control_availability(&mut self, _running: bool, _elapsed_ms: u64) {}
}

impl HeaderView for LogView {
    fn render_date(&mut self, label: &str) {
        log::debug!("Today is {}", label);
    }
}

impl TaskView for LogView {
    fn render_tasks(&mut self, _tasks: &[Task], stats: TaskStats) {
        log::debug!("{} tasks ({} completed)", stats.total, stats.completed);
    }
}
