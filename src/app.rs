//! Widget composition root
//!
//! Builds the stopwatch and task list over one shared store and puts the
//! confirmation gate in front of every destructive action.

use std::rc::Rc;

use crate::error::{Result, StoreError};
use crate::persistence::{Backup, ImportReport, Store};
use crate::platform::Clock;
use crate::format::{format_date, ms_until_next_midnight};
use crate::present::{Confirm, HeaderView, NoticeKind, Notify, StopwatchView, TaskView};
use crate::settings::Preferences;
use crate::stopwatch::{Stopwatch, TickScheduler};
use crate::tasks::TaskList;

/// Platform pieces the widget is assembled from
pub struct Ports {
    pub scheduler: Box<dyn TickScheduler>,
    pub stopwatch_view: Box<dyn StopwatchView>,
    pub task_view: Box<dyn TaskView>,
    pub header: Box<dyn HeaderView>,
    /// Widget-level notices (saves, imports, clears)
    pub notices: Box<dyn Notify>,
    pub confirm: Box<dyn Confirm>,
}

pub struct Widget {
    store: Rc<Store>,
    clock: Rc<dyn Clock>,
    prefs: Preferences,
    stopwatch: Stopwatch,
    tasks: TaskList,
    header: Box<dyn HeaderView>,
    notices: Box<dyn Notify>,
    confirm: Box<dyn Confirm>,
}

impl Widget {
    pub fn new(store: Rc<Store>, clock: Rc<dyn Clock>, ports: Ports) -> Self {
        let prefs = Preferences::load(&store);
        let stopwatch = Stopwatch::new(
            store.clone(),
            clock.clone(),
            ports.scheduler,
            ports.stopwatch_view,
            &prefs,
        );
        let tasks = TaskList::new(store.clone(), clock.clone(), ports.task_view);
        log::info!(
            "Widget ready: {} tasks, {} laps{}",
            tasks.tasks().len(),
            stopwatch.laps().len(),
            if store.is_memory_only() {
                " (memory only)"
            } else {
                ""
            }
        );

        let mut widget = Self {
            store,
            clock,
            prefs,
            stopwatch,
            tasks,
            header: ports.header,
            notices: ports.notices,
            confirm: ports.confirm,
        };
        widget.refresh_date();
        widget
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn prefs(&self) -> &Preferences {
        &self.prefs
    }

    pub fn stopwatch(&self) -> &Stopwatch {
        &self.stopwatch
    }

    pub fn stopwatch_mut(&mut self) -> &mut Stopwatch {
        &mut self.stopwatch
    }

    pub fn tasks(&self) -> &TaskList {
        &self.tasks
    }

    pub fn tasks_mut(&mut self) -> &mut TaskList {
        &mut self.tasks
    }

    /// Turn toasts on or off and persist the choice
    pub fn set_notifications(&mut self, enabled: bool) -> Result<()> {
        self.prefs.notifications = enabled;
        self.prefs.save(&self.store)
    }

    /// Render today's date into the header. Returns the label.
    pub fn refresh_date(&mut self) -> String {
        let now = self.clock.now_ms();
        let label = format_date(now, self.clock.utc_offset_minutes(now));
        self.header.render_date(&label);
        label
    }

    /// Delay until the header date next changes
    pub fn ms_until_midnight(&self) -> i64 {
        let now = self.clock.now_ms();
        ms_until_next_midnight(now, self.clock.utc_offset_minutes(now))
    }

    pub fn toggle_stopwatch(&mut self) {
        self.stopwatch.toggle();
    }

    /// Reset the stopwatch, asking first when there is anything to lose
    pub fn reset_stopwatch(&mut self) -> bool {
        let has_state = self.stopwatch.elapsed_ms() > 0 || !self.stopwatch.laps().is_empty();
        if has_state && !self.confirm.confirm("Reset the stopwatch? All laps will be lost.") {
            return false;
        }
        self.stopwatch.reset();
        true
    }

    pub fn clear_laps(&mut self) -> bool {
        if self.stopwatch.laps().is_empty() {
            self.notices.notify("No laps to clear", NoticeKind::Info);
            return false;
        }
        if !self.confirm.confirm("Clear all laps?") {
            return false;
        }
        self.stopwatch.clear_laps();
        true
    }

    pub fn clear_completed_tasks(&mut self) -> usize {
        let completed = self.tasks.completed_count();
        if completed == 0 {
            self.notices.notify("No completed tasks", NoticeKind::Info);
            return 0;
        }
        let prompt = format!("Remove {} completed task(s)?", completed);
        if !self.confirm.confirm(&prompt) {
            return 0;
        }
        self.tasks.clear_completed()
    }

    /// Wipe every widget key after two confirmations
    pub fn clear_all_data(&mut self) -> bool {
        if !self.confirm.confirm("Delete ALL data? This cannot be undone.") {
            return false;
        }
        if !self.confirm.confirm("Are you absolutely sure?") {
            return false;
        }

        if let Err(e) = self.store.clear_all() {
            log::error!("Clearing data failed: {}", e);
            self.notices.notify("Could not clear all data", NoticeKind::Error);
            return false;
        }
        self.prefs = Preferences::default();
        self.stopwatch.recover();
        self.tasks.reload();
        self.notices.notify("All data cleared", NoticeKind::Success);
        true
    }

    /// Save everything, then return the pretty-printed backup
    pub fn export_backup(&mut self) -> Result<String> {
        self.save_now();
        let json = self.store.export_all().to_json_pretty()?;
        self.notices.notify("Data exported", NoticeKind::Success);
        Ok(json)
    }

    /// Suggested file name for an export made now
    pub fn backup_file_name(&self) -> String {
        Backup::file_name(self.clock.now_ms())
    }

    /// Replace stored data with a backup after confirmation.
    ///
    /// `Ok(None)` when the user declined. A backup that is not a JSON
    /// object is rejected before anything is asked or written.
    pub fn import_backup(&mut self, raw: &str) -> Result<Option<ImportReport>> {
        let snapshot = match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(value) if value.is_object() => value,
            _ => {
                self.notices.notify("Invalid backup file", NoticeKind::Error);
                return Err(StoreError::MalformedImport(
                    "backup is not a JSON object".to_string(),
                ));
            }
        };
        if !self.confirm.confirm("Importing will replace your current data. Continue?") {
            return Ok(None);
        }

        let report = self.store.import_all(&snapshot)?;
        self.stopwatch.recover();
        self.tasks.reload();

        if report.is_clean() {
            self.notices.notify("Data imported", NoticeKind::Success);
        } else {
            let rejected: Vec<&str> = report.rejected.iter().map(|(field, _)| *field).collect();
            self.notices.notify(
                &format!("Imported with errors in: {}", rejected.join(", ")),
                NoticeKind::Error,
            );
        }
        Ok(Some(report))
    }

    /// Ctrl/Cmd+S
    pub fn save_now(&mut self) -> bool {
        let stopwatch_saved = self.stopwatch.flush();
        let tasks_saved = self.tasks.save();
        let saved = stopwatch_saved && tasks_saved;
        if saved {
            self.notices.notify("Saved", NoticeKind::Success);
        }
        saved
    }

    pub fn on_hidden(&mut self) {
        self.stopwatch.suspend();
        self.tasks.save();
    }

    pub fn on_visible(&mut self) {
        self.refresh_date();
        self.stopwatch.resume();
    }

    pub fn on_unload(&mut self) {
        self.on_hidden();
    }

    /// Ctrl/Cmd+Shift+D
    pub fn debug_info(&self) -> String {
        let stats = self.store.stats();
        let info = serde_json::json!({
            "app": crate::consts::APP_NAME,
            "version": crate::consts::SCHEMA_VERSION,
            "memoryOnly": self.store.is_memory_only(),
            "stopwatch": self.stopwatch.snapshot(),
            "status": format!("{:?}", self.stopwatch.status()),
            "laps": self.stopwatch.laps().len(),
            "tasks": self.tasks.stats().total,
            "completedTasks": self.tasks.stats().completed,
            "storageKiB": format!("{:.2}", stats.total_kib()),
            "storageItems": stats.items,
            "preferences": self.prefs,
        });
        serde_json::to_string_pretty(&info).unwrap_or_else(|_| info.to_string())
    }
}
