//! Shared fixtures for unit tests

use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

use crate::persistence::{MemoryBackend, Store};
use crate::platform::{Clock, ManualClock};
use crate::present::{HeaderView, NoticeKind, Notify, StopwatchView, TaskView};
use crate::settings::Preferences;
use crate::stopwatch::{LapLedger, Stopwatch, StopwatchState, TickScheduler, TickTimer};
use crate::tasks::{Task, TaskList, TaskStats};

/// Everything a recording view has been asked to show
#[derive(Debug, Default)]
pub struct ViewLog {
    pub renders: Vec<StopwatchState>,
    pub lap_renders: Vec<usize>,
    pub controls: Vec<(bool, u64)>,
    pub task_renders: Vec<TaskStats>,
    pub notices: Vec<(String, NoticeKind)>,
    pub dates: Vec<String>,
}

/// View that records every call; clones share one log
#[derive(Debug, Clone, Default)]
pub struct RecordingView {
    log: Rc<RefCell<ViewLog>>,
}

impl RecordingView {
    pub fn log(&self) -> Ref<'_, ViewLog> {
        self.log.borrow()
    }
}

impl Notify for RecordingView {
    fn notify(&mut self, message: &str, kind: NoticeKind) {
        self.log
            .borrow_mut()
            .notices
            .push((message.to_string(), kind));
    }
}

impl StopwatchView for RecordingView {
    fn render(&mut self, state: &StopwatchState) {
        self.log.borrow_mut().renders.push(*state);
    }

    fn render_laps(&mut self, laps: &LapLedger) {
        self.log.borrow_mut().lap_renders.push(laps.len());
    }

    fn update_control_availability(&mut self, running: bool, elapsed_ms: u64) {
        self.log.borrow_mut().controls.push((running, elapsed_ms));
    }
}

impl TaskView for RecordingView {
    fn render_tasks(&mut self, _tasks: &[Task], stats: TaskStats) {
        self.log.borrow_mut().task_renders.push(stats);
    }
}

impl HeaderView for RecordingView {
    fn render_date(&mut self, label: &str) {
        self.log.borrow_mut().dates.push(label.to_string());
    }
}

/// Scheduler that counts live timers; clones share the count
#[derive(Debug, Clone, Default)]
pub struct CountingScheduler {
    active: Rc<Cell<usize>>,
    next_id: Rc<Cell<u64>>,
}

impl CountingScheduler {
    /// Timers scheduled and not yet dropped
    pub fn active(&self) -> usize {
        self.active.get()
    }
}

impl TickScheduler for CountingScheduler {
    fn schedule(&mut self, _interval_ms: u32) -> TickTimer {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        self.active.set(self.active.get() + 1);
        let active = self.active.clone();
        TickTimer::new(id, move || active.set(active.get() - 1))
    }
}

/// A manual clock, a store and recording ports wired together
pub struct Harness {
    pub clock: ManualClock,
    pub store: Rc<Store>,
    pub scheduler: CountingScheduler,
    pub view: RecordingView,
    pub prefs: Preferences,
}

impl Harness {
    pub fn new(start_ms: i64) -> Self {
        Self::with_backend(start_ms, MemoryBackend::new())
    }

    pub fn with_backend(start_ms: i64, backend: MemoryBackend) -> Self {
        let clock = ManualClock::new(start_ms);
        let store = Rc::new(Store::open(Box::new(backend), Rc::new(clock.clone())));
        Self {
            clock,
            store,
            scheduler: CountingScheduler::default(),
            view: RecordingView::default(),
            prefs: Preferences::default(),
        }
    }

    pub fn clock_rc(&self) -> Rc<dyn Clock> {
        Rc::new(self.clock.clone())
    }

    pub fn stopwatch(&self) -> Stopwatch {
        Stopwatch::new(
            self.store.clone(),
            self.clock_rc(),
            Box::new(self.scheduler.clone()),
            Box::new(self.view.clone()),
            &self.prefs,
        )
    }

    pub fn task_list(&self) -> TaskList {
        TaskList::new(
            self.store.clone(),
            self.clock_rc(),
            Box::new(self.view.clone()),
        )
    }
}
