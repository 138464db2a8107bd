//! Stopwatch engine
//!
//! Elapsed time is always derived from the wall clock (`now - start`), never
//! accumulated tick by tick, so late or skipped ticks cannot drift the
//! reading. Ticks only refresh the display and drive the periodic
//! checkpoint.

use std::rc::Rc;

use super::ledger::LapLedger;
use super::state::{Lap, Status, StopwatchState};
use super::tick::{TickScheduler, TickTimer};
use crate::format::format_time;
use crate::persistence::{Store, keys};
use crate::platform::Clock;
use crate::present::{NoticeKind, StopwatchView};
use crate::settings::Preferences;

/// Largest elapsed time that still fits epoch arithmetic
const MAX_ELAPSED_MS: u64 = i64::MAX as u64;

/// Whether the engine is accumulating time.
///
/// The tick handle lives inside `Running`, so there is at most one timer
/// and it cannot outlive the running state. It is `None` only while the
/// page is hidden.
enum Run {
    Stopped,
    Running { ticker: Option<TickTimer> },
}

/// Owns stopwatch state and laps; persists them through the shared store
pub struct Stopwatch {
    run: Run,
    elapsed_ms: u64,
    start_epoch_ms: i64,
    laps: LapLedger,
    store: Rc<Store>,
    clock: Rc<dyn Clock>,
    scheduler: Box<dyn TickScheduler>,
    view: Box<dyn StopwatchView>,
    tick_interval_ms: u32,
    checkpoint_every_secs: u64,
    /// Elapsed second of the last periodic checkpoint
    last_checkpoint_second: Option<u64>,
    save_failing: bool,
}

impl Stopwatch {
    /// Build an engine and recover whatever the store holds
    pub fn new(
        store: Rc<Store>,
        clock: Rc<dyn Clock>,
        scheduler: Box<dyn TickScheduler>,
        view: Box<dyn StopwatchView>,
        prefs: &Preferences,
    ) -> Self {
        let mut stopwatch = Self {
            run: Run::Stopped,
            elapsed_ms: 0,
            start_epoch_ms: 0,
            laps: LapLedger::new(),
            store,
            clock,
            scheduler,
            view,
            tick_interval_ms: prefs.tick_interval_ms.max(1),
            checkpoint_every_secs: prefs.checkpoint_every_secs,
            last_checkpoint_second: None,
            save_failing: false,
        };
        stopwatch.recover();
        stopwatch
    }

    /// Reload elapsed time and laps from the store.
    ///
    /// Always lands stopped: a stopwatch saved while running resumes as
    /// paused at its last checkpoint, since the gap since then is unknown.
    pub fn recover(&mut self) {
        let state: StopwatchState = self.store.get(keys::TIMER_STATE, StopwatchState::default());
        let laps: Vec<Lap> = self.store.get(keys::LAPS, Vec::new());

        if state.running {
            log::info!(
                "Stopwatch was running when saved, restoring paused at {}",
                format_time(state.elapsed_ms)
            );
        }

        self.run = Run::Stopped;
        self.elapsed_ms = state.elapsed_ms.min(MAX_ELAPSED_MS);
        self.start_epoch_ms = state.start_epoch_ms;
        self.laps = LapLedger::from_laps(laps);
        self.last_checkpoint_second = None;
        self.refresh_view();
    }

    pub fn status(&self) -> Status {
        self.snapshot().status()
    }

    pub fn is_running(&self) -> bool {
        matches!(self.run, Run::Running { .. })
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn laps(&self) -> &LapLedger {
        &self.laps
    }

    /// Identity of the active tick timer, if any
    pub fn ticker_id(&self) -> Option<u64> {
        match &self.run {
            Run::Running { ticker } => ticker.as_ref().map(TickTimer::id),
            Run::Stopped => None,
        }
    }

    pub fn snapshot(&self) -> StopwatchState {
        StopwatchState {
            elapsed_ms: self.elapsed_ms,
            running: self.is_running(),
            start_epoch_ms: self.start_epoch_ms,
        }
    }

    /// Bring `elapsed_ms` up to the wall clock while running
    fn sync_elapsed(&mut self) {
        if self.is_running() {
            let measured = self.clock.now_ms().saturating_sub(self.start_epoch_ms).max(0) as u64;
            self.elapsed_ms = self.elapsed_ms.max(measured);
        }
    }

    /// Start or resume. No-op while running.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        self.start_epoch_ms = self
            .clock
            .now_ms()
            .saturating_sub(self.elapsed_ms.min(MAX_ELAPSED_MS) as i64);
        let ticker = self.scheduler.schedule(self.tick_interval_ms);
        log::info!(
            "Stopwatch started at {} (tick timer {})",
            format_time(self.elapsed_ms),
            ticker.id()
        );
        self.run = Run::Running {
            ticker: Some(ticker),
        };

        self.view.update_control_availability(true, self.elapsed_ms);
        let state = self.snapshot();
        self.view.render(&state);
        self.view.notify("Stopwatch started", NoticeKind::Info);
    }

    /// One scheduled tick: refresh elapsed time, render, maybe checkpoint.
    ///
    /// Ticks that arrive while stopped are ignored.
    pub fn tick(&mut self) {
        if !self.is_running() {
            return;
        }
        self.sync_elapsed();
        let state = self.snapshot();
        self.view.render(&state);
        self.view.update_control_availability(true, self.elapsed_ms);

        // Best effort: fires at most once per qualifying second, and a
        // qualifying second can be missed if no tick lands inside it.
        if self.checkpoint_every_secs > 0 {
            let second = self.elapsed_ms / 1000;
            if second % self.checkpoint_every_secs == 0
                && self.last_checkpoint_second != Some(second)
            {
                self.last_checkpoint_second = Some(second);
                self.checkpoint();
            }
        }
    }

    /// Pause. No-op unless running.
    pub fn pause(&mut self) {
        if !self.is_running() {
            return;
        }
        self.sync_elapsed();
        // Dropping the running state cancels its tick timer
        self.run = Run::Stopped;
        log::info!("Stopwatch paused at {}", format_time(self.elapsed_ms));

        self.view.update_control_availability(false, self.elapsed_ms);
        let state = self.snapshot();
        self.view.render(&state);
        self.checkpoint();
        self.view.notify("Stopwatch paused", NoticeKind::Info);
    }

    /// Start when stopped, pause when running
    pub fn toggle(&mut self) {
        if self.is_running() {
            self.pause();
        } else {
            self.start();
        }
    }

    /// Back to idle, dropping elapsed time and every lap.
    ///
    /// Unconditional; callers ask for confirmation first.
    pub fn reset(&mut self) {
        self.run = Run::Stopped;
        self.elapsed_ms = 0;
        self.start_epoch_ms = 0;
        self.laps.clear();
        self.last_checkpoint_second = None;
        log::info!("Stopwatch reset");

        self.refresh_view();
        self.checkpoint();
        self.view.notify("Stopwatch reset", NoticeKind::Success);
    }

    /// Capture the current elapsed time as a new lap.
    ///
    /// Returns the lap's sequence number, or `None` when nothing has been
    /// timed yet.
    pub fn record_lap(&mut self) -> Option<u32> {
        self.sync_elapsed();
        if self.elapsed_ms == 0 {
            return None;
        }

        let now = self.clock.now_ms();
        let sequence_number = self.laps.next_sequence();
        self.laps.append(Lap {
            id: crate::unique_id(now),
            sequence_number,
            elapsed_at_capture: self.elapsed_ms,
            captured_at_epoch_ms: now,
        });
        log::info!(
            "Lap {} recorded at {}",
            sequence_number,
            format_time(self.elapsed_ms)
        );

        self.view.render_laps(&self.laps);
        self.view.update_control_availability(self.is_running(), self.elapsed_ms);
        self.checkpoint();
        self.view.notify(
            &format!("Lap {} recorded", sequence_number),
            NoticeKind::Success,
        );
        Some(sequence_number)
    }

    /// Drop every lap, keeping elapsed time.
    ///
    /// Unconditional; callers ask for confirmation first.
    pub fn clear_laps(&mut self) {
        self.laps.clear();
        self.view.render_laps(&self.laps);
        self.view.update_control_availability(self.is_running(), self.elapsed_ms);
        self.checkpoint();
        self.view.notify("Laps cleared", NoticeKind::Info);
    }

    /// Save now, with elapsed time brought up to date
    pub fn flush(&mut self) -> bool {
        self.sync_elapsed();
        self.checkpoint()
    }

    /// Page hidden or unloading: save, then stop ticking.
    ///
    /// The stopwatch stays logically running; elapsed time keeps following
    /// the wall clock and [`resume`](Self::resume) picks the display back up.
    pub fn suspend(&mut self) {
        self.flush();
        if let Run::Running { ticker } = &mut self.run {
            if let Some(timer) = ticker.take() {
                log::debug!("Tick timer {} suspended", timer.id());
            }
        }
    }

    /// Page visible again: restart ticking if running
    pub fn resume(&mut self) {
        let needs_timer = matches!(self.run, Run::Running { ticker: None });
        if needs_timer {
            let timer = self.scheduler.schedule(self.tick_interval_ms);
            log::debug!("Tick timer {} resumed", timer.id());
            self.run = Run::Running {
                ticker: Some(timer),
            };
            self.tick();
        }
    }

    /// Plain-text lap report, oldest first
    pub fn export_laps_text(&self) -> String {
        self.laps.export_text()
    }

    /// Render everything from scratch
    pub fn refresh_view(&mut self) {
        let state = self.snapshot();
        self.view.render(&state);
        self.view.render_laps(&self.laps);
        self.view.update_control_availability(state.running, state.elapsed_ms);
    }

    /// Write state and laps to the store.
    ///
    /// A failed write leaves in-memory state untouched; the user hears
    /// about it once per run of consecutive failures.
    fn checkpoint(&mut self) -> bool {
        let state = self.snapshot();
        let result = self
            .store
            .set(keys::TIMER_STATE, &state)
            .and_then(|()| self.store.set(keys::LAPS, &self.laps.to_vec()));

        match result {
            Ok(()) => {
                if self.save_failing {
                    log::info!("Stopwatch saves are succeeding again");
                }
                self.save_failing = false;
                true
            }
            Err(e) => {
                if !self.save_failing {
                    log::warn!("Could not save stopwatch: {}", e);
                    self.view.notify("Could not save the stopwatch", NoticeKind::Error);
                }
                self.save_failing = true;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryBackend;
    use crate::testing::Harness;
    use proptest::prelude::*;

    fn stored_state(harness: &Harness) -> StopwatchState {
        harness.store.get(keys::TIMER_STATE, StopwatchState::default())
    }

    #[test]
    fn test_start_pause_resume_scenario() {
        let h = Harness::new(0);
        let mut sw = h.stopwatch();
        assert_eq!(sw.status(), Status::Idle);

        sw.start();
        h.clock.set(1_500);
        sw.pause();
        assert_eq!(sw.elapsed_ms(), 1_500);
        assert_eq!(sw.status(), Status::Paused);

        h.clock.set(2_000);
        sw.start();
        h.clock.set(2_700);
        sw.pause();
        assert_eq!(sw.elapsed_ms(), 2_200);
        assert_eq!(stored_state(&h).elapsed_ms, 2_200);
        assert!(!stored_state(&h).running);
    }

    #[test]
    fn test_start_while_running_is_noop() {
        let h = Harness::new(100);
        let mut sw = h.stopwatch();
        sw.start();
        let id = sw.ticker_id();
        let before = sw.snapshot();

        h.clock.set(600);
        sw.start();
        assert_eq!(sw.ticker_id(), id);
        assert_eq!(sw.snapshot(), before);
        assert_eq!(h.scheduler.active(), 1);
    }

    #[test]
    fn test_leaving_running_cancels_timer() {
        let h = Harness::new(0);
        let mut sw = h.stopwatch();
        sw.start();
        assert_eq!(h.scheduler.active(), 1);
        h.clock.set(10);
        sw.pause();
        assert_eq!(h.scheduler.active(), 0);
        assert_eq!(sw.ticker_id(), None);

        sw.start();
        assert_eq!(h.scheduler.active(), 1);
        sw.reset();
        assert_eq!(h.scheduler.active(), 0);
        assert_eq!(sw.status(), Status::Idle);
    }

    #[test]
    fn test_tick_tracks_wall_clock() {
        let h = Harness::new(1_000);
        let mut sw = h.stopwatch();
        sw.start();
        h.clock.set(1_010);
        sw.tick();
        // A late tick still reads the true elapsed time
        h.clock.set(1_777);
        sw.tick();
        assert_eq!(sw.elapsed_ms(), 777);
        assert_eq!(h.view.log().renders.last().unwrap().elapsed_ms, 777);
    }

    #[test]
    fn test_elapsed_never_decreases_while_running() {
        let h = Harness::new(5_000);
        let mut sw = h.stopwatch();
        sw.start();
        h.clock.set(6_000);
        sw.tick();
        h.clock.set(5_500);
        sw.tick();
        assert_eq!(sw.elapsed_ms(), 1_000);
    }

    #[test]
    fn test_ticks_after_pause_are_ignored() {
        let h = Harness::new(0);
        let mut sw = h.stopwatch();
        sw.start();
        h.clock.set(300);
        sw.pause();
        h.clock.set(9_000);
        sw.tick();
        assert_eq!(sw.elapsed_ms(), 300);
    }

    #[test]
    fn test_periodic_checkpoint_once_per_fifth_second() {
        let h = Harness::new(0);
        let mut sw = h.stopwatch();
        sw.start();

        h.clock.set(10);
        sw.tick();
        assert_eq!(stored_state(&h).elapsed_ms, 10);

        h.clock.set(4_990);
        sw.tick();
        assert_eq!(stored_state(&h).elapsed_ms, 10);

        h.clock.set(5_000);
        sw.tick();
        assert_eq!(stored_state(&h).elapsed_ms, 5_000);
        assert!(stored_state(&h).running);

        h.clock.set(5_010);
        sw.tick();
        assert_eq!(stored_state(&h).elapsed_ms, 5_000);

        // Tick granularity can skip a qualifying second entirely
        h.clock.set(14_990);
        sw.tick();
        h.clock.set(15_020);
        sw.tick();
        assert_eq!(stored_state(&h).elapsed_ms, 15_020);
    }

    #[test]
    fn test_lap_at_zero_is_noop() {
        let h = Harness::new(0);
        let mut sw = h.stopwatch();
        assert_eq!(sw.record_lap(), None);
        sw.start();
        assert_eq!(sw.record_lap(), None);
        assert!(sw.laps().is_empty());
    }

    #[test]
    fn test_lap_scenario() {
        let h = Harness::new(0);
        let mut sw = h.stopwatch();
        sw.start();
        h.clock.set(1_000);
        assert_eq!(sw.record_lap(), Some(1));
        h.clock.set(2_500);
        assert_eq!(sw.record_lap(), Some(2));

        let laps = sw.laps();
        assert_eq!(laps.get(0).unwrap().sequence_number, 2);
        assert_eq!(laps.get(0).unwrap().elapsed_at_capture, 2_500);
        assert_eq!(laps.get(1).unwrap().sequence_number, 1);
        assert_eq!(laps.get(1).unwrap().elapsed_at_capture, 1_000);
        let delta = laps.delta(0).unwrap();
        assert_eq!(delta.absolute_difference, 1_500);
        assert!(!delta.faster);

        let stored: Vec<Lap> = h.store.get(keys::LAPS, Vec::new());
        assert_eq!(stored, laps.to_vec());
    }

    #[test]
    fn test_lap_while_paused() {
        let h = Harness::new(0);
        let mut sw = h.stopwatch();
        sw.start();
        h.clock.set(800);
        sw.pause();
        h.clock.set(5_000);
        assert_eq!(sw.record_lap(), Some(1));
        assert_eq!(sw.laps().get(0).unwrap().elapsed_at_capture, 800);
    }

    #[test]
    fn test_reset_saves_empty_state() {
        let h = Harness::new(0);
        let mut sw = h.stopwatch();
        sw.start();
        h.clock.set(3_000);
        sw.record_lap();
        sw.reset();

        assert_eq!(sw.elapsed_ms(), 0);
        assert!(sw.laps().is_empty());
        assert_eq!(stored_state(&h), StopwatchState::default());
        let stored: Vec<Lap> = h.store.get(keys::LAPS, vec![]);
        assert!(stored.is_empty());
    }

    #[test]
    fn test_recovery_never_auto_resumes() {
        let h = Harness::new(50_000);
        let persisted = StopwatchState {
            elapsed_ms: 12_000,
            running: true,
            start_epoch_ms: 38_000,
        };
        h.store.set(keys::TIMER_STATE, &persisted).unwrap();

        let sw = h.stopwatch();
        assert!(!sw.is_running());
        assert_eq!(sw.status(), Status::Paused);
        assert_eq!(sw.elapsed_ms(), 12_000);
        assert_eq!(h.scheduler.active(), 0);
    }

    #[test]
    fn test_recovery_restores_laps() {
        let h = Harness::new(0);
        {
            let mut sw = h.stopwatch();
            sw.start();
            h.clock.set(1_000);
            sw.record_lap();
            h.clock.set(2_000);
            sw.record_lap();
            sw.suspend();
        }
        let sw = h.stopwatch();
        assert_eq!(sw.laps().len(), 2);
        assert_eq!(sw.elapsed_ms(), 2_000);
        assert_eq!(sw.laps().next_sequence(), 3);
    }

    #[test]
    fn test_suspend_and_resume() {
        let h = Harness::new(0);
        let mut sw = h.stopwatch();
        sw.start();
        let first = sw.ticker_id();

        h.clock.set(4_000);
        sw.suspend();
        assert_eq!(h.scheduler.active(), 0);
        assert!(sw.is_running());
        assert_eq!(stored_state(&h).elapsed_ms, 4_000);

        h.clock.set(9_000);
        sw.resume();
        assert_eq!(h.scheduler.active(), 1);
        assert_ne!(sw.ticker_id(), first);
        assert_eq!(sw.elapsed_ms(), 9_000);

        // Resuming twice doesn't stack timers
        sw.resume();
        assert_eq!(h.scheduler.active(), 1);
    }

    #[test]
    fn test_clear_laps_keeps_elapsed() {
        let h = Harness::new(0);
        let mut sw = h.stopwatch();
        sw.start();
        h.clock.set(1_200);
        sw.record_lap();
        sw.pause();
        sw.clear_laps();
        assert!(sw.laps().is_empty());
        assert_eq!(sw.elapsed_ms(), 1_200);
        assert_eq!(h.view.log().lap_renders.last(), Some(&0));
        assert_eq!(h.view.log().controls.last(), Some(&(false, 1_200)));
    }

    #[test]
    fn test_lap_refreshes_controls() {
        let h = Harness::new(0);
        let mut sw = h.stopwatch();
        sw.start();
        h.clock.set(700);
        sw.record_lap();
        assert_eq!(h.view.log().controls.last(), Some(&(true, 700)));
    }

    #[test]
    fn test_huge_stored_elapsed_starts_without_overflow() {
        let h = Harness::new(1_700_000_000_000);
        h.store
            .set(
                keys::TIMER_STATE,
                &serde_json::json!({ "elapsedMs": 9_223_372_036_854_775_808u64 }),
            )
            .unwrap();

        let mut sw = h.stopwatch();
        assert_eq!(sw.elapsed_ms(), i64::MAX as u64);
        sw.start();
        h.clock.advance(1_000);
        sw.tick();
        sw.pause();
        assert_eq!(sw.elapsed_ms(), i64::MAX as u64);
        assert!(!sw.is_running());
    }

    #[test]
    fn test_toggle() {
        let h = Harness::new(0);
        let mut sw = h.stopwatch();
        sw.toggle();
        assert!(sw.is_running());
        h.clock.set(40);
        sw.toggle();
        assert!(!sw.is_running());
        assert_eq!(sw.elapsed_ms(), 40);
    }

    #[test]
    fn test_failed_saves_notify_once() {
        let h = Harness::with_backend(0, MemoryBackend::with_capacity(100));
        let mut sw = h.stopwatch();
        sw.start();
        h.clock.set(1_000);
        sw.pause();
        sw.start();
        h.clock.set(2_000);
        sw.pause();

        assert_eq!(sw.elapsed_ms(), 2_000);
        let errors = h
            .view
            .log()
            .notices
            .iter()
            .filter(|(_, kind)| *kind == NoticeKind::Error)
            .count();
        assert_eq!(errors, 1);
    }

    #[test]
    fn test_view_sees_every_mutation() {
        let h = Harness::new(0);
        let mut sw = h.stopwatch();
        let baseline = h.view.log().renders.len();
        sw.start();
        h.clock.set(20);
        sw.tick();
        sw.pause();
        assert_eq!(h.view.log().renders.len(), baseline + 3);
        assert_eq!(h.view.log().controls.last(), Some(&(false, 20)));
    }

    proptest! {
        #[test]
        fn prop_elapsed_is_sum_of_running_intervals(
            intervals in prop::collection::vec((0i64..100_000, 0i64..100_000), 1..20)
        ) {
            let h = Harness::new(1_000_000);
            let mut sw = h.stopwatch();
            let mut expected = 0u64;
            for (gap, run) in intervals {
                h.clock.advance(gap);
                sw.start();
                h.clock.advance(run / 2);
                sw.tick();
                h.clock.advance(run - run / 2);
                sw.pause();
                expected += run as u64;
            }
            prop_assert_eq!(sw.elapsed_ms(), expected);
            prop_assert_eq!(h.scheduler.active(), 0);
        }
    }
}
