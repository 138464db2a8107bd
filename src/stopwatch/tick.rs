//! Periodic tick scheduling
//!
//! A [`TickTimer`] is the handle to one scheduled recurring callback. The
//! callback stays registered for exactly as long as the handle lives:
//! dropping it cancels the timer. The engine keeps the handle inside its
//! running state, so leaving that state is what cancels the tick.

use std::fmt;

/// Handle to one active recurring timer
pub struct TickTimer {
    id: u64,
    cancel: Option<Box<dyn FnOnce()>>,
}

impl TickTimer {
    pub fn new(id: u64, cancel: impl FnOnce() + 'static) -> Self {
        Self {
            id,
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A handle with nothing to cancel
    pub fn inert(id: u64) -> Self {
        Self { id, cancel: None }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for TickTimer {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for TickTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickTimer").field("id", &self.id).finish()
    }
}

/// Something that can call back into the engine every `interval_ms`.
///
/// The callback target is fixed when the scheduler is built; scheduling
/// only decides when ticks start, and dropping the returned handle decides
/// when they stop.
pub trait TickScheduler {
    fn schedule(&mut self, interval_ms: u32) -> TickTimer;
}

/// Hands out timers that never fire; ticks must be driven by hand.
///
/// Used by the native CLI, where nothing renders between commands.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    next_id: u64,
}

impl TickScheduler for ManualScheduler {
    fn schedule(&mut self, interval_ms: u32) -> TickTimer {
        self.next_id += 1;
        log::debug!("Tick timer {} requested every {}ms", self.next_id, interval_ms);
        TickTimer::inert(self.next_id)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn test_drop_cancels_once() {
        let cancelled = Rc::new(Cell::new(0));
        let counter = cancelled.clone();
        let timer = TickTimer::new(7, move || counter.set(counter.get() + 1));
        assert_eq!(timer.id(), 7);
        assert_eq!(cancelled.get(), 0);
        drop(timer);
        assert_eq!(cancelled.get(), 1);
    }

    #[test]
    fn test_manual_scheduler_ids_increase() {
        let mut scheduler = ManualScheduler::default();
        let a = scheduler.schedule(10);
        let b = scheduler.schedule(10);
        assert!(b.id() > a.id());
    }
}
