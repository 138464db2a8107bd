//! Wall-clock access
//!
//! Everything that needs "now" takes a [`Clock`] so tests and replays can
//! drive time by hand.

use std::cell::Cell;
use std::rc::Rc;

/// Source of wall-clock time in Unix epoch milliseconds
pub trait Clock {
    fn now_ms(&self) -> i64;

    /// Local time zone offset east of UTC at `epoch_ms`, in minutes
    fn utc_offset_minutes(&self, epoch_ms: i64) -> i32 {
        let _ = epoch_ms;
        0
    }
}

/// The real clock (`Date.now()` in the browser, `SystemTime` natively)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[cfg(target_arch = "wasm32")]
    fn now_ms(&self) -> i64 {
        js_sys::Date::now() as i64
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn now_ms(&self) -> i64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }

    #[cfg(target_arch = "wasm32")]
    fn utc_offset_minutes(&self, epoch_ms: i64) -> i32 {
        // getTimezoneOffset is minutes west of UTC
        let date = js_sys::Date::new(&wasm_bindgen::JsValue::from_f64(epoch_ms as f64));
        -(date.get_timezone_offset() as i32)
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn utc_offset_minutes(&self, epoch_ms: i64) -> i32 {
        use chrono::{Local, TimeZone};
        Local
            .timestamp_millis_opt(epoch_ms)
            .single()
            .map(|dt| dt.offset().local_minus_utc() / 60)
            .unwrap_or(0)
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same instant.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<i64>>,
    offset_minutes: Rc<Cell<i32>>,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: Rc::new(Cell::new(start_ms)),
            offset_minutes: Rc::new(Cell::new(0)),
        }
    }

    pub fn set_utc_offset(&self, minutes: i32) {
        self.offset_minutes.set(minutes);
    }

    pub fn set(&self, now_ms: i64) {
        self.now.set(now_ms);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now.set(self.now.get() + delta_ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.get()
    }

    fn utc_offset_minutes(&self, _epoch_ms: i64) -> i32 {
        self.offset_minutes.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new(1_000);
        let other = clock.clone();
        clock.advance(250);
        assert_eq!(other.now_ms(), 1_250);
        other.set(5);
        assert_eq!(clock.now_ms(), 5);
        other.set_utc_offset(-180);
        assert_eq!(clock.utc_offset_minutes(5), -180);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_system_clock_is_after_2020() {
        assert!(SystemClock.now_ms() > 1_577_836_800_000);
    }
}
