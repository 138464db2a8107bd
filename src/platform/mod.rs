//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Wall-clock time
//! - Storage (LocalStorage on web, a JSON file natively)
//! - Tick timers (`setInterval` on web)
//! - Display and confirmation dialogs

pub mod time;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use time::{Clock, ManualClock, SystemClock};
