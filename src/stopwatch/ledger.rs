//! Lap ledger
//!
//! Laps are held most-recent-first, which is how they are displayed and
//! stored. Chronological order is a reversed view, never a second copy.

use std::collections::VecDeque;

use super::state::Lap;
use crate::format::format_time;

/// Difference between a lap and the one recorded before it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LapDelta {
    pub absolute_difference: u64,
    /// The later lap captured a smaller elapsed time than the earlier one
    pub faster: bool,
}

/// Ordered laps, index 0 being the most recent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LapLedger {
    laps: VecDeque<Lap>,
}

impl LapLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a stored list, restoring most-recent-first order by
    /// sequence number
    pub fn from_laps(mut laps: Vec<Lap>) -> Self {
        laps.sort_by(|a, b| b.sequence_number.cmp(&a.sequence_number));
        Self { laps: laps.into() }
    }

    /// Record a lap as the most recent
    pub fn append(&mut self, lap: Lap) {
        self.laps.push_front(lap);
    }

    /// Sequence number the next recorded lap gets
    pub fn next_sequence(&self) -> u32 {
        self.laps.len() as u32 + 1
    }

    pub fn len(&self) -> usize {
        self.laps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.laps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Lap> {
        self.laps.get(index)
    }

    /// Most recent first
    pub fn iter(&self) -> impl Iterator<Item = &Lap> {
        self.laps.iter()
    }

    /// Delta of the lap at `index` against the lap recorded just before it.
    ///
    /// `None` for the first lap ever recorded (the last index) and for
    /// indices out of range.
    pub fn delta(&self, index: usize) -> Option<LapDelta> {
        let lap = self.laps.get(index)?;
        let prior = self.laps.get(index + 1)?;
        Some(LapDelta {
            absolute_difference: lap.elapsed_at_capture.abs_diff(prior.elapsed_at_capture),
            faster: lap.elapsed_at_capture < prior.elapsed_at_capture,
        })
    }

    /// Oldest first. Calling again restarts from the oldest lap.
    pub fn export_chronological(&self) -> impl Iterator<Item = &Lap> + Clone {
        self.laps.iter().rev()
    }

    pub fn clear(&mut self) {
        self.laps.clear();
    }

    /// Storage order copy (most recent first)
    pub fn to_vec(&self) -> Vec<Lap> {
        self.laps.iter().cloned().collect()
    }

    /// Plain-text report, oldest lap first
    pub fn export_text(&self) -> String {
        if self.laps.is_empty() {
            return "No laps recorded".to_string();
        }
        let mut text = String::from("LAPS RECORDED\n=============\n\n");
        for lap in self.export_chronological() {
            text.push_str(&format!(
                "Lap {}: {}\n",
                lap.sequence_number,
                format_time(lap.elapsed_at_capture)
            ));
        }
        text
    }
}
