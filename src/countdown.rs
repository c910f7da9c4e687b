// countdown.rs - Time remaining until launch
//
// Whole days/hours/minutes/seconds via integer division, never negative.
// The minute watcher is what triggers the bloom and ripple effects.

use std::fmt;

use serde::Serialize;

/// 2026-01-01T00:00:00Z
pub const DEFAULT_TARGET_MS: i64 = 1_767_225_600_000;

const SECOND: i64 = 1000;
const MINUTE: i64 = 60 * SECOND;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Remaining {
    pub days: u32,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
}

impl Remaining {
    /// Time left from `now_ms` to `target_ms` (unix ms). All zero once passed.
    pub fn until(now_ms: i64, target_ms: i64) -> Self {
        let diff = target_ms.saturating_sub(now_ms);
        if diff <= 0 {
            return Self::default();
        }

        Self {
            days: (diff / DAY).min(u32::MAX as i64) as u32,
            hours: ((diff % DAY) / HOUR) as u8,
            minutes: ((diff % HOUR) / MINUTE) as u8,
            seconds: ((diff % MINUTE) / SECOND) as u8,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    /// The eight dot-matrix digits, DD HH MM SS. Days past 99 show as 99.
    pub fn digits(&self) -> [u8; 8] {
        let days = self.days.min(99) as u8;
        [
            days / 10, days % 10,
            self.hours / 10, self.hours % 10,
            self.minutes / 10, self.minutes % 10,
            self.seconds / 10, self.seconds % 10,
        ]
    }
}

impl fmt::Display for Remaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}:{:02}", self.days, self.hours, self.minutes, self.seconds)
    }
}

/// Reports when the minutes value differs from the previous observation
#[derive(Debug, Default)]
pub struct MinuteWatch {
    prev: Option<u8>,
}

impl MinuteWatch {
    /// Never fires on the first observation
    pub fn observe(&mut self, r: &Remaining) -> bool {
        let changed = self.prev.is_some_and(|m| m != r.minutes);
        self.prev = Some(r.minutes);
        changed
    }
}

/// Target plus change detection, polled by the page once a second
#[derive(Debug)]
pub struct Countdown {
    target_ms: i64,
    watch: MinuteWatch,
}

impl Countdown {
    pub fn new(target_ms: i64) -> Self {
        Self { target_ms, watch: MinuteWatch::default() }
    }

    pub fn target_ms(&self) -> i64 {
        self.target_ms
    }

    /// Returns the remaining time and whether the minutes just rolled over
    pub fn tick(&mut self, now_ms: i64) -> (Remaining, bool) {
        let r = Remaining::until(now_ms, self.target_ms);
        let changed = self.watch.observe(&r);
        (r, changed)
    }
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_MS)
    }
}
