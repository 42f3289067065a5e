// Copyright 2026-Present telemetrics-client contributors
// SPDX-License-Identifier: Apache-2.0

use telem_common::constants::RATE_LIMIT_SLOTS;

/// One 60-slot sliding window over wall-clock minutes. `check` never
/// mutates state; `update` commits an increment and clears the slots a
/// later `check` in the same pass through the hour must not see stale.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    slots: [i64; RATE_LIMIT_SLOTS],
}

impl Default for SlidingWindow {
    fn default() -> Self {
        SlidingWindow {
            slots: [0; RATE_LIMIT_SLOTS],
        }
    }
}

impl SlidingWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sums the `window_length` slots ending at `current_minute` (wrapping)
    /// and reports whether adding `incr` would stay within `limit` without
    /// overflowing.
    pub fn check(&self, current_minute: usize, limit: i64, window_length: usize, incr: i64) -> bool {
        let start = (current_minute + RATE_LIMIT_SLOTS - window_length + 1) % RATE_LIMIT_SLOTS;
        let mut sum: i64 = 0;
        for i in 0..window_length {
            let slot = (start + i) % RATE_LIMIT_SLOTS;
            match sum.checked_add(self.slots[slot]) {
                Some(s) => sum = s,
                None => return false,
            }
        }
        match sum.checked_add(incr) {
            Some(total) => total <= limit,
            None => false,
        }
    }

    /// Commits `incr` into the current minute's slot, then zeros the slots
    /// immediately following the window so the next pass through the hour
    /// starts clean.
    pub fn update(&mut self, current_minute: usize, window_length: usize, incr: i64) {
        self.slots[current_minute % RATE_LIMIT_SLOTS] += incr;
        let stale_count = RATE_LIMIT_SLOTS - window_length;
        for i in 1..=stale_count {
            let slot = (current_minute + i) % RATE_LIMIT_SLOTS;
            self.slots[slot] = 0;
        }
    }

    pub fn slots(&self) -> &[i64; RATE_LIMIT_SLOTS] {
        &self.slots
    }
}

/// A single enable/disable axis: a negative limit disables the axis
/// entirely, and `check` always passes when disabled.
#[derive(Debug, Clone)]
pub struct Axis {
    window: SlidingWindow,
    limit: i64,
    window_length: usize,
}

impl Axis {
    pub fn new(limit: i64, window_length: i64) -> Self {
        Axis {
            window: SlidingWindow::new(),
            limit,
            window_length: window_length.max(1) as usize,
        }
    }

    pub fn enabled(&self) -> bool {
        self.limit >= 0
    }

    pub fn check(&self, current_minute: usize, incr: i64) -> bool {
        if !self.enabled() {
            return true;
        }
        self.window.check(current_minute, self.limit, self.window_length, incr)
    }

    pub fn update(&mut self, current_minute: usize, incr: i64) {
        if self.enabled() {
            self.window.update(current_minute, self.window_length, incr);
        }
    }
}

/// The record-count and byte-count axes together. If both axes are
/// disabled the limiter never blocks anything for the life of the daemon.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    pub records: Axis,
    pub bytes: Axis,
    pub enabled: bool,
}

impl RateLimiter {
    pub fn new(
        enabled: bool,
        record_burst_limit: i64,
        record_window_length: i64,
        byte_burst_limit: i64,
        byte_window_length: i64,
    ) -> Self {
        RateLimiter {
            records: Axis::new(record_burst_limit, record_window_length),
            bytes: Axis::new(byte_burst_limit, byte_window_length),
            enabled,
        }
    }

    /// Returns true if a record of `payload_len` bytes may proceed at
    /// `current_minute` without exceeding either axis.
    pub fn check(&self, current_minute: usize, payload_len: i64) -> bool {
        if !self.enabled {
            return true;
        }
        self.records.check(current_minute, 1) && self.bytes.check(current_minute, payload_len)
    }

    pub fn update(&mut self, current_minute: usize, payload_len: i64) {
        if !self.enabled {
            return;
        }
        self.records.update(current_minute, 1);
        self.bytes.update(current_minute, payload_len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_window_always_checks_out() {
        let window = SlidingWindow::new();
        assert!(window.check(30, 10, 15, 1));
    }

    #[test]
    fn update_then_check_reflects_increment() {
        let mut window = SlidingWindow::new();
        window.update(10, 15, 5);
        assert!(window.check(10, 5, 15, 0));
        assert!(!window.check(10, 4, 15, 0));
    }

    #[test]
    fn update_clears_slots_outside_window() {
        let mut window = SlidingWindow::new();
        // populate a slot that should be cleared on the next update
        window.update(5, 15, 3);
        let before = window.slots()[20];
        window.update(5, 15, 1);
        let after = window.slots()[20];
        assert_eq!(before, 0);
        assert_eq!(after, 0);
    }

    #[test]
    fn window_wraps_across_hour_boundary() {
        let mut window = SlidingWindow::new();
        window.update(59, 15, 4);
        assert!(window.check(5, 4, 15, 0));
    }

    #[test]
    fn hour_of_silence_zeroes_every_slot() {
        let mut window = SlidingWindow::new();
        window.update(0, 15, 7);
        for minute in 0..RATE_LIMIT_SLOTS {
            window.update(minute, 15, 0);
        }
        assert!(window.slots().iter().all(|&s| s == 0));
    }

    #[test]
    fn negative_limit_disables_axis() {
        let axis = Axis::new(-1, 15);
        assert!(!axis.enabled());
        assert!(axis.check(0, 1_000_000));
    }

    #[test]
    fn scenario_rate_limit_spool_blocks_third_record() {
        let mut limiter = RateLimiter::new(true, 2, 15, -1, 20);
        let minute = 10;
        assert!(limiter.check(minute, 5));
        limiter.update(minute, 5);
        assert!(limiter.check(minute, 5));
        limiter.update(minute, 5);
        assert!(!limiter.check(minute, 5));
    }

    #[test]
    fn both_axes_disabled_means_limiter_disabled_entirely() {
        let limiter = RateLimiter::new(true, -1, 15, -1, 20);
        assert!(limiter.check(0, i64::MAX / 2));
    }
}
