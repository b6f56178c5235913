//! Coarse timeout counter driven by periodic tick callbacks.
//!
//! The board calls [`Interrupts::on_tick`](crate::Interrupts::on_tick) at a fixed
//! rate. While the counter is armed, every `ticks_per_second` ticks add one whole
//! second. Waits in the transaction engine compare the elapsed seconds against
//! their timeout, so no wall clock is involved.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Seconds wrap back to zero at this value.
pub const MAX_SECONDS: u32 = u32::MAX;

/// Tick-driven seconds counter shared between tick and main context.
#[derive(Debug)]
pub struct TimeoutCounter {
    ticks_per_second: u32,
    sub_ticks: AtomicU32,
    seconds: AtomicU32,
    armed: AtomicBool,
}

impl TimeoutCounter {
    /// Creates a disarmed counter.
    #[must_use]
    pub const fn new(ticks_per_second: u32) -> Self {
        Self {
            ticks_per_second: if ticks_per_second == 0 {
                1
            } else {
                ticks_per_second
            },
            sub_ticks: AtomicU32::new(0),
            seconds: AtomicU32::new(0),
            armed: AtomicBool::new(false),
        }
    }

    /// Advances the counter by one tick. Ignored while disarmed.
    pub fn tick(&self) {
        if !self.armed.load(Ordering::Acquire) {
            return;
        }

        let sub = self.sub_ticks.fetch_add(1, Ordering::AcqRel) + 1;
        if sub < self.ticks_per_second {
            return;
        }

        self.sub_ticks.store(0, Ordering::Release);
        // fetch_update only fails when the closure returns None
        let _ = self
            .seconds
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |secs| {
                Some(secs.checked_add(1).filter(|&s| s < MAX_SECONDS).unwrap_or(0))
            });
    }

    /// Clears the counter and arms it.
    pub fn start(&self) {
        self.armed.store(false, Ordering::Release);
        self.sub_ticks.store(0, Ordering::Release);
        self.seconds.store(0, Ordering::Release);
        self.armed.store(true, Ordering::Release);
    }

    /// Disarms the counter and returns the elapsed seconds.
    pub fn stop(&self) -> u32 {
        self.armed.store(false, Ordering::Release);
        self.seconds.load(Ordering::Acquire)
    }

    /// Whole seconds elapsed since the last [`start`](Self::start).
    #[must_use]
    pub fn elapsed(&self) -> u32 {
        self.seconds.load(Ordering::Acquire)
    }

    /// Returns true while ticks are being counted.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Tick callbacks per counted second.
    #[must_use]
    pub const fn ticks_per_second(&self) -> u32 {
        self.ticks_per_second
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disarmed_counter_ignores_ticks() {
        let counter = TimeoutCounter::new(10);
        for _ in 0..100 {
            counter.tick();
        }
        assert_eq!(counter.elapsed(), 0);
        assert!(!counter.is_armed());
    }

    #[test]
    fn test_counts_whole_seconds() {
        let counter = TimeoutCounter::new(10);
        counter.start();

        for _ in 0..9 {
            counter.tick();
        }
        assert_eq!(counter.elapsed(), 0);

        counter.tick();
        assert_eq!(counter.elapsed(), 1);

        for _ in 0..25 {
            counter.tick();
        }
        assert_eq!(counter.elapsed(), 3);
    }

    #[test]
    fn test_stop_freezes_and_start_resets() {
        let counter = TimeoutCounter::new(2);
        counter.start();
        for _ in 0..4 {
            counter.tick();
        }
        assert_eq!(counter.stop(), 2);

        counter.tick();
        counter.tick();
        assert_eq!(counter.elapsed(), 2);

        counter.start();
        assert_eq!(counter.elapsed(), 0);
        assert!(counter.is_armed());
    }

    #[test]
    fn test_zero_rate_is_clamped() {
        let counter = TimeoutCounter::new(0);
        assert_eq!(counter.ticks_per_second(), 1);
        counter.start();
        counter.tick();
        assert_eq!(counter.elapsed(), 1);
    }
}
