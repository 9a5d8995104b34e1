//! Time source used to pace responses.
//!
//! Emission only ever needs "what time is it" and "wait this long", so both
//! live behind [`Clock`]. [`SystemClock`] is the wall clock; [`ManualClock`]
//! advances virtual time instantly and records every wait, which makes the
//! pacing arithmetic observable in tests without real sleeps.

use core::time::Duration;
use std::sync::Mutex;
use std::time::Instant;

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    /// Blocks the calling thread for at least `duration`.
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by [`Instant`] and [`std::thread::sleep`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

#[derive(Debug)]
struct ManualState {
    elapsed: Duration,
    sleeps: Vec<Duration>,
}

/// Virtual clock for deterministic tests.
///
/// `sleep` returns immediately, advancing virtual time by the requested
/// duration plus a fixed overshoot, which simulates a scheduler that always
/// wakes sleepers late.
///
/// # Examples
///
/// ```rust
/// use core::time::Duration;
/// use foundation_scripted_http::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// let start = clock.now();
/// clock.sleep(Duration::from_millis(3));
///
/// assert_eq!(clock.now() - start, Duration::from_millis(3));
/// assert_eq!(clock.sleeps(), vec![Duration::from_millis(3)]);
/// ```
#[derive(Debug)]
pub struct ManualClock {
    epoch: Instant,
    overshoot: Duration,
    state: Mutex<ManualState>,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self::with_overshoot(Duration::ZERO)
    }

    /// Creates a clock whose every sleep lasts `overshoot` longer than asked.
    #[must_use]
    pub fn with_overshoot(overshoot: Duration) -> Self {
        Self {
            epoch: Instant::now(),
            overshoot,
            state: Mutex::new(ManualState {
                elapsed: Duration::ZERO,
                sleeps: Vec::new(),
            }),
        }
    }

    /// Every requested sleep, in call order.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock().sleeps.clone()
    }

    /// Total virtual time that has passed.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.lock().elapsed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.epoch + self.lock().elapsed
    }

    fn sleep(&self, duration: Duration) {
        let mut state = self.lock();
        state.sleeps.push(duration);
        state.elapsed += duration + self.overshoot;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_sleeps_at_least_requested() {
        let clock = SystemClock;
        let start = clock.now();
        clock.sleep(Duration::from_millis(5));
        assert!(clock.now().duration_since(start) >= Duration::from_millis(5));
    }

    #[test]
    fn test_system_clock_zero_sleep_returns() {
        SystemClock.sleep(Duration::ZERO);
    }

    #[test]
    fn test_manual_clock_advances_only_on_sleep() {
        let clock = ManualClock::new();
        let start = clock.now();
        assert_eq!(clock.now(), start);

        clock.sleep(Duration::from_millis(2));
        clock.sleep(Duration::ZERO);

        assert_eq!(clock.now() - start, Duration::from_millis(2));
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_millis(2), Duration::ZERO]
        );
    }

    #[test]
    fn test_manual_clock_overshoot_applies_to_every_sleep() {
        let clock = ManualClock::with_overshoot(Duration::from_millis(1));
        clock.sleep(Duration::from_millis(2));
        clock.sleep(Duration::ZERO);
        assert_eq!(clock.elapsed(), Duration::from_millis(4));
    }
}
