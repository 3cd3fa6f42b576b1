//! Cancellable repeating timer polled against a caller-supplied clock.

use std::time::Duration;

/// Fires every `interval` once started, until stopped.
///
/// Missed firings are coalesced: a late poll fires once and the next firing
/// is rescheduled relative to the poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timer {
    interval: Duration,
    next_due: Option<Duration>,
}

impl Timer {
    /// Creates a stopped timer.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    /// Period between firings.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Schedules the first firing one interval after `now`, restarting if running.
    pub fn start(&mut self, now: Duration) {
        self.next_due = Some(now.saturating_add(self.interval));
    }

    /// Cancels pending firings. Stopping a stopped timer does nothing.
    pub fn stop(&mut self) {
        self.next_due = None;
    }

    /// Reports whether the timer will fire again.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    /// Returns `true` when a firing is due at `now`.
    pub fn poll(&mut self, now: Duration) -> bool {
        let Some(due) = self.next_due else {
            return false;
        };
        if now < due {
            return false;
        }

        let mut next = due.saturating_add(self.interval);
        if next <= now {
            next = now.saturating_add(self.interval);
        }
        self.next_due = Some(next);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn fires_on_schedule_once_started() {
        let mut timer = Timer::new(ms(100));
        assert!(!timer.poll(ms(500)), "stopped timers never fire");

        timer.start(ms(0));
        assert!(!timer.poll(ms(99)));
        assert!(timer.poll(ms(100)));
        assert!(!timer.poll(ms(150)));
        assert!(timer.poll(ms(205)));
        assert!(timer.poll(ms(300)));
    }

    #[test]
    fn late_polls_fire_once() {
        let mut timer = Timer::new(ms(100));
        timer.start(ms(0));

        assert!(timer.poll(ms(1_000)));
        assert!(!timer.poll(ms(1_050)));
        assert!(timer.poll(ms(1_100)));
    }

    #[test]
    fn stop_is_idempotent() {
        let mut timer = Timer::new(ms(10));
        timer.start(ms(0));
        timer.stop();
        timer.stop();

        assert!(!timer.is_running());
        assert!(!timer.poll(ms(100)));
    }
}
