//! Quiet-period debouncing for rapidly edited values.
//!
//! The debouncer is poll-driven: callers feed it input with `update` and ask
//! for the settled value with `poll` once `deadline` has passed. It never owns
//! a background timer, so nothing can fire after `cancel` or drop.

use std::time::{Duration, Instant};

/// Delays propagation of a value until it stops changing for `quiet_period`.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    quiet_period: Duration,
    settled: T,
    pending: Option<(T, Instant)>,
}

impl<T: Clone + PartialEq> Debouncer<T> {
    pub fn new(initial: T, quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            settled: initial,
            pending: None,
        }
    }

    /// Records a new input value and restarts the quiet period.
    pub fn update(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.quiet_period));
    }

    /// Instant at which the pending value settles, if one is pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    /// Promotes the pending value once its quiet period has elapsed.
    ///
    /// Returns the new output only when it differs from the previous one.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let deadline = self.deadline()?;
        if now < deadline {
            return None;
        }
        let (value, _) = self.pending.take()?;
        if value == self.settled {
            return None;
        }
        self.settled = value.clone();
        Some(value)
    }

    /// Drops any pending value without promoting it.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Cancels any pending value and forces the output to `value`.
    pub fn reset(&mut self, value: T) {
        self.pending = None;
        self.settled = value;
    }

    #[cfg(test)]
    pub fn settled(&self) -> &T {
        &self.settled
    }
}
