//! Backoff Scheduler
//!
//! Fibonacci wait sequence (1, 2, 3, 5, 8, ... units) bounded by a wall-clock
//! budget. The scheduler never issues a wait that would push the accumulated
//! wait time past the budget, so a poll loop driven by it always ends.

use std::time::Duration;

use crate::defaults;

/// Raw scheduler state: the two Fibonacci terms and the time already waited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffState {
    pub prev: u32,
    pub cur: u32,
    pub elapsed: Duration,
}

impl Default for BackoffState {
    fn default() -> Self {
        Self {
            prev: 1,
            cur: 2,
            elapsed: Duration::ZERO,
        }
    }
}

impl BackoffState {
    /// The wait this state would issue next.
    pub fn peek(&self, unit: Duration) -> Duration {
        unit.saturating_mul(self.prev)
    }

    /// Issue the next wait and return the advanced state.
    pub fn next(self, unit: Duration) -> (Duration, BackoffState) {
        let wait = self.peek(unit);
        let state = BackoffState {
            prev: self.cur,
            cur: self.prev.saturating_add(self.cur),
            elapsed: self.elapsed.saturating_add(wait),
        };
        (wait, state)
    }

    /// True once `elapsed + next_wait > max_time`.
    pub fn should_stop(&self, unit: Duration, max_time: Duration) -> bool {
        self.elapsed.saturating_add(self.peek(unit)) > max_time
    }
}

/// Budget-bounded Fibonacci backoff.
///
/// Also implements [`backoff::backoff::Backoff`], returning `None` once the
/// budget is exhausted.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    state: BackoffState,
    unit: Duration,
    max_time: Duration,
}

impl Default for FibonacciBackoff {
    fn default() -> Self {
        Self::new(defaults::poll::MAX_TIME)
    }
}

impl FibonacciBackoff {
    /// Scheduler with the default one-second unit.
    pub fn new(max_time: Duration) -> Self {
        Self {
            state: BackoffState::default(),
            unit: defaults::poll::UNIT,
            max_time,
        }
    }

    pub fn with_unit(mut self, unit: Duration) -> Self {
        self.unit = unit;
        self
    }

    pub fn state(&self) -> BackoffState {
        self.state
    }

    pub fn elapsed(&self) -> Duration {
        self.state.elapsed
    }

    pub fn remaining(&self) -> Duration {
        self.max_time.saturating_sub(self.state.elapsed)
    }

    pub fn peek(&self) -> Duration {
        self.state.peek(self.unit)
    }

    pub fn should_stop(&self) -> bool {
        self.state.should_stop(self.unit, self.max_time)
    }

    /// Next wait, or `None` when issuing it would exceed the budget.
    pub fn next_wait(&mut self) -> Option<Duration> {
        if self.should_stop() {
            return None;
        }
        let (wait, state) = self.state.next(self.unit);
        self.state = state;
        Some(wait)
    }
}

impl backoff::backoff::Backoff for FibonacciBackoff {
    fn next_backoff(&mut self) -> Option<Duration> {
        self.next_wait()
    }

    fn reset(&mut self) {
        self.state = BackoffState::default();
    }
}
