use std::cell::Cell;
use std::time::{Duration, Instant};

/// Time source for per-tick work budgets.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Deterministic clock. Each `now()` call advances by `step`.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Cell<Duration>,
    step: Duration,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::with_step(Duration::ZERO)
    }

    pub fn with_step(step: Duration) -> Self {
        Self {
            base: Instant::now(),
            offset: Cell::new(Duration::ZERO),
            step,
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }

    pub fn set_step(&mut self, step: Duration) {
        self.step = step;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let t = self.base + self.offset.get();
        self.offset.set(self.offset.get() + self.step);
        t
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_steps() {
        let c = ManualClock::with_step(Duration::from_millis(5));
        let a = c.now();
        let b = c.now();
        assert_eq!(b - a, Duration::from_millis(5));
        c.advance(Duration::from_secs(1));
        assert_eq!(c.now() - b, Duration::from_millis(1005));
    }
}
