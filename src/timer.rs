/// Monotonic milliseconds, as produced by a [`crate::runtime::Clock`].
pub type Millis = u64;

/// Deadline-based countdown that can be frozen and thawed.
///
/// The timer never reads a clock itself; every call carries `now`, which
/// keeps it deterministic under test.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountdownTimer {
    deadline: Millis,
    frozen_remaining: Millis,
    paused: bool,
}

impl CountdownTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, duration: Millis, now: Millis) {
        self.deadline = now.saturating_add(duration);
        self.frozen_remaining = 0;
        self.paused = false;
    }

    /// Remaining time at `now`. While paused the clock is not consulted.
    pub fn tick(&self, now: Millis) -> Millis {
        if self.paused {
            self.frozen_remaining
        } else {
            self.deadline.saturating_sub(now)
        }
    }

    pub fn pause(&mut self, now: Millis) {
        if self.paused {
            return;
        }
        self.frozen_remaining = self.deadline.saturating_sub(now);
        self.paused = true;
    }

    pub fn resume(&mut self, now: Millis) {
        if !self.paused {
            return;
        }
        self.deadline = now.saturating_add(self.frozen_remaining);
        self.paused = false;
    }

    /// Expire the timer until the next `start`.
    pub fn reset(&mut self) {
        self.deadline = 0;
        self.frozen_remaining = 0;
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_expired(&self, now: Millis) -> bool {
        self.tick(now) == 0
    }
}
