use std::time::{Duration, Instant};

/// Deadline-based timer polled by the event loop.
///
/// Nothing fires on its own: the owner reports `deadline()` upward and calls
/// `fire(now)` once the loop wakes. A stopped timer never fires.
#[derive(Debug, Clone)]
pub struct Timer {
    interval: Duration,
    periodic: bool,
    deadline: Option<Instant>,
}

impl Timer {
    pub fn single_shot(interval: Duration) -> Self {
        Self {
            interval,
            periodic: false,
            deadline: None,
        }
    }

    pub fn periodic(interval: Duration) -> Self {
        Self {
            interval,
            periodic: true,
            deadline: None,
        }
    }

    pub fn start(&mut self, now: Instant) {
        self.deadline = Some(now + self.interval);
    }

    /// Starts the timer unless it is already running.
    pub fn ensure_running(&mut self, now: Instant) {
        if self.deadline.is_none() {
            self.start(now);
        }
    }

    pub fn stop(&mut self) {
        self.deadline = None;
    }

    pub fn is_running(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Takes effect from the next start or period.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// Returns true if the deadline has passed. A periodic timer advances by one
    /// interval per call, so a late loop sees every missed period in order.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = self
                    .periodic
                    .then(|| deadline + self.interval.max(Duration::from_millis(1)));
                true
            }
            _ => false,
        }
    }
}

pub fn earliest(deadlines: impl IntoIterator<Item = Option<Instant>>) -> Option<Instant> {
    deadlines.into_iter().flatten().min()
}
