use std::time::{Duration, Instant};

/// Trailing-edge timer: every `schedule` replaces the pending deadline, and
/// only a deadline that has fully elapsed fires.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Cancel any pending deadline and start a new one from `now`.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns true exactly once per elapsed deadline.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Time left before the pending deadline, if any.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(400);

    #[test]
    fn test_fires_only_after_delay() {
        let start = Instant::now();
        let mut timer = Debouncer::new(DELAY);
        timer.schedule(start);
        assert!(!timer.fire(start + Duration::from_millis(399)));
        assert!(timer.fire(start + DELAY));
        assert!(!timer.is_pending());
        assert!(!timer.fire(start + Duration::from_secs(5)));
    }

    #[test]
    fn test_reschedule_moves_deadline() {
        let start = Instant::now();
        let mut timer = Debouncer::new(DELAY);
        timer.schedule(start);
        timer.schedule(start + Duration::from_millis(300));
        // The first deadline would have elapsed here.
        assert!(!timer.fire(start + Duration::from_millis(500)));
        assert!(timer.fire(start + Duration::from_millis(700)));
    }

    #[test]
    fn test_cancel_prevents_firing() {
        let start = Instant::now();
        let mut timer = Debouncer::new(DELAY);
        timer.schedule(start);
        timer.cancel();
        assert!(!timer.fire(start + Duration::from_secs(1)));
        assert_eq!(timer.remaining(start), None);
    }

    #[test]
    fn test_remaining_counts_down() {
        let start = Instant::now();
        let mut timer = Debouncer::new(DELAY);
        timer.schedule(start);
        assert_eq!(
            timer.remaining(start + Duration::from_millis(100)),
            Some(Duration::from_millis(300))
        );
        assert_eq!(
            timer.remaining(start + Duration::from_secs(1)),
            Some(Duration::ZERO)
        );
    }
}
