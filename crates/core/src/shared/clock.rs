use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

/// Time source for the monitor loop.
///
/// `now` drives the debouncer, `wall_time` names the saved evidence, and
/// `sleep` implements the settle delay before the evidence shot.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn wall_time(&self) -> DateTime<Local>;
    fn sleep(&self, duration: Duration);
}

/// Real clock backed by `Instant`, `chrono::Local` and `thread::sleep`.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall_time(&self) -> DateTime<Local> {
        Local::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Clock that only moves when told to. `sleep` advances it instantly.
///
/// Used for deterministic replay of recorded frame sequences.
pub struct ManualClock {
    start: Instant,
    wall_start: DateTime<Local>,
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            wall_start: Local::now(),
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut elapsed = self.elapsed.lock().unwrap_or_else(|e| e.into_inner());
        *elapsed += by;
    }

    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    fn wall_time(&self) -> DateTime<Local> {
        // chrono::Duration::from_std only fails beyond ~292 billion years.
        let offset = chrono::Duration::from_std(self.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.wall_start + offset
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_sleep_advances_both_views() {
        let clock = ManualClock::new();
        let t0 = clock.now();
        let w0 = clock.wall_time();

        clock.sleep(Duration::from_millis(710));

        assert_eq!(clock.now() - t0, Duration::from_millis(710));
        assert_eq!((clock.wall_time() - w0).num_milliseconds(), 710);
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
