use std::time::{Duration, Instant};

/// What happens to dangerous frames seen while the debouncer is cooling down.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CooldownPolicy {
    /// Ignore them; only a dangerous frame after the cooldown fires.
    #[default]
    Drop,
    /// Remember one, and fire on the first frame after the cooldown ends.
    Defer,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebounceState {
    Idle,
    Cooling,
}

/// Time gate limiting full alert sequences to one per `interval`.
///
/// `observe` records the alert time before returning `true`, so the caller's
/// alert side effects (sound, settle delay, upload) can never re-trigger it.
#[derive(Debug)]
pub struct AlertDebouncer {
    interval: Duration,
    policy: CooldownPolicy,
    last_alert: Option<Instant>,
    pending: bool,
}

impl AlertDebouncer {
    pub fn new(interval: Duration, policy: CooldownPolicy) -> Self {
        Self {
            interval,
            policy,
            last_alert: None,
            pending: false,
        }
    }

    /// Feeds one frame's danger verdict. Returns `true` iff an alert fires now.
    pub fn observe(&mut self, danger: bool, now: Instant) -> bool {
        let ready = self.state(now) == DebounceState::Idle;
        if ready && (danger || self.pending) {
            self.last_alert = Some(now);
            self.pending = false;
            return true;
        }
        if danger && self.policy == CooldownPolicy::Defer {
            self.pending = true;
        }
        false
    }

    pub fn state(&self, now: Instant) -> DebounceState {
        match self.last_alert {
            Some(last) if now.saturating_duration_since(last) < self.interval => {
                DebounceState::Cooling
            }
            _ => DebounceState::Idle,
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending
    }
}
