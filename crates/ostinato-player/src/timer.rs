//! One-shot timer slots.
//!
//! Each timer role (play start, play end, loop rescheduling) is a single
//! `Option<Scheduled<_>>` slot on the session. Re-arming overwrites the
//! slot, which cancels the previous timer; there is no way for a stale
//! timer to fire after its role has been re-armed or cleared. The session's
//! `tick` pump fires due timers against the injected clock.

/// A timer armed to fire at an absolute clock time.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Scheduled<T> {
    pub due: f64,
    pub payload: T,
}

impl<T> Scheduled<T> {
    pub fn at(due: f64, payload: T) -> Self {
        Self { due, payload }
    }

    pub fn is_due(&self, now: f64) -> bool {
        self.due <= now
    }
}
