//! The time source the session schedules against.

use std::time::Instant;

/// Monotonic seconds, in the audio backend's timebase.
///
/// All scheduling in the session is expressed as absolute times from this
/// clock, mirroring how audio contexts express `currentTime`.
pub trait AudioClock {
    fn now(&self) -> f64;
}

/// Wall-clock implementation for hosts without a backend timebase.
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioClock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}
