//! Brickwall limiter applied to the mix bus before encoding.

use ostinato_core::db_to_linear;

/// High-ratio compressor tuned as a brickwall limiter: threshold -1 dBFS,
/// hard knee, instant attack, 100 ms release. Matches the dynamics stage the
/// realtime mix bus runs through, so exported audio clips the same way.
#[derive(Debug, Clone)]
pub struct Limiter {
    threshold_db: f64,
    ratio: f64,
    release_seconds: f64,
}

impl Default for Limiter {
    fn default() -> Self {
        Self {
            threshold_db: -1.0,
            ratio: 10000.0,
            release_seconds: 0.1,
        }
    }
}

impl Limiter {
    /// Process a stereo pair in place. Gain reduction is linked across
    /// channels so the stereo image is preserved.
    pub fn process(&self, left: &mut [f32], right: &mut [f32], sample_rate: u32) {
        let threshold = db_to_linear(self.threshold_db) as f32;
        let slope = (1.0 - 1.0 / self.ratio) as f32;
        // One-pole release coefficient.
        let release = (-1.0 / (self.release_seconds * sample_rate as f64)).exp() as f32;

        let mut reduction_db = 0.0f32;
        for i in 0..left.len().min(right.len()) {
            let level = left[i].abs().max(right[i].abs());
            let over_db = if level > threshold {
                20.0 * (level / threshold).log10()
            } else {
                0.0
            };
            let target = over_db * slope;
            if target > reduction_db {
                // Instant attack.
                reduction_db = target;
            } else {
                reduction_db = target + (reduction_db - target) * release;
            }
            let gain = 10.0f32.powf(-reduction_db / 20.0);
            left[i] *= gain;
            right[i] *= gain;
        }
    }
}
