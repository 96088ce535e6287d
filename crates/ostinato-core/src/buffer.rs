//! Planar audio buffers shared between the player, pitch shifter, and renderer.

/// Immutable planar sample storage. Clips hold these via `Arc`; the pitch
/// shifter produces new buffers rather than mutating in place.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Create a buffer from planar channel data.
    ///
    /// All channels must have the same length.
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        debug_assert!(!channels.is_empty());
        debug_assert!(channels.windows(2).all(|w| w[0].len() == w[1].len()));
        Self {
            sample_rate,
            channels,
        }
    }

    /// Create a single-channel buffer.
    pub fn from_mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self::new(vec![samples], sample_rate)
    }

    /// Create an all-zero buffer.
    pub fn silent(num_channels: usize, len: usize, sample_rate: u32) -> Self {
        Self::new(vec![vec![0.0; len]; num_channels], sample_rate)
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Length in samples (per channel).
    #[inline]
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Duration in seconds.
    #[inline]
    pub fn duration(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }

    /// Samples for one channel. Panics if the channel does not exist.
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }
}

impl Default for AudioBuffer {
    fn default() -> Self {
        Self::from_mono(Vec::new(), 44100)
    }
}

/// Convert decibels to linear gain.
#[inline]
pub fn db_to_linear(db: f64) -> f64 {
    10.0f64.powf(db / 20.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_buffer_shape() {
        let buf = AudioBuffer::silent(2, 441, 44100);
        assert_eq!(buf.num_channels(), 2);
        assert_eq!(buf.len(), 441);
        assert_relative_eq!(buf.duration(), 0.01, epsilon = 1e-9);
    }

    #[test]
    fn test_db_to_linear() {
        assert_relative_eq!(db_to_linear(0.0), 1.0);
        assert_relative_eq!(db_to_linear(-6.0), 0.501187, epsilon = 1e-5);
        assert_relative_eq!(db_to_linear(20.0), 10.0, epsilon = 1e-9);
    }
}
