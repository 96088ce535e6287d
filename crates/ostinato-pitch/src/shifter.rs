//! The DSP seam.

/// A phase-vocoder style pitch shifter, injected by the host.
///
/// The pass in this crate is shifter-agnostic: it only needs the hop size to
/// place envelope points, the frame count for a buffer, and a way to run the
/// shift itself. Implementations process mono samples against a per-hop
/// semitone envelope of length `num_frames(samples.len())`.
pub trait PitchShifter {
    /// Samples advanced per analysis frame.
    fn hop_size(&self) -> usize;

    /// Number of analysis frames covering `sample_len` samples.
    fn num_frames(&self, sample_len: usize) -> usize {
        sample_len.div_ceil(self.hop_size())
    }

    /// Shift `samples` by the per-frame semitone `envelope`.
    fn shift(
        &self,
        samples: &[f32],
        envelope: &[f32],
    ) -> Result<Vec<f32>, Box<dyn std::error::Error + Send + Sync>>;
}
