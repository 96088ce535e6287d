//! WAV format encoder using hound
//!
//! Output is 16-bit PCM, matching what hosts expect from downloaded mixes.

use std::io::{Seek, Write};
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};

use super::float_to_i16;
use crate::error::{ExportError, Result};

fn wav_spec(sample_rate: u32, channels: u16) -> WavSpec {
    WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Write interleaved stereo samples to the writer
fn write_samples<W: Write + Seek>(
    writer: &mut WavWriter<W>,
    left: &[f32],
    right: &[f32],
) -> Result<()> {
    for i in 0..left.len() {
        writer.write_sample(float_to_i16(left[i]))?;
        writer.write_sample(float_to_i16(right[i]))?;
    }
    Ok(())
}

/// Encode stereo audio to WAV in memory
///
/// # Arguments
/// * `left` - Left channel samples (normalized -1.0 to 1.0)
/// * `right` - Right channel samples (normalized -1.0 to 1.0)
/// * `sample_rate` - Sample rate in Hz
///
/// # Returns
/// WAV file bytes
pub fn encode_wav_memory(left: &[f32], right: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    if left.len() != right.len() {
        return Err(ExportError::InvalidData(
            "Left and right channels have different lengths".into(),
        ));
    }

    let mut buffer = Vec::new();
    {
        let cursor = std::io::Cursor::new(&mut buffer);
        let mut writer = WavWriter::new(cursor, wav_spec(sample_rate, 2))?;
        write_samples(&mut writer, left, right)?;
        // Finalize writes the header and flushes
        writer.finalize()?;
    }

    Ok(buffer)
}

/// Encode stereo audio to WAV file
pub fn encode_wav_file(left: &[f32], right: &[f32], sample_rate: u32, path: &Path) -> Result<()> {
    if left.len() != right.len() {
        return Err(ExportError::InvalidData(
            "Left and right channels have different lengths".into(),
        ));
    }

    let mut writer = WavWriter::create(path, wav_spec(sample_rate, 2))?;
    write_samples(&mut writer, left, right)?;
    writer.finalize()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_wav_memory() {
        let left = vec![0.0, 0.5, -0.5];
        let right = vec![0.1, -0.1, 0.0];

        let bytes = encode_wav_memory(&left, &right, 44100).unwrap();

        // Check WAV header magic
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert!(bytes.len() > 44); // Minimum WAV header size
    }

    #[test]
    fn test_encode_wav_memory_mismatched_lengths() {
        let result = encode_wav_memory(&[0.0, 0.5], &[0.1], 44100);
        assert!(result.is_err());
    }

    #[test]
    fn test_encode_wav_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        encode_wav_file(&[0.0, 0.5], &[0.0, -0.5], 44100, &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
    }
}
