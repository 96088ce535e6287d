//! MP3 format encoder using mp3lame-encoder
//!
//! Constant bitrate 160 kbps, the rate hosts historically shipped mixes at.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use mp3lame_encoder::{Bitrate, Builder, DualPcm, FlushNoGap, Quality};

use super::float_to_i16;
use crate::error::{ExportError, Result};

/// Encode stereo audio to MP3 in memory
pub fn encode_mp3_memory(left: &[f32], right: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    if left.len() != right.len() {
        return Err(ExportError::InvalidData(
            "Left and right channels have different lengths".into(),
        ));
    }

    let mut builder = Builder::new()
        .ok_or_else(|| ExportError::Encoding("Failed to create LAME encoder".into()))?;
    builder
        .set_num_channels(2)
        .map_err(|e| ExportError::Encoding(format!("LAME channels: {:?}", e)))?;
    builder
        .set_sample_rate(sample_rate)
        .map_err(|e| ExportError::Encoding(format!("LAME sample rate: {:?}", e)))?;
    builder
        .set_brate(Bitrate::Kbps160)
        .map_err(|e| ExportError::Encoding(format!("LAME bitrate: {:?}", e)))?;
    builder
        .set_quality(Quality::Best)
        .map_err(|e| ExportError::Encoding(format!("LAME quality: {:?}", e)))?;
    let mut encoder = builder
        .build()
        .map_err(|e| ExportError::Encoding(format!("LAME init: {:?}", e)))?;

    let left_pcm: Vec<i16> = left.iter().map(|&s| float_to_i16(s)).collect();
    let right_pcm: Vec<i16> = right.iter().map(|&s| float_to_i16(s)).collect();
    let input = DualPcm {
        left: &left_pcm,
        right: &right_pcm,
    };

    let mut output = Vec::new();
    output.reserve(mp3lame_encoder::max_required_buffer_size(left_pcm.len()));
    let written = encoder
        .encode(input, output.spare_capacity_mut())
        .map_err(|e| ExportError::Encoding(format!("MP3 encoding failed: {:?}", e)))?;
    // The encoder wrote `written` bytes into the reserved spare capacity.
    unsafe { output.set_len(output.len() + written) };

    let written = encoder
        .flush::<FlushNoGap>(output.spare_capacity_mut())
        .map_err(|e| ExportError::Encoding(format!("MP3 flush failed: {:?}", e)))?;
    unsafe { output.set_len(output.len() + written) };

    Ok(output)
}

/// Encode stereo audio to MP3 file
pub fn encode_mp3_file(left: &[f32], right: &[f32], sample_rate: u32, path: &Path) -> Result<()> {
    let mp3_data = encode_mp3_memory(left, right, sample_rate)?;

    let mut file = File::create(path)?;
    file.write_all(&mp3_data)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_mp3_memory() {
        let left = vec![0.0f32; 4608];
        let right = vec![0.0f32; 4608];
        let bytes = encode_mp3_memory(&left, &right, 44100).unwrap();
        assert!(!bytes.is_empty());
        // MPEG frame sync.
        assert_eq!(bytes[0], 0xFF);
    }

    #[test]
    fn test_mismatched_channel_lengths() {
        let result = encode_mp3_memory(&[0.0, 0.5], &[0.0], 44100);
        assert!(result.is_err());
    }
}
