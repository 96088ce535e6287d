//! FLAC format encoder using flacenc
//!
//! Lossless 16-bit encoding with a fixed block size.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use flacenc::bitsink::ByteSink;
use flacenc::component::BitRepr;
use flacenc::config::Encoder as EncoderConfig;
use flacenc::encode_with_fixed_block_size;
use flacenc::error::Verify;
use flacenc::source::MemSource;

use super::float_to_i16;
use crate::error::{ExportError, Result};

const BITS_PER_SAMPLE: usize = 16;
const BLOCK_SIZE: usize = 4096;

/// Interleave stereo channels and convert to i32
fn interleave_to_i32(left: &[f32], right: &[f32]) -> Vec<i32> {
    let mut interleaved = Vec::with_capacity(left.len() * 2);
    for i in 0..left.len() {
        interleaved.push(float_to_i16(left[i]) as i32);
        interleaved.push(float_to_i16(right[i]) as i32);
    }
    interleaved
}

/// Encode stereo audio to FLAC in memory
pub fn encode_flac_memory(left: &[f32], right: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    if left.len() != right.len() {
        return Err(ExportError::InvalidData(
            "Left and right channels have different lengths".into(),
        ));
    }

    let interleaved = interleave_to_i32(left, right);

    let encoder_config = EncoderConfig::default()
        .into_verified()
        .map_err(|e| ExportError::Encoding(format!("Invalid FLAC config: {:?}", e)))?;

    let source = MemSource::from_samples(
        &interleaved,
        2,
        BITS_PER_SAMPLE,
        sample_rate as usize,
    );

    let stream = encode_with_fixed_block_size(&encoder_config, source, BLOCK_SIZE)
        .map_err(|e| ExportError::Encoding(format!("FLAC encoding failed: {:?}", e)))?;

    let mut sink = ByteSink::new();
    stream
        .write(&mut sink)
        .map_err(|e| ExportError::Encoding(format!("Failed to write FLAC stream: {:?}", e)))?;

    Ok(sink.into_inner())
}

/// Encode stereo audio to FLAC file
pub fn encode_flac_file(left: &[f32], right: &[f32], sample_rate: u32, path: &Path) -> Result<()> {
    let flac_data = encode_flac_memory(left, right, sample_rate)?;

    let mut file = File::create(path)?;
    file.write_all(&flac_data)?;

    Ok(())
}
