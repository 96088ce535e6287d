//! One-call project exports.
//!
//! Each function runs the offline renderer and hands the stereo result to a
//! format encoder.

use std::path::Path;

use log::info;
use ostinato_core::Project;

use crate::error::{ExportError, Result};
use crate::renderer::render_buffer;

/// Render a project to WAV bytes
#[cfg(feature = "wav")]
pub fn render_wav(project: &Project) -> Result<Vec<u8>> {
    let rendered = render_buffer(project)?;
    info!("encoding {} samples to wav", rendered.length_samples);
    crate::format::wav::encode_wav_memory(&rendered.left, &rendered.right, rendered.sample_rate)
}

/// Render a project to a WAV file
#[cfg(feature = "wav")]
pub fn render_wav_file(project: &Project, path: &Path) -> Result<()> {
    let rendered = render_buffer(project)?;
    crate::format::wav::encode_wav_file(&rendered.left, &rendered.right, rendered.sample_rate, path)
}

/// Render a project to FLAC bytes
#[cfg(feature = "flac")]
pub fn render_flac(project: &Project) -> Result<Vec<u8>> {
    let rendered = render_buffer(project)?;
    info!("encoding {} samples to flac", rendered.length_samples);
    crate::format::flac::encode_flac_memory(&rendered.left, &rendered.right, rendered.sample_rate)
}

/// Render a project to a FLAC file
#[cfg(feature = "flac")]
pub fn render_flac_file(project: &Project, path: &Path) -> Result<()> {
    let rendered = render_buffer(project)?;
    crate::format::flac::encode_flac_file(
        &rendered.left,
        &rendered.right,
        rendered.sample_rate,
        path,
    )
}

/// Render a project to MP3 bytes
#[cfg(feature = "mp3")]
pub fn render_mp3(project: &Project) -> Result<Vec<u8>> {
    let rendered = render_buffer(project)?;
    info!("encoding {} samples to mp3", rendered.length_samples);
    crate::format::mp3::encode_mp3_memory(&rendered.left, &rendered.right, rendered.sample_rate)
}

/// Render a project to an MP3 file
#[cfg(feature = "mp3")]
pub fn render_mp3_file(project: &Project, path: &Path) -> Result<()> {
    let rendered = render_buffer(project)?;
    crate::format::mp3::encode_mp3_file(&rendered.left, &rendered.right, rendered.sample_rate, path)
}

/// Render a project to a file with automatic format detection
///
/// The format is determined by the file extension:
/// - `.wav` -> WAV
/// - `.flac` -> FLAC
/// - `.mp3` -> MP3
#[allow(unused_variables)]
pub fn render_to_file(project: &Project, path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    if ext == "wav" {
        #[cfg(feature = "wav")]
        return render_wav_file(project, path);
        #[cfg(not(feature = "wav"))]
        return Err(ExportError::UnsupportedFormat(
            "WAV support not enabled".into(),
        ));
    }

    if ext == "flac" {
        #[cfg(feature = "flac")]
        return render_flac_file(project, path);
        #[cfg(not(feature = "flac"))]
        return Err(ExportError::UnsupportedFormat(
            "FLAC support not enabled".into(),
        ));
    }

    if ext == "mp3" {
        #[cfg(feature = "mp3")]
        return render_mp3_file(project, path);
        #[cfg(not(feature = "mp3"))]
        return Err(ExportError::UnsupportedFormat(
            "MP3 support not enabled".into(),
        ));
    }

    Err(ExportError::UnsupportedFormat(format!(
        "Unknown or unsupported file extension: {ext:?}. Supported: .wav, .flac, .mp3"
    )))
}
