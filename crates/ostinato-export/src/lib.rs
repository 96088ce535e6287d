//! # Ostinato Export
//!
//! Offline rendering and file export for ostinato projects.
//!
//! This crate mixes a compiled [`Project`](ostinato_core::Project) down to
//! stereo buffers at 44.1 kHz, runs the mix bus through a brickwall limiter,
//! and encodes the result:
//! - **Format encoding**: WAV, FLAC, MP3
//! - **Stems**: one WAV per track, zipped
//! - **Clip merging**: flatten a clip list with no gains or limiting
//!
//! ## Feature Flags
//!
//! - `wav` (default): WAV export via hound (pure Rust)
//! - `flac` (default): FLAC export via flacenc (pure Rust)
//! - `mp3`: MP3 export via mp3lame-encoder (bindings to LAME)
//! - `stems`: zipped per-track WAV export

// Core modules
pub mod error;
pub mod export;
pub mod limiter;
pub mod renderer;

// Advanced APIs
pub mod format;

#[cfg(feature = "stems")]
pub mod stems;

// Re-exports
pub use error::{ExportError, Result};
pub use limiter::Limiter;
pub use renderer::{merge_clips, render_buffer, RenderResult, SAMPLE_RATE};

pub use export::render_to_file;

// Format-specific exports
#[cfg(feature = "wav")]
pub use export::{render_wav, render_wav_file};
#[cfg(feature = "wav")]
pub use format::wav::{encode_wav_file, encode_wav_memory};

#[cfg(feature = "flac")]
pub use export::{render_flac, render_flac_file};
#[cfg(feature = "flac")]
pub use format::flac::{encode_flac_file, encode_flac_memory};

#[cfg(feature = "mp3")]
pub use export::{render_mp3, render_mp3_file};
#[cfg(feature = "mp3")]
pub use format::mp3::{encode_mp3_file, encode_mp3_memory};

#[cfg(feature = "stems")]
pub use stems::render_stems;
