//! # Ostinato - Measure-Timeline Audio Engine
//!
//! Playback scheduling and offline rendering built from modular subsystems.
//!
//! ## Architecture
//!
//! Ostinato is an umbrella crate that coordinates:
//! - **ostinato-core** - Project model, tempo map, audio buffers
//! - **ostinato-pitch** - Ahead-of-time pitch shifting with envelope extraction
//! - **ostinato-player** - Realtime transport (scheduling, looping, seeking)
//! - **ostinato-export** - Offline rendering and export (WAV, FLAC, MP3, stems)
//!
//! Positions are measure numbers on a 1-based timeline; the tempo map converts
//! them to seconds at the scheduling boundary.
//!
//! ## Quick Start
//!
//! ```ignore
//! use ostinato::prelude::*;
//!
//! let project = load_project()?;
//!
//! // Render the whole project to a WAV file
//! ostinato::export::render_wav_file(&project, Path::new("mix.wav"))?;
//!
//! // Or drive realtime playback
//! let mut session = PlayerSession::new(clock, graph, NoEffects);
//! session.set_rendering_data(project)?;
//! session.play(1.0, 5.0, 0.0);
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Same as `full`
//! - `full` - Core, player, pitch, WAV and FLAC export
//! - `pitch` - Pitch shifting pass
//! - `export` - Offline rendering
//! - `wav` / `flac` / `mp3` - Export formats
//! - `stems` - Zipped per-track WAV export

/// Re-export of ostinato-core for direct access
pub use ostinato_core as core;

// Core types
pub use ostinato_core::{
    db_to_linear,
    AudioBuffer,
    Clip,
    Effect,
    EffectKey,
    EffectRange,

    // Error
    Error,
    Project,
    Result,

    // Timeline
    TempoMap,
    TempoPoint,
    Track,
    DEFAULT_BEATS_PER_MEASURE,
    DEFAULT_TEMPO,
};

// Player subsystem
pub use ostinato_player as player;

pub use ostinato_player::{
    AudioClock, AudioGraph, EffectGraphBuilder, LoopSpec, NoEffects, NodeId, PlayerSession,
    SystemClock,
};

// Pitch shifting
#[cfg(feature = "pitch")]
pub use ostinato_pitch as pitch;

#[cfg(feature = "pitch")]
pub use ostinato_pitch::{shift_track, PitchShiftCache, PitchShifter};

// Export
#[cfg(feature = "export")]
pub use ostinato_export as export;

#[cfg(feature = "export")]
pub use ostinato_export::{merge_clips, render_buffer, RenderResult, SAMPLE_RATE};

/// Convenience prelude for common imports
pub mod prelude {
    // Project model
    pub use crate::core::{
        AudioBuffer, Clip, Effect, EffectKey, EffectRange, Project, TempoMap, Track,
    };

    // Transport
    pub use crate::player::{AudioClock, AudioGraph, LoopSpec, NoEffects, PlayerSession};

    // Pitch pass
    #[cfg(feature = "pitch")]
    pub use crate::pitch::{shift_track, PitchShiftCache, PitchShifter};

    // Offline rendering
    #[cfg(feature = "export")]
    pub use crate::export::{render_buffer, RenderResult};
}
