//! Ahead-of-time pitch shifting for the measure timeline.
//!
//! Pitch automation is applied before playback: each clip's source buffer is
//! run through an injected [`PitchShifter`] against a semitone envelope
//! derived from the track's automation, and the result is attached to the
//! clip for the player and renderer to use.
//!
//! - [`track_envelope`] / [`clip_envelope`]: automation ranges to hop-frame
//!   breakpoints, then clipped and renormalized per clip.
//! - [`shift_track`]: the pass itself, with a no-op fast path and a bounded
//!   [`PitchShiftCache`].

pub mod error;
pub use error::{Error, Result};

mod envelope;
pub use envelope::{
    clip_envelope, frame_envelope, is_bypass, track_envelope, EnvelopePoint, PointKind, QFRAMES,
};

mod shifter;
pub use shifter::PitchShifter;

mod cache;
pub use cache::{CacheKey, PitchShiftCache, MAX_CACHE};

mod process;
pub use process::shift_track;
