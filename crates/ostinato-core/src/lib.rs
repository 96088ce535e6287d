//! Timeline data model and tempo mapping.
//!
//! This crate defines the validated project schema shared by the realtime
//! player and the offline renderer:
//!
//! - [`Project`] / [`Track`] / [`Clip`]: a compiled arrangement of audio
//!   clips on a measure timeline, with per-track automation.
//! - [`TempoMap`]: piecewise-linear tempo curve with closed-form
//!   measure-to-time integration in both directions.
//! - [`AudioBuffer`]: planar sample storage shared via `Arc`.
//!
//! Positions are measure-denominated and 1-based throughout; seconds only
//! appear at the scheduling and DSP boundaries.

pub mod error;
pub use error::{Error, Result};

mod buffer;
pub use buffer::{db_to_linear, AudioBuffer};

mod model;
pub use model::{Clip, Effect, EffectKey, EffectRange, Project, Track};

mod tempo_map;
pub use tempo_map::{TempoMap, TempoPoint, DEFAULT_BEATS_PER_MEASURE, DEFAULT_TEMPO};
