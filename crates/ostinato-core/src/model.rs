//! The compiled-project schema.
//!
//! A [`Project`] is the output of an external script compiler: tracks of
//! clips plus per-track automation. The shapes here are strict and validated
//! once at the input boundary ([`Project::validate`]); downstream code
//! assumes a validated project and never re-checks.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::buffer::AudioBuffer;
use crate::error::{Error, Result};
use crate::tempo_map::{TempoMap, TempoPoint, DEFAULT_TEMPO};

/// An automation parameter on a track.
///
/// The string form round-trips the wire spelling used by compiled scripts
/// (`"TEMPO-TEMPO"`, `"PITCHSHIFT-PITCHSHIFT_SHIFT"`, ...). Parameters the
/// engine merely routes to the external effect-graph builder are carried as
/// [`EffectKey::Other`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EffectKey {
    Tempo,
    PitchShift,
    Volume,
    Other(String),
}

impl EffectKey {
    pub fn as_str(&self) -> &str {
        match self {
            EffectKey::Tempo => "TEMPO-TEMPO",
            EffectKey::PitchShift => "PITCHSHIFT-PITCHSHIFT_SHIFT",
            EffectKey::Volume => "VOLUME-GAIN",
            EffectKey::Other(name) => name,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "TEMPO-TEMPO" => EffectKey::Tempo,
            "PITCHSHIFT-PITCHSHIFT_SHIFT" => EffectKey::PitchShift,
            "VOLUME-GAIN" => EffectKey::Volume,
            other => EffectKey::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for EffectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One linear automation segment: `start_value` at `start_measure` ramping
/// to `end_value` at `end_measure`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectRange {
    pub start_measure: f64,
    pub end_measure: f64,
    pub start_value: f64,
    pub end_value: f64,
}

impl EffectRange {
    pub fn new(start_measure: f64, end_measure: f64, start_value: f64, end_value: f64) -> Self {
        Self {
            start_measure,
            end_measure,
            start_value,
            end_value,
        }
    }

    /// Linear value at `measure`, clamped to the range ends.
    pub fn value_at(&self, measure: f64) -> f64 {
        if measure <= self.start_measure || self.end_measure <= self.start_measure {
            self.start_value
        } else if measure >= self.end_measure {
            self.end_value
        } else {
            let frac = (measure - self.start_measure) / (self.end_measure - self.start_measure);
            self.start_value + (self.end_value - self.start_value) * frac
        }
    }
}

/// An ordered list of automation ranges for one parameter.
///
/// Well-formed scripts produce contiguous, non-overlapping ranges; this is
/// checked once by [`Project::validate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub ranges: Vec<EffectRange>,
    pub bypass: bool,
}

impl Effect {
    pub fn new(ranges: Vec<EffectRange>) -> Self {
        Self {
            ranges,
            bypass: false,
        }
    }
}

/// One clip of audio placed on the timeline.
///
/// `measure` is the clip's position on the global timeline; `start`/`end`
/// delimit the sub-range of the source sound to play. All three are
/// measure-denominated and 1-based.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clip {
    pub filekey: String,
    pub measure: f64,
    pub start: f64,
    pub end: f64,
    /// True for the repetitions generated by looping a sound to fill a range.
    pub loop_child: bool,
    pub gain_db: f64,
    /// Decoded source audio, supplied by the host's sound library.
    #[serde(skip)]
    pub audio: Arc<AudioBuffer>,
    /// Pitch-shifted replacement buffer, filled in by a pitch-shift pass.
    #[serde(skip)]
    pub pitch_shifted: Option<Arc<AudioBuffer>>,
}

impl Clip {
    pub fn new(
        filekey: impl Into<String>,
        measure: f64,
        start: f64,
        end: f64,
        audio: Arc<AudioBuffer>,
    ) -> Self {
        Self {
            filekey: filekey.into(),
            measure,
            start,
            end,
            loop_child: false,
            gain_db: 0.0,
            audio,
            pitch_shifted: None,
        }
    }

    /// Playable length in measures.
    #[inline]
    pub fn span(&self) -> f64 {
        self.end - self.start
    }

    /// The buffer playback should use: the pitch-shifted copy when present.
    #[inline]
    pub fn effective_audio(&self) -> &Arc<AudioBuffer> {
        self.pitch_shifted.as_ref().unwrap_or(&self.audio)
    }
}

/// One track: clips plus automation. Track 0 is the mix (master) track and
/// the last track is the metronome.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Track {
    pub clips: Vec<Clip>,
    pub effects: BTreeMap<EffectKey, Effect>,
    pub mute: bool,
}

impl Track {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clip(mut self, clip: Clip) -> Self {
        self.clips.push(clip);
        self
    }

    pub fn with_effect(mut self, key: EffectKey, effect: Effect) -> Self {
        self.effects.insert(key, effect);
        self
    }

    pub fn effect(&self, key: &EffectKey) -> Option<&Effect> {
        self.effects.get(key)
    }
}

/// A full compiled script result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Scalar tempo, used when the mix track carries no tempo automation.
    pub tempo: f64,
    /// Total length in measures.
    pub length: f64,
    pub tracks: Vec<Track>,
}

impl Project {
    pub fn new(tempo: f64, length: f64, tracks: Vec<Track>) -> Self {
        Self {
            tempo,
            length,
            tracks,
        }
    }

    /// Index of the metronome track (always the last).
    pub fn metronome_track(&self) -> Option<usize> {
        self.tracks.len().checked_sub(1)
    }

    /// Build the tempo map: from the mix track's tempo automation when
    /// present, otherwise a flat curve at the scalar tempo.
    pub fn tempo_map(&self) -> TempoMap {
        let curve = self
            .tracks
            .first()
            .and_then(|t| t.effect(&EffectKey::Tempo))
            .filter(|e| !e.ranges.is_empty());
        match curve {
            Some(effect) => {
                let mut points = Vec::with_capacity(effect.ranges.len() * 2);
                for range in &effect.ranges {
                    points.push(TempoPoint::new(range.start_measure, range.start_value));
                    points.push(TempoPoint::new(range.end_measure, range.end_value));
                }
                TempoMap::new(points)
            }
            None => TempoMap::constant(if self.tempo > 0.0 {
                self.tempo
            } else {
                DEFAULT_TEMPO
            }),
        }
    }

    /// One-time input-boundary validation. Everything downstream assumes a
    /// validated project.
    pub fn validate(&self) -> Result<()> {
        let result = self.check();
        if let Err(e) = &result {
            warn!("rejecting project: {e}");
        }
        result
    }

    fn check(&self) -> Result<()> {
        if self.tracks.is_empty() {
            return Err(Error::InvalidProject("no tracks".into()));
        }
        if !self.length.is_finite() || self.length < 0.0 {
            return Err(Error::InvalidProject(format!(
                "bad length: {}",
                self.length
            )));
        }
        if !self.tempo.is_finite() || self.tempo <= 0.0 {
            return Err(Error::InvalidTempo(self.tempo));
        }

        for (t, track) in self.tracks.iter().enumerate() {
            for clip in &track.clips {
                let bad = |reason: &str| Error::InvalidClip {
                    track: t,
                    filekey: clip.filekey.clone(),
                    reason: reason.into(),
                };
                if ![clip.measure, clip.start, clip.end]
                    .iter()
                    .all(|v| v.is_finite())
                {
                    return Err(bad("non-finite position"));
                }
                if clip.measure < 1.0 {
                    return Err(bad("measure before start of timeline"));
                }
                if clip.end < clip.start {
                    return Err(bad("end before start"));
                }
            }

            for (key, effect) in &track.effects {
                let bad = |reason: String| Error::InvalidEffect {
                    track: t,
                    key: key.to_string(),
                    reason,
                };
                for range in &effect.ranges {
                    if range.end_measure < range.start_measure {
                        return Err(bad(format!(
                            "range ends at {} before start {}",
                            range.end_measure, range.start_measure
                        )));
                    }
                }
                for pair in effect.ranges.windows(2) {
                    if pair[1].start_measure < pair[0].end_measure {
                        return Err(bad(format!(
                            "overlapping ranges at measure {}",
                            pair[1].start_measure
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
