//! Offline renderer.
//!
//! Mixes a compiled project into stereo sample buffers without any realtime
//! constraints, using the same clip placement rules as live playback: the
//! render window opens at measure 1 (time 0) and closes at the end of the
//! last measure.

use log::debug;
use ostinato_core::{db_to_linear, Clip, EffectKey, Project, TempoMap, Track};

use crate::error::{ExportError, Result};
use crate::limiter::Limiter;

/// Output sample rate for all rendering.
pub const SAMPLE_RATE: u32 = 44100;

/// Result of a render operation
#[derive(Debug, Clone)]
pub struct RenderResult {
    /// Left channel audio data
    pub left: Vec<f32>,
    /// Right channel audio data
    pub right: Vec<f32>,
    /// Sample rate of the rendered audio
    pub sample_rate: u32,
    /// Peak level (linear)
    pub peak_level: f32,
    /// Number of samples rendered
    pub length_samples: usize,
}

impl RenderResult {
    /// Get duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        self.length_samples as f64 / self.sample_rate as f64
    }

    /// Get interleaved stereo data [L, R, L, R, ...]
    pub fn interleaved(&self) -> Vec<f32> {
        let mut result = Vec::with_capacity(self.left.len() * 2);
        for i in 0..self.left.len() {
            result.push(self.left[i]);
            result.push(self.right[i]);
        }
        result
    }
}

/// Track gain from the start value of its volume automation, unity when the
/// track carries none.
fn track_gain(track: &Track) -> f32 {
    track
        .effect(&EffectKey::Volume)
        .filter(|e| !e.bypass)
        .and_then(|e| e.ranges.first())
        .map_or(1.0, |range| db_to_linear(range.start_value) as f32)
}

/// Mix one clip into the output at its timeline position.
fn mix_clip(
    clip: &Clip,
    gain: f32,
    tempo_map: &TempoMap,
    left: &mut [f32],
    right: &mut [f32],
) {
    let clip_start = tempo_map.measure_to_time(clip.measure);
    let clip_end = tempo_map.measure_to_time(clip.measure + clip.span());
    let start_index = (clip_start * SAMPLE_RATE as f64).round() as usize;
    let end_index = ((clip_end * SAMPLE_RATE as f64).round() as usize).min(left.len());

    let buffer = clip.effective_audio();
    let gain = gain * db_to_linear(clip.gain_db) as f32;
    let samples_left = buffer.channel(0);
    let stereo = buffer.num_channels() > 1;

    for (s, i) in (start_index..end_index).enumerate() {
        if s >= buffer.len() {
            break;
        }
        let l = samples_left[s];
        let r = if stereo { buffer.channel(1)[s] } else { l };
        left[i] += l * gain;
        right[i] += r * gain;
    }
}

/// Render a whole project to stereo buffers.
///
/// Every unmuted track except the metronome (the last track) is mixed in
/// with its clip gains and the start value of its volume automation, then
/// the mix bus runs through the brickwall [`Limiter`]. Any validation
/// failure aborts the render with no partial output.
pub fn render_buffer(project: &Project) -> Result<RenderResult> {
    debug!("rendering project to buffer");
    project.validate()?;

    let tempo_map = project.tempo_map();
    // +1 to render to the end of the last measure.
    let duration = tempo_map.measure_to_time(project.length + 1.0);
    if !duration.is_finite() || duration < 0.0 {
        return Err(ExportError::Render(format!("bad duration: {duration}")));
    }
    let total_samples = (duration * SAMPLE_RATE as f64).round() as usize;

    let mut left = vec![0.0f32; total_samples];
    let mut right = vec![0.0f32; total_samples];

    let metronome = project.metronome_track();
    for (t, track) in project.tracks.iter().enumerate() {
        if Some(t) == metronome && project.tracks.len() > 1 {
            continue;
        }
        if track.mute {
            continue;
        }
        let gain = track_gain(track);
        for clip in &track.clips {
            mix_clip(clip, gain, &tempo_map, &mut left, &mut right);
        }
    }

    Limiter::default().process(&mut left, &mut right, SAMPLE_RATE);

    let peak_level = left
        .iter()
        .chain(right.iter())
        .map(|s| s.abs())
        .fold(0.0f32, f32::max);

    debug!("render to buffer completed ({total_samples} samples)");
    Ok(RenderResult {
        left,
        right,
        sample_rate: SAMPLE_RATE,
        peak_level,
        length_samples: total_samples,
    })
}

/// Mix a bare clip list into one buffer, with no track gains or limiting.
pub fn merge_clips(clips: &[Clip], tempo_map: &TempoMap) -> Result<RenderResult> {
    debug!("merging {} clips", clips.len());
    let length = clips
        .iter()
        .map(|c| c.measure + c.span())
        .fold(0.0f64, f64::max);
    let duration = tempo_map.measure_to_time(length + 1.0);
    if !duration.is_finite() || duration < 0.0 {
        return Err(ExportError::Render(format!("bad duration: {duration}")));
    }
    let total_samples = (duration * SAMPLE_RATE as f64).round() as usize;

    let mut left = vec![0.0f32; total_samples];
    let mut right = vec![0.0f32; total_samples];
    for clip in clips {
        mix_clip(clip, 1.0, tempo_map, &mut left, &mut right);
    }

    let peak_level = left
        .iter()
        .chain(right.iter())
        .map(|s| s.abs())
        .fold(0.0f32, f32::max);

    Ok(RenderResult {
        left,
        right,
        sample_rate: SAMPLE_RATE,
        peak_level,
        length_samples: total_samples,
    })
}
