//! The per-track pitch-shift pass.

use std::sync::Arc;

use log::{debug, error};
use ostinato_core::{AudioBuffer, EffectKey, TempoMap, Track};

use crate::cache::{CacheKey, PitchShiftCache};
use crate::envelope::{clip_envelope, frame_envelope, is_bypass, track_envelope};
use crate::error::{Error, Result};
use crate::shifter::PitchShifter;

/// Pitch-shift every clip of `track` according to its pitch automation,
/// storing the results on the clips' `pitch_shifted` slots.
///
/// Clips whose envelope is the canonical no-op reuse the source buffer and
/// never reach the shifter. Shifted buffers are cached by sound slice and
/// envelope, so loop children cost one shift. A shifter failure on any clip
/// aborts the whole pass for the track.
pub fn shift_track(
    track: &mut Track,
    tempo_map: &TempoMap,
    shifter: &dyn PitchShifter,
    cache: &mut PitchShiftCache,
    sample_rate: u32,
) -> Result<()> {
    if track.clips.is_empty() {
        return Err(Error::EmptyTrack);
    }

    let ranges = track
        .effect(&EffectKey::PitchShift)
        .filter(|e| !e.bypass)
        .map(|e| e.ranges.as_slice())
        .unwrap_or(&[]);
    let hop_size = shifter.hop_size();
    let env = track_envelope(ranges, tempo_map, sample_rate, hop_size);

    cache.evict_if_full();

    for clip in &mut track.clips {
        let bend = clip_envelope(clip, tempo_map, sample_rate, hop_size, &env);
        let key = CacheKey::new(clip, &bend);

        let shifted = if let Some(hit) = cache.get(&key) {
            debug!("pitchshift: cache hit for {}", clip.filekey);
            hit
        } else if is_bypass(&bend) {
            debug!("pitchshift: bypassing {}", clip.filekey);
            Arc::clone(&clip.audio)
        } else {
            debug!("pitchshift: computing shift for {}", clip.filekey);
            let samples = clip.audio.channel(0);
            let num_frames = shifter.num_frames(samples.len());
            let envelope = frame_envelope(&bend, num_frames);
            let out = shifter.shift(samples, &envelope).map_err(|source| {
                error!("pitchshift: failed to process {}", clip.filekey);
                Error::Dsp {
                    filekey: clip.filekey.clone(),
                    source,
                }
            })?;
            let buffer = Arc::new(AudioBuffer::from_mono(out, sample_rate));
            cache.insert(key, Arc::clone(&buffer));
            buffer
        };

        clip.pitch_shifted = Some(shifted);
    }
    Ok(())
}
