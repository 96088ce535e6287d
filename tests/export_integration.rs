//! Pipeline tests: pitch-shift pass into the offline renderer and the WAV
//! encoder, with hound reading the result back.

use std::io::Cursor;
use std::sync::Arc;

use approx::assert_relative_eq;
use ostinato::pitch::{shift_track, PitchShiftCache, PitchShifter};
use ostinato::{AudioBuffer, Clip, Effect, EffectKey, EffectRange, Project, Track};

/// Halves every sample so shifted output is distinguishable from the source.
struct HalvingShifter;

impl PitchShifter for HalvingShifter {
    fn hop_size(&self) -> usize {
        1024
    }

    fn shift(
        &self,
        samples: &[f32],
        _envelope: &[f32],
    ) -> Result<Vec<f32>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(samples.iter().map(|s| s * 0.5).collect())
    }
}

fn tone_clip(value: f32) -> Clip {
    Clip::new(
        "TONE",
        1.0,
        1.0,
        2.0,
        Arc::new(AudioBuffer::from_mono(vec![value; 2 * 44100], 44100)),
    )
}

fn project(track: Track) -> Project {
    // Mix track, one content track, metronome.
    Project::new(120.0, 1.0, vec![Track::new(), track, Track::new()])
}

#[test]
fn shifted_clips_feed_the_renderer() {
    let track = tone_track_with_shift(0.5);
    let mut project = project(track);

    let map = project.tempo_map();
    let mut cache = PitchShiftCache::new();
    shift_track(&mut project.tracks[1], &map, &HalvingShifter, &mut cache, 44100).unwrap();

    let result = ostinato::render_buffer(&project).unwrap();
    // The renderer picked up the halved buffer.
    assert_relative_eq!(result.left[100], 0.25, epsilon = 1e-6);
}

#[test]
fn unshifted_clips_render_at_full_level() {
    let project = project(Track::new().with_clip(tone_clip(0.5)));
    let result = ostinato::render_buffer(&project).unwrap();
    assert_relative_eq!(result.left[100], 0.5, epsilon = 1e-6);
}

#[test]
fn rendered_wav_reads_back() {
    let project = project(Track::new().with_clip(tone_clip(0.5)));
    let bytes = ostinato::export::render_wav(&project).unwrap();

    let mut reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 44100);
    assert_eq!(spec.bits_per_sample, 16);
    // One measure at 120 BPM is two seconds of stereo frames.
    assert_eq!(reader.duration(), 2 * 44100);

    let first: i16 = reader.samples::<i16>().next().unwrap().unwrap();
    assert_eq!(first, (0.5f32 * 32767.0) as i16);
}

fn tone_track_with_shift(value: f32) -> Track {
    Track::new().with_clip(tone_clip(value)).with_effect(
        EffectKey::PitchShift,
        Effect::new(vec![EffectRange::new(1.0, 2.0, 2.0, 2.0)]),
    )
}
