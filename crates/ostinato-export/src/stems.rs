//! Per-track stem export.
//!
//! Renders each content track in isolation by muting every other content
//! track and re-running the offline render, so track volume automation and
//! the mix bus limiter apply to stems exactly as they do to the full mix.
//! The stems are packaged as one WAV per track in a zip archive.

use std::io::{Cursor, Write};

use log::debug;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use ostinato_core::Project;

use crate::error::Result;
use crate::format::wav::encode_wav_memory;
use crate::renderer::render_buffer;

/// Indices of the tracks that get a stem: every track except the mix track
/// (index 0) and the metronome (the last track).
fn stem_tracks(project: &Project) -> Vec<usize> {
    let metronome = project.metronome_track();
    (0..project.tracks.len())
        .filter(|&t| t != 0 && Some(t) != metronome)
        .collect()
}

/// Render every content track to its own WAV and bundle them in a zip.
pub fn render_stems(project: &Project) -> Result<Vec<u8>> {
    project.validate()?;

    let tracks = stem_tracks(project);
    debug!("rendering {} stems", tracks.len());

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for &t in &tracks {
        let mut solo = project.clone();
        for (other, track) in solo.tracks.iter_mut().enumerate() {
            if other != t && tracks.contains(&other) {
                track.mute = true;
            }
        }
        let rendered = render_buffer(&solo)?;
        let wav = encode_wav_memory(&rendered.left, &rendered.right, rendered.sample_rate)?;

        writer.start_file(format!("track_{t:02}.wav"), options)?;
        writer.write_all(&wav)?;
    }

    Ok(writer.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ostinato_core::{AudioBuffer, Clip, Track};
    use std::io::Read;
    use std::sync::Arc;

    fn tone_track(value: f32) -> Track {
        let samples = vec![value; 2 * crate::renderer::SAMPLE_RATE as usize];
        Track::new().with_clip(Clip::new(
            "TONE",
            1.0,
            1.0,
            2.0,
            Arc::new(AudioBuffer::from_mono(samples, crate::renderer::SAMPLE_RATE)),
        ))
    }

    #[test]
    fn test_stem_tracks_skip_mix_and_metronome() {
        let project = Project::new(
            120.0,
            1.0,
            vec![Track::new(), Track::new(), Track::new(), Track::new()],
        );
        assert_eq!(stem_tracks(&project), vec![1, 2]);
    }

    #[test]
    fn test_render_stems_one_entry_per_track() {
        let project = Project::new(
            120.0,
            1.0,
            vec![
                Track::new(),
                tone_track(0.5),
                tone_track(0.25),
                Track::new(),
            ],
        );
        let bytes = render_stems(&project).unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);

        let names: Vec<String> = archive.file_names().map(String::from).collect();
        assert!(names.contains(&"track_01.wav".to_string()));
        assert!(names.contains(&"track_02.wav".to_string()));

        let mut wav = Vec::new();
        archive
            .by_name("track_01.wav")
            .unwrap()
            .read_to_end(&mut wav)
            .unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
    }

    #[test]
    fn test_stems_are_isolated() {
        // The second track is silent, so its stem must carry no signal even
        // though the first one does.
        let project = Project::new(
            120.0,
            1.0,
            vec![Track::new(), tone_track(0.5), Track::new(), Track::new()],
        );
        let bytes = render_stems(&project).unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut wav = Vec::new();
        archive
            .by_name("track_02.wav")
            .unwrap()
            .read_to_end(&mut wav)
            .unwrap();
        // Every PCM sample after the 44-byte header is zero.
        assert!(wav[44..].iter().all(|&b| b == 0));
    }
}
