//! Pitch automation envelopes in hop-frame units.
//!
//! Automation ranges live on the measure timeline; the shifter consumes a
//! per-hop semitone array. The conversion goes measure -> seconds (through
//! the tempo map) -> hop frames, so tempo changes are reflected in where the
//! bends land.

use ostinato_core::{Clip, EffectRange, TempoMap};

/// Backward nudge, in hop frames, applied when a range starts exactly where
/// the previous one ended. Keeps every segment at least this many frames
/// long so the interpolation has room to ramp.
pub const QFRAMES: i64 = 16;

/// Role of an envelope point. `Add` points are synthetic bridges between
/// automation ranges; they shape the track envelope but are stripped before
/// per-clip extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKind {
    Start,
    Add,
    End,
}

/// One envelope breakpoint at a hop-frame position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopePoint {
    pub frame: i64,
    pub semitone: f64,
    pub kind: PointKind,
}

impl EnvelopePoint {
    pub const fn new(frame: i64, semitone: f64, kind: PointKind) -> Self {
        Self {
            frame,
            semitone,
            kind,
        }
    }
}

/// Hop-frame position of a measure.
fn measure_to_frame(tempo_map: &TempoMap, measure: f64, sample_rate: u32, hop_size: usize) -> i64 {
    (tempo_map.measure_to_time(measure) * sample_rate as f64 / hop_size as f64).round() as i64
}

/// Append one automation range to a track envelope, bridging the gap from
/// the previous range with flat `Add` points.
fn add_envelope_point(
    points: &mut Vec<EnvelopePoint>,
    range: &EffectRange,
    tempo_map: &TempoMap,
    sample_rate: u32,
    hop_size: usize,
) {
    let mut start = EnvelopePoint::new(
        measure_to_frame(tempo_map, range.start_measure, sample_rate, hop_size),
        range.start_value,
        PointKind::Start,
    );

    // Back-to-back ranges share a frame; nudge the previous end backward so
    // both segments keep nonzero width.
    if let Some(last) = points.last_mut() {
        if start.frame == last.frame {
            last.frame -= QFRAMES;
        }
    }

    if points.is_empty() && start.frame > 0 {
        points.push(EnvelopePoint::new(0, 0.0, PointKind::Add));
        if start.frame > QFRAMES {
            points.push(EnvelopePoint::new(start.frame - QFRAMES, 0.0, PointKind::Add));
        }
    }

    if let Some(last) = points.last_mut() {
        if last.frame < 0 {
            last.frame = start.frame - QFRAMES;
        }
    }

    if let Some(last) = points.last().copied() {
        if start.frame - QFRAMES > last.frame {
            points.push(EnvelopePoint::new(
                start.frame - QFRAMES,
                last.semitone,
                PointKind::Add,
            ));
        }
    }

    if start.frame < 0 {
        start.frame = 0;
    }
    points.push(start);

    let mut end = EnvelopePoint::new(
        measure_to_frame(tempo_map, range.end_measure, sample_rate, hop_size),
        range.end_value,
        PointKind::End,
    );

    // A zero-length range at the origin degenerates to a marker; park it at
    // -1 so the next range's bridge logic repositions it.
    if end.frame == 0 {
        end.frame = -1;
        end.semitone = start.semitone;
    }
    if end.frame > 0 {
        points.push(end);
    }
}

/// Build the whole-track pitch envelope from the ordered automation ranges.
pub fn track_envelope(
    ranges: &[EffectRange],
    tempo_map: &TempoMap,
    sample_rate: u32,
    hop_size: usize,
) -> Vec<EnvelopePoint> {
    let mut points = Vec::new();
    for range in ranges {
        add_envelope_point(&mut points, range, tempo_map, sample_rate, hop_size);
    }
    points
}

/// Semitone value of the envelope at `frame`: linear between breakpoints,
/// held flat before the first and after the last.
fn semitone_at(env: &[EnvelopePoint], frame: i64) -> f64 {
    match env {
        [] => 0.0,
        [only] => only.semitone,
        _ => {
            if frame <= env[0].frame {
                return env[0].semitone;
            }
            for pair in env.windows(2) {
                if frame <= pair[1].frame {
                    let dx = (pair[1].frame - pair[0].frame) as f64;
                    let dy = pair[1].semitone - pair[0].semitone;
                    return pair[0].semitone + dy * (frame - pair[0].frame) as f64 / dx;
                }
            }
            env[env.len() - 1].semitone
        }
    }
}

/// Extract the portion of a track envelope covering one clip, renormalized
/// to clip-relative frames.
///
/// Points inside the clip window are kept; where the window cuts a segment,
/// an interpolated boundary point is synthesized. Flat holds pad the ends so
/// the envelope always spans the whole clip, and a clip with no automation
/// overlap gets a two-point envelope at the interpolated track value.
pub fn clip_envelope(
    clip: &Clip,
    tempo_map: &TempoMap,
    sample_rate: u32,
    hop_size: usize,
    track_env: &[EnvelopePoint],
) -> Vec<EnvelopePoint> {
    let clip_start = measure_to_frame(tempo_map, clip.measure, sample_rate, hop_size);
    let clip_end = measure_to_frame(
        tempo_map,
        clip.measure + clip.span(),
        sample_rate,
        hop_size,
    );
    let clip_len = clip_end - clip_start;

    let mut env: Vec<EnvelopePoint> = track_env
        .iter()
        .filter(|p| p.kind != PointKind::Add)
        .copied()
        .collect();
    if env.is_empty() {
        return vec![EnvelopePoint::new(0, 0.0, PointKind::Start)];
    }

    // Rounding can collapse adjacent points onto one frame; force strictly
    // increasing frames so no segment has zero width.
    for i in 1..env.len() {
        if env[i].frame <= env[i - 1].frame {
            env[i].frame = env[i - 1].frame + 1;
        }
    }

    let mut points: Vec<EnvelopePoint> = Vec::new();

    // Synthetic boundary point where the clip window cuts into a segment.
    let starts_mid_segment = env
        .windows(2)
        .any(|pair| pair[0].frame < clip_start && clip_start < pair[1].frame);
    if starts_mid_segment {
        points.push(EnvelopePoint::new(
            0,
            semitone_at(&env, clip_start),
            PointKind::Start,
        ));
    }

    points.extend(
        env.iter()
            .filter(|p| p.frame >= clip_start && p.frame <= clip_end)
            .map(|p| EnvelopePoint::new(p.frame - clip_start, p.semitone, p.kind)),
    );

    let ends_mid_segment = env
        .windows(2)
        .any(|pair| pair[0].frame < clip_end && clip_end < pair[1].frame);
    if ends_mid_segment {
        points.push(EnvelopePoint::new(
            clip_len,
            semitone_at(&env, clip_end),
            PointKind::End,
        ));
    }

    if points.is_empty() {
        // Clip lies entirely between (or outside) automation segments.
        points = vec![
            EnvelopePoint::new(0, semitone_at(&env, clip_start), PointKind::Start),
            EnvelopePoint::new(clip_len, semitone_at(&env, clip_end), PointKind::End),
        ];
    }

    // Flat holds out to the clip edges.
    if points[0].frame > 0 {
        let first = points[0];
        points.insert(0, EnvelopePoint::new(0, first.semitone, PointKind::Start));
    }
    if let Some(&last) = points.last() {
        if last.frame < clip_len {
            points.push(EnvelopePoint::new(clip_len, last.semitone, PointKind::End));
        }
    }

    // All-zero envelopes canonicalize to the single-point form so the
    // bypass fast path recognizes them.
    if points.iter().all(|p| p.semitone == 0.0) {
        return vec![EnvelopePoint::new(0, 0.0, PointKind::Start)];
    }

    points
}

/// True when the envelope is the canonical no-op: one point at semitone 0.
pub fn is_bypass(points: &[EnvelopePoint]) -> bool {
    points.len() == 1 && points[0].semitone == 0.0
}

/// Interpolate envelope breakpoints into one semitone value per hop frame.
pub fn frame_envelope(points: &[EnvelopePoint], num_frames: usize) -> Vec<f32> {
    let mut envelope = vec![0.0f32; num_frames];
    let mut index = 1;
    for (f, out) in envelope.iter_mut().enumerate() {
        let frame = f as i64;
        if index < points.len() && frame > points[index].frame {
            index += 1;
        }
        if index >= points.len() {
            *out = points[points.len() - 1].semitone as f32;
        } else {
            let prev = points[index - 1];
            let next = points[index];
            let dy = next.semitone - prev.semitone;
            let dx = (next.frame - prev.frame) as f64;
            *out = (prev.semitone + dy * (frame - prev.frame) as f64 / dx) as f32;
        }
    }
    envelope
}
