//! The playback session.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, error, warn};
use ostinato_core::{db_to_linear, Clip, Project, TempoMap};

use crate::clock::AudioClock;
use crate::graph::{AudioGraph, EffectGraphBuilder, NodeId};
use crate::timer::Scheduled;

/// Fraction of the playback window after which the next loop iteration is
/// scheduled. Leaves enough headroom to build the next graph before the
/// current window ends.
const LOOP_SCHED_FRACTION: f64 = 0.95;

/// Loop region configuration.
///
/// With `selection` set, looping covers `start..end`; otherwise the whole
/// project loops.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LoopSpec {
    pub on: bool,
    pub selection: bool,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, Copy)]
struct PlaybackData {
    start_measure: f64,
    end_measure: f64,
    playhead: f64,
    start_offset: f64,
}

impl Default for PlaybackData {
    fn default() -> Self {
        Self {
            start_measure: 1.0,
            end_measure: 1.0,
            playhead: 1.0,
            start_offset: 0.0,
        }
    }
}

/// Node handles of one built graph, kept for teardown.
struct LiveGraph {
    master: NodeId,
    track_gains: Vec<NodeId>,
    sources: Vec<NodeId>,
}

struct QueueEntry {
    project: Project,
    tempo_map: TempoMap,
    live: Option<LiveGraph>,
}

#[derive(Debug, Clone, Copy)]
struct StartAction {
    start: f64,
    end: f64,
    wa_start: f64,
}

#[derive(Debug, Clone, Copy)]
struct LoopAction {
    start: f64,
    end: f64,
    total: f64,
    base: f64,
}

#[derive(Debug, Clone, Copy)]
enum DueTimer {
    PlayStart,
    LoopSched,
    PlayEnd,
}

/// Schedule one clip into the graph. Returns the source node, or `None`
/// when the clip falls outside the playback window.
fn schedule_clip<G: AudioGraph>(
    graph: &mut G,
    clip: &Clip,
    track_gain: NodeId,
    tempo_map: &TempoMap,
    start_time: f64,
    end_time: f64,
    wa_start: f64,
) -> Option<NodeId> {
    let clip_start = tempo_map.measure_to_time(clip.measure);
    let clip_end = tempo_map.measure_to_time(clip.measure + clip.span());
    let mut duration = clip_end - clip_start;

    if start_time >= clip_end {
        // Entirely in the past.
        return None;
    }
    if start_time >= clip_start {
        // Playback cuts in partway through the clip.
        let into_clip = start_time - clip_start;
        if clip_end > end_time {
            duration = end_time - clip_start;
        }
        let source = graph.create_source(Arc::clone(clip.effective_audio()));
        graph.start_source(source, wa_start, into_clip, duration - into_clip);
        graph.connect(source, track_gain);
        Some(source)
    } else {
        if clip_start > end_time {
            // Starts after the window closes.
            return None;
        }
        if clip_end > end_time {
            duration = end_time - clip_start;
        }
        let until_start = clip_start - start_time;
        let source = graph.create_source(Arc::clone(clip.effective_audio()));
        graph.start_source(source, wa_start + until_start, 0.0, duration);
        graph.connect(source, track_gain);
        Some(source)
    }
}

/// Owns all playback state: the two-slot rendering queue, the live audio
/// graph, the loop configuration, and the transport timers.
///
/// The session is driven by [`tick`](Self::tick): callers pump it against
/// the injected clock and it fires whatever timers have come due. Nothing
/// here blocks or spawns threads.
pub struct PlayerSession<C, G, B> {
    clock: C,
    graph: G,
    builder: B,
    mix: NodeId,
    queue: [Option<QueueEntry>; 2],
    is_playing: bool,
    wa_time_started: f64,
    playback: PlaybackData,
    loop_spec: LoopSpec,
    loop_scheduled_while_paused: bool,
    muted_tracks: Vec<usize>,
    bypassed_effects: HashMap<usize, Vec<String>>,
    play_start: Option<Scheduled<StartAction>>,
    play_end: Option<Scheduled<()>>,
    loop_sched: Option<Scheduled<LoopAction>>,
    on_started: Option<Box<dyn FnMut()>>,
    on_finished: Option<Box<dyn FnMut()>>,
}

impl<C: AudioClock, G: AudioGraph, B: EffectGraphBuilder> PlayerSession<C, G, B> {
    pub fn new(clock: C, mut graph: G, builder: B) -> Self {
        let mix = graph.create_gain(1.0);
        graph.connect_to_destination(mix);
        Self {
            clock,
            graph,
            builder,
            mix,
            queue: [None, None],
            is_playing: false,
            wa_time_started: 0.0,
            playback: PlaybackData::default(),
            loop_spec: LoopSpec::default(),
            loop_scheduled_while_paused: false,
            muted_tracks: Vec::new(),
            bypassed_effects: HashMap::new(),
            play_start: None,
            play_end: None,
            loop_sched: None,
            on_started: None,
            on_finished: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn loop_spec(&self) -> LoopSpec {
        self.loop_spec
    }

    pub fn set_on_started(&mut self, callback: impl FnMut() + 'static) {
        self.on_started = Some(Box::new(callback));
    }

    pub fn set_on_finished(&mut self, callback: impl FnMut() + 'static) {
        self.on_finished = Some(Box::new(callback));
    }

    fn project_length(&self) -> Option<f64> {
        self.queue[1].as_ref().map(|e| e.project.length)
    }

    /// Swap in a newly compiled project. The previous project keeps playing
    /// until the next measure boundary, then the session switches over.
    pub fn set_rendering_data(&mut self, project: Project) -> ostinato_core::Result<()> {
        debug!("setting new rendering data");
        project.validate()?;

        self.clear_audio_graph(0, 0.0);
        let entry = QueueEntry {
            tempo_map: project.tempo_map(),
            project,
            live: None,
        };
        self.queue[0] = self.queue[1].take();
        self.queue[1] = Some(entry);

        if self.is_playing {
            self.refresh(false);
        } else {
            self.clear_all_audio_graphs(0.0);
        }
        Ok(())
    }

    /// Start playback over `start_measure..end_measure`, `offset` seconds
    /// from now. Builds the audio graph immediately; playback state commits
    /// when the start timer fires.
    pub fn play(&mut self, start_measure: f64, end_measure: f64, offset: f64) {
        if self.queue[1].is_none() {
            error!("play requested with no rendering data");
            return;
        }
        debug!("starting playback at {start_measure}..{end_measure} (offset {offset})");

        let mut end_measure = end_measure;
        if self.loop_spec.on && self.loop_spec.selection {
            end_measure = self.loop_spec.end;
        }

        // One live graph per queue entry: tear down before rebuilding.
        self.clear_audio_graph(1, 0.0);

        let Some(mut entry) = self.queue[1].take() else {
            return;
        };
        let tempo_map = entry.tempo_map.clone();
        let start_time = tempo_map.measure_to_time(start_measure);
        let end_time = tempo_map.measure_to_time(end_measure);
        let now = self.clock.now();
        let wa_start = now + offset;

        let master = self.graph.create_gain(1.0);
        let mut live = LiveGraph {
            master,
            track_gains: Vec::new(),
            sources: Vec::new(),
        };
        let no_bypass: Vec<String> = Vec::new();

        for (t, track) in entry.project.tracks.iter().enumerate() {
            if self.muted_tracks.contains(&t) {
                continue;
            }
            let bypassed = self.bypassed_effects.get(&t).unwrap_or(&no_bypass);
            let output = if t == 0 { self.mix } else { master };
            let chain_input = self.builder.build(
                &mut self.graph,
                t,
                track,
                &tempo_map,
                start_time,
                bypassed,
                output,
            );

            let track_gain = self.graph.create_gain(1.0);
            for clip in &track.clips {
                if let Some(source) = schedule_clip(
                    &mut self.graph,
                    clip,
                    track_gain,
                    &tempo_map,
                    start_time,
                    end_time,
                    wa_start,
                ) {
                    live.sources.push(source);
                }
            }

            if t == 0 {
                // The mix track processes the summed output of the others.
                self.graph.connect(master, track_gain);
            }
            match chain_input {
                Some(input) => self.graph.connect(track_gain, input),
                None => self.graph.connect(track_gain, output),
            }
            live.track_gains.push(track_gain);
        }

        entry.live = Some(live);
        self.queue[1] = Some(entry);

        self.play_start = Some(Scheduled::at(
            now + offset,
            StartAction {
                start: start_measure,
                end: end_measure,
                wa_start,
            },
        ));

        let total = end_time - start_time;
        if self.loop_spec.on && self.loop_scheduled_while_paused {
            self.loop_sched = Some(Scheduled::at(
                now + (total + offset) * LOOP_SCHED_FRACTION,
                LoopAction {
                    start: start_measure,
                    end: end_measure,
                    total,
                    base: wa_start,
                },
            ));
        }
        self.play_end = Some(Scheduled::at(now + total + offset, ()));
    }

    /// Stop playback, leaving the playhead at the start of the current
    /// playback range. Safe to call repeatedly.
    pub fn pause(&mut self) {
        debug!("pausing");
        self.clear_all_audio_graphs(0.0);
        self.is_playing = false;
        self.playback.playhead = self.playback.start_measure;
        self.clear_all_timers();
    }

    /// Return the session to its initial transport state.
    pub fn reset(&mut self) {
        debug!("resetting");
        self.clear_all_audio_graphs(0.0);
        self.clear_all_timers();
        self.playback = PlaybackData::default();
    }

    /// Current playhead in measures, derived from elapsed clock time through
    /// the tempo map.
    pub fn get_position(&mut self) -> f64 {
        if self.is_playing {
            if let Some(entry) = &self.queue[1] {
                let start_time = entry
                    .tempo_map
                    .measure_to_time(self.playback.start_measure + self.playback.start_offset);
                let current_time = start_time + (self.clock.now() - self.wa_time_started);
                self.playback.playhead = entry.tempo_map.time_to_measure(current_time);
            }
        }
        self.playback.playhead
    }

    /// Move the playhead. While playing, playback restarts from `position`
    /// at the next measure boundary.
    pub fn set_position(&mut self, position: f64) {
        debug!("setting position to {position}");
        self.clear_all_timers();

        if !self.is_playing {
            self.playback.playhead = position;
            return;
        }
        let Some(length) = self.project_length() else {
            error!("position change with no rendering data");
            return;
        };
        if self.loop_spec.on {
            self.loop_scheduled_while_paused = true;
            if !self.loop_spec.selection {
                self.playback.end_measure = length + 1.0;
            }
        }
        let current = self.get_position();
        let next = (current + 1.0).floor();
        let Some(entry) = &self.queue[1] else { return };
        let delay =
            entry.tempo_map.measure_to_time(next) - entry.tempo_map.measure_to_time(current);
        self.clear_all_audio_graphs(delay);
        let end = self.playback.end_measure;
        self.play(position, end, delay);
    }

    /// Rebuild playback from the next measure boundary. Used after any
    /// change that affects the built graph (new project, mutes, bypasses)
    /// so the switch lands on a bar line instead of mid-measure.
    pub fn refresh(&mut self, clear_all: bool) {
        if !self.is_playing {
            return;
        }
        debug!("refreshing playback from the next measure boundary");
        let current = self.get_position();
        let next = (current + 1.0).floor();
        let Some(entry) = &self.queue[1] else {
            error!("refresh with no rendering data");
            return;
        };
        let delay =
            entry.tempo_map.measure_to_time(next) - entry.tempo_map.measure_to_time(current);
        if clear_all {
            self.clear_all_audio_graphs(delay);
        } else {
            self.clear_audio_graph(0, delay);
        }
        let start = if next == self.playback.end_measure {
            self.playback.start_measure
        } else {
            next
        };
        let end = self.playback.end_measure;
        self.play(start, end, delay);
    }

    /// Master playback volume in decibels.
    pub fn set_volume(&mut self, gain_db: f64) {
        debug!("setting playback volume to {gain_db} dB");
        let now = self.clock.now();
        self.graph.set_gain_at(self.mix, db_to_linear(gain_db), now);
    }

    pub fn set_muted_tracks(&mut self, muted: Vec<usize>) {
        self.muted_tracks = muted;
        if self.is_playing {
            self.refresh(true);
        }
    }

    /// Per-track lists of effect parameter names to bypass, in their
    /// `"EFFECT-PARAMETER"` string form.
    pub fn set_bypassed_effects(&mut self, bypassed: HashMap<usize, Vec<String>>) {
        self.bypassed_effects = bypassed;
        if self.is_playing {
            self.refresh(true);
        }
    }

    pub fn set_loop(&mut self, spec: LoopSpec) {
        debug!("setting loop: {}", spec.on);
        self.loop_spec = spec;
        self.apply_loop_change();
    }

    /// Toggle whole-project looping, resetting the playback range to the
    /// full project.
    pub fn set_loop_enabled(&mut self, on: bool) {
        debug!("setting loop: {on}");
        self.loop_spec.on = on;
        if let Some(length) = self.project_length() {
            self.playback.start_measure = 1.0;
            self.playback.end_measure = length + 1.0;
        }
        self.apply_loop_change();
    }

    fn apply_loop_change(&mut self) {
        self.clear_all_timers();
        let Some(length) = self.project_length() else {
            error!("loop change with no rendering data");
            return;
        };
        let current = self.get_position();
        let Some(entry) = &self.queue[1] else { return };
        let tempo_map = entry.tempo_map.clone();
        let current_time = tempo_map.measure_to_time(current);

        if self.loop_spec.on {
            if !self.is_playing {
                self.loop_scheduled_while_paused = true;
                return;
            }
            debug!("loop switched on while playing");
            self.loop_scheduled_while_paused = false;

            let (start, end, time_till_loop) = if self.loop_spec.selection {
                let mut start = self.loop_spec.start;
                let end = self.loop_spec.end;
                let time_till = if current >= start && current < end {
                    if current < end - 1.0 {
                        start = current.ceil();
                        tempo_map.measure_to_time((current + 1.0).floor()) - current_time
                    } else {
                        tempo_map.measure_to_time(end) - current_time
                    }
                } else {
                    tempo_map.measure_to_time((current + 1.0).floor()) - current_time
                };
                (start, end, time_till)
            } else {
                (
                    1.0,
                    length + 1.0,
                    tempo_map.measure_to_time(length + 1.0) - current_time,
                )
            };

            let base = self.clock.now();
            self.loop_sched = Some(Scheduled::at(
                base + time_till_loop * LOOP_SCHED_FRACTION,
                LoopAction {
                    start,
                    end,
                    total: time_till_loop,
                    base,
                },
            ));
        } else {
            self.loop_sched = None;
            self.loop_scheduled_while_paused = false;

            if self.is_playing
                && current < self.playback.end_measure
                && self.playback.end_measure <= length + 1.0
            {
                debug!("loop switched off while playing");
                let time_till = tempo_map.measure_to_time(self.playback.end_measure) - current_time;
                let start = self.playback.end_measure;
                self.clear_all_audio_graphs(time_till);
                self.play(start, length + 1.0, time_till);
            }
        }
    }

    /// Fire every timer that has come due. Call this regularly; timers
    /// never fire on their own.
    pub fn tick(&mut self) {
        loop {
            let now = self.clock.now();
            let mut next: Option<(f64, DueTimer)> = None;
            if let Some(t) = &self.play_start {
                if t.is_due(now) {
                    next = Some((t.due, DueTimer::PlayStart));
                }
            }
            if let Some(t) = &self.loop_sched {
                if t.is_due(now) && next.map_or(true, |(due, _)| t.due < due) {
                    next = Some((t.due, DueTimer::LoopSched));
                }
            }
            if let Some(t) = &self.play_end {
                if t.is_due(now) && next.map_or(true, |(due, _)| t.due < due) {
                    next = Some((t.due, DueTimer::PlayEnd));
                }
            }
            let Some((_, role)) = next else { break };
            match role {
                DueTimer::PlayStart => {
                    if let Some(timer) = self.play_start.take() {
                        self.fire_play_start(timer.payload);
                    }
                }
                DueTimer::LoopSched => {
                    if let Some(timer) = self.loop_sched.take() {
                        self.fire_loop(timer.payload);
                    }
                }
                DueTimer::PlayEnd => {
                    if self.play_end.take().is_some() {
                        self.fire_play_end();
                    }
                }
            }
        }
    }

    fn fire_play_start(&mut self, action: StartAction) {
        let Some(length) = self.project_length() else {
            return;
        };
        let (mut start, mut end) = (action.start, action.end);
        if self.loop_spec.on {
            if self.loop_spec.selection {
                self.playback.start_offset = if start > self.loop_spec.start {
                    start - self.loop_spec.start
                } else {
                    0.0
                };
                start = self.loop_spec.start;
                end = self.loop_spec.end;
            } else {
                self.playback.start_offset = start - 1.0;
                start = 1.0;
                end = length + 1.0;
            }
        } else {
            self.playback.start_offset = 0.0;
        }
        debug!("recording playback data: {start}..{end}");
        self.playback.start_measure = start;
        self.playback.end_measure = end;
        self.wa_time_started = action.wa_start;
        self.is_playing = true;
        if let Some(callback) = &mut self.on_started {
            callback();
        }
    }

    fn fire_loop(&mut self, action: LoopAction) {
        debug!("scheduling loop iteration");
        self.play_end = None;
        let offset = (action.total - (self.clock.now() - action.base)).max(0.0);
        self.clear_all_audio_graphs(offset);
        self.loop_scheduled_while_paused = true;
        self.play(action.start, action.end, offset);
    }

    fn fire_play_end(&mut self) {
        debug!("playback window ended");
        self.pause();
        self.reset();
        if let Some(callback) = &mut self.on_finished {
            callback();
        }
    }

    fn clear_all_timers(&mut self) {
        self.play_start = None;
        self.play_end = None;
        self.loop_sched = None;
    }

    fn clear_audio_graph(&mut self, index: usize, delay: f64) {
        let Some(entry) = self.queue[index].as_mut() else {
            return;
        };
        let Some(live) = entry.live.take() else {
            return;
        };
        debug!("tearing down audio graph {index}");
        let when = self.clock.now() + delay;
        for source in live.sources {
            if !self.graph.stop_source(source, when) {
                warn!("stop requested on a source that is not playing");
            }
            self.graph.disconnect(source);
        }
        self.graph.set_gain_at(live.master, 0.0, when);
        for gain in live.track_gains {
            self.graph.disconnect(gain);
        }
        self.graph.disconnect(live.master);
    }

    fn clear_all_audio_graphs(&mut self, delay: f64) {
        self.clear_audio_graph(0, delay);
        self.clear_audio_graph(1, delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NoEffects;
    use crate::mock::{GraphEvent, MockClock, MockGraph, RecordingBuilder};
    use approx::assert_relative_eq;
    use ostinato_core::{AudioBuffer, Effect, EffectKey, EffectRange, Project, Track};
    use std::cell::Cell;
    use std::rc::Rc;

    // All tests run at 120 BPM in 4/4: measure m sits at 2 * (m - 1) seconds.

    fn clip(measure: f64, span: f64) -> Clip {
        Clip::new(
            "KIT_1",
            measure,
            1.0,
            1.0 + span,
            Arc::new(AudioBuffer::from_mono(vec![0.1; 44100], 44100)),
        )
    }

    fn project(length: f64, clips: Vec<Clip>) -> Project {
        let mut track = Track::new();
        for c in clips {
            track = track.with_clip(c);
        }
        Project::new(120.0, length, vec![Track::new(), track])
    }

    fn session() -> (
        PlayerSession<MockClock, MockGraph, NoEffects>,
        MockClock,
        MockGraph,
    ) {
        let clock = MockClock::new();
        let graph = MockGraph::new();
        let session = PlayerSession::new(clock.clone(), graph.clone(), NoEffects);
        (session, clock, graph)
    }

    #[test]
    fn test_play_without_data_is_noop() {
        let (mut session, _clock, graph) = session();
        session.play(1.0, 5.0, 0.0);
        session.tick();
        assert_eq!(graph.sources_started(), 0);
        assert!(!session.is_playing());
    }

    #[test]
    fn test_play_schedules_current_and_future_clips() {
        let (mut session, _clock, graph) = session();
        session
            .set_rendering_data(project(4.0, vec![clip(1.0, 2.0), clip(3.0, 1.0)]))
            .unwrap();
        session.play(1.0, 5.0, 0.0);
        session.tick();

        assert!(session.is_playing());
        let starts = graph.starts();
        assert_eq!(starts.len(), 2);
        // First clip plays immediately for its full 4 seconds.
        assert_relative_eq!(starts[0].1, 0.0);
        assert_relative_eq!(starts[0].2, 0.0);
        assert_relative_eq!(starts[0].3, 4.0);
        // Second clip is deferred until measure 3.
        assert_relative_eq!(starts[1].1, 4.0);
        assert_relative_eq!(starts[1].3, 2.0);
    }

    #[test]
    fn test_play_enters_clip_mid_buffer() {
        let (mut session, _clock, graph) = session();
        session
            .set_rendering_data(project(4.0, vec![clip(1.0, 2.0)]))
            .unwrap();
        session.play(2.0, 5.0, 0.0);

        let starts = graph.starts();
        assert_eq!(starts.len(), 1);
        // Offset 2 seconds into the buffer, 2 seconds remaining.
        assert_relative_eq!(starts[0].2, 2.0);
        assert_relative_eq!(starts[0].3, 2.0);
    }

    #[test]
    fn test_play_skips_past_clips() {
        let (mut session, _clock, graph) = session();
        session
            .set_rendering_data(project(4.0, vec![clip(1.0, 2.0), clip(4.0, 1.0)]))
            .unwrap();
        // Measure 3.5: the first clip (1..3) is already over.
        session.play(3.5, 5.0, 0.0);

        let starts = graph.starts();
        assert_eq!(starts.len(), 1);
        assert_relative_eq!(starts[0].1, 1.0);
    }

    #[test]
    fn test_window_end_truncates_and_skips() {
        let (mut session, _clock, graph) = session();
        session
            .set_rendering_data(project(4.0, vec![clip(1.0, 2.0), clip(3.0, 1.0)]))
            .unwrap();
        // Window closes at measure 2: clip one is cut short, clip two never plays.
        session.play(1.0, 2.0, 0.0);

        let starts = graph.starts();
        assert_eq!(starts.len(), 1);
        assert_relative_eq!(starts[0].3, 2.0);
    }

    #[test]
    fn test_position_follows_tempo_map() {
        let (mut session, clock, _graph) = session();
        let mut data = project(8.0, vec![clip(1.0, 2.0)]);
        data.tracks[0].effects.insert(
            EffectKey::Tempo,
            Effect::new(vec![EffectRange::new(1.0, 9.0, 60.0, 120.0)]),
        );
        let expected_map = data.tempo_map();
        session.set_rendering_data(data).unwrap();
        session.play(1.0, 9.0, 0.0);
        session.tick();

        clock.advance(3.0);
        assert_relative_eq!(
            session.get_position(),
            expected_map.time_to_measure(3.0),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_started_and_finished_callbacks() {
        let (mut session, clock, graph) = session();
        let started = Rc::new(Cell::new(0));
        let finished = Rc::new(Cell::new(0));
        let started_handle = Rc::clone(&started);
        let finished_handle = Rc::clone(&finished);
        session.set_on_started(move || started_handle.set(started_handle.get() + 1));
        session.set_on_finished(move || finished_handle.set(finished_handle.get() + 1));

        session
            .set_rendering_data(project(2.0, vec![clip(1.0, 2.0)]))
            .unwrap();
        session.play(1.0, 3.0, 0.0);
        session.tick();
        assert_eq!(started.get(), 1);
        assert_eq!(finished.get(), 0);

        // The window is 4 seconds long.
        clock.advance(4.0);
        session.tick();
        assert_eq!(finished.get(), 1);
        assert!(!session.is_playing());
        assert_relative_eq!(session.get_position(), 1.0);
        assert_eq!(graph.live_sources(), 0);
    }

    #[test]
    fn test_loop_rearms_without_overlap() {
        let (mut session, clock, graph) = session();
        session
            .set_rendering_data(project(2.0, vec![clip(1.0, 2.0)]))
            .unwrap();
        session.set_loop_enabled(true);
        session.play(1.0, 3.0, 0.0);
        session.tick();
        assert_eq!(graph.sources_started(), 1);

        // The loop timer fires at 95% of the 4-second window.
        clock.advance(3.9);
        session.tick();

        let starts = graph.starts();
        assert_eq!(starts.len(), 2);
        let (old_source, _, _, _) = starts[0];
        let (_, new_when, _, _) = starts[1];
        // Old graph stops no later than the new one starts.
        let stop = graph.stop_of(old_source).unwrap();
        assert!(stop <= new_when + 1e-9);
        assert_eq!(graph.live_sources(), 1);
        assert!(session.is_playing());
    }

    #[test]
    fn test_mute_rebuilds_without_muted_track() {
        let (mut session, clock, graph) = session();
        session
            .set_rendering_data(project(2.0, vec![clip(1.0, 2.0)]))
            .unwrap();
        session.play(1.0, 3.0, 0.0);
        session.tick();
        assert_eq!(graph.live_sources(), 1);

        clock.advance(1.0);
        session.set_muted_tracks(vec![1]);
        // The rebuilt graph schedules nothing for the muted track, and the
        // old source is stopped at the bar line.
        assert_eq!(graph.sources_started(), 1);
        assert_eq!(graph.live_sources(), 0);
        let starts = graph.starts();
        assert_relative_eq!(graph.stop_of(starts[0].0).unwrap(), 2.0);
    }

    #[test]
    fn test_pause_is_idempotent() {
        let (mut session, _clock, graph) = session();
        session
            .set_rendering_data(project(2.0, vec![clip(1.0, 2.0)]))
            .unwrap();
        session.play(1.0, 3.0, 0.0);
        session.tick();

        session.pause();
        assert!(!session.is_playing());
        assert_eq!(graph.live_sources(), 0);
        // A second pause has nothing to stop and must not fail.
        session.pause();
        assert_eq!(graph.live_sources(), 0);
    }

    #[test]
    fn test_pause_cancels_a_deferred_start() {
        let (mut session, clock, graph) = session();
        let started = Rc::new(Cell::new(0));
        let handle = Rc::clone(&started);
        session.set_on_started(move || handle.set(handle.get() + 1));
        session
            .set_rendering_data(project(2.0, vec![clip(1.0, 1.0)]))
            .unwrap();

        // Playback armed half a second out, then paused before it starts.
        session.play(1.0, 3.0, 0.5);
        session.pause();
        clock.advance(1.0);
        session.tick();

        assert_eq!(started.get(), 0);
        assert!(!session.is_playing());
        assert_eq!(graph.live_sources(), 0);
    }

    #[test]
    fn test_loop_disabled_mid_play_runs_to_project_end() {
        let (mut session, clock, graph) = session();
        session
            .set_rendering_data(project(4.0, vec![clip(1.0, 1.0), clip(3.0, 1.0)]))
            .unwrap();
        session.set_loop(LoopSpec {
            on: true,
            selection: true,
            start: 1.0,
            end: 3.0,
        });
        session.play(1.0, 5.0, 0.0);
        session.tick();
        assert!(session.is_playing());

        clock.advance(1.0);
        session.set_loop(LoopSpec {
            on: false,
            selection: true,
            start: 1.0,
            end: 3.0,
        });

        // The looping graph is released at the old loop end (measure 3,
        // four seconds in) and the continuation starts there.
        let starts = graph.starts();
        assert_relative_eq!(graph.stop_of(starts[0].0).unwrap(), 4.0);
        assert_relative_eq!(starts.last().unwrap().1, 4.0);

        clock.advance(3.0);
        session.tick();
        assert_relative_eq!(session.get_position(), 3.0);

        // The rescheduled window now runs to the end of the project
        // (measure 5, eight seconds in) instead of wrapping.
        clock.advance(4.0);
        session.tick();
        assert!(!session.is_playing());
    }

    #[test]
    fn test_bypassed_effects_reach_the_builder() {
        let clock = MockClock::new();
        let graph = MockGraph::new();
        let builder = RecordingBuilder::new();
        let mut session = PlayerSession::new(clock, graph, builder.clone());
        session
            .set_rendering_data(project(2.0, vec![clip(1.0, 1.0)]))
            .unwrap();
        let mut bypassed = HashMap::new();
        bypassed.insert(1, vec!["VOLUME-GAIN".to_string()]);
        session.set_bypassed_effects(bypassed);

        session.play(1.0, 3.0, 0.0);
        let calls = builder.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].track_index, 0);
        assert!(calls[0].bypassed.is_empty());
        assert_eq!(calls[1].track_index, 1);
        assert_eq!(calls[1].bypassed, ["VOLUME-GAIN"]);
    }

    #[test]
    fn test_set_position_while_paused_moves_playhead() {
        let (mut session, _clock, _graph) = session();
        session
            .set_rendering_data(project(4.0, vec![clip(1.0, 2.0)]))
            .unwrap();
        session.set_position(3.0);
        assert_relative_eq!(session.get_position(), 3.0);
    }

    #[test]
    fn test_set_volume_targets_the_mix_bus() {
        let (mut session, _clock, graph) = session();
        session.set_volume(-6.0);
        let expected = db_to_linear(-6.0);
        assert!(graph.events().iter().any(|e| matches!(
            e,
            GraphEvent::GainSet { node: 0, value, .. } if (value - expected).abs() < 1e-9
        )));
    }

    #[test]
    fn test_new_rendering_data_while_stopped_replaces_quietly() {
        let (mut session, _clock, graph) = session();
        session
            .set_rendering_data(project(2.0, vec![clip(1.0, 2.0)]))
            .unwrap();
        session
            .set_rendering_data(project(4.0, vec![clip(1.0, 1.0)]))
            .unwrap();
        assert_eq!(graph.sources_started(), 0);
        assert!(!session.is_playing());
    }

    #[test]
    fn test_invalid_project_is_rejected() {
        let (mut session, _clock, _graph) = session();
        let bad = Project::new(0.0, 4.0, vec![Track::new()]);
        assert!(session.set_rendering_data(bad).is_err());
    }
}
