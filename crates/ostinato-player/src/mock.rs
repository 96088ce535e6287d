//! Recording implementations of the scheduling seams, for tests.
//!
//! Both mocks hand out cloneable handles over shared state so a test can
//! keep inspecting them after moving them into a session.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use ostinato_core::{AudioBuffer, TempoMap, Track};

use crate::clock::AudioClock;
use crate::graph::{AudioGraph, EffectGraphBuilder, NodeId};

/// Manually advanced clock.
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    time: Rc<Cell<f64>>,
}

impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, seconds: f64) {
        self.time.set(self.time.get() + seconds);
    }

    pub fn set(&self, seconds: f64) {
        self.time.set(seconds);
    }
}

impl AudioClock for MockClock {
    fn now(&self) -> f64 {
        self.time.get()
    }
}

/// Everything a graph call can record.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphEvent {
    SourceCreated(NodeId),
    GainCreated(NodeId),
    Connected(NodeId, NodeId),
    ConnectedToDestination(NodeId),
    SourceStarted {
        node: NodeId,
        when: f64,
        offset: f64,
        duration: f64,
    },
    SourceStopped {
        node: NodeId,
        when: f64,
    },
    GainSet {
        node: NodeId,
        value: f64,
        when: f64,
    },
    Disconnected(NodeId),
}

#[derive(Debug, Default)]
struct MockGraphState {
    next_id: NodeId,
    events: Vec<GraphEvent>,
    started: HashMap<NodeId, (f64, f64, f64)>,
    stopped: HashMap<NodeId, f64>,
    buffers: HashMap<NodeId, Arc<AudioBuffer>>,
}

/// Graph that records every call instead of producing audio.
#[derive(Debug, Clone, Default)]
pub struct MockGraph {
    state: Rc<RefCell<MockGraphState>>,
}

impl MockGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<GraphEvent> {
        self.state.borrow().events.clone()
    }

    /// Number of sources with a scheduled start.
    pub fn sources_started(&self) -> usize {
        self.state.borrow().started.len()
    }

    /// `(when, offset, duration)` of a source's scheduled start.
    pub fn start_of(&self, node: NodeId) -> Option<(f64, f64, f64)> {
        self.state.borrow().started.get(&node).copied()
    }

    pub fn stop_of(&self, node: NodeId) -> Option<f64> {
        self.state.borrow().stopped.get(&node).copied()
    }

    /// Sources started but not yet stopped.
    pub fn live_sources(&self) -> usize {
        let state = self.state.borrow();
        state
            .started
            .keys()
            .filter(|id| !state.stopped.contains_key(id))
            .count()
    }

    /// Started sources in start order, with their scheduled times.
    pub fn starts(&self) -> Vec<(NodeId, f64, f64, f64)> {
        self.state
            .borrow()
            .events
            .iter()
            .filter_map(|e| match *e {
                GraphEvent::SourceStarted {
                    node,
                    when,
                    offset,
                    duration,
                } => Some((node, when, offset, duration)),
                _ => None,
            })
            .collect()
    }

    pub fn buffer_of(&self, node: NodeId) -> Option<Arc<AudioBuffer>> {
        self.state.borrow().buffers.get(&node).cloned()
    }
}

/// One `build` invocation as seen by a [`RecordingBuilder`].
#[derive(Debug, Clone, PartialEq)]
pub struct BuildCall {
    pub track_index: usize,
    pub start_time: f64,
    pub bypassed: Vec<String>,
    pub output: NodeId,
}

/// Effect builder that records what it is asked to build and wires nothing.
#[derive(Debug, Clone, Default)]
pub struct RecordingBuilder {
    calls: Rc<RefCell<Vec<BuildCall>>>,
}

impl RecordingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<BuildCall> {
        self.calls.borrow().clone()
    }
}

impl EffectGraphBuilder for RecordingBuilder {
    fn build(
        &mut self,
        _graph: &mut dyn AudioGraph,
        track_index: usize,
        _track: &Track,
        _tempo_map: &TempoMap,
        start_time: f64,
        bypassed: &[String],
        output: NodeId,
    ) -> Option<NodeId> {
        self.calls.borrow_mut().push(BuildCall {
            track_index,
            start_time,
            bypassed: bypassed.to_vec(),
            output,
        });
        None
    }
}

impl AudioGraph for MockGraph {
    fn create_source(&mut self, buffer: Arc<AudioBuffer>) -> NodeId {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        state.buffers.insert(id, buffer);
        state.events.push(GraphEvent::SourceCreated(id));
        id
    }

    fn create_gain(&mut self, value: f64) -> NodeId {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        state.events.push(GraphEvent::GainCreated(id));
        state.events.push(GraphEvent::GainSet {
            node: id,
            value,
            when: 0.0,
        });
        id
    }

    fn connect(&mut self, from: NodeId, to: NodeId) {
        self.state
            .borrow_mut()
            .events
            .push(GraphEvent::Connected(from, to));
    }

    fn connect_to_destination(&mut self, from: NodeId) {
        self.state
            .borrow_mut()
            .events
            .push(GraphEvent::ConnectedToDestination(from));
    }

    fn start_source(&mut self, source: NodeId, when: f64, offset: f64, duration: f64) {
        let mut state = self.state.borrow_mut();
        state.started.insert(source, (when, offset, duration));
        state.events.push(GraphEvent::SourceStarted {
            node: source,
            when,
            offset,
            duration,
        });
    }

    fn stop_source(&mut self, source: NodeId, when: f64) -> bool {
        let mut state = self.state.borrow_mut();
        if !state.started.contains_key(&source) || state.stopped.contains_key(&source) {
            return false;
        }
        state.stopped.insert(source, when);
        state.events.push(GraphEvent::SourceStopped {
            node: source,
            when,
        });
        true
    }

    fn set_gain_at(&mut self, node: NodeId, value: f64, when: f64) {
        self.state.borrow_mut().events.push(GraphEvent::GainSet {
            node,
            value,
            when,
        });
    }

    fn disconnect(&mut self, node: NodeId) {
        self.state
            .borrow_mut()
            .events
            .push(GraphEvent::Disconnected(node));
    }
}
