//! Audio-graph seams.
//!
//! The session never touches an audio backend directly. It drives an
//! [`AudioGraph`] for node plumbing and an [`EffectGraphBuilder`] for each
//! track's effect chain; real hosts back these with their audio context,
//! tests with recording mocks.

use std::sync::Arc;

use ostinato_core::{AudioBuffer, TempoMap, Track};

/// Opaque graph node handle.
pub type NodeId = usize;

/// Backend node graph: buffer sources, gains, and wiring.
///
/// Start and stop times are absolute, in the [`AudioClock`] timebase.
///
/// [`AudioClock`]: crate::AudioClock
pub trait AudioGraph {
    /// Create a one-shot source node for `buffer`.
    fn create_source(&mut self, buffer: Arc<AudioBuffer>) -> NodeId;

    /// Create a gain node at an initial value (linear).
    fn create_gain(&mut self, value: f64) -> NodeId;

    fn connect(&mut self, from: NodeId, to: NodeId);

    fn connect_to_destination(&mut self, from: NodeId);

    /// Schedule `source` to start at `when`, beginning `offset` seconds into
    /// its buffer and playing for `duration` seconds.
    fn start_source(&mut self, source: NodeId, when: f64, offset: f64, duration: f64);

    /// Schedule `source` to stop at `when`. Returns false if the source was
    /// never started or is already stopped; callers treat that as benign.
    fn stop_source(&mut self, source: NodeId, when: f64) -> bool;

    fn set_gain_at(&mut self, node: NodeId, value: f64, when: f64);

    fn disconnect(&mut self, node: NodeId);
}

/// Builds one track's effect chain into the graph.
///
/// Implementations wire their chain's output to `output` and return the
/// chain's input node, or `None` when the track needs no chain (every
/// effect bypassed or absent), in which case the session connects the track
/// gain to `output` directly.
pub trait EffectGraphBuilder {
    #[allow(clippy::too_many_arguments)]
    fn build(
        &mut self,
        graph: &mut dyn AudioGraph,
        track_index: usize,
        track: &Track,
        tempo_map: &TempoMap,
        start_time: f64,
        bypassed: &[String],
        output: NodeId,
    ) -> Option<NodeId>;
}

/// Builder for hosts with no effect processing: every track connects
/// straight through.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEffects;

impl EffectGraphBuilder for NoEffects {
    fn build(
        &mut self,
        _graph: &mut dyn AudioGraph,
        _track_index: usize,
        _track: &Track,
        _tempo_map: &TempoMap,
        _start_time: f64,
        _bypassed: &[String],
        _output: NodeId,
    ) -> Option<NodeId> {
        None
    }
}
