//! Realtime playback of a compiled project.
//!
//! [`PlayerSession`] schedules clips from a [`Project`] onto an audio graph,
//! tracking the playhead through the project's tempo map and handling
//! looping, seeking, mutes, and effect bypasses with bar-aligned graph
//! rebuilds.
//!
//! The session talks to the outside world through three injected seams:
//!
//! - [`AudioClock`]: the backend's monotonic timebase.
//! - [`AudioGraph`]: node creation, wiring, and scheduled start/stop.
//! - [`EffectGraphBuilder`]: per-track effect chain construction.
//!
//! Recording implementations of all three live in [`mock`] for tests.
//!
//! [`Project`]: ostinato_core::Project

mod clock;
pub use clock::{AudioClock, SystemClock};

mod graph;
pub use graph::{AudioGraph, EffectGraphBuilder, NoEffects, NodeId};

mod session;
pub use session::{LoopSpec, PlayerSession};

mod timer;

pub mod mock;
