//! Bounded cache of pitch-shifted buffers.

use std::collections::HashMap;
use std::sync::Arc;

use ostinato_core::{AudioBuffer, Clip};

use crate::envelope::EnvelopePoint;

/// Entries kept before the cache is dropped wholesale.
pub const MAX_CACHE: usize = 64;

/// Cache key: the source sound slice plus the exact envelope applied to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    filekey: String,
    start: u64,
    end: u64,
    points: Vec<(i64, u64)>,
}

impl CacheKey {
    pub fn new(clip: &Clip, envelope: &[EnvelopePoint]) -> Self {
        Self {
            filekey: clip.filekey.clone(),
            start: clip.start.to_bits(),
            end: clip.end.to_bits(),
            points: envelope
                .iter()
                .map(|p| (p.frame, p.semitone.to_bits()))
                .collect(),
        }
    }
}

/// Holds shifted buffers across passes so repeated clips (loop children in
/// particular) are processed once.
///
/// Eviction is wholesale: once the map outgrows [`MAX_CACHE`] it is cleared
/// at the start of the next pass rather than evicting per entry.
#[derive(Debug, Default)]
pub struct PitchShiftCache {
    entries: HashMap<CacheKey, Arc<AudioBuffer>>,
}

impl PitchShiftCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<AudioBuffer>> {
        self.entries.get(key).cloned()
    }

    pub fn insert(&mut self, key: CacheKey, buffer: Arc<AudioBuffer>) {
        self.entries.insert(key, buffer);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop everything if the cache has outgrown its bound.
    pub fn evict_if_full(&mut self) {
        if self.entries.len() > MAX_CACHE {
            self.entries.clear();
        }
    }
}
