//! Frame-addressed pose cache with nearest-frame fallback.
//!
//! Entries are keyed by frame number and hold at most one record per frame.
//! Records are shared as `Arc<PoseFrame>`; a new detection for a frame
//! replaces the whole record. When the cache is full the least recently
//! written frame is evicted.

use std::collections::BTreeMap;
use std::sync::Arc;

use kinetrace_pose_model::{FrameNumber, PoseFrame};

/// Default maximum number of cached frames.
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

#[derive(Debug)]
struct CacheEntry {
    frame: Arc<PoseFrame>,
    write_seq: u64,
}

#[derive(Debug)]
pub struct FramePoseCache {
    capacity: usize,
    entries: BTreeMap<FrameNumber, CacheEntry>,
    /// Write sequence -> frame number, oldest write first.
    write_order: BTreeMap<u64, FrameNumber>,
    next_seq: u64,
}

impl FramePoseCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: BTreeMap::new(),
            write_order: BTreeMap::new(),
            next_seq: 0,
        }
    }

    /// Store a record, replacing any previous record for the same frame.
    pub fn insert(&mut self, frame: Arc<PoseFrame>) {
        let frame_number = frame.frame_number;
        let write_seq = self.next_seq;
        self.next_seq += 1;

        if let Some(old) = self.entries.insert(frame_number, CacheEntry { frame, write_seq }) {
            self.write_order.remove(&old.write_seq);
        }
        self.write_order.insert(write_seq, frame_number);

        while self.entries.len() > self.capacity {
            let Some((_, evicted)) = self.write_order.pop_first() else {
                break;
            };
            self.entries.remove(&evicted);
            tracing::trace!(frame = evicted, "Evicted cached pose");
        }
    }

    /// Exact record for a frame, detected or not.
    pub fn get(&self, frame_number: FrameNumber) -> Option<Arc<PoseFrame>> {
        self.entries.get(&frame_number).map(|e| Arc::clone(&e.frame))
    }

    pub fn contains(&self, frame_number: FrameNumber) -> bool {
        self.entries.contains_key(&frame_number)
    }

    /// Exact hit, otherwise the closest detected frame within `radius`.
    ///
    /// Ties between equally distant frames go to the lower frame number.
    pub fn lookup(&self, frame_number: FrameNumber, radius: u64) -> Option<Arc<PoseFrame>> {
        if let Some(hit) = self.get(frame_number) {
            return Some(hit);
        }

        let low = frame_number.saturating_sub(radius);
        let high = frame_number.saturating_add(radius);

        // Ascending iteration with a strict comparison keeps the lower frame
        // on ties.
        let mut best: Option<(u64, &CacheEntry)> = None;
        for (&cached, entry) in self.entries.range(low..=high) {
            if !entry.frame.detected {
                continue;
            }
            let distance = cached.abs_diff(frame_number);
            match best {
                Some((best_distance, _)) if distance >= best_distance => {}
                _ => best = Some((distance, entry)),
            }
        }

        best.map(|(_, entry)| Arc::clone(&entry.frame))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Cached frame numbers in ascending order.
    pub fn frame_numbers(&self) -> impl Iterator<Item = FrameNumber> + '_ {
        self.entries.keys().copied()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.write_order.clear();
    }
}

impl Default for FramePoseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
