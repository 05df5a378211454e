//! Bounded center-of-mass history.

use std::collections::VecDeque;

use kinetrace_pose_model::Point3;
use serde::{Deserialize, Serialize};

/// Default number of retained samples.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// One center-of-mass observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    pub center_of_mass: Point3,
    /// Video timestamp in seconds.
    pub timestamp: f64,
}

/// FIFO of motion samples; the oldest sample is evicted on overflow.
#[derive(Debug, Clone)]
pub struct MotionHistory {
    capacity: usize,
    samples: VecDeque<MotionSample>,
}

impl MotionHistory {
    /// Create a history holding at most `capacity` samples (minimum 2, so a
    /// previous sample always exists once two updates arrived).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, sample: MotionSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn latest(&self) -> Option<&MotionSample> {
        self.samples.back()
    }

    /// The sample before the latest one.
    pub fn previous(&self) -> Option<&MotionSample> {
        let len = self.samples.len();
        if len < 2 {
            return None;
        }
        self.samples.get(len - 2)
    }

    /// The oldest retained sample.
    pub fn oldest(&self) -> Option<&MotionSample> {
        self.samples.front()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &MotionSample> {
        self.samples.iter()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

impl Default for MotionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
