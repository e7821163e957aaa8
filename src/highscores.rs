//! High score tracking
//!
//! Keeps the K largest scores of a session (and, through the score file,
//! across sessions) without retaining the full history.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::io::{self, BufRead, Write};

/// Default number of high scores to keep
pub const MAX_HIGH_SCORES: usize = 10;

/// Bounded top-K score tracker
///
/// Backed by a min-heap so the eviction candidate is always on top.
#[derive(Debug, Clone)]
pub struct TopKTracker {
    capacity: usize,
    retained: BinaryHeap<Reverse<u64>>,
    best: u64,
}

impl Default for TopKTracker {
    fn default() -> Self {
        Self::new(MAX_HIGH_SCORES)
    }
}

impl TopKTracker {
    /// Create an empty tracker that retains at most `capacity` scores
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            retained: BinaryHeap::with_capacity(capacity + 1),
            best: 0,
        }
    }

    /// Build a tracker by replaying `record` over `scores`
    pub fn from_scores(capacity: usize, scores: impl IntoIterator<Item = u64>) -> Self {
        let mut tracker = Self::new(capacity);
        for score in scores {
            tracker.record(score);
        }
        tracker
    }

    /// Check whether `record(score)` would retain the score
    pub fn qualifies(&self, score: u64) -> bool {
        if self.capacity == 0 {
            return false;
        }
        if self.retained.len() < self.capacity {
            return true;
        }
        self.retained
            .peek()
            .map(|Reverse(min)| score > *min)
            .unwrap_or(true)
    }

    /// Record a score. Returns true if it entered the retained set.
    pub fn record(&mut self, score: u64) -> bool {
        if !self.qualifies(score) {
            return false;
        }
        if self.retained.len() == self.capacity {
            self.retained.pop();
        }
        self.retained.push(Reverse(score));
        // The maximum is never the evicted minimum, so the cache only grows
        self.best = self.best.max(score);
        true
    }

    /// Highest retained score, or 0 when nothing has been recorded
    pub fn best(&self) -> u64 {
        self.best
    }

    /// Snapshot of the retained scores, highest first
    pub fn top_k(&self) -> Vec<u64> {
        let mut scores: Vec<u64> = self.retained.iter().map(|Reverse(s)| *s).collect();
        scores.sort_unstable_by(|a, b| b.cmp(a));
        scores
    }

    pub fn len(&self) -> usize {
        self.retained.len()
    }

    pub fn is_empty(&self) -> bool {
        self.retained.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Read newline-delimited scores, keeping the top `capacity` of them
    ///
    /// Blank lines are skipped. The first line that is not a non-negative
    /// integer ends the read; everything before it is kept. A read error is
    /// treated the same way.
    pub fn load<R: BufRead>(capacity: usize, source: R) -> Self {
        let mut tracker = Self::new(capacity);
        for line in source.lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    log::warn!("Stopped reading scores: {err}");
                    break;
                }
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match trimmed.parse::<u64>() {
                Ok(score) => {
                    tracker.record(score);
                }
                Err(_) => {
                    log::warn!("Stopped reading scores at malformed line {trimmed:?}");
                    break;
                }
            }
        }
        tracker
    }

    /// Write the retained scores, one per line, highest first
    pub fn save<W: Write>(&self, mut sink: W) -> io::Result<()> {
        for score in self.top_k() {
            writeln!(sink, "{score}")?;
        }
        sink.flush()
    }
}
