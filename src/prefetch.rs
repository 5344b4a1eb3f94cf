use std::collections::{BTreeSet, HashSet};

use tracing::debug;

/// Bookkeeping for the lookahead cache.
///
/// A position is recorded as cached only when its fetch completes while the
/// position is still inside the lookahead window relative to the current
/// index at completion time. Late arrivals are dropped, so positions the
/// viewer has already moved past never count as available for offline
/// browsing. The confirmed set only grows until the reset path clears it;
/// growth is bounded by the catalog cap.
#[derive(Debug)]
pub struct PrefetchCache {
    cached: BTreeSet<usize>,
    in_flight: HashSet<usize>,
    lookahead: usize,
}

impl PrefetchCache {
    pub fn new(lookahead: usize) -> Self {
        Self {
            cached: BTreeSet::new(),
            in_flight: HashSet::new(),
            lookahead,
        }
    }

    /// Window positions not yet cached or in flight, in fetch order.
    pub fn missing(&self, current: usize, len: usize) -> Vec<usize> {
        if len == 0 {
            return Vec::new();
        }
        let mut out = Vec::new();
        for step in 0..self.lookahead.min(len) {
            let index = (current + step) % len;
            if !self.cached.contains(&index) && !self.in_flight.contains(&index) {
                out.push(index);
            }
        }
        out
    }

    /// Mark a fetch as issued so the window is not requested twice.
    pub fn begin(&mut self, index: usize) {
        self.in_flight.insert(index);
    }

    /// Whether `index` sits inside the lookahead window starting at
    /// `current`, accounting for wraparound.
    pub fn in_window(&self, index: usize, current: usize, len: usize) -> bool {
        if len == 0 || index >= len || current >= len {
            return false;
        }
        ((index + len - current) % len) < self.lookahead
    }

    /// Record a completed fetch, subject to the completion-time validity
    /// rule. Returns whether the position was accepted into the cache.
    pub fn complete(&mut self, index: usize, current: usize, len: usize) -> bool {
        self.in_flight.remove(&index);
        if self.in_window(index, current, len) {
            self.cached.insert(index);
            true
        } else {
            debug!(index, current, "discarding fetch completion outside the window");
            false
        }
    }

    /// A failed fetch frees the slot; the position stays uncached.
    pub fn fail(&mut self, index: usize) {
        self.in_flight.remove(&index);
    }

    pub fn contains(&self, index: usize) -> bool {
        self.cached.contains(&index)
    }

    pub fn cached_len(&self) -> usize {
        self.cached.len()
    }

    /// Sorted view of the confirmed positions; frozen by the navigation
    /// state on offline entry.
    pub fn snapshot(&self) -> Vec<usize> {
        self.cached.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.cached.clear();
        self.in_flight.clear();
    }
}
