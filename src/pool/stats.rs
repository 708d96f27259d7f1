/*!
 * Pool Statistics
 */

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of pool activity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Borrows served from a bucket
    pub hits: u64,
    /// Borrows that needed a fresh block
    pub misses: u64,
    /// Blocks returned to a bucket
    pub recycled: u64,
    /// Blocks freed on release or shutdown
    pub freed: u64,
    /// Non-empty buckets as `(bucket, queued blocks)`
    pub queued: Vec<(u32, usize)>,
}

impl PoolStats {
    /// Fraction of borrows served without allocating
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }

    /// Blocks currently idle in buckets
    pub fn total_queued(&self) -> usize {
        self.queued.iter().map(|(_, count)| count).sum()
    }
}

#[derive(Default)]
pub(super) struct PoolCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    recycled: AtomicU64,
    freed: AtomicU64,
}

impl PoolCounters {
    #[inline]
    pub(super) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(super) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(super) fn recycled(&self) {
        self.recycled.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(super) fn freed(&self, count: u64) {
        self.freed.fetch_add(count, Ordering::Relaxed);
    }

    pub(super) fn snapshot(&self, queued: Vec<(u32, usize)>) -> PoolStats {
        PoolStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            recycled: self.recycled.load(Ordering::Relaxed),
            freed: self.freed.load(Ordering::Relaxed),
            queued,
        }
    }
}
