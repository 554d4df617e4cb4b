//! Chunk lifecycle counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters updated by the chunk cache
#[derive(Debug, Default)]
pub struct ChunkStats {
    generated: AtomicU64,
    loaded: AtomicU64,
    saved: AtomicU64,
    evicted: AtomicU64,
    save_failures: AtomicU64,
}

/// Point-in-time copy of [`ChunkStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkStatsSnapshot {
    /// Chunks produced by the terrain generator
    pub generated: u64,
    /// Chunks restored from a store instead of generated
    pub loaded: u64,
    pub saved: u64,
    pub evicted: u64,
    pub save_failures: u64,
    /// Chunks currently cached
    pub resident: usize,
}

impl ChunkStats {
    pub fn record_generated(&self) {
        self.generated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_loaded(&self) {
        self.loaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_saved(&self) {
        self.saved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evicted(&self, count: usize) {
        self.evicted.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_save_failure(&self) {
        self.save_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, resident: usize) -> ChunkStatsSnapshot {
        ChunkStatsSnapshot {
            generated: self.generated.load(Ordering::Relaxed),
            loaded: self.loaded.load(Ordering::Relaxed),
            saved: self.saved.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            save_failures: self.save_failures.load(Ordering::Relaxed),
            resident,
        }
    }
}
