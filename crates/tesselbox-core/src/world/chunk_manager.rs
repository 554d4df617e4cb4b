//! Chunk cache - lazy creation, eviction and persistence hooks
//!
//! Locking: the map lock is only held to look up or insert/remove entries.
//! Generation, store I/O and cell access happen on the per-chunk lock after the
//! map lock is released. Never take the map lock while holding a chunk lock.
//!
//! An evicted chunk moves from the map into `pending_saves` under the map
//! lock and stays there until its save returns. Lookups in that window get
//! the same chunk back instead of reading a store that is not yet written.
//! Lock order is map, then pending saves.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use ahash::AHashMap;
use glam::{IVec2, Vec2};
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use tesselbox_blocks::Blocks;

use super::cell::{Cell, LocalAddress};
use super::chunk::{Chunk, ChunkGeometry};
use super::generation::TerrainGenerator;
use super::persistence::ChunkStore;
use super::stats::{ChunkStats, ChunkStatsSnapshot};
use crate::hex::HexCoord;

/// Handle to a cached chunk
pub type SharedChunk = Arc<RwLock<Chunk>>;

struct ChunkEntry {
    /// Filled exactly once by the first caller; later callers wait for it
    chunk: OnceLock<SharedChunk>,
    /// Value of the manager's access clock at the last lookup
    last_accessed: AtomicU64,
}

impl ChunkEntry {
    fn new(tick: u64) -> Self {
        Self {
            chunk: OnceLock::new(),
            last_accessed: AtomicU64::new(tick),
        }
    }
}

/// Owns every resident chunk and decides when chunks are created or dropped
pub struct ChunkManager {
    geometry: ChunkGeometry,
    generator: TerrainGenerator,
    blocks: Blocks,
    chunks: RwLock<AHashMap<IVec2, Arc<ChunkEntry>>>,
    store: Option<Box<dyn ChunkStore>>,
    /// Evicted chunks whose save is still running, with the number of evictions in flight
    pending_saves: Mutex<AHashMap<IVec2, (SharedChunk, usize)>>,
    /// Monotonic counter standing in for access timestamps
    access_clock: AtomicU64,
    stats: ChunkStats,
}

impl ChunkManager {
    pub fn new(geometry: ChunkGeometry, generator: TerrainGenerator, blocks: Blocks) -> Self {
        Self {
            geometry,
            generator,
            blocks,
            chunks: RwLock::new(AHashMap::new()),
            store: None,
            pending_saves: Mutex::new(AHashMap::new()),
            access_clock: AtomicU64::new(0),
            stats: ChunkStats::default(),
        }
    }

    /// Consult `store` before generating and save modified chunks on eviction
    pub fn with_store(self, store: impl ChunkStore + 'static) -> Self {
        self.with_boxed_store(Box::new(store))
    }

    pub fn with_boxed_store(mut self, store: Box<dyn ChunkStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn geometry(&self) -> &ChunkGeometry {
        &self.geometry
    }

    pub fn generator(&self) -> &TerrainGenerator {
        &self.generator
    }

    pub fn blocks(&self) -> &Blocks {
        &self.blocks
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    pub fn chunk_coordinates_of(&self, pos: Vec2) -> IVec2 {
        self.geometry.chunk_coordinates_of(pos)
    }

    /// Return the cached chunk, loading or generating it on first access
    ///
    /// Concurrent first requests for one coordinate produce a single chunk;
    /// every caller receives the same handle.
    pub fn get_chunk(&self, coord: IVec2) -> SharedChunk {
        let entry = self.entry(coord);
        entry
            .last_accessed
            .store(self.next_tick(), Ordering::Relaxed);
        entry
            .chunk
            .get_or_init(|| self.resume_or_load(coord))
            .clone()
    }

    /// Resident chunk without triggering generation or touching access time
    pub fn get_loaded_chunk(&self, coord: IVec2) -> Option<SharedChunk> {
        self.chunks
            .read()
            .get(&coord)
            .and_then(|entry| entry.chunk.get().cloned())
    }

    pub fn is_loaded(&self, coord: IVec2) -> bool {
        self.get_loaded_chunk(coord).is_some()
    }

    pub fn loaded_count(&self) -> usize {
        self.chunks.read().len()
    }

    pub fn loaded_coords(&self) -> Vec<IVec2> {
        self.chunks.read().keys().copied().collect()
    }

    pub fn read_chunk<R>(&self, coord: IVec2, f: impl FnOnce(&Chunk) -> R) -> R {
        let chunk = self.get_chunk(coord);
        let guard = chunk.read();
        f(&guard)
    }

    pub fn write_chunk<R>(&self, coord: IVec2, f: impl FnOnce(&mut Chunk) -> R) -> R {
        let chunk = self.get_chunk(coord);
        let mut guard = chunk.write();
        f(&mut guard)
    }

    /// Owning chunk and slot of a hex
    pub fn locate_hex(&self, hex: HexCoord) -> (IVec2, LocalAddress) {
        self.geometry.locate_hex(hex)
    }

    /// Snap a pixel to its hex
    pub fn hex_at(&self, pos: Vec2) -> HexCoord {
        self.geometry.layout().hex_at(pos)
    }

    pub fn cell_at_hex(&self, hex: HexCoord) -> Option<Cell> {
        let (coord, local) = self.locate_hex(hex);
        self.read_chunk(coord, |chunk| chunk.get_local(local).cloned())
    }

    fn next_tick(&self) -> u64 {
        self.access_clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn entry(&self, coord: IVec2) -> Arc<ChunkEntry> {
        let existing = self.chunks.read().get(&coord).cloned();
        if let Some(entry) = existing {
            return entry;
        }

        let tick = self.next_tick();
        self.chunks
            .write()
            .entry(coord)
            .or_insert_with(|| Arc::new(ChunkEntry::new(tick)))
            .clone()
    }

    /// Take back a chunk whose eviction save is still running, else load or generate
    fn resume_or_load(&self, coord: IVec2) -> SharedChunk {
        if let Some((chunk, _)) = self.pending_saves.lock().get(&coord) {
            log::debug!(
                "[LOAD] Resumed chunk ({}, {}) during its eviction save",
                coord.x,
                coord.y
            );
            return chunk.clone();
        }
        Arc::new(RwLock::new(self.load_or_generate(coord)))
    }

    /// Remove `coords` from the map, parking initialised chunks for saving
    fn detach(
        &self,
        chunks: &mut AHashMap<IVec2, Arc<ChunkEntry>>,
        coords: Vec<IVec2>,
    ) -> Vec<(IVec2, SharedChunk)> {
        let mut detached = Vec::with_capacity(coords.len());
        for coord in coords {
            let Some(entry) = chunks.remove(&coord) else {
                continue;
            };
            let Some(chunk) = entry.chunk.get().cloned() else {
                continue;
            };
            if self.store.is_some() {
                let mut pending = self.pending_saves.lock();
                let slot = pending.entry(coord).or_insert_with(|| (chunk.clone(), 0));
                if !Arc::ptr_eq(&slot.0, &chunk) {
                    *slot = (chunk.clone(), 0);
                }
                slot.1 += 1;
            }
            detached.push((coord, chunk));
        }
        detached
    }

    fn load_or_generate(&self, coord: IVec2) -> Chunk {
        if let Some(store) = &self.store {
            match store.load_chunk(coord) {
                Ok(Some(snapshot)) if snapshot.x == coord.x && snapshot.y == coord.y => {
                    self.stats.record_loaded();
                    log::debug!(
                        "[LOAD] Restored chunk ({}, {}) with {} cells",
                        coord.x,
                        coord.y,
                        snapshot.cells.len()
                    );
                    return Chunk::from_snapshot(snapshot, self.geometry);
                }
                Ok(Some(snapshot)) => {
                    log::warn!(
                        "[LOAD] Stored chunk for ({}, {}) claims to be ({}, {}), regenerating",
                        coord.x,
                        coord.y,
                        snapshot.x,
                        snapshot.y
                    );
                }
                Ok(None) => {}
                Err(e) => {
                    log::warn!(
                        "[LOAD] Failed to load chunk ({}, {}): {:#}, regenerating",
                        coord.x,
                        coord.y,
                        e
                    );
                }
            }
        }

        let mut chunk = Chunk::new(coord.x, coord.y, self.geometry);
        chunk.generate(&self.generator, &self.blocks);
        self.stats.record_generated();
        chunk
    }

    /// Evict every chunk further than `threshold` chunks from `reference`
    ///
    /// Distance is Euclidean in chunk-grid units. Modified chunks are saved
    /// first when a store is configured. Returns the number evicted.
    pub fn unload_distant_chunks(&self, reference: Vec2, threshold: f32) -> usize {
        let center = self.chunk_coordinates_of(reference);

        let (count, evicted) = {
            let mut chunks = self.chunks.write();
            let distant: Vec<IVec2> = chunks
                .keys()
                .filter(|coord| (**coord - center).as_vec2().length() > threshold)
                .copied()
                .collect();
            (distant.len(), self.detach(&mut chunks, distant))
        };

        if count > 0 {
            log::debug!(
                "[EVICT] {} chunks beyond {:.1} of ({}, {})",
                count,
                threshold,
                center.x,
                center.y
            );
        }
        self.finish_eviction(count, evicted)
    }

    /// Evict least recently accessed chunks until at most `limit` remain
    pub fn enforce_loaded_chunk_limit(&self, limit: usize) -> usize {
        let (count, evicted) = {
            let mut chunks = self.chunks.write();
            if chunks.len() <= limit {
                return 0;
            }

            let mut by_age: Vec<(IVec2, u64)> = chunks
                .iter()
                .map(|(coord, entry)| (*coord, entry.last_accessed.load(Ordering::Relaxed)))
                .collect();
            by_age.sort_by_key(|(_, tick)| *tick);

            let excess = chunks.len() - limit;
            let oldest: Vec<IVec2> = by_age
                .into_iter()
                .take(excess)
                .map(|(coord, _)| coord)
                .collect();
            (oldest.len(), self.detach(&mut chunks, oldest))
        };

        log::debug!(
            "[EVICT] {} least recently used chunks over limit {}",
            count,
            limit
        );
        self.finish_eviction(count, evicted)
    }

    fn finish_eviction(&self, count: usize, evicted: Vec<(IVec2, SharedChunk)>) -> usize {
        for (coord, chunk) in &evicted {
            self.save_if_modified(*coord, chunk);
            self.release_pending(*coord, chunk);
        }
        self.stats.record_evicted(count);
        count
    }

    fn release_pending(&self, coord: IVec2, chunk: &SharedChunk) {
        let mut pending = self.pending_saves.lock();
        let Some(slot) = pending.get_mut(&coord) else {
            return;
        };
        if !Arc::ptr_eq(&slot.0, chunk) {
            return;
        }
        slot.1 -= 1;
        if slot.1 == 0 {
            pending.remove(&coord);
        }
    }

    /// Save a modified chunk, returning true if it was written
    fn save_if_modified(&self, coord: IVec2, chunk: &SharedChunk) -> bool {
        let Some(store) = &self.store else {
            return false;
        };

        let mut chunk = chunk.write();
        if !chunk.is_modified() {
            return false;
        }

        match store.save_chunk(&chunk.to_snapshot()) {
            Ok(()) => {
                chunk.mark_saved();
                self.stats.record_saved();
                true
            }
            Err(e) => {
                log::error!(
                    "[SAVE] Failed to save chunk ({}, {}): {:#}",
                    coord.x,
                    coord.y,
                    e
                );
                self.stats.record_save_failure();
                false
            }
        }
    }

    /// Save every modified resident chunk, returning how many were written
    pub fn flush(&self) -> usize {
        if self.store.is_none() {
            return 0;
        }

        let resident: Vec<(IVec2, SharedChunk)> = self
            .chunks
            .read()
            .iter()
            .filter_map(|(coord, entry)| entry.chunk.get().map(|chunk| (*coord, chunk.clone())))
            .collect();

        let saved = resident
            .iter()
            .filter(|(coord, chunk)| self.save_if_modified(*coord, chunk))
            .count();

        log::info!("[SAVE] Flushed {} modified chunks", saved);
        saved
    }

    /// Load or generate the square of chunks within `radius` of `center` in parallel
    pub fn preload_around(&self, center: Vec2, radius: i32) -> usize {
        let origin = self.chunk_coordinates_of(center);
        let coords: Vec<IVec2> = (-radius..=radius)
            .flat_map(|dy| (-radius..=radius).map(move |dx| origin + IVec2::new(dx, dy)))
            .collect();

        coords.par_iter().for_each(|&coord| {
            self.get_chunk(coord);
        });

        log::debug!(
            "[GEN] Preloaded {} chunks around ({}, {})",
            coords.len(),
            origin.x,
            origin.y
        );
        coords.len()
    }

    pub fn stats(&self) -> ChunkStatsSnapshot {
        self.stats.snapshot(self.loaded_count())
    }
}
