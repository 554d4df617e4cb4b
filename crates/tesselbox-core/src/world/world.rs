//! World - owns the chunk cache, organisms and the world RNG

use std::path::Path;

use anyhow::Context;
use glam::{IVec2, Vec2};
use parking_lot::{Mutex, RwLock};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use tesselbox_blocks::{BlockType, Blocks, ItemKind};

use super::cell::Cell;
use super::chunk::ChunkGeometry;
use super::chunk_manager::{ChunkManager, SharedChunk};
use super::config::{ConfigError, WorldConfig};
use super::generation::TerrainGenerator;
use super::mutation_system::MutationSystem;
use super::persistence::{ChunkStore, DiskChunkStore, WorldMetadata};
use super::rng_trait::WorldRng;
use super::spatial_queries::{RaycastHit, SpatialQueries};
use super::stats::ChunkStatsSnapshot;
use crate::entity::{ItemDrop, Organism, OrganismId, OrganismKind, OrganismRegistry};
use crate::hex::{HexCoord, HexLayout};

/// The game world, composed of lazily generated chunks
///
/// Every operation takes `&self`; the world can be shared across threads
/// behind an `Arc`.
pub struct World {
    config: WorldConfig,

    /// Chunk lifecycle manager (generation, caching, eviction, persistence)
    chunk_manager: ChunkManager,

    organisms: RwLock<OrganismRegistry>,

    /// Seeded source for drop rolls
    rng: Mutex<Xoshiro256StarStar>,
}

impl World {
    /// Build a world without durable storage
    ///
    /// The configuration is assumed valid; use [`World::try_new`] for
    /// untrusted input.
    pub fn new(config: WorldConfig) -> Self {
        Self::build(config, None)
    }

    pub fn try_new(config: WorldConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Build a world whose modified chunks survive eviction through `store`
    pub fn with_store(config: WorldConfig, store: impl ChunkStore + 'static) -> Self {
        Self::build(config, Some(Box::new(store)))
    }

    /// Open (or create) a world saved on disk
    ///
    /// A configuration stored with the world takes precedence over `config`,
    /// so reopening a world regenerates untouched chunks identically.
    pub fn open(world_dir: impl AsRef<Path>, config: WorldConfig) -> anyhow::Result<Self> {
        let store = DiskChunkStore::open(world_dir.as_ref())?;

        let (config, mut metadata) = match store.load_metadata()? {
            Some(metadata) => {
                let config = metadata.config.clone().unwrap_or_else(|| WorldConfig {
                    seed: metadata.seed,
                    ..config
                });
                log::info!(
                    "[LOAD] Opened world at {:?} (seed {}, created {})",
                    world_dir.as_ref(),
                    metadata.seed,
                    metadata.created_at
                );
                (config, metadata)
            }
            None => {
                log::info!("[LOAD] Creating new world at {:?}", world_dir.as_ref());
                let metadata = WorldMetadata::new(&config);
                (config, metadata)
            }
        };

        config.validate().context("Invalid world configuration")?;
        metadata.touch();
        store.save_metadata(&metadata)?;

        Ok(Self::build(config, Some(Box::new(store))))
    }

    fn build(config: WorldConfig, store: Option<Box<dyn ChunkStore>>) -> Self {
        let geometry = ChunkGeometry::new(config.hex_size, config.chunk_size);
        let generator = TerrainGenerator::new(config.seed, config.terrain.clone());
        let mut chunk_manager = ChunkManager::new(geometry, generator, Blocks::new());
        if let Some(store) = store {
            chunk_manager = chunk_manager.with_boxed_store(store);
        }

        log::info!(
            "World created (seed {}, hex size {}, {}x{} cells per chunk)",
            config.seed,
            config.hex_size,
            config.chunk_size,
            config.chunk_size
        );

        Self {
            rng: Mutex::new(Xoshiro256StarStar::seed_from_u64(config.seed)),
            config,
            chunk_manager,
            organisms: RwLock::new(OrganismRegistry::new()),
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.config.seed
    }

    pub fn geometry(&self) -> &ChunkGeometry {
        self.chunk_manager.geometry()
    }

    pub fn layout(&self) -> &HexLayout {
        self.chunk_manager.geometry().layout()
    }

    pub fn blocks(&self) -> &Blocks {
        self.chunk_manager.blocks()
    }

    pub fn chunk_manager(&self) -> &ChunkManager {
        &self.chunk_manager
    }

    // ===== Chunks =====

    pub fn chunk_coordinates_of(&self, x: f32, y: f32) -> IVec2 {
        self.chunk_manager.chunk_coordinates_of(Vec2::new(x, y))
    }

    /// Cached chunk at `(cx, cy)`, generated on first access
    pub fn get_chunk(&self, cx: i32, cy: i32) -> SharedChunk {
        self.chunk_manager.get_chunk(IVec2::new(cx, cy))
    }

    pub fn loaded_chunk_count(&self) -> usize {
        self.chunk_manager.loaded_count()
    }

    pub fn is_chunk_loaded(&self, cx: i32, cy: i32) -> bool {
        self.chunk_manager.is_loaded(IVec2::new(cx, cy))
    }

    // ===== Cells =====

    /// Hex containing the pixel
    pub fn hex_at(&self, x: f32, y: f32) -> HexCoord {
        self.chunk_manager.hex_at(Vec2::new(x, y))
    }

    pub fn get_cell_at(&self, x: f32, y: f32) -> Option<Cell> {
        self.cell_at_hex(self.hex_at(x, y))
    }

    pub fn cell_at_hex(&self, hex: HexCoord) -> Option<Cell> {
        self.chunk_manager.cell_at_hex(hex)
    }

    /// Put a fresh `block` cell in the hex containing `(x, y)`, replacing any occupant
    pub fn add_cell_at(&self, x: f32, y: f32, block: BlockType) -> Cell {
        MutationSystem::add_cell(&self.chunk_manager, self.hex_at(x, y), block)
    }

    pub fn remove_cell_at(&self, x: f32, y: f32) -> bool {
        MutationSystem::remove_cell(&self.chunk_manager, self.hex_at(x, y))
    }

    pub fn nearby_cells(&self, x: f32, y: f32, radius: f32) -> Vec<Cell> {
        SpatialQueries::nearby_cells(&self.chunk_manager, x, y, radius)
    }

    pub fn cells_in_hex_range(&self, center: HexCoord, range: u32) -> Vec<Cell> {
        SpatialQueries::cells_in_hex_range(&self.chunk_manager, center, range)
    }

    pub fn raycast(&self, from: Vec2, direction: Vec2, max_distance: f32) -> Option<RaycastHit> {
        SpatialQueries::raycast(&self.chunk_manager, from, direction, max_distance)
    }

    pub fn damage_cell(&self, hex: HexCoord, depth: i32, amount: f32) -> bool {
        MutationSystem::damage_cell(&self.chunk_manager, hex, depth, amount)
    }

    pub fn place_cell(&self, hex: HexCoord, block: BlockType) -> bool {
        MutationSystem::place_cell(&self.chunk_manager, hex, block)
    }

    // ===== Organisms =====

    pub fn spawn_organism(&self, kind: OrganismKind, position: Vec2) -> OrganismId {
        self.organisms.write().spawn(kind, position)
    }

    pub fn organism(&self, id: OrganismId) -> Option<Organism> {
        self.organisms.read().get(id).cloned()
    }

    pub fn organism_count(&self) -> usize {
        self.organisms.read().len()
    }

    pub fn nearby_organisms(&self, x: f32, y: f32, radius: f32) -> Vec<Organism> {
        SpatialQueries::nearby_organisms(&self.organisms.read(), x, y, radius)
    }

    pub fn organism_at(&self, x: f32, y: f32, tolerance: f32) -> Option<Organism> {
        SpatialQueries::organism_at(&self.organisms.read(), x, y, tolerance)
    }

    pub fn remove_organism(&self, id: OrganismId) -> Option<Organism> {
        self.organisms.write().remove(id)
    }

    /// Remove the first organism positioned exactly at `(x, y)`
    pub fn remove_organism_at(&self, x: f32, y: f32) -> Option<Organism> {
        self.organisms.write().remove_at(x, y)
    }

    /// Hit an organism, returning its drops if this hit destroyed it
    pub fn damage_organism(&self, id: OrganismId, item: ItemKind, base_damage: f32) -> Vec<ItemDrop> {
        let mut organisms = self.organisms.write();
        let mut rng = self.rng.lock();
        MutationSystem::damage_organism(&mut organisms, id, item, base_damage, &mut *rng)
    }

    /// Like [`World::damage_organism`] with a caller-supplied RNG
    pub fn damage_organism_with(
        &self,
        id: OrganismId,
        item: ItemKind,
        base_damage: f32,
        rng: &mut impl WorldRng,
    ) -> Vec<ItemDrop> {
        let mut organisms = self.organisms.write();
        MutationSystem::damage_organism(&mut organisms, id, item, base_damage, rng)
    }

    // ===== Lifecycle =====

    /// Evict chunks beyond the configured unload distance of `(x, y)`
    pub fn unload_distant_chunks(&self, x: f32, y: f32) -> usize {
        self.unload_distant_chunks_within(x, y, self.config.unload_distance)
    }

    pub fn unload_distant_chunks_within(&self, x: f32, y: f32, threshold: f32) -> usize {
        self.chunk_manager
            .unload_distant_chunks(Vec2::new(x, y), threshold)
    }

    /// Apply the configured resident-chunk limit, if any
    pub fn enforce_loaded_chunk_limit(&self) -> usize {
        match self.config.loaded_chunk_limit {
            Some(limit) => self.chunk_manager.enforce_loaded_chunk_limit(limit),
            None => 0,
        }
    }

    /// Generate the chunks within `radius` chunks of `(x, y)` in parallel
    pub fn preload_around(&self, x: f32, y: f32, radius: i32) -> usize {
        self.chunk_manager.preload_around(Vec2::new(x, y), radius)
    }

    /// Per-frame housekeeping around the point of interest
    ///
    /// Returns the number of chunks evicted.
    pub fn tick(&self, x: f32, y: f32) -> usize {
        self.unload_distant_chunks(x, y) + self.enforce_loaded_chunk_limit()
    }

    /// Save every modified resident chunk
    pub fn flush(&self) -> usize {
        self.chunk_manager.flush()
    }

    pub fn stats(&self) -> ChunkStatsSnapshot {
        self.chunk_manager.stats()
    }
}
