//! World management - chunks, generation, queries and persistence

mod cell;
mod chunk;
mod chunk_manager;
pub mod config;
pub mod generation;
mod mutation_system;
pub mod persistence;
pub mod rng_trait;
mod spatial_queries;
pub mod stats;
#[allow(clippy::module_inception)]
mod world;
pub mod worldgen_config;

pub use cell::{Cell, LocalAddress};
pub use chunk::{CHUNK_SIZE, Chunk, ChunkGeometry, ChunkSnapshot};
pub use chunk_manager::{ChunkManager, SharedChunk};
pub use config::{ConfigError, WorldConfig};
pub use generation::{TerrainGenerator, TerrainLayer};
pub use mutation_system::MutationSystem;
pub use persistence::{ChunkStore, DiskChunkStore, MemoryChunkStore, WorldMetadata};
pub use rng_trait::WorldRng;
pub use spatial_queries::{RaycastHit, SpatialQueries};
pub use stats::{ChunkStats, ChunkStatsSnapshot};
pub use world::World;
pub use worldgen_config::{
    BiomeConfig, BiomeParams, HeightFieldConfig, NoiseLayerConfig, OreConfig, TerrainConfig,
};
