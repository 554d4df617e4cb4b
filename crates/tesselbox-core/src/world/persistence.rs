//! Durable chunk storage
//!
//! The chunk cache consults a [`ChunkStore`] before generating a chunk and
//! hands modified chunks to it before eviction. Stores are optional; without
//! one, evicted edits are lost and chunks regenerate from the seed.

use std::path::{Path, PathBuf};

use ahash::AHashMap;
use anyhow::{Context, Result};
use glam::IVec2;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::chunk::ChunkSnapshot;
use super::config::WorldConfig;

/// Backing store for chunks evicted from memory
pub trait ChunkStore: Send + Sync {
    /// Load a previously saved chunk, `Ok(None)` if it was never saved
    fn load_chunk(&self, coord: IVec2) -> Result<Option<ChunkSnapshot>>;

    fn save_chunk(&self, snapshot: &ChunkSnapshot) -> Result<()>;
}

fn encode_snapshot(snapshot: &ChunkSnapshot) -> Result<Vec<u8>> {
    let serialized =
        bincode_next::serde::encode_to_vec(snapshot, bincode_next::config::standard())
            .context("Failed to serialize chunk")?;
    Ok(lz4_flex::compress_prepend_size(&serialized))
}

fn decode_snapshot(compressed: &[u8]) -> Result<ChunkSnapshot> {
    let serialized =
        lz4_flex::decompress_size_prepended(compressed).context("Failed to decompress chunk")?;
    let (snapshot, _): (ChunkSnapshot, _) =
        bincode_next::serde::decode_from_slice(&serialized, bincode_next::config::standard())
            .map_err(|e| anyhow::anyhow!("Failed to deserialize chunk: {:?}", e))?;
    Ok(snapshot)
}

/// World metadata stored next to the chunk files (RON format)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldMetadata {
    pub version: u32,
    pub seed: u64,
    pub created_at: String,
    pub last_played: String,
    #[serde(default)]
    pub config: Option<WorldConfig>,
}

impl WorldMetadata {
    pub fn new(config: &WorldConfig) -> Self {
        let now = chrono::Local::now().to_rfc3339();
        Self {
            version: 1,
            seed: config.seed,
            created_at: now.clone(),
            last_played: now,
            config: Some(config.clone()),
        }
    }

    pub fn touch(&mut self) {
        self.last_played = chrono::Local::now().to_rfc3339();
    }
}

/// Chunk files compressed with lz4 under `<dir>/chunks`
pub struct DiskChunkStore {
    world_dir: PathBuf,
}

impl DiskChunkStore {
    /// Open (creating if needed) a world directory
    pub fn open(world_dir: impl Into<PathBuf>) -> Result<Self> {
        let world_dir = world_dir.into();
        std::fs::create_dir_all(world_dir.join("chunks"))
            .context("Failed to create world directories")?;
        log::info!("[SAVE] Chunk store at {:?}", world_dir);
        Ok(Self { world_dir })
    }

    pub fn world_dir(&self) -> &Path {
        &self.world_dir
    }

    fn chunk_path(&self, coord: IVec2) -> PathBuf {
        self.world_dir
            .join("chunks")
            .join(format!("chunk_{}_{}.chunk", coord.x, coord.y))
    }

    fn metadata_path(&self) -> PathBuf {
        self.world_dir.join("world.ron")
    }

    pub fn save_metadata(&self, meta: &WorldMetadata) -> Result<()> {
        let serialized = ron::ser::to_string_pretty(meta, Default::default())
            .context("Failed to serialize metadata")?;
        std::fs::write(self.metadata_path(), serialized)
            .context("Failed to write metadata file")?;
        log::debug!("[SAVE] Saved world metadata (seed {})", meta.seed);
        Ok(())
    }

    /// Read world metadata, `Ok(None)` for a fresh directory
    pub fn load_metadata(&self) -> Result<Option<WorldMetadata>> {
        let path = self.metadata_path();
        if !path.exists() {
            log::info!("[LOAD] No world metadata found at {:?}", path);
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read metadata file")?;
        let meta = ron::from_str(&contents).context("Failed to parse metadata")?;
        Ok(Some(meta))
    }
}

impl ChunkStore for DiskChunkStore {
    fn load_chunk(&self, coord: IVec2) -> Result<Option<ChunkSnapshot>> {
        let path = self.chunk_path(coord);
        if !path.exists() {
            return Ok(None);
        }

        let compressed = std::fs::read(&path).context("Failed to read chunk file")?;
        log::debug!("[LOAD] Read {} bytes from {:?}", compressed.len(), path);

        let snapshot = decode_snapshot(&compressed)
            .with_context(|| format!("Corrupt chunk file {:?}", path))?;
        Ok(Some(snapshot))
    }

    fn save_chunk(&self, snapshot: &ChunkSnapshot) -> Result<()> {
        let path = self.chunk_path(IVec2::new(snapshot.x, snapshot.y));
        let compressed = encode_snapshot(snapshot)?;

        // Write to a temp file, then rename
        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, &compressed).context("Failed to write chunk temp file")?;
        std::fs::rename(&temp_path, &path).context("Failed to rename chunk file")?;

        log::debug!(
            "[SAVE] Saved chunk ({}, {}): {} cells, {} bytes",
            snapshot.x,
            snapshot.y,
            snapshot.cells.len(),
            compressed.len()
        );
        Ok(())
    }
}

/// In-process store holding encoded chunks
#[derive(Default)]
pub struct MemoryChunkStore {
    chunks: Mutex<AHashMap<IVec2, Vec<u8>>>,
}

impl MemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.chunks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.lock().is_empty()
    }

    pub fn contains(&self, coord: IVec2) -> bool {
        self.chunks.lock().contains_key(&coord)
    }
}

impl ChunkStore for MemoryChunkStore {
    fn load_chunk(&self, coord: IVec2) -> Result<Option<ChunkSnapshot>> {
        let bytes = self.chunks.lock().get(&coord).cloned();
        bytes.map(|bytes| decode_snapshot(&bytes)).transpose()
    }

    fn save_chunk(&self, snapshot: &ChunkSnapshot) -> Result<()> {
        let bytes = encode_snapshot(snapshot)?;
        self.chunks
            .lock()
            .insert(IVec2::new(snapshot.x, snapshot.y), bytes);
        Ok(())
    }
}

impl<S: ChunkStore + ?Sized> ChunkStore for std::sync::Arc<S> {
    fn load_chunk(&self, coord: IVec2) -> Result<Option<ChunkSnapshot>> {
        (**self).load_chunk(coord)
    }

    fn save_chunk(&self, snapshot: &ChunkSnapshot) -> Result<()> {
        (**self).save_chunk(snapshot)
    }
}
