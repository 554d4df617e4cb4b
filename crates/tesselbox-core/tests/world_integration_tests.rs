//! Integration tests for the world facade
//!
//! These exercise chunk caching, persistence, mutation and organisms together
//! through the public API.

use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;

use glam::{IVec2, Vec2};
use parking_lot::Mutex;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use tesselbox_core::blocks::{BlockType, ItemKind, ToolKind};
use tesselbox_core::world::{ChunkSnapshot, ChunkStore, MemoryChunkStore, TerrainConfig, TerrainLayer};
use tesselbox_core::{HexCoord, OrganismKind, World, WorldConfig};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn flat_config(seed: u64) -> WorldConfig {
    WorldConfig {
        seed,
        terrain: TerrainConfig::flat(),
        ..WorldConfig::default()
    }
}

/// Memory store whose saves wait until the test lets them through
struct GatedStore {
    inner: MemoryChunkStore,
    entered: Mutex<mpsc::Sender<IVec2>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl GatedStore {
    fn new() -> (Self, mpsc::Receiver<IVec2>, mpsc::Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let store = Self {
            inner: MemoryChunkStore::new(),
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        };
        (store, entered_rx, release_tx)
    }
}

impl ChunkStore for GatedStore {
    fn load_chunk(&self, coord: IVec2) -> anyhow::Result<Option<ChunkSnapshot>> {
        self.inner.load_chunk(coord)
    }

    fn save_chunk(&self, snapshot: &ChunkSnapshot) -> anyhow::Result<()> {
        let _ = self.entered.lock().send(IVec2::new(snapshot.x, snapshot.y));
        let _ = self.release.lock().recv();
        self.inner.save_chunk(snapshot)
    }
}

/// A point far enough away that every resident chunk is evicted
fn far_away(world: &World) -> (f32, f32) {
    (world.geometry().chunk_width() * 1000.0, 0.0)
}

// ============================================================================
// Chunk Cache Tests
// ============================================================================

#[test]
fn test_concurrent_first_access_generates_once() {
    init_logging();
    let world = Arc::new(World::new(WorldConfig::default()));
    let threads = 16;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let world = Arc::clone(&world);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                world.get_chunk(3, -2)
            })
        })
        .collect();

    let chunks: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("thread panicked"))
        .collect();

    for chunk in &chunks[1..] {
        assert!(Arc::ptr_eq(&chunks[0], chunk));
    }
    assert_eq!(world.stats().generated, 1);
    assert_eq!(world.loaded_chunk_count(), 1);
}

#[test]
fn test_chunk_zero_layering() {
    init_logging();
    let world = World::new(flat_config(42));
    let generator = world.chunk_manager().generator();

    {
        let chunk = world.get_chunk(0, 0);
        let chunk = chunk.read();
        assert_eq!(chunk.len(), 32 * 32);

        for cell in chunk.cells() {
            let expected = match generator.classify(cell.position) {
                TerrainLayer::Sky => BlockType::Air,
                TerrainLayer::Topsoil => BlockType::Grass,
                TerrainLayer::Subsoil => BlockType::Dirt,
                TerrainLayer::Deep => BlockType::Stone,
            };
            assert_eq!(cell.block, expected, "cell at {:?}", cell.position);
        }
    }

    // Rows centered at 247.5, 292.5 and 427.5
    let w = world.layout().width();
    assert_eq!(world.get_cell_at(w, 250.0).map(|c| c.block), Some(BlockType::Grass));
    assert_eq!(world.get_cell_at(0.5 * w, 292.5).map(|c| c.block), Some(BlockType::Dirt));
    assert_eq!(world.get_cell_at(w, 427.5).map(|c| c.block), Some(BlockType::Stone));
}

#[test]
fn test_regeneration_after_eviction_is_identical() {
    init_logging();
    let world = World::new(WorldConfig::with_seed(2024));
    // Spread along x so several biomes are involved
    let coords = [
        IVec2::new(0, 0),
        IVec2::new(-3, 2),
        IVec2::new(5, 7),
        IVec2::new(-14, 1),
        IVec2::new(12, 0),
    ];

    let before: Vec<_> = coords
        .iter()
        .map(|c| world.get_chunk(c.x, c.y).read().to_snapshot())
        .collect();

    let (fx, fy) = far_away(&world);
    assert_eq!(world.unload_distant_chunks(fx, fy), coords.len());
    assert_eq!(world.loaded_chunk_count(), 0);

    let after: Vec<_> = coords
        .iter()
        .map(|c| world.get_chunk(c.x, c.y).read().to_snapshot())
        .collect();
    assert_eq!(before, after);

    // A second world with the same seed agrees too
    let twin = World::new(WorldConfig::with_seed(2024));
    assert_eq!(twin.get_chunk(-3, 2).read().to_snapshot(), before[1]);
}

#[test]
fn test_loaded_chunk_limit_evicts_oldest() {
    init_logging();
    let world = World::new(WorldConfig {
        loaded_chunk_limit: Some(2),
        ..flat_config(1)
    });

    world.get_chunk(0, 0);
    world.get_chunk(1, 0);
    world.get_chunk(2, 0);
    world.get_chunk(0, 0);

    assert_eq!(world.enforce_loaded_chunk_limit(), 1);
    assert!(world.is_chunk_loaded(0, 0));
    assert!(!world.is_chunk_loaded(1, 0));
    assert!(world.is_chunk_loaded(2, 0));
}

#[test]
fn test_concurrent_edits_in_different_chunks() {
    init_logging();
    let world = Arc::new(World::new(flat_config(3)));
    let chunk_width = world.geometry().chunk_width();
    let chunk_height = world.geometry().chunk_height();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let world = Arc::clone(&world);
            thread::spawn(move || {
                let x = (i as f32 + 0.5) * chunk_width;
                let y = 0.5 * chunk_height;
                world.add_cell_at(x, y, BlockType::Brick);
                (x, y)
            })
        })
        .collect();

    for handle in handles {
        let (x, y) = handle.join().expect("thread panicked");
        assert_eq!(world.get_cell_at(x, y).map(|c| c.block), Some(BlockType::Brick));
    }
    assert_eq!(world.loaded_chunk_count(), 8);
}

// ============================================================================
// Mutation Tests
// ============================================================================

#[test]
fn test_twenty_hits_of_five_destroy_a_dirt_cell() {
    init_logging();
    let world = World::new(flat_config(42));
    let hex = world.hex_at(0.5 * world.layout().width(), 292.5);
    assert_eq!(world.cell_at_hex(hex).map(|c| c.block), Some(BlockType::Dirt));

    for hit in 1..=20 {
        assert_eq!(world.damage_cell(hex, 0, 5.0), hit == 20, "hit {hit}");
        let health = world.cell_at_hex(hex).map(|c| c.health).unwrap_or_default();
        assert_eq!(health, 100.0 - 5.0 * hit as f32);
    }
    assert_eq!(world.cell_at_hex(hex).map(|c| c.block), Some(BlockType::Air));
}

#[test]
fn test_bedrock_is_indestructible() {
    init_logging();
    let world = World::new(WorldConfig {
        terrain: TerrainConfig {
            bedrock_y: Some(500.0),
            ..TerrainConfig::flat()
        },
        ..WorldConfig::default()
    });
    let hex = world.hex_at(world.layout().width(), 517.5);
    let before = world.cell_at_hex(hex).expect("bedrock cell");
    assert_eq!(before.block, BlockType::Bedrock);

    for amount in [1.0, 1000.0, f32::MAX] {
        assert!(!world.damage_cell(hex, 0, amount));
    }
    assert_eq!(world.cell_at_hex(hex), Some(before));
}

#[test]
fn test_raycast_then_place_on_surface() {
    init_logging();
    let world = World::new(flat_config(42));
    world.get_chunk(0, 0);
    let from = Vec2::new(2.3 * world.layout().width(), 10.0);

    let hit = world.raycast(from, Vec2::Y, 400.0).expect("ground below");
    assert_eq!(hit.cell.block, BlockType::Grass);
    let target = hit.previous_hex.expect("open air above the ground");

    assert!(world.place_cell(target, BlockType::Plank));
    assert!(!world.place_cell(target, BlockType::Plank));

    let second = world.raycast(from, Vec2::Y, 400.0).expect("placed block");
    assert_eq!(second.hex, target);
    assert_eq!(second.cell.block, BlockType::Plank);
}

#[test]
fn test_nearby_cells_sees_edits() {
    init_logging();
    let world = World::new(flat_config(5));
    let hex = HexCoord::from_offset(IVec2::new(40, 3));
    let center = world.layout().hex_to_pixel(hex);
    world.place_cell(hex, BlockType::DiamondOre);

    let cells = world.nearby_cells(center.x, center.y, 100.0);
    assert!(cells.iter().any(|c| c.hex == hex && c.block == BlockType::DiamondOre));
    assert_eq!(world.cells_in_hex_range(hex, 1).len(), 7);
}

// ============================================================================
// Organism Tests
// ============================================================================

#[test]
fn test_drops_resolve_once_under_contention() {
    init_logging();
    let world = Arc::new(World::new(WorldConfig::default()));
    let tree = world.spawn_organism(OrganismKind::Tree, Vec2::new(64.0, 128.0));
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let world = Arc::clone(&world);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                // 5.0 * 20 = 100, every hit is lethal
                world.damage_organism(tree, ItemKind::Tool(ToolKind::Axe), 20.0)
            })
        })
        .collect();

    let yielding = handles
        .into_iter()
        .map(|h| h.join().expect("thread panicked"))
        .filter(|drops| !drops.is_empty())
        .count();

    assert_eq!(yielding, 1);
    assert_eq!(world.organism_count(), 0);
}

#[test]
fn test_seeded_drops_are_reproducible() {
    init_logging();
    let roll = || {
        let world = World::new(WorldConfig::default());
        let mut rng = Xoshiro256StarStar::seed_from_u64(99);
        (0..20)
            .map(|i| {
                let id = world.spawn_organism(OrganismKind::Tree, Vec2::new(i as f32 * 100.0, 0.0));
                world.damage_organism_with(id, ItemKind::Tool(ToolKind::Axe), 50.0, &mut rng)
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(roll(), roll());
}

#[test]
fn test_remove_organism_by_identity() {
    init_logging();
    let world = World::new(WorldConfig::default());
    let a = world.spawn_organism(OrganismKind::Tree, Vec2::new(10.0, 10.0));
    let b = world.spawn_organism(OrganismKind::Tree, Vec2::new(10.0, 10.0));

    // Same position, identity decides
    assert_eq!(world.remove_organism(b).map(|o| o.id), Some(b));
    assert_eq!(world.organism_at(10.0, 10.0, 1.0).map(|o| o.id), Some(a));
    assert_eq!(world.remove_organism_at(10.0, 10.0).map(|o| o.id), Some(a));
    assert!(world.remove_organism_at(10.0, 10.0).is_none());
}

// ============================================================================
// Persistence Tests
// ============================================================================

#[test]
fn test_memory_store_keeps_edits_across_eviction() {
    init_logging();
    let store = Arc::new(MemoryChunkStore::new());
    let world = World::with_store(flat_config(11), Arc::clone(&store));
    let (x, y) = (world.layout().width(), 250.0);

    assert!(world.remove_cell_at(x, y));
    let (fx, fy) = far_away(&world);
    world.unload_distant_chunks(fx, fy);
    assert_eq!(store.len(), 1);

    assert!(world.get_cell_at(x, y).is_none());
    let stats = world.stats();
    assert_eq!(stats.saved, 1);
    assert_eq!(stats.loaded, 1);
    assert_eq!(stats.generated, 1);
}

#[test]
fn test_disk_world_roundtrip() -> anyhow::Result<()> {
    init_logging();
    let dir = tempfile::tempdir()?;
    let w = 30.0 * 3f32.sqrt();
    let (x, y) = (0.5 * w, 292.5);

    {
        let world = World::open(dir.path(), flat_config(7))?;
        assert!(world.remove_cell_at(x, y));
        world.add_cell_at(w, 427.5, BlockType::Glass);

        let (fx, fy) = far_away(&world);
        assert_eq!(world.unload_distant_chunks(fx, fy), 1);
        assert!(dir.path().join("chunks").join("chunk_0_0.chunk").exists());

        assert!(world.get_cell_at(x, y).is_none());
        assert_eq!(world.stats().loaded, 1);
    }

    // The stored configuration wins over the one passed in
    let reopened = World::open(dir.path(), WorldConfig::with_seed(999))?;
    assert_eq!(reopened.seed(), 7);
    assert!(reopened.get_cell_at(x, y).is_none());
    assert_eq!(reopened.get_cell_at(w, 427.5).map(|c| c.block), Some(BlockType::Glass));
    Ok(())
}

#[test]
fn test_flush_persists_resident_chunks() -> anyhow::Result<()> {
    init_logging();
    let dir = tempfile::tempdir()?;

    {
        let world = World::open(dir.path(), flat_config(8))?;
        world.add_cell_at(10.0, 10.0, BlockType::Cactus);
        world.get_chunk(4, 4);
        assert_eq!(world.flush(), 1);
    }

    let reopened = World::open(dir.path(), flat_config(8))?;
    assert_eq!(reopened.get_cell_at(10.0, 10.0).map(|c| c.block), Some(BlockType::Cactus));
    assert!(!dir.path().join("chunks").join("chunk_4_4.chunk").exists());
    Ok(())
}

#[test]
fn test_corrupt_chunk_file_regenerates() -> anyhow::Result<()> {
    init_logging();
    let dir = tempfile::tempdir()?;
    std::fs::create_dir_all(dir.path().join("chunks"))?;
    std::fs::write(dir.path().join("chunks").join("chunk_0_0.chunk"), b"not a chunk")?;

    let world = World::open(dir.path(), flat_config(42))?;
    let w = world.layout().width();
    assert_eq!(world.get_cell_at(w, 250.0).map(|c| c.block), Some(BlockType::Grass));

    let stats = world.stats();
    assert_eq!(stats.generated, 1);
    assert_eq!(stats.loaded, 0);
    Ok(())
}

#[test]
fn test_lookup_during_eviction_save_keeps_edits() {
    init_logging();
    let (store, entered, release) = GatedStore::new();
    let world = World::with_store(flat_config(11), store);
    let w = world.layout().width();
    let (x, y) = (w, 250.0);
    let (fx, fy) = far_away(&world);

    assert!(world.remove_cell_at(x, y));
    let original = world.get_chunk(0, 0);

    let resumed = thread::scope(|s| {
        let evicting = s.spawn(|| world.unload_distant_chunks(fx, fy));

        // The save is now running with chunk (0, 0) already out of the map
        let saving = entered.recv().expect("save started");
        let resumed = world.get_chunk(0, 0);
        release.send(()).expect("store alive");

        assert_eq!(evicting.join().expect("eviction panicked"), 1);
        assert_eq!(saving, IVec2::ZERO);
        resumed
    });

    assert!(Arc::ptr_eq(&original, &resumed));
    assert!(world.get_cell_at(x, y).is_none());
    world.add_cell_at(3.0 * w, 400.0, BlockType::Glass);

    // Second eviction goes through without waiting
    release.send(()).expect("store alive");
    assert_eq!(world.unload_distant_chunks(fx, fy), 1);

    assert!(world.get_cell_at(x, y).is_none());
    assert_eq!(world.get_cell_at(3.0 * w, 400.0).map(|c| c.block), Some(BlockType::Glass));
    let stats = world.stats();
    assert_eq!(stats.generated, 1);
    assert_eq!(stats.saved, 2);
    assert_eq!(stats.loaded, 1);
}
