//! Chunk storage and addressing
//!
//! A chunk holds an N×N block of hex cells in odd-r offset layout. Chunk
//! `(cx, cy)` covers the pixel rectangle
//! `[cx·N·W, (cx+1)·N·W) × [cy·N·VS, (cy+1)·N·VS)` where `W` is the hex width
//! and `VS` the row spacing. Odd global rows are shifted right by `W/2`, so the
//! first half-width of an odd row belongs to the previous chunk's last column.

use ahash::AHashMap;
use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};
use tesselbox_blocks::Blocks;

use super::cell::{Cell, LocalAddress};
use super::generation::TerrainGenerator;
use crate::hex::{HexCoord, HexLayout};

/// Default number of cells per chunk side
pub const CHUNK_SIZE: i32 = 32;

/// Pixel dimensions and addressing rules shared by every chunk in a world
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChunkGeometry {
    layout: HexLayout,
    cells_per_side: i32,
}

impl ChunkGeometry {
    pub fn new(hex_size: f32, cells_per_side: i32) -> Self {
        Self {
            layout: HexLayout::offset_aligned(hex_size),
            cells_per_side,
        }
    }

    pub fn layout(&self) -> &HexLayout {
        &self.layout
    }

    pub fn cells_per_side(&self) -> i32 {
        self.cells_per_side
    }

    pub fn chunk_width(&self) -> f32 {
        self.cells_per_side as f32 * self.layout.width()
    }

    pub fn chunk_height(&self) -> f32 {
        self.cells_per_side as f32 * self.layout.vertical_spacing()
    }

    /// Top-left pixel of a chunk
    pub fn chunk_origin(&self, chunk: IVec2) -> Vec2 {
        Vec2::new(
            chunk.x as f32 * self.chunk_width(),
            chunk.y as f32 * self.chunk_height(),
        )
    }

    /// Chunk whose pixel rectangle contains `pos`
    pub fn chunk_coordinates_of(&self, pos: Vec2) -> IVec2 {
        IVec2::new(
            (pos.x / self.chunk_width()).floor() as i32,
            (pos.y / self.chunk_height()).floor() as i32,
        )
    }

    /// Local address of `pos` inside `chunk`, or `None` if it falls outside
    ///
    /// The half-width shift is chosen from the parity of the integer global
    /// row, which keeps insertion, lookup and removal consistent.
    pub fn local_address(&self, chunk: IVec2, pos: Vec2) -> Option<LocalAddress> {
        let n = self.cells_per_side;
        let width = self.layout.width();
        let rel = pos - self.chunk_origin(chunk);

        let row = (rel.y / self.layout.vertical_spacing()).floor() as i32;
        if !(0..n).contains(&row) {
            return None;
        }

        let global_row = chunk.y * n + row;
        let shift = if global_row & 1 == 1 { width / 2.0 } else { 0.0 };
        let col = ((rel.x - shift) / width).floor() as i32;
        if !(0..n).contains(&col) {
            return None;
        }

        Some(LocalAddress::new(col, row))
    }

    /// Owning chunk and local address of a hex
    pub fn locate_hex(&self, hex: HexCoord) -> (IVec2, LocalAddress) {
        let n = self.cells_per_side;
        let offset = hex.to_offset();
        (
            IVec2::new(offset.x.div_euclid(n), offset.y.div_euclid(n)),
            LocalAddress::new(offset.x.rem_euclid(n), offset.y.rem_euclid(n)),
        )
    }

    pub fn hex_of(&self, chunk: IVec2, local: LocalAddress) -> HexCoord {
        let n = self.cells_per_side;
        HexCoord::from_offset(IVec2::new(chunk.x * n + local.col, chunk.y * n + local.row))
    }

    /// World-pixel center of a local address
    pub fn cell_center(&self, chunk: IVec2, local: LocalAddress) -> Vec2 {
        self.layout.hex_to_pixel(self.hex_of(chunk, local))
    }
}

impl Default for ChunkGeometry {
    fn default() -> Self {
        Self::new(30.0, CHUNK_SIZE)
    }
}

/// Serializable form of a chunk's cells
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkSnapshot {
    pub x: i32,
    pub y: i32,
    pub cells: Vec<Cell>,
}

/// A fixed-size tile of hex cells
#[derive(Clone, Debug)]
pub struct Chunk {
    pub x: i32,
    pub y: i32,
    geometry: ChunkGeometry,
    cells: AHashMap<LocalAddress, Cell>,
    generated: bool,
    /// Changed since generation or the last save
    modified: bool,
}

impl Chunk {
    pub fn new(x: i32, y: i32, geometry: ChunkGeometry) -> Self {
        Self {
            x,
            y,
            geometry,
            cells: AHashMap::new(),
            generated: false,
            modified: false,
        }
    }

    pub fn coord(&self) -> IVec2 {
        IVec2::new(self.x, self.y)
    }

    pub fn geometry(&self) -> &ChunkGeometry {
        &self.geometry
    }

    pub fn is_generated(&self) -> bool {
        self.generated
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn mark_modified(&mut self) {
        self.modified = true;
    }

    /// Clear the modified flag once the chunk has been persisted
    pub fn mark_saved(&mut self) {
        self.modified = false;
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    pub fn local_address(&self, world_x: f32, world_y: f32) -> Option<LocalAddress> {
        self.geometry
            .local_address(self.coord(), Vec2::new(world_x, world_y))
    }

    pub fn get(&self, world_x: f32, world_y: f32) -> Option<&Cell> {
        self.local_address(world_x, world_y)
            .and_then(|local| self.cells.get(&local))
    }

    pub fn get_local(&self, local: LocalAddress) -> Option<&Cell> {
        self.cells.get(&local)
    }

    /// Mutable access by address. Callers mark the chunk modified themselves.
    pub fn get_local_mut(&mut self, local: LocalAddress) -> Option<&mut Cell> {
        self.cells.get_mut(&local)
    }

    /// Store a cell at the address containing the given pixel
    ///
    /// Returns false when the pixel lies outside this chunk.
    pub fn put(&mut self, world_x: f32, world_y: f32, cell: Cell) -> bool {
        match self.local_address(world_x, world_y) {
            Some(local) => {
                self.put_local(local, cell);
                true
            }
            None => {
                log::warn!(
                    "Chunk ({}, {}): put at ({:.1}, {:.1}) is outside the chunk",
                    self.x,
                    self.y,
                    world_x,
                    world_y
                );
                false
            }
        }
    }

    /// Store a cell at a local address, returning the previous occupant
    ///
    /// The cell's address, hex and center are rewritten to match its slot.
    pub fn put_local(&mut self, local: LocalAddress, mut cell: Cell) -> Option<Cell> {
        cell.local = local;
        cell.hex = self.geometry.hex_of(self.coord(), local);
        cell.position = self.geometry.cell_center(self.coord(), local);
        self.modified = true;
        self.cells.insert(local, cell)
    }

    pub fn remove(&mut self, world_x: f32, world_y: f32) -> bool {
        self.local_address(world_x, world_y)
            .and_then(|local| self.remove_local(local))
            .is_some()
    }

    pub fn remove_local(&mut self, local: LocalAddress) -> Option<Cell> {
        let removed = self.cells.remove(&local);
        if removed.is_some() {
            self.modified = true;
        }
        removed
    }

    /// Fill every local address from the terrain generator
    ///
    /// Runs at most once per chunk. The result depends only on the seed and
    /// the cell positions, so a regenerated chunk matches the original.
    pub fn generate(&mut self, generator: &TerrainGenerator, blocks: &Blocks) {
        if self.generated {
            log::warn!(
                "[GEN] Chunk ({}, {}) already generated, skipping",
                self.x,
                self.y
            );
            return;
        }

        let n = self.geometry.cells_per_side();
        let coord = self.coord();
        self.cells.reserve((n * n) as usize);

        for row in 0..n {
            for col in 0..n {
                let local = LocalAddress::new(col, row);
                let hex = self.geometry.hex_of(coord, local);
                let position = self.geometry.layout().hex_to_pixel(hex);
                let block = generator.block_at(hex, position);
                let mut cell = Cell::from_def(blocks.get(block), hex, position);
                cell.local = local;
                self.cells.insert(local, cell);
            }
        }

        self.generated = true;
        self.modified = false;

        log::debug!(
            "[GEN] Generated chunk ({}, {}) with {} cells",
            self.x,
            self.y,
            self.cells.len()
        );
    }

    pub fn to_snapshot(&self) -> ChunkSnapshot {
        let mut cells: Vec<Cell> = self.cells.values().cloned().collect();
        cells.sort_by_key(|cell| (cell.local.row, cell.local.col));
        ChunkSnapshot {
            x: self.x,
            y: self.y,
            cells,
        }
    }

    /// Rebuild a chunk from stored cells, treating it as generated and clean
    pub fn from_snapshot(snapshot: ChunkSnapshot, geometry: ChunkGeometry) -> Self {
        let mut chunk = Chunk::new(snapshot.x, snapshot.y, geometry);
        let n = geometry.cells_per_side();

        for cell in snapshot.cells {
            let local = cell.local;
            if !(0..n).contains(&local.col) || !(0..n).contains(&local.row) {
                log::warn!(
                    "[LOAD] Dropping cell at {:?} outside chunk ({}, {})",
                    local,
                    snapshot.x,
                    snapshot.y
                );
                continue;
            }
            chunk.cells.insert(local, cell);
        }

        chunk.generated = true;
        chunk.modified = false;
        chunk
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::worldgen_config::TerrainConfig;
    use tesselbox_blocks::BlockType;

    fn geometry() -> ChunkGeometry {
        ChunkGeometry::new(30.0, 32)
    }

    fn cell(block: BlockType) -> Cell {
        Cell::new(block, 100.0, HexCoord::ZERO, Vec2::ZERO)
    }

    #[test]
    fn test_chunk_footprint() {
        let g = geometry();
        assert!((g.chunk_width() - 32.0 * 30.0 * 3f32.sqrt()).abs() < 1e-2);
        assert_eq!(g.chunk_height(), 32.0 * 45.0);
        assert_eq!(g.chunk_coordinates_of(Vec2::new(0.0, 0.0)), IVec2::ZERO);
        assert_eq!(g.chunk_coordinates_of(Vec2::new(-1.0, -1.0)), IVec2::new(-1, -1));
        assert_eq!(
            g.chunk_coordinates_of(Vec2::new(g.chunk_width() * 2.5, g.chunk_height() * 0.5)),
            IVec2::new(2, 0)
        );
    }

    #[test]
    fn test_local_address_row_parity() {
        let g = geometry();
        let w = g.layout().width();
        let vs = g.layout().vertical_spacing();

        // Even row: column boundaries at multiples of W
        assert_eq!(
            g.local_address(IVec2::ZERO, Vec2::new(0.2 * w, 0.5 * vs)),
            Some(LocalAddress::new(0, 0))
        );
        // Odd row: first half-width belongs to the previous chunk
        assert_eq!(g.local_address(IVec2::ZERO, Vec2::new(0.2 * w, 1.5 * vs)), None);
        assert_eq!(
            g.local_address(IVec2::ZERO, Vec2::new(0.7 * w, 1.5 * vs)),
            Some(LocalAddress::new(0, 1))
        );
        assert_eq!(
            g.local_address(IVec2::ZERO, Vec2::new(1.4 * w, 1.5 * vs)),
            Some(LocalAddress::new(0, 1))
        );
        assert_eq!(
            g.local_address(IVec2::ZERO, Vec2::new(1.6 * w, 1.5 * vs)),
            Some(LocalAddress::new(1, 1))
        );
    }

    #[test]
    fn test_cell_centers_map_back_to_their_address() {
        let g = geometry();
        for chunk in [IVec2::new(0, 0), IVec2::new(-1, 2), IVec2::new(3, -3)] {
            for row in 0..32 {
                for col in 0..32 {
                    let local = LocalAddress::new(col, row);
                    let center = g.cell_center(chunk, local);
                    assert_eq!(g.local_address(chunk, center), Some(local));
                    assert_eq!(g.locate_hex(g.hex_of(chunk, local)), (chunk, local));
                }
            }
        }
    }

    #[test]
    fn test_put_get_roundtrip_even_and_odd_rows() {
        let g = geometry();
        let w = g.layout().width();
        let vs = g.layout().vertical_spacing();
        let mut chunk = Chunk::new(0, 0, g);

        let even = Vec2::new(5.3 * w, 4.2 * vs);
        let odd = Vec2::new(5.9 * w, 5.7 * vs);
        assert!(chunk.put(even.x, even.y, cell(BlockType::Stone)));
        assert!(chunk.put(odd.x, odd.y, cell(BlockType::Sand)));

        assert_eq!(chunk.get(even.x, even.y).map(|c| c.block), Some(BlockType::Stone));
        assert_eq!(chunk.get(odd.x, odd.y).map(|c| c.block), Some(BlockType::Sand));
        assert_eq!(chunk.len(), 2);
        assert!(chunk.is_modified());
    }

    #[test]
    fn test_put_assigns_owner_fields() {
        let g = geometry();
        let mut chunk = Chunk::new(1, 1, g);
        let local = LocalAddress::new(3, 7);
        chunk.put_local(local, cell(BlockType::Brick));

        let stored = chunk.get_local(local).unwrap();
        assert_eq!(stored.local, local);
        assert_eq!(stored.hex, g.hex_of(IVec2::new(1, 1), local));
        assert_eq!(stored.position, g.cell_center(IVec2::new(1, 1), local));
    }

    #[test]
    fn test_put_outside_chunk_is_rejected() {
        let mut chunk = Chunk::new(0, 0, geometry());
        assert!(!chunk.put(-10.0, 10.0, cell(BlockType::Dirt)));
        assert!(chunk.is_empty());
        assert!(!chunk.is_modified());
    }

    #[test]
    fn test_remove_marks_modified_only_on_success() {
        let g = geometry();
        let mut chunk = Chunk::new(0, 0, g);
        let pos = g.cell_center(IVec2::ZERO, LocalAddress::new(2, 3));

        assert!(!chunk.remove(pos.x, pos.y));
        assert!(!chunk.is_modified());

        chunk.put(pos.x, pos.y, cell(BlockType::Dirt));
        chunk.mark_saved();
        assert!(chunk.remove(pos.x, pos.y));
        assert!(chunk.is_modified());
        assert!(chunk.get(pos.x, pos.y).is_none());
    }

    #[test]
    fn test_generate_fills_every_address_once() {
        let g = geometry();
        let generator = TerrainGenerator::new(42, TerrainConfig::default());
        let blocks = Blocks::new();
        let mut chunk = Chunk::new(0, 0, g);

        chunk.generate(&generator, &blocks);
        assert!(chunk.is_generated());
        assert!(!chunk.is_modified());
        assert_eq!(chunk.len(), 32 * 32);
        for row in 0..32 {
            for col in 0..32 {
                assert!(chunk.get_local(LocalAddress::new(col, row)).is_some());
            }
        }

        // Second call leaves edits alone
        let local = LocalAddress::new(0, 0);
        chunk.remove_local(local);
        chunk.generate(&generator, &blocks);
        assert!(chunk.get_local(local).is_none());
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let g = geometry();
        let generator = TerrainGenerator::new(7, TerrainConfig::default());
        let blocks = Blocks::new();
        let mut chunk = Chunk::new(-2, 1, g);
        chunk.generate(&generator, &blocks);
        chunk.remove_local(LocalAddress::new(4, 4));

        let restored = Chunk::from_snapshot(chunk.to_snapshot(), g);
        assert_eq!(restored.coord(), IVec2::new(-2, 1));
        assert_eq!(restored.len(), chunk.len());
        assert!(restored.is_generated());
        assert!(!restored.is_modified());
        assert!(restored.get_local(LocalAddress::new(4, 4)).is_none());
        assert_eq!(
            restored.get_local(LocalAddress::new(5, 5)),
            chunk.get_local(LocalAddress::new(5, 5))
        );
    }
}
