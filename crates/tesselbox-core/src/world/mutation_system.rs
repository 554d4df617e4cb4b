//! Mutation system - damage, placement and removal of cells and organisms

use tesselbox_blocks::{BlockType, ItemKind};

use super::cell::Cell;
use super::chunk_manager::ChunkManager;
use super::rng_trait::WorldRng;
use crate::entity::{ItemDrop, OrganismId, OrganismRegistry};
use crate::hex::HexCoord;

/// Mutation system - static utility methods for changing world state
pub struct MutationSystem;

impl MutationSystem {
    /// Damage the cell at `hex`, returning true on the hit that destroys it
    ///
    /// `depth` selects a layer and is ignored while the world has one.
    /// Absent and indestructible cells are left untouched.
    pub fn damage_cell(chunk_manager: &ChunkManager, hex: HexCoord, _depth: i32, amount: f32) -> bool {
        let (coord, local) = chunk_manager.locate_hex(hex);

        chunk_manager.write_chunk(coord, |chunk| {
            let Some(cell) = chunk.get_local_mut(local) else {
                return false;
            };
            if cell.is_indestructible() {
                return false;
            }

            let block = cell.block;
            let destroyed = cell.take_damage(amount);
            chunk.mark_modified();

            if destroyed {
                log::debug!("[MUTATE] Destroyed {} at ({}, {})", block, hex.q, hex.r);
            }
            destroyed
        })
    }

    /// Place `block` at `hex` if the slot is absent or air
    pub fn place_cell(chunk_manager: &ChunkManager, hex: HexCoord, block: BlockType) -> bool {
        if block.is_air() {
            return false;
        }

        let (coord, local) = chunk_manager.locate_hex(hex);
        let cell = Self::new_cell(chunk_manager, hex, block);

        chunk_manager.write_chunk(coord, |chunk| {
            if chunk.get_local(local).is_some_and(|existing| !existing.is_empty()) {
                return false;
            }
            chunk.put_local(local, cell);
            log::debug!("[MUTATE] Placed {} at ({}, {})", block, hex.q, hex.r);
            true
        })
    }

    /// Store a fresh `block` cell at `hex`, replacing any occupant
    pub fn add_cell(chunk_manager: &ChunkManager, hex: HexCoord, block: BlockType) -> Cell {
        let (coord, local) = chunk_manager.locate_hex(hex);
        let cell = Self::new_cell(chunk_manager, hex, block);

        chunk_manager.write_chunk(coord, |chunk| {
            chunk.put_local(local, cell.clone());
        });
        cell
    }

    pub fn remove_cell(chunk_manager: &ChunkManager, hex: HexCoord) -> bool {
        let (coord, local) = chunk_manager.locate_hex(hex);
        chunk_manager.write_chunk(coord, |chunk| chunk.remove_local(local).is_some())
    }

    pub fn damage_organism(
        registry: &mut OrganismRegistry,
        id: OrganismId,
        item: ItemKind,
        base_damage: f32,
        rng: &mut impl WorldRng,
    ) -> Vec<ItemDrop> {
        registry.damage(id, item, base_damage, rng)
    }

    fn new_cell(chunk_manager: &ChunkManager, hex: HexCoord, block: BlockType) -> Cell {
        let (_, local) = chunk_manager.locate_hex(hex);
        let mut cell = Cell::from_def(
            chunk_manager.blocks().get(block),
            hex,
            chunk_manager.geometry().layout().hex_to_pixel(hex),
        );
        cell.local = local;
        cell
    }
}
