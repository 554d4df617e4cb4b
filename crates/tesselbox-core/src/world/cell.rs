//! Terrain cell stored inside a chunk

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tesselbox_blocks::{BlockDef, BlockType};

use crate::hex::HexCoord;

/// Odd-r offset address of a cell inside its chunk
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocalAddress {
    pub col: i32,
    pub row: i32,
}

impl LocalAddress {
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }
}

/// A single hex of terrain
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub block: BlockType,
    pub health: f32,
    /// Zero or negative means the cell cannot be destroyed
    pub max_health: f32,
    pub hex: HexCoord,
    pub local: LocalAddress,
    /// World-pixel center
    pub position: Vec2,
}

impl Cell {
    /// New cell at full health. The owning chunk fills in `local`.
    pub fn new(block: BlockType, max_health: f32, hex: HexCoord, position: Vec2) -> Self {
        Self {
            block,
            health: max_health.max(0.0),
            max_health,
            hex,
            local: LocalAddress::default(),
            position,
        }
    }

    pub fn from_def(def: &BlockDef, hex: HexCoord, position: Vec2) -> Self {
        Self::new(def.block, def.max_health(), hex, position)
    }

    /// Air and absent cells are both "nothing here"
    pub fn is_empty(&self) -> bool {
        self.block.is_air()
    }

    pub fn is_indestructible(&self) -> bool {
        self.max_health <= 0.0
    }

    /// Remaining health as a fraction of max, 1.0 for indestructible cells
    pub fn health_fraction(&self) -> f32 {
        if self.is_indestructible() {
            1.0
        } else {
            self.health / self.max_health
        }
    }

    /// Apply damage, returning true only on the call that destroys the cell
    ///
    /// Destroyed cells turn into air with zero max health, so any further
    /// damage is ignored.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if self.is_indestructible() {
            return false;
        }

        let amount = amount.max(0.0);
        self.health = (self.health - amount).max(0.0);

        if self.health <= 0.0 {
            self.block = BlockType::Air;
            self.health = 0.0;
            self.max_health = 0.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dirt() -> Cell {
        Cell::new(BlockType::Dirt, 100.0, HexCoord::ZERO, Vec2::ZERO)
    }

    #[test]
    fn test_new_cell_at_full_health() {
        let cell = dirt();
        assert_eq!(cell.health, 100.0);
        assert_eq!(cell.health_fraction(), 1.0);
        assert!(!cell.is_empty());
    }

    #[test]
    fn test_damage_clamps_at_zero_and_destroys_once() {
        let mut cell = dirt();
        assert!(!cell.take_damage(60.0));
        assert_eq!(cell.health, 40.0);

        assert!(cell.take_damage(500.0));
        assert_eq!(cell.health, 0.0);
        assert!(cell.is_empty());

        // Already air
        assert!(!cell.take_damage(10.0));
        assert_eq!(cell.health, 0.0);
    }

    #[test]
    fn test_negative_damage_does_not_heal() {
        let mut cell = dirt();
        cell.take_damage(30.0);
        assert!(!cell.take_damage(-50.0));
        assert_eq!(cell.health, 70.0);
        assert!(!cell.take_damage(f32::NAN));
        assert_eq!(cell.health, 70.0);
    }

    #[test]
    fn test_indestructible_cell_ignores_damage() {
        let mut cell = Cell::new(BlockType::Bedrock, -100.0, HexCoord::ZERO, Vec2::ZERO);
        assert_eq!(cell.health, 0.0);
        for amount in [1.0, 1e6, f32::INFINITY] {
            assert!(!cell.take_damage(amount));
        }
        assert_eq!(cell.block, BlockType::Bedrock);
        assert_eq!(cell.health, 0.0);
        assert_eq!(cell.health_fraction(), 1.0);
    }
}
