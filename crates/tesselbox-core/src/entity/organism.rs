//! Damageable entities that yield drops when destroyed

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tesselbox_blocks::{ItemKind, ToolKind};

use crate::world::WorldRng;

/// Stable identity of an organism, unique within its registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrganismId(u64);

impl OrganismId {
    pub fn from_raw(id: u64) -> Self {
        OrganismId(id)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for OrganismId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Organism({})", self.0)
    }
}

/// One line of a drop table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropEntry {
    pub item: ItemKind,
    /// Probability in [0, 1] that this line yields anything
    pub chance: f32,
    pub min: u32,
    pub max: u32,
}

/// Items produced when an organism is destroyed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDrop {
    pub item: ItemKind,
    pub quantity: u32,
}

const TREE_DROPS: &[DropEntry] = &[
    DropEntry {
        item: ItemKind::Wood,
        chance: 1.0,
        min: 3,
        max: 6,
    },
    DropEntry {
        item: ItemKind::Sapling,
        chance: 0.3,
        min: 0,
        max: 1,
    },
];

/// Closed set of organism kinds, each carrying its own tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrganismKind {
    Tree,
}

impl OrganismKind {
    pub fn max_health(&self) -> f32 {
        match self {
            OrganismKind::Tree => 100.0,
        }
    }

    /// Radius in pixels used for hit tests
    pub fn hitbox_radius(&self) -> f32 {
        match self {
            OrganismKind::Tree => 30.0,
        }
    }

    /// Scale applied to base damage for the item doing the hitting
    pub fn damage_multiplier(&self, item: ItemKind) -> f32 {
        match (self, item.tool()) {
            (OrganismKind::Tree, Some(ToolKind::Axe)) => 5.0,
            (OrganismKind::Tree, _) => 0.2,
        }
    }

    pub fn drop_table(&self) -> &'static [DropEntry] {
        match self {
            OrganismKind::Tree => TREE_DROPS,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OrganismKind::Tree => "tree",
        }
    }
}

/// Roll every line of a drop table once
///
/// Lines that miss their chance or roll a quantity of zero are left out.
pub fn resolve_drops(table: &[DropEntry], rng: &mut impl WorldRng) -> Vec<ItemDrop> {
    table
        .iter()
        .filter_map(|entry| {
            if !rng.check_probability(entry.chance) {
                return None;
            }
            let quantity = rng.gen_range_inclusive(entry.min, entry.max);
            (quantity > 0).then_some(ItemDrop {
                item: entry.item,
                quantity,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organism {
    pub id: OrganismId,
    pub kind: OrganismKind,
    pub position: Vec2,
    pub health: f32,
    pub max_health: f32,
    pub alive: bool,
}

impl Organism {
    pub fn new(id: OrganismId, kind: OrganismKind, position: Vec2) -> Self {
        let max_health = kind.max_health();
        Self {
            id,
            kind,
            position,
            health: max_health,
            max_health,
            alive: true,
        }
    }

    /// Apply damage already scaled by the item multiplier
    ///
    /// Returns true only on the call that kills the organism.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if !self.alive {
            return false;
        }

        self.health = (self.health - amount.max(0.0)).max(0.0);
        if self.health <= 0.0 {
            self.alive = false;
            true
        } else {
            false
        }
    }

    pub fn contains_point(&self, point: Vec2) -> bool {
        self.position.distance_squared(point) <= self.kind.hitbox_radius().powi(2)
    }
}
