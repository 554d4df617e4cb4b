//! Block definitions and registry

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Health granted per point of hardness
pub const HEALTH_PER_HARDNESS: f32 = 100.0;

/// Terrain material of a single hex cell
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum BlockType {
    /// Empty cell, rendered as absent
    #[default]
    Air = 0,
    Dirt,
    Grass,
    Stone,
    Sand,
    Water,
    Log,
    Leaves,
    CoalOre,
    IronOre,
    GoldOre,
    DiamondOre,
    /// Indestructible floor material
    Bedrock,
    Glass,
    Brick,
    Plank,
    Cactus,
}

impl BlockType {
    /// Every block type, in discriminant order
    pub const ALL: [BlockType; 17] = [
        BlockType::Air,
        BlockType::Dirt,
        BlockType::Grass,
        BlockType::Stone,
        BlockType::Sand,
        BlockType::Water,
        BlockType::Log,
        BlockType::Leaves,
        BlockType::CoalOre,
        BlockType::IronOre,
        BlockType::GoldOre,
        BlockType::DiamondOre,
        BlockType::Bedrock,
        BlockType::Glass,
        BlockType::Brick,
        BlockType::Plank,
        BlockType::Cactus,
    ];

    /// Canonical snake_case tag used in configs and remote requests
    pub fn tag(self) -> &'static str {
        match self {
            BlockType::Air => "air",
            BlockType::Dirt => "dirt",
            BlockType::Grass => "grass",
            BlockType::Stone => "stone",
            BlockType::Sand => "sand",
            BlockType::Water => "water",
            BlockType::Log => "log",
            BlockType::Leaves => "leaves",
            BlockType::CoalOre => "coal_ore",
            BlockType::IronOre => "iron_ore",
            BlockType::GoldOre => "gold_ore",
            BlockType::DiamondOre => "diamond_ore",
            BlockType::Bedrock => "bedrock",
            BlockType::Glass => "glass",
            BlockType::Brick => "brick",
            BlockType::Plank => "plank",
            BlockType::Cactus => "cactus",
        }
    }

    /// Human-readable name
    pub fn display_name(self) -> &'static str {
        match self {
            BlockType::Air => "Air",
            BlockType::Dirt => "Dirt",
            BlockType::Grass => "Grass Block",
            BlockType::Stone => "Stone",
            BlockType::Sand => "Sand",
            BlockType::Water => "Water",
            BlockType::Log => "Log",
            BlockType::Leaves => "Leaves",
            BlockType::CoalOre => "Coal Ore",
            BlockType::IronOre => "Iron Ore",
            BlockType::GoldOre => "Gold Ore",
            BlockType::DiamondOre => "Diamond Ore",
            BlockType::Bedrock => "Bedrock",
            BlockType::Glass => "Glass",
            BlockType::Brick => "Bricks",
            BlockType::Plank => "Oak Planks",
            BlockType::Cactus => "Cactus",
        }
    }

    pub fn is_air(self) -> bool {
        self == BlockType::Air
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Error returned when a block tag from outside the core cannot be resolved
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockParseError {
    #[error("block tag is empty")]
    Empty,
    #[error("unknown block tag '{0}'")]
    UnknownTag(String),
}

fn normalize_tag(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

impl FromStr for BlockType {
    type Err = BlockParseError;

    /// Accepts the snake_case tag or the display name, ignoring case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_tag(s);
        if wanted.is_empty() {
            return Err(BlockParseError::Empty);
        }

        BlockType::ALL
            .into_iter()
            .find(|block| {
                block.tag() == wanted || normalize_tag(block.display_name()) == wanted
            })
            .ok_or_else(|| BlockParseError::UnknownTag(s.trim().to_string()))
    }
}

bitflags! {
    /// Static block properties
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BlockFlags: u8 {
        /// Light passes through
        const TRANSPARENT = 1 << 0;
        /// Blocks movement and raycasts
        const SOLID = 1 << 1;
        /// Yields an item when broken
        const COLLECTIBLE = 1 << 2;
        const FLAMMABLE = 1 << 3;
    }
}

/// Definition of a block's properties
#[derive(Clone, Debug)]
pub struct BlockDef {
    pub block: BlockType,
    pub name: &'static str,

    /// Mining resistance. Zero or negative means the block cannot be destroyed.
    pub hardness: f32,
    pub flags: BlockFlags,
    /// Emitted light (0-15)
    pub light_level: u8,
}

impl BlockDef {
    fn new(block: BlockType, hardness: f32, flags: BlockFlags) -> Self {
        Self {
            block,
            name: block.display_name(),
            hardness,
            flags,
            light_level: 0,
        }
    }

    fn with_light(mut self, light_level: u8) -> Self {
        self.light_level = light_level;
        self
    }

    /// Starting health of a freshly generated or placed cell
    pub fn max_health(&self) -> f32 {
        self.hardness * HEALTH_PER_HARDNESS
    }

    pub fn is_destructible(&self) -> bool {
        self.hardness > 0.0
    }

    pub fn is_solid(&self) -> bool {
        self.flags.contains(BlockFlags::SOLID)
    }

    pub fn is_transparent(&self) -> bool {
        self.flags.contains(BlockFlags::TRANSPARENT)
    }

    pub fn is_collectible(&self) -> bool {
        self.flags.contains(BlockFlags::COLLECTIBLE)
    }

    pub fn is_flammable(&self) -> bool {
        self.flags.contains(BlockFlags::FLAMMABLE)
    }
}

impl Default for BlockDef {
    fn default() -> Self {
        Self::new(BlockType::Air, 0.0, BlockFlags::TRANSPARENT)
    }
}

/// Registry of all block definitions, indexed by block type
#[derive(Clone, Debug)]
pub struct Blocks {
    defs: Vec<BlockDef>,
}

impl Blocks {
    pub fn new() -> Self {
        let mut blocks = Self { defs: Vec::new() };
        blocks.register_defaults();
        blocks
    }

    fn register_defaults(&mut self) {
        use BlockFlags as F;

        let opaque = F::SOLID | F::COLLECTIBLE;
        let see_through = F::SOLID | F::COLLECTIBLE | F::TRANSPARENT;

        self.register(BlockDef::new(BlockType::Air, 0.0, F::TRANSPARENT));
        self.register(BlockDef::new(BlockType::Dirt, 1.0, opaque));
        self.register(BlockDef::new(BlockType::Grass, 1.0, opaque));
        self.register(BlockDef::new(BlockType::Stone, 2.0, opaque));
        self.register(BlockDef::new(BlockType::Sand, 0.8, opaque));
        self.register(BlockDef::new(BlockType::Water, 0.0, F::TRANSPARENT).with_light(1));
        self.register(BlockDef::new(BlockType::Log, 2.0, opaque | F::FLAMMABLE));
        self.register(BlockDef::new(BlockType::Leaves, 0.5, see_through | F::FLAMMABLE));
        self.register(BlockDef::new(BlockType::CoalOre, 3.0, opaque));
        self.register(BlockDef::new(BlockType::IronOre, 3.0, opaque));
        self.register(BlockDef::new(BlockType::GoldOre, 3.0, opaque));
        self.register(BlockDef::new(BlockType::DiamondOre, 4.0, opaque).with_light(2));
        // Solid but never drops anything
        self.register(BlockDef::new(BlockType::Bedrock, -1.0, F::SOLID));
        self.register(BlockDef::new(BlockType::Glass, 0.5, see_through));
        self.register(BlockDef::new(BlockType::Brick, 2.0, opaque));
        self.register(BlockDef::new(BlockType::Plank, 1.0, opaque | F::FLAMMABLE));
        self.register(BlockDef::new(BlockType::Cactus, 0.8, see_through));

        log::debug!("Registered {} block definitions", self.defs.len());
    }

    fn register(&mut self, def: BlockDef) {
        let index = def.block as usize;

        if self.defs.len() <= index {
            self.defs.resize(index + 1, BlockDef::default());
        }

        self.defs[index] = def;
    }

    /// Get block definition by type
    pub fn get(&self, block: BlockType) -> &BlockDef {
        self.defs
            .get(block as usize)
            .unwrap_or(&self.defs[BlockType::Air as usize])
    }

    /// Starting health for a cell of the given type
    pub fn max_health(&self, block: BlockType) -> f32 {
        self.get(block).max_health()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockDef> {
        self.defs.iter()
    }
}

impl Default for Blocks {
    fn default() -> Self {
        Self::new()
    }
}
