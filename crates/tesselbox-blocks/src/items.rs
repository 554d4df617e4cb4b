//! Item tags consumed by damage multipliers and drop tables

use serde::{Deserialize, Serialize};

use crate::BlockType;

/// Tool classes with different use cases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolKind {
    /// Harvesting wood and trees
    Axe,
    /// Mining solid blocks and ores
    Pickaxe,
    /// Digging soil and sand
    Shovel,
    /// Combat
    Sword,
}

/// Anything a hand can hold or a drop table can yield
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Block(BlockType),
    Tool(ToolKind),
    Wood,
    Sapling,
}

impl ItemKind {
    pub fn tool(self) -> Option<ToolKind> {
        match self {
            ItemKind::Tool(tool) => Some(tool),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            ItemKind::Block(block) => block.tag(),
            ItemKind::Tool(ToolKind::Axe) => "axe",
            ItemKind::Tool(ToolKind::Pickaxe) => "pickaxe",
            ItemKind::Tool(ToolKind::Shovel) => "shovel",
            ItemKind::Tool(ToolKind::Sword) => "sword",
            ItemKind::Wood => "wood",
            ItemKind::Sapling => "sapling",
        }
    }
}

impl From<BlockType> for ItemKind {
    fn from(block: BlockType) -> Self {
        ItemKind::Block(block)
    }
}

impl From<ToolKind> for ItemKind {
    fn from(tool: ToolKind) -> Self {
        ItemKind::Tool(tool)
    }
}
