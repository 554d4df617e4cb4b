//! Block catalogue and item tags for Tesselbox
//!
//! This crate holds the plain data the world core builds on:
//! - Block types and their definitions (BlockType, BlockDef, Blocks)
//! - Block property flags (BlockFlags)
//! - Item tags used by damage and drop tables (ItemKind, ToolKind)

mod blocks;
mod items;

pub use blocks::{BlockDef, BlockFlags, BlockParseError, BlockType, Blocks, HEALTH_PER_HARDNESS};
pub use items::{ItemKind, ToolKind};
