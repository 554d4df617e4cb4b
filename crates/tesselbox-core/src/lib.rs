//! Hex-grid chunked world core for Tesselbox
//!
//! - `hex`: pixel/hex coordinate math
//! - `world`: cells, chunks, terrain generation, the chunk cache and its queries
//! - `entity`: organisms and their registry

pub mod entity;
pub mod hex;
pub mod world;

pub use tesselbox_blocks as blocks;

pub use entity::{ItemDrop, Organism, OrganismId, OrganismKind, OrganismRegistry};
pub use hex::{FractionalHex, HexCoord, HexLayout};
pub use world::{Cell, Chunk, World, WorldConfig};
