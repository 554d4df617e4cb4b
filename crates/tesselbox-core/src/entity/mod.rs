pub mod organism;
pub mod organism_registry;

pub use organism::{DropEntry, ItemDrop, Organism, OrganismId, OrganismKind, resolve_drops};
pub use organism_registry::OrganismRegistry;
