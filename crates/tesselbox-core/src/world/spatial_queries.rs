//! Read-only lookups spanning chunk boundaries

use glam::{IVec2, Vec2};

use super::cell::Cell;
use super::chunk_manager::ChunkManager;
use crate::entity::{Organism, OrganismRegistry};
use crate::hex::{HexCoord, hexes_within};

/// Result of a line-of-sight query
#[derive(Debug, Clone, PartialEq)]
pub struct RaycastHit {
    pub hex: HexCoord,
    pub cell: Cell,
    /// Last non-solid hex before the hit, where a block could be placed
    pub previous_hex: Option<HexCoord>,
}

/// Spatial query utilities - stateless methods over the chunk cache
pub struct SpatialQueries;

impl SpatialQueries {
    /// Every cell whose center lies within `radius` of `(x, y)`
    ///
    /// Chunks overlapping the search box are generated if absent. Air cells
    /// are included. Result order is unspecified.
    pub fn nearby_cells(chunk_manager: &ChunkManager, x: f32, y: f32, radius: f32) -> Vec<Cell> {
        let center = Vec2::new(x, y);
        let radius_sq = radius * radius;
        // Odd-row centers sit up to a full width outside their chunk's left edge
        let width = chunk_manager.geometry().layout().width();

        let min = chunk_manager.chunk_coordinates_of(Vec2::new(x - radius - width, y - radius));
        let max = chunk_manager.chunk_coordinates_of(Vec2::new(x + radius + width, y + radius));

        let mut cells = Vec::new();
        for cy in min.y..=max.y {
            for cx in min.x..=max.x {
                chunk_manager.read_chunk(IVec2::new(cx, cy), |chunk| {
                    cells.extend(
                        chunk
                            .cells()
                            .filter(|cell| cell.position.distance_squared(center) <= radius_sq)
                            .cloned(),
                    );
                });
            }
        }
        cells
    }

    /// Cells within `range` hex steps of `center`, generating chunks as needed
    pub fn cells_in_hex_range(chunk_manager: &ChunkManager, center: HexCoord, range: u32) -> Vec<Cell> {
        hexes_within(center, range)
            .into_iter()
            .filter_map(|hex| chunk_manager.cell_at_hex(hex))
            .collect()
    }

    /// Walk from `from` along `direction` and return the first solid cell
    ///
    /// Samples every quarter hex size. Chunks that are not resident are
    /// skipped rather than generated. A non-finite `max_distance` hits nothing.
    pub fn raycast(
        chunk_manager: &ChunkManager,
        from: Vec2,
        direction: Vec2,
        max_distance: f32,
    ) -> Option<RaycastHit> {
        let dir = direction.normalize_or_zero();
        if dir == Vec2::ZERO || !max_distance.is_finite() || max_distance < 0.0 {
            return None;
        }

        let step = chunk_manager.geometry().layout().size / 4.0;
        let steps = (max_distance / step).ceil() as u32;
        let mut last_hex = None;
        let mut previous_hex = None;

        for i in 0..=steps {
            let t = (i as f32 * step).min(max_distance);
            let hex = chunk_manager.hex_at(from + dir * t);
            if last_hex == Some(hex) {
                continue;
            }
            last_hex = Some(hex);

            let (coord, local) = chunk_manager.locate_hex(hex);
            let Some(chunk) = chunk_manager.get_loaded_chunk(coord) else {
                continue;
            };
            let cell = chunk.read().get_local(local).cloned();

            match cell {
                Some(cell) if !cell.is_empty() && chunk_manager.blocks().get(cell.block).is_solid() => {
                    return Some(RaycastHit {
                        hex,
                        cell,
                        previous_hex,
                    });
                }
                _ => previous_hex = Some(hex),
            }
        }

        None
    }

    pub fn nearby_organisms(registry: &OrganismRegistry, x: f32, y: f32, radius: f32) -> Vec<Organism> {
        registry.nearby(x, y, radius)
    }

    pub fn organism_at(registry: &OrganismRegistry, x: f32, y: f32, tolerance: f32) -> Option<Organism> {
        registry.at(x, y, tolerance)
    }
}
