//! Flat, id-keyed storage for organisms
//!
//! Organisms are few compared to cells, so queries are linear scans in
//! insertion order rather than a spatial index.

use glam::Vec2;
use tesselbox_blocks::ItemKind;

use super::organism::{ItemDrop, Organism, OrganismId, OrganismKind, resolve_drops};
use crate::world::WorldRng;

#[derive(Debug, Default)]
pub struct OrganismRegistry {
    organisms: Vec<Organism>,
    next_id: u64,
}

impl OrganismRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.organisms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.organisms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Organism> {
        self.organisms.iter()
    }

    pub fn spawn(&mut self, kind: OrganismKind, position: Vec2) -> OrganismId {
        self.next_id += 1;
        let id = OrganismId::from_raw(self.next_id);
        self.organisms.push(Organism::new(id, kind, position));
        log::debug!(
            "[ORGANISM] Spawned {} {} at ({:.1}, {:.1})",
            kind.name(),
            id,
            position.x,
            position.y
        );
        id
    }

    pub fn get(&self, id: OrganismId) -> Option<&Organism> {
        self.organisms.iter().find(|o| o.id == id)
    }

    /// Organisms whose position lies within `radius` of the point
    pub fn nearby(&self, x: f32, y: f32, radius: f32) -> Vec<Organism> {
        let center = Vec2::new(x, y);
        let radius_sq = radius * radius;
        self.organisms
            .iter()
            .filter(|o| o.position.distance_squared(center) <= radius_sq)
            .cloned()
            .collect()
    }

    /// First organism, in insertion order, within `tolerance` of the point
    pub fn at(&self, x: f32, y: f32, tolerance: f32) -> Option<Organism> {
        let point = Vec2::new(x, y);
        let tolerance_sq = tolerance * tolerance;
        self.organisms
            .iter()
            .find(|o| o.position.distance_squared(point) <= tolerance_sq)
            .cloned()
    }

    pub fn remove(&mut self, id: OrganismId) -> Option<Organism> {
        let index = self.organisms.iter().position(|o| o.id == id)?;
        Some(self.organisms.remove(index))
    }

    /// Remove the first organism positioned exactly at `(x, y)`
    pub fn remove_at(&mut self, x: f32, y: f32) -> Option<Organism> {
        let index = self
            .organisms
            .iter()
            .position(|o| o.position.x == x && o.position.y == y)?;
        Some(self.organisms.remove(index))
    }

    /// Hit an organism with `item`, returning its drops if the hit killed it
    ///
    /// A killed organism leaves the registry in the same call, so drops are
    /// resolved at most once per organism.
    pub fn damage(
        &mut self,
        id: OrganismId,
        item: ItemKind,
        base_damage: f32,
        rng: &mut impl WorldRng,
    ) -> Vec<ItemDrop> {
        let Some(index) = self.organisms.iter().position(|o| o.id == id) else {
            return Vec::new();
        };

        let organism = &mut self.organisms[index];
        let damage = base_damage * organism.kind.damage_multiplier(item);
        if !organism.take_damage(damage) {
            return Vec::new();
        }

        let dead = self.organisms.remove(index);
        let drops = resolve_drops(dead.kind.drop_table(), rng);
        log::debug!(
            "[ORGANISM] {} {} destroyed at ({:.1}, {:.1}), {} drops",
            dead.kind.name(),
            dead.id,
            dead.position.x,
            dead.position.y,
            drops.len()
        );
        drops
    }
}
