//! Deterministic terrain generation
//!
//! Every decision is a pure function of the world seed and the cell's hex
//! coordinate / pixel center, so chunks can be generated in any order, on any
//! thread, and regenerated after eviction with identical results.

use fastnoise_lite::FastNoiseLite;
use glam::Vec2;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use tesselbox_blocks::BlockType;

use super::rng_trait::WorldRng;
use super::worldgen_config::{BiomeConfig, BiomeParams, HeightFieldConfig, TerrainConfig};
use crate::hex::HexCoord;

/// Vertical band a position falls into
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerrainLayer {
    /// Open air above the topsoil
    Sky,
    Topsoil,
    Subsoil,
    /// Bedrock tier: stone, ores and bedrock
    Deep,
}

/// Temperature and moisture fields used to pick a biome per column
struct BiomeSelector {
    temperature: FastNoiseLite,
    moisture: FastNoiseLite,
    temperature_amplitude: f32,
    moisture_amplitude: f32,
    /// Highest priority first
    biomes: Vec<BiomeConfig>,
}

impl BiomeSelector {
    fn new(seed: u64, params: &BiomeParams) -> Self {
        let mut biomes = params.biomes.clone();
        biomes.sort_by_key(|biome| std::cmp::Reverse(biome.priority));

        Self {
            temperature: params.temperature_noise.to_fastnoise(seed),
            moisture: params.moisture_noise.to_fastnoise(seed),
            temperature_amplitude: params.temperature_noise.amplitude,
            moisture_amplitude: params.moisture_noise.amplitude,
            biomes,
        }
    }

    fn select(&self, x: f32) -> Option<&BiomeConfig> {
        let temperature = self.temperature.get_noise_2d(x, 0.0) * self.temperature_amplitude;
        let moisture = self.moisture.get_noise_2d(x, 0.0) * self.moisture_amplitude;
        self.biomes
            .iter()
            .find(|biome| biome.contains(temperature, moisture))
    }
}

/// Maps world positions to materials
pub struct TerrainGenerator {
    pub seed: u64,
    config: TerrainConfig,
    /// Phase offsets for the trigonometric height field
    phase: Vec2,
    height_noise: Option<FastNoiseLite>,
    biomes: Option<BiomeSelector>,
}

impl TerrainGenerator {
    pub fn new(seed: u64, config: TerrainConfig) -> Self {
        let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
        let phase = Vec2::new(
            rng.gen_f32() * std::f32::consts::TAU,
            rng.gen_f32() * std::f32::consts::TAU,
        );

        let height_noise = match &config.height_field {
            HeightFieldConfig::Simplex(layer) => Some(layer.to_fastnoise(seed)),
            _ => None,
        };

        let biomes = config
            .biomes
            .as_ref()
            .map(|params| BiomeSelector::new(seed, params));

        log::info!(
            "[GEN] Terrain generator ready (seed {}, surface {}, {:?}, {} biomes)",
            seed,
            config.surface_y,
            config.height_field,
            biomes.as_ref().map_or(0, |selector| selector.biomes.len())
        );

        Self {
            seed,
            config,
            phase,
            height_noise,
            biomes,
        }
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// Biome of the column at `x`, `None` when biomes are off or none matches
    pub fn biome_at(&self, x: f32) -> Option<&BiomeConfig> {
        self.biomes.as_ref()?.select(x)
    }

    /// Surface offset in pixels, positive pushes the surface down
    ///
    /// The height field scaled by the column's biome.
    pub fn height_offset(&self, x: f32, y: f32) -> f32 {
        self.scaled_offset(Vec2::new(x, y), self.biome_at(x))
    }

    fn scaled_offset(&self, pos: Vec2, biome: Option<&BiomeConfig>) -> f32 {
        self.base_offset(pos.x, pos.y) * biome.map_or(1.0, |biome| biome.height_scale)
    }

    fn base_offset(&self, x: f32, y: f32) -> f32 {
        match self.config.height_field {
            HeightFieldConfig::Flat => 0.0,
            HeightFieldConfig::Trigonometric {
                frequency,
                amplitude,
            } => {
                (x * frequency + self.phase.x).sin()
                    * (y * frequency + self.phase.y).cos()
                    * amplitude
            }
            HeightFieldConfig::Simplex(layer) => self
                .height_noise
                .as_ref()
                .map_or(0.0, |noise| noise.get_noise_2d(x, y) * layer.amplitude),
        }
    }

    pub fn classify(&self, pos: Vec2) -> TerrainLayer {
        let h = self.height_offset(pos.x, pos.y);
        self.classify_with_offset(pos, h)
    }

    fn classify_with_offset(&self, pos: Vec2, h: f32) -> TerrainLayer {
        let surface = self.config.surface_y + h;
        let subsoil_top = surface - self.config.subsoil_depth;

        if pos.y < subsoil_top {
            match self.config.topsoil_depth {
                Some(depth) if pos.y < subsoil_top - depth => TerrainLayer::Sky,
                _ => TerrainLayer::Topsoil,
            }
        } else if pos.y < surface {
            TerrainLayer::Subsoil
        } else {
            TerrainLayer::Deep
        }
    }

    /// Material for the cell at `hex` centered on `pos`
    pub fn block_at(&self, hex: HexCoord, pos: Vec2) -> BlockType {
        let biome = self.biome_at(pos.x);
        let h = self.scaled_offset(pos, biome);
        match self.classify_with_offset(pos, h) {
            TerrainLayer::Sky => BlockType::Air,
            TerrainLayer::Topsoil => biome.map_or(self.config.topsoil, |biome| biome.topsoil),
            TerrainLayer::Subsoil => biome.map_or(self.config.subsoil, |biome| biome.subsoil),
            TerrainLayer::Deep => self.deep_block(hex, pos, h),
        }
    }

    fn deep_block(&self, hex: HexCoord, pos: Vec2, h: f32) -> BlockType {
        if let Some(bedrock_y) = self.config.bedrock_y
            && pos.y >= bedrock_y
        {
            return BlockType::Bedrock;
        }

        if self.config.ores.is_empty() {
            return self.config.deep;
        }

        let depth = pos.y - (self.config.surface_y + h);
        let roll = self.cell_roll(hex);
        let mut threshold = 0.0;
        for ore in &self.config.ores {
            if depth >= ore.min_depth {
                threshold += ore.probability;
                if roll < threshold {
                    return ore.block;
                }
            }
        }

        self.config.deep
    }

    /// Uniform value in [0, 1) fixed by seed and hex
    fn cell_roll(&self, hex: HexCoord) -> f32 {
        let key = ((hex.q as u32 as u64) << 32) | hex.r as u32 as u64;
        let mut rng = Xoshiro256StarStar::seed_from_u64(self.seed ^ key.rotate_left(17));
        rng.gen_f32()
    }
}
