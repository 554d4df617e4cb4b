//! Terrain generation parameters
//!
//! Serializable with RON so terrain can be tuned without recompiling.

use serde::{Deserialize, Serialize};
use tesselbox_blocks::BlockType;

use super::config::ConfigError;

/// Fractal noise layer used for the simplex height field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseLayerConfig {
    /// Added to the world seed so layers stay independent
    pub seed_offset: i32,
    pub frequency: f32,
    pub octaves: u32,
    pub lacunarity: f32,
    pub gain: f32,
    /// Peak height offset in pixels
    pub amplitude: f32,
}

impl Default for NoiseLayerConfig {
    fn default() -> Self {
        Self {
            seed_offset: 2,
            frequency: 0.004,
            octaves: 4,
            lacunarity: 2.0,
            gain: 0.5,
            amplitude: 120.0,
        }
    }
}

impl NoiseLayerConfig {
    /// Create a FastNoiseLite instance from this config
    pub fn to_fastnoise(&self, base_seed: u64) -> fastnoise_lite::FastNoiseLite {
        let mut noise = fastnoise_lite::FastNoiseLite::with_seed(
            (base_seed as i32).wrapping_add(self.seed_offset),
        );
        noise.set_noise_type(Some(fastnoise_lite::NoiseType::OpenSimplex2));
        noise.set_frequency(Some(self.frequency));
        noise.set_fractal_type(Some(fastnoise_lite::FractalType::FBm));
        noise.set_fractal_octaves(Some(self.octaves as i32));
        noise.set_fractal_lacunarity(Some(self.lacunarity));
        noise.set_fractal_gain(Some(self.gain));
        noise
    }
}

/// Shape of the surface height offset `h(x, y)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HeightFieldConfig {
    /// Surface sits exactly at `surface_y`
    Flat,
    /// `sin(x·f + φx) · cos(y·f + φy) · amplitude`, phases derived from the seed
    Trigonometric { frequency: f32, amplitude: f32 },
    /// OpenSimplex2 FBm noise
    Simplex(NoiseLayerConfig),
}

impl HeightFieldConfig {
    /// Largest absolute offset the field can produce
    pub fn amplitude(&self) -> f32 {
        match self {
            HeightFieldConfig::Flat => 0.0,
            HeightFieldConfig::Trigonometric { amplitude, .. } => amplitude.abs(),
            HeightFieldConfig::Simplex(layer) => layer.amplitude.abs(),
        }
    }
}

impl Default for HeightFieldConfig {
    fn default() -> Self {
        HeightFieldConfig::Trigonometric {
            frequency: 0.01,
            amplitude: 50.0,
        }
    }
}

/// Ore vein placed inside the deep layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OreConfig {
    pub block: BlockType,
    /// Minimum distance below the local surface, in pixels
    pub min_depth: f32,
    /// Chance per eligible cell (0.0 - 1.0)
    pub probability: f32,
}

/// Surface materials and relief for the columns where it is selected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomeConfig {
    pub name: String,

    // Selection thresholds (temperature/moisture ranges)
    pub temp_min: f32,
    pub temp_max: f32,
    pub moisture_min: f32,
    pub moisture_max: f32,
    /// Selection priority (higher = checked first)
    pub priority: i32,

    pub topsoil: BlockType,
    pub subsoil: BlockType,
    /// Multiplier on the height field offset
    pub height_scale: f32,
}

impl BiomeConfig {
    pub fn contains(&self, temperature: f32, moisture: f32) -> bool {
        (self.temp_min..=self.temp_max).contains(&temperature)
            && (self.moisture_min..=self.moisture_max).contains(&moisture)
    }
}

/// Biome selection noise and definitions
///
/// Both noise fields are sampled along x only, so a biome covers whole columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomeParams {
    pub temperature_noise: NoiseLayerConfig,
    pub moisture_noise: NoiseLayerConfig,
    pub biomes: Vec<BiomeConfig>,
}

impl Default for BiomeParams {
    fn default() -> Self {
        let selector = |seed_offset| NoiseLayerConfig {
            seed_offset,
            frequency: 0.001,
            octaves: 2,
            lacunarity: 2.0,
            gain: 0.5,
            amplitude: 1.0,
        };

        Self {
            temperature_noise: selector(3),
            moisture_noise: selector(4),
            biomes: default_biome_configs(),
        }
    }
}

fn biome(
    name: &str,
    temp: (f32, f32),
    moisture: (f32, f32),
    priority: i32,
    topsoil: BlockType,
    subsoil: BlockType,
    height_scale: f32,
) -> BiomeConfig {
    BiomeConfig {
        name: name.to_string(),
        temp_min: temp.0,
        temp_max: temp.1,
        moisture_min: moisture.0,
        moisture_max: moisture.1,
        priority,
        topsoil,
        subsoil,
        height_scale,
    }
}

fn default_biome_configs() -> Vec<BiomeConfig> {
    use BlockType::{Dirt, Grass, Sand, Stone};

    vec![
        biome("Mountains", (0.5, 2.0), (-2.0, 2.0), 100, Stone, Stone, 2.4),
        biome("Desert", (0.0, 0.5), (-2.0, -0.2), 50, Sand, Sand, 0.2),
        biome("Forest", (-2.0, 0.5), (0.3, 2.0), 40, Grass, Dirt, 1.0),
        // Catch-all, wider than the noise range
        biome("Plains", (-2.0, 2.0), (-2.0, 2.0), 0, Grass, Dirt, 0.6),
    ]
}

/// Terrain layering and materials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Pixel y of the subsoil/deep boundary before the height offset
    pub surface_y: f32,
    /// Thickness of the subsoil band above `surface_y`
    pub subsoil_depth: f32,
    /// Thickness of the topsoil band. Anything higher is open air.
    /// `None` extends topsoil upward without limit.
    pub topsoil_depth: Option<f32>,
    pub height_field: HeightFieldConfig,

    pub topsoil: BlockType,
    pub subsoil: BlockType,
    pub deep: BlockType,

    /// Per-column overrides of topsoil, subsoil and relief.
    /// Columns matching no biome use the base materials.
    pub biomes: Option<BiomeParams>,

    /// Tried in order against a single draw per cell
    pub ores: Vec<OreConfig>,
    /// Cells at or below this y become bedrock
    pub bedrock_y: Option<f32>,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            surface_y: 300.0,
            subsoil_depth: 20.0,
            topsoil_depth: Some(90.0),
            height_field: HeightFieldConfig::default(),
            topsoil: BlockType::Grass,
            subsoil: BlockType::Dirt,
            deep: BlockType::Stone,
            biomes: Some(BiomeParams::default()),
            ores: vec![
                OreConfig {
                    block: BlockType::DiamondOre,
                    min_depth: 1200.0,
                    probability: 0.02,
                },
                OreConfig {
                    block: BlockType::GoldOre,
                    min_depth: 1200.0,
                    probability: 0.025,
                },
                OreConfig {
                    block: BlockType::IronOre,
                    min_depth: 600.0,
                    probability: 0.04,
                },
                OreConfig {
                    block: BlockType::CoalOre,
                    min_depth: 225.0,
                    probability: 0.07,
                },
            ],
            bedrock_y: Some(6000.0),
        }
    }
}

impl TerrainConfig {
    /// Level terrain with no ores, handy for tests and creative worlds
    pub fn flat() -> Self {
        Self {
            height_field: HeightFieldConfig::Flat,
            biomes: None,
            ores: Vec::new(),
            bedrock_y: None,
            ..Default::default()
        }
    }

    /// Rolling simplex hills
    pub fn hilly() -> Self {
        Self {
            height_field: HeightFieldConfig::Simplex(NoiseLayerConfig::default()),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.surface_y.is_finite() {
            return Err(ConfigError::Invalid("terrain.surface_y must be finite".into()));
        }
        if self.subsoil_depth.is_nan() || self.subsoil_depth < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "terrain.subsoil_depth must be >= 0, got {}",
                self.subsoil_depth
            )));
        }
        if let Some(depth) = self.topsoil_depth
            && (depth.is_nan() || depth < 0.0)
        {
            return Err(ConfigError::Invalid(format!(
                "terrain.topsoil_depth must be >= 0, got {depth}"
            )));
        }
        if let Some(params) = &self.biomes {
            for biome in &params.biomes {
                if !biome.height_scale.is_finite() || biome.height_scale < 0.0 {
                    return Err(ConfigError::Invalid(format!(
                        "biome {} height_scale must be >= 0, got {}",
                        biome.name, biome.height_scale
                    )));
                }
                if biome.temp_min > biome.temp_max || biome.moisture_min > biome.moisture_max {
                    return Err(ConfigError::Invalid(format!(
                        "biome {} has an empty selection range",
                        biome.name
                    )));
                }
            }
        }
        for ore in &self.ores {
            if !(0.0..=1.0).contains(&ore.probability) {
                return Err(ConfigError::Invalid(format!(
                    "ore {} probability {} outside [0, 1]",
                    ore.block, ore.probability
                )));
            }
        }
        let total: f32 = self.ores.iter().map(|ore| ore.probability).sum();
        if total > 1.0 {
            log::warn!("Ore probabilities sum to {total:.3}, later entries will be shadowed");
        }
        Ok(())
    }
}
