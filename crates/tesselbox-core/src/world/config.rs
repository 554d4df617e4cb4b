//! World configuration loaded from RON

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::worldgen_config::TerrainConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] ron::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level world settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Generation key for terrain and the world RNG
    pub seed: u64,
    /// Hex circumradius in pixels
    pub hex_size: f32,
    /// Cells per chunk side
    pub chunk_size: i32,
    /// Chunks further than this (in chunk units) are evicted each tick
    pub unload_distance: f32,
    /// Upper bound on resident chunks, oldest access evicted first
    pub loaded_chunk_limit: Option<usize>,
    /// Chunk radius generated around a point by `preload_around`
    pub preload_radius: i32,
    pub terrain: TerrainConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            hex_size: 30.0,
            chunk_size: 32,
            unload_distance: 10.0,
            loaded_chunk_limit: Some(50),
            preload_radius: 4,
            terrain: TerrainConfig::default(),
        }
    }
}

impl WorldConfig {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }

    pub fn from_ron_str(s: &str) -> Result<Self, ConfigError> {
        let config: WorldConfig = ron::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(self, Default::default())?)
    }

    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_ron_str(&contents)?;
        log::info!("Loaded world config from {:?} (seed {})", path, config.seed);
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_ron_string()?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.hex_size.is_finite() || self.hex_size <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "hex_size must be positive, got {}",
                self.hex_size
            )));
        }
        if self.chunk_size <= 0 {
            return Err(ConfigError::Invalid(format!(
                "chunk_size must be positive, got {}",
                self.chunk_size
            )));
        }
        if self.unload_distance.is_nan() || self.unload_distance < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "unload_distance must be >= 0, got {}",
                self.unload_distance
            )));
        }
        if self.preload_radius < 0 {
            return Err(ConfigError::Invalid(format!(
                "preload_radius must be >= 0, got {}",
                self.preload_radius
            )));
        }
        self.terrain.validate()
    }
}
