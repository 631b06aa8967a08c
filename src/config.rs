//! # Configuration
//!
//! Engine settings loaded once at startup from a JSON file. Every section falls back to
//! its defaults, so a partial file (or none at all) is fine.
//!
//! ```json
//! {
//!     "world": { "seed": 7, "view_distance": 4 },
//!     "render": { "gpu_buffer_bytes": 268435456 }
//! }
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::{
    engine_state::voxels::chunk::ChunkDimensions,
    error::{EngineError, EngineResult},
};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// World layout and streaming.
    pub world: WorldConfig,
    /// Terrain shape.
    pub terrain: TerrainConfig,
    /// GPU buffer, atlas and camera settings.
    pub render: RenderConfig,
}

/// World layout and streaming settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Seed shared by every chunk's noise sampling.
    pub seed: u32,
    /// Radius, in chunks, of the meshed/visible window around the observer.
    pub view_distance: u32,
    /// Size of every chunk in voxels.
    pub chunk: ChunkDimensions,
    /// Evict least-recently-streamed chunks once more than this many are resident.
    /// `None` keeps every chunk ever generated.
    pub max_resident_chunks: Option<usize>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            seed: 42,
            view_distance: 1,
            chunk: ChunkDimensions::default(),
            max_resident_chunks: None,
        }
    }
}

/// Terrain shape settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Multiplier applied to world coordinates before sampling noise.
    pub frequency: f64,
    /// Number of noise octaves summed per sample.
    pub octaves: u32,
    /// Amplitude falloff between octaves.
    pub persistence: f64,
    /// Columns whose surface is below this height are drowned with water.
    pub water_level: u32,
    /// `(noise value, column height)` control points, first at -1 and last at +1.
    pub height_curve: Vec<(f32, f32)>,
    /// Chance that a grass column grows a tree.
    pub tree_probability: f64,
    /// Wood voxels stacked above a tree anchor.
    pub trunk_height: u32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        TerrainConfig {
            frequency: 0.01,
            octaves: 4,
            persistence: 0.5,
            water_level: 62,
            height_curve: vec![
                (-1.0, 40.0),
                (-0.5, 55.0),
                (0.0, 64.0),
                (0.3, 72.0),
                (0.6, 100.0),
                (1.0, 140.0),
            ],
            tree_probability: 0.01,
            trunk_height: 5,
        }
    }
}

/// GPU buffer, atlas and camera settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Cells per side of the texture atlas.
    pub atlas_rows: u32,
    /// Size of the shared vertex buffer. Exceeding it is fatal.
    pub gpu_buffer_bytes: u64,
    /// Background threads building chunk meshes.
    pub mesh_workers: usize,
    /// Vertical field of view.
    pub fov_degrees: f32,
    /// Near clipping distance.
    pub znear: f32,
    /// Far clipping distance.
    pub zfar: f32,
    /// Viewport width in pixels, used for the aspect ratio.
    pub viewport_width: u32,
    /// Viewport height in pixels.
    pub viewport_height: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            atlas_rows: 16,
            gpu_buffer_bytes: 1024 * 1024 * 400,
            mesh_workers: 1,
            fov_degrees: 45.0,
            znear: 0.1,
            zfar: 1000.0,
            viewport_width: 1400,
            viewport_height: 1000,
        }
    }
}

impl EngineConfig {
    /// Reads and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    /// Parses and validates configuration from a JSON string.
    pub fn from_json(contents: &str) -> EngineResult<Self> {
        let config: EngineConfig = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the engine cannot run with.
    pub fn validate(&self) -> EngineResult<()> {
        let chunk = &self.world.chunk;
        if chunk.width == 0 || chunk.depth == 0 || chunk.height == 0 {
            return Err(EngineError::InvalidConfig(format!(
                "chunk dimensions must be non-zero, got {chunk:?}"
            )));
        }
        if self.terrain.height_curve.len() < 2 {
            return Err(EngineError::InvalidConfig(
                "height curve needs at least two control points".to_string(),
            ));
        }
        if self.terrain.octaves == 0 {
            return Err(EngineError::InvalidConfig("octaves must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.terrain.tree_probability) {
            return Err(EngineError::InvalidConfig(format!(
                "tree probability {} is not between 0 and 1",
                self.terrain.tree_probability
            )));
        }
        if self.terrain.trunk_height == 0 {
            return Err(EngineError::InvalidConfig("trunk height must be at least 1".to_string()));
        }
        if self.render.atlas_rows == 0 {
            return Err(EngineError::InvalidConfig("atlas rows must be non-zero".to_string()));
        }
        if self.render.mesh_workers == 0 {
            return Err(EngineError::InvalidConfig(
                "at least one mesh worker is required".to_string(),
            ));
        }
        let render = &self.render;
        if render.viewport_width == 0 || render.viewport_height == 0 {
            return Err(EngineError::InvalidConfig(format!(
                "viewport must be non-zero, got {}x{}",
                render.viewport_width, render.viewport_height
            )));
        }
        if !render.fov_degrees.is_finite() || render.fov_degrees <= 0.0 || render.fov_degrees >= 180.0 {
            return Err(EngineError::InvalidConfig(format!(
                "field of view {} is not between 0 and 180 degrees",
                render.fov_degrees
            )));
        }
        if !render.znear.is_finite()
            || !render.zfar.is_finite()
            || render.znear <= 0.0
            || render.zfar <= render.znear
        {
            return Err(EngineError::InvalidConfig(format!(
                "projection needs 0 < znear < zfar, got znear {} and zfar {}",
                render.znear, render.zfar
            )));
        }
        Ok(())
    }
}
