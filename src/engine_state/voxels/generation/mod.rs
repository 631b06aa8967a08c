//! # Terrain Generation Module
//!
//! Fills chunk voxel grids from a 2D height field.
//!
//! ## Architecture
//!
//! * **Noise**: a seeded [`NoiseSource`] shared by every chunk of a world
//! * **Height Curve**: maps a noise sample to a column height
//! * **Classification**: picks each voxel's material from its depth below the column top
//! * **Structures**: grass columns may record a tree anchor, applied after generation
//!
//! ## Determinism
//!
//! Generation is a pure function of the world seed, the configuration and the chunk
//! position. Tree placement draws from a `fastrand::Rng` seeded from the world seed and the
//! chunk position, so regenerating a chunk reproduces it exactly.

use log::debug;

use crate::config::TerrainConfig;
use crate::error::EngineResult;

use super::block::block_type::VoxelType;
use super::chunk::{ChunkDimensions, ChunkPos, VoxelGrid};

pub use height_curve::{ControlPoint, HeightCurve};
pub use noise_source::{NoiseSource, PerlinNoiseSource};
pub use structures::Structure;

pub mod height_curve;
pub mod noise_source;
pub mod structures;

/// Voxels below the surface that are still dirt; anything deeper is stone.
const DIRT_DEPTH: u32 = 5;

/// Horizontal reach of a tree crown around its trunk.
const CROWN_RADIUS: u32 = 1;

/// Picks the material of the voxel at height `y` in a column whose top is `height`.
///
/// * `y >= height`: water while below `water_level`, otherwise air
/// * `y < height - 5`: stone
/// * `y == height - 1`: grass when the column reaches above `water_level`, dirt when drowned
/// * anything else: dirt
pub fn classify(y: u32, height: u32, water_level: u32) -> VoxelType {
    if y >= height {
        return if y < water_level {
            VoxelType::WATER
        } else {
            VoxelType::AIR
        };
    }
    if y + DIRT_DEPTH < height {
        VoxelType::STONE
    } else if y + 1 == height && height > water_level {
        VoxelType::GRASS
    } else {
        VoxelType::DIRT
    }
}

/// Generates the voxel grids of a world.
pub struct TerrainGenerator {
    noise: Box<dyn NoiseSource>,
    curve: HeightCurve,
    config: TerrainConfig,
    seed: u32,
}

impl TerrainGenerator {
    /// Creates a generator sampling Perlin noise for `seed`.
    pub fn new(seed: u32, config: TerrainConfig) -> EngineResult<Self> {
        Self::with_noise(seed, config, Box::new(PerlinNoiseSource::new(seed)))
    }

    /// Creates a generator sampling an arbitrary noise source.
    ///
    /// # Errors
    /// Fails if the configured height curve is malformed.
    pub fn with_noise(
        seed: u32,
        config: TerrainConfig,
        noise: Box<dyn NoiseSource>,
    ) -> EngineResult<Self> {
        let curve = HeightCurve::from_points(&config.height_curve)?;
        Ok(TerrainGenerator {
            noise,
            curve,
            config,
            seed,
        })
    }

    /// The terrain settings this generator was built with.
    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// Column height at a world-space `(x, z)`, clamped to the chunk height.
    pub fn column_height(&self, world_x: i32, world_z: i32, max_height: u32) -> EngineResult<u32> {
        let frequency = self.config.frequency;
        let sample = self.noise.sample(
            world_x as f64 * frequency,
            world_z as f64 * frequency,
            self.config.octaves,
            self.config.persistence,
        );
        let height = self.curve.interpolate(sample as f32)?;
        Ok((height.max(0.0) as u32).min(max_height))
    }

    /// Generates the voxels of the chunk at `position`.
    ///
    /// # Returns
    /// The populated grid and the structure anchors recorded for it.
    pub fn generate(
        &self,
        position: ChunkPos,
        dimensions: ChunkDimensions,
    ) -> EngineResult<(VoxelGrid, Vec<Structure>)> {
        let mut grid = VoxelGrid::new(dimensions);
        let mut structures = Vec::new();
        let mut rng = fastrand::Rng::with_seed(structure_seed(self.seed, position));
        let (origin_x, origin_z) = position.origin(dimensions);
        let water_level = self.config.water_level;

        for z in 0..dimensions.depth {
            for x in 0..dimensions.width {
                let height =
                    self.column_height(origin_x + x as i32, origin_z + z as i32, dimensions.height)?;
                let top = height.max(water_level).min(dimensions.height);
                for y in 0..top {
                    let voxel_type = classify(y, height, water_level);
                    if voxel_type.is_solid() {
                        grid.set(x as usize, y as usize, z as usize, voxel_type);
                    }
                }

                let grows_grass = height > water_level && height > 0;
                if grows_grass
                    && is_crown_inside(x, z, dimensions)
                    && height < dimensions.height
                    && rng.f64() < self.config.tree_probability
                {
                    structures.push(Structure::Tree { x, y: height, z });
                }
            }
        }

        debug!(
            "Generated chunk {:?}: {} solid voxels, {} structures",
            position,
            grid.solid_count(),
            structures.len()
        );
        Ok((grid, structures))
    }
}

/// Whether a tree crown around column `(x, z)` stays inside the chunk. Anchors on the outer
/// ring are skipped so no crown is cut at a chunk border.
fn is_crown_inside(x: u32, z: u32, dimensions: ChunkDimensions) -> bool {
    x >= CROWN_RADIUS
        && z >= CROWN_RADIUS
        && x + CROWN_RADIUS < dimensions.width
        && z + CROWN_RADIUS < dimensions.depth
}

/// Mixes the world seed and chunk position into a per-chunk rng seed.
fn structure_seed(seed: u32, position: ChunkPos) -> u64 {
    (seed as u64)
        ^ (position.x as i64 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (position.z as i64 as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Returns the same value everywhere.
    struct ConstantNoise(f64);

    impl NoiseSource for ConstantNoise {
        fn sample(&self, _x: f64, _z: f64, _octaves: u32, _persistence: f64) -> f64 {
            self.0
        }
    }

    fn config(water_level: u32, tree_probability: f64) -> TerrainConfig {
        TerrainConfig {
            water_level,
            tree_probability,
            height_curve: vec![(-1.0, 0.0), (1.0, 40.0)],
            ..TerrainConfig::default()
        }
    }

    const DIMS: ChunkDimensions = ChunkDimensions::new(4, 4, 64);

    #[test]
    fn test_classify_dry_column() {
        // column top at 30, water at 10
        assert_eq!(classify(29, 30, 10), VoxelType::GRASS);
        assert_eq!(classify(28, 30, 10), VoxelType::DIRT);
        assert_eq!(classify(25, 30, 10), VoxelType::DIRT);
        assert_eq!(classify(24, 30, 10), VoxelType::STONE);
        assert_eq!(classify(0, 30, 10), VoxelType::STONE);
        assert_eq!(classify(30, 30, 10), VoxelType::AIR);
    }

    #[test]
    fn test_classify_drowned_column() {
        // column top at 8, water at 12
        assert_eq!(classify(7, 8, 12), VoxelType::DIRT);
        assert_eq!(classify(8, 8, 12), VoxelType::WATER);
        assert_eq!(classify(11, 8, 12), VoxelType::WATER);
        assert_eq!(classify(12, 8, 12), VoxelType::AIR);
    }

    #[test]
    fn test_flat_noise_gives_flat_terrain() {
        // noise 0 maps to the middle of the curve: height 20
        let generator =
            TerrainGenerator::with_noise(1, config(10, 0.0), Box::new(ConstantNoise(0.0))).unwrap();
        let (grid, structures) = generator.generate(ChunkPos::new(3, -2), DIMS).unwrap();

        assert!(structures.is_empty());
        for z in 0..4 {
            for x in 0..4 {
                assert_eq!(grid.voxel_type(x, 19, z), VoxelType::GRASS);
                assert_eq!(grid.voxel_type(x, 18, z), VoxelType::DIRT);
                assert_eq!(grid.voxel_type(x, 14, z), VoxelType::STONE);
                assert!(grid.is_air(x, 20, z));
            }
        }
        assert_eq!(grid.solid_count(), 4 * 4 * 20);
    }

    #[test]
    fn test_low_terrain_is_flooded() {
        // noise -0.5 maps to height 10, water fills up to 15
        let generator =
            TerrainGenerator::with_noise(1, config(15, 1.0), Box::new(ConstantNoise(-0.5))).unwrap();
        let (grid, structures) = generator.generate(ChunkPos::new(0, 0), DIMS).unwrap();

        assert!(structures.is_empty(), "no trees grow under water");
        assert_eq!(grid.voxel_type(0, 9, 0), VoxelType::DIRT);
        assert_eq!(grid.voxel_type(0, 10, 0), VoxelType::WATER);
        assert_eq!(grid.voxel_type(0, 14, 0), VoxelType::WATER);
        assert!(grid.is_air(0, 15, 0));
    }

    #[test]
    fn test_trees_are_recorded_on_grass() {
        let generator =
            TerrainGenerator::with_noise(1, config(10, 1.0), Box::new(ConstantNoise(0.0))).unwrap();
        let (grid, structures) = generator.generate(ChunkPos::new(0, 0), DIMS).unwrap();

        // only the inner 2x2 columns of a 4x4 chunk can hold a whole crown
        assert_eq!(structures.len(), 4);
        for structure in &structures {
            let Structure::Tree { x, y, z } = *structure;
            assert!((1..=2).contains(&x) && (1..=2).contains(&z));
            assert_eq!(y, 20);
            assert_eq!(
                grid.voxel_type(x as usize, y as usize - 1, z as usize),
                VoxelType::GRASS
            );
        }
    }

    #[test]
    fn test_tree_crowns_are_never_clipped() {
        let generator =
            TerrainGenerator::with_noise(3, config(10, 1.0), Box::new(ConstantNoise(0.0))).unwrap();
        let dims = ChunkDimensions::new(8, 8, 64);
        let (mut grid, structures) = generator.generate(ChunkPos::new(-2, 5), dims).unwrap();
        assert_eq!(structures.len(), 36);

        let before = grid.solid_count();
        let Structure::Tree { x, y, z } = structures[0];
        structures[0].apply(&mut grid, 5);
        // 5 trunk + 2 * 8 crown + 1 top, nothing lost at the border
        assert_eq!(grid.solid_count() - before, 22);
        assert_eq!((x, z), (1, 1));
        assert_eq!(grid.voxel_type(0, y as usize + 3, 0), VoxelType::LEAVES);
    }

    #[test]
    fn test_too_narrow_chunk_grows_no_trees() {
        let generator =
            TerrainGenerator::with_noise(3, config(10, 1.0), Box::new(ConstantNoise(0.0))).unwrap();
        let (_, structures) =
            generator.generate(ChunkPos::new(0, 0), ChunkDimensions::new(2, 8, 64)).unwrap();
        assert!(structures.is_empty());
    }

    #[test]
    fn test_generation_is_deterministic() {
        let generator = TerrainGenerator::new(42, TerrainConfig::default()).unwrap();
        let dims = ChunkDimensions::new(16, 16, 256);
        let (a, trees_a) = generator.generate(ChunkPos::new(-1, 2), dims).unwrap();
        let (b, trees_b) = generator.generate(ChunkPos::new(-1, 2), dims).unwrap();
        assert_eq!(a.solid_count(), b.solid_count());
        assert_eq!(trees_a, trees_b);
    }

    #[test]
    fn test_rejects_malformed_curve() {
        let config = TerrainConfig {
            height_curve: vec![(-0.9, 0.0), (1.0, 10.0)],
            ..TerrainConfig::default()
        };
        assert!(TerrainGenerator::new(0, config).is_err());
    }
}
