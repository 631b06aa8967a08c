//! # Voxel Grid Module
//!
//! Dense per-chunk voxel storage.
//!
//! ## Memory Layout
//!
//! Voxels are stored in one flat vector addressed by `x + z * width + y * width * depth`,
//! so a horizontal layer is contiguous and walking `x` innermost stays in cache. Next to it
//! a bit vector mirrors which cells are solid: the mesher asks "is this neighbour air?" far
//! more often than it asks for a material, and one bit per cell answers that without
//! touching the voxel array.

use bitvec::prelude::BitVec;

use crate::engine_state::voxels::block::{block_type::VoxelType, Voxel};

use super::ChunkDimensions;

/// A fixed-size 3D array of voxels owned by exactly one chunk.
///
/// The size is decided at construction and never changes.
#[derive(Clone, Debug)]
pub struct VoxelGrid {
    dimensions: ChunkDimensions,
    voxels: Vec<Voxel>,
    /// One bit per voxel, set when the voxel is not air. Same indexing as `voxels`.
    solid_array: BitVec,
}

impl VoxelGrid {
    /// Creates a grid of the given size filled with air.
    pub fn new(dimensions: ChunkDimensions) -> Self {
        let volume = dimensions.volume();
        VoxelGrid {
            dimensions,
            voxels: vec![Voxel::default(); volume],
            solid_array: BitVec::repeat(false, volume),
        }
    }

    /// Creates a grid where every voxel has the same material.
    pub fn filled(dimensions: ChunkDimensions, voxel_type: VoxelType) -> Self {
        let volume = dimensions.volume();
        VoxelGrid {
            dimensions,
            voxels: vec![Voxel::new(voxel_type); volume],
            solid_array: BitVec::repeat(voxel_type.is_solid(), volume),
        }
    }

    /// The size this grid was created with.
    #[inline]
    pub fn dimensions(&self) -> ChunkDimensions {
        self.dimensions
    }

    /// Flat index of a local coordinate. The coordinate must be inside the grid.
    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        let width = self.dimensions.width as usize;
        let depth = self.dimensions.depth as usize;
        x + z * width + y * width * depth
    }

    /// Returns `true` if the signed local coordinate lies inside the grid.
    #[inline]
    pub fn contains(&self, x: i32, y: i32, z: i32) -> bool {
        x >= 0
            && y >= 0
            && z >= 0
            && (x as u32) < self.dimensions.width
            && (y as u32) < self.dimensions.height
            && (z as u32) < self.dimensions.depth
    }

    /// Returns the voxel at a local coordinate.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate is outside the grid.
    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> Voxel {
        self.voxels[self.index(x, y, z)]
    }

    /// Returns the material at a local coordinate.
    #[inline]
    pub fn voxel_type(&self, x: usize, y: usize, z: usize) -> VoxelType {
        self.get(x, y, z).voxel_type
    }

    /// Returns `true` if the voxel at a local coordinate is air.
    #[inline]
    pub fn is_air(&self, x: usize, y: usize, z: usize) -> bool {
        !self.solid_array[self.index(x, y, z)]
    }

    /// Overwrites the voxel at a local coordinate, keeping the solid mask in step.
    pub fn set(&mut self, x: usize, y: usize, z: usize, voxel_type: VoxelType) {
        let index = self.index(x, y, z);
        self.voxels[index] = Voxel::new(voxel_type);
        self.solid_array.set(index, voxel_type.is_solid());
    }

    /// Number of voxels that are not air.
    pub fn solid_count(&self) -> usize {
        self.solid_array.count_ones()
    }
}
