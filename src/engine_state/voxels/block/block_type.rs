//! # Voxel Type Module
//!
//! This module defines the materials a voxel can be made of.

/// Enumerates all possible voxel materials in the terrain.
///
/// `AIR` is the only empty material: every emptiness test in generation and meshing
/// compares against it, and water is meshed like any other solid.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum VoxelType {
    /// Empty space. Never meshed.
    #[default]
    AIR = 0,

    /// Subsurface layer, also the surface of drowned columns.
    DIRT = 1,

    /// The top voxel of a column that reaches above the water line.
    GRASS = 2,

    /// Everything deeper than five voxels below the surface.
    STONE = 3,

    /// Fills drowned columns from their surface up to the water level.
    WATER = 4,

    /// Tree trunks.
    WOOD = 5,

    /// Tree crowns.
    LEAVES = 6,
}

impl VoxelType {
    /// Returns `true` for every material except `AIR`.
    #[inline]
    pub fn is_solid(self) -> bool {
        self != VoxelType::AIR
    }

    /// The compact id used as the key of the atlas lookup table.
    #[inline]
    pub fn id(self) -> u8 {
        self as u8
    }
}
