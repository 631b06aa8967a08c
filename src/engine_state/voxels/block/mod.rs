//! # Block Module
//!
//! Voxel materials, voxel faces and the atlas cells each (material, face) pair is drawn with.

use block_side::BlockSide;
use block_type::VoxelType;
use phf::phf_map;

pub mod block_side;
pub mod block_type;

/// Atlas cell indices per material id, in `BlockSide` order:
/// [BOTTOM, TOP, LEFT, RIGHT, FRONT, BACK]
static FACE_TEXTURE_INDICES: phf::Map<u8, [u32; 6]> = phf_map! {
    1u8 => [2, 2, 2, 2, 2, 2],          // DIRT
    2u8 => [2, 0, 3, 3, 3, 3],          // GRASS
    3u8 => [1, 1, 1, 1, 1, 1],          // STONE
    4u8 => [205, 205, 205, 205, 205, 205], // WATER
    5u8 => [21, 21, 20, 20, 20, 20],    // WOOD
    6u8 => [52, 52, 52, 52, 52, 52],    // LEAVES
};

/// Returns the atlas cell a face of the given material is drawn with.
///
/// `AIR` has no entry and is never meshed; asking for it yields cell 0.
pub fn face_texture_indices(voxel_type: VoxelType, side: BlockSide) -> u32 {
    FACE_TEXTURE_INDICES
        .get(&voxel_type.id())
        .map(|indices| indices[side as usize])
        .unwrap_or(0)
}

/// A single cubic cell of the terrain.
///
/// Position is implicit in the voxel's index inside its grid, so the material is all
/// that is stored.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Voxel {
    /// The material of this voxel.
    pub voxel_type: VoxelType,
}

impl Voxel {
    /// Creates a new voxel of the specified type.
    pub fn new(voxel_type: VoxelType) -> Self {
        Voxel { voxel_type }
    }

    /// Returns `true` if this voxel is empty space.
    #[inline]
    pub fn is_air(&self) -> bool {
        self.voxel_type == VoxelType::AIR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grass_faces_differ_by_side() {
        assert_eq!(face_texture_indices(VoxelType::GRASS, BlockSide::TOP), 0);
        assert_eq!(face_texture_indices(VoxelType::GRASS, BlockSide::BOTTOM), 2);
        assert_eq!(face_texture_indices(VoxelType::GRASS, BlockSide::RIGHT), 3);
        assert_eq!(face_texture_indices(VoxelType::STONE, BlockSide::FRONT), 1);
    }

    #[test]
    fn test_default_voxel_is_air() {
        assert!(Voxel::default().is_air());
        assert!(!Voxel::new(VoxelType::WATER).is_air());
    }
}
