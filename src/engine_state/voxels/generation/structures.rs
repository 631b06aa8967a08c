//! # Structures Module
//!
//! Features placed on top of generated terrain. Generation only records where a structure
//! goes; the voxels are written later by [`Structure::apply`], before the chunk is meshed.

use crate::engine_state::voxels::{block::block_type::VoxelType, chunk::VoxelGrid};

/// A structure anchored at a local voxel coordinate of one chunk.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Structure {
    /// A tree whose trunk starts at the anchor, the first air voxel above a grass column.
    Tree {
        /// Local x of the trunk.
        x: u32,
        /// First trunk voxel.
        y: u32,
        /// Local z of the trunk.
        z: u32,
    },
}

impl Structure {
    /// Writes the structure into `grid`. Voxels that would fall outside the grid are
    /// skipped and only air is ever overwritten by leaves.
    pub fn apply(&self, grid: &mut VoxelGrid, trunk_height: u32) {
        match *self {
            Structure::Tree { x, y, z } => {
                place_tree(grid, x as i32, y as i32, z as i32, trunk_height as i32)
            }
        }
    }
}

fn place_tree(grid: &mut VoxelGrid, x: i32, y: i32, z: i32, trunk_height: i32) {
    let top = y + trunk_height - 1;
    for trunk_y in y..=top {
        set_if(grid, x, trunk_y, z, VoxelType::WOOD, true);
    }

    // 3x3 crown on the two highest trunk voxels, plus one leaf on top
    for crown_y in (top - 1)..=top {
        for dz in -1..=1 {
            for dx in -1..=1 {
                set_if(grid, x + dx, crown_y, z + dz, VoxelType::LEAVES, false);
            }
        }
    }
    set_if(grid, x, top + 1, z, VoxelType::LEAVES, false);
}

fn set_if(grid: &mut VoxelGrid, x: i32, y: i32, z: i32, voxel_type: VoxelType, overwrite: bool) {
    if !grid.contains(x, y, z) {
        return;
    }
    let (x, y, z) = (x as usize, y as usize, z as usize);
    if overwrite || grid.is_air(x, y, z) {
        grid.set(x, y, z, voxel_type);
    }
}
