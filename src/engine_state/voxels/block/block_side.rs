//! # Block Side Module
//!
//! This module defines the six faces of a voxel and the geometry of each face.

/// Represents the six possible faces of a voxel.
///
/// The discriminant doubles as the index into per-face tables such as the atlas
/// indices in [`super::face_texture_indices`].
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum BlockSide {
    /// The bottom face (facing negative Y)
    BOTTOM = 0,

    /// The top face (facing positive Y)
    TOP = 1,

    /// The left face (facing negative X)
    LEFT = 2,

    /// The right face (facing positive X)
    RIGHT = 3,

    /// The front face (facing negative Z)
    FRONT = 4,

    /// The back face (facing positive Z)
    BACK = 5,
}

impl BlockSide {
    /// Returns an array containing all six faces in meshing order.
    ///
    /// The order is: [BOTTOM, TOP, LEFT, RIGHT, FRONT, BACK]
    pub fn all() -> [BlockSide; 6] {
        [
            BlockSide::BOTTOM,
            BlockSide::TOP,
            BlockSide::LEFT,
            BlockSide::RIGHT,
            BlockSide::FRONT,
            BlockSide::BACK,
        ]
    }

    /// Unit step from a voxel to the neighbour this face looks at, as `(dx, dy, dz)`.
    pub fn normal(self) -> (i32, i32, i32) {
        match self {
            BlockSide::BOTTOM => (0, -1, 0),
            BlockSide::TOP => (0, 1, 0),
            BlockSide::LEFT => (-1, 0, 0),
            BlockSide::RIGHT => (1, 0, 0),
            BlockSide::FRONT => (0, 0, -1),
            BlockSide::BACK => (0, 0, 1),
        }
    }

    /// Corners of this face on the unit cube with its minimum corner at `(x, y, z)`.
    ///
    /// Returned as `[bottom_left, bottom_right, top_right, top_left]` as seen from outside
    /// the cube, so walking them in order is counter-clockwise.
    pub fn corners(self, x: f32, y: f32, z: f32) -> [[f32; 3]; 4] {
        let (x1, y1, z1) = (x + 1.0, y + 1.0, z + 1.0);
        match self {
            BlockSide::BOTTOM => [[x, y, z], [x1, y, z], [x1, y, z1], [x, y, z1]],
            BlockSide::TOP => [[x, y1, z1], [x1, y1, z1], [x1, y1, z], [x, y1, z]],
            BlockSide::LEFT => [[x, y, z], [x, y, z1], [x, y1, z1], [x, y1, z]],
            BlockSide::RIGHT => [[x1, y, z1], [x1, y, z], [x1, y1, z], [x1, y1, z1]],
            BlockSide::FRONT => [[x1, y, z], [x, y, z], [x, y1, z], [x1, y1, z]],
            BlockSide::BACK => [[x, y, z1], [x1, y, z1], [x1, y1, z1], [x, y1, z1]],
        }
    }
}
