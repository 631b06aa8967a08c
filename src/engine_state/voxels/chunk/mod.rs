//! # Chunk Module
//!
//! This module provides the `Chunk` struct and the small value types used to locate chunks:
//! `ChunkPos` (chunk-grid coordinate), `ChunkDimensions` (size in voxels) and `BoundingBox`
//! (world-space extent used for frustum culling).
//!
//! ## Lifecycle
//!
//! A chunk moves through `VoxelsGenerated -> MeshRequested -> MeshBuilt`, tracked by two
//! flags. The voxel grid is written only while the chunk is being created (terrain and
//! structures); after that it is read-only and may be read by mesh workers while the
//! streaming thread keeps going.
//!
//! ## Coordinates
//!
//! World x and z grow with local x and z: the voxel at local `(x, y, z)` of the chunk at
//! `ChunkPos { x: cx, z: cz }` occupies the unit cube whose minimum corner is
//! `(cx * width + x, y, cz * depth + z)`.

use std::sync::Arc;

use cgmath::Point3;
use serde::Deserialize;

use crate::engine_state::rendering::{
    meshing::{build_chunk_mesh, ChunkMesh, NeighborGrids},
    texture::TextureAtlas,
};
use crate::engine_state::voxels::generation::structures::Structure;

pub use voxel_grid::VoxelGrid;

mod voxel_grid;

/// Size of a chunk in voxels.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChunkDimensions {
    /// Extent along x.
    pub width: u32,
    /// Extent along z.
    pub depth: u32,
    /// Extent along y. Chunks are columns, so this covers the whole world height.
    pub height: u32,
}

impl Default for ChunkDimensions {
    fn default() -> Self {
        ChunkDimensions {
            width: 16,
            depth: 16,
            height: 256,
        }
    }
}

impl ChunkDimensions {
    /// Creates chunk dimensions from width (x), depth (z) and height (y).
    pub const fn new(width: u32, depth: u32, height: u32) -> Self {
        ChunkDimensions {
            width,
            depth,
            height,
        }
    }

    /// Number of voxels in one chunk.
    #[inline]
    pub fn volume(&self) -> usize {
        self.width as usize * self.depth as usize * self.height as usize
    }
}

/// Position of a chunk in chunk-grid units.
///
/// The derived `Hash` feeds both fields through the hasher in order, so `(a, b)` and `(b, a)`
/// hash differently.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPos {
    /// Chunk index along world x.
    pub x: i32,
    /// Chunk index along world z.
    pub z: i32,
}

impl ChunkPos {
    /// Creates a chunk position.
    pub const fn new(x: i32, z: i32) -> Self {
        ChunkPos { x, z }
    }

    /// Returns the chunk containing a world-space position.
    ///
    /// Uses floor division on both axes, so every world position belongs to exactly one
    /// chunk and `-0.5` lands in chunk `-1`, not `0`.
    pub fn from_world(position: Point3<f32>, dimensions: ChunkDimensions) -> Self {
        ChunkPos {
            x: (position.x / dimensions.width as f32).floor() as i32,
            z: (position.z / dimensions.depth as f32).floor() as i32,
        }
    }

    /// Returns the position `dx` chunks along x and `dz` chunks along z from this one.
    #[inline]
    pub fn offset(&self, dx: i32, dz: i32) -> Self {
        ChunkPos {
            x: self.x + dx,
            z: self.z + dz,
        }
    }

    /// World x and z of the chunk's minimum corner.
    #[inline]
    pub fn origin(&self, dimensions: ChunkDimensions) -> (i32, i32) {
        (
            self.x * dimensions.width as i32,
            self.z * dimensions.depth as i32,
        )
    }

    /// Chebyshev distance in chunks, the metric the streaming windows are square in.
    #[inline]
    pub fn ring_distance(&self, other: ChunkPos) -> i32 {
        (self.x - other.x).abs().max((self.z - other.z).abs())
    }
}

/// An axis-aligned box in world space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner.
    pub min: Point3<f32>,
    /// Maximum corner.
    pub max: Point3<f32>,
}

impl BoundingBox {
    /// Creates a box from its two corners.
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        BoundingBox { min, max }
    }

    /// The world-space extent of the chunk at `position`.
    pub fn for_chunk(position: ChunkPos, dimensions: ChunkDimensions) -> Self {
        let (x, z) = position.origin(dimensions);
        let min = Point3::new(x as f32, 0.0, z as f32);
        let max = Point3::new(
            min.x + dimensions.width as f32,
            dimensions.height as f32,
            min.z + dimensions.depth as f32,
        );
        BoundingBox { min, max }
    }

    /// All eight corners of the box.
    pub fn corners(&self) -> [Point3<f32>; 8] {
        let (a, b) = (self.min, self.max);
        [
            Point3::new(a.x, a.y, a.z),
            Point3::new(b.x, a.y, a.z),
            Point3::new(a.x, b.y, a.z),
            Point3::new(b.x, b.y, a.z),
            Point3::new(a.x, a.y, b.z),
            Point3::new(b.x, a.y, b.z),
            Point3::new(a.x, b.y, b.z),
            Point3::new(b.x, b.y, b.z),
        ]
    }
}

/// A fixed-size column of voxels, the unit of generation, meshing and streaming.
///
/// Neighbours are never stored on the chunk. Whoever builds the mesh resolves them by
/// `ChunkPos` in the world map and passes their grids in through [`NeighborGrids`].
pub struct Chunk {
    /// The position of this chunk in chunk coordinates (not voxel coordinates).
    pub position: ChunkPos,

    /// Unique per chunk instance. A regenerated chunk at the same position gets a new id,
    /// which lets late mesh results for the old instance be recognised and dropped.
    pub id: u64,

    /// The voxels of this chunk. Shared read-only with mesh workers once the chunk is in
    /// the world, so building a mesh never holds a chunk lock.
    pub grid: Arc<VoxelGrid>,

    /// World-space extent used for frustum culling.
    pub bounding_box: BoundingBox,

    /// Interleaved `[x, y, z, u, v]` floats, six vertices per visible face.
    vertices: Vec<f32>,

    /// Visible faces per `BlockSide`, kept for statistics.
    face_counts: [u32; 6],

    /// Structures recorded by generation and not yet written into the grid.
    pending_structures: Vec<Structure>,

    mesh_requested: bool,
    mesh_built: bool,
}

impl Chunk {
    /// Wraps a freshly generated grid.
    ///
    /// # Arguments
    /// * `position` - Chunk coordinate of the grid
    /// * `id` - Unique instance id handed out by the world
    /// * `grid` - The generated voxels
    /// * `structures` - Structure anchors recorded during generation
    pub fn new(position: ChunkPos, id: u64, grid: VoxelGrid, structures: Vec<Structure>) -> Self {
        let bounding_box = BoundingBox::for_chunk(position, grid.dimensions());
        Chunk {
            position,
            id,
            grid: Arc::new(grid),
            bounding_box,
            vertices: Vec::new(),
            face_counts: [0; 6],
            pending_structures: structures,
            mesh_requested: false,
            mesh_built: false,
        }
    }

    /// Writes every recorded structure into the grid.
    ///
    /// Must run before the chunk or any of its neighbours is meshed. Once a mesh exists the
    /// grid is frozen, so late structures are discarded.
    ///
    /// # Returns
    /// The number of structures placed.
    pub fn apply_structures(&mut self, trunk_height: u32) -> usize {
        if self.mesh_built {
            self.pending_structures.clear();
            return 0;
        }
        let structures = std::mem::take(&mut self.pending_structures);
        if structures.is_empty() {
            return 0;
        }
        let grid = Arc::make_mut(&mut self.grid);
        for structure in &structures {
            structure.apply(grid, trunk_height);
        }
        structures.len()
    }

    /// Structures still waiting to be applied.
    pub fn pending_structures(&self) -> &[Structure] {
        &self.pending_structures
    }

    /// Marks the chunk as queued for meshing.
    ///
    /// # Returns
    /// `true` the first time, `false` if a mesh was already requested or built.
    pub fn request_mesh(&mut self) -> bool {
        if self.mesh_requested || self.mesh_built {
            return false;
        }
        self.mesh_requested = true;
        true
    }

    /// Whether meshing was requested for this chunk.
    pub fn is_mesh_requested(&self) -> bool {
        self.mesh_requested
    }

    /// Whether the chunk has its final mesh.
    pub fn is_mesh_built(&self) -> bool {
        self.mesh_built
    }

    /// Builds the mesh in place. Calling it on a chunk that already has a mesh does nothing.
    ///
    /// # Returns
    /// `true` if a mesh was built by this call.
    pub fn create_mesh(&mut self, neighbors: &NeighborGrids<'_>, atlas: &TextureAtlas) -> bool {
        if self.mesh_built {
            return false;
        }
        let origin = self.position.origin(self.grid.dimensions());
        let mesh = build_chunk_mesh(&self.grid, origin, neighbors, atlas);
        self.install_mesh(mesh)
    }

    /// Takes ownership of a mesh built elsewhere, typically on a mesh worker.
    ///
    /// # Returns
    /// `false`, leaving the existing geometry untouched, if a mesh was already installed.
    pub fn install_mesh(&mut self, mesh: ChunkMesh) -> bool {
        if self.mesh_built {
            return false;
        }
        self.face_counts = mesh.face_counts;
        self.vertices = mesh.vertices;
        self.mesh_requested = true;
        self.mesh_built = true;
        true
    }

    /// The mesh as interleaved floats. Empty until the mesh is built.
    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    /// Number of vertices in the mesh.
    pub fn vertex_count(&self) -> u32 {
        (self.vertices.len() / crate::engine_state::rendering::vertex::FLOATS_PER_VERTEX) as u32
    }

    /// Visible faces per side, indexed by `BlockSide as usize`.
    pub fn face_counts(&self) -> [u32; 6] {
        self.face_counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::block::block_type::VoxelType;

    const DIMS: ChunkDimensions = ChunkDimensions::new(16, 16, 256);

    #[test]
    fn test_same_cell_maps_to_same_chunk() {
        let a = ChunkPos::from_world(Point3::new(0.0, 10.0, 0.0), DIMS);
        let b = ChunkPos::from_world(Point3::new(15.99, 200.0, 15.99), DIMS);
        assert_eq!(a, ChunkPos::new(0, 0));
        assert_eq!(a, b);
    }

    #[test]
    fn test_boundary_maps_to_adjacent_chunks() {
        let left = ChunkPos::from_world(Point3::new(15.999, 0.0, 0.0), DIMS);
        let right = ChunkPos::from_world(Point3::new(16.0, 0.0, 0.0), DIMS);
        assert_eq!(right.x - left.x, 1);

        let below_zero = ChunkPos::from_world(Point3::new(-0.001, 0.0, -0.001), DIMS);
        let zero = ChunkPos::from_world(Point3::new(0.0, 0.0, 0.0), DIMS);
        assert_eq!(below_zero, ChunkPos::new(-1, -1));
        assert_eq!(zero.x - below_zero.x, 1);
        assert_eq!(zero.z - below_zero.z, 1);
    }

    #[test]
    fn test_negative_positions_floor() {
        assert_eq!(
            ChunkPos::from_world(Point3::new(-16.0, 0.0, -17.0), DIMS),
            ChunkPos::new(-1, -2)
        );
    }

    #[test]
    fn test_swapped_positions_hash_differently() {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let hash = |pos: ChunkPos| {
            let mut hasher = DefaultHasher::new();
            pos.hash(&mut hasher);
            hasher.finish()
        };
        assert_ne!(hash(ChunkPos::new(3, 7)), hash(ChunkPos::new(7, 3)));
    }

    #[test]
    fn test_bounding_box_covers_the_column() {
        let bounding_box = BoundingBox::for_chunk(ChunkPos::new(-1, 2), DIMS);
        assert_eq!(bounding_box.min, Point3::new(-16.0, 0.0, 32.0));
        assert_eq!(bounding_box.max, Point3::new(0.0, 256.0, 48.0));
    }

    #[test]
    fn test_request_mesh_only_once() {
        let grid = VoxelGrid::new(ChunkDimensions::new(2, 2, 2));
        let mut chunk = Chunk::new(ChunkPos::new(0, 0), 0, grid, Vec::new());
        assert!(chunk.request_mesh());
        assert!(!chunk.request_mesh());
        assert!(chunk.is_mesh_requested());
        assert!(!chunk.is_mesh_built());
    }

    #[test]
    fn test_create_mesh_is_idempotent() {
        let mut grid = VoxelGrid::new(ChunkDimensions::new(4, 4, 4));
        grid.set(1, 1, 1, VoxelType::STONE);
        grid.set(2, 1, 1, VoxelType::DIRT);
        let mut chunk = Chunk::new(ChunkPos::new(0, 0), 0, grid, Vec::new());
        let atlas = TextureAtlas::new(16).unwrap();

        assert!(chunk.create_mesh(&NeighborGrids::default(), &atlas));
        let first = chunk.vertices().to_vec();
        assert!(!chunk.create_mesh(&NeighborGrids::default(), &atlas));
        assert_eq!(chunk.vertices(), first.as_slice());
        assert_eq!(chunk.vertex_count(), 10 * 6);
    }

    #[test]
    fn test_structures_are_applied_once() {
        let dims = ChunkDimensions::new(8, 8, 16);
        let mut grid = VoxelGrid::new(dims);
        grid.set(4, 0, 4, VoxelType::GRASS);
        let tree = Structure::Tree { x: 4, y: 1, z: 4 };
        let mut chunk = Chunk::new(ChunkPos::new(0, 0), 0, grid, vec![tree]);

        assert_eq!(chunk.apply_structures(3), 1);
        assert!(chunk.pending_structures().is_empty());
        assert_eq!(chunk.grid.voxel_type(4, 1, 4), VoxelType::WOOD);
        assert_eq!(chunk.apply_structures(3), 0);
    }
}
