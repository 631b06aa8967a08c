//! Face-culling mesh construction for chunks.
//!
//! This module turns a chunk's voxel grid into a flat list of interleaved vertices holding
//! only the faces that can be seen: faces of solid voxels that touch air.
//!
//! # Boundary Handling
//! - Top and bottom faces at the grid limits are always emitted; there is no chunk above
//!   or below a column.
//! - A lateral face leaving the grid is emitted when no neighbour grid is supplied for that
//!   side, and otherwise only if the mirrored voxel in the neighbour is air. This keeps two
//!   adjacent chunks from both drawing the wall between them.
//!
//! # Output Layout
//! Every visible face appends six vertices (two triangles, bottom-right, top-right, top-left,
//! then top-left, bottom-left, bottom-right), each `[x, y, z, u, v]` in world space.
//!
//! # Performance Considerations
//! - The grid is walked `y`, `z`, `x` from outer to inner loop, matching its memory layout
//! - Air checks read the grid's solid bit vector rather than the voxel array

use crate::engine_state::voxels::{
    block::{block_side::BlockSide, block_type::VoxelType, face_texture_indices},
    chunk::VoxelGrid,
};

use super::{
    texture::TextureAtlas,
    vertex::{FLOATS_PER_FACE, FLOATS_PER_VERTEX},
};

/// Corner order used to emit a face's two triangles, indexing
/// `[bottom_left, bottom_right, top_right, top_left]`.
const FACE_CORNER_ORDER: [usize; 6] = [1, 2, 3, 3, 0, 1];

/// Read access to the voxel grids of the four lateral neighbours of the chunk being meshed.
///
/// `left` is the chunk at `x - 1`, `right` at `x + 1`, `front` at `z - 1` and `back` at
/// `z + 1`. A missing neighbour means that side is treated as open air.
#[derive(Copy, Clone, Default)]
pub struct NeighborGrids<'a> {
    /// Neighbour along -x.
    pub left: Option<&'a VoxelGrid>,
    /// Neighbour along +x.
    pub right: Option<&'a VoxelGrid>,
    /// Neighbour along -z.
    pub front: Option<&'a VoxelGrid>,
    /// Neighbour along +z.
    pub back: Option<&'a VoxelGrid>,
}

impl<'a> NeighborGrids<'a> {
    /// The neighbour grid a face on `side` looks into, if any.
    pub fn for_side(&self, side: BlockSide) -> Option<&'a VoxelGrid> {
        match side {
            BlockSide::LEFT => self.left,
            BlockSide::RIGHT => self.right,
            BlockSide::FRONT => self.front,
            BlockSide::BACK => self.back,
            BlockSide::TOP | BlockSide::BOTTOM => None,
        }
    }
}

/// The geometry of one chunk.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChunkMesh {
    /// Interleaved `[x, y, z, u, v]` floats.
    pub vertices: Vec<f32>,
    /// Faces emitted per side, indexed by `BlockSide as usize`.
    pub face_counts: [u32; 6],
}

impl ChunkMesh {
    /// Total number of faces.
    pub fn face_count(&self) -> u32 {
        self.face_counts.iter().sum()
    }

    /// Total number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / FLOATS_PER_VERTEX
    }

    /// Size of the vertex data in bytes.
    pub fn byte_len(&self) -> usize {
        std::mem::size_of_val(self.vertices.as_slice())
    }
}

/// Builds the mesh of a voxel grid.
///
/// # Arguments
/// * `grid` - The chunk's voxels
/// * `origin` - World x and z of the chunk's minimum corner
/// * `neighbors` - Lateral neighbour grids used to cull faces on the chunk boundary
/// * `atlas` - Atlas layout used to compute UVs
///
/// # Returns
/// The chunk's mesh. The function is pure, so building twice yields identical meshes.
pub fn build_chunk_mesh(
    grid: &VoxelGrid,
    origin: (i32, i32),
    neighbors: &NeighborGrids<'_>,
    atlas: &TextureAtlas,
) -> ChunkMesh {
    let dimensions = grid.dimensions();
    let mut mesh = ChunkMesh::default();

    for y in 0..dimensions.height as i32 {
        for z in 0..dimensions.depth as i32 {
            for x in 0..dimensions.width as i32 {
                let voxel_type = grid.voxel_type(x as usize, y as usize, z as usize);
                if voxel_type == VoxelType::AIR {
                    continue;
                }

                for side in BlockSide::all() {
                    if !is_face_visible(grid, x, y, z, side, neighbors) {
                        continue;
                    }
                    let world = [(origin.0 + x) as f32, y as f32, (origin.1 + z) as f32];
                    push_face(&mut mesh.vertices, voxel_type, side, world, atlas);
                    mesh.face_counts[side as usize] += 1;
                }
            }
        }
    }

    mesh
}

/// Whether the face of the voxel at `(x, y, z)` on `side` borders air.
fn is_face_visible(
    grid: &VoxelGrid,
    x: i32,
    y: i32,
    z: i32,
    side: BlockSide,
    neighbors: &NeighborGrids<'_>,
) -> bool {
    let (dx, dy, dz) = side.normal();
    let (nx, ny, nz) = (x + dx, y + dy, z + dz);

    if grid.contains(nx, ny, nz) {
        return grid.is_air(nx as usize, ny as usize, nz as usize);
    }

    let Some(neighbor) = neighbors.for_side(side) else {
        return true;
    };

    // step into the neighbour: wrap the coordinate that left the grid
    let dimensions = neighbor.dimensions();
    let mx = nx.rem_euclid(dimensions.width as i32);
    let mz = nz.rem_euclid(dimensions.depth as i32);
    if !neighbor.contains(mx, ny, mz) {
        return true;
    }
    neighbor.is_air(mx as usize, ny as usize, mz as usize)
}

/// Appends the six vertices of one face.
fn push_face(
    vertices: &mut Vec<f32>,
    voxel_type: VoxelType,
    side: BlockSide,
    position: [f32; 3],
    atlas: &TextureAtlas,
) {
    let corners = side.corners(position[0], position[1], position[2]);
    let uvs = atlas.cell_uvs(face_texture_indices(voxel_type, side));

    vertices.reserve(FLOATS_PER_FACE);
    for corner in FACE_CORNER_ORDER {
        let [x, y, z] = corners[corner];
        let [u, v] = uvs[corner];
        vertices.extend_from_slice(&[x, y, z, u, v]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::rendering::vertex::VERTICES_PER_FACE;
    use crate::engine_state::voxels::chunk::ChunkDimensions;

    fn atlas() -> TextureAtlas {
        TextureAtlas::new(16).unwrap()
    }

    fn dims() -> ChunkDimensions {
        ChunkDimensions::new(4, 4, 4)
    }

    #[test]
    fn test_isolated_voxel_emits_all_faces() {
        let mut grid = VoxelGrid::new(dims());
        grid.set(1, 1, 1, VoxelType::STONE);
        let mesh = build_chunk_mesh(&grid, (0, 0), &NeighborGrids::default(), &atlas());

        assert_eq!(mesh.vertex_count(), 36);
        assert_eq!(mesh.vertices.len(), 36 * FLOATS_PER_VERTEX);
        assert_eq!(mesh.face_counts, [1; 6]);
    }

    #[test]
    fn test_empty_grid_emits_nothing() {
        let grid = VoxelGrid::new(dims());
        let mesh = build_chunk_mesh(&grid, (0, 0), &NeighborGrids::default(), &atlas());
        assert!(mesh.vertices.is_empty());
        assert_eq!(mesh.face_count(), 0);
    }

    #[test]
    fn test_full_grid_without_neighbors_emits_only_its_shell() {
        let grid = VoxelGrid::filled(dims(), VoxelType::STONE);
        let mesh = build_chunk_mesh(&grid, (0, 0), &NeighborGrids::default(), &atlas());

        // 6 sides of a 4x4x4 cube, 16 faces each
        assert_eq!(mesh.face_count(), 96);
        assert_eq!(mesh.face_counts, [16; 6]);
        assert_eq!(mesh.vertex_count(), 96 * VERTICES_PER_FACE);
    }

    #[test]
    fn test_full_grid_with_solid_neighbors_keeps_top_and_bottom() {
        let grid = VoxelGrid::filled(dims(), VoxelType::STONE);
        let solid = VoxelGrid::filled(dims(), VoxelType::DIRT);
        let neighbors = NeighborGrids {
            left: Some(&solid),
            right: Some(&solid),
            front: Some(&solid),
            back: Some(&solid),
        };
        let mesh = build_chunk_mesh(&grid, (0, 0), &neighbors, &atlas());

        assert_eq!(mesh.face_counts[BlockSide::TOP as usize], 16);
        assert_eq!(mesh.face_counts[BlockSide::BOTTOM as usize], 16);
        assert_eq!(mesh.face_count(), 32);
    }

    #[test]
    fn test_boundary_faces_follow_right_neighbor() {
        // rightmost column of A is stone
        let mut a = VoxelGrid::new(dims());
        for y in 0..4 {
            for z in 0..4 {
                a.set(3, y, z, VoxelType::STONE);
            }
        }

        let air = VoxelGrid::new(dims());
        let open = build_chunk_mesh(
            &a,
            (0, 0),
            &NeighborGrids {
                right: Some(&air),
                ..NeighborGrids::default()
            },
            &atlas(),
        );
        assert_eq!(open.face_counts[BlockSide::RIGHT as usize], 16);

        // leftmost column of B is stone
        let mut b = VoxelGrid::new(dims());
        for y in 0..4 {
            for z in 0..4 {
                b.set(0, y, z, VoxelType::STONE);
            }
        }
        let closed = build_chunk_mesh(
            &a,
            (0, 0),
            &NeighborGrids {
                right: Some(&b),
                ..NeighborGrids::default()
            },
            &atlas(),
        );
        assert_eq!(closed.face_counts[BlockSide::RIGHT as usize], 0);
        assert_eq!(closed.face_counts[BlockSide::LEFT as usize], 16);
    }

    #[test]
    fn test_boundary_uses_mirrored_coordinate() {
        // a single voxel on the front edge; the neighbour is solid only behind it
        let mut grid = VoxelGrid::new(dims());
        grid.set(2, 1, 0, VoxelType::STONE);
        let mut front = VoxelGrid::new(dims());
        front.set(2, 1, 3, VoxelType::STONE);

        let mesh = build_chunk_mesh(
            &grid,
            (0, 0),
            &NeighborGrids {
                front: Some(&front),
                ..NeighborGrids::default()
            },
            &atlas(),
        );
        assert_eq!(mesh.face_counts[BlockSide::FRONT as usize], 0);
        assert_eq!(mesh.face_count(), 5);
    }

    #[test]
    fn test_vertices_are_in_world_space() {
        let mut grid = VoxelGrid::new(dims());
        grid.set(0, 2, 0, VoxelType::GRASS);
        let mesh = build_chunk_mesh(&grid, (-4, 8), &NeighborGrids::default(), &atlas());

        for vertex in mesh.vertices.chunks(FLOATS_PER_VERTEX) {
            assert!((-4.0..=-3.0).contains(&vertex[0]));
            assert!((2.0..=3.0).contains(&vertex[1]));
            assert!((8.0..=9.0).contains(&vertex[2]));
        }
    }

    #[test]
    fn test_face_uvs_come_from_atlas_cell() {
        let mut grid = VoxelGrid::new(dims());
        grid.set(0, 0, 0, VoxelType::GRASS);
        let mesh = build_chunk_mesh(&grid, (0, 0), &NeighborGrids::default(), &atlas());

        // TOP is the second face emitted; grass tops use cell 0
        let top = &mesh.vertices[FLOATS_PER_FACE..2 * FLOATS_PER_FACE];
        for vertex in top.chunks(FLOATS_PER_VERTEX) {
            assert_eq!(vertex[1], 1.0);
            assert!((0.0..=0.0625).contains(&vertex[3]));
            assert!((0.0..=0.0625).contains(&vertex[4]));
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let mut grid = VoxelGrid::new(dims());
        grid.set(1, 1, 1, VoxelType::DIRT);
        grid.set(1, 2, 1, VoxelType::GRASS);
        let a = build_chunk_mesh(&grid, (0, 0), &NeighborGrids::default(), &atlas());
        let b = build_chunk_mesh(&grid, (0, 0), &NeighborGrids::default(), &atlas());
        assert_eq!(a, b);
        assert_eq!(a.face_count(), 10);
    }
}
