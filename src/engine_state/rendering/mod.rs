//! Rendering side of the terrain engine.
//!
//! This module turns voxel grids into GPU-ready geometry and decides what is drawn:
//! face-culling meshing, the atlas layout UVs come from, the interleaved vertex format,
//! frustum culling, and the wgpu backend the packed geometry is submitted to.
//!
//! # Modules
//! - `meshing`: builds a chunk's visible faces
//! - `frustum`: view-frustum plane extraction and box tests
//! - `texture`: texture atlas layout and loading
//! - `vertex`: vertex layout constants and the GPU vertex description
//! - `wgpu_backend`: `ChunkRenderBackend` on a wgpu device
//! - `tasks`: background mesh generation

pub mod frustum;
pub mod meshing;
pub mod tasks;
pub mod texture;
pub mod vertex;
pub mod wgpu_backend;
