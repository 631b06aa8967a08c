//! Background tasks for the rendering system.
//!
//! These tasks run potentially expensive rendering work on worker threads so the streaming
//! thread stays responsive.
//!
//! # Available Tasks
//! - `ChunkMeshGenerationTask`: builds a chunk's mesh from its grid and its neighbours' grids

pub mod chunk_mesh_generation_task;
