//! # Voxel Module
//!
//! Voxel data: materials, chunk storage, terrain generation and the world map.
//!
//! ## Architecture
//!
//! * **Block**: voxel materials, faces and their atlas cells
//! * **Chunk**: fixed-size columns of voxels plus their mesh and mesh-state flags
//! * **Generation**: height-field terrain and structure placement
//! * **World**: the `ChunkPos -> Chunk` map streaming reads and writes
//!
//! ## Thread Safety
//!
//! Chunks live behind `MtResource` and are only locked by the streaming thread. Mesh workers
//! get `Arc` handles to the voxel grids instead. A grid is only written while its chunk is
//! created, before it is inserted into the world, so workers only ever see finished grids.

pub mod block;
pub mod chunk;
pub mod generation;
pub mod world;
