//! # World Module
//!
//! This module provides the `World` struct which owns every resident chunk, keyed by
//! `ChunkPos`. It serves as the central coordinator for chunk creation, lookup, mesh
//! installation and (optionally) eviction.
//!
//! ## Architecture
//!
//! The world uses a sparse storage approach where only chunks that streaming has asked for
//! are kept in memory. Each chunk lives behind an `MtResource` so mesh workers can read a
//! chunk and its neighbours while the streaming thread keeps running; the map itself is only
//! ever touched by the streaming thread.
//!
//! ## Eviction
//!
//! By default the map only grows. With a resident budget configured, the world remembers
//! the order in which streaming passes last touched each chunk (`lru::LruCache`) and drops
//! the stalest chunks outside the current window once over budget.

use std::collections::HashMap;

use log::{debug, warn};
use lru::LruCache;

use crate::config::EngineConfig;
use crate::core::MtResource;
use crate::engine_state::rendering::meshing::ChunkMesh;
use crate::error::EngineResult;

use super::chunk::{Chunk, ChunkDimensions, ChunkPos};
use super::generation::TerrainGenerator;

/// Represents a voxel world composed of column chunks.
///
/// # Examples
///
/// ```
/// use voxel_terrain::config::EngineConfig;
/// use voxel_terrain::engine_state::voxels::{chunk::ChunkPos, world::World};
///
/// let mut world = World::new(&EngineConfig::default()).unwrap();
/// world.add_chunk_at(ChunkPos::new(0, 0)).unwrap();
/// assert!(world.get_chunk_at(ChunkPos::new(0, 0)).is_some());
/// ```
pub struct World {
    /// A mapping from chunk coordinates to chunk data.
    chunks: HashMap<ChunkPos, MtResource<Chunk>>,
    generator: TerrainGenerator,
    dimensions: ChunkDimensions,
    next_chunk_id: u64,
    meshes_installed: u64,
    /// Streaming recency, only tracked when a resident budget is set.
    recency: Option<(LruCache<ChunkPos, ()>, usize)>,
}

impl World {
    /// Creates an empty world from the configuration.
    pub fn new(config: &EngineConfig) -> EngineResult<Self> {
        let generator = TerrainGenerator::new(config.world.seed, config.terrain.clone())?;
        Ok(Self::with_generator(
            generator,
            config.world.chunk,
            config.world.max_resident_chunks,
        ))
    }

    /// Creates an empty world around an existing generator.
    ///
    /// # Arguments
    /// * `generator` - Terrain generator shared by every chunk
    /// * `dimensions` - Chunk size in voxels
    /// * `max_resident_chunks` - Eviction budget, `None` to never evict
    pub fn with_generator(
        generator: TerrainGenerator,
        dimensions: ChunkDimensions,
        max_resident_chunks: Option<usize>,
    ) -> Self {
        World {
            chunks: HashMap::new(),
            generator,
            dimensions,
            next_chunk_id: 0,
            meshes_installed: 0,
            recency: max_resident_chunks.map(|budget| (LruCache::unbounded(), budget)),
        }
    }

    /// Chunk size in voxels.
    pub fn dimensions(&self) -> ChunkDimensions {
        self.dimensions
    }

    /// Generates the chunk at `position` if it does not exist yet.
    ///
    /// Structures recorded during generation are written into the grid before the chunk
    /// becomes visible to anyone else.
    ///
    /// # Returns
    /// `true` if a chunk was created.
    pub fn add_chunk_at(&mut self, position: ChunkPos) -> EngineResult<bool> {
        if self.chunks.contains_key(&position) {
            return Ok(false);
        }

        let (grid, structures) = self.generator.generate(position, self.dimensions)?;
        let mut chunk = Chunk::new(position, self.next_chunk_id, grid, structures);
        self.next_chunk_id += 1;

        let placed = chunk.apply_structures(self.generator.config().trunk_height);
        if placed > 0 {
            debug!("Placed {} structures in chunk {:?}", placed, position);
        }

        self.chunks.insert(position, MtResource::new(chunk));
        Ok(true)
    }

    /// Retrieves the chunk at the specified chunk coordinates.
    ///
    /// # Returns
    /// A clone of the `MtResource<Chunk>` if the chunk exists, or `None` if not.
    pub fn get_chunk_at(&self, position: ChunkPos) -> Option<MtResource<Chunk>> {
        self.chunks.get(&position).cloned()
    }

    /// Whether a chunk exists at `position`.
    pub fn contains(&self, position: ChunkPos) -> bool {
        self.chunks.contains_key(&position)
    }

    /// Number of resident chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether no chunk is resident.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Positions of all resident chunks, in no particular order.
    pub fn positions(&self) -> impl Iterator<Item = ChunkPos> + '_ {
        self.chunks.keys().copied()
    }

    /// Installs a mesh built off-thread.
    ///
    /// The mesh is dropped if the chunk it was built from is gone or has been replaced by
    /// a newer instance.
    ///
    /// # Returns
    /// `true` if the mesh was installed.
    pub fn install_mesh(&mut self, position: ChunkPos, chunk_id: u64, mesh: ChunkMesh) -> bool {
        let Some(chunk) = self.chunks.get(&position) else {
            warn!("Discarding mesh for chunk {:?}: chunk is no longer resident", position);
            return false;
        };

        let mut chunk = chunk.get_mut();
        if chunk.id != chunk_id {
            warn!(
                "Discarding mesh for chunk {:?}: built from instance {}, resident instance is {}",
                position, chunk_id, chunk.id
            );
            return false;
        }
        if !chunk.install_mesh(mesh) {
            return false;
        }
        drop(chunk);

        self.meshes_installed += 1;
        true
    }

    /// Total meshes installed since the world was created. Streaming compares this between
    /// passes to notice newly finished chunks.
    pub fn meshes_installed(&self) -> u64 {
        self.meshes_installed
    }

    /// Records that streaming used the chunk at `position` in the current pass.
    pub fn touch(&mut self, position: ChunkPos) {
        if let Some((recency, _)) = self.recency.as_mut() {
            recency.put(position, ());
        }
    }

    /// Evicts the least recently streamed chunks until the world is within its budget.
    ///
    /// Chunks for which `keep` returns `true` are never evicted; eviction stops at the first
    /// one it meets. Does nothing when no budget is configured.
    ///
    /// # Returns
    /// The number of chunks evicted.
    pub fn evict(&mut self, keep: impl Fn(ChunkPos) -> bool) -> usize {
        let Some((recency, budget)) = self.recency.as_mut() else {
            return 0;
        };

        let mut evicted = 0;
        while self.chunks.len() > *budget {
            let Some((position, ())) = recency.pop_lru() else {
                break;
            };
            if keep(position) {
                recency.put(position, ());
                break;
            }
            if self.chunks.remove(&position).is_some() {
                evicted += 1;
            }
        }

        if evicted > 0 {
            warn!(
                "Evicted {} chunks, {} remain resident (budget {})",
                evicted,
                self.chunks.len(),
                budget
            );
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TerrainConfig;
    use crate::engine_state::voxels::generation::NoiseSource;

    struct FlatNoise;

    impl NoiseSource for FlatNoise {
        fn sample(&self, _x: f64, _z: f64, _octaves: u32, _persistence: f64) -> f64 {
            0.0
        }
    }

    fn world(max_resident_chunks: Option<usize>) -> World {
        let config = TerrainConfig {
            height_curve: vec![(-1.0, 0.0), (1.0, 8.0)],
            water_level: 0,
            tree_probability: 0.0,
            ..TerrainConfig::default()
        };
        let generator = TerrainGenerator::with_noise(0, config, Box::new(FlatNoise)).unwrap();
        World::with_generator(generator, ChunkDimensions::new(4, 4, 16), max_resident_chunks)
    }

    #[test]
    fn test_add_chunk_only_once() {
        let mut world = world(None);
        assert!(world.add_chunk_at(ChunkPos::new(1, 1)).unwrap());
        let first = world.get_chunk_at(ChunkPos::new(1, 1)).unwrap();
        assert!(!world.add_chunk_at(ChunkPos::new(1, 1)).unwrap());
        let second = world.get_chunk_at(ChunkPos::new(1, 1)).unwrap();
        assert!(first.ptr_eq(&second));
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn test_chunk_ids_are_unique() {
        let mut world = world(None);
        world.add_chunk_at(ChunkPos::new(0, 0)).unwrap();
        world.add_chunk_at(ChunkPos::new(0, 1)).unwrap();
        let a = world.get_chunk_at(ChunkPos::new(0, 0)).unwrap().get().id;
        let b = world.get_chunk_at(ChunkPos::new(0, 1)).unwrap().get().id;
        assert_ne!(a, b);
    }

    #[test]
    fn test_install_mesh_checks_instance() {
        let mut world = world(None);
        let position = ChunkPos::new(0, 0);
        world.add_chunk_at(position).unwrap();
        let id = world.get_chunk_at(position).unwrap().get().id;

        assert!(!world.install_mesh(position, id + 1, ChunkMesh::default()));
        assert!(!world.install_mesh(ChunkPos::new(5, 5), id, ChunkMesh::default()));
        assert_eq!(world.meshes_installed(), 0);

        assert!(world.install_mesh(position, id, ChunkMesh::default()));
        assert!(!world.install_mesh(position, id, ChunkMesh::default()));
        assert_eq!(world.meshes_installed(), 1);
        assert!(world.get_chunk_at(position).unwrap().get().is_mesh_built());
    }

    #[test]
    fn test_no_eviction_without_budget() {
        let mut world = world(None);
        for x in 0..10 {
            world.add_chunk_at(ChunkPos::new(x, 0)).unwrap();
            world.touch(ChunkPos::new(x, 0));
        }
        assert_eq!(world.evict(|_| false), 0);
        assert_eq!(world.len(), 10);
    }

    #[test]
    fn test_evicts_least_recently_streamed_first() {
        let mut world = world(Some(3));
        for x in 0..5 {
            world.add_chunk_at(ChunkPos::new(x, 0)).unwrap();
            world.touch(ChunkPos::new(x, 0));
        }
        // chunk 0 was used again most recently
        world.touch(ChunkPos::new(0, 0));

        assert_eq!(world.evict(|_| false), 2);
        assert_eq!(world.len(), 3);
        assert!(world.contains(ChunkPos::new(0, 0)));
        assert!(!world.contains(ChunkPos::new(1, 0)));
        assert!(!world.contains(ChunkPos::new(2, 0)));
    }

    #[test]
    fn test_eviction_keeps_window() {
        let mut world = world(Some(1));
        for x in 0..3 {
            world.add_chunk_at(ChunkPos::new(x, 0)).unwrap();
            world.touch(ChunkPos::new(x, 0));
        }
        assert_eq!(world.evict(|position| position.x >= 1), 1);
        assert_eq!(world.len(), 2);
    }
}
