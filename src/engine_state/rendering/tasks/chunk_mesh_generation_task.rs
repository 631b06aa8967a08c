//! Task for generating mesh data for chunks in a background thread.
//!
//! This module contains the `ChunkMeshGenerationTask` which builds a chunk's face-culled
//! mesh on a worker. The finished mesh travels back to the streaming thread inside the task
//! result and is installed there, so the streaming thread is the only writer of chunks.
//!
//! The task carries shared handles to the voxel grids, not to the chunks. A worker never
//! takes a chunk lock, so the streaming thread can keep installing meshes and flagging
//! requests on the same chunks while a build is running.

use std::sync::Arc;

use log::{debug, trace};
use web_time::{Duration, Instant};

use crate::{
    core::MtResource,
    engine_state::{
        rendering::{
            meshing::{build_chunk_mesh, ChunkMesh, NeighborGrids},
            texture::TextureAtlas,
        },
        task_management::task::{Task, TaskResult},
        voxels::{
            chunk::{Chunk, ChunkPos, VoxelGrid},
            world::World,
        },
    },
};

/// A task that builds the mesh of one chunk.
///
/// The grids of the chunk and its four lateral neighbours are captured when the task is
/// created. All five are fully generated by then and never change afterwards.
pub struct ChunkMeshGenerationTask {
    position: ChunkPos,
    chunk_id: u64,
    origin: (i32, i32),
    already_built: bool,
    grid: Arc<VoxelGrid>,
    /// Left, right, front, back.
    neighbors: [Arc<VoxelGrid>; 4],
    atlas: Arc<TextureAtlas>,
}

impl ChunkMeshGenerationTask {
    /// Creates a new chunk mesh generation task.
    ///
    /// Each chunk is locked only long enough to clone its grid handle.
    ///
    /// # Arguments
    /// * `chunk` - The chunk that needs a mesh
    /// * `neighbors` - The chunks at `x - 1`, `x + 1`, `z - 1` and `z + 1`, in that order
    /// * `atlas` - Atlas layout used for UVs
    pub fn new(
        chunk: &MtResource<Chunk>,
        neighbors: [&MtResource<Chunk>; 4],
        atlas: Arc<TextureAtlas>,
    ) -> Self {
        let chunk = chunk.get();
        ChunkMeshGenerationTask {
            position: chunk.position,
            chunk_id: chunk.id,
            origin: chunk.position.origin(chunk.grid.dimensions()),
            already_built: chunk.is_mesh_built(),
            grid: chunk.grid.clone(),
            neighbors: neighbors.map(|neighbor| neighbor.get().grid.clone()),
            atlas,
        }
    }
}

impl Task for ChunkMeshGenerationTask {
    /// Builds the mesh. Returns an empty result if the chunk already had one.
    fn process(&self) -> Box<dyn TaskResult + Send> {
        let start = Instant::now();
        if self.already_built {
            trace!("Chunk {:?} already meshed, skipping", self.position);
            return Box::new(ChunkMeshGenerationTaskResult {
                position: self.position,
                chunk_id: self.chunk_id,
                mesh: None,
                elapsed: start.elapsed(),
            });
        }

        let [left, right, front, back] = &self.neighbors;
        let neighbors = NeighborGrids {
            left: Some(left.as_ref()),
            right: Some(right.as_ref()),
            front: Some(front.as_ref()),
            back: Some(back.as_ref()),
        };
        let mesh = build_chunk_mesh(&self.grid, self.origin, &neighbors, &self.atlas);

        Box::new(ChunkMeshGenerationTaskResult {
            position: self.position,
            chunk_id: self.chunk_id,
            mesh: Some(mesh),
            elapsed: start.elapsed(),
        })
    }
}

/// The result of a chunk mesh generation task.
pub struct ChunkMeshGenerationTaskResult {
    position: ChunkPos,
    chunk_id: u64,
    mesh: Option<ChunkMesh>,
    elapsed: Duration,
}

impl TaskResult for ChunkMeshGenerationTaskResult {
    /// Installs the mesh into the world on the streaming thread.
    fn handle_result(self: Box<Self>, world: &mut World) {
        let Some(mesh) = self.mesh else {
            return;
        };
        let faces = mesh.face_count();
        if world.install_mesh(self.position, self.chunk_id, mesh) {
            debug!(
                "Meshed chunk {:?}: {} faces in {:?}",
                self.position, faces, self.elapsed
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TerrainConfig;
    use crate::engine_state::voxels::{
        block::block_side::BlockSide,
        chunk::ChunkDimensions,
        generation::{NoiseSource, TerrainGenerator},
    };

    struct FlatNoise;

    impl NoiseSource for FlatNoise {
        fn sample(&self, _x: f64, _z: f64, _octaves: u32, _persistence: f64) -> f64 {
            0.0
        }
    }

    /// A world of flat 4x4 columns, four voxels deep, around chunk (0, 0).
    fn world() -> World {
        let config = TerrainConfig {
            height_curve: vec![(-1.0, 0.0), (1.0, 8.0)],
            water_level: 0,
            tree_probability: 0.0,
            ..TerrainConfig::default()
        };
        let generator = TerrainGenerator::with_noise(0, config, Box::new(FlatNoise)).unwrap();
        let mut world = World::with_generator(generator, ChunkDimensions::new(4, 4, 16), None);
        for (dx, dz) in [(0, 0), (-1, 0), (1, 0), (0, -1), (0, 1)] {
            world.add_chunk_at(ChunkPos::new(dx, dz)).unwrap();
        }
        world
    }

    fn task(world: &World) -> ChunkMeshGenerationTask {
        let center = ChunkPos::new(0, 0);
        let get = |dx, dz| world.get_chunk_at(center.offset(dx, dz)).unwrap();
        let (left, right, front, back) = (get(-1, 0), get(1, 0), get(0, -1), get(0, 1));
        ChunkMeshGenerationTask::new(
            &get(0, 0),
            [&left, &right, &front, &back],
            Arc::new(TextureAtlas::new(16).unwrap()),
        )
    }

    #[test]
    fn test_result_installs_mesh() {
        let mut world = world();
        let task = task(&world);

        task.process().handle_result(&mut world);

        let chunk = world.get_chunk_at(ChunkPos::new(0, 0)).unwrap();
        let chunk = chunk.get();
        assert!(chunk.is_mesh_built());
        // neighbours are as tall as the chunk, so only top and bottom faces remain
        let faces = chunk.face_counts();
        assert_eq!(faces[BlockSide::TOP as usize], 16);
        assert_eq!(faces[BlockSide::BOTTOM as usize], 16);
        assert_eq!(faces.iter().sum::<u32>(), 32);
        assert_eq!(world.meshes_installed(), 1);
    }

    #[test]
    fn test_already_meshed_chunk_is_skipped() {
        let mut world = world();
        task(&world).process().handle_result(&mut world);
        let before = world
            .get_chunk_at(ChunkPos::new(0, 0))
            .unwrap()
            .get()
            .vertices()
            .to_vec();

        task(&world).process().handle_result(&mut world);

        let chunk = world.get_chunk_at(ChunkPos::new(0, 0)).unwrap();
        assert_eq!(chunk.get().vertices(), before.as_slice());
        assert_eq!(world.meshes_installed(), 1);
    }

    #[test]
    fn test_build_runs_while_chunks_are_write_locked() {
        let world = world();
        let task = task(&world);

        // hold every chunk the task read from, as the streaming thread does while installing
        let chunks: Vec<_> = world.positions().filter_map(|p| world.get_chunk_at(p)).collect();
        let guards: Vec<_> = chunks.iter().map(|chunk| chunk.get_mut()).collect();

        let (sender, receiver) = std::sync::mpsc::channel();
        let worker = std::thread::spawn(move || {
            let result = task.process();
            sender.send(result).unwrap();
        });
        let result = receiver.recv_timeout(std::time::Duration::from_secs(10));
        assert!(result.is_ok(), "mesh build waited on a chunk lock");

        drop(guards);
        worker.join().unwrap();
    }

    #[test]
    fn test_install_does_not_wait_for_neighbour_build() {
        let mut world = world();
        let task = task(&world);

        let (started_sender, started) = std::sync::mpsc::channel();
        let (release_sender, release) = std::sync::mpsc::channel::<()>();
        let worker = std::thread::spawn(move || {
            started_sender.send(()).unwrap();
            let result = task.process();
            // keep the task, and everything it holds, alive until the install is done
            release.recv().unwrap();
            result
        });
        started.recv().unwrap();

        // (-1, 0) is the running task's left neighbour
        let left_id = world.get_chunk_at(ChunkPos::new(-1, 0)).unwrap().get().id;
        assert!(world.install_mesh(ChunkPos::new(-1, 0), left_id, ChunkMesh::default()));
        assert!(world
            .get_chunk_at(ChunkPos::new(1, 0))
            .unwrap()
            .get_mut()
            .request_mesh());

        release_sender.send(()).unwrap();
        worker.join().unwrap().handle_result(&mut world);
        assert_eq!(world.meshes_installed(), 2);
    }
}
