//! # Chunk Manager
//!
//! Streams chunks around the observer and decides what is drawn each frame.
//!
//! ## Streaming
//!
//! With `view_distance = d` and the observer in chunk `c`:
//!
//! 1. Every chunk within `d + 1` rings of `c` gets its voxels generated (synchronously)
//! 2. Every chunk within `d` rings either joins the visible candidates, if its mesh is built,
//!    or has its mesh requested once. A request needs all four lateral neighbours, which
//!    step 1 guarantees
//! 3. Chunks outside the generation window may be evicted when a resident budget is set
//!
//! Streaming reruns when the observer changes chunk or when new meshes have arrived.
//!
//! ## Drawing
//!
//! Each frame the frustum is rebuilt from `projection * view`, candidates whose bounding box
//! lies entirely outside it are dropped, and the survivors' meshes are packed into the
//! shared vertex buffer in candidate order. The buffer is only rewritten when that list
//! changes. One batched draw is issued per frame.
//!
//! ## Threading
//!
//! Everything here runs on the calling thread. Mesh building runs on the task manager's
//! workers and the finished meshes are installed at the start of the next `update`.

use std::sync::Arc;

use cgmath::{Matrix4, Point3};
use log::{debug, info};
use web_time::Instant;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};

use super::buffer_state::{ChunkRenderBackend, DrawRange, SharedVertexBuffer};
use super::rendering::{
    frustum::Frustum, tasks::chunk_mesh_generation_task::ChunkMeshGenerationTask,
    texture::TextureAtlas,
};
use super::task_management::TaskManager;
use super::voxels::chunk::ChunkPos;
use super::voxels::world::World;

/// Where one visible chunk's vertices sit in the shared buffer this pass.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RenderEntry {
    /// The chunk.
    pub position: ChunkPos,
    /// Byte offset of its vertices.
    pub byte_offset: u64,
    /// Vertex range drawn for it.
    pub range: DrawRange,
}

/// Counters describing the most recent streaming pass and frame.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamingStats {
    /// Streaming passes run so far.
    pub passes: u64,
    /// Chunks generated by the last pass.
    pub generated: usize,
    /// Meshes requested by the last pass.
    pub mesh_requests: usize,
    /// Chunks evicted by the last pass.
    pub evicted: usize,
    /// Meshed chunks in the inner window.
    pub candidates: usize,
    /// Candidates that passed the frustum test this frame.
    pub visible: usize,
    /// Bytes of vertex data drawn this frame.
    pub uploaded_bytes: u64,
}

/// Decides which chunks exist, which get meshed and which are drawn.
pub struct ChunkManager<B: ChunkRenderBackend> {
    world: World,
    task_manager: TaskManager,
    atlas: Arc<TextureAtlas>,
    buffer: SharedVertexBuffer<B>,
    frustum: Frustum,
    view_distance: i32,
    /// Observer chunk of the last streaming pass.
    center: Option<ChunkPos>,
    /// `World::meshes_installed` at the last streaming pass.
    meshes_seen: u64,
    candidates: Vec<ChunkPos>,
    render_list: Vec<RenderEntry>,
    stats: StreamingStats,
}

impl<B: ChunkRenderBackend> ChunkManager<B> {
    /// Creates a manager with an empty world.
    ///
    /// # Arguments
    /// * `config` - Engine configuration
    /// * `atlas` - Atlas layout used for mesh UVs
    /// * `backend` - Where packed geometry is uploaded and drawn
    pub fn new(config: &EngineConfig, atlas: TextureAtlas, backend: B) -> EngineResult<Self> {
        let world = World::new(config)?;
        info!(
            "Created world with seed {}, chunks {}x{}x{}, view distance {}",
            config.world.seed,
            config.world.chunk.width,
            config.world.chunk.depth,
            config.world.chunk.height,
            config.world.view_distance
        );
        Ok(Self::with_world(
            world,
            atlas,
            backend,
            config.world.view_distance,
            config.render.mesh_workers,
        ))
    }

    /// Creates a manager around an existing world.
    pub fn with_world(
        world: World,
        atlas: TextureAtlas,
        backend: B,
        view_distance: u32,
        mesh_workers: usize,
    ) -> Self {
        ChunkManager {
            world,
            task_manager: TaskManager::new(mesh_workers),
            atlas: Arc::new(atlas),
            buffer: SharedVertexBuffer::new(backend),
            frustum: Frustum::from_matrix(&Matrix4::from_scale(1.0)),
            view_distance: view_distance as i32,
            center: None,
            meshes_seen: 0,
            candidates: Vec::new(),
            render_list: Vec::new(),
            stats: StreamingStats::default(),
        }
    }

    /// Runs one frame: installs finished meshes, restreams if needed, culls, uploads and draws.
    ///
    /// # Arguments
    /// * `observer` - Observer position in world space
    /// * `view` - View matrix
    /// * `projection` - Projection matrix
    ///
    /// # Errors
    /// * `BufferCapacityExceeded` if the visible chunks do not fit the vertex buffer
    /// * `MissingChunk` if a chunk the streaming order guarantees is absent
    /// * Height-curve errors from terrain generation
    pub fn update(
        &mut self,
        observer: Point3<f32>,
        view: &Matrix4<f32>,
        projection: &Matrix4<f32>,
    ) -> EngineResult<()> {
        self.task_manager.process_completed_tasks(&mut self.world);

        let center = ChunkPos::from_world(observer, self.world.dimensions());
        if self.center != Some(center) || self.world.meshes_installed() != self.meshes_seen {
            self.stream(center)?;
        }

        self.frustum.update(&(*projection * *view));
        let visible: Vec<ChunkPos> = self
            .candidates
            .iter()
            .copied()
            .filter(|position| self.is_visible(*position))
            .collect();

        let unchanged = visible.len() == self.render_list.len()
            && visible
                .iter()
                .zip(&self.render_list)
                .all(|(position, entry)| *position == entry.position);
        if !unchanged {
            self.upload(&visible)?;
        }

        self.stats.visible = self.render_list.len();
        self.stats.uploaded_bytes = self.buffer.used_bytes();
        self.buffer.draw(view, projection);
        self.task_manager.process_queued_tasks();
        Ok(())
    }

    /// Generates, requests meshes for and collects candidates around `center`.
    fn stream(&mut self, center: ChunkPos) -> EngineResult<()> {
        let start = Instant::now();
        let outer = self.view_distance + 1;
        let inner = self.view_distance;

        let mut generated = 0;
        for dz in -outer..=outer {
            for dx in -outer..=outer {
                let position = center.offset(dx, dz);
                if self.world.add_chunk_at(position)? {
                    generated += 1;
                }
                self.world.touch(position);
            }
        }

        self.candidates.clear();
        let mut mesh_requests = 0;
        for dz in -inner..=inner {
            for dx in -inner..=inner {
                let position = center.offset(dx, dz);
                let chunk = self
                    .world
                    .get_chunk_at(position)
                    .ok_or(EngineError::MissingChunk(position))?;

                let (built, requested) = {
                    let chunk = chunk.get();
                    (chunk.is_mesh_built(), chunk.is_mesh_requested())
                };
                if built {
                    self.candidates.push(position);
                    continue;
                }
                if requested {
                    continue;
                }

                let neighbor = |dx: i32, dz: i32| {
                    let position = position.offset(dx, dz);
                    self.world
                        .get_chunk_at(position)
                        .ok_or(EngineError::MissingChunk(position))
                };
                let [left, right, front, back] =
                    [neighbor(-1, 0)?, neighbor(1, 0)?, neighbor(0, -1)?, neighbor(0, 1)?];

                if chunk.get_mut().request_mesh() {
                    let task = ChunkMeshGenerationTask::new(
                        &chunk,
                        [&left, &right, &front, &back],
                        self.atlas.clone(),
                    );
                    self.task_manager.publish_task(Box::new(task));
                    mesh_requests += 1;
                }
            }
        }

        let evicted = self
            .world
            .evict(|position| position.ring_distance(center) <= outer);

        self.center = Some(center);
        self.meshes_seen = self.world.meshes_installed();
        self.stats.passes += 1;
        self.stats.generated = generated;
        self.stats.mesh_requests = mesh_requests;
        self.stats.evicted = evicted;
        self.stats.candidates = self.candidates.len();

        debug!(
            "Streamed around {:?} in {:?}: {} generated, {} mesh requests, {} candidates, {} resident",
            center,
            start.elapsed(),
            generated,
            mesh_requests,
            self.candidates.len(),
            self.world.len()
        );
        Ok(())
    }

    fn is_visible(&self, position: ChunkPos) -> bool {
        self.world
            .get_chunk_at(position)
            .is_some_and(|chunk| self.frustum.test_box(&chunk.get().bounding_box))
    }

    /// Rewrites the shared buffer with the meshes of `visible`, in order.
    fn upload(&mut self, visible: &[ChunkPos]) -> EngineResult<()> {
        self.buffer.begin_pass();
        self.render_list.clear();

        for &position in visible {
            let chunk = self
                .world
                .get_chunk_at(position)
                .ok_or(EngineError::MissingChunk(position))?;
            let chunk = chunk.get();
            let (byte_offset, range) = self.buffer.push_chunk(chunk.vertices())?;
            self.render_list.push(RenderEntry {
                position,
                byte_offset,
                range,
            });
        }

        debug!(
            "Uploaded {} chunks, {} bytes",
            self.render_list.len(),
            self.buffer.used_bytes()
        );
        Ok(())
    }

    /// Blocks until every requested mesh has been built and installed.
    ///
    /// Newly installed meshes become candidates on the next `update`.
    pub fn wait_for_pending_meshes(&mut self) -> usize {
        self.task_manager.wait_for_all(&mut self.world)
    }

    /// Mesh requests not yet installed.
    pub fn pending_meshes(&self) -> usize {
        self.task_manager.tasks_in_flight() + self.task_manager.queued_len()
    }

    /// The world map.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Meshed chunks in the inner window, in streaming order.
    pub fn visible_candidates(&self) -> &[ChunkPos] {
        &self.candidates
    }

    /// Chunks drawn in the current frame and where their data sits.
    pub fn render_list(&self) -> &[RenderEntry] {
        &self.render_list
    }

    /// The frustum of the current frame.
    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    /// Observer chunk of the last streaming pass.
    pub fn center(&self) -> Option<ChunkPos> {
        self.center
    }

    /// Counters for the last pass and frame.
    pub fn stats(&self) -> StreamingStats {
        self.stats
    }

    /// The shared vertex buffer.
    pub fn buffer(&self) -> &SharedVertexBuffer<B> {
        &self.buffer
    }

    /// The render backend.
    pub fn backend(&self) -> &B {
        self.buffer.backend()
    }
}
