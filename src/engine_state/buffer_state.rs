//! # Buffer State Module
//!
//! This module packs the vertex data of visible chunks into one pre-allocated vertex buffer
//! and hands the resulting draw ranges to a render backend.
//!
//! ## Key Features
//!
//! * One shared buffer for every visible chunk, rewritten from offset zero each pass
//! * Hard capacity ceiling checked before every write
//! * Buffer usage analytics (allocated, high-water mark, writes)
//!
//! ## Architecture
//!
//! `SharedVertexBuffer` owns the packing logic and talks to the GPU (or a stand-in) only
//! through the `ChunkRenderBackend` trait. `CpuChunkBuffer` is a backend that keeps the data
//! in host memory; it drives the headless binary and the tests. The wgpu backend lives in
//! `rendering::wgpu_backend`.

use cgmath::Matrix4;
use log::trace;

use crate::error::{EngineError, EngineResult};

use super::rendering::vertex::VERTEX_STRIDE;

/// A contiguous run of vertices in the shared buffer, drawn as one sub-draw.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DrawRange {
    /// Index of the first vertex.
    pub first_vertex: u32,
    /// Number of vertices.
    pub vertex_count: u32,
}

/// The renderer collaborator the chunk manager submits geometry to.
pub trait ChunkRenderBackend {
    /// Size of the vertex buffer in bytes.
    fn capacity_bytes(&self) -> u64;

    /// Copies interleaved vertex floats into the buffer at `byte_offset`.
    ///
    /// # Errors
    /// `BufferCapacityExceeded` if the write would run past the end of the buffer.
    fn write_vertices(&mut self, byte_offset: u64, vertices: &[f32]) -> EngineResult<()>;

    /// Issues one batched draw of `ranges` with the given camera matrices.
    fn draw(&mut self, view: &Matrix4<f32>, projection: &Matrix4<f32>, ranges: &[DrawRange]);
}

/// Analytics data for the shared buffer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BufferAnalytics {
    /// Total memory allocated for the buffer in bytes
    pub allocated_memory: u64,
    /// Highest byte offset ever written
    pub used_memory: u64,
    /// Number of chunk uploads
    pub times_written: u64,
}

/// Packs chunk meshes back to back into a backend's vertex buffer.
pub struct SharedVertexBuffer<B: ChunkRenderBackend> {
    backend: B,
    /// Next free byte.
    cursor: u64,
    ranges: Vec<DrawRange>,
    analytics: BufferAnalytics,
}

impl<B: ChunkRenderBackend> SharedVertexBuffer<B> {
    /// Wraps a backend. Its capacity is fixed from here on.
    pub fn new(backend: B) -> Self {
        let analytics = BufferAnalytics {
            allocated_memory: backend.capacity_bytes(),
            ..BufferAnalytics::default()
        };
        SharedVertexBuffer {
            backend,
            cursor: 0,
            ranges: Vec::new(),
            analytics,
        }
    }

    /// Starts a new upload pass. Previously written regions become free.
    pub fn begin_pass(&mut self) {
        self.cursor = 0;
        self.ranges.clear();
    }

    /// Appends one chunk's vertices after the previous chunk's.
    ///
    /// Empty meshes take no space and produce no draw range.
    ///
    /// # Returns
    /// The byte offset the data was written at and the range it occupies.
    ///
    /// # Errors
    /// `BufferCapacityExceeded` if the pass no longer fits the buffer. Nothing is written.
    pub fn push_chunk(&mut self, vertices: &[f32]) -> EngineResult<(u64, DrawRange)> {
        let offset = self.cursor;
        let bytes = std::mem::size_of_val(vertices) as u64;
        let range = DrawRange {
            first_vertex: (offset / VERTEX_STRIDE) as u32,
            vertex_count: (bytes / VERTEX_STRIDE) as u32,
        };
        if bytes == 0 {
            return Ok((offset, range));
        }

        let capacity = self.backend.capacity_bytes();
        let required = offset + bytes;
        if required > capacity {
            return Err(EngineError::BufferCapacityExceeded { required, capacity });
        }

        self.backend.write_vertices(offset, vertices)?;
        trace!("Wrote {} bytes at offset {}", bytes, offset);

        self.cursor = required;
        self.ranges.push(range);
        self.analytics.used_memory = self.analytics.used_memory.max(required);
        self.analytics.times_written += 1;
        Ok((offset, range))
    }

    /// Draws everything written in the current pass.
    pub fn draw(&mut self, view: &Matrix4<f32>, projection: &Matrix4<f32>) {
        self.backend.draw(view, projection, &self.ranges);
    }

    /// Ranges written in the current pass, in upload order.
    pub fn ranges(&self) -> &[DrawRange] {
        &self.ranges
    }

    /// Bytes written in the current pass.
    pub fn used_bytes(&self) -> u64 {
        self.cursor
    }

    /// Usage statistics since creation.
    pub fn analytics(&self) -> BufferAnalytics {
        self.analytics
    }

    /// The wrapped backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The wrapped backend, mutably.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

/// A render backend that keeps the vertex buffer in host memory and records draws.
///
/// Memory is only committed up to the highest byte written, so a large configured
/// capacity costs nothing until it is used.
#[derive(Debug, Default)]
pub struct CpuChunkBuffer {
    capacity: u64,
    floats: Vec<f32>,
    last_ranges: Vec<DrawRange>,
    last_view_projection: Option<Matrix4<f32>>,
    draw_calls: u64,
}

impl CpuChunkBuffer {
    /// Creates a buffer that accepts up to `capacity` bytes.
    pub fn new(capacity: u64) -> Self {
        CpuChunkBuffer {
            capacity,
            ..CpuChunkBuffer::default()
        }
    }

    /// Number of `draw` calls received.
    pub fn draw_calls(&self) -> u64 {
        self.draw_calls
    }

    /// Ranges of the most recent draw.
    pub fn last_ranges(&self) -> &[DrawRange] {
        &self.last_ranges
    }

    /// `projection * view` of the most recent draw.
    pub fn last_view_projection(&self) -> Option<Matrix4<f32>> {
        self.last_view_projection
    }

    /// The floats stored for a range, or `None` if it was never written.
    pub fn vertices_in(&self, range: DrawRange) -> Option<&[f32]> {
        let floats_per_vertex = (VERTEX_STRIDE / 4) as usize;
        let start = range.first_vertex as usize * floats_per_vertex;
        let end = start + range.vertex_count as usize * floats_per_vertex;
        self.floats.get(start..end)
    }
}

impl ChunkRenderBackend for CpuChunkBuffer {
    fn capacity_bytes(&self) -> u64 {
        self.capacity
    }

    fn write_vertices(&mut self, byte_offset: u64, vertices: &[f32]) -> EngineResult<()> {
        let required = byte_offset + std::mem::size_of_val(vertices) as u64;
        if required > self.capacity {
            return Err(EngineError::BufferCapacityExceeded {
                required,
                capacity: self.capacity,
            });
        }

        let start = (byte_offset / 4) as usize;
        let end = start + vertices.len();
        if self.floats.len() < end {
            self.floats.resize(end, 0.0);
        }
        self.floats[start..end].copy_from_slice(vertices);
        Ok(())
    }

    fn draw(&mut self, view: &Matrix4<f32>, projection: &Matrix4<f32>, ranges: &[DrawRange]) {
        self.draw_calls += 1;
        self.last_ranges.clear();
        self.last_ranges.extend_from_slice(ranges);
        self.last_view_projection = Some(*projection * *view);
    }
}
