//! wgpu implementation of the chunk render backend.
//!
//! Holds the three buffers a terrain draw needs: the shared vertex buffer, an indirect
//! buffer with one `DrawIndirectArgs` per visible chunk, and a uniform buffer with the
//! camera matrices. Pipeline, shader and bind group creation stay with the caller; the
//! caller binds them and then calls [`WgpuChunkBuffer::encode`] inside its render pass.

use cgmath::Matrix4;
use log::{debug, info};
use wgpu::util::DrawIndirectArgs;

use crate::engine_state::buffer_state::{ChunkRenderBackend, DrawRange};
use crate::error::{EngineError, EngineResult};

/// Name of the shared chunk vertex buffer.
pub const CHUNK_VERTEX_BUFFER_NAME: &str = "Chunk Vertex Buffer";
/// Name of the indirect draw buffer.
pub const CHUNK_INDIRECT_BUFFER_NAME: &str = "Chunk Indirect Buffer";
/// Name of the camera uniform buffer.
pub const CAMERA_BUFFER_NAME: &str = "Camera Buffer";

/// Indirect commands allocated up front; the buffer doubles when a pass needs more.
const INITIAL_INDIRECT_COMMANDS: u64 = 256;

/// GPU-friendly camera matrices.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
}

impl CameraUniform {
    /// Packs a view and projection matrix.
    pub fn new(view: &Matrix4<f32>, projection: &Matrix4<f32>) -> Self {
        CameraUniform {
            view: (*view).into(),
            projection: (*projection).into(),
        }
    }
}

/// Chunk geometry buffers on a wgpu device.
pub struct WgpuChunkBuffer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    vertex_buffer: wgpu::Buffer,
    indirect_buffer: wgpu::Buffer,
    indirect_capacity: u64,
    camera_buffer: wgpu::Buffer,
    capacity: u64,
    draw_count: u32,
}

impl WgpuChunkBuffer {
    /// Allocates the vertex buffer (`capacity` bytes), the indirect buffer and the camera
    /// uniform buffer.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, capacity: u64) -> Self {
        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(CHUNK_VERTEX_BUFFER_NAME),
            size: capacity,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let indirect_buffer = create_indirect_buffer(&device, INITIAL_INDIRECT_COMMANDS);
        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(CAMERA_BUFFER_NAME),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        info!("Allocated {} bytes for chunk vertices", capacity);

        WgpuChunkBuffer {
            device,
            queue,
            vertex_buffer,
            indirect_buffer,
            indirect_capacity: INITIAL_INDIRECT_COMMANDS,
            camera_buffer,
            capacity,
            draw_count: 0,
        }
    }

    /// The camera uniform buffer, for the caller's bind group.
    pub fn camera_buffer(&self) -> &wgpu::Buffer {
        &self.camera_buffer
    }

    /// Number of sub-draws issued by `encode`.
    pub fn draw_count(&self) -> u32 {
        self.draw_count
    }

    /// Records the batched terrain draw into a render pass whose pipeline and bind groups
    /// are already set.
    pub fn encode(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        if self.draw_count == 0 {
            return;
        }
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.multi_draw_indirect(&self.indirect_buffer, 0, self.draw_count);
    }
}

impl ChunkRenderBackend for WgpuChunkBuffer {
    fn capacity_bytes(&self) -> u64 {
        self.capacity
    }

    fn write_vertices(&mut self, byte_offset: u64, vertices: &[f32]) -> EngineResult<()> {
        let data: &[u8] = bytemuck::cast_slice(vertices);
        let required = byte_offset + data.len() as u64;
        if required > self.capacity {
            return Err(EngineError::BufferCapacityExceeded {
                required,
                capacity: self.capacity,
            });
        }
        self.queue.write_buffer(&self.vertex_buffer, byte_offset, data);
        Ok(())
    }

    fn draw(&mut self, view: &Matrix4<f32>, projection: &Matrix4<f32>, ranges: &[DrawRange]) {
        let uniform = CameraUniform::new(view, projection);
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[uniform]));

        let commands = ranges.len() as u64;
        if let Some(grown) = grown_indirect_capacity(self.indirect_capacity, commands) {
            debug!("Growing indirect buffer to {} commands", grown);
            self.indirect_buffer = create_indirect_buffer(&self.device, grown);
            self.indirect_capacity = grown;
        }

        let args = indirect_args(ranges);
        if !args.is_empty() {
            self.queue.write_buffer(&self.indirect_buffer, 0, &args);
        }
        self.draw_count = ranges.len() as u32;
    }
}

/// New indirect buffer size, doubling from `current`, when `needed` commands do not fit.
fn grown_indirect_capacity(current: u64, needed: u64) -> Option<u64> {
    if needed <= current {
        return None;
    }
    let mut grown = current.max(1);
    while grown < needed {
        grown *= 2;
    }
    Some(grown)
}

/// Packs one non-instanced `DrawIndirectArgs` per range, in order.
fn indirect_args(ranges: &[DrawRange]) -> Vec<u8> {
    ranges
        .iter()
        .flat_map(|range| {
            DrawIndirectArgs {
                vertex_count: range.vertex_count,
                instance_count: 1,
                first_vertex: range.first_vertex,
                first_instance: 0,
            }
            .as_bytes()
            .to_vec()
        })
        .collect()
}

fn create_indirect_buffer(device: &wgpu::Device, commands: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(CHUNK_INDIRECT_BUFFER_NAME),
        size: commands * std::mem::size_of::<DrawIndirectArgs>() as u64,
        usage: wgpu::BufferUsages::INDIRECT | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}
