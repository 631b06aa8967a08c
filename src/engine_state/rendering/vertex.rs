//! Vertex layout of chunk meshes.
//!
//! Meshes are flat `f32` lists: three position floats followed by two atlas UV floats per
//! vertex, six vertices per face and no index buffer. `TerrainVertex` names the same layout
//! for the GPU side.

/// Floats per vertex: `x, y, z, u, v`.
pub const FLOATS_PER_VERTEX: usize = 5;

/// Vertices per face: two triangles, no shared vertices.
pub const VERTICES_PER_FACE: usize = 6;

/// Floats per face.
pub const FLOATS_PER_FACE: usize = FLOATS_PER_VERTEX * VERTICES_PER_FACE;

/// Bytes between consecutive vertices in the shared vertex buffer.
pub const VERTEX_STRIDE: u64 = (FLOATS_PER_VERTEX * std::mem::size_of::<f32>()) as u64;

/// One interleaved vertex as stored in the shared vertex buffer.
///
/// # Memory Layout
/// - Position: 3x f32 (12 bytes)
/// - Texture Coordinates: 2x f32 (8 bytes)
///
/// Total size: 20 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TerrainVertex {
    /// World-space position.
    pub position: [f32; 3],
    /// Atlas UV.
    pub tex_coords: [f32; 2],
}

impl TerrainVertex {
    /// Returns the vertex buffer layout description for the shader pipeline.
    ///
    /// # Shader Attributes
    /// - `location = 0`: position (vec3<f32>)
    /// - `location = 1`: tex_coords (vec2<f32>)
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: VERTEX_STRIDE as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}
