//! # Engine State Module
//!
//! The core engine module that ties the observer, the world and the renderer together.
//!
//! ## Key Components
//!
//! * `EngineState` - The main state container for the engine
//! * `buffer_state` - The shared vertex buffer and the render backend seam
//! * `camera_state` - Observer position, orientation and projection
//! * `chunk_manager` - Chunk streaming, mesh requests and frustum culling
//! * `rendering` - Meshing, frustum, texture atlas and the wgpu backend
//! * `task_management` - Background workers for mesh building
//! * `voxels` - Voxel data, chunks and terrain generation
//!
//! ## Frame Flow
//!
//! Each call to [`EngineState::frame`] applies the observer input to the camera, then hands
//! the camera's position and matrices to the chunk manager, which streams, culls, uploads
//! and draws.

use log::debug;

use camera_state::{CameraState, CameraUpdates, ObserverInput};
use chunk_manager::ChunkManager;

use crate::config::EngineConfig;
use crate::error::EngineResult;

use buffer_state::ChunkRenderBackend;
use rendering::texture::TextureAtlas;

pub mod buffer_state;
pub mod camera_state;
pub mod chunk_manager;
pub mod rendering;
pub mod task_management;
pub mod voxels;

/// The main state container for the terrain engine.
///
/// # Examples
///
/// ```
/// use voxel_terrain::config::EngineConfig;
/// use voxel_terrain::engine_state::{
///     buffer_state::CpuChunkBuffer, camera_state::ObserverInput, rendering::texture::TextureAtlas,
///     EngineState,
/// };
///
/// let mut config = EngineConfig::default();
/// config.world.view_distance = 0;
/// let backend = CpuChunkBuffer::new(config.render.gpu_buffer_bytes);
/// let mut engine = EngineState::new(&config, TextureAtlas::new(16).unwrap(), backend).unwrap();
///
/// engine.frame(&ObserverInput::at(cgmath::Point3::new(8.0, 150.0, 8.0))).unwrap();
/// assert_eq!(engine.chunk_manager.world().len(), 9);
/// ```
pub struct EngineState<B: ChunkRenderBackend> {
    /// Camera state managing position, orientation and projection
    pub camera_state: CameraState,
    /// Streaming, culling and drawing
    pub chunk_manager: ChunkManager<B>,
    frames: u64,
}

impl<B: ChunkRenderBackend> EngineState<B> {
    /// Creates a new engine state with all subsystems initialized.
    ///
    /// # Arguments
    /// * `config` - Validated engine configuration
    /// * `atlas` - Texture atlas layout used for mesh UVs
    /// * `backend` - Render backend the shared vertex buffer writes into
    ///
    /// # Errors
    /// `InvalidConfig` if `config` fails [`EngineConfig::validate`].
    pub fn new(config: &EngineConfig, atlas: TextureAtlas, backend: B) -> EngineResult<Self> {
        config.validate()?;
        Ok(EngineState {
            camera_state: CameraState::new(&config.render, config.world.chunk),
            chunk_manager: ChunkManager::new(config, atlas, backend)?,
            frames: 0,
        })
    }

    /// Runs one frame for the given observer input.
    ///
    /// # Errors
    /// Propagates every fatal condition from [`ChunkManager::update`].
    pub fn frame(&mut self, input: &ObserverInput) -> EngineResult<()> {
        if let Some(CameraUpdates { new_chunk_position }) = self.camera_state.update(input) {
            debug!("Observer entered chunk {:?}", new_chunk_position);
        }

        let view = self.camera_state.view_matrix();
        let projection = self.camera_state.projection_matrix();
        self.chunk_manager
            .update(self.camera_state.camera.position, &view, &projection)?;
        self.frames += 1;
        Ok(())
    }

    /// Frames run so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::buffer_state::CpuChunkBuffer;
    use crate::error::EngineError;

    #[test]
    fn test_invalid_projection_is_reported_not_panicked() {
        let mut config = EngineConfig::default();
        config.render.viewport_width = 0;
        let atlas = TextureAtlas::new(16).unwrap();
        let result = EngineState::new(&config, atlas, CpuChunkBuffer::new(1024));
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));

        let mut config = EngineConfig::default();
        config.render.fov_degrees = 180.0;
        let atlas = TextureAtlas::new(16).unwrap();
        let result = EngineState::new(&config, atlas, CpuChunkBuffer::new(1024));
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }
}
