//! # Camera State Management
//!
//! This module tracks the observer: where it is, where it looks, and which chunk it is in.
//!
//! ## Core Components
//! - `Camera`: The observer's position and orientation in 3D space
//! - `Projection`: Manages the camera's projection matrix
//! - `CameraState`: Applies per-frame observer input and reports chunk changes

use cgmath::{Deg, Matrix4, Point3, Rad};

use crate::config::RenderConfig;

use super::voxels::chunk::{ChunkDimensions, ChunkPos};

pub mod camera;

/// Observer input for one frame: an absolute world position plus look deltas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserverInput {
    /// Where the observer is now.
    pub position: Point3<f32>,
    /// Change in yaw since the previous frame.
    pub yaw_delta: Rad<f32>,
    /// Change in pitch since the previous frame.
    pub pitch_delta: Rad<f32>,
}

impl ObserverInput {
    /// Input that moves the observer without turning it.
    pub fn at(position: Point3<f32>) -> Self {
        ObserverInput {
            position,
            yaw_delta: Rad(0.0),
            pitch_delta: Rad(0.0),
        }
    }
}

/// Manages the observer camera.
pub struct CameraState {
    /// The current camera position and orientation
    pub camera: camera::Camera,
    /// Camera projection settings
    pub projection: camera::Projection,
    chunk_dimensions: ChunkDimensions,
    chunk_position: ChunkPos,
}

impl CameraState {
    /// Creates the camera at its start pose: above the world origin, looking down -Z.
    pub fn new(render: &RenderConfig, chunk_dimensions: ChunkDimensions) -> Self {
        let camera = camera::Camera::new(Point3::new(0.0, 150.0, 0.0), Deg(-90.0), Deg(0.0));
        let projection = camera::Projection::new(
            render.viewport_width,
            render.viewport_height,
            Deg(render.fov_degrees),
            render.znear,
            render.zfar,
        );
        CameraState {
            chunk_position: ChunkPos::from_world(camera.position, chunk_dimensions),
            camera,
            projection,
            chunk_dimensions,
        }
    }

    /// Applies one frame of observer input.
    ///
    /// # Returns
    /// - `Some(CameraUpdates)` if the observer entered a different chunk
    /// - `None` otherwise
    pub fn update(&mut self, input: &ObserverInput) -> Option<CameraUpdates> {
        self.camera.position = input.position;
        self.camera.rotate(input.yaw_delta, input.pitch_delta);

        let new_chunk_position = ChunkPos::from_world(self.camera.position, self.chunk_dimensions);
        if new_chunk_position == self.chunk_position {
            return None;
        }
        self.chunk_position = new_chunk_position;
        Some(CameraUpdates { new_chunk_position })
    }

    /// The chunk the observer is in.
    pub fn chunk_position(&self) -> ChunkPos {
        self.chunk_position
    }

    /// Current view matrix.
    pub fn view_matrix(&self) -> Matrix4<f32> {
        self.camera.calc_matrix()
    }

    /// Current projection matrix.
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection.calc_matrix()
    }
}

/// Camera changes that affect streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraUpdates {
    /// The chunk the observer moved into.
    pub new_chunk_position: ChunkPos,
}
