#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Terrain
//!
//! Procedural voxel terrain streaming and chunk meshing, drawn through one shared GPU buffer.
//!
//! The world is an unbounded grid of fixed-size chunks generated on demand from seeded Perlin
//! noise as an observer moves. Chunks near the observer are meshed on background workers
//! (hidden faces culled), and the meshes of chunks inside the view frustum are packed into a
//! single pre-allocated vertex buffer and drawn with one batched call per frame.
//!
//! ## Key Modules
//!
//! * `config` - Engine configuration loaded from JSON
//! * `core` - Concurrency primitives shared with the mesh workers
//! * `engine_state` - Voxels, streaming, meshing, culling and the render backends
//! * `error` - Every failure the engine reports
//!
//! ## Usage
//!
//! ```no_run
//! fn main() {
//!     voxel_terrain::run();
//! }
//! ```

use std::process;

use cgmath::{Point3, Rad};
use log::{error, info};
use web_time::Instant;

use config::EngineConfig;
use engine_state::{
    buffer_state::CpuChunkBuffer, camera_state::ObserverInput, rendering::texture::TextureAtlas,
    EngineState,
};
use error::EngineResult;

pub mod config;
pub mod core;
pub mod engine_state;
pub mod error;

/// Frames in the headless flythrough.
const FLYTHROUGH_FRAMES: u32 = 240;
/// World units the observer moves per frame.
const FLYTHROUGH_SPEED: f32 = 0.75;

/// Runs the headless flythrough and terminates the process on any fatal error.
///
/// The first command-line argument, if present, is a JSON configuration file.
pub fn run() {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized");

    if let Err(err) = flythrough(std::env::args().nth(1)) {
        error!("{err}");
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            error!("  caused by: {cause}");
            source = cause.source();
        }
        process::exit(1);
    }
}

/// Streams terrain along a fixed observer path with the headless backend.
fn flythrough(config_path: Option<String>) -> EngineResult<()> {
    let config = match config_path {
        Some(path) => {
            info!("Loading configuration from {path}");
            EngineConfig::load(path)?
        }
        None => EngineConfig::default(),
    };

    let start = Instant::now();
    let atlas = TextureAtlas::new(config.render.atlas_rows)?;
    let backend = CpuChunkBuffer::new(config.render.gpu_buffer_bytes);
    let mut engine = EngineState::new(&config, atlas, backend)?;

    for frame in 0..FLYTHROUGH_FRAMES {
        let distance = frame as f32 * FLYTHROUGH_SPEED;
        let input = ObserverInput {
            position: Point3::new(distance, 150.0, -distance * 0.5),
            yaw_delta: Rad(0.01),
            pitch_delta: Rad(0.0),
        };
        engine.frame(&input)?;

        if frame % 60 == 0 {
            let stats = engine.chunk_manager.stats();
            info!(
                "Frame {frame}: {} resident, {} candidates, {} visible, {} bytes drawn, {} meshes pending",
                engine.chunk_manager.world().len(),
                stats.candidates,
                stats.visible,
                stats.uploaded_bytes,
                engine.chunk_manager.pending_meshes()
            );
        }
    }

    let installed = engine.chunk_manager.wait_for_pending_meshes();
    let stats = engine.chunk_manager.stats();
    info!(
        "Flythrough finished in {:?}: {} frames, {} streaming passes, {} late meshes, {} draw calls",
        start.elapsed(),
        engine.frames(),
        stats.passes,
        installed,
        engine.chunk_manager.backend().draw_calls()
    );
    Ok(())
}
