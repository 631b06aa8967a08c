//! # Engine Errors
//!
//! Every failure the terrain engine can report. None of these are retryable: the
//! streaming loop has no I/O on its hot path, so anything that reaches the caller is
//! either a configuration problem or a broken invariant, and the binary terminates on it.

use std::path::PathBuf;

use thiserror::Error;

use crate::engine_state::voxels::chunk::ChunkPos;

/// Errors produced while configuring, generating, meshing or uploading terrain.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The frustum-visible chunks do not fit in the pre-allocated vertex buffer.
    #[error("not enough space allocated for vertices on the gpu: need {required} bytes, have {capacity}")]
    BufferCapacityExceeded {
        /// Bytes the current render list needs.
        required: u64,
        /// Bytes allocated up front.
        capacity: u64,
    },

    /// A height curve control point lies outside [-1, 1].
    #[error("height curve control point x={0} is not between -1 and 1")]
    InvalidControlPoint(f32),

    /// A height curve was not anchored at exactly -1 and +1.
    #[error("height curve must start at x=-1 and end at x=1, got {first} and {last}")]
    InvalidCurveEndpoints {
        /// x of the first control point.
        first: f32,
        /// x of the last control point.
        last: f32,
    },

    /// A height curve was asked for a value outside [-1, 1].
    #[error("interpolation point {0} is not between -1 and 1")]
    InterpolationOutOfRange(f32),

    /// The texture atlas image could not be read.
    #[error("cannot load texture atlas {path:?}")]
    AtlasLoad {
        /// Where the atlas was expected.
        path: PathBuf,
        /// What the image decoder reported.
        #[source]
        source: image::ImageError,
    },

    /// The texture atlas is not a square power-of-two image divisible into `rows` cells.
    #[error("texture atlas must be a square power of two divisible into {rows} rows, got {width}x{height}")]
    InvalidAtlas {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
        /// Requested rows per side.
        rows: u32,
    },

    /// A chunk that the streaming order guarantees to exist was not in the world map.
    #[error("chunk {0:?} is not present in the world")]
    MissingChunk(ChunkPos),

    /// Reading a configuration file failed.
    #[error("cannot read {path:?}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A configuration file was not valid JSON for [`crate::config::EngineConfig`].
    #[error("cannot parse configuration")]
    ConfigParse(#[from] serde_json::Error),

    /// A configuration value is out of its allowed range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Shorthand used across the crate.
pub type EngineResult<T> = Result<T, EngineError>;
