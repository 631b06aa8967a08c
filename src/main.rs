//! # Voxel Terrain Entry Point
//!
//! Runs the headless terrain flythrough.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release -- [config.json]
//! ```

fn main() {
    voxel_terrain::run();
}
