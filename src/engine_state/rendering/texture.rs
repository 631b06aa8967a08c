//! Texture atlas description for chunk meshing.
//!
//! The atlas is one square power-of-two image split into `rows x rows` equal cells. Meshing
//! only needs the row count to turn a cell index into UVs; the pixels are kept so the
//! renderer can upload them.

use std::path::Path;

use log::info;

use crate::error::{EngineError, EngineResult};

/// A square image subdivided into `rows x rows` cells addressed by index `0..rows²`.
///
/// Cell `i` sits in column `i % rows` and row `i / rows`, counting rows from the top of the
/// image. UVs follow image rows, so a cell's top edge has the smaller `v`.
#[derive(Clone, Debug)]
pub struct TextureAtlas {
    rows: u32,
    /// Side length of the image in pixels, 0 when no image is attached.
    size: u32,
    /// RGBA8 pixels, row-major from the top-left.
    rgba: Vec<u8>,
}

impl TextureAtlas {
    /// Creates an atlas layout without pixel data.
    ///
    /// # Errors
    /// `InvalidAtlas` if `rows` is zero.
    pub fn new(rows: u32) -> EngineResult<Self> {
        if rows == 0 {
            return Err(EngineError::InvalidAtlas {
                width: 0,
                height: 0,
                rows,
            });
        }
        Ok(TextureAtlas {
            rows,
            size: 0,
            rgba: Vec::new(),
        })
    }

    /// Loads an atlas image from disk.
    ///
    /// # Arguments
    /// * `path` - Image file, any format the `image` crate decodes
    /// * `rows` - Cells per side
    ///
    /// # Errors
    /// * `AtlasLoad` if the file cannot be opened or decoded
    /// * `InvalidAtlas` if the image is not square, not a power of two, or not divisible
    ///   into `rows` cells
    pub fn load(path: impl AsRef<Path>, rows: u32) -> EngineResult<Self> {
        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|source| EngineError::AtlasLoad {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgba8();
        let (width, height) = image.dimensions();

        if rows == 0 || width != height || !width.is_power_of_two() || width % rows != 0 {
            return Err(EngineError::InvalidAtlas {
                width,
                height,
                rows,
            });
        }

        info!(
            "Loaded texture atlas {:?}: {}x{} px, {} cells per side",
            path, width, height, rows
        );
        Ok(TextureAtlas {
            rows,
            size: width,
            rgba: image.into_raw(),
        })
    }

    /// Cells per side.
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Side length of the loaded image in pixels, 0 for a layout-only atlas.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// RGBA8 pixel data, empty for a layout-only atlas.
    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    /// UVs of the four corners of a cell as `[bottom_left, bottom_right, top_right, top_left]`.
    ///
    /// The top-left corner maps to `v = row / rows` and the bottom-left to
    /// `v = (row + 1) / rows`.
    pub fn cell_uvs(&self, index: u32) -> [[f32; 2]; 4] {
        let cell = 1.0 / self.rows as f32;
        let u = (index % self.rows) as f32 * cell;
        let v = (index / self.rows) as f32 * cell;
        [
            [u, v + cell],
            [u + cell, v + cell],
            [u + cell, v],
            [u, v],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_cell_uvs() {
        let atlas = TextureAtlas::new(16).unwrap();
        let [bottom_left, bottom_right, top_right, top_left] = atlas.cell_uvs(0);
        assert_eq!(top_left, [0.0, 0.0]);
        assert_eq!(bottom_left, [0.0, 0.0625]);
        assert_eq!(bottom_right, [0.0625, 0.0625]);
        assert_eq!(top_right, [0.0625, 0.0]);
    }

    #[test]
    fn test_cell_index_wraps_into_rows() {
        let atlas = TextureAtlas::new(4).unwrap();
        // index 6 is column 2, row 1
        let [_, _, _, top_left] = atlas.cell_uvs(6);
        assert_eq!(top_left, [0.5, 0.25]);
    }

    #[test]
    fn test_zero_rows_rejected() {
        assert!(matches!(
            TextureAtlas::new(0),
            Err(EngineError::InvalidAtlas { rows: 0, .. })
        ));
    }

    #[test]
    fn test_missing_image_is_load_error() {
        let result = TextureAtlas::load("/no/such/atlas.png", 16);
        assert!(matches!(result, Err(EngineError::AtlasLoad { .. })));
    }

    #[test]
    fn test_load_checks_image_shape() {
        let dir = std::env::temp_dir();
        let square = dir.join(format!("voxel-terrain-atlas-{}-square.png", std::process::id()));
        let wide = dir.join(format!("voxel-terrain-atlas-{}-wide.png", std::process::id()));
        image::RgbaImage::new(64, 64).save(&square).unwrap();
        image::RgbaImage::new(64, 32).save(&wide).unwrap();

        let atlas = TextureAtlas::load(&square, 16).unwrap();
        assert_eq!(atlas.size(), 64);
        assert_eq!(atlas.rgba().len(), 64 * 64 * 4);
        assert!(matches!(
            TextureAtlas::load(&wide, 16),
            Err(EngineError::InvalidAtlas { width: 64, height: 32, .. })
        ));
        assert!(matches!(
            TextureAtlas::load(&square, 3),
            Err(EngineError::InvalidAtlas { .. })
        ));

        let _ = std::fs::remove_file(square);
        let _ = std::fs::remove_file(wide);
    }
}
