use std::path::Path;

use image::{DynamicImage, ImageFormat};

/// Decoded RGBA8 image data, as handed to the gpu.
#[derive(Clone, PartialEq, Eq)]
pub struct Texture {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bytes_per_row(&self) -> u32 {
        4 * self.width
    }

    pub fn from_image(img: DynamicImage) -> Self {
        let rgba = img.into_rgba8();
        Self {
            width: rgba.width(),
            height: rgba.height(),
            data: rgba.into_raw(),
        }
    }

    /// Decode from in-memory bytes, using `path` only to pick the image format.
    pub fn from_bytes<P: AsRef<Path>>(bytes: &[u8], path: P) -> Result<Self, image::ImageError> {
        let img = match ImageFormat::from_path(path) {
            Ok(format) => image::load_from_memory_with_format(bytes, format)?,
            Err(_) => image::load_from_memory(bytes)?,
        };
        Ok(Self::from_image(img))
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}
