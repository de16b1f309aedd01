//! RGBA pixel buffers handed from capture sources to decoders.

use image::{DynamicImage, RgbaImage};

/// A raw RGBA frame with explicit dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw RGBA bytes.
    ///
    /// Returns `None` if `data` is not exactly `width * height * 4` bytes.
    #[must_use]
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        if data.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    /// Convert a decoded image at its native resolution.
    #[must_use]
    pub fn from_image(img: &DynamicImage) -> Self {
        let rgba: RgbaImage = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self {
            width,
            height,
            data: rgba.into_raw(),
        }
    }

    /// Decode encoded image bytes (PNG, BMP, ...) into a buffer.
    pub fn decode_image(bytes: &[u8]) -> Result<Self, image::ImageError> {
        let img = image::load_from_memory(bytes)?;
        Ok(Self::from_image(&img))
    }

    /// Frame width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes, row-major.
    #[must_use]
    pub fn as_rgba(&self) -> &[u8] {
        &self.data
    }

    /// Whether the buffer holds no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Luma of the pixel at `(x, y)`, alpha-composited over white.
    ///
    /// Uses integer BT.601 weights.
    #[must_use]
    pub fn luma(&self, x: usize, y: usize) -> u8 {
        let i = (y * self.width as usize + x) * 4;
        let (r, g, b, a) = (
            u32::from(self.data[i]),
            u32::from(self.data[i + 1]),
            u32::from(self.data[i + 2]),
            u32::from(self.data[i + 3]),
        );
        let y = (299 * r + 587 * g + 114 * b) / 1000;
        // transparent pixels read as paper
        ((y * a + 255 * (255 - a)) / 255) as u8
    }
}
