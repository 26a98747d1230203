//! 8-bit display images and image dimensions.

use crate::error::{RenderError, RenderResult};
use serde::{Deserialize, Serialize};

/// Width and height of a render in pixels; both non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: usize,
    pub height: usize,
}

impl Dimensions {
    pub fn new(width: usize, height: usize) -> RenderResult<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Row-major index of pixel `(x, y)`.
    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }
}

/// Tone-mapped RGBA image, row-major from the top-left pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<[u8; 4]>,
}

impl Image {
    /// Get the pixel at (x, y).
    pub fn get(&self, x: usize, y: usize) -> [u8; 4] {
        self.pixels[y * self.width + x]
    }

    /// Raw RGBA bytes (for display or saving).
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Copy into an `image::RgbaImage` for encoding to PNG and friends.
    pub fn to_rgba_image(&self) -> ::image::RgbaImage {
        ::image::RgbaImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            ::image::Rgba(self.get(x as usize, y as usize))
        })
    }
}

/// Map a display value to a byte: `>= 1` saturates, negatives clamp to 0.
#[inline]
pub(crate) fn quantize(f: f64) -> u8 {
    if f >= 1.0 {
        255
    } else if f < 0.0 {
        0
    } else {
        // NaN also lands here and casts to 0.
        (f * 256.0) as u8
    }
}
