// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The in-memory image the engine reads from and produces.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::math::Color;

/// Memory layout of a single pixel.
///
/// Both layouts are 4 bytes per pixel with 8-bit UNORM channels; they only
/// differ in the order of the color channels in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// Red, green, blue, alpha.
    Rgba8Unorm,
    /// Blue, green, red, alpha.
    Bgra8Unorm,
}

impl PixelFormat {
    /// Number of bytes a single pixel occupies.
    #[inline]
    pub const fn bytes_per_pixel(self) -> usize {
        4
    }

    /// Encodes a color into this format's memory order.
    pub fn encode(self, color: Color) -> [u8; 4] {
        let [r, g, b, a] = color.to_rgba8();
        match self {
            Self::Rgba8Unorm => [r, g, b, a],
            Self::Bgra8Unorm => [b, g, r, a],
        }
    }

    /// Decodes a pixel stored in this format's memory order.
    pub fn decode(self, texel: [u8; 4]) -> Color {
        let [c0, g, c2, a] = texel;
        match self {
            Self::Rgba8Unorm => Color::from_rgba8([c0, g, c2, a]),
            Self::Bgra8Unorm => Color::from_rgba8([c2, g, c0, a]),
        }
    }
}

/// Errors raised when constructing an [`Image`] from raw parts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImageError {
    /// One of the dimensions was zero.
    #[error("image dimensions must be non-zero, got {width}x{height}")]
    ZeroSized {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
    /// The pixel buffer does not match the declared dimensions.
    #[error("pixel buffer holds {actual} bytes, expected {expected} for a {width}x{height} image")]
    BufferSizeMismatch {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
        /// Bytes required by the dimensions and format.
        expected: usize,
        /// Bytes actually provided.
        actual: usize,
    },
}

/// An immutable, tightly packed 8-bit image.
///
/// Rows are stored top to bottom with no padding. The engine never mutates an
/// `Image` in place: drawing always produces a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    format: PixelFormat,
    pixels: Vec<u8>,
}

impl Image {
    /// Wraps an existing pixel buffer.
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: Vec<u8>,
    ) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::ZeroSized { width, height });
        }
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if pixels.len() != expected {
            return Err(ImageError::BufferSizeMismatch {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            pixels,
        })
    }

    /// Creates an image where every pixel has the same color.
    pub fn filled(
        width: u32,
        height: u32,
        format: PixelFormat,
        color: Color,
    ) -> Result<Self, ImageError> {
        let texel = format.encode(color);
        let pixel_count = width as usize * height as usize;
        Self::new(width, height, format, texel.repeat(pixel_count))
    }

    /// Returns a new image with the same dimensions and format but different pixels.
    pub fn with_pixels(&self, pixels: Vec<u8>) -> Result<Self, ImageError> {
        Self::new(self.width, self.height, self.format, pixels)
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel layout.
    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Number of bytes in a single row.
    #[inline]
    pub fn bytes_per_row(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /// The raw pixel bytes, row-major.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Consumes the image and returns its pixel bytes.
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Returns the raw bytes of pixel `(x, y)`, or `None` if it lies outside the image.
    pub fn texel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = y as usize * self.bytes_per_row() + x as usize * self.format.bytes_per_pixel();
        let bytes = self.pixels.get(offset..offset + 4)?;
        Some([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    /// Returns the decoded color of pixel `(x, y)`.
    pub fn color_at(&self, x: u32, y: u32) -> Option<Color> {
        self.texel(x, y).map(|t| self.format.decode(t))
    }

    /// Iterates over the coordinates of every pixel whose bytes differ from `other`.
    ///
    /// Both images must have the same dimensions; mismatched images yield nothing.
    pub fn diff_coords<'a>(&'a self, other: &'a Image) -> impl Iterator<Item = (u32, u32)> + 'a {
        let comparable = self.width == other.width && self.height == other.height;
        let width = self.width;
        self.pixels
            .chunks_exact(4)
            .zip(other.pixels.chunks_exact(4))
            .enumerate()
            .filter(move |(_, (a, b))| comparable && a != b)
            .map(move |(i, _)| (i as u32 % width, i as u32 / width))
    }
}
