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

//! Loading and saving [`Image`]s from disk.

use std::path::Path;

use anyhow::{Context, Result};
use linestamp_core::{Image, PixelFormat};

/// Decodes an image from memory into an RGBA8 [`Image`].
pub fn decode_image(bytes: &[u8]) -> Result<Image> {
    let img = image::load_from_memory(bytes).context("Failed to decode image from memory")?;
    let rgba_img = img.to_rgba8();
    let (width, height) = rgba_img.dimensions();
    Ok(Image::new(
        width,
        height,
        PixelFormat::Rgba8Unorm,
        rgba_img.into_raw(),
    )?)
}

/// Loads an image file (any format the `image` crate recognizes) as RGBA8.
pub fn load_image(path: impl AsRef<Path>) -> Result<Image> {
    let path = path.as_ref();
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read '{}'", path.display()))?;
    let image = decode_image(&bytes).with_context(|| format!("Failed to load '{}'", path.display()))?;
    log::info!(
        "Loaded '{}' ({}x{})",
        path.display(),
        image.width(),
        image.height()
    );
    Ok(image)
}

/// Saves an image; the file format follows the path's extension.
///
/// BGRA images are swizzled back to RGBA before encoding.
pub fn save_image(image: &Image, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut pixels = image.pixels().to_vec();
    if image.format() == PixelFormat::Bgra8Unorm {
        for texel in pixels.chunks_exact_mut(4) {
            texel.swap(0, 2);
        }
    }
    let buffer = image::RgbaImage::from_raw(image.width(), image.height(), pixels)
        .context("Pixel buffer does not match the image dimensions")?;
    buffer
        .save(path)
        .with_context(|| format!("Failed to save '{}'", path.display()))?;
    log::info!("Saved '{}'", path.display());
    Ok(())
}
