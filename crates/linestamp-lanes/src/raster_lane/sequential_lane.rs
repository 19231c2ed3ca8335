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

//! The sequential strategy: a bounding-box scan per segment on the calling thread.

use std::any::Any;

use linestamp_core::geometry::{distance_squared_to_segment, pixel_center};
use linestamp_core::{Color, Image, Lane, LaneError, LaneKind, PixelRect, Polyline, Vec2};

use super::RasterLane;

/// Draws lines by scanning each segment's clipped bounding box.
///
/// Works on raw, unvalidated input: polylines with fewer than two points are
/// skipped, zero-length segments are ignored, out-of-range points are clipped
/// to the image, and segments are painted in order so later ones overwrite
/// earlier ones.
#[derive(Debug, Default, Clone, Copy)]
pub struct SequentialRasterLane;

impl SequentialRasterLane {
    /// Creates a new `SequentialRasterLane`.
    pub fn new() -> Self {
        Self
    }

    /// Paints `lines` into a copy of `image`. Never fails on well-formed images.
    pub fn stamp(
        &self,
        image: &Image,
        lines: &[Polyline],
        thickness: f32,
        color: Color,
    ) -> Result<Image, LaneError> {
        let width = image.width();
        let height = image.height();
        let bytes_per_row = image.bytes_per_row();
        let texel = image.format().encode(color);
        let size = Vec2::new(width as f32, height as f32);
        let radius = thickness * 0.5;
        let radius_sq = radius * radius;

        let mut pixels = image.pixels().to_vec();
        let mut painted = 0usize;

        for line in lines.iter().filter(|line| line.has_segments()) {
            // Repeated points contribute nothing; the neighbouring segments' round ends cover them.
            for (a, b) in line.segments().filter(|(a, b)| a != b) {
                let a = a * size;
                let b = b * size;
                let Some(rect) = PixelRect::around_segment(a, b, radius, width, height) else {
                    continue;
                };
                for (x, y) in rect.coords() {
                    if distance_squared_to_segment(pixel_center(x, y), a, b) <= radius_sq {
                        let offset = y as usize * bytes_per_row + x as usize * 4;
                        pixels[offset..offset + 4].copy_from_slice(&texel);
                        painted += 1;
                    }
                }
            }
        }

        log::trace!(
            "{} lane painted {} pixel writes over {} lines",
            self.strategy_name(),
            painted,
            lines.len()
        );
        Ok(image.with_pixels(pixels)?)
    }
}

impl Lane for SequentialRasterLane {
    fn strategy_name(&self) -> &'static str {
        "Sequential"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Cpu
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl RasterLane for SequentialRasterLane {
    fn rasterize(
        &self,
        image: &Image,
        lines: &[Polyline],
        thickness: f32,
        color: Color,
    ) -> Result<Image, LaneError> {
        self.stamp(image, lines, thickness, color)
    }
}
