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

//! Polylines and the pixel-space geometry shared by every rasterization strategy.

use serde::{Deserialize, Serialize};

use crate::math::Vec2;

/// An ordered sequence of connected points in normalized texture coordinates.
///
/// A polyline with fewer than two points has no segments and draws nothing.
/// An empty polyline is the representation of an "absent" line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polyline {
    /// The points, in drawing order.
    pub points: Vec<Vec2>,
}

/// The full batch of polylines submitted in one drawing request.
pub type LineSet = Vec<Polyline>;

impl Polyline {
    /// Creates a polyline from a list of points.
    pub fn new(points: Vec<Vec2>) -> Self {
        Self { points }
    }

    /// Creates a polyline from `(u, v)` pairs.
    pub fn from_coords(coords: &[(f32, f32)]) -> Self {
        coords.iter().copied().map(Vec2::from).collect()
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if the polyline has no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns `true` if the polyline has at least one segment.
    #[inline]
    pub fn has_segments(&self) -> bool {
        self.points.len() >= 2
    }

    /// Iterates over consecutive point pairs.
    pub fn segments(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        self.points.windows(2).map(|w| (w[0], w[1]))
    }
}

impl FromIterator<Vec2> for Polyline {
    fn from_iter<I: IntoIterator<Item = Vec2>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Squared distance from `p` to the closed segment `[a, b]`.
///
/// The projection parameter is clamped to `[0, 1]`; a zero-length segment
/// degenerates to the distance to `a`.
pub fn distance_squared_to_segment(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    let t = if len_sq > 0.0 {
        ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    p.distance_squared(a + ab * t)
}

/// An inclusive rectangle of pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelRect {
    /// Leftmost column.
    pub min_x: u32,
    /// Topmost row.
    pub min_y: u32,
    /// Rightmost column (inclusive).
    pub max_x: u32,
    /// Bottom row (inclusive).
    pub max_y: u32,
}

impl PixelRect {
    /// Bounding box of the segment `[a, b]` (pixel space) grown by `radius`,
    /// clipped to a `width` x `height` image.
    ///
    /// Lower bounds are floored and upper bounds ceiled before clipping.
    /// Returns `None` when the box misses the image or the input is not finite.
    pub fn around_segment(
        a: Vec2,
        b: Vec2,
        radius: f32,
        width: u32,
        height: u32,
    ) -> Option<Self> {
        if width == 0 || height == 0 || !a.is_finite() || !b.is_finite() || !radius.is_finite()
        {
            return None;
        }
        let lo = a.min(b);
        let hi = a.max(b);
        let min_x = (lo.x - radius).floor();
        let min_y = (lo.y - radius).floor();
        let max_x = (hi.x + radius).ceil();
        let max_y = (hi.y + radius).ceil();

        let last_x = (width - 1) as f32;
        let last_y = (height - 1) as f32;
        if max_x < 0.0 || max_y < 0.0 || min_x > last_x || min_y > last_y {
            return None;
        }
        Some(Self {
            min_x: min_x.max(0.0) as u32,
            min_y: min_y.max(0.0) as u32,
            max_x: max_x.min(last_x) as u32,
            max_y: max_y.min(last_y) as u32,
        })
    }

    /// Iterates over every `(x, y)` in the rectangle, row by row.
    pub fn coords(&self) -> impl Iterator<Item = (u32, u32)> {
        let Self {
            min_x,
            min_y,
            max_x,
            max_y,
        } = *self;
        (min_y..=max_y).flat_map(move |y| (min_x..=max_x).map(move |x| (x, y)))
    }
}

/// Center of pixel `(x, y)` in pixel space.
#[inline]
pub fn pixel_center(x: u32, y: u32) -> Vec2 {
    Vec2::new(x as f32 + 0.5, y as f32 + 0.5)
}
