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

//! Line rasterization strategies and the transformations they share.
//!
//! Lines go through three steps before they reach a device:
//! validation ([`validate_lines`]), flattening ([`FlattenedLines`]) and
//! stamping by one of the [`RasterLane`] implementations.

mod flatten;
mod parallel_lane;
mod scoped;
mod sequential_lane;
mod validate;

pub use flatten::*;
pub use parallel_lane::*;
pub use scoped::*;
pub use sequential_lane::*;
pub use validate::*;

use linestamp_core::{Color, Image, Lane, LaneError, Polyline};

/// A strategy that draws a batch of polylines into a copy of an image.
///
/// Implementations must never modify `image`; the result is always a new image
/// of identical dimensions and format. Points are normalized coordinates,
/// `thickness` is in pixels, and a single `color` applies to every line.
pub trait RasterLane: Lane {
    /// Draws `lines` over a copy of `image`.
    ///
    /// # Errors
    ///
    /// Returns a [`LaneError`] if the strategy cannot complete. The caller
    /// decides whether to fall back to another lane.
    fn rasterize(
        &self,
        image: &Image,
        lines: &[Polyline],
        thickness: f32,
        color: Color,
    ) -> Result<Image, LaneError>;
}
