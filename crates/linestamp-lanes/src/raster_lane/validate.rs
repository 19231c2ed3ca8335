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

//! Pre-flight cleaning of a line batch for the parallel lane.

use linestamp_core::{Polyline, RasterError};

/// The outcome of [`validate_lines`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedLines {
    /// Surviving polylines, each with at least two points and no consecutive duplicates.
    pub lines: Vec<Polyline>,
    /// Set when any point of a polyline with at least two points lies outside `[0, 1]`.
    ///
    /// The flag applies to the whole batch, not to individual lines.
    pub out_of_range: bool,
}

impl ValidatedLines {
    /// Returns `true` if no polyline survived.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The lines the parallel lane may draw.
    ///
    /// # Errors
    ///
    /// [`RasterError::OutOfRangeCoordinate`] if any point left `[0, 1]`.
    pub fn into_drawable(self) -> Result<Vec<Polyline>, RasterError> {
        if self.out_of_range {
            Err(RasterError::OutOfRangeCoordinate)
        } else {
            Ok(self.lines)
        }
    }
}

/// Cleans a batch of polylines.
///
/// Polylines with fewer than two points are dropped before their coordinates
/// are inspected, so a lone out-of-range point does not flag the batch. Exact
/// consecutive duplicates are collapsed, and lines left with fewer than two
/// points are dropped.
pub fn validate_lines(lines: &[Polyline]) -> ValidatedLines {
    let mut validated = ValidatedLines::default();

    for line in lines.iter().filter(|line| line.has_segments()) {
        if !line.points.iter().all(|p| p.is_normalized_coordinate()) {
            validated.out_of_range = true;
        }

        let mut points = line.points.clone();
        points.dedup();
        if points.len() >= 2 {
            validated.lines.push(Polyline::new(points));
        }
    }

    validated
}
