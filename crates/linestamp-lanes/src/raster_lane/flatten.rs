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

//! Flattening of nested polylines into the buffers the kernel reads.

use linestamp_core::{Polyline, Vec2};

/// Concatenated point storage plus a line offset index.
///
/// Line `i` occupies `points[offsets[i] as usize..offsets[i + 1] as usize]`.
/// `offsets` always has `line_count + 1` entries and starts at zero.
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedLines {
    /// Every point of every line, in order.
    pub points: Vec<Vec2>,
    /// Start index of each line, followed by the total point count.
    pub offsets: Vec<u32>,
}

impl FlattenedLines {
    /// Flattens `lines`, keeping them in order.
    pub fn from_polylines(lines: &[Polyline]) -> Self {
        let total: usize = lines.iter().map(Polyline::len).sum();
        let mut points = Vec::with_capacity(total);
        let mut offsets = Vec::with_capacity(lines.len() + 1);

        offsets.push(0);
        for line in lines {
            points.extend_from_slice(&line.points);
            offsets.push(points.len() as u32);
        }

        Self { points, offsets }
    }

    /// Number of lines.
    #[inline]
    pub fn line_count(&self) -> u32 {
        (self.offsets.len() - 1) as u32
    }

    /// Points as raw bytes, ready for upload.
    pub fn point_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.points)
    }

    /// Offsets as raw bytes, ready for upload.
    pub fn offset_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.offsets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_index_each_line() {
        let lines = vec![
            Polyline::from_coords(&[(0.0, 0.0), (1.0, 1.0)]),
            Polyline::from_coords(&[(0.2, 0.2), (0.3, 0.3), (0.4, 0.4)]),
        ];
        let flat = FlattenedLines::from_polylines(&lines);
        assert_eq!(flat.line_count(), 2);
        assert_eq!(flat.offsets, vec![0, 2, 5]);
        assert_eq!(flat.points.len(), 5);
        assert_eq!(flat.points[2], Vec2::new(0.2, 0.2));
    }

    #[test]
    fn test_empty_batch() {
        let flat = FlattenedLines::from_polylines(&[]);
        assert_eq!(flat.line_count(), 0);
        assert_eq!(flat.offsets, vec![0]);
        assert!(flat.point_bytes().is_empty());
    }

    #[test]
    fn test_byte_views_match_gpu_layout() {
        let lines = vec![Polyline::from_coords(&[(0.25, 0.5), (0.75, 0.5)])];
        let flat = FlattenedLines::from_polylines(&lines);
        assert_eq!(flat.point_bytes().len(), 16);
        assert_eq!(flat.offset_bytes().len(), 8);
        let floats: &[f32] = bytemuck::cast_slice(flat.point_bytes());
        assert_eq!(floats, &[0.25, 0.5, 0.75, 0.5]);
    }
}
