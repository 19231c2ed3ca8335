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

//! Host-side view of the line-stamping kernel.
//!
//! [`stamp_pixel`] is the per-invocation body of the `stamp_lines` WGSL entry
//! point written in Rust. CPU backends execute it directly; GPU backends run
//! the WGSL source, which must keep the same coverage rules.

use crate::math::Vec2;

/// Name of the kernel's entry point.
pub const STAMP_LINES_ENTRY_POINT: &str = "stamp_lines";

/// Edge length of the square workgroup the kernel is compiled for.
pub const KERNEL_WORKGROUP_SIZE: u32 = 8;

/// Uniform parameters of the kernel (binding 3).
///
/// Layout matches the WGSL struct: four 32-bit scalars followed by a
/// 16-byte aligned `vec4<f32>`, for 32 bytes total.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct KernelParams {
    /// Number of polylines; the offset buffer holds `line_count + 1` entries.
    pub line_count: u32,
    /// Target width in pixels.
    pub width: u32,
    /// Target height in pixels.
    pub height: u32,
    /// Line thickness in pixels.
    pub thickness: f32,
    /// Color to store, already in the target's memory channel order.
    pub color: [f32; 4],
}

/// Number of workgroups needed to cover a `width` x `height` target.
pub fn workgroup_count(width: u32, height: u32) -> [u32; 3] {
    [
        width.div_ceil(KERNEL_WORKGROUP_SIZE),
        height.div_ceil(KERNEL_WORKGROUP_SIZE),
        1,
    ]
}

/// Returns `true` if pixel `(x, y)` is covered by any line.
///
/// Lines are tested in order and the first covering segment wins.
/// `points` are normalized coordinates; `offsets[i]..offsets[i + 1]` is the
/// point range of line `i`. Out-of-image pixels and out-of-range offsets are
/// never covered.
pub fn stamp_pixel(
    x: u32,
    y: u32,
    points: &[Vec2],
    offsets: &[u32],
    params: &KernelParams,
) -> bool {
    if x >= params.width || y >= params.height {
        return false;
    }
    let size = Vec2::new(params.width as f32, params.height as f32);
    let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
    let radius = params.thickness * 0.5;
    let radius_sq = radius * radius;

    for line in 0..params.line_count as usize {
        let (Some(&start), Some(&end)) = (offsets.get(line), offsets.get(line + 1)) else {
            return false;
        };
        let (start, end) = (start as usize, end as usize);
        if end > points.len() || end < start + 2 {
            continue;
        }
        for i in start..end - 1 {
            let a = points[i] * size;
            let b = points[i + 1] * size;
            if segment_covers(p, a, b, radius_sq, i == start, i + 2 == end) {
                return true;
            }
        }
    }
    false
}

/// Coverage test of one segment: round caps on the first and last segment of
/// a line, then the clamped projection onto the segment.
fn segment_covers(
    p: Vec2,
    a: Vec2,
    b: Vec2,
    radius_sq: f32,
    is_first: bool,
    is_last: bool,
) -> bool {
    let seg = b - a;
    let dir = seg.normalize();

    if is_first {
        let to_p = p - a;
        if to_p.length_squared() <= radius_sq && to_p.dot(dir) >= 0.0 {
            return true;
        }
    }
    if is_last {
        let to_p = p - b;
        if to_p.length_squared() <= radius_sq && to_p.dot(-dir) >= 0.0 {
            return true;
        }
    }

    let t = (p - a).dot(dir).clamp(0.0, seg.length());
    let closest = a + dir * t;
    p.distance_squared(closest) <= radius_sq
}
