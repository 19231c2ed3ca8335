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

//! Built-in kernel sources for the parallel rasterization lane.
//!
//! - [`STAMP_LINES_WGSL`] - Per-pixel thick polyline stamping

use std::borrow::Cow;

use linestamp_core::raster::{KernelDescriptor, KernelSource, STAMP_LINES_ENTRY_POINT};

/// Per-pixel polyline stamping kernel.
///
/// Entry point [`STAMP_LINES_ENTRY_POINT`], 8x8 workgroups. Binds the target
/// storage texture, the flattened points, the line offsets, and
/// [`KernelParams`](linestamp_core::raster::KernelParams) in group 0.
pub const STAMP_LINES_WGSL: &str = include_str!("stamp_lines.wgsl");

/// Descriptor of the built-in line stamping kernel.
pub fn stamp_lines_kernel() -> KernelDescriptor {
    KernelDescriptor {
        label: Cow::Borrowed("stamp_lines"),
        source: KernelSource::Wgsl(Cow::Borrowed(STAMP_LINES_WGSL)),
        entry_point: Cow::Borrowed(STAMP_LINES_ENTRY_POINT),
    }
}
