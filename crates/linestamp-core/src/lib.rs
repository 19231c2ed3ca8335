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

//! Foundational types and contracts for the line-stamping engine.
//!
//! This crate defines *what* the engine works with (images, polylines, colors)
//! and the interfaces every execution strategy and backend must implement.
//! It has no knowledge of any concrete GPU API: backends live in
//! `linestamp-infra`, strategies in `linestamp-lanes`, and the dispatcher in
//! `linestamp-agents`.

#![warn(missing_docs)]

pub mod geometry;
pub mod image;
pub mod lane;
pub mod math;
pub mod raster;

pub use self::geometry::{LineSet, PixelRect, Polyline};
pub use self::image::{Image, ImageError, PixelFormat};
pub use self::lane::{Lane, LaneError, LaneKind};
pub use self::math::{Color, Vec2};
pub use self::raster::{
    ComputeDevice, KernelDescriptor, RasterError, RasterSettings, RasterStrategy, ResourceError,
};
