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

//! Strategies ("lanes") for drawing thick polylines into images.
//!
//! Both strategies implement [`RasterLane`](raster_lane::RasterLane) and are
//! interchangeable from the caller's point of view. Choosing between them is
//! the dispatcher's job, in `linestamp-agents`.

#![warn(missing_docs)]

pub mod raster_lane;
pub mod shaders;

pub use raster_lane::*;
