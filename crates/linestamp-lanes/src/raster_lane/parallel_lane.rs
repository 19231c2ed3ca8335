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

//! The parallel strategy: one kernel invocation per pixel on a compute device.

use std::any::Any;
use std::borrow::Cow;
use std::sync::Arc;

use linestamp_core::raster::kernel::workgroup_count;
use linestamp_core::raster::{
    BufferDescriptor, BufferUsage, ComputeDevice, KernelBindings, KernelDescriptor, KernelParams,
    RasterError, StorageTextureDescriptor,
};
use linestamp_core::{Color, Image, Lane, LaneError, LaneKind, Polyline};

use super::{FlattenedLines, RasterLane, ScopedBuffer, ScopedKernel, ScopedTexture};

/// Draws lines by running a stamping kernel over every pixel of a device-side copy.
///
/// Expects lines that went through [`validate_lines`](super::validate_lines):
/// coordinates in `[0, 1]` and at least two distinct consecutive points per
/// line. Every device resource is scoped to a single call.
#[derive(Debug, Clone)]
pub struct ParallelRasterLane {
    device: Arc<dyn ComputeDevice>,
    kernel: KernelDescriptor,
}

impl ParallelRasterLane {
    /// Creates a lane running `kernel` on `device`.
    pub fn new(device: Arc<dyn ComputeDevice>, kernel: KernelDescriptor) -> Self {
        Self { device, kernel }
    }

    /// The device this lane dispatches to.
    pub fn device(&self) -> &Arc<dyn ComputeDevice> {
        &self.device
    }

    fn run(
        &self,
        image: &Image,
        lines: &[Polyline],
        thickness: f32,
        color: Color,
    ) -> Result<Image, RasterError> {
        let device = self.device.as_ref();
        let flat = FlattenedLines::from_polylines(lines);
        let (width, height) = (image.width(), image.height());

        // 1. Target texture seeded with the source pixels.
        let target = ScopedTexture::new(
            device,
            &StorageTextureDescriptor {
                label: Some(Cow::Borrowed("Line Stamp Target")),
                width,
                height,
            },
        )?;
        device.write_texture(target.id(), image.pixels(), image.bytes_per_row() as u32)?;

        // 2. Line data and parameters.
        let points = ScopedBuffer::with_data(
            device,
            &BufferDescriptor {
                label: Some(Cow::Borrowed("Line Stamp Points")),
                usage: BufferUsage::Storage,
            },
            flat.point_bytes(),
        )?;
        let offsets = ScopedBuffer::with_data(
            device,
            &BufferDescriptor {
                label: Some(Cow::Borrowed("Line Stamp Offsets")),
                usage: BufferUsage::Storage,
            },
            flat.offset_bytes(),
        )?;
        let params = KernelParams {
            line_count: flat.line_count(),
            width,
            height,
            thickness,
            color: image.format().encode(color).map(|c| c as f32 / 255.0),
        };
        let params = ScopedBuffer::with_data(
            device,
            &BufferDescriptor {
                label: Some(Cow::Borrowed("Line Stamp Params")),
                usage: BufferUsage::Uniform,
            },
            bytemuck::bytes_of(&params),
        )?;

        // 3. Dispatch and read back.
        let kernel = ScopedKernel::new(device, &self.kernel)?;
        let bindings = KernelBindings {
            target: target.id(),
            points: points.id(),
            offsets: offsets.id(),
            params: params.id(),
        };
        device.dispatch(kernel.id(), &bindings, workgroup_count(width, height))?;
        let pixels = device.read_texture(target.id())?;

        image.with_pixels(pixels).map_err(|e| {
            RasterError::ExecutionFailed(format!("readback returned a malformed image: {e}"))
        })
    }
}

impl Lane for ParallelRasterLane {
    fn strategy_name(&self) -> &'static str {
        "Parallel"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Compute
    }

    fn estimate_cost(&self) -> f32 {
        0.25
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl RasterLane for ParallelRasterLane {
    fn rasterize(
        &self,
        image: &Image,
        lines: &[Polyline],
        thickness: f32,
        color: Color,
    ) -> Result<Image, LaneError> {
        if lines.is_empty() {
            return Ok(image.clone());
        }
        if !self.device.supports_compute() {
            return Err(LaneError::Unavailable {
                strategy: self.strategy_name(),
                reason: format!(
                    "adapter '{}' cannot run compute kernels",
                    self.device.adapter_info().name
                ),
            });
        }
        Ok(self.run(image, lines, thickness, color)?)
    }
}
