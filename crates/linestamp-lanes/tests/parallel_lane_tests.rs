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

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use linestamp_core::raster::{
    BufferDescriptor, BufferId, BufferUsage, ComputeAdapterInfo, ComputeBackendType,
    ComputeDevice, KernelBindings, KernelDescriptor, KernelId, KernelParams, RasterError,
    ResourceError, StorageTextureDescriptor, TextureId,
};
use linestamp_core::{Color, Image, Lane, LaneError, LaneKind, PixelFormat, Polyline};
use linestamp_lanes::shaders::stamp_lines_kernel;
use linestamp_lanes::{ParallelRasterLane, RasterLane};

/// A device that records what it is given. Its "kernel" floods the target
/// with the parameter color so the upload path can be checked end to end.
#[derive(Debug, Default)]
struct RecordingDevice {
    unsupported: bool,
    fail_dispatch: AtomicBool,
    next_id: AtomicUsize,
    buffers: Mutex<HashMap<usize, (BufferUsage, Vec<u8>)>>,
    textures: Mutex<HashMap<usize, Vec<u8>>>,
    kernels: Mutex<HashMap<usize, String>>,
    last_workgroups: Mutex<Option<[u32; 3]>>,
}

impl RecordingDevice {
    fn id(&self) -> usize {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn params(&self) -> Option<KernelParams> {
        let buffers = self.buffers.lock().unwrap();
        buffers
            .values()
            .find(|(usage, _)| *usage == BufferUsage::Uniform)
            .map(|(_, bytes)| bytemuck::pod_read_unaligned(bytes))
    }
}

impl ComputeDevice for RecordingDevice {
    fn adapter_info(&self) -> ComputeAdapterInfo {
        ComputeAdapterInfo {
            name: "Recording".to_string(),
            backend: ComputeBackendType::Software,
        }
    }

    fn supports_compute(&self) -> bool {
        !self.unsupported
    }

    fn create_kernel(&self, descriptor: &KernelDescriptor) -> Result<KernelId, ResourceError> {
        let id = self.id();
        self.kernels
            .lock()
            .unwrap()
            .insert(id, descriptor.entry_point.to_string());
        Ok(KernelId(id))
    }

    fn destroy_kernel(&self, id: KernelId) -> Result<(), ResourceError> {
        self.kernels.lock().unwrap().remove(&id.0);
        Ok(())
    }

    fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> Result<BufferId, ResourceError> {
        let id = self.id();
        self.buffers
            .lock()
            .unwrap()
            .insert(id, (descriptor.usage, data.to_vec()));
        Ok(BufferId(id))
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        self.buffers.lock().unwrap().remove(&id.0);
        Ok(())
    }

    fn create_storage_texture(
        &self,
        descriptor: &StorageTextureDescriptor,
    ) -> Result<TextureId, ResourceError> {
        let id = self.id();
        self.textures
            .lock()
            .unwrap()
            .insert(id, vec![0; descriptor.byte_size()]);
        Ok(TextureId(id))
    }

    fn write_texture(
        &self,
        id: TextureId,
        data: &[u8],
        _bytes_per_row: u32,
    ) -> Result<(), ResourceError> {
        let mut textures = self.textures.lock().unwrap();
        let texels = textures.get_mut(&id.0).ok_or(ResourceError::TextureNotFound(id))?;
        texels.copy_from_slice(data);
        Ok(())
    }

    fn read_texture(&self, id: TextureId) -> Result<Vec<u8>, RasterError> {
        let textures = self.textures.lock().unwrap();
        Ok(textures
            .get(&id.0)
            .cloned()
            .ok_or(ResourceError::TextureNotFound(id))?)
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        self.textures.lock().unwrap().remove(&id.0);
        Ok(())
    }

    fn dispatch(
        &self,
        _kernel: KernelId,
        bindings: &KernelBindings,
        workgroups: [u32; 3],
    ) -> Result<(), RasterError> {
        *self.last_workgroups.lock().unwrap() = Some(workgroups);
        if self.fail_dispatch.load(Ordering::SeqCst) {
            return Err(RasterError::DeviceLost);
        }
        let params = self.params().ok_or(ResourceError::BufferNotFound(bindings.params))?;
        let texel = params.color.map(|c| (c * 255.0).round() as u8);
        let mut textures = self.textures.lock().unwrap();
        let target = textures
            .get_mut(&bindings.target.0)
            .ok_or(ResourceError::TextureNotFound(bindings.target))?;
        for chunk in target.chunks_exact_mut(4) {
            chunk.copy_from_slice(&texel);
        }
        Ok(())
    }

    fn live_resource_count(&self) -> usize {
        self.buffers.lock().unwrap().len()
            + self.textures.lock().unwrap().len()
            + self.kernels.lock().unwrap().len()
    }
}

fn diagonal() -> Vec<Polyline> {
    vec![Polyline::from_coords(&[(0.0, 0.0), (1.0, 1.0)])]
}

#[test]
fn test_lane_identity() {
    let lane = ParallelRasterLane::new(Arc::new(RecordingDevice::default()), stamp_lines_kernel());
    assert_eq!(lane.strategy_name(), "Parallel");
    assert_eq!(lane.lane_kind(), LaneKind::Compute);
    assert!(lane.estimate_cost() < 1.0);
}

#[test]
fn test_upload_and_readback_release_every_resource() {
    let device = Arc::new(RecordingDevice::default());
    let lane = ParallelRasterLane::new(device.clone(), stamp_lines_kernel());
    let image = Image::filled(20, 9, PixelFormat::Rgba8Unorm, Color::BLACK).unwrap();

    let result = lane.rasterize(&image, &diagonal(), 3.0, Color::GREEN).unwrap();

    assert_eq!(result.texel(0, 0), Some([0, 255, 0, 255]));
    assert_eq!(*device.last_workgroups.lock().unwrap(), Some([3, 2, 1]));
    assert_eq!(device.live_resource_count(), 0);
}

#[test]
fn test_color_is_uploaded_in_memory_order() {
    let device = Arc::new(RecordingDevice::default());
    let lane = ParallelRasterLane::new(device.clone(), stamp_lines_kernel());
    let image = Image::filled(4, 4, PixelFormat::Bgra8Unorm, Color::BLACK).unwrap();

    let result = lane
        .rasterize(&image, &diagonal(), 2.0, Color::new(1.0, 0.5, 0.0, 1.0))
        .unwrap();

    // 0.5 quantizes to 128; BGRA stores blue first.
    assert_eq!(result.texel(3, 3), Some([0, 128, 255, 255]));
    assert_eq!(result.color_at(3, 3).map(|c| c.to_rgba8()), Some([255, 128, 0, 255]));
}

#[test]
fn test_unsupported_device_creates_nothing() {
    let device = Arc::new(RecordingDevice {
        unsupported: true,
        ..Default::default()
    });
    let lane = ParallelRasterLane::new(device.clone(), stamp_lines_kernel());
    let image = Image::filled(4, 4, PixelFormat::Rgba8Unorm, Color::BLACK).unwrap();

    let err = lane.rasterize(&image, &diagonal(), 2.0, Color::RED).unwrap_err();
    assert!(matches!(err, LaneError::Unavailable { strategy: "Parallel", .. }));
    assert!(err.to_string().contains("Recording"));
    assert_eq!(device.next_id.load(Ordering::SeqCst), 0);
}

#[test]
fn test_failed_dispatch_still_releases_resources() {
    let device = Arc::new(RecordingDevice::default());
    device.fail_dispatch.store(true, Ordering::SeqCst);
    let lane = ParallelRasterLane::new(device.clone(), stamp_lines_kernel());
    let image = Image::filled(8, 8, PixelFormat::Rgba8Unorm, Color::WHITE).unwrap();

    assert!(lane.rasterize(&image, &diagonal(), 2.0, Color::RED).is_err());
    // Texture, three buffers and the kernel were created, then dropped.
    assert_eq!(device.next_id.load(Ordering::SeqCst), 5);
    assert_eq!(device.live_resource_count(), 0);
}

#[test]
fn test_empty_batch_skips_the_device() {
    let device = Arc::new(RecordingDevice::default());
    let lane = ParallelRasterLane::new(device.clone(), stamp_lines_kernel());
    let image = Image::filled(4, 4, PixelFormat::Rgba8Unorm, Color::BLUE).unwrap();

    let result = lane.rasterize(&image, &[], 2.0, Color::RED).unwrap();
    assert_eq!(result, image);
    assert_eq!(device.next_id.load(Ordering::SeqCst), 0);
}
