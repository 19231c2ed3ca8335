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
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use rayon::prelude::*;

use linestamp_core::raster::kernel::{stamp_pixel, KERNEL_WORKGROUP_SIZE};
use linestamp_core::raster::{
    BufferDescriptor, BufferId, ComputeAdapterInfo, ComputeBackendType, ComputeDevice,
    KernelBindings, KernelDescriptor, KernelError, KernelId, KernelParams, RasterError,
    ResourceError, StorageTextureDescriptor, TextureId, STAMP_LINES_ENTRY_POINT,
};
use linestamp_core::{Color, Vec2};

#[derive(Debug)]
struct SoftwareTexture {
    width: u32,
    height: u32,
    texels: Vec<u8>,
}

/// A compute device that runs the line-stamping kernel on the CPU.
///
/// Only kernels whose entry point is `stamp_lines` can be created; the WGSL
/// source is not interpreted, the Rust port of the kernel runs instead. Rows
/// of the target are processed in parallel on the rayon global pool.
#[derive(Debug)]
pub struct SoftwareComputeDevice {
    supports_compute: bool,
    kernels: Mutex<HashMap<KernelId, String>>,
    buffers: Mutex<HashMap<BufferId, Vec<u8>>>,
    textures: Mutex<HashMap<TextureId, SoftwareTexture>>,
    next_id: AtomicUsize,
}

impl Default for SoftwareComputeDevice {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, ResourceError> {
    mutex
        .lock()
        .map_err(|e| ResourceError::BackendError(format!("Failed to lock {what}: {e}")))
}

impl SoftwareComputeDevice {
    /// Creates a device reporting compute support.
    pub fn new() -> Self {
        Self {
            supports_compute: true,
            kernels: Mutex::new(HashMap::new()),
            buffers: Mutex::new(HashMap::new()),
            textures: Mutex::new(HashMap::new()),
            next_id: AtomicUsize::new(0),
        }
    }

    /// Creates a device that reports no compute support, as a platform
    /// without a usable adapter would.
    pub fn unsupported() -> Self {
        Self {
            supports_compute: false,
            ..Self::new()
        }
    }

    fn next_id(&self) -> usize {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn buffer_bytes(&self, id: BufferId) -> Result<Vec<u8>, ResourceError> {
        lock(&self.buffers, "buffer map")?
            .get(&id)
            .cloned()
            .ok_or(ResourceError::BufferNotFound(id))
    }
}

fn read_points(bytes: &[u8]) -> Vec<Vec2> {
    bytes
        .chunks_exact(std::mem::size_of::<Vec2>())
        .map(bytemuck::pod_read_unaligned::<Vec2>)
        .collect()
}

fn read_offsets(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(std::mem::size_of::<u32>())
        .map(bytemuck::pod_read_unaligned::<u32>)
        .collect()
}

impl ComputeDevice for SoftwareComputeDevice {
    fn adapter_info(&self) -> ComputeAdapterInfo {
        ComputeAdapterInfo {
            name: format!("Rayon ({} threads)", rayon::current_num_threads()),
            backend: ComputeBackendType::Software,
        }
    }

    fn supports_compute(&self) -> bool {
        self.supports_compute
    }

    fn create_kernel(&self, descriptor: &KernelDescriptor) -> Result<KernelId, ResourceError> {
        if descriptor.entry_point != STAMP_LINES_ENTRY_POINT || !descriptor.declares_entry_point() {
            return Err(KernelError::InvalidEntryPoint {
                label: descriptor.label.to_string(),
                entry_point: descriptor.entry_point.to_string(),
            }
            .into());
        }
        let id = KernelId(self.next_id());
        lock(&self.kernels, "kernel map")?.insert(id, descriptor.label.to_string());
        log::debug!("SoftwareComputeDevice: Created kernel '{}'. ID: {:?}", descriptor.label, id);
        Ok(id)
    }

    fn destroy_kernel(&self, id: KernelId) -> Result<(), ResourceError> {
        lock(&self.kernels, "kernel map")?
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| KernelError::NotFound { id }.into())
    }

    fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> Result<BufferId, ResourceError> {
        let id = BufferId(self.next_id());
        lock(&self.buffers, "buffer map")?.insert(id, data.to_vec());
        log::debug!(
            "SoftwareComputeDevice: Created buffer '{}'. ID: {:?}, size: {} bytes",
            descriptor.label.as_deref().unwrap_or_default(),
            id,
            data.len()
        );
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        lock(&self.buffers, "buffer map")?
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::BufferNotFound(id))
    }

    fn create_storage_texture(
        &self,
        descriptor: &StorageTextureDescriptor,
    ) -> Result<TextureId, ResourceError> {
        if descriptor.width == 0 || descriptor.height == 0 {
            return Err(ResourceError::InvalidDescriptor(format!(
                "storage texture {}x{} has no texels",
                descriptor.width, descriptor.height
            )));
        }
        let id = TextureId(self.next_id());
        lock(&self.textures, "texture map")?.insert(
            id,
            SoftwareTexture {
                width: descriptor.width,
                height: descriptor.height,
                texels: vec![0; descriptor.byte_size()],
            },
        );
        Ok(id)
    }

    fn write_texture(
        &self,
        id: TextureId,
        data: &[u8],
        bytes_per_row: u32,
    ) -> Result<(), ResourceError> {
        let mut textures = lock(&self.textures, "texture map")?;
        let texture = textures
            .get_mut(&id)
            .ok_or(ResourceError::TextureNotFound(id))?;
        if bytes_per_row != texture.width * 4 || data.len() != texture.texels.len() {
            return Err(ResourceError::OutOfBounds);
        }
        texture.texels.copy_from_slice(data);
        Ok(())
    }

    fn read_texture(&self, id: TextureId) -> Result<Vec<u8>, RasterError> {
        let textures = lock(&self.textures, "texture map")?;
        let texture = textures
            .get(&id)
            .ok_or(ResourceError::TextureNotFound(id))?;
        Ok(texture.texels.clone())
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        lock(&self.textures, "texture map")?
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::TextureNotFound(id))
    }

    fn dispatch(
        &self,
        kernel: KernelId,
        bindings: &KernelBindings,
        workgroups: [u32; 3],
    ) -> Result<(), RasterError> {
        if !self.supports_compute {
            return Err(RasterError::CapabilityUnavailable(
                "software device created without compute support".to_string(),
            ));
        }
        if !lock(&self.kernels, "kernel map")?.contains_key(&kernel) {
            return Err(KernelError::NotFound { id: kernel }.into());
        }

        let params_bytes = self.buffer_bytes(bindings.params)?;
        if params_bytes.len() != std::mem::size_of::<KernelParams>() {
            return Err(RasterError::ExecutionFailed(format!(
                "parameter buffer holds {} bytes, expected {}",
                params_bytes.len(),
                std::mem::size_of::<KernelParams>()
            )));
        }
        let params: KernelParams = bytemuck::pod_read_unaligned(&params_bytes);
        let points = read_points(&self.buffer_bytes(bindings.points)?);
        let offsets = read_offsets(&self.buffer_bytes(bindings.offsets)?);

        let mut textures = lock(&self.textures, "texture map")?;
        let target = textures
            .get_mut(&bindings.target)
            .ok_or(ResourceError::TextureNotFound(bindings.target))?;

        // Invocations outside the dispatched grid never run.
        let covered_width = target
            .width
            .min(workgroups[0].saturating_mul(KERNEL_WORKGROUP_SIZE)) as usize;
        let covered_height = target
            .height
            .min(workgroups[1].saturating_mul(KERNEL_WORKGROUP_SIZE)) as usize;
        if workgroups[2] == 0 {
            return Ok(());
        }

        let [r, g, b, a] = params.color;
        let texel = Color::new(r, g, b, a).to_rgba8();
        let row_bytes = target.width as usize * 4;

        target
            .texels
            .par_chunks_mut(row_bytes)
            .take(covered_height)
            .enumerate()
            .for_each(|(y, row)| {
                for x in 0..covered_width {
                    if stamp_pixel(x as u32, y as u32, &points, &offsets, &params) {
                        row[x * 4..x * 4 + 4].copy_from_slice(&texel);
                    }
                }
            });
        Ok(())
    }

    fn live_resource_count(&self) -> usize {
        let count = |len: Result<usize, ResourceError>| len.unwrap_or(0);
        count(lock(&self.kernels, "kernel map").map(|m| m.len()))
            + count(lock(&self.buffers, "buffer map").map(|m| m.len()))
            + count(lock(&self.textures, "texture map").map(|m| m.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    use linestamp_core::raster::kernel::workgroup_count;
    use linestamp_core::raster::{BufferUsage, KernelSource};

    fn kernel() -> KernelDescriptor {
        KernelDescriptor {
            label: Cow::Borrowed("stamp_lines"),
            source: KernelSource::Wgsl(Cow::Borrowed(
                "@compute @workgroup_size(8, 8, 1) fn stamp_lines() {}",
            )),
            entry_point: Cow::Borrowed(STAMP_LINES_ENTRY_POINT),
        }
    }

    fn buffer(device: &SoftwareComputeDevice, data: &[u8]) -> BufferId {
        device
            .create_buffer_with_data(
                &BufferDescriptor {
                    label: None,
                    usage: BufferUsage::Storage,
                },
                data,
            )
            .unwrap()
    }

    #[test]
    fn test_rejects_foreign_entry_points() {
        let device = SoftwareComputeDevice::new();
        let mut desc = kernel();
        desc.entry_point = Cow::Borrowed("main");
        assert!(matches!(
            device.create_kernel(&desc),
            Err(ResourceError::Kernel(KernelError::InvalidEntryPoint { .. }))
        ));
        assert_eq!(device.live_resource_count(), 0);
    }

    #[test]
    fn test_dispatch_stamps_line_into_texture() {
        let device = SoftwareComputeDevice::new();
        let texture = device
            .create_storage_texture(&StorageTextureDescriptor {
                label: None,
                width: 16,
                height: 16,
            })
            .unwrap();
        let points = [Vec2::new(0.0, 0.5), Vec2::new(1.0, 0.5)];
        let params = KernelParams {
            line_count: 1,
            width: 16,
            height: 16,
            thickness: 2.0,
            color: [0.0, 0.0, 1.0, 1.0],
        };
        let bindings = KernelBindings {
            target: texture,
            points: buffer(&device, bytemuck::cast_slice(&points)),
            offsets: buffer(&device, bytemuck::cast_slice(&[0u32, 2])),
            params: buffer(&device, bytemuck::bytes_of(&params)),
        };
        let kernel = device.create_kernel(&kernel()).unwrap();
        device
            .dispatch(kernel, &bindings, workgroup_count(16, 16))
            .unwrap();

        let texels = device.read_texture(texture).unwrap();
        let at = |x: usize, y: usize| &texels[(y * 16 + x) * 4..(y * 16 + x) * 4 + 4];
        assert_eq!(at(3, 7), &[0, 0, 255, 255]);
        assert_eq!(at(3, 8), &[0, 0, 255, 255]);
        assert_eq!(at(3, 2), &[0, 0, 0, 0]);
        assert_eq!(device.live_resource_count(), 5);
    }

    #[test]
    fn test_destroy_unknown_resources_fails() {
        let device = SoftwareComputeDevice::new();
        assert!(device.destroy_buffer(BufferId(9)).is_err());
        assert!(device.destroy_texture(TextureId(9)).is_err());
        assert!(device.destroy_kernel(KernelId(9)).is_err());
    }

    #[test]
    fn test_unsupported_device_reports_capability() {
        assert!(!SoftwareComputeDevice::unsupported().supports_compute());
        assert!(SoftwareComputeDevice::new().supports_compute());
        assert_eq!(
            SoftwareComputeDevice::new().adapter_info().backend,
            ComputeBackendType::Software
        );
    }

    #[test]
    fn test_unsupported_device_refuses_dispatch() {
        let device = SoftwareComputeDevice::unsupported();
        let bindings = KernelBindings {
            target: TextureId(0),
            points: BufferId(1),
            offsets: BufferId(2),
            params: BufferId(3),
        };
        assert!(matches!(
            device.dispatch(KernelId(4), &bindings, [1, 1, 1]),
            Err(RasterError::CapabilityUnavailable(_))
        ));
    }
}
