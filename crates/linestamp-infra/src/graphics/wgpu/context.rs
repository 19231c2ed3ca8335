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

use anyhow::anyhow;
use anyhow::Result;
use wgpu::Instance;

/// Holds the wgpu state objects required for headless compute.
///
/// No surface is involved: the adapter is picked without a compatible
/// surface and the device is only used for compute passes and copies.
#[derive(Debug)]
pub struct WgpuComputeContext {
    device: wgpu::Device,
    queue: wgpu::Queue,

    /// Adapter name, as reported by the driver.
    pub(crate) adapter_name: String,
    /// Backend the adapter runs on.
    pub(crate) adapter_backend: wgpu::Backend,
    downlevel_flags: wgpu::DownlevelFlags,
    /// Limits the device was requested with.
    pub(crate) device_limits: wgpu::Limits,
}

impl WgpuComputeContext {
    /// Asynchronously picks an adapter and creates a logical device for compute.
    ///
    /// ## Returns
    /// * `Result<Self>` - The initialized context, or an error when no adapter
    ///   is available or device creation fails.
    pub async fn new() -> Result<Self> {
        log::info!("Initializing headless WGPU compute context...");

        // --- 1. Instance and Adapter ---
        let instance = Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| anyhow!("No suitable graphics adapter found: {}", e))?;

        let adapter_info = adapter.get_info();
        log::info!(
            "Using graphics adapter: \"{}\" (Backend: {:?}, Type: {:?})",
            adapter_info.name,
            adapter_info.backend,
            adapter_info.device_type
        );

        // --- 2. Create Logical Device and Command Queue from Adapter ---
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Linestamp Compute Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::default(),
            })
            .await
            .map_err(|e| anyhow!("Failed to create logical device: {}", e))?;
        log::info!("Logical device and command queue created.");

        device.on_uncaptured_error(Box::new(|e| {
            log::error!("WGPU Uncaptured Error: {e:?}");
        }));

        let downlevel_flags = adapter.get_downlevel_capabilities().flags;
        let device_limits = device.limits();
        log::debug!("Downlevel flags: {downlevel_flags:?}");
        log::debug!("Device limits: {device_limits:?}");

        Ok(WgpuComputeContext {
            device,
            queue,
            adapter_name: adapter_info.name,
            adapter_backend: adapter_info.backend,
            downlevel_flags,
            device_limits,
        })
    }

    /// Blocking variant of [`WgpuComputeContext::new`].
    pub fn new_blocking() -> Result<Self> {
        pollster::block_on(Self::new())
    }

    /// Whether the adapter can run a compute kernel writing a storage texture
    /// and reading two storage buffers.
    pub fn supports_compute(&self) -> bool {
        self.downlevel_flags
            .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS)
            && self.device_limits.max_storage_textures_per_shader_stage >= 1
            && self.device_limits.max_storage_buffers_per_shader_stage >= 2
    }

    /// The logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// The queue compute passes and copies are submitted to.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}
