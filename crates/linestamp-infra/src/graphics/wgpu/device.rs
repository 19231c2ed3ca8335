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
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use wgpu::util::DeviceExt;

use linestamp_core::raster::{
    BufferDescriptor, BufferId, BufferUsage, ComputeAdapterInfo, ComputeBackendType,
    ComputeDevice, KernelBindings, KernelDescriptor, KernelError, KernelId, KernelSource,
    RasterError, ResourceError, StorageTextureDescriptor, TextureId,
};

use super::context::WgpuComputeContext;

#[derive(Debug)]
struct WgpuKernelEntry {
    pipeline: Arc<wgpu::ComputePipeline>,
    bind_group_layout: Arc<wgpu::BindGroupLayout>,
}

#[derive(Debug)]
struct WgpuBufferEntry {
    wgpu_buffer: Arc<wgpu::Buffer>,
    size: u64, // To track VRAM accurately on destruction
}

#[derive(Debug)]
struct WgpuTextureEntry {
    wgpu_texture: Arc<wgpu::Texture>,
    width: u32,
    height: u32,
    size: u64, // To track VRAM accurately on destruction
}

/// The internal, non-clonable state of the WgpuComputeDevice.
#[derive(Debug)]
pub struct WgpuComputeDeviceInternal {
    context: WgpuComputeContext,
    kernels: Mutex<HashMap<KernelId, WgpuKernelEntry>>,
    buffers: Mutex<HashMap<BufferId, WgpuBufferEntry>>,
    textures: Mutex<HashMap<TextureId, WgpuTextureEntry>>,

    next_kernel_id: AtomicUsize,
    next_buffer_id: AtomicUsize,
    next_texture_id: AtomicUsize,

    // VRAM Tracking
    vram_allocated_bytes: AtomicUsize,
    vram_peak_bytes: AtomicU64,
}

/// A clonable, thread-safe handle to a headless wgpu compute device.
#[derive(Clone, Debug)]
pub struct WgpuComputeDevice {
    internal: Arc<WgpuComputeDeviceInternal>,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, ResourceError> {
    mutex
        .lock()
        .map_err(|e| ResourceError::BackendError(format!("Failed to lock {what}: {e}")))
}

impl WgpuComputeDevice {
    /// Wraps an initialized context. Resources start empty.
    pub fn new(context: WgpuComputeContext) -> Self {
        Self {
            internal: Arc::new(WgpuComputeDeviceInternal {
                context,
                kernels: Mutex::new(HashMap::new()),
                buffers: Mutex::new(HashMap::new()),
                textures: Mutex::new(HashMap::new()),
                next_kernel_id: AtomicUsize::new(0),
                next_buffer_id: AtomicUsize::new(0),
                next_texture_id: AtomicUsize::new(0),
                vram_allocated_bytes: AtomicUsize::new(0),
                vram_peak_bytes: AtomicU64::new(0),
            }),
        }
    }

    /// Creates a device on the best available adapter, blocking the calling thread.
    pub fn new_blocking() -> anyhow::Result<Self> {
        Ok(Self::new(WgpuComputeContext::new_blocking()?))
    }

    // --- ID Generation Helpers ---

    fn generate_kernel_id(&self) -> KernelId {
        KernelId(self.internal.next_kernel_id.fetch_add(1, Ordering::Relaxed))
    }

    fn generate_buffer_id(&self) -> BufferId {
        BufferId(self.internal.next_buffer_id.fetch_add(1, Ordering::Relaxed))
    }

    fn generate_texture_id(&self) -> TextureId {
        TextureId(
            self.internal
                .next_texture_id
                .fetch_add(1, Ordering::Relaxed),
        )
    }

    fn device(&self) -> &wgpu::Device {
        self.internal.context.device()
    }

    fn queue(&self) -> &wgpu::Queue {
        self.internal.context.queue()
    }

    fn track_allocation(&self, bytes: u64) {
        self.internal
            .vram_allocated_bytes
            .fetch_add(bytes as usize, Ordering::Relaxed);
        let current_vram = self.internal.vram_allocated_bytes.load(Ordering::Relaxed) as u64;
        self.internal
            .vram_peak_bytes
            .fetch_max(current_vram, Ordering::Relaxed);
    }

    fn track_release(&self, bytes: u64) {
        self.internal
            .vram_allocated_bytes
            .fetch_sub(bytes as usize, Ordering::Relaxed);
    }

    /// Bytes currently held by live buffers and textures.
    pub fn vram_allocated_bytes(&self) -> u64 {
        self.internal.vram_allocated_bytes.load(Ordering::Relaxed) as u64
    }

    /// Highest value [`vram_allocated_bytes`](Self::vram_allocated_bytes) has reached.
    pub fn vram_peak_bytes(&self) -> u64 {
        self.internal.vram_peak_bytes.load(Ordering::Relaxed)
    }

    /// Waits for all submitted work to finish.
    fn wait_idle(&self) -> Result<(), RasterError> {
        self.device()
            .poll(wgpu::PollType::Wait)
            .map(|_| ())
            .map_err(|e| RasterError::ExecutionFailed(format!("Device poll failed: {e}")))
    }

    fn texture_entry(
        &self,
        id: TextureId,
    ) -> Result<(Arc<wgpu::Texture>, u32, u32), ResourceError> {
        let textures = lock(&self.internal.textures, "texture map")?;
        let entry = textures.get(&id).ok_or(ResourceError::TextureNotFound(id))?;
        Ok((Arc::clone(&entry.wgpu_texture), entry.width, entry.height))
    }

    fn buffer_entry(&self, id: BufferId) -> Result<Arc<wgpu::Buffer>, ResourceError> {
        let buffers = lock(&self.internal.buffers, "buffer map")?;
        buffers
            .get(&id)
            .map(|entry| Arc::clone(&entry.wgpu_buffer))
            .ok_or(ResourceError::BufferNotFound(id))
    }
}

fn backend_type(backend: wgpu::Backend) -> ComputeBackendType {
    match backend {
        wgpu::Backend::Vulkan => ComputeBackendType::Vulkan,
        wgpu::Backend::Metal => ComputeBackendType::Metal,
        wgpu::Backend::Dx12 => ComputeBackendType::Dx12,
        wgpu::Backend::Gl => ComputeBackendType::OpenGl,
        wgpu::Backend::BrowserWebGpu => ComputeBackendType::WebGpu,
        _ => ComputeBackendType::Unknown,
    }
}

fn texel_copy_info(texture: &wgpu::Texture) -> wgpu::TexelCopyTextureInfo<'_> {
    wgpu::TexelCopyTextureInfo {
        texture,
        mip_level: 0,
        origin: wgpu::Origin3d::ZERO,
        aspect: wgpu::TextureAspect::All,
    }
}

impl ComputeDevice for WgpuComputeDevice {
    fn adapter_info(&self) -> ComputeAdapterInfo {
        ComputeAdapterInfo {
            name: self.internal.context.adapter_name.clone(),
            backend: backend_type(self.internal.context.adapter_backend),
        }
    }

    fn supports_compute(&self) -> bool {
        self.internal.context.supports_compute()
    }

    fn create_kernel(&self, descriptor: &KernelDescriptor) -> Result<KernelId, ResourceError> {
        if !descriptor.declares_entry_point() {
            return Err(KernelError::InvalidEntryPoint {
                label: descriptor.label.to_string(),
                entry_point: descriptor.entry_point.to_string(),
            }
            .into());
        }
        let source = match &descriptor.source {
            KernelSource::Wgsl(src) => wgpu::ShaderSource::Wgsl(src.clone()),
        };

        let device = self.device();
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&*descriptor.label),
            source,
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(&*descriptor.label),
            layout: None,
            module: &module,
            entry_point: Some(&*descriptor.entry_point),
            compilation_options: Default::default(),
            cache: None,
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(KernelError::CompilationError {
                label: descriptor.label.to_string(),
                details: err.to_string(),
            }
            .into());
        }
        let bind_group_layout = pipeline.get_bind_group_layout(0);

        let id = self.generate_kernel_id();
        lock(&self.internal.kernels, "kernel map")?.insert(
            id,
            WgpuKernelEntry {
                pipeline: Arc::new(pipeline),
                bind_group_layout: Arc::new(bind_group_layout),
            },
        );
        log::debug!(
            "WgpuComputeDevice: Created kernel '{}' (entry '{}'). ID: {:?}",
            descriptor.label,
            descriptor.entry_point,
            id
        );
        Ok(id)
    }

    fn destroy_kernel(&self, id: KernelId) -> Result<(), ResourceError> {
        let mut kernels = lock(&self.internal.kernels, "kernel map")?;
        if kernels.remove(&id).is_some() {
            log::debug!("WgpuComputeDevice: Destroyed kernel with ID: {id:?}");
            Ok(())
        } else {
            Err(KernelError::NotFound { id }.into())
        }
    }

    fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> Result<BufferId, ResourceError> {
        if data.is_empty() {
            return Err(ResourceError::InvalidDescriptor(
                "buffers bound to a kernel cannot be empty".to_string(),
            ));
        }
        let usage = match descriptor.usage {
            BufferUsage::Storage => wgpu::BufferUsages::STORAGE,
            BufferUsage::Uniform => wgpu::BufferUsages::UNIFORM,
        };

        let wgpu_buffer = self
            .device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: descriptor.label.as_deref(),
                contents: data,
                usage,
            });

        let id = self.generate_buffer_id();
        let buffer_size = data.len() as u64;
        self.track_allocation(buffer_size);

        lock(&self.internal.buffers, "buffer map")?.insert(
            id,
            WgpuBufferEntry {
                wgpu_buffer: Arc::new(wgpu_buffer),
                size: buffer_size,
            },
        );

        log::debug!(
            "WgpuComputeDevice: Created buffer '{}'. ID: {:?}, size: {} bytes",
            descriptor.label.as_deref().unwrap_or_default(),
            id,
            buffer_size
        );
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        let mut buffers = lock(&self.internal.buffers, "buffer map")?;

        // Remove the buffer from the map and track VRAM usage
        if let Some(entry) = buffers.remove(&id) {
            self.track_release(entry.size);
            log::debug!("WgpuComputeDevice: Destroyed buffer with ID: {id:?}");
            Ok(())
        } else {
            Err(ResourceError::BufferNotFound(id))
        }
    }

    fn create_storage_texture(
        &self,
        descriptor: &StorageTextureDescriptor,
    ) -> Result<TextureId, ResourceError> {
        let max_dim = self.internal.context.device_limits.max_texture_dimension_2d;
        if descriptor.width == 0
            || descriptor.height == 0
            || descriptor.width > max_dim
            || descriptor.height > max_dim
        {
            return Err(ResourceError::InvalidDescriptor(format!(
                "storage texture {}x{} outside the supported range 1..={max_dim}",
                descriptor.width, descriptor.height
            )));
        }

        let device = self.device();
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let wgpu_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: descriptor.label.as_deref(),
            size: wgpu::Extent3d {
                width: descriptor.width,
                height: descriptor.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(ResourceError::BackendError(err.to_string()));
        }

        let id = self.generate_texture_id();
        let size = descriptor.byte_size() as u64;
        self.track_allocation(size);
        lock(&self.internal.textures, "texture map")?.insert(
            id,
            WgpuTextureEntry {
                wgpu_texture: Arc::new(wgpu_texture),
                width: descriptor.width,
                height: descriptor.height,
                size,
            },
        );

        log::debug!(
            "WgpuComputeDevice: Created storage texture '{}'. ID: {:?}, {}x{}",
            descriptor.label.as_deref().unwrap_or_default(),
            id,
            descriptor.width,
            descriptor.height
        );
        Ok(id)
    }

    fn write_texture(
        &self,
        id: TextureId,
        data: &[u8],
        bytes_per_row: u32,
    ) -> Result<(), ResourceError> {
        let (texture, width, height) = self.texture_entry(id)?;
        if bytes_per_row != width * 4 || data.len() != bytes_per_row as usize * height as usize {
            return Err(ResourceError::OutOfBounds);
        }

        self.queue().write_texture(
            texel_copy_info(&texture),
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn read_texture(&self, id: TextureId) -> Result<Vec<u8>, RasterError> {
        let (texture, width, height) = self.texture_entry(id)?;
        let device = self.device();

        // Buffer copies need rows aligned to COPY_BYTES_PER_ROW_ALIGNMENT.
        let unpadded_bytes_per_row = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Line Stamp Readback"),
            size: padded_bytes_per_row as u64 * height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Line Stamp Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            texel_copy_info(&texture),
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue().submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = flume::bounded(1);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.wait_idle()?;

        match receiver.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(RasterError::ExecutionFailed(format!(
                    "Readback mapping failed: {e}"
                )))
            }
            Err(_) => return Err(RasterError::DeviceLost),
        }

        let mut pixels = Vec::with_capacity(unpadded_bytes_per_row as usize * height as usize);
        {
            let mapped = slice.get_mapped_range();
            for row in mapped.chunks(padded_bytes_per_row as usize) {
                pixels.extend_from_slice(&row[..unpadded_bytes_per_row as usize]);
            }
        }
        staging.unmap();
        Ok(pixels)
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        let mut textures = lock(&self.internal.textures, "texture map")?;
        if let Some(entry) = textures.remove(&id) {
            self.track_release(entry.size);
            log::debug!("WgpuComputeDevice: Destroyed texture with ID: {id:?}");
            Ok(())
        } else {
            Err(ResourceError::TextureNotFound(id))
        }
    }

    fn dispatch(
        &self,
        kernel: KernelId,
        bindings: &KernelBindings,
        workgroups: [u32; 3],
    ) -> Result<(), RasterError> {
        if !self.supports_compute() {
            return Err(RasterError::CapabilityUnavailable(format!(
                "adapter '{}' lacks compute shaders or storage bindings",
                self.internal.context.adapter_name
            )));
        }
        let max_groups = self
            .internal
            .context
            .device_limits
            .max_compute_workgroups_per_dimension;
        if workgroups.iter().any(|&n| n > max_groups) {
            return Err(RasterError::ExecutionFailed(format!(
                "dispatch of {workgroups:?} workgroups exceeds the device limit of {max_groups}"
            )));
        }

        let (pipeline, layout) = {
            let kernels = lock(&self.internal.kernels, "kernel map")?;
            let entry = kernels
                .get(&kernel)
                .ok_or(KernelError::NotFound { id: kernel })?;
            (
                Arc::clone(&entry.pipeline),
                Arc::clone(&entry.bind_group_layout),
            )
        };
        let (target, _, _) = self.texture_entry(bindings.target)?;
        let points = self.buffer_entry(bindings.points)?;
        let offsets = self.buffer_entry(bindings.offsets)?;
        let params = self.buffer_entry(bindings.params)?;

        let device = self.device();
        let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Line Stamp Bind Group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&target_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: points.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: offsets.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: params.as_entire_binding(),
                },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Line Stamp Encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Line Stamp Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(workgroups[0], workgroups[1], workgroups[2]);
        }
        self.queue().submit(Some(encoder.finish()));

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(RasterError::ExecutionFailed(err.to_string()));
        }
        self.wait_idle()
    }

    fn live_resource_count(&self) -> usize {
        let count = |len: Result<usize, ResourceError>| len.unwrap_or(0);
        count(lock(&self.internal.kernels, "kernel map").map(|m| m.len()))
            + count(lock(&self.internal.buffers, "buffer map").map(|m| m.len()))
            + count(lock(&self.internal.textures, "texture map").map(|m| m.len()))
    }
}
