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

//! The `ComputeDevice` trait and the resource descriptors it consumes.
//!
//! A compute device is the data-parallel collaborator of the engine: it owns
//! buffers, storage textures, and compiled kernels, and runs a kernel over a
//! grid of workgroups. Resources are referenced by opaque IDs and must be
//! destroyed explicitly; callers wrap them in scoped guards.

use std::borrow::Cow;
use std::fmt::{self, Debug};

use super::error::{RasterError, ResourceError};

/// An opaque handle to a buffer owned by a [`ComputeDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub usize);

/// An opaque handle to a storage texture owned by a [`ComputeDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub usize);

/// An opaque handle to a compiled kernel owned by a [`ComputeDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KernelId(pub usize);

/// How a buffer is bound to a kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Read-only storage buffer (`var<storage, read>`).
    Storage,
    /// Uniform buffer (`var<uniform>`).
    Uniform,
}

/// Describes a buffer to create.
#[derive(Debug, Clone)]
pub struct BufferDescriptor<'a> {
    /// A debug label.
    pub label: Option<Cow<'a, str>>,
    /// Binding type.
    pub usage: BufferUsage,
}

/// Describes a writable 2D storage texture with RGBA8 UNORM texels.
#[derive(Debug, Clone)]
pub struct StorageTextureDescriptor<'a> {
    /// A debug label.
    pub label: Option<Cow<'a, str>>,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
}

impl StorageTextureDescriptor<'_> {
    /// Size in bytes of the tightly packed texel data.
    pub fn byte_size(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// The source language of a kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelSource {
    /// WGSL source code.
    Wgsl(Cow<'static, str>),
}

/// Describes a compute kernel to compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelDescriptor {
    /// A debug label.
    pub label: Cow<'static, str>,
    /// The kernel program.
    pub source: KernelSource,
    /// The function the dispatch invokes.
    pub entry_point: Cow<'static, str>,
}

impl KernelDescriptor {
    /// Returns `true` if the source declares a function named after the entry point.
    ///
    /// A cheap textual check run before handing the source to a compiler.
    pub fn declares_entry_point(&self) -> bool {
        match &self.source {
            KernelSource::Wgsl(src) => src.contains(&format!("fn {}(", self.entry_point)),
        }
    }
}

/// The resources bound to the line-stamping kernel for one dispatch.
///
/// Binding order matches group 0 of the kernel: target texture, points,
/// offsets, parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelBindings {
    /// Writable image target (binding 0).
    pub target: TextureId,
    /// Flattened point buffer (binding 1).
    pub points: BufferId,
    /// Line offset buffer (binding 2).
    pub offsets: BufferId,
    /// Uniform parameters (binding 3).
    pub params: BufferId,
}

/// The backend a compute device runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComputeBackendType {
    /// Vulkan.
    Vulkan,
    /// Apple Metal.
    Metal,
    /// DirectX 12.
    Dx12,
    /// OpenGL / GLES.
    OpenGl,
    /// WebGPU in a browser.
    WebGpu,
    /// CPU emulation of the kernel.
    Software,
    /// Anything else.
    Unknown,
}

impl fmt::Display for ComputeBackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComputeBackendType::Vulkan => "Vulkan",
            ComputeBackendType::Metal => "Metal",
            ComputeBackendType::Dx12 => "DirectX 12",
            ComputeBackendType::OpenGl => "OpenGL",
            ComputeBackendType::WebGpu => "WebGPU",
            ComputeBackendType::Software => "Software",
            ComputeBackendType::Unknown => "Unknown",
        };
        write!(f, "{name}")
    }
}

/// Identification of the adapter behind a compute device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeAdapterInfo {
    /// The adapter name as reported by the driver.
    pub name: String,
    /// The backend in use.
    pub backend: ComputeBackendType,
}

/// A device able to run data-parallel kernels over 2D images.
pub trait ComputeDevice: Send + Sync + Debug + 'static {
    /// Returns information about the adapter.
    fn adapter_info(&self) -> ComputeAdapterInfo;

    /// Whether the device can run compute kernels that write storage textures.
    ///
    /// Callers must check this before creating any resource.
    fn supports_compute(&self) -> bool;

    /// Compiles a kernel.
    /// ## Arguments
    /// * `descriptor` - The kernel source and entry point.
    /// ## Errors
    /// * `ResourceError::Kernel` - If compilation fails or the entry point is missing.
    fn create_kernel(&self, descriptor: &KernelDescriptor) -> Result<KernelId, ResourceError>;

    /// Releases a compiled kernel.
    fn destroy_kernel(&self, id: KernelId) -> Result<(), ResourceError>;

    /// Creates a buffer initialized with `data`.
    /// ## Arguments
    /// * `descriptor` - Label and binding type.
    /// * `data` - The initial contents; the buffer has exactly this size.
    fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> Result<BufferId, ResourceError>;

    /// Releases a buffer.
    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError>;

    /// Creates a writable RGBA8 storage texture. Its contents are undefined until written.
    fn create_storage_texture(
        &self,
        descriptor: &StorageTextureDescriptor,
    ) -> Result<TextureId, ResourceError>;

    /// Uploads tightly packed texel rows into a storage texture.
    /// ## Arguments
    /// * `id` - The target texture.
    /// * `data` - `height` rows of `bytes_per_row` bytes each.
    /// * `bytes_per_row` - Row stride of `data`; must be `width * 4`.
    fn write_texture(
        &self,
        id: TextureId,
        data: &[u8],
        bytes_per_row: u32,
    ) -> Result<(), ResourceError>;

    /// Downloads a storage texture as tightly packed rows.
    fn read_texture(&self, id: TextureId) -> Result<Vec<u8>, RasterError>;

    /// Releases a storage texture.
    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError>;

    /// Runs `kernel` over a grid of `workgroups` and waits for completion.
    fn dispatch(
        &self,
        kernel: KernelId,
        bindings: &KernelBindings,
        workgroups: [u32; 3],
    ) -> Result<(), RasterError>;

    /// Number of resources currently alive on the device.
    fn live_resource_count(&self) -> usize;
}
