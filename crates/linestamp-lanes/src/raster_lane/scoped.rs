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

//! Scoped ownership of compute device resources.
//!
//! Each guard destroys its resource when dropped, so every exit path of the
//! parallel lane (success, early `?`, or panic unwinding) releases what it
//! acquired. Release failures are logged and otherwise ignored.

use linestamp_core::raster::{
    BufferDescriptor, BufferId, ComputeDevice, KernelDescriptor, KernelId, ResourceError,
    StorageTextureDescriptor, TextureId,
};

/// A buffer destroyed on drop.
#[derive(Debug)]
pub struct ScopedBuffer<'d> {
    device: &'d dyn ComputeDevice,
    id: BufferId,
}

impl<'d> ScopedBuffer<'d> {
    /// Creates a buffer initialized with `data`.
    pub fn with_data(
        device: &'d dyn ComputeDevice,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> Result<Self, ResourceError> {
        let id = device.create_buffer_with_data(descriptor, data)?;
        Ok(Self { device, id })
    }

    /// The guarded buffer.
    pub fn id(&self) -> BufferId {
        self.id
    }
}

impl Drop for ScopedBuffer<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.device.destroy_buffer(self.id) {
            log::warn!("Failed to release buffer {:?}: {}", self.id, e);
        }
    }
}

/// A storage texture destroyed on drop.
#[derive(Debug)]
pub struct ScopedTexture<'d> {
    device: &'d dyn ComputeDevice,
    id: TextureId,
}

impl<'d> ScopedTexture<'d> {
    /// Creates a storage texture.
    pub fn new(
        device: &'d dyn ComputeDevice,
        descriptor: &StorageTextureDescriptor,
    ) -> Result<Self, ResourceError> {
        let id = device.create_storage_texture(descriptor)?;
        Ok(Self { device, id })
    }

    /// The guarded texture.
    pub fn id(&self) -> TextureId {
        self.id
    }
}

impl Drop for ScopedTexture<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.device.destroy_texture(self.id) {
            log::warn!("Failed to release texture {:?}: {}", self.id, e);
        }
    }
}

/// A compiled kernel destroyed on drop.
#[derive(Debug)]
pub struct ScopedKernel<'d> {
    device: &'d dyn ComputeDevice,
    id: KernelId,
}

impl<'d> ScopedKernel<'d> {
    /// Compiles a kernel.
    pub fn new(
        device: &'d dyn ComputeDevice,
        descriptor: &KernelDescriptor,
    ) -> Result<Self, ResourceError> {
        let id = device.create_kernel(descriptor)?;
        Ok(Self { device, id })
    }

    /// The guarded kernel.
    pub fn id(&self) -> KernelId {
        self.id
    }
}

impl Drop for ScopedKernel<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.device.destroy_kernel(self.id) {
            log::warn!("Failed to release kernel {:?}: {}", self.id, e);
        }
    }
}
