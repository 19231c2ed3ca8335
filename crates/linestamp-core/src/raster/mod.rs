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

//! Contracts of the line rasterization subsystem.

pub mod device;
pub mod error;
pub mod kernel;
pub mod settings;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use self::device::{
    BufferDescriptor, BufferId, BufferUsage, ComputeAdapterInfo, ComputeBackendType,
    ComputeDevice, KernelBindings, KernelDescriptor, KernelId, KernelSource,
    StorageTextureDescriptor, TextureId,
};
pub use self::error::{KernelError, RasterError, ResourceError};
pub use self::kernel::{KernelParams, KERNEL_WORKGROUP_SIZE, STAMP_LINES_ENTRY_POINT};
pub use self::settings::RasterSettings;

/// The two interchangeable ways of drawing lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RasterStrategy {
    /// One kernel invocation per pixel on a compute device.
    Parallel,
    /// A scanline loop over each segment's bounding box on the calling thread.
    Sequential,
}

impl fmt::Display for RasterStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RasterStrategy::Parallel => write!(f, "Parallel"),
            RasterStrategy::Sequential => write!(f, "Sequential"),
        }
    }
}
