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

//! Defines the hierarchy of error types for the rasterization subsystem.

use super::device::{BufferId, KernelId, TextureId};
use crate::lane::LaneError;
use std::fmt;

/// An error related to the creation or compilation of a compute kernel.
#[derive(Debug)]
pub enum KernelError {
    /// The kernel source failed to compile into a backend-specific program.
    CompilationError {
        /// A descriptive label for the kernel.
        label: String,
        /// Detailed error messages from the compiler.
        details: String,
    },
    /// The requested kernel could not be found.
    NotFound {
        /// The ID of the kernel that was not found.
        id: KernelId,
    },
    /// The kernel source does not expose the requested entry point.
    InvalidEntryPoint {
        /// A descriptive label for the kernel.
        label: String,
        /// The entry point name that was not found.
        entry_point: String,
    },
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::CompilationError { label, details } => {
                write!(f, "Kernel compilation failed for '{label}': {details}")
            }
            KernelError::NotFound { id } => {
                write!(f, "Kernel not found for ID: {id:?}")
            }
            KernelError::InvalidEntryPoint { label, entry_point } => {
                write!(f, "Invalid entry point '{entry_point}' for kernel '{label}'")
            }
        }
    }
}

impl std::error::Error for KernelError {}

/// An error related to the creation or use of a device resource.
#[derive(Debug)]
pub enum ResourceError {
    /// A kernel-specific error occurred.
    Kernel(KernelError),
    /// The referenced buffer does not exist.
    BufferNotFound(BufferId),
    /// The referenced texture does not exist.
    TextureNotFound(TextureId),
    /// The descriptor asks for something the device cannot provide.
    InvalidDescriptor(String),
    /// An error originating from the specific backend implementation.
    BackendError(String),
    /// An attempt was made to access a resource out of its bounds.
    OutOfBounds,
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::Kernel(err) => write!(f, "Kernel resource error: {err}"),
            ResourceError::BufferNotFound(id) => write!(f, "Buffer not found: {id:?}"),
            ResourceError::TextureNotFound(id) => write!(f, "Texture not found: {id:?}"),
            ResourceError::InvalidDescriptor(msg) => {
                write!(f, "Invalid resource descriptor: {msg}")
            }
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
            ResourceError::OutOfBounds => write!(f, "Resource access out of bounds."),
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResourceError::Kernel(err) => Some(err),
            _ => None,
        }
    }
}

impl From<KernelError> for ResourceError {
    fn from(err: KernelError) -> Self {
        ResourceError::Kernel(err)
    }
}

/// A high-level error raised by a rasterization strategy or compute device.
#[derive(Debug)]
pub enum RasterError {
    /// The platform has no usable data-parallel execution.
    CapabilityUnavailable(String),
    /// A normalized coordinate fell outside `[0, 1]`.
    OutOfRangeCoordinate,
    /// An error occurred while managing a device resource.
    Resource(ResourceError),
    /// Dispatch or readback failed.
    ExecutionFailed(String),
    /// The device was lost and must be recreated.
    DeviceLost,
}

impl fmt::Display for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RasterError::CapabilityUnavailable(msg) => {
                write!(f, "Parallel execution unavailable: {msg}")
            }
            RasterError::OutOfRangeCoordinate => {
                write!(f, "A line coordinate lies outside the normalized [0, 1] range.")
            }
            RasterError::Resource(err) => {
                write!(f, "Compute resource operation failed: {err}")
            }
            RasterError::ExecutionFailed(msg) => {
                write!(f, "Kernel execution failed: {msg}")
            }
            RasterError::DeviceLost => write!(
                f,
                "The compute device was lost and needs to be reinitialized."
            ),
        }
    }
}

impl std::error::Error for RasterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RasterError::Resource(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for RasterError {
    fn from(err: ResourceError) -> Self {
        RasterError::Resource(err)
    }
}

impl From<KernelError> for RasterError {
    fn from(err: KernelError) -> Self {
        RasterError::Resource(err.into())
    }
}

impl From<RasterError> for LaneError {
    fn from(err: RasterError) -> Self {
        LaneError::ExecutionFailed(Box::new(err))
    }
}

impl From<ResourceError> for LaneError {
    fn from(err: ResourceError) -> Self {
        RasterError::from(err).into()
    }
}
