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

//! Observability types returned by the [`LineRasterAgent`](super::LineRasterAgent).

use std::fmt;

use linestamp_core::RasterStrategy;

/// Why a parallel request ended up on the sequential lane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// No compute device is configured, or it cannot run compute kernels.
    CapabilityUnavailable,
    /// No kernel is configured.
    KernelMissing,
    /// A point of the batch lies outside `[0, 1]`.
    OutOfRange,
    /// The parallel lane failed; carries the error message.
    ExecutionFailed(String),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::CapabilityUnavailable => {
                write!(f, "parallel execution is not supported")
            }
            FallbackReason::KernelMissing => write!(f, "no kernel resource is configured"),
            FallbackReason::OutOfRange => {
                write!(f, "a coordinate lies outside the normalized range")
            }
            FallbackReason::ExecutionFailed(msg) => write!(f, "parallel execution failed: {msg}"),
        }
    }
}

/// What happened during one draw call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawReport {
    /// The strategy the caller asked for.
    pub requested: RasterStrategy,
    /// The strategy that produced the result, or `None` if the source was returned as is.
    pub executed: Option<RasterStrategy>,
    /// Set when a parallel request fell back to the sequential lane.
    pub fallback: Option<FallbackReason>,
}

impl DrawReport {
    pub(crate) fn new(requested: RasterStrategy) -> Self {
        Self {
            requested,
            executed: None,
            fallback: None,
        }
    }

    /// Returns `true` if no lane ran and the source image was returned.
    pub fn is_no_op(&self) -> bool {
        self.executed.is_none()
    }
}

/// A snapshot of the agent's counters.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterAgentStatus {
    /// Total calls to the draw entry points.
    pub draws: u64,
    /// Calls completed by the parallel lane.
    pub parallel_runs: u64,
    /// Calls completed by the sequential lane, fallbacks included.
    pub sequential_runs: u64,
    /// Parallel requests that fell back to the sequential lane.
    pub fallbacks: u64,
    /// Calls that returned the source untouched.
    pub no_ops: u64,
    /// Share of parallel attempts that succeeded, `1.0` when none were made.
    pub health_score: f32,
    /// Human-readable summary.
    pub message: String,
}
