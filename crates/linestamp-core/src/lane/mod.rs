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

//! # Lane Abstraction
//!
//! A **Lane** is a swappable execution strategy for one domain task.
//! Agents own lanes and pick between them at call time; lanes never decide
//! for themselves whether they should run.
//!
//! The hierarchy has two levels:
//!
//! 1. **`Lane`** (this trait): identity and classification shared by all lanes.
//! 2. **Domain traits** extending it with the execution method, such as
//!    `RasterLane: Lane` in `linestamp-lanes`.

use std::any::Any;
use std::fmt;

/// Error type for lane operations.
#[derive(Debug)]
pub enum LaneError {
    /// The lane cannot run in the current environment.
    Unavailable {
        /// The lane that refused to run.
        strategy: &'static str,
        /// Why it is unavailable.
        reason: String,
    },
    /// A domain-specific error occurred during execution.
    ExecutionFailed(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for LaneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaneError::Unavailable { strategy, reason } => {
                write!(f, "Lane '{strategy}' unavailable: {reason}")
            }
            LaneError::ExecutionFailed(e) => write!(f, "Lane execution failed: {e}"),
        }
    }
}

impl std::error::Error for LaneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LaneError::ExecutionFailed(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<crate::image::ImageError> for LaneError {
    fn from(err: crate::image::ImageError) -> Self {
        LaneError::ExecutionFailed(Box::new(err))
    }
}

/// Where a lane does its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaneKind {
    /// Runs on the calling thread.
    Cpu,
    /// Runs through a [`ComputeDevice`](crate::raster::ComputeDevice).
    Compute,
}

impl fmt::Display for LaneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaneKind::Cpu => write!(f, "CPU"),
            LaneKind::Compute => write!(f, "Compute"),
        }
    }
}

/// The base trait for all lanes.
pub trait Lane: Send + Sync {
    /// Human-readable name of the strategy, used in logs and reports.
    fn strategy_name(&self) -> &'static str;

    /// Classification of this lane.
    fn lane_kind(&self) -> LaneKind;

    /// Rough relative cost of running this lane, `1.0` being the baseline.
    fn estimate_cost(&self) -> f32 {
        1.0
    }

    /// Returns `self` as `&dyn Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}
