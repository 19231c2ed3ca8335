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

//! Acts as the dispatcher for line drawing.
//!
//! The agent decides *which* lane draws a batch: the parallel lane when the
//! device and kernel allow it and the batch validates, the sequential lane
//! otherwise. It never surfaces an error to the caller; the worst outcome of
//! any failure is a fallback to the sequential lane.

mod agent;
mod report;

pub use agent::*;
pub use report::*;
