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

//! Defines the settings that control how lines are drawn.

use serde::{Deserialize, Serialize};

use super::RasterStrategy;
use crate::math::Color;

/// Settings for the line rasterizer.
///
/// Every field has a default, so a partial RON file only overrides what it names.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterSettings {
    /// Thickness in pixels used when a call passes a non-positive or non-finite value.
    pub default_thickness: f32,
    /// Color used when a call passes no color.
    pub default_color: Color,
    /// Strategy tried first when a caller does not ask for one.
    pub preferred_strategy: RasterStrategy,
}

impl Default for RasterSettings {
    fn default() -> Self {
        Self {
            default_thickness: 4.0,
            default_color: Color::RED,
            preferred_strategy: RasterStrategy::Parallel,
        }
    }
}

impl RasterSettings {
    /// Resolves a caller-provided thickness, substituting the default for
    /// values that cannot describe a visible line.
    pub fn resolve_thickness(&self, thickness: f32) -> f32 {
        if thickness.is_finite() && thickness > 0.0 {
            thickness
        } else {
            self.default_thickness
        }
    }

    /// Resolves a caller-provided color.
    pub fn resolve_color(&self, color: Option<Color>) -> Color {
        color.unwrap_or(self.default_color)
    }
}
