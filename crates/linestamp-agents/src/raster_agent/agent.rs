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

//! Defines the LineRasterAgent, the dispatcher between the rasterization lanes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use linestamp_core::raster::{ComputeDevice, KernelDescriptor, RasterSettings, RasterStrategy};
use linestamp_core::{Color, Image, Lane, Polyline};
use linestamp_lanes::shaders::stamp_lines_kernel;
use linestamp_lanes::{validate_lines, ParallelRasterLane, RasterLane, SequentialRasterLane};

use super::report::{DrawReport, FallbackReason, RasterAgentStatus};

#[derive(Debug, Default)]
struct DrawCounters {
    draws: AtomicU64,
    parallel_runs: AtomicU64,
    sequential_runs: AtomicU64,
    fallbacks: AtomicU64,
    no_ops: AtomicU64,
}

impl DrawCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Draws batches of polylines into images, choosing between the parallel and
/// the sequential lane on every call.
///
/// The agent is shareable across threads: drawing only needs `&self`.
#[derive(Debug)]
pub struct LineRasterAgent {
    settings: RasterSettings,
    // Parallel execution collaborators. Either one missing disables the parallel lane.
    device: Option<Arc<dyn ComputeDevice>>,
    kernel: Option<KernelDescriptor>,
    sequential_lane: SequentialRasterLane,
    counters: DrawCounters,
}

impl Default for LineRasterAgent {
    fn default() -> Self {
        Self::new(RasterSettings::default())
    }
}

impl LineRasterAgent {
    /// Creates an agent with the built-in kernel and no compute device.
    ///
    /// Until a device is attached, parallel requests fall back to the sequential lane.
    pub fn new(settings: RasterSettings) -> Self {
        Self {
            settings,
            device: None,
            kernel: Some(stamp_lines_kernel()),
            sequential_lane: SequentialRasterLane::new(),
            counters: DrawCounters::default(),
        }
    }

    /// Attaches the compute device used by the parallel lane.
    pub fn with_device(mut self, device: Arc<dyn ComputeDevice>) -> Self {
        let info = device.adapter_info();
        log::info!(
            "LineRasterAgent: using compute device '{}' ({})",
            info.name,
            info.backend
        );
        self.device = Some(device);
        self
    }

    /// Replaces the kernel run by the parallel lane. `None` disables the parallel lane.
    pub fn with_kernel(mut self, kernel: Option<KernelDescriptor>) -> Self {
        self.kernel = kernel;
        self
    }

    /// The active settings.
    pub fn settings(&self) -> &RasterSettings {
        &self.settings
    }

    /// The attached compute device, if any.
    pub fn device(&self) -> Option<&Arc<dyn ComputeDevice>> {
        self.device.as_ref()
    }

    /// Draws `lines` over a copy of `source` with the given strategy.
    ///
    /// `thickness` is in pixels; non-positive or non-finite values and a
    /// `None` color resolve to the settings' defaults. When `lines` is empty,
    /// or a parallel batch has nothing drawable left after validation, the
    /// returned `Arc` is `source` itself. The source image is never modified.
    pub fn draw_lines(
        &self,
        source: &Arc<Image>,
        lines: &[Polyline],
        thickness: f32,
        color: Option<Color>,
        strategy: RasterStrategy,
    ) -> Arc<Image> {
        self.draw_lines_with_report(source, lines, thickness, color, strategy)
            .0
    }

    /// Same as [`draw_lines`](Self::draw_lines) using the configured preferred strategy.
    pub fn draw_lines_preferred(
        &self,
        source: &Arc<Image>,
        lines: &[Polyline],
        thickness: f32,
        color: Option<Color>,
    ) -> Arc<Image> {
        self.draw_lines(
            source,
            lines,
            thickness,
            color,
            self.settings.preferred_strategy,
        )
    }

    /// Same as [`draw_lines`](Self::draw_lines), also describing which lane ran and why.
    pub fn draw_lines_with_report(
        &self,
        source: &Arc<Image>,
        lines: &[Polyline],
        thickness: f32,
        color: Option<Color>,
        strategy: RasterStrategy,
    ) -> (Arc<Image>, DrawReport) {
        DrawCounters::bump(&self.counters.draws);
        let mut report = DrawReport::new(strategy);

        if lines.is_empty() {
            return self.no_op(source, report);
        }

        let thickness = self.settings.resolve_thickness(thickness);
        let color = self.settings.resolve_color(color);
        log::debug!(
            "LineRasterAgent: drawing {} lines ({}px) on {}x{} with {} strategy",
            lines.len(),
            thickness,
            source.width(),
            source.height(),
            strategy
        );

        if strategy == RasterStrategy::Sequential {
            return self.run_sequential(source, lines, thickness, color, report);
        }

        // 1. Capability and kernel checks.
        let lane = match self.parallel_lane() {
            Ok(lane) => lane,
            Err(reason) => {
                return self.fall_back(source, lines, thickness, color, report, reason);
            }
        };

        // 2. Validation. Out-of-range points send the whole original batch to the sequential lane.
        let drawable = match validate_lines(lines).into_drawable() {
            Ok(drawable) => drawable,
            Err(e) => {
                log::debug!("LineRasterAgent: {e}");
                return self.fall_back(
                    source,
                    lines,
                    thickness,
                    color,
                    report,
                    FallbackReason::OutOfRange,
                );
            }
        };
        if drawable.is_empty() {
            return self.no_op(source, report);
        }

        // 3. A single parallel attempt.
        match lane.rasterize(source, &drawable, thickness, color) {
            Ok(image) => {
                DrawCounters::bump(&self.counters.parallel_runs);
                report.executed = Some(RasterStrategy::Parallel);
                (Arc::new(image), report)
            }
            Err(e) => {
                log::error!("LineRasterAgent: {} lane failed: {}", lane.strategy_name(), e);
                self.fall_back(
                    source,
                    lines,
                    thickness,
                    color,
                    report,
                    FallbackReason::ExecutionFailed(e.to_string()),
                )
            }
        }
    }

    /// A snapshot of the agent's counters.
    pub fn report_status(&self) -> RasterAgentStatus {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        let draws = load(&self.counters.draws);
        let parallel_runs = load(&self.counters.parallel_runs);
        let sequential_runs = load(&self.counters.sequential_runs);
        let fallbacks = load(&self.counters.fallbacks);
        let no_ops = load(&self.counters.no_ops);

        let attempts = parallel_runs + fallbacks;
        let health_score = if attempts == 0 {
            1.0
        } else {
            parallel_runs as f32 / attempts as f32
        };

        RasterAgentStatus {
            draws,
            parallel_runs,
            sequential_runs,
            fallbacks,
            no_ops,
            health_score,
            message: format!(
                "draws={draws} parallel={parallel_runs} sequential={sequential_runs} fallbacks={fallbacks} no_ops={no_ops}"
            ),
        }
    }

    fn parallel_lane(&self) -> Result<ParallelRasterLane, FallbackReason> {
        let device = self
            .device
            .as_ref()
            .filter(|device| device.supports_compute())
            .ok_or(FallbackReason::CapabilityUnavailable)?;
        let kernel = self
            .kernel
            .as_ref()
            .ok_or(FallbackReason::KernelMissing)?;
        Ok(ParallelRasterLane::new(Arc::clone(device), kernel.clone()))
    }

    fn no_op(&self, source: &Arc<Image>, report: DrawReport) -> (Arc<Image>, DrawReport) {
        DrawCounters::bump(&self.counters.no_ops);
        (Arc::clone(source), report)
    }

    fn fall_back(
        &self,
        source: &Arc<Image>,
        lines: &[Polyline],
        thickness: f32,
        color: Color,
        mut report: DrawReport,
        reason: FallbackReason,
    ) -> (Arc<Image>, DrawReport) {
        log::warn!("LineRasterAgent: falling back to sequential drawing: {reason}");
        DrawCounters::bump(&self.counters.fallbacks);
        report.fallback = Some(reason);
        self.run_sequential(source, lines, thickness, color, report)
    }

    fn run_sequential(
        &self,
        source: &Arc<Image>,
        lines: &[Polyline],
        thickness: f32,
        color: Color,
        mut report: DrawReport,
    ) -> (Arc<Image>, DrawReport) {
        match self.sequential_lane.rasterize(source, lines, thickness, color) {
            Ok(image) => {
                DrawCounters::bump(&self.counters.sequential_runs);
                report.executed = Some(RasterStrategy::Sequential);
                (Arc::new(image), report)
            }
            Err(e) => {
                log::error!(
                    "LineRasterAgent: {} lane failed, returning the source: {}",
                    self.sequential_lane.strategy_name(),
                    e
                );
                self.no_op(source, report)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linestamp_core::PixelFormat;

    fn source() -> Arc<Image> {
        Arc::new(Image::filled(10, 10, PixelFormat::Rgba8Unorm, Color::BLACK).unwrap())
    }

    #[test]
    fn test_without_device_parallel_falls_back() {
        let agent = LineRasterAgent::default();
        let lines = vec![Polyline::from_coords(&[(0.1, 0.5), (0.9, 0.5)])];
        let (_, report) =
            agent.draw_lines_with_report(&source(), &lines, 2.0, None, RasterStrategy::Parallel);
        assert_eq!(report.fallback, Some(FallbackReason::CapabilityUnavailable));
        assert_eq!(report.executed, Some(RasterStrategy::Sequential));
    }

    #[test]
    fn test_empty_batch_is_identity() {
        let agent = LineRasterAgent::default();
        let src = source();
        let (out, report) =
            agent.draw_lines_with_report(&src, &[], 2.0, None, RasterStrategy::Sequential);
        assert!(Arc::ptr_eq(&src, &out));
        assert!(report.is_no_op());
    }

    #[test]
    fn test_status_starts_healthy() {
        let status = LineRasterAgent::default().report_status();
        assert_eq!(status.draws, 0);
        assert_eq!(status.health_score, 1.0);
    }

    #[test]
    fn test_fallback_reason_display() {
        assert_eq!(
            FallbackReason::ExecutionFailed("boom".into()).to_string(),
            "parallel execution failed: boom"
        );
    }
}
