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

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use linestamp_agents::{FallbackReason, LineRasterAgent};
use linestamp_core::raster::{
    BufferDescriptor, BufferId, ComputeAdapterInfo, ComputeDevice, KernelBindings,
    KernelDescriptor, KernelId, RasterError, RasterSettings, RasterStrategy, ResourceError,
    StorageTextureDescriptor, TextureId,
};
use linestamp_core::{Color, Image, PixelFormat, Polyline};
use linestamp_infra::SoftwareComputeDevice;

// --- Fault injection ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailAt {
    Nothing,
    CreateTexture,
    WriteTexture,
    CreateBuffer,
    CreateKernel,
    Dispatch,
    ReadTexture,
}

/// Wraps the software device and fails one operation on purpose.
#[derive(Debug)]
struct FaultyDevice {
    inner: SoftwareComputeDevice,
    fail_at: FailAt,
    textures_created: AtomicUsize,
    dispatches: AtomicUsize,
}

impl FaultyDevice {
    fn new(fail_at: FailAt) -> Arc<Self> {
        Arc::new(Self {
            inner: SoftwareComputeDevice::new(),
            fail_at,
            textures_created: AtomicUsize::new(0),
            dispatches: AtomicUsize::new(0),
        })
    }

    fn injected(&self, stage: FailAt) -> Result<(), ResourceError> {
        if self.fail_at == stage {
            Err(ResourceError::BackendError(format!("injected failure at {stage:?}")))
        } else {
            Ok(())
        }
    }
}

impl ComputeDevice for FaultyDevice {
    fn adapter_info(&self) -> ComputeAdapterInfo {
        self.inner.adapter_info()
    }

    fn supports_compute(&self) -> bool {
        true
    }

    fn create_kernel(&self, descriptor: &KernelDescriptor) -> Result<KernelId, ResourceError> {
        self.injected(FailAt::CreateKernel)?;
        self.inner.create_kernel(descriptor)
    }

    fn destroy_kernel(&self, id: KernelId) -> Result<(), ResourceError> {
        self.inner.destroy_kernel(id)
    }

    fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> Result<BufferId, ResourceError> {
        self.injected(FailAt::CreateBuffer)?;
        self.inner.create_buffer_with_data(descriptor, data)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        self.inner.destroy_buffer(id)
    }

    fn create_storage_texture(
        &self,
        descriptor: &StorageTextureDescriptor,
    ) -> Result<TextureId, ResourceError> {
        self.textures_created.fetch_add(1, Ordering::SeqCst);
        self.injected(FailAt::CreateTexture)?;
        self.inner.create_storage_texture(descriptor)
    }

    fn write_texture(
        &self,
        id: TextureId,
        data: &[u8],
        bytes_per_row: u32,
    ) -> Result<(), ResourceError> {
        self.injected(FailAt::WriteTexture)?;
        self.inner.write_texture(id, data, bytes_per_row)
    }

    fn read_texture(&self, id: TextureId) -> Result<Vec<u8>, RasterError> {
        if self.fail_at == FailAt::ReadTexture {
            return Err(RasterError::DeviceLost);
        }
        self.inner.read_texture(id)
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        self.inner.destroy_texture(id)
    }

    fn dispatch(
        &self,
        kernel: KernelId,
        bindings: &KernelBindings,
        workgroups: [u32; 3],
    ) -> Result<(), RasterError> {
        self.dispatches.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == FailAt::Dispatch {
            return Err(RasterError::ExecutionFailed("injected dispatch failure".into()));
        }
        self.inner.dispatch(kernel, bindings, workgroups)
    }

    fn live_resource_count(&self) -> usize {
        self.inner.live_resource_count()
    }
}

// --- Helpers ---

fn canvas(width: u32, height: u32) -> Arc<Image> {
    Arc::new(Image::filled(width, height, PixelFormat::Rgba8Unorm, Color::BLACK).unwrap())
}

fn software_agent() -> LineRasterAgent {
    LineRasterAgent::default().with_device(Arc::new(SoftwareComputeDevice::new()))
}

fn painted(source: &Image, result: &Image) -> Vec<(u32, u32)> {
    source.diff_coords(result).collect()
}

/// Every pixel of `a` has a pixel of `b` within one pixel, and vice versa.
fn within_one_pixel(a: &[(u32, u32)], b: &[(u32, u32)]) -> bool {
    let near = |p: &(u32, u32), set: &[(u32, u32)]| {
        set.iter()
            .any(|q| p.0.abs_diff(q.0) <= 1 && p.1.abs_diff(q.1) <= 1)
    };
    a.iter().all(|p| near(p, b)) && b.iter().all(|p| near(p, a))
}

fn horizontal_line() -> Vec<Polyline> {
    vec![Polyline::from_coords(&[(0.1, 0.5), (0.9, 0.5)])]
}

const BOTH: [RasterStrategy; 2] = [RasterStrategy::Parallel, RasterStrategy::Sequential];

// --- Drawing semantics ---

#[test]
fn test_capture_radius_sanity_for_both_strategies() {
    let agent = software_agent();
    let source = canvas(100, 100);
    for strategy in BOTH {
        let (result, report) =
            agent.draw_lines_with_report(&source, &horizontal_line(), 10.0, Some(Color::RED), strategy);
        assert_eq!(report.executed, Some(strategy));
        assert!(report.fallback.is_none());
        assert_eq!(result.texel(50, 50), Some([255, 0, 0, 255]), "{strategy}");
        assert_eq!(result.texel(50, 10), Some([0, 0, 0, 255]), "{strategy}");
    }
}

#[test]
fn test_empty_line_set_returns_source_identity() {
    let agent = software_agent();
    let source = canvas(16, 16);
    for strategy in BOTH {
        let (result, report) = agent.draw_lines_with_report(&source, &[], 3.0, None, strategy);
        assert!(Arc::ptr_eq(&source, &result));
        assert!(report.is_no_op());
    }
}

#[test]
fn test_polylines_shorter_than_two_points_paint_nothing() {
    let agent = software_agent();
    let source = canvas(32, 32);
    let lines = vec![
        Polyline::default(),
        Polyline::from_coords(&[(0.5, 0.5)]),
        Polyline::from_coords(&[(0.2, 0.2), (0.2, 0.2)]),
    ];
    for strategy in BOTH {
        let result = agent.draw_lines(&source, &lines, 8.0, None, strategy);
        assert!(painted(&source, &result).is_empty(), "{strategy}");
    }

    // Nothing drawable survives validation, so the parallel path is a no-op.
    let result = agent.draw_lines(&source, &lines, 8.0, None, RasterStrategy::Parallel);
    assert!(Arc::ptr_eq(&source, &result));
}

#[test]
fn test_repeated_point_matches_its_deduplicated_form() {
    let agent = software_agent();
    let source = canvas(32, 32);
    let repeated = vec![Polyline::from_coords(&[(0.2, 0.2), (0.2, 0.2)])];
    let single = vec![Polyline::from_coords(&[(0.2, 0.2)])];
    for strategy in BOTH {
        let a = agent.draw_lines(&source, &repeated, 8.0, None, strategy);
        let b = agent.draw_lines(&source, &single, 8.0, None, strategy);
        assert_eq!(painted(&source, &a).len(), 0, "{strategy}");
        assert_eq!(a.pixels(), b.pixels(), "{strategy}");
    }
}

#[test]
fn test_removing_duplicate_points_never_changes_output() {
    let agent = software_agent();
    let source = canvas(64, 48);
    let clean = vec![Polyline::from_coords(&[(0.1, 0.2), (0.7, 0.3), (0.4, 0.9)])];
    let duplicated = vec![Polyline::from_coords(&[
        (0.1, 0.2),
        (0.1, 0.2),
        (0.7, 0.3),
        (0.7, 0.3),
        (0.4, 0.9),
    ])];
    for strategy in BOTH {
        let a = agent.draw_lines(&source, &clean, 4.0, None, strategy);
        let b = agent.draw_lines(&source, &duplicated, 4.0, None, strategy);
        assert_eq!(a.pixels(), b.pixels(), "{strategy}");
    }
}

#[test]
fn test_out_of_range_falls_back_and_matches_sequential() {
    let agent = software_agent();
    let source = canvas(50, 50);
    let lines = vec![
        Polyline::from_coords(&[(0.2, 0.2), (0.8, 0.2)]),
        Polyline::from_coords(&[(-0.5, 0.7), (1.5, 0.7)]),
    ];

    let (result, report) =
        agent.draw_lines_with_report(&source, &lines, 3.0, None, RasterStrategy::Parallel);
    let direct = agent.draw_lines(&source, &lines, 3.0, None, RasterStrategy::Sequential);

    assert_eq!(report.fallback, Some(FallbackReason::OutOfRange));
    assert_eq!(report.executed, Some(RasterStrategy::Sequential));
    assert_eq!(result.pixels(), direct.pixels());
    // The clipped line crosses the whole image.
    assert_eq!(result.texel(0, 35), Some([255, 0, 0, 255]));
    assert_eq!(result.texel(49, 35), Some([255, 0, 0, 255]));
}

#[test]
fn test_source_is_never_mutated() {
    let agent = software_agent();
    let source = canvas(40, 40);
    let snapshot = source.pixels().to_vec();
    let batches = vec![
        horizontal_line(),
        vec![Polyline::from_coords(&[(-1.0, -1.0), (2.0, 2.0)])],
        vec![Polyline::from_coords(&[(0.5, 0.5)])],
    ];
    for lines in &batches {
        for strategy in BOTH {
            let _ = agent.draw_lines(&source, lines, 6.0, Some(Color::GREEN), strategy);
            assert_eq!(source.pixels(), snapshot.as_slice());
        }
    }
}

#[test]
fn test_strategies_agree_within_one_pixel() {
    let agent = software_agent();
    let source = canvas(120, 80);
    let lines = vec![
        Polyline::from_coords(&[(0.05, 0.9), (0.3, 0.1), (0.55, 0.85), (0.95, 0.15)]),
        Polyline::from_coords(&[(0.1, 0.5), (0.9, 0.55)]),
    ];
    for thickness in [1.0, 3.0, 7.5] {
        let parallel = agent.draw_lines(&source, &lines, thickness, None, RasterStrategy::Parallel);
        let sequential = agent.draw_lines(&source, &lines, thickness, None, RasterStrategy::Sequential);
        assert!(
            within_one_pixel(&painted(&source, &parallel), &painted(&source, &sequential)),
            "strategies disagree at thickness {thickness}"
        );
    }
}

#[test]
fn test_invalid_thickness_and_missing_color_use_defaults() {
    let settings = RasterSettings {
        default_thickness: 6.0,
        default_color: Color::BLUE,
        ..Default::default()
    };
    let agent = LineRasterAgent::new(settings);
    let source = canvas(30, 30);
    let lines = horizontal_line();
    let expected = agent.draw_lines(&source, &lines, 6.0, Some(Color::BLUE), RasterStrategy::Sequential);

    for thickness in [0.0, -2.0, f32::NAN] {
        let result = agent.draw_lines(&source, &lines, thickness, None, RasterStrategy::Sequential);
        assert_eq!(result.pixels(), expected.pixels());
    }
}

#[test]
fn test_bgra_output_matches_between_strategies() {
    let agent = software_agent();
    let source = Arc::new(Image::filled(24, 24, PixelFormat::Bgra8Unorm, Color::WHITE).unwrap());
    let lines = horizontal_line();
    let color = Color::new(1.0, 0.25, 0.0, 1.0);
    let parallel = agent.draw_lines(&source, &lines, 4.0, Some(color), RasterStrategy::Parallel);
    assert_eq!(parallel.format(), PixelFormat::Bgra8Unorm);
    assert_eq!(parallel.texel(12, 12), Some([0, 64, 255, 255]));
}

#[test]
fn test_preferred_strategy_comes_from_settings() {
    let source = canvas(20, 20);
    let lines = horizontal_line();

    let parallel = software_agent();
    parallel.draw_lines_preferred(&source, &lines, 2.0, None);
    assert_eq!(parallel.report_status().parallel_runs, 1);

    let settings = RasterSettings {
        preferred_strategy: RasterStrategy::Sequential,
        ..Default::default()
    };
    let sequential =
        LineRasterAgent::new(settings).with_device(Arc::new(SoftwareComputeDevice::new()));
    let result = sequential.draw_lines_preferred(&source, &lines, 2.0, None);
    let status = sequential.report_status();
    assert_eq!((status.parallel_runs, status.sequential_runs), (0, 1));
    assert_eq!(result.texel(10, 10), Some([255, 0, 0, 255]));
}

// --- Fallback policy ---

#[test]
fn test_unsupported_device_falls_back() {
    let device = Arc::new(SoftwareComputeDevice::unsupported());
    let agent = LineRasterAgent::default().with_device(device.clone());
    let source = canvas(20, 20);
    let (_, report) =
        agent.draw_lines_with_report(&source, &horizontal_line(), 2.0, None, RasterStrategy::Parallel);
    assert_eq!(report.fallback, Some(FallbackReason::CapabilityUnavailable));
    assert_eq!(report.executed, Some(RasterStrategy::Sequential));
    assert_eq!(device.live_resource_count(), 0);
}

#[test]
fn test_missing_kernel_falls_back() {
    let agent = software_agent().with_kernel(None);
    let source = canvas(20, 20);
    let (result, report) =
        agent.draw_lines_with_report(&source, &horizontal_line(), 2.0, None, RasterStrategy::Parallel);
    assert_eq!(report.fallback, Some(FallbackReason::KernelMissing));
    assert!(!painted(&source, &result).is_empty());
}

#[test]
fn test_every_failure_point_falls_back_and_releases_resources() {
    let source = canvas(40, 40);
    let lines = vec![Polyline::from_coords(&[(0.1, 0.1), (0.9, 0.8)])];
    let expected = LineRasterAgent::default().draw_lines(
        &source,
        &lines,
        5.0,
        None,
        RasterStrategy::Sequential,
    );

    for fail_at in [
        FailAt::CreateTexture,
        FailAt::WriteTexture,
        FailAt::CreateBuffer,
        FailAt::CreateKernel,
        FailAt::Dispatch,
        FailAt::ReadTexture,
    ] {
        let device = FaultyDevice::new(fail_at);
        let agent = LineRasterAgent::default().with_device(device.clone());
        let (result, report) =
            agent.draw_lines_with_report(&source, &lines, 5.0, None, RasterStrategy::Parallel);

        assert!(
            matches!(report.fallback, Some(FallbackReason::ExecutionFailed(_))),
            "{fail_at:?}: {report:?}"
        );
        assert_eq!(report.executed, Some(RasterStrategy::Sequential));
        assert_eq!(result.pixels(), expected.pixels(), "{fail_at:?}");
        assert_eq!(device.live_resource_count(), 0, "{fail_at:?} leaked resources");
        // One parallel attempt per call, never retried.
        assert_eq!(device.textures_created.load(Ordering::SeqCst), 1, "{fail_at:?}");
        assert!(device.dispatches.load(Ordering::SeqCst) <= 1);
    }
}

#[test]
fn test_successful_parallel_run_releases_resources() {
    let device = FaultyDevice::new(FailAt::Nothing);
    let agent = LineRasterAgent::default().with_device(device.clone());
    let source = canvas(33, 17);
    let (_, report) =
        agent.draw_lines_with_report(&source, &horizontal_line(), 3.0, None, RasterStrategy::Parallel);
    assert_eq!(report.executed, Some(RasterStrategy::Parallel));
    assert_eq!(device.dispatches.load(Ordering::SeqCst), 1);
    assert_eq!(device.live_resource_count(), 0);
}

#[test]
fn test_status_counts_outcomes() {
    let agent = LineRasterAgent::default().with_device(FaultyDevice::new(FailAt::Dispatch));
    let source = canvas(10, 10);
    let lines = horizontal_line();

    agent.draw_lines(&source, &[], 2.0, None, RasterStrategy::Parallel);
    agent.draw_lines(&source, &lines, 2.0, None, RasterStrategy::Parallel);
    agent.draw_lines(&source, &lines, 2.0, None, RasterStrategy::Sequential);

    let status = agent.report_status();
    assert_eq!(status.draws, 3);
    assert_eq!(status.no_ops, 1);
    assert_eq!(status.fallbacks, 1);
    assert_eq!(status.parallel_runs, 0);
    assert_eq!(status.sequential_runs, 2);
    assert_eq!(status.health_score, 0.0);
}
