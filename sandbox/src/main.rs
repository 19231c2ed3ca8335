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

//! Draws a line scene described in RON over an image and saves the result.
//!
//! ```text
//! cargo run -p sandbox -- --scene sandbox/scenes/zigzag.ron --output out.png
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use linestamp_agents::LineRasterAgent;
use linestamp_core::{Color, Image, PixelFormat, Polyline, RasterSettings, RasterStrategy};
use linestamp_infra::{image_io, SoftwareComputeDevice, WgpuComputeDevice};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    Parallel,
    Sequential,
}

impl From<StrategyArg> for RasterStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Parallel => RasterStrategy::Parallel,
            StrategyArg::Sequential => RasterStrategy::Sequential,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    /// GPU compute through wgpu, software if no adapter is found.
    Wgpu,
    /// The kernel run on the CPU thread pool.
    Software,
    /// No compute device; parallel requests fall back.
    None,
}

#[derive(Debug, Parser)]
#[command(version, about = "Stamp polylines into an image")]
struct Args {
    /// RON file describing the lines to draw.
    #[arg(long)]
    scene: PathBuf,

    /// Image to draw on. A blank canvas is used when omitted.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Where to write the result (format from the extension).
    #[arg(long, default_value = "linestamp.png")]
    output: PathBuf,

    /// Canvas width when no input image is given.
    #[arg(long, default_value_t = 512)]
    width: u32,

    /// Canvas height when no input image is given.
    #[arg(long, default_value_t = 512)]
    height: u32,

    /// Overrides the strategy from the settings.
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    #[arg(long, value_enum, default_value = "wgpu")]
    backend: BackendArg,

    /// RON file with raster settings.
    #[arg(long)]
    settings: Option<PathBuf>,
}

/// A batch of lines as stored on disk.
#[derive(Debug, Deserialize)]
struct LineScene {
    #[serde(default)]
    thickness: Option<f32>,
    /// `#RRGGBB` or `#RRGGBBAA`.
    #[serde(default)]
    color: Option<String>,
    lines: Vec<Vec<(f32, f32)>>,
}

impl LineScene {
    fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scene {}", path.display()))?;
        ron::from_str(&text).with_context(|| format!("Failed to parse scene {}", path.display()))
    }

    fn polylines(&self) -> Vec<Polyline> {
        self.lines
            .iter()
            .map(|coords| Polyline::from_coords(coords))
            .collect()
    }

    fn color(&self) -> Result<Option<Color>> {
        self.color
            .as_deref()
            .map(|hex| Color::from_hex(hex).ok_or_else(|| anyhow!("Invalid color '{hex}'")))
            .transpose()
    }
}

fn load_settings(path: Option<&Path>) -> Result<RasterSettings> {
    let Some(path) = path else {
        return Ok(RasterSettings::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings {}", path.display()))?;
    ron::from_str(&text).with_context(|| format!("Failed to parse settings {}", path.display()))
}

fn build_agent(settings: RasterSettings, backend: BackendArg) -> LineRasterAgent {
    let agent = LineRasterAgent::new(settings);
    match backend {
        BackendArg::None => agent,
        BackendArg::Software => agent.with_device(Arc::new(SoftwareComputeDevice::new())),
        BackendArg::Wgpu => match WgpuComputeDevice::new_blocking() {
            Ok(device) => agent.with_device(Arc::new(device)),
            Err(e) => {
                log::warn!("wgpu device unavailable ({e:#}), using the software device");
                agent.with_device(Arc::new(SoftwareComputeDevice::new()))
            }
        },
    }
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info"))
        .filter_module("wgpu_hal", log::LevelFilter::Error)
        .filter_module("wgpu_core", log::LevelFilter::Error)
        .init();

    let args = Args::parse();
    let mut settings = load_settings(args.settings.as_deref())?;
    if let Some(strategy) = args.strategy {
        settings.preferred_strategy = strategy.into();
    }

    let scene = LineScene::load(&args.scene)?;
    let source = match &args.input {
        Some(path) => image_io::load_image(path)?,
        None => Image::filled(args.width, args.height, PixelFormat::Rgba8Unorm, Color::WHITE)?,
    };
    let source = Arc::new(source);

    let agent = build_agent(settings, args.backend);
    let result = agent.draw_lines_preferred(
        &source,
        &scene.polylines(),
        scene.thickness.unwrap_or(0.0),
        scene.color()?,
    );
    if Arc::ptr_eq(&source, &result) {
        log::info!("Nothing to draw, writing the source unchanged");
    }
    log::info!("{}", agent.report_status().message);

    image_io::save_image(&result, &args.output)?;
    Ok(())
}
