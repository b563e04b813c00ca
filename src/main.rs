use anyhow::Context;
use clap::Parser;
use glam::Vec3;
use std::path::PathBuf;
use std::time::Instant;

use swrast::{Framebuffer, QueueKind, RasterMode, RenderCamera, RenderConfig, Renderer, Scene, Strategy};

// Camera starts 4 units back from the first layer of the grid
const CAMERA_POSITION: Vec3 = Vec3::new(0.0, 0.0, 4.0);

#[derive(Parser, Clone, Debug)]
#[command(name = "swrast")]
#[command(about = "Headless benchmark for the multi-threaded software rasterizer")]
#[command(version)]
struct Settings {
    /// How triangles are distributed over threads
    #[arg(long, value_enum, default_value_t = Strategy::Queue)]
    strategy: Strategy,

    /// Worker threads of the shared counter strategy
    #[arg(long, default_value_t = 3)]
    worker_threads: usize,

    /// Mesh (producer) threads of the queue strategy
    #[arg(long, default_value_t = 3)]
    mesh_threads: usize,

    /// Triangle (consumer) threads of the queue strategy
    #[arg(long, default_value_t = 3)]
    triangle_threads: usize,

    /// Queue used by the queue strategy
    #[arg(long, value_enum, default_value_t = QueueKind::Sentinel)]
    queue: QueueKind,

    /// Scan conversion mode
    #[arg(long, value_enum, default_value_t = RasterMode::Incremental)]
    raster: RasterMode,

    /// Disable the SSE4.1 matrix multiply
    #[arg(long)]
    no_simd: bool,

    #[arg(long, default_value_t = 1024)]
    width: usize,

    #[arg(long, default_value_t = 768)]
    height: usize,

    /// Spheres along each axis of the grid
    #[arg(long, default_value_t = 20)]
    grid: i32,

    /// Distance between neighbouring spheres
    #[arg(long, default_value_t = 2.0)]
    spacing: f32,

    /// Number of frames to render
    #[arg(long, default_value_t = 100)]
    frames: u32,

    /// Write the last frame to this PNG file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only show warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl Settings {
    fn render_config(&self) -> RenderConfig {
        RenderConfig {
            strategy: self.strategy,
            worker_threads: self.worker_threads,
            mesh_threads: self.mesh_threads,
            triangle_threads: self.triangle_threads,
            queue: self.queue,
            raster_mode: self.raster,
            simd_matrix: !self.no_simd,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let settings = Settings::parse();

    let level = if settings.quiet {
        log::LevelFilter::Warn
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let mut renderer = Renderer::new(settings.width, settings.height, settings.render_config())
        .context("failed to create renderer")?;
    let mut surface = Framebuffer::new(settings.width, settings.height).context("failed to create framebuffer")?;

    let camera = RenderCamera::new(CAMERA_POSITION, settings.width as f32, settings.height as f32);
    renderer.update_vp(camera.view_project_matrix);

    let grid = settings.grid.max(0);
    let mut scene = Scene::sphere_grid(grid, grid, grid, settings.spacing);
    log::info!(
        "Scene: {} meshes, {} triangles, {}x{}, {:?}",
        scene.meshes.len(),
        scene.triangle_count(),
        settings.width,
        settings.height,
        renderer.config()
    );

    let start = Instant::now();
    let mut drawn = 0;
    for frame in 0..settings.frames {
        scene.animate();
        drawn = renderer
            .render_frame(&scene, &mut surface)
            .with_context(|| format!("frame {frame} failed"))?;
    }
    let elapsed = start.elapsed();

    if settings.frames > 0 {
        let frame_ms = elapsed.as_secs_f64() * 1000.0 / settings.frames as f64;
        log::info!(
            "{} frames in {:.2} s: {:.2} ms/frame ({:.1} fps), {} triangles after clipping",
            settings.frames,
            elapsed.as_secs_f64(),
            frame_ms,
            1000.0 / frame_ms.max(f64::EPSILON),
            drawn
        );
    }

    if let Some(path) = &settings.output {
        surface
            .save_png(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        log::info!("Saved {}", path.display());
    }

    Ok(())
}
