use crate::config::RenderConfig;
use crate::depthbuffer::DepthBuffer;
use crate::error::RenderError;
use crate::rasterizer::RenderTarget;
use crate::scene::Scene;
use crate::strategy::Dispatch;
use crate::surface::Surface;
use glam::Mat4;
use std::time::{Duration, Instant};

/// Drives frames: clear, transform and rasterize with the configured strategy, present.
pub struct Renderer {
    config: RenderConfig,
    depth: DepthBuffer,
    dispatch: Dispatch,
    view_project: Mat4,
    timer_clear: Duration,
    timer_render: Duration,
    last_print_time: Instant,
    frame_count: u32,
}

impl Renderer {
    pub fn new(width: usize, height: usize, config: RenderConfig) -> Result<Self, RenderError> {
        config.validate()?;
        let depth = DepthBuffer::new(width, height)?;
        log::debug!("renderer {}x{} with {:?}", width, height, config);
        Ok(Self {
            config,
            depth,
            dispatch: Dispatch::new(),
            view_project: Mat4::IDENTITY,
            timer_clear: Duration::ZERO,
            timer_render: Duration::ZERO,
            last_print_time: Instant::now(),
            frame_count: 0,
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: RenderConfig) -> Result<(), RenderError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Sets the camera's `projection * view` matrix used for following frames.
    pub fn update_vp(&mut self, view_project: Mat4) {
        self.view_project = view_project;
    }

    pub fn depth_buffer(&self) -> &DepthBuffer {
        &self.depth
    }

    pub fn clear<S: Surface + ?Sized>(&mut self, surface: &mut S) {
        surface.clear();
        self.depth.clear();
    }

    /// Rasterizes the scene into the surface without clearing or presenting.
    ///
    /// Returns the number of triangles that survived clipping.
    pub fn render_scene<S: Surface + ?Sized>(&mut self, scene: &Scene, surface: &S) -> Result<usize, RenderError> {
        self.check_surface(surface)?;
        let target = RenderTarget::new(surface, &self.depth);
        self.dispatch
            .render(&self.config, scene, &self.view_project, target)
    }

    /// One full frame: clear, render, present.
    pub fn render_frame<S: Surface + ?Sized>(&mut self, scene: &Scene, surface: &mut S) -> Result<usize, RenderError> {
        self.check_surface(surface)?;

        let clear_start = Instant::now();
        self.clear(surface);
        let clear_time = clear_start.elapsed();

        let render_start = Instant::now();
        let triangles = self.render_scene(scene, surface)?;
        surface.present();
        let render_time = render_start.elapsed();

        self.update_timers(clear_time, render_time, triangles);
        Ok(triangles)
    }

    // The depth buffer is sized once and sets the frame size
    fn check_surface<S: Surface + ?Sized>(&self, surface: &S) -> Result<(), RenderError> {
        let (width, height) = (self.depth.width(), self.depth.height());
        if surface.width() != width || surface.height() != height {
            return Err(RenderError::SurfaceMismatch {
                surface_width: surface.width(),
                surface_height: surface.height(),
                width,
                height,
            });
        }
        Ok(())
    }

    fn update_timers(&mut self, clear_time: Duration, render_time: Duration, triangles: usize) {
        self.timer_clear += clear_time;
        self.timer_render += render_time;
        self.frame_count += 1;
        log::trace!(
            "frame: {} triangles, clear {:.2} ms, render {:.2} ms",
            triangles,
            clear_time.as_secs_f64() * 1000.0,
            render_time.as_secs_f64() * 1000.0
        );

        // Stutter detection (2x the average)
        if self.frame_count > 1 {
            let render_avg = self.timer_render.as_secs_f64() / self.frame_count as f64;
            if render_time > Duration::from_secs_f64(render_avg * 2.0) {
                log::warn!("Render stutter: {:.2}ms", render_time.as_secs_f64() * 1000.0);
            }
        }

        let now = Instant::now();
        if now.duration_since(self.last_print_time) >= Duration::from_secs(1) {
            let frames = self.frame_count as f64;
            let clear_ms = self.timer_clear.as_secs_f64() / frames * 1000.0;
            let render_ms = self.timer_render.as_secs_f64() / frames * 1000.0;
            log::info!(
                "{:?}: clear {:.2} ms, render {:.2} ms, total {:.2} ms ({:.1} fps)",
                self.config.strategy,
                clear_ms,
                render_ms,
                clear_ms + render_ms,
                1000.0 / (clear_ms + render_ms).max(f64::EPSILON)
            );
            self.last_print_time = now;
            self.frame_count = 0;
            self.timer_clear = Duration::ZERO;
            self.timer_render = Duration::ZERO;
        }
    }
}
