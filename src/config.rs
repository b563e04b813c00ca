use crate::error::RenderError;
use crate::rasterizer::RasterMode;

const DEFAULT_THREADS: usize = 3;

/// How the triangles of a frame are spread over threads.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Strategy {
    /// One thread transforms and rasterizes each triangle as it is visited.
    Caching,
    /// Triangles are prepared up front, then claimed by worker threads through an atomic counter.
    SharedCounter,
    /// Mesh threads feed a queue that triangle threads drain concurrently.
    #[default]
    Queue,
}

/// Backing queue of the producer/consumer strategy.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum QueueKind {
    /// Two-lock linked queue with a sentinel node.
    #[default]
    Sentinel,
    /// Lock-free segmented queue.
    Segmented,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderConfig {
    pub strategy: Strategy,
    /// Worker threads of the shared counter strategy.
    pub worker_threads: usize,
    /// Mesh (producer) threads of the queue strategy.
    pub mesh_threads: usize,
    /// Triangle (consumer) threads of the queue strategy.
    pub triangle_threads: usize,
    pub queue: QueueKind,
    pub raster_mode: RasterMode,
    /// Use the SSE4.1 matrix multiply when the CPU has it.
    pub simd_matrix: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            worker_threads: DEFAULT_THREADS,
            mesh_threads: DEFAULT_THREADS,
            triangle_threads: DEFAULT_THREADS,
            queue: QueueKind::default(),
            raster_mode: RasterMode::default(),
            simd_matrix: true,
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<(), RenderError> {
        let counts = [
            ("worker_threads", self.worker_threads),
            ("mesh_threads", self.mesh_threads),
            ("triangle_threads", self.triangle_threads),
        ];
        for (name, count) in counts {
            if count == 0 {
                return Err(RenderError::InvalidConfig(format!("{name} must be at least 1")));
            }
        }
        Ok(())
    }
}
