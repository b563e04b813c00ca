use crate::config::{QueueKind, RenderConfig, Strategy};
use crate::error::RenderError;
use crate::math::{mul_mat4, mul_mat4_scalar};
use crate::rasterizer::{RasterMode, RenderTarget, Triangle, TriangleData};
use crate::scene::{Light, Mesh, Scene};
use crate::sentinelqueue::{SentinelQueue, WorkQueue};
use crate::surface::Surface;
use crate::transform::transform_triangle;
use crossbeam::queue::SegQueue;
use crossbeam_utils::{Backoff, CachePadded};
use glam::{Mat4, Vec3A};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Work distribution state that lives across frames.
///
/// The counters and the completion flag are reset at the start of every render call that
/// uses them, so one `Dispatch` can drive any number of frames, one at a time.
pub struct Dispatch {
    triangle_counter: CachePadded<AtomicUsize>,
    mesh_counter: CachePadded<AtomicUsize>,
    meshes_processed: CachePadded<AtomicBool>,
    sentinel_queue: SentinelQueue<TriangleData>,
    segmented_queue: SegQueue<TriangleData>,
    // Shared counter work list, kept to reuse its allocation
    triangles: Vec<TriangleData>,
}

impl Default for Dispatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatch {
    pub fn new() -> Self {
        Self {
            triangle_counter: CachePadded::new(AtomicUsize::new(0)),
            mesh_counter: CachePadded::new(AtomicUsize::new(0)),
            meshes_processed: CachePadded::new(AtomicBool::new(false)),
            sentinel_queue: SentinelQueue::new(),
            segmented_queue: SegQueue::new(),
            triangles: Vec::new(),
        }
    }

    /// Transforms and rasterizes every mesh of the scene with the configured strategy.
    ///
    /// Returns the number of triangles handed to the rasterizer, i.e. after clipping.
    pub fn render<S: Surface + ?Sized>(
        &mut self,
        config: &RenderConfig,
        scene: &Scene,
        vp: &Mat4,
        target: RenderTarget<S>,
    ) -> Result<usize, RenderError> {
        config.validate()?;
        let frame = Frame::new(config, &scene.meshes, &scene.light, *vp, target);
        match config.strategy {
            Strategy::Caching => Ok(self.render_caching(&frame)),
            Strategy::SharedCounter => self.render_shared_counter(&frame, config.worker_threads),
            Strategy::Queue => self.render_queue(&frame, config),
        }
    }

    // Single thread, every triangle rasterized right after it is transformed
    fn render_caching<S: Surface + ?Sized>(&self, frame: &Frame<S>) -> usize {
        let mut count = 0;
        for mesh_index in 0..frame.meshes.len() {
            frame.for_each_triangle(mesh_index, |data| {
                frame.rasterize(&data);
                count += 1;
            });
        }
        log::trace!("caching: {} triangles", count);
        count
    }

    fn render_shared_counter<S: Surface + ?Sized>(
        &mut self,
        frame: &Frame<S>,
        threads: usize,
    ) -> Result<usize, RenderError> {
        // Phase 1: build the work list on this thread
        self.triangles.clear();
        for mesh_index in 0..frame.meshes.len() {
            frame.for_each_triangle(mesh_index, |data| self.triangles.push(data));
        }

        // Phase 2: workers claim indices until the list is exhausted
        let triangles = &self.triangles;
        log::trace!("shared counter: {} triangles over {} threads", triangles.len(), threads);
        run_shared_counter(&self.triangle_counter, triangles.len(), threads, |i| {
            frame.rasterize(&triangles[i]);
        })?;
        Ok(triangles.len())
    }

    fn render_queue<S: Surface + ?Sized>(
        &mut self,
        frame: &Frame<S>,
        config: &RenderConfig,
    ) -> Result<usize, RenderError> {
        match config.queue {
            QueueKind::Sentinel => self.render_queue_with(&self.sentinel_queue, frame, config),
            QueueKind::Segmented => self.render_queue_with(&self.segmented_queue, frame, config),
        }
    }

    fn render_queue_with<Q, S>(&self, queue: &Q, frame: &Frame<S>, config: &RenderConfig) -> Result<usize, RenderError>
    where
        Q: WorkQueue<TriangleData>,
        S: Surface + ?Sized,
    {
        let produced = AtomicUsize::new(0);
        log::trace!(
            "queue: {} meshes, {} mesh threads, {} triangle threads",
            frame.meshes.len(),
            config.mesh_threads,
            config.triangle_threads
        );
        let result = run_producer_consumer(
            queue,
            &self.mesh_counter,
            &self.meshes_processed,
            frame.meshes.len(),
            config.mesh_threads,
            config.triangle_threads,
            |mesh_index, queue: &Q| {
                let mut count = 0;
                frame.for_each_triangle(mesh_index, |data| {
                    queue.enqueue(data);
                    count += 1;
                });
                produced.fetch_add(count, Ordering::Relaxed);
            },
            |data| frame.rasterize(&data),
        );
        if result.is_err() {
            // Leave nothing behind for the next frame
            while queue.dequeue().is_some() {}
        }
        result.map(|_| produced.into_inner())
    }
}

// Everything a worker needs to transform and rasterize one frame
struct Frame<'a, S: Surface + ?Sized> {
    meshes: &'a [Mesh],
    light: &'a Light,
    light_dir: Vec3A,
    vp: Mat4,
    target: RenderTarget<'a, S>,
    width: f32,
    height: f32,
    mode: RasterMode,
    simd_matrix: bool,
}

impl<'a, S: Surface + ?Sized> Frame<'a, S> {
    fn new(config: &RenderConfig, meshes: &'a [Mesh], light: &'a Light, vp: Mat4, target: RenderTarget<'a, S>) -> Self {
        let width = target.surface.width() as f32;
        let height = target.surface.height() as f32;
        Self {
            meshes,
            light,
            light_dir: light.direction.normalize_or_zero(),
            vp,
            target,
            width,
            height,
            mode: config.raster_mode,
            simd_matrix: config.simd_matrix,
        }
    }

    // Transforms every triangle of a mesh and emits the ones that survive clipping
    fn for_each_triangle(&self, mesh_index: usize, mut emit: impl FnMut(TriangleData)) {
        let mesh = &self.meshes[mesh_index];
        let mvp = if self.simd_matrix {
            mul_mat4(&self.vp, &mesh.world)
        } else {
            mul_mat4_scalar(&self.vp, &mesh.world)
        };
        let ambient = self.light.ambient * mesh.ka;
        let diffuse = self.light.diffuse * mesh.kd;

        for &indices in &mesh.triangles {
            if let Some(vertices) = transform_triangle(&mvp, mesh, indices, self.width, self.height) {
                emit(TriangleData::new(Triangle::from_array(vertices), ambient, diffuse));
            }
        }
    }

    #[inline]
    fn rasterize(&self, data: &TriangleData) {
        data.draw(self.mode, &self.target, self.light_dir);
    }
}

/// Runs `work(i)` exactly once for every `i` in `0..total`, spread over `threads` scoped
/// threads that claim indices with an atomic fetch-and-add on `counter`.
pub fn run_shared_counter<F>(counter: &AtomicUsize, total: usize, threads: usize, work: F) -> Result<(), RenderError>
where
    F: Fn(usize) + Sync,
{
    if threads == 0 && total > 0 {
        return Err(RenderError::InvalidConfig("no worker threads for the shared counter".into()));
    }
    counter.store(0, Ordering::Relaxed);
    let work = &work;
    crossbeam::scope(|s| {
        for _ in 0..threads {
            s.spawn(move |_| {
                loop {
                    let i = counter.fetch_add(1, Ordering::Relaxed);
                    if i >= total {
                        break;
                    }
                    work(i);
                }
            });
        }
    })
    .map_err(|_| RenderError::WorkerPanicked("worker"))
}

/// Runs `producers` threads that claim indices in `0..items` and call `produce` to enqueue
/// work, while `consumers` threads dequeue and `consume` it concurrently.
///
/// The producers are joined before `done` is raised. A consumer samples `done` before each
/// dequeue and only exits when the flag was already up and that dequeue came back empty,
/// so every enqueued item is consumed. `done` is raised even if a producer panicked, so the
/// consumers still terminate.
#[allow(clippy::too_many_arguments)]
pub fn run_producer_consumer<T, Q, P, C>(
    queue: &Q,
    counter: &AtomicUsize,
    done: &AtomicBool,
    items: usize,
    producers: usize,
    consumers: usize,
    produce: P,
    consume: C,
) -> Result<(), RenderError>
where
    Q: WorkQueue<T>,
    P: Fn(usize, &Q) + Sync,
    C: Fn(T) + Sync,
{
    // Without both sides, items would either never be produced or be left in the queue
    if items > 0 && (producers == 0 || consumers == 0) {
        return Err(RenderError::InvalidConfig(format!(
            "{producers} producer and {consumers} consumer threads"
        )));
    }
    counter.store(0, Ordering::Relaxed);
    done.store(false, Ordering::Relaxed);
    let produce = &produce;
    let consume = &consume;

    let joined = crossbeam::scope(|s| {
        let mut producer_handles = Vec::with_capacity(producers);
        for _ in 0..producers {
            producer_handles.push(s.spawn(move |_| {
                loop {
                    let i = counter.fetch_add(1, Ordering::Relaxed);
                    if i >= items {
                        break;
                    }
                    produce(i, queue);
                }
            }));
        }

        let mut consumer_handles = Vec::with_capacity(consumers);
        for _ in 0..consumers {
            consumer_handles.push(s.spawn(move |_| {
                let backoff = Backoff::new();
                loop {
                    let finished = done.load(Ordering::Acquire);
                    match queue.dequeue() {
                        Some(item) => {
                            consume(item);
                            backoff.reset();
                        }
                        None if finished => break,
                        None => backoff.snooze(),
                    }
                }
            }));
        }

        let producers_ok = producer_handles
            .into_iter()
            .fold(true, |ok, handle| handle.join().is_ok() && ok);
        done.store(true, Ordering::Release);
        let consumers_ok = consumer_handles
            .into_iter()
            .fold(true, |ok, handle| handle.join().is_ok() && ok);
        (producers_ok, consumers_ok)
    });

    match joined {
        Ok((true, true)) => Ok(()),
        Ok((false, _)) => Err(RenderError::WorkerPanicked("mesh")),
        Ok((true, false)) | Err(_) => Err(RenderError::WorkerPanicked("triangle")),
    }
}
