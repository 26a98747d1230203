//! Render coordinator.
//!
//! A [`RenderInstance`] owns the grid, camera and accumulator for one render
//! and drives a variable number of worker threads against them:
//!
//! - The supervisor thread runs passes back to back. Each pass spawns the
//!   currently requested number of scoped workers, which claim pixels from a
//!   shared atomic index until the image is covered, and then merges their
//!   landing buffers as one pass. With zero workers requested it parks until
//!   [`RenderInstance::set_workers`] wakes it.
//! - The monitor thread periodically turns the completed-sample counter into
//!   a samples-per-second rate.
//!
//! Dropping the instance stops both threads. Workers stop claiming pixels as
//! soon as they see the shutdown flag and the unfinished pass is discarded.

use crate::accumulator::{Accumulator, LandingBuffer};
use crate::camera::{screen_coordinates, Camera, CameraConfig};
use crate::error::{RenderError, RenderResult};
use crate::grid::{Grid, GridStats};
use crate::image::{Dimensions, Image};
use crate::scene::Scene;
use crate::surface::Object;
use crate::tracer::{RenderConfig, Tracer};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Snapshot of a render's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RenderStats {
    /// Workers in the pass currently running
    pub workers: usize,
    pub requested_workers: usize,
    /// Samples traced since the instance was created
    pub completed: u64,
    /// Passes merged into the accumulator, including resumed ones
    pub passes: u64,
    pub trace_rate_hz: u64,
}

/// State shared between the instance handle and its threads.
struct Shared {
    dims: Dimensions,
    grid: Grid,
    camera: Camera,
    config: RenderConfig,
    accumulator: Accumulator,
    base_seed: u64,

    requested: AtomicUsize,
    actual: AtomicUsize,
    completed: AtomicU64,
    trace_rate: AtomicU64,
    shutdown: AtomicBool,
}

/// One progressive render.
pub struct RenderInstance {
    shared: Arc<Shared>,
    supervisor: Option<JoinHandle<()>>,
    monitor: Option<JoinHandle<()>>,
}

impl RenderInstance {
    /// Build the grid and camera and start the (idle) coordinator threads.
    pub fn new(
        dims: Dimensions,
        objects: Vec<Object>,
        camera: &CameraConfig,
        config: RenderConfig,
    ) -> RenderResult<Self> {
        Self::resume(dims, objects, camera, config, Accumulator::new(dims))
    }

    pub fn from_scene(dims: Dimensions, scene: Scene, config: RenderConfig) -> RenderResult<Self> {
        Self::new(dims, scene.objects, &scene.camera, config)
    }

    /// Continue a render from previously accumulated state.
    pub fn resume(
        dims: Dimensions,
        objects: Vec<Object>,
        camera: &CameraConfig,
        config: RenderConfig,
        accumulator: Accumulator,
    ) -> RenderResult<Self> {
        let found = accumulator.dimensions();
        if found != dims {
            return Err(RenderError::DimensionMismatch {
                width: dims.width,
                height: dims.height,
                found_width: found.width,
                found_height: found.height,
            });
        }
        if config.trace_rate_period.is_zero() {
            return Err(RenderError::InvalidConfig(
                "trace rate period must be non-zero".into(),
            ));
        }

        let camera = Camera::new(camera)?;
        let object_count = objects.len();
        let grid = Grid::new(objects, config.grid_lambda)?;
        let base_seed = config.seed.unwrap_or_else(rand::random);

        log::info!(
            "Render instance {}x{}: {} objects, {} passes already accumulated",
            dims.width,
            dims.height,
            object_count,
            accumulator.passes()
        );

        let shared = Arc::new(Shared {
            dims,
            grid,
            camera,
            config,
            accumulator,
            base_seed,
            requested: AtomicUsize::new(0),
            actual: AtomicUsize::new(0),
            completed: AtomicU64::new(0),
            trace_rate: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
        });

        let mut instance = Self {
            shared: Arc::clone(&shared),
            supervisor: None,
            monitor: None,
        };

        // Dropping `instance` on a spawn failure stops whatever did start.
        let s = Arc::clone(&shared);
        instance.supervisor = Some(
            thread::Builder::new()
                .name("umbra-supervisor".into())
                .spawn(move || s.supervise())?,
        );
        let s = shared;
        instance.monitor = Some(
            thread::Builder::new()
                .name("umbra-monitor".into())
                .spawn(move || s.monitor_trace_rate())?,
        );

        Ok(instance)
    }

    /// Ask for `workers` concurrent tasks. Takes effect from the next pass;
    /// zero pauses the render once the current pass finishes.
    pub fn set_workers(&self, workers: usize) {
        let previous = self.shared.requested.swap(workers, Ordering::SeqCst);
        if previous != workers {
            log::info!("Requested workers: {previous} -> {workers}");
        }
        if let Some(supervisor) = &self.supervisor {
            supervisor.thread().unpark();
        }
    }

    pub fn get_stats(&self) -> RenderStats {
        let shared = &self.shared;
        RenderStats {
            workers: shared.actual.load(Ordering::SeqCst),
            requested_workers: shared.requested.load(Ordering::SeqCst),
            completed: shared.completed.load(Ordering::Relaxed),
            passes: shared.accumulator.passes(),
            trace_rate_hz: shared.trace_rate.load(Ordering::Relaxed),
        }
    }

    /// Tone-mapped view of every pass merged so far.
    pub fn snapshot_image(&self, exposure: f64) -> Image {
        self.shared.accumulator.to_image(exposure)
    }

    /// Persist the accumulator (see [`Accumulator::write_to`]).
    pub fn save_accumulator<W: Write>(&self, writer: W, scene_name: &str) -> RenderResult<()> {
        self.shared.accumulator.write_to(writer, scene_name)?;
        log::info!(
            "Saved accumulator for '{scene_name}' at {} passes",
            self.shared.accumulator.passes()
        );
        Ok(())
    }

    pub fn accumulator(&self) -> &Accumulator {
        &self.shared.accumulator
    }

    pub fn dimensions(&self) -> Dimensions {
        self.shared.dims
    }

    pub fn grid_stats(&self) -> GridStats {
        self.shared.grid.stats()
    }
}

impl Drop for RenderInstance {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        for handle in [self.supervisor.take(), self.monitor.take()].into_iter().flatten() {
            handle.thread().unpark();
            let name = handle.thread().name().unwrap_or("unnamed").to_string();
            if handle.join().is_err() {
                log::error!("Render thread '{name}' panicked");
            }
        }
        log::debug!("Render instance stopped");
    }
}

impl Shared {
    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Number given to the first pass this instance runs. Resumed renders
    /// continue from the merged count so no seed repeats a merged pass.
    fn first_pass(&self) -> u64 {
        self.accumulator.passes()
    }

    fn supervise(&self) {
        let mut pass = self.first_pass();
        while !self.is_shutdown() {
            let workers = self.requested.load(Ordering::SeqCst);
            if workers == 0 {
                self.actual.store(0, Ordering::SeqCst);
                // Woken by set_workers or drop; spurious wakeups re-check.
                thread::park();
                continue;
            }

            self.actual.store(workers, Ordering::SeqCst);
            let started = Instant::now();
            let buffers = self.run_pass(workers, pass);
            pass += 1;

            let samples: usize = buffers.iter().map(LandingBuffer::len).sum();
            if samples == self.dims.pixel_count() {
                self.accumulator.merge_pass(&buffers);
                log::debug!(
                    "Merged pass {} from {workers} workers in {:?}",
                    self.accumulator.passes(),
                    started.elapsed()
                );
            } else if self.is_shutdown() {
                log::debug!("Discarding partial pass on shutdown ({samples} samples)");
            } else {
                log::warn!(
                    "Discarding incomplete pass: {samples} of {} samples",
                    self.dims.pixel_count()
                );
            }
        }
        self.actual.store(0, Ordering::SeqCst);
    }

    /// One sweep over the image split between `workers` scoped threads.
    fn run_pass(&self, workers: usize, pass: u64) -> Vec<LandingBuffer> {
        let next_pixel = AtomicUsize::new(0);
        thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .filter_map(|task| {
                    let next_pixel = &next_pixel;
                    thread::Builder::new()
                        .name(format!("umbra-worker-{task}"))
                        .spawn_scoped(scope, move || self.work(next_pixel, pass, task))
                        .map_err(|e| log::warn!("Could not spawn worker {task}: {e}"))
                        .ok()
                })
                .collect();

            handles
                .into_iter()
                .filter_map(|handle| match handle.join() {
                    Ok(buffer) => Some(buffer),
                    Err(_) => {
                        log::error!("Worker panicked; its samples are lost");
                        None
                    }
                })
                .collect()
        })
    }

    /// Claim and trace pixels until the pass is covered or shutdown.
    fn work(&self, next_pixel: &AtomicUsize, pass: u64, task: usize) -> LandingBuffer {
        let rng = StdRng::seed_from_u64(task_seed(self.base_seed, pass, task));
        let mut tracer = Tracer::from_config(&self.grid, rng, &self.config);
        let mut buffer = LandingBuffer::new(self.dims);
        let total = self.dims.pixel_count();

        while !self.is_shutdown() {
            let index = next_pixel.fetch_add(1, Ordering::Relaxed);
            if index >= total {
                break;
            }
            let (px, py) = (index % self.dims.width, index / self.dims.width);

            let rng = tracer.rng();
            let jitter = (rng.gen::<f64>(), rng.gen::<f64>());
            let (x, y) = screen_coordinates(px, py, self.dims, jitter);
            let ray = self.camera.make_ray(x, y, tracer.rng()).normalized();

            buffer.set(px, py, tracer.trace(&ray));
            self.completed.fetch_add(1, Ordering::Relaxed);
        }
        buffer
    }

    fn monitor_trace_rate(&self) {
        let period = self.config.trace_rate_period;
        let mut last_tick = Instant::now();
        let mut last_completed = self.completed.load(Ordering::Relaxed);

        while !self.is_shutdown() {
            let elapsed = last_tick.elapsed();
            if elapsed < period {
                thread::park_timeout(period - elapsed);
                continue;
            }

            let completed = self.completed.load(Ordering::Relaxed);
            let rate = (completed - last_completed) as f64 / elapsed.as_secs_f64();
            self.trace_rate.store(rate.round() as u64, Ordering::Relaxed);

            last_tick = Instant::now();
            last_completed = completed;
        }
    }
}

/// Independent RNG seed for each (pass, task) pair.
fn task_seed(base: u64, pass: u64, task: usize) -> u64 {
    base ^ pass.wrapping_mul(0x9e37_79b9_7f4a_7c15) ^ (task as u64).wrapping_mul(0xc2b2_ae3d_27d4_eb4f)
}
