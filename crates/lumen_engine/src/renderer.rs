//! Tile-parallel progressive renderer.
//!
//! Each tile owns an integrator, a random stream and its cached primary
//! rays. A frame fans the tiles out to a fixed worker pool, waits for all
//! of them, then folds their estimates into a running mean on the calling
//! thread and hands the mean to the compositor.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use lumen_math::{Color, Mat4, Ray};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::camera::Camera;
use crate::compositor::Compositor;
use crate::config::RenderConfig;
use crate::error::EngineResult;
use crate::integrator::{Integrator, IntegratorKind, IntegratorOptions};
use crate::light_sources::LightSources;
use crate::path_space::PathSpace;
use crate::tile::{generate_tiles, tiles_per_axis, Tile};

/// Outcome of one `render()` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderStats {
    /// Samples per pixel added by this frame; zero when the frame was skipped.
    pub num_samples: u32,
    pub frame_time: Duration,
}

/// Work slot for one tile, reused across frames.
struct TileTask {
    tile: Tile,
    integrator: Box<dyn Integrator>,
    rng: StdRng,
    rays: Vec<Ray>,
    /// Sum of this frame's estimates, row-major within the tile.
    estimate: Vec<Color>,
}

impl TileTask {
    fn run(&mut self, path_space: &dyn PathSpace, light_sources: &LightSources, num_samples: u32) {
        self.estimate.fill(Color::ZERO);
        for _ in 0..num_samples {
            self.integrator
                .accumulate(&mut self.rng, &self.rays, path_space, light_sources, &mut self.estimate);
        }
    }
}

pub struct RenderEngine {
    pool: ThreadPool,
    num_threads: usize,
    integrator: IntegratorKind,
    options: IntegratorOptions,
    seed: u64,
    enabled: Arc<AtomicBool>,

    tiles: Vec<TileTask>,
    projection: Option<Mat4>,
    width: u32,
    height: u32,
    accumulated: Vec<Color>,
    sample_count: u32,
}

impl RenderEngine {
    /// Build the worker pool and an engine for `config`'s integrator.
    pub fn new(config: &RenderConfig) -> EngineResult<Self> {
        let num_threads = config.thread_count();
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("lumen-render-{i}"))
            .build()?;
        log::info!(
            "Render engine: {} threads, integrator {}",
            num_threads,
            config.integrator
        );

        Ok(Self {
            pool,
            num_threads,
            integrator: config.integrator,
            options: config.integrator_options(),
            seed: config.seed,
            enabled: Arc::new(AtomicBool::new(true)),
            tiles: Vec::new(),
            projection: None,
            width: 0,
            height: 0,
            accumulated: Vec::new(),
            sample_count: 0,
        })
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    pub fn integrator(&self) -> IntegratorKind {
        self.integrator
    }

    /// Switch integrators; the next frame starts a fresh accumulation.
    pub fn set_integrator(&mut self, kind: IntegratorKind, options: IntegratorOptions) {
        self.integrator = kind;
        self.options = options;
        self.invalidate();
    }

    /// Allow or block frames. A frame already in flight always completes.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Shared switch for toggling the engine from another thread.
    pub fn enabled_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.enabled)
    }

    /// Samples per pixel accumulated since the last reset.
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Drop cached tiles and the accumulation; rebuilt on the next frame.
    pub fn invalidate(&mut self) {
        self.tiles.clear();
        self.projection = None;
    }

    /// Add `num_samples` samples per pixel and publish the running mean.
    pub fn render(
        &mut self,
        path_space: &dyn PathSpace,
        light_sources: &LightSources,
        camera: &dyn Camera,
        num_samples: u32,
        compositor: &mut dyn Compositor,
    ) -> RenderStats {
        let start = Instant::now();
        let (width, height) = (compositor.width(), compositor.height());
        if !self.is_enabled() || num_samples == 0 || width == 0 || height == 0 {
            return RenderStats {
                num_samples: 0,
                frame_time: start.elapsed(),
            };
        }

        let projection = camera.projection();
        if self.tiles.is_empty()
            || self.projection != Some(projection)
            || (width, height) != (self.width, self.height)
        {
            self.retessellate(camera, projection, width, height);
        }

        let tiles = &mut self.tiles;
        self.pool.scope(|scope| {
            for task in tiles.iter_mut() {
                scope.spawn(move |_| task.run(path_space, light_sources, num_samples));
            }
        });

        self.sample_count += num_samples;
        let scale = 1.0 / self.sample_count as f32;
        for task in &self.tiles {
            for ((x, y), estimate) in task.tile.pixels().zip(&task.estimate) {
                let index = (y * self.width + x) as usize;
                self.accumulated[index] += *estimate;
                compositor.set(x, y, self.accumulated[index] * scale);
            }
        }

        let stats = RenderStats {
            num_samples,
            frame_time: start.elapsed(),
        };
        log::debug!(
            "Frame: {} spp ({} total) in {:.2?}",
            num_samples,
            self.sample_count,
            stats.frame_time
        );
        stats
    }

    fn retessellate(&mut self, camera: &dyn Camera, projection: Mat4, width: u32, height: u32) {
        let tiles = generate_tiles(width, height, tiles_per_axis(self.num_threads));
        log::info!(
            "Tessellated {}x{} image into {} tiles",
            width,
            height,
            tiles.len()
        );

        self.tiles = tiles
            .into_iter()
            .map(|tile| {
                let seed = self.seed.wrapping_add(tile.index as u64 * 1361 + 33);
                let mut rng = StdRng::seed_from_u64(seed);
                let rays = tile
                    .pixels()
                    .map(|(x, y)| camera.sample(&mut rng, x, y, width, height).0)
                    .collect();
                TileTask {
                    tile,
                    integrator: self.integrator.create(&self.options),
                    rng,
                    rays,
                    estimate: vec![Color::ZERO; tile.pixel_count()],
                }
            })
            .collect();

        self.projection = Some(projection);
        self.width = width;
        self.height = height;
        self.accumulated = vec![Color::ZERO; (width * height) as usize];
        self.sample_count = 0;
    }
}
