//! Monte Carlo path integrator.
//!
//! Each path ends by Russian roulette: at every hit the path terminates and
//! returns the surface's emission with probability `p_emit`, otherwise it
//! scatters (mirror or diffuse) and recurses.

use crate::accel::AccelerationStructure;
use crate::grid::DEFAULT_LAMBDA;
use crate::material::Color;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use umbra_math::{add_ulps, debug_assert_unit, Ray, Vector};

/// Termination probability for surfaces that do not emit.
const NON_EMISSIVE_P_EMIT: f64 = 0.1;

/// Size of the nudge (in ULPs of 1.0) applied to secondary ray origins.
const SURFACE_OFFSET_ULPS: i64 = 100_000;

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Target objects per grid cell
    pub grid_lambda: f64,
    /// How often the trace rate statistic is refreshed
    pub trace_rate_period: Duration,
    /// Base seed for per-task RNGs; random when unset
    pub seed: Option<u64>,
    /// Maximum path length; unbounded when unset
    pub max_depth: Option<u32>,
    /// Radiance returned when a ray escapes the scene
    pub background: Color,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            grid_lambda: DEFAULT_LAMBDA,
            trace_rate_period: Duration::from_secs(5),
            seed: None,
            max_depth: None,
            background: Color::ZERO,
        }
    }
}

impl RenderConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    pub fn with_grid_lambda(mut self, lambda: f64) -> Self {
        self.grid_lambda = lambda;
        self
    }

    pub fn with_trace_rate_period(mut self, period: Duration) -> Self {
        self.trace_rate_period = period;
        self
    }
}

/// Path tracer bound to one acceleration structure and one RNG.
///
/// Not shared between threads; each worker task builds its own.
pub struct Tracer<'a, A: AccelerationStructure + ?Sized, R: Rng> {
    accel: &'a A,
    rng: R,
    max_depth: Option<u32>,
    background: Color,
}

impl<'a, A: AccelerationStructure + ?Sized, R: Rng> Tracer<'a, A, R> {
    pub fn new(accel: &'a A, rng: R) -> Self {
        Self {
            accel,
            rng,
            max_depth: None,
            background: Color::ZERO,
        }
    }

    /// Tracer using the depth limit and background from `config`.
    pub fn from_config(accel: &'a A, rng: R, config: &RenderConfig) -> Self {
        Self {
            accel,
            rng,
            max_depth: config.max_depth,
            background: config.background,
        }
    }

    pub fn with_max_depth(mut self, max_depth: Option<u32>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    /// The tracer's RNG, for callers that also need random numbers (pixel
    /// jitter, lens samples) from the same stream.
    pub fn rng(&mut self) -> &mut R {
        &mut self.rng
    }

    /// Estimate the radiance arriving along `ray` (one sample).
    ///
    /// `ray.direction` must be unit length.
    pub fn trace(&mut self, ray: &Ray) -> Color {
        self.trace_path(ray, 0)
    }

    fn trace_path(&mut self, ray: &Ray, depth: u32) -> Color {
        debug_assert_unit!(ray.direction);
        if self.max_depth.is_some_and(|max| depth >= max) {
            return Color::ZERO;
        }

        let Some(hit) = self.accel.closest_hit(ray) else {
            return self.background;
        };
        let material = *hit.material;
        let mut normal = hit.intersection.unit_normal;
        debug_assert_unit!(normal);

        let p_emit = if material.is_emissive() {
            1.0
        } else {
            NON_EMISSIVE_P_EMIT
        };
        if self.rng.gen::<f64>() < p_emit {
            return material.colour * (material.emittance / p_emit);
        }

        // Push the origin back to the side the ray arrived from.
        let epsilon = add_ulps(1.0, SURFACE_OFFSET_ULPS) - 1.0;
        let offset = -epsilon.copysign(ray.direction.dot(normal));
        let origin = ray.at(hit.intersection.distance) + normal * offset;

        if normal.dot(ray.direction) > 0.0 {
            normal = -normal;
        }

        if material.mirror {
            let reflected = ray.direction - normal * (2.0 * normal.dot(ray.direction));
            return self.trace_path(&Ray::new(origin, reflected), depth + 1);
        }

        let sample = self.hemisphere_sample(normal);
        let cos = sample.dot(normal);
        self.trace_path(&Ray::new(origin, sample), depth + 1) * (cos / (1.0 - p_emit))
            * material.colour
    }

    /// Uniform direction on the hemisphere around `normal`.
    fn hemisphere_sample(&mut self, normal: Vector) -> Vector {
        let v = Vector::new(
            self.rng.sample(StandardNormal),
            self.rng.sample(StandardNormal),
            self.rng.sample(StandardNormal),
        )
        .normalize();
        if v.dot(normal) < 0.0 {
            -v
        } else {
            v
        }
    }
}
