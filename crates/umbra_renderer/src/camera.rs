//! Rectilinear camera with an optional square aperture for depth of field.

use crate::error::{RenderError, RenderResult};
use crate::image::Dimensions;
use rand::Rng;
use serde::{Deserialize, Serialize};
use umbra_math::{Ray, Vector};

/// Camera placement and lens settings as supplied by a scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub location: Vector,
    pub looking_at: Vector,
    pub up_direction: Vector,
    /// Horizontal field of view
    pub field_of_view_degrees: f64,
    /// Distance to the plane of perfect focus
    pub focal_length: f64,
    /// Focal length divided by aperture size; infinite for a pinhole
    pub focal_ratio: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            location: Vector::ZERO,
            looking_at: Vector::new(0.0, 0.0, -1.0),
            up_direction: Vector::Y,
            field_of_view_degrees: 100.0,
            focal_length: 10.0,
            focal_ratio: f64::INFINITY,
        }
    }
}

impl CameraConfig {
    /// Set camera position.
    pub fn with_position(mut self, location: Vector, looking_at: Vector, up_direction: Vector) -> Self {
        self.location = location;
        self.looking_at = looking_at;
        self.up_direction = up_direction;
        self
    }

    pub fn with_field_of_view(mut self, degrees: f64) -> Self {
        self.field_of_view_degrees = degrees;
        self
    }

    /// Set lens settings.
    pub fn with_lens(mut self, focal_length: f64, focal_ratio: f64) -> Self {
        self.focal_length = focal_length;
        self.focal_ratio = focal_ratio;
        self
    }
}

/// Centre plus half-extent vectors of a rectangle facing the viewer.
///
/// `x` points from the centre to the right edge, `y` to the top edge.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Frame {
    loc: Vector,
    x: Vector,
    y: Vector,
}

/// Ray generator built from a [`CameraConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    screen: Frame,
    eye: Frame,
}

impl Camera {
    pub fn new(config: &CameraConfig) -> RenderResult<Self> {
        let invalid = |msg: String| Err(RenderError::InvalidCamera(msg));

        if !(config.focal_length > 0.0 && config.focal_length.is_finite()) {
            return invalid(format!("focal length must be positive, got {}", config.focal_length));
        }
        if !(config.field_of_view_degrees > 0.0 && config.field_of_view_degrees < 180.0) {
            return invalid(format!(
                "field of view must be between 0 and 180 degrees, got {}",
                config.field_of_view_degrees
            ));
        }
        if !(config.focal_ratio > 0.0) {
            return invalid(format!("focal ratio must be positive, got {}", config.focal_ratio));
        }

        let view = (config.looking_at - config.location).normalize_or_zero();
        let up = config.up_direction.normalize_or_zero();
        let right = view.cross(up).normalize_or_zero();
        if right == Vector::ZERO || !right.is_finite() {
            return invalid(format!(
                "view direction {view} and up direction {up} do not span a plane"
            ));
        }
        let top = right.cross(view);

        let aperture = config.focal_length / config.focal_ratio;
        let half_width = (config.field_of_view_degrees.to_radians() / 2.0).tan() * config.focal_length;

        Ok(Self {
            screen: Frame {
                loc: config.location + view * config.focal_length,
                x: right * half_width,
                y: top * half_width,
            },
            eye: Frame {
                loc: config.location,
                x: right * aperture,
                y: top * aperture,
            },
        })
    }

    /// Ray through screen position `(x, y)`.
    ///
    /// `x` runs from -1 (left edge) to 1 (right edge) and `y` uses the same
    /// scale, positive upward. The origin is jittered across the aperture;
    /// the returned direction is not normalised.
    pub fn make_ray<R: Rng + ?Sized>(&self, x: f64, y: f64, rng: &mut R) -> Ray {
        let start = self.eye.loc
            + self.eye.x * (2.0 * rng.gen::<f64>() - 1.0)
            + self.eye.y * (2.0 * rng.gen::<f64>() - 1.0);
        let end = self.screen.loc + self.screen.x * x + self.screen.y * y;
        Ray::new(start, end - start)
    }
}

/// Screen position of pixel `(px, py)` offset by `jitter` (each in `[0, 1)`).
///
/// Pixels are square with pitch `2 / width`, so `x` spans `[-1, 1)` and `y`
/// spans `height / width` of that, flipped so that row 0 is at the top.
pub fn screen_coordinates(px: usize, py: usize, dims: Dimensions, jitter: (f64, f64)) -> (f64, f64) {
    let pitch = 2.0 / dims.width as f64;
    let half_w = (dims.width / 2) as i64;
    let half_h = (dims.height / 2) as i64;
    let x = ((px as i64 - half_w) as f64 + jitter.0) * pitch;
    let y = -((py as i64 - half_h) as f64 + jitter.1) * pitch;
    (x, y)
}
