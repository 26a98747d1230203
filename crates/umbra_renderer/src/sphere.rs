use crate::surface::{solve_quadratic, Intersection, ULP_FUDGE_FACTOR};
use umbra_math::{Aabb, Ray, Vector, VectorExt};

/// A sphere primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct Sphere {
    pub center: Vector,
    pub radius: f64,
}

impl Sphere {
    pub fn new(center: Vector, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Nearest positive root of `|o + t*d - c|^2 = r^2`.
    ///
    /// With both roots positive the ray starts outside and the smaller one
    /// wins. Otherwise the origin is inside (or the sphere is behind) and only
    /// the larger root can be in front.
    pub fn intersect(&self, ray: &Ray) -> Option<Intersection> {
        let oc = ray.origin - self.center;
        let a = ray.direction.length_squared();
        let b = 2.0 * ray.direction.dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let (x1, x2) = solve_quadratic(a, b, c)?;
        let t = if x1 > 0.0 && x2 > 0.0 {
            x1.min(x2)
        } else {
            x1.max(x2)
        };
        if !(t > 0.0) {
            return None;
        }

        Some(Intersection {
            distance: t,
            unit_normal: (ray.at(t) - self.center).normalize(),
        })
    }

    pub fn bound(&self) -> Aabb {
        let r = Vector::splat(self.radius.abs());
        Aabb {
            min: self.center - r,
            max: self.center + r,
        }
        .pad_ulps(ULP_FUDGE_FACTOR)
    }

    pub fn translate(&mut self, offset: Vector) {
        self.center += offset;
    }

    /// Rotation about an axis through the world origin moves the centre.
    pub fn rotate(&mut self, axis: Vector, radians: f64) {
        let axis = axis.normalize();
        self.center = self.center.rotate_about(axis, radians);
    }

    pub fn scale(&mut self, factor: f64) {
        self.center *= factor;
        self.radius *= factor.abs();
    }
}
