use crate::surface::Intersection;
use umbra_math::{debug_assert_unit, Aabb, Ray, Vector, VectorExt};

/// Flat circular disc.
#[derive(Debug, Clone, PartialEq)]
pub struct Disc {
    center: Vector,
    radius_sq: f64,
    unit_norm: Vector,
}

impl Disc {
    /// Disc at `center` facing `normal` (normalised here).
    pub fn new(center: Vector, radius: f64, normal: Vector) -> Self {
        Self {
            center,
            radius_sq: radius * radius,
            unit_norm: normal.normalize(),
        }
    }

    pub fn center(&self) -> Vector {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius_sq.sqrt()
    }

    pub fn normal(&self) -> Vector {
        self.unit_norm
    }

    pub fn intersect(&self, ray: &Ray) -> Option<Intersection> {
        let h = self.unit_norm.dot(self.center - ray.origin) / self.unit_norm.dot(ray.direction);
        if !(h > 0.0) {
            return None;
        }
        if (ray.at(h) - self.center).length_squared() > self.radius_sq {
            return None;
        }
        Some(Intersection {
            distance: h,
            unit_normal: self.unit_norm,
        })
    }

    pub fn bound(&self) -> Aabb {
        let offset = disc_bound_offset(self.unit_norm, self.radius());
        Aabb {
            min: self.center - offset,
            max: self.center + offset,
        }
    }

    pub fn translate(&mut self, offset: Vector) {
        self.center += offset;
    }

    pub fn rotate(&mut self, axis: Vector, radians: f64) {
        let axis = axis.normalize();
        self.center = self.center.rotate_about(axis, radians);
        self.unit_norm = self.unit_norm.rotate_about(axis, radians).normalize();
    }

    pub fn scale(&mut self, factor: f64) {
        self.center *= factor;
        self.radius_sq *= factor * factor;
    }
}

/// Half-extent of a radius `r` circle perpendicular to `n`.
///
/// Along axis `i` the circle reaches `r * sqrt(1 - n_i^2)`, which is the
/// length of `n` with component `i` zeroed.
pub(crate) fn disc_bound_offset(n: Vector, r: f64) -> Vector {
    debug_assert_unit!(n);
    Vector::new(
        Vector::new(0.0, n.y, n.z).length(),
        Vector::new(n.x, 0.0, n.z).length(),
        Vector::new(n.x, n.y, 0.0).length(),
    ) * r
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_disc_hit_and_miss() {
        let disc = Disc::new(Vector::ZERO, 2.0, Vector::Y);

        let ray = Ray::new(Vector::new(1.0, 1.0, 1.0), -Vector::Y);
        let hit = disc.intersect(&ray).unwrap();
        assert_eq!(hit.distance, 1.0);
        assert_eq!(hit.unit_normal, Vector::Y);

        // Outside the radius
        let ray = Ray::new(Vector::new(2.0, 1.0, 1.0), -Vector::Y);
        assert!(disc.intersect(&ray).is_none());

        // Behind
        let ray = Ray::new(Vector::new(0.0, 1.0, 0.0), Vector::Y);
        assert!(disc.intersect(&ray).is_none());

        // Parallel
        let ray = Ray::new(Vector::new(0.0, 1.0, 0.0), Vector::X);
        assert!(disc.intersect(&ray).is_none());
    }

    #[test]
    fn test_disc_bound() {
        let disc = Disc::new(Vector::new(1.0, 2.0, 3.0), 2.0, Vector::Y);
        let bound = disc.bound();
        assert_eq!(bound.min, Vector::new(-1.0, 2.0, 1.0));
        assert_eq!(bound.max, Vector::new(3.0, 2.0, 5.0));
    }

    #[test]
    fn test_disc_bound_offset_tilted() {
        let n = Vector::new(1.0, 1.0, 0.0).normalize();
        let offset = disc_bound_offset(n, 1.0);
        let half = 0.5_f64.sqrt();
        assert!((offset.x - half).abs() < 1e-12);
        assert!((offset.y - half).abs() < 1e-12);
        assert!((offset.z - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_disc_rotate_turns_normal() {
        let mut disc = Disc::new(Vector::new(0.0, 1.0, 0.0), 1.0, Vector::Y);
        disc.rotate(Vector::Z, -FRAC_PI_2);

        assert!((disc.center() - Vector::X).length() < 1e-12);
        assert!((disc.normal() - Vector::X).length() < 1e-12);
    }

    #[test]
    fn test_disc_scale() {
        let mut disc = Disc::new(Vector::X, 1.5, Vector::Z);
        disc.scale(2.0);
        assert_eq!(disc.center(), Vector::new(2.0, 0.0, 0.0));
        assert!((disc.radius() - 3.0).abs() < 1e-12);
    }
}
