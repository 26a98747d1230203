use crate::disc::disc_bound_offset;
use crate::surface::{solve_quadratic, Intersection};
use umbra_math::{Aabb, Ray, Vector, VectorExt};

/// Open cylinder (no end caps) between two endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipe {
    c1: Vector,
    c2: Vector,
    radius: f64,
    /// Unit axis from `c1` towards `c2`
    axis: Vector,
    length_sq: f64,
}

impl Pipe {
    pub fn new(c1: Vector, c2: Vector, radius: f64) -> Self {
        Self {
            c1,
            c2,
            radius,
            axis: (c2 - c1).normalize(),
            length_sq: (c2 - c1).length_squared(),
        }
    }

    pub fn endpoints(&self) -> (Vector, Vector) {
        (self.c1, self.c2)
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Solves `|((o + t*d) - c1) x h|^2 = r^2` for the infinite cylinder, then
    /// keeps the nearest root whose axial coordinate falls between the
    /// endpoints.
    pub fn intersect(&self, ray: &Ray) -> Option<Intersection> {
        let h = self.axis;
        let d_cross_h = ray.direction.cross(h);
        let emc = ray.origin - self.c1;
        let emc_cross_h = emc.cross(h);

        let (x1, x2) = solve_quadratic(
            d_cross_h.length_squared(),
            2.0 * d_cross_h.dot(emc_cross_h),
            emc_cross_h.length_squared() - self.radius * self.radius,
        )?;

        for t in [x1.min(x2), x1.max(x2)] {
            if !(t > 0.0) {
                continue;
            }
            let along = ray.at(t) - self.c1;
            let s = along.dot(h);
            if !(s >= 0.0 && s * s <= self.length_sq) {
                continue;
            }
            return Some(Intersection {
                distance: t,
                unit_normal: along.rej(h).normalize(),
            });
        }
        None
    }

    pub fn bound(&self) -> Aabb {
        let offset = disc_bound_offset(self.axis, self.radius);
        Aabb {
            min: self.c1.min(self.c2) - offset,
            max: self.c1.max(self.c2) + offset,
        }
    }

    pub fn translate(&mut self, offset: Vector) {
        *self = Self::new(self.c1 + offset, self.c2 + offset, self.radius);
    }

    pub fn rotate(&mut self, axis: Vector, radians: f64) {
        let axis = axis.normalize();
        *self = Self::new(
            self.c1.rotate_about(axis, radians),
            self.c2.rotate_about(axis, radians),
            self.radius,
        );
    }

    pub fn scale(&mut self, factor: f64) {
        *self = Self::new(self.c1 * factor, self.c2 * factor, self.radius * factor.abs());
    }
}
