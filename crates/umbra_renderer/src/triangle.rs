//! Triangle primitive for ray tracing.
//!
//! Intersects the supporting plane first, then solves `w = alpha*u + beta*v`
//! for the barycentric-style coefficients using dot products cached at
//! construction time.

use crate::surface::{Intersection, ULP_FUDGE_FACTOR};
use umbra_math::{debug_assert_unit, Aabb, Ray, Vector, VectorExt};

/// A triangle primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    /// Corner A
    a: Vector,
    /// A to B
    u: Vector,
    /// A to C
    v: Vector,
    /// Pre-computed face normal (unit length, right hand rule over A, B, C)
    unit_norm: Vector,
    // Pre-computed dot products
    dot_uv: f64,
    dot_uu: f64,
    dot_vv: f64,
}

impl Triangle {
    /// Create a new triangle from three vertices.
    pub fn new(a: Vector, b: Vector, c: Vector) -> Self {
        let u = b - a;
        let v = c - a;

        Self {
            a,
            u,
            v,
            unit_norm: u.cross(v).normalize(),
            dot_uv: u.dot(v),
            dot_uu: u.dot(u),
            dot_vv: v.dot(v),
        }
    }

    /// The three corners in construction order.
    pub fn vertices(&self) -> [Vector; 3] {
        [self.a, self.a + self.u, self.a + self.v]
    }

    /// Unit face normal.
    pub fn normal(&self) -> Vector {
        self.unit_norm
    }

    pub fn intersect(&self, ray: &Ray) -> Option<Intersection> {
        // Distance to the supporting plane; NaN (parallel or degenerate)
        // fails the comparison as well.
        let h = self.unit_norm.dot(self.a - ray.origin) / self.unit_norm.dot(ray.direction);
        if !(h > 0.0) {
            return None;
        }

        // alpha = [(u.v)(w.v) - (v.v)(w.u)] / [(u.v)^2 - (u.u)(v.v)]
        // beta  = [(u.v)(w.u) - (u.u)(w.v)] / [(u.v)^2 - (u.u)(v.v)]
        let w = ray.at(h) - self.a;
        let dot_wv = w.dot(self.v);
        let dot_wu = w.dot(self.u);
        let denom = self.dot_uv * self.dot_uv - self.dot_uu * self.dot_vv;
        let alpha = (self.dot_uv * dot_wv - self.dot_vv * dot_wu) / denom;
        let beta = (self.dot_uv * dot_wu - self.dot_uu * dot_wv) / denom;

        if !(alpha >= 0.0 && beta >= 0.0 && alpha + beta <= 1.0) {
            return None;
        }

        debug_assert_unit!(self.unit_norm);
        Some(Intersection {
            distance: h,
            unit_normal: self.unit_norm,
        })
    }

    /// Bounding box padded outward by a few ULPs so grid membership stays
    /// conservative under rounding.
    pub fn bound(&self) -> Aabb {
        let [a, b, c] = self.vertices();
        Aabb {
            min: a.min(b.min(c)),
            max: a.max(b.max(c)),
        }
        .pad_ulps(ULP_FUDGE_FACTOR)
    }

    pub fn translate(&mut self, offset: Vector) {
        let [a, b, c] = self.vertices();
        *self = Self::new(a + offset, b + offset, c + offset);
    }

    /// Rotate about `axis` through the world origin.
    pub fn rotate(&mut self, axis: Vector, radians: f64) {
        let axis = axis.normalize();
        let [a, b, c] = self.vertices().map(|p| p.rotate_about(axis, radians));
        *self = Self::new(a, b, c);
    }

    pub fn scale(&mut self, factor: f64) {
        let [a, b, c] = self.vertices().map(|p| p * factor);
        *self = Self::new(a, b, c);
    }
}
