//! Axis-aligned primitives: solid boxes and flat rectangles.

use crate::error::{RenderError, RenderResult};
use crate::surface::Intersection;
use serde::{Deserialize, Serialize};
use umbra_math::{Aabb, Ray, Vector};

/// A world axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Positive unit vector along the axis.
    pub fn unit(self) -> Vector {
        Vector::AXES[self.index()]
    }

    /// The two remaining axes, in increasing order.
    pub fn others(self) -> (usize, usize) {
        match self {
            Axis::X => (1, 2),
            Axis::Y => (0, 2),
            Axis::Z => (0, 1),
        }
    }
}

/// Solid axis-aligned box.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedBox {
    pub min: Vector,
    pub max: Vector,
}

impl AlignedBox {
    /// Box spanning two opposite corners given in any order.
    pub fn new(a: Vector, b: Vector) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Slab test tracking which face was crossed on entry and on exit.
    ///
    /// From outside the entry face is reported; from inside, the exit face.
    pub fn intersect(&self, ray: &Ray) -> Option<Intersection> {
        let mut t_min = f64::NEG_INFINITY;
        let mut t_max = f64::INFINITY;
        let mut n_min = Vector::ZERO;
        let mut n_max = Vector::ZERO;

        for (axis, unit) in Vector::AXES.into_iter().enumerate() {
            let t_lo = (self.min[axis] - ray.origin[axis]) / ray.direction[axis];
            let t_hi = (self.max[axis] - ray.origin[axis]) / ray.direction[axis];

            if t_lo.min(t_hi) > t_min {
                (t_min, n_min) = if t_lo < t_hi { (t_lo, -unit) } else { (t_hi, unit) };
            }
            if t_lo.max(t_hi) < t_max {
                (t_max, n_max) = if t_lo > t_hi { (t_lo, -unit) } else { (t_hi, unit) };
            }
        }

        if !(t_min <= t_max && t_max > 0.0) {
            return None;
        }

        let (distance, unit_normal) = if t_min > 0.0 { (t_min, n_min) } else { (t_max, n_max) };
        Some(Intersection {
            distance,
            unit_normal,
        })
    }

    pub fn bound(&self) -> Aabb {
        Aabb {
            min: self.min,
            max: self.max,
        }
    }

    pub fn translate(&mut self, offset: Vector) {
        self.min += offset;
        self.max += offset;
    }

    pub fn rotate(&mut self, _axis: Vector, _radians: f64) -> RenderResult<()> {
        Err(RenderError::UnsupportedTransform {
            surface: "aligned box",
            transform: "rotate",
        })
    }

    pub fn scale(&mut self, factor: f64) {
        *self = Self::new(self.min * factor, self.max * factor);
    }
}

/// Zero-thickness rectangle perpendicular to one axis.
///
/// `min` and `max` agree on the perpendicular axis; the other two components
/// give the rectangle's extent.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSquare {
    axis: Axis,
    min: Vector,
    max: Vector,
}

impl AlignedSquare {
    /// Rectangle on the plane `axis = position` spanning two corners. The
    /// corners' own `axis` components are ignored and may be given in any
    /// order.
    pub fn new(axis: Axis, position: f64, a: Vector, b: Vector) -> Self {
        let i = axis.index();
        let mut min = a.min(b);
        let mut max = a.max(b);
        min[i] = position;
        max[i] = position;
        Self { axis, min, max }
    }

    /// Rectangle on `x = x` spanning `y` and `z`.
    pub fn x(x: f64, y: (f64, f64), z: (f64, f64)) -> Self {
        Self::new(Axis::X, x, Vector::new(x, y.0, z.0), Vector::new(x, y.1, z.1))
    }

    /// Rectangle on `y = y` spanning `x` and `z`.
    pub fn y(y: f64, x: (f64, f64), z: (f64, f64)) -> Self {
        Self::new(Axis::Y, y, Vector::new(x.0, y, z.0), Vector::new(x.1, y, z.1))
    }

    /// Rectangle on `z = z` spanning `x` and `y`.
    pub fn z(z: f64, x: (f64, f64), y: (f64, f64)) -> Self {
        Self::new(Axis::Z, z, Vector::new(x.0, y.0, z), Vector::new(x.1, y.1, z))
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn position(&self) -> f64 {
        self.min[self.axis.index()]
    }

    pub fn intersect(&self, ray: &Ray) -> Option<Intersection> {
        let i = self.axis.index();
        let t = (self.min[i] - ray.origin[i]) / ray.direction[i];
        if !(t > 0.0) {
            return None;
        }

        // Strictly inside the rectangle's open extent
        let hit = ray.at(t);
        let (j, k) = self.axis.others();
        let inside = hit[j] > self.min[j]
            && hit[j] < self.max[j]
            && hit[k] > self.min[k]
            && hit[k] < self.max[k];
        if !inside {
            return None;
        }

        Some(Intersection {
            distance: t,
            unit_normal: self.axis.unit(),
        })
    }

    pub fn bound(&self) -> Aabb {
        Aabb {
            min: self.min,
            max: self.max,
        }
    }

    pub fn translate(&mut self, offset: Vector) {
        self.min += offset;
        self.max += offset;
    }

    pub fn rotate(&mut self, _axis: Vector, _radians: f64) -> RenderResult<()> {
        Err(RenderError::UnsupportedTransform {
            surface: "aligned square",
            transform: "rotate",
        })
    }

    pub fn scale(&mut self, factor: f64) {
        let i = self.axis.index();
        *self = Self::new(self.axis, self.min[i] * factor, self.min * factor, self.max * factor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_hit_from_each_side() {
        let b = AlignedBox::new(Vector::new(-1.0, -2.0, -3.0), Vector::new(1.0, 2.0, 3.0));

        for (axis, unit) in Vector::AXES.into_iter().enumerate() {
            let expected = 4.0 - axis as f64;
            for sign in [1.0, -1.0] {
                let dir = unit * sign;
                let ray = Ray::new(-dir * 5.0, dir);
                let hit = b.intersect(&ray).unwrap();
                assert_eq!(hit.distance, expected, "axis {axis} sign {sign}");
                assert_eq!(hit.unit_normal, -dir, "axis {axis} sign {sign}");
            }
        }
    }

    #[test]
    fn test_box_hit_from_inside_reports_exit_face() {
        let b = AlignedBox::new(Vector::splat(-1.0), Vector::splat(1.0));
        let ray = Ray::new(Vector::ZERO, Vector::Y);
        let hit = b.intersect(&ray).unwrap();
        assert_eq!(hit.distance, 1.0);
        assert_eq!(hit.unit_normal, Vector::Y);
    }

    #[test]
    fn test_box_miss() {
        let b = AlignedBox::new(Vector::splat(-1.0), Vector::splat(1.0));

        let ray = Ray::new(Vector::new(0.0, 5.0, -5.0), Vector::Z);
        assert!(b.intersect(&ray).is_none());

        // Entirely behind
        let ray = Ray::new(Vector::new(0.0, 0.0, 5.0), Vector::Z);
        assert!(b.intersect(&ray).is_none());
    }

    #[test]
    fn test_box_thin_slab_regression() {
        let b = AlignedBox::new(Vector::new(0.1, 0.999, -0.9), Vector::new(0.9, 1.0, -0.1));
        let ray = Ray::new(
            Vector::new(0.18325558497391392, 0.999012404240046, -0.9999999999999999),
            Vector::new(-0.5720297174078126, 0.007828964018125696, 0.8201955313976911),
        );

        let hit = b.intersect(&ray).unwrap();
        assert_eq!(hit.distance, 0.12192214681978378);
        assert_eq!(hit.unit_normal, Vector::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_box_corner_order_and_scale() {
        let mut b = AlignedBox::new(Vector::ONE, Vector::ZERO);
        assert_eq!(b.min, Vector::ZERO);
        assert_eq!(b.max, Vector::ONE);

        b.scale(-2.0);
        assert_eq!(b.min, Vector::splat(-2.0));
        assert_eq!(b.max, Vector::ZERO);

        assert!(b.rotate(Vector::Y, 1.0).is_err());
    }

    #[test]
    fn test_square_hit() {
        let sq = AlignedSquare::y(1.0, (-1.0, 1.0), (-1.0, 1.0));

        let ray = Ray::new(Vector::ZERO, Vector::Y);
        let hit = sq.intersect(&ray).unwrap();
        assert_eq!(hit.distance, 1.0);
        assert_eq!(hit.unit_normal, Vector::Y);

        // Approaching from above still reports the +axis normal
        let ray = Ray::new(Vector::new(0.0, 3.0, 0.0), -Vector::Y);
        let hit = sq.intersect(&ray).unwrap();
        assert_eq!(hit.distance, 2.0);
        assert_eq!(hit.unit_normal, Vector::Y);
    }

    #[test]
    fn test_square_miss() {
        let sq = AlignedSquare::z(-2.0, (0.0, 1.0), (0.0, 1.0));

        // Outside the extent
        let ray = Ray::new(Vector::new(2.0, 0.5, 0.0), -Vector::Z);
        assert!(sq.intersect(&ray).is_none());

        // Exactly on the edge is excluded
        let ray = Ray::new(Vector::new(1.0, 0.5, 0.0), -Vector::Z);
        assert!(sq.intersect(&ray).is_none());

        // Parallel
        let ray = Ray::new(Vector::new(0.5, 0.5, 0.0), Vector::X);
        assert!(sq.intersect(&ray).is_none());
    }

    #[test]
    fn test_square_corner_order_normalised() {
        let sq = AlignedSquare::y(0.0, (1.0, -1.0), (0.0, -1.0));
        let bound = sq.bound();
        assert_eq!(bound.min, Vector::new(-1.0, 0.0, -1.0));
        assert_eq!(bound.max, Vector::new(1.0, 0.0, 0.0));

        let ray = Ray::new(Vector::new(0.0, 1.0, -0.5), -Vector::Y);
        assert!(sq.intersect(&ray).is_some());
    }

    #[test]
    fn test_square_transforms() {
        let mut sq = AlignedSquare::x(1.0, (0.0, 1.0), (0.0, 1.0));
        sq.translate(Vector::new(1.0, 0.0, 0.0));
        assert_eq!(sq.position(), 2.0);

        sq.scale(0.5);
        assert_eq!(sq.position(), 1.0);
        assert_eq!(sq.bound().max, Vector::new(1.0, 0.5, 0.5));

        assert!(matches!(
            sq.rotate(Vector::Z, 0.5),
            Err(RenderError::UnsupportedTransform { .. })
        ));
    }
}
