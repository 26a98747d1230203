use crate::{Ray, Vector, VectorExt};

/// Axis-Aligned Bounding Box used by the uniform grid.
///
/// Stored as two corners. An "empty" box has `min > max` and absorbs
/// nothing when merged.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Vector,
    pub max: Vector,
}

impl Aabb {
    /// Empty box (contains nothing, identity for [`Aabb::surrounding`]).
    pub const EMPTY: Aabb = Aabb {
        min: Vector::splat(f64::INFINITY),
        max: Vector::splat(f64::NEG_INFINITY),
    };

    /// Create an AABB from two corner points in any order.
    pub fn from_points(a: Vector, b: Vector) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(a: &Aabb, b: &Aabb) -> Self {
        Self {
            min: a.min.min(b.min),
            max: a.max.max(b.max),
        }
    }

    /// Size of the box along each axis.
    pub fn extent(&self) -> Vector {
        self.max - self.min
    }

    /// Product of the three extents.
    pub fn volume(&self) -> f64 {
        let e = self.extent();
        e.x * e.y * e.z
    }

    /// Returns true if `p` lies inside or on the boundary of the box.
    pub fn contains(&self, p: Vector) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Grow the box outward by `ulps` representable doubles on every face.
    pub fn pad_ulps(&self, ulps: i64) -> Self {
        Self {
            min: self.min.add_ulps(-ulps),
            max: self.max.add_ulps(ulps),
        }
    }

    /// Parameter range over which the ray's line is inside the box.
    ///
    /// Uses the slab method. The returned `(enter, exit)` may be negative
    /// when the box is behind the ray origin; callers decide what to do with
    /// that.
    pub fn ray_range(&self, ray: &Ray) -> Option<(f64, f64)> {
        let inv = ray.direction.recip();
        let t0 = (self.min - ray.origin) * inv;
        let t1 = (self.max - ray.origin) * inv;

        // 0 * inf: origin on a slab plane while travelling parallel to it.
        let on_plane = t0.is_nan_mask() | t1.is_nan_mask();
        let near = Vector::select(on_plane, Vector::splat(f64::NEG_INFINITY), t0.min(t1));
        let far = Vector::select(on_plane, Vector::splat(f64::INFINITY), t0.max(t1));

        let enter = near.max_element();
        let exit = far.min_element();

        if enter <= exit {
            Some((enter, exit))
        } else {
            None
        }
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}
