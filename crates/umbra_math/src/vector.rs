// Extension methods for DVec3.
//
// glam already provides dot/cross/normalize/min/max; these are the extra
// operations the surface and camera code needs.

use crate::{add_ulps, DVec3};

/// Tolerance used by [`VectorExt::is_unit`].
const UNIT_TOLERANCE: f64 = 1e-6;

/// Extension trait for DVec3 to provide ray tracing utilities.
pub trait VectorExt {
    /// Move every component by `ulps` representable doubles.
    fn add_ulps(self, ulps: i64) -> Self;

    /// Rotate about a unit `axis` through the origin (right hand rule).
    fn rotate_about(self, axis: DVec3, radians: f64) -> Self;

    /// Component of `self` along the unit vector `unit`.
    fn proj(self, unit: DVec3) -> Self;

    /// Component of `self` perpendicular to the unit vector `unit`.
    fn rej(self, unit: DVec3) -> Self;

    /// True if the length is within a small tolerance of 1.
    fn is_unit(self) -> bool;
}

impl VectorExt for DVec3 {
    #[inline]
    fn add_ulps(self, ulps: i64) -> Self {
        DVec3::new(
            add_ulps(self.x, ulps),
            add_ulps(self.y, ulps),
            add_ulps(self.z, ulps),
        )
    }

    fn rotate_about(self, u: DVec3, radians: f64) -> Self {
        let (sin, cos) = radians.sin_cos();
        let k = 1.0 - cos;
        let i = DVec3::new(
            cos + u.x * u.x * k,
            u.x * u.y * k - u.z * sin,
            u.x * u.z * k + u.y * sin,
        );
        let j = DVec3::new(
            u.y * u.x * k + u.z * sin,
            cos + u.y * u.y * k,
            u.y * u.z * k - u.x * sin,
        );
        let l = DVec3::new(
            u.z * u.x * k - u.y * sin,
            u.z * u.y * k + u.x * sin,
            cos + u.z * u.z * k,
        );
        DVec3::new(i.dot(self), j.dot(self), l.dot(self))
    }

    #[inline]
    fn proj(self, unit: DVec3) -> Self {
        unit * self.dot(unit)
    }

    #[inline]
    fn rej(self, unit: DVec3) -> Self {
        self - self.proj(unit)
    }

    #[inline]
    fn is_unit(self) -> bool {
        (self.length_squared() - 1.0).abs() < UNIT_TOLERANCE
    }
}
