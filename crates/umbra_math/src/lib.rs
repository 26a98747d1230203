//! Umbra math - double precision geometry shared by the renderer.
//!
//! Vectors are `glam::DVec3`; everything here works in `f64` so that the
//! ULP-based nudging in the renderer stays meaningful.

// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod ray;
mod ulp;
mod vector;

pub use aabb::Aabb;
pub use ray::Ray;
pub use ulp::add_ulps;
pub use vector::VectorExt;

/// Three-component double precision vector used throughout Umbra.
pub type Vector = DVec3;

/// Assert (in debug builds only) that a vector has unit length.
///
/// Compiled out of release builds; never relied on for correctness.
#[macro_export]
macro_rules! debug_assert_unit {
    ($v:expr) => {
        debug_assert!(
            $crate::VectorExt::is_unit($v),
            "expected unit vector, got {:?} (length {})",
            $v,
            $v.length()
        )
    };
}
