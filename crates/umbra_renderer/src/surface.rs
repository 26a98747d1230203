//! Closed set of renderable surfaces.
//!
//! Every primitive answers the same four questions (intersect, bound,
//! transform, describe) so the grid and tracer can stay ignorant of the
//! concrete shape.

use crate::aligned::{AlignedBox, AlignedSquare};
use crate::disc::Disc;
use crate::error::RenderResult;
use crate::material::Material;
use crate::pipe::Pipe;
use crate::sphere::Sphere;
use crate::triangle::Triangle;
use umbra_math::{Aabb, Ray, Vector};

/// Outward ULP padding applied to curved and sloped bounds.
pub(crate) const ULP_FUDGE_FACTOR: i64 = 50;

/// A ray/surface hit.
///
/// `distance` is in units of the ray's direction length. The normal is the
/// surface's geometric normal and may face either way relative to the ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub distance: f64,
    pub unit_normal: Vector,
}

/// Any renderable surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Surface {
    Triangle(Triangle),
    AlignedBox(AlignedBox),
    AlignedSquare(AlignedSquare),
    Sphere(Sphere),
    Disc(Disc),
    Pipe(Pipe),
}

impl Surface {
    /// Nearest hit in front of the ray origin, if any.
    #[inline]
    pub fn intersect(&self, ray: &Ray) -> Option<Intersection> {
        match self {
            Surface::Triangle(s) => s.intersect(ray),
            Surface::AlignedBox(s) => s.intersect(ray),
            Surface::AlignedSquare(s) => s.intersect(ray),
            Surface::Sphere(s) => s.intersect(ray),
            Surface::Disc(s) => s.intersect(ray),
            Surface::Pipe(s) => s.intersect(ray),
        }
    }

    /// Conservative axis-aligned bounds.
    pub fn bound(&self) -> Aabb {
        match self {
            Surface::Triangle(s) => s.bound(),
            Surface::AlignedBox(s) => s.bound(),
            Surface::AlignedSquare(s) => s.bound(),
            Surface::Sphere(s) => s.bound(),
            Surface::Disc(s) => s.bound(),
            Surface::Pipe(s) => s.bound(),
        }
    }

    pub fn translate(&mut self, offset: Vector) {
        match self {
            Surface::Triangle(s) => s.translate(offset),
            Surface::AlignedBox(s) => s.translate(offset),
            Surface::AlignedSquare(s) => s.translate(offset),
            Surface::Sphere(s) => s.translate(offset),
            Surface::Disc(s) => s.translate(offset),
            Surface::Pipe(s) => s.translate(offset),
        }
    }

    /// Uniform scale about the world origin.
    pub fn scale(&mut self, factor: f64) {
        match self {
            Surface::Triangle(s) => s.scale(factor),
            Surface::AlignedBox(s) => s.scale(factor),
            Surface::AlignedSquare(s) => s.scale(factor),
            Surface::Sphere(s) => s.scale(factor),
            Surface::Disc(s) => s.scale(factor),
            Surface::Pipe(s) => s.scale(factor),
        }
    }

    /// Rotate about `axis` through the world origin. The axis need not be
    /// unit length.
    ///
    /// Axis-aligned surfaces cannot rotate; they return an error and are left
    /// untouched.
    pub fn rotate(&mut self, axis: Vector, radians: f64) -> RenderResult<()> {
        match self {
            Surface::Triangle(s) => s.rotate(axis, radians),
            Surface::AlignedBox(s) => return s.rotate(axis, radians),
            Surface::AlignedSquare(s) => return s.rotate(axis, radians),
            Surface::Sphere(s) => s.rotate(axis, radians),
            Surface::Disc(s) => s.rotate(axis, radians),
            Surface::Pipe(s) => s.rotate(axis, radians),
        }
        Ok(())
    }

    /// Solid box covering this surface's bounds.
    pub fn to_bounding_box(&self) -> Surface {
        let bound = self.bound();
        Surface::AlignedBox(AlignedBox::new(bound.min, bound.max))
    }

    /// Short name for logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Surface::Triangle(_) => "triangle",
            Surface::AlignedBox(_) => "aligned box",
            Surface::AlignedSquare(_) => "aligned square",
            Surface::Sphere(_) => "sphere",
            Surface::Disc(_) => "disc",
            Surface::Pipe(_) => "pipe",
        }
    }
}

macro_rules! impl_from_primitive {
    ($($ty:ident),*) => {
        $(
            impl From<$ty> for Surface {
                fn from(s: $ty) -> Self {
                    Surface::$ty(s)
                }
            }
        )*
    };
}

impl_from_primitive!(Triangle, AlignedBox, AlignedSquare, Sphere, Disc, Pipe);

/// A surface paired with its material.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub surface: Surface,
    pub material: Material,
}

impl Object {
    pub fn new(surface: impl Into<Surface>, material: Material) -> Self {
        Self {
            surface: surface.into(),
            material,
        }
    }
}

/// Real roots of `a*x^2 + b*x + c = 0`, or `None` when the discriminant is
/// negative.
///
/// Uses `q = -(b + sign(b)*sqrt(disc)) / 2` to avoid cancellation; the roots
/// are `q/a` and `c/q` in no particular order. Degenerate inputs (`a == 0`)
/// yield non-finite roots which callers reject by comparison.
pub(crate) fn solve_quadratic(a: f64, b: f64, c: f64) -> Option<(f64, f64)> {
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let q = -0.5 * (b + 1f64.copysign(b) * disc.sqrt());
    Some((q / a, c / q))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_solve_quadratic() {
        // (x - 2)(x - 3)
        let (x1, x2) = solve_quadratic(1.0, -5.0, 6.0).unwrap();
        assert_eq!((x1.min(x2), x1.max(x2)), (2.0, 3.0));

        // No real roots
        assert!(solve_quadratic(1.0, 0.0, 1.0).is_none());

        // Small root survives cancellation
        let (x1, x2) = solve_quadratic(1.0, 1e8, 1.0).unwrap();
        let small = x1.max(x2);
        assert!((small + 1e-8).abs() < 1e-20, "got {small}");
    }

    #[test]
    fn test_surface_dispatch() {
        let surface: Surface = Sphere::new(Vector::new(0.0, 0.0, -3.0), 1.0).into();
        assert_eq!(surface.kind(), "sphere");

        let ray = Ray::new(Vector::ZERO, -Vector::Z);
        let hit = surface.intersect(&ray).unwrap();
        assert!((hit.distance - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_rotate_aligned_is_rejected() {
        let mut surface: Surface = AlignedBox::new(Vector::ZERO, Vector::ONE).into();
        let before = surface.clone();

        let err = surface.rotate(Vector::Y, FRAC_PI_2).unwrap_err();
        assert!(matches!(
            err,
            RenderError::UnsupportedTransform {
                surface: "aligned box",
                ..
            }
        ));
        assert_eq!(surface, before);
    }

    #[test]
    fn test_rotate_normalises_axis() {
        let mut surface: Surface = Sphere::new(Vector::X, 1.0).into();
        surface.rotate(Vector::new(0.0, 0.0, 10.0), FRAC_PI_2).unwrap();

        match surface {
            Surface::Sphere(s) => assert!((s.center - Vector::Y).length() < 1e-12),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_to_bounding_box() {
        let disc: Surface = Disc::new(Vector::ZERO, 1.0, Vector::Y).into();
        let boxed = disc.to_bounding_box();

        assert_eq!(boxed.kind(), "aligned box");
        assert_eq!(boxed.bound(), disc.bound());
    }

    #[test]
    fn test_object_new() {
        let object = Object::new(
            Triangle::new(Vector::ZERO, Vector::X, Vector::Y),
            Material::mirror(),
        );
        assert_eq!(object.surface.kind(), "triangle");
        assert!(object.material.mirror);
    }
}
