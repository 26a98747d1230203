//! Closest-hit queries over a set of objects.

use crate::material::Material;
use crate::surface::{Intersection, Object};
use umbra_math::{Aabb, Ray};

/// Closest hit along a ray together with the material that was struck.
#[derive(Debug, Clone, Copy)]
pub struct Hit<'a> {
    pub intersection: Intersection,
    pub material: &'a Material,
}

/// Anything that can answer "what does this ray hit first".
pub trait AccelerationStructure: Send + Sync {
    /// Nearest hit with positive distance, or `None` on a miss.
    fn closest_hit(&self, ray: &Ray) -> Option<Hit<'_>>;
}

/// Brute-force linear scan over every object.
///
/// Quadratic in practice, but trivially correct; used for tiny scenes and as
/// the reference the grid is checked against.
#[derive(Debug, Clone, Default)]
pub struct ObjectList {
    objects: Vec<Object>,
    bbox: Aabb,
}

impl ObjectList {
    pub fn new(objects: Vec<Object>) -> Self {
        let bbox = objects
            .iter()
            .fold(Aabb::EMPTY, |acc, o| Aabb::surrounding(&acc, &o.surface.bound()));
        Self { objects, bbox }
    }

    /// Add an object to the list.
    pub fn add(&mut self, object: Object) {
        self.bbox = Aabb::surrounding(&self.bbox, &object.surface.bound());
        self.objects.push(object);
    }

    /// Get the number of objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn bounding_box(&self) -> Aabb {
        self.bbox
    }

    pub fn objects(&self) -> &[Object] {
        &self.objects
    }
}

impl AccelerationStructure for ObjectList {
    fn closest_hit(&self, ray: &Ray) -> Option<Hit<'_>> {
        let mut closest: Option<Hit<'_>> = None;

        for object in &self.objects {
            if let Some(intersection) = object.surface.intersect(ray) {
                let nearer = closest
                    .map_or(true, |c| intersection.distance < c.intersection.distance);
                if nearer {
                    closest = Some(Hit {
                        intersection,
                        material: &object.material,
                    });
                }
            }
        }

        closest
    }
}
