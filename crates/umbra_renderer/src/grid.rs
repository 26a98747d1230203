//! Uniform grid acceleration structure.
//!
//! The scene bounds are split into `res.x * res.y * res.z` equal cells and
//! every object is registered in each cell its bounds overlap. A ray walks the
//! cells it pierces in order (3D-DDA) and stops at the first cell that yields
//! a hit lying no further than that cell's exit boundary.
//!
//! Cell contents are stored compressed: `cell_start[i]..cell_start[i + 1]`
//! indexes into one flat `cell_objects` array.

use crate::accel::{AccelerationStructure, Hit};
use crate::error::{RenderError, RenderResult};
use crate::surface::Object;
use serde::Serialize;
use umbra_math::{add_ulps, Aabb, Ray, Vector};

/// Default target number of objects per cell.
pub const DEFAULT_LAMBDA: f64 = 4.0;

/// Upper bound on cells along any one axis.
const MAX_RESOLUTION: usize = 1024;

/// Slack (in cells) applied when mapping object bounds onto cell ranges.
const CELL_EPSILON: f64 = 1e-9;

/// Hits up to this many ULPs past a cell's exit boundary still count.
const BOUNDARY_ULP_FUDGE: i64 = 1000;

/// Summary of a built grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridStats {
    pub objects: usize,
    pub resolution: [usize; 3],
    pub cells: usize,
    pub empty_cells: usize,
    /// Total object references across all cells
    pub references: usize,
    pub max_cell_len: usize,
}

/// Uniform grid over a fixed set of objects.
#[derive(Debug, Clone)]
pub struct Grid {
    objects: Vec<Object>,
    bounds: Aabb,
    resolution: [usize; 3],
    stride: Vector,
    cell_start: Vec<u32>,
    cell_objects: Vec<u32>,
}

impl Grid {
    /// Build a grid aiming for roughly `lambda` objects per cell.
    pub fn new(objects: Vec<Object>, lambda: f64) -> RenderResult<Self> {
        if objects.is_empty() {
            return Err(RenderError::EmptyScene);
        }
        if !(lambda > 0.0 && lambda.is_finite()) {
            return Err(RenderError::InvalidConfig(format!(
                "grid lambda must be positive and finite, got {lambda}"
            )));
        }

        let mut object_bounds = Vec::with_capacity(objects.len());
        for (i, object) in objects.iter().enumerate() {
            let bound = object.surface.bound();
            if !(bound.min.is_finite() && bound.max.is_finite()) {
                return Err(RenderError::InvalidConfig(format!(
                    "object {i} ({}) has non-finite bounds",
                    object.surface.kind()
                )));
            }
            object_bounds.push(bound);
        }
        let bounds = object_bounds
            .iter()
            .fold(Aabb::EMPTY, |acc, b| Aabb::surrounding(&acc, b));

        let resolution = Self::choose_resolution(&bounds, objects.len(), lambda);
        let stride = bounds.extent() / Vector::new(
            resolution[0] as f64,
            resolution[1] as f64,
            resolution[2] as f64,
        );

        let mut grid = Self {
            objects,
            bounds,
            resolution,
            stride,
            cell_start: Vec::new(),
            cell_objects: Vec::new(),
        };
        grid.populate(&object_bounds);

        log::debug!("Built grid: {:?}", grid.stats());
        Ok(grid)
    }

    /// Per-axis cell counts so that the total is about `lambda * n`.
    ///
    /// Extents are floored at `largest / MAX_RESOLUTION` before computing the
    /// volume so flat scenes do not divide by zero; axes thinner than that
    /// floor get a single cell.
    fn choose_resolution(bounds: &Aabb, n: usize, lambda: f64) -> [usize; 3] {
        let extent = bounds.extent();
        let largest = extent.max_element();
        if !(largest > 0.0) {
            return [1, 1, 1];
        }
        let floor = largest / MAX_RESOLUTION as f64;
        let floored = extent.max(Vector::splat(floor));
        let volume = Aabb::from_points(Vector::ZERO, floored).volume();
        let factor = (lambda * n as f64 / volume).cbrt();

        let mut res = [1; 3];
        for axis in 0..3 {
            if extent[axis] < floor {
                continue;
            }
            // Saturating float->int cast; NaN becomes 0 and is clamped up.
            let cells = (floored[axis] * factor) as usize;
            res[axis] = cells.clamp(1, MAX_RESOLUTION);
        }
        res
    }

    /// Counting sort of (cell, object) references into the CSR arrays.
    fn populate(&mut self, object_bounds: &[Aabb]) {
        let cell_count = self.cell_count();
        let ranges: Vec<([usize; 3], [usize; 3])> =
            object_bounds.iter().map(|b| self.cell_range(b)).collect();

        let mut counts = vec![0u32; cell_count + 1];
        for (lo, hi) in &ranges {
            self.for_each_cell(*lo, *hi, |cell| counts[cell] += 1);
        }

        // Exclusive prefix sum; counts[i] becomes the start of cell i.
        let mut total = 0u32;
        for count in counts.iter_mut() {
            let c = *count;
            *count = total;
            total += c;
        }

        let mut cursor = counts.clone();
        let mut cell_objects = vec![0u32; total as usize];
        for (object, (lo, hi)) in ranges.iter().enumerate() {
            self.for_each_cell(*lo, *hi, |cell| {
                cell_objects[cursor[cell] as usize] = object as u32;
                cursor[cell] += 1;
            });
        }

        self.cell_start = counts;
        self.cell_objects = cell_objects;
    }

    fn for_each_cell(&self, lo: [usize; 3], hi: [usize; 3], mut f: impl FnMut(usize)) {
        for z in lo[2]..=hi[2] {
            for y in lo[1]..=hi[1] {
                for x in lo[0]..=hi[0] {
                    f(self.cell_index([x, y, z]));
                }
            }
        }
    }

    /// Inclusive range of cells touched by `bound`, clamped into the grid.
    fn cell_range(&self, bound: &Aabb) -> ([usize; 3], [usize; 3]) {
        let mut lo = [0; 3];
        let mut hi = [0; 3];
        for axis in 0..3 {
            let a = self.cell_coord(bound.min[axis], axis, -CELL_EPSILON);
            let b = self.cell_coord(bound.max[axis], axis, CELL_EPSILON);
            lo[axis] = a.min(b) as usize;
            hi[axis] = a.max(b) as usize;
        }
        (lo, hi)
    }

    /// Cell containing coordinate `x` along `axis`, clamped to the grid.
    #[inline]
    fn cell_coord(&self, x: f64, axis: usize, slack: f64) -> i64 {
        let last = self.resolution[axis] as i64 - 1;
        if !(self.stride[axis] > 0.0) {
            return 0;
        }
        let coord = (x - self.bounds.min[axis]) / self.stride[axis] + slack;
        (coord.floor() as i64).clamp(0, last)
    }

    #[inline]
    fn cell_index(&self, [x, y, z]: [usize; 3]) -> usize {
        x + self.resolution[0] * (y + self.resolution[1] * z)
    }

    #[inline]
    fn cell(&self, index: usize) -> &[u32] {
        let start = self.cell_start[index] as usize;
        let end = self.cell_start[index + 1] as usize;
        &self.cell_objects[start..end]
    }

    pub fn cell_count(&self) -> usize {
        self.resolution.iter().product()
    }

    pub fn resolution(&self) -> [usize; 3] {
        self.resolution
    }

    pub fn bounding_box(&self) -> Aabb {
        self.bounds
    }

    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn stats(&self) -> GridStats {
        let cells = self.cell_count();
        let mut empty_cells = 0;
        let mut max_cell_len = 0;
        for i in 0..cells {
            let len = self.cell(i).len();
            if len == 0 {
                empty_cells += 1;
            }
            max_cell_len = max_cell_len.max(len);
        }
        GridStats {
            objects: self.objects.len(),
            resolution: self.resolution,
            cells,
            empty_cells,
            references: self.cell_objects.len(),
            max_cell_len,
        }
    }
}

impl AccelerationStructure for Grid {
    fn closest_hit(&self, ray: &Ray) -> Option<Hit<'_>> {
        let (enter, exit) = self.bounds.ray_range(ray)?;
        if !(exit >= 0.0) {
            return None;
        }

        let start = ray.at(enter.max(0.0));
        let mut cell = [0i64; 3];
        let mut step = [0i64; 3];
        for axis in 0..3 {
            cell[axis] = self.cell_coord(start[axis], axis, 0.0);
            step[axis] = if ray.direction[axis] < 0.0 { -1 } else { 1 };
        }

        loop {
            // Distance to the exit boundary on each axis, from the integer
            // cell coordinate rather than accumulated deltas.
            let mut t_next = [f64::INFINITY; 3];
            for axis in 0..3 {
                let d = ray.direction[axis];
                if d != 0.0 {
                    let face = cell[axis] + i64::from(step[axis] > 0);
                    let boundary = self.bounds.min[axis] + face as f64 * self.stride[axis];
                    t_next[axis] = (boundary - ray.origin[axis]) / d;
                }
            }
            let axis = if t_next[0] < t_next[1].min(t_next[2]) {
                0
            } else if t_next[1] < t_next[2] {
                1
            } else {
                2
            };
            let limit = add_ulps(t_next[axis], BOUNDARY_ULP_FUDGE);

            let index = self.cell_index(cell.map(|c| c as usize));
            let mut closest: Option<Hit<'_>> = None;
            for &object in self.cell(index) {
                let object = &self.objects[object as usize];
                let Some(intersection) = object.surface.intersect(ray) else {
                    continue;
                };
                // NaN limit (degenerate ray) accepts nothing here and falls
                // through to stepping out of the grid.
                if !(intersection.distance <= limit) {
                    continue;
                }
                if closest.map_or(true, |c| intersection.distance < c.intersection.distance) {
                    closest = Some(Hit {
                        intersection,
                        material: &object.material,
                    });
                }
            }
            if closest.is_some() {
                return closest;
            }

            cell[axis] += step[axis];
            if cell[axis] < 0 || cell[axis] >= self.resolution[axis] as i64 {
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accel::ObjectList;
    use crate::aligned::{AlignedBox, AlignedSquare};
    use crate::material::{Color, Material};
    use crate::sphere::Sphere;
    use crate::triangle::Triangle;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_point(rng: &mut StdRng, half: f64) -> Vector {
        Vector::new(
            rng.gen_range(-half..half),
            rng.gen_range(-half..half),
            rng.gen_range(-half..half),
        )
    }

    fn random_scene(rng: &mut StdRng, n: usize) -> Vec<Object> {
        (0..n)
            .map(|i| {
                let c = random_point(rng, 10.0);
                let material = Material::diffuse(Color::splat(i as f64 / n as f64));
                match i % 3 {
                    0 => Object::new(Sphere::new(c, rng.gen_range(0.1..1.0)), material),
                    1 => Object::new(
                        Triangle::new(
                            c,
                            c + random_point(rng, 1.5),
                            c + random_point(rng, 1.5),
                        ),
                        material,
                    ),
                    _ => Object::new(
                        AlignedBox::new(c, c + random_point(rng, 1.0)),
                        material,
                    ),
                }
            })
            .collect()
    }

    #[test]
    fn test_grid_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let objects = random_scene(&mut rng, 200);
        let grid = Grid::new(objects.clone(), DEFAULT_LAMBDA).unwrap();
        let list = ObjectList::new(objects);

        let mut hits = 0;
        for _ in 0..2000 {
            let origin = random_point(&mut rng, 15.0);
            let target = random_point(&mut rng, 10.0);
            let ray = Ray::new(origin, target - origin).normalized();

            let expected = list.closest_hit(&ray);
            let actual = grid.closest_hit(&ray);
            match (expected, actual) {
                (None, None) => {}
                (Some(e), Some(a)) => {
                    hits += 1;
                    let (de, da) = (e.intersection.distance, a.intersection.distance);
                    assert!(
                        (de - da).abs() <= 1e-9 * de.max(1.0),
                        "ray {ray:?}: brute force {de}, grid {da}"
                    );
                }
                (e, a) => panic!(
                    "ray {ray:?}: brute force {:?}, grid {:?}",
                    e.map(|h| h.intersection),
                    a.map(|h| h.intersection)
                ),
            }
        }
        // Rays aim into the object cloud, so most should hit something.
        assert!(hits > 200, "only {hits} hits");
    }

    #[test]
    fn test_grid_axis_aligned_rays() {
        // Rays with zero direction components exercise the infinite
        // boundary distances.
        let mut rng = StdRng::seed_from_u64(7);
        let objects = random_scene(&mut rng, 60);
        let grid = Grid::new(objects.clone(), DEFAULT_LAMBDA).unwrap();
        let list = ObjectList::new(objects);

        for _ in 0..300 {
            let origin = random_point(&mut rng, 12.0);
            for dir in [Vector::X, -Vector::X, Vector::Y, -Vector::Y, Vector::Z, -Vector::Z] {
                let ray = Ray::new(origin, dir);
                let expected = list.closest_hit(&ray).map(|h| h.intersection.distance);
                let actual = grid.closest_hit(&ray).map(|h| h.intersection.distance);
                match (expected, actual) {
                    (None, None) => {}
                    (Some(e), Some(a)) => assert!((e - a).abs() <= 1e-9 * e.max(1.0)),
                    other => panic!("ray {ray:?}: {other:?}"),
                }
            }
        }
    }

    #[test]
    fn test_grid_population_with_swapped_square_corners() {
        let objects = vec![
            Object::new(AlignedSquare::y(1.0, (0.0, 1.0), (0.0, -1.0)), Material::default()),
            Object::new(
                AlignedSquare::z(1.3, (-10.0, 10.0), (-10.0, 10.0)),
                Material::default(),
            ),
        ];
        let grid = Grid::new(objects, DEFAULT_LAMBDA).unwrap();
        let stats = grid.stats();
        assert!(stats.references >= 2);

        let ray = Ray::new(Vector::new(0.5, 5.0, -0.5), -Vector::Y);
        let hit = grid.closest_hit(&ray).unwrap();
        assert!((hit.intersection.distance - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_grid_flat_scene() {
        // Every object lies in the y = 0 plane.
        let objects: Vec<Object> = (0..16)
            .map(|i| {
                let x = (i % 4) as f64 * 2.0;
                let z = (i / 4) as f64 * 2.0;
                Object::new(
                    AlignedSquare::y(0.0, (x, x + 1.0), (z, z + 1.0)),
                    Material::default(),
                )
            })
            .collect();
        let grid = Grid::new(objects, DEFAULT_LAMBDA).unwrap();
        assert_eq!(grid.resolution()[1], 1);

        let ray = Ray::new(Vector::new(4.5, 3.0, 4.5), -Vector::Y);
        let hit = grid.closest_hit(&ray).unwrap();
        assert_eq!(hit.intersection.distance, 3.0);

        // Between squares
        let ray = Ray::new(Vector::new(1.5, 3.0, 1.5), -Vector::Y);
        assert!(grid.closest_hit(&ray).is_none());
    }

    #[test]
    fn test_grid_single_object_and_origin_outside() {
        let grid = Grid::new(
            vec![Object::new(Sphere::new(Vector::ZERO, 1.0), Material::default())],
            DEFAULT_LAMBDA,
        )
        .unwrap();
        assert_eq!(grid.len(), 1);

        let ray = Ray::new(Vector::new(0.0, 0.0, 10.0), -Vector::Z);
        let hit = grid.closest_hit(&ray).unwrap();
        assert!((hit.intersection.distance - 9.0).abs() < 1e-12);

        // Grid behind the ray
        let ray = Ray::new(Vector::new(0.0, 0.0, 10.0), Vector::Z);
        assert!(grid.closest_hit(&ray).is_none());

        // Passes beside the grid
        let ray = Ray::new(Vector::new(5.0, 0.0, 10.0), -Vector::Z);
        assert!(grid.closest_hit(&ray).is_none());
    }

    #[test]
    fn test_grid_resolution_tracks_lambda() {
        let mut rng = StdRng::seed_from_u64(11);
        let objects = random_scene(&mut rng, 500);
        let grid = Grid::new(objects, DEFAULT_LAMBDA).unwrap();
        let stats = grid.stats();

        let target = DEFAULT_LAMBDA * 500.0;
        let cells = stats.cells as f64;
        assert!(cells > target / 4.0 && cells < target * 2.0, "{stats:?}");
        assert!(stats.references >= 500);
    }

    #[test]
    fn test_grid_flat_scene_far_from_origin() {
        // Floored extents must not vanish against large coordinates.
        let objects: Vec<Object> = (0..8)
            .map(|i| {
                let x = 1e6 + i as f64;
                Object::new(
                    AlignedSquare::y(1e6, (x, x + 0.5), (1e6, 1e6 + 8.0)),
                    Material::default(),
                )
            })
            .collect();
        let grid = Grid::new(objects, DEFAULT_LAMBDA).unwrap();
        let [x, y, z] = grid.resolution();
        assert_eq!(y, 1);
        assert!(x < MAX_RESOLUTION && z < MAX_RESOLUTION, "{:?}", grid.resolution());

        let ray = Ray::new(Vector::new(1e6 + 3.25, 1e6 + 2.0, 1e6 + 4.0), -Vector::Y);
        let hit = grid.closest_hit(&ray).unwrap();
        assert_eq!(hit.intersection.distance, 2.0);
    }

    #[test]
    fn test_grid_errors() {
        assert!(matches!(
            Grid::new(Vec::new(), DEFAULT_LAMBDA),
            Err(RenderError::EmptyScene)
        ));

        let objects = vec![Object::new(Sphere::new(Vector::ZERO, 1.0), Material::default())];
        assert!(matches!(
            Grid::new(objects.clone(), 0.0),
            Err(RenderError::InvalidConfig(_))
        ));
        assert!(matches!(
            Grid::new(objects, f64::NAN),
            Err(RenderError::InvalidConfig(_))
        ));
    }
}
