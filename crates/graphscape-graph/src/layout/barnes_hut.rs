//! Barnes–Hut spatial subdivision for many-body repulsion.
//!
//! A quadtree in 2D and an octree in 3D, stored as a flat arena. Each cell keeps
//! the number of bodies below it and their center of mass; far-away cells are
//! treated as a single body when `width² / distance² < theta²`.

use graphscape_core::Vec3;

/// Deep recursion only happens for (nearly) coincident bodies; those share a leaf.
const MAX_DEPTH: u32 = 24;

#[derive(Debug, Clone)]
struct Cell {
    center: Vec3,
    half_width: f32,
    mass: f32,
    center_of_mass: Vec3,
    children: Vec<usize>,
    bodies: Vec<usize>,
}

impl Cell {
    fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    fn contains(&self, p: Vec3) -> bool {
        (p.x - self.center.x).abs() <= self.half_width
            && (p.y - self.center.y).abs() <= self.half_width
            && (p.z - self.center.z).abs() <= self.half_width
    }
}

#[derive(Debug, Clone)]
pub struct SpatialTree {
    cells: Vec<Cell>,
    dimensions: usize,
}

impl SpatialTree {
    pub fn build(positions: &[Vec3], dimensions: usize) -> Self {
        let mut tree = Self {
            cells: Vec::with_capacity(positions.len() * 2),
            dimensions,
        };
        if positions.is_empty() {
            return tree;
        }

        let (mut min, mut max) = (positions[0], positions[0]);
        for p in positions {
            min = Vec3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z));
            max = Vec3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z));
        }
        let center = (min + max) * 0.5;
        let extent = max - min;
        let half_width = (extent.x.max(extent.y).max(extent.z) * 0.5).max(1.0);

        let all: Vec<usize> = (0..positions.len()).collect();
        tree.build_cell(positions, all, center, half_width, 0);
        tree
    }

    fn build_cell(
        &mut self,
        positions: &[Vec3],
        bodies: Vec<usize>,
        center: Vec3,
        half_width: f32,
        depth: u32,
    ) -> usize {
        let mass = bodies.len() as f32;
        let sum = bodies
            .iter()
            .fold(Vec3::ZERO, |acc, &b| acc + positions[b]);

        let cell_idx = self.cells.len();
        self.cells.push(Cell {
            center,
            half_width,
            mass,
            center_of_mass: sum / mass.max(1.0),
            children: Vec::new(),
            bodies: Vec::new(),
        });

        if bodies.len() <= 1 || depth >= MAX_DEPTH {
            self.cells[cell_idx].bodies = bodies;
            return cell_idx;
        }

        let octants = if self.dimensions == 3 { 8 } else { 4 };
        let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); octants];
        for b in bodies {
            buckets[self.octant(center, positions[b])].push(b);
        }

        let child_half = half_width * 0.5;
        let mut children = Vec::new();
        for (octant, bucket) in buckets.into_iter().enumerate() {
            if bucket.is_empty() {
                continue;
            }
            let child_center = self.child_center(center, child_half, octant);
            children.push(self.build_cell(positions, bucket, child_center, child_half, depth + 1));
        }
        self.cells[cell_idx].children = children;
        cell_idx
    }

    fn octant(&self, center: Vec3, p: Vec3) -> usize {
        let mut octant = 0;
        if p.x >= center.x {
            octant |= 1;
        }
        if p.y >= center.y {
            octant |= 2;
        }
        if self.dimensions == 3 && p.z >= center.z {
            octant |= 4;
        }
        octant
    }

    fn child_center(&self, center: Vec3, child_half: f32, octant: usize) -> Vec3 {
        let offset = |bit: usize| if octant & bit != 0 { child_half } else { -child_half };
        let z = if self.dimensions == 3 {
            center.z + offset(4)
        } else {
            center.z
        };
        Vec3::new(center.x + offset(1), center.y + offset(2), z)
    }

    /// Sum of `delta * mass / distance²` acting on `body` (unit strength per body).
    ///
    /// `jiggle` supplies a tiny random offset for bodies that coincide exactly.
    pub fn field_at(
        &self,
        body: usize,
        positions: &[Vec3],
        theta: f32,
        min_distance_sq: f32,
        jiggle: &mut impl FnMut() -> Vec3,
    ) -> Vec3 {
        let mut field = Vec3::ZERO;
        if self.cells.is_empty() {
            return field;
        }
        let origin = positions[body];
        let theta_sq = theta * theta;
        let mut stack = vec![0usize];

        while let Some(cell_idx) = stack.pop() {
            let cell = &self.cells[cell_idx];
            if cell.is_leaf() {
                for &other in &cell.bodies {
                    if other == body {
                        continue;
                    }
                    let mut delta = positions[other] - origin;
                    if delta.length_sq() == 0.0 {
                        delta = jiggle();
                    }
                    field += delta / soften(delta.length_sq(), min_distance_sq);
                }
                continue;
            }

            // A cell holding the body itself is always opened.
            let delta = cell.center_of_mass - origin;
            let dist_sq = delta.length_sq();
            let width = cell.half_width * 2.0;
            if !cell.contains(origin) && dist_sq > 0.0 && width * width / dist_sq < theta_sq {
                field += delta * (cell.mass / soften(dist_sq, min_distance_sq));
            } else {
                stack.extend(cell.children.iter().copied());
            }
        }

        field
    }
}

/// Clamp tiny squared distances the way d3 does: `l < dmin² => l = sqrt(dmin² * l)`.
pub(crate) fn soften(dist_sq: f32, min_distance_sq: f32) -> f32 {
    if dist_sq < min_distance_sq {
        (min_distance_sq * dist_sq).sqrt().max(f32::MIN_POSITIVE)
    } else {
        dist_sq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exact_field(body: usize, positions: &[Vec3]) -> Vec3 {
        let mut field = Vec3::ZERO;
        for (i, p) in positions.iter().enumerate() {
            if i != body {
                let delta = *p - positions[body];
                field += delta / soften(delta.length_sq(), 1.0);
            }
        }
        field
    }

    fn grid(n: usize) -> Vec<Vec3> {
        (0..n * n)
            .map(|i| Vec3::planar((i % n) as f32 * 10.0, (i / n) as f32 * 10.0))
            .collect()
    }

    #[test]
    fn test_tiny_theta_matches_exact_sum() {
        let positions = grid(5);
        let tree = SpatialTree::build(&positions, 2);
        let mut jiggle = || Vec3::ZERO;
        for body in [0, 7, 24] {
            let approx = tree.field_at(body, &positions, 1e-3, 1.0, &mut jiggle);
            let exact = exact_field(body, &positions);
            assert!((approx - exact).length() < 1e-4, "{approx:?} vs {exact:?}");
        }
    }

    #[test]
    fn test_approximation_is_close_for_far_bodies() {
        let mut positions = grid(6);
        positions.push(Vec3::planar(1000.0, 1000.0));
        let far = positions.len() - 1;
        let tree = SpatialTree::build(&positions, 2);
        let mut jiggle = || Vec3::ZERO;
        let approx = tree.field_at(far, &positions, 0.8, 1.0, &mut jiggle);
        let exact = exact_field(far, &positions);
        assert!((approx - exact).length() / exact.length() < 0.05);
    }

    #[test]
    fn test_coincident_bodies_terminate() {
        let positions = vec![Vec3::new(1.0, 1.0, 1.0); 10];
        let tree = SpatialTree::build(&positions, 3);
        let mut calls = 0;
        let mut jiggle = || {
            calls += 1;
            Vec3::new(1e-3, 0.0, 0.0)
        };
        let field = tree.field_at(0, &positions, 0.5, 1.0, &mut jiggle);
        assert!(field.is_finite());
        assert_eq!(calls, 9);
    }

    #[test]
    fn test_empty_tree() {
        let tree = SpatialTree::build(&[], 2);
        let mut jiggle = || Vec3::ZERO;
        assert_eq!(
            tree.field_at(0, &[Vec3::ZERO], 0.5, 1.0, &mut jiggle),
            Vec3::ZERO
        );
    }
}
