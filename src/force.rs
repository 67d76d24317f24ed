//! Softened Newtonian gravity and the Barnes-Hut opening criterion.

use nalgebra::Vector3;

use crate::{
    octree::{
        dense::{DenseOctree, MAX_LEVELS},
        CellSummary,
    },
    Parameters,
};

/// The force kernel shared by every solver.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Gravity {
    /// Gravitational constant.
    pub g: f32,
    /// Floor on the squared separation. Sources closer than this are ignored,
    /// which also removes self-interaction.
    pub softening: f32,
    pub theta: f32,
}

impl Gravity {
    #[must_use]
    pub fn new(g: f32, softening: f32, theta: f32) -> Self {
        Self {
            g,
            softening,
            theta,
        }
    }

    /// A cell of edge `size` at squared distance `dist_sq` may be treated as
    /// a point mass.
    #[inline]
    #[must_use]
    pub fn admissible(&self, size: f32, dist_sq: f32) -> bool {
        let opening = size / self.theta;
        dist_sq > opening * opening
    }

    /// Acceleration towards a point mass `mass` at offset `r`, with
    /// `dist_sq` already floored by the softening.
    #[inline]
    #[must_use]
    pub fn pull(&self, r: Vector3<f32>, mass: f32, dist_sq: f32) -> Vector3<f32> {
        r * (self.g * mass / (dist_sq * dist_sq.sqrt()))
    }

    /// Exact pairwise contribution of a source at `source` on `position`.
    #[must_use]
    pub fn between(
        &self,
        position: &Vector3<f32>,
        source: &Vector3<f32>,
        mass: f32,
    ) -> Vector3<f32> {
        let r = source - position;
        let dist_sq = r.norm_squared().max(self.softening);
        if dist_sq > self.softening {
            self.pull(r, mass, dist_sq)
        } else {
            Vector3::zeros()
        }
    }
}

impl From<&Parameters> for Gravity {
    fn from(params: &Parameters) -> Self {
        Self::new(params.gravity, params.softening, params.theta)
    }
}

/// Barnes-Hut walk over a dense grid without recursion.
///
/// `path[d]` is the Morton key currently visited at level `d`. Opening a cell
/// moves to its first child `key << 3`; finishing a cell moves to the next
/// sibling and climbs while the siblings of a level are exhausted
/// (`key & 7 == 0`). The walk ends once the root has been passed.
///
/// Sources closer than `min_dist_sq` are ignored.
pub fn walk_dense<V: FnMut(&CellSummary) + ?Sized>(
    grid: &DenseOctree,
    kernel: &Gravity,
    min_dist_sq: f32,
    position: &Vector3<f32>,
    visit: &mut V,
) -> Vector3<f32> {
    let deepest = grid.depth() - 1;
    let mut path = [0u32; MAX_LEVELS];
    let mut depth = 0;
    let mut acc = Vector3::zeros();

    loop {
        let level = grid.level(depth);
        let cell = &level.cells()[path[depth] as usize];
        let mass = cell.mass();

        if mass > 0. {
            let r = cell.center() - position;
            let dist_sq = r.norm_squared().max(kernel.softening);

            let summary = |approximated| CellSummary {
                center: cell.center(),
                size: level.size(),
                mass,
                approximated,
            };

            if depth == deepest || kernel.admissible(level.size(), dist_sq) {
                let approximated = dist_sq > min_dist_sq;
                visit(&summary(approximated));
                if approximated {
                    acc += kernel.pull(r, mass, dist_sq);
                }
            } else {
                visit(&summary(false));
                path[depth + 1] = path[depth] << 3;
                depth += 1;
                continue;
            }
        }

        path[depth] += 1;
        while depth > 0 && path[depth] & 7 == 0 {
            depth -= 1;
            path[depth] += 1;
        }
        if depth == 0 {
            break;
        }
    }

    acc
}

#[cfg(test)]
mod tests {
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;
    use crate::{
        octree::{adaptive::CellTree, dense::MassMode},
        Body, Execution,
    };

    fn random_bodies(n: usize, extent: f32, seed: u64) -> Vec<Body> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| Body::at(Vector3::from_fn(|_, _| rng.gen_range(-extent..extent))))
            .collect()
    }

    fn count_adaptive(tree: &CellTree, kernel: &Gravity, position: &Vector3<f32>) -> usize {
        let mut visited = 0;
        tree.walk(0, position, kernel, &mut |_| visited += 1);
        visited
    }

    fn count_dense(grid: &DenseOctree, kernel: &Gravity, position: &Vector3<f32>) -> usize {
        let mut visited = 0;
        walk_dense(grid, kernel, kernel.softening, position, &mut |_| visited += 1);
        visited
    }

    #[test]
    fn pull_points_to_source() {
        let kernel = Gravity::new(1., 0.01, 0.5);
        let a = kernel.between(&Vector3::new(-5., 0., 0.), &Vector3::new(5., 0., 0.), 1.);
        assert_relative_eq!(a, Vector3::new(0.01, 0., 0.), max_relative = 1e-5);
    }

    #[test]
    fn inverse_square() {
        let kernel = Gravity::new(2., 1e-4, 0.5);
        let origin = Vector3::zeros();
        let near = kernel.between(&origin, &Vector3::new(0., 1., 0.), 3.);
        let far = kernel.between(&origin, &Vector3::new(0., 2., 0.), 3.);
        assert_relative_eq!(near.norm() / far.norm(), 4., max_relative = 1e-5);
    }

    #[test]
    fn softening_floor_removes_close_sources() {
        let kernel = Gravity::new(1., 0.5, 0.5);
        let a = kernel.between(&Vector3::zeros(), &Vector3::new(0.1, 0., 0.), 1e6);
        assert_eq!(a, Vector3::zeros());
        let a = kernel.between(&Vector3::zeros(), &Vector3::zeros(), 1.);
        assert_eq!(a, Vector3::zeros());
    }

    #[test]
    fn admissibility() {
        let kernel = Gravity::new(1., 0.01, 0.5);
        // opening distance is size / theta = 2
        assert!(!kernel.admissible(1., 4.));
        assert!(kernel.admissible(1., 4.01));
        // theta = 0 never admits a cell
        let exact = Gravity::new(1., 0.01, 0.);
        assert!(!exact.admissible(1., 1e30));
    }

    #[test]
    fn adaptive_two_bodies_exact() {
        let bodies = [
            Body::at(Vector3::new(-5., 0., 0.)),
            Body::at(Vector3::new(5., 0., 0.)),
        ];
        let kernel = Gravity::new(1., 0.01, 0.5);
        let tree = CellTree::from_bodies(&bodies, 40.);

        let a0 = tree.walk(0, &bodies[0].position(), &kernel, &mut |_| ());
        let a1 = tree.walk(0, &bodies[1].position(), &kernel, &mut |_| ());

        assert_abs_diff_eq!(a0, -a1);
        assert_relative_eq!(a0, Vector3::new(0.01, 0., 0.), max_relative = 1e-5);
    }

    #[test]
    fn adaptive_theta_zero_matches_direct() {
        let bodies = random_bodies(60, 10., 11);
        let kernel = Gravity::new(1.5, 1e-3, 0.);
        let tree = CellTree::from_bodies(&bodies, 20.);

        for b in &bodies {
            let estimate = tree.walk(0, &b.position(), &kernel, &mut |_| ());
            let exact: Vector3<f32> = bodies
                .iter()
                .map(|s| kernel.between(&b.position(), &s.position(), s.mass()))
                .sum();
            assert_relative_eq!(estimate, exact, epsilon = 1e-4, max_relative = 1e-4);
        }
    }

    #[test]
    fn adaptive_monotone_in_theta() {
        let bodies = random_bodies(500, 10., 12);
        let tree = CellTree::from_bodies(&bodies, 20.);

        for b in bodies.iter().step_by(25) {
            let counts: Vec<_> = [0., 0.3, 0.6, 1.0, 1.5]
                .iter()
                .map(|&theta| count_adaptive(&tree, &Gravity::new(1., 1e-3, theta), &b.position()))
                .collect();
            assert!(counts.windows(2).all(|w| w[0] >= w[1]), "{counts:?}");
        }
    }

    #[test]
    fn adaptive_reports_cells() {
        let bodies = random_bodies(100, 10., 13);
        let tree = CellTree::from_bodies(&bodies, 20.);
        // below 1/sqrt(3) no cell containing the query point can be admitted
        let kernel = Gravity::new(1., 1e-3, 0.5);

        let mut cells = Vec::new();
        let acc = tree.walk(0, &bodies[0].position(), &kernel, &mut |c| cells.push(*c));

        // every body except the querying one is accounted for exactly once
        let mass: f32 = cells.iter().filter(|c| c.approximated).map(|c| c.mass).sum();
        assert_relative_eq!(mass, 99., max_relative = 1e-5);
        assert!(cells.iter().any(|c| !c.approximated));
        assert!(acc.norm() > 0.);
    }

    #[test]
    fn dense_walk_visits_every_occupied_leaf() {
        let bodies = random_bodies(200, 4., 14);
        let mut grid =
            DenseOctree::build(4, 4., MassMode::Count, Execution::SingleThreaded).unwrap();
        grid.fill(&bodies, Execution::SingleThreaded);

        // theta = 0 opens every cell down to the deepest level
        let kernel = Gravity::new(1., 0., 0.);
        let mut leaves = 0.;
        walk_dense(&grid, &kernel, -1., &Vector3::new(100., 0., 0.), &mut |c| {
            if c.approximated {
                assert_relative_eq!(c.size, 16. / 8.);
                leaves += c.mass;
            }
        });
        assert_eq!(leaves, 200.);
    }

    #[test]
    fn dense_far_field_uses_root() {
        let bodies = random_bodies(50, 1., 15);
        let mut grid =
            DenseOctree::build(3, 1., MassMode::Count, Execution::SingleThreaded).unwrap();
        grid.fill(&bodies, Execution::SingleThreaded);

        let kernel = Gravity::new(1., 0.01, 1.);
        let far = Vector3::new(1000., 0., 0.);
        let mut cells = Vec::new();
        let acc = walk_dense(&grid, &kernel, 0.01, &far, &mut |c| cells.push(*c));

        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].center, Vector3::zeros());
        assert_relative_eq!(acc, Vector3::new(-50. / 1e6, 0., 0.), max_relative = 1e-4);
    }

    #[test]
    fn dense_two_bodies_mirror() {
        // both bodies sit on deepest-level cell centers mirrored across x = 0
        let bodies = [
            Body::at(Vector3::new(-6.25, 1.25, 1.25)),
            Body::at(Vector3::new(6.25, 1.25, 1.25)),
        ];
        let mut grid =
            DenseOctree::build(5, 10., MassMode::Count, Execution::SingleThreaded).unwrap();
        grid.fill(&bodies, Execution::SingleThreaded);

        let kernel = Gravity::new(1., 0.01, 0.5);
        let a0 = walk_dense(&grid, &kernel, 0.01, &bodies[0].position(), &mut |_| ());
        let a1 = walk_dense(&grid, &kernel, 0.01, &bodies[1].position(), &mut |_| ());

        assert_abs_diff_eq!(a0, Vector3::new(-a1.x, a1.y, a1.z), epsilon = 1e-7);
        assert!(a0.x > 0.);
    }

    #[test]
    fn dense_monotone_in_theta() {
        let bodies = random_bodies(1000, 8., 16);
        let mut grid =
            DenseOctree::build(5, 8., MassMode::Count, Execution::SingleThreaded).unwrap();
        grid.fill(&bodies, Execution::SingleThreaded);

        for b in bodies.iter().step_by(100) {
            let counts: Vec<_> = [0.2, 0.5, 0.8, 1.2]
                .iter()
                .map(|&theta| count_dense(&grid, &Gravity::new(1., 0.5, theta), &b.position()))
                .collect();
            assert!(counts.windows(2).all(|w| w[0] >= w[1]), "{counts:?}");
        }
    }

    #[test]
    fn dense_empty_grid() {
        let grid = DenseOctree::build(3, 1., MassMode::Count, Execution::SingleThreaded).unwrap();
        let kernel = Gravity::new(1., 0.01, 0.5);
        let mut visited = 0;
        let acc = walk_dense(&grid, &kernel, 0.01, &Vector3::zeros(), &mut |_| visited += 1);
        assert_eq!(acc, Vector3::zeros());
        assert_eq!(visited, 0);
    }
}
