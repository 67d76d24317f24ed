//! Sparse octree built by inserting bodies one at a time.
//!
//! Cells live in a flat arena and refer to their children by index; the 8
//! children of a cell are allocated together, so a cell has either none or
//! exactly 8 of them. The arena is reused from step to step.

use nalgebra::Vector3;

use super::{choose_octant, octant_center, CellSummary};
use crate::{Body, Gravity};

/// Subdivision limit. An occupied leaf at this depth absorbs further bodies
/// instead of splitting, which bounds the tree for coincident positions.
pub const MAX_TREE_DEPTH: usize = 32;

#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    position: Vector3<f32>,
    size: f32,
    mass: f32,
    center_of_mass: Vector3<f32>,
    first_child: Option<usize>,
}

impl Cell {
    fn new(position: Vector3<f32>, size: f32) -> Self {
        Self {
            position,
            size,
            mass: 0.,
            center_of_mass: Vector3::zeros(),
            first_child: None,
        }
    }

    /// Geometric center.
    #[must_use]
    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    #[must_use]
    pub fn size(&self) -> f32 {
        self.size
    }

    #[must_use]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    #[must_use]
    pub fn center_of_mass(&self) -> Vector3<f32> {
        self.center_of_mass
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.first_child.is_none()
    }

    /// Arena indices of the children, empty for a leaf.
    #[must_use]
    pub fn children(&self) -> std::ops::Range<usize> {
        match self.first_child {
            Some(first) => first..first + 8,
            None => 0..0,
        }
    }

    #[must_use]
    pub fn contains(&self, position: &Vector3<f32>) -> bool {
        let half = self.size / 2.;
        (position - self.position).iter().all(|d| d.abs() <= half)
    }

    fn summary(&self, approximated: bool) -> CellSummary {
        CellSummary {
            center: self.position,
            size: self.size,
            mass: self.mass,
            approximated,
        }
    }

    /// Fold a body into the running mass and center of mass.
    fn absorb(&mut self, position: &Vector3<f32>, mass: f32) {
        let total = self.mass + mass;
        if total > 0. {
            self.center_of_mass = (self.center_of_mass * self.mass + position * mass) / total;
        }
        self.mass = total;
    }
}

#[derive(Clone, Debug)]
pub struct CellTree {
    cells: Vec<Cell>,
    max_depth: usize,
}

impl CellTree {
    /// An empty tree whose root is a cube of edge `size` around `center`.
    #[must_use]
    pub fn new(center: Vector3<f32>, size: f32) -> Self {
        Self {
            cells: vec![Cell::new(center, size)],
            max_depth: MAX_TREE_DEPTH,
        }
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Build a tree over `bodies` with the root centered at the origin.
    #[must_use]
    pub fn from_bodies(bodies: &[Body], size: f32) -> Self {
        let mut tree = Self::new(Vector3::zeros(), size);
        tree.insert_all(bodies);
        tree
    }

    /// Build a tree over `bodies` whose root is their bounding cube.
    #[must_use]
    pub fn enclosing(bodies: &[Body]) -> Self {
        let (center, size) = bounding_cube(bodies);
        let mut tree = Self::new(center, size);
        tree.insert_all(bodies);
        tree
    }

    /// Drop all cells but an empty root with the given bounds, keeping the
    /// arena allocation.
    pub fn reset(&mut self, center: Vector3<f32>, size: f32) {
        self.cells.clear();
        self.cells.push(Cell::new(center, size));
    }

    /// Insert every body, returning how many fell outside the root.
    pub fn insert_all(&mut self, bodies: &[Body]) -> usize {
        bodies
            .iter()
            .filter(|b| !self.insert(&b.position(), b.mass()))
            .count()
    }

    /// Insert a point mass. Returns `false` if it lies outside the root.
    pub fn insert(&mut self, position: &Vector3<f32>, mass: f32) -> bool {
        if !self.cells[0].contains(position) {
            return false;
        }

        let mut idx = 0;
        let mut depth = 0;
        loop {
            let cell = &mut self.cells[idx];

            // empty leaf, deposit
            if cell.mass == 0. && cell.is_leaf() {
                cell.center_of_mass = *position;
                cell.mass = mass;
                return true;
            }

            if cell.is_leaf() {
                if depth >= self.max_depth {
                    cell.absorb(position, mass);
                    return true;
                }
                self.subdivide(idx);
            }

            let cell = &mut self.cells[idx];
            cell.absorb(position, mass);
            let octant = choose_octant(&cell.position, position);
            idx = cell.children().start + octant;
            depth += 1;
        }
    }

    /// Allocate the 8 children of a leaf and move its aggregate into the one
    /// containing its center of mass.
    fn subdivide(&mut self, idx: usize) {
        let first = self.cells.len();
        let Cell {
            position,
            size,
            mass,
            center_of_mass,
            ..
        } = self.cells[idx];

        self.cells
            .extend((0..8).map(|i| Cell::new(octant_center(size, position, i), size / 2.)));
        self.cells[idx].first_child = Some(first);

        let child = &mut self.cells[first + choose_octant(&position, &center_of_mass)];
        child.mass = mass;
        child.center_of_mass = center_of_mass;
    }

    #[must_use]
    pub fn root(&self) -> &Cell {
        &self.cells[0]
    }

    #[must_use]
    pub fn cell(&self, idx: usize) -> &Cell {
        &self.cells[idx]
    }

    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root().mass == 0.
    }

    /// Recursive Barnes-Hut walk from cell `idx`, reporting every cell it
    /// evaluates to `visit`.
    pub(crate) fn walk<V: FnMut(&CellSummary) + ?Sized>(
        &self,
        idx: usize,
        position: &Vector3<f32>,
        kernel: &Gravity,
        visit: &mut V,
    ) -> Vector3<f32> {
        let cell = &self.cells[idx];
        let r = cell.center_of_mass - position;
        let dist_sq = r.norm_squared().max(kernel.softening);

        if cell.is_leaf() || kernel.admissible(cell.size, dist_sq) {
            let approximated = cell.mass > 0. && dist_sq > kernel.softening;
            visit(&cell.summary(approximated));
            if approximated {
                kernel.pull(r, cell.mass, dist_sq)
            } else {
                Vector3::zeros()
            }
        } else {
            visit(&cell.summary(false));
            cell.children()
                .map(|child| self.walk(child, position, kernel, visit))
                .sum()
        }
    }
}

/// Center and edge of the smallest axis-aligned cube containing all bodies,
/// padded slightly so that bodies on the boundary stay inside.
pub(crate) fn bounding_cube(bodies: &[Body]) -> (Vector3<f32>, f32) {
    let mut positions = bodies.iter().map(Body::position);
    let Some(first) = positions.next() else {
        return (Vector3::zeros(), 1.);
    };

    let (v_min, v_max) = positions.fold((first, first), |(lo, hi), p| (lo.inf(&p), hi.sup(&p)));
    let width = (v_max - v_min).max();
    let width = if width > 0. { width * 1.001 } else { 1. };

    ((v_min + v_max) / 2., width)
}
