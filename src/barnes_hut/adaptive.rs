use log::debug;
use nalgebra::Vector3;

use crate::{
    octree::adaptive::bounding_cube, Body, CellSummary, CellTree, Error, Execution, Gravity,
    Parameters, Solver,
};

/// How the root cell of the [`CellTree`] is placed on every rebuild.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Bounds {
    /// A fixed cube of edge `4 * half_extent` around the origin. Bodies that
    /// escape it stop contributing to the field.
    #[default]
    Domain,
    /// The bounding cube of the current bodies.
    Enclosing,
}

/// Barnes-Hut on a sparse octree rebuilt by incremental insertion.
#[derive(Clone, Debug)]
pub struct BarnesHut {
    gravity: Gravity,
    bounds: Bounds,
    domain_size: f32,
    tree: CellTree,
}

impl BarnesHut {
    #[must_use]
    pub fn new() -> Self {
        let params = Parameters::default();
        let domain_size = 4. * params.half_extent();
        Self {
            gravity: Gravity::from(&params),
            bounds: Bounds::default(),
            domain_size,
            tree: CellTree::new(Vector3::zeros(), domain_size),
        }
    }

    /// Fit the root to the bodies on every rebuild instead of the fixed domain.
    #[must_use]
    pub fn enclosing(mut self) -> Self {
        self.bounds = Bounds::Enclosing;
        self
    }

    #[must_use]
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    #[must_use]
    pub fn gravity(&self) -> &Gravity {
        &self.gravity
    }

    /// The tree of the last rebuild.
    #[must_use]
    pub fn tree(&self) -> &CellTree {
        &self.tree
    }
}

impl Default for BarnesHut {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for BarnesHut {
    fn configure(&mut self, params: &Parameters) -> Result<(), Error> {
        params.validate()?;
        self.gravity = Gravity::from(params);
        self.domain_size = 4. * params.half_extent();
        Ok(())
    }

    // Insertion mutates shared ancestors, so the build stays sequential.
    fn rebuild(&mut self, bodies: &[Body], _execution: Execution) {
        let (center, size) = match self.bounds {
            Bounds::Domain => (Vector3::zeros(), self.domain_size),
            Bounds::Enclosing => bounding_cube(bodies),
        };
        self.tree.reset(center, size);

        let dropped = self.tree.insert_all(bodies);
        if dropped > 0 {
            debug!("{dropped} bodies outside the octree root of size {size}");
        }
        debug!("rebuilt octree with {} cells", self.tree.len());
    }

    fn acceleration(&self, position: &Vector3<f32>) -> Vector3<f32> {
        self.tree.walk(0, position, &self.gravity, &mut |_| ())
    }

    fn trace(
        &self,
        position: &Vector3<f32>,
        visit: &mut dyn FnMut(&CellSummary),
    ) -> Vector3<f32> {
        self.tree.walk(0, position, &self.gravity, visit)
    }
}
