use log::warn;
use nalgebra::Vector3;

use crate::{
    force::walk_dense, Body, CellSummary, DenseOctree, Error, Execution, Gravity, MassMode,
    Parameters, Solver,
};

/// Barnes-Hut on a fixed-depth grid of Morton-addressed cells.
///
/// The grid is laid out lazily on the first rebuild after its depth, domain or
/// mass mode changed and is only cleared and refilled afterwards.
///
/// A configured black hole always switches the grid to
/// [`MassMode::Weighted`], so that its mass is felt.
#[derive(Debug)]
pub struct DenseBarnesHut {
    gravity: Gravity,
    requested: MassMode,
    mode: MassMode,
    depth: usize,
    half_extent: f32,
    grid: Option<DenseOctree>,
    min_dist_sq: f32,
}

impl DenseBarnesHut {
    #[must_use]
    pub fn new() -> Self {
        let params = Parameters::default();
        Self {
            gravity: Gravity::from(&params),
            requested: MassMode::default(),
            mode: MassMode::default(),
            depth: params.grid_depth,
            half_extent: params.half_extent(),
            grid: None,
            min_dist_sq: params.softening,
        }
    }

    #[must_use]
    pub fn with_mass_mode(mut self, mode: MassMode) -> Self {
        self.requested = mode;
        self.mode = mode;
        self.grid = None;
        self
    }

    /// The mode the grid is filled with under the current parameters.
    #[must_use]
    pub fn mass_mode(&self) -> MassMode {
        self.mode
    }

    #[must_use]
    pub fn gravity(&self) -> &Gravity {
        &self.gravity
    }

    /// The grid of the last rebuild, if any.
    #[must_use]
    pub fn grid(&self) -> Option<&DenseOctree> {
        self.grid.as_ref()
    }

    /// Squared distance under which cells are not evaluated.
    #[must_use]
    pub fn min_dist_sq(&self) -> f32 {
        self.min_dist_sq
    }

    fn update_cutoff(&mut self) {
        self.min_dist_sq = match &self.grid {
            Some(grid) => {
                let leaf = grid.level(grid.depth() - 1).size();
                self.gravity.softening.max(leaf * leaf)
            }
            None => self.gravity.softening,
        };
    }
}

impl Default for DenseBarnesHut {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for DenseBarnesHut {
    fn configure(&mut self, params: &Parameters) -> Result<(), Error> {
        params.validate()?;
        self.gravity = Gravity::from(params);

        let mode = match params.black_hole {
            Some(_) => MassMode::Weighted,
            None => self.requested,
        };
        let half_extent = params.half_extent();
        if params.grid_depth != self.depth || half_extent != self.half_extent || mode != self.mode
        {
            self.depth = params.grid_depth;
            self.half_extent = half_extent;
            self.mode = mode;
            self.grid = None;
        }
        self.update_cutoff();
        Ok(())
    }

    fn rebuild(&mut self, bodies: &[Body], execution: Execution) {
        match &mut self.grid {
            Some(grid) => grid.clear(execution),
            None => match DenseOctree::build(self.depth, self.half_extent, self.mode, execution) {
                Ok(grid) => self.grid = Some(grid),
                Err(e) => {
                    warn!("cannot lay out dense octree: {e}");
                    return;
                }
            },
        }
        let Some(grid) = self.grid.as_mut() else {
            return;
        };

        grid.fill(bodies, execution);
        self.update_cutoff();
    }

    /// Zero until the first successful rebuild.
    fn acceleration(&self, position: &Vector3<f32>) -> Vector3<f32> {
        match &self.grid {
            Some(grid) => walk_dense(grid, &self.gravity, self.min_dist_sq, position, &mut |_| ()),
            None => Vector3::zeros(),
        }
    }

    fn trace(
        &self,
        position: &Vector3<f32>,
        visit: &mut dyn FnMut(&CellSummary),
    ) -> Vector3<f32> {
        match &self.grid {
            Some(grid) => walk_dense(grid, &self.gravity, self.min_dist_sq, position, visit),
            None => Vector3::zeros(),
        }
    }
}
