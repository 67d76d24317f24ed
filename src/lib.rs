//! Real-time Barnes-Hut gravity for large ensembles of point masses.
//!
//! Two tree representations are provided: a sparse [`CellTree`] built by
//! incremental insertion, and a fixed-depth [`DenseOctree`] addressed by
//! Morton keys. Both are driven through the [`Solver`] trait and advanced with
//! a kick-drift-kick leapfrog by the [`Simulation`] driver.

pub mod barnes_hut;
mod body;
pub mod creator;
pub mod direct_summation;
mod error;
pub mod force;
pub mod integrator;
pub mod morton;
pub mod octree;
mod params;
pub mod simulation;

pub use barnes_hut::{BarnesHut, Bounds, DenseBarnesHut};
pub use body::{total_energy, Body, STRIDE};
pub use direct_summation::DirectSummation;
pub use error::Error;
pub use force::Gravity;
pub use octree::{
    adaptive::{Cell, CellTree},
    dense::{DenseOctree, MassMode},
    CellSummary,
};
pub use params::Parameters;
pub use simulation::{Simulation, State};

use nalgebra::Vector3;

/// How the phases of a step are executed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Execution {
    #[default]
    SingleThreaded,
    /// Every body (or cell) of a phase is an independent rayon work item.
    #[cfg(feature = "rayon")]
    RayonIter,
}

/// A source of gravitational acceleration rebuilt from a body snapshot.
pub trait Solver: Send + Sync {
    /// Adopt the physical and domain settings of `params`.
    fn configure(&mut self, params: &Parameters) -> Result<(), Error>;

    /// Rebuild the internal structure from the current body positions.
    fn rebuild(&mut self, bodies: &[Body], execution: Execution);

    /// Acceleration at `position` from the last rebuilt snapshot.
    fn acceleration(&self, position: &Vector3<f32>) -> Vector3<f32>;

    /// Like [`Solver::acceleration`], reporting every cell the walk evaluates.
    fn trace(
        &self,
        position: &Vector3<f32>,
        visit: &mut dyn FnMut(&CellSummary),
    ) -> Vector3<f32>;
}
