use nalgebra::Vector3;

use crate::{Body, CellSummary, Error, Execution, Gravity, Parameters, Solver};

/// Exact pairwise summation over a snapshot of the bodies.
///
/// Quadratic in the body count; used as the reference the tree solvers are
/// measured against.
#[derive(Clone, Debug)]
pub struct DirectSummation {
    gravity: Gravity,
    sources: Vec<(Vector3<f32>, f32)>,
}

impl DirectSummation {
    #[must_use]
    pub fn new() -> Self {
        Self {
            gravity: Gravity::from(&Parameters::default()),
            sources: Vec::new(),
        }
    }

    #[must_use]
    pub fn gravity(&self) -> &Gravity {
        &self.gravity
    }
}

impl Default for DirectSummation {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for DirectSummation {
    fn configure(&mut self, params: &Parameters) -> Result<(), Error> {
        params.validate()?;
        self.gravity = Gravity::from(params);
        Ok(())
    }

    fn rebuild(&mut self, bodies: &[Body], _execution: Execution) {
        self.sources.clear();
        self.sources
            .extend(bodies.iter().map(|b| (b.position(), b.mass())));
    }

    fn acceleration(&self, position: &Vector3<f32>) -> Vector3<f32> {
        self.sources
            .iter()
            .map(|(source, mass)| self.gravity.between(position, source, *mass))
            .sum()
    }

    /// Sources are reported as leaf cells of zero size.
    fn trace(
        &self,
        position: &Vector3<f32>,
        visit: &mut dyn FnMut(&CellSummary),
    ) -> Vector3<f32> {
        for (source, mass) in &self.sources {
            visit(&CellSummary {
                center: *source,
                size: 0.,
                mass: *mass,
                approximated: false,
            });
        }
        self.acceleration(position)
    }
}
