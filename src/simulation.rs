use log::{debug, trace};
use nalgebra::Vector3;
use rand::{distributions::Uniform, Rng};

use crate::{
    creator::{BodyCreator, SphereCreator},
    integrator, Body, CellSummary, Error, Execution, Parameters, Solver,
};

/// Lifecycle of a [`Simulation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// No bodies yet, stepping is refused.
    Uninitialized,
    Ready,
    /// Inside [`Simulation::step`].
    Stepping,
}

/// Drives a [`Solver`] and the leapfrog integrator over a body buffer.
#[derive(Debug)]
pub struct Simulation<S> {
    params: Parameters,
    solver: S,
    bodies: Vec<Body>,
    back: Vec<Body>,
    execution: Execution,
    state: State,
    sample: Option<usize>,
    cells: Vec<CellSummary>,
    steps: u64,
}

impl<S: Solver> Simulation<S> {
    /// An empty simulation. Call [`Simulation::seed`] before stepping.
    #[must_use]
    pub fn new(params: Parameters, solver: S) -> Self {
        Self {
            params,
            solver,
            bodies: Vec::new(),
            back: Vec::new(),
            execution: Execution::default(),
            state: State::Uninitialized,
            sample: None,
            cells: Vec::new(),
            steps: 0,
        }
    }

    /// A simulation of the given bodies, ready to step.
    pub fn from_bodies(params: Parameters, solver: S, bodies: Vec<Body>) -> Result<Self, Error> {
        let mut sim = Self::new(params, solver);
        sim.params.validate()?;
        sim.solver.configure(&sim.params)?;
        sim.bodies = bodies;
        sim.prime();
        Ok(sim)
    }

    #[must_use]
    pub fn with_execution(mut self, execution: Execution) -> Self {
        self.execution = execution;
        self
    }

    /// Run every phase of a step on the rayon thread pool, integrating into
    /// a second body buffer.
    #[cfg(feature = "rayon")]
    #[must_use]
    pub fn rayon_iter(mut self) -> Self {
        self.execution = Execution::RayonIter;
        self
    }

    /// Place `body_count` bodies on a spinning shell between half and the
    /// full domain half-extent, with an optional black hole at the center.
    pub fn seed<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), Error> {
        let bodies = seed_bodies(&self.params, rng)?;
        self.solver.configure(&self.params)?;
        self.bodies = bodies;
        self.prime();
        Ok(())
    }

    /// Replace the parameters and re-seed from scratch.
    ///
    /// Invalid parameters are rejected and leave the simulation untouched.
    pub fn set_parameters<R: Rng + ?Sized>(
        &mut self,
        params: Parameters,
        rng: &mut R,
    ) -> Result<(), Error> {
        let bodies = seed_bodies(&params, rng)?;
        self.solver.configure(&params)?;
        self.params = params;
        self.bodies = bodies;
        self.prime();
        Ok(())
    }

    fn prime(&mut self) {
        integrator::prime_accelerations(&mut self.bodies, &mut self.solver, self.execution);
        self.back.clone_from(&self.bodies);
        self.steps = 0;
        self.state = State::Ready;
        self.capture_cells();
    }

    /// Advance all bodies by `dt`.
    pub fn step(&mut self, dt: f32) -> Result<(), Error> {
        if self.state == State::Uninitialized {
            return Err(Error::Uninitialized);
        }
        self.state = State::Stepping;

        match self.execution {
            Execution::SingleThreaded => {
                integrator::leapfrog(&mut self.bodies, &mut self.solver, dt, self.execution);
            }
            #[cfg(feature = "rayon")]
            Execution::RayonIter => {
                self.back.resize(self.bodies.len(), Body::default());
                integrator::leapfrog_buffered(
                    &self.bodies,
                    &mut self.back,
                    &mut self.solver,
                    dt,
                    self.execution,
                );
                std::mem::swap(&mut self.bodies, &mut self.back);
            }
        }

        self.pin_black_hole();
        self.capture_cells();
        self.steps += 1;
        self.state = State::Ready;
        trace!("step {} with dt {dt}", self.steps);
        Ok(())
    }

    /// Body 0 stays at the origin at rest while a black hole is configured.
    fn pin_black_hole(&mut self) {
        if self.params.black_hole.is_none() {
            return;
        }
        if let Some(first) = self.bodies.first_mut() {
            first.set_position(Vector3::zeros());
            first.set_velocity(Vector3::zeros());
        }
    }

    /// Record the cells approximated for body `index` after every step.
    pub fn sample_body(&mut self, index: Option<usize>) {
        self.sample = index;
        self.capture_cells();
    }

    fn capture_cells(&mut self) {
        self.cells.clear();
        let Some(body) = self.sample.and_then(|i| self.bodies.get(i)) else {
            return;
        };

        let cells = &mut self.cells;
        self.solver.trace(&body.position(), &mut |cell| {
            if cell.approximated {
                cells.push(*cell);
            }
        });
    }

    /// Cells applied as point masses to the sampled body in the last step.
    #[must_use]
    pub fn cells(&self) -> &[CellSummary] {
        &self.cells
    }

    #[must_use]
    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    /// The bodies in the flat 12-float layout.
    #[must_use]
    pub fn bodies_flat(&self) -> &[f32] {
        Body::as_flat(&self.bodies)
    }

    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    #[must_use]
    pub fn params(&self) -> &Parameters {
        &self.params
    }

    #[must_use]
    pub fn solver(&self) -> &S {
        &self.solver
    }

    #[must_use]
    pub fn execution(&self) -> Execution {
        self.execution
    }

    /// Steps taken since the last seeding.
    #[must_use]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    #[must_use]
    pub fn total_energy(&self) -> f64 {
        crate::total_energy(&self.bodies, self.params.gravity, self.params.softening)
    }
}

fn seed_bodies<R: Rng + ?Sized>(params: &Parameters, rng: &mut R) -> Result<Vec<Body>, Error> {
    params.validate()?;

    let half_extent = params.half_extent();
    let mut creator = SphereCreator::new(
        0.5 * half_extent,
        half_extent,
        params.spin,
        Uniform::new_inclusive(1., 1.),
    )?;
    let mut bodies = creator.create_bodies(params.body_count, rng);

    if let (Some(mass), Some(first)) = (params.black_hole, bodies.first_mut()) {
        *first = Body::new(Vector3::zeros(), Vector3::zeros(), mass);
    }

    debug!("seeded {} bodies within half extent {half_extent}", bodies.len());
    Ok(bodies)
}
