use crate::{octree::dense::MAX_LEVELS, Error};

/// Runtime settings of a simulation.
///
/// Changing any of them through [`Simulation::set_parameters`](crate::Simulation::set_parameters)
/// re-seeds the whole system.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameters {
    pub body_count: usize,
    /// Gravitational constant.
    pub gravity: f32,
    /// Floor on the squared distance used by the force kernel.
    pub softening: f32,
    /// Barnes-Hut opening angle.
    pub theta: f32,
    /// Initial rotation, in percent of the position per unit time.
    pub spin: f32,
    /// Scale `k` of the domain half-extent `count^(1/3) * k`.
    pub spread: f32,
    /// Mass of a central body replacing body 0, if any.
    pub black_hole: Option<f32>,
    /// Number of levels of the dense grid.
    pub grid_depth: usize,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            body_count: 1000,
            gravity: 10.,
            softening: 0.5,
            theta: 0.75,
            spin: 25.,
            spread: 5.,
            black_hole: None,
            grid_depth: 8,
        }
    }
}

impl Parameters {
    #[must_use]
    pub fn with_body_count(mut self, body_count: usize) -> Self {
        self.body_count = body_count;
        self
    }

    #[must_use]
    pub fn with_gravity(mut self, gravity: f32) -> Self {
        self.gravity = gravity;
        self
    }

    #[must_use]
    pub fn with_softening(mut self, softening: f32) -> Self {
        self.softening = softening;
        self
    }

    #[must_use]
    pub fn with_theta(mut self, theta: f32) -> Self {
        self.theta = theta;
        self
    }

    #[must_use]
    pub fn with_spin(mut self, spin: f32) -> Self {
        self.spin = spin;
        self
    }

    #[must_use]
    pub fn with_spread(mut self, spread: f32) -> Self {
        self.spread = spread;
        self
    }

    #[must_use]
    pub fn with_black_hole(mut self, mass: f32) -> Self {
        self.black_hole = Some(mass);
        self
    }

    #[must_use]
    pub fn with_grid_depth(mut self, grid_depth: usize) -> Self {
        self.grid_depth = grid_depth;
        self
    }

    /// Half-extent of the domain, grown with the body count so that the
    /// density stays roughly constant.
    #[must_use]
    pub fn half_extent(&self) -> f32 {
        (self.body_count as f32).cbrt() * self.spread
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !self.theta.is_finite() || self.theta < 0. {
            return Err(Error::InvalidTheta(self.theta));
        }
        if !self.softening.is_finite() || self.softening < 0. {
            return Err(Error::InvalidSoftening(self.softening));
        }
        if !self.gravity.is_finite() {
            return Err(Error::InvalidGravity(self.gravity));
        }
        if !self.spread.is_finite() || self.spread <= 0. {
            return Err(Error::InvalidSpread(self.spread));
        }
        if !self.spin.is_finite() {
            return Err(Error::InvalidSpin(self.spin));
        }
        if self.grid_depth == 0 || self.grid_depth > MAX_LEVELS {
            return Err(Error::InvalidDepth(self.grid_depth));
        }
        if self.black_hole.is_some() && self.body_count == 0 {
            return Err(Error::EmptyBlackHole);
        }
        Ok(())
    }
}
