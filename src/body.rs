use bytemuck::{Pod, Zeroable};
use nalgebra::Vector3;

use crate::Error;

/// Number of `f32` slots in one [`Body`] record.
pub const STRIDE: usize = 12;

/// A point mass in the flat 12-float layout shared with GPU-style buffers:
/// position, pad, velocity, pad, acceleration, mass.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Body {
    position: [f32; 3],
    _pad0: f32,
    velocity: [f32; 3],
    _pad1: f32,
    acceleration: [f32; 3],
    mass: f32,
}

impl Body {
    #[must_use]
    pub fn new(position: Vector3<f32>, velocity: Vector3<f32>, mass: f32) -> Self {
        Self {
            position: position.into(),
            velocity: velocity.into(),
            mass,
            ..Self::zeroed()
        }
    }

    /// A body of unit mass at rest.
    #[must_use]
    pub fn at(position: Vector3<f32>) -> Self {
        Self::new(position, Vector3::zeros(), 1.)
    }

    #[must_use]
    pub fn position(&self) -> Vector3<f32> {
        self.position.into()
    }

    pub fn set_position(&mut self, position: Vector3<f32>) {
        self.position = position.into();
    }

    #[must_use]
    pub fn velocity(&self) -> Vector3<f32> {
        self.velocity.into()
    }

    pub fn set_velocity(&mut self, velocity: Vector3<f32>) {
        self.velocity = velocity.into();
    }

    #[must_use]
    pub fn acceleration(&self) -> Vector3<f32> {
        self.acceleration.into()
    }

    pub fn set_acceleration(&mut self, acceleration: Vector3<f32>) {
        self.acceleration = acceleration.into();
    }

    #[must_use]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn set_mass(&mut self, mass: f32) {
        self.mass = mass;
    }

    /// View a flat float buffer as bodies without copying.
    pub fn cast_slice(flat: &[f32]) -> Result<&[Body], Error> {
        bytemuck::try_cast_slice(flat).map_err(|_| Error::BufferLength(flat.len()))
    }

    pub fn cast_slice_mut(flat: &mut [f32]) -> Result<&mut [Body], Error> {
        let len = flat.len();
        bytemuck::try_cast_slice_mut(flat).map_err(|_| Error::BufferLength(len))
    }

    /// Flat float view of `bodies`, e.g. for uploading to a render buffer.
    #[must_use]
    pub fn as_flat(bodies: &[Body]) -> &[f32] {
        bytemuck::cast_slice(bodies)
    }
}

/// Total kinetic plus potential energy, with the potential softened the same
/// way the force kernel is.
#[must_use]
pub fn total_energy(bodies: &[Body], gravity: f32, softening: f32) -> f64 {
    let kinetic: f64 = bodies
        .iter()
        .map(|b| 0.5 * f64::from(b.mass) * f64::from(b.velocity().norm_squared()))
        .sum();

    let mut potential = 0.;
    for (i, b1) in bodies.iter().enumerate() {
        for b2 in &bodies[i + 1..] {
            let dist_sq = (b2.position() - b1.position())
                .norm_squared()
                .max(softening);
            potential -= f64::from(gravity) * f64::from(b1.mass) * f64::from(b2.mass)
                / f64::from(dist_sq).sqrt();
        }
    }

    kinetic + potential
}
