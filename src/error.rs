use std::{error, fmt};

/// Errors raised while setting up a simulation.
///
/// Numerical trouble during stepping (vanishing separations, NaN) is never
/// reported through this type.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Sampling shell with an inner radius larger than its outer radius.
    InvalidRadius { min: f32, max: f32 },
    /// Dense grid depth outside `1..=MAX_LEVELS`.
    InvalidDepth(usize),
    /// Opening angle that is negative or not finite.
    InvalidTheta(f32),
    /// Softening that is negative or not finite.
    InvalidSoftening(f32),
    /// Gravitational constant that is not finite.
    InvalidGravity(f32),
    /// Domain scale that is not positive and finite.
    InvalidSpread(f32),
    /// Angular velocity factor that is not finite.
    InvalidSpin(f32),
    /// A black hole was requested for a system without bodies.
    EmptyBlackHole,
    /// Flat body buffer whose length is not a multiple of the record stride.
    BufferLength(usize),
    /// The simulation was stepped before it was seeded.
    Uninitialized,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidRadius { min, max } => {
                write!(f, "minimum radius {min} exceeds maximum radius {max}")
            }
            Error::InvalidDepth(depth) => write!(f, "unsupported octree depth {depth}"),
            Error::InvalidTheta(theta) => write!(f, "invalid opening angle {theta}"),
            Error::InvalidSoftening(eps) => write!(f, "invalid softening {eps}"),
            Error::InvalidGravity(g) => write!(f, "invalid gravitational constant {g}"),
            Error::InvalidSpread(k) => write!(f, "invalid domain spread {k}"),
            Error::InvalidSpin(spin) => write!(f, "invalid spin {spin}"),
            Error::EmptyBlackHole => write!(f, "black hole requested without any bodies"),
            Error::BufferLength(len) => {
                write!(f, "body buffer of {len} floats is not a multiple of 12")
            }
            Error::Uninitialized => write!(f, "simulation has not been seeded"),
        }
    }
}

impl error::Error for Error {}
