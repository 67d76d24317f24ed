//! Initial conditions.

use std::f32::consts::TAU;

use log::debug;
use nalgebra::Vector3;
use rand::{distributions::Uniform, Rng};
use rand_distr::Distribution;

use crate::{Body, Error};

/// A volume-uniform random point in the spherical shell `min..=max` around
/// the origin.
pub fn random_point_in_sphere<R: Rng + ?Sized>(
    min: f32,
    max: f32,
    rng: &mut R,
) -> Result<Vector3<f32>, Error> {
    check_shell(min, max)?;
    Ok(sample_shell(min, max, rng))
}

fn check_shell(min: f32, max: f32) -> Result<(), Error> {
    // also rejects NaN
    if !(min <= max) {
        return Err(Error::InvalidRadius { min, max });
    }
    Ok(())
}

fn sample_shell<R: Rng + ?Sized>(min: f32, max: f32, rng: &mut R) -> Vector3<f32> {
    let min3 = min.powi(3);
    let rho = (rng.gen::<f32>() * (max.powi(3) - min3) + min3).cbrt();
    let azimuth = rng.gen::<f32>() * TAU;
    let polar = (1. - 2. * rng.gen::<f32>()).acos();

    Vector3::new(
        rho * polar.sin() * azimuth.cos(),
        rho * polar.sin() * azimuth.sin(),
        rho * polar.cos(),
    )
}

pub trait BodyCreator {
    fn create_body<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Body;

    fn create_bodies<R: Rng + ?Sized>(&mut self, n: usize, rng: &mut R) -> Vec<Body> {
        (0..n).map(|_| self.create_body(rng)).collect()
    }
}

/// Bodies spread through a spherical shell and set spinning around the z axis
/// with velocity `(y, -x, 0) * spin / 100`.
#[derive(Clone, Debug)]
pub struct SphereCreator<MD> {
    min_radius: f32,
    max_radius: f32,
    spin: f32,
    mass_distr: MD,
}

impl<MD: Distribution<f32>> SphereCreator<MD> {
    pub fn new(min_radius: f32, max_radius: f32, spin: f32, mass_distr: MD) -> Result<Self, Error> {
        check_shell(min_radius, max_radius)?;
        Ok(Self {
            min_radius,
            max_radius,
            spin,
            mass_distr,
        })
    }
}

impl<MD: Distribution<f32>> BodyCreator for SphereCreator<MD> {
    fn create_body<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Body {
        let position = sample_shell(self.min_radius, self.max_radius, rng);
        let velocity = Vector3::new(position.y, -position.x, 0.) * (self.spin / 100.);
        Body::new(position, velocity, self.mass_distr.sample(rng))
    }
}

/// A heavy body at rest in the origin, followed by bodies on circular orbits
/// around it in the xy plane.
#[derive(Clone, Debug)]
pub struct CentralBodyCreator<MD, RD> {
    central_mass: f32,
    gravity: f32,
    mass_distr: MD,
    radial_distr: RD,
    first: bool,
}

impl<MD, RD> CentralBodyCreator<MD, RD>
where
    MD: Distribution<f32>,
    RD: Distribution<f32>,
{
    pub fn new(central_mass: f32, gravity: f32, mass_distr: MD, radial_distr: RD) -> Self {
        debug!("central body creator with mass {central_mass}");
        Self {
            central_mass,
            gravity,
            mass_distr,
            radial_distr,
            first: true,
        }
    }
}

impl<MD, RD> BodyCreator for CentralBodyCreator<MD, RD>
where
    MD: Distribution<f32>,
    RD: Distribution<f32>,
{
    fn create_body<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Body {
        if self.first {
            self.first = false;
            return Body::new(Vector3::zeros(), Vector3::zeros(), self.central_mass);
        }

        let r = self.radial_distr.sample(rng);
        let phi = Uniform::new(0., TAU).sample(rng);
        let position = Vector3::new(r * phi.cos(), r * phi.sin(), 0.);

        let speed = (self.gravity * self.central_mass / r).sqrt();
        let velocity = Vector3::new(-phi.sin(), phi.cos(), 0.) * speed;

        Body::new(position, velocity, self.mass_distr.sample(rng))
    }
}
