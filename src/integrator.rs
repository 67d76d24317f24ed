//! Kick-drift-kick leapfrog.
//!
//! A step is split into phases separated by full barriers: half kick and
//! drift of every body, rebuild of the solver from the drifted positions, then
//! the new acceleration and second half kick of every body. Within a phase the
//! bodies are independent, so [`Execution::RayonIter`] hands each one to rayon.

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::{Body, Execution, Solver};

fn for_each_body<F>(bodies: &mut [Body], execution: Execution, f: F)
where
    F: Fn(&mut Body) + Send + Sync,
{
    match execution {
        Execution::SingleThreaded => bodies.iter_mut().for_each(f),
        #[cfg(feature = "rayon")]
        Execution::RayonIter => bodies.par_iter_mut().for_each(f),
    }
}

#[inline]
fn kick_drift(body: &mut Body, dt: f32) {
    let velocity = body.velocity() + body.acceleration() * (0.5 * dt);
    body.set_velocity(velocity);
    body.set_position(body.position() + velocity * dt);
}

#[inline]
fn kick<S: Solver + ?Sized>(body: &mut Body, solver: &S, dt: f32) {
    let acceleration = solver.acceleration(&body.position());
    body.set_velocity(body.velocity() + acceleration * (0.5 * dt));
    body.set_acceleration(acceleration);
}

/// Compute the accelerations of `bodies` so that the first half kick of
/// [`leapfrog`] has a consistent previous acceleration.
pub fn prime_accelerations<S: Solver + ?Sized>(
    bodies: &mut [Body],
    solver: &mut S,
    execution: Execution,
) {
    solver.rebuild(bodies, execution);
    let solver = &*solver;
    for_each_body(bodies, execution, |body| {
        body.set_acceleration(solver.acceleration(&body.position()));
    });
}

/// Advance `bodies` in place by `dt`.
pub fn leapfrog<S: Solver + ?Sized>(
    bodies: &mut [Body],
    solver: &mut S,
    dt: f32,
    execution: Execution,
) {
    for_each_body(bodies, execution, |body| kick_drift(body, dt));
    solver.rebuild(bodies, execution);
    let solver = &*solver;
    for_each_body(bodies, execution, |body| kick(body, solver, dt));
}

/// Advance the bodies of `input` by `dt`, writing the result to `output`.
///
/// `input` is only read, so a caller can keep showing it while the next state
/// is produced and swap the buffers afterwards.
///
/// # Panics
///
/// If the buffers differ in length.
pub fn leapfrog_buffered<S: Solver + ?Sized>(
    input: &[Body],
    output: &mut [Body],
    solver: &mut S,
    dt: f32,
    execution: Execution,
) {
    assert_eq!(input.len(), output.len(), "body buffers differ in length");

    match execution {
        Execution::SingleThreaded => {
            output.iter_mut().zip(input).for_each(|(out, body)| {
                *out = *body;
                kick_drift(out, dt);
            });
        }
        #[cfg(feature = "rayon")]
        Execution::RayonIter => {
            output.par_iter_mut().zip(input).for_each(|(out, body)| {
                *out = *body;
                kick_drift(out, dt);
            });
        }
    }

    solver.rebuild(output, execution);
    let solver = &*solver;
    for_each_body(output, execution, |body| kick(body, solver, dt));
}

#[cfg(test)]
mod tests {
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use nalgebra::Vector3;

    use super::*;
    use crate::{total_energy, BarnesHut, DirectSummation, Parameters};

    fn pair() -> ([Body; 2], Parameters) {
        let bodies = [
            Body::at(Vector3::new(-5., 0., 0.)),
            Body::at(Vector3::new(5., 0., 0.)),
        ];
        let params = Parameters::default()
            .with_body_count(2)
            .with_gravity(1.)
            .with_softening(0.01)
            .with_theta(0.5);
        (bodies, params)
    }

    #[test]
    fn symmetric_pair_step() {
        let (mut bodies, params) = pair();
        let mut solver = BarnesHut::new();
        solver.configure(&params).unwrap();

        prime_accelerations(&mut bodies, &mut solver, Execution::SingleThreaded);
        leapfrog(&mut bodies, &mut solver, 0.01, Execution::SingleThreaded);

        let (v0, v1) = (bodies[0].velocity(), bodies[1].velocity());
        assert!(v0.x > 0.);
        assert_abs_diff_eq!(v0, -v1);
        assert_eq!((v0.y, v0.z), (0., 0.));

        for body in &bodies {
            assert_relative_eq!(body.acceleration().norm(), 0.01, max_relative = 1e-4);
        }
    }

    #[test]
    fn primed_step_matches_kick_drift_kick() {
        let (mut bodies, params) = pair();
        let mut solver = DirectSummation::new();
        solver.configure(&params).unwrap();
        prime_accelerations(&mut bodies, &mut solver, Execution::SingleThreaded);

        let dt = 0.5;
        let a0 = bodies[0].acceleration();
        leapfrog(&mut bodies, &mut solver, dt, Execution::SingleThreaded);

        let half = a0 * (0.5 * dt);
        let x = Vector3::new(-5., 0., 0.) + half * dt;
        assert_relative_eq!(bodies[0].position(), x);
        // the second kick uses the field at the drifted positions
        let a1 = Vector3::new(1. / (2. * x.x).powi(2), 0., 0.);
        assert_relative_eq!(bodies[0].acceleration(), a1, max_relative = 1e-5);
        assert_relative_eq!(bodies[0].velocity(), half + a1 * (0.5 * dt), max_relative = 1e-5);
    }

    #[test]
    fn energy_is_conserved() {
        let mut bodies = [
            Body::new(Vector3::zeros(), Vector3::zeros(), 1000.),
            Body::new(Vector3::new(10., 0., 0.), Vector3::new(0., 10., 0.), 1.),
        ];
        let params = Parameters::default()
            .with_body_count(2)
            .with_gravity(1.)
            .with_softening(0.01)
            .with_theta(0.5);
        let mut solver = BarnesHut::new().enclosing();
        solver.configure(&params).unwrap();

        let initial = total_energy(&bodies, params.gravity, params.softening);
        prime_accelerations(&mut bodies, &mut solver, Execution::SingleThreaded);
        for _ in 0..2000 {
            leapfrog(&mut bodies, &mut solver, 0.001, Execution::SingleThreaded);
        }
        let end = total_energy(&bodies, params.gravity, params.softening);

        assert!(((end - initial) / initial).abs() < 0.01);
        // still on the circular orbit after about a third of a revolution
        assert_relative_eq!(bodies[1].position().norm(), 10., max_relative = 0.01);
    }

    #[test]
    fn buffered_matches_in_place() {
        let (bodies, params) = pair();
        let bodies = [bodies[0], bodies[1], Body::at(Vector3::new(0., 3., 1.))];

        let mut in_place = bodies;
        let mut solver = DirectSummation::new();
        solver.configure(&params).unwrap();
        prime_accelerations(&mut in_place, &mut solver, Execution::SingleThreaded);
        let front = in_place;
        leapfrog(&mut in_place, &mut solver, 0.1, Execution::SingleThreaded);

        let mut back = [Body::default(); 3];
        leapfrog_buffered(&front, &mut back, &mut solver, 0.1, Execution::SingleThreaded);

        assert_eq!(back, in_place);
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn rayon_matches_single_threaded() {
        let (bodies, params) = pair();
        let mut single = bodies;
        let mut multi = bodies;
        let mut solver = BarnesHut::new();
        solver.configure(&params).unwrap();

        for _ in 0..10 {
            leapfrog(&mut single, &mut solver, 0.01, Execution::SingleThreaded);
        }
        for _ in 0..10 {
            leapfrog(&mut multi, &mut solver, 0.01, Execution::RayonIter);
        }
        assert_eq!(single, multi);
    }
}
