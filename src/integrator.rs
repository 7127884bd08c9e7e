/*
 * Integrator Module
 *
 * Advances one species by a single explicit Euler step:
 *
 *   v <- v * (1 - drag)
 *   v <- v + a * dt, then clamp |v| to velocity_magnitude_limit / dt
 *   p <- wrap(p + v * dt)
 *
 * Drag is a per-step multiplicative decay, not a force, so it does not scale
 * with dt. Any non-finite velocity or position aborts the step.
 */

use glam::Vec3;

use crate::domain::Domain;
use crate::error::{Phase, SimError};
use crate::params::SimulationParams;
use crate::physics::clamp_magnitude;
use crate::state::SpeciesPoints;

// Step constants shared by every point of a tick
#[derive(Debug, Clone, Copy)]
pub struct Integrator {
    pub retention: f32,
    pub dt: f32,
    pub velocity_limit: f32,
    pub domain: Domain,
}

impl Integrator {
    pub fn new(params: &SimulationParams, domain: Domain) -> Self {
        Self {
            retention: 1.0 - params.drag_factor,
            dt: params.dt,
            velocity_limit: params.velocity_limit(),
            domain,
        }
    }

    // New (position, velocity) of one point
    #[inline]
    pub fn advance(&self, position: Vec3, velocity: Vec3, acceleration: Vec3) -> (Vec3, Vec3) {
        let velocity = clamp_magnitude(velocity * self.retention + acceleration * self.dt, self.velocity_limit);
        let position = self.domain.wrap(position + velocity * self.dt);
        (position, velocity)
    }
}

// Integrate every point of `points` in place. `accelerations` must have one
// entry per point. On error `points` may be partially updated, so callers
// integrate a working copy.
pub fn integrate_species(
    species: usize,
    points: &mut SpeciesPoints,
    accelerations: &[Vec3],
    params: &SimulationParams,
    domain: Domain,
) -> Result<(), SimError> {
    if points.velocities.len() != points.len() {
        return Err(SimError::LengthMismatch {
            species,
            positions: points.len(),
            velocities: points.velocities.len(),
        });
    }
    if accelerations.len() != points.len() {
        return Err(SimError::AccelerationMismatch {
            species,
            points: points.len(),
            accelerations: accelerations.len(),
        });
    }

    let integrator = Integrator::new(params, domain);
    let SpeciesPoints { positions, velocities } = points;

    for (index, ((position, velocity), &acceleration)) in positions
        .iter_mut()
        .zip(velocities.iter_mut())
        .zip(accelerations)
        .enumerate()
    {
        let (next_position, next_velocity) = integrator.advance(*position, *velocity, acceleration);
        if !(next_velocity.is_finite() && next_position.is_finite()) {
            return Err(SimError::NonFinite {
                phase: Phase::Integrate,
                species,
                index,
            });
        }
        *position = next_position;
        *velocity = next_velocity;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SimulationParams {
        SimulationParams::default()
    }

    fn domain() -> Domain {
        params().domain().unwrap()
    }

    #[test]
    fn drag_decays_velocity_without_acceleration() {
        let mut points = SpeciesPoints::new(vec![Vec3::ZERO], vec![Vec3::new(1.0, 0.0, 0.0)]);
        integrate_species(0, &mut points, &[Vec3::ZERO], &params(), domain()).unwrap();

        assert!((points.velocities[0].x - 0.98).abs() < 1e-6);
        assert!((points.positions[0].x - 0.98 * 0.02).abs() < 1e-6);
    }

    #[test]
    fn velocity_is_clamped_to_limit() {
        let params = params();
        let mut points = SpeciesPoints::new(vec![Vec3::ZERO], vec![Vec3::new(0.0, 5.0, 0.0)]);
        integrate_species(0, &mut points, &[Vec3::new(0.0, 100.0, 0.0)], &params, domain()).unwrap();

        let limit = params.velocity_limit();
        assert!((points.velocities[0].length() - limit).abs() < 1e-4);
        assert!(points.velocities[0].y > 0.0);
    }

    #[test]
    fn crossing_the_upper_face_wraps_to_the_lower_face() {
        let mut points = SpeciesPoints::new(vec![Vec3::new(1.999, 0.0, 0.0)], vec![Vec3::new(0.2, 0.0, 0.0)]);
        integrate_species(0, &mut points, &[Vec3::ZERO], &params(), domain()).unwrap();

        let x = points.positions[0].x;
        assert!((x - (-1.99708)).abs() < 1e-4, "x = {}", x);
        assert!(domain().contains(points.positions[0]));
    }

    #[test]
    fn non_finite_acceleration_is_reported() {
        let mut points = SpeciesPoints::at_rest(vec![Vec3::ZERO, Vec3::ONE]);
        let accelerations = [Vec3::ZERO, Vec3::new(f32::NAN, 0.0, 0.0)];
        let result = integrate_species(2, &mut points, &accelerations, &params(), domain());
        assert!(matches!(
            result,
            Err(SimError::NonFinite {
                phase: Phase::Integrate,
                species: 2,
                index: 1
            })
        ));
    }

    #[test]
    fn mismatched_acceleration_count_is_rejected() {
        let mut points = SpeciesPoints::at_rest(vec![Vec3::ZERO; 3]);
        let result = integrate_species(0, &mut points, &[Vec3::ZERO], &params(), domain());
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            SimError::AccelerationMismatch {
                species: 0,
                points: 3,
                accelerations: 1
            }
        ));
        assert_eq!(err.to_string(), "species 0 has 3 points but 1 accelerations");
    }

    #[test]
    fn mismatched_velocity_count_is_rejected() {
        let mut points = SpeciesPoints::new(vec![Vec3::ZERO; 2], vec![Vec3::ZERO]);
        let result = integrate_species(1, &mut points, &[Vec3::ZERO; 2], &params(), domain());
        assert!(matches!(
            result,
            Err(SimError::LengthMismatch {
                species: 1,
                positions: 2,
                velocities: 1
            })
        ));
    }
}
