/*
 * Physics Module
 *
 * This module computes the steering acceleration of every point: attraction
 * towards its prey species and repulsion from its predator species. Distances
 * use the minimum-image convention, so a prey point just across a face of the
 * box pulls as strongly as one at the same distance inside it.
 *
 * For a point p and each visible neighbor q (nearest periodic copy q', distance
 * d < visibility) the contribution is (q' - p) / d^3: the unit direction scaled
 * by an inverse-square magnitude. Chase and flee sums are weighted by the
 * species' strategy factors over mass, subtracted, and clamped to the
 * acceleration limit.
 *
 * Optimized for performance by:
 * - Using squared distances until a neighbor is known to be visible
 * - Pruning candidates through a NeighborSource (full scan or spatial grid)
 * - Parallel processing of points with rayon
 */

use std::ops::ControlFlow;

use glam::Vec3;
use rayon::prelude::*;

use crate::domain::Domain;
use crate::error::{Phase, SimError};
use crate::neighbors::NeighborSource;
use crate::params::SimulationParams;
use crate::state::SpeciesPoints;

// Per-species constants hoisted out of the inner loop
#[derive(Debug, Clone, Copy)]
pub struct ForceModel {
    pub domain: Domain,
    pub visibility: f32,
    pub visibility_squared: f32,
    pub mass: f32,
    pub acceleration_limit: f32,
}

impl ForceModel {
    pub fn new(params: &SimulationParams, domain: Domain) -> Self {
        Self {
            domain,
            visibility: params.visibility,
            visibility_squared: params.visibility * params.visibility,
            mass: params.mass,
            acceleration_limit: params.acceleration_limit(),
        }
    }

    // Inverse-square pull from `center` towards the nearest copy of `other`.
    // Coincident points and points beyond visibility contribute nothing.
    #[inline]
    pub fn pair_contribution(&self, center: Vec3, other: Vec3) -> Vec3 {
        let (image, d_squared) = self.domain.minimum_image(center, other);
        if d_squared >= self.visibility_squared {
            return Vec3::ZERO;
        }
        // Also catches separations so small that d^3 underflows
        let denominator = d_squared.sqrt() * d_squared;
        if denominator == 0.0 {
            return Vec3::ZERO;
        }
        (image - center) / denominator
    }

    // Sum of pair contributions from the candidates of `species` around `center`
    pub fn accumulate<S>(&self, source: &S, species: usize, others: &[Vec3], center: Vec3) -> Vec3
    where
        S: NeighborSource + ?Sized,
    {
        let mut sum = Vec3::ZERO;
        source.visit_candidates(species, center, self.visibility, &mut |index| {
            sum += self.pair_contribution(center, others[index]);
            ControlFlow::Continue(())
        });
        sum
    }

    // Acceleration of one point of `species`
    pub fn acceleration<S>(
        &self,
        source: &S,
        snapshot: &[SpeciesPoints],
        params: &SimulationParams,
        species: usize,
        center: Vec3,
    ) -> Vec3
    where
        S: NeighborSource + ?Sized,
    {
        let prey = params.predation.prey_of(species);
        let predator = params.predation.predator_of(species);
        let (chase_factor, escape_factor) = params.strategy_of(species).factors();

        let chase = self.accumulate(source, prey, &snapshot[prey].positions, center) * (chase_factor / self.mass);
        let flee = self.accumulate(source, predator, &snapshot[predator].positions, center) * (escape_factor / self.mass);

        self.clamp(chase - flee)
    }

    // Rescale to exactly the limit when the magnitude exceeds it
    #[inline]
    pub fn clamp(&self, acceleration: Vec3) -> Vec3 {
        clamp_magnitude(acceleration, self.acceleration_limit)
    }
}

#[inline]
pub fn clamp_magnitude(vector: Vec3, limit: f32) -> Vec3 {
    let length_squared = vector.length_squared();
    if length_squared.is_infinite() && vector.is_finite() {
        // Components are finite but their squares overflow f32
        let scaled = vector / vector.abs().max_element();
        return scaled.normalize() * limit;
    }
    if length_squared > limit * limit {
        vector * (limit / length_squared.sqrt())
    } else {
        vector
    }
}

// Accelerations for every point of every species, all read from the same
// snapshot. The result is indexed [species][point].
pub fn compute_accelerations<S>(
    snapshot: &[SpeciesPoints],
    params: &SimulationParams,
    domain: Domain,
    source: &S,
) -> Result<Vec<Vec<Vec3>>, SimError>
where
    S: NeighborSource + ?Sized,
{
    let model = ForceModel::new(params, domain);

    snapshot
        .iter()
        .enumerate()
        .map(|(species, points)| {
            let compute = |(index, &center): (usize, &Vec3)| -> Result<Vec3, SimError> {
                let acceleration = model.acceleration(source, snapshot, params, species, center);
                if acceleration.is_finite() {
                    Ok(acceleration)
                } else {
                    Err(SimError::NonFinite {
                        phase: Phase::Force,
                        species,
                        index,
                    })
                }
            };

            if params.parallel {
                points.positions.par_iter().enumerate().map(compute).collect()
            } else {
                points.positions.iter().enumerate().map(compute).collect()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neighbors::FullScan;
    use crate::spatial_grid::{GridBoundary, SpatialGrid};
    use crate::species::{PredationCycle, Strategy};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn params() -> SimulationParams {
        SimulationParams {
            parallel: false,
            ..SimulationParams::default()
        }
    }

    fn model(params: &SimulationParams) -> ForceModel {
        ForceModel::new(params, params.domain().unwrap())
    }

    #[test]
    fn contribution_is_inverse_square_towards_the_other_point() {
        let params = params();
        let model = model(&params);
        let pull = model.pair_contribution(Vec3::ZERO, Vec3::new(0.5, 0.0, 0.0));
        // Unit direction (1,0,0) with magnitude 1 / 0.25
        assert!((pull - Vec3::new(4.0, 0.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn contribution_uses_the_nearest_periodic_copy() {
        let params = params();
        let model = model(&params);
        let pull = model.pair_contribution(Vec3::new(1.9, 0.0, 0.0), Vec3::new(-1.9, 0.0, 0.0));
        assert!(pull.x > 0.0, "should pull across the +x face, got {:?}", pull);
        assert!((pull.x - 25.0).abs() < 0.05);
    }

    #[test]
    fn coincident_points_contribute_zero() {
        let params = params();
        let model = model(&params);
        assert_eq!(model.pair_contribution(Vec3::ONE, Vec3::ONE), Vec3::ZERO);
    }

    #[test]
    fn invisible_points_contribute_zero() {
        let mut params = params();
        params.visibility = 0.5;
        let model = model(&params);
        assert_eq!(model.pair_contribution(Vec3::ZERO, Vec3::new(0.6, 0.0, 0.0)), Vec3::ZERO);
    }

    #[test]
    fn clamp_preserves_direction() {
        let clamped = clamp_magnitude(Vec3::new(30.0, 40.0, 0.0), 5.0);
        assert!((clamped.length() - 5.0).abs() < 1e-5);
        assert!((clamped.normalize() - Vec3::new(0.6, 0.8, 0.0)).length() < 1e-5);
        assert_eq!(clamp_magnitude(Vec3::new(1.0, 0.0, 0.0), 5.0), Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn clamp_rescales_vectors_whose_square_overflows() {
        let clamped = clamp_magnitude(Vec3::new(2.5e22, -2.5e22, 0.0), 5.0);
        assert!((clamped.length() - 5.0).abs() < 1e-4, "{:?}", clamped);
        let direction = Vec3::new(1.0, -1.0, 0.0).normalize();
        assert!((clamped.normalize() - direction).length() < 1e-5);
    }

    #[test]
    fn nearly_coincident_prey_gives_maximum_acceleration() {
        let params = params();
        let snapshot = vec![
            SpeciesPoints::at_rest(vec![Vec3::ZERO]),
            SpeciesPoints::at_rest(vec![Vec3::new(1e-12, 0.0, 0.0)]),
            SpeciesPoints::default(),
        ];
        let accelerations =
            compute_accelerations(&snapshot, &params, params.domain().unwrap(), &FullScan::new(&snapshot)).unwrap();
        let hunter = accelerations[0][0];
        assert!((hunter.length() - params.acceleration_limit()).abs() < 1e-4, "{:?}", hunter);
        assert!(hunter.x > 0.0);
    }

    #[test]
    fn chase_minus_flee_with_strategy_factors() {
        let mut params = params();
        params.acceleration_magnitude_limit = 1000.0;
        params.strategies = vec![Strategy::Chasing, Strategy::Balance, Strategy::Balance];
        let snapshot = vec![
            SpeciesPoints::at_rest(vec![Vec3::ZERO]),
            SpeciesPoints::at_rest(vec![Vec3::new(1.0, 0.0, 0.0)]),  // prey of 0
            SpeciesPoints::at_rest(vec![Vec3::new(0.0, 1.0, 0.0)]),  // predator of 0
        ];
        let model = model(&params);
        let acceleration = model.acceleration(&FullScan::new(&snapshot), &snapshot, &params, 0, Vec3::ZERO);

        let expected = Vec3::new(1.6 / 40.0, -1.1 / 40.0, 0.0);
        assert!((acceleration - expected).length() < 1e-6, "{:?}", acceleration);
    }

    #[test]
    fn acceleration_never_exceeds_limit() {
        let mut rng = StdRng::seed_from_u64(21);
        for _ in 0..200 {
            let mut params = params();
            params.mass = rng.gen_range(1.0..500.0);
            params.acceleration_magnitude_limit = rng.gen_range(0.01..0.5);
            params.dt = rng.gen_range(0.001..0.1);
            let domain = params.domain().unwrap();
            let snapshot: Vec<SpeciesPoints> = (0..3)
                .map(|_| {
                    SpeciesPoints::at_rest(
                        (0..rng.gen_range(0..20))
                            .map(|_| {
                                Vec3::new(
                                    rng.gen_range(-2.0..2.0),
                                    rng.gen_range(-2.0..2.0),
                                    rng.gen_range(-2.0..2.0),
                                )
                            })
                            .collect(),
                    )
                })
                .collect();

            let accelerations = compute_accelerations(&snapshot, &params, domain, &FullScan::new(&snapshot)).unwrap();
            let limit = params.acceleration_limit();
            for acceleration in accelerations.iter().flatten() {
                assert!(acceleration.length() <= limit * (1.0 + 1e-5));
            }
        }
    }

    #[test]
    fn parallel_and_sequential_agree_bit_for_bit() {
        let params = SimulationParams {
            points_per_species: 40,
            seed: Some(9),
            ..SimulationParams::default()
        };
        let state = crate::state::SimulationState::initialize(params.clone()).unwrap();
        let snapshot = state.species();
        let scan = FullScan::new(snapshot);

        let parallel = compute_accelerations(snapshot, &params, state.domain(), &scan).unwrap();
        let sequential_params = SimulationParams {
            parallel: false,
            ..params
        };
        let sequential = compute_accelerations(snapshot, &sequential_params, state.domain(), &scan).unwrap();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn wrapped_grid_matches_full_scan() {
        let params = SimulationParams {
            points_per_species: 30,
            visibility: 0.8,
            acceleration_magnitude_limit: 1000.0,
            parallel: false,
            seed: Some(17),
            ..SimulationParams::default()
        };
        let state = crate::state::SimulationState::initialize(params.clone()).unwrap();
        let snapshot = state.species();

        let mut grid = SpatialGrid::new(0.4, state.domain(), GridBoundary::Wrapped).unwrap();
        grid.build(snapshot.iter().map(|points| points.positions.as_slice()));

        let brute = compute_accelerations(snapshot, &params, state.domain(), &FullScan::new(snapshot)).unwrap();
        let indexed = compute_accelerations(snapshot, &params, state.domain(), &grid).unwrap();
        for (a, b) in brute.iter().flatten().zip(indexed.iter().flatten()) {
            assert!((*a - *b).length() <= 1e-4 * a.length().max(1.0), "{:?} vs {:?}", a, b);
        }
    }

    #[test]
    fn two_species_cycle_chases_and_flees_the_same_species() {
        let mut params = SimulationParams::with_species(2);
        params.parallel = false;
        params.acceleration_magnitude_limit = 1000.0;
        assert_eq!(params.predation, PredationCycle::ring(2));

        let snapshot = vec![
            SpeciesPoints::at_rest(vec![Vec3::ZERO]),
            SpeciesPoints::at_rest(vec![Vec3::new(1.0, 0.0, 0.0)]),
        ];
        let model = model(&params);
        let acceleration = model.acceleration(&FullScan::new(&snapshot), &snapshot, &params, 0, Vec3::ZERO);
        // Balance: chase 1, escape 2 against the same point, so net repulsion
        assert!((acceleration - Vec3::new(-1.0 / 40.0, 0.0, 0.0)).length() < 1e-6);
    }
}
