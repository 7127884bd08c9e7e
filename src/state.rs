/*
 * Simulation State Module
 *
 * Owns the per-species position/velocity arrays together with the validated
 * parameters and the domain they live in. A state is created by `initialize`
 * (uniformly sampled positions, zero velocity), advanced only by the stepper,
 * tuned in place by `reconfigure`, and simply dropped on re-initialization.
 */

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::Domain;
use crate::error::{ConfigError, SimError};
use crate::params::{ParamChanges, ParamsUpdate, SimulationParams};

pub const DEFAULT_JITTER_SIGMA: f32 = 0.002;

// Points of one species; positions[i] and velocities[i] describe the same point
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeciesPoints {
    pub positions: Vec<Vec3>,
    pub velocities: Vec<Vec3>,
}

impl SpeciesPoints {
    pub fn new(positions: Vec<Vec3>, velocities: Vec<Vec3>) -> Self {
        Self { positions, velocities }
    }

    pub fn at_rest(positions: Vec<Vec3>) -> Self {
        let velocities = vec![Vec3::ZERO; positions.len()];
        Self { positions, velocities }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            positions: Vec::with_capacity(capacity),
            velocities: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn push(&mut self, position: Vec3, velocity: Vec3) {
        self.positions.push(position);
        self.velocities.push(velocity);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState {
    params: SimulationParams,
    domain: Domain,
    species: Vec<SpeciesPoints>,
    tick: u64,
}

impl SimulationState {
    // Sample `points_per_species` points uniformly inside the box for every
    // species, all at rest. Seeded when `params.seed` is set.
    pub fn initialize(params: SimulationParams) -> Result<Self, SimError> {
        let mut rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::initialize_with_rng(params, &mut rng)
    }

    pub fn initialize_with_rng<R: Rng + ?Sized>(params: SimulationParams, rng: &mut R) -> Result<Self, SimError> {
        params.validate()?;
        let domain = params.domain()?;
        let half = domain.half_extents();

        let species = (0..params.species_count)
            .map(|_| {
                let positions = (0..params.points_per_species)
                    .map(|_| {
                        Vec3::new(
                            rng.gen_range(-half.x..half.x),
                            rng.gen_range(-half.y..half.y),
                            rng.gen_range(-half.z..half.z),
                        )
                    })
                    .collect();
                SpeciesPoints::at_rest(positions)
            })
            .collect();

        log::info!(
            "Initialized {} species with {} points each in a {}x{}x{} domain",
            params.species_count,
            params.points_per_species,
            domain.lengths.x,
            domain.lengths.y,
            domain.lengths.z
        );

        Ok(Self {
            params,
            domain,
            species,
            tick: 0,
        })
    }

    // Build a state from explicit point sets. Positions are wrapped into the box.
    pub fn from_points(params: SimulationParams, species: Vec<SpeciesPoints>) -> Result<Self, SimError> {
        params.validate()?;
        let domain = params.domain()?;

        if species.len() != params.species_count {
            return Err(ConfigError::ListLength {
                list: "species point sets",
                expected: params.species_count,
                actual: species.len(),
            }
            .into());
        }

        let mut species = species;
        for (index, points) in species.iter_mut().enumerate() {
            if points.positions.len() != points.velocities.len() {
                return Err(SimError::LengthMismatch {
                    species: index,
                    positions: points.positions.len(),
                    velocities: points.velocities.len(),
                });
            }
            for position in &mut points.positions {
                *position = domain.wrap(*position);
            }
        }

        Ok(Self {
            params,
            domain,
            species,
            tick: 0,
        })
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn species(&self) -> &[SpeciesPoints] {
        &self.species
    }

    pub fn species_count(&self) -> usize {
        self.species.len()
    }

    // Read-only view of one species' positions for observers between ticks
    pub fn snapshot(&self, species: usize) -> Result<&[Vec3], SimError> {
        self.points(species).map(|points| points.positions.as_slice())
    }

    pub fn velocities(&self, species: usize) -> Result<&[Vec3], SimError> {
        self.points(species).map(|points| points.velocities.as_slice())
    }

    pub fn points(&self, species: usize) -> Result<&SpeciesPoints, SimError> {
        self.species.get(species).ok_or(SimError::SpeciesOutOfRange {
            species,
            count: self.species.len(),
        })
    }

    pub fn populations(&self) -> Vec<usize> {
        self.species.iter().map(SpeciesPoints::len).collect()
    }

    pub fn total_population(&self) -> usize {
        self.species.iter().map(SpeciesPoints::len).sum()
    }

    // Species that still have points
    pub fn surviving_species(&self) -> Vec<usize> {
        self.species
            .iter()
            .enumerate()
            .filter(|(_, points)| !points.is_empty())
            .map(|(index, _)| index)
            .collect()
    }

    // Apply a validated partial parameter change without touching positions,
    // except that a resized domain re-wraps every point into the new box.
    // On error the state is left unchanged.
    pub fn reconfigure(&mut self, update: &ParamsUpdate) -> Result<ParamChanges, SimError> {
        // Lists sized for another species count would resize the ecology
        let count = self.species.len();
        let resizes = update.strategies.as_ref().is_some_and(|list| list.len() != count)
            || update.predation.as_ref().is_some_and(|cycle| cycle.len() != count);
        if resizes {
            return Err(ConfigError::SpeciesCountChange.into());
        }

        let (next, changes) = update.apply_to(&self.params);
        next.validate()?;

        if changes.domain_changed {
            self.domain = next.domain()?;
            let domain = self.domain;
            for points in &mut self.species {
                for position in &mut points.positions {
                    *position = domain.wrap(*position);
                }
            }
            log::info!(
                "Domain resized to {}x{}x{}",
                domain.lengths.x,
                domain.lengths.y,
                domain.lengths.z
            );
        }
        if changes.any_changed {
            log::info!("Parameters reconfigured at tick {}", self.tick);
        }

        self.params = next;
        Ok(changes)
    }

    // Add zero-mean Gaussian noise to every coordinate and wrap back into the box
    pub fn jitter<R: Rng + ?Sized>(&mut self, sigma: f32, rng: &mut R) -> Result<(), SimError> {
        if !(sigma >= 0.0 && sigma.is_finite()) {
            return Err(ConfigError::JitterSigma(sigma).into());
        }
        let domain = self.domain;
        for points in &mut self.species {
            for position in &mut points.positions {
                let noise = Vec3::new(gaussian(rng), gaussian(rng), gaussian(rng)) * sigma;
                *position = domain.wrap(*position + noise);
            }
        }
        Ok(())
    }

    // Commit the outcome of a fully computed tick
    pub(crate) fn committed(&self, species: Vec<SpeciesPoints>) -> Self {
        Self {
            params: self.params.clone(),
            domain: self.domain,
            species,
            tick: self.tick + 1,
        }
    }
}

// Standard normal sample (Box-Muller)
fn gaussian<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    let u1: f32 = 1.0 - rng.gen::<f32>();
    let u2: f32 = rng.gen::<f32>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos()
}
