/*
 * Collision Module
 *
 * Builds the next generation of every species from one frozen post-integration
 * snapshot. For species S:
 * - a point of S is removed if any point of predator(S) lies within the
 *   collision radius
 * - in Assimilate mode, every point of prey(S) within the collision radius of
 *   any point of S (before removal) is appended to S, keeping its velocity
 *
 * Survivors keep their relative order and come first, followed by assimilated
 * points in prey index order. Distances here are plain Euclidean distances
 * with no periodic images, so a predator and prey touching through a face of
 * the box do not collide.
 *
 * Each species reads only the snapshot, so species are resolved independently
 * (and in parallel when enabled).
 */

use glam::Vec3;
use rayon::prelude::*;

use crate::neighbors::NeighborSource;
use crate::params::SimulationParams;
use crate::species::CollisionMode;
use crate::state::SpeciesPoints;

// True if any point of `species` lies strictly within `radius` of `point`
#[inline]
fn touches<S>(source: &S, points: &[Vec3], species: usize, point: Vec3, radius_squared: f32, radius: f32) -> bool
where
    S: NeighborSource + ?Sized,
{
    source.any_candidate(species, point, radius, &mut |index| {
        point.distance_squared(points[index]) < radius_squared
    })
}

// Next generation of a single species
pub fn resolve_species<S>(snapshot: &[SpeciesPoints], params: &SimulationParams, source: &S, species: usize) -> SpeciesPoints
where
    S: NeighborSource + ?Sized,
{
    let radius = params.collision_radius;
    let radius_squared = radius * radius;
    let prey = params.predation.prey_of(species);
    let predator = params.predation.predator_of(species);

    let own = &snapshot[species];
    let predators = &snapshot[predator].positions;
    let mut next = SpeciesPoints::with_capacity(own.len());

    for (&position, &velocity) in own.positions.iter().zip(&own.velocities) {
        if !touches(source, predators, predator, position, radius_squared, radius) {
            next.push(position, velocity);
        }
    }

    if params.collision_mode == CollisionMode::Assimilate {
        let preys = &snapshot[prey];
        for (&position, &velocity) in preys.positions.iter().zip(&preys.velocities) {
            if touches(source, &own.positions, species, position, radius_squared, radius) {
                next.push(position, velocity);
            }
        }
    }

    next
}

// Next generation of every species. `source` must index `snapshot`.
pub fn resolve_collisions<S>(snapshot: &[SpeciesPoints], params: &SimulationParams, source: &S) -> Vec<SpeciesPoints>
where
    S: NeighborSource + ?Sized,
{
    if params.parallel {
        (0..snapshot.len())
            .into_par_iter()
            .map(|species| resolve_species(snapshot, params, source, species))
            .collect()
    } else {
        (0..snapshot.len())
            .map(|species| resolve_species(snapshot, params, source, species))
            .collect()
    }
}
