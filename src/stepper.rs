/*
 * Stepper Module
 *
 * Runs one tick of the simulation:
 *   1. rebuild the grid from the current positions (grid mode only)
 *   2. compute every acceleration from that snapshot
 *   3. integrate every species into a working copy
 *   4. rebuild the grid from the integrated positions (grid mode only)
 *   5. resolve collisions on the integrated snapshot
 *   6. commit
 *
 * A tick either commits completely or fails with nothing committed, so
 * observers never see a post-integration, pre-collision state.
 */

use std::time::Instant;

use crate::collision::resolve_collisions;
use crate::debug::TickReport;
use crate::error::SimError;
use crate::integrator::integrate_species;
use crate::neighbors::{FullScan, NeighborSource};
use crate::params::SimulationParams;
use crate::physics::compute_accelerations;
use crate::spatial_grid::SpatialGrid;
use crate::state::{SimulationState, SpeciesPoints};

// Grid reused across ticks when indexing is enabled
#[derive(Debug, Default)]
pub struct Stepper {
    grid: Option<SpatialGrid>,
}

impl Stepper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&mut self, state: &SimulationState) -> Result<SimulationState, SimError> {
        self.step_with_report(state).map(|(next, _)| next)
    }

    pub fn step_with_report(&mut self, state: &SimulationState) -> Result<(SimulationState, TickReport), SimError> {
        let tick_start = Instant::now();
        let params = state.params();
        let domain = state.domain();
        let mut report = TickReport {
            tick: state.tick() + 1,
            populations_before: state.populations(),
            ..TickReport::default()
        };

        let mut grid = if params.use_grid_index {
            let cell_length = params.effective_cell_length();
            let grid = match self.grid.take() {
                Some(mut grid) if grid.cell_length == cell_length => {
                    grid.boundary = params.grid_boundary;
                    grid.set_domain(domain);
                    grid
                }
                _ => SpatialGrid::new(cell_length, domain, params.grid_boundary)?,
            };
            Some(self.grid.insert(grid))
        } else {
            self.grid = None;
            None
        };

        // Forces from the tick-start snapshot
        let phase_start = Instant::now();
        let accelerations = match grid.as_deref_mut() {
            Some(grid) => {
                rebuild(grid, state.species());
                report.grid_time += phase_start.elapsed();
                let force_start = Instant::now();
                let accelerations = compute_accelerations(state.species(), params, domain, &*grid)?;
                report.force_time = force_start.elapsed();
                accelerations
            }
            None => {
                let accelerations = compute_accelerations(state.species(), params, domain, &FullScan::new(state.species()))?;
                report.force_time = phase_start.elapsed();
                accelerations
            }
        };

        let phase_start = Instant::now();
        let mut working = state.species().to_vec();
        for (species, (points, accelerations)) in working.iter_mut().zip(&accelerations).enumerate() {
            integrate_species(species, points, accelerations, params, domain)?;
        }
        report.integrate_time = phase_start.elapsed();

        let next = match grid {
            Some(grid) => {
                let phase_start = Instant::now();
                rebuild(grid, &working);
                report.grid_time += phase_start.elapsed();
                collide(&working, params, &*grid, &mut report)
            }
            None => collide(&working, params, &FullScan::new(&working), &mut report),
        };

        let next = state.committed(next);
        report.populations_after = next.populations();
        report.total_time = tick_start.elapsed();
        report.log();
        Ok((next, report))
    }
}

fn rebuild(grid: &mut SpatialGrid, species: &[SpeciesPoints]) {
    grid.build(species.iter().map(|points| points.positions.as_slice()));
}

fn collide<S>(
    snapshot: &[SpeciesPoints],
    params: &SimulationParams,
    source: &S,
    report: &mut TickReport,
) -> Vec<SpeciesPoints>
where
    S: NeighborSource + ?Sized,
{
    let phase_start = Instant::now();
    let next = resolve_collisions(snapshot, params, source);
    report.collision_time = phase_start.elapsed();
    next
}

// Advance `state` by one tick with a fresh stepper
pub fn step(state: &SimulationState) -> Result<SimulationState, SimError> {
    Stepper::new().step(state)
}

pub fn step_with_report(state: &SimulationState) -> Result<(SimulationState, TickReport), SimError> {
    Stepper::new().step_with_report(state)
}

impl SimulationState {
    // Replace self with the next tick; on error self is left as it was
    pub fn advance(&mut self, stepper: &mut Stepper) -> Result<TickReport, SimError> {
        let (next, report) = stepper.step_with_report(self)?;
        *self = next;
        Ok(report)
    }
}
