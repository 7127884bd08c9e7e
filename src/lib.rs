/*
 * RPS Ecology Simulation - Module Definitions
 *
 * This file defines the module structure for the predator/prey simulation.
 * Three (or more) species chase their prey and flee their predators inside a
 * periodic 3D box; caught points are removed or converted.
 */

// Re-export key components for easier access
pub use collision::resolve_collisions;
pub use debug::TickReport;
pub use domain::Domain;
pub use error::{ConfigError, Phase, SimError};
pub use neighbors::{FullScan, NeighborSource};
pub use params::{ParamChanges, ParamsUpdate, SimulationParams};
pub use physics::compute_accelerations;
pub use runner::{RunnerCommand, RunnerEvent, SimulationHandle, SimulationSnapshot};
pub use scheduler::{GameSpeed, RunState, TickScheduler};
pub use spatial_grid::{GridBoundary, SpatialGrid};
pub use species::{CollisionMode, PredationCycle, Strategy};
pub use state::{SimulationState, SpeciesPoints};
pub use stepper::{step, step_with_report, Stepper};

// Define modules
pub mod collision;
pub mod debug;
pub mod domain;
pub mod error;
pub mod integrator;
pub mod neighbors;
pub mod params;
pub mod physics;
pub mod runner;
pub mod scheduler;
pub mod spatial_grid;
pub mod species;
pub mod state;
pub mod stepper;

/// Build the initial state for `params`.
pub fn initialize(params: SimulationParams) -> Result<SimulationState, SimError> {
    SimulationState::initialize(params)
}
