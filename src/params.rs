/*
 * Simulation Parameters Module
 *
 * This module defines the SimulationParams struct holding every tunable of a
 * simulation: domain size, physical constants, the predation cycle, per-species
 * strategies and performance switches. Parameters load from and save to YAML,
 * and are validated as a whole before a simulation ever sees them.
 *
 * Live edits go through ParamsUpdate, which carries only the fields being
 * changed and reports which kinds of change were applied.
 */

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::error::{ConfigError, SimError};
use crate::spatial_grid::GridBoundary;
use crate::species::{CollisionMode, PredationCycle, Strategy};

// Ratio between the default grid cell length and the collision radius
pub const DEFAULT_CELL_LENGTH_FACTOR: f32 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    pub domain_x_length: f32,
    pub domain_y_length: f32,
    pub domain_z_length: f32,
    pub species_count: usize,
    pub points_per_species: usize,
    pub mass: f32,
    pub drag_factor: f32,
    pub velocity_magnitude_limit: f32,
    pub acceleration_magnitude_limit: f32,
    pub visibility: f32,
    pub collision_radius: f32,
    pub collision_mode: CollisionMode,
    pub predation: PredationCycle,
    pub strategies: Vec<Strategy>,
    pub dt: f32,
    // Performance settings
    pub use_grid_index: bool,
    pub cell_length: Option<f32>,  // Defaults to a multiple of the collision radius
    pub grid_boundary: GridBoundary,
    pub parallel: bool,
    // Scheduling and sampling
    pub tick_delay_ms: u64,
    pub seed: Option<u64>,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            domain_x_length: 4.0,
            domain_y_length: 4.0,
            domain_z_length: 4.0,
            species_count: 3,
            points_per_species: 60,
            mass: 40.0,
            drag_factor: 0.02,
            velocity_magnitude_limit: 0.1,
            acceleration_magnitude_limit: 0.1,
            visibility: 5.0,
            collision_radius: 0.12,
            collision_mode: CollisionMode::Assimilate,
            predation: PredationCycle::default(),
            strategies: vec![Strategy::Balance; 3],
            dt: 0.02,
            use_grid_index: false,
            cell_length: None,
            grid_boundary: GridBoundary::Clipped,
            parallel: true,
            tick_delay_ms: 20,
            seed: None,
        }
    }
}

impl SimulationParams {
    // Default parameters for `species_count` species linked in a single ring
    pub fn with_species(species_count: usize) -> Self {
        Self {
            species_count,
            predation: PredationCycle::ring(species_count),
            strategies: vec![Strategy::Balance; species_count],
            ..Self::default()
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SimError> {
        let contents = std::fs::read_to_string(path)?;
        let params: SimulationParams = serde_yaml::from_str(&contents)?;
        params.validate()?;
        Ok(params)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SimError> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn domain(&self) -> Result<Domain, ConfigError> {
        Domain::new(self.domain_x_length, self.domain_y_length, self.domain_z_length)
    }

    #[inline]
    pub fn effective_cell_length(&self) -> f32 {
        self.cell_length
            .unwrap_or(self.collision_radius * DEFAULT_CELL_LENGTH_FACTOR)
    }

    #[inline]
    pub fn acceleration_limit(&self) -> f32 {
        self.acceleration_magnitude_limit / self.dt
    }

    #[inline]
    pub fn velocity_limit(&self) -> f32 {
        self.velocity_magnitude_limit / self.dt
    }

    pub fn tick_delay(&self) -> Duration {
        Duration::from_millis(self.tick_delay_ms)
    }

    pub fn strategy_of(&self, species: usize) -> Strategy {
        self.strategies.get(species).copied().unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.domain()?;

        if !(self.mass > 0.0 && self.mass.is_finite()) {
            return Err(ConfigError::Mass(self.mass));
        }
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return Err(ConfigError::Timestep(self.dt));
        }
        if !(self.visibility > 0.0 && self.visibility.is_finite()) {
            return Err(ConfigError::Visibility(self.visibility));
        }
        if !(self.collision_radius >= 0.0 && self.collision_radius.is_finite()) {
            return Err(ConfigError::CollisionRadius(self.collision_radius));
        }
        if !(self.drag_factor >= 0.0 && self.drag_factor < 1.0) {
            return Err(ConfigError::DragFactor(self.drag_factor));
        }
        if !(self.velocity_magnitude_limit > 0.0 && self.velocity_magnitude_limit.is_finite()) {
            return Err(ConfigError::Limit {
                name: "velocity_magnitude_limit",
                value: self.velocity_magnitude_limit,
            });
        }
        if !(self.acceleration_magnitude_limit > 0.0 && self.acceleration_magnitude_limit.is_finite()) {
            return Err(ConfigError::Limit {
                name: "acceleration_magnitude_limit",
                value: self.acceleration_magnitude_limit,
            });
        }

        // Only checked when the grid is in use; an unset length with a zero
        // collision radius is fine for brute-force runs
        let cell_length = self.effective_cell_length();
        if self.use_grid_index && !(cell_length > 0.0 && cell_length.is_finite()) {
            return Err(ConfigError::CellLength(cell_length));
        }
        if let Some(explicit) = self.cell_length {
            if !(explicit > 0.0 && explicit.is_finite()) {
                return Err(ConfigError::CellLength(explicit));
            }
        }

        if self.species_count < 2 {
            return Err(ConfigError::SpeciesCount(self.species_count));
        }
        if self.strategies.len() != self.species_count {
            return Err(ConfigError::ListLength {
                list: "strategies",
                expected: self.species_count,
                actual: self.strategies.len(),
            });
        }
        self.predation.validate(self.species_count)
    }

    // Get parameter ranges for front-end sliders
    pub fn points_per_species_range() -> std::ops::RangeInclusive<usize> {
        30..=5000
    }

    pub fn mass_range() -> std::ops::RangeInclusive<f32> {
        10.0..=500.0
    }

    pub fn drag_factor_range() -> std::ops::RangeInclusive<f32> {
        0.01..=0.5
    }

    pub fn collision_radius_range() -> std::ops::RangeInclusive<f32> {
        0.05..=0.2
    }

    pub fn velocity_limit_range() -> std::ops::RangeInclusive<f32> {
        0.05..=0.5
    }

    pub fn acceleration_limit_range() -> std::ops::RangeInclusive<f32> {
        0.05..=0.5
    }

    pub fn domain_length_range() -> std::ops::RangeInclusive<f32> {
        0.2..=40.0
    }
}

/// A partial edit of [`SimulationParams`]; `None` fields are left alone.
///
/// The species count is deliberately absent: changing it requires a fresh
/// initialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamsUpdate {
    pub domain_x_length: Option<f32>,
    pub domain_y_length: Option<f32>,
    pub domain_z_length: Option<f32>,
    pub points_per_species: Option<usize>,
    pub mass: Option<f32>,
    pub drag_factor: Option<f32>,
    pub velocity_magnitude_limit: Option<f32>,
    pub acceleration_magnitude_limit: Option<f32>,
    pub visibility: Option<f32>,
    pub collision_radius: Option<f32>,
    pub collision_mode: Option<CollisionMode>,
    pub predation: Option<PredationCycle>,
    pub strategies: Option<Vec<Strategy>>,
    pub dt: Option<f32>,
    pub use_grid_index: Option<bool>,
    pub cell_length: Option<f32>,
    pub grid_boundary: Option<GridBoundary>,
    pub parallel: Option<bool>,
    pub tick_delay_ms: Option<u64>,
}

// What kind of change an applied update made
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParamChanges {
    pub domain_changed: bool,
    pub cadence_changed: bool,
    pub any_changed: bool,
}

impl ParamsUpdate {
    pub fn strategy(species: usize, strategy: Strategy, current: &SimulationParams) -> Self {
        let mut strategies = current.strategies.clone();
        if let Some(slot) = strategies.get_mut(species) {
            *slot = strategy;
        }
        Self {
            strategies: Some(strategies),
            ..Self::default()
        }
    }

    pub fn collision_mode(mode: CollisionMode) -> Self {
        Self {
            collision_mode: Some(mode),
            ..Self::default()
        }
    }

    // Produce the merged parameters without touching `base`; the caller
    // validates and commits them
    pub fn apply_to(&self, base: &SimulationParams) -> (SimulationParams, ParamChanges) {
        let mut next = base.clone();

        macro_rules! merge {
            ($($field:ident),* $(,)?) => {
                $(
                    if let Some(value) = &self.$field {
                        next.$field = value.clone();
                    }
                )*
            };
        }

        merge!(
            domain_x_length,
            domain_y_length,
            domain_z_length,
            points_per_species,
            mass,
            drag_factor,
            velocity_magnitude_limit,
            acceleration_magnitude_limit,
            visibility,
            collision_radius,
            collision_mode,
            predation,
            strategies,
            dt,
            use_grid_index,
            grid_boundary,
            parallel,
            tick_delay_ms,
        );
        if let Some(cell_length) = self.cell_length {
            next.cell_length = Some(cell_length);
        }

        let changes = ParamChanges {
            domain_changed: next.domain_x_length != base.domain_x_length
                || next.domain_y_length != base.domain_y_length
                || next.domain_z_length != base.domain_z_length,
            cadence_changed: next.tick_delay_ms != base.tick_delay_ms,
            any_changed: next != *base,
        };
        (next, changes)
    }
}
