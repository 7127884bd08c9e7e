/*
 * Debug Information Module
 *
 * This module defines the TickReport struct that records performance metrics
 * and population changes for a single tick.
 *
 * Includes metrics for:
 * - Time spent per tick phase (grid, forces, integration, collisions)
 * - Total tick time
 * - Populations per species before and after collision resolution
 */

use std::fmt;
use std::time::Duration;

use crate::species::species_name;

// Debug information for one committed tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub grid_time: Duration,
    pub force_time: Duration,
    pub integrate_time: Duration,
    pub collision_time: Duration,
    pub total_time: Duration,
    pub populations_before: Vec<usize>,
    pub populations_after: Vec<usize>,
}

impl TickReport {
    pub fn total_before(&self) -> usize {
        self.populations_before.iter().sum()
    }

    pub fn total_after(&self) -> usize {
        self.populations_after.iter().sum()
    }

    // Signed population change per species
    pub fn population_deltas(&self) -> Vec<i64> {
        self.populations_before
            .iter()
            .zip(&self.populations_after)
            .map(|(&before, &after)| after as i64 - before as i64)
            .collect()
    }

    // Share of total tick time spent in a phase, in percent
    pub fn phase_percent(&self, phase: Duration) -> f32 {
        let total = self.total_time.as_secs_f32();
        if total > 0.0 {
            phase.as_secs_f32() / total * 100.0
        } else {
            0.0
        }
    }

    pub fn log(&self) {
        log::debug!("{}", self);
    }
}

impl fmt::Display for TickReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tick {}: {:.3?} (grid {:.0}%, forces {:.0}%, integrate {:.0}%, collisions {:.0}%)",
            self.tick,
            self.total_time,
            self.phase_percent(self.grid_time),
            self.phase_percent(self.force_time),
            self.phase_percent(self.integrate_time),
            self.phase_percent(self.collision_time),
        )?;
        for (species, (before, after)) in self.populations_before.iter().zip(&self.populations_after).enumerate() {
            write!(f, " | {} {}->{}", species_name(species), before, after)?;
        }
        Ok(())
    }
}
