/*
 * Error Module
 *
 * Configuration problems are caught when a simulation is initialized or
 * reconfigured. Numeric problems (non-finite forces, velocities or positions)
 * are caught inside a tick and abort that tick before anything is committed.
 */

use thiserror::Error;

// Rejected configuration values
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("domain {axis} length must be positive and finite, got {value}")]
    DomainLength { axis: char, value: f32 },
    #[error("mass must be positive and finite, got {0}")]
    Mass(f32),
    #[error("timestep dt must be positive and finite, got {0}")]
    Timestep(f32),
    #[error("grid cell length must be positive and finite, got {0}")]
    CellLength(f32),
    #[error("visibility must be positive and finite, got {0}")]
    Visibility(f32),
    #[error("collision radius must be non-negative and finite, got {0}")]
    CollisionRadius(f32),
    #[error("drag factor must be in [0, 1), got {0}")]
    DragFactor(f32),
    #[error("{name} must be positive and finite, got {value}")]
    Limit { name: &'static str, value: f32 },
    #[error("at least two species are required, got {0}")]
    SpeciesCount(usize),
    #[error("{list} has {actual} entries but there are {expected} species")]
    ListLength {
        list: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{list}[{species}] = {target} is not a valid species index")]
    IndexOutOfRange {
        list: &'static str,
        species: usize,
        target: usize,
    },
    #[error("species {species} cannot be its own {role}")]
    SelfReference { species: usize, role: &'static str },
    #[error("{list} is not a permutation of the species indices")]
    NotPermutation { list: &'static str },
    #[error("predator of prey({species}) is {actual}, expected {species}")]
    InconsistentCycle { species: usize, actual: usize },
    #[error("species count cannot change without re-initializing")]
    SpeciesCountChange,
    #[error("game speed must be between 1 and 6, got {0}")]
    GameSpeed(u8),
    #[error("jitter sigma must be non-negative and finite, got {0}")]
    JitterSigma(f32),
}

// Which part of a tick produced a non-finite value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Force,
    Integrate,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Force => write!(f, "force"),
            Phase::Integrate => write!(f, "integration"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("non-finite value during {phase} for species {species}, point {index}")]
    NonFinite {
        phase: Phase,
        species: usize,
        index: usize,
    },
    #[error("species index {species} out of range (species count {count})")]
    SpeciesOutOfRange { species: usize, count: usize },
    #[error("species {species} has {positions} positions but {velocities} velocities")]
    LengthMismatch {
        species: usize,
        positions: usize,
        velocities: usize,
    },
    #[error("species {species} has {points} points but {accelerations} accelerations")]
    AccelerationMismatch {
        species: usize,
        points: usize,
        accelerations: usize,
    },
    #[error("failed to read or write config: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_into_sim_error() {
        let err: SimError = ConfigError::Mass(0.0).into();
        assert!(matches!(err, SimError::Config(ConfigError::Mass(_))));
        assert_eq!(err.to_string(), "invalid configuration: mass must be positive and finite, got 0");
    }
}
