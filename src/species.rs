/*
 * Species Module
 *
 * Defines the per-species behaviour presets (strategies), the collision mode
 * and the predation cycle that ties the species together. Each species chases
 * its prey and flees its predator; the cycle is validated once, up front, so
 * the tick loop can index prey/predator lists without further checks.
 */

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_SPECIES_NAMES: [&str; 3] = ["Rock", "Scissors", "Paper"];

pub fn species_name(index: usize) -> String {
    match DEFAULT_SPECIES_NAMES.get(index) {
        Some(name) => (*name).to_string(),
        None => format!("Species {}", index),
    }
}

// Weighting preset between chasing prey and escaping predators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Strategy {
    #[default]
    Balance,
    Chasing,
    Escaping,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Balance, Strategy::Chasing, Strategy::Escaping];

    // (chase_factor, escape_factor)
    #[inline]
    pub fn factors(self) -> (f32, f32) {
        match self {
            Strategy::Balance => (1.0, 2.0),
            Strategy::Chasing => (1.6, 1.1),
            Strategy::Escaping => (0.5, 2.5),
        }
    }

    pub fn chase_factor(self) -> f32 {
        self.factors().0
    }

    pub fn escape_factor(self) -> f32 {
        self.factors().1
    }
}

/// What happens to a prey point caught by its predator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CollisionMode {
    /// The caught point joins the predator's species, keeping its velocity.
    #[default]
    Assimilate,
    /// The caught point is removed.
    Eliminate,
}

/// Parallel prey/predator index lists.
///
/// A valid cycle has `prey` and `predator` as permutations of `0..S` with no
/// fixed points, and `predator` is the inverse of `prey`, so every predation
/// edge is seen the same way from both ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredationCycle {
    pub prey: Vec<usize>,
    pub predator: Vec<usize>,
}

impl Default for PredationCycle {
    fn default() -> Self {
        // Rock -> Scissors -> Paper -> Rock
        Self {
            prey: vec![1, 2, 0],
            predator: vec![2, 0, 1],
        }
    }
}

impl PredationCycle {
    // Single cycle where species i preys on species i + 1
    pub fn ring(species_count: usize) -> Self {
        let prey = (0..species_count).map(|i| (i + 1) % species_count).collect();
        let predator = (0..species_count)
            .map(|i| (i + species_count - 1) % species_count)
            .collect();
        Self { prey, predator }
    }

    // Build the cycle from the prey list alone, deriving predators as its inverse
    pub fn from_prey(prey: Vec<usize>) -> Result<Self, ConfigError> {
        let count = prey.len();
        check_permutation("prey", &prey, count)?;
        let mut predator = vec![0; count];
        for (species, &target) in prey.iter().enumerate() {
            predator[target] = species;
        }
        let cycle = Self { prey, predator };
        cycle.validate(count)?;
        Ok(cycle)
    }

    pub fn len(&self) -> usize {
        self.prey.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prey.is_empty()
    }

    #[inline]
    pub fn prey_of(&self, species: usize) -> usize {
        self.prey[species]
    }

    #[inline]
    pub fn predator_of(&self, species: usize) -> usize {
        self.predator[species]
    }

    pub fn validate(&self, species_count: usize) -> Result<(), ConfigError> {
        check_permutation("prey", &self.prey, species_count)?;
        check_permutation("predator", &self.predator, species_count)?;

        for (species, &prey) in self.prey.iter().enumerate() {
            let actual = self.predator[prey];
            if actual != species {
                return Err(ConfigError::InconsistentCycle { species, actual });
            }
        }
        Ok(())
    }
}

fn check_permutation(list: &'static str, values: &[usize], count: usize) -> Result<(), ConfigError> {
    if values.len() != count {
        return Err(ConfigError::ListLength {
            list,
            expected: count,
            actual: values.len(),
        });
    }

    let mut seen = vec![false; count];
    for (species, &target) in values.iter().enumerate() {
        if target >= count {
            return Err(ConfigError::IndexOutOfRange { list, species, target });
        }
        if target == species {
            return Err(ConfigError::SelfReference { species, role: list });
        }
        if seen[target] {
            return Err(ConfigError::NotPermutation { list });
        }
        seen[target] = true;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_table_matches_presets() {
        assert_eq!(Strategy::Balance.factors(), (1.0, 2.0));
        assert_eq!(Strategy::Chasing.factors(), (1.6, 1.1));
        assert_eq!(Strategy::Escaping.factors(), (0.5, 2.5));
        assert_eq!(Strategy::default(), Strategy::Balance);
        for strategy in Strategy::ALL {
            assert!(strategy.chase_factor() > 0.0 && strategy.escape_factor() > 0.0);
        }
    }

    #[test]
    fn default_cycle_is_valid() {
        let cycle = PredationCycle::default();
        assert!(cycle.validate(3).is_ok());
        assert_eq!(cycle.prey_of(0), 1);
        assert_eq!(cycle.predator_of(0), 2);
    }

    #[test]
    fn ring_matches_default_for_three_species() {
        assert_eq!(PredationCycle::ring(3), PredationCycle::default());
        assert!(PredationCycle::ring(5).validate(5).is_ok());
    }

    #[test]
    fn from_prey_derives_inverse() {
        let cycle = PredationCycle::from_prey(vec![2, 0, 1]).unwrap();
        assert_eq!(cycle.predator, vec![1, 2, 0]);
    }

    #[test]
    fn rejects_self_predation() {
        let cycle = PredationCycle {
            prey: vec![0, 2, 1],
            predator: vec![0, 2, 1],
        };
        assert_eq!(
            cycle.validate(3),
            Err(ConfigError::SelfReference { species: 0, role: "prey" })
        );
    }

    #[test]
    fn rejects_out_of_range_and_duplicates() {
        let out_of_range = PredationCycle {
            prey: vec![1, 5, 0],
            predator: vec![2, 0, 1],
        };
        assert!(matches!(
            out_of_range.validate(3),
            Err(ConfigError::IndexOutOfRange { species: 1, target: 5, .. })
        ));

        let duplicate = PredationCycle {
            prey: vec![1, 0, 0],
            predator: vec![2, 0, 1],
        };
        assert_eq!(
            duplicate.validate(3),
            Err(ConfigError::NotPermutation { list: "prey" })
        );
    }

    #[test]
    fn rejects_predator_list_that_is_not_the_inverse() {
        let cycle = PredationCycle {
            prey: vec![1, 2, 0],
            predator: vec![1, 2, 0],
        };
        assert!(matches!(cycle.validate(3), Err(ConfigError::InconsistentCycle { .. })));
    }

    #[test]
    fn rejects_wrong_length() {
        let cycle = PredationCycle::default();
        assert!(matches!(cycle.validate(4), Err(ConfigError::ListLength { .. })));
    }

    #[test]
    fn names_fall_back_to_index() {
        assert_eq!(species_name(0), "Rock");
        assert_eq!(species_name(2), "Paper");
        assert_eq!(species_name(7), "Species 7");
    }
}
