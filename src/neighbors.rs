/*
 * Neighbor Sources
 *
 * The force and collision passes need, for a query point, the indices of one
 * species' points that might be close. Two sources supply them: a full scan
 * over every point, and the spatial grid. Both feed the same exact-distance and
 * accumulation code, so the two paths cannot drift apart.
 */

use std::ops::ControlFlow;

use glam::Vec3;

use crate::spatial_grid::SpatialGrid;
use crate::state::SpeciesPoints;

pub trait NeighborSource: Sync {
    // Visit candidate indices of `species` that may lie within `radius` of
    // `point`. The visitor can stop the walk early with `ControlFlow::Break`.
    fn visit_candidates(
        &self,
        species: usize,
        point: Vec3,
        radius: f32,
        visitor: &mut dyn FnMut(usize) -> ControlFlow<()>,
    );

    // True if any candidate satisfies `predicate`
    fn any_candidate(
        &self,
        species: usize,
        point: Vec3,
        radius: f32,
        predicate: &mut dyn FnMut(usize) -> bool,
    ) -> bool {
        let mut found = false;
        self.visit_candidates(species, point, radius, &mut |index| {
            if predicate(index) {
                found = true;
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        found
    }
}

// Brute-force source: every point of the species is a candidate
#[derive(Debug, Clone)]
pub struct FullScan {
    counts: Vec<usize>,
}

impl FullScan {
    pub fn new(species: &[SpeciesPoints]) -> Self {
        Self {
            counts: species.iter().map(SpeciesPoints::len).collect(),
        }
    }
}

impl NeighborSource for FullScan {
    fn visit_candidates(
        &self,
        species: usize,
        _point: Vec3,
        _radius: f32,
        visitor: &mut dyn FnMut(usize) -> ControlFlow<()>,
    ) {
        let count = self.counts.get(species).copied().unwrap_or(0);
        for index in 0..count {
            if visitor(index).is_break() {
                return;
            }
        }
    }
}

impl NeighborSource for SpatialGrid {
    fn visit_candidates(
        &self,
        species: usize,
        point: Vec3,
        radius: f32,
        visitor: &mut dyn FnMut(usize) -> ControlFlow<()>,
    ) {
        let candidates = self.query_radius(species, point, radius);
        for index in candidates {
            if visitor(index).is_break() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;
    use crate::spatial_grid::GridBoundary;

    #[test]
    fn full_scan_visits_every_index_in_order() {
        let species = vec![
            SpeciesPoints::at_rest(vec![Vec3::ZERO; 3]),
            SpeciesPoints::at_rest(vec![Vec3::ONE; 2]),
        ];
        let scan = FullScan::new(&species);

        let mut seen = Vec::new();
        scan.visit_candidates(0, Vec3::ZERO, 0.1, &mut |i| {
            seen.push(i);
            ControlFlow::Continue(())
        });
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[test]
    fn any_candidate_stops_at_first_match() {
        let species = vec![SpeciesPoints::at_rest(vec![Vec3::ZERO; 10])];
        let scan = FullScan::new(&species);

        let mut visited = 0;
        let found = scan.any_candidate(0, Vec3::ZERO, 1.0, &mut |i| {
            visited += 1;
            i == 3
        });
        assert!(found);
        assert_eq!(visited, 4);
    }

    #[test]
    fn grid_source_matches_query() {
        let positions = vec![Vec3::new(0.1, 0.1, 0.1), Vec3::new(1.9, 1.9, 1.9)];
        let mut grid = SpatialGrid::new(0.5, Domain::cube(4.0).unwrap(), GridBoundary::Clipped).unwrap();
        grid.build([positions.as_slice()]);

        let mut seen = Vec::new();
        grid.visit_candidates(0, Vec3::ZERO, 0.3, &mut |i| {
            seen.push(i);
            ControlFlow::Continue(())
        });
        assert_eq!(seen, vec![0]);
        assert!(!grid.any_candidate(1, Vec3::ZERO, 0.3, &mut |_| true));
    }
}
