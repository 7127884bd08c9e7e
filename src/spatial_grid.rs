/*
 * Spatial Grid Module
 *
 * This module defines the SpatialGrid struct for fast radius queries. Each
 * species gets its own uniform partition of space: a point lands in cell
 * floor(position / cell_length) on every axis, and a query only visits the
 * cells that can hold points within the radius instead of scanning the whole
 * species.
 *
 * Queries are a coarse filter. They return every point in the covered cells,
 * so callers still apply an exact distance test.
 *
 * Boundary handling:
 * - Clipped: cells are computed from raw positions with no periodic copies, so
 *   a point near one face never sees cells near the opposite face even though
 *   those hold its periodic neighbors. Near the faces the result is a subset of
 *   the true periodic neighborhood.
 * - Wrapped: the query is repeated for every periodic image of the query point
 *   whose search cube reaches into the box, so nothing across a face is missed.
 */

use std::collections::HashMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::error::ConfigError;

pub type CellKey = [i32; 3];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GridBoundary {
    #[default]
    Clipped,
    Wrapped,
}

// Convert a position to its integer cell coordinate
#[inline]
fn cell_key(position: Vec3, cell_length: f32) -> CellKey {
    let scaled = (position / cell_length).floor();
    [scaled.x as i32, scaled.y as i32, scaled.z as i32]
}

#[derive(Debug, Clone)]
struct SpeciesCells {
    cells: HashMap<CellKey, Vec<usize>>,
    // Bounding range of occupied cells, used to clip the search cube
    min: CellKey,
    max: CellKey,
}

impl SpeciesCells {
    fn new() -> Self {
        Self {
            cells: HashMap::new(),
            min: [i32::MAX; 3],
            max: [i32::MIN; 3],
        }
    }

    fn clear(&mut self) {
        for cell in self.cells.values_mut() {
            cell.clear();
        }
        self.min = [i32::MAX; 3];
        self.max = [i32::MIN; 3];
    }

    #[inline]
    fn insert(&mut self, key: CellKey, index: usize) {
        self.cells.entry(key).or_default().push(index);
        for axis in 0..3 {
            self.min[axis] = self.min[axis].min(key[axis]);
            self.max[axis] = self.max[axis].max(key[axis]);
        }
    }

    // Append all indices from cells within `rings` of `center` on every axis
    fn collect_cube(&self, center: CellKey, rings: i32, out: &mut Vec<usize>) {
        let mut lo = [0i32; 3];
        let mut hi = [0i32; 3];
        for axis in 0..3 {
            lo[axis] = center[axis].saturating_sub(rings).max(self.min[axis]);
            hi[axis] = center[axis].saturating_add(rings).min(self.max[axis]);
            if lo[axis] > hi[axis] {
                return;
            }
        }

        for x in lo[0]..=hi[0] {
            for y in lo[1]..=hi[1] {
                for z in lo[2]..=hi[2] {
                    if let Some(indices) = self.cells.get(&[x, y, z]) {
                        out.extend_from_slice(indices);
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpatialGrid {
    pub cell_length: f32,
    pub boundary: GridBoundary,
    domain: Domain,
    species: Vec<SpeciesCells>,
}

impl SpatialGrid {
    pub fn new(cell_length: f32, domain: Domain, boundary: GridBoundary) -> Result<Self, ConfigError> {
        if !(cell_length > 0.0 && cell_length.is_finite()) {
            return Err(ConfigError::CellLength(cell_length));
        }
        Ok(Self {
            cell_length,
            boundary,
            domain,
            species: Vec::new(),
        })
    }

    #[inline]
    pub fn cell_of(&self, position: Vec3) -> CellKey {
        cell_key(position, self.cell_length)
    }

    // Only affects Wrapped queries; cells do not depend on the domain
    pub fn set_domain(&mut self, domain: Domain) {
        self.domain = domain;
    }

    pub fn species_count(&self) -> usize {
        self.species.len()
    }

    // Rebuild every species' cells from a position snapshot. O(n) over points;
    // cell allocations are reused between rebuilds.
    pub fn build<'a, I>(&mut self, positions_per_species: I)
    where
        I: IntoIterator<Item = &'a [Vec3]>,
    {
        let cell_length = self.cell_length;
        let mut count = 0;
        for (species, positions) in positions_per_species.into_iter().enumerate() {
            if species == self.species.len() {
                self.species.push(SpeciesCells::new());
            }
            let cells = &mut self.species[species];
            cells.clear();
            for (index, &position) in positions.iter().enumerate() {
                cells.insert(cell_key(position, cell_length), index);
            }
            count += 1;
        }
        self.species.truncate(count);
    }

    // Candidate indices of `species` that may lie within `radius` of `point`
    pub fn query_radius(&self, species: usize, point: Vec3, radius: f32) -> Vec<usize> {
        let mut result = Vec::new();
        self.query_radius_into(species, point, radius, &mut result);
        result
    }

    pub fn query_radius_into(&self, species: usize, point: Vec3, radius: f32, out: &mut Vec<usize>) {
        out.clear();
        let Some(cells) = self.species.get(species) else {
            return;
        };
        let rings = (radius / self.cell_length).ceil().max(0.0) as i32;

        match self.boundary {
            GridBoundary::Clipped => {
                cells.collect_cube(self.cell_of(point), rings, out);
            }
            GridBoundary::Wrapped => {
                let half = self.domain.half_extents();
                let lengths = self.domain.lengths;
                for i in -1..=1 {
                    for j in -1..=1 {
                        for k in -1..=1 {
                            let image = point + Vec3::new(i as f32, j as f32, k as f32) * lengths;
                            let reaches_box = (image + radius).cmpge(-half).all()
                                && (image - radius).cmplt(half).all();
                            if reaches_box {
                                cells.collect_cube(self.cell_of(image), rings, out);
                            }
                        }
                    }
                }
                out.sort_unstable();
                out.dedup();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(boundary: GridBoundary) -> SpatialGrid {
        SpatialGrid::new(1.0, Domain::cube(4.0).unwrap(), boundary).unwrap()
    }

    #[test]
    fn rejects_non_positive_cell_length() {
        let domain = Domain::cube(4.0).unwrap();
        assert_eq!(
            SpatialGrid::new(0.0, domain, GridBoundary::Clipped).unwrap_err(),
            ConfigError::CellLength(0.0)
        );
    }

    #[test]
    fn cells_use_floor_on_every_axis() {
        let grid = grid(GridBoundary::Clipped);
        assert_eq!(grid.cell_of(Vec3::new(0.5, -0.5, 1.5)), [0, -1, 1]);
        assert_eq!(grid.cell_of(Vec3::new(-2.0, 1.999, 0.0)), [-2, 1, 0]);
    }

    #[test]
    fn query_returns_points_in_neighboring_cells_only() {
        let mut grid = grid(GridBoundary::Clipped);
        let positions = vec![
            Vec3::new(0.1, 0.1, 0.1),
            Vec3::new(0.9, 0.9, 0.9),
            Vec3::new(1.5, 1.5, 1.5),  // diagonal neighbor cell
            Vec3::new(-1.9, -1.9, -1.9),
        ];
        grid.build([positions.as_slice()]);

        let mut found = grid.query_radius(0, Vec3::new(0.5, 0.5, 0.5), 0.5);
        found.sort_unstable();
        assert_eq!(found, vec![0, 1, 2]);
    }

    #[test]
    fn clipped_query_misses_neighbors_across_the_boundary() {
        let mut grid = grid(GridBoundary::Clipped);
        let positions = vec![Vec3::new(-1.95, 0.0, 0.0)];
        grid.build([positions.as_slice()]);

        // 0.1 apart through the x face, but in cells 3 apart
        assert!(grid.query_radius(0, Vec3::new(1.95, 0.0, 0.0), 0.5).is_empty());
    }

    #[test]
    fn wrapped_query_sees_neighbors_across_the_boundary() {
        let mut grid = grid(GridBoundary::Wrapped);
        let positions = vec![Vec3::new(-1.95, 0.0, 0.0), Vec3::new(-0.5, -1.5, -1.5)];
        grid.build([positions.as_slice()]);

        assert_eq!(grid.query_radius(0, Vec3::new(1.95, 0.0, 0.0), 0.5), vec![0]);
    }

    #[test]
    fn wrapped_query_has_no_duplicates_for_large_radius() {
        let mut grid = grid(GridBoundary::Wrapped);
        let positions: Vec<Vec3> = (0..8).map(|i| Vec3::splat(-1.5 + i as f32 * 0.4)).collect();
        grid.build([positions.as_slice()]);

        let found = grid.query_radius(0, Vec3::ZERO, 5.0);
        assert_eq!(found, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn rebuild_replaces_previous_contents() {
        let mut grid = grid(GridBoundary::Clipped);
        let first = vec![Vec3::new(0.5, 0.5, 0.5)];
        let second = vec![Vec3::new(-1.5, -1.5, -1.5)];
        grid.build([first.as_slice(), first.as_slice()]);
        assert_eq!(grid.species_count(), 2);

        grid.build([second.as_slice()]);
        assert_eq!(grid.species_count(), 1);
        assert!(grid.query_radius(0, Vec3::new(0.5, 0.5, 0.5), 0.1).is_empty());
        assert_eq!(grid.query_radius(0, Vec3::new(-1.5, -1.5, -1.5), 0.1), vec![0]);
    }

    #[test]
    fn unknown_species_yields_nothing() {
        let grid = grid(GridBoundary::Clipped);
        assert!(grid.query_radius(3, Vec3::ZERO, 1.0).is_empty());
    }
}
