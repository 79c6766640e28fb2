//! Spawn locations derived from the active tile grid.

use glam::Vec2;
use ledge_runner_core::TileGrid;
use tracing::{debug, warn};

/// World position on top of an exposed ground cell where an agent may appear.
///
/// The position marks the agent's feet.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnPoint {
    position: Vec2,
}

impl SpawnPoint {
    /// World-space position of the point.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }
}

/// Set of spawn points computed for the current level.
///
/// The set is replaced wholesale on every rebuild.
#[derive(Clone, Debug, Default)]
pub struct SpawnPointCatalog {
    clearance: f32,
    points: Vec<SpawnPoint>,
}

impl SpawnPointCatalog {
    /// Creates an empty catalog placing points `clearance` above each surface.
    #[must_use]
    pub const fn new(clearance: f32) -> Self {
        Self {
            clearance,
            points: Vec::new(),
        }
    }

    /// Recomputes the points from `grid`. An absent grid leaves the catalog empty.
    pub fn rebuild<G>(&mut self, grid: Option<&G>)
    where
        G: TileGrid + ?Sized,
    {
        self.points.clear();

        let Some(grid) = grid else {
            warn!("tile grid not available; spawn point catalog is empty");
            return;
        };

        let half_height = grid.cell_size().y * 0.5;
        for cell in grid.cell_bounds().cells() {
            if !grid.has_ground(cell) || grid.has_ground(cell.above()) {
                continue;
            }
            let center = grid.cell_center_world(cell);
            self.points.push(SpawnPoint {
                position: Vec2::new(center.x, center.y + half_height + self.clearance),
            });
        }
        debug!(points = self.points.len(), "rebuilt spawn point catalog");
    }

    /// Points computed by the latest rebuild.
    #[must_use]
    pub fn points(&self) -> &[SpawnPoint] {
        &self.points
    }

    /// Number of points in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the catalog holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledge_runner_core::{CellBounds, CellCoord};

    struct Columns {
        heights: Vec<i32>,
    }

    impl TileGrid for Columns {
        fn has_ground(&self, cell: CellCoord) -> bool {
            usize::try_from(cell.column())
                .ok()
                .and_then(|column| self.heights.get(column))
                .is_some_and(|height| cell.row() >= 0 && cell.row() < *height)
        }

        fn cell_bounds(&self) -> CellBounds {
            CellBounds::new(
                CellCoord::new(0, 0),
                CellCoord::new(self.heights.len() as i32, 4),
            )
        }

        fn cell_center_world(&self, cell: CellCoord) -> Vec2 {
            Vec2::new(cell.column() as f32 + 0.5, cell.row() as f32 + 0.5)
        }

        fn cell_size(&self) -> Vec2 {
            Vec2::ONE
        }
    }

    #[test]
    fn one_point_per_exposed_ground_cell() {
        let grid = Columns {
            heights: vec![1, 3, 0, 2],
        };
        let mut catalog = SpawnPointCatalog::new(0.05);
        catalog.rebuild(Some(&grid));

        let mut positions: Vec<_> = catalog
            .points()
            .iter()
            .map(|point| point.position())
            .collect();
        positions.sort_by(|a, b| a.x.total_cmp(&b.x));
        let expected = [
            Vec2::new(0.5, 1.05),
            Vec2::new(1.5, 3.05),
            Vec2::new(3.5, 2.05),
        ];
        assert_eq!(positions.len(), expected.len());
        for (position, expected) in positions.iter().zip(expected) {
            assert!(position.distance(expected) < 1e-5, "{position} != {expected}");
        }
    }

    #[test]
    fn missing_grid_clears_previous_points() {
        let grid = Columns { heights: vec![1] };
        let mut catalog = SpawnPointCatalog::new(0.05);
        catalog.rebuild(Some(&grid));
        assert_eq!(catalog.len(), 1);

        catalog.rebuild::<Columns>(None);
        assert!(catalog.is_empty());
    }
}
