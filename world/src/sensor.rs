//! Tile-backed implementation of the ground sensor.

use glam::Vec2;
use ledge_runner_core::{Aabb, CellCoord, GroundSensor, LayerMask, RayHit};

use crate::tiles::TileMap;

const TILE_LAYERS: LayerMask = LayerMask::GROUND
    .union(LayerMask::TRAP)
    .union(LayerMask::HAZARD);

/// Read-only sensor answering raycasts and overlap tests against the active
/// level's tiles and the player body.
#[derive(Clone, Copy, Debug)]
pub struct SensorView<'a> {
    tiles: Option<&'a TileMap>,
    player: Option<Aabb>,
}

impl<'a> SensorView<'a> {
    /// Creates a sensor over the provided tiles and player body.
    ///
    /// Either may be absent; queries against a missing collaborator miss.
    #[must_use]
    pub fn new(tiles: Option<&'a TileMap>, player: Option<Aabb>) -> Self {
        Self { tiles, player }
    }
}

impl GroundSensor for SensorView<'_> {
    fn raycast(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RayHit> {
        if !origin.is_finite() || !max_distance.is_finite() || max_distance < 0.0 {
            return None;
        }
        let direction = direction.normalize_or_zero();
        if direction == Vec2::ZERO {
            return None;
        }

        let tile_hit = self
            .tiles
            .filter(|_| mask.intersects(TILE_LAYERS))
            .and_then(|tiles| raycast_tiles(tiles, origin, direction, max_distance, mask));

        let player_hit = self
            .player
            .filter(|_| mask.intersects(LayerMask::PLAYER))
            .and_then(|body| body.ray_distance(origin, direction, max_distance))
            .map(|distance| RayHit {
                point: origin + direction * distance,
                distance,
                layer: LayerMask::PLAYER,
            });

        match (tile_hit, player_hit) {
            (Some(tile), Some(player)) if player.distance < tile.distance => Some(player),
            (Some(tile), _) => Some(tile),
            (None, player) => player,
        }
    }

    fn overlaps(&self, area: Aabb, mask: LayerMask) -> bool {
        let tile_overlap = self.tiles.is_some_and(|tiles| {
            tiles.cells_touching(area).cells().any(|cell| {
                tiles
                    .kind(cell)
                    .is_some_and(|kind| kind.layer().intersects(mask))
            })
        });
        if tile_overlap {
            return true;
        }

        mask.intersects(LayerMask::PLAYER) && self.player.is_some_and(|body| body.touches(&area))
    }
}

/// Grid traversal visiting cells in the order the ray enters them.
fn raycast_tiles(
    tiles: &TileMap,
    origin: Vec2,
    direction: Vec2,
    max_distance: f32,
    mask: LayerMask,
) -> Option<RayHit> {
    use ledge_runner_core::TileGrid;

    let size = tiles.cell_size();
    let local = (origin - tiles.origin()) / size;
    let mut column = local.x.floor() as i32;
    let mut row = local.y.floor() as i32;

    let layer_at = |column: i32, row: i32| {
        tiles
            .kind(CellCoord::new(column, row))
            .map(|kind| kind.layer())
            .filter(|layer| layer.intersects(mask))
    };

    if let Some(layer) = layer_at(column, row) {
        return Some(RayHit {
            point: origin,
            distance: 0.0,
            layer,
        });
    }

    let (step_x, mut next_x, delta_x) = axis_traversal(local.x, direction.x, size.x);
    let (step_y, mut next_y, delta_y) = axis_traversal(local.y, direction.y, size.y);

    loop {
        let distance = if next_x < next_y {
            column += step_x;
            let distance = next_x;
            next_x += delta_x;
            distance
        } else {
            row += step_y;
            let distance = next_y;
            next_y += delta_y;
            distance
        };

        if distance > max_distance {
            return None;
        }

        if let Some(layer) = layer_at(column, row) {
            return Some(RayHit {
                point: origin + direction * distance,
                distance,
                layer,
            });
        }
    }
}

/// Step sign, distance to the first cell boundary, and distance between
/// boundaries along one axis.
fn axis_traversal(local: f32, direction: f32, size: f32) -> (i32, f32, f32) {
    if direction > 0.0 {
        let to_boundary = (local.floor() + 1.0 - local) * size;
        (1, to_boundary / direction, size / direction)
    } else if direction < 0.0 {
        let to_boundary = (local - local.floor()) * size;
        (-1, to_boundary / -direction, size / -direction)
    } else {
        (0, f32::INFINITY, f32::INFINITY)
    }
}
