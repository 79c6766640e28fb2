//! Fixed-step integration of bodies against solid ground tiles.

use glam::Vec2;
use ledge_runner_core::{Aabb, TileGrid};

use crate::tiles::TileMap;

/// Downward acceleration applied to a body with a gravity scale of one.
pub(crate) const GRAVITY: f32 = 9.81;

/// Rigid body with unit mass moved by velocity and gravity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Body {
    pub(crate) position: Vec2,
    pub(crate) velocity: Vec2,
    pub(crate) half_extents: Vec2,
    pub(crate) gravity_scale: f32,
}

impl Body {
    pub(crate) fn new(position: Vec2, half_extents: Vec2, gravity_scale: f32) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            half_extents,
            gravity_scale,
        }
    }

    pub(crate) fn aabb(&self) -> Aabb {
        Aabb::new(self.position, self.half_extents)
    }

    /// Adds an instantaneous change in velocity.
    pub(crate) fn apply_impulse(&mut self, impulse: Vec2) {
        self.velocity += impulse;
    }

    /// Integrates one step, resolving the x axis before the y axis.
    pub(crate) fn integrate(&mut self, tiles: &TileMap, dt: f32) {
        self.velocity.y -= GRAVITY * self.gravity_scale * dt;

        self.position.x += self.velocity.x * dt;
        if let Some(x) = resolve_axis(tiles, self.aabb(), self.velocity.x, Axis::X) {
            self.position.x = x;
            self.velocity.x = 0.0;
        }

        self.position.y += self.velocity.y * dt;
        if let Some(y) = resolve_axis(tiles, self.aabb(), self.velocity.y, Axis::Y) {
            self.position.y = y;
            self.velocity.y = 0.0;
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Axis {
    X,
    Y,
}

/// Returns the corrected centre coordinate when the body penetrates ground
/// while moving along the axis.
fn resolve_axis(tiles: &TileMap, body: Aabb, velocity: f32, axis: Axis) -> Option<f32> {
    if velocity == 0.0 {
        return None;
    }

    let index = match axis {
        Axis::X => 0,
        Axis::Y => 1,
    };

    let mut correction: Option<f32> = None;
    for cell in tiles.cells_overlapping(body).cells() {
        if !tiles.has_ground(cell) {
            continue;
        }
        let solid = tiles.cell_aabb(cell);
        let candidate = if velocity > 0.0 {
            solid.min()[index] - body.half_extents[index]
        } else {
            solid.max()[index] + body.half_extents[index]
        };
        correction = Some(match correction {
            Some(current) if velocity > 0.0 => current.min(candidate),
            Some(current) => current.max(candidate),
            None => candidate,
        });
    }
    correction
}
