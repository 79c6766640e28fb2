//! Player body and health owned by the world.

use std::time::Duration;

use glam::Vec2;
use ledge_runner_core::{Facing, Health, PlayerSnapshot};

use crate::physics::Body;

#[derive(Clone, Debug)]
pub(crate) struct Player {
    pub(crate) body: Body,
    pub(crate) facing: Facing,
    pub(crate) health: Health,
    pub(crate) dead: bool,
    pub(crate) flash: Duration,
    pub(crate) touching_trap: bool,
}

impl Player {
    pub(crate) fn new(half_extents: Vec2, max_health: i32) -> Self {
        Self {
            body: Body::new(Vec2::ZERO, half_extents, 1.0),
            facing: Facing::Right,
            health: Health::full(max_health),
            dead: false,
            flash: Duration::ZERO,
            touching_trap: false,
        }
    }

    /// Places the player at rest on a new start position.
    pub(crate) fn respawn_at(&mut self, position: Vec2) {
        self.body.position = position;
        self.body.velocity = Vec2::ZERO;
        self.touching_trap = false;
    }

    /// Applies damage and reports whether this hit depleted the player's health.
    pub(crate) fn damage(&mut self, amount: i32, flash: Duration) -> Option<bool> {
        if self.dead {
            return None;
        }
        let _ = self.health.take(amount);
        self.flash = flash;
        self.dead = self.health.is_depleted();
        Some(self.dead)
    }

    pub(crate) fn reset(&mut self) {
        self.health.restore();
        self.dead = false;
        self.flash = Duration::ZERO;
    }

    pub(crate) fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            position: self.body.position,
            velocity: self.body.velocity,
            half_extents: self.body.half_extents,
            facing: self.facing,
            health: self.health,
            flashing: !self.flash.is_zero(),
            dead: self.dead,
        }
    }
}
