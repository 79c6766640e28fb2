//! Straight-line projectiles fired by the player.

use std::time::Duration;

use glam::Vec2;
use ledge_runner_core::Aabb;

#[derive(Clone, Copy, Debug)]
pub(crate) struct Projectile {
    pub(crate) position: Vec2,
    pub(crate) velocity: Vec2,
    pub(crate) remaining: Duration,
}

impl Projectile {
    pub(crate) fn advance(&mut self, dt: f32) {
        self.position += self.velocity * dt;
    }

    pub(crate) fn aabb(&self, radius: f32) -> Aabb {
        Aabb::new(self.position, Vec2::splat(radius))
    }
}
