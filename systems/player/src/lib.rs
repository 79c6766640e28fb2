#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Player locomotion: running, double jumping, wall sliding and wall jumping.

use std::time::Duration;

use glam::Vec2;
use ledge_runner_core::{
    Aabb, Ability, Command, Event, Facing, GroundSensor, LayerMask, PlayerSnapshot,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Tunable locomotion parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Horizontal speed at full input.
    pub move_speed: f32,
    /// Upward velocity set by a jump.
    pub jump_power: f32,
    /// Jumps available between ground contacts.
    pub max_jumps: u32,
    /// Fastest downward speed while sliding on a wall.
    pub wall_slide_speed: f32,
    /// Seconds a wall jump stays available after leaving a wall slide.
    pub wall_jump_window_seconds: f32,
    /// Seconds horizontal input is ignored after a wall jump.
    pub wall_jump_lock_seconds: f32,
    /// Velocity of a wall jump, horizontal part pointing away from the wall.
    pub wall_jump_power: Vec2,
    /// Gravity multiplier while rising or at rest.
    pub base_gravity: f32,
    /// Terminal falling speed.
    pub max_fall_speed: f32,
    /// Extra gravity multiplier while falling.
    pub fall_multiplier: f32,
    /// Half extents of the overlap box below the feet.
    pub ground_probe: Vec2,
    /// Half extents of the overlap box at the facing side.
    pub wall_probe: Vec2,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            move_speed: 5.0,
            jump_power: 10.0,
            max_jumps: 2,
            wall_slide_speed: 2.0,
            wall_jump_window_seconds: 0.5,
            wall_jump_lock_seconds: 0.6,
            wall_jump_power: Vec2::new(5.0, 10.0),
            base_gravity: 2.0,
            max_fall_speed: 18.0,
            fall_multiplier: 2.0,
            ground_probe: Vec2::new(0.25, 0.025),
            wall_probe: Vec2::new(0.05, 0.25),
        }
    }
}

impl Tuning {
    /// Applies the persisted ability's adjustments.
    #[must_use]
    pub fn with_ability(mut self, ability: Ability) -> Self {
        match ability {
            Ability::SlowFalling => {
                self.base_gravity *= 0.7;
                self.fall_multiplier *= 0.6;
                self.max_fall_speed *= 0.6;
            }
            Ability::SuperJump => self.jump_power *= 1.4,
            Ability::None | Ability::EnhancedHealth => {}
        }
        self
    }
}

/// Player intent sampled for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlayerInput {
    /// Horizontal axis in `[-1, 1]`.
    pub horizontal: f32,
    /// The jump button went down this frame.
    pub jump_pressed: bool,
    /// The jump button went up this frame.
    pub jump_released: bool,
}

/// Stateful controller translating input into player drive commands.
#[derive(Debug)]
pub struct PlayerMotor {
    tuning: Tuning,
    jumps_remaining: u32,
    grounded: bool,
    wall_sliding: bool,
    wall_jump_direction: f32,
    wall_jump_window: Duration,
    wall_jump_lock: Duration,
    facing: Facing,
}

impl PlayerMotor {
    /// Creates a motor using the provided tuning.
    #[must_use]
    pub fn new(tuning: Tuning) -> Self {
        Self {
            tuning,
            jumps_remaining: 0,
            grounded: false,
            wall_sliding: false,
            wall_jump_direction: 0.0,
            wall_jump_window: Duration::ZERO,
            wall_jump_lock: Duration::ZERO,
            facing: Facing::Right,
        }
    }

    /// Whether the last frame found ground under the feet.
    #[must_use]
    pub const fn is_grounded(&self) -> bool {
        self.grounded
    }

    /// Whether the last frame was sliding down a wall.
    #[must_use]
    pub const fn is_wall_sliding(&self) -> bool {
        self.wall_sliding
    }

    /// Jumps left before the next ground contact.
    #[must_use]
    pub const fn jumps_remaining(&self) -> u32 {
        self.jumps_remaining
    }

    /// Consumes world events, the player view and this frame's input to emit a
    /// drive command. Frames that do not advance time leave the player alone.
    pub fn handle<S>(
        &mut self,
        events: &[Event],
        player: &PlayerSnapshot,
        input: PlayerInput,
        sensor: &S,
        out: &mut Vec<Command>,
    ) where
        S: GroundSensor + ?Sized,
    {
        let mut elapsed = None;
        for event in events {
            match event {
                Event::LevelActivated { .. } => self.reset(),
                Event::TimeAdvanced { dt } => {
                    elapsed = Some(elapsed.unwrap_or(Duration::ZERO).saturating_add(*dt));
                }
                _ => {}
            }
        }
        let Some(dt) = elapsed else {
            return;
        };
        if player.dead {
            return;
        }

        self.facing = player.facing;
        let horizontal = input.horizontal.clamp(-1.0, 1.0);
        let mut velocity = player.velocity;

        self.grounded = sensor.overlaps(self.ground_probe(player), LayerMask::GROUND);
        if self.grounded {
            self.jumps_remaining = self.tuning.max_jumps;
        }

        let gravity_scale = if velocity.y < 0.0 {
            velocity.y = velocity.y.max(-self.tuning.max_fall_speed);
            self.tuning.base_gravity * self.tuning.fall_multiplier
        } else {
            self.tuning.base_gravity
        };

        let against_wall = sensor.overlaps(self.wall_probe(player), LayerMask::GROUND);
        self.wall_sliding = !self.grounded && against_wall && horizontal != 0.0;
        if self.wall_sliding {
            velocity.y = velocity.y.max(-self.tuning.wall_slide_speed);
            self.wall_jump_lock = Duration::ZERO;
            self.wall_jump_direction = -self.facing.sign();
            self.wall_jump_window = seconds(self.tuning.wall_jump_window_seconds);
        } else {
            self.wall_jump_window = self.wall_jump_window.saturating_sub(dt);
        }
        self.wall_jump_lock = self.wall_jump_lock.saturating_sub(dt);

        if self.wall_jump_lock.is_zero() {
            velocity.x = horizontal * self.tuning.move_speed;
            if (self.facing == Facing::Right && horizontal < 0.0)
                || (self.facing == Facing::Left && horizontal > 0.0)
            {
                self.facing = self.facing.flipped();
            }
        }

        if input.jump_pressed {
            if self.jumps_remaining > 0 {
                velocity.y = self.tuning.jump_power;
                self.jumps_remaining -= 1;
            }
            if !self.wall_jump_window.is_zero() {
                self.wall_jump(&mut velocity);
            }
        } else if input.jump_released && velocity.y > 0.0 {
            velocity.y *= 0.5;
        }

        out.push(Command::DrivePlayer {
            velocity,
            gravity_scale,
            facing: self.facing,
        });
    }

    fn wall_jump(&mut self, velocity: &mut Vec2) {
        *velocity = Vec2::new(
            self.wall_jump_direction * self.tuning.wall_jump_power.x,
            self.tuning.wall_jump_power.y,
        );
        self.wall_jump_window = Duration::ZERO;
        self.wall_jump_lock = seconds(self.tuning.wall_jump_lock_seconds);
        self.facing = if self.wall_jump_direction < 0.0 {
            Facing::Left
        } else {
            Facing::Right
        };
        debug!(direction = self.wall_jump_direction, "wall jump");
    }

    fn ground_probe(&self, player: &PlayerSnapshot) -> Aabb {
        Aabb::new(
            player.position - Vec2::new(0.0, player.half_extents.y),
            self.tuning.ground_probe,
        )
    }

    fn wall_probe(&self, player: &PlayerSnapshot) -> Aabb {
        Aabb::new(
            player.position + Vec2::new(self.facing.sign() * player.half_extents.x, 0.0),
            self.tuning.wall_probe,
        )
    }

    fn reset(&mut self) {
        self.jumps_remaining = 0;
        self.grounded = false;
        self.wall_sliding = false;
        self.wall_jump_window = Duration::ZERO;
        self.wall_jump_lock = Duration::ZERO;
    }
}

fn seconds(value: f32) -> Duration {
    Duration::try_from_secs_f32(value).unwrap_or(Duration::ZERO)
}
