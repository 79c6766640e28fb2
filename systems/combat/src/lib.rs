#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that routes player contacts into damage and turns fire
//! requests into projectiles.

use glam::Vec2;
use ledge_runner_core::{Command, Event, PlayerSnapshot};
use tracing::debug;

/// Sound effects requested by combat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cue {
    /// A projectile was fired.
    Bullet,
    /// An agent hit the player.
    Enemy,
    /// The player bounced off a trap.
    BounceTrap,
}

impl Cue {
    /// Stable name of the cue.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bullet => "Bullet",
            Self::Enemy => "Enemy",
            Self::BounceTrap => "BounceTrap",
        }
    }
}

/// Combat routing system.
#[derive(Debug, Default)]
pub struct Combat {
    scratch: Vec<Command>,
}

impl Combat {
    /// Creates a combat system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts contact events into damage commands and an optional aim
    /// direction into a projectile launch.
    ///
    /// An agent touching the player deals its damage and dies. A trap deals its
    /// damage; the bounce itself already happened during the physics step.
    pub fn handle(
        &mut self,
        events: &[Event],
        player: &PlayerSnapshot,
        aim: Option<Vec2>,
        out: &mut Vec<Command>,
        cues: &mut Vec<Cue>,
    ) {
        self.scratch.clear();

        for event in events {
            match *event {
                Event::PlayerContact { agent, damage } => {
                    debug!(?agent, damage, "agent attacked player");
                    self.scratch.push(Command::DamagePlayer { amount: damage });
                    self.scratch.push(Command::KillAgent { agent });
                    cues.push(Cue::Enemy);
                }
                Event::PlayerTrapped { damage } => {
                    if damage > 0 {
                        self.scratch.push(Command::DamagePlayer { amount: damage });
                    }
                    cues.push(Cue::BounceTrap);
                }
                _ => {}
            }
        }

        if let Some(direction) = aim.filter(|_| !player.dead) {
            let direction = direction.normalize_or_zero();
            if direction != Vec2::ZERO {
                self.scratch.push(Command::FireProjectile { direction });
                cues.push(Cue::Bullet);
            }
        }

        out.append(&mut self.scratch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledge_runner_core::{AgentId, Facing, Health};

    fn player(dead: bool) -> PlayerSnapshot {
        PlayerSnapshot {
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            half_extents: Vec2::new(0.4, 0.5),
            facing: Facing::Right,
            health: Health::full(3),
            flashing: false,
            dead,
        }
    }

    #[test]
    fn contact_damages_player_and_kills_agent() {
        let mut combat = Combat::new();
        let agent = AgentId::new(3, 1);
        let mut out = Vec::new();
        let mut cues = Vec::new();

        combat.handle(
            &[Event::PlayerContact { agent, damage: 2 }],
            &player(false),
            None,
            &mut out,
            &mut cues,
        );

        assert_eq!(
            out,
            vec![
                Command::DamagePlayer { amount: 2 },
                Command::KillAgent { agent },
            ]
        );
        assert_eq!(cues, vec![Cue::Enemy]);
    }

    #[test]
    fn harmless_trap_only_bounces() {
        let mut combat = Combat::new();
        let mut out = Vec::new();
        let mut cues = Vec::new();

        combat.handle(
            &[Event::PlayerTrapped { damage: 0 }],
            &player(false),
            None,
            &mut out,
            &mut cues,
        );

        assert!(out.is_empty());
        assert_eq!(cues, vec![Cue::BounceTrap]);
    }

    #[test]
    fn aim_is_normalised_and_ignored_when_dead_or_zero() {
        let mut combat = Combat::new();
        let mut out = Vec::new();
        let mut cues = Vec::new();

        combat.handle(&[], &player(false), Some(Vec2::new(0.0, 4.0)), &mut out, &mut cues);
        assert_eq!(out, vec![Command::FireProjectile { direction: Vec2::Y }]);
        assert_eq!(cues, vec![Cue::Bullet]);

        out.clear();
        cues.clear();
        combat.handle(&[], &player(true), Some(Vec2::X), &mut out, &mut cues);
        combat.handle(&[], &player(false), Some(Vec2::ZERO), &mut out, &mut cues);
        assert!(out.is_empty());
        assert!(cues.is_empty());
    }

    #[test]
    fn cue_names_are_stable() {
        assert_eq!(Cue::Bullet.name(), "Bullet");
        assert_eq!(Cue::Enemy.name(), "Enemy");
        assert_eq!(Cue::BounceTrap.name(), "BounceTrap");
    }
}
