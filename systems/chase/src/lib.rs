#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Ground-following chase behaviour that steers agents toward the target and
//! decides when they should jump.

use glam::Vec2;
use ledge_runner_core::{AgentSnapshot, AgentView, Command, Event, GroundSensor, LayerMask};
use serde::{Deserialize, Serialize};

/// Tunable probe lengths and speeds of the chase behaviour.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Horizontal speed while grounded.
    pub chase_speed: f32,
    /// Length of the horizontal probe looking for ground ahead.
    pub forward_probe: f32,
    /// Length of the downward probe looking for ground below-ahead.
    pub gap_probe: f32,
    /// Horizontal offset of the below-ahead probe origin.
    pub gap_offset: f32,
    /// Length of the upward probes for the target and for platforms.
    pub above_probe: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chase_speed: 2.0,
            forward_probe: 2.0,
            gap_probe: 2.0,
            gap_offset: 1.0,
            above_probe: 5.0,
        }
    }
}

/// Probe results gathered for one agent during the current frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Probes {
    /// Ground within the forward probe.
    pub ground_ahead: bool,
    /// Ground within the probe cast down from ahead of the agent.
    pub ground_below_ahead: bool,
    /// Target within the upward probe.
    pub target_above: bool,
    /// Ground within the upward probe.
    pub platform_above: bool,
}

impl Probes {
    /// Whether these probes call for a jump.
    ///
    /// A jump is wanted when the way ahead is open with nothing to land on, or
    /// when the target sits above and a platform exists to reach it. Without a
    /// horizontal direction the forward probes are not cast.
    #[must_use]
    pub fn wants_jump(&self, heading: f32) -> bool {
        let pit_ahead = heading != 0.0 && !self.ground_ahead && !self.ground_below_ahead;
        pit_ahead || (self.target_above && self.platform_above)
    }
}

/// Pure system that reacts to world events and emits steering and jump
/// commands for every live agent.
#[derive(Debug, Default)]
pub struct Chase {
    config: Config,
}

impl Chase {
    /// Creates a chase system using the provided configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Consumes world events and immutable views to emit chase commands.
    ///
    /// Decisions are only taken on frames that advanced time. Every probe is
    /// cast afresh for the current frame.
    pub fn handle<S>(
        &mut self,
        events: &[Event],
        agents: &AgentView,
        target: Option<Vec2>,
        sensor: &S,
        out: &mut Vec<Command>,
    ) where
        S: GroundSensor + ?Sized,
    {
        if !events
            .iter()
            .any(|event| matches!(event, Event::TimeAdvanced { .. }))
        {
            return;
        }

        for agent in agents.iter().filter(|agent| agent.alive) {
            self.decide(agent, target, sensor, out);
        }
    }

    fn decide<S>(
        &self,
        agent: &AgentSnapshot,
        target: Option<Vec2>,
        sensor: &S,
        out: &mut Vec<Command>,
    ) where
        S: GroundSensor + ?Sized,
    {
        if !agent.grounded {
            return;
        }

        let Some(target) = target else {
            out.push(Command::SteerAgent {
                agent: agent.id,
                velocity_x: 0.0,
            });
            return;
        };

        let heading = heading(agent.position.x, target.x);
        out.push(Command::SteerAgent {
            agent: agent.id,
            velocity_x: heading * self.config.chase_speed,
        });

        let probes = self.probe(agent.position, heading, sensor);
        if probes.wants_jump(heading) {
            out.push(Command::RequestJump {
                agent: agent.id,
                toward: target,
            });
        }
    }

    /// Casts the four decision probes from `position`.
    pub fn probe<S>(&self, position: Vec2, heading: f32, sensor: &S) -> Probes
    where
        S: GroundSensor + ?Sized,
    {
        let hits = |origin: Vec2, direction: Vec2, length: f32, mask: LayerMask| {
            sensor.raycast(origin, direction, length, mask).is_some()
        };

        let (ground_ahead, ground_below_ahead) = if heading == 0.0 {
            (false, false)
        } else {
            (
                hits(
                    position,
                    Vec2::new(heading, 0.0),
                    self.config.forward_probe,
                    LayerMask::GROUND,
                ),
                hits(
                    position + Vec2::new(heading * self.config.gap_offset, 0.0),
                    Vec2::NEG_Y,
                    self.config.gap_probe,
                    LayerMask::GROUND,
                ),
            )
        };

        Probes {
            ground_ahead,
            ground_below_ahead,
            target_above: hits(
                position,
                Vec2::Y,
                self.config.above_probe,
                LayerMask::PLAYER,
            ),
            platform_above: hits(
                position,
                Vec2::Y,
                self.config.above_probe,
                LayerMask::GROUND,
            ),
        }
    }
}

/// Sign of the horizontal offset toward the target, zero when aligned.
#[must_use]
pub fn heading(from_x: f32, to_x: f32) -> f32 {
    let offset = to_x - from_x;
    if offset > 0.0 {
        1.0
    } else if offset < 0.0 {
        -1.0
    } else {
        0.0
    }
}
