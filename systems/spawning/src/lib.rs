#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Population system that keeps a bounded set of agents alive near the
//! target, culling distant agents and refilling the population over time.

mod catalog;

use std::time::Duration;

use glam::Vec2;
use ledge_runner_core::{AgentId, AgentView, Command, Event, TileGrid};
use ledge_runner_system_level::Subscription;
use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub use catalog::{SpawnPoint, SpawnPointCatalog};

/// Configuration parameters required to construct the population manager.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum number of agents alive at once.
    pub capacity: usize,
    /// Delay between consecutive spawns while filling, in seconds.
    pub spawn_interval_seconds: f32,
    /// Largest horizontal distance from the target preferred for spawning.
    pub near_radius: f32,
    /// Smallest horizontal distance from the target preferred for spawning.
    pub min_distance: f32,
    /// Agents farther than this from the target are despawned.
    pub despawn_radius: f32,
    /// Height of spawn points above the ground surface.
    pub clearance: f32,
    /// Seed of the placement random number generator.
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 5,
            spawn_interval_seconds: 0.5,
            near_radius: 8.0,
            min_distance: 2.0,
            despawn_radius: 25.0,
            clearance: 0.05,
            seed: 0x4c65_6467_6552_756e,
        }
    }
}

impl Config {
    /// Checks the configuration for values the manager cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let seconds = self.spawn_interval_seconds;
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(ConfigError::InvalidInterval { seconds });
        }
        if self.min_distance > self.near_radius {
            return Err(ConfigError::InvertedBand {
                min_distance: self.min_distance,
                near_radius: self.near_radius,
            });
        }
        if self.despawn_radius.is_nan() || self.despawn_radius <= self.near_radius {
            return Err(ConfigError::DespawnWithinNear {
                despawn_radius: self.despawn_radius,
                near_radius: self.near_radius,
            });
        }
        Ok(())
    }
}

/// Reasons a spawning configuration may be rejected.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum ConfigError {
    /// The spawn interval is negative or not a number.
    #[error("spawn interval must be a finite, non-negative number of seconds (got {seconds})")]
    InvalidInterval {
        /// Offending interval.
        seconds: f32,
    },
    /// The preferred band is empty.
    #[error("minimum spawn distance {min_distance} exceeds near radius {near_radius}")]
    InvertedBand {
        /// Configured minimum distance.
        min_distance: f32,
        /// Configured near radius.
        near_radius: f32,
    },
    /// Agents could be despawned inside the band they are spawned in.
    #[error("despawn radius {despawn_radius} must exceed near radius {near_radius}")]
    DespawnWithinNear {
        /// Configured despawn radius.
        despawn_radius: f32,
        /// Configured near radius.
        near_radius: f32,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FillState {
    Idle,
    Starting,
    Filling { wait: Duration },
}

/// Pure system that maintains the live agent population.
#[derive(Debug)]
pub struct PopulationManager {
    capacity: usize,
    interval: Duration,
    near_radius: f32,
    min_distance: f32,
    despawn_radius: f32,
    catalog: SpawnPointCatalog,
    rng: ChaCha8Rng,
    live: Vec<AgentId>,
    in_flight: usize,
    fill: FillState,
    subscription: Option<Subscription>,
}

impl PopulationManager {
    /// Creates a manager using the supplied configuration.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let seconds = config.spawn_interval_seconds;
        let interval = Duration::try_from_secs_f32(seconds)
            .map_err(|_| ConfigError::InvalidInterval { seconds })?;
        Ok(Self {
            capacity: config.capacity,
            interval,
            near_radius: config.near_radius,
            min_distance: config.min_distance,
            despawn_radius: config.despawn_radius,
            catalog: SpawnPointCatalog::new(config.clearance),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            live: Vec::new(),
            in_flight: 0,
            fill: FillState::Idle,
            subscription: None,
        })
    }

    /// Listens for level signals on `subscription`, replacing any previous one.
    pub fn attach(&mut self, subscription: Subscription) {
        self.subscription = Some(subscription);
    }

    /// Drops the current subscription, deregistering it from its bus.
    pub fn detach(&mut self) {
        self.subscription = None;
    }

    /// Handles of the agents currently counted as live.
    #[must_use]
    pub fn live_agents(&self) -> &[AgentId] {
        &self.live
    }

    /// Number of agents currently counted as live.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Spawn commands emitted whose outcome has not been observed yet.
    #[must_use]
    pub const fn pending_spawns(&self) -> usize {
        self.in_flight
    }

    /// Whether a fill loop is running.
    #[must_use]
    pub fn is_filling(&self) -> bool {
        !matches!(self.fill, FillState::Idle)
    }

    /// Spawn points of the current level.
    #[must_use]
    pub fn catalog(&self) -> &SpawnPointCatalog {
        &self.catalog
    }

    /// Consumes world events and immutable views to emit spawn and despawn
    /// commands.
    ///
    /// Level signals are processed first. On frames that advance time, far
    /// agents are despawned before the fill loop runs.
    pub fn handle<G>(
        &mut self,
        events: &[Event],
        agents: &AgentView,
        target: Option<Vec2>,
        grid: Option<&G>,
        out: &mut Vec<Command>,
    ) where
        G: TileGrid + ?Sized,
    {
        self.record(events);

        let signals = self
            .subscription
            .as_ref()
            .map(Subscription::drain)
            .unwrap_or_default();
        if !signals.is_empty() {
            debug!(?signals, "population received level signals");
            self.on_level_event(grid, agents, out);
        }

        self.live.retain(|agent| agents.is_alive(*agent));

        let mut advanced = false;
        let mut elapsed = Duration::ZERO;
        for event in events {
            if let Event::TimeAdvanced { dt } = event {
                advanced = true;
                elapsed = elapsed.saturating_add(*dt);
            }
        }
        if !advanced {
            return;
        }

        self.despawn_far(agents, target, out);
        self.advance_fill(elapsed, target, out);
    }

    /// Destroys every live agent, rebuilds the catalog from `grid`, and
    /// restarts the fill loop from scratch. Safe to call repeatedly.
    ///
    /// Agents present in `agents` are flushed too, including spawns whose
    /// confirmation has not been recorded yet.
    pub fn on_level_event<G>(
        &mut self,
        grid: Option<&G>,
        agents: &AgentView,
        out: &mut Vec<Command>,
    ) where
        G: TileGrid + ?Sized,
    {
        let mut doomed: Vec<AgentId> = self.live.drain(..).collect();
        for snapshot in agents.iter() {
            if !doomed.contains(&snapshot.id) {
                doomed.push(snapshot.id);
            }
        }
        let flushed = doomed.len();
        for agent in doomed {
            out.push(Command::DespawnAgent { agent });
        }
        self.in_flight = 0;
        self.catalog.rebuild(grid);
        self.fill = FillState::Starting;
        info!(
            flushed,
            spawn_points = self.catalog.len(),
            "population reset for level"
        );
    }

    /// Despawns every live agent farther than the despawn radius from `target`.
    pub fn despawn_far(&mut self, agents: &AgentView, target: Option<Vec2>, out: &mut Vec<Command>) {
        let Some(target) = target else {
            return;
        };

        let radius = self.despawn_radius;
        let before = self.live.len();
        self.live.retain(|agent| {
            let far = agents
                .get(*agent)
                .is_some_and(|snapshot| snapshot.position.distance(target) > radius);
            if far {
                out.push(Command::DespawnAgent { agent: *agent });
            }
            !far
        });

        let culled = before - self.live.len();
        if culled > 0 {
            debug!(culled, "despawned distant agents");
        }
    }

    /// Chooses where the next agent appears.
    ///
    /// Points whose horizontal distance to the target lies within the
    /// preferred band are chosen uniformly; otherwise any point is.
    pub fn select_spawn_point(&mut self, target: Option<Vec2>) -> Option<Vec2> {
        let points = self.catalog.points();
        if let Some(target) = target {
            let near: Vec<&SpawnPoint> = points
                .iter()
                .filter(|point| {
                    let dx = (point.position().x - target.x).abs();
                    dx >= self.min_distance && dx <= self.near_radius
                })
                .collect();
            if let Some(point) = near.choose(&mut self.rng) {
                return Some(point.position());
            }
        }
        points.choose(&mut self.rng).map(SpawnPoint::position)
    }

    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::AgentSpawned { agent, .. } => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    if !self.live.contains(agent) {
                        self.live.push(*agent);
                    }
                }
                Event::AgentSpawnRejected { .. } => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                }
                Event::AgentRemoved { agent } => {
                    self.live.retain(|live| live != agent);
                }
                _ => {}
            }
        }
    }

    fn population(&self) -> usize {
        self.live.len() + self.in_flight
    }

    fn advance_fill(&mut self, elapsed: Duration, target: Option<Vec2>, out: &mut Vec<Command>) {
        // A loop that starts now spawns now; only a running wait consumes elapsed time.
        let (mut wait, mut budget) = match self.fill {
            FillState::Filling { wait } => (wait, elapsed),
            FillState::Starting => (Duration::ZERO, Duration::ZERO),
            FillState::Idle if self.population() < self.capacity => {
                (Duration::ZERO, Duration::ZERO)
            }
            FillState::Idle => return,
        };

        loop {
            if wait > budget {
                self.fill = FillState::Filling {
                    wait: wait - budget,
                };
                return;
            }
            budget -= wait;

            if self.population() >= self.capacity {
                self.fill = FillState::Idle;
                return;
            }

            let spawned = self.spawn(target, out);
            wait = self.interval;
            if wait.is_zero() && !spawned {
                self.fill = FillState::Filling { wait };
                return;
            }
        }
    }

    fn spawn(&mut self, target: Option<Vec2>, out: &mut Vec<Command>) -> bool {
        let Some(position) = self.select_spawn_point(target) else {
            debug!("no spawn points available");
            return false;
        };
        out.push(Command::SpawnAgent { position });
        self.in_flight += 1;
        true
    }
}
