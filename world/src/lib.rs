#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Ledge Runner.

mod agents;
mod physics;
mod player;
mod projectiles;
mod sensor;
mod tiles;

use std::time::Duration;

use glam::Vec2;
use ledge_runner_core::{
    Aabb, Ability, AgentId, Command, DeathCause, Event, GroundSensor, LayerMask, LevelIndex,
    TileGrid, TileKind, WELCOME_BANNER,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use agents::{Agent, AgentArena, AgentState, DamageOutcome};
use physics::Body;
use player::Player;
use projectiles::Projectile;

pub use sensor::SensorView;
pub use tiles::{LayoutError, LevelLayout, TileMap};

const LETHAL_DAMAGE: i32 = 9_999;
const ENHANCED_HEALTH_BONUS: i32 = 4;

/// Tunable parameters of the world simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Side length of a tile cell in world units.
    pub cell_length: f32,
    /// Bodies below this height die.
    pub death_y: f32,
    /// Agent body and combat parameters.
    pub agent: AgentTuning,
    /// Player body and health parameters.
    pub player: PlayerTuning,
    /// Projectile parameters.
    pub projectile: ProjectileTuning,
    /// Trap parameters.
    pub trap: TrapTuning,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            cell_length: 1.0,
            death_y: -10.0,
            agent: AgentTuning::default(),
            player: PlayerTuning::default(),
            projectile: ProjectileTuning::default(),
            trap: TrapTuning::default(),
        }
    }
}

impl WorldConfig {
    /// Applies the persisted ability's adjustments to world parameters.
    #[must_use]
    pub fn with_ability(mut self, ability: Ability) -> Self {
        if ability == Ability::EnhancedHealth {
            self.player.max_health += ENHANCED_HEALTH_BONUS;
        }
        self
    }
}

/// Agent body and combat parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentTuning {
    /// Half extents of the agent's body.
    pub half_extents: Vec2,
    /// Health of a freshly spawned agent.
    pub max_health: i32,
    /// Damage dealt to the player on contact.
    pub contact_damage: i32,
    /// Impulse magnitude of a jump.
    pub jump_force: f32,
    /// Gravity multiplier of agent bodies.
    pub gravity_scale: f32,
    /// Length of the downward grounded probe measured from the body centre.
    pub ground_probe: f32,
    /// Duration of the hit-feedback window in seconds.
    pub flash_seconds: f32,
    /// Height of a single upward nudge while resolving spawn overlap.
    pub spawn_skin: f32,
    /// Maximum number of upward nudges before an overlap is accepted.
    pub spawn_max_nudges: u32,
}

impl Default for AgentTuning {
    fn default() -> Self {
        Self {
            half_extents: Vec2::splat(0.45),
            max_health: 3,
            contact_damage: 1,
            jump_force: 6.0,
            gravity_scale: 1.0,
            ground_probe: 1.0,
            flash_seconds: 0.2,
            spawn_skin: 0.02,
            spawn_max_nudges: 12,
        }
    }
}

/// Player body and health parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    /// Half extents of the player's body.
    pub half_extents: Vec2,
    /// Health restored on every reset.
    pub max_health: i32,
    /// Duration of the damage-feedback window in seconds.
    pub flash_seconds: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            half_extents: Vec2::new(0.4, 0.5),
            max_health: 3,
            flash_seconds: 0.2,
        }
    }
}

/// Projectile parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileTuning {
    /// Travel speed in world units per second.
    pub speed: f32,
    /// Damage dealt to the struck agent.
    pub damage: i32,
    /// Seconds before an unspent projectile disappears.
    pub lifetime_seconds: f32,
    /// Half extent of the projectile's square hit box.
    pub radius: f32,
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            speed: 20.0,
            damage: 1,
            lifetime_seconds: 2.0,
            radius: 0.1,
        }
    }
}

/// Trap parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrapTuning {
    /// Upward impulse applied to the player. Agents receive half.
    pub bounce_force: f32,
    /// Damage dealt to the player.
    pub damage: i32,
}

impl Default for TrapTuning {
    fn default() -> Self {
        Self {
            bounce_force: 10.0,
            damage: 1,
        }
    }
}

/// Represents the authoritative Ledge Runner world state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    config: WorldConfig,
    levels: Vec<LevelLayout>,
    active: Option<ActiveLevel>,
    agents: AgentArena,
    player: Player,
    projectiles: Vec<Projectile>,
    tick_index: u64,
}

#[derive(Debug)]
struct ActiveLevel {
    index: LevelIndex,
    tiles: TileMap,
    exit: Option<Aabb>,
    exit_consumed: bool,
    final_level: bool,
}

impl World {
    /// Creates a world holding the provided levels. No level is active until
    /// a [`Command::ActivateLevel`] is applied.
    #[must_use]
    pub fn new(config: WorldConfig, levels: Vec<LevelLayout>) -> Self {
        let player = Player::new(config.player.half_extents, config.player.max_health);
        Self {
            banner: WELCOME_BANNER,
            config,
            levels,
            active: None,
            agents: AgentArena::default(),
            player,
            projectiles: Vec::new(),
            tick_index: 0,
        }
    }
}

/// Applies the provided command to the world, mutating state and reporting
/// the outcome through `out_events`.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => tick(world, dt, out_events),
        Command::PhysicsStep { dt } => physics_step(world, dt, out_events),
        Command::ActivateLevel { level } => activate_level(world, level, out_events),
        Command::SpawnAgent { position } => spawn_agent(world, position, out_events),
        Command::DespawnAgent { agent } => {
            if world.agents.remove(agent).is_some() {
                out_events.push(Event::AgentRemoved { agent });
            }
        }
        Command::SteerAgent { agent, velocity_x } => {
            if let Some(agent) = live_agent_mut(&mut world.agents, agent) {
                agent.body.velocity.x = velocity_x;
            }
        }
        Command::RequestJump { agent, toward } => {
            if let Some(agent) = live_agent_mut(&mut world.agents, agent) {
                agent.pending_jump = Some(toward);
            }
        }
        Command::DamageAgent { agent, amount } => {
            let flash = seconds(world.config.agent.flash_seconds);
            damage_agent(
                &mut world.agents,
                agent,
                amount,
                flash,
                world.tick_index,
                out_events,
            );
        }
        Command::KillAgent { agent } => kill_agent(
            &mut world.agents,
            agent,
            DeathCause::Forced,
            world.tick_index,
            out_events,
        ),
        Command::DrivePlayer {
            velocity,
            gravity_scale,
            facing,
        } => {
            world.player.body.velocity = velocity;
            world.player.body.gravity_scale = gravity_scale;
            world.player.facing = facing;
        }
        Command::DamagePlayer { amount } => {
            let flash = seconds(world.config.player.flash_seconds);
            damage_player(&mut world.player, amount, flash, out_events);
        }
        Command::ResetPlayer => world.player.reset(),
        Command::FireProjectile { direction } => fire_projectile(world, direction, out_events),
    }
}

fn tick(world: &mut World, dt: Duration, out_events: &mut Vec<Event>) {
    world.tick_index = world.tick_index.saturating_add(1);
    out_events.push(Event::TimeAdvanced { dt });

    reap_dead_agents(world, out_events);

    world.player.flash = world.player.flash.saturating_sub(dt);
    for agent in world.agents.iter_mut() {
        agent.flash = agent.flash.saturating_sub(dt);
    }
    for projectile in &mut world.projectiles {
        projectile.remaining = projectile.remaining.saturating_sub(dt);
    }
    world
        .projectiles
        .retain(|projectile| !projectile.remaining.is_zero());

    let Some(active) = world.active.as_ref() else {
        return;
    };

    let tick_index = world.tick_index;
    let config = &world.config;
    let sensor = SensorView::new(Some(&active.tiles), None);

    for agent in world.agents.iter_mut().filter(|agent| agent.is_alive()) {
        let cause = if agent.body.position.y < config.death_y {
            Some(DeathCause::Fall)
        } else if sensor.overlaps(agent.body.aabb(), LayerMask::HAZARD) {
            Some(DeathCause::Hazard)
        } else {
            None
        };

        if let Some(cause) = cause {
            if agent.kill(cause, tick_index) {
                out_events.push(Event::AgentDied {
                    agent: agent.id,
                    cause,
                });
            }
            continue;
        }

        agent.grounded = sensor
            .raycast(
                agent.body.position,
                Vec2::NEG_Y,
                config.agent.ground_probe,
                LayerMask::GROUND,
            )
            .is_some();
    }

    if world.player.body.position.y < config.death_y && !world.player.dead {
        info!(
            y = world.player.body.position.y,
            "player fell below the death height"
        );
        let flash = seconds(config.player.flash_seconds);
        damage_player(&mut world.player, LETHAL_DAMAGE, flash, out_events);
    }
}

/// Removes agents whose death was recorded before the current tick.
fn reap_dead_agents(world: &mut World, out_events: &mut Vec<Event>) {
    let tick_index = world.tick_index;
    let dead: Vec<AgentId> = world
        .agents
        .iter()
        .filter(|agent| agent.died_before(tick_index))
        .map(|agent| agent.id)
        .collect();

    for id in dead {
        if let Some(agent) = world.agents.remove(id) {
            if let AgentState::Dead { cause, .. } = agent.state {
                debug!(agent = ?id, ?cause, "removed dead agent");
            }
            out_events.push(Event::AgentRemoved { agent: id });
        }
    }
}

fn physics_step(world: &mut World, dt: Duration, out_events: &mut Vec<Event>) {
    let Some(active) = world.active.as_mut() else {
        return;
    };

    let step = dt.as_secs_f32();
    let tick_index = world.tick_index;
    let config = &world.config;

    for agent in world.agents.iter_mut().filter(|agent| agent.is_alive()) {
        if agent.grounded {
            if let Some(toward) = agent.pending_jump.take() {
                let direction = (toward - agent.body.position).normalize_or_zero();
                let force = config.agent.jump_force;
                agent
                    .body
                    .apply_impulse(Vec2::new(direction.x * force, force));
                agent.grounded = false;
                out_events.push(Event::AgentJumped { agent: agent.id });
            }
        }
        agent.body.integrate(&active.tiles, step);
    }

    world.player.body.integrate(&active.tiles, step);

    let radius = config.projectile.radius;
    let damage = config.projectile.damage;
    let flash = seconds(config.agent.flash_seconds);
    let tiles = &active.tiles;
    let agents = &mut world.agents;
    world.projectiles.retain_mut(|projectile| {
        projectile.advance(step);
        let bounds = projectile.aabb(radius);
        if tiles
            .cells_overlapping(bounds)
            .cells()
            .any(|cell| tiles.has_ground(cell))
        {
            return false;
        }
        let struck = agents
            .iter()
            .find(|agent| agent.is_alive() && agent.body.aabb().touches(&bounds))
            .map(|agent| agent.id);
        match struck {
            Some(agent) => {
                out_events.push(Event::ProjectileHit { agent });
                damage_agent(agents, agent, damage, flash, tick_index, out_events);
                false
            }
            None => true,
        }
    });

    let player = &mut world.player;
    let player_box = player.body.aabb();

    for agent in world.agents.iter_mut().filter(|agent| agent.is_alive()) {
        let body = agent.body.aabb();

        let on_trap = active.tiles.touches_kind(body, TileKind::Trap);
        if on_trap && !agent.touching_trap {
            agent.body.velocity.y = 0.0;
            agent
                .body
                .apply_impulse(Vec2::Y * config.trap.bounce_force * 0.5);
        }
        agent.touching_trap = on_trap;

        let on_player = !player.dead && body.touches(&player_box);
        if on_player && !agent.touching_player {
            out_events.push(Event::PlayerContact {
                agent: agent.id,
                damage: config.agent.contact_damage,
            });
        }
        agent.touching_player = on_player;
    }

    if player.dead {
        return;
    }

    let on_trap = active.tiles.touches_kind(player_box, TileKind::Trap);
    if on_trap && !player.touching_trap {
        player.body.velocity.y = 0.0;
        player
            .body
            .apply_impulse(Vec2::Y * config.trap.bounce_force);
        out_events.push(Event::PlayerTrapped {
            damage: config.trap.damage,
        });
    }
    player.touching_trap = on_trap;

    if let Some(exit) = active.exit {
        if !active.exit_consumed && exit.touches(&player_box) {
            active.exit_consumed = true;
            out_events.push(Event::ExitReached {
                level: active.index,
                final_level: active.final_level,
            });
        }
    }
}

fn activate_level(world: &mut World, level: LevelIndex, out_events: &mut Vec<Event>) {
    let Some(layout) = world.levels.get(level.get() as usize) else {
        warn!(
            level = level.get(),
            levels = world.levels.len(),
            "ignoring activation of unknown level"
        );
        return;
    };

    let tiles = layout.tile_map(world.config.cell_length);
    let start_cell = tiles.cell_center_world(layout.player_start());
    let start = Vec2::new(
        start_cell.x,
        start_cell.y - tiles.cell_size().y * 0.5 + world.player.body.half_extents.y,
    );
    let exit = layout.exit().map(|cell| tiles.cell_aabb(cell));
    let final_level = level.get() as usize + 1 == world.levels.len();

    info!(level = level.get(), name = layout.name(), "activated level");

    world.player.respawn_at(start);
    world.projectiles.clear();
    world.active = Some(ActiveLevel {
        index: level,
        tiles,
        exit,
        exit_consumed: false,
        final_level,
    });
    out_events.push(Event::LevelActivated { level, final_level });
}

fn spawn_agent(world: &mut World, position: Vec2, out_events: &mut Vec<Event>) {
    let Some(active) = world.active.as_ref() else {
        debug!(?position, "rejecting spawn without an active level");
        out_events.push(Event::AgentSpawnRejected { position });
        return;
    };

    let tuning = &world.config.agent;
    let sensor = SensorView::new(Some(&active.tiles), None);
    let mut body = Body::new(
        position + Vec2::new(0.0, tuning.half_extents.y),
        tuning.half_extents,
        tuning.gravity_scale,
    );

    let mut nudges = 0;
    while nudges < tuning.spawn_max_nudges && sensor.overlaps(body.aabb(), LayerMask::GROUND) {
        body.position.y += tuning.spawn_skin;
        nudges += 1;
    }
    if nudges == tuning.spawn_max_nudges && sensor.overlaps(body.aabb(), LayerMask::GROUND) {
        debug!(?position, nudges, "accepting spawn placement that still overlaps ground");
    }

    let max_health = tuning.max_health;
    let agent = world
        .agents
        .insert(|id| Agent::new(id, body, max_health));
    out_events.push(Event::AgentSpawned {
        agent,
        position: body.position,
        nudges,
    });
}

fn fire_projectile(world: &mut World, direction: Vec2, out_events: &mut Vec<Event>) {
    if world.active.is_none() || world.player.dead {
        return;
    }
    let direction = direction.normalize_or_zero();
    if direction == Vec2::ZERO {
        return;
    }

    let tuning = &world.config.projectile;
    world.projectiles.push(Projectile {
        position: world.player.body.position,
        velocity: direction * tuning.speed,
        remaining: seconds(tuning.lifetime_seconds),
    });
    out_events.push(Event::ProjectileFired);
}

fn live_agent_mut(agents: &mut AgentArena, agent: AgentId) -> Option<&mut Agent> {
    agents.get_mut(agent).filter(|agent| agent.is_alive())
}

fn damage_agent(
    agents: &mut AgentArena,
    id: AgentId,
    amount: i32,
    flash: Duration,
    tick_index: u64,
    out_events: &mut Vec<Event>,
) {
    let Some(agent) = agents.get_mut(id) else {
        return;
    };
    match agent.damage(amount, flash, tick_index) {
        DamageOutcome::Ignored => {}
        DamageOutcome::Survived { remaining } => {
            out_events.push(Event::AgentDamaged {
                agent: id,
                remaining,
            });
        }
        DamageOutcome::Died => {
            debug!(agent = ?id, "agent health depleted");
            out_events.push(Event::AgentDied {
                agent: id,
                cause: DeathCause::Combat,
            });
        }
    }
}

fn kill_agent(
    agents: &mut AgentArena,
    id: AgentId,
    cause: DeathCause,
    tick_index: u64,
    out_events: &mut Vec<Event>,
) {
    if agents
        .get_mut(id)
        .is_some_and(|agent| agent.kill(cause, tick_index))
    {
        out_events.push(Event::AgentDied { agent: id, cause });
    }
}

fn damage_player(player: &mut Player, amount: i32, flash: Duration, out_events: &mut Vec<Event>) {
    let Some(died) = player.damage(amount, flash) else {
        return;
    };
    out_events.push(Event::PlayerDamaged {
        remaining: player.health.current(),
    });
    if died {
        info!("player died");
        out_events.push(Event::PlayerDied);
    }
}

fn seconds(value: f32) -> Duration {
    if value > 0.0 {
        Duration::try_from_secs_f32(value).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use glam::Vec2;
    use ledge_runner_core::{AgentId, AgentSnapshot, AgentView, LevelIndex, PlayerSnapshot};

    use super::{SensorView, TileMap, World, WorldConfig};

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Provides read-only access to the world's configuration.
    #[must_use]
    pub fn config(world: &World) -> &WorldConfig {
        &world.config
    }

    /// Number of levels the world holds.
    #[must_use]
    pub fn level_count(world: &World) -> usize {
        world.levels.len()
    }

    /// Index of the active level, if any.
    #[must_use]
    pub fn active_level(world: &World) -> Option<LevelIndex> {
        world.active.as_ref().map(|active| active.index)
    }

    /// Tile map of the active level, if any.
    #[must_use]
    pub fn tile_map(world: &World) -> Option<&TileMap> {
        world.active.as_ref().map(|active| &active.tiles)
    }

    /// Sensor over the active tiles and the player body.
    #[must_use]
    pub fn sensor(world: &World) -> SensorView<'_> {
        let player = world.active.as_ref().map(|_| world.player.body.aabb());
        SensorView::new(tile_map(world), player)
    }

    /// Captures a read-only view of every agent, including dead ones awaiting removal.
    #[must_use]
    pub fn agent_view(world: &World) -> AgentView {
        AgentView::from_snapshots(world.agents.iter().map(|agent| agent.snapshot()).collect())
    }

    /// Captures the snapshot of a single agent if its handle is still valid.
    #[must_use]
    pub fn agent(world: &World, agent: AgentId) -> Option<AgentSnapshot> {
        world.agents.get(agent).map(|agent| agent.snapshot())
    }

    /// Handles of every agent slot currently occupied.
    #[must_use]
    pub fn agent_ids(world: &World) -> Vec<AgentId> {
        world.agents.ids()
    }

    /// Number of occupied agent slots.
    #[must_use]
    pub fn agent_count(world: &World) -> usize {
        world.agents.len()
    }

    /// Captures the player's state.
    #[must_use]
    pub fn player(world: &World) -> PlayerSnapshot {
        world.player.snapshot()
    }

    /// Position agents chase, absent while no level is active.
    #[must_use]
    pub fn target_position(world: &World) -> Option<Vec2> {
        world.active.as_ref().map(|_| world.player.body.position)
    }

    /// Number of projectiles in flight.
    #[must_use]
    pub fn projectile_count(world: &World) -> usize {
        world.projectiles.len()
    }

    /// Number of logic ticks processed so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }
}
