//! Composition root wiring the world and every system into a frame loop.

use std::time::Duration;

use anyhow::{Context, Result};
use glam::Vec2;
use ledge_runner_core::{
    Ability, AgentView, Command, Event, GroundSensor, LayerMask, PlayerSnapshot,
};
use ledge_runner_system_chase::Chase;
use ledge_runner_system_combat::Combat;
use ledge_runner_system_level::{LevelLifecycle, Phase};
use ledge_runner_system_player::{PlayerInput, PlayerMotor};
use ledge_runner_system_spawning::PopulationManager;
use ledge_runner_world::{self as world, query, World};
use tracing::info;

use crate::{audio::AudioService, config::GameConfig};

/// Fixed duration integrated by every physics step.
pub(crate) const PHYSICS_STEP: Duration = Duration::from_millis(20);

const FIRE_INTERVAL: Duration = Duration::from_millis(400);
const FIRE_RANGE: f32 = 10.0;

/// Owns the world, the systems and the audio handle for one run.
///
/// Events produced by commands applied at the end of a frame are carried over
/// and delivered together with the next frame's physics and tick events.
#[derive(Debug)]
pub(crate) struct Simulation<A> {
    world: World,
    lifecycle: LevelLifecycle,
    population: PopulationManager,
    chase: Chase,
    motor: PlayerMotor,
    combat: Combat,
    autopilot: Autopilot,
    audio: A,
    pending: Vec<Event>,
    accumulator: Duration,
    frames: u64,
}

impl<A: AudioService> Simulation<A> {
    /// Builds the world from `config` and loads the first level.
    pub(crate) fn new(config: &GameConfig, ability: Ability, audio: A) -> Result<Self> {
        let layouts = config.layouts()?;
        let world = World::new(config.world.clone().with_ability(ability), layouts);
        let lifecycle = LevelLifecycle::new(query::level_count(&world));
        let mut population =
            PopulationManager::new(config.spawning).context("invalid spawning config")?;
        population.attach(lifecycle.subscribe());

        let mut simulation = Self {
            world,
            lifecycle,
            population,
            chase: Chase::new(config.chase),
            motor: PlayerMotor::new(config.player.with_ability(ability)),
            combat: Combat::new(),
            autopilot: Autopilot::default(),
            audio,
            pending: Vec::new(),
            accumulator: Duration::ZERO,
            frames: 0,
        };

        simulation.load(|lifecycle, out| lifecycle.load_level(0, false, out));
        info!(?ability, "simulation ready");
        Ok(simulation)
    }

    /// Advances the run by one rendered frame of `dt`.
    ///
    /// Physics runs in fixed steps drawn from an accumulator; the logic tick
    /// and the systems run once per frame. Paused phases freeze time.
    pub(crate) fn frame(&mut self, dt: Duration) {
        if self.lifecycle.phase() == Phase::AdvancePrompt {
            self.load(LevelLifecycle::accept_advance);
        }
        if self.lifecycle.phase().is_paused() {
            return;
        }

        self.frames += 1;
        let mut events = std::mem::take(&mut self.pending);
        self.accumulator = self.accumulator.saturating_add(dt);
        while self.accumulator >= PHYSICS_STEP {
            self.accumulator -= PHYSICS_STEP;
            world::apply(
                &mut self.world,
                Command::PhysicsStep { dt: PHYSICS_STEP },
                &mut events,
            );
        }
        world::apply(&mut self.world, Command::Tick { dt }, &mut events);

        self.dispatch(&events, dt);
    }

    /// Whether the run reached a terminal phase.
    pub(crate) fn is_finished(&self) -> bool {
        matches!(
            self.lifecycle.phase(),
            Phase::GameOver | Phase::Completed
        )
    }

    pub(crate) fn world(&self) -> &World {
        &self.world
    }

    pub(crate) fn lifecycle(&self) -> &LevelLifecycle {
        &self.lifecycle
    }

    pub(crate) fn audio(&self) -> &A {
        &self.audio
    }

    /// Frames that advanced simulation time.
    pub(crate) const fn frames(&self) -> u64 {
        self.frames
    }

    fn dispatch(&mut self, events: &[Event], dt: Duration) {
        self.lifecycle.handle(events);

        let agents = query::agent_view(&self.world);
        let target = query::target_position(&self.world);
        let player = query::player(&self.world);
        let sensor = query::sensor(&self.world);
        let mut commands = Vec::new();

        self.population.handle(
            events,
            &agents,
            target,
            query::tile_map(&self.world),
            &mut commands,
        );
        self.chase
            .handle(events, &agents, target, &sensor, &mut commands);

        let (input, aim) = self.autopilot.input(dt, &player, &agents, &sensor);
        self.motor
            .handle(events, &player, input, &sensor, &mut commands);

        let mut cues = Vec::new();
        self.combat
            .handle(events, &player, aim, &mut commands, &mut cues);
        for cue in cues {
            self.audio.play(cue);
        }

        self.apply(commands);
    }

    /// Runs a lifecycle transition and flushes the population straight away,
    /// so no agent from the previous level sees a physics step on the new one.
    fn load<F>(&mut self, transition: F)
    where
        F: FnOnce(&mut LevelLifecycle, &mut Vec<Command>),
    {
        let mut commands = Vec::new();
        transition(&mut self.lifecycle, &mut commands);
        self.apply(commands);

        let mut commands = Vec::new();
        self.population.handle(
            &[],
            &query::agent_view(&self.world),
            query::target_position(&self.world),
            query::tile_map(&self.world),
            &mut commands,
        );
        self.apply(commands);
    }

    fn apply(&mut self, commands: Vec<Command>) {
        for command in commands {
            world::apply(&mut self.world, command, &mut self.pending);
        }
    }
}

/// Scripted stand-in for a human at the controls: runs right, jumps over walls
/// and gaps, and shoots at the nearest agent in range.
#[derive(Debug, Default)]
struct Autopilot {
    fire_cooldown: Duration,
    jump_held: bool,
}

impl Autopilot {
    fn input<S>(
        &mut self,
        dt: Duration,
        player: &PlayerSnapshot,
        agents: &AgentView,
        sensor: &S,
    ) -> (PlayerInput, Option<Vec2>)
    where
        S: GroundSensor + ?Sized,
    {
        self.fire_cooldown = self.fire_cooldown.saturating_sub(dt);

        let reach = player.half_extents.x + 0.3;
        let blocked = sensor
            .raycast(player.position, Vec2::X, reach, LayerMask::GROUND)
            .is_some();
        let ahead = player.position + Vec2::new(player.half_extents.x + 0.5, 0.0);
        let gap = sensor
            .raycast(
                ahead,
                Vec2::NEG_Y,
                player.half_extents.y + 1.5,
                LayerMask::GROUND,
            )
            .is_none();
        let wants_jump = blocked || gap;

        let input = PlayerInput {
            horizontal: 1.0,
            jump_pressed: wants_jump && !self.jump_held,
            jump_released: !wants_jump && self.jump_held,
        };
        self.jump_held = wants_jump;

        let aim = if self.fire_cooldown.is_zero() {
            agents
                .iter()
                .filter(|agent| agent.alive)
                .map(|agent| agent.position - player.position)
                .filter(|offset| offset.length() <= FIRE_RANGE)
                .min_by(|a, b| a.length_squared().total_cmp(&b.length_squared()))
        } else {
            None
        };
        if aim.is_some() {
            self.fire_cooldown = FIRE_INTERVAL;
        }

        (input, aim)
    }
}
