use std::time::Duration;

use glam::Vec2;
use ledge_runner_core::{AgentId, Command, DeathCause, Event, LevelIndex};
use ledge_runner_system_combat::{Combat, Cue};
use ledge_runner_world::{self as world, query, LevelLayout, World, WorldConfig};

const STEP: Duration = Duration::from_millis(20);

fn world_with(lines: &[&str]) -> World {
    let layout = LevelLayout::parse("combat", lines).expect("valid layout");
    let mut world = World::new(WorldConfig::default(), vec![layout]);
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::ActivateLevel {
            level: LevelIndex::new(0),
        },
        &mut events,
    );
    world
}

fn spawn(world: &mut World, position: Vec2) -> AgentId {
    let mut events = Vec::new();
    world::apply(world, Command::SpawnAgent { position }, &mut events);
    match events.as_slice() {
        [Event::AgentSpawned { agent, .. }] => *agent,
        other => panic!("unexpected spawn events: {other:?}"),
    }
}

fn route(
    world: &mut World,
    combat: &mut Combat,
    events: &[Event],
    aim: Option<Vec2>,
    cues: &mut Vec<Cue>,
) -> Vec<Event> {
    let mut commands = Vec::new();
    combat.handle(events, &query::player(world), aim, &mut commands, cues);
    let mut produced = Vec::new();
    for command in commands {
        world::apply(world, command, &mut produced);
    }
    produced
}

#[test]
fn touching_agent_hurts_player_and_dies() {
    let mut world = world_with(&["P....", "#####"]);
    let agent = spawn(&mut world, Vec2::new(1.2, 1.05));
    let mut combat = Combat::new();
    let mut cues = Vec::new();

    let mut events = Vec::new();
    world::apply(&mut world, Command::PhysicsStep { dt: STEP }, &mut events);
    let produced = route(&mut world, &mut combat, &events, None, &mut cues);

    assert_eq!(query::player(&world).health.current(), 2);
    assert!(query::player(&world).flashing);
    assert!(produced.contains(&Event::AgentDied {
        agent,
        cause: DeathCause::Forced,
    }));
    assert_eq!(cues, vec![Cue::Enemy]);

    let mut events = Vec::new();
    world::apply(&mut world, Command::Tick { dt: STEP }, &mut events);
    assert!(events.contains(&Event::AgentRemoved { agent }));
    assert_eq!(query::agent_count(&world), 0);
}

#[test]
fn three_shots_kill_an_agent_once() {
    let mut world = world_with(&["P.....", "######"]);
    let agent = spawn(&mut world, Vec2::new(4.5, 1.05));
    let mut combat = Combat::new();
    let mut cues = Vec::new();
    let mut deaths = 0;

    for _ in 0..3 {
        let mut events = route(&mut world, &mut combat, &[], Some(Vec2::X), &mut cues);
        for _ in 0..20 {
            world::apply(&mut world, Command::PhysicsStep { dt: STEP }, &mut events);
        }
        deaths += events
            .iter()
            .filter(|event| matches!(event, Event::AgentDied { agent: died, .. } if *died == agent))
            .count();
    }

    assert_eq!(deaths, 1);
    assert_eq!(cues, vec![Cue::Bullet; 3]);
    let snapshot = query::agent(&world, agent).expect("awaiting removal");
    assert!(!snapshot.alive);
}

#[test]
fn trap_contact_damages_player() {
    let mut world = world_with(&["P", ".", "^"]);
    let mut combat = Combat::new();
    let mut cues = Vec::new();

    let mut trapped = false;
    for _ in 0..30 {
        let mut events = Vec::new();
        world::apply(&mut world, Command::PhysicsStep { dt: STEP }, &mut events);
        if events.contains(&Event::PlayerTrapped { damage: 1 }) {
            let _ = route(&mut world, &mut combat, &events, None, &mut cues);
            trapped = true;
            break;
        }
    }

    assert!(trapped);
    assert_eq!(query::player(&world).health.current(), 2);
    assert_eq!(cues, vec![Cue::BounceTrap]);
}

#[test]
fn dead_player_cannot_shoot() {
    let mut world = world_with(&["P..", "###"]);
    let mut combat = Combat::new();
    let mut cues = Vec::new();
    let mut events = Vec::new();
    world::apply(&mut world, Command::DamagePlayer { amount: 99 }, &mut events);

    let produced = route(&mut world, &mut combat, &[], Some(Vec2::X), &mut cues);
    assert!(produced.is_empty());
    assert!(cues.is_empty());
    assert_eq!(query::projectile_count(&world), 0);
}
