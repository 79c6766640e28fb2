use std::time::Duration;

use ledge_runner_core::{Ability, Command, Event, Facing, LevelIndex};
use ledge_runner_system_player::{PlayerInput, PlayerMotor, Tuning};
use ledge_runner_world::{self as world, query, LevelLayout, World, WorldConfig};

const FRAME: Duration = Duration::from_millis(20);

const RIGHT: PlayerInput = PlayerInput {
    horizontal: 1.0,
    jump_pressed: false,
    jump_released: false,
};

const JUMP: PlayerInput = PlayerInput {
    horizontal: 0.0,
    jump_pressed: true,
    jump_released: false,
};

fn load(lines: &[&str], motor: &mut PlayerMotor) -> World {
    let layout = LevelLayout::parse("locomotion", lines).expect("valid layout");
    let mut world = World::new(WorldConfig::default(), vec![layout]);
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::ActivateLevel {
            level: LevelIndex::new(0),
        },
        &mut events,
    );
    world::apply(&mut world, Command::ResetPlayer, &mut events);

    let mut commands = Vec::new();
    motor.handle(
        &events,
        &query::player(&world),
        PlayerInput::default(),
        &query::sensor(&world),
        &mut commands,
    );
    assert!(commands.is_empty());
    world
}

fn frame(world: &mut World, motor: &mut PlayerMotor, input: PlayerInput) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(world, Command::Tick { dt: FRAME }, &mut events);

    let mut commands = Vec::new();
    motor.handle(
        &events,
        &query::player(world),
        input,
        &query::sensor(world),
        &mut commands,
    );
    for command in commands {
        world::apply(world, command, &mut events);
    }
    world::apply(world, Command::PhysicsStep { dt: FRAME }, &mut events);
    events
}

fn peak_height(tuning: Tuning, second_jump_at: Option<usize>) -> f32 {
    let mut motor = PlayerMotor::new(tuning);
    let mut world = load(&["P.....", "######"], &mut motor);
    let mut peak = query::player(&world).position.y;
    let _ = frame(&mut world, &mut motor, JUMP);
    for index in 1..120 {
        let input = if Some(index) == second_jump_at {
            JUMP
        } else {
            PlayerInput::default()
        };
        let _ = frame(&mut world, &mut motor, input);
        peak = peak.max(query::player(&world).position.y);
    }
    peak
}

#[test]
fn running_moves_along_flat_ground() {
    let mut motor = PlayerMotor::new(Tuning::default());
    let mut world = load(&["P.......", "########"], &mut motor);
    assert_eq!(query::player(&world).position.x, 0.5);

    for _ in 0..20 {
        let _ = frame(&mut world, &mut motor, RIGHT);
    }

    let player = query::player(&world);
    assert!((player.position.x - 2.5).abs() < 1e-3, "{player:?}");
    assert!((player.position.y - 1.5).abs() < 1e-3, "{player:?}");
    assert!(motor.is_grounded());
    assert_eq!(player.facing, Facing::Right);
}

#[test]
fn jump_leaves_the_ground_and_lands_again() {
    let mut motor = PlayerMotor::new(Tuning::default());
    let mut world = load(&["P.....", "######"], &mut motor);

    let _ = frame(&mut world, &mut motor, JUMP);
    assert!(query::player(&world).position.y > 1.5);
    assert_eq!(motor.jumps_remaining(), 1);

    for _ in 0..120 {
        let _ = frame(&mut world, &mut motor, PlayerInput::default());
    }
    assert!((query::player(&world).position.y - 1.5).abs() < 1e-3);
    assert!(motor.is_grounded());
    assert_eq!(motor.jumps_remaining(), 2);
}

#[test]
fn double_jump_reaches_higher_than_single_jump() {
    let single = peak_height(Tuning::default(), None);
    let double = peak_height(Tuning::default(), Some(10));
    assert!(double > single + 0.5, "single {single}, double {double}");
}

#[test]
fn super_jump_reaches_higher() {
    let plain = peak_height(Tuning::default(), None);
    let boosted = peak_height(Tuning::default().with_ability(Ability::SuperJump), None);
    assert!(boosted > plain, "plain {plain}, boosted {boosted}");
}

#[test]
fn wall_slide_caps_descent_and_wall_jump_pushes_away() {
    let mut motor = PlayerMotor::new(Tuning::default());
    let mut world = load(
        &[
            "......#", "......#", "......#", "......#", "P.....#", "#######",
        ],
        &mut motor,
    );

    for _ in 0..60 {
        let _ = frame(&mut world, &mut motor, RIGHT);
    }
    let against_wall = query::player(&world).position.x;
    assert!((against_wall - 5.6).abs() < 1e-3, "{against_wall}");

    let _ = frame(
        &mut world,
        &mut motor,
        PlayerInput {
            jump_pressed: true,
            ..RIGHT
        },
    );

    // One frame of falling gravity on top of the slide cap.
    let slowest = -2.0 - 4.0 * 9.81 * FRAME.as_secs_f32() - 1e-3;
    let mut sliding_frames = 0;
    for _ in 0..120 {
        let _ = frame(&mut world, &mut motor, RIGHT);
        let player = query::player(&world);
        if motor.is_wall_sliding() && player.velocity.y < 0.0 {
            assert!(player.velocity.y > slowest, "{player:?}");
            sliding_frames += 1;
            if sliding_frames == 3 {
                break;
            }
        }
    }
    assert_eq!(sliding_frames, 3);

    let _ = frame(
        &mut world,
        &mut motor,
        PlayerInput {
            jump_pressed: true,
            ..RIGHT
        },
    );
    let launched = query::player(&world);
    assert_eq!(launched.facing, Facing::Left);
    assert_eq!(launched.velocity.x, -5.0);

    for _ in 0..10 {
        let _ = frame(&mut world, &mut motor, RIGHT);
    }
    assert!(query::player(&world).position.x < against_wall - 0.5);
}

#[test]
fn level_activation_clears_jump_state() {
    let mut motor = PlayerMotor::new(Tuning::default());
    let mut world = load(&["P.....", "######"], &mut motor);
    let _ = frame(&mut world, &mut motor, JUMP);
    assert_eq!(motor.jumps_remaining(), 1);

    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::ActivateLevel {
            level: LevelIndex::new(0),
        },
        &mut events,
    );
    let mut commands = Vec::new();
    motor.handle(
        &events,
        &query::player(&world),
        PlayerInput::default(),
        &query::sensor(&world),
        &mut commands,
    );
    assert_eq!(motor.jumps_remaining(), 0);
    assert!(!motor.is_grounded());
}
