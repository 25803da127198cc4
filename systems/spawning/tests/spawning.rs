use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    time::Duration,
};

use tailchase_core::{Command, Event, Role, WorldSize};
use tailchase_system_spawning::{Config, Spawning};
use tailchase_world::{self as world, query, World};

fn bounds() -> WorldSize {
    WorldSize::new(2_400.0, 1_600.0)
}

fn time(millis: u64) -> Event {
    Event::TimeAdvanced {
        dt: Duration::from_millis(millis),
    }
}

#[test]
fn emits_multiple_spawn_commands_for_large_dt() {
    let mut spawning = Spawning::new(Config::new(
        Duration::from_millis(500),
        Duration::from_secs(1),
        bounds(),
        0x1234_5678,
    ));
    let mut commands = Vec::new();
    spawning.handle(&[time(2_000)], &mut commands);

    let friends = commands
        .iter()
        .filter(|command| matches!(command, Command::AddFriend))
        .count();
    let foes = commands
        .iter()
        .filter(|command| matches!(command, Command::SpawnFoe { .. }))
        .count();
    assert_eq!(friends, 4, "expected one friend per interval");
    assert_eq!(foes, 2, "expected one foe per interval");
    assert!(
        matches!(commands.first(), Some(Command::AddFriend)),
        "friends are emitted before foes"
    );
}

#[test]
fn game_over_stops_spawning_for_good() {
    let mut spawning = Spawning::new(Config::new(
        Duration::from_secs(1),
        Duration::from_secs(1),
        bounds(),
        0x4d59_5df4_d0f3_3173,
    ));

    let mut commands = Vec::new();
    spawning.handle(&[time(500)], &mut commands);
    assert!(commands.is_empty(), "no spawn before full interval");

    spawning.handle(&[time(500), Event::GameOver], &mut commands);
    assert!(commands.is_empty(), "game over wins over elapsed time");
    assert!(spawning.is_stopped());

    spawning.handle(&[time(5_000)], &mut commands);
    assert!(commands.is_empty(), "stopped system stays quiet");
}

#[test]
fn events_without_time_do_not_spawn() {
    let mut spawning = Spawning::new(Config::new(
        Duration::from_millis(16),
        Duration::from_millis(16),
        bounds(),
        7,
    ));
    let mut commands = Vec::new();
    spawning.handle(&[Event::ScoreAwarded { points: 10 }], &mut commands);
    assert!(commands.is_empty());
}

#[test]
fn deterministic_replay_produces_identical_sequence() {
    let first = replay();
    let second = replay();

    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert_eq!(first.friends, 10, "one friend every 750ms over 8s");
    assert_eq!(first.foes.len(), 4, "one foe every 2s over 8s");
}

#[test]
fn spawned_agents_enter_the_world() {
    let outcome = replay();
    assert_eq!(outcome.chain_len, outcome.friends);
    assert_eq!(outcome.alive_foes, outcome.foes.len());
}

fn replay() -> ReplayOutcome {
    let mut world = World::new();
    world.set_collision_test(|_, _| false);
    let mut spawning = Spawning::new(Config::new(
        Duration::from_millis(750),
        Duration::from_secs(2),
        query::world_size(&world),
        0x4d59_5df4_d0f3_3173,
    ));
    let mut outcome = ReplayOutcome::default();

    for _ in 0..500 {
        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(16),
            },
            &mut events,
        );

        let mut commands = Vec::new();
        spawning.handle(&events, &mut commands);
        for command in commands {
            let mut spawned = Vec::new();
            world::apply(&mut world, command, &mut spawned);
            for event in spawned {
                if let Event::AgentSpawned { role, at, .. } = event {
                    match role {
                        Role::Friend => outcome.friends += 1,
                        Role::Foe => outcome.foes.push((at.x().to_bits(), at.y().to_bits())),
                        Role::Controlled => {}
                    }
                }
            }
        }
    }

    outcome.chain_len = query::chain(&world).len();
    outcome.alive_foes = query::agent_view(&world)
        .iter()
        .filter(|agent| agent.role == Role::Foe)
        .count();
    outcome
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
struct ReplayOutcome {
    friends: usize,
    foes: Vec<(u32, u32)>,
    chain_len: usize,
    alive_foes: usize,
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}
