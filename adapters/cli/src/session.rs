//! Scripted headless session: an orbiting pointer, periodic power-ups and the
//! spawning and scoreboard systems wired around the world.

use std::{fmt, time::Duration};

use anyhow::{Context, Result};
use glam::Vec2;
use tailchase_core::{Command, Event, PowerUpKind, WorldPoint};
use tailchase_system_scoreboard::{Scoreboard, Summary};
use tailchase_system_spawning::{Config as SpawningConfig, Spawning};
use tailchase_world::{self as world, query, World};

use crate::settings::{SessionConfig, Settings};

/// Power-ups cycled by the script, in order.
const POWER_UP_CYCLE: [PowerUpKind; 4] = [
    PowerUpKind::Munch,
    PowerUpKind::Freeze,
    PowerUpKind::Repel,
    PowerUpKind::Phase,
];

/// Outcome of a finished session.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Report {
    pub(crate) ticks: u32,
    pub(crate) elapsed: Duration,
    pub(crate) summary: Summary,
    pub(crate) chain_len: usize,
    pub(crate) agents_alive: usize,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = &self.summary;
        writeln!(
            f,
            "ticks: {} ({:.2}s simulated)",
            self.ticks,
            self.elapsed.as_secs_f32()
        )?;
        writeln!(f, "score: {}", summary.score)?;
        writeln!(
            f,
            "captured: {} followers, {} foes",
            summary.followers_captured, summary.foes_captured
        )?;
        writeln!(
            f,
            "chains devoured: {} (best streak {})",
            summary.chains_devoured, summary.best_streak
        )?;
        writeln!(
            f,
            "spawned: {} friends, {} foes",
            summary.friends_spawned, summary.foes_spawned
        )?;
        writeln!(
            f,
            "alive: {} agents, chain of {}",
            self.agents_alive, self.chain_len
        )?;
        write!(
            f,
            "state: {}",
            if summary.game_over { "game over" } else { "running" }
        )
    }
}

/// World plus the systems reacting to its events.
pub(crate) struct Session {
    world: World,
    spawning: Spawning,
    scoreboard: Scoreboard,
    script: SessionConfig,
    centre: Vec2,
    orbit: Vec2,
}

impl Session {
    /// Builds the world from `settings` and wires the systems around it.
    pub(crate) fn new(settings: Settings) -> Result<Self> {
        let world =
            World::with_config(settings.simulation).context("failed to build the world")?;
        let size = query::world_size(&world);
        let half = Vec2::new(size.width(), size.height()) * 0.5;
        let script = settings.session;
        let spawning = Spawning::new(SpawningConfig::new(
            script.friend_interval(),
            script.foe_interval(),
            size,
            script.spawn_seed,
        ));

        Ok(Self {
            world,
            spawning,
            scoreboard: Scoreboard::new(),
            centre: half,
            orbit: half * script.orbit_fraction,
            script,
        })
    }

    /// Runs up to `ticks` frames of `tick` each, stopping early on game over.
    pub(crate) fn run(&mut self, ticks: u32, tick: Duration) -> Report {
        log::info!("{}", query::welcome_banner(&self.world));
        self.dispatch(Command::PointerPressed {
            at: self.pointer_at(0),
        });

        let mut ran = 0;
        for frame in 0..ticks {
            if self.scoreboard.is_game_over() {
                break;
            }
            self.script_frame(frame);
            self.dispatch(Command::Tick { dt: tick });
            ran += 1;
        }

        self.dispatch(Command::PointerReleased);
        self.report(ran)
    }

    fn script_frame(&mut self, frame: u32) {
        let pointer_every = self.script.pointer_every.max(1);
        if frame % pointer_every == 0 {
            self.dispatch(Command::PointerMoved {
                at: self.pointer_at(frame),
            });
        }

        let every = self.script.power_up_every;
        if every != 0 && frame != 0 && frame % every == 0 {
            let index = (frame / every - 1) as usize % POWER_UP_CYCLE.len();
            self.dispatch(Command::ActivatePowerUp {
                kind: POWER_UP_CYCLE[index],
            });
        }
    }

    /// Point on the ellipse traced by the scripted pointer.
    fn pointer_at(&self, frame: u32) -> WorldPoint {
        let angle = frame as f32 * self.script.orbit_step;
        let at = self.centre + Vec2::new(angle.cos(), angle.sin()) * self.orbit;
        WorldPoint::new(at.x, at.y)
    }

    /// Applies `command` and keeps feeding the systems until they go quiet.
    fn dispatch(&mut self, command: Command) {
        let mut pending = vec![command];
        while !pending.is_empty() {
            let mut events: Vec<Event> = Vec::new();
            for command in pending.drain(..) {
                world::apply(&mut self.world, command, &mut events);
            }
            self.scoreboard.handle(&events);
            self.spawning.handle(&events, &mut pending);
        }
    }

    fn report(&self, ticks: u32) -> Report {
        Report {
            ticks,
            elapsed: query::elapsed(&self.world),
            summary: self.scoreboard.summary(),
            chain_len: query::chain(&self.world).len(),
            agents_alive: query::agent_view(&self.world).len(),
        }
    }
}
