#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic spawning system responsible for growing the chain and
//! releasing foes along the world border.

use std::time::Duration;

use tailchase_core::{Command, Event, WorldPoint, WorldSize};

const RNG_MULTIPLIER: u64 = 6_364_136_223_846_793_005;
const RNG_INCREMENT: u64 = 1;
/// Bits of LCG output used for a border fraction.
const FRACTION_BITS: u32 = 24;

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    friend_interval: Duration,
    foe_interval: Duration,
    bounds: WorldSize,
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration using the provided cadences, world bounds and seed.
    ///
    /// A zero interval disables that kind of spawn.
    #[must_use]
    pub const fn new(
        friend_interval: Duration,
        foe_interval: Duration,
        bounds: WorldSize,
        rng_seed: u64,
    ) -> Self {
        Self {
            friend_interval,
            foe_interval,
            bounds,
            rng_seed,
        }
    }
}

/// Interval-driven accumulator for one kind of spawn.
#[derive(Debug)]
struct Cadence {
    interval: Duration,
    accumulator: Duration,
}

impl Cadence {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            accumulator: Duration::ZERO,
        }
    }

    fn accumulate(&mut self, dt: Duration) -> usize {
        if self.interval.is_zero() {
            return 0;
        }

        self.accumulator = self.accumulator.saturating_add(dt);
        let mut attempts = 0;
        while self.accumulator >= self.interval {
            self.accumulator -= self.interval;
            attempts += 1;
        }
        attempts
    }
}

/// Pure system that deterministically emits `AddFriend` and `SpawnFoe` commands
/// until the game ends.
#[derive(Debug)]
pub struct Spawning {
    friends: Cadence,
    foes: Cadence,
    bounds: WorldSize,
    rng_state: u64,
    stopped: bool,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            friends: Cadence::new(config.friend_interval),
            foes: Cadence::new(config.foe_interval),
            bounds: config.bounds,
            rng_state: config.rng_seed,
            stopped: false,
        }
    }

    /// Reports whether a game over has switched the system off.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Consumes events and emits spawn commands for every elapsed interval.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        if self.stopped {
            return;
        }

        let mut accumulated = Duration::ZERO;
        for event in events {
            match event {
                Event::TimeAdvanced { dt } => accumulated = accumulated.saturating_add(*dt),
                Event::GameOver => {
                    log::debug!("game over, spawning stops");
                    self.stopped = true;
                    return;
                }
                _ => {}
            }
        }

        if accumulated.is_zero() {
            return;
        }

        for _ in 0..self.friends.accumulate(accumulated) {
            out.push(Command::AddFriend);
        }
        for _ in 0..self.foes.accumulate(accumulated) {
            let at = self.border_point();
            out.push(Command::SpawnFoe { at });
        }
    }

    /// Picks a point on one of the four world edges.
    fn border_point(&mut self) -> WorldPoint {
        let edge = self.advance_rng() >> 62;
        let along = self.next_fraction();
        let (width, height) = (self.bounds.width(), self.bounds.height());
        match edge {
            0 => WorldPoint::new(along * width, 0.0),
            1 => WorldPoint::new(width, along * height),
            2 => WorldPoint::new(along * width, height),
            _ => WorldPoint::new(0.0, along * height),
        }
    }

    /// Uniform value in `[0, 1)` taken from the high bits of the generator.
    fn next_fraction(&mut self) -> f32 {
        let bits = self.advance_rng() >> (u64::BITS - FRACTION_BITS);
        bits as f32 / (1_u64 << FRACTION_BITS) as f32
    }

    fn advance_rng(&mut self) -> u64 {
        self.rng_state = self
            .rng_state
            .wrapping_mul(RNG_MULTIPLIER)
            .wrapping_add(RNG_INCREMENT);
        self.rng_state
    }
}
