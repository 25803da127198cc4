//! Tuning tables that parameterise the simulation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest grid, in cells, a world may be partitioned into.
pub const MAX_GRID_CELLS: u32 = 1 << 16;

/// Aggregated tuning knobs for every adjustable aspect of the simulation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// World extent and spatial partitioning.
    pub world: WorldConfig,
    /// Controlled-entity movement tuning.
    pub player: PlayerConfig,
    /// Follower and foe tuning.
    pub ai: AiConfig,
    /// Power-up timeline tuning.
    pub power_ups: PowerUpConfig,
    /// Seed for the tint generator so replays stay deterministic.
    pub rng_seed: u64,
}

impl SimulationConfig {
    /// Checks that every dimension and rate is usable.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let world = &self.world;
        if !(world.width > 0.0 && world.height > 0.0) {
            return Err(ConfigError::NonPositiveWorld {
                width: world.width,
                height: world.height,
            });
        }
        if !(world.cell_size > 0.0) {
            return Err(ConfigError::NonPositiveCellSize(world.cell_size));
        }
        let columns = (f64::from(world.width) / f64::from(world.cell_size)).ceil();
        let rows = (f64::from(world.height) / f64::from(world.cell_size)).ceil();
        if !(columns * rows <= f64::from(MAX_GRID_CELLS)) {
            return Err(ConfigError::TooManyCells { columns, rows });
        }
        if world.far_cell_cadence == 0 {
            return Err(ConfigError::ZeroRate("world.far_cell_cadence"));
        }

        let rates = [
            ("player.direction_update_rate", self.player.direction_update_rate),
            ("player.cell_update_rate", self.player.cell_update_rate),
            ("ai.direction_update_rate", self.ai.direction_update_rate),
            ("ai.cell_update_rate", self.ai.cell_update_rate),
            ("ai.interact_update_rate", self.ai.interact_update_rate),
        ];
        if let Some((name, _)) = rates.iter().find(|(_, rate)| *rate == 0) {
            return Err(ConfigError::ZeroRate(*name));
        }

        if self.power_ups.supernova_period_millis == 0 {
            return Err(ConfigError::ZeroSupernovaPeriod);
        }

        Ok(())
    }
}

/// World extent and grid partitioning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Width of the playable area in world units.
    pub width: f32,
    /// Height of the playable area in world units.
    pub height: f32,
    /// Side length of a square grid cell.
    pub cell_size: f32,
    /// Cells within this Chebyshev radius of the controlled entity update every tick.
    pub near_cell_radius: u32,
    /// Number of ticks between updates of cells outside the near radius.
    pub far_cell_cadence: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 2_400.0,
            height: 1_600.0,
            cell_size: 200.0,
            near_cell_radius: 3,
            far_cell_cadence: 2,
        }
    }
}

/// Controlled-entity tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Side length of the controlled entity.
    pub size: f32,
    /// Speed used when no distance tier matches and right after a press.
    pub base_speed: f32,
    /// Frames between direction recomputations.
    pub direction_update_rate: u32,
    /// Frames between cell membership re-evaluations.
    pub cell_update_rate: u32,
    /// Speed tiers keyed on squared distance to the pointer, evaluated top-down.
    pub speed_tiers: Vec<SpeedTier>,
}

impl PlayerConfig {
    /// Resolves the speed for the provided squared distance to the pointer.
    ///
    /// The first tier whose threshold is exceeded wins; otherwise the base
    /// speed applies.
    #[must_use]
    pub fn speed_for(&self, distance_sq: f32) -> f32 {
        self.speed_tiers
            .iter()
            .find(|tier| distance_sq > tier.beyond_distance_sq)
            .map_or(self.base_speed, |tier| tier.speed)
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            size: 16.0,
            base_speed: 1.0,
            direction_update_rate: 1,
            cell_update_rate: 2,
            speed_tiers: vec![
                SpeedTier::new(20_000.0, 6.0),
                SpeedTier::new(20_000.0, 5.0),
                SpeedTier::new(14_000.0, 4.0),
                SpeedTier::new(8_000.0, 3.0),
                SpeedTier::new(2_000.0, 2.0),
            ],
        }
    }
}

/// One rung of the controlled entity's speed step function.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeedTier {
    /// Squared distance that must be exceeded for the tier to apply.
    pub beyond_distance_sq: f32,
    /// Speed applied while the tier matches.
    pub speed: f32,
}

impl SpeedTier {
    /// Creates a new speed tier.
    #[must_use]
    pub const fn new(beyond_distance_sq: f32, speed: f32) -> Self {
        Self {
            beyond_distance_sq,
            speed,
        }
    }
}

/// Follower and foe tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Side length of a freshly spawned follower.
    pub friend_size: f32,
    /// Extra size granted to the lead follower.
    pub lead_growth: f32,
    /// Baseline follower speed.
    pub friend_speed: f32,
    /// Side length of a foe.
    pub foe_size: f32,
    /// Baseline foe speed.
    pub foe_speed: f32,
    /// Frames between direction recomputations.
    pub direction_update_rate: u32,
    /// Frames between cell membership re-evaluations.
    pub cell_update_rate: u32,
    /// Frames between contact checks against the controlled entity.
    pub interact_update_rate: u32,
    /// Squared distance under which a full-strength lead glows red.
    pub lead_alert_distance_sq: f32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            friend_size: 8.0,
            lead_growth: 12.0,
            friend_speed: 1.5,
            foe_size: 12.0,
            foe_speed: 1.2,
            direction_update_rate: 3,
            cell_update_rate: 4,
            interact_update_rate: 2,
            lead_alert_distance_sq: 40_000.0,
        }
    }
}

/// Power-up timeline tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerUpConfig {
    /// Period of the supernova's repeating pulse in milliseconds.
    pub supernova_period_millis: u64,
}

impl Default for PowerUpConfig {
    fn default() -> Self {
        Self {
            supernova_period_millis: 16,
        }
    }
}

/// Reasons a [`SimulationConfig`] cannot drive a world.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// The world has no playable area.
    #[error("world must have a positive extent, got {width}x{height}")]
    NonPositiveWorld {
        /// Configured width.
        width: f32,
        /// Configured height.
        height: f32,
    },
    /// Grid cells have no extent.
    #[error("cell size must be positive, got {0}")]
    NonPositiveCellSize(f32),
    /// The world would be split into more than [`MAX_GRID_CELLS`] cells.
    #[error("grid of {columns}x{rows} cells exceeds the limit of {MAX_GRID_CELLS}")]
    TooManyCells {
        /// Cells along the horizontal axis.
        columns: f64,
        /// Cells along the vertical axis.
        rows: f64,
    },
    /// A throttle rate or cadence was zero.
    #[error("`{0}` must be at least 1")]
    ZeroRate(&'static str),
    /// The supernova pulse would never advance.
    #[error("supernova period must be at least one millisecond")]
    ZeroSupernovaPeriod,
}
