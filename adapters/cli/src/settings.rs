//! TOML settings for a headless session.

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::Deserialize;
use tailchase_core::SimulationConfig;

/// Everything a session needs: the world tuning plus the scripted driver.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    /// Tuning tables handed to the world.
    pub(crate) simulation: SimulationConfig,
    /// Parameters of the scripted pilot and spawners.
    pub(crate) session: SessionConfig,
}

/// Parameters of the scripted driver.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct SessionConfig {
    /// Milliseconds between new followers; zero disables them.
    pub(crate) friend_interval_millis: u64,
    /// Milliseconds between new foes; zero disables them.
    pub(crate) foe_interval_millis: u64,
    /// Ticks between scripted power-ups; zero disables them.
    pub(crate) power_up_every: u32,
    /// Ticks between pointer updates.
    pub(crate) pointer_every: u32,
    /// Radius of the pointer's orbit as a fraction of the world's half extent.
    pub(crate) orbit_fraction: f32,
    /// Radians the pointer advances per tick.
    pub(crate) orbit_step: f32,
    /// Seed of the spawner's generator.
    pub(crate) spawn_seed: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            friend_interval_millis: 1_500,
            foe_interval_millis: 7_000,
            power_up_every: 600,
            pointer_every: 4,
            orbit_fraction: 0.6,
            orbit_step: 0.01,
            spawn_seed: 0x4d59_5df4_d0f3_3173,
        }
    }
}

impl SessionConfig {
    pub(crate) fn friend_interval(&self) -> Duration {
        Duration::from_millis(self.friend_interval_millis)
    }

    pub(crate) fn foe_interval(&self) -> Duration {
        Duration::from_millis(self.foe_interval_millis)
    }
}

impl Settings {
    /// Reads settings from `path`, or returns defaults when no path is given.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("invalid settings in {}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        let settings: Self =
            toml::from_str(contents).context("failed to parse settings toml contents")?;
        settings
            .simulation
            .validate()
            .context("simulation settings rejected")?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_yields_defaults() {
        let settings = Settings::load(None).expect("defaults load");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn partial_tables_keep_remaining_defaults() {
        let settings = Settings::parse(
            r#"
            [simulation]
            rng_seed = 9

            [simulation.world]
            width = 800.0
            height = 600.0

            [session]
            power_up_every = 0
            "#,
        )
        .expect("settings parse");

        assert_eq!(settings.simulation.rng_seed, 9);
        assert_eq!(settings.simulation.world.width, 800.0);
        assert_eq!(
            settings.simulation.world.cell_size,
            SimulationConfig::default().world.cell_size
        );
        assert_eq!(settings.session.power_up_every, 0);
        assert_eq!(settings.session.pointer_every, 4);
    }

    #[test]
    fn invalid_simulation_is_rejected() {
        let error = Settings::parse(
            r#"
            [simulation.world]
            cell_size = 0.0
            "#,
        )
        .expect_err("zero cell size must fail");
        assert!(format!("{error:#}").contains("cell"), "{error:#}");
    }

    #[test]
    fn malformed_toml_is_reported() {
        assert!(Settings::parse("session = [").is_err());
    }
}
