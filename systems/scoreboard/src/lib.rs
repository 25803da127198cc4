#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Game-manager system that keeps the score and latches the end of the game.

use tailchase_core::{Event, Role};

/// Totals accumulated by the scoreboard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    /// Sum of every `ScoreAwarded` event.
    pub score: u64,
    /// Number of single followers caught.
    pub followers_captured: u32,
    /// Number of foes caught.
    pub foes_captured: u32,
    /// Number of whole chains devoured.
    pub chains_devoured: u32,
    /// Highest kill streak reported by a devoured chain.
    pub best_streak: u32,
    /// Followers that joined the chain.
    pub friends_spawned: u32,
    /// Foes released into the world.
    pub foes_spawned: u32,
    /// Whether the game has ended.
    pub game_over: bool,
}

/// Pure system that folds world events into a running [`Summary`].
///
/// Once `GameOver` is observed the score is frozen; later events are ignored.
#[derive(Debug, Default)]
pub struct Scoreboard {
    summary: Summary,
}

impl Scoreboard {
    /// Creates an empty scoreboard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current score.
    #[must_use]
    pub fn score(&self) -> u64 {
        self.summary.score
    }

    /// Reports whether the game has ended.
    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.summary.game_over
    }

    /// Snapshot of every total.
    #[must_use]
    pub fn summary(&self) -> Summary {
        self.summary
    }

    /// Consumes the events produced by one world interaction.
    pub fn handle(&mut self, events: &[Event]) {
        for event in events {
            if self.summary.game_over {
                return;
            }

            let summary = &mut self.summary;
            match event {
                Event::ScoreAwarded { points } => {
                    summary.score = summary.score.saturating_add(u64::from(*points));
                }
                Event::FollowerCaptured { .. } => summary.followers_captured += 1,
                Event::FoeCaptured { .. } => summary.foes_captured += 1,
                Event::ChainDevoured { kill_streak, .. } => {
                    summary.chains_devoured += 1;
                    summary.best_streak = summary.best_streak.max(*kill_streak);
                }
                Event::AgentSpawned { role, .. } => match role {
                    Role::Friend => summary.friends_spawned += 1,
                    Role::Foe => summary.foes_spawned += 1,
                    Role::Controlled => {}
                },
                Event::GameOver => {
                    summary.game_over = true;
                    log::info!("final score {}", summary.score);
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_is_frozen_after_game_over() {
        let mut scoreboard = Scoreboard::new();
        scoreboard.handle(&[
            Event::ScoreAwarded { points: 10 },
            Event::GameOver,
            Event::ScoreAwarded { points: 30 },
        ]);
        scoreboard.handle(&[Event::ScoreAwarded { points: 5 }]);

        assert_eq!(scoreboard.score(), 10);
        assert!(scoreboard.is_game_over());
    }

    #[test]
    fn best_streak_tracks_the_maximum() {
        let mut scoreboard = Scoreboard::new();
        scoreboard.handle(&[
            Event::ChainDevoured {
                followers: 3,
                kill_streak: 1,
            },
            Event::ChainDevoured {
                followers: 1,
                kill_streak: 2,
            },
        ]);

        let summary = scoreboard.summary();
        assert_eq!(summary.chains_devoured, 2);
        assert_eq!(summary.best_streak, 2);
    }
}
