//! Turn-based drivers that seat two players, feed states to whoever is to
//! move, and report each move's result back to the agent that made it.

mod paced;
mod session;
mod tournament;
mod unattended;

use std::time::Duration;

pub use paced::{PacedGameplay, PacedView, Phase};
pub use session::{GameSession, Seat};
pub use tournament::{Tournament, TournamentResults};
pub use unattended::Gameplay;

/// Gameplay settings.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GameplayConfig {
    /// Minimum time between paced phases, in milliseconds.
    pub delay_ms: u64,
    /// Games per run.
    pub games: usize,
    /// Base seed; each seat derives its own from it.
    pub seed: u64,
}

impl Default for GameplayConfig {
    fn default() -> Self {
        GameplayConfig {
            delay_ms: 50,
            games: 1,
            seed: 0,
        }
    }
}

impl GameplayConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}
