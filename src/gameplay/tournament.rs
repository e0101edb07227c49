use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::ai::Agent;
use crate::env::Environment;
use crate::error::GameplayError;
use crate::game::{Color, Outcome};

use super::unattended::Gameplay;

/// Tally of a series of games between the same two agents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TournamentResults {
    pub games: usize,
    pub first_wins: usize,
    pub second_wins: usize,
    pub draws: usize,
}

impl TournamentResults {
    fn rate(&self, count: usize) -> f64 {
        if self.games == 0 {
            return 0.0;
        }
        count as f64 / self.games as f64
    }

    pub fn first_win_rate(&self) -> f64 {
        self.rate(self.first_wins)
    }

    pub fn second_win_rate(&self) -> f64 {
        self.rate(self.second_wins)
    }

    pub fn draw_rate(&self) -> f64 {
        self.rate(self.draws)
    }
}

impl fmt::Display for TournamentResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} games: first {} ({:.1}%), second {} ({:.1}%), draws {} ({:.1}%)",
            self.games,
            self.first_wins,
            self.first_win_rate() * 100.0,
            self.second_wins,
            self.second_win_rate() * 100.0,
            self.draws,
            self.draw_rate() * 100.0
        )
    }
}

/// Repeated unattended games with colors alternating every game. The first
/// agent opens the series as Black.
pub struct Tournament {
    gameplay: Gameplay,
    first_is_black: bool,
    played: usize,
}

impl Tournament {
    pub fn new(
        env: Arc<Environment>,
        first: Box<dyn Agent>,
        second: Box<dyn Agent>,
    ) -> Result<Self, GameplayError> {
        let mut gameplay = Gameplay::new(env);
        gameplay.set_players(Some(first), Some(second))?;
        Ok(Tournament {
            gameplay,
            first_is_black: true,
            played: 0,
        })
    }

    pub fn play(&mut self, games: usize) -> Result<TournamentResults, GameplayError> {
        let mut results = TournamentResults::default();
        for _ in 0..games {
            if self.played > 0 {
                self.gameplay.swap_players();
                self.first_is_black = !self.first_is_black;
            }
            self.gameplay.reset();
            self.played += 1;

            let outcome = self.gameplay.play()?;
            results.games += 1;
            match outcome {
                Outcome::Draw => results.draws += 1,
                Outcome::Winner(color) => {
                    if (color == Color::Black) == self.first_is_black {
                        results.first_wins += 1;
                    } else {
                        results.second_wins += 1;
                    }
                }
            }
        }

        info!(
            games = results.games,
            first_wins = results.first_wins,
            second_wins = results.second_wins,
            draws = results.draws,
            "Tournament finished"
        );
        Ok(results)
    }

    /// Give the agents back as (first, second).
    pub fn into_players(mut self) -> (Option<Box<dyn Agent>>, Option<Box<dyn Agent>>) {
        let (black, white) = self.gameplay.dispose();
        if self.first_is_black {
            (black, white)
        } else {
            (white, black)
        }
    }
}
