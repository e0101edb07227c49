use std::sync::Arc;

use tracing::debug;

use crate::env::Environment;
use crate::error::{ConfigError, GameplayError};
use crate::game::{Color, Outcome};

use super::session::{GameSession, Seat};

/// Plays whole games between two agents as fast as they decide. Human seats
/// are rejected since nothing here can ask a person for a move.
pub struct Gameplay {
    session: GameSession,
}

impl Gameplay {
    pub fn new(env: Arc<Environment>) -> Self {
        Gameplay {
            session: GameSession::new(env),
        }
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn set_players(&mut self, black: Seat, white: Seat) -> Result<(), GameplayError> {
        if black.is_none() {
            return Err(ConfigError::HumanNotAllowed { seat: Color::Black }.into());
        }
        if white.is_none() {
            return Err(ConfigError::HumanNotAllowed { seat: Color::White }.into());
        }
        self.session.set_players(black, white)?;
        Ok(())
    }

    pub fn swap_players(&mut self) {
        self.session.swap_players();
    }

    /// Play one game to the end from the current position.
    pub fn play(&mut self) -> Result<Outcome, GameplayError> {
        self.session.before_gameplay();
        let mut moves = 0usize;
        while !self.session.simulation().is_finished() {
            let seat = self.session.decisive_color();
            let mv = self
                .session
                .decide()?
                .ok_or(ConfigError::HumanNotAllowed { seat })?;
            self.session.make_move(mv)?;
            moves += 1;
        }
        self.session.after_gameplay();

        let outcome = self.session.outcome()?;
        debug!(moves, ?outcome, "Game finished");
        Ok(outcome)
    }

    pub fn reset(&mut self) {
        self.session.reset();
    }

    /// Release both seats, Black first.
    pub fn dispose(&mut self) -> (Seat, Seat) {
        self.session.dispose()
    }
}
