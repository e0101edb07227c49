use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::env::Environment;
use crate::error::{GameplayError, MoveError};
use crate::game::{Board, Color, Move, Outcome};

use super::session::{GameSession, Seat};

/// Where a paced game currently stands. Every transition waits for the
/// configured delay, measured from the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the side to move to choose.
    Intent,
    /// `mv` was chosen at `since` and is shown once the delay elapses.
    Reveal { mv: Move, since: Instant },
    /// `mv` is on display since `since` and is played once the delay elapses.
    Apply { mv: Move, since: Instant },
    /// The game ended at `since`; the final board stays up for one delay.
    Cooldown { since: Instant },
    /// Nothing left to do.
    Done,
}

/// What a display needs to draw one frame.
#[derive(Debug)]
pub struct PacedView<'a> {
    pub board: &'a Board,
    pub turn: Color,
    pub phase: Phase,
    /// Most recently revealed move.
    pub last_move: Option<Move>,
    /// Moves available to the side to move; empty once finished.
    pub legal_moves: Vec<Move>,
    pub outcome: Option<Outcome>,
    /// The side to move is a human.
    pub awaiting_human: bool,
}

/// Non-blocking driver for an external render loop. Each `tick` advances at
/// most one phase and never sleeps; a quit request is honoured at the next
/// tick, so a move is never interrupted halfway. Agents see `after_gameplay`
/// exactly once per started game, whether it ends or is stopped.
pub struct PacedGameplay {
    session: GameSession,
    delay: Duration,
    phase: Phase,
    last_move: Option<Move>,
    human_move: Option<Move>,
    started: bool,
    quit: Arc<AtomicBool>,
}

impl PacedGameplay {
    pub fn new(env: Arc<Environment>, delay: Duration) -> Self {
        PacedGameplay {
            session: GameSession::new(env),
            delay,
            phase: Phase::Intent,
            last_move: None,
            human_move: None,
            started: false,
            quit: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Seat the players. `None` seats are humans who submit moves through
    /// `submit_move`.
    pub fn set_players(&mut self, black: Seat, white: Seat) -> Result<(), GameplayError> {
        self.session.set_players(black, white)?;
        Ok(())
    }

    pub fn swap_players(&mut self) {
        self.session.swap_players();
    }

    /// Shared flag an outside loop (or a signal handler) can raise to stop
    /// the game.
    pub fn quit_signal(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.quit)
    }

    pub fn request_quit(&self) {
        self.quit.store(true, Ordering::SeqCst);
    }

    /// Offer a human move for the side to move. It is held until the next
    /// `tick` picks it up.
    pub fn submit_move(&mut self, mv: Move) -> Result<(), MoveError> {
        let turn = self.session.decisive_color();
        let acceptable = self.phase == Phase::Intent
            && self.session.is_human(turn)
            && self.session.simulation().get_moves().contains(&mv);
        if !acceptable {
            return Err(MoveError::IllegalMove {
                row: mv.row,
                col: mv.col,
                color: turn,
            });
        }
        self.human_move = Some(mv);
        Ok(())
    }

    /// Advance the state machine to `now` by at most one phase.
    pub fn tick(&mut self, now: Instant) -> Result<Phase, GameplayError> {
        if self.phase != Phase::Done && self.quit.load(Ordering::SeqCst) {
            debug!("Paced game stopped on request");
            // A finished game already closed the lifecycle in `Apply`.
            if self.started && !self.session.simulation().is_finished() {
                self.session.after_gameplay();
            }
            self.phase = Phase::Done;
        }
        if !self.started && self.phase != Phase::Done {
            self.session.before_gameplay();
            self.started = true;
        }

        self.phase = match self.phase {
            Phase::Intent if self.session.simulation().is_finished() => {
                Phase::Cooldown { since: now }
            }
            Phase::Intent => match self.session.decide()? {
                Some(mv) => Phase::Reveal { mv, since: now },
                None => match self.human_move.take() {
                    Some(mv) => Phase::Reveal { mv, since: now },
                    None => Phase::Intent,
                },
            },
            Phase::Reveal { mv, since } if self.elapsed(since, now) => {
                self.last_move = Some(mv);
                Phase::Apply { mv, since: now }
            }
            Phase::Apply { mv, since } if self.elapsed(since, now) => {
                self.session.make_move(mv)?;
                if self.session.simulation().is_finished() {
                    self.session.after_gameplay();
                    Phase::Cooldown { since: now }
                } else {
                    Phase::Intent
                }
            }
            Phase::Cooldown { since } if self.elapsed(since, now) => Phase::Done,
            waiting => waiting,
        };
        Ok(self.phase)
    }

    fn elapsed(&self, since: Instant, now: Instant) -> bool {
        now.saturating_duration_since(since) >= self.delay
    }

    pub fn view(&self) -> PacedView<'_> {
        let simulation = self.session.simulation();
        let turn = simulation.turn();
        PacedView {
            board: simulation.board(),
            turn,
            phase: self.phase,
            last_move: self.last_move,
            legal_moves: simulation.get_moves(),
            outcome: simulation.winner().ok(),
            awaiting_human: !simulation.is_finished() && self.session.is_human(turn),
        }
    }

    /// Drive the game from a render loop. `render` is called once per tick
    /// with the current view and may return a human move attempt; illegal
    /// attempts are ignored. Returns `None` when stopped before the end.
    pub fn play<F>(&mut self, mut render: F) -> Result<Option<Outcome>, GameplayError>
    where
        F: FnMut(&PacedView<'_>) -> Option<Move>,
    {
        while self.tick(Instant::now())? != Phase::Done {
            if let Some(mv) = render(&self.view()) {
                if let Err(err) = self.submit_move(mv) {
                    debug!(%err, "Ignoring human move");
                }
            }
        }
        render(&self.view());
        Ok(self.session.outcome().ok())
    }

    pub fn reset(&mut self) {
        self.session.reset();
        self.phase = Phase::Intent;
        self.last_move = None;
        self.human_move = None;
        self.started = false;
        self.quit.store(false, Ordering::SeqCst);
    }

    /// Release both seats, Black first.
    pub fn dispose(&mut self) -> (Seat, Seat) {
        self.session.dispose()
    }
}
