use std::fmt;

use serde::{Deserialize, Serialize};

use crate::game::{Board, CanonicalBoard, Color};

/// MDP state key.
///
/// The canonical board as seen by the player about to decide: "own" discs
/// always belong to the decider, so the decider is implied by the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct State(CanonicalBoard);

impl State {
    pub fn new(board: CanonicalBoard) -> Self {
        State(board)
    }

    /// State of `board` for the player of `perspective`.
    pub fn from_board(board: &Board, perspective: Color) -> Self {
        State(board.relative_view(perspective))
    }

    pub fn board(&self) -> &CanonicalBoard {
        &self.0
    }

    /// Neither seat can move.
    pub fn is_terminal(&self) -> bool {
        self.0.is_finished()
    }
}

impl From<CanonicalBoard> for State {
    fn from(board: CanonicalBoard) -> Self {
        State(board)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
