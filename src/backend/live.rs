use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::error::{BackendError, MoveError};
use crate::game::{Board, BoardSize, Color, Move, Outcome};

use super::{apply_rules, enumerate_reachable, winner_by_rules, Backend, BackendKind, BoardSet};

/// Backend that computes every answer on demand.
///
/// The reachable set is only built if someone asks for it, and then kept.
pub struct LiveBackend {
    size: BoardSize,
    max_states: usize,
    boards: OnceCell<Arc<BoardSet>>,
}

impl LiveBackend {
    pub fn new(size: BoardSize, max_states: usize) -> Self {
        LiveBackend {
            size,
            max_states,
            boards: OnceCell::new(),
        }
    }
}

impl Backend for LiveBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Live
    }

    fn size(&self) -> BoardSize {
        self.size
    }

    fn legal_moves(&self, board: &Board, turn: Color) -> Vec<Move> {
        board.legal_moves(turn)
    }

    fn apply(&self, board: &Board, turn: Color, mv: Move) -> Result<(Board, Color), MoveError> {
        apply_rules(board, turn, mv)
    }

    fn winner(&self, board: &Board) -> Option<Outcome> {
        winner_by_rules(board)
    }

    fn reachable_boards(&self) -> Result<Arc<BoardSet>, BackendError> {
        self.boards
            .get_or_try_init(|| enumerate_reachable(self.size, self.max_states).map(Arc::new))
            .cloned()
    }
}
