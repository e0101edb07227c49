use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::error::{BackendError, MoveError};
use crate::game::{Board, BoardSize, CanonicalBoard, Color, Move, Outcome, Simulation};

use super::{apply_rules, winner_by_rules, Backend, BackendKind, BoardSet};

/// Worklist search over every position reachable from the starting board.
///
/// Positions are deduplicated by the canonical identity seen from the side
/// to move. Finished positions contribute both their identity and its swap,
/// since either seat may be the one asking about them. Fails instead of
/// truncating once the set would exceed `max_states`.
pub fn enumerate_reachable(size: BoardSize, max_states: usize) -> Result<BoardSet, BackendError> {
    let started = Instant::now();
    let mut boards = BoardSet::new();
    let mut visited: HashSet<CanonicalBoard> = HashSet::new();
    let mut worklist = vec![Simulation::initial(size)];

    while let Some(simulation) = worklist.pop() {
        if !visited.insert(simulation.board_view()) {
            continue;
        }

        boards.insert(simulation.board_view());
        if simulation.is_finished() {
            boards.insert(simulation.opposite_board_view());
        } else {
            for mv in simulation.get_moves() {
                worklist.push(simulation.apply_move(mv)?);
            }
        }

        if boards.len() > max_states {
            return Err(BackendError::StateSpaceTooLarge { limit: max_states });
        }
        if visited.len() % 1_000_000 == 0 {
            debug!(visited = visited.len(), pending = worklist.len(), "enumerating boards");
        }
    }

    info!(
        rows = size.rows(),
        cols = size.cols(),
        boards = boards.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "enumerated reachable boards"
    );
    Ok(boards)
}

/// Backend with the full reachable set computed at construction.
///
/// Only practical for small boards: the set grows exponentially with the
/// number of cells (6x6 is feasible, 8x8 is not).
pub struct ExhaustiveBackend {
    size: BoardSize,
    boards: Arc<BoardSet>,
}

impl ExhaustiveBackend {
    pub fn new(size: BoardSize, max_states: usize) -> Result<Self, BackendError> {
        let boards = Arc::new(enumerate_reachable(size, max_states)?);
        Ok(ExhaustiveBackend { size, boards })
    }

    /// Rebuild from a set enumerated earlier, skipping the search. The set
    /// must belong to `size` and hold the starting position.
    pub fn from_boards(
        size: BoardSize,
        boards: BoardSet,
        max_states: usize,
    ) -> Result<Self, BackendError> {
        if boards.len() > max_states {
            return Err(BackendError::StateSpaceTooLarge { limit: max_states });
        }
        if let Some(board) = boards
            .iter()
            .find(|b| b.size() != size || !b.is_well_formed())
        {
            return Err(BackendError::InvalidBoardSet(format!(
                "board of size {}x{} in a {}x{} set",
                board.size().rows(),
                board.size().cols(),
                size.rows(),
                size.cols()
            )));
        }
        if !boards.contains(&Simulation::initial(size).board_view()) {
            return Err(BackendError::InvalidBoardSet(
                "starting position missing".to_string(),
            ));
        }

        info!(
            rows = size.rows(),
            cols = size.cols(),
            boards = boards.len(),
            "loaded reachable boards"
        );
        Ok(ExhaustiveBackend {
            size,
            boards: Arc::new(boards),
        })
    }

    /// The enumerated set in sorted order, for storage.
    pub fn sorted_boards(&self) -> Vec<CanonicalBoard> {
        let mut boards: Vec<CanonicalBoard> = self.boards.iter().copied().collect();
        boards.sort();
        boards
    }

    pub fn len(&self) -> usize {
        self.boards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }

    pub fn contains(&self, board: &CanonicalBoard) -> bool {
        self.boards.contains(board)
    }
}

impl Backend for ExhaustiveBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Exhaustive
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
        Ok(Arc::clone(&self.boards))
    }
}
