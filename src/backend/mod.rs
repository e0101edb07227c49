//! Move and transition providers. The live backend answers every query from
//! the board rules; the exhaustive backend additionally enumerates every
//! reachable board up front so that planners can sweep the full state space.

mod exhaustive;
mod live;

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{BackendError, MoveError};
use crate::game::{Board, BoardSize, CanonicalBoard, Color, Move, Outcome};

pub use exhaustive::{enumerate_reachable, ExhaustiveBackend};
pub use live::LiveBackend;

/// Canonical identities of every board reachable from the starting position.
pub type BoardSet = HashSet<CanonicalBoard>;

/// Which backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Live,
    Exhaustive,
}

/// What moves exist and what happens next.
pub trait Backend: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn size(&self) -> BoardSize;

    /// Legal moves for `turn` on `board`.
    fn legal_moves(&self, board: &Board, turn: Color) -> Vec<Move>;

    /// Play `mv` for `turn` and return the new board with the side to move
    /// next. The turn stays with the mover when the opponent has no reply.
    fn apply(&self, board: &Board, turn: Color, mv: Move) -> Result<(Board, Color), MoveError>;

    /// Outcome of a finished board, `None` while either side can move.
    fn winner(&self, board: &Board) -> Option<Outcome>;

    /// All boards reachable from the starting position.
    fn reachable_boards(&self) -> Result<Arc<BoardSet>, BackendError>;
}

/// Construct the backend selected by `kind`.
pub fn build_backend(
    kind: BackendKind,
    size: BoardSize,
    max_states: usize,
) -> Result<Arc<dyn Backend>, BackendError> {
    Ok(match kind {
        BackendKind::Live => Arc::new(LiveBackend::new(size, max_states)),
        BackendKind::Exhaustive => Arc::new(ExhaustiveBackend::new(size, max_states)?),
    })
}

/// Shared rule implementation behind both backends.
fn apply_rules(board: &Board, turn: Color, mv: Move) -> Result<(Board, Color), MoveError> {
    let next = board.apply_move(mv, turn)?;
    let next_turn = if next.has_any_moves(turn.opposite()) {
        turn.opposite()
    } else {
        turn
    };
    Ok((next, next_turn))
}

fn winner_by_rules(board: &Board) -> Option<Outcome> {
    board.is_finished().then(|| Outcome::of_board(board))
}
