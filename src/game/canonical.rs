use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Board, BoardSize, Color, Move};

/// A cell as seen from one player's seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelativeCell {
    Empty,
    Own,
    Opponent,
}

/// Perspective-relative board identity.
///
/// Two boards that look the same from their respective players' seats map to
/// the same value, so this is usable directly as a table key. Cells are
/// packed into one bit per cell for each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CanonicalBoard {
    size: BoardSize,
    own: u128,
    opponent: u128,
}

impl CanonicalBoard {
    pub(crate) fn from_board(board: &Board, perspective: Color) -> Self {
        let mut own = 0u128;
        let mut opponent = 0u128;
        for (idx, &cell) in board.cells().iter().enumerate() {
            if cell == Color::Empty {
                continue;
            }
            if cell == perspective {
                own |= 1u128 << idx;
            } else {
                opponent |= 1u128 << idx;
            }
        }
        CanonicalBoard {
            size: board.size(),
            own,
            opponent,
        }
    }

    pub fn size(&self) -> BoardSize {
        self.size
    }

    /// Cell at `(row, col)` from the owner's side, `None` off the board.
    pub fn get(&self, row: usize, col: usize) -> Option<RelativeCell> {
        if !self.size.contains(Move::new(row, col)) {
            return None;
        }
        let bit = 1u128 << self.size.index(row, col);
        Some(if self.own & bit != 0 {
            RelativeCell::Own
        } else if self.opponent & bit != 0 {
            RelativeCell::Opponent
        } else {
            RelativeCell::Empty
        })
    }

    pub fn own_count(&self) -> usize {
        self.own.count_ones() as usize
    }

    pub fn opponent_count(&self) -> usize {
        self.opponent.count_ones() as usize
    }

    /// The identity seen from the other seat.
    pub fn swapped(&self) -> Self {
        CanonicalBoard {
            size: self.size,
            own: self.opponent,
            opponent: self.own,
        }
    }

    /// Rebuild an absolute board, giving the own discs to `perspective`.
    pub fn to_board(&self, perspective: Color) -> Board {
        let cells = (0..self.size.cells())
            .map(|idx| {
                let bit = 1u128 << idx;
                if self.own & bit != 0 {
                    perspective
                } else if self.opponent & bit != 0 {
                    perspective.opposite()
                } else {
                    Color::Empty
                }
            })
            .collect();
        Board::with_cells(self.size, cells)
    }

    /// Discs only on cells of the board, never two on one cell.
    pub fn is_well_formed(&self) -> bool {
        let cells = self.size.cells();
        let mask = if cells >= u128::BITS as usize {
            u128::MAX
        } else {
            (1u128 << cells) - 1
        };
        self.own & self.opponent == 0 && (self.own | self.opponent) & !mask == 0
    }

    /// Neither seat has a legal move.
    pub fn is_finished(&self) -> bool {
        self.to_board(Color::Black).is_finished()
    }
}

impl fmt::Display for CanonicalBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Own discs render as Black.
        write!(f, "{}", self.to_board(Color::Black))
    }
}
