use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Largest board the canonical encoding can represent (one bit per cell).
pub const MAX_CELLS: usize = 128;

/// A board coordinate. Row 0 is the top row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Move {
    pub row: usize,
    pub col: usize,
}

impl Move {
    pub fn new(row: usize, col: usize) -> Self {
        Move { row, col }
    }
}

impl From<(usize, usize)> for Move {
    fn from((row, col): (usize, usize)) -> Self {
        Move { row, col }
    }
}

/// Validated board dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BoardSize {
    rows: usize,
    cols: usize,
}

impl BoardSize {
    /// Largest size for which exhaustive enumeration is practical.
    pub const SMALL: BoardSize = BoardSize { rows: 6, cols: 6 };
    pub const STANDARD: BoardSize = BoardSize { rows: 8, cols: 8 };

    pub fn new(rows: usize, cols: usize) -> Result<Self, ConfigError> {
        if rows < 2 || cols < 2 {
            return Err(ConfigError::Validation(format!(
                "board must be at least 2x2, got {rows}x{cols}"
            )));
        }
        if rows * cols > MAX_CELLS {
            return Err(ConfigError::Validation(format!(
                "board {rows}x{cols} exceeds {MAX_CELLS} cells"
            )));
        }
        Ok(BoardSize { rows, cols })
    }

    pub fn rows(self) -> usize {
        self.rows
    }

    pub fn cols(self) -> usize {
        self.cols
    }

    /// Total number of cells.
    pub fn cells(self) -> usize {
        self.rows * self.cols
    }

    pub fn contains(self, mv: Move) -> bool {
        mv.row < self.rows && mv.col < self.cols
    }

    /// Row-major index of a cell.
    pub(crate) fn index(self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    /// Step from `(row, col)` by `(dr, dc)`, or `None` when leaving the board.
    pub(crate) fn offset(self, row: usize, col: usize, dr: isize, dc: isize) -> Option<(usize, usize)> {
        let r = row.checked_add_signed(dr)?;
        let c = col.checked_add_signed(dc)?;
        (r < self.rows && c < self.cols).then_some((r, c))
    }

    /// All coordinates in row-major order.
    pub fn positions(self) -> impl Iterator<Item = Move> {
        let cols = self.cols;
        (0..self.cells()).map(move |idx| Move::new(idx / cols, idx % cols))
    }
}

impl Default for BoardSize {
    fn default() -> Self {
        BoardSize::STANDARD
    }
}
