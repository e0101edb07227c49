use std::fmt;

use crate::error::{ConfigError, MoveError};

use super::canonical::CanonicalBoard;
use super::{BoardSize, Color, Move};

const DIRECTIONS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// A rows x cols grid of cells.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Board {
    size: BoardSize,
    cells: Vec<Color>,
}

impl Board {
    /// Create a board with every cell empty.
    pub fn empty(size: BoardSize) -> Self {
        Board {
            size,
            cells: vec![Color::Empty; size.cells()],
        }
    }

    /// Create the standard starting position: four discs around the center,
    /// White on the main diagonal and Black on the anti-diagonal.
    pub fn initial(size: BoardSize) -> Self {
        let mut board = Self::empty(size);
        let (r, c) = (size.rows() / 2, size.cols() / 2);
        board.set(r - 1, c - 1, Color::White);
        board.set(r - 1, c, Color::Black);
        board.set(r, c - 1, Color::Black);
        board.set(r, c, Color::White);
        board
    }

    /// Build a board from row-major cells.
    pub fn from_cells(size: BoardSize, cells: Vec<Color>) -> Result<Self, ConfigError> {
        if cells.len() != size.cells() {
            return Err(ConfigError::Validation(format!(
                "expected {} cells, got {}",
                size.cells(),
                cells.len()
            )));
        }
        Ok(Board::with_cells(size, cells))
    }

    pub(super) fn with_cells(size: BoardSize, cells: Vec<Color>) -> Self {
        debug_assert_eq!(cells.len(), size.cells());
        Board { size, cells }
    }

    /// Parse a board from text rows: `X` is Black, `O` is White, `.` is empty.
    pub fn parse(rows: &[&str]) -> Result<Self, ConfigError> {
        let cols = rows.first().map_or(0, |r| r.chars().count());
        let size = BoardSize::new(rows.len(), cols)?;
        let mut cells = Vec::with_capacity(size.cells());
        for row in rows {
            if row.chars().count() != cols {
                return Err(ConfigError::Validation("ragged board rows".into()));
            }
            for ch in row.chars() {
                cells.push(match ch {
                    'X' => Color::Black,
                    'O' => Color::White,
                    '.' => Color::Empty,
                    other => {
                        return Err(ConfigError::Validation(format!(
                            "unexpected board character '{other}'"
                        )))
                    }
                });
            }
        }
        Self::from_cells(size, cells)
    }

    pub fn size(&self) -> BoardSize {
        self.size
    }

    /// Get the cell at a specific position, `None` off the board.
    pub fn get(&self, row: usize, col: usize) -> Option<Color> {
        self.size
            .contains(Move::new(row, col))
            .then(|| self.at(row, col))
    }

    /// Callers have already bounds-checked `(row, col)`.
    fn at(&self, row: usize, col: usize) -> Color {
        self.cells[self.size.index(row, col)]
    }

    fn set(&mut self, row: usize, col: usize, color: Color) {
        let idx = self.size.index(row, col);
        self.cells[idx] = color;
    }

    pub fn cells(&self) -> &[Color] {
        &self.cells
    }

    /// Discs of `color` that playing `mv` would capture. Empty when the move
    /// is not legal.
    pub fn flips(&self, mv: Move, color: Color) -> Vec<Move> {
        let mut flipped = Vec::new();
        if !color.is_player() || !self.size.contains(mv) || self.at(mv.row, mv.col) != Color::Empty {
            return flipped;
        }
        let opponent = color.opposite();

        for (dr, dc) in DIRECTIONS {
            let mut line = Vec::new();
            let mut pos = self.size.offset(mv.row, mv.col, dr, dc);
            while let Some((r, c)) = pos {
                let cell = self.at(r, c);
                if cell == opponent {
                    line.push(Move::new(r, c));
                } else {
                    if cell == color {
                        flipped.extend_from_slice(&line);
                    }
                    break;
                }
                pos = self.size.offset(r, c, dr, dc);
            }
        }

        flipped
    }

    /// Whether `mv` captures at least one disc for `color`.
    pub fn is_legal(&self, mv: Move, color: Color) -> bool {
        !self.flips(mv, color).is_empty()
    }

    /// Legal destination cells for `color`, in row-major order.
    pub fn legal_moves(&self, color: Color) -> Vec<Move> {
        self.size
            .positions()
            .filter(|&mv| self.is_legal(mv, color))
            .collect()
    }

    pub fn has_any_moves(&self, color: Color) -> bool {
        self.size.positions().any(|mv| self.is_legal(mv, color))
    }

    /// Neither side can move.
    pub fn is_finished(&self) -> bool {
        !self.has_any_moves(Color::Black) && !self.has_any_moves(Color::White)
    }

    /// Place `color` at `mv` and flip every captured line. The receiver is
    /// left untouched.
    pub fn apply_move(&self, mv: Move, color: Color) -> Result<Board, MoveError> {
        let flipped = self.flips(mv, color);
        if flipped.is_empty() {
            return Err(MoveError::IllegalMove {
                row: mv.row,
                col: mv.col,
                color,
            });
        }

        let mut next = self.clone();
        next.set(mv.row, mv.col, color);
        for pos in flipped {
            next.set(pos.row, pos.col, color);
        }
        Ok(next)
    }

    /// Number of cells holding `color` (`Color::Empty` counts empty cells).
    pub fn disc_count(&self, color: Color) -> usize {
        self.cells.iter().filter(|&&c| c == color).count()
    }

    pub fn is_full(&self) -> bool {
        self.disc_count(Color::Empty) == 0
    }

    /// The board re-labelled as own/opponent cells from `perspective`.
    pub fn relative_view(&self, perspective: Color) -> CanonicalBoard {
        CanonicalBoard::from_board(self, perspective)
    }

    /// The same board with Black and White exchanged.
    pub fn swapped(&self) -> Board {
        Board {
            size: self.size,
            cells: self.cells.iter().map(|c| c.opposite()).collect(),
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.size.rows() {
            if row > 0 {
                writeln!(f)?;
            }
            for col in 0..self.size.cols() {
                let ch = match self.at(row, col) {
                    Color::Black => 'X',
                    Color::White => 'O',
                    Color::Empty => '.',
                };
                write!(f, "{ch}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> BoardSize {
        BoardSize::new(4, 4).unwrap()
    }

    #[test]
    fn test_initial_board_has_four_discs() {
        let board = Board::initial(BoardSize::STANDARD);
        assert_eq!(board.disc_count(Color::Black), 2);
        assert_eq!(board.disc_count(Color::White), 2);
        assert_eq!(board.disc_count(Color::Empty), 60);
        assert_eq!(board.get(3, 3), Some(Color::White));
        assert_eq!(board.get(3, 4), Some(Color::Black));
        assert_eq!(board.get(4, 3), Some(Color::Black));
        assert_eq!(board.get(4, 4), Some(Color::White));
    }

    #[test]
    fn test_initial_black_has_four_single_flip_moves() {
        let board = Board::initial(BoardSize::STANDARD);
        let moves = board.legal_moves(Color::Black);
        assert_eq!(
            moves,
            vec![Move::new(2, 3), Move::new(3, 2), Move::new(4, 5), Move::new(5, 4)]
        );
        for mv in moves {
            assert_eq!(board.flips(mv, Color::Black).len(), 1, "move {mv:?}");
        }
    }

    #[test]
    fn test_apply_move_flips_captured_disc() {
        let board = Board::initial(BoardSize::STANDARD);
        let next = board.apply_move(Move::new(2, 3), Color::Black).unwrap();

        assert_eq!(next.get(2, 3), Some(Color::Black));
        assert_eq!(next.get(3, 3), Some(Color::Black));
        assert_eq!(next.disc_count(Color::Black), 4);
        assert_eq!(next.disc_count(Color::White), 1);
        // The original is not mutated
        assert_eq!(board.get(3, 3), Some(Color::White));
    }

    #[test]
    fn test_illegal_move_fails_and_leaves_board_unchanged() {
        let board = Board::initial(BoardSize::STANDARD);
        let before = board.clone();

        let err = board.apply_move(Move::new(0, 0), Color::Black).unwrap_err();
        assert_eq!(
            err,
            MoveError::IllegalMove {
                row: 0,
                col: 0,
                color: Color::Black
            }
        );
        assert_eq!(board, before);
    }

    #[test]
    fn test_occupied_and_out_of_bounds_cells_are_illegal() {
        let board = Board::initial(small());
        assert!(board.apply_move(Move::new(1, 1), Color::Black).is_err());
        assert!(board.apply_move(Move::new(9, 9), Color::Black).is_err());
        assert!(board.apply_move(Move::new(0, 1), Color::Empty).is_err());
    }

    #[test]
    fn test_multi_direction_capture() {
        let board = Board::parse(&["XXXO", "OOOO", "..XO"]).unwrap();
        let next = board.apply_move(Move::new(2, 0), Color::Black).unwrap();
        assert_eq!(next.to_string(), "XXXO\nXXOO\nX.XO");
    }

    #[test]
    fn test_disc_counts_sum_to_cell_count() {
        let size = BoardSize::new(3, 4).unwrap();
        let reachable = crate::backend::enumerate_reachable(size, 1_000_000).unwrap();
        assert!(reachable.len() > 1);
        for view in &reachable {
            let board = view.to_board(Color::Black);
            let empty = board.cells().iter().filter(|&&c| c == Color::Empty).count();
            assert_eq!(
                board.disc_count(Color::Black) + board.disc_count(Color::White) + empty,
                size.cells(),
                "{board}"
            );
            assert_eq!(board.disc_count(Color::Empty), empty);
        }
    }

    #[test]
    fn test_get_is_none_off_the_board() {
        let board = Board::initial(small());
        assert_eq!(board.get(0, 0), Some(Color::Empty));
        assert_eq!(board.get(4, 0), None);
        assert_eq!(board.get(0, 4), None);
        assert_eq!(board.get(usize::MAX, usize::MAX), None);
    }

    #[test]
    fn test_full_board_is_finished() {
        let board = Board::parse(&["XXOO", "OOXX", "XOXO", "OXOX"]).unwrap();
        assert!(board.is_full());
        assert!(board.is_finished());
    }

    #[test]
    fn test_parse_rejects_ragged_rows() {
        assert!(Board::parse(&["XX", "X"]).is_err());
        assert!(Board::parse(&["X?", "XX"]).is_err());
    }

    #[test]
    fn test_swapped_exchanges_colors() {
        let board = Board::initial(small()).swapped();
        assert_eq!(board.get(1, 1), Some(Color::Black));
        assert_eq!(board.get(1, 2), Some(Color::White));
    }
}
