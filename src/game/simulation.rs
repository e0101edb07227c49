use crate::error::MoveError;

use super::{Board, BoardSize, CanonicalBoard, Color, Move};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Winner(Color),
    Draw,
}

impl Outcome {
    /// Majority-disc rule on a board.
    pub fn of_board(board: &Board) -> Outcome {
        let black = board.disc_count(Color::Black);
        let white = board.disc_count(Color::White);
        if black > white {
            Outcome::Winner(Color::Black)
        } else if white > black {
            Outcome::Winner(Color::White)
        } else {
            Outcome::Draw
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulationStatus {
    Ongoing,
    Finished,
}

/// Turn-taking state machine over a board.
///
/// `turn` always names a side with at least one legal move while the game is
/// ongoing; a side without moves is skipped (pass).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Simulation {
    board: Board,
    turn: Color,
    status: SimulationStatus,
}

impl Simulation {
    /// Standard starting position with Black to move.
    pub fn initial(size: BoardSize) -> Self {
        Self::from_parts(Board::initial(size), Color::Black)
    }

    /// Resume from an arbitrary position. If `turn` cannot move but the other
    /// side can, the turn passes immediately.
    pub fn from_parts(board: Board, turn: Color) -> Self {
        let turn = if turn.is_player() { turn } else { Color::Black };
        let status = if board.is_finished() {
            SimulationStatus::Finished
        } else {
            SimulationStatus::Ongoing
        };
        let turn = if status == SimulationStatus::Ongoing && !board.has_any_moves(turn) {
            turn.opposite()
        } else {
            turn
        };
        Simulation {
            board,
            turn,
            status,
        }
    }

    /// Return to the starting position of the same size.
    pub fn reset(&mut self) {
        *self = Self::initial(self.board.size());
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Side to move
    pub fn turn(&self) -> Color {
        self.turn
    }

    pub fn status(&self) -> SimulationStatus {
        self.status
    }

    pub fn is_finished(&self) -> bool {
        self.status == SimulationStatus::Finished
    }

    /// Legal moves for the side to move; empty once finished.
    pub fn get_moves(&self) -> Vec<Move> {
        if self.is_finished() {
            return Vec::new();
        }
        self.board.legal_moves(self.turn)
    }

    /// Canonical identity from the side to move.
    pub fn board_view(&self) -> CanonicalBoard {
        self.board.relative_view(self.turn)
    }

    /// Canonical identity from the side not to move.
    pub fn opposite_board_view(&self) -> CanonicalBoard {
        self.board.relative_view(self.turn.opposite())
    }

    /// Apply a move and return the new simulation (immutable)
    pub fn apply_move(&self, mv: Move) -> Result<Simulation, MoveError> {
        let mut next = self.clone();
        next.make_move(mv)?;
        Ok(next)
    }

    /// Apply a move in place.
    pub fn make_move(&mut self, mv: Move) -> Result<(), MoveError> {
        if self.is_finished() {
            return Err(MoveError::IllegalMove {
                row: mv.row,
                col: mv.col,
                color: self.turn,
            });
        }

        self.board = self.board.apply_move(mv, self.turn)?;

        let other = self.turn.opposite();
        if self.board.has_any_moves(other) {
            self.turn = other;
        } else if !self.board.has_any_moves(self.turn) {
            self.status = SimulationStatus::Finished;
        }
        Ok(())
    }

    /// Winner by disc majority; fails while the game is ongoing.
    pub fn winner(&self) -> Result<Outcome, MoveError> {
        if !self.is_finished() {
            return Err(MoveError::GameInProgress);
        }
        Ok(Outcome::of_board(&self.board))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size4() -> BoardSize {
        BoardSize::new(4, 4).unwrap()
    }

    #[test]
    fn test_initial_simulation() {
        let sim = Simulation::initial(BoardSize::STANDARD);
        assert_eq!(sim.turn(), Color::Black);
        assert_eq!(sim.status(), SimulationStatus::Ongoing);
        assert_eq!(sim.get_moves().len(), 4);
    }

    #[test]
    fn test_make_move_switches_turn() {
        let mut sim = Simulation::initial(BoardSize::STANDARD);
        sim.make_move(Move::new(2, 3)).unwrap();
        assert_eq!(sim.turn(), Color::White);
        assert_eq!(sim.board().get(3, 3), Some(Color::Black));
    }

    #[test]
    fn test_forced_pass_keeps_turn() {
        // After Black takes (0, 2) White has no capture anywhere.
        let board = Board::parse(&["XO..", "....", "....", "XO.."]).unwrap();
        let mut sim = Simulation::from_parts(board, Color::Black);

        sim.make_move(Move::new(0, 2)).unwrap();

        assert_eq!(sim.turn(), Color::Black);
        assert!(!sim.is_finished());
        assert_eq!(sim.get_moves(), vec![Move::new(3, 2)]);
    }

    #[test]
    fn test_game_finishes_when_nobody_can_move() {
        let board = Board::parse(&["XO..", "....", "....", "XO.."]).unwrap();
        let mut sim = Simulation::from_parts(board, Color::Black);

        sim.make_move(Move::new(0, 2)).unwrap();
        sim.make_move(Move::new(3, 2)).unwrap();

        assert!(sim.is_finished());
        assert_eq!(sim.winner(), Ok(Outcome::Winner(Color::Black)));
        assert!(sim.get_moves().is_empty());
    }

    #[test]
    fn test_winner_fails_while_ongoing() {
        let sim = Simulation::initial(size4());
        assert_eq!(sim.winner(), Err(MoveError::GameInProgress));
    }

    #[test]
    fn test_illegal_move_leaves_simulation_unchanged() {
        let sim = Simulation::initial(size4());
        let before = sim.clone();
        let mut after = sim.clone();
        assert!(after.make_move(Move::new(0, 0)).is_err());
        assert_eq!(after, before);
        assert!(sim.apply_move(Move::new(3, 3)).is_err());
    }

    #[test]
    fn test_move_after_finish_is_illegal() {
        let board = Board::parse(&["XXOO", "OOXX", "XOXO", "OXOX"]).unwrap();
        let mut sim = Simulation::from_parts(board, Color::Black);
        assert!(sim.is_finished());
        assert!(matches!(
            sim.make_move(Move::new(0, 0)),
            Err(MoveError::IllegalMove { .. })
        ));
    }

    #[test]
    fn test_full_board_is_finished_with_draw() {
        let board = Board::parse(&["XXOO", "OOXX", "XOXO", "OXOX"]).unwrap();
        let sim = Simulation::from_parts(board, Color::White);
        assert!(sim.is_finished());
        assert_eq!(sim.winner(), Ok(Outcome::Draw));
    }

    #[test]
    fn test_from_parts_passes_immobile_side() {
        let board = Board::parse(&["XO..", "....", "....", "XO.."]).unwrap();
        let sim = Simulation::from_parts(board, Color::White);
        assert_eq!(sim.turn(), Color::Black);
    }

    #[test]
    fn test_views_are_swaps_of_each_other() {
        let sim = Simulation::initial(size4())
            .apply_move(Move::new(0, 1))
            .unwrap();
        assert_eq!(sim.board_view().swapped(), sim.opposite_board_view());
        assert_eq!(sim.board_view(), sim.board().relative_view(Color::White));
    }

    #[test]
    fn test_reset_restores_initial_position() {
        let mut sim = Simulation::initial(size4());
        sim.make_move(Move::new(0, 1)).unwrap();
        sim.reset();
        assert_eq!(sim, Simulation::initial(size4()));
    }

    #[test]
    fn test_random_playouts_respect_pass_law() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let mut sim = Simulation::initial(BoardSize::SMALL);
            while !sim.is_finished() {
                let moves = sim.get_moves();
                let mv = moves[rng.random_range(0..moves.len())];
                let mover = sim.turn();
                let next_board = sim.board().apply_move(mv, mover).unwrap();
                sim.make_move(mv).unwrap();

                if next_board.has_any_moves(mover.opposite()) {
                    assert_eq!(sim.turn(), mover.opposite());
                } else {
                    assert_eq!(sim.turn(), mover);
                }
                assert_eq!(
                    sim.is_finished(),
                    next_board.legal_moves(Color::Black).is_empty()
                        && next_board.legal_moves(Color::White).is_empty()
                );
            }
        }
    }
}
