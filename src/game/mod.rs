//! Core Reversi game logic: coordinates, board with capture rules,
//! perspective-relative board identity, and the turn-taking state machine.

mod board;
mod canonical;
mod color;
mod position;
mod simulation;

pub use board::Board;
pub use canonical::{CanonicalBoard, RelativeCell};
pub use color::Color;
pub use position::{BoardSize, Move, MAX_CELLS};
pub use simulation::{Outcome, Simulation, SimulationStatus};
