use std::collections::BTreeMap;
use std::sync::Arc;

use crate::backend::{Backend, BoardSet};
use crate::error::{BackendError, MoveError};
use crate::game::{Board, BoardSize, Color, Move};

use super::{RewardPolicy, State};

/// Seat used to rebuild absolute boards from states. Own discs become this
/// color, opponent discs the other one.
const DECIDER: Color = Color::Black;

/// Next-state probabilities, ordered by state for deterministic iteration.
pub type Distribution = BTreeMap<State, f64>;

/// The only view of the environment an online learner gets.
pub trait ActionSource: Send + Sync {
    /// Legal actions in `state`; empty for terminal states.
    fn possible_actions(&self, state: &State) -> Vec<Move>;
}

/// Every reachable state. Iterating does not consume it, so a planner can
/// sweep it repeatedly.
#[derive(Debug, Clone)]
pub struct StateSpace {
    boards: Arc<BoardSet>,
}

impl StateSpace {
    pub fn iter(&self) -> impl Iterator<Item = State> + '_ {
        self.boards.iter().copied().map(State::new)
    }

    pub fn len(&self) -> usize {
        self.boards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }

    pub fn contains(&self, state: &State) -> bool {
        self.boards.contains(state.board())
    }
}

/// MDP adapter over a backend.
pub struct Environment {
    backend: Arc<dyn Backend>,
    reward_policy: RewardPolicy,
}

impl Environment {
    pub fn new(backend: Arc<dyn Backend>, reward_policy: RewardPolicy) -> Self {
        Environment {
            backend,
            reward_policy,
        }
    }

    pub fn size(&self) -> BoardSize {
        self.backend.size()
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn reward_policy(&self) -> RewardPolicy {
        self.reward_policy
    }

    /// State of `board` for the player of `perspective`.
    pub fn state_of(&self, board: &Board, perspective: Color) -> State {
        State::from_board(board, perspective)
    }

    /// Absolute board for a state, with the decider playing Black.
    pub fn board_of(&self, state: &State) -> Board {
        state.board().to_board(DECIDER)
    }

    /// All states reachable from the starting position.
    pub fn all_states(&self) -> Result<StateSpace, BackendError> {
        Ok(StateSpace {
            boards: self.backend.reachable_boards()?,
        })
    }

    pub fn possible_actions(&self, state: &State) -> Vec<Move> {
        let board = self.board_of(state);
        if self.backend.winner(&board).is_some() {
            return Vec::new();
        }
        self.backend.legal_moves(&board, DECIDER)
    }

    pub fn is_terminal(&self, state: &State) -> bool {
        self.backend.winner(&self.board_of(state)).is_some()
    }

    /// Distribution over the decider's next decision point after playing
    /// `action`: the opponent answers uniformly at random, as many times in
    /// a row as the pass rule demands. Finished boards end the chain.
    pub fn next_state_distribution(
        &self,
        state: &State,
        action: Move,
    ) -> Result<Distribution, MoveError> {
        let board = self.board_of(state);
        let mut distribution = Distribution::new();
        let mut pending = vec![(self.backend.apply(&board, DECIDER, action)?, 1.0)];

        while let Some(((board, turn), probability)) = pending.pop() {
            if turn == DECIDER || self.backend.winner(&board).is_some() {
                *distribution
                    .entry(self.state_of(&board, DECIDER))
                    .or_insert(0.0) += probability;
                continue;
            }

            let replies = self.backend.legal_moves(&board, turn);
            let share = probability / replies.len() as f64;
            for reply in replies {
                pending.push((self.backend.apply(&board, turn, reply)?, share));
            }
        }

        Ok(distribution)
    }

    /// Reward for reaching `next_state`. Zero unless the game is over there.
    pub fn reward(&self, _state: &State, _action: Move, next_state: &State) -> f64 {
        if !self.is_terminal(next_state) {
            return 0.0;
        }
        let board = next_state.board();
        self.reward_policy
            .terminal_reward(board.own_count(), board.opponent_count())
    }
}

impl ActionSource for Environment {
    fn possible_actions(&self, state: &State) -> Vec<Move> {
        Environment::possible_actions(self, state)
    }
}
