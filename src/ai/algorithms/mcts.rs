use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use tracing::debug;

use crate::ai::agent::{Agent, AgentSetup, Capability};
use crate::backend::Backend;
use crate::env::{Environment, State};
use crate::error::AgentError;
use crate::game::{Board, Color, Move, Outcome};

/// Seat the searching agent plays in the rebuilt board.
const ROOT: Color = Color::Black;

// ─── Config ──────────────────────────────────────────────────────────────────

/// Monte Carlo tree search parameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MctsConfig {
    /// Search iterations per move.
    pub iterations: usize,
    /// Optional wall-clock budget per move. Search stops at whichever limit
    /// is reached first.
    pub time_limit_ms: Option<u64>,
    /// Exploration constant in the UCT formula.
    pub exploration: f64,
}

impl Default for MctsConfig {
    fn default() -> Self {
        MctsConfig {
            iterations: 1000,
            time_limit_ms: None,
            exploration: 1.41,
        }
    }
}

// ─── Rollout ─────────────────────────────────────────────────────────────────

/// Move choice during the simulation phase.
pub trait RolloutPolicy: Send {
    fn choose(&mut self, board: &Board, turn: Color, moves: &[Move], rng: &mut StdRng) -> Move;
}

/// Uniformly random playouts.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformRollout;

impl RolloutPolicy for UniformRollout {
    fn choose(&mut self, _board: &Board, _turn: Color, moves: &[Move], rng: &mut StdRng) -> Move {
        moves[rng.random_range(0..moves.len())]
    }
}

/// Value of a finished game for the root player: 1 win, 0.5 draw, 0 loss.
fn outcome_value(outcome: Outcome) -> f64 {
    match outcome {
        Outcome::Winner(c) if c == ROOT => 1.0,
        Outcome::Winner(_) => 0.0,
        Outcome::Draw => 0.5,
    }
}

// ─── Tree (arena-based) ──────────────────────────────────────────────────────

struct MctsNode {
    board: Board,
    /// Player to move; meaningless once `outcome` is set.
    turn: Color,
    outcome: Option<Outcome>,
    /// Move that led here from the parent.
    action: Option<Move>,
    children: Vec<usize>,
    untried: Vec<Move>,
    visit_count: u32,
    /// Cumulative value from the root player's perspective.
    value_sum: f64,
}

impl MctsNode {
    fn new(backend: &dyn Backend, board: Board, turn: Color, action: Option<Move>) -> Self {
        let outcome = backend.winner(&board);
        let untried = if outcome.is_some() {
            Vec::new()
        } else {
            backend.legal_moves(&board, turn)
        };
        MctsNode {
            board,
            turn,
            outcome,
            action,
            children: Vec::new(),
            untried,
            visit_count: 0,
            value_sum: 0.0,
        }
    }

    fn mean_value(&self) -> f64 {
        if self.visit_count == 0 {
            0.0
        } else {
            self.value_sum / self.visit_count as f64
        }
    }
}

struct MctsTree {
    nodes: Vec<MctsNode>,
}

impl MctsTree {
    fn new(root: MctsNode) -> Self {
        let mut nodes = Vec::with_capacity(512);
        nodes.push(root);
        MctsTree { nodes }
    }

    /// Child of `node_idx` with the highest UCT score for the player to move
    /// there. Unvisited children win outright.
    fn select_best_child(&self, node_idx: usize, exploration: f64) -> Option<usize> {
        let node = &self.nodes[node_idx];
        let ln_parent = (node.visit_count.max(1) as f64).ln();

        let mut best = None;
        let mut best_score = f64::NEG_INFINITY;
        for &ci in &node.children {
            let child = &self.nodes[ci];
            let score = if child.visit_count == 0 {
                f64::INFINITY
            } else {
                let q = if node.turn == ROOT {
                    child.mean_value()
                } else {
                    1.0 - child.mean_value()
                };
                q + exploration * (ln_parent / child.visit_count as f64).sqrt()
            };
            if score > best_score {
                best_score = score;
                best = Some(ci);
            }
        }
        best
    }

    /// Most visited root child; the first one wins ties.
    fn robust_child(&self) -> Option<Move> {
        let mut best: Option<(&MctsNode, u32)> = None;
        for &ci in &self.nodes[0].children {
            let child = &self.nodes[ci];
            if best.map_or(true, |(_, v)| child.visit_count > v) {
                best = Some((child, child.visit_count));
            }
        }
        best.and_then(|(node, _)| node.action)
    }

    fn backup(&mut self, path: &[usize], value: f64) {
        for &idx in path {
            self.nodes[idx].visit_count += 1;
            self.nodes[idx].value_sum += value;
        }
    }
}

// ─── Agent ───────────────────────────────────────────────────────────────────

/// UCT search over the real game rules. Needs no learning.
pub struct MctsAgent {
    config: MctsConfig,
    rng: StdRng,
    rollout: Box<dyn RolloutPolicy>,
    env: Option<Arc<Environment>>,
    learning: bool,
}

impl MctsAgent {
    pub const NAME: &'static str = "mcts";

    pub fn new(config: MctsConfig, seed: u64) -> Self {
        Self::with_rollout(config, seed, Box::new(UniformRollout))
    }

    pub fn with_rollout(config: MctsConfig, seed: u64, rollout: Box<dyn RolloutPolicy>) -> Self {
        MctsAgent {
            config,
            rng: StdRng::seed_from_u64(seed),
            rollout,
            env: None,
            learning: false,
        }
    }

    /// Search from `board` with `ROOT` to move and return the robust child.
    fn search(&mut self, backend: &dyn Backend, board: Board) -> Result<Move, AgentError> {
        let mut tree = MctsTree::new(MctsNode::new(backend, board, ROOT, None));
        let deadline = self
            .config
            .time_limit_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms));

        let mut iterations = 0;
        while iterations < self.config.iterations.max(1) {
            if iterations > 0 && deadline.is_some_and(|d| Instant::now() >= d) {
                break;
            }
            self.run_iteration(backend, &mut tree)?;
            iterations += 1;
        }

        debug!(
            iterations,
            nodes = tree.nodes.len(),
            root_visits = tree.nodes[0].visit_count,
            "MCTS search finished"
        );
        tree.robust_child().ok_or(AgentError::NoActions)
    }

    fn run_iteration(&mut self, backend: &dyn Backend, tree: &mut MctsTree) -> Result<(), AgentError> {
        let mut path = vec![0];
        let mut current = 0;

        // Selection.
        while tree.nodes[current].untried.is_empty() && tree.nodes[current].outcome.is_none() {
            match tree.select_best_child(current, self.config.exploration) {
                Some(next) => {
                    current = next;
                    path.push(current);
                }
                None => break,
            }
        }

        // Expansion.
        if !tree.nodes[current].untried.is_empty() {
            let pick = self.rng.random_range(0..tree.nodes[current].untried.len());
            let action = tree.nodes[current].untried.swap_remove(pick);
            let node = &tree.nodes[current];
            let (board, turn) = backend.apply(&node.board, node.turn, action)?;
            let child = MctsNode::new(backend, board, turn, Some(action));
            tree.nodes.push(child);
            let child_idx = tree.nodes.len() - 1;
            tree.nodes[current].children.push(child_idx);
            current = child_idx;
            path.push(current);
        }

        // Simulation.
        let node = &tree.nodes[current];
        let outcome = match node.outcome {
            Some(outcome) => outcome,
            None => self.playout(backend, node.board.clone(), node.turn)?,
        };

        tree.backup(&path, outcome_value(outcome));
        Ok(())
    }

    fn playout(
        &mut self,
        backend: &dyn Backend,
        mut board: Board,
        mut turn: Color,
    ) -> Result<Outcome, AgentError> {
        loop {
            if let Some(outcome) = backend.winner(&board) {
                return Ok(outcome);
            }
            let moves = backend.legal_moves(&board, turn);
            if moves.is_empty() {
                return Err(AgentError::NoActions);
            }
            let mv = self.rollout.choose(&board, turn, &moves, &mut self.rng);
            (board, turn) = backend.apply(&board, turn, mv)?;
        }
    }
}

impl Agent for MctsAgent {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn capability(&self) -> Capability {
        Capability::Passive
    }

    fn initialize(&mut self, setup: AgentSetup) -> Result<(), AgentError> {
        match setup {
            AgentSetup::Passive(env) => {
                self.env = Some(env);
                Ok(())
            }
            AgentSetup::Active(_) => Err(AgentError::NotInitialized {
                agent: Self::NAME.to_string(),
            }),
        }
    }

    fn get_action(&mut self, state: &State) -> Result<Move, AgentError> {
        let env = self.env.clone().ok_or_else(|| AgentError::NotInitialized {
            agent: Self::NAME.to_string(),
        })?;
        let actions = env.possible_actions(state);
        match actions.as_slice() {
            [] => Err(AgentError::NoActions),
            [only] => Ok(*only),
            _ => {
                let board = env.board_of(state);
                self.search(env.backend().as_ref(), board)
            }
        }
    }

    fn is_learning(&self) -> bool {
        self.learning
    }

    fn set_learning(&mut self, learning: bool) {
        self.learning = learning;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::backend::{BackendKind, BoardSet, LiveBackend};
    use crate::env::RewardPolicy;
    use crate::error::{BackendError, MoveError};
    use crate::game::BoardSize;

    fn env(rows: usize, cols: usize) -> Arc<Environment> {
        let size = BoardSize::new(rows, cols).unwrap();
        Arc::new(Environment::new(
            Arc::new(LiveBackend::new(size, 100_000)),
            RewardPolicy::WinLoss,
        ))
    }

    fn small_config() -> MctsConfig {
        MctsConfig {
            iterations: 200,
            ..Default::default()
        }
    }

    fn agent(env: &Arc<Environment>, seed: u64) -> MctsAgent {
        let mut agent = MctsAgent::new(small_config(), seed);
        agent.initialize(AgentSetup::Passive(env.clone())).unwrap();
        agent
    }

    #[test]
    fn test_mcts_agent_selects_legal_action() {
        let env = env(4, 4);
        let mut agent = agent(&env, 1);
        let state = env.state_of(&Board::initial(env.size()), Color::Black);
        let legal = env.possible_actions(&state);
        for _ in 0..3 {
            let action = agent.get_action(&state).unwrap();
            assert!(legal.contains(&action), "action {:?} not legal", action);
        }
    }

    #[test]
    fn test_mcts_avoids_losing_move() {
        let env = env(3, 4);
        let mut agent = agent(&env, 5);
        let board = Board::parse(&["XXXO", "OOOO", "..XO"]).unwrap();
        let state = env.state_of(&board, Color::Black);
        assert_eq!(agent.get_action(&state).unwrap(), Move::new(2, 0));
    }

    #[test]
    fn test_mcts_same_seed_same_choice() {
        let env = env(4, 4);
        let state = env.state_of(&Board::initial(env.size()), Color::Black);
        let first = agent(&env, 9).get_action(&state).unwrap();
        let second = agent(&env, 9).get_action(&state).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_mcts_requires_passive_setup() {
        let env = env(4, 4);
        let mut agent = MctsAgent::new(small_config(), 0);
        assert!(agent.initialize(AgentSetup::Active(env.clone())).is_err());

        let state = env.state_of(&Board::initial(env.size()), Color::Black);
        assert!(matches!(
            agent.get_action(&state),
            Err(AgentError::NotInitialized { .. })
        ));
    }

    struct CountingRollout(Arc<AtomicUsize>);

    impl RolloutPolicy for CountingRollout {
        fn choose(&mut self, _board: &Board, _turn: Color, moves: &[Move], _rng: &mut StdRng) -> Move {
            self.0.fetch_add(1, Ordering::Relaxed);
            moves[0]
        }
    }

    #[test]
    fn test_custom_rollout_policy_is_used() {
        let env = env(4, 4);
        let calls = Arc::new(AtomicUsize::new(0));
        let mut agent = MctsAgent::with_rollout(
            small_config(),
            0,
            Box::new(CountingRollout(calls.clone())),
        );
        agent.initialize(AgentSetup::Passive(env.clone())).unwrap();

        let state = env.state_of(&Board::initial(env.size()), Color::Black);
        agent.get_action(&state).unwrap();
        assert!(calls.load(Ordering::Relaxed) > 0);
    }

    #[test]
    fn test_time_limit_bounds_search() {
        let env = env(4, 4);
        let config = MctsConfig {
            iterations: usize::MAX,
            time_limit_ms: Some(20),
            ..Default::default()
        };
        let mut agent = MctsAgent::new(config, 0);
        agent.initialize(AgentSetup::Passive(env.clone())).unwrap();

        let state = env.state_of(&Board::initial(env.size()), Color::Black);
        let start = Instant::now();
        let action = agent.get_action(&state).unwrap();
        assert!(env.possible_actions(&state).contains(&action));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_backup_accumulates_root_perspective() {
        let env = env(4, 4);
        let backend: &dyn Backend = env.backend().as_ref();
        let board = Board::initial(env.size());
        let mut tree = MctsTree::new(MctsNode::new(backend, board.clone(), ROOT, None));
        let (child_board, turn) = backend.apply(&board, ROOT, Move::new(0, 1)).unwrap();
        tree.nodes
            .push(MctsNode::new(backend, child_board, turn, Some(Move::new(0, 1))));
        tree.nodes[0].children.push(1);

        tree.backup(&[0, 1], 1.0);
        tree.backup(&[0, 1], 0.5);

        assert_eq!(tree.nodes[0].visit_count, 2);
        assert_eq!(tree.nodes[1].visit_count, 2);
        assert!((tree.nodes[1].mean_value() - 0.75).abs() < 1e-12);
        assert_eq!(tree.robust_child(), Some(Move::new(0, 1)));
    }

    #[test]
    fn test_select_prefers_unvisited_child() {
        let env = env(4, 4);
        let backend: &dyn Backend = env.backend().as_ref();
        let board = Board::initial(env.size());
        let mut tree = MctsTree::new(MctsNode::new(backend, board.clone(), ROOT, None));
        for mv in [Move::new(0, 1), Move::new(1, 0)] {
            let (b, t) = backend.apply(&board, ROOT, mv).unwrap();
            tree.nodes.push(MctsNode::new(backend, b, t, Some(mv)));
            let idx = tree.nodes.len() - 1;
            tree.nodes[0].children.push(idx);
        }
        tree.backup(&[0, 1], 1.0);
        assert_eq!(tree.select_best_child(0, 1.41), Some(2));
    }

    /// Real move generation, but every move application is refused.
    struct RefusingBackend(LiveBackend);

    impl Backend for RefusingBackend {
        fn kind(&self) -> BackendKind {
            self.0.kind()
        }
        fn size(&self) -> BoardSize {
            self.0.size()
        }
        fn legal_moves(&self, board: &Board, turn: Color) -> Vec<Move> {
            self.0.legal_moves(board, turn)
        }
        fn apply(&self, _board: &Board, turn: Color, mv: Move) -> Result<(Board, Color), MoveError> {
            Err(MoveError::IllegalMove {
                row: mv.row,
                col: mv.col,
                color: turn,
            })
        }
        fn winner(&self, board: &Board) -> Option<Outcome> {
            self.0.winner(board)
        }
        fn reachable_boards(&self) -> Result<Arc<BoardSet>, BackendError> {
            self.0.reachable_boards()
        }
    }

    #[test]
    fn test_backend_failure_reaches_caller() {
        let size = BoardSize::new(4, 4).unwrap();
        let env = Arc::new(Environment::new(
            Arc::new(RefusingBackend(LiveBackend::new(size, 1_000))),
            RewardPolicy::WinLoss,
        ));
        let mut agent = agent(&env, 3);
        let state = env.state_of(&Board::initial(size), Color::Black);
        assert!(matches!(
            agent.get_action(&state),
            Err(AgentError::Move(MoveError::IllegalMove { .. }))
        ));
    }
}
