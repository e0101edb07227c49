use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use crate::ai::agent::{Agent, AgentData, AgentSetup, Capability, Transition};
use crate::env::{ActionSource, State};
use crate::error::AgentError;
use crate::game::Move;

/// Values closer than this count as tied for the greedy choice.
const TIE_EPSILON: f64 = 1e-12;

/// Eligibility traces below this are dropped.
const TRACE_CUTOFF: f64 = 1e-6;

// ─── Config ──────────────────────────────────────────────────────────────────

/// Which temporal-difference target the agent bootstraps from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TdVariant {
    Sarsa,
    ExpectedSarsa,
    SarsaLambda,
    QLearning,
    DoubleQLearning,
}

impl TdVariant {
    pub const ALL: [TdVariant; 5] = [
        TdVariant::Sarsa,
        TdVariant::ExpectedSarsa,
        TdVariant::SarsaLambda,
        TdVariant::QLearning,
        TdVariant::DoubleQLearning,
    ];

    /// Registry name.
    pub fn name(self) -> &'static str {
        match self {
            TdVariant::Sarsa => "sarsa",
            TdVariant::ExpectedSarsa => "expected_sarsa",
            TdVariant::SarsaLambda => "sarsa_lambda",
            TdVariant::QLearning => "q_learning",
            TdVariant::DoubleQLearning => "double_q_learning",
        }
    }
}

/// Temporal-difference hyperparameters shared by every variant.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TdConfig {
    /// Step size.
    pub alpha: f64,
    pub gamma: f64,
    /// Exploration rate while learning.
    pub epsilon: f64,
    /// Trace decay, used by SARSA(λ) only.
    pub lambda: f64,
}

impl Default for TdConfig {
    fn default() -> Self {
        TdConfig {
            alpha: 0.1,
            gamma: 0.95,
            epsilon: 0.1,
            lambda: 0.8,
        }
    }
}

// ─── Tables ──────────────────────────────────────────────────────────────────

type Key = (State, Move);
type ActionValues = HashMap<Key, f64>;

fn lookup(table: &ActionValues, state: &State, action: Move) -> f64 {
    table.get(&(*state, action)).copied().unwrap_or(0.0)
}

/// First action with the highest value in `table`.
fn argmax(table: &ActionValues, state: &State, actions: &[Move]) -> Option<Move> {
    let mut best: Option<(Move, f64)> = None;
    for &a in actions {
        let v = lookup(table, state, a);
        if best.map_or(true, |(_, b)| v > b) {
            best = Some((a, v));
        }
    }
    best.map(|(a, _)| a)
}

fn sorted_entries(table: &ActionValues) -> Vec<(State, Move, f64)> {
    let mut entries: Vec<(State, Move, f64)> =
        table.iter().map(|(&(s, a), &v)| (s, a, v)).collect();
    entries.sort_by(|x, y| (x.0, x.1).cmp(&(y.0, y.1)));
    entries
}

fn from_entries(entries: Vec<(State, Move, f64)>) -> ActionValues {
    entries.into_iter().map(|(s, a, v)| ((s, a), v)).collect()
}

// ─── Agent ───────────────────────────────────────────────────────────────────

/// Tabular temporal-difference learner. Acts ε-greedily while learning and
/// greedily otherwise.
pub struct TdAgent {
    variant: TdVariant,
    config: TdConfig,
    learning: bool,
    rng: StdRng,
    actions: Option<Arc<dyn ActionSource>>,
    q: ActionValues,
    /// Second table, used by Double Q-learning only.
    q2: ActionValues,
    traces: HashMap<Key, f64>,
    /// Action already chosen for the next state by an on-policy update.
    next_action: Option<Key>,
    /// Double Q-learning updates the first table when set.
    update_first: bool,
}

impl TdAgent {
    pub fn new(variant: TdVariant, config: TdConfig, seed: u64) -> Self {
        TdAgent {
            variant,
            config,
            learning: false,
            rng: StdRng::seed_from_u64(seed),
            actions: None,
            q: ActionValues::new(),
            q2: ActionValues::new(),
            traces: HashMap::new(),
            next_action: None,
            update_first: true,
        }
    }

    pub fn variant(&self) -> TdVariant {
        self.variant
    }

    /// Value the greedy choice is based on. Double Q-learning sums both tables.
    pub fn action_value(&self, state: &State, action: Move) -> f64 {
        match self.variant {
            TdVariant::DoubleQLearning => {
                lookup(&self.q, state, action) + lookup(&self.q2, state, action)
            }
            _ => lookup(&self.q, state, action),
        }
    }

    fn source(&self) -> Result<Arc<dyn ActionSource>, AgentError> {
        self.actions.clone().ok_or_else(|| AgentError::NotInitialized {
            agent: self.variant.name().to_string(),
        })
    }

    /// ε-greedy choice from a non-empty action list. Greedy ties break at
    /// random.
    fn select(&mut self, state: &State, actions: &[Move]) -> Move {
        if self.learning && self.rng.random::<f64>() < self.config.epsilon {
            return actions[self.rng.random_range(0..actions.len())];
        }
        let values: Vec<f64> = actions.iter().map(|&a| self.action_value(state, a)).collect();
        let best = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let ties: Vec<Move> = actions
            .iter()
            .zip(&values)
            .filter(|&(_, &v)| v >= best - TIE_EPSILON)
            .map(|(&a, _)| a)
            .collect();
        ties[self.rng.random_range(0..ties.len())]
    }

    /// Pick the action for `state` now and remember it for the next
    /// `get_action`. Returns its value, or zero when there is nothing to pick.
    fn commit_next_action(&mut self, state: &State, actions: &[Move]) -> f64 {
        if actions.is_empty() {
            self.next_action = None;
            return 0.0;
        }
        let action = self.select(state, actions);
        self.next_action = Some((*state, action));
        lookup(&self.q, state, action)
    }

    /// Expected value of `state` under the ε-greedy policy.
    fn expected_value(&self, state: &State, actions: &[Move]) -> f64 {
        if actions.is_empty() {
            return 0.0;
        }
        let values: Vec<f64> = actions.iter().map(|&a| lookup(&self.q, state, a)).collect();
        let best = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let greedy = values.iter().filter(|&&v| v >= best - TIE_EPSILON).count() as f64;
        let eps = self.config.epsilon;
        let explore = eps / actions.len() as f64;

        values
            .iter()
            .map(|&v| {
                let p = if v >= best - TIE_EPSILON {
                    explore + (1.0 - eps) / greedy
                } else {
                    explore
                };
                p * v
            })
            .sum()
    }

    fn max_value(&self, state: &State, actions: &[Move]) -> f64 {
        actions
            .iter()
            .map(|&a| lookup(&self.q, state, a))
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))))
            .unwrap_or(0.0)
    }

    fn step(table: &mut ActionValues, key: Key, target: f64, alpha: f64) {
        let q = table.entry(key).or_insert(0.0);
        *q += alpha * (target - *q);
    }

    fn update_traces(&mut self, key: Key, delta: f64, done: bool) {
        let TdConfig {
            alpha,
            gamma,
            lambda,
            ..
        } = self.config;
        *self.traces.entry(key).or_insert(0.0) += 1.0;
        for (k, e) in self.traces.iter_mut() {
            *self.q.entry(*k).or_insert(0.0) += alpha * delta * *e;
            *e *= gamma * lambda;
        }
        self.traces.retain(|_, e| *e > TRACE_CUTOFF);
        if done {
            self.traces.clear();
        }
    }

    fn reset_episode(&mut self) {
        self.traces.clear();
        self.next_action = None;
    }
}

impl Agent for TdAgent {
    fn name(&self) -> &str {
        self.variant.name()
    }

    fn capability(&self) -> Capability {
        Capability::Active
    }

    fn initialize(&mut self, setup: AgentSetup) -> Result<(), AgentError> {
        self.actions = Some(setup.action_source());
        Ok(())
    }

    fn get_action(&mut self, state: &State) -> Result<Move, AgentError> {
        let source = self.source()?;
        if let Some((s, a)) = self.next_action.take() {
            if s == *state {
                return Ok(a);
            }
        }
        let actions = source.possible_actions(state);
        if actions.is_empty() {
            return Err(AgentError::NoActions);
        }
        Ok(self.select(state, &actions))
    }

    fn update(&mut self, t: &Transition) -> Result<(), AgentError> {
        if !self.learning {
            return Ok(());
        }
        let next_actions = if t.done {
            Vec::new()
        } else {
            self.source()?.possible_actions(&t.next_state)
        };
        let key = (t.state, t.action);
        let TdConfig { alpha, gamma, .. } = self.config;

        match self.variant {
            TdVariant::Sarsa => {
                let next_q = self.commit_next_action(&t.next_state, &next_actions);
                Self::step(&mut self.q, key, t.reward + gamma * next_q, alpha);
            }
            TdVariant::ExpectedSarsa => {
                let next_q = self.expected_value(&t.next_state, &next_actions);
                Self::step(&mut self.q, key, t.reward + gamma * next_q, alpha);
            }
            TdVariant::SarsaLambda => {
                let next_q = self.commit_next_action(&t.next_state, &next_actions);
                let delta = t.reward + gamma * next_q - lookup(&self.q, &t.state, t.action);
                self.update_traces(key, delta, t.done);
            }
            TdVariant::QLearning => {
                let next_q = self.max_value(&t.next_state, &next_actions);
                Self::step(&mut self.q, key, t.reward + gamma * next_q, alpha);
            }
            TdVariant::DoubleQLearning => {
                let (learn, judge) = if self.update_first {
                    (&mut self.q, &self.q2)
                } else {
                    (&mut self.q2, &self.q)
                };
                let next_q = argmax(learn, &t.next_state, &next_actions)
                    .map_or(0.0, |a| lookup(judge, &t.next_state, a));
                Self::step(learn, key, t.reward + gamma * next_q, alpha);
                self.update_first = !self.update_first;
            }
        }
        Ok(())
    }

    fn before_gameplay(&mut self) {
        self.reset_episode();
    }

    fn after_gameplay(&mut self) {
        self.reset_episode();
    }

    fn is_learning(&self) -> bool {
        self.learning
    }

    fn set_learning(&mut self, learning: bool) {
        self.learning = learning;
    }

    fn get_data_to_save(&self) -> Option<AgentData> {
        if self.q.is_empty() && self.q2.is_empty() {
            return None;
        }
        Some(match self.variant {
            TdVariant::DoubleQLearning => AgentData::DoubleActionValues {
                first: sorted_entries(&self.q),
                second: sorted_entries(&self.q2),
            },
            _ => AgentData::ActionValues(sorted_entries(&self.q)),
        })
    }

    fn set_saved_data(&mut self, data: AgentData) -> Result<(), AgentError> {
        match (self.variant, data) {
            (TdVariant::DoubleQLearning, AgentData::DoubleActionValues { first, second }) => {
                self.q = from_entries(first);
                self.q2 = from_entries(second);
                Ok(())
            }
            (variant, AgentData::ActionValues(entries)) if variant != TdVariant::DoubleQLearning => {
                self.q = from_entries(entries);
                Ok(())
            }
            (variant, _) => Err(AgentError::WrongSaveData {
                agent: variant.name().to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LiveBackend;
    use crate::env::{Environment, RewardPolicy};
    use crate::game::{Board, BoardSize, Color};

    fn env() -> Arc<Environment> {
        let size = BoardSize::new(4, 4).unwrap();
        Arc::new(Environment::new(
            Arc::new(LiveBackend::new(size, 100_000)),
            RewardPolicy::WinLoss,
        ))
    }

    fn state(rows: &[&str]) -> State {
        State::from_board(&Board::parse(rows).unwrap(), Color::Black)
    }

    fn initial(env: &Environment) -> State {
        env.state_of(&Board::initial(env.size()), Color::Black)
    }

    fn reply() -> State {
        state(&["OX..", ".OX.", ".XO.", "...."])
    }

    fn terminal() -> State {
        state(&["XXOO", "OOXX", "XOXO", "OXOX"])
    }

    fn learner(variant: TdVariant, config: TdConfig) -> (TdAgent, Arc<Environment>) {
        let env = env();
        let mut agent = TdAgent::new(variant, config, 3);
        agent.initialize(AgentSetup::Active(env.clone())).unwrap();
        agent.set_learning(true);
        (agent, env)
    }

    fn transition(state: State, action: Move, reward: f64, next_state: State, done: bool) -> Transition {
        Transition {
            state,
            action,
            reward,
            next_state,
            done,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_variant_names() {
        let names: Vec<&str> = TdVariant::ALL.iter().map(|v| v.name()).collect();
        assert_eq!(
            names,
            vec!["sarsa", "expected_sarsa", "sarsa_lambda", "q_learning", "double_q_learning"]
        );
    }

    #[test]
    fn test_terminal_update_moves_toward_reward() {
        for variant in TdVariant::ALL {
            let (mut agent, env) = learner(variant, TdConfig::default());
            let s0 = initial(&env);
            agent
                .update(&transition(s0, Move::new(0, 1), 1.0, terminal(), true))
                .unwrap();
            assert!(
                approx(agent.action_value(&s0, Move::new(0, 1)), 0.1),
                "{variant:?}"
            );
        }
    }

    #[test]
    fn test_q_learning_bootstraps_from_best_next_action() {
        let (mut agent, env) = learner(TdVariant::QLearning, TdConfig::default());
        let s0 = initial(&env);
        let s1 = reply();
        let best = env.possible_actions(&s1)[0];
        agent.q.insert((s1, best), 0.5);

        agent
            .update(&transition(s0, Move::new(0, 1), 0.0, s1, false))
            .unwrap();
        assert!(approx(agent.action_value(&s0, Move::new(0, 1)), 0.1 * 0.95 * 0.5));
    }

    #[test]
    fn test_expected_sarsa_uses_epsilon_greedy_expectation() {
        let (mut agent, env) = learner(TdVariant::ExpectedSarsa, TdConfig::default());
        let s0 = initial(&env);
        let s1 = reply();
        let actions = env.possible_actions(&s1);
        agent.q.insert((s1, actions[0]), 1.0);

        agent
            .update(&transition(s0, Move::new(0, 1), 0.0, s1, false))
            .unwrap();
        let expected = 0.1 / actions.len() as f64 + 0.9;
        assert!(approx(
            agent.action_value(&s0, Move::new(0, 1)),
            0.1 * 0.95 * expected
        ));
    }

    #[test]
    fn test_sarsa_commits_to_next_action() {
        let config = TdConfig {
            epsilon: 0.0,
            ..TdConfig::default()
        };
        let (mut agent, env) = learner(TdVariant::Sarsa, config);
        let s0 = initial(&env);
        let s1 = reply();
        let preferred = *env.possible_actions(&s1).last().unwrap();
        agent.q.insert((s1, preferred), 1.0);

        agent
            .update(&transition(s0, Move::new(0, 1), 0.0, s1, false))
            .unwrap();
        assert!(approx(agent.action_value(&s0, Move::new(0, 1)), 0.1 * 0.95));
        assert_eq!(agent.get_action(&s1).unwrap(), preferred);
        assert!(agent.next_action.is_none());
    }

    #[test]
    fn test_sarsa_lambda_propagates_through_traces() {
        let (mut agent, env) = learner(TdVariant::SarsaLambda, TdConfig::default());
        let s0 = initial(&env);
        let a0 = Move::new(0, 1);
        let s1 = reply();

        agent.update(&transition(s0, a0, 0.0, s1, false)).unwrap();
        let a1 = agent.get_action(&s1).unwrap();
        agent.update(&transition(s1, a1, 1.0, terminal(), true)).unwrap();

        assert!(approx(agent.action_value(&s1, a1), 0.1));
        assert!(approx(agent.action_value(&s0, a0), 0.1 * 0.95 * 0.8));
        assert!(agent.traces.is_empty());
    }

    #[test]
    fn test_double_q_alternates_tables() {
        let (mut agent, env) = learner(TdVariant::DoubleQLearning, TdConfig::default());
        let s0 = initial(&env);
        let a0 = Move::new(0, 1);
        let t = transition(s0, a0, 1.0, terminal(), true);

        agent.update(&t).unwrap();
        assert!(approx(lookup(&agent.q, &s0, a0), 0.1));
        assert!(agent.q2.is_empty());

        agent.update(&t).unwrap();
        assert!(approx(lookup(&agent.q, &s0, a0), 0.1));
        assert!(approx(lookup(&agent.q2, &s0, a0), 0.1));
    }

    #[test]
    fn test_update_is_ignored_when_not_learning() {
        let (mut agent, env) = learner(TdVariant::QLearning, TdConfig::default());
        agent.set_learning(false);
        agent
            .update(&transition(initial(&env), Move::new(0, 1), 1.0, terminal(), true))
            .unwrap();
        assert!(agent.get_data_to_save().is_none());
    }

    #[test]
    fn test_acts_greedily_when_not_learning() {
        let (mut agent, env) = learner(TdVariant::QLearning, TdConfig::default());
        agent.set_learning(false);
        let s0 = initial(&env);
        agent.q.insert((s0, Move::new(2, 3)), 1.0);
        for _ in 0..50 {
            assert_eq!(agent.get_action(&s0).unwrap(), Move::new(2, 3));
        }
    }

    #[test]
    fn test_before_gameplay_clears_episode_memory() {
        let (mut agent, env) = learner(TdVariant::SarsaLambda, TdConfig::default());
        agent
            .update(&transition(initial(&env), Move::new(0, 1), 0.0, reply(), false))
            .unwrap();
        assert!(!agent.traces.is_empty());
        assert!(agent.next_action.is_some());

        agent.before_gameplay();
        assert!(agent.traces.is_empty());
        assert!(agent.next_action.is_none());
    }

    #[test]
    fn test_saved_tables_round_trip() {
        let (mut agent, env) = learner(TdVariant::DoubleQLearning, TdConfig::default());
        let s0 = initial(&env);
        let t = transition(s0, Move::new(0, 1), 1.0, terminal(), true);
        agent.update(&t).unwrap();
        agent.update(&t).unwrap();
        let data = agent.get_data_to_save().unwrap();

        let mut restored = TdAgent::new(TdVariant::DoubleQLearning, TdConfig::default(), 0);
        restored.set_saved_data(data.clone()).unwrap();
        assert_eq!(restored.get_data_to_save(), Some(data.clone()));

        let mut single = TdAgent::new(TdVariant::QLearning, TdConfig::default(), 0);
        assert!(matches!(
            single.set_saved_data(data),
            Err(AgentError::WrongSaveData { .. })
        ));
    }
}
