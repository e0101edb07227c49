use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::ai::agent::{Agent, AgentData, AgentSetup, Capability};
use crate::env::{Environment, State};
use crate::error::AgentError;
use crate::game::Move;

// ─── Config ──────────────────────────────────────────────────────────────────

/// Value iteration hyperparameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ValueIterationConfig {
    /// Discount factor applied to successor values.
    pub gamma: f64,
    /// A sweep whose largest value change is below this ends learning.
    pub theta: f64,
}

impl Default for ValueIterationConfig {
    fn default() -> Self {
        ValueIterationConfig {
            gamma: 0.95,
            theta: 1e-4,
        }
    }
}

// ─── Model ───────────────────────────────────────────────────────────────────

/// One action of a state with its outcomes as (successor index, probability,
/// reward).
struct ActionModel {
    action: Move,
    outcomes: Vec<(usize, f64, f64)>,
}

/// The transition model flattened over indexed states. Successors outside
/// the state space are appended with no actions and keep value zero.
struct Model {
    states: Vec<State>,
    actions: Vec<Vec<ActionModel>>,
}

impl Model {
    fn build(env: &Environment) -> Result<Self, AgentError> {
        let mut states: Vec<State> = env.all_states()?.iter().collect();
        states.sort();
        let mut index: HashMap<State, usize> =
            states.iter().enumerate().map(|(i, &s)| (s, i)).collect();

        let mut actions = Vec::with_capacity(states.len());
        let mut i = 0;
        while i < states.len() {
            let state = states[i];
            let mut models = Vec::new();
            for action in env.possible_actions(&state) {
                let mut outcomes = Vec::new();
                for (next, probability) in env.next_state_distribution(&state, action)? {
                    let j = *index.entry(next).or_insert_with(|| {
                        states.push(next);
                        states.len() - 1
                    });
                    outcomes.push((j, probability, env.reward(&state, action, &next)));
                }
                models.push(ActionModel { action, outcomes });
            }
            actions.push(models);
            i += 1;
        }

        Ok(Model { states, actions })
    }

    fn q_value(&self, action: &ActionModel, values: &[f64], gamma: f64) -> f64 {
        action
            .outcomes
            .iter()
            .map(|&(j, p, r)| p * (r + gamma * values[j]))
            .sum()
    }
}

// ─── Agent ───────────────────────────────────────────────────────────────────

/// Planner that solves the MDP by value iteration over every reachable state
/// and then acts from the resulting greedy policy.
pub struct ValueIterationAgent {
    config: ValueIterationConfig,
    learning: bool,
    policy: Option<HashMap<State, Move>>,
    values: Option<HashMap<State, f64>>,
}

impl ValueIterationAgent {
    pub const NAME: &'static str = "value_iter";

    pub fn new(config: ValueIterationConfig) -> Self {
        ValueIterationAgent {
            config,
            learning: false,
            policy: None,
            values: None,
        }
    }

    /// Converged state values, if learning has run.
    pub fn values(&self) -> Option<&HashMap<State, f64>> {
        self.values.as_ref()
    }

    pub fn policy(&self) -> Option<&HashMap<State, Move>> {
        self.policy.as_ref()
    }

    /// Run value iteration to convergence and extract the greedy policy.
    ///
    /// Sweeps are synchronous: every update reads the previous sweep's
    /// values, so the result does not depend on state iteration order.
    pub fn learn(&mut self, env: &Environment) -> Result<(), AgentError> {
        let start = Instant::now();
        let model = Model::build(env)?;
        info!(
            states = model.states.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Transition model built"
        );

        let gamma = self.config.gamma;
        let mut values = vec![0.0; model.states.len()];
        let mut sweep = 0usize;
        loop {
            let mut next = values.clone();
            let mut delta: f64 = 0.0;
            for (i, actions) in model.actions.iter().enumerate() {
                if actions.is_empty() {
                    continue;
                }
                let best = actions
                    .iter()
                    .map(|a| model.q_value(a, &values, gamma))
                    .fold(f64::NEG_INFINITY, f64::max);
                delta = delta.max((best - values[i]).abs());
                next[i] = best;
            }
            values = next;
            sweep += 1;
            debug!(sweep, delta, "Value iteration sweep");
            if delta < self.config.theta {
                break;
            }
        }

        let mut policy = HashMap::new();
        for (i, actions) in model.actions.iter().enumerate() {
            let mut best: Option<(Move, f64)> = None;
            for a in actions {
                let q = model.q_value(a, &values, gamma);
                if best.map_or(true, |(_, b)| q > b) {
                    best = Some((a.action, q));
                }
            }
            if let Some((action, _)) = best {
                policy.insert(model.states[i], action);
            }
        }

        info!(
            sweeps = sweep,
            policy_states = policy.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Value iteration converged"
        );

        self.values = Some(model.states.iter().copied().zip(values).collect());
        self.policy = Some(policy);
        Ok(())
    }

    fn not_learned(&self) -> AgentError {
        AgentError::NotLearned {
            agent: Self::NAME.to_string(),
        }
    }
}

impl Default for ValueIterationAgent {
    fn default() -> Self {
        Self::new(ValueIterationConfig::default())
    }
}

impl Agent for ValueIterationAgent {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn capability(&self) -> Capability {
        Capability::Passive
    }

    fn initialize(&mut self, setup: AgentSetup) -> Result<(), AgentError> {
        let env: Arc<Environment> = match setup {
            AgentSetup::Passive(env) => env,
            AgentSetup::Active(_) => {
                return Err(AgentError::NotInitialized {
                    agent: Self::NAME.to_string(),
                })
            }
        };
        if self.learning {
            self.learn(&env)?;
        }
        if self.policy.is_none() {
            return Err(self.not_learned());
        }
        Ok(())
    }

    fn get_action(&mut self, state: &State) -> Result<Move, AgentError> {
        let policy = self.policy.as_ref().ok_or_else(|| self.not_learned())?;
        policy.get(state).copied().ok_or(AgentError::NoActions)
    }

    fn is_learning(&self) -> bool {
        self.learning
    }

    fn set_learning(&mut self, learning: bool) {
        self.learning = learning;
    }

    fn get_data_to_save(&self) -> Option<AgentData> {
        let policy = self.policy.as_ref()?;
        let mut entries: Vec<(State, Move)> = policy.iter().map(|(&s, &a)| (s, a)).collect();
        entries.sort();
        Some(AgentData::Policy(entries))
    }

    fn set_saved_data(&mut self, data: AgentData) -> Result<(), AgentError> {
        match data {
            AgentData::Policy(entries) => {
                self.policy = Some(entries.into_iter().collect());
                self.values = None;
                Ok(())
            }
            _ => Err(AgentError::WrongSaveData {
                agent: Self::NAME.to_string(),
            }),
        }
    }
}
