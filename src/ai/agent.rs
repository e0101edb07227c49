use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::env::{ActionSource, Environment, State};
use crate::error::AgentError;
use crate::game::Move;

/// What an agent is allowed to see of the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Plans with the full transition model.
    Passive,
    /// Learns only from transitions observed during play.
    Active,
}

/// Environment access handed over at initialization, matching the agent's
/// capability.
#[derive(Clone)]
pub enum AgentSetup {
    Passive(Arc<Environment>),
    Active(Arc<dyn ActionSource>),
}

impl AgentSetup {
    pub fn for_capability(capability: Capability, env: &Arc<Environment>) -> Self {
        match capability {
            Capability::Passive => AgentSetup::Passive(Arc::clone(env)),
            Capability::Active => AgentSetup::Active(Arc::clone(env) as Arc<dyn ActionSource>),
        }
    }

    /// Action lookup, available under either capability.
    pub fn action_source(&self) -> Arc<dyn ActionSource> {
        match self {
            AgentSetup::Passive(env) => Arc::clone(env) as Arc<dyn ActionSource>,
            AgentSetup::Active(source) => Arc::clone(source),
        }
    }
}

/// Result of one decision, reported once the opponent has replied.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: State,
    pub action: Move,
    pub reward: f64,
    pub next_state: State,
    /// The game ended in `next_state`.
    pub done: bool,
}

/// Learned data handed to a persistence layer. Entries are sorted so equal
/// tables produce equal values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AgentData {
    Policy(Vec<(State, Move)>),
    ActionValues(Vec<(State, Move, f64)>),
    DoubleActionValues {
        first: Vec<(State, Move, f64)>,
        second: Vec<(State, Move, f64)>,
    },
}

/// Universal interface for all agents.
pub trait Agent {
    /// Registry name of the agent.
    fn name(&self) -> &str;

    fn capability(&self) -> Capability;

    /// Receive environment access. Planners do their learning here.
    fn initialize(&mut self, setup: AgentSetup) -> Result<(), AgentError>;

    /// Choose a move in `state`, where own discs belong to this agent.
    fn get_action(&mut self, state: &State) -> Result<Move, AgentError>;

    /// Learn from the outcome of a previous decision.
    fn update(&mut self, _transition: &Transition) -> Result<(), AgentError> {
        Ok(())
    }

    /// Called once before each game.
    fn before_gameplay(&mut self) {}

    /// Called once after each game.
    fn after_gameplay(&mut self) {}

    fn is_learning(&self) -> bool;

    fn set_learning(&mut self, learning: bool);

    /// Data to persist, if the agent has learned anything.
    fn get_data_to_save(&self) -> Option<AgentData> {
        None
    }

    /// Restore previously persisted data.
    fn set_saved_data(&mut self, _data: AgentData) -> Result<(), AgentError> {
        Err(AgentError::WrongSaveData {
            agent: self.name().to_string(),
        })
    }
}
