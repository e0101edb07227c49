use std::sync::Arc;

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use crate::env::{ActionSource, State};
use crate::error::AgentError;
use crate::game::Move;

use super::agent::{Agent, AgentSetup, Capability};

/// An agent that selects uniformly at random from legal actions.
pub struct RandomAgent {
    rng: StdRng,
    actions: Option<Arc<dyn ActionSource>>,
    learning: bool,
}

impl RandomAgent {
    pub const NAME: &'static str = "random";

    pub fn new(seed: u64) -> Self {
        RandomAgent {
            rng: StdRng::seed_from_u64(seed),
            actions: None,
            learning: false,
        }
    }
}

impl Agent for RandomAgent {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn capability(&self) -> Capability {
        Capability::Active
    }

    fn initialize(&mut self, setup: AgentSetup) -> Result<(), AgentError> {
        self.actions = Some(setup.action_source());
        Ok(())
    }

    fn get_action(&mut self, state: &State) -> Result<Move, AgentError> {
        let source = self.actions.as_ref().ok_or_else(|| AgentError::NotInitialized {
            agent: Self::NAME.to_string(),
        })?;
        let actions = source.possible_actions(state);
        if actions.is_empty() {
            return Err(AgentError::NoActions);
        }
        let idx = self.rng.random_range(0..actions.len());
        Ok(actions[idx])
    }

    fn is_learning(&self) -> bool {
        self.learning
    }

    fn set_learning(&mut self, learning: bool) {
        self.learning = learning;
    }
}
