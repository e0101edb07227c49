use std::collections::BTreeMap;

use crate::config::AppConfig;
use crate::error::ConfigError;

use super::agent::Agent;
use super::algorithms::{MctsAgent, TdAgent, TdVariant, ValueIterationAgent};
use super::random::RandomAgent;

/// Builds an agent from the application config and a seed.
pub type AgentFactory = fn(&AppConfig, u64) -> Box<dyn Agent>;

/// Maps agent names to constructors. A `None` entry is a seat for a human,
/// which has no agent.
#[derive(Clone)]
pub struct AgentRegistry {
    factories: BTreeMap<String, Option<AgentFactory>>,
}

impl AgentRegistry {
    pub const HUMAN: &'static str = "human";

    /// A registry knowing only the human seat.
    pub fn new() -> Self {
        let mut factories = BTreeMap::new();
        factories.insert(Self::HUMAN.to_string(), None);
        AgentRegistry { factories }
    }

    /// Every agent this crate ships.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        let builtin: [(&str, AgentFactory); 8] = [
            (RandomAgent::NAME, |_, seed| Box::new(RandomAgent::new(seed))),
            (ValueIterationAgent::NAME, |config, _| {
                Box::new(ValueIterationAgent::new(config.value_iteration.clone()))
            }),
            (TdVariant::Sarsa.name(), |config, seed| {
                Box::new(TdAgent::new(TdVariant::Sarsa, config.td.clone(), seed))
            }),
            (TdVariant::ExpectedSarsa.name(), |config, seed| {
                Box::new(TdAgent::new(TdVariant::ExpectedSarsa, config.td.clone(), seed))
            }),
            (TdVariant::SarsaLambda.name(), |config, seed| {
                Box::new(TdAgent::new(TdVariant::SarsaLambda, config.td.clone(), seed))
            }),
            (TdVariant::QLearning.name(), |config, seed| {
                Box::new(TdAgent::new(TdVariant::QLearning, config.td.clone(), seed))
            }),
            (TdVariant::DoubleQLearning.name(), |config, seed| {
                Box::new(TdAgent::new(TdVariant::DoubleQLearning, config.td.clone(), seed))
            }),
            (MctsAgent::NAME, |config, seed| {
                Box::new(MctsAgent::new(config.mcts.clone(), seed))
            }),
        ];
        for (name, factory) in builtin {
            registry.factories.insert(name.to_string(), Some(factory));
        }
        registry
    }

    /// Add a new agent under `name`. Names are unique.
    pub fn register(&mut self, name: &str, factory: AgentFactory) -> Result<(), ConfigError> {
        if self.factories.contains_key(name) {
            return Err(ConfigError::DuplicateAgent(name.to_string()));
        }
        self.factories.insert(name.to_string(), Some(factory));
        Ok(())
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Build the agent registered as `name`. `Ok(None)` is the human seat.
    pub fn construct(
        &self,
        name: &str,
        config: &AppConfig,
        seed: u64,
    ) -> Result<Option<Box<dyn Agent>>, ConfigError> {
        match self.factories.get(name) {
            Some(Some(factory)) => Ok(Some(factory(config, seed))),
            Some(None) => Ok(None),
            None => Err(ConfigError::UnknownAgent(name.to_string())),
        }
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}
