mod agent;
pub mod algorithms;
mod random;
mod registry;

pub use agent::{Agent, AgentData, AgentSetup, Capability, Transition};
pub use algorithms::{MctsAgent, TdAgent, TdVariant, ValueIterationAgent};
pub use random::RandomAgent;
pub use registry::{AgentFactory, AgentRegistry};
