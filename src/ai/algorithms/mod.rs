mod mcts;
mod td;
mod value_iteration;

pub use mcts::{MctsAgent, MctsConfig, RolloutPolicy, UniformRollout};
pub use td::{TdAgent, TdConfig, TdVariant};
pub use value_iteration::{ValueIterationAgent, ValueIterationConfig};
