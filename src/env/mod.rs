//! The game as a Markov decision process seen from one seat, where the
//! opponent replies uniformly at random.

mod environment;
mod reward;
mod state;

pub use environment::{ActionSource, Distribution, Environment, StateSpace};
pub use reward::RewardPolicy;
pub use state::State;
