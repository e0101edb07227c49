//! # Reversi MDP
//!
//! Reversi on small rectangular boards, modelled as a Markov decision process
//! from the perspective of whichever side is to move, with tabular agents
//! that plan or learn against it.
//!
//! ## Modules
//!
//! - [`game`]: Board, move rules, canonical perspective, simulation
//! - [`backend`]: Live (memoized) and exhaustive (enumerated) rule backends
//! - [`env`]: States, rewards, transition distributions
//! - [`ai`]: Agent trait, value iteration, TD learners, MCTS, registry
//! - [`gameplay`]: Unattended, paced and tournament drivers
//! - [`config`]: TOML configuration loading and validation
//! - [`error`]: Structured error types

pub mod ai;
pub mod backend;
pub mod config;
pub mod env;
pub mod error;
pub mod game;
pub mod gameplay;
