use std::path::PathBuf;

use crate::game::Color;

/// Errors raised when a move violates the capture rules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("illegal move ({row}, {col}) for {color}")]
    IllegalMove { row: usize, col: usize, color: Color },

    #[error("game is still in progress")]
    GameInProgress,
}

/// Errors raised by agents.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AgentError {
    #[error("agent '{agent}' must learn its policy before acting")]
    NotLearned { agent: String },

    #[error("agent '{agent}' was used before initialization")]
    NotInitialized { agent: String },

    #[error("no actions available in this state")]
    NoActions,

    #[error("saved data does not belong to agent '{agent}'")]
    WrongSaveData { agent: String },

    #[error("move error: {0}")]
    Move(#[from] MoveError),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Errors raised by move/transition backends.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("reachable state space exceeds the limit of {limit} boards")]
    StateSpaceTooLarge { limit: usize },

    #[error("stored board set does not fit this board: {0}")]
    InvalidBoardSet(String),

    #[error("move error: {0}")]
    Move(#[from] MoveError),
}

/// Errors that can occur when loading or applying configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),

    #[error("unknown agent '{0}'")]
    UnknownAgent(String),

    #[error("agent name already registered: '{0}'")]
    DuplicateAgent(String),

    #[error("human players are not allowed without a display (seat {seat})")]
    HumanNotAllowed { seat: Color },
}

/// Errors that halt a game in progress.
#[derive(Debug, thiserror::Error)]
pub enum GameplayError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("move error: {0}")]
    Move(#[from] MoveError),

    #[error("agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}
