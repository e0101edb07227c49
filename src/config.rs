use std::path::Path;

use tracing::warn;

use crate::ai::algorithms::{MctsConfig, TdConfig, ValueIterationConfig};
use crate::backend::BackendKind;
use crate::env::RewardPolicy;
use crate::error::ConfigError;
use crate::game::BoardSize;
use crate::gameplay::GameplayConfig;

/// Board dimensions.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub rows: usize,
    pub cols: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        BoardConfig {
            rows: BoardSize::STANDARD.rows(),
            cols: BoardSize::STANDARD.cols(),
        }
    }
}

impl BoardConfig {
    pub fn size(&self) -> Result<BoardSize, ConfigError> {
        BoardSize::new(self.rows, self.cols)
    }
}

/// Backend selection.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// Upper bound on enumerated states before giving up.
    pub max_states: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            kind: BackendKind::Live,
            max_states: 50_000_000,
        }
    }
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub policy: RewardPolicy,
}

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub board: BoardConfig,
    pub backend: BackendConfig,
    pub reward: RewardConfig,
    pub value_iteration: ValueIterationConfig,
    pub td: TdConfig,
    pub mcts: MctsConfig,
    pub gameplay: GameplayConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!(path = %path.display(), "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.board.size()?;
        if self.backend.max_states == 0 {
            return Err(ConfigError::Validation(
                "backend.max_states must be > 0".into(),
            ));
        }

        let vi = &self.value_iteration;
        if vi.gamma <= 0.0 || vi.gamma > 1.0 {
            return Err(ConfigError::Validation(
                "value_iteration.gamma must be in (0, 1]".into(),
            ));
        }
        if vi.theta <= 0.0 {
            return Err(ConfigError::Validation(
                "value_iteration.theta must be > 0".into(),
            ));
        }

        let td = &self.td;
        if td.alpha <= 0.0 || td.alpha > 1.0 {
            return Err(ConfigError::Validation(
                "td.alpha must be in (0, 1]".into(),
            ));
        }
        if td.gamma <= 0.0 || td.gamma > 1.0 {
            return Err(ConfigError::Validation(
                "td.gamma must be in (0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&td.epsilon) {
            return Err(ConfigError::Validation(
                "td.epsilon must be in [0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&td.lambda) {
            return Err(ConfigError::Validation(
                "td.lambda must be in [0, 1]".into(),
            ));
        }

        if self.mcts.iterations == 0 && self.mcts.time_limit_ms.is_none() {
            return Err(ConfigError::Validation(
                "mcts.iterations must be >= 1 when no time limit is set".into(),
            ));
        }
        if self.mcts.exploration < 0.0 {
            return Err(ConfigError::Validation(
                "mcts.exploration must be >= 0".into(),
            ));
        }

        if self.gameplay.games == 0 {
            return Err(ConfigError::Validation(
                "gameplay.games must be >= 1".into(),
            ));
        }

        Ok(())
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&AppConfig::default()).expect("default config serializes")
    }
}
