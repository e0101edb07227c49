use serde::{Deserialize, Serialize};

/// How the transition into a terminal state is scored. Every non-terminal
/// transition is worth zero under both policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardPolicy {
    /// +1 for a win, -1 for a loss, 0 for a draw.
    #[default]
    WinLoss,
    /// Own discs minus opponent discs on the final board.
    DiscMargin,
}

impl RewardPolicy {
    pub fn terminal_reward(self, own: usize, opponent: usize) -> f64 {
        match self {
            RewardPolicy::WinLoss => match own.cmp(&opponent) {
                std::cmp::Ordering::Greater => 1.0,
                std::cmp::Ordering::Less => -1.0,
                std::cmp::Ordering::Equal => 0.0,
            },
            RewardPolicy::DiscMargin => own as f64 - opponent as f64,
        }
    }
}
