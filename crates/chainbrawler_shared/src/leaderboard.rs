//! # Leaderboard Types
//!
//! Ranking snapshot for one participant within one epoch.

use std::time::SystemTime;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// One row of the top cohort.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardPlayer {
    /// Registry address.
    pub address: Address,
    /// Epoch score.
    pub score: U256,
    /// 1-based position in the cohort.
    pub rank: u64,
    /// Character level (0 when unknown).
    pub level: u32,
    /// Lifetime kills (0 when unknown).
    pub kills: u32,
    /// True for the participant the snapshot was built for.
    pub is_current_player: bool,
}

/// Leaderboard state for one participant, rebuilt on every load.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardSnapshot {
    /// Epoch the scores belong to.
    pub epoch: u64,
    /// Participant's score (zero when the ledger has none).
    pub player_score: U256,
    /// `1 + number of strictly higher scores`, or 0 when unknown.
    pub player_rank: u64,
    /// Registry size.
    pub total_players: u64,
    /// Best entries, rank ascending.
    pub top_players: Vec<LeaderboardPlayer>,
    /// Seconds until the epoch rolls over.
    pub epoch_time_remaining_secs: u64,
    /// When the snapshot was assembled.
    pub last_updated: SystemTime,
}

impl LeaderboardSnapshot {
    /// The participant's own cohort row, if they made the cut.
    #[must_use]
    pub fn current_player(&self) -> Option<&LeaderboardPlayer> {
        self.top_players.iter().find(|p| p.is_current_player)
    }

    /// One-line summary for status bars.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Epoch {} - Rank #{} - Score: {}",
            self.epoch, self.player_rank, self.player_score
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_and_current_player() {
        let me = Address::repeat_byte(3);
        let snapshot = LeaderboardSnapshot {
            epoch: 7,
            player_score: U256::from(120),
            player_rank: 2,
            total_players: 40,
            top_players: vec![
                LeaderboardPlayer {
                    address: Address::repeat_byte(1),
                    score: U256::from(300),
                    rank: 1,
                    level: 9,
                    kills: 80,
                    is_current_player: false,
                },
                LeaderboardPlayer {
                    address: me,
                    score: U256::from(120),
                    rank: 2,
                    level: 4,
                    kills: 12,
                    is_current_player: true,
                },
            ],
            epoch_time_remaining_secs: 60,
            last_updated: SystemTime::UNIX_EPOCH,
        };

        assert_eq!(snapshot.summary(), "Epoch 7 - Rank #2 - Score: 120");
        assert_eq!(snapshot.current_player().map(|p| p.address), Some(me));
    }
}
