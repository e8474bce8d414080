//! # Leaderboard Ranking Engine
//!
//! The ledger exposes scores per address and a registry addressable by index,
//! but no rank query. Ranks are therefore computed by scanning the registry.
//!
//! ## Scans
//!
//! ```text
//! rank scan     [0..25) ─▶ [25..50) ─▶ ... ─▶ [n-25..n)      whole registry
//! cohort scan   [0..50) ─▶ [50..100)                          first 100 only
//!                 │
//!                 └─ entries inside a batch run concurrently,
//!                    batches run one after another
//! ```
//!
//! A failing entry lookup degrades that entry (zero score, or dropped from the
//! cohort when its address is unknown); it never fails the scan.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use chainbrawler_shared::{LeaderboardPlayer, LeaderboardSnapshot, OperationType, OperationUpdate};
use futures::future::join_all;

use crate::clock::fallback_epoch_time_remaining;
use crate::config::LeaderboardConfig;
use crate::controller::OperationController;
use crate::error::{ClassifiedError, CoreResult};
use crate::ledger::{LedgerClient, LedgerMethod};

/// Status line while loading.
pub const LOADING_STATUS: &str = "Loading leaderboard...";
/// Status line after a successful load.
pub const LOADED_STATUS: &str = "Leaderboard loaded successfully";
/// Summary when nothing has been loaded yet.
pub const NOT_LOADED_STATUS: &str = "Leaderboard data not loaded";

/// Rank of one participant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlayerRank {
    /// `1 + strictly higher scores`; 0 when the registry is empty or unknown.
    pub rank: u64,
    /// Registry size the rank was computed against.
    pub total_players: u64,
}

/// Builds leaderboard snapshots from point reads.
#[derive(Clone)]
pub struct LeaderboardEngine {
    controller: OperationController,
    ledger: Arc<dyn LedgerClient>,
    config: LeaderboardConfig,
}

impl LeaderboardEngine {
    /// Creates an engine.
    #[must_use]
    pub fn new(
        controller: OperationController,
        ledger: Arc<dyn LedgerClient>,
        config: LeaderboardConfig,
    ) -> Self {
        Self {
            controller,
            ledger,
            config,
        }
    }

    /// Builds and publishes the leaderboard snapshot for `player`.
    ///
    /// Fails only if the current epoch or the registry size cannot be read.
    ///
    /// # Errors
    ///
    /// [`crate::CoreError::OperationRefused`] if another operation is active,
    /// [`crate::CoreError::Ledger`] on a prerequisite failure.
    pub async fn load_leaderboard(&self, player: Address) -> CoreResult<LeaderboardSnapshot> {
        let snapshot = self
            .controller
            .run(OperationType::LoadLeaderboard, LOADING_STATUS, async {
                let snapshot = self.build_snapshot(player).await?;
                self.controller.store().update_leaderboard(snapshot.clone());
                Ok((snapshot, OperationUpdate::default()))
            })
            .await?;

        self.controller
            .store()
            .set_status_message(LOADED_STATUS.to_string());
        tracing::info!(
            epoch = snapshot.epoch,
            rank = snapshot.player_rank,
            total_players = snapshot.total_players,
            "Leaderboard loaded"
        );
        Ok(snapshot)
    }

    /// Full reload; same as [`Self::load_leaderboard`].
    ///
    /// # Errors
    ///
    /// See [`Self::load_leaderboard`].
    pub async fn refresh_leaderboard(&self, player: Address) -> CoreResult<LeaderboardSnapshot> {
        self.load_leaderboard(player).await
    }

    async fn build_snapshot(&self, player: Address) -> CoreResult<LeaderboardSnapshot> {
        let epoch = self.current_epoch().await?;

        // A participant without a score this epoch simply has zero.
        let player_score = self
            .controller
            .call_or_default(
                LedgerMethod::EpochScore.as_str(),
                self.ledger.epoch_score(player, epoch),
            )
            .await;

        let total_players = self.total_player_count().await?;

        let rank = self.rank_against(player_score, epoch, total_players).await;
        let mut top_players = self.top_players(epoch, total_players).await;
        for entry in &mut top_players {
            entry.is_current_player = entry.address == player;
        }

        Ok(LeaderboardSnapshot {
            epoch,
            player_score,
            player_rank: rank,
            total_players,
            top_players,
            epoch_time_remaining_secs: self.epoch_time_remaining().await,
            last_updated: self.controller.now(),
        })
    }

    // =========================================================================
    // DIRECT READS
    // =========================================================================

    /// Current epoch id.
    ///
    /// # Errors
    ///
    /// The classified ledger failure (published to the session).
    pub async fn current_epoch(&self) -> Result<u64, ClassifiedError> {
        self.controller
            .call(
                LedgerMethod::CurrentEpoch.as_str(),
                self.ledger.current_epoch(),
            )
            .await
    }

    /// Score of `player` in `epoch`.
    ///
    /// # Errors
    ///
    /// The classified ledger failure (published to the session).
    pub async fn epoch_score(&self, player: Address, epoch: u64) -> Result<U256, ClassifiedError> {
        self.controller
            .call(
                LedgerMethod::EpochScore.as_str(),
                self.ledger.epoch_score(player, epoch),
            )
            .await
    }

    /// Registry size.
    ///
    /// # Errors
    ///
    /// The classified ledger failure (published to the session).
    pub async fn total_player_count(&self) -> Result<u64, ClassifiedError> {
        self.controller
            .call(
                LedgerMethod::TotalPlayerCount.as_str(),
                self.ledger.total_player_count(),
            )
            .await
    }

    /// Rank of `player` in `epoch`, re-reading the registry size.
    ///
    /// Never fails: an unreadable registry size yields rank 0 of 0.
    pub async fn player_rank(&self, player: Address, epoch: u64) -> PlayerRank {
        let total_players = match self
            .controller
            .call_silent(
                LedgerMethod::TotalPlayerCount.as_str(),
                self.ledger.total_player_count(),
            )
            .await
        {
            Ok(total) => total,
            Err(_) => return PlayerRank::default(),
        };

        let score = self
            .controller
            .call_or_default(
                LedgerMethod::EpochScore.as_str(),
                self.ledger.epoch_score(player, epoch),
            )
            .await;

        PlayerRank {
            rank: self.rank_against(score, epoch, total_players).await,
            total_players,
        }
    }

    /// Last published snapshot.
    #[must_use]
    pub fn leaderboard(&self) -> Option<Arc<LeaderboardSnapshot>> {
        self.controller.store().leaderboard()
    }

    /// `Epoch <e> - Rank #<r> - Score: <s>`, or a not-loaded notice.
    #[must_use]
    pub fn leaderboard_status_message(&self) -> String {
        self.leaderboard()
            .map_or_else(|| NOT_LOADED_STATUS.to_string(), |snapshot| snapshot.summary())
    }

    // =========================================================================
    // SCANS
    // =========================================================================

    /// One plus the number of registry entries scoring strictly above `score`.
    async fn rank_against(&self, score: U256, epoch: u64, total_players: u64) -> u64 {
        if total_players == 0 {
            return 0;
        }

        let batch_size = self.config.rank_batch_size.max(1) as u64;
        let mut ahead = 0u64;
        let mut start = 0u64;
        while start < total_players {
            let end = start.saturating_add(batch_size).min(total_players);
            let scores = join_all((start..end).map(|index| self.entry_score(index, epoch))).await;
            ahead += scores.iter().filter(|entry| **entry > score).count() as u64;
            start = end;
        }

        tracing::debug!(epoch, total_players, ahead, "Rank scan finished");
        ahead + 1
    }

    async fn entry_score(&self, index: u64, epoch: u64) -> U256 {
        let Ok(address) = self
            .controller
            .call_silent(
                LedgerMethod::PlayerByIndex.as_str(),
                self.ledger.player_by_index(index),
            )
            .await
        else {
            return U256::ZERO;
        };

        self.controller
            .call_or_default(
                LedgerMethod::EpochScore.as_str(),
                self.ledger.epoch_score(address, epoch),
            )
            .await
    }

    /// Best `top_n` of the first `cohort_scan_cap` registry entries.
    async fn top_players(&self, epoch: u64, total_players: u64) -> Vec<LeaderboardPlayer> {
        let scan_len = total_players.min(self.config.cohort_scan_cap);
        if scan_len == 0 {
            return Vec::new();
        }

        let batch_size = (self.config.cohort_batch_size.max(1) as u64).min(scan_len);
        let mut players = Vec::with_capacity(usize::try_from(scan_len).unwrap_or(0));
        let mut start = 0u64;
        while start < scan_len {
            let end = start.saturating_add(batch_size).min(scan_len);
            let batch = join_all((start..end).map(|index| self.cohort_entry(index, epoch))).await;
            players.extend(batch.into_iter().flatten());
            start = end;
        }

        // Stable: equal scores keep registry order.
        players.sort_by(|a, b| b.score.cmp(&a.score));
        players.truncate(self.config.top_n);
        for (position, player) in players.iter_mut().enumerate() {
            player.rank = position as u64 + 1;
        }
        players
    }

    async fn cohort_entry(&self, index: u64, epoch: u64) -> Option<LeaderboardPlayer> {
        let address = self
            .controller
            .call_silent(
                LedgerMethod::PlayerByIndex.as_str(),
                self.ledger.player_by_index(index),
            )
            .await
            .ok()?;

        let score = self
            .controller
            .call_or_default(
                LedgerMethod::EpochScore.as_str(),
                self.ledger.epoch_score(address, epoch),
            )
            .await;
        let character = self
            .controller
            .call_or_default(
                LedgerMethod::Character.as_str(),
                self.ledger.character(address),
            )
            .await;

        Some(LeaderboardPlayer {
            address,
            score,
            rank: 0,
            level: character.level,
            kills: character.total_kills,
            is_current_player: false,
        })
    }

    async fn epoch_time_remaining(&self) -> u64 {
        match self
            .controller
            .call_silent(
                LedgerMethod::EpochTimeRemaining.as_str(),
                self.ledger.epoch_time_remaining(),
            )
            .await
        {
            Ok(seconds) => seconds,
            Err(_) => fallback_epoch_time_remaining(
                self.controller.now(),
                self.config.fallback_utc_offset(),
                self.config.fallback_epoch_secs,
            ),
        }
    }
}
