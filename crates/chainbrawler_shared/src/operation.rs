//! # Operations
//!
//! The single in-flight action tracked per session.
//!
//! ```text
//! empty ──start──▶ pending/processing ──ok──▶ completed ──clear──▶ empty
//!                          │
//!                          └──────failure──▶ error ──clear──▶ empty
//! ```

use std::fmt;
use std::time::SystemTime;

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

/// Action names the core knows how to track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationType {
    /// Mint a new character.
    CreateCharacter,
    /// Pay to restore endurance.
    HealCharacter,
    /// Pay to bring a dead character back.
    ResurrectCharacter,
    /// Open a fight against an enemy.
    FightEnemy,
    /// Play further rounds of an open fight.
    ContinueFight,
    /// Attempt to flee an open fight.
    FleeRound,
    /// Claim an epoch prize with a Merkle proof.
    ClaimPrize,
    /// Read the participant's character.
    LoadCharacter,
    /// Build a leaderboard snapshot.
    LoadLeaderboard,
    /// Scan recent epochs for claimable rewards.
    LoadClaims,
    /// Read the treasury pools.
    LoadPools,
}

impl OperationType {
    /// Ledger-facing action name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateCharacter => "createCharacter",
            Self::HealCharacter => "healCharacter",
            Self::ResurrectCharacter => "resurrectCharacter",
            Self::FightEnemy => "fightEnemy",
            Self::ContinueFight => "continueFight",
            Self::FleeRound => "fleeRound",
            Self::ClaimPrize => "claimPrize",
            Self::LoadCharacter => "loadCharacter",
            Self::LoadLeaderboard => "loadLeaderboard",
            Self::LoadClaims => "loadClaims",
            Self::LoadPools => "loadPools",
        }
    }

    /// Whether this action mutates the ledger.
    #[must_use]
    pub const fn is_write(self) -> bool {
        matches!(
            self,
            Self::CreateCharacter
                | Self::HealCharacter
                | Self::ResurrectCharacter
                | Self::FightEnemy
                | Self::ContinueFight
                | Self::FleeRound
                | Self::ClaimPrize
        )
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of an [`Operation`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationStatus {
    /// Accepted, nothing sent yet.
    #[default]
    Pending,
    /// Ledger calls in flight.
    Processing,
    /// Finished successfully.
    Completed,
    /// Finished with a failure.
    Error,
}

/// The current operation of a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Action being tracked. Cleared once the operation finishes.
    pub operation_type: Option<OperationType>,
    /// Lifecycle status.
    pub status: OperationStatus,
    /// True until the operation completes or fails.
    pub is_active: bool,
    /// True when the action mutates the ledger.
    pub is_write_operation: bool,
    /// When the operation was started.
    pub start_time: SystemTime,
    /// Human-readable progress line.
    pub progress: String,
    /// Failure message, set by `fail`.
    pub error: Option<String>,
    /// Transaction hash for write operations.
    pub hash: Option<B256>,
}

impl Operation {
    /// Progress line of a freshly started operation.
    pub const STARTING: &'static str = "Starting operation...";
    /// Progress line of a completed operation.
    pub const COMPLETED: &'static str = "Operation completed";
    /// Progress line of a failed operation.
    pub const FAILED: &'static str = "Operation failed";

    /// Creates an active, pending operation.
    #[must_use]
    pub fn started(operation_type: OperationType, now: SystemTime) -> Self {
        Self {
            operation_type: Some(operation_type),
            status: OperationStatus::Pending,
            is_active: true,
            is_write_operation: operation_type.is_write(),
            start_time: now,
            progress: Self::STARTING.to_string(),
            error: None,
            hash: None,
        }
    }

    /// Whether the operation has reached a terminal status.
    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(
            self.status,
            OperationStatus::Completed | OperationStatus::Error
        )
    }
}

/// Partial update merged into an [`Operation`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OperationUpdate {
    /// Replaces the progress line.
    pub progress: Option<String>,
    /// Records a transaction hash.
    pub hash: Option<B256>,
    /// Records a failure message.
    pub error: Option<String>,
}

impl OperationUpdate {
    /// Update carrying only a progress line.
    #[must_use]
    pub fn progress(text: impl Into<String>) -> Self {
        Self {
            progress: Some(text.into()),
            ..Self::default()
        }
    }

    /// Update carrying only a transaction hash.
    #[must_use]
    pub fn hash(hash: B256) -> Self {
        Self {
            hash: Some(hash),
            ..Self::default()
        }
    }

    /// Merges the set fields into `operation`.
    pub fn apply_to(self, operation: &mut Operation) {
        if let Some(progress) = self.progress {
            operation.progress = progress;
        }
        if let Some(hash) = self.hash {
            operation.hash = Some(hash);
        }
        if let Some(error) = self.error {
            operation.error = Some(error);
        }
    }
}
