//! # Claims Types
//!
//! Rewards a participant can still pull from the ledger.

use std::time::SystemTime;

use alloy_primitives::{B256, U256};
use serde::{Deserialize, Serialize};

/// Where a reward comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    /// Leaderboard prize for a finished epoch.
    Epoch,
    /// Equipment drop payout.
    Equipment,
    /// Gas refund.
    GasRefund,
}

/// A reward backed by a Merkle inclusion proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimableReward {
    /// Reward source.
    pub kind: RewardKind,
    /// Amount in wei.
    pub amount: U256,
    /// Display text.
    pub description: String,
    /// Whether the reward is currently claimable.
    pub can_claim: bool,
    /// Epoch the reward belongs to.
    pub epoch: u64,
    /// Leaf index in the epoch's reward tree.
    pub index: U256,
    /// Sibling hashes, leaf to root.
    pub proof: Vec<B256>,
}

impl ClaimableReward {
    /// Builds an epoch prize entry.
    #[must_use]
    pub fn epoch_prize(epoch: u64, index: U256, amount: U256, proof: Vec<B256>) -> Self {
        Self {
            kind: RewardKind::Epoch,
            amount,
            description: format!("Epoch {epoch} leaderboard reward"),
            can_claim: true,
            epoch,
            index,
            proof,
        }
    }

    /// Whether this entry is the leaf `(epoch, index)`.
    #[inline]
    #[must_use]
    pub fn is_leaf(&self, epoch: u64, index: U256) -> bool {
        self.epoch == epoch && self.index == index
    }
}

/// Claimable rewards as of one scan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimsSnapshot {
    /// Rewards found, newest epoch first.
    pub available: Vec<ClaimableReward>,
    /// Exact sum of `available` amounts.
    pub total_claimable: U256,
    /// When the scan finished.
    pub last_checked: SystemTime,
}

impl ClaimsSnapshot {
    /// Builds a snapshot, deriving the total from `available`.
    #[must_use]
    pub fn new(available: Vec<ClaimableReward>, last_checked: SystemTime) -> Self {
        let total_claimable = sum_amounts(&available);
        Self {
            available,
            total_claimable,
            last_checked,
        }
    }

    /// Copy of this snapshot with the leaf `(epoch, index)` removed and the
    /// total recomputed.
    #[must_use]
    pub fn without(&self, epoch: u64, index: U256) -> Self {
        let available: Vec<_> = self
            .available
            .iter()
            .filter(|reward| !reward.is_leaf(epoch, index))
            .cloned()
            .collect();
        Self::new(available, self.last_checked)
    }

    /// Whether nothing is claimable.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }
}

fn sum_amounts(rewards: &[ClaimableReward]) -> U256 {
    rewards
        .iter()
        .fold(U256::ZERO, |total, reward| total.saturating_add(reward.amount))
}
