//! # Pool Types
//!
//! The six treasury pools the ledger reports in one call.

use std::time::SystemTime;

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Named treasury pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PoolKind {
    /// Epoch prizes.
    Prize,
    /// Equipment drops.
    Equipment,
    /// Gas reimbursements.
    GasRefund,
    /// Development funding.
    Developer,
    /// Carried into the next epoch.
    NextEpoch,
    /// Contingency reserve.
    Emergency,
}

impl PoolKind {
    /// All pools, in ledger order.
    pub const ALL: [Self; 6] = [
        Self::Prize,
        Self::Equipment,
        Self::GasRefund,
        Self::Developer,
        Self::NextEpoch,
        Self::Emergency,
    ];

    /// Static label shown next to the pool.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Prize => "Rewards for top players each epoch",
            Self::Equipment => "Funding for equipment drops",
            Self::GasRefund => "Gas fee reimbursements",
            Self::Developer => "Development funding",
            Self::NextEpoch => "Reserved for next epoch rewards",
            Self::Emergency => "Emergency funds and contingency",
        }
    }
}

/// Raw balances as returned by the ledger, in wei.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolBalances {
    /// Prize pool.
    pub prize: U256,
    /// Equipment pool.
    pub equipment: U256,
    /// Gas refund pool.
    pub gas_refund: U256,
    /// Developer pool.
    pub developer: U256,
    /// Next epoch pool.
    pub next_epoch: U256,
    /// Emergency pool.
    pub emergency: U256,
}

impl PoolBalances {
    /// Balance of one pool.
    #[must_use]
    pub const fn get(&self, kind: PoolKind) -> U256 {
        match kind {
            PoolKind::Prize => self.prize,
            PoolKind::Equipment => self.equipment,
            PoolKind::GasRefund => self.gas_refund,
            PoolKind::Developer => self.developer,
            PoolKind::NextEpoch => self.next_epoch,
            PoolKind::Emergency => self.emergency,
        }
    }

    /// Sum of all six balances.
    #[must_use]
    pub fn total(&self) -> U256 {
        PoolKind::ALL
            .iter()
            .fold(U256::ZERO, |total, kind| total.saturating_add(self.get(*kind)))
    }
}

/// Display-ready view of one pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolInfo {
    /// Balance in wei.
    pub value: U256,
    /// Balance in whole tokens with the currency symbol.
    pub formatted_value: String,
    /// Static label.
    pub description: String,
    /// Integer share of the total, 0-100.
    pub percentage_of_total: u8,
}

/// All pools as of one read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolsSnapshot {
    /// Prize pool.
    pub prize_pool: PoolInfo,
    /// Equipment pool.
    pub equipment_pool: PoolInfo,
    /// Gas refund pool.
    pub gas_refund_pool: PoolInfo,
    /// Developer pool.
    pub developer_pool: PoolInfo,
    /// Next epoch pool.
    pub next_epoch_pool: PoolInfo,
    /// Emergency pool.
    pub emergency_pool: PoolInfo,
    /// Sum of the six balances.
    pub total_value: U256,
    /// When the balances were read.
    pub last_updated: SystemTime,
}

impl PoolsSnapshot {
    /// One pool by kind.
    #[must_use]
    pub const fn pool(&self, kind: PoolKind) -> &PoolInfo {
        match kind {
            PoolKind::Prize => &self.prize_pool,
            PoolKind::Equipment => &self.equipment_pool,
            PoolKind::GasRefund => &self.gas_refund_pool,
            PoolKind::Developer => &self.developer_pool,
            PoolKind::NextEpoch => &self.next_epoch_pool,
            PoolKind::Emergency => &self.emergency_pool,
        }
    }

    /// Mutable access to one pool by kind.
    pub fn pool_mut(&mut self, kind: PoolKind) -> &mut PoolInfo {
        match kind {
            PoolKind::Prize => &mut self.prize_pool,
            PoolKind::Equipment => &mut self.equipment_pool,
            PoolKind::GasRefund => &mut self.gas_refund_pool,
            PoolKind::Developer => &mut self.developer_pool,
            PoolKind::NextEpoch => &mut self.next_epoch_pool,
            PoolKind::Emergency => &mut self.emergency_pool,
        }
    }

    /// Pools in ledger order.
    pub fn iter(&self) -> impl Iterator<Item = (PoolKind, &PoolInfo)> {
        PoolKind::ALL.into_iter().map(move |kind| (kind, self.pool(kind)))
    }
}
