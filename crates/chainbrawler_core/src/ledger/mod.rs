//! # Ledger Client Contract
//!
//! Point reads and writes against the ChainBrawler contract. The core never
//! sees transport details; any implementation (JSON-RPC, wallet bridge,
//! [`memory::InMemoryLedger`]) satisfies the same trait.

pub mod memory;

use std::fmt;

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use chainbrawler_shared::PoolBalances;

use crate::error::LedgerError;

/// Result of a ledger call.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Character attributes the core reads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CharacterRecord {
    /// Class index.
    pub class: u8,
    /// Current level.
    pub level: u32,
    /// Experience points.
    pub experience: u64,
    /// Whether the character is alive.
    pub alive: bool,
    /// Lifetime kills.
    pub total_kills: u32,
}

/// Inclusion proof for one participant in one epoch's reward batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MerkleProofData {
    /// Reward amount in wei.
    pub amount: U256,
    /// Leaf index.
    pub index: U256,
    /// Sibling hashes, leaf to root.
    pub proof: Vec<B256>,
}

/// Ledger calls, for logging and diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LedgerMethod {
    /// `getCurrentEpoch`
    CurrentEpoch,
    /// `getEpochScore`
    EpochScore,
    /// `getTotalPlayerCount`
    TotalPlayerCount,
    /// `getPlayerByIndex`
    PlayerByIndex,
    /// `getCharacter`
    Character,
    /// `isClaimed`
    IsClaimed,
    /// `getMerkleProofForPlayer`
    MerkleProof,
    /// `claimPrize`
    ClaimPrize,
    /// `getAllPoolData`
    AllPoolData,
    /// `getEpochTimeRemaining`
    EpochTimeRemaining,
}

impl LedgerMethod {
    /// Contract function name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CurrentEpoch => "getCurrentEpoch",
            Self::EpochScore => "getEpochScore",
            Self::TotalPlayerCount => "getTotalPlayerCount",
            Self::PlayerByIndex => "getPlayerByIndex",
            Self::Character => "getCharacter",
            Self::IsClaimed => "isClaimed",
            Self::MerkleProof => "getMerkleProofForPlayer",
            Self::ClaimPrize => "claimPrize",
            Self::AllPoolData => "getAllPoolData",
            Self::EpochTimeRemaining => "getEpochTimeRemaining",
        }
    }
}

impl fmt::Display for LedgerMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read/write access to the authoritative ledger.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Current epoch id.
    async fn current_epoch(&self) -> LedgerResult<u64>;

    /// Score of `player` in `epoch`.
    async fn epoch_score(&self, player: Address, epoch: u64) -> LedgerResult<U256>;

    /// Registry size.
    async fn total_player_count(&self) -> LedgerResult<u64>;

    /// Registry entry at `index`.
    async fn player_by_index(&self, index: u64) -> LedgerResult<Address>;

    /// Character attributes of `player`.
    async fn character(&self, player: Address) -> LedgerResult<CharacterRecord>;

    /// Whether leaf `index` of `epoch` has been claimed.
    async fn is_claimed(&self, epoch: u64, index: U256) -> LedgerResult<bool>;

    /// Inclusion proof of `player` in `epoch`'s reward batch.
    async fn merkle_proof_for_player(
        &self,
        player: Address,
        epoch: u64,
    ) -> LedgerResult<MerkleProofData>;

    /// Claims a prize; returns the transaction hash.
    async fn claim_prize(
        &self,
        epoch: u64,
        index: U256,
        amount: U256,
        proof: &[B256],
    ) -> LedgerResult<B256>;

    /// The six treasury pool balances.
    async fn all_pool_data(&self) -> LedgerResult<PoolBalances>;

    /// Seconds until the current epoch ends.
    ///
    /// Optional; clients without it keep this default, which makes callers
    /// fall back to a calendar-day estimate.
    async fn epoch_time_remaining(&self) -> LedgerResult<u64> {
        Err(LedgerError::Unsupported(
            LedgerMethod::EpochTimeRemaining.as_str(),
        ))
    }
}
