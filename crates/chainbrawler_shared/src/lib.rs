//! # ChainBrawler Shared
//!
//! Data model shared between the orchestration core and its consumers.
//!
//! Every snapshot type here is published wholesale: a consumer either sees
//! the previous snapshot or the new one, never a mix of the two.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod claims;
pub mod constants;
pub mod leaderboard;
pub mod operation;
pub mod pools;

pub use claims::{ClaimableReward, ClaimsSnapshot, RewardKind};
pub use constants::{
    CURRENCY_SYMBOL, DISPLAY_DECIMALS, FALLBACK_EPOCH_SECS, TOKEN_DECIMALS, UNKNOWN_ERROR_CODE,
};
pub use leaderboard::{LeaderboardPlayer, LeaderboardSnapshot};
pub use operation::{Operation, OperationStatus, OperationType, OperationUpdate};
pub use pools::{PoolBalances, PoolInfo, PoolKind, PoolsSnapshot};
