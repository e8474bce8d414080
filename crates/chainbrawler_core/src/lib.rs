//! # ChainBrawler Core
//!
//! Operation orchestration between a game UI and the ChainBrawler contract.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐   point reads   ┌──────────────────────────────┐
//! │  LedgerClient   │ ◀────────────── │  LeaderboardEngine           │
//! │  (contract)     │                 │  ClaimsScanner               │
//! └─────────────────┘                 │  PoolAggregator              │
//!          ▲                          └──────────────┬───────────────┘
//!          │ failures                                │ guarded by
//!          ▼                                         ▼
//! ┌─────────────────┐   set_error     ┌──────────────────────────────┐
//! │ ErrorClassifier │ ──────────────▶ │  OperationController         │
//! │ + retry engine  │                 │  (single flight per session) │
//! └─────────────────┘                 └──────────────┬───────────────┘
//!                                                    │ snapshots
//!                                                    ▼
//!                                     ┌──────────────────────────────┐
//!                                     │  SessionStore                │
//!                                     └──────────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - One active operation per session; overlapping requests are refused
//! - Every failed ledger call is classified before it becomes visible
//! - A failing registry entry degrades that entry, never the scan
//! - Scores, amounts and balances stay `U256` end to end

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod claims;
pub mod classifier;
pub mod client;
pub mod clock;
pub mod codes;
pub mod config;
pub mod controller;
pub mod error;
pub mod leaderboard;
pub mod ledger;
pub mod merkle;
pub mod pools;
pub mod retry;
pub mod store;

pub use claims::ClaimsScanner;
pub use classifier::ErrorClassifier;
pub use client::ChainBrawlerClient;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::CoreConfig;
pub use controller::OperationController;
pub use error::{ClassifiedError, CoreError, CoreResult, ErrorCategory, LedgerError};
pub use leaderboard::{LeaderboardEngine, PlayerRank};
pub use ledger::memory::InMemoryLedger;
pub use ledger::{CharacterRecord, LedgerClient, LedgerMethod, LedgerResult, MerkleProofData};
pub use pools::PoolAggregator;
pub use retry::{retry, RetryPolicy};
pub use store::{InMemoryStore, SessionStore, StoreEvent};
