//! # Core Configuration
//!
//! Tunables for every engine, loadable from TOML. Missing sections and keys
//! take their defaults, so an empty file is a valid configuration.
//!
//! ```toml
//! [retry]
//! max_attempts = 3
//! base_delay_ms = 1000
//!
//! [leaderboard]
//! rank_batch_size = 25
//! cohort_batch_size = 50
//! cohort_scan_cap = 100
//! top_n = 10
//!
//! [claims]
//! lookback_epochs = 5
//!
//! [pools]
//! currency_symbol = "CFX"
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use chainbrawler_shared::{CURRENCY_SYMBOL, DISPLAY_DECIMALS, FALLBACK_EPOCH_SECS, TOKEN_DECIMALS};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::retry::RetryPolicy;

/// Largest supported token decimals (10^77 is the largest power of ten in a
/// `U256`).
pub const MAX_TOKEN_DECIMALS: u32 = 77;

/// Retry engine settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// First backoff delay in milliseconds.
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

/// Leaderboard engine settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardConfig {
    /// Registry entries per rank-scan batch.
    pub rank_batch_size: usize,
    /// Registry entries per cohort-scan batch.
    pub cohort_batch_size: usize,
    /// Registry entries the cohort scan looks at.
    pub cohort_scan_cap: u64,
    /// Cohort entries kept after sorting.
    pub top_n: usize,
    /// Assumed epoch length when the ledger cannot report time remaining.
    pub fallback_epoch_secs: u64,
    /// Offset east of UTC of the calendar day the fallback aligns to.
    /// Unset means the host's local zone.
    pub fallback_utc_offset_secs: Option<i64>,
}

impl LeaderboardConfig {
    /// Offset the epoch-time fallback aligns to: the configured override, or
    /// the host's current local offset.
    #[must_use]
    pub fn fallback_utc_offset(&self) -> i64 {
        self.fallback_utc_offset_secs
            .unwrap_or_else(|| i64::from(chrono::Local::now().offset().local_minus_utc()))
    }
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            rank_batch_size: 25,
            cohort_batch_size: 50,
            cohort_scan_cap: 100,
            top_n: 10,
            fallback_epoch_secs: FALLBACK_EPOCH_SECS,
            fallback_utc_offset_secs: None,
        }
    }
}

/// Claims scanner settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimsConfig {
    /// Epochs checked, counting the current one.
    pub lookback_epochs: u64,
    /// Leaf index used for the already-claimed check.
    pub placeholder_claim_index: u64,
    /// Send claim transactions through the retry engine.
    pub retry_claims: bool,
}

impl Default for ClaimsConfig {
    fn default() -> Self {
        Self {
            lookback_epochs: 5,
            placeholder_claim_index: 0,
            retry_claims: false,
        }
    }
}

/// Pool display settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolsConfig {
    /// Appended to formatted amounts.
    pub currency_symbol: String,
    /// Decimals of the native token.
    pub token_decimals: u32,
    /// Fraction digits shown.
    pub display_decimals: u32,
}

impl Default for PoolsConfig {
    fn default() -> Self {
        Self {
            currency_symbol: CURRENCY_SYMBOL.to_string(),
            token_decimals: TOKEN_DECIMALS,
            display_decimals: DISPLAY_DECIMALS,
        }
    }
}

/// Session store settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Capacity of each subscriber channel.
    pub event_buffer: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { event_buffer: 256 }
    }
}

/// All core settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// `[retry]`
    pub retry: RetryConfig,
    /// `[leaderboard]`
    pub leaderboard: LeaderboardConfig,
    /// `[claims]`
    pub claims: ClaimsConfig,
    /// `[pools]`
    pub pools: PoolsConfig,
    /// `[store]`
    pub store: StoreConfig,
}

impl CoreConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidConfig`] on malformed TOML or out-of-range values.
    pub fn from_toml_str(source: &str) -> CoreResult<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|err| CoreError::InvalidConfig(format!("unable to parse config: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`CoreError::ConfigLoad`] if the file cannot be read, otherwise as
    /// [`Self::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|err| CoreError::ConfigLoad {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.display(), "Loaded core configuration");
        Ok(config)
    }

    /// Serializes to TOML.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidConfig`] if serialization fails.
    pub fn to_toml_string(&self) -> CoreResult<String> {
        toml::to_string_pretty(self)
            .map_err(|err| CoreError::InvalidConfig(format!("unable to encode config: {err}")))
    }

    /// Checks every value is usable.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidConfig`] naming the first offending key.
    pub fn validate(&self) -> CoreResult<()> {
        let invalid = |key: &str, why: &str| Err(CoreError::InvalidConfig(format!("{key} {why}")));

        if self.leaderboard.rank_batch_size == 0 {
            return invalid("leaderboard.rank_batch_size", "must be at least 1");
        }
        if self.leaderboard.cohort_batch_size == 0 {
            return invalid("leaderboard.cohort_batch_size", "must be at least 1");
        }
        if self.leaderboard.top_n == 0 {
            return invalid("leaderboard.top_n", "must be at least 1");
        }
        if (self.leaderboard.cohort_scan_cap as usize) < self.leaderboard.top_n {
            return invalid("leaderboard.cohort_scan_cap", "must not be below top_n");
        }
        if self.leaderboard.fallback_epoch_secs == 0 {
            return invalid("leaderboard.fallback_epoch_secs", "must be positive");
        }
        if self.claims.lookback_epochs == 0 {
            return invalid("claims.lookback_epochs", "must be at least 1");
        }
        if self.retry.max_attempts == 0 {
            return invalid("retry.max_attempts", "must be at least 1");
        }
        if self.pools.token_decimals > MAX_TOKEN_DECIMALS {
            return invalid("pools.token_decimals", "must be at most 77");
        }
        if self.pools.display_decimals > self.pools.token_decimals {
            return invalid("pools.display_decimals", "must not exceed token_decimals");
        }
        if self.store.event_buffer == 0 {
            return invalid("store.event_buffer", "must be at least 1");
        }
        Ok(())
    }

    /// Retry settings as a policy.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.base_delay_ms),
        )
    }
}
