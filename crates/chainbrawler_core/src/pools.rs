//! # Pool Aggregator
//!
//! Reads the six treasury balances in one call and turns them into a
//! display-ready [`PoolsSnapshot`]. All arithmetic stays in `U256`;
//! formatting is exact integer division with half-up rounding.

use std::sync::Arc;
use std::time::SystemTime;

use alloy_primitives::U256;
use chainbrawler_shared::{OperationType, OperationUpdate, PoolBalances, PoolInfo, PoolKind, PoolsSnapshot};

use crate::config::PoolsConfig;
use crate::controller::OperationController;
use crate::error::CoreResult;
use crate::ledger::{LedgerClient, LedgerMethod};

/// Status line while loading.
pub const LOADING_STATUS: &str = "Loading pools data...";
/// Status line after a successful load.
pub const LOADED_STATUS: &str = "Pools data loaded successfully";
/// Summary when nothing has been loaded yet.
pub const NOT_LOADED_STATUS: &str = "Pools data not loaded";

/// Renders `value` (in base units) as whole tokens with
/// `config.display_decimals` fraction digits and the currency symbol.
///
/// ```
/// use alloy_primitives::U256;
/// use chainbrawler_core::config::PoolsConfig;
/// use chainbrawler_core::pools::format_ether;
///
/// let wei = U256::from(1_234_567_000_000_000_000u64);
/// assert_eq!(format_ether(wei, &PoolsConfig::default()), "1.2346 CFX");
/// ```
#[must_use]
pub fn format_ether(value: U256, config: &PoolsConfig) -> String {
    let display = config.display_decimals.min(config.token_decimals);
    let ten = U256::from(10u8);
    let unit = ten.pow(U256::from(config.token_decimals - display));
    let display_scale = ten.pow(U256::from(display));

    let mut shown = value / unit;
    let remainder = value % unit;
    // Half up; `remainder >= unit - remainder` avoids doubling past U256::MAX.
    if !remainder.is_zero() && remainder >= unit - remainder {
        shown = shown.saturating_add(U256::from(1u8));
    }

    let whole = shown / display_scale;
    let symbol = &config.currency_symbol;
    if display == 0 {
        return format!("{whole} {symbol}");
    }
    let fraction = (shown % display_scale).to_string();
    format!(
        "{whole}.{fraction:0>width$} {symbol}",
        width = display as usize
    )
}

/// Integer share of `value` in `total`, 0 when `total` is zero.
#[must_use]
pub fn percentage_of(value: U256, total: U256) -> u8 {
    if total.is_zero() {
        return 0;
    }
    let hundred = U256::from(100u8);
    let share = value.checked_mul(hundred).map_or_else(
        || value / (total / hundred).max(U256::from(1u8)),
        |scaled| scaled / total,
    );
    // `share <= 100` whenever `value <= total`.
    u8::try_from(share.as_limbs()[0].min(100)).unwrap_or(100)
}

/// Builds a snapshot from raw balances.
#[must_use]
pub fn build_snapshot(balances: &PoolBalances, config: &PoolsConfig, now: SystemTime) -> PoolsSnapshot {
    let total_value = balances.total();
    let info = |kind: PoolKind| {
        let value = balances.get(kind);
        PoolInfo {
            value,
            formatted_value: format_ether(value, config),
            description: kind.description().to_string(),
            percentage_of_total: percentage_of(value, total_value),
        }
    };

    PoolsSnapshot {
        prize_pool: info(PoolKind::Prize),
        equipment_pool: info(PoolKind::Equipment),
        gas_refund_pool: info(PoolKind::GasRefund),
        developer_pool: info(PoolKind::Developer),
        next_epoch_pool: info(PoolKind::NextEpoch),
        emergency_pool: info(PoolKind::Emergency),
        total_value,
        last_updated: now,
    }
}

/// Recomputes every percentage from the current values and total.
///
/// Idempotent; a zero total leaves the snapshot untouched.
#[must_use]
pub fn calculate_pool_percentages(mut snapshot: PoolsSnapshot) -> PoolsSnapshot {
    let total = snapshot.total_value;
    if total.is_zero() {
        return snapshot;
    }
    for kind in PoolKind::ALL {
        let pool = snapshot.pool_mut(kind);
        pool.percentage_of_total = percentage_of(pool.value, total);
    }
    snapshot
}

/// Loads treasury pools into the session.
#[derive(Clone)]
pub struct PoolAggregator {
    controller: OperationController,
    ledger: Arc<dyn LedgerClient>,
    config: PoolsConfig,
}

impl PoolAggregator {
    /// Creates an aggregator.
    #[must_use]
    pub fn new(
        controller: OperationController,
        ledger: Arc<dyn LedgerClient>,
        config: PoolsConfig,
    ) -> Self {
        Self {
            controller,
            ledger,
            config,
        }
    }

    /// Reads all six balances and publishes the snapshot.
    ///
    /// # Errors
    ///
    /// [`crate::CoreError::OperationRefused`] if another operation is active,
    /// [`crate::CoreError::Ledger`] if the balances cannot be read.
    pub async fn load_pools(&self) -> CoreResult<PoolsSnapshot> {
        let snapshot = self
            .controller
            .run(OperationType::LoadPools, LOADING_STATUS, async {
                let balances = self
                    .controller
                    .call(
                        LedgerMethod::AllPoolData.as_str(),
                        self.ledger.all_pool_data(),
                    )
                    .await?;
                let snapshot = build_snapshot(&balances, &self.config, self.controller.now());
                self.controller.store().update_pools(snapshot.clone());
                Ok((snapshot, OperationUpdate::default()))
            })
            .await?;

        self.controller
            .store()
            .set_status_message(LOADED_STATUS.to_string());
        tracing::info!(total = %snapshot.total_value, "Pools loaded");
        Ok(snapshot)
    }

    /// Same as [`Self::load_pools`].
    ///
    /// # Errors
    ///
    /// See [`Self::load_pools`].
    pub async fn refresh_pools(&self) -> CoreResult<PoolsSnapshot> {
        self.load_pools().await
    }

    /// Last published snapshot.
    #[must_use]
    pub fn pools(&self) -> Option<Arc<PoolsSnapshot>> {
        self.controller.store().pools()
    }

    /// `Total pool value: <amount>`, or a not-loaded notice.
    #[must_use]
    pub fn pool_status_message(&self) -> String {
        self.pools().map_or_else(
            || NOT_LOADED_STATUS.to_string(),
            |snapshot| {
                format!(
                    "Total pool value: {}",
                    format_ether(snapshot.total_value, &self.config)
                )
            },
        )
    }

    /// Formats an amount with this aggregator's display settings.
    #[must_use]
    pub fn format(&self, value: U256) -> String {
        format_ether(value, &self.config)
    }
}
