//! # ChainBrawler Client
//!
//! One session's worth of wiring: store, ledger, controller and the three
//! engines, all sharing the same single-flight guard.

use std::future::Future;
use std::sync::Arc;

use crate::claims::ClaimsScanner;
use crate::clock::{Clock, SystemClock};
use crate::config::CoreConfig;
use crate::controller::OperationController;
use crate::error::{ClassifiedError, CoreResult, LedgerError};
use crate::leaderboard::LeaderboardEngine;
use crate::ledger::LedgerClient;
use crate::pools::PoolAggregator;
use crate::store::{InMemoryStore, SessionStore};

/// Session facade over a ledger client.
///
/// Create one per session; engines of the same client refuse to overlap.
#[derive(Clone)]
pub struct ChainBrawlerClient {
    config: CoreConfig,
    ledger: Arc<dyn LedgerClient>,
    controller: OperationController,
    leaderboard: LeaderboardEngine,
    claims: ClaimsScanner,
    pools: PoolAggregator,
}

impl ChainBrawlerClient {
    /// Client with a fresh [`InMemoryStore`] and the system clock.
    ///
    /// # Errors
    ///
    /// [`crate::CoreError::InvalidConfig`] if `config` does not validate.
    pub fn new(ledger: Arc<dyn LedgerClient>, config: CoreConfig) -> CoreResult<Self> {
        let store = Arc::new(InMemoryStore::new(config.store.event_buffer));
        Self::with_store(ledger, store, Arc::new(SystemClock), config)
    }

    /// Client over a caller-owned store and clock.
    ///
    /// # Errors
    ///
    /// [`crate::CoreError::InvalidConfig`] if `config` does not validate.
    pub fn with_store(
        ledger: Arc<dyn LedgerClient>,
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        config: CoreConfig,
    ) -> CoreResult<Self> {
        config.validate()?;

        let controller = OperationController::new(store, clock);
        let leaderboard = LeaderboardEngine::new(
            controller.clone(),
            Arc::clone(&ledger),
            config.leaderboard.clone(),
        );
        let claims = ClaimsScanner::new(
            controller.clone(),
            Arc::clone(&ledger),
            config.claims.clone(),
            config.retry_policy(),
            config.pools.clone(),
        );
        let pools = PoolAggregator::new(controller.clone(), Arc::clone(&ledger), config.pools.clone());

        tracing::info!(
            lookback_epochs = config.claims.lookback_epochs,
            cohort_scan_cap = config.leaderboard.cohort_scan_cap,
            "ChainBrawler client ready"
        );

        Ok(Self {
            config,
            ledger,
            controller,
            leaderboard,
            claims,
            pools,
        })
    }

    /// Leaderboard engine.
    #[must_use]
    pub const fn leaderboard(&self) -> &LeaderboardEngine {
        &self.leaderboard
    }

    /// Claims scanner.
    #[must_use]
    pub const fn claims(&self) -> &ClaimsScanner {
        &self.claims
    }

    /// Pool aggregator.
    #[must_use]
    pub const fn pools(&self) -> &PoolAggregator {
        &self.pools
    }

    /// Operation controller shared by the engines.
    #[must_use]
    pub const fn controller(&self) -> &OperationController {
        &self.controller
    }

    /// Session store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        self.controller.store()
    }

    /// Ledger client.
    #[must_use]
    pub fn ledger(&self) -> &Arc<dyn LedgerClient> {
        &self.ledger
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Acknowledges the session error.
    pub fn clear_error(&self) {
        self.controller.clear_error();
    }

    /// Runs `operation` with the configured retry policy.
    ///
    /// # Errors
    ///
    /// The classified error of the last attempt.
    pub async fn retry<T, F, Fut>(&self, operation: F) -> Result<T, ClassifiedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        self.controller
            .retry(self.config.retry_policy(), operation)
            .await
    }
}
