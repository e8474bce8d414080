//! # Claims Scanner
//!
//! Finds unclaimed epoch rewards for a participant and submits claims.
//!
//! The scan looks at the current epoch and the epochs just before it. Each
//! epoch is checked on its own: a failed lookup only means "nothing to claim
//! there", never an error for the whole scan.
//!
//! The already-claimed check queries a fixed leaf index
//! ([`ClaimsConfig::placeholder_claim_index`]). That is only exact when the
//! ledger places every participant at that index; the real index is only
//! known once the proof has been fetched.

use std::sync::Arc;

use alloy_primitives::{Address, B256, U256};
use chainbrawler_shared::{ClaimableReward, ClaimsSnapshot, OperationType, OperationUpdate};
use futures::future::join_all;

use crate::config::{ClaimsConfig, PoolsConfig};
use crate::controller::OperationController;
use crate::error::{ClassifiedError, CoreResult};
use crate::ledger::{LedgerClient, LedgerMethod, MerkleProofData};
use crate::pools::format_ether;
use crate::retry::RetryPolicy;

/// Status line while scanning.
pub const LOADING_STATUS: &str = "Loading claims data...";
/// Status line after a successful scan.
pub const LOADED_STATUS: &str = "Claims data loaded successfully";
/// Status line while a claim is submitted.
pub const CLAIMING_STATUS: &str = "Claiming reward...";
/// Status line after a successful claim.
pub const CLAIMED_STATUS: &str = "Reward claimed successfully";
/// Summary when nothing has been loaded yet.
pub const NOT_LOADED_STATUS: &str = "Claims data not loaded";

/// Scans for and claims epoch rewards.
#[derive(Clone)]
pub struct ClaimsScanner {
    controller: OperationController,
    ledger: Arc<dyn LedgerClient>,
    config: ClaimsConfig,
    retry: RetryPolicy,
    display: PoolsConfig,
}

impl ClaimsScanner {
    /// Creates a scanner. `retry` applies to claim submissions when
    /// [`ClaimsConfig::retry_claims`] is set; `display` formats amounts.
    #[must_use]
    pub fn new(
        controller: OperationController,
        ledger: Arc<dyn LedgerClient>,
        config: ClaimsConfig,
        retry: RetryPolicy,
        display: PoolsConfig,
    ) -> Self {
        Self {
            controller,
            ledger,
            config,
            retry,
            display,
        }
    }

    /// Scans the lookback window for `player` and publishes the result.
    ///
    /// # Errors
    ///
    /// [`crate::CoreError::OperationRefused`] if another operation is active,
    /// [`crate::CoreError::Ledger`] if the current epoch cannot be read.
    pub async fn load_claims(&self, player: Address) -> CoreResult<ClaimsSnapshot> {
        let snapshot = self
            .controller
            .run(OperationType::LoadClaims, LOADING_STATUS, async {
                let epoch = self
                    .controller
                    .call(
                        LedgerMethod::CurrentEpoch.as_str(),
                        self.ledger.current_epoch(),
                    )
                    .await?;

                // Newest first; stops at epoch 0.
                let epochs = (0..self.config.lookback_epochs).filter_map(|back| epoch.checked_sub(back));
                let found = join_all(epochs.map(|epoch| self.epoch_reward(player, epoch))).await;

                let snapshot = ClaimsSnapshot::new(
                    found.into_iter().flatten().collect(),
                    self.controller.now(),
                );
                self.controller.store().update_claims(snapshot.clone());
                Ok((snapshot, OperationUpdate::default()))
            })
            .await?;

        self.controller
            .store()
            .set_status_message(LOADED_STATUS.to_string());
        tracing::info!(
            rewards = snapshot.available.len(),
            total = %snapshot.total_claimable,
            "Claims loaded"
        );
        Ok(snapshot)
    }

    /// Same as [`Self::load_claims`].
    ///
    /// # Errors
    ///
    /// See [`Self::load_claims`].
    pub async fn refresh_claims(&self, player: Address) -> CoreResult<ClaimsSnapshot> {
        self.load_claims(player).await
    }

    async fn epoch_reward(&self, player: Address, epoch: u64) -> Option<ClaimableReward> {
        let placeholder = U256::from(self.config.placeholder_claim_index);
        let claimed = self
            .controller
            .call_silent(
                LedgerMethod::IsClaimed.as_str(),
                self.ledger.is_claimed(epoch, placeholder),
            )
            .await
            .ok()?;
        if claimed {
            return None;
        }

        let claim = self
            .controller
            .call_silent(
                LedgerMethod::MerkleProof.as_str(),
                self.ledger.merkle_proof_for_player(player, epoch),
            )
            .await
            .ok()?;
        if claim.amount.is_zero() {
            return None;
        }

        Some(ClaimableReward::epoch_prize(
            epoch,
            claim.index,
            claim.amount,
            claim.proof,
        ))
    }

    /// Submits a claim and drops the claimed leaf from the published
    /// snapshot.
    ///
    /// Returns the transaction hash, which is also recorded on the completed
    /// operation.
    ///
    /// # Errors
    ///
    /// [`crate::CoreError::OperationRefused`] if another operation is active,
    /// [`crate::CoreError::Ledger`] if the ledger rejects the claim.
    pub async fn claim_prize(
        &self,
        epoch: u64,
        index: U256,
        amount: U256,
        proof: &[B256],
    ) -> CoreResult<B256> {
        let hash = self
            .controller
            .run(OperationType::ClaimPrize, CLAIMING_STATUS, async {
                let hash = if self.config.retry_claims {
                    let ledger = &self.ledger;
                    self.controller
                        .retry(self.retry, move || {
                            ledger.claim_prize(epoch, index, amount, proof)
                        })
                        .await?
                } else {
                    self.controller
                        .call(
                            LedgerMethod::ClaimPrize.as_str(),
                            self.ledger.claim_prize(epoch, index, amount, proof),
                        )
                        .await?
                };

                let store = self.controller.store();
                if let Some(claims) = store.claims() {
                    store.update_claims(claims.without(epoch, index));
                }
                Ok((hash, OperationUpdate::hash(hash)))
            })
            .await?;

        self.controller
            .store()
            .set_status_message(CLAIMED_STATUS.to_string());
        tracing::info!(epoch, %index, %hash, "Reward claimed");
        Ok(hash)
    }

    /// Claims a reward found by a previous scan.
    ///
    /// # Errors
    ///
    /// See [`Self::claim_prize`].
    pub async fn claim(&self, reward: &ClaimableReward) -> CoreResult<B256> {
        self.claim_prize(reward.epoch, reward.index, reward.amount, &reward.proof)
            .await
    }

    /// Whether `reward` may be claimed right now.
    #[must_use]
    pub fn can_claim(&self, reward: &ClaimableReward) -> bool {
        reward.can_claim
            && !self
                .controller
                .store()
                .operation()
                .is_some_and(|op| op.is_active)
    }

    // =========================================================================
    // DIRECT READS
    // =========================================================================

    /// Whether leaf `index` of `epoch` is claimed.
    ///
    /// # Errors
    ///
    /// The classified ledger failure (published to the session).
    pub async fn is_claimed(&self, epoch: u64, index: U256) -> Result<bool, ClassifiedError> {
        self.controller
            .call(
                LedgerMethod::IsClaimed.as_str(),
                self.ledger.is_claimed(epoch, index),
            )
            .await
    }

    /// Inclusion proof of `player` in `epoch`.
    ///
    /// # Errors
    ///
    /// The classified ledger failure (published to the session).
    pub async fn merkle_proof(
        &self,
        player: Address,
        epoch: u64,
    ) -> Result<MerkleProofData, ClassifiedError> {
        self.controller
            .call(
                LedgerMethod::MerkleProof.as_str(),
                self.ledger.merkle_proof_for_player(player, epoch),
            )
            .await
    }

    /// Last published snapshot.
    #[must_use]
    pub fn claims(&self) -> Option<Arc<ClaimsSnapshot>> {
        self.controller.store().claims()
    }

    /// Rewards of the last published snapshot.
    #[must_use]
    pub fn claimable_rewards(&self) -> Vec<ClaimableReward> {
        self.claims()
            .map(|snapshot| snapshot.available.clone())
            .unwrap_or_default()
    }

    /// `<n> claimable rewards worth <amount>`, or a not-loaded notice.
    #[must_use]
    pub fn claims_status_message(&self) -> String {
        self.claims().map_or_else(
            || NOT_LOADED_STATUS.to_string(),
            |snapshot| {
                format!(
                    "{} claimable rewards worth {}",
                    snapshot.available.len(),
                    format_ether(snapshot.total_claimable, &self.display)
                )
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::{CoreError, LedgerError};
    use crate::ledger::memory::InMemoryLedger;
    use crate::store::{InMemoryStore, SessionStore};
    use chainbrawler_shared::OperationStatus;
    use std::time::Duration;

    fn player(n: u8) -> Address {
        Address::repeat_byte(n)
    }

    fn scanner(ledger: Arc<InMemoryLedger>, config: ClaimsConfig) -> (Arc<InMemoryStore>, ClaimsScanner) {
        let store = Arc::new(InMemoryStore::default());
        let controller = OperationController::new(store.clone(), Arc::new(FixedClock::at_unix(0)));
        let scanner = ClaimsScanner::new(
            controller,
            ledger,
            config,
            RetryPolicy::new(3, Duration::from_millis(1)),
            PoolsConfig::default(),
        );
        (store, scanner)
    }

    #[tokio::test]
    async fn test_scan_newest_first() {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.set_current_epoch(6);
        for epoch in [1u64, 2, 4, 6] {
            ledger.publish_epoch_rewards(epoch, &[(player(1), U256::from(epoch * 10))]);
        }
        let (store, scanner) = scanner(ledger, ClaimsConfig::default());

        let snapshot = scanner.load_claims(player(1)).await.unwrap();

        let epochs: Vec<_> = snapshot.available.iter().map(|r| r.epoch).collect();
        assert_eq!(epochs, vec![6, 4, 2]);
        assert_eq!(snapshot.total_claimable, U256::from(120));
        assert_eq!(store.status_message(), LOADED_STATUS);
        assert_eq!(scanner.claims_status_message(), "3 claimable rewards worth 0.0000 CFX");
    }

    #[tokio::test]
    async fn test_lookback_stops_at_epoch_zero() {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.set_current_epoch(1);
        ledger.publish_epoch_rewards(0, &[(player(1), U256::from(5))]);
        let (_, scanner) = scanner(ledger.clone(), ClaimsConfig::default());

        let snapshot = scanner.load_claims(player(1)).await.unwrap();
        assert_eq!(snapshot.available.len(), 1);
        assert_eq!(ledger.calls(LedgerMethod::IsClaimed), 2);
    }

    #[tokio::test]
    async fn test_failed_lookups_exclude_epoch_silently() {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.set_current_epoch(3);
        for epoch in 1..=3 {
            ledger.publish_epoch_rewards(epoch, &[(player(1), U256::from(7))]);
        }
        ledger.fail_next(LedgerMethod::MerkleProof, LedgerError::Code(1708));
        let (store, scanner) = scanner(ledger, ClaimsConfig::default());

        let snapshot = scanner.load_claims(player(1)).await.unwrap();
        assert_eq!(snapshot.available.len(), 2);
        assert!(store.error().is_none());
    }

    #[tokio::test]
    async fn test_claim_removes_reward() {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.set_current_epoch(2);
        ledger.publish_epoch_rewards(1, &[(player(1), U256::from(30))]);
        ledger.publish_epoch_rewards(2, &[(player(1), U256::from(20))]);
        let (store, scanner) = scanner(ledger.clone(), ClaimsConfig::default());

        let snapshot = scanner.load_claims(player(1)).await.unwrap();
        let reward = snapshot.available[1].clone();
        assert!(scanner.can_claim(&reward));

        let hash = scanner.claim(&reward).await.unwrap();

        let after = store.claims().unwrap();
        assert_eq!(after.available.len(), 1);
        assert_eq!(after.total_claimable, U256::from(20));
        assert_eq!(store.operation().unwrap().hash, Some(hash));
        assert_eq!(store.status_message(), CLAIMED_STATUS);
        assert!(ledger.is_claimed(1, reward.index).await.unwrap());
    }

    #[tokio::test]
    async fn test_claim_retries_transient_failure() {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.publish_epoch_rewards(1, &[(player(1), U256::from(30))]);
        ledger.fail_next(LedgerMethod::ClaimPrize, LedgerError::Code(1718));
        let config = ClaimsConfig {
            retry_claims: true,
            ..ClaimsConfig::default()
        };
        let (store, scanner) = scanner(ledger.clone(), config);

        let claim = ledger.merkle_proof_for_player(player(1), 1).await.unwrap();
        scanner
            .claim_prize(1, claim.index, claim.amount, &claim.proof)
            .await
            .unwrap();

        assert_eq!(ledger.calls(LedgerMethod::ClaimPrize), 2);
        assert_eq!(store.operation().unwrap().status, OperationStatus::Completed);
        assert!(store.error().is_none());
        // No snapshot was loaded, so none is published.
        assert!(store.claims().is_none());
    }

    #[tokio::test]
    async fn test_rejected_claim_fails_operation() {
        let ledger = Arc::new(InMemoryLedger::new());
        let (store, scanner) = scanner(ledger, ClaimsConfig::default());

        let err = scanner
            .claim_prize(9, U256::ZERO, U256::from(1), &[])
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Ledger(ref classified) if classified.code == 1708));
        let op = store.operation().unwrap();
        assert_eq!(op.status, OperationStatus::Error);
        assert_eq!(op.error.as_deref(), Some("No root available"));
        assert_eq!(store.status_message(), "Error: No root available");
    }

    #[test]
    fn test_cannot_claim_during_operation() {
        let (_, scanner) = scanner(Arc::new(InMemoryLedger::new()), ClaimsConfig::default());
        let reward = ClaimableReward::epoch_prize(1, U256::ZERO, U256::from(1), Vec::new());
        scanner
            .controller
            .start(OperationType::LoadPools, OperationUpdate::default());
        assert!(!scanner.can_claim(&reward));
    }
}
