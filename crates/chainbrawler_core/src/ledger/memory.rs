//! # In-Memory Ledger
//!
//! A [`LedgerClient`] backed by plain maps. Used for tests, benchmarks and
//! offline sessions.
//!
//! Besides state it keeps per-method call counters, a concurrency high-water
//! mark and scripted failures, so callers can observe exactly how the core
//! drives the ledger.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use alloy_primitives::{keccak256, Address, B256, U256};
use async_trait::async_trait;
use chainbrawler_shared::PoolBalances;
use parking_lot::{Mutex, RwLock};

use super::{CharacterRecord, LedgerClient, LedgerMethod, LedgerResult, MerkleProofData};
use crate::error::LedgerError;
use crate::merkle::EpochRewardTree;

/// `No root available`
const NO_ROOT: u32 = 1708;
/// `Already claimed`
const ALREADY_CLAIMED: u32 = 1711;
/// `Invalid proof`
const INVALID_PROOF: u32 = 1719;
/// `Character does not exist`
const NO_CHARACTER: u32 = 1201;

#[derive(Debug, Default)]
struct LedgerState {
    current_epoch: u64,
    players: Vec<Address>,
    scores: HashMap<(Address, u64), U256>,
    characters: HashMap<Address, CharacterRecord>,
    rewards: HashMap<u64, EpochRewardTree>,
    claimed: HashSet<(u64, U256)>,
    pools: PoolBalances,
    epoch_time_remaining: Option<u64>,
}

#[derive(Debug, Default)]
struct Faults {
    queued: HashMap<LedgerMethod, VecDeque<LedgerError>>,
    always: HashMap<LedgerMethod, LedgerError>,
    by_player: HashMap<Address, LedgerError>,
    by_index: HashMap<u64, LedgerError>,
}

/// Map-backed ledger with failure injection and call accounting.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
    faults: Mutex<Faults>,
    calls: Mutex<HashMap<LedgerMethod, u64>>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    tx_nonce: AtomicU64,
}

/// Decrements the in-flight counter when a call finishes.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl InMemoryLedger {
    /// Empty ledger at epoch 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps for `latency` before answering.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    // =========================================================================
    // STATE
    // =========================================================================

    /// Sets the current epoch.
    pub fn set_current_epoch(&self, epoch: u64) {
        self.state.write().current_epoch = epoch;
    }

    /// Appends `player` to the registry unless already registered.
    pub fn register_player(&self, player: Address) {
        let mut state = self.state.write();
        if !state.players.contains(&player) {
            state.players.push(player);
        }
    }

    /// Registers `player` and sets its score in `epoch`.
    pub fn set_score(&self, player: Address, epoch: u64, score: U256) {
        self.register_player(player);
        self.state.write().scores.insert((player, epoch), score);
    }

    /// Stores a character record.
    pub fn set_character(&self, player: Address, record: CharacterRecord) {
        self.state.write().characters.insert(player, record);
    }

    /// Sets the six pool balances.
    pub fn set_pools(&self, pools: PoolBalances) {
        self.state.write().pools = pools;
    }

    /// Makes `getEpochTimeRemaining` available (`None` removes it).
    pub fn set_epoch_time_remaining(&self, seconds: Option<u64>) {
        self.state.write().epoch_time_remaining = seconds;
    }

    /// Commits an epoch's reward batch and returns its root.
    ///
    /// Leaf indices follow allocation order. An empty batch commits nothing.
    pub fn publish_epoch_rewards(&self, epoch: u64, allocations: &[(Address, U256)]) -> Option<B256> {
        let batch = EpochRewardTree::from_allocations(epoch, allocations)?;
        let root = batch.root();
        self.state.write().rewards.insert(epoch, batch);
        tracing::debug!(epoch, leaves = allocations.len(), %root, "Reward batch published");
        Some(root)
    }

    /// Marks leaf `index` of `epoch` as claimed without a transaction.
    pub fn mark_claimed(&self, epoch: u64, index: U256) {
        self.state.write().claimed.insert((epoch, index));
    }

    // =========================================================================
    // FAILURE INJECTION
    // =========================================================================

    /// The next call to `method` fails with `error`. Queued failures are
    /// consumed in order.
    pub fn fail_next(&self, method: LedgerMethod, error: LedgerError) {
        self.faults
            .lock()
            .queued
            .entry(method)
            .or_default()
            .push_back(error);
    }

    /// Every call to `method` fails with `error` until [`Self::clear_faults`].
    pub fn fail_always(&self, method: LedgerMethod, error: LedgerError) {
        self.faults.lock().always.insert(method, error);
    }

    /// Score and character reads for `player` fail with `error`.
    pub fn fail_player(&self, player: Address, error: LedgerError) {
        self.faults.lock().by_player.insert(player, error);
    }

    /// Registry reads at `index` fail with `error`.
    pub fn fail_index(&self, index: u64, error: LedgerError) {
        self.faults.lock().by_index.insert(index, error);
    }

    /// Removes every scripted failure.
    pub fn clear_faults(&self) {
        *self.faults.lock() = Faults::default();
    }

    // =========================================================================
    // ACCOUNTING
    // =========================================================================

    /// Calls made to `method` so far.
    #[must_use]
    pub fn calls(&self, method: LedgerMethod) -> u64 {
        self.calls.lock().get(&method).copied().unwrap_or(0)
    }

    /// Highest number of calls that were in flight at once.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Resets counters and the high-water mark.
    pub fn reset_accounting(&self) {
        self.calls.lock().clear();
        self.peak_in_flight.store(0, Ordering::SeqCst);
    }

    async fn enter(&self, method: LedgerMethod) -> LedgerResult<InFlight<'_>> {
        *self.calls.lock().entry(method).or_insert(0) += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight(&self.in_flight);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut faults = self.faults.lock();
        if let Some(error) = faults.queued.get_mut(&method).and_then(VecDeque::pop_front) {
            return Err(error);
        }
        if let Some(error) = faults.always.get(&method) {
            return Err(error.clone());
        }
        Ok(guard)
    }

    fn player_fault(&self, player: Address) -> LedgerResult<()> {
        match self.faults.lock().by_player.get(&player) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn current_epoch(&self) -> LedgerResult<u64> {
        let _call = self.enter(LedgerMethod::CurrentEpoch).await?;
        Ok(self.state.read().current_epoch)
    }

    async fn epoch_score(&self, player: Address, epoch: u64) -> LedgerResult<U256> {
        let _call = self.enter(LedgerMethod::EpochScore).await?;
        self.player_fault(player)?;
        Ok(self
            .state
            .read()
            .scores
            .get(&(player, epoch))
            .copied()
            .unwrap_or_default())
    }

    async fn total_player_count(&self) -> LedgerResult<u64> {
        let _call = self.enter(LedgerMethod::TotalPlayerCount).await?;
        Ok(self.state.read().players.len() as u64)
    }

    async fn player_by_index(&self, index: u64) -> LedgerResult<Address> {
        let _call = self.enter(LedgerMethod::PlayerByIndex).await?;
        if let Some(error) = self.faults.lock().by_index.get(&index) {
            return Err(error.clone());
        }
        let state = self.state.read();
        usize::try_from(index)
            .ok()
            .and_then(|i| state.players.get(i))
            .copied()
            .ok_or_else(|| LedgerError::message(format!("player index {index} out of bounds")))
    }

    async fn character(&self, player: Address) -> LedgerResult<CharacterRecord> {
        let _call = self.enter(LedgerMethod::Character).await?;
        self.player_fault(player)?;
        self.state
            .read()
            .characters
            .get(&player)
            .copied()
            .ok_or(LedgerError::Code(NO_CHARACTER))
    }

    async fn is_claimed(&self, epoch: u64, index: U256) -> LedgerResult<bool> {
        let _call = self.enter(LedgerMethod::IsClaimed).await?;
        Ok(self.state.read().claimed.contains(&(epoch, index)))
    }

    async fn merkle_proof_for_player(
        &self,
        player: Address,
        epoch: u64,
    ) -> LedgerResult<MerkleProofData> {
        let _call = self.enter(LedgerMethod::MerkleProof).await?;
        Ok(self
            .state
            .read()
            .rewards
            .get(&epoch)
            .and_then(|batch| batch.proof_for(player))
            .unwrap_or_default())
    }

    async fn claim_prize(
        &self,
        epoch: u64,
        index: U256,
        amount: U256,
        proof: &[B256],
    ) -> LedgerResult<B256> {
        let _call = self.enter(LedgerMethod::ClaimPrize).await?;
        let mut state = self.state.write();

        let batch = state.rewards.get(&epoch).ok_or(LedgerError::Code(NO_ROOT))?;
        if state.claimed.contains(&(epoch, index)) {
            return Err(LedgerError::Code(ALREADY_CLAIMED));
        }

        // The proof has to match some allocation of the batch.
        let claim = MerkleProofData {
            amount,
            index,
            proof: proof.to_vec(),
        };
        let valid = batch
            .leaves()
            .iter()
            .any(|leaf| leaf.index == index && batch.verify(leaf.account, &claim));
        if !valid {
            return Err(LedgerError::Code(INVALID_PROOF));
        }

        state.claimed.insert((epoch, index));
        let nonce = self.tx_nonce.fetch_add(1, Ordering::SeqCst);
        Ok(keccak256(nonce.to_be_bytes()))
    }

    async fn all_pool_data(&self) -> LedgerResult<PoolBalances> {
        let _call = self.enter(LedgerMethod::AllPoolData).await?;
        Ok(self.state.read().pools)
    }

    async fn epoch_time_remaining(&self) -> LedgerResult<u64> {
        let _call = self.enter(LedgerMethod::EpochTimeRemaining).await?;
        self.state
            .read()
            .epoch_time_remaining
            .ok_or(LedgerError::Unsupported(LedgerMethod::EpochTimeRemaining.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(n: u8) -> Address {
        Address::repeat_byte(n)
    }

    #[tokio::test]
    async fn test_registry_and_scores() {
        let ledger = InMemoryLedger::new();
        ledger.set_score(player(1), 3, U256::from(10));
        ledger.set_score(player(2), 3, U256::from(20));
        ledger.set_score(player(1), 4, U256::from(5));

        assert_eq!(ledger.total_player_count().await.unwrap(), 2);
        assert_eq!(ledger.player_by_index(1).await.unwrap(), player(2));
        assert_eq!(ledger.epoch_score(player(1), 3).await.unwrap(), U256::from(10));
        assert_eq!(ledger.epoch_score(player(2), 4).await.unwrap(), U256::ZERO);
        assert!(ledger.player_by_index(2).await.is_err());
        assert_eq!(ledger.calls(LedgerMethod::EpochScore), 2);
    }

    #[tokio::test]
    async fn test_queued_failures_are_consumed() {
        let ledger = InMemoryLedger::new();
        ledger.fail_next(LedgerMethod::CurrentEpoch, LedgerError::Code(1704));

        assert_eq!(ledger.current_epoch().await, Err(LedgerError::Code(1704)));
        assert_eq!(ledger.current_epoch().await, Ok(0));
    }

    #[tokio::test]
    async fn test_claim_flow() {
        let ledger = InMemoryLedger::new();
        let amount = U256::from(1_000u64);
        ledger.publish_epoch_rewards(7, &[(player(1), amount), (player(2), amount)]);

        let claim = ledger.merkle_proof_for_player(player(2), 7).await.unwrap();
        assert_eq!(claim.index, U256::from(1));

        ledger
            .claim_prize(7, claim.index, claim.amount, &claim.proof)
            .await
            .unwrap();
        assert!(ledger.is_claimed(7, claim.index).await.unwrap());
        assert_eq!(
            ledger.claim_prize(7, claim.index, claim.amount, &claim.proof).await,
            Err(LedgerError::Code(ALREADY_CLAIMED))
        );
    }

    #[tokio::test]
    async fn test_claim_with_bad_proof() {
        let ledger = InMemoryLedger::new();
        ledger.publish_epoch_rewards(1, &[(player(1), U256::from(5)), (player(2), U256::from(6))]);

        let claim = ledger.merkle_proof_for_player(player(1), 1).await.unwrap();
        assert_eq!(
            ledger.claim_prize(1, claim.index, U256::from(500), &claim.proof).await,
            Err(LedgerError::Code(INVALID_PROOF))
        );
        assert_eq!(
            ledger.claim_prize(2, claim.index, claim.amount, &claim.proof).await,
            Err(LedgerError::Code(NO_ROOT))
        );
    }

    #[tokio::test]
    async fn test_unknown_player_has_zero_proof() {
        let ledger = InMemoryLedger::new();
        let claim = ledger.merkle_proof_for_player(player(9), 1).await.unwrap();
        assert_eq!(claim.amount, U256::ZERO);
        assert!(claim.proof.is_empty());
    }
}
