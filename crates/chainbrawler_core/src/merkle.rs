//! # Reward Merkle Trees
//!
//! Epoch reward batches are committed on-chain as a Merkle root. Each leaf is
//! `keccak256(abi.encodePacked(uint256 epoch, uint256 index, address account,
//! uint256 amount))`; inner nodes hash their children in sorted order, so a
//! proof is just the list of siblings.
//!
//! ```text
//!            root
//!          /      \
//!       h01        h22        (odd node is paired with itself)
//!      /   \      /   \
//!    L0    L1   L2    L2
//! ```

use alloy_primitives::{keccak256, Address, B256, U256};
use alloy_sol_types::SolValue;

use crate::ledger::MerkleProofData;

/// Leaf hash for one reward allocation.
#[must_use]
pub fn leaf_hash(epoch: u64, index: U256, account: Address, amount: U256) -> B256 {
    let packed = (U256::from(epoch), index, account, amount).abi_encode_packed();
    keccak256(packed)
}

/// Commutative node hash: the smaller child goes first.
#[must_use]
pub fn hash_pair(a: B256, b: B256) -> B256 {
    let (left, right) = if a <= b { (a, b) } else { (b, a) };
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(left.as_slice());
    buf[32..].copy_from_slice(right.as_slice());
    keccak256(buf)
}

/// Folds `proof` over `leaf` and compares against `root`.
#[must_use]
pub fn verify_proof(root: B256, leaf: B256, proof: &[B256]) -> bool {
    let computed = proof
        .iter()
        .fold(leaf, |node, sibling| hash_pair(node, *sibling));
    computed == root
}

/// A complete binary hash tree, leaves at level 0.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    levels: Vec<Vec<B256>>,
}

impl MerkleTree {
    /// Builds a tree; `None` when there are no leaves.
    #[must_use]
    pub fn build(leaves: Vec<B256>) -> Option<Self> {
        if leaves.is_empty() {
            return None;
        }

        let mut levels = vec![leaves];
        while let Some(current) = levels.last().filter(|level| level.len() > 1) {
            let next: Vec<B256> = current
                .chunks(2)
                .map(|pair| hash_pair(pair[0], *pair.get(1).unwrap_or(&pair[0])))
                .collect();
            levels.push(next);
        }
        Some(Self { levels })
    }

    /// Root hash.
    #[must_use]
    pub fn root(&self) -> B256 {
        // Non-empty by construction.
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or_default()
    }

    /// Number of leaves.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }

    /// Always false; empty trees are not constructible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sibling path for the leaf at `position`.
    #[must_use]
    pub fn proof(&self, position: usize) -> Option<Vec<B256>> {
        if position >= self.len() {
            return None;
        }

        let mut proof = Vec::with_capacity(self.levels.len().saturating_sub(1));
        let mut cursor = position;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = cursor ^ 1;
            // A trailing odd node was hashed with itself.
            proof.push(*level.get(sibling).unwrap_or(&level[cursor]));
            cursor /= 2;
        }
        Some(proof)
    }
}

/// One allocation in an epoch's reward batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RewardLeaf {
    /// Leaf index.
    pub index: U256,
    /// Recipient.
    pub account: Address,
    /// Amount in wei.
    pub amount: U256,
}

/// Reward batch of one epoch with its tree.
#[derive(Clone, Debug)]
pub struct EpochRewardTree {
    epoch: u64,
    leaves: Vec<RewardLeaf>,
    tree: MerkleTree,
}

impl EpochRewardTree {
    /// Builds the batch; leaf indices follow allocation order.
    ///
    /// Returns `None` for an empty batch.
    #[must_use]
    pub fn from_allocations(epoch: u64, allocations: &[(Address, U256)]) -> Option<Self> {
        let leaves: Vec<RewardLeaf> = allocations
            .iter()
            .enumerate()
            .map(|(position, (account, amount))| RewardLeaf {
                index: U256::from(position),
                account: *account,
                amount: *amount,
            })
            .collect();

        let hashes = leaves
            .iter()
            .map(|leaf| leaf_hash(epoch, leaf.index, leaf.account, leaf.amount))
            .collect();

        Some(Self {
            epoch,
            tree: MerkleTree::build(hashes)?,
            leaves,
        })
    }

    /// Epoch of the batch.
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Committed root.
    #[must_use]
    pub fn root(&self) -> B256 {
        self.tree.root()
    }

    /// Allocations in leaf order.
    #[must_use]
    pub fn leaves(&self) -> &[RewardLeaf] {
        &self.leaves
    }

    /// Proof for `account`'s allocation, if it has one.
    #[must_use]
    pub fn proof_for(&self, account: Address) -> Option<MerkleProofData> {
        let position = self.leaves.iter().position(|leaf| leaf.account == account)?;
        let leaf = self.leaves[position];
        Some(MerkleProofData {
            amount: leaf.amount,
            index: leaf.index,
            proof: self.tree.proof(position)?,
        })
    }

    /// Checks a claim against this batch's root.
    #[must_use]
    pub fn verify(&self, account: Address, claim: &MerkleProofData) -> bool {
        let leaf = leaf_hash(self.epoch, claim.index, account, claim.amount);
        verify_proof(self.root(), leaf, &claim.proof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocations(n: u8) -> Vec<(Address, U256)> {
        (1..=n)
            .map(|i| (Address::repeat_byte(i), U256::from(u64::from(i) * 1_000)))
            .collect()
    }

    #[test]
    fn test_leaf_encoding_is_packed() {
        let account = Address::repeat_byte(0xab);
        let mut packed = Vec::with_capacity(116);
        packed.extend_from_slice(&U256::from(3u64).to_be_bytes::<32>());
        packed.extend_from_slice(&U256::from(1u64).to_be_bytes::<32>());
        packed.extend_from_slice(account.as_slice());
        packed.extend_from_slice(&U256::from(500u64).to_be_bytes::<32>());

        assert_eq!(
            leaf_hash(3, U256::from(1), account, U256::from(500)),
            keccak256(&packed)
        );
    }

    #[test]
    fn test_every_leaf_verifies() {
        for n in 1..=7 {
            let batch = EpochRewardTree::from_allocations(9, &allocations(n)).unwrap();
            for (account, _) in allocations(n) {
                let claim = batch.proof_for(account).unwrap();
                assert!(batch.verify(account, &claim), "n={n} account={account}");
            }
        }
    }

    #[test]
    fn test_tampered_claim_fails() {
        let batch = EpochRewardTree::from_allocations(2, &allocations(4)).unwrap();
        let account = Address::repeat_byte(2);
        let mut claim = batch.proof_for(account).unwrap();

        claim.amount += U256::from(1);
        assert!(!batch.verify(account, &claim));
        assert!(!batch.verify(Address::repeat_byte(3), &batch.proof_for(account).unwrap()));
    }

    #[test]
    fn test_single_leaf_tree() {
        let batch = EpochRewardTree::from_allocations(1, &allocations(1)).unwrap();
        let claim = batch.proof_for(Address::repeat_byte(1)).unwrap();
        assert!(claim.proof.is_empty());
        assert_eq!(batch.root(), leaf_hash(1, U256::ZERO, Address::repeat_byte(1), U256::from(1_000)));
    }

    #[test]
    fn test_empty_batch() {
        assert!(EpochRewardTree::from_allocations(1, &[]).is_none());
        assert!(MerkleTree::build(Vec::new()).is_none());
    }
}
