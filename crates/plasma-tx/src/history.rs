//! # Ownership History
//!
//! The ordered transfer sequence for one unit, earliest first, and the
//! continuity rule that makes a history *valid*: every entry is signed by
//! the owner the previous entry named, block numbers never decrease, and
//! the first entry is signed by the original depositor.
//!
//! Validation is memoized: a prefix that has passed the check is never
//! rescanned, and a failed check never advances the memo — callers must not
//! trust cached validity past a failure until the history is corrected.

use serde::{Deserialize, Serialize};

use plasma_core::Address;

use crate::domain::DomainSeparator;
use crate::transaction::TransactionRecord;

/// The ordered transfer history of one unit.
///
/// Every instance owns a freshly allocated entry list; histories are never
/// shared between records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OwnershipHistory {
    entries: Vec<TransactionRecord>,
    validated_prefix: usize,
}

impl OwnershipHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            validated_prefix: 0,
        }
    }

    /// Create a history from existing entries (e.g. received from a peer).
    /// Nothing is presumed validated.
    pub fn from_entries(entries: Vec<TransactionRecord>) -> Self {
        Self {
            entries,
            validated_prefix: 0,
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the history is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, earliest first.
    pub fn entries(&self) -> &[TransactionRecord] {
        &self.entries
    }

    /// The most recent transfer, if any.
    pub fn last(&self) -> Option<&TransactionRecord> {
        self.entries.last()
    }

    /// The transfer the most recent one spends — `None` when the history
    /// has fewer than two entries. Challenge predicates branch on this
    /// explicitly instead of indexing.
    pub fn parent_of_last(&self) -> Option<&TransactionRecord> {
        if self.entries.len() < 2 {
            return None;
        }
        self.entries.get(self.entries.len() - 2)
    }

    /// How many leading entries have passed the continuity check.
    pub fn validated_prefix(&self) -> usize {
        self.validated_prefix
    }

    /// Append a transfer. The memoized prefix is unaffected — only the new
    /// suffix will be scanned next time.
    pub fn push(&mut self, txn: TransactionRecord) {
        self.entries.push(txn);
    }

    /// Replace entry `index` (correcting a bad record). Rolls the memo
    /// back so the corrected suffix is revalidated.
    pub fn replace(&mut self, index: usize, txn: TransactionRecord) {
        if index < self.entries.len() {
            self.entries[index] = txn;
            self.validated_prefix = self.validated_prefix.min(index);
        }
    }

    /// Drop all entries and reset the memo.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.validated_prefix = 0;
    }

    /// Check continuity from the memoized prefix to the end.
    ///
    /// An empty history is trivially valid. For each adjacent pair the unit
    /// id must match, the signer must equal the previous entry's
    /// `new_owner`, and `prev_block` must not decrease; entry 0 must be
    /// signed by `depositor`. On success the memo advances to the full
    /// length; on the first failure (including an unrecoverable signer)
    /// this returns `false` and the memo stays where it was.
    pub fn is_valid(&mut self, depositor: &Address, domain: &DomainSeparator) -> bool {
        for index in self.validated_prefix..self.entries.len() {
            let signer = match self.entries[index].signer(domain) {
                Ok(signer) => signer,
                Err(_) => return false,
            };
            match index {
                0 => {
                    if signer != *depositor {
                        return false;
                    }
                }
                _ => {
                    let prev = &self.entries[index - 1];
                    let entry = &self.entries[index];
                    if entry.unit != prev.unit
                        || signer != prev.new_owner
                        || entry.prev_block < prev.prev_block
                    {
                        return false;
                    }
                }
            }
        }
        self.validated_prefix = self.entries.len();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plasma_core::{Address, BlockNumber, UnitId};
    use plasma_crypto::KeyPair;

    fn test_pair(n: u8) -> KeyPair {
        let mut seed = [0u8; 32];
        seed[31] = n;
        KeyPair::from_seed(&seed).unwrap()
    }

    fn test_domain() -> DomainSeparator {
        DomainSeparator::new(1, Address::from_bytes([0xCC; 20]))
    }

    fn signed(
        prev_block: u64,
        unit: u64,
        to: &KeyPair,
        by: &KeyPair,
        domain: &DomainSeparator,
    ) -> TransactionRecord {
        let mut txn =
            TransactionRecord::new(BlockNumber(prev_block), UnitId::from_u64(unit), to.address());
        txn.sign(by, domain).unwrap();
        txn
    }

    /// deposit by A (block 0), A→B included at block 1, B→C included at 2.
    fn chain_a_b_c() -> (OwnershipHistory, Address, DomainSeparator) {
        let domain = test_domain();
        let (a, b, c) = (test_pair(1), test_pair(2), test_pair(3));
        let mut history = OwnershipHistory::new();
        history.push(signed(0, 7, &a, &a, &domain));
        history.push(signed(1, 7, &b, &a, &domain));
        history.push(signed(2, 7, &c, &b, &domain));
        (history, a.address(), domain)
    }

    // ── Continuity ───────────────────────────────────────────────────

    #[test]
    fn test_empty_history_is_valid() {
        let mut history = OwnershipHistory::new();
        assert!(history.is_valid(&test_pair(1).address(), &test_domain()));
    }

    #[test]
    fn test_well_formed_chain_is_valid() {
        let (mut history, depositor, domain) = chain_a_b_c();
        assert!(history.is_valid(&depositor, &domain));
        assert_eq!(history.validated_prefix(), 3);
    }

    #[test]
    fn test_wrong_depositor_invalid() {
        let (mut history, _, domain) = chain_a_b_c();
        assert!(!history.is_valid(&test_pair(9).address(), &domain));
        assert_eq!(history.validated_prefix(), 0);
    }

    #[test]
    fn test_broken_signer_chain_invalid() {
        let domain = test_domain();
        let (a, b, c) = (test_pair(1), test_pair(2), test_pair(3));
        let mut history = OwnershipHistory::new();
        history.push(signed(0, 7, &a, &a, &domain));
        // C signs instead of A — signer does not match prior owner.
        history.push(signed(1, 7, &b, &c, &domain));
        assert!(!history.is_valid(&a.address(), &domain));
    }

    #[test]
    fn test_unit_mismatch_invalid() {
        let domain = test_domain();
        let (a, b) = (test_pair(1), test_pair(2));
        let mut history = OwnershipHistory::new();
        history.push(signed(0, 7, &a, &a, &domain));
        history.push(signed(1, 8, &b, &a, &domain)); // different unit
        assert!(!history.is_valid(&a.address(), &domain));
    }

    #[test]
    fn test_decreasing_block_invalid() {
        let domain = test_domain();
        let (a, b, c) = (test_pair(1), test_pair(2), test_pair(3));
        let mut history = OwnershipHistory::new();
        history.push(signed(2, 7, &a, &a, &domain));
        history.push(signed(1, 7, &b, &a, &domain)); // goes backwards
        let _ = c;
        assert!(!history.is_valid(&a.address(), &domain));
    }

    #[test]
    fn test_unsigned_entry_invalid() {
        let domain = test_domain();
        let a = test_pair(1);
        let mut history = OwnershipHistory::new();
        history.push(TransactionRecord::new(
            BlockNumber(0),
            UnitId::from_u64(7),
            a.address(),
        ));
        assert!(!history.is_valid(&a.address(), &domain));
    }

    // ── Memoization ──────────────────────────────────────────────────

    #[test]
    fn test_memo_advances_only_on_success() {
        let (mut history, depositor, domain) = chain_a_b_c();
        assert!(history.is_valid(&depositor, &domain));
        assert_eq!(history.validated_prefix(), 3);

        // A discontinuous append fails and leaves the memo at 3.
        let stranger = test_pair(9);
        history.push(signed(3, 7, &stranger, &stranger, &domain));
        assert!(!history.is_valid(&depositor, &domain));
        assert_eq!(history.validated_prefix(), 3);
    }

    #[test]
    fn test_replace_rolls_memo_back_and_flips_validity() {
        let (mut history, depositor, domain) = chain_a_b_c();
        assert!(history.is_valid(&depositor, &domain));

        // Mutate entry 1's signer to someone other than the depositor.
        let stranger = test_pair(9);
        let b = test_pair(2);
        history.replace(1, signed(1, 7, &b, &stranger, &domain));
        assert_eq!(history.validated_prefix(), 1);
        assert!(!history.is_valid(&depositor, &domain));

        // Correct it and validity returns.
        let a = test_pair(1);
        history.replace(1, signed(1, 7, &b, &a, &domain));
        assert!(history.is_valid(&depositor, &domain));
        assert_eq!(history.validated_prefix(), 3);
    }

    // ── Tail lookups ─────────────────────────────────────────────────

    #[test]
    fn test_tail_lookups_are_optional() {
        let mut history = OwnershipHistory::new();
        assert!(history.last().is_none());
        assert!(history.parent_of_last().is_none());

        let domain = test_domain();
        let a = test_pair(1);
        history.push(signed(0, 7, &a, &a, &domain));
        assert!(history.last().is_some());
        assert!(history.parent_of_last().is_none());

        let b = test_pair(2);
        history.push(signed(1, 7, &b, &a, &domain));
        assert_eq!(history.parent_of_last().unwrap().new_owner, a.address());
        assert_eq!(history.last().unwrap().new_owner, b.address());
    }

    #[test]
    fn test_clear_resets_memo() {
        let (mut history, depositor, domain) = chain_a_b_c();
        assert!(history.is_valid(&depositor, &domain));
        history.clear();
        assert_eq!(history.len(), 0);
        assert_eq!(history.validated_prefix(), 0);
    }
}
