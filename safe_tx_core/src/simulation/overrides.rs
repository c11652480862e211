//! Storage overrides that let a Safe transaction be simulated as if it were
//! ready to execute.
//!
//! Slots follow the Safe singleton storage layout (`threshold` and `nonce`
//! are plain slots 4 and 5; the guard lives at the `GuardManager` hashed
//! slot).

use crate::models::{SafeInfo, SafeTransaction};
use alloy_primitives::{b256, Address, B256};
use std::collections::{BTreeMap, BTreeSet};

pub const THRESHOLD_SLOT: B256 =
    b256!("0000000000000000000000000000000000000000000000000000000000000004");

pub const NONCE_SLOT: B256 =
    b256!("0000000000000000000000000000000000000000000000000000000000000005");

/// keccak256("guard_manager.guard.address")
pub const GUARD_SLOT: B256 =
    b256!("4a204f620c8c5ccdca3fd54d003badd85ba500436a431f0cbda4f558c93c34c8");

/// Slot to 32-byte word patches for the Safe's own storage
pub type StorageOverrides = BTreeMap<B256, B256>;

/// Big-endian 32-byte word holding `value`
pub fn u64_word(value: u64) -> B256 {
    B256::left_padding_from(&value.to_be_bytes())
}

/// Owner signatures the transaction would carry at execution time.
///
/// Duplicate and non-owner signers are not counted. An executing owner that
/// has not signed yet is credited with the pre-validated signature it submits
/// implicitly by sending the transaction itself.
pub fn effective_signature_count(
    safe: &SafeInfo,
    execution_owner: Address,
    transaction: &SafeTransaction,
) -> u64 {
    let owner_signers: BTreeSet<&Address> = transaction
        .signers
        .iter()
        .filter(|signer| safe.is_owner(signer))
        .collect();

    let mut count = owner_signers.len() as u64;
    if safe.is_owner(&execution_owner) && !owner_signers.contains(&execution_owner) {
        count += 1;
    }
    count
}

/// Compute the storage patches needed to simulate `transaction`.
///
/// * threshold forced to 1 while the effective signature count is short
/// * nonce moved forward to a future transaction's nonce
/// * guard cleared when one is installed
///
/// Pure and deterministic. An empty map means no override section at all.
pub fn compute_overrides(
    safe: &SafeInfo,
    execution_owner: Address,
    transaction: &SafeTransaction,
) -> StorageOverrides {
    let mut overrides = StorageOverrides::new();

    if effective_signature_count(safe, execution_owner, transaction) < safe.threshold {
        overrides.insert(THRESHOLD_SLOT, u64_word(1));
    }

    if transaction.nonce > safe.nonce {
        overrides.insert(NONCE_SLOT, u64_word(transaction.nonce));
    }

    if safe.guard.is_some_and(|guard| guard != Address::ZERO) {
        overrides.insert(GUARD_SLOT, Address::ZERO.into_word());
    }

    overrides
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, keccak256};

    const OWNER_A: Address = address!("0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a");
    const OWNER_B: Address = address!("0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b");
    const OWNER_C: Address = address!("0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c");
    const STRANGER: Address = address!("eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee");

    fn safe(threshold: u64, nonce: u64) -> SafeInfo {
        SafeInfo {
            address: Address::repeat_byte(0x5a),
            chain_id: 1,
            threshold,
            nonce,
            owners: vec![OWNER_A, OWNER_B, OWNER_C],
            guard: None,
        }
    }

    fn tx(nonce: u64, signers: Vec<Address>) -> SafeTransaction {
        SafeTransaction {
            safe_tx_hash: None,
            to: STRANGER,
            value: Default::default(),
            data: Default::default(),
            nonce,
            signers,
        }
    }

    #[test]
    fn test_slot_constants() {
        assert_eq!(GUARD_SLOT, keccak256("guard_manager.guard.address"));
        assert_eq!(THRESHOLD_SLOT.0[31], 4);
        assert_eq!(NONCE_SLOT.0[31], 5);
        assert_eq!(&u64_word(0x0102)[30..], &[0x01u8, 0x02][..]);
    }

    #[test]
    fn test_non_owner_signature_needs_threshold_override() {
        let safe = safe(2, 7);
        let transaction = tx(7, vec![STRANGER]);
        let overrides = compute_overrides(&safe, OWNER_A, &transaction);

        assert_eq!(overrides.get(&THRESHOLD_SLOT), Some(&u64_word(1)));
        assert!(!overrides.contains_key(&NONCE_SLOT));
        assert_eq!(overrides.len(), 1);
    }

    #[test]
    fn test_execution_owner_credit_meets_threshold() {
        let safe = safe(2, 0);
        // one other owner signed, the executor supplies the second signature
        assert!(compute_overrides(&safe, OWNER_A, &tx(0, vec![OWNER_B])).is_empty());
        // executor already signed; its signature is not counted twice
        let overrides = compute_overrides(&safe, OWNER_A, &tx(0, vec![OWNER_A]));
        assert!(overrides.contains_key(&THRESHOLD_SLOT));
        // a non-owner executor gets no credit
        let overrides = compute_overrides(&safe, STRANGER, &tx(0, vec![OWNER_B]));
        assert!(overrides.contains_key(&THRESHOLD_SLOT));
    }

    #[test]
    fn test_duplicate_signatures_count_once() {
        let safe = safe(3, 0);
        let transaction = tx(0, vec![OWNER_B, OWNER_B]);
        assert_eq!(effective_signature_count(&safe, OWNER_A, &transaction), 2);
        assert!(compute_overrides(&safe, OWNER_A, &transaction).contains_key(&THRESHOLD_SLOT));
    }

    #[test]
    fn test_future_nonce_override() {
        let safe = safe(1, 3);
        let overrides = compute_overrides(&safe, OWNER_A, &tx(10, vec![]));
        assert_eq!(overrides.get(&NONCE_SLOT), Some(&u64_word(10)));
        assert!(!overrides.contains_key(&THRESHOLD_SLOT));

        // past or current nonces are never rewritten
        assert!(compute_overrides(&safe, OWNER_A, &tx(2, vec![])).is_empty());
    }

    #[test]
    fn test_guard_disabled_only_when_set() {
        let mut safe = safe(1, 0);
        safe.guard = Some(Address::ZERO);
        assert!(compute_overrides(&safe, OWNER_A, &tx(0, vec![])).is_empty());

        safe.guard = Some(Address::repeat_byte(0x99));
        let overrides = compute_overrides(&safe, OWNER_A, &tx(0, vec![]));
        assert_eq!(overrides.get(&GUARD_SLOT), Some(&B256::ZERO));
    }

    #[test]
    fn test_all_rules_merge_deterministically() {
        let mut safe = safe(3, 1);
        safe.guard = Some(Address::repeat_byte(0x99));
        let transaction = tx(4, vec![OWNER_B]);

        let first = compute_overrides(&safe, OWNER_A, &transaction);
        let second = compute_overrides(&safe, OWNER_A, &transaction);
        assert_eq!(first, second);
        assert_eq!(
            first.keys().copied().collect::<Vec<_>>(),
            vec![THRESHOLD_SLOT, NONCE_SLOT, GUARD_SLOT]
        );
    }
}
