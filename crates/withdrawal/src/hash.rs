use crate::types::WithdrawalHash;
use alloy_primitives::keccak256;
use alloy_sol_types::SolValue;
use binding::mantle::WithdrawalTransaction;
use thiserror::Error;

/// The event-declared hash and the recomputed hash disagree.
///
/// Proceeding with a mismatched tuple would produce portal calldata whose
/// keccak differs from the hash the portal already recorded, so callers treat
/// this as a decode-integrity failure for the withdrawal.
#[derive(Debug, Error)]
#[error("withdrawal hash mismatch: event {event}, recomputed {computed}")]
pub struct HashMismatch {
    pub event: WithdrawalHash,
    pub computed: WithdrawalHash,
}

/// Hash a withdrawal the way the portal's Hashing library does:
/// keccak256(abi.encode(nonce, sender, target, mntValue, ethValue, gasLimit, data)).
pub fn compute_withdrawal_hash(tx: &WithdrawalTransaction) -> WithdrawalHash {
    // abi_encode_sequence encodes the fields as a bare tuple, without the
    // single-struct wrapper offset abi.encode of a struct argument would add.
    let encoded = (
        &tx.nonce,
        &tx.sender,
        &tx.target,
        &tx.mntValue,
        &tx.ethValue,
        &tx.gasLimit,
        &tx.data,
    )
        .abi_encode_sequence();

    keccak256(encoded)
}

/// Require the recomputed hash to equal the hash declared by MessagePassed.
pub fn ensure_hash_matches(
    tx: &WithdrawalTransaction,
    event: WithdrawalHash,
) -> Result<(), HashMismatch> {
    let computed = compute_withdrawal_hash(tx);
    if computed == event {
        Ok(())
    } else {
        Err(HashMismatch { event, computed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, Bytes, B256, U256};

    fn sample_tx() -> WithdrawalTransaction {
        WithdrawalTransaction {
            nonce: U256::from(1),
            sender: Address::from([0x01; 20]),
            target: Address::from([0x02; 20]),
            mntValue: U256::from(1_000_000),
            ethValue: U256::from(2_000),
            gasLimit: U256::from(100_000),
            data: Bytes::from(vec![0xaa, 0xbb, 0xcc]),
        }
    }

    #[test]
    fn test_compute_withdrawal_hash_deterministic() {
        let tx = sample_tx();

        let hash1 = compute_withdrawal_hash(&tx);
        let hash2 = compute_withdrawal_hash(&tx);

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, B256::ZERO);
    }

    #[test]
    fn test_value_fields_are_hashed_independently() {
        // Swapping mntValue and ethValue must change the hash; both words
        // participate in the encoding at distinct positions.
        let tx = sample_tx();
        let mut swapped = sample_tx();
        std::mem::swap(&mut swapped.mntValue, &mut swapped.ethValue);

        assert_ne!(
            compute_withdrawal_hash(&tx),
            compute_withdrawal_hash(&swapped)
        );
    }

    #[test]
    fn test_encoding_is_a_bare_tuple() {
        let tx = WithdrawalTransaction {
            data: Bytes::new(),
            ..sample_tx()
        };
        let encoded = (
            &tx.nonce,
            &tx.sender,
            &tx.target,
            &tx.mntValue,
            &tx.ethValue,
            &tx.gasLimit,
            &tx.data,
        )
            .abi_encode_sequence();

        // 7 head words + one tail word holding the empty bytes length.
        assert_eq!(encoded.len(), 32 * 8);
        // The dynamic-data offset word points just past the 7-word head.
        assert_eq!(encoded[32 * 6 + 31], 0xe0);
    }

    #[test]
    fn test_ensure_hash_matches() {
        let tx = sample_tx();
        let good = compute_withdrawal_hash(&tx);

        assert!(ensure_hash_matches(&tx, good).is_ok());

        let err = ensure_hash_matches(&tx, B256::ZERO).unwrap_err();
        assert_eq!(err.computed, good);
        assert_eq!(err.event, B256::ZERO);
    }

    #[test]
    fn test_withdrawal_hash_collision_resistance() {
        let base = sample_tx();
        let mut hashes = std::collections::HashSet::new();

        for i in 100..110 {
            let tx = WithdrawalTransaction {
                nonce: U256::from(i),
                ..base.clone()
            };
            assert!(hashes.insert(compute_withdrawal_hash(&tx)));
        }

        assert_eq!(hashes.len(), 10);
    }
}
