//! Proof generation for L2→L1 withdrawals.
//!
//! Builds everything `proveWithdrawalTransaction` needs: the L2 output index
//! covering the withdrawal, the storage proof that the message passer
//! registered the withdrawal hash, and the output root proof. Parameters
//! whose recomputed output root disagrees with the oracle are refused.

use crate::{
    hash::{ensure_hash_matches, HashMismatch},
    trie::{normalize_proof, TrieError},
    types::WithdrawalHash,
};
use alloy_contract::private::Provider;
use alloy_primitives::{keccak256, Address, BlockNumber, Bytes, B256, U256};
use alloy_rpc_types_eth::BlockNumberOrTag;
use binding::mantle::{IL2OutputOracle, OutputRootProof, WithdrawalTransaction};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ProofError {
    /// Transient transport or node failure; retried on a later tick
    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("l2 block {0} not found")]
    BlockNotFound(u64),

    #[error("no storage proof returned for slot {0}")]
    MissingStorageProof(B256),

    /// The message passer's sentMessages slot does not hold `true`
    #[error("withdrawal {hash} not registered in message passer (storage value {value})")]
    NotRegistered { hash: WithdrawalHash, value: U256 },

    /// Recomputed output root disagrees with the oracle; never submitted
    #[error("output root mismatch at index {index}: computed {computed}, oracle {expected}")]
    OutputRootMismatch {
        computed: B256,
        expected: B256,
        index: U256,
    },

    #[error(transparent)]
    HashMismatch(#[from] HashMismatch),

    #[error(transparent)]
    Trie(#[from] TrieError),
}

fn rpc_err(e: impl std::fmt::Display) -> ProofError {
    ProofError::Rpc(e.to_string())
}

/// Parameters required to prove a withdrawal on L1.
#[derive(Debug, Clone)]
pub struct ProveWithdrawalParams {
    pub withdrawal: WithdrawalTransaction,
    pub l2_output_index: U256,
    pub output_root_proof: OutputRootProof,
    pub withdrawal_proof: Vec<Bytes>,
}

/// Outcome of proof generation for a withdrawal.
#[derive(Debug)]
pub enum ProveReadiness {
    /// Everything checked out; parameters are ready to submit
    Ready(ProveWithdrawalParams),
    /// No proposed output covers the withdrawal block yet; retry later
    AwaitingOutput {
        withdrawal_block: u64,
        proposed_block: u64,
    },
}

/// Generate proof material for a withdrawal that was initiated on L2.
///
/// This function:
/// 1. Verifies the withdrawal tuple hashes to the event-declared hash
/// 2. Asks the oracle for the first output at or after the withdrawal block
/// 3. Fetches the L2 block header for the *proposed* block
/// 4. Fetches and normalizes the storage proof at that same block
/// 5. Builds the output root proof and checks it against the oracle's root
///
/// # Arguments
/// * `l1_provider` - Provider for L1 queries (output oracle)
/// * `l2_provider` - Provider for L2 queries (block header, storage proof)
/// * `oracle_address` - L2OutputOracle address on L1
/// * `message_passer_address` - L2ToL1MessagePasser predeploy address
/// * `withdrawal` - The withdrawal transaction tuple
/// * `withdrawal_hash` - Hash declared by the MessagePassed event
/// * `block_number` - L2 block in which the withdrawal was initiated
pub async fn generate_proof<P1, P2>(
    l1_provider: &P1,
    l2_provider: &P2,
    oracle_address: Address,
    message_passer_address: Address,
    withdrawal: WithdrawalTransaction,
    withdrawal_hash: WithdrawalHash,
    block_number: BlockNumber,
) -> Result<ProveReadiness, ProofError>
where
    P1: Provider + Clone,
    P2: Provider + Clone,
{
    ensure_hash_matches(&withdrawal, withdrawal_hash)?;

    // 1. Find the proposed output covering the withdrawal block
    let oracle = IL2OutputOracle::new(oracle_address, l1_provider);
    let output_index = oracle
        .getL2OutputIndexAfter(U256::from(block_number))
        .call()
        .await
        .map_err(rpc_err)?;
    let proposal = oracle
        .getL2Output(output_index)
        .call()
        .await
        .map_err(rpc_err)?;

    let proposed_block: u64 = proposal.l2BlockNumber.try_into().unwrap_or(u64::MAX);
    if proposed_block < block_number {
        debug!(
            withdrawal_block = block_number,
            proposed_block, "No proposed output covers the withdrawal yet"
        );
        return Ok(ProveReadiness::AwaitingOutput {
            withdrawal_block: block_number,
            proposed_block,
        });
    }

    debug!(
        output_index = %output_index,
        proposed_block,
        withdrawal_block = block_number,
        "Found covering output proposal"
    );

    // 2. Header of the PROPOSED block (not the withdrawal block!)
    // The output root commits to the proposed block's state.
    let block = l2_provider
        .get_block_by_number(BlockNumberOrTag::Number(proposed_block))
        .await
        .map_err(rpc_err)?
        .ok_or(ProofError::BlockNotFound(proposed_block))?;

    let state_root = block.header.state_root;
    let block_hash = block.header.hash;

    // 3. Storage proof at the proposed block
    let storage_slot = compute_storage_slot(withdrawal_hash);
    let proof_result = l2_provider
        .get_proof(message_passer_address, vec![storage_slot])
        .block_id(BlockNumberOrTag::Number(proposed_block).into())
        .await
        .map_err(rpc_err)?;

    let storage = proof_result
        .storage_proof
        .first()
        .ok_or(ProofError::MissingStorageProof(storage_slot))?;

    // sentMessages[withdrawalHash] must hold the boolean true
    if storage.value != U256::from(1) {
        return Err(ProofError::NotRegistered {
            hash: withdrawal_hash,
            value: storage.value,
        });
    }

    let withdrawal_proof = normalize_proof(keccak256(storage_slot).as_slice(), &storage.proof)?;

    debug!(
        proof_nodes = withdrawal_proof.len(),
        raw_nodes = storage.proof.len(),
        "Generated storage proof"
    );

    // 4. Output root proof, checked against the oracle before anything is sent
    let output_root_proof = OutputRootProof {
        version: B256::ZERO,
        stateRoot: state_root,
        messagePasserStorageRoot: proof_result.storage_hash,
        latestBlockhash: block_hash,
    };
    ensure_output_root_matches(&output_root_proof, proposal.outputRoot, output_index)?;

    Ok(ProveReadiness::Ready(ProveWithdrawalParams {
        withdrawal,
        l2_output_index: output_index,
        output_root_proof,
        withdrawal_proof,
    }))
}

/// Compute the storage slot for a withdrawal hash in the L2ToL1MessagePasser.
///
/// The storage layout is: `mapping(bytes32 => bool) public sentMessages`
/// Solidity storage slot = keccak256(key || slot_index)
/// For the mapping at slot 0: keccak256(withdrawalHash || 0)
pub fn compute_storage_slot(withdrawal_hash: WithdrawalHash) -> B256 {
    let mut data = [0u8; 64];
    data[0..32].copy_from_slice(withdrawal_hash.as_slice());
    // data[32..64] is already zeros (mapping is at slot 0)
    keccak256(data)
}

/// keccak of the 128-byte concatenation version ‖ stateRoot ‖ storageRoot ‖ blockhash.
pub fn compute_output_root(proof: &OutputRootProof) -> B256 {
    let mut data = [0u8; 128];
    data[0..32].copy_from_slice(proof.version.as_slice());
    data[32..64].copy_from_slice(proof.stateRoot.as_slice());
    data[64..96].copy_from_slice(proof.messagePasserStorageRoot.as_slice());
    data[96..128].copy_from_slice(proof.latestBlockhash.as_slice());
    keccak256(data)
}

/// Refuse to continue when the recomputed output root differs from the
/// oracle's. Submitting anyway would always revert on L1.
pub fn ensure_output_root_matches(
    proof: &OutputRootProof,
    expected: B256,
    index: U256,
) -> Result<(), ProofError> {
    let computed = compute_output_root(proof);
    if computed == expected {
        Ok(())
    } else {
        Err(ProofError::OutputRootMismatch {
            computed,
            expected,
            index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::b256;

    #[test]
    fn test_compute_storage_slot() {
        let withdrawal_hash = B256::from([1u8; 32]);
        let slot = compute_storage_slot(withdrawal_hash);

        // keccak256(0x11...11 * 32 || 0x00 * 32), computed layout-by-hand
        let mut data = [0u8; 64];
        data[0..32].copy_from_slice(&[1u8; 32]);
        assert_eq!(slot, keccak256(data));

        // Different hashes produce different slots
        let other_slot = compute_storage_slot(B256::from([2u8; 32]));
        assert_ne!(slot, other_slot);
    }

    #[test]
    fn test_storage_slot_zero_key() {
        // keccak256 of 64 zero bytes for the all-zero withdrawal hash
        let slot = compute_storage_slot(B256::ZERO);
        assert_eq!(slot, keccak256([0u8; 64]));
    }

    #[test]
    fn test_output_root_recomputation() {
        let proof = OutputRootProof {
            version: B256::ZERO,
            stateRoot: b256!("1111111111111111111111111111111111111111111111111111111111111111"),
            messagePasserStorageRoot: b256!(
                "2222222222222222222222222222222222222222222222222222222222222222"
            ),
            latestBlockhash: b256!(
                "3333333333333333333333333333333333333333333333333333333333333333"
            ),
        };

        let mut data = Vec::with_capacity(128);
        data.extend_from_slice(proof.version.as_slice());
        data.extend_from_slice(proof.stateRoot.as_slice());
        data.extend_from_slice(proof.messagePasserStorageRoot.as_slice());
        data.extend_from_slice(proof.latestBlockhash.as_slice());
        assert_eq!(data.len(), 128);

        assert_eq!(compute_output_root(&proof), keccak256(&data));
    }

    #[test]
    fn test_matching_output_root_is_accepted() {
        let proof = OutputRootProof {
            version: B256::ZERO,
            stateRoot: B256::from([0xaa; 32]),
            messagePasserStorageRoot: B256::from([0xbb; 32]),
            latestBlockhash: B256::from([0xcc; 32]),
        };
        let oracle_root = compute_output_root(&proof);

        assert!(ensure_output_root_matches(&proof, oracle_root, U256::from(7)).is_ok());
    }

    #[test]
    fn test_mismatched_output_root_is_refused() {
        let proof = OutputRootProof {
            version: B256::ZERO,
            stateRoot: B256::from([0xaa; 32]),
            messagePasserStorageRoot: B256::from([0xbb; 32]),
            latestBlockhash: B256::from([0xcc; 32]),
        };

        let result = ensure_output_root_matches(&proof, B256::ZERO, U256::from(7));

        match result {
            Err(ProofError::OutputRootMismatch {
                computed,
                expected,
                index,
            }) => {
                assert_eq!(computed, compute_output_root(&proof));
                assert_eq!(expected, B256::ZERO);
                assert_eq!(index, U256::from(7));
            }
            other => panic!("expected OutputRootMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_prove_params_structure() {
        let params = ProveWithdrawalParams {
            withdrawal: WithdrawalTransaction {
                nonce: U256::from(1),
                sender: Address::ZERO,
                target: Address::ZERO,
                mntValue: U256::from(1000),
                ethValue: U256::ZERO,
                gasLimit: U256::from(100000),
                data: Bytes::new(),
            },
            l2_output_index: U256::from(42),
            output_root_proof: OutputRootProof {
                version: B256::ZERO,
                stateRoot: B256::ZERO,
                messagePasserStorageRoot: B256::ZERO,
                latestBlockhash: B256::ZERO,
            },
            withdrawal_proof: vec![Bytes::from(vec![1, 2, 3])],
        };

        assert_eq!(params.l2_output_index, U256::from(42));
        assert_eq!(params.withdrawal_proof.len(), 1);
    }
}
