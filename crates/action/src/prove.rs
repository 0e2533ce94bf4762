//! Prove withdrawal action.
//!
//! Submits previously generated proof material to the L1 portal. Proof
//! generation (and its output-root self-check) happens in the proof engine
//! before this action is constructed.

use crate::{PortalAction, SignerFn, Submission};
use alloy_primitives::{Address, U256};
use alloy_provider::Provider;
use binding::mantle::IOptimismPortal;
use tracing::info;
use withdrawal::{
    proof::ProveWithdrawalParams, state::WithdrawalStateProvider, types::WithdrawalHash,
};

/// Input data for proving a withdrawal on L1.
#[derive(Clone, Debug)]
pub struct Prove {
    /// OptimismPortal contract address on L1
    pub portal_address: Address,
    /// Proof material generated against the covering output proposal
    pub params: ProveWithdrawalParams,
    /// Hash of the withdrawal
    pub withdrawal_hash: WithdrawalHash,
    /// Address that will submit the prove transaction
    pub from: Address,
}

/// Action to prove a withdrawal on L1.
pub struct ProveAction<P> {
    l1_provider: P,
    signer: SignerFn,
    action: Prove,
}

impl<P> ProveAction<P>
where
    P: Provider + Clone,
{
    pub fn new(l1_provider: P, signer: SignerFn, action: Prove) -> Self {
        Self {
            l1_provider,
            signer,
            action,
        }
    }

    /// Check whether the portal already has a proven record for this hash.
    async fn check_is_proven(&self) -> eyre::Result<bool> {
        let state =
            WithdrawalStateProvider::new(self.l1_provider.clone(), self.action.portal_address);

        let proven = state.proven_at(self.action.withdrawal_hash).await?;
        Ok(proven.is_some())
    }
}

impl<P> PortalAction for ProveAction<P>
where
    P: Provider + Clone,
{
    fn withdrawal_hash(&self) -> WithdrawalHash {
        self.action.withdrawal_hash
    }

    async fn is_ready(&self) -> eyre::Result<bool> {
        // Ready if not already proven
        Ok(!self.check_is_proven().await?)
    }

    async fn is_completed(&self) -> eyre::Result<bool> {
        self.check_is_proven().await
    }

    async fn execute(&mut self) -> eyre::Result<Submission> {
        if self.is_completed().await? {
            eyre::bail!("Withdrawal already proven")
        }

        info!(
            withdrawal_hash = %self.action.withdrawal_hash,
            l2_output_index = %self.action.params.l2_output_index,
            proof_nodes = self.action.params.withdrawal_proof.len(),
            "Submitting withdrawal proof to L1"
        );

        // Build the transaction request
        let portal = IOptimismPortal::new(self.action.portal_address, &self.l1_provider);
        let call = portal.proveWithdrawalTransaction(
            self.action.params.withdrawal.clone(),
            self.action.params.l2_output_index,
            self.action.params.output_root_proof.clone(),
            self.action.params.withdrawal_proof.clone(),
        );
        let tx_request = call.into_transaction_request().from(self.action.from);

        // Fill transaction fields (nonce, gas, fees) using our provider
        let filled_tx = crate::fill_transaction(tx_request, &self.l1_provider).await?;

        // Sign externally
        let signed_tx = (self.signer)(filled_tx).await?;

        // Broadcast the signed transaction and wait for inclusion
        let pending = self.l1_provider.send_raw_transaction(&signed_tx).await?;
        let receipt = pending.get_receipt().await?;

        if !receipt.status() {
            eyre::bail!(
                "proveWithdrawalTransaction reverted on-chain in tx {}",
                receipt.transaction_hash
            );
        }

        info!(
            tx_hash = %receipt.transaction_hash,
            block_number = receipt.block_number,
            gas_used = receipt.gas_used,
            withdrawal_hash = %self.action.withdrawal_hash,
            l2_output_index = %self.action.params.l2_output_index,
            "Withdrawal proven on L1"
        );

        Ok(Submission {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            gas_used: Some(U256::from(receipt.gas_used)),
        })
    }
}
