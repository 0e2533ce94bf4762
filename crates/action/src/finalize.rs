//! Finalize withdrawal action.
//!
//! Finalizes a proven withdrawal on L1 once the challenge period has passed,
//! executing the withdrawal transaction and releasing MNT/ETH to the target.

use crate::{PortalAction, SignerFn, Submission};
use alloy_primitives::{Address, U256};
use alloy_provider::Provider;
use binding::mantle::{IOptimismPortal, WithdrawalTransaction};
use tracing::info;
use withdrawal::{
    state::{can_finalize, finalize_time, WithdrawalStateProvider},
    types::WithdrawalHash,
};

/// Input data for finalizing a withdrawal on L1.
#[derive(Clone, Debug)]
pub struct Finalize {
    /// OptimismPortal contract address on L1
    pub portal_address: Address,
    /// The withdrawal transaction details
    pub withdrawal: WithdrawalTransaction,
    /// Hash of the withdrawal
    pub withdrawal_hash: WithdrawalHash,
    /// Address that will submit the finalize transaction
    pub from: Address,
}

/// Action to finalize a proven withdrawal on L1.
pub struct FinalizeAction<P> {
    l1_provider: P,
    signer: SignerFn,
    action: Finalize,
}

impl<P> FinalizeAction<P>
where
    P: Provider + Clone,
{
    pub fn new(l1_provider: P, signer: SignerFn, action: Finalize) -> Self {
        Self {
            l1_provider,
            signer,
            action,
        }
    }

    async fn check_is_finalized(&self) -> eyre::Result<bool> {
        let state =
            WithdrawalStateProvider::new(self.l1_provider.clone(), self.action.portal_address);

        Ok(state.is_finalized(self.action.withdrawal_hash).await?)
    }

    /// Check if the withdrawal has been proven and get the proof timestamp.
    async fn check_is_proven(&self) -> eyre::Result<Option<u64>> {
        let state =
            WithdrawalStateProvider::new(self.l1_provider.clone(), self.action.portal_address);

        Ok(state.proven_at(self.action.withdrawal_hash).await?)
    }

    /// Get the current L1 block timestamp.
    async fn get_current_timestamp(&self) -> eyre::Result<u64> {
        let block = self
            .l1_provider
            .get_block_by_number(alloy_rpc_types_eth::BlockNumberOrTag::Latest)
            .await?
            .ok_or_else(|| eyre::eyre!("Failed to get latest block"))?;
        Ok(block.header.timestamp)
    }
}

impl<P> PortalAction for FinalizeAction<P>
where
    P: Provider + Clone,
{
    fn withdrawal_hash(&self) -> WithdrawalHash {
        self.action.withdrawal_hash
    }

    async fn is_ready(&self) -> eyre::Result<bool> {
        // Not ready if already finalized
        if self.check_is_finalized().await? {
            return Ok(false);
        }

        // A read failure here propagates as an error; readiness is never
        // assumed when the portal cannot be consulted.
        let Some(proven_timestamp) = self.check_is_proven().await? else {
            // Not proven yet
            return Ok(false);
        };

        let current_timestamp = self.get_current_timestamp().await?;
        Ok(can_finalize(current_timestamp, proven_timestamp))
    }

    async fn is_completed(&self) -> eyre::Result<bool> {
        self.check_is_finalized().await
    }

    async fn execute(&mut self) -> eyre::Result<Submission> {
        if self.is_completed().await? {
            eyre::bail!("Withdrawal already finalized")
        }

        // Verify the withdrawal is proven
        let Some(proven_timestamp) = self.check_is_proven().await? else {
            eyre::bail!("Withdrawal not proven yet")
        };

        // Verify the challenge period has passed
        let current_timestamp = self.get_current_timestamp().await?;
        if !can_finalize(current_timestamp, proven_timestamp) {
            let remaining = finalize_time(proven_timestamp).saturating_sub(current_timestamp);
            eyre::bail!(
                "Challenge period not elapsed. {} seconds remaining",
                remaining
            )
        }

        info!(
            withdrawal_hash = %self.action.withdrawal_hash,
            proven_timestamp,
            "Finalizing withdrawal"
        );

        // Build the transaction request
        let portal = IOptimismPortal::new(self.action.portal_address, &self.l1_provider);
        let call = portal.finalizeWithdrawalTransaction(self.action.withdrawal.clone());
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
                "finalizeWithdrawalTransaction reverted on-chain in tx {}",
                receipt.transaction_hash
            );
        }

        info!(
            tx_hash = %receipt.transaction_hash,
            block_number = receipt.block_number,
            gas_used = receipt.gas_used,
            withdrawal_hash = %self.action.withdrawal_hash,
            "Withdrawal finalized on L1"
        );

        Ok(Submission {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            gas_used: Some(U256::from(receipt.gas_used)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{offline_signer, OfflineProvider};
    use alloy_primitives::{address, b256, Bytes};

    fn create_test_finalize_action() -> FinalizeAction<OfflineProvider> {
        let finalize = Finalize {
            portal_address: address!("c54cb22944f2be476e02decfcd7e3e7d3e15a8fb"),
            withdrawal: WithdrawalTransaction {
                nonce: U256::from(1),
                sender: address!("5cffa347b0ae99cc01e5c01714ca5658e54a23d1"),
                target: address!("5cffa347b0ae99cc01e5c01714ca5658e54a23d1"),
                mntValue: U256::from(1000000000000000u64),
                ethValue: U256::ZERO,
                gasLimit: U256::from(100000),
                data: Bytes::new(),
            },
            withdrawal_hash: b256!(
                "1111111111111111111111111111111111111111111111111111111111111111"
            ),
            from: address!("5cffa347b0ae99cc01e5c01714ca5658e54a23d1"),
        };

        FinalizeAction::new(OfflineProvider, offline_signer(), finalize)
    }

    #[test]
    fn test_finalize_action_withdrawal_hash() {
        let action = create_test_finalize_action();
        assert_eq!(
            action.withdrawal_hash(),
            b256!("1111111111111111111111111111111111111111111111111111111111111111")
        );
    }

    #[test]
    fn test_finalize_action_targets_configured_portal() {
        let action = create_test_finalize_action();
        assert_eq!(
            action.action.portal_address,
            address!("c54cb22944f2be476e02decfcd7e3e7d3e15a8fb")
        );
    }
}
