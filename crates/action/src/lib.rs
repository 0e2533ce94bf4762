//! On-chain portal actions.
//!
//! Prove and finalize are the two transactions the monitor ever sends; both
//! go through the same fill → sign → broadcast → wait-mined round trip and
//! answer the same readiness questions against the portal, captured by
//! [`PortalAction`].

pub mod finalize;
pub mod prove;

use alloy_primitives::{TxHash, U256};
pub use client::{fill_transaction, SignerFn};
use std::future::Future;
use withdrawal::types::WithdrawalHash;

/// Receipt data from a portal transaction that landed with status 1.
#[derive(Debug, Clone, Copy)]
pub struct Submission {
    /// L1 transaction hash
    pub tx_hash: TxHash,
    /// Block the transaction was included in
    pub block_number: Option<u64>,
    /// Gas spent by the submission
    pub gas_used: Option<U256>,
}

/// One lifecycle step of a withdrawal, executable against the L1 portal.
///
/// Readiness and completion are always answered from fresh portal reads, so
/// a scheduler can re-consult them every tick without caching concerns.
pub trait PortalAction: Send + Sync {
    /// Hash of the withdrawal this action operates on.
    fn withdrawal_hash(&self) -> WithdrawalHash;

    /// Whether the portal state admits submitting this action now.
    fn is_ready(&self) -> impl Future<Output = eyre::Result<bool>> + Send;

    /// Whether the portal already reflects this action's effect.
    fn is_completed(&self) -> impl Future<Output = eyre::Result<bool>> + Send;

    /// Fill, sign, broadcast and wait for inclusion.
    ///
    /// A receipt with status 0 surfaces as an error; the caller decides
    /// whether to notify, retry on a later tick, or both.
    fn execute(&mut self) -> impl Future<Output = eyre::Result<Submission>> + Send;
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::SignerFn;
    use alloy_provider::{network::Ethereum, Provider, RootProvider};
    use std::sync::Arc;

    /// Provider stub for constructor-level tests. Issuing any RPC through it
    /// is a test bug.
    #[derive(Clone)]
    pub struct OfflineProvider;

    impl Provider for OfflineProvider {
        fn root(&self) -> &RootProvider<Ethereum> {
            unreachable!("offline provider must not issue RPC calls")
        }
    }

    /// Signer stub that refuses to sign, so tests never reach broadcast.
    pub fn offline_signer() -> SignerFn {
        Arc::new(|_tx| Box::pin(async { eyre::bail!("offline signer refuses to sign") }))
    }
}
