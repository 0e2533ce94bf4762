//! Withdrawal lifecycle scheduler.
//!
//! One tick walks every tracked withdrawal through the same pipeline:
//! materialize the message from its L2 receipt, read the authoritative state
//! from the L1 portal, decide what (if anything) to do, then prove or
//! finalize through the action layer. Errors are contained per withdrawal;
//! the next tick re-reads everything from chain.

pub mod config;
pub mod metrics;
pub mod scheduler;

use crate::config::SignerConfig;
use crate::metrics::Metrics;
use crate::scheduler::{decide, TickDecision, Tracker, INTER_WITHDRAWAL_DELAY};
use ::config::ContractAddresses;
use action::{
    finalize::{Finalize, FinalizeAction},
    prove::{Prove, ProveAction},
    PortalAction,
};
use alloy_primitives::{Address, TxHash};
use alloy_provider::Provider;
use client::SignerFn;
use message::{decode_receipt, Message};
use notify::Notifier;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tokio::time::sleep;
use tracing::{debug, info, warn};
use withdrawal::{
    hash::ensure_hash_matches,
    proof::{generate_proof, ProofError, ProveReadiness},
    state::{finalize_time, StateError, WithdrawalStateProvider},
    types::WithdrawalStatus,
};

/// Seconds since the unix epoch, from the local clock.
fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

/// Fetch a withdrawal's L2 receipt and decode it into a Message, verifying
/// that the withdrawal tuple hashes to the event-declared hash.
pub async fn materialize_message<P>(
    l2_provider: &P,
    contracts: &ContractAddresses,
    tx_hash: TxHash,
) -> eyre::Result<Message>
where
    P: Provider + Clone,
{
    let receipt = l2_provider
        .get_transaction_receipt(tx_hash)
        .await?
        .ok_or_else(|| eyre::eyre!("No receipt found on L2 for {tx_hash}"))?;

    let message = decode_receipt(
        &receipt,
        contracts.l2_cross_domain_messenger,
        contracts.l2_to_l1_message_passer,
    )?;
    ensure_hash_matches(&message.withdrawal_transaction(), message.withdrawal_hash)?;

    Ok(message)
}

/// Build the configured signing backend, returning the signer and its address.
pub async fn build_signer<P>(
    signer_config: &SignerConfig,
    l1_provider: &P,
) -> eyre::Result<(SignerFn, Address)>
where
    P: Provider,
{
    match signer_config {
        SignerConfig::PrivateKey(key) => {
            let signer = client::local_signer_fn(key)?;
            let address = client::local_signer_address(key)?;
            Ok((signer, address))
        }
        SignerConfig::Kms { key_id, region } => {
            let chain_id = l1_provider.get_chain_id().await?;
            let (signer, address) =
                client::kms_signer_fn(key_id.clone(), region.clone(), chain_id).await?;
            Ok((signer, address))
        }
    }
}

/// The scheduler: tracks a fixed set of withdrawals and drives each one
/// through prove and finalize.
pub struct Monitor<P1, P2> {
    l1_provider: P1,
    l2_provider: P2,
    signer: SignerFn,
    sender: Address,
    contracts: ContractAddresses,
    notifier: Box<dyn Notifier>,
    tracker: Tracker,
    metrics: Metrics,
}

impl<P1, P2> Monitor<P1, P2>
where
    P1: Provider + Clone,
    P2: Provider + Clone,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        l1_provider: P1,
        l2_provider: P2,
        signer: SignerFn,
        sender: Address,
        contracts: ContractAddresses,
        notifier: Box<dyn Notifier>,
        tx_hashes: &[TxHash],
    ) -> Self {
        Self {
            l1_provider,
            l2_provider,
            signer,
            sender,
            contracts,
            notifier,
            tracker: Tracker::new(tx_hashes),
            metrics: Metrics::new(),
        }
    }

    /// Run one tick over every tracked withdrawal.
    ///
    /// Returns true when every tracked withdrawal has finalized.
    pub async fn run_tick(&mut self) -> bool {
        let started = Instant::now();
        let mut errors = 0usize;
        let mut ready = 0usize;
        let mut proven = 0usize;

        let tx_hashes = self.tracker.tx_hashes().to_vec();
        let mut first = true;
        for tx_hash in tx_hashes {
            if self.tracker.get(tx_hash).finalized {
                continue;
            }
            if !first {
                sleep(INTER_WITHDRAWAL_DELAY).await;
            }
            first = false;

            match self.process_withdrawal(tx_hash).await {
                Ok(Some(WithdrawalStatus::ReadyToProve)) => ready += 1,
                Ok(Some(WithdrawalStatus::Proven { .. })) => proven += 1,
                Ok(_) => {}
                Err(error) => {
                    errors += 1;
                    warn!(
                        tx_hash = %tx_hash,
                        error = %error,
                        "Withdrawal processing failed; will retry next tick"
                    );
                }
            }
        }

        self.metrics
            .set_withdrawal_statuses(ready, proven, self.tracker.finalized_count());
        self.metrics.record_tick(errors, started.elapsed());

        self.tracker.all_finalized()
    }

    /// Process one withdrawal: decode, read portal state, decide, act.
    ///
    /// Returns the observed status when the withdrawal was left idle, None
    /// when an action ran (or the withdrawal was skipped for this tick).
    async fn process_withdrawal(
        &mut self,
        tx_hash: TxHash,
    ) -> eyre::Result<Option<WithdrawalStatus>> {
        let mut message =
            materialize_message(&self.l2_provider, &self.contracts, tx_hash).await?;

        let state = WithdrawalStateProvider::new(
            self.l1_provider.clone(),
            self.contracts.l1_optimism_portal,
        );
        let status = match state.query_status(message.withdrawal_hash).await {
            Ok(status) => status,
            Err(error @ StateError::ZeroTimestamp { .. }) => {
                // Inconsistent portal record; do not trust it, retry later.
                warn!(tx_hash = %tx_hash, error = %error, "Leaving withdrawal for next tick");
                return Ok(None);
            }
            Err(error) => return Err(error.into()),
        };
        message.status = status.message_status();

        debug!(
            tx_hash = %tx_hash,
            withdrawal_hash = %message.withdrawal_hash,
            status = ?message.status,
            "Observed withdrawal status"
        );

        match decide(status, self.tracker.get(tx_hash), unix_now()) {
            TickDecision::MarkFinalized => {
                info!(tx_hash = %tx_hash, "Withdrawal already finalized");
                self.notify(&format!(
                    "Withdrawal {} is already finalized",
                    message.withdrawal_hash
                ))
                .await;
                self.tracker.mark_finalized(tx_hash);
                Ok(None)
            }
            TickDecision::AttemptProve => {
                let acted = self.attempt_prove(&message).await?;
                Ok(if acted { None } else { Some(status) })
            }
            TickDecision::WaitChallenge {
                notify_waiting,
                notify_reminder,
                finalize_time,
            } => {
                if notify_waiting {
                    self.notify(&format!(
                        "Withdrawal {} is proven and waiting for the challenge period; \
                         finalize available at {}",
                        message.withdrawal_hash, finalize_time
                    ))
                    .await;
                    self.tracker.mark_waiting_sent(tx_hash);
                }
                if notify_reminder {
                    self.notify(&format!(
                        "Withdrawal {} can be finalized in 5 minutes",
                        message.withdrawal_hash
                    ))
                    .await;
                    self.tracker.mark_reminder_sent(tx_hash);
                }
                Ok(Some(status))
            }
            TickDecision::AttemptFinalize => {
                self.attempt_finalize(&message).await;
                Ok(None)
            }
        }
    }

    /// Generate proof material and submit the prove transaction.
    ///
    /// Returns true when a prove transaction was attempted. Proof-invariant
    /// violations are reported and never turned into an L1 transaction;
    /// transient RPC failures propagate for the per-tick retry path.
    async fn attempt_prove(&mut self, message: &Message) -> eyre::Result<bool> {
        let readiness = match generate_proof(
            &self.l1_provider,
            &self.l2_provider,
            self.contracts.l2_output_oracle,
            self.contracts.l2_to_l1_message_passer,
            message.withdrawal_transaction(),
            message.withdrawal_hash,
            message.l2_block_number,
        )
        .await
        {
            Ok(readiness) => readiness,
            Err(error @ ProofError::Rpc(_)) => return Err(error.into()),
            Err(error) => {
                warn!(
                    withdrawal_hash = %message.withdrawal_hash,
                    error = %error,
                    "Proof generation refused; no transaction sent"
                );
                self.notify(&format!(
                    "Prove failed for withdrawal {}: {}",
                    message.withdrawal_hash, error
                ))
                .await;
                return Ok(false);
            }
        };

        let params = match readiness {
            ProveReadiness::Ready(params) => params,
            ProveReadiness::AwaitingOutput {
                withdrawal_block,
                proposed_block,
            } => {
                debug!(
                    withdrawal_hash = %message.withdrawal_hash,
                    withdrawal_block,
                    proposed_block,
                    "No eligible output proposal yet"
                );
                return Ok(false);
            }
        };

        self.notify(&format!(
            "Withdrawal {} is ready to prove",
            message.withdrawal_hash
        ))
        .await;
        self.notify(&format!(
            "Starting prove for withdrawal {}",
            message.withdrawal_hash
        ))
        .await;

        let mut action = ProveAction::new(
            self.l1_provider.clone(),
            self.signer.clone(),
            Prove {
                portal_address: self.contracts.l1_optimism_portal,
                params,
                withdrawal_hash: message.withdrawal_hash,
                from: self.sender,
            },
        );

        match action.execute().await {
            Ok(result) => {
                self.metrics.record_prove_submitted();
                self.tracker.on_prove_succeeded(message.l2_tx_hash);
                self.notify(&format!(
                    "Prove successful for withdrawal {} in tx {}; finalize available at {}",
                    message.withdrawal_hash,
                    result.tx_hash,
                    finalize_time(unix_now())
                ))
                .await;
            }
            Err(error) => {
                warn!(
                    withdrawal_hash = %message.withdrawal_hash,
                    error = %error,
                    "Prove submission failed"
                );
                self.notify(&format!(
                    "Prove failed for withdrawal {}: {}",
                    message.withdrawal_hash, error
                ))
                .await;
            }
        }

        Ok(true)
    }

    /// Submit the finalize transaction for a withdrawal past its challenge
    /// period.
    async fn attempt_finalize(&mut self, message: &Message) {
        self.notify(&format!(
            "Starting finalize for withdrawal {}",
            message.withdrawal_hash
        ))
        .await;

        let mut action = FinalizeAction::new(
            self.l1_provider.clone(),
            self.signer.clone(),
            Finalize {
                portal_address: self.contracts.l1_optimism_portal,
                withdrawal: message.withdrawal_transaction(),
                withdrawal_hash: message.withdrawal_hash,
                from: self.sender,
            },
        );

        match action.execute().await {
            Ok(result) => {
                self.metrics.record_finalize_submitted();
                self.tracker.mark_finalized(message.l2_tx_hash);
                self.notify(&format!(
                    "Finalize successful for withdrawal {} in tx {}",
                    message.withdrawal_hash, result.tx_hash
                ))
                .await;
            }
            Err(error) => {
                warn!(
                    withdrawal_hash = %message.withdrawal_hash,
                    error = %error,
                    "Finalize submission failed"
                );
                self.notify(&format!(
                    "Finalize failed for withdrawal {}: {}",
                    message.withdrawal_hash, error
                ))
                .await;
            }
        }
    }

    /// Emit the terminal notification once every withdrawal has finalized.
    pub async fn notify_all_completed(&self) {
        self.notify("All withdrawals completed").await;
    }

    /// Send a notification, logging (not failing) on transport errors.
    async fn notify(&self, text: &str) {
        if let Err(error) = self.notifier.notify(text).await {
            warn!(error = %error, text, "Failed to send notification");
        }
    }
}
