use crate::types::{WithdrawalHash, WithdrawalStatus};
use alloy_contract::private::Provider;
use alloy_primitives::{Address, B256};
use binding::mantle::IOptimismPortal;
use thiserror::Error;
use tokio_retry::{strategy::ExponentialBackoff, Retry};
use tracing::warn;

/// Challenge period between prove and finalize: 12 hours.
pub const CHALLENGE_PERIOD_SECS: u64 = 43_200;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("portal read failed: {0}")]
    Rpc(String),

    /// The portal holds a non-zero output root but a zero prove timestamp.
    ///
    /// Finalize math on a zero timestamp would underflow into the distant
    /// past, so this record is treated as not-yet-proven and retried.
    #[error("proven withdrawal {hash} has zero timestamp (output root {root})")]
    ZeroTimestamp { hash: WithdrawalHash, root: B256 },
}

impl From<alloy_contract::Error> for StateError {
    fn from(e: alloy_contract::Error) -> Self {
        Self::Rpc(e.to_string())
    }
}

/// Epoch second at which a proven withdrawal becomes finalizable.
pub const fn finalize_time(proven_at: u64) -> u64 {
    proven_at + CHALLENGE_PERIOD_SECS
}

/// A withdrawal can be finalized iff it has a real prove timestamp and the
/// challenge period has fully elapsed. The boundary instant counts.
pub const fn can_finalize(now: u64, proven_at: u64) -> bool {
    proven_at > 0 && now >= finalize_time(proven_at)
}

/// Read-side view of the L1 portal for a set of withdrawals.
pub struct WithdrawalStateProvider<P> {
    l1_provider: P,
    portal_address: Address,
}

impl<P> WithdrawalStateProvider<P>
where
    P: Provider + Clone,
{
    pub const fn new(l1_provider: P, portal_address: Address) -> Self {
        Self {
            l1_provider,
            portal_address,
        }
    }

    /// Current lifecycle status, computed fresh from portal reads.
    ///
    /// Finalized wins over any other signal; otherwise a non-zero prove
    /// timestamp means proven.
    pub async fn query_status(
        &self,
        hash: WithdrawalHash,
    ) -> Result<WithdrawalStatus, StateError> {
        if self.is_finalized(hash).await? {
            return Ok(WithdrawalStatus::Finalized);
        }

        if let Some(timestamp) = self.proven_at(hash).await? {
            return Ok(WithdrawalStatus::Proven { timestamp });
        }

        Ok(WithdrawalStatus::ReadyToProve)
    }

    pub async fn is_finalized(&self, hash: WithdrawalHash) -> Result<bool, StateError> {
        let portal = IOptimismPortal::new(self.portal_address, &self.l1_provider);
        let finalized = with_retry(|| async { portal.finalizedWithdrawals(hash).call().await })
            .await?;
        Ok(finalized)
    }

    /// Prove timestamp, or None when the withdrawal is not proven.
    ///
    /// A record with a non-zero root but a zero timestamp is surfaced as
    /// [`StateError::ZeroTimestamp`] instead of being trusted.
    pub async fn proven_at(&self, hash: WithdrawalHash) -> Result<Option<u64>, StateError> {
        let portal = IOptimismPortal::new(self.portal_address, &self.l1_provider);
        let proven = with_retry(|| async { portal.provenWithdrawals(hash).call().await }).await?;

        let timestamp: u64 = proven.timestamp.try_into().unwrap_or(u64::MAX);
        if timestamp == 0 {
            if proven.outputRoot != B256::ZERO {
                return Err(StateError::ZeroTimestamp {
                    hash,
                    root: proven.outputRoot,
                });
            }
            return Ok(None);
        }

        Ok(Some(timestamp))
    }
}

/// Retry a portal read with bounded exponential backoff (100ms..., 3 tries).
async fn with_retry<T, F, Fut>(call: F) -> Result<T, alloy_contract::Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, alloy_contract::Error>>,
{
    let retry_strategy = ExponentialBackoff::from_millis(100).take(3);

    Retry::spawn(retry_strategy, || async {
        call().await.map_err(|e| {
            warn!(error = %e, "portal read failed, will retry");
            e
        })
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_finalize_boundary() {
        let proven_at = 1_700_000_000;

        // One second short of the challenge period.
        assert!(!can_finalize(proven_at + CHALLENGE_PERIOD_SECS - 1, proven_at));
        // Exactly at the boundary counts.
        assert!(can_finalize(proven_at + CHALLENGE_PERIOD_SECS, proven_at));
        // And anything after.
        assert!(can_finalize(proven_at + CHALLENGE_PERIOD_SECS + 1, proven_at));
    }

    #[test]
    fn test_zero_proven_timestamp_never_finalizes() {
        assert!(!can_finalize(u64::MAX, 0));
        assert!(!can_finalize(0, 0));
    }

    #[test]
    fn test_finalize_time_is_twelve_hours_out() {
        assert_eq!(finalize_time(100), 100 + 43_200);
        assert_eq!(CHALLENGE_PERIOD_SECS, 12 * 60 * 60);
    }
}
