//! Per-withdrawal lifecycle bookkeeping and the tick decision step.
//!
//! The tracker owns the only mutable state in the process: one record of
//! notification flags per tracked withdrawal. Everything else is re-read from
//! the chain on every tick. `decide` is a pure function from the observed
//! portal state, the tracker record and the clock to the action the tick
//! should take, which keeps the state machine testable without a node.

use alloy_primitives::TxHash;
use std::collections::HashMap;
use std::time::Duration;
use withdrawal::state::{can_finalize, finalize_time};
use withdrawal::types::WithdrawalStatus;

/// Scheduler tick cadence.
pub const TICK_INTERVAL: Duration = Duration::from_secs(600);

/// Pause between withdrawals within one tick, to space RPC load.
pub const INTER_WITHDRAWAL_DELAY: Duration = Duration::from_secs(30);

/// How close to finalize eligibility the reminder notice fires.
pub const FINALIZE_REMINDER_WINDOW_SECS: u64 = 300;

/// Notification flags for one tracked withdrawal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackedWithdrawal {
    /// "waiting for challenge period" notice has been sent
    pub sent_waiting_message: bool,
    /// "5 minutes remaining" notice has been sent
    pub sent_five_minute_reminder: bool,
    /// withdrawal reached FINALIZED
    pub finalized: bool,
}

/// The set of withdrawals this process watches, fixed at startup.
pub struct Tracker {
    order: Vec<TxHash>,
    entries: HashMap<TxHash, TrackedWithdrawal>,
}

impl Tracker {
    pub fn new(tx_hashes: &[TxHash]) -> Self {
        let mut order = Vec::new();
        let mut entries = HashMap::new();
        for &hash in tx_hashes {
            if entries.insert(hash, TrackedWithdrawal::default()).is_none() {
                order.push(hash);
            }
        }
        Self { order, entries }
    }

    pub fn tx_hashes(&self) -> &[TxHash] {
        &self.order
    }

    pub fn get(&self, tx_hash: TxHash) -> TrackedWithdrawal {
        self.entries.get(&tx_hash).copied().unwrap_or_default()
    }

    pub fn mark_waiting_sent(&mut self, tx_hash: TxHash) {
        if let Some(entry) = self.entries.get_mut(&tx_hash) {
            entry.sent_waiting_message = true;
        }
    }

    pub fn mark_reminder_sent(&mut self, tx_hash: TxHash) {
        if let Some(entry) = self.entries.get_mut(&tx_hash) {
            entry.sent_five_minute_reminder = true;
        }
    }

    pub fn mark_finalized(&mut self, tx_hash: TxHash) {
        if let Some(entry) = self.entries.get_mut(&tx_hash) {
            entry.finalized = true;
        }
    }

    /// A fresh prove re-arms both challenge-period notices, so a re-prove
    /// after a reorg notifies again.
    pub fn on_prove_succeeded(&mut self, tx_hash: TxHash) {
        if let Some(entry) = self.entries.get_mut(&tx_hash) {
            entry.sent_waiting_message = false;
            entry.sent_five_minute_reminder = false;
        }
    }

    pub fn all_finalized(&self) -> bool {
        self.order.iter().all(|hash| {
            self.entries
                .get(hash)
                .is_some_and(|entry| entry.finalized)
        })
    }

    pub fn finalized_count(&self) -> usize {
        self.entries.values().filter(|entry| entry.finalized).count()
    }
}

/// What the tick should do for one withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDecision {
    /// Portal reports finalized; record it
    MarkFinalized,
    /// No proven record yet; run the proof pipeline
    AttemptProve,
    /// Proven but inside the challenge period
    WaitChallenge {
        notify_waiting: bool,
        notify_reminder: bool,
        finalize_time: u64,
    },
    /// Challenge period elapsed; submit finalize
    AttemptFinalize,
}

/// Pure decision step for one withdrawal in one tick.
pub fn decide(status: WithdrawalStatus, tracked: TrackedWithdrawal, now: u64) -> TickDecision {
    match status {
        WithdrawalStatus::Finalized => TickDecision::MarkFinalized,
        WithdrawalStatus::ReadyToProve => TickDecision::AttemptProve,
        WithdrawalStatus::Proven { timestamp } => {
            if can_finalize(now, timestamp) {
                return TickDecision::AttemptFinalize;
            }
            let finalize_at = finalize_time(timestamp);
            TickDecision::WaitChallenge {
                notify_waiting: !tracked.sent_waiting_message,
                notify_reminder: !tracked.sent_five_minute_reminder
                    && now + FINALIZE_REMINDER_WINDOW_SECS >= finalize_at,
                finalize_time: finalize_at,
            }
        }
    }
}
