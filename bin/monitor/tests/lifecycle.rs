//! Scenario tests for the withdrawal lifecycle.
//!
//! Drives the scheduler's decision layer through recorded sequences of portal
//! observations and asserts on the notifications and state transitions each
//! tick would produce.

use alloy_primitives::{b256, TxHash};
use monitor::scheduler::{
    decide, TickDecision, Tracker, FINALIZE_REMINDER_WINDOW_SECS,
};
use withdrawal::state::CHALLENGE_PERIOD_SECS;
use withdrawal::types::WithdrawalStatus;

const HASH: TxHash = b256!("0101010101010101010101010101010101010101010101010101010101010101");

/// Apply one tick's decision to the tracker the way the monitor does,
/// returning the notification labels that tick emits.
fn apply_tick(tracker: &mut Tracker, status: WithdrawalStatus, now: u64) -> Vec<&'static str> {
    let mut sent = Vec::new();

    match decide(status, tracker.get(HASH), now) {
        TickDecision::MarkFinalized => {
            sent.push("already finalized");
            tracker.mark_finalized(HASH);
        }
        TickDecision::AttemptProve => {
            sent.push("prove attempt");
        }
        TickDecision::WaitChallenge {
            notify_waiting,
            notify_reminder,
            ..
        } => {
            if notify_waiting {
                sent.push("waiting");
                tracker.mark_waiting_sent(HASH);
            }
            if notify_reminder {
                sent.push("5-minute reminder");
                tracker.mark_reminder_sent(HASH);
            }
        }
        TickDecision::AttemptFinalize => {
            sent.push("finalize attempt");
        }
    }

    sent
}

#[test]
fn test_proven_within_challenge_period_notifies_once() {
    // S3: proven 10 minutes ago; many ticks pass inside the challenge period.
    let proven_at = 1_700_000_000;
    let status = WithdrawalStatus::Proven { timestamp: proven_at };
    let mut tracker = Tracker::new(&[HASH]);

    let first = apply_tick(&mut tracker, status, proven_at + 600);
    assert_eq!(first, vec!["waiting"]);

    // Ten more ticks, still waiting: nothing new.
    for i in 1..=10 {
        let sent = apply_tick(&mut tracker, status, proven_at + 600 * (i + 1));
        assert!(sent.is_empty(), "tick {i} re-sent notifications: {sent:?}");
    }

    // Five minutes before eligibility the reminder fires, once.
    let reminder_time = proven_at + CHALLENGE_PERIOD_SECS - FINALIZE_REMINDER_WINDOW_SECS;
    let sent = apply_tick(&mut tracker, status, reminder_time);
    assert_eq!(sent, vec!["5-minute reminder"]);

    let sent = apply_tick(&mut tracker, status, reminder_time + 60);
    assert!(sent.is_empty());
}

#[test]
fn test_challenge_passed_triggers_finalize_and_terminates() {
    // S4: the challenge period has fully elapsed.
    let proven_at = 1_700_000_000;
    let status = WithdrawalStatus::Proven { timestamp: proven_at };
    let mut tracker = Tracker::new(&[HASH]);

    let sent = apply_tick(&mut tracker, status, proven_at + CHALLENGE_PERIOD_SECS);
    assert_eq!(sent, vec!["finalize attempt"]);

    // Finalize succeeded; the portal reports FINALIZED from now on.
    tracker.mark_finalized(HASH);
    assert!(tracker.all_finalized());
}

#[test]
fn test_status_is_monotonic_across_a_successful_run() {
    // Property 4: a successful run never regresses the observed status.
    let proven_at = 1_700_000_000;
    let observed = [
        WithdrawalStatus::ReadyToProve,
        WithdrawalStatus::ReadyToProve,
        WithdrawalStatus::Proven { timestamp: proven_at },
        WithdrawalStatus::Proven { timestamp: proven_at },
        WithdrawalStatus::Finalized,
    ];

    let mut last_code = 0;
    for status in observed {
        assert!(status.code() >= last_code, "status regressed");
        last_code = status.code();
    }
    assert_eq!(last_code, 2);
}

#[test]
fn test_ineligible_withdrawal_resumes_without_operator_action() {
    // S5: while no proposed output covers the withdrawal, every tick keeps
    // deciding to run the proof pipeline; once the oracle catches up the same
    // decision path carries the prove through.
    let mut tracker = Tracker::new(&[HASH]);

    for i in 0..5 {
        let sent = apply_tick(&mut tracker, WithdrawalStatus::ReadyToProve, 1_700_000_000 + i);
        assert_eq!(sent, vec!["prove attempt"]);
    }

    // Prove landed; the waiting notice arms exactly once afterwards.
    tracker.on_prove_succeeded(HASH);
    let status = WithdrawalStatus::Proven { timestamp: 1_700_000_500 };
    let sent = apply_tick(&mut tracker, status, 1_700_001_000);
    assert_eq!(sent, vec!["waiting"]);
}

#[test]
fn test_reorg_reprove_rearms_notifications() {
    // A re-prove after a reorg resets both wait notices.
    let proven_at = 1_700_000_000;
    let status = WithdrawalStatus::Proven { timestamp: proven_at };
    let mut tracker = Tracker::new(&[HASH]);

    assert_eq!(apply_tick(&mut tracker, status, proven_at + 60), vec!["waiting"]);
    assert!(apply_tick(&mut tracker, status, proven_at + 120).is_empty());

    // Portal regressed to unproven (output re-proposed), prove runs again.
    assert_eq!(
        apply_tick(&mut tracker, WithdrawalStatus::ReadyToProve, proven_at + 180),
        vec!["prove attempt"]
    );
    tracker.on_prove_succeeded(HASH);

    let reproven = WithdrawalStatus::Proven { timestamp: proven_at + 200 };
    assert_eq!(
        apply_tick(&mut tracker, reproven, proven_at + 240),
        vec!["waiting"]
    );
}

#[test]
fn test_already_finalized_withdrawal_is_terminal() {
    let mut tracker = Tracker::new(&[HASH]);

    let sent = apply_tick(&mut tracker, WithdrawalStatus::Finalized, 1_700_000_000);
    assert_eq!(sent, vec!["already finalized"]);
    assert!(tracker.all_finalized());
    assert!(tracker.get(HASH).finalized);
}

#[test]
fn test_multiple_withdrawals_all_must_finalize() {
    let other: TxHash =
        b256!("0202020202020202020202020202020202020202020202020202020202020202");
    let mut tracker = Tracker::new(&[HASH, other]);

    tracker.mark_finalized(HASH);
    assert!(!tracker.all_finalized());

    tracker.mark_finalized(other);
    assert!(tracker.all_finalized());
}
