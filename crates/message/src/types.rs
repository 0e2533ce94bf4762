use alloy_primitives::{TxHash, B256, U256};
use binding::mantle::{
    IL2CrossDomainMessenger::{SentMessage, SentMessageExtension1},
    IL2ToL1MessagePasser::MessagePassed,
    WithdrawalTransaction,
};

/// Message direction. The monitor only handles withdrawals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    L2ToL1,
}

/// Lifecycle status of a withdrawal as reported by the L1 portal.
///
/// Recomputed from portal reads on every tick, never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    ReadyToProve,
    Proven,
    Finalized,
    Unknown,
}

impl MessageStatus {
    /// Numeric status code: 0 = ready to prove, 1 = proven, 2 = finalized.
    pub const fn code(self) -> u8 {
        match self {
            Self::ReadyToProve => 0,
            Self::Proven => 1,
            Self::Finalized => 2,
            Self::Unknown => u8::MAX,
        }
    }

    pub const fn from_code(code: u8) -> Self {
        match code {
            0 => Self::ReadyToProve,
            1 => Self::Proven,
            2 => Self::Finalized,
            _ => Self::Unknown,
        }
    }
}

/// A materialized L2→L1 withdrawal, built from one L2 transaction receipt.
///
/// Constructed once per tick and not mutated afterwards; `status` is assigned
/// from portal reads during construction of the tick's view.
#[derive(Debug, Clone)]
pub struct Message {
    pub l2_tx_hash: TxHash,
    pub l2_block_number: u64,
    pub log_index: u64,
    pub direction: Direction,
    pub status: MessageStatus,
    pub nonce: U256,
    pub withdrawal_hash: B256,
    pub mnt_value: U256,
    pub eth_value: U256,
    pub sent_message: Option<SentMessage>,
    pub sent_message_extension: Option<SentMessageExtension1>,
    pub message_passed: MessagePassed,
}

impl Message {
    /// Build the portal's withdrawal descriptor from the decoded events.
    ///
    /// Identical input for prove and finalize; its keccak encoding is the
    /// withdrawal hash.
    pub fn withdrawal_transaction(&self) -> WithdrawalTransaction {
        WithdrawalTransaction {
            nonce: self.message_passed.nonce,
            sender: self.message_passed.sender,
            target: self.message_passed.target,
            mntValue: self.mnt_value,
            ethValue: self.eth_value,
            gasLimit: self.message_passed.gasLimit,
            data: self.message_passed.data.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_round_trip() {
        for status in [
            MessageStatus::ReadyToProve,
            MessageStatus::Proven,
            MessageStatus::Finalized,
        ] {
            assert_eq!(MessageStatus::from_code(status.code()), status);
        }
    }

    #[test]
    fn test_unrecognized_code_is_unknown() {
        assert_eq!(MessageStatus::from_code(3), MessageStatus::Unknown);
        assert_eq!(MessageStatus::from_code(200), MessageStatus::Unknown);
    }
}
