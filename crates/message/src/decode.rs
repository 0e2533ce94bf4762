//! Event extraction from L2 withdrawal receipts.
//!
//! A withdrawal transaction emits up to three events of interest:
//! `SentMessage` and `SentMessageExtension1` from the L2 cross-domain
//! messenger, and `MessagePassed` from the L2 message passer. `MessagePassed`
//! is the only one the portal inputs strictly need; the extension carries the
//! MNT/ETH value pair and defaults to zero when absent.

use crate::types::{Direction, Message, MessageStatus};
use alloy_primitives::{Address, TxHash, U256};
use alloy_rpc_types_eth::{Log, TransactionReceipt};
use alloy_sol_types::SolEvent;
use binding::mantle::{
    IL2CrossDomainMessenger::{SentMessage, SentMessageExtension1},
    IL2ToL1MessagePasser::MessagePassed,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    /// The receipt carries no MessagePassed event - not a withdrawal
    #[error("no MessagePassed event from message passer {0} in receipt")]
    MissingMessagePassed(Address),

    /// A matched log did not decode as its event
    #[error("malformed {event} event: {source}")]
    Event {
        event: &'static str,
        #[source]
        source: alloy_sol_types::Error,
    },

    /// The receipt has not been included in a block
    #[error("receipt for {0} has no block number")]
    MissingBlockNumber(TxHash),
}

/// Decode a withdrawal receipt into a Message.
///
/// Scans the receipt's logs and takes the first match for each of the three
/// events, filtered by emitting contract. Decode failures surface as errors
/// rather than zero-valued events.
pub fn decode_receipt(
    receipt: &TransactionReceipt,
    messenger: Address,
    message_passer: Address,
) -> Result<Message, DecodeError> {
    let block_number = receipt
        .block_number
        .ok_or(DecodeError::MissingBlockNumber(receipt.transaction_hash))?;

    decode_logs(
        receipt.transaction_hash,
        block_number,
        receipt.inner.logs(),
        messenger,
        message_passer,
    )
}

/// Decode the three withdrawal events out of a log list.
pub fn decode_logs(
    l2_tx_hash: TxHash,
    l2_block_number: u64,
    logs: &[Log],
    messenger: Address,
    message_passer: Address,
) -> Result<Message, DecodeError> {
    let sent_message = find_event::<SentMessage>(logs, messenger, "SentMessage")?;
    let sent_message_extension =
        find_event::<SentMessageExtension1>(logs, messenger, "SentMessageExtension1")?;
    let message_passed = find_event::<MessagePassed>(logs, message_passer, "MessagePassed")?;

    let Some((message_passed, passed_log_index)) = message_passed else {
        return Err(DecodeError::MissingMessagePassed(message_passer));
    };

    // No extension means the withdrawal moves no value.
    let (mnt_value, eth_value) = sent_message_extension
        .as_ref()
        .map_or((U256::ZERO, U256::ZERO), |(ext, _)| {
            (ext.mntValue, ext.ethValue)
        });

    Ok(Message {
        l2_tx_hash,
        l2_block_number,
        log_index: passed_log_index,
        direction: Direction::L2ToL1,
        status: MessageStatus::Unknown,
        nonce: message_passed.nonce,
        withdrawal_hash: message_passed.withdrawalHash,
        mnt_value,
        eth_value,
        sent_message: sent_message.map(|(event, _)| event),
        sent_message_extension: sent_message_extension.map(|(event, _)| event),
        message_passed,
    })
}

/// First log from `emitter` whose topic0 is E's signature hash, decoded.
fn find_event<E: SolEvent>(
    logs: &[Log],
    emitter: Address,
    name: &'static str,
) -> Result<Option<(E, u64)>, DecodeError> {
    for log in logs {
        if log.inner.address != emitter {
            continue;
        }
        if log.inner.data.topics().first() != Some(&E::SIGNATURE_HASH) {
            continue;
        }

        let event = E::decode_log_data(&log.inner.data)
            .map_err(|source| DecodeError::Event { event: name, source })?;
        return Ok(Some((event, log.log_index.unwrap_or_default())));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256, Bytes, LogData, B256};

    const MESSENGER: Address = address!("4200000000000000000000000000000000000007");
    const PASSER: Address = address!("4200000000000000000000000000000000000016");

    fn wrap_log(emitter: Address, data: LogData, log_index: u64) -> Log {
        Log {
            inner: alloy_primitives::Log {
                address: emitter,
                data,
            },
            block_hash: None,
            block_number: None,
            block_timestamp: None,
            transaction_hash: None,
            transaction_index: None,
            log_index: Some(log_index),
            removed: false,
        }
    }

    fn message_passed_log(log_index: u64) -> Log {
        let event = MessagePassed {
            nonce: U256::from(7),
            sender: address!("1111111111111111111111111111111111111111"),
            target: address!("2222222222222222222222222222222222222222"),
            value: U256::from(500),
            gasLimit: U256::from(200_000),
            data: Bytes::from(vec![0xde, 0xad]),
            withdrawalHash: b256!(
                "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"
            ),
        };
        wrap_log(PASSER, event.encode_log_data(), log_index)
    }

    fn extension_log() -> Log {
        let event = SentMessageExtension1 {
            sender: address!("1111111111111111111111111111111111111111"),
            mntValue: U256::from(1_000_000),
            ethValue: U256::from(42),
        };
        wrap_log(MESSENGER, event.encode_log_data(), 1)
    }

    #[test]
    fn test_decode_full_receipt() {
        let tx_hash = b256!("1234123412341234123412341234123412341234123412341234123412341234");
        let logs = vec![extension_log(), message_passed_log(2)];

        let message = decode_logs(tx_hash, 1000, &logs, MESSENGER, PASSER).unwrap();

        assert_eq!(message.l2_block_number, 1000);
        assert_eq!(message.log_index, 2);
        assert_eq!(message.nonce, U256::from(7));
        assert_eq!(message.mnt_value, U256::from(1_000_000));
        assert_eq!(message.eth_value, U256::from(42));
        assert_eq!(message.status, MessageStatus::Unknown);
        assert!(message.sent_message.is_none());
        assert!(message.sent_message_extension.is_some());
    }

    #[test]
    fn test_missing_extension_defaults_values_to_zero() {
        let tx_hash = B256::ZERO;
        let logs = vec![message_passed_log(0)];

        let message = decode_logs(tx_hash, 5, &logs, MESSENGER, PASSER).unwrap();

        assert_eq!(message.mnt_value, U256::ZERO);
        assert_eq!(message.eth_value, U256::ZERO);
        assert!(message.sent_message_extension.is_none());
    }

    #[test]
    fn test_missing_message_passed_is_fatal() {
        let logs = vec![extension_log()];

        let result = decode_logs(B256::ZERO, 5, &logs, MESSENGER, PASSER);

        assert!(matches!(
            result,
            Err(DecodeError::MissingMessagePassed(addr)) if addr == PASSER
        ));
    }

    #[test]
    fn test_wrong_emitter_is_ignored() {
        // MessagePassed emitted from the messenger address must not match.
        let mut log = message_passed_log(0);
        log.inner.address = MESSENGER;

        let result = decode_logs(B256::ZERO, 5, &[log], MESSENGER, PASSER);

        assert!(matches!(
            result,
            Err(DecodeError::MissingMessagePassed(_))
        ));
    }

    #[test]
    fn test_withdrawal_transaction_from_message() {
        let logs = vec![extension_log(), message_passed_log(2)];
        let message = decode_logs(B256::ZERO, 5, &logs, MESSENGER, PASSER).unwrap();

        let tx = message.withdrawal_transaction();
        assert_eq!(tx.nonce, U256::from(7));
        assert_eq!(tx.mntValue, U256::from(1_000_000));
        assert_eq!(tx.ethValue, U256::from(42));
        assert_eq!(tx.gasLimit, U256::from(200_000));
        assert_eq!(tx.data, Bytes::from(vec![0xde, 0xad]));
    }

    #[test]
    fn test_first_match_wins() {
        let first = message_passed_log(3);
        let second = message_passed_log(9);

        let message = decode_logs(B256::ZERO, 5, &[first, second], MESSENGER, PASSER).unwrap();
        assert_eq!(message.log_index, 3);
    }
}
