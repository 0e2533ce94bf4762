//! L2→L1 message decoding.
//!
//! Turns an L2 withdrawal receipt into a [`types::Message`] by scanning its
//! logs for the messenger and message-passer events.

pub mod decode;
pub mod types;

pub use decode::{decode_receipt, DecodeError};
pub use types::{Direction, Message, MessageStatus};
