//! Wire format for the payloads the two chain-side channels exchange through the transport.
//!
//! The encoding is borsh so both sides agree on the exact bytes; the transport itself treats the
//! payload as opaque.

use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::types::{AccountId, Amount, ChainId, Nonce};

/// The instruction a bridge message carries, dispatched by kind on the receiving side.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
pub enum BridgePayload {
    /// Pass-through payment of `amount` to `recipient` on the destination chain.
    Transfer {
        /// Who gets paid on the destination chain.
        recipient: AccountId,

        /// The net amount the recipient must receive.
        amount: Amount,
    },

    /// Cooldown-cleared unstake principal to be paid out on the destination chain instead of
    /// locally.
    WithdrawRequest {
        /// Who gets paid on the destination chain.
        recipient: AccountId,

        /// The principal of the consumed unstake request.
        amount: Amount,
    },
}

impl BridgePayload {
    /// The account the payload pays out to.
    pub const fn recipient(&self) -> AccountId {
        match self {
            BridgePayload::Transfer { recipient, .. }
            | BridgePayload::WithdrawRequest { recipient, .. } => *recipient,
        }
    }

    /// The amount the payload pays out.
    pub const fn amount(&self) -> Amount {
        match self {
            BridgePayload::Transfer { amount, .. }
            | BridgePayload::WithdrawRequest { amount, .. } => *amount,
        }
    }

    /// Short label for logging.
    pub const fn kind(&self) -> &'static str {
        match self {
            BridgePayload::Transfer { .. } => "transfer",
            BridgePayload::WithdrawRequest { .. } => "withdraw_request",
        }
    }
}

/// A fully constructed outbound message. Never mutated after send.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct BridgeMessage {
    /// The chain this message is addressed to.
    pub dest_chain: ChainId,

    /// The instruction to apply on the destination chain.
    pub payload: BridgePayload,

    /// Sequence number assigned by the sending channel; dedup key component on the receiving
    /// side.
    pub sender_nonce: Nonce,
}

impl BridgeMessage {
    /// Serializes the message to its wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        borsh::to_vec(self).expect("must be able to borsh-serialize a wire message")
    }

    /// Parses a message from wire bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        Ok(borsh::from_slice(bytes)?)
    }
}

/// Execution options forwarded to the transport, sized after the original's executor options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageOptions {
    /// Gas the executor should attach to the delivery call on the destination chain.
    pub exec_gas_limit: u64,
}

impl Default for MessageOptions {
    fn default() -> Self {
        Self {
            exec_gas_limit: 200_000,
        }
    }
}

/// Identifier the transport hands back for an accepted outbound send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// Globally unique identifier of the send.
    pub guid: [u8; 32],
}

impl DeliveryReceipt {
    /// Computes the canonical receipt identifier for a send.
    pub fn compute(src: ChainId, dest: ChainId, seq: u64, payload: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(src.0.to_be_bytes());
        hasher.update(dest.0.to_be_bytes());
        hasher.update(seq.to_be_bytes());
        hasher.update(payload);

        Self {
            guid: hasher.finalize().into(),
        }
    }
}

impl fmt::Display for DeliveryReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.guid))
    }
}

/// Ways the wire bytes of an inbound message can be unusable.
#[derive(Debug, Error)]
pub enum WireError {
    /// The payload bytes do not decode to a known bridge message.
    #[error("malformed bridge message: {0}")]
    Malformed(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_layout_is_stable() {
        let msg = BridgeMessage {
            dest_chain: ChainId(2),
            payload: BridgePayload::Transfer {
                recipient: AccountId::new([7u8; 32]),
                amount: 1_000_000_000_000_000_000,
            },
            sender_nonce: 42,
        };

        let bytes = msg.encode();
        // dest u32 + payload tag u8 + recipient 32 + amount u128 + nonce u64
        assert_eq!(bytes.len(), 4 + 1 + 32 + 16 + 8);

        let decoded = BridgeMessage::decode(&bytes).expect("canonical bytes must decode");
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_garbage_does_not_decode() {
        assert!(BridgeMessage::decode(&[0xff; 9]).is_err());
        assert!(BridgeMessage::decode(&[]).is_err());
    }
}
