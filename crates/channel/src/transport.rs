//! The boundary to the external message-transport endpoint.
//!
//! The endpoint is a trusted oracle: it meters its own delivery fee, moves payloads between
//! registered peers and authenticates the sender identity of inbound payloads. Delivery is
//! at-least-once as far as the channel is concerned; replay protection lives in the settlement
//! layer.

use async_trait::async_trait;
use fluxbridge_primitives::{
    types::{AccountId, Amount, ChainId},
    wire::{DeliveryReceipt, MessageOptions},
};
use thiserror::Error;

/// Ways the transport endpoint can refuse a quote or a send.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The endpoint has no route to the destination chain.
    #[error("no endpoint registered for chain {0}")]
    Unroutable(ChainId),

    /// The endpoint rejected the request.
    #[error("endpoint rejected the request: {0}")]
    Rejected(String),
}

/// An inbound payload as the transport hands it to the application layer.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// The chain the payload originates from, as proven by the transport.
    pub src_chain: ChainId,

    /// The sender identity on the source chain, as proven by the transport.
    pub proven_peer: AccountId,

    /// The opaque payload bytes.
    pub payload: Vec<u8>,
}

/// One chain's handle to the external transport endpoint.
///
/// An outbound send is fire-and-forget: the returned receipt acknowledges acceptance, not
/// delivery.
#[async_trait]
pub trait Transport: std::fmt::Debug + Send + Sync {
    /// Asks the endpoint for its delivery-fee estimate for a payload of `payload_len` bytes to
    /// `dest`.
    async fn quote(
        &self,
        dest: ChainId,
        payload_len: usize,
        options: &MessageOptions,
    ) -> Result<Amount, TransportError>;

    /// Hands a payload to the endpoint for delivery to the registered peer on `dest`,
    /// attaching `attached_fee` of native value as the delivery fee.
    async fn send(
        &self,
        dest: ChainId,
        payload: Vec<u8>,
        options: MessageOptions,
        attached_fee: Amount,
    ) -> Result<DeliveryReceipt, TransportError>;
}
