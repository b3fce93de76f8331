//! An in-memory transport endpoint that routes payloads between in-process chain actors.
//!
//! Plays the role the endpoint mock plays in the original deployment's test harness: each chain
//! registers its channel identity and mailbox, sends are priced from a configurable fee table
//! and delivered straight into the destination actor's mailbox. The endpoint proves the sender
//! identity itself, so a forged delivery can only be produced by bypassing it.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use fluxbridge_channel::{
    actor::ChainMailbox,
    transport::{Delivery, Transport, TransportError},
};
use fluxbridge_primitives::{
    types::{AccountId, Amount, ChainId},
    wire::{DeliveryReceipt, MessageOptions},
};
use parking_lot::RwLock;
use tracing::debug;

/// Delivery fee charged when none has been configured for the destination.
pub const DEFAULT_NATIVE_FEE: Amount = 5_000;

#[derive(Debug)]
struct Route {
    identity: AccountId,
    mailbox: ChainMailbox,
}

#[derive(Debug, Default)]
struct EndpointInner {
    routes: BTreeMap<ChainId, Route>,
    fees: BTreeMap<ChainId, Amount>,
    sends: u64,
    last_delivery: Option<(ChainId, Delivery)>,
}

/// The shared in-memory endpoint. Clones refer to the same routing state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEndpoint {
    inner: Arc<RwLock<EndpointInner>>,
}

impl InMemoryEndpoint {
    /// Creates an endpoint with no routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `chain`'s channel identity and mailbox so payloads can be delivered to it.
    pub fn register(&self, chain: ChainId, identity: AccountId, mailbox: ChainMailbox) {
        let mut inner = self.inner.write();
        inner.routes.insert(chain, Route { identity, mailbox });

        debug!(%chain, %identity, "chain registered with in-memory endpoint");
    }

    /// Sets the delivery fee charged for sends towards `dest`.
    pub fn set_fee(&self, dest: ChainId, fee: Amount) {
        self.inner.write().fees.insert(dest, fee);
    }

    /// A [`Transport`] handle bound to `chain` as the sending side.
    pub fn for_chain(&self, chain: ChainId) -> EndpointHandle {
        EndpointHandle {
            src: chain,
            endpoint: self.clone(),
        }
    }

    /// Redelivers the most recent delivery, exercising the transport's at-least-once
    /// semantics. Returns `false` if nothing has been delivered yet.
    pub fn replay_last(&self) -> bool {
        let inner = self.inner.read();
        let Some((dest, delivery)) = inner.last_delivery.clone() else {
            return false;
        };

        match inner.routes.get(&dest) {
            Some(route) => {
                debug!(%dest, "replaying last delivery");
                route.mailbox.deliver(delivery);
                true
            }
            None => false,
        }
    }

    /// Number of sends the endpoint has accepted.
    pub fn sends(&self) -> u64 {
        self.inner.read().sends
    }
}

/// One chain's handle to the shared endpoint.
#[derive(Debug, Clone)]
pub struct EndpointHandle {
    src: ChainId,
    endpoint: InMemoryEndpoint,
}

#[async_trait]
impl Transport for EndpointHandle {
    async fn quote(
        &self,
        dest: ChainId,
        _payload_len: usize,
        _options: &MessageOptions,
    ) -> Result<Amount, TransportError> {
        let inner = self.endpoint.inner.read();
        if !inner.routes.contains_key(&dest) {
            return Err(TransportError::Unroutable(dest));
        }

        Ok(inner.fees.get(&dest).copied().unwrap_or(DEFAULT_NATIVE_FEE))
    }

    async fn send(
        &self,
        dest: ChainId,
        payload: Vec<u8>,
        _options: MessageOptions,
        attached_fee: Amount,
    ) -> Result<DeliveryReceipt, TransportError> {
        let mut inner = self.endpoint.inner.write();
        let inner = &mut *inner;

        let fee = inner.fees.get(&dest).copied().unwrap_or(DEFAULT_NATIVE_FEE);
        if attached_fee < fee {
            return Err(TransportError::Rejected(format!(
                "attached fee {attached_fee} below required {fee}"
            )));
        }

        let proven_peer = inner
            .routes
            .get(&self.src)
            .ok_or(TransportError::Unroutable(self.src))?
            .identity;
        let route = inner
            .routes
            .get(&dest)
            .ok_or(TransportError::Unroutable(dest))?;

        inner.sends += 1;
        let receipt = DeliveryReceipt::compute(self.src, dest, inner.sends, &payload);

        let delivery = Delivery {
            src_chain: self.src,
            proven_peer,
            payload,
        };
        route.mailbox.deliver(delivery.clone());
        inner.last_delivery = Some((dest, delivery));

        debug!(src = %self.src, %dest, %receipt, "payload delivered");

        Ok(receipt)
    }
}
