//! # Fluxbridge Channel
//!
//! The chain-side half of the cross-chain settlement protocol. A [`channel::BridgeChannel`]
//! knows the registered peer contract on each remote chain, prices outbound transfers (fee
//! gross-up plus the transport's delivery quote) and validates the proven sender of inbound
//! deliveries. Accepted instructions are applied exactly once by the
//! [`settlement::SettlementCoordinator`].
//!
//! The [`node::ChainNode`] composes the channel with the staking pool into one chain-side
//! instance, and [`actor::ChainActor`] runs that instance as a tokio task so the two sides of a
//! bridge are independently schedulable and interact only through the transport.

pub mod actor;
pub mod channel;
pub mod errors;
pub mod node;
pub mod peers;
pub mod settlement;
pub mod transport;

pub use errors::ChannelError;

// Only the integration tests under `tests/` exercise the shared test helpers, so the lib test
// target sees the dev-dependency as unused. Mark it used to satisfy `unused_crate_dependencies`.
#[cfg(test)]
use fluxbridge_test_utils as _;
