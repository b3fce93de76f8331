//! Errors that can occur in the bridge channel and the settlement layer.

use fluxbridge_primitives::{
    types::{AccountId, Amount, ChainId},
    wire::WireError,
};
use fluxbridge_stake_pool::StakePoolError;
use thiserror::Error;

use crate::transport::TransportError;

/// Unified error type for everything that can fail in a chain-side instance. A failed call
/// performs no mutation.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// No peer link is registered for the chain.
    #[error("no peer registered for chain {0}")]
    UnknownPeer(ChainId),

    /// The transport-proven sender does not match the registered peer for the claimed source
    /// chain. Terminal for the message.
    #[error("delivery from {peer} does not match the registered peer for chain {chain}")]
    UnauthorizedPeer {
        /// The source chain the message claims.
        chain: ChainId,

        /// The sender identity the transport proved.
        peer: AccountId,
    },

    /// The fee rate would consume the entire gross amount (or more).
    #[error("fee rate {0} must be below 100000 parts per 100000")]
    FeeRateInvalid(u32),

    /// The caller attached less value than the operation requires.
    #[error("attached value {attached} is less than the required {required}")]
    InsufficientValue {
        /// The value the operation requires.
        required: Amount,

        /// The value the caller attached.
        attached: Amount,
    },

    /// The caller is not the channel owner.
    #[error("caller is not authorized for this operation")]
    Unauthorized,

    /// The staking pool refused the operation.
    #[error("staking pool rejected the operation: {0}")]
    Pool(#[from] StakePoolError),

    /// The transport endpoint refused the quote or send.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// The inbound payload bytes are not a valid bridge message.
    #[error("undecodable inbound payload: {0}")]
    Wire(#[from] WireError),

    /// The chain actor can no longer process calls.
    #[error("chain actor unavailable: {0}")]
    Actor(String),
}
