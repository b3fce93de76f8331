//! Errors that can occur in the staking pool.

use fluxbridge_primitives::types::{Amount, Timestamp};
use thiserror::Error;

/// Ways a staking pool operation can fail. A failed operation performs no mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StakePoolError {
    /// A zero amount was passed where a positive one is required.
    #[error("amount must be greater than zero")]
    InvalidAmount,

    /// The caller asked for more than is available to them.
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        /// The amount the caller asked for.
        requested: Amount,

        /// The amount actually available.
        available: Amount,
    },

    /// The unstake request has not finished its cooldown yet.
    #[error("cooldown not elapsed: request matures at {matures_at}, now {now}")]
    CooldownNotElapsed {
        /// First timestamp at which the request becomes withdrawable.
        matures_at: Timestamp,

        /// The timestamp the failing call was made at.
        now: Timestamp,
    },

    /// The unstake request was already consumed.
    #[error("unstake request {0} already withdrawn")]
    AlreadyWithdrawn(usize),

    /// No unstake request exists at the given index for the caller.
    #[error("no unstake request at index {0}")]
    NoSuchRequest(usize),

    /// The pool's held value cannot cover the payout, e.g. because the liquidity authority swept
    /// funds out.
    #[error("pooled liquidity cannot cover payout: requested {requested}, held {held}")]
    LiquidityUnavailable {
        /// The payout that was requested.
        requested: Amount,

        /// The value the pool currently holds.
        held: Amount,
    },

    /// The caller does not hold the role the operation requires.
    #[error("caller is not authorized for this operation")]
    Unauthorized,

    /// A claim settled to a zero payout.
    #[error("nothing to claim")]
    NothingToClaim,
}
