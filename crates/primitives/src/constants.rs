//! Protocol constants that are inherent to the fee and reward math.
//!
//! These values are integral to the accounting i.e., changing them changes how both chain-side
//! instances interpret fee rates and accumulator values, so they must match everywhere.

use crate::types::Amount;

/// Fixed-point scale factor for the reward-per-share accumulator.
///
/// Bounds the truncation error of a reward settlement to less than `1 / total_staked`
/// reward-units per call.
pub const SCALE: Amount = 1_000_000_000_000_000_000;

/// Denominator for fee rates expressed in parts per 100 000.
pub const BPS_DENOM: Amount = 100_000;
