//! Parameters for the bridge channel such as the default admin-fee rate and the fallback
//! behavior for underfunded inbound withdrawals.

use serde::{Deserialize, Serialize};

use super::default::FEE_BPS;

/// The bridge channel public parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelParams {
    /// The admin-fee rate a new peer link starts out with, in parts per 100 000.
    ///
    /// The rate can be changed per link by the owner afterwards.
    pub default_fee_bps: u32,

    /// What to do with an inbound withdrawal instruction when pooled liquidity cannot cover it.
    pub withdraw_fallback: WithdrawFallback,
}

impl Default for ChannelParams {
    fn default() -> Self {
        Self {
            default_fee_bps: FEE_BPS,
            withdraw_fallback: WithdrawFallback::Queue,
        }
    }
}

/// Fallback behavior for an inbound payment the pool cannot cover at delivery time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawFallback {
    /// Park the payment in a FIFO queue and retry whenever liquidity arrives.
    Queue,

    /// Drop the message terminally. The message is still recorded as applied so a transport
    /// redelivery cannot resurrect it.
    Reject,
}
