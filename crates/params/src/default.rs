//! Default values for the staking pool and the bridge channel.

use std::time::Duration;

/// Default cooldown between an unstake request and the moment its principal becomes withdrawable.
pub(crate) const COOLDOWN: Duration = Duration::from_secs(7 * 24 * 60 * 60); // 7 days

/// Default share of realized fee revenue retained for the treasury, in parts per 100 000.
///
/// The remainder is distributed to stakers through the reward accumulator.
pub(crate) const TREASURY_SHARE_BPS: u32 = 30_000;

/// Default admin-fee rate applied to outbound transfers, in parts per 100 000.
pub(crate) const FEE_BPS: u32 = 300;
