//! Parameters for the staking pool such as the unstake cooldown and the treasury share of fee
//! revenue.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::default::{COOLDOWN, TREASURY_SHARE_BPS};

/// The staking pool public parameters that must match on both chain-side instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakePoolParams {
    /// The cooldown between an unstake request and the moment its principal becomes
    /// withdrawable.
    pub cooldown: Duration,

    /// The share of realized fee revenue retained for the treasury, in parts per 100 000.
    ///
    /// The remainder is distributed to stakers pro rata. A value of `0` sends all revenue to
    /// stakers.
    pub treasury_share_bps: u32,
}

impl StakePoolParams {
    /// The cooldown expressed in seconds, the unit the ledger's timestamps use.
    pub const fn cooldown_secs(&self) -> u64 {
        self.cooldown.as_secs()
    }
}

impl Default for StakePoolParams {
    fn default() -> Self {
        Self {
            cooldown: COOLDOWN,
            treasury_share_bps: TREASURY_SHARE_BPS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stake_pool_params_serde() {
        let params = StakePoolParams::default();
        let serialized = toml::to_string(&params).unwrap();

        let deserialized: StakePoolParams = toml::from_str(&serialized).unwrap();

        assert_eq!(params, deserialized);

        let params_toml = r#"
            cooldown = { secs = 604800, nanos = 0 }
            treasury_share_bps = 30000
        "#;
        assert!(
            toml::from_str::<StakePoolParams>(params_toml).is_ok(),
            "must be able to deserialize StakePoolParams from a toml"
        );
    }
}
