//! Configuration for the simulated chain pair.

use fluxbridge_params::prelude::{ChannelParams, StakePoolParams};
use fluxbridge_primitives::types::Amount;
use serde::{Deserialize, Serialize};

/// The configuration values for one simulator run.
///
/// These values are not consensus-critical; they only shape the local scenario the simulator
/// drives through the in-memory endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Config {
    /// Endpoint identifier of the first simulated chain.
    pub chain_a: u32,

    /// Endpoint identifier of the second simulated chain.
    pub chain_b: u32,

    /// Delivery fee the in-memory endpoint charges per send.
    pub native_fee: Amount,

    /// Wallet balance each simulated user starts with.
    pub seed_balance: Amount,

    /// The staking pool parameters, shared by both chain sides.
    pub pool: StakePoolParams,

    /// The bridge channel parameters, shared by both chain sides.
    pub channel: ChannelParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serde_toml() {
        let config = r#"
            chain_a = 40217
            chain_b = 40274
            native_fee = 5000
            seed_balance = 10000000000000000000

            [pool]
            cooldown = { secs = 604800, nanos = 0 }
            treasury_share_bps = 30000

            [channel]
            default_fee_bps = 300
            withdraw_fallback = "queue"
        "#;

        let config = toml::from_str::<Config>(config);
        assert!(
            config.is_ok(),
            "must be able to deserialize config from toml but got: {}",
            config.unwrap_err()
        );

        let config = config.unwrap();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized = toml::from_str::<Config>(&serialized).unwrap();
        assert_eq!(
            deserialized, config,
            "must be able to serialize and deserialize config to toml"
        );
    }
}
