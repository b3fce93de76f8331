//! Dev simulator for the bridge: runs both chain-side instances in one process, wired through
//! the in-memory transport endpoint, and drives the canonical stake/send/claim choreography
//! against them.

use std::{fs, path::Path, sync::Arc};

use clap::Parser;
use fluxbridge_channel::{
    actor::ChainActor,
    channel::gross_up,
    node::{ChainNode, SystemClock},
};
use fluxbridge_common::logging::{self, LoggerConfig};
use fluxbridge_primitives::{types::ChainId, wire::MessageOptions};
use fluxbridge_test_utils::{endpoint::InMemoryEndpoint, generators::generate_account};
use serde::de::DeserializeOwned;
use tokio::runtime;
use tracing::{debug, info, trace, warn};

use crate::config::Config;

mod args;
mod config;

fn main() {
    logging::init(LoggerConfig::with_base_name("fluxbridge-node"));

    let cli = args::Cli::parse();
    let config = parse_toml::<Config>(cli.config);

    let runtime = runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("must be able to create runtime");

    runtime.block_on(simulate(config));

    info!("simulation complete");
}

/// Deploys both chain sides, links them and walks through stake, bridge send, reward claim and
/// an unstake that runs into its cooldown.
async fn simulate(config: Config) {
    let eid_a = ChainId(config.chain_a);
    let eid_b = ChainId(config.chain_b);

    let endpoint = InMemoryEndpoint::new();
    endpoint.set_fee(eid_a, config.native_fee);
    endpoint.set_fee(eid_b, config.native_fee);

    let owner_a = generate_account();
    let owner_b = generate_account();
    let bridge_a = generate_account();
    let bridge_b = generate_account();

    let chain_a = ChainActor::spawn(ChainNode::new(
        eid_a,
        owner_a,
        bridge_a,
        config.pool,
        config.channel,
        Arc::new(endpoint.for_chain(eid_a)),
        Arc::new(SystemClock),
    ));
    let chain_b = ChainActor::spawn(ChainNode::new(
        eid_b,
        owner_b,
        bridge_b,
        config.pool,
        config.channel,
        Arc::new(endpoint.for_chain(eid_b)),
        Arc::new(SystemClock),
    ));

    endpoint.register(eid_a, bridge_a, chain_a.mailbox());
    endpoint.register(eid_b, bridge_b, chain_b.mailbox());

    // link the two sides and authorize each channel to move its pool's liquidity
    chain_a
        .set_peer(owner_a, eid_b, bridge_b)
        .await
        .expect("must be able to register peer");
    chain_b
        .set_peer(owner_b, eid_a, bridge_a)
        .await
        .expect("must be able to register peer");
    chain_a
        .set_liquidity_manager(owner_a, bridge_a)
        .await
        .expect("must be able to wire liquidity manager");
    chain_b
        .set_liquidity_manager(owner_b, bridge_b)
        .await
        .expect("must be able to wire liquidity manager");
    info!(%eid_a, %eid_b, "chains linked");

    let user_a = generate_account();
    let user_b = generate_account();
    let recipient = generate_account();
    chain_a.credit(user_a, config.seed_balance);
    chain_b.credit(user_b, config.seed_balance);

    // both sides stake so each pool holds payout liquidity and earns fees
    let stake = config.seed_balance / 4;
    chain_a
        .stake(user_a, stake)
        .await
        .expect("must be able to stake");
    chain_b
        .stake(user_b, stake)
        .await
        .expect("must be able to stake");
    info!(%stake, "both sides staked");

    // bridge a transfer from A to B
    let net = config.seed_balance / 8;
    let options = MessageOptions::default();
    let native_fee = chain_a
        .quote(eid_b, options)
        .await
        .expect("must be able to quote");
    let fee_bps = config.channel.default_fee_bps;
    let value = gross_up(net, fee_bps).expect("configured fee rate must be valid") + native_fee;

    let receipt = chain_a
        .send_amount(user_a, eid_b, recipient, net, native_fee, options, value)
        .await
        .expect("must be able to send");
    info!(%net, %native_fee, %receipt, "transfer sent from A to B");

    let received = chain_b
        .balance_of(recipient)
        .await
        .expect("must be able to read balance");
    info!(%received, "recipient credited on B");

    // the admin fee became staker revenue on A
    match chain_a.claim_reward(user_a).await {
        Ok(reward) => info!(%reward, "staker reward claimed on A"),
        Err(err) => warn!(%err, "no staker reward on A"),
    }
    match chain_a.collect_treasury(owner_a).await {
        Ok(collected) => info!(%collected, "treasury collected on A"),
        Err(err) => debug!(%err, "no treasury accrued on A"),
    }

    // an unstake starts its cooldown; the principal is not withdrawable yet
    chain_b
        .unstake(user_b, stake)
        .await
        .expect("must be able to unstake");
    match chain_b.withdraw(user_b, 0).await {
        Ok(amount) => warn!(%amount, "withdrawal cleared without cooldown"),
        Err(err) => info!(%err, "withdrawal gated by cooldown as expected"),
    }

    chain_a
        .shutdown()
        .await
        .expect("chain actor must shut down cleanly");
    chain_b
        .shutdown()
        .await
        .expect("chain actor must shut down cleanly");
}

/// Reads and parses a TOML file from the given path into the given type `T`.
///
/// # Panics
///
/// 1. If the file is not readable.
/// 2. If the contents of the file cannot be deserialized into the given type `T`.
fn parse_toml<T>(path: impl AsRef<Path>) -> T
where
    T: std::fmt::Debug + DeserializeOwned,
{
    fs::read_to_string(path)
        .map(|p| {
            trace!(?p, "read file");

            let parsed = toml::from_str::<T>(&p).unwrap_or_else(|e| {
                panic!("failed to parse TOML file: {e:?}");
            });
            debug!(?parsed, "parsed TOML file");

            parsed
        })
        .unwrap_or_else(|_| {
            panic!("failed to read TOML file");
        })
}
