//! End-to-end tests: two chain-side instances wired through the in-memory transport endpoint,
//! mirroring the original two-endpoint deployment.

use std::sync::Arc;

use fluxbridge_channel::{
    actor::ChainActor,
    channel::gross_up,
    errors::ChannelError,
    node::ChainNode,
    transport::Delivery,
};
use fluxbridge_params::prelude::{ChannelParams, StakePoolParams};
use fluxbridge_primitives::{
    types::{AccountId, Amount, ChainId},
    wire::{BridgeMessage, BridgePayload, MessageOptions},
};
use fluxbridge_stake_pool::StakePoolError;
use fluxbridge_test_utils::{
    clock::ManualClock,
    endpoint::{InMemoryEndpoint, DEFAULT_NATIVE_FEE},
    generators::account,
};

// These are direct dependencies of the `fluxbridge-channel` library and so are linked into this
// integration test target, but the test itself does not reference them. Mark them used to satisfy
// the crate's `unused_crate_dependencies = "deny"` lint.
use async_trait as _;
use ethnum as _;
use serde as _;
use thiserror as _;
use tracing as _;

const ETH: Amount = 1_000_000_000_000_000_000;
const SEVEN_DAYS: u64 = 7 * 24 * 60 * 60;

const EID_A: ChainId = ChainId(1);
const EID_B: ChainId = ChainId(2);

const OWNER_A: AccountId = account(0xa0);
const BRIDGE_A: AccountId = account(0xa1);
const OWNER_B: AccountId = account(0xb0);
const BRIDGE_B: AccountId = account(0xb1);

struct Harness {
    endpoint: InMemoryEndpoint,
    clock: ManualClock,
    chain_a: ChainActor,
    chain_b: ChainActor,
}

/// Deploys both chain sides, links them as peers and wires each channel identity as its pool's
/// liquidity manager, the way the original deployment script does.
async fn harness() -> Harness {
    let endpoint = InMemoryEndpoint::new();
    let clock = ManualClock::new(1_000);

    let pool_params = StakePoolParams {
        treasury_share_bps: 0,
        ..StakePoolParams::default()
    };
    let channel_params = ChannelParams::default();

    let node_a = ChainNode::new(
        EID_A,
        OWNER_A,
        BRIDGE_A,
        pool_params,
        channel_params,
        Arc::new(endpoint.for_chain(EID_A)),
        Arc::new(clock.clone()),
    );
    let node_b = ChainNode::new(
        EID_B,
        OWNER_B,
        BRIDGE_B,
        pool_params,
        channel_params,
        Arc::new(endpoint.for_chain(EID_B)),
        Arc::new(clock.clone()),
    );

    let chain_a = ChainActor::spawn(node_a);
    let chain_b = ChainActor::spawn(node_b);

    endpoint.register(EID_A, BRIDGE_A, chain_a.mailbox());
    endpoint.register(EID_B, BRIDGE_B, chain_b.mailbox());

    chain_a.set_peer(OWNER_A, EID_B, BRIDGE_B).await.unwrap();
    chain_b.set_peer(OWNER_B, EID_A, BRIDGE_A).await.unwrap();
    chain_a
        .set_liquidity_manager(OWNER_A, BRIDGE_A)
        .await
        .unwrap();
    chain_b
        .set_liquidity_manager(OWNER_B, BRIDGE_B)
        .await
        .unwrap();

    Harness {
        endpoint,
        clock,
        chain_a,
        chain_b,
    }
}

#[tokio::test]
async fn test_bridge_send_delivers_exact_net() {
    let h = harness().await;
    let (sender, recipient, staker_b) = (account(1), account(2), account(3));

    // the remote pool needs liquidity to pay the recipient from
    h.chain_b.credit(staker_b, 2 * ETH);
    h.chain_b.stake(staker_b, 2 * ETH).await.unwrap();

    let fee = h
        .chain_a
        .quote(EID_B, MessageOptions::default())
        .await
        .unwrap();
    assert_eq!(fee, DEFAULT_NATIVE_FEE);

    let gross = gross_up(ETH, 300).unwrap();
    h.chain_a.credit(sender, 3 * ETH);
    h.chain_a
        .send_amount(
            sender,
            EID_B,
            recipient,
            ETH,
            fee,
            MessageOptions::default(),
            gross + fee,
        )
        .await
        .unwrap();

    // the recipient receives exactly the net amount
    assert_eq!(h.chain_b.balance_of(recipient).await.unwrap(), ETH);
    // the sender is debited exactly gross + native fee
    assert_eq!(
        h.chain_a.balance_of(sender).await.unwrap(),
        3 * ETH - gross - fee
    );

    // everything but the transport fee stays locked on the source chain
    let pool_a = h.chain_a.pool_snapshot().await.unwrap();
    assert_eq!(pool_a.held(), gross);
    // the remote pool paid the net out of its liquidity
    let pool_b = h.chain_b.pool_snapshot().await.unwrap();
    assert_eq!(pool_b.held(), ETH);
}

#[tokio::test]
async fn test_fee_revenue_rewards_stakers() {
    let h = harness().await;
    let (sender, recipient, staker, late_joiner) = (account(1), account(2), account(3), account(4));

    h.chain_b.credit(account(9), 4 * ETH);
    h.chain_b.stake(account(9), 4 * ETH).await.unwrap();

    h.chain_a.credit(staker, ETH);
    h.chain_a.stake(staker, ETH).await.unwrap();

    let gross = gross_up(ETH, 300).unwrap();
    let admin_fee = gross - ETH;
    let fee = DEFAULT_NATIVE_FEE;

    h.chain_a.credit(sender, 4 * ETH);
    h.chain_a
        .send_amount(
            sender,
            EID_B,
            recipient,
            ETH,
            fee,
            MessageOptions::default(),
            gross + fee,
        )
        .await
        .unwrap();

    // the sole staker earns the entire admin fee
    assert_eq!(h.chain_a.claim_reward(staker).await.unwrap(), admin_fee);

    // a late joiner with 3 ETH splits the next fee 1:3
    h.chain_a.credit(late_joiner, 3 * ETH);
    h.chain_a.stake(late_joiner, 3 * ETH).await.unwrap();

    h.chain_a
        .send_amount(
            sender,
            EID_B,
            recipient,
            ETH,
            fee,
            MessageOptions::default(),
            gross + fee,
        )
        .await
        .unwrap();

    assert_eq!(
        h.chain_a.claim_reward(staker).await.unwrap(),
        admin_fee / 4
    );
    assert_eq!(
        h.chain_a.claim_reward(late_joiner).await.unwrap(),
        3 * (admin_fee / 4)
    );
}

#[tokio::test]
async fn test_withdraw_by_bridge_pays_remotely() {
    let h = harness().await;
    let (staker, recipient, staker_b) = (account(1), account(2), account(3));

    h.chain_b.credit(staker_b, 2 * ETH);
    h.chain_b.stake(staker_b, 2 * ETH).await.unwrap();

    h.chain_a.credit(staker, ETH + DEFAULT_NATIVE_FEE);
    h.chain_a.stake(staker, ETH).await.unwrap();
    h.chain_a.unstake(staker, ETH).await.unwrap();

    // before the cooldown clears the bridge path refuses too
    let early = h
        .chain_a
        .withdraw_by_bridge(
            staker,
            0,
            EID_B,
            recipient,
            MessageOptions::default(),
            DEFAULT_NATIVE_FEE,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        early,
        ChannelError::Pool(StakePoolError::CooldownNotElapsed { .. })
    ));

    h.clock.advance(SEVEN_DAYS);
    h.chain_a
        .withdraw_by_bridge(
            staker,
            0,
            EID_B,
            recipient,
            MessageOptions::default(),
            DEFAULT_NATIVE_FEE,
        )
        .await
        .unwrap();

    // the principal arrives on the remote chain
    assert_eq!(h.chain_b.balance_of(recipient).await.unwrap(), ETH);
    // and stays locked on the source chain
    let pool_a = h.chain_a.pool_snapshot().await.unwrap();
    assert_eq!(pool_a.held(), ETH);

    // the request is consumed for good
    let again = h
        .chain_a
        .withdraw_by_bridge(
            staker,
            0,
            EID_B,
            recipient,
            MessageOptions::default(),
            DEFAULT_NATIVE_FEE,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        again,
        ChannelError::Pool(StakePoolError::AlreadyWithdrawn(0))
    ));
}

#[tokio::test]
async fn test_redelivery_applies_once() {
    let h = harness().await;
    let (sender, recipient, staker_b) = (account(1), account(2), account(3));

    h.chain_b.credit(staker_b, 4 * ETH);
    h.chain_b.stake(staker_b, 4 * ETH).await.unwrap();

    let gross = gross_up(ETH, 300).unwrap();
    h.chain_a.credit(sender, 2 * ETH);
    h.chain_a
        .send_amount(
            sender,
            EID_B,
            recipient,
            ETH,
            DEFAULT_NATIVE_FEE,
            MessageOptions::default(),
            gross + DEFAULT_NATIVE_FEE,
        )
        .await
        .unwrap();

    assert_eq!(h.chain_b.balance_of(recipient).await.unwrap(), ETH);

    // the transport redelivers; the effect must not double
    assert!(h.endpoint.replay_last());
    assert_eq!(h.chain_b.balance_of(recipient).await.unwrap(), ETH);

    let pool_b = h.chain_b.pool_snapshot().await.unwrap();
    assert_eq!(pool_b.held(), 3 * ETH);
}

#[tokio::test]
async fn test_unauthorized_peer_has_zero_effect() {
    let h = harness().await;
    let (recipient, staker_b) = (account(2), account(3));

    h.chain_b.credit(staker_b, 2 * ETH);
    h.chain_b.stake(staker_b, 2 * ETH).await.unwrap();

    let payload = BridgeMessage {
        dest_chain: EID_B,
        payload: BridgePayload::Transfer {
            recipient,
            amount: ETH,
        },
        sender_nonce: 0,
    }
    .encode();

    // forged sender identity: bypasses the endpoint and lands in the mailbox directly
    h.chain_b.mailbox().deliver(Delivery {
        src_chain: EID_A,
        proven_peer: account(0x66),
        payload: payload.clone(),
    });
    // claimed source chain with no registered link
    h.chain_b.mailbox().deliver(Delivery {
        src_chain: ChainId(9),
        proven_peer: BRIDGE_A,
        payload,
    });

    assert_eq!(h.chain_b.balance_of(recipient).await.unwrap(), 0);
    let pool_b = h.chain_b.pool_snapshot().await.unwrap();
    assert_eq!(pool_b.held(), 2 * ETH);
}

#[tokio::test]
async fn test_underfunded_inbound_queues_until_liquidity() {
    let h = harness().await;
    let (sender, recipient, staker_b) = (account(1), account(2), account(3));

    // the remote pool holds nothing: the payment must park, not drop
    let gross = gross_up(ETH, 300).unwrap();
    h.chain_a.credit(sender, 2 * ETH);
    h.chain_a
        .send_amount(
            sender,
            EID_B,
            recipient,
            ETH,
            DEFAULT_NATIVE_FEE,
            MessageOptions::default(),
            gross + DEFAULT_NATIVE_FEE,
        )
        .await
        .unwrap();

    assert_eq!(h.chain_b.balance_of(recipient).await.unwrap(), 0);

    // liquidity arriving on the remote side clears the queue
    h.chain_b.credit(staker_b, 2 * ETH);
    h.chain_b.stake(staker_b, 2 * ETH).await.unwrap();

    assert_eq!(h.chain_b.balance_of(recipient).await.unwrap(), ETH);
    let pool_b = h.chain_b.pool_snapshot().await.unwrap();
    assert_eq!(pool_b.held(), ETH);
}

#[tokio::test]
async fn test_quote_requires_registered_peer() {
    let h = harness().await;

    let err = h
        .chain_a
        .quote(ChainId(9), MessageOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ChannelError::UnknownPeer(ChainId(9))));
}

#[tokio::test]
async fn test_local_withdraw_cooldown_over_actor() {
    let h = harness().await;
    let staker = account(1);

    h.chain_a.credit(staker, ETH);
    h.chain_a.stake(staker, ETH).await.unwrap();
    h.chain_a.unstake(staker, ETH).await.unwrap();

    let err = h.chain_a.withdraw(staker, 0).await.unwrap_err();
    assert!(matches!(
        err,
        ChannelError::Pool(StakePoolError::CooldownNotElapsed { .. })
    ));

    h.clock.advance(SEVEN_DAYS);
    assert_eq!(h.chain_a.withdraw(staker, 0).await.unwrap(), ETH);
    assert_eq!(h.chain_a.balance_of(staker).await.unwrap(), ETH);
}
