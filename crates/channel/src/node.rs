//! One chain-side instance: the staking pool, the bridge channel and the settlement coordinator
//! composed behind a single entry point.
//!
//! All ledger mutations go through this type sequentially, so no call ever observes a
//! half-updated pool/accumulator pair. The only concurrency is the transport: sends are
//! fire-and-forget and deliveries arrive whenever the remote side emitted them.

use std::{collections::BTreeMap, fmt, sync::Arc, time::SystemTime};

use fluxbridge_params::prelude::{ChannelParams, StakePoolParams};
use fluxbridge_primitives::{
    types::{AccountId, Amount, ChainId, MessageKey, Timestamp},
    wire::{BridgeMessage, BridgePayload, DeliveryReceipt, MessageOptions},
};
use fluxbridge_stake_pool::{Payout, StakePool};
use tracing::{debug, info, warn};

use crate::{
    channel::BridgeChannel,
    errors::ChannelError,
    settlement::{SettlementCoordinator, SettlementOutcome},
    transport::{Delivery, Transport},
};

/// Source of the ledger's notion of now.
pub trait Clock: fmt::Debug + Send + Sync {
    /// Current unix time in seconds.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0)
    }
}

/// One chain-side instance of the protocol.
#[derive(Debug)]
pub struct ChainNode {
    chain_id: ChainId,

    /// The identity this instance's channel has on its own chain; remote peers register it, and
    /// the pool authorizes it as liquidity manager for settlement payouts.
    channel_identity: AccountId,

    pool: StakePool,
    channel: BridgeChannel,
    settlement: SettlementCoordinator,

    /// Modeled external wallets on this chain, observed by tests and the dev binary.
    balances: BTreeMap<AccountId, Amount>,

    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
}

impl ChainNode {
    /// Creates a chain-side instance owned by `owner`.
    pub fn new(
        chain_id: ChainId,
        owner: AccountId,
        channel_identity: AccountId,
        pool_params: StakePoolParams,
        channel_params: ChannelParams,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            chain_id,
            channel_identity,
            pool: StakePool::new(owner, pool_params),
            channel: BridgeChannel::new(chain_id, owner, channel_params),
            settlement: SettlementCoordinator::new(channel_params.withdraw_fallback),
            balances: BTreeMap::new(),
            transport,
            clock,
        }
    }

    // ------------------------------------------------------------------
    // wallet plumbing
    // ------------------------------------------------------------------

    /// Credits `amount` to `account`'s wallet. Used to seed balances and execute payouts.
    pub fn credit(&mut self, account: AccountId, amount: Amount) {
        *self.balances.entry(account).or_insert(0) += amount;
    }

    /// The wallet balance of `account`.
    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn require_balance(&self, caller: AccountId, required: Amount) -> Result<(), ChannelError> {
        let attached = self.balance_of(&caller);
        if attached < required {
            return Err(ChannelError::InsufficientValue { required, attached });
        }

        Ok(())
    }

    fn debit(&mut self, caller: AccountId, amount: Amount) {
        let balance = self
            .balances
            .get_mut(&caller)
            .expect("balance must have been checked before debiting");
        debug_assert!(*balance >= amount);
        *balance -= amount;
    }

    fn execute(&mut self, payout: Payout) {
        self.credit(payout.to, payout.amount);
    }

    /// Retries queued settlement payments; called after every liquidity-increasing operation.
    fn drain_pending(&mut self) {
        let payouts = self
            .settlement
            .process_pending(&mut self.pool, self.channel_identity);
        for payout in payouts {
            self.execute(payout);
        }
    }

    // ------------------------------------------------------------------
    // user-facing ledger calls
    // ------------------------------------------------------------------

    /// Stakes `value` from the caller's wallet into the pool.
    pub fn stake(&mut self, caller: AccountId, value: Amount) -> Result<(), ChannelError> {
        self.require_balance(caller, value)?;
        self.pool.stake(caller, value)?;
        self.debit(caller, value);

        self.drain_pending();

        Ok(())
    }

    /// Starts the cooldown on `amount` of the caller's stake.
    pub fn unstake(&mut self, caller: AccountId, amount: Amount) -> Result<(), ChannelError> {
        let now = self.clock.now();
        self.pool.unstake(caller, amount, now)?;

        Ok(())
    }

    /// Pays out the cooldown-cleared unstake request at `index` to the caller's wallet.
    pub fn withdraw(&mut self, caller: AccountId, index: usize) -> Result<Amount, ChannelError> {
        let now = self.clock.now();
        let payout = self.pool.withdraw(caller, index, now)?;
        let amount = payout.amount;
        self.execute(payout);

        Ok(amount)
    }

    /// Settles and pays out the caller's accumulated reward.
    pub fn claim_reward(&mut self, caller: AccountId) -> Result<Amount, ChannelError> {
        let payout = self.pool.claim_reward(caller)?;
        let amount = payout.amount;
        self.execute(payout);

        Ok(amount)
    }

    /// Pays out the accrued treasury balance. Owner-only.
    pub fn collect_treasury(&mut self, caller: AccountId) -> Result<Amount, ChannelError> {
        let payout = self.pool.collect_treasury(caller)?;
        let amount = payout.amount;
        self.execute(payout);

        Ok(amount)
    }

    // ------------------------------------------------------------------
    // administrative calls
    // ------------------------------------------------------------------

    /// Replaces the pool's single authorized liquidity mover. Owner-only.
    pub fn set_liquidity_manager(
        &mut self,
        caller: AccountId,
        principal: AccountId,
    ) -> Result<(), ChannelError> {
        self.pool.set_liquidity_manager(caller, principal)?;

        Ok(())
    }

    /// Moves pooled value to a wallet. Liquidity-manager-only.
    pub fn transfer_liquidity(
        &mut self,
        caller: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<(), ChannelError> {
        let payout = self.pool.transfer_liquidity(caller, to, amount)?;
        self.execute(payout);

        Ok(())
    }

    /// Registers or re-keys the remote peer for `chain`. Owner-only.
    pub fn set_peer(
        &mut self,
        caller: AccountId,
        chain: ChainId,
        remote: AccountId,
    ) -> Result<(), ChannelError> {
        self.channel.set_peer(caller, chain, remote)
    }

    /// Updates the admin-fee rate towards `chain`. Owner-only.
    pub fn set_fee_rate(
        &mut self,
        caller: AccountId,
        chain: ChainId,
        fee_bps: u32,
    ) -> Result<(), ChannelError> {
        self.channel.set_fee_rate(caller, chain, fee_bps)
    }

    // ------------------------------------------------------------------
    // bridge calls
    // ------------------------------------------------------------------

    /// Asks the transport what delivering a transfer message to `chain` costs.
    pub async fn quote(
        &self,
        chain: ChainId,
        options: &MessageOptions,
    ) -> Result<Amount, ChannelError> {
        self.channel.require_peer(chain)?;

        let probe = probe_payload(chain);
        let fee = self.transport.quote(chain, probe.len(), options).await?;

        Ok(fee)
    }

    /// Sends `net` to `recipient` on `chain`, charging the caller the grossed-up amount plus
    /// `native_fee`. The admin-fee portion is realized as reward revenue for local stakers.
    #[expect(clippy::too_many_arguments)]
    pub async fn send_amount(
        &mut self,
        caller: AccountId,
        chain: ChainId,
        recipient: AccountId,
        net: Amount,
        native_fee: Amount,
        options: MessageOptions,
        value: Amount,
    ) -> Result<DeliveryReceipt, ChannelError> {
        self.require_balance(caller, value)?;

        let send = self
            .channel
            .prepare_transfer(chain, recipient, net, native_fee, value)?;
        let receipt = self
            .transport
            .send(chain, send.payload.clone(), options, native_fee)
            .await?;

        // Everything but the transport fee stays on this chain: the net principal and any
        // excess are locked as pooled liquidity, the admin fee becomes staker revenue.
        self.debit(caller, value);
        self.pool.fund(value - native_fee);
        self.pool.update_reward(send.admin_fee);

        self.drain_pending();

        info!(
            %chain,
            %net,
            gross = %send.gross,
            admin_fee = %send.admin_fee,
            nonce = send.message.sender_nonce,
            %receipt,
            "transfer sent"
        );

        Ok(receipt)
    }

    /// Consumes the cooldown-cleared unstake request at `index` and delivers its principal to
    /// `recipient` on `chain` instead of locally.
    ///
    /// The caller attaches at least the quoted delivery fee; excess is not refunded.
    pub async fn withdraw_by_bridge(
        &mut self,
        caller: AccountId,
        index: usize,
        chain: ChainId,
        recipient: AccountId,
        options: MessageOptions,
        attached_fee: Amount,
    ) -> Result<DeliveryReceipt, ChannelError> {
        self.channel.require_peer(chain)?;
        let now = self.clock.now();
        let amount = self.pool.withdrawable_amount(caller, index, now)?;
        self.require_balance(caller, attached_fee)?;

        let probe = probe_payload(chain);
        let native_fee = self.transport.quote(chain, probe.len(), &options).await?;

        let send = self
            .channel
            .prepare_withdraw_request(chain, recipient, amount, native_fee, attached_fee)?;
        let receipt = self
            .transport
            .send(chain, send.payload.clone(), options, native_fee)
            .await?;

        self.pool.redeem_for_bridge(caller, index, now)?;
        self.debit(caller, attached_fee);
        self.pool.fund(attached_fee - native_fee);

        self.drain_pending();

        info!(
            %chain,
            index,
            %amount,
            %native_fee,
            nonce = send.message.sender_nonce,
            %receipt,
            "withdrawal redirected over the bridge"
        );

        Ok(receipt)
    }

    /// Entry point for transport deliveries. Invoked once per delivered message (possibly
    /// repeatedly, if the transport redelivers).
    pub fn handle_delivery(
        &mut self,
        delivery: Delivery,
    ) -> Result<SettlementOutcome, ChannelError> {
        let message = BridgeMessage::decode(&delivery.payload)?;
        self.channel
            .validate_inbound(delivery.src_chain, delivery.proven_peer)?;

        let key = MessageKey {
            src_chain: delivery.src_chain,
            nonce: message.sender_nonce,
        };
        let outcome =
            self.settlement
                .apply(key, message.payload, &mut self.pool, self.channel_identity)?;

        if let SettlementOutcome::Applied(payout) = outcome {
            self.execute(payout);
        }

        debug!(%key, kind = message.payload.kind(), ?outcome, "delivery handled");

        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // views
    // ------------------------------------------------------------------

    /// The chain this instance lives on.
    pub const fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    /// The identity remote peers register for this instance's channel.
    pub const fn channel_identity(&self) -> AccountId {
        self.channel_identity
    }

    /// Read access to the staking pool.
    pub const fn pool(&self) -> &StakePool {
        &self.pool
    }

    /// Read access to the bridge channel.
    pub const fn channel(&self) -> &BridgeChannel {
        &self.channel
    }

    /// Read access to the settlement coordinator.
    pub const fn settlement(&self) -> &SettlementCoordinator {
        &self.settlement
    }
}

/// A stand-in transfer payload used to size delivery-fee quotes. Both payload kinds encode to
/// the same number of bytes, so the probe prices either.
fn probe_payload(chain: ChainId) -> Vec<u8> {
    BridgeMessage {
        dest_chain: chain,
        payload: BridgePayload::Transfer {
            recipient: AccountId::ZERO,
            amount: 0,
        },
        sender_nonce: 0,
    }
    .encode()
}

// Deliveries that fail terminally are logged, not retried; this helper centralizes the
// distinction for the actor loop.
pub(crate) fn log_failed_delivery(chain: ChainId, err: &ChannelError) {
    match err {
        ChannelError::UnauthorizedPeer { .. } | ChannelError::UnknownPeer(_) => {
            warn!(%chain, %err, "dropping delivery from unauthorized peer");
        }
        _ => {
            warn!(%chain, %err, "dropping undeliverable message");
        }
    }
}
