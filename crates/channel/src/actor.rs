//! Actor-based wrapper around [`ChainNode`] that runs each chain-side instance in its own task.
//!
//! The two sides of a bridge never share memory: each runs behind its own mailbox and the only
//! path between them is the transport's delivery callback, which lands in the remote actor's
//! mailbox as a fire-and-forget [`ChainCommand::Deliver`].

use fluxbridge_primitives::{
    types::{AccountId, Amount, ChainId},
    wire::{DeliveryReceipt, MessageOptions},
};
use fluxbridge_stake_pool::StakePool;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    errors::ChannelError,
    node::{log_failed_delivery, ChainNode},
    transport::Delivery,
};

/// Message types that can be sent to a [`ChainActor`].
#[derive(Debug)]
pub enum ChainCommand {
    /// Stakes value from the caller's wallet.
    Stake {
        /// Who stakes.
        caller: AccountId,

        /// The value to stake.
        value: Amount,

        /// Channel to send the response back.
        respond_to: oneshot::Sender<Result<(), ChannelError>>,
    },

    /// Starts the cooldown on part of the caller's stake.
    Unstake {
        /// Who unstakes.
        caller: AccountId,

        /// The principal to unstake.
        amount: Amount,

        /// Channel to send the response back.
        respond_to: oneshot::Sender<Result<(), ChannelError>>,
    },

    /// Pays out a cooldown-cleared unstake request locally.
    Withdraw {
        /// Who withdraws.
        caller: AccountId,

        /// Index into the caller's unstake-request queue.
        index: usize,

        /// Channel to send the paid amount back.
        respond_to: oneshot::Sender<Result<Amount, ChannelError>>,
    },

    /// Consumes a cooldown-cleared unstake request and delivers its principal remotely.
    WithdrawByBridge {
        /// Who withdraws.
        caller: AccountId,

        /// Index into the caller's unstake-request queue.
        index: usize,

        /// The chain the principal should be delivered on.
        chain: ChainId,

        /// Who receives the principal on the destination chain.
        recipient: AccountId,

        /// Execution options forwarded to the transport.
        options: MessageOptions,

        /// Delivery fee the caller attaches; must cover the quote, excess is not refunded.
        attached_fee: Amount,

        /// Channel to send the transport receipt back.
        respond_to: oneshot::Sender<Result<DeliveryReceipt, ChannelError>>,
    },

    /// Settles and pays out the caller's accumulated reward.
    ClaimReward {
        /// Who claims.
        caller: AccountId,

        /// Channel to send the paid amount back.
        respond_to: oneshot::Sender<Result<Amount, ChannelError>>,
    },

    /// Pays out the accrued treasury balance. Owner-only.
    CollectTreasury {
        /// Who collects; must be the owner.
        caller: AccountId,

        /// Channel to send the paid amount back.
        respond_to: oneshot::Sender<Result<Amount, ChannelError>>,
    },

    /// Sends a grossed-up transfer to a remote chain.
    SendAmount {
        /// Who pays.
        caller: AccountId,

        /// The destination chain.
        chain: ChainId,

        /// Who receives the net amount on the destination chain.
        recipient: AccountId,

        /// The net amount the recipient must receive.
        net: Amount,

        /// The transport's quoted delivery fee.
        native_fee: Amount,

        /// Execution options forwarded to the transport.
        options: MessageOptions,

        /// Total value the caller attaches; must cover gross plus `native_fee`.
        value: Amount,

        /// Channel to send the transport receipt back.
        respond_to: oneshot::Sender<Result<DeliveryReceipt, ChannelError>>,
    },

    /// Asks the transport for its delivery-fee estimate.
    Quote {
        /// The destination chain.
        chain: ChainId,

        /// Execution options forwarded to the transport.
        options: MessageOptions,

        /// Channel to send the fee estimate back.
        respond_to: oneshot::Sender<Result<Amount, ChannelError>>,
    },

    /// Registers or re-keys a remote peer. Owner-only.
    SetPeer {
        /// Who configures; must be the owner.
        caller: AccountId,

        /// The remote chain.
        chain: ChainId,

        /// The remote contract identifier.
        remote: AccountId,

        /// Channel to send the response back.
        respond_to: oneshot::Sender<Result<(), ChannelError>>,
    },

    /// Updates a peer link's admin-fee rate. Owner-only.
    SetFeeRate {
        /// Who configures; must be the owner.
        caller: AccountId,

        /// The remote chain.
        chain: ChainId,

        /// The new fee rate in parts per 100 000.
        fee_bps: u32,

        /// Channel to send the response back.
        respond_to: oneshot::Sender<Result<(), ChannelError>>,
    },

    /// Replaces the pool's liquidity manager. Owner-only.
    SetLiquidityManager {
        /// Who configures; must be the owner.
        caller: AccountId,

        /// The new single authorized liquidity mover.
        principal: AccountId,

        /// Channel to send the response back.
        respond_to: oneshot::Sender<Result<(), ChannelError>>,
    },

    /// Moves pooled value to a wallet. Liquidity-manager-only.
    TransferLiquidity {
        /// Who moves; must be the liquidity manager.
        caller: AccountId,

        /// Who receives the value.
        to: AccountId,

        /// The value to move.
        amount: Amount,

        /// Channel to send the response back.
        respond_to: oneshot::Sender<Result<(), ChannelError>>,
    },

    /// Seeds a wallet balance. Fire-and-forget.
    Credit {
        /// The wallet to credit.
        account: AccountId,

        /// The value to credit.
        amount: Amount,
    },

    /// An inbound payload from the transport. Fire-and-forget; failures are logged, not
    /// retried.
    Deliver {
        /// The authenticated delivery.
        delivery: Delivery,
    },

    /// Gets a wallet balance.
    BalanceOf {
        /// The wallet to read.
        account: AccountId,

        /// Channel to send the balance back.
        respond_to: oneshot::Sender<Amount>,
    },

    /// Gets an account's staked balance.
    StakedBalance {
        /// The account to read.
        account: AccountId,

        /// Channel to send the balance back.
        respond_to: oneshot::Sender<Amount>,
    },

    /// Gets a snapshot of the staking pool state.
    PoolSnapshot {
        /// Channel to send the snapshot back.
        respond_to: oneshot::Sender<StakePool>,
    },

    /// Gracefully shuts down the actor.
    Shutdown,
}

/// Clonable handle the transport uses to push deliveries into the actor's mailbox.
#[derive(Debug, Clone)]
pub struct ChainMailbox {
    chain_id: ChainId,
    sender: mpsc::UnboundedSender<ChainCommand>,
}

impl ChainMailbox {
    /// Enqueues a delivery. Fire-and-forget: the transport does not learn whether application
    /// succeeded.
    pub fn deliver(&self, delivery: Delivery) {
        if self
            .sender
            .send(ChainCommand::Deliver { delivery })
            .is_err()
        {
            warn!(chain_id = %self.chain_id, "chain actor gone; delivery dropped");
        }
    }

    /// The chain this mailbox belongs to.
    pub const fn chain_id(&self) -> ChainId {
        self.chain_id
    }
}

/// Actor wrapper around [`ChainNode`] that runs in its own task.
#[derive(Debug)]
pub struct ChainActor {
    /// The chain this actor manages.
    pub chain_id: ChainId,

    /// Channel for sending commands to the actor.
    sender: mpsc::UnboundedSender<ChainCommand>,

    /// Handle to the actor task.
    handle: JoinHandle<()>,
}

impl ChainActor {
    /// Spawns a new chain actor around the given node.
    pub fn spawn(node: ChainNode) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let chain_id = node.chain_id();

        let handle = tokio::spawn(async move {
            let mut node = node;

            info!(%chain_id, "chain actor started");

            while let Some(command) = receiver.recv().await {
                match command {
                    ChainCommand::Stake {
                        caller,
                        value,
                        respond_to,
                    } => {
                        let _ = respond_to.send(node.stake(caller, value));
                    }
                    ChainCommand::Unstake {
                        caller,
                        amount,
                        respond_to,
                    } => {
                        let _ = respond_to.send(node.unstake(caller, amount));
                    }
                    ChainCommand::Withdraw {
                        caller,
                        index,
                        respond_to,
                    } => {
                        let _ = respond_to.send(node.withdraw(caller, index));
                    }
                    ChainCommand::WithdrawByBridge {
                        caller,
                        index,
                        chain,
                        recipient,
                        options,
                        attached_fee,
                        respond_to,
                    } => {
                        let result = node
                            .withdraw_by_bridge(
                                caller,
                                index,
                                chain,
                                recipient,
                                options,
                                attached_fee,
                            )
                            .await;
                        let _ = respond_to.send(result);
                    }
                    ChainCommand::ClaimReward { caller, respond_to } => {
                        let _ = respond_to.send(node.claim_reward(caller));
                    }
                    ChainCommand::CollectTreasury { caller, respond_to } => {
                        let _ = respond_to.send(node.collect_treasury(caller));
                    }
                    ChainCommand::SendAmount {
                        caller,
                        chain,
                        recipient,
                        net,
                        native_fee,
                        options,
                        value,
                        respond_to,
                    } => {
                        let result = node
                            .send_amount(caller, chain, recipient, net, native_fee, options, value)
                            .await;
                        let _ = respond_to.send(result);
                    }
                    ChainCommand::Quote {
                        chain,
                        options,
                        respond_to,
                    } => {
                        let _ = respond_to.send(node.quote(chain, &options).await);
                    }
                    ChainCommand::SetPeer {
                        caller,
                        chain,
                        remote,
                        respond_to,
                    } => {
                        let _ = respond_to.send(node.set_peer(caller, chain, remote));
                    }
                    ChainCommand::SetFeeRate {
                        caller,
                        chain,
                        fee_bps,
                        respond_to,
                    } => {
                        let _ = respond_to.send(node.set_fee_rate(caller, chain, fee_bps));
                    }
                    ChainCommand::SetLiquidityManager {
                        caller,
                        principal,
                        respond_to,
                    } => {
                        let _ = respond_to.send(node.set_liquidity_manager(caller, principal));
                    }
                    ChainCommand::TransferLiquidity {
                        caller,
                        to,
                        amount,
                        respond_to,
                    } => {
                        let _ = respond_to.send(node.transfer_liquidity(caller, to, amount));
                    }
                    ChainCommand::Credit { account, amount } => {
                        node.credit(account, amount);
                    }
                    ChainCommand::Deliver { delivery } => {
                        let src_chain = delivery.src_chain;
                        match node.handle_delivery(delivery) {
                            Ok(outcome) => {
                                debug!(%chain_id, %src_chain, %outcome, "delivery processed");
                            }
                            Err(err) => log_failed_delivery(src_chain, &err),
                        }
                    }
                    ChainCommand::BalanceOf {
                        account,
                        respond_to,
                    } => {
                        let _ = respond_to.send(node.balance_of(&account));
                    }
                    ChainCommand::StakedBalance {
                        account,
                        respond_to,
                    } => {
                        let _ = respond_to.send(node.pool().staked_balance(&account));
                    }
                    ChainCommand::PoolSnapshot { respond_to } => {
                        let _ = respond_to.send(node.pool().clone());
                    }
                    ChainCommand::Shutdown => {
                        info!(%chain_id, "chain actor shutting down");
                        break;
                    }
                }
            }

            info!(%chain_id, "chain actor terminated");
        });

        Self {
            chain_id,
            sender,
            handle,
        }
    }

    /// A mailbox the transport can push deliveries into.
    pub fn mailbox(&self) -> ChainMailbox {
        ChainMailbox {
            chain_id: self.chain_id,
            sender: self.sender.clone(),
        }
    }

    async fn call<T>(
        &self,
        command: ChainCommand,
        receiver: oneshot::Receiver<Result<T, ChannelError>>,
    ) -> Result<T, ChannelError> {
        self.sender
            .send(command)
            .map_err(|_| ChannelError::Actor("chain actor has shut down".to_string()))?;

        receiver
            .await
            .map_err(|_| ChannelError::Actor("chain actor dropped the response".to_string()))?
    }

    /// Stakes `value` from `caller`'s wallet.
    pub async fn stake(&self, caller: AccountId, value: Amount) -> Result<(), ChannelError> {
        let (sender, receiver) = oneshot::channel();
        self.call(
            ChainCommand::Stake {
                caller,
                value,
                respond_to: sender,
            },
            receiver,
        )
        .await
    }

    /// Starts the cooldown on `amount` of `caller`'s stake.
    pub async fn unstake(&self, caller: AccountId, amount: Amount) -> Result<(), ChannelError> {
        let (sender, receiver) = oneshot::channel();
        self.call(
            ChainCommand::Unstake {
                caller,
                amount,
                respond_to: sender,
            },
            receiver,
        )
        .await
    }

    /// Pays out the cooldown-cleared unstake request at `index`; returns the amount paid.
    pub async fn withdraw(&self, caller: AccountId, index: usize) -> Result<Amount, ChannelError> {
        let (sender, receiver) = oneshot::channel();
        self.call(
            ChainCommand::Withdraw {
                caller,
                index,
                respond_to: sender,
            },
            receiver,
        )
        .await
    }

    /// Redirects the cooldown-cleared unstake request at `index` to `recipient` on `chain`.
    pub async fn withdraw_by_bridge(
        &self,
        caller: AccountId,
        index: usize,
        chain: ChainId,
        recipient: AccountId,
        options: MessageOptions,
        attached_fee: Amount,
    ) -> Result<DeliveryReceipt, ChannelError> {
        let (sender, receiver) = oneshot::channel();
        self.call(
            ChainCommand::WithdrawByBridge {
                caller,
                index,
                chain,
                recipient,
                options,
                attached_fee,
                respond_to: sender,
            },
            receiver,
        )
        .await
    }

    /// Settles and pays out `caller`'s reward; returns the amount paid.
    pub async fn claim_reward(&self, caller: AccountId) -> Result<Amount, ChannelError> {
        let (sender, receiver) = oneshot::channel();
        self.call(
            ChainCommand::ClaimReward {
                caller,
                respond_to: sender,
            },
            receiver,
        )
        .await
    }

    /// Pays out the treasury balance to the owner; returns the amount paid.
    pub async fn collect_treasury(&self, caller: AccountId) -> Result<Amount, ChannelError> {
        let (sender, receiver) = oneshot::channel();
        self.call(
            ChainCommand::CollectTreasury {
                caller,
                respond_to: sender,
            },
            receiver,
        )
        .await
    }

    /// Sends `net` to `recipient` on `chain`; returns the transport receipt.
    #[expect(clippy::too_many_arguments)]
    pub async fn send_amount(
        &self,
        caller: AccountId,
        chain: ChainId,
        recipient: AccountId,
        net: Amount,
        native_fee: Amount,
        options: MessageOptions,
        value: Amount,
    ) -> Result<DeliveryReceipt, ChannelError> {
        let (sender, receiver) = oneshot::channel();
        self.call(
            ChainCommand::SendAmount {
                caller,
                chain,
                recipient,
                net,
                native_fee,
                options,
                value,
                respond_to: sender,
            },
            receiver,
        )
        .await
    }

    /// Asks the transport what a delivery to `chain` costs.
    pub async fn quote(
        &self,
        chain: ChainId,
        options: MessageOptions,
    ) -> Result<Amount, ChannelError> {
        let (sender, receiver) = oneshot::channel();
        self.call(
            ChainCommand::Quote {
                chain,
                options,
                respond_to: sender,
            },
            receiver,
        )
        .await
    }

    /// Registers or re-keys the remote peer for `chain`.
    pub async fn set_peer(
        &self,
        caller: AccountId,
        chain: ChainId,
        remote: AccountId,
    ) -> Result<(), ChannelError> {
        let (sender, receiver) = oneshot::channel();
        self.call(
            ChainCommand::SetPeer {
                caller,
                chain,
                remote,
                respond_to: sender,
            },
            receiver,
        )
        .await
    }

    /// Updates the admin-fee rate towards `chain`.
    pub async fn set_fee_rate(
        &self,
        caller: AccountId,
        chain: ChainId,
        fee_bps: u32,
    ) -> Result<(), ChannelError> {
        let (sender, receiver) = oneshot::channel();
        self.call(
            ChainCommand::SetFeeRate {
                caller,
                chain,
                fee_bps,
                respond_to: sender,
            },
            receiver,
        )
        .await
    }

    /// Replaces the pool's liquidity manager.
    pub async fn set_liquidity_manager(
        &self,
        caller: AccountId,
        principal: AccountId,
    ) -> Result<(), ChannelError> {
        let (sender, receiver) = oneshot::channel();
        self.call(
            ChainCommand::SetLiquidityManager {
                caller,
                principal,
                respond_to: sender,
            },
            receiver,
        )
        .await
    }

    /// Moves pooled value to a wallet.
    pub async fn transfer_liquidity(
        &self,
        caller: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<(), ChannelError> {
        let (sender, receiver) = oneshot::channel();
        self.call(
            ChainCommand::TransferLiquidity {
                caller,
                to,
                amount,
                respond_to: sender,
            },
            receiver,
        )
        .await
    }

    /// Seeds `account`'s wallet with `amount`. Fire-and-forget.
    pub fn credit(&self, account: AccountId, amount: Amount) {
        let _ = self.sender.send(ChainCommand::Credit { account, amount });
    }

    /// Gets `account`'s wallet balance.
    pub async fn balance_of(&self, account: AccountId) -> Result<Amount, ChannelError> {
        let (sender, receiver) = oneshot::channel();
        self.sender
            .send(ChainCommand::BalanceOf {
                account,
                respond_to: sender,
            })
            .map_err(|_| ChannelError::Actor("chain actor has shut down".to_string()))?;

        receiver
            .await
            .map_err(|_| ChannelError::Actor("chain actor dropped the response".to_string()))
    }

    /// Gets `account`'s staked balance.
    pub async fn staked_balance(&self, account: AccountId) -> Result<Amount, ChannelError> {
        let (sender, receiver) = oneshot::channel();
        self.sender
            .send(ChainCommand::StakedBalance {
                account,
                respond_to: sender,
            })
            .map_err(|_| ChannelError::Actor("chain actor has shut down".to_string()))?;

        receiver
            .await
            .map_err(|_| ChannelError::Actor("chain actor dropped the response".to_string()))
    }

    /// Gets a snapshot of the staking pool state.
    pub async fn pool_snapshot(&self) -> Result<StakePool, ChannelError> {
        let (sender, receiver) = oneshot::channel();
        self.sender
            .send(ChainCommand::PoolSnapshot { respond_to: sender })
            .map_err(|_| ChannelError::Actor("chain actor has shut down".to_string()))?;

        receiver
            .await
            .map_err(|_| ChannelError::Actor("chain actor dropped the response".to_string()))
    }

    /// Gracefully shuts down the actor.
    pub async fn shutdown(self) -> Result<(), ChannelError> {
        let _ = self.sender.send(ChainCommand::Shutdown);

        match tokio::time::timeout(std::time::Duration::from_secs(30), self.handle).await {
            Ok(result) => result
                .map_err(|e| ChannelError::Actor(format!("chain actor task panicked: {e}"))),
            Err(_) => {
                warn!(chain_id = %self.chain_id, "chain actor shutdown timed out");
                Err(ChannelError::Actor(
                    "chain actor shutdown timed out".to_string(),
                ))
            }
        }
    }
}
