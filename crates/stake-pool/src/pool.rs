//! The staking pool state machine: stake ledger, reward accumulator and liquidity authority.

use std::collections::BTreeMap;

use ethnum::U256;
use fluxbridge_params::prelude::StakePoolParams;
use fluxbridge_primitives::{
    constants::{BPS_DENOM, SCALE},
    types::{AccountId, Amount, Timestamp},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{account::Account, errors::StakePoolError, roles::RoleTable};

/// A native-value transfer the pool has authorized. The caller executes it; the pool has already
/// debited its held balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a payout debits the pool; dropping it loses value"]
pub struct Payout {
    /// The account to pay.
    pub to: AccountId,

    /// The value to pay out.
    pub amount: Amount,
}

/// One chain side's staking pool.
///
/// All mutations are sequential and atomic per call: a failed operation leaves the pool exactly
/// as it was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakePool {
    params: StakePoolParams,
    roles: RoleTable,
    accounts: BTreeMap<AccountId, Account>,

    /// Sum of all staked balances. Always equals the per-account sum.
    total_staked: Amount,

    /// Reward-per-share accumulator, fixed-point at `SCALE`. Monotonically non-decreasing.
    acc_per_share: U256,

    /// Pooled native value backing payouts: principal, locked bridge value and undistributed
    /// remainders.
    held: Amount,

    /// Treasury share of realized revenue, collectable by the owner.
    treasury_balance: Amount,

    /// The revenue amount passed to the most recent `update_reward` call.
    last_fee_revenue: Amount,
}

impl StakePool {
    /// Creates an empty pool owned by `owner`.
    pub fn new(owner: AccountId, params: StakePoolParams) -> Self {
        Self {
            params,
            roles: RoleTable::new(owner),
            accounts: BTreeMap::new(),
            total_staked: 0,
            acc_per_share: U256::ZERO,
            held: 0,
            treasury_balance: 0,
            last_fee_revenue: 0,
        }
    }

    // ------------------------------------------------------------------
    // stake ledger
    // ------------------------------------------------------------------

    /// Credits pooled liquidity without staking. Used to seed payout liquidity and to lock
    /// bridged principal.
    pub fn fund(&mut self, amount: Amount) {
        self.held += amount;
    }

    /// Stakes `amount` for `caller`, settling any pending reward first.
    pub fn stake(&mut self, caller: AccountId, amount: Amount) -> Result<(), StakePoolError> {
        if amount == 0 {
            return Err(StakePoolError::InvalidAmount);
        }

        let acc = self.acc_per_share;
        let account = self
            .accounts
            .entry(caller)
            .or_insert_with(|| Account::new(acc));
        account.settle(acc);
        account.add_stake(amount);

        self.total_staked += amount;
        self.held += amount;

        debug!(%caller, %amount, total_staked = %self.total_staked, "stake accepted");

        Ok(())
    }

    /// Starts the cooldown clock on `amount` of `caller`'s stake.
    ///
    /// The principal stops earning immediately; it becomes withdrawable once the cooldown
    /// elapses.
    pub fn unstake(
        &mut self,
        caller: AccountId,
        amount: Amount,
        now: Timestamp,
    ) -> Result<(), StakePoolError> {
        if amount == 0 {
            return Err(StakePoolError::InvalidAmount);
        }

        let staked = self.staked_balance(&caller);
        if amount > staked {
            return Err(StakePoolError::InsufficientBalance {
                requested: amount,
                available: staked,
            });
        }

        let acc = self.acc_per_share;
        let account = self
            .accounts
            .get_mut(&caller)
            .expect("account must exist when it has a staked balance");
        account.settle(acc);
        account.remove_stake(amount);
        account.push_request(amount, now);

        self.total_staked -= amount;

        debug!(%caller, %amount, %now, total_staked = %self.total_staked, "unstake requested");

        Ok(())
    }

    /// Pays out the cooldown-cleared unstake request at `index` for `caller`.
    pub fn withdraw(
        &mut self,
        caller: AccountId,
        index: usize,
        now: Timestamp,
    ) -> Result<Payout, StakePoolError> {
        let amount = self.withdrawable_amount(caller, index, now)?;

        if self.held < amount {
            return Err(StakePoolError::LiquidityUnavailable {
                requested: amount,
                held: self.held,
            });
        }

        self.consume_request(caller, index);
        self.held -= amount;

        debug!(%caller, index, %amount, "unstake request withdrawn");

        Ok(Payout { to: caller, amount })
    }

    /// Validates the unstake request at `index` exactly as [`Self::withdraw`] does, without the
    /// liquidity check and without consuming it. Returns the principal it would pay.
    pub fn withdrawable_amount(
        &self,
        caller: AccountId,
        index: usize,
        now: Timestamp,
    ) -> Result<Amount, StakePoolError> {
        let request = self
            .accounts
            .get(&caller)
            .and_then(|account| account.requests().get(index))
            .ok_or(StakePoolError::NoSuchRequest(index))?;

        if request.withdrawn {
            return Err(StakePoolError::AlreadyWithdrawn(index));
        }

        let matures_at = request.matures_at(self.params.cooldown_secs());
        if now < matures_at {
            return Err(StakePoolError::CooldownNotElapsed { matures_at, now });
        }

        Ok(request.amount)
    }

    /// Consumes the cooldown-cleared request at `index` without a local payout: the principal
    /// stays locked in the pool and is delivered on another chain by the bridge.
    pub fn redeem_for_bridge(
        &mut self,
        caller: AccountId,
        index: usize,
        now: Timestamp,
    ) -> Result<Amount, StakePoolError> {
        let amount = self.withdrawable_amount(caller, index, now)?;
        self.consume_request(caller, index);

        debug!(%caller, index, %amount, "unstake request redeemed for bridge delivery");

        Ok(amount)
    }

    fn consume_request(&mut self, caller: AccountId, index: usize) {
        let request = self
            .accounts
            .get_mut(&caller)
            .and_then(|account| account.request_mut(index))
            .expect("request must exist after validation");
        request.withdrawn = true;
    }

    // ------------------------------------------------------------------
    // reward accumulator
    // ------------------------------------------------------------------

    /// Distributes newly realized fee revenue.
    ///
    /// The treasury share is retained for the owner; the rest advances the reward-per-share
    /// accumulator. With no stakers the revenue is discarded: it stays in the held balance but
    /// is never credited to anyone, matching the reference behavior.
    pub fn update_reward(&mut self, revenue: Amount) {
        self.last_fee_revenue = revenue;

        if revenue == 0 {
            return;
        }

        if self.total_staked == 0 {
            warn!(%revenue, "no stakers; discarding fee revenue");
            return;
        }

        let treasury_cut = (U256::from(revenue) * U256::from(self.params.treasury_share_bps)
            / U256::from(BPS_DENOM))
        .as_u128();
        let staker_share = revenue - treasury_cut;

        self.treasury_balance += treasury_cut;
        if staker_share > 0 {
            self.acc_per_share +=
                U256::from(staker_share) * U256::from(SCALE) / U256::from(self.total_staked);
        }

        debug!(%revenue, %treasury_cut, %staker_share, "fee revenue distributed");
    }

    /// Settles and pays out the caller's accumulated reward.
    pub fn claim_reward(&mut self, caller: AccountId) -> Result<Payout, StakePoolError> {
        let acc = self.acc_per_share;
        let account = self
            .accounts
            .get_mut(&caller)
            .ok_or(StakePoolError::NothingToClaim)?;
        account.settle(acc);

        let amount = account.claimable();
        if amount == 0 {
            return Err(StakePoolError::NothingToClaim);
        }

        // Settling is value-neutral, so it may survive a failed claim: the caller is still owed
        // the same total.
        if self.held < amount {
            return Err(StakePoolError::LiquidityUnavailable {
                requested: amount,
                held: self.held,
            });
        }

        let amount = self
            .accounts
            .get_mut(&caller)
            .expect("account must exist after settling")
            .take_claimable();
        self.held -= amount;

        debug!(%caller, %amount, "reward claimed");

        Ok(Payout { to: caller, amount })
    }

    /// Pays out the accrued treasury balance to the owner.
    pub fn collect_treasury(&mut self, caller: AccountId) -> Result<Payout, StakePoolError> {
        self.roles.require_owner(caller)?;

        let amount = self.treasury_balance;
        if amount == 0 {
            return Err(StakePoolError::NothingToClaim);
        }
        if self.held < amount {
            return Err(StakePoolError::LiquidityUnavailable {
                requested: amount,
                held: self.held,
            });
        }

        self.treasury_balance = 0;
        self.held -= amount;

        info!(%caller, %amount, "treasury collected");

        Ok(Payout { to: caller, amount })
    }

    // ------------------------------------------------------------------
    // liquidity authority
    // ------------------------------------------------------------------

    /// Replaces the single authorized liquidity mover. Owner-only.
    pub fn set_liquidity_manager(
        &mut self,
        caller: AccountId,
        principal: AccountId,
    ) -> Result<(), StakePoolError> {
        self.roles.require_owner(caller)?;
        self.roles.set_liquidity_manager(principal);

        info!(%principal, "liquidity manager replaced");

        Ok(())
    }

    /// Moves pooled value out of the ledger. Callable only by the current liquidity manager.
    pub fn transfer_liquidity(
        &mut self,
        caller: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<Payout, StakePoolError> {
        self.roles.require_liquidity_manager(caller)?;

        if self.held < amount {
            return Err(StakePoolError::InsufficientBalance {
                requested: amount,
                available: self.held,
            });
        }

        self.held -= amount;

        debug!(%caller, %to, %amount, "liquidity transferred");

        Ok(Payout { to, amount })
    }

    // ------------------------------------------------------------------
    // views
    // ------------------------------------------------------------------

    /// The staked balance of `account`, zero if it never staked.
    pub fn staked_balance(&self, account: &AccountId) -> Amount {
        self.accounts
            .get(account)
            .map(Account::staked_balance)
            .unwrap_or(0)
    }

    /// The reward `account` could claim right now.
    pub fn pending_reward(&self, account: &AccountId) -> Amount {
        self.accounts
            .get(account)
            .map(|a| a.claimable() + a.pending(self.acc_per_share))
            .unwrap_or(0)
    }

    /// The unstake-request queue of `account`, insertion-ordered.
    pub fn unstake_requests(&self, account: &AccountId) -> &[crate::account::UnstakeRequest] {
        self.accounts
            .get(account)
            .map(Account::requests)
            .unwrap_or(&[])
    }

    /// Sum of all staked balances.
    pub const fn total_staked(&self) -> Amount {
        self.total_staked
    }

    /// The pool's held native value.
    pub const fn held(&self) -> Amount {
        self.held
    }

    /// The collectable treasury balance.
    pub const fn treasury_balance(&self) -> Amount {
        self.treasury_balance
    }

    /// The revenue amount passed to the most recent reward update.
    pub const fn last_fee_revenue(&self) -> Amount {
        self.last_fee_revenue
    }

    /// The pool owner.
    pub const fn owner(&self) -> AccountId {
        self.roles.owner()
    }

    /// The current liquidity manager, if set.
    pub const fn liquidity_manager(&self) -> Option<AccountId> {
        self.roles.liquidity_manager()
    }

    /// Total principal of cooldown-cleared, unconsumed unstake requests.
    ///
    /// The pool's held value must cover this at all times under user-only flows; only an
    /// authority sweep can break it, and then withdrawals surface `LiquidityUnavailable` instead
    /// of partially completing.
    pub fn cleared_liability(&self, now: Timestamp) -> Amount {
        let cooldown = self.params.cooldown_secs();
        self.accounts
            .values()
            .flat_map(|account| account.requests())
            .filter(|request| request.is_withdrawable(cooldown, now))
            .map(|request| request.amount)
            .sum()
    }
}
