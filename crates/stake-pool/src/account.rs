//! Per-account ledger state: staked balance, reward-debt snapshot and the unstake-request queue.

use ethnum::U256;
use fluxbridge_primitives::{
    constants::SCALE,
    types::{Amount, Timestamp},
};
use serde::{Deserialize, Serialize};

/// A pending principal reclamation. Created by `unstake`, consumed by `withdraw`; never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnstakeRequest {
    /// The principal locked behind the cooldown.
    pub amount: Amount,

    /// When the request was made.
    pub requested_at: Timestamp,

    /// Whether the principal has already been paid out.
    pub withdrawn: bool,
}

impl UnstakeRequest {
    /// First timestamp at which the request clears its cooldown.
    pub const fn matures_at(&self, cooldown_secs: u64) -> Timestamp {
        self.requested_at.saturating_add(cooldown_secs)
    }

    /// Whether the request has cleared its cooldown and has not been consumed.
    pub const fn is_withdrawable(&self, cooldown_secs: u64, now: Timestamp) -> bool {
        !self.withdrawn && now >= self.matures_at(cooldown_secs)
    }
}

/// One staker's slice of the pool. Created implicitly on first stake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    staked_balance: Amount,

    /// The `acc_per_share` value this account has already been settled up to.
    reward_debt: U256,

    /// Settled but not yet claimed reward.
    claimable: Amount,

    /// FIFO queue of pending reclamations; indices are stable, consumed entries stay in place.
    unstake_requests: Vec<UnstakeRequest>,
}

impl Account {
    /// Creates an account whose reward debt starts at the current accumulator, so it earns
    /// nothing from revenue that predates it.
    pub(crate) fn new(acc_per_share: U256) -> Self {
        Self {
            staked_balance: 0,
            reward_debt: acc_per_share,
            claimable: 0,
            unstake_requests: Vec::new(),
        }
    }

    /// The currently staked balance.
    pub const fn staked_balance(&self) -> Amount {
        self.staked_balance
    }

    /// Settled but unclaimed reward.
    pub const fn claimable(&self) -> Amount {
        self.claimable
    }

    /// The unstake-request queue, insertion-ordered.
    pub fn requests(&self) -> &[UnstakeRequest] {
        &self.unstake_requests
    }

    /// Reward earned since the last settlement, at the given accumulator value.
    pub(crate) fn pending(&self, acc_per_share: U256) -> Amount {
        let delta = acc_per_share - self.reward_debt;
        (U256::from(self.staked_balance) * delta / U256::from(SCALE)).as_u128()
    }

    /// Moves the pending reward into the claimable balance and advances the debt snapshot.
    ///
    /// Value-neutral: the account is owed the same total before and after.
    pub(crate) fn settle(&mut self, acc_per_share: U256) {
        let pending = self.pending(acc_per_share);
        if pending > 0 {
            self.claimable += pending;
        }
        self.reward_debt = acc_per_share;
    }

    pub(crate) fn add_stake(&mut self, amount: Amount) {
        self.staked_balance += amount;
    }

    pub(crate) fn remove_stake(&mut self, amount: Amount) {
        debug_assert!(amount <= self.staked_balance);
        self.staked_balance -= amount;
    }

    pub(crate) fn push_request(&mut self, amount: Amount, requested_at: Timestamp) {
        self.unstake_requests.push(UnstakeRequest {
            amount,
            requested_at,
            withdrawn: false,
        });
    }

    pub(crate) fn request_mut(&mut self, index: usize) -> Option<&mut UnstakeRequest> {
        self.unstake_requests.get_mut(index)
    }

    pub(crate) fn take_claimable(&mut self) -> Amount {
        std::mem::take(&mut self.claimable)
    }
}
