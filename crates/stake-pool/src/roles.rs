//! Capability checks for the pool's privileged operations.
//!
//! Authorization is an explicit table lookup against the caller identity, not an inheritance
//! hierarchy: callers pass who they are, the table answers whether that identity currently holds
//! the role.

use fluxbridge_primitives::types::AccountId;
use serde::{Deserialize, Serialize};

use crate::errors::StakePoolError;

/// The role assignments of one pool instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleTable {
    owner: AccountId,
    liquidity_manager: Option<AccountId>,
}

impl RoleTable {
    /// Creates a table with the given owner and no liquidity manager.
    pub const fn new(owner: AccountId) -> Self {
        Self {
            owner,
            liquidity_manager: None,
        }
    }

    /// The owner of the pool.
    pub const fn owner(&self) -> AccountId {
        self.owner
    }

    /// The currently authorized liquidity mover, if one has been set.
    pub const fn liquidity_manager(&self) -> Option<AccountId> {
        self.liquidity_manager
    }

    /// Fails with [`StakePoolError::Unauthorized`] unless `caller` is the owner.
    pub fn require_owner(&self, caller: AccountId) -> Result<(), StakePoolError> {
        if caller == self.owner {
            Ok(())
        } else {
            Err(StakePoolError::Unauthorized)
        }
    }

    /// Fails with [`StakePoolError::Unauthorized`] unless `caller` is the current liquidity
    /// manager.
    pub fn require_liquidity_manager(&self, caller: AccountId) -> Result<(), StakePoolError> {
        if self.liquidity_manager == Some(caller) {
            Ok(())
        } else {
            Err(StakePoolError::Unauthorized)
        }
    }

    /// Replaces the liquidity manager. The previous authority loses access immediately; no
    /// history is kept.
    pub(crate) fn set_liquidity_manager(&mut self, principal: AccountId) {
        self.liquidity_manager = Some(principal);
    }
}
