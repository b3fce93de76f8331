//! # Fluxbridge Stake Pool
//!
//! Each chain-side instance holds a pool of native value that users stake into. Stakers earn a
//! pro-rata share of the admin-fee revenue the local bridge channel realizes on outbound
//! transfers, and reclaim their principal through a cooldown-gated unstake queue.
//!
//! Distributing revenue by looping over all stakers would make every accrual event O(n). The pool
//! instead keeps a single monotonically non-decreasing `acc_per_share` scalar and, per account, a
//! `reward_debt` snapshot of that scalar. Whenever an account touches the ledger it is first
//! settled: the difference between the current accumulator and its snapshot, weighted by its
//! stake, is moved into its claimable balance. Every operation stays O(log n).
//!
//! The pool is a plain synchronous state machine. Operations that move native value out return a
//! [`Payout`] effect for the caller to execute; the pool itself performs no I/O.

pub mod account;
pub mod errors;
pub mod pool;
pub mod roles;

pub use errors::StakePoolError;
pub use pool::{Payout, StakePool};
