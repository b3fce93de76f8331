//! Re-exports of the commonly used parameter types.

pub use crate::{
    channel::{ChannelParams, WithdrawFallback},
    stake_pool::StakePoolParams,
};
