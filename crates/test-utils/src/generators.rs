//! Generators for arbitrary identifiers.

use fluxbridge_primitives::types::{AccountId, ChainId};
use rand::Rng;

/// Generates a random 32-byte account identifier.
pub fn generate_account() -> AccountId {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes[..]);

    AccountId::new(bytes)
}

/// A deterministic account identifier whose bytes are all `byte`.
pub const fn account(byte: u8) -> AccountId {
    AccountId::new([byte; 32])
}

/// Generates a random nonzero chain identifier.
pub fn generate_chain_id() -> ChainId {
    ChainId(rand::thread_rng().gen_range(1..=u32::MAX))
}
