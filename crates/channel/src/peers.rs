//! Registry of remote peer contracts, keyed by chain identifier.

use std::collections::BTreeMap;

use fluxbridge_primitives::types::{AccountId, ChainId};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::ChannelError;

/// One registered remote counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerLink {
    /// The remote contract identifier, 32-byte opaque key.
    pub remote: AccountId,

    /// Admin-fee rate applied to transfers towards this peer, in parts per 100 000.
    pub fee_bps: u32,
}

/// The peer links of one channel. Entries are created and replaced by the owner only, never
/// automatically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerTable {
    links: BTreeMap<ChainId, PeerLink>,
}

impl PeerTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The link for `chain`, if registered.
    pub fn get(&self, chain: ChainId) -> Option<&PeerLink> {
        self.links.get(&chain)
    }

    /// The link for `chain`, or [`ChannelError::UnknownPeer`].
    pub fn require(&self, chain: ChainId) -> Result<&PeerLink, ChannelError> {
        self.links.get(&chain).ok_or(ChannelError::UnknownPeer(chain))
    }

    /// Establishes or re-keys the link for `chain`. A re-key keeps the configured fee rate.
    pub(crate) fn set(&mut self, chain: ChainId, remote: AccountId, default_fee_bps: u32) {
        match self.links.get_mut(&chain) {
            Some(link) => {
                info!(%chain, old = %link.remote, new = %remote, "peer re-keyed");
                link.remote = remote;
            }
            None => {
                info!(%chain, %remote, fee_bps = default_fee_bps, "peer registered");
                self.links.insert(
                    chain,
                    PeerLink {
                        remote,
                        fee_bps: default_fee_bps,
                    },
                );
            }
        }
    }

    /// Updates the fee rate of an existing link.
    pub(crate) fn set_fee(&mut self, chain: ChainId, fee_bps: u32) -> Result<(), ChannelError> {
        let link = self
            .links
            .get_mut(&chain)
            .ok_or(ChannelError::UnknownPeer(chain))?;
        link.fee_bps = fee_bps;

        Ok(())
    }
}
