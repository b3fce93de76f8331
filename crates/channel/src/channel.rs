//! Outbound send construction and inbound peer validation for one chain side.

use ethnum::U256;
use fluxbridge_params::prelude::ChannelParams;
use fluxbridge_primitives::{
    constants::BPS_DENOM,
    types::{AccountId, Amount, ChainId, Nonce},
    wire::{BridgeMessage, BridgePayload},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{errors::ChannelError, peers::PeerTable};

/// Grosses `net` up so that after the admin fee is deducted the recipient receives exactly
/// `net`: `gross = net * 100000 / (100000 - fee_bps)`.
pub fn gross_up(net: Amount, fee_bps: u32) -> Result<Amount, ChannelError> {
    if Amount::from(fee_bps) >= BPS_DENOM {
        return Err(ChannelError::FeeRateInvalid(fee_bps));
    }

    let gross = U256::from(net) * U256::from(BPS_DENOM)
        / (U256::from(BPS_DENOM) - U256::from(fee_bps));

    Ok(gross.as_u128())
}

/// A validated, fully priced outbound send, ready to hand to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundSend {
    /// The message to emit. Never mutated after construction.
    pub message: BridgeMessage,

    /// The message's wire bytes.
    pub payload: Vec<u8>,

    /// Principal charged to the sender: net amount plus admin fee. Zero for withdraw-request
    /// sends, whose principal was locked when the unstake request was consumed.
    pub gross: Amount,

    /// The portion of `gross` that is fee revenue for the local pool.
    pub admin_fee: Amount,

    /// Attached value beyond the required gross-plus-delivery-fee. Not refunded; locked into
    /// pooled liquidity.
    pub excess: Amount,
}

/// The sending/receiving half of one chain-side instance: peer registry, fee math and nonce
/// assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeChannel {
    local_chain: ChainId,
    owner: AccountId,
    params: ChannelParams,
    peers: PeerTable,
    next_nonce: Nonce,
}

impl BridgeChannel {
    /// Creates a channel with an empty peer table.
    pub fn new(local_chain: ChainId, owner: AccountId, params: ChannelParams) -> Self {
        Self {
            local_chain,
            owner,
            params,
            peers: PeerTable::new(),
            next_nonce: 0,
        }
    }

    fn require_owner(&self, caller: AccountId) -> Result<(), ChannelError> {
        if caller == self.owner {
            Ok(())
        } else {
            Err(ChannelError::Unauthorized)
        }
    }

    /// Establishes or replaces the peer link for `chain`. Owner-only.
    pub fn set_peer(
        &mut self,
        caller: AccountId,
        chain: ChainId,
        remote: AccountId,
    ) -> Result<(), ChannelError> {
        self.require_owner(caller)?;
        self.peers.set(chain, remote, self.params.default_fee_bps);

        Ok(())
    }

    /// Updates the admin-fee rate of the link for `chain`. Owner-only.
    pub fn set_fee_rate(
        &mut self,
        caller: AccountId,
        chain: ChainId,
        fee_bps: u32,
    ) -> Result<(), ChannelError> {
        self.require_owner(caller)?;
        if Amount::from(fee_bps) >= BPS_DENOM {
            return Err(ChannelError::FeeRateInvalid(fee_bps));
        }
        self.peers.set_fee(chain, fee_bps)?;

        Ok(())
    }

    /// Builds a priced `Transfer` send of `net` towards `chain`, or fails without assigning a
    /// nonce.
    ///
    /// The caller's `attached` value must cover the grossed-up amount plus the transport's
    /// `native_fee`.
    pub fn prepare_transfer(
        &mut self,
        chain: ChainId,
        recipient: AccountId,
        net: Amount,
        native_fee: Amount,
        attached: Amount,
    ) -> Result<OutboundSend, ChannelError> {
        let link = self.peers.require(chain)?;
        let gross = gross_up(net, link.fee_bps)?;

        let required = gross + native_fee;
        if attached < required {
            return Err(ChannelError::InsufficientValue { required, attached });
        }

        let message = BridgeMessage {
            dest_chain: chain,
            payload: BridgePayload::Transfer {
                recipient,
                amount: net,
            },
            sender_nonce: self.assign_nonce(),
        };
        let payload = message.encode();

        debug!(%chain, %net, %gross, nonce = message.sender_nonce, "transfer send prepared");

        Ok(OutboundSend {
            payload,
            gross,
            admin_fee: gross - net,
            excess: attached - required,
            message,
        })
    }

    /// Builds a `WithdrawRequest` send delivering an already-redeemed principal on `chain`.
    ///
    /// No gross-up applies; the caller only covers the transport's `native_fee`.
    pub fn prepare_withdraw_request(
        &mut self,
        chain: ChainId,
        recipient: AccountId,
        amount: Amount,
        native_fee: Amount,
        attached: Amount,
    ) -> Result<OutboundSend, ChannelError> {
        self.peers.require(chain)?;

        if attached < native_fee {
            return Err(ChannelError::InsufficientValue {
                required: native_fee,
                attached,
            });
        }

        let message = BridgeMessage {
            dest_chain: chain,
            payload: BridgePayload::WithdrawRequest { recipient, amount },
            sender_nonce: self.assign_nonce(),
        };
        let payload = message.encode();

        debug!(%chain, %amount, nonce = message.sender_nonce, "withdraw-request send prepared");

        Ok(OutboundSend {
            payload,
            gross: 0,
            admin_fee: 0,
            excess: attached - native_fee,
            message,
        })
    }

    /// Checks that `proven_peer` is the registered remote for `src_chain`.
    pub fn validate_inbound(
        &self,
        src_chain: ChainId,
        proven_peer: AccountId,
    ) -> Result<(), ChannelError> {
        let link = self.peers.require(src_chain)?;
        if link.remote != proven_peer {
            return Err(ChannelError::UnauthorizedPeer {
                chain: src_chain,
                peer: proven_peer,
            });
        }

        Ok(())
    }

    fn assign_nonce(&mut self) -> Nonce {
        let nonce = self.next_nonce;
        self.next_nonce += 1;
        nonce
    }

    /// The chain this channel lives on.
    pub const fn local_chain(&self) -> ChainId {
        self.local_chain
    }

    /// The channel owner.
    pub const fn owner(&self) -> AccountId {
        self.owner
    }

    /// The registered link for `chain`, if any.
    pub fn peer(&self, chain: ChainId) -> Option<&crate::peers::PeerLink> {
        self.peers.get(chain)
    }

    /// The registered link for `chain`, or [`ChannelError::UnknownPeer`].
    pub fn require_peer(&self, chain: ChainId) -> Result<&crate::peers::PeerLink, ChannelError> {
        self.peers.require(chain)
    }

    /// The nonce the next outbound send will carry.
    pub const fn next_nonce(&self) -> Nonce {
        self.next_nonce
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ETH: Amount = 1_000_000_000_000_000_000;

    fn addr(byte: u8) -> AccountId {
        AccountId::new([byte; 32])
    }

    fn test_channel() -> BridgeChannel {
        let mut channel = BridgeChannel::new(ChainId(1), addr(0xaa), ChannelParams::default());
        channel.set_peer(addr(0xaa), ChainId(2), addr(0xbb)).unwrap();
        channel
    }

    #[test]
    fn test_gross_up_round_trip() {
        // 1e18 * 100000 / 99700
        let gross = gross_up(ETH, 300).unwrap();
        assert_eq!(gross, 1_003_009_027_081_243_731);

        // deducting the admin fee from the gross leaves exactly the net
        let admin_fee = gross - ETH;
        assert_eq!(gross - admin_fee, ETH);

        assert_eq!(gross_up(ETH, 0).unwrap(), ETH);
    }

    #[test]
    fn test_gross_up_rejects_confiscatory_rates() {
        assert!(matches!(
            gross_up(ETH, 100_000),
            Err(ChannelError::FeeRateInvalid(100_000))
        ));
        assert!(matches!(
            gross_up(ETH, 100_001),
            Err(ChannelError::FeeRateInvalid(_))
        ));
    }

    #[test]
    fn test_prepare_transfer_value_boundary() {
        let mut channel = test_channel();
        let gross = gross_up(ETH, 300).unwrap();
        let native_fee = 5_000;

        let err = channel
            .prepare_transfer(ChainId(2), addr(1), ETH, native_fee, gross + native_fee - 1)
            .unwrap_err();
        assert!(matches!(err, ChannelError::InsufficientValue { .. }));
        // a failed prepare must not burn a nonce
        assert_eq!(channel.next_nonce(), 0);

        let send = channel
            .prepare_transfer(ChainId(2), addr(1), ETH, native_fee, gross + native_fee)
            .unwrap();
        assert_eq!(send.gross, gross);
        assert_eq!(send.admin_fee, gross - ETH);
        assert_eq!(send.excess, 0);
        assert_eq!(send.message.sender_nonce, 0);
        assert_eq!(channel.next_nonce(), 1);
    }

    #[test]
    fn test_nonces_are_unique_and_increasing() {
        let mut channel = test_channel();

        let first = channel
            .prepare_transfer(ChainId(2), addr(1), ETH, 0, 2 * ETH)
            .unwrap();
        let second = channel
            .prepare_withdraw_request(ChainId(2), addr(1), ETH, 0, 0)
            .unwrap();

        assert_eq!(first.message.sender_nonce, 0);
        assert_eq!(second.message.sender_nonce, 1);
    }

    #[test]
    fn test_send_to_unknown_peer() {
        let mut channel = test_channel();
        assert!(matches!(
            channel.prepare_transfer(ChainId(9), addr(1), ETH, 0, 2 * ETH),
            Err(ChannelError::UnknownPeer(ChainId(9)))
        ));
    }

    #[test]
    fn test_admin_ops_are_owner_only() {
        let mut channel = test_channel();
        let intruder = addr(0x66);

        assert!(matches!(
            channel.set_peer(intruder, ChainId(3), addr(1)),
            Err(ChannelError::Unauthorized)
        ));
        assert!(matches!(
            channel.set_fee_rate(intruder, ChainId(2), 500),
            Err(ChannelError::Unauthorized)
        ));
    }

    #[test]
    fn test_rekey_preserves_fee_rate() {
        let mut channel = test_channel();
        let owner = addr(0xaa);

        channel.set_fee_rate(owner, ChainId(2), 500).unwrap();
        channel.set_peer(owner, ChainId(2), addr(0xcc)).unwrap();

        let link = channel.peer(ChainId(2)).unwrap();
        assert_eq!(link.remote, addr(0xcc));
        assert_eq!(link.fee_bps, 500);
    }

    #[test]
    fn test_inbound_peer_validation() {
        let channel = test_channel();

        assert!(channel.validate_inbound(ChainId(2), addr(0xbb)).is_ok());
        assert!(matches!(
            channel.validate_inbound(ChainId(2), addr(0x66)),
            Err(ChannelError::UnauthorizedPeer { .. })
        ));
        assert!(matches!(
            channel.validate_inbound(ChainId(7), addr(0xbb)),
            Err(ChannelError::UnknownPeer(ChainId(7)))
        ));
    }

    #[test]
    fn test_fee_rate_validation() {
        let mut channel = test_channel();
        let owner = addr(0xaa);

        assert!(matches!(
            channel.set_fee_rate(owner, ChainId(2), 100_000),
            Err(ChannelError::FeeRateInvalid(100_000))
        ));
        assert!(matches!(
            channel.set_fee_rate(owner, ChainId(9), 500),
            Err(ChannelError::UnknownPeer(ChainId(9)))
        ));
    }
}
