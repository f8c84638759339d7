use super::{mac, CompressionContext, Config, Packet};
use crate::frame::{attr, ByteFrame};
use crate::wire::{
    Ieee802154Address, Ieee802154FrameType, Ieee802154FrameVersion, Ieee802154Pan,
    Ieee802154Repr,
};
use crate::Result;

/// What a received frame turned out to carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// A beacon, acknowledgement or MAC command frame.
    Control(Ieee802154FrameType),
    /// A data frame with nothing for the IPv6 layer: no 6LoWPAN payload,
    /// a secured payload, or a frame for another PAN.
    Empty,
    /// A decompressed IPv6 packet.
    Ipv6(Packet),
}

/// An IEEE 802.15.4 interface running 6LoWPAN.
///
/// The interface holds the link-layer identity of the node and the MAC
/// sequence number of outgoing frames. The context table is passed in on
/// every call so it can be shared between interfaces and updated in between.
#[derive(Debug)]
pub struct Interface {
    config: Config,
    pan_id: Option<Ieee802154Pan>,
    hardware_addr: Ieee802154Address,
    sequence_number: u8,
}

impl Interface {
    /// Create an interface.
    ///
    /// With `pan_id` set, data frames addressed to other PANs are dropped;
    /// with `None` frames from every PAN are accepted.
    pub fn new(
        config: Config,
        pan_id: Option<Ieee802154Pan>,
        hardware_addr: Ieee802154Address,
    ) -> Interface {
        Interface {
            config,
            pan_id,
            hardware_addr,
            sequence_number: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pan_id(&self) -> Option<Ieee802154Pan> {
        self.pan_id
    }

    pub fn hardware_addr(&self) -> Ieee802154Address {
        self.hardware_addr
    }

    /// Process one received frame.
    ///
    /// The frame is classified in place (see [mac::parse]); for 6LoWPAN data
    /// frames the first dispatch byte is recorded as the `6lowpan.dispatch`
    /// attribute before decompression.
    pub fn receive(
        &mut self,
        frame: &mut ByteFrame,
        contexts: &CompressionContext,
    ) -> Result<Received> {
        let parsed = mac::parse(frame, &self.config)?;
        let repr = parsed.repr;

        if repr.frame_type != Ieee802154FrameType::Data {
            return Ok(Received::Control(repr.frame_type));
        }

        if repr.security_enabled {
            net_debug!("iface: dropping secured frame from {:?}", repr.src_addr);
            return Ok(Received::Empty);
        }

        // Frames for the broadcast PAN are always accepted.
        if self.pan_id.is_some()
            && repr.dst_pan_id != self.pan_id
            && repr.dst_pan_id != Some(Ieee802154Pan::BROADCAST)
        {
            net_debug!("iface: dropping {} because not our PAN id", repr);
            return Ok(Received::Empty);
        }

        let dispatch = match parsed.payload(frame) {
            [dispatch, _, ..] => *dispatch,
            _ => return Ok(Received::Empty),
        };
        frame.set_attribute(attr::DISPATCH, dispatch as u32)?;

        let packet = contexts.decompress(frame, parsed.header_len, &repr, &self.config)?;
        net_trace!("iface: received {}", packet.header());
        Ok(Received::Ipv6(packet))
    }

    /// Compress `packet` and frame it for `dst_addr`.
    ///
    /// Unicast frames request an acknowledgement. Every call consumes one
    /// sequence number, even when it fails.
    pub fn transmit(
        &mut self,
        packet: &Packet,
        dst_addr: Ieee802154Address,
        contexts: &CompressionContext,
    ) -> Result<ByteFrame> {
        let pan_id = self.pan_id.unwrap_or(Ieee802154Pan::BROADCAST);
        let repr = Ieee802154Repr {
            frame_type: Ieee802154FrameType::Data,
            security_enabled: false,
            frame_pending: false,
            ack_request: dst_addr.is_unicast(),
            sequence_number: Some(self.next_sequence_number()),
            pan_id_compression: true,
            frame_version: Ieee802154FrameVersion::Ieee802154_2003,
            dst_pan_id: Some(pan_id),
            dst_addr: Some(dst_addr),
            src_pan_id: Some(pan_id),
            src_addr: Some(self.hardware_addr),
        };

        let payload = contexts.compress(
            packet,
            Some(self.hardware_addr),
            Some(dst_addr),
            &self.config,
        )?;
        net_trace!("iface: sending {} bytes to {}", payload.len(), dst_addr);
        mac::emit(&repr, payload.as_bytes(), &self.config)
    }

    fn next_sequence_number(&mut self) -> u8 {
        let no = self.sequence_number;
        self.sequence_number = self.sequence_number.wrapping_add(1);
        no
    }
}
