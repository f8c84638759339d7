//! 6LoWPAN HC06 (RFC 6282) compression and decompression of whole packets.
//!
//! Decompression rebuilds the uncompressed IPv6 datagram in a fresh frame and
//! hands it to [Packet::parse], so compressed and uncompressed packets go
//! through the same chain parser and checksum checks.

use super::chain::IpPayload;
use super::{Config, Packet};
use crate::frame::ByteFrame;
use crate::wire::{
    IpProtocol, Ieee802154Address, Ieee802154Repr, Ipv6Packet, Ipv6Repr, SixlowpanAddressContext,
    SixlowpanIphcPacket, SixlowpanIphcRepr, SixlowpanNextHeader, SixlowpanNhcPacket,
    SixlowpanPacket, SixlowpanUdpNhcPacket, SixlowpanUdpNhcRepr, UdpPacket, IPV6_HEADER_LEN,
    UDP_HEADER_LEN,
};
use crate::wire::ieee802154::FCS_LEN;
use crate::{Error, Result};

/// Move error offsets from the start of the 6LoWPAN header to the start of
/// the frame.
fn at(offset: usize, err: Error) -> Error {
    match err {
        Error::MalformedFrame { offset: inner } => Error::MalformedFrame {
            offset: offset + inner,
        },
        Error::OutOfRange { offset: inner, len } => Error::OutOfRange {
            offset: offset + inner,
            len: offset + len,
        },
        err => err,
    }
}

/// Decompress the 6LoWPAN payload of `frame`, starting at `header_offset`.
///
/// `ll_repr` supplies the link-layer addresses elided interface identifiers
/// are derived from. Errors in the 6LoWPAN headers carry offsets from the
/// start of the frame; errors in the rebuilt datagram carry offsets from the
/// start of its IPv6 header.
pub(crate) fn decompress(
    frame: &ByteFrame,
    header_offset: usize,
    ll_repr: &Ieee802154Repr,
    contexts: &[Option<SixlowpanAddressContext>],
    config: &Config,
) -> Result<Packet> {
    let bytes = frame.as_bytes();
    let end = if config.frame_check_sequence {
        bytes.len().saturating_sub(FCS_LEN)
    } else {
        bytes.len()
    };
    let payload = bytes
        .get(header_offset..end)
        .ok_or(Error::OutOfRange {
            offset: header_offset,
            len: end,
        })?;

    match SixlowpanPacket::dispatch(payload).map_err(|err| at(header_offset, err))? {
        SixlowpanPacket::Ipv6Header => {
            let ipv6 = &payload[SixlowpanPacket::Ipv6Header.dispatch_len()..];
            net_trace!("hc06: uncompressed IPv6, {} bytes", ipv6.len());
            Packet::parse(ByteFrame::from_bytes(ipv6), config)
        }
        SixlowpanPacket::IphcHeader => {
            let ipv6 = decompress_iphc(payload, ll_repr, contexts)
                .map_err(|err| at(header_offset, err))?;
            Packet::parse(ipv6, config)
        }
    }
}

/// Rebuild the IPv6 datagram an IPHC header stands for.
fn decompress_iphc(
    payload: &[u8],
    ll_repr: &Ieee802154Repr,
    contexts: &[Option<SixlowpanAddressContext>],
) -> Result<ByteFrame> {
    let iphc = SixlowpanIphcPacket::new_checked(payload)?;
    let iphc_repr = SixlowpanIphcRepr::parse(&iphc, ll_repr.src_addr, ll_repr.dst_addr, contexts)?;
    net_trace!("hc06: {}", iphc_repr);

    // Reserve room for the IPv6 header; it is written once the payload
    // length is known.
    let mut out = ByteFrame::new();
    out.extend_zeroed(IPV6_HEADER_LEN);

    let rest = iphc.payload();
    let next_header = match iphc_repr.next_header {
        SixlowpanNextHeader::Compressed => match SixlowpanNhcPacket::dispatch(rest)
            .map_err(|err| at(iphc.header_len(), err))?
        {
            SixlowpanNhcPacket::ExtHeader => {
                net_debug!("hc06: compressed extension headers are not supported");
                return Err(Error::UnknownDispatch(rest[0]));
            }
            SixlowpanNhcPacket::UdpHeader => {
                decompress_udp(rest, &iphc_repr, &mut out)
                    .map_err(|err| at(iphc.header_len(), err))?;
                IpProtocol::Udp
            }
        },
        SixlowpanNextHeader::Uncompressed(next_header) => {
            out.extend_from_slice(rest);
            next_header
        }
    };

    let payload_len = out.len() - IPV6_HEADER_LEN;
    if payload_len > u16::MAX as usize {
        return Err(Error::MalformedFrame {
            offset: iphc.header_len(),
        });
    }

    let ipv6_repr = Ipv6Repr {
        src_addr: iphc_repr.src_addr,
        dst_addr: iphc_repr.dst_addr,
        next_header,
        payload_len,
        hop_limit: iphc_repr.hop_limit,
        traffic_class: iphc_repr.traffic_class,
        flow_label: iphc_repr.flow_label,
    };
    ipv6_repr.emit(&mut Ipv6Packet::new_unchecked(
        &mut out.as_bytes_mut()[..IPV6_HEADER_LEN],
    ));

    Ok(out)
}

/// Append the UDP datagram a LOWPAN_NHC UDP header stands for to `out`.
fn decompress_udp(
    data: &[u8],
    iphc_repr: &SixlowpanIphcRepr,
    out: &mut ByteFrame,
) -> Result<()> {
    let udp_packet = SixlowpanUdpNhcPacket::new_checked(data)?;
    let udp_repr = SixlowpanUdpNhcRepr::parse(&udp_packet)?;
    let payload = udp_packet.payload();

    let checksum = match udp_packet.checksum() {
        Some(checksum) => checksum,
        None => udp_repr.checksum(&iphc_repr.src_addr, &iphc_repr.dst_addr, payload),
    };

    let buffer = out.extend_zeroed(UDP_HEADER_LEN + payload.len());
    let mut packet = UdpPacket::new_unchecked(buffer);
    udp_repr.emit_header(&mut packet, payload.len());
    packet.set_checksum(checksum);
    packet.payload_mut().copy_from_slice(payload);

    Ok(())
}

/// Compress `packet` into a 6LoWPAN payload.
///
/// `ll_src_addr` and `ll_dst_addr` are the link-layer addresses the frame
/// will carry; interface identifiers derived from them are elided.
pub(crate) fn compress(
    packet: &Packet,
    ll_src_addr: Option<Ieee802154Address>,
    ll_dst_addr: Option<Ieee802154Address>,
    contexts: &[Option<SixlowpanAddressContext>],
    config: &Config,
) -> Result<ByteFrame> {
    let header = packet.header();
    let chain = packet.payload();

    let udp = match chain {
        Some(IpPayload::Udp { repr, payload }) if config.compress_udp => {
            Some((SixlowpanUdpNhcRepr(*repr), payload.as_slice()))
        }
        _ => None,
    };

    let next_header = match (&udp, chain) {
        (Some(_), _) => SixlowpanNextHeader::Compressed,
        (None, Some(chain)) => SixlowpanNextHeader::Uncompressed(chain.dispatch()),
        (None, None) => SixlowpanNextHeader::Uncompressed(IpProtocol::Ipv6NoNxt),
    };

    let iphc_repr = SixlowpanIphcRepr {
        src_addr: header.src_addr,
        ll_src_addr,
        dst_addr: header.dst_addr,
        ll_dst_addr,
        next_header,
        hop_limit: header.hop_limit,
        traffic_class: header.traffic_class,
        flow_label: header.flow_label,
    };

    let iphc_len = iphc_repr.buffer_len(contexts);
    let body_len = match (&udp, chain) {
        (Some((udp_repr, payload)), _) => {
            udp_repr.header_len(config.elide_udp_checksum) + payload.len()
        }
        (None, chain) => chain.map_or(0, IpPayload::buffer_len),
    };
    if body_len > u16::MAX as usize {
        return Err(Error::MalformedFrame { offset: 4 });
    }
    if let Some(chain) = chain {
        chain.check_emit(IPV6_HEADER_LEN)?;
    }

    let mut frame = ByteFrame::new();
    let buffer = frame.extend_zeroed(iphc_len + body_len);
    let (iphc_buffer, body) = buffer.split_at_mut(iphc_len);
    iphc_repr.emit(&mut SixlowpanIphcPacket::new_unchecked(iphc_buffer), contexts);

    match (udp, chain) {
        (Some((udp_repr, payload)), _) => udp_repr.emit(
            &mut SixlowpanUdpNhcPacket::new_unchecked(body),
            &header.src_addr,
            &header.dst_addr,
            |buf| buf.copy_from_slice(payload),
            config.elide_udp_checksum,
            &config.checksum,
        ),
        (None, Some(chain)) => {
            chain.emit(body, &header.src_addr, &header.dst_addr, &config.checksum)
        }
        (None, None) => (),
    }

    net_trace!(
        "hc06: compressed {} bytes into {}",
        IPV6_HEADER_LEN + header.payload_len,
        frame.len()
    );
    Ok(frame)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::wire::ipv6::test::{MOCK_IP_ADDR_1, MOCK_IP_ADDR_2};
    use crate::wire::{
        Icmpv6Repr, Ieee802154FrameType, Ieee802154FrameVersion, Ieee802154Pan, Ipv6Address,
        UdpRepr,
    };

    const LL_1: Ieee802154Address =
        Ieee802154Address::Extended([0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01]);
    const LL_2: Ieee802154Address =
        Ieee802154Address::Extended([0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02]);

    static UDP_PACKET: [u8; 52] = [
        0x60, 0x00, 0x00, 0x00, 0x00, 0x0c, 0x11, 0x40, 0xfe, 0x80, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0xfe, 0x80, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02, 0xf0, 0xb0,
        0x16, 0x33, 0x00, 0x0c, 0x37, 0x27, 0x61, 0x62, 0x63, 0x64,
    ];

    fn ll_repr() -> Ieee802154Repr {
        Ieee802154Repr {
            frame_type: Ieee802154FrameType::Data,
            security_enabled: false,
            frame_pending: false,
            ack_request: false,
            sequence_number: Some(1),
            pan_id_compression: true,
            frame_version: Ieee802154FrameVersion::Ieee802154_2006,
            dst_pan_id: Some(Ieee802154Pan(0xabcd)),
            dst_addr: Some(LL_2),
            src_pan_id: None,
            src_addr: Some(LL_1),
        }
    }

    fn udp_packet() -> Packet {
        let mut packet = Packet::new(Ipv6Repr {
            src_addr: MOCK_IP_ADDR_1,
            dst_addr: MOCK_IP_ADDR_2,
            next_header: IpProtocol::Udp,
            payload_len: 0,
            hop_limit: 64,
            traffic_class: 0,
            flow_label: 0,
        });
        packet.set_payload(IpPayload::Udp {
            repr: UdpRepr {
                src_port: 61616,
                dst_port: 5683,
            },
            payload: b"abcd".to_vec(),
        });
        packet
    }

    fn decompress_bytes(bytes: &[u8], config: &Config) -> Result<Packet> {
        decompress(&ByteFrame::from_bytes(bytes), 0, &ll_repr(), &[], config)
    }

    #[test]
    fn decompress_udp_inline_checksum() {
        let bytes = [
            0x7e, 0x33, 0xf0, 0xf0, 0xb0, 0x16, 0x33, 0x37, 0x27, 0x61, 0x62, 0x63, 0x64,
        ];
        let packet = decompress_bytes(&bytes, &Config::default()).unwrap();
        assert_eq!(packet.frame().as_bytes(), &UDP_PACKET[..]);
        assert!(packet.diagnostics().is_empty());
    }

    #[test]
    fn decompress_udp_elided_checksum() {
        let bytes = [0x7e, 0x33, 0xf6, 0xb0, 0x16, 0x33, 0x61, 0x62, 0x63, 0x64];
        let packet = decompress_bytes(&bytes, &Config::default()).unwrap();
        assert_eq!(packet.frame().as_bytes(), &UDP_PACKET[..]);
    }

    #[test]
    fn decompress_uncompressed_ipv6() {
        let mut bytes = vec![0x41];
        bytes.extend_from_slice(&UDP_PACKET);
        let packet = decompress_bytes(&bytes, &Config::default()).unwrap();
        assert_eq!(packet.payload(), udp_packet().payload());
    }

    #[test]
    fn decompress_skips_mac_header_and_fcs() {
        let mut bytes = vec![0xaa, 0xbb, 0xcc];
        bytes.extend_from_slice(&[0x7e, 0x33, 0xf6, 0xb0, 0x16, 0x33, 0x61, 0x62, 0x63, 0x64]);
        bytes.extend_from_slice(&[0x12, 0x34]);
        let mut config = Config::default();
        config.frame_check_sequence = true;
        let packet =
            decompress(&ByteFrame::from_bytes(&bytes), 3, &ll_repr(), &[], &config).unwrap();
        assert_eq!(packet.frame().as_bytes(), &UDP_PACKET[..]);
    }

    #[test]
    fn decompress_errors() {
        let config = Config::default();
        // Fragment header.
        assert_eq!(
            decompress_bytes(&[0xc0, 0x00, 0x00, 0x00], &config).err(),
            Some(Error::UnknownDispatch(0xc0))
        );
        // NHC extension header.
        assert_eq!(
            decompress_bytes(&[0x7e, 0x33, 0xe0, 0x3a, 0x00], &config).err(),
            Some(Error::UnknownDispatch(0xe0))
        );
        // Truncated inline source address.
        assert_eq!(
            decompress_bytes(&[0x7a, 0x00, 0x11, 0xfe, 0x80], &config).err(),
            Some(Error::MalformedFrame { offset: 5 })
        );
        // Stateful source address with no context installed.
        let contexts = [None; 16];
        let frame = ByteFrame::from_bytes(&[0x7b, 0xf3, 0x30, 0x11]);
        assert_eq!(
            decompress(&frame, 0, &ll_repr(), &contexts, &config).err(),
            Some(Error::UnknownContext(3))
        );
        assert_eq!(
            decompress(&frame, 0, &ll_repr(), &[], &config).err(),
            Some(Error::ContextIndexOutOfRange(3))
        );
        assert_eq!(
            decompress(&ByteFrame::from_bytes(&[0x7e]), 4, &ll_repr(), &[], &config).err(),
            Some(Error::OutOfRange { offset: 4, len: 1 })
        );
    }

    #[test]
    fn compress_udp() {
        let frame = compress(&udp_packet(), Some(LL_1), Some(LL_2), &[], &Config::default())
            .unwrap();
        assert_eq!(
            frame.as_bytes(),
            &[0x7e, 0x33, 0xf2, 0xb0, 0x16, 0x33, 0x37, 0x27, 0x61, 0x62, 0x63, 0x64]
        );

        let mut config = Config::default();
        config.elide_udp_checksum = true;
        let frame = compress(&udp_packet(), Some(LL_1), Some(LL_2), &[], &config).unwrap();
        assert_eq!(
            frame.as_bytes(),
            &[0x7e, 0x33, 0xf6, 0xb0, 0x16, 0x33, 0x61, 0x62, 0x63, 0x64]
        );
    }

    #[test]
    fn compress_udp_uncompressed_header() {
        let mut config = Config::default();
        config.compress_udp = false;
        let frame = compress(&udp_packet(), Some(LL_1), Some(LL_2), &[], &config).unwrap();
        assert_eq!(&frame.as_bytes()[..3], &[0x7a, 0x33, 0x11]);
        assert_eq!(&frame.as_bytes()[3..], &UDP_PACKET[40..]);
    }

    #[test]
    fn compress_rejects_oversized_hop_by_hop() {
        let mut packet = Packet::new(Ipv6Repr {
            src_addr: MOCK_IP_ADDR_1,
            dst_addr: MOCK_IP_ADDR_2,
            next_header: IpProtocol::HopByHop,
            payload_len: 0,
            hop_limit: 64,
            traffic_class: 0,
            flow_label: 0,
        });
        packet.set_payload(IpPayload::HopByHop {
            options: vec![0; 2100],
            next: None,
        });
        assert_eq!(
            compress(&packet, Some(LL_1), Some(LL_2), &[], &Config::default()),
            Err(Error::MalformedFrame {
                offset: IPV6_HEADER_LEN + 1
            })
        );
    }

    #[test]
    fn compress_round_trip_with_context() {
        let prefix = Ipv6Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0);
        let mut contexts = [None; 16];
        contexts[2] = Some(SixlowpanAddressContext::new(prefix, 64, true).unwrap());

        let mut packet = Packet::new(Ipv6Repr {
            src_addr: Ipv6Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1),
            dst_addr: Ipv6Address::new(0xff02, 0, 0, 0, 0, 0, 0, 1),
            next_header: IpProtocol::Icmpv6,
            payload_len: 0,
            hop_limit: 255,
            traffic_class: 0,
            flow_label: 0,
        });
        packet.set_payload(IpPayload::Icmpv6 {
            repr: Icmpv6Repr::EchoRequest {
                ident: 1,
                seq_no: 1,
            },
            payload: b"ping".to_vec(),
        });

        let compressed = compress(&packet, None, None, &contexts, &Config::default()).unwrap();
        let decompressed =
            decompress(&compressed, 0, &ll_repr(), &contexts, &Config::default()).unwrap();
        assert_eq!(decompressed.header().src_addr, packet.header().src_addr);
        assert_eq!(decompressed.header().dst_addr, packet.header().dst_addr);
        assert_eq!(decompressed.header().hop_limit, 255);
        assert_eq!(decompressed.payload(), packet.payload());
        assert!(decompressed.diagnostics().is_empty());
    }
}
