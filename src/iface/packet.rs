//! An owned IPv6 packet with its decoded payload chain.

use core::fmt;

use super::chain::{self, Cursor, IpPayload};
use super::{ChecksumCapabilities, Config};
use crate::config::PACKET_MAX_DIAGNOSTIC_COUNT;
use crate::frame::ByteFrame;
use crate::wire::checksum;
use crate::wire::pretty_print::PrettyIndent;
use crate::wire::{IpProtocol, Ipv6Address, Ipv6Packet, Ipv6Repr, IPV6_HEADER_LEN};
use crate::{Error, Result};

/// A problem that was noticed while decoding, but did not stop it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Diagnostic {
    /// Offset from the start of the IPv6 header.
    pub offset: usize,
    pub error: Error,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} at offset {}", self.error, self.offset)
    }
}

pub(crate) type Diagnostics = heapless::Vec<Diagnostic, PACKET_MAX_DIAGNOSTIC_COUNT>;

/// Keep `diagnostic`, or only log it when the list is full.
pub(crate) fn record(diagnostics: &mut Diagnostics, diagnostic: Diagnostic) {
    net_debug!("packet: {}", diagnostic);
    if diagnostics.push(diagnostic).is_err() {
        net_trace!("packet: too many diagnostics, dropped one");
    }
}

/// An IPv6 packet.
///
/// A received packet keeps the frame it was decoded from; an outgoing one is
/// built from a header and a payload chain and written out with
/// [serialize](#method.serialize).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    frame: ByteFrame,
    version: u8,
    header: Ipv6Repr,
    cursor: usize,
    payload: Option<IpPayload>,
    diagnostics: Diagnostics,
}

impl Packet {
    /// Decode an uncompressed IPv6 packet and its payload chain.
    ///
    /// Bytes past the declared payload length are ignored. Checksum
    /// mismatches, unknown next headers and (unless `config.strict_version`
    /// is set) a wrong version are kept as [diagnostics](#method.diagnostics).
    pub fn parse(frame: ByteFrame, config: &Config) -> Result<Packet> {
        let mut diagnostics = Diagnostics::new();

        let (version, header, payload, cursor) = {
            let packet = Ipv6Packet::new_checked(frame.as_bytes())?;
            let version = packet.version();
            if version != 6 {
                if config.strict_version {
                    return Err(Error::BadVersion(version));
                }
                record(
                    &mut diagnostics,
                    Diagnostic {
                        offset: 0,
                        error: Error::BadVersion(version),
                    },
                );
            }
            let header = Ipv6Repr::parse_lenient(&packet)?;

            let mut cursor = Cursor {
                src_addr: header.src_addr,
                dst_addr: header.dst_addr,
                checksum_caps: &config.checksum,
                diagnostics: &mut diagnostics,
                offset: IPV6_HEADER_LEN,
            };
            let payload = chain::parse(header.next_header, packet.payload(), &mut cursor)?;
            (version, header, payload, cursor.offset)
        };

        Ok(Packet {
            frame,
            version,
            header,
            cursor,
            payload: Some(payload),
            diagnostics,
        })
    }

    /// Create an outgoing packet with no payload.
    pub fn new(header: Ipv6Repr) -> Packet {
        Packet {
            frame: ByteFrame::new(),
            version: 6,
            header: Ipv6Repr {
                next_header: IpProtocol::Ipv6NoNxt,
                payload_len: 0,
                ..header
            },
            cursor: IPV6_HEADER_LEN,
            payload: None,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Replace the payload chain, updating the next header and payload length.
    pub fn set_payload(&mut self, payload: IpPayload) {
        self.header.next_header = payload.dispatch();
        self.header.payload_len = payload.buffer_len();
        self.payload = Some(payload);
    }

    /// Write the packet into `out`, replacing its contents, and return the
    /// number of bytes written.
    ///
    /// A chain whose segments do not fit their length fields is rejected
    /// with [Error::MalformedFrame] and `out` is left untouched.
    ///
    /// Transport checksums are computed as `checksum_caps` asks. The payload
    /// length and next header fields are taken from the chain, both in the
    /// output and in this packet's header.
    pub fn serialize(
        &mut self,
        out: &mut ByteFrame,
        checksum_caps: &ChecksumCapabilities,
    ) -> Result<usize> {
        let payload_len = self.payload.as_ref().map_or(0, IpPayload::buffer_len);
        let next_header = self
            .payload
            .as_ref()
            .map_or(IpProtocol::Ipv6NoNxt, IpPayload::dispatch);
        if payload_len > u16::MAX as usize {
            return Err(Error::MalformedFrame { offset: 4 });
        }
        if let Some(payload) = &self.payload {
            payload.check_emit(IPV6_HEADER_LEN)?;
        }

        out.truncate(0);
        let buffer = out.extend_zeroed(IPV6_HEADER_LEN + payload_len);
        let (header, rest) = buffer.split_at_mut(IPV6_HEADER_LEN);
        let mut packet = Ipv6Packet::new_unchecked(header);
        self.header.emit(&mut packet);
        if let Some(payload) = &self.payload {
            payload.emit(
                rest,
                &self.header.src_addr,
                &self.header.dst_addr,
                checksum_caps,
            );
        }

        packet.set_payload_len(payload_len as u16);
        packet.set_next_header(next_header);
        self.header.payload_len = payload_len;
        self.header.next_header = next_header;
        self.version = 6;

        Ok(IPV6_HEADER_LEN + payload_len)
    }

    /// Return the pseudo-header sum for the upper layer announced by
    /// `next_header`, over this packet's addresses.
    ///
    /// The length is the payload length less the extension headers in front
    /// of that upper layer.
    pub fn upper_layer_checksum(&self, next_header: IpProtocol) -> u32 {
        let preceding: usize = self
            .payload
            .iter()
            .flat_map(|payload| payload.iter())
            .take_while(|node| node.dispatch() != next_header)
            .map(IpPayload::header_len)
            .sum();
        let length = self.header.payload_len.saturating_sub(preceding);
        checksum::pseudo_header_sum(
            &self.header.src_addr,
            &self.header.dst_addr,
            next_header,
            length as u32,
        )
    }

    /// Query whether `addr` is in `fe80::/10`.
    pub fn is_link_local(addr: &Ipv6Address) -> bool {
        let octets = addr.octets();
        octets[0] == 0xfe && (octets[1] & 0xc0) == 0x80
    }

    /// Query whether `addr` is in `ff00::/8`.
    pub fn is_multicast(addr: &Ipv6Address) -> bool {
        addr.octets()[0] == 0xff
    }

    /// Return the version field as received. Outgoing packets are version 6.
    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn header(&self) -> &Ipv6Repr {
        &self.header
    }

    pub fn payload(&self) -> Option<&IpPayload> {
        self.payload.as_ref()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Return the offset just past the decoded chain.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Return the frame a received packet was decoded from.
    pub fn frame(&self) -> &ByteFrame {
        &self.frame
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut indent = PrettyIndent::new("");
        write!(f, "{indent}{}", self.header)?;
        for node in self.payload.iter().flat_map(|payload| payload.iter()) {
            indent.increase(f)?;
            write!(f, "{indent}{node}")?;
        }
        for diagnostic in &self.diagnostics {
            write!(f, "\n! {diagnostic}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::wire::ipv6::test::{MOCK_IP_ADDR_1, MOCK_IP_ADDR_2};
    use crate::wire::{Icmpv6Repr, TcpFlags, TcpPacket, TcpRepr, TcpSeqNumber, UdpRepr};

    static UDP_PACKET: [u8; 52] = [
        0x60, 0x00, 0x00, 0x00, 0x00, 0x0c, 0x11, 0x40, 0xfe, 0x80, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0xfe, 0x80, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02, 0xf0, 0xb0,
        0x16, 0x33, 0x00, 0x0c, 0x37, 0x27, 0x61, 0x62, 0x63, 0x64,
    ];

    fn header(next_header: IpProtocol) -> Ipv6Repr {
        Ipv6Repr {
            src_addr: MOCK_IP_ADDR_1,
            dst_addr: MOCK_IP_ADDR_2,
            next_header,
            payload_len: 0,
            hop_limit: 64,
            traffic_class: 0,
            flow_label: 0,
        }
    }

    fn udp_payload() -> IpPayload {
        IpPayload::Udp {
            repr: UdpRepr {
                src_port: 61616,
                dst_port: 5683,
            },
            payload: b"abcd".to_vec(),
        }
    }

    #[test]
    fn parse_udp() {
        let packet = Packet::parse(ByteFrame::from_bytes(&UDP_PACKET), &Config::default()).unwrap();
        assert_eq!(packet.version(), 6);
        assert_eq!(packet.header().payload_len, 12);
        assert_eq!(packet.header().next_header, IpProtocol::Udp);
        assert_eq!(packet.payload(), Some(&udp_payload()));
        assert_eq!(packet.cursor(), UDP_PACKET.len());
        assert!(packet.diagnostics().is_empty());
    }

    #[test]
    fn parse_ignores_trailing_bytes() {
        let mut bytes = UDP_PACKET.to_vec();
        bytes.extend_from_slice(&[0xde, 0xad]);
        let packet = Packet::parse(ByteFrame::from_bytes(&bytes), &Config::default()).unwrap();
        assert_eq!(packet.payload(), Some(&udp_payload()));
        assert_eq!(packet.cursor(), UDP_PACKET.len());
    }

    #[test]
    fn parse_truncated() {
        assert_eq!(
            Packet::parse(ByteFrame::from_bytes(&UDP_PACKET[..20]), &Config::default()),
            Err(Error::OutOfRange { offset: 39, len: 20 })
        );
        assert_eq!(
            Packet::parse(ByteFrame::from_bytes(&UDP_PACKET[..50]), &Config::default()),
            Err(Error::MalformedFrame { offset: 4 })
        );
    }

    #[test]
    fn parse_bad_version() {
        let mut bytes = UDP_PACKET;
        bytes[0] = 0x40;
        assert_eq!(
            Packet::parse(ByteFrame::from_bytes(&bytes), &Config::default()),
            Err(Error::BadVersion(4))
        );

        let mut config = Config::default();
        config.strict_version = false;
        let packet = Packet::parse(ByteFrame::from_bytes(&bytes), &config).unwrap();
        assert_eq!(packet.version(), 4);
        assert_eq!(packet.payload(), Some(&udp_payload()));
        assert_eq!(
            packet.diagnostics(),
            &[Diagnostic {
                offset: 0,
                error: Error::BadVersion(4)
            }]
        );
    }

    #[test]
    fn diagnostics_are_bounded() {
        let mut diagnostics = Diagnostics::new();
        for offset in 0..PACKET_MAX_DIAGNOSTIC_COUNT + 2 {
            record(
                &mut diagnostics,
                Diagnostic {
                    offset,
                    error: Error::UnknownDispatch(0),
                },
            );
        }
        assert_eq!(diagnostics.len(), PACKET_MAX_DIAGNOSTIC_COUNT);
        assert_eq!(diagnostics[0].offset, 0);
    }

    #[test]
    fn serialize_udp() {
        let mut packet = Packet::new(header(IpProtocol::Udp));
        packet.set_payload(udp_payload());
        assert_eq!(packet.header().payload_len, 12);

        let mut out = ByteFrame::from_bytes(&[0xff; 100]);
        let len = packet
            .serialize(&mut out, &ChecksumCapabilities::default())
            .unwrap();
        assert_eq!(len, UDP_PACKET.len());
        assert_eq!(out.as_bytes(), &UDP_PACKET[..]);
    }

    #[test]
    fn serialize_without_payload() {
        let mut packet = Packet::new(header(IpProtocol::Udp));
        let mut out = ByteFrame::new();
        assert_eq!(
            packet.serialize(&mut out, &ChecksumCapabilities::default()),
            Ok(IPV6_HEADER_LEN)
        );
        assert_eq!(out.as_bytes()[6], 0x3b);
        assert_eq!(&out.as_bytes()[4..6], &[0x00, 0x00]);
    }

    #[test]
    fn echo_request_round_trip() {
        let mut packet = Packet::new(header(IpProtocol::Icmpv6));
        packet.set_payload(IpPayload::Icmpv6 {
            repr: Icmpv6Repr::EchoRequest {
                ident: 1,
                seq_no: 1,
            },
            payload: b"ping".to_vec(),
        });

        let mut out = ByteFrame::new();
        packet
            .serialize(&mut out, &ChecksumCapabilities::default())
            .unwrap();
        assert_eq!(&out.as_bytes()[42..44], &[0xa3, 0xe1]);

        let parsed = Packet::parse(out, &Config::default()).unwrap();
        assert_eq!(parsed.payload(), packet.payload());
        assert!(parsed.diagnostics().is_empty());
    }

    #[test]
    fn tcp_syn_round_trip() {
        let repr = TcpRepr {
            src_port: 12345,
            dst_port: 80,
            flags: TcpFlags::SYN,
            seq_number: TcpSeqNumber(1),
            ack_number: TcpSeqNumber(0),
            window_len: 4096,
            urgent_at: 0,
            max_seg_size: None,
            window_scale: None,
            sack_permitted: false,
        };
        let mut packet = Packet::new(header(IpProtocol::Tcp));
        packet.set_payload(IpPayload::Tcp {
            repr,
            options: None,
            payload: vec![],
        });

        let mut out = ByteFrame::new();
        packet
            .serialize(&mut out, &ChecksumCapabilities::default())
            .unwrap();
        assert_eq!(
            &out.as_bytes()[40..],
            &[
                0x30, 0x39, 0x00, 0x50, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x60,
                0x02, 0x10, 0x00, 0x60, 0x1f, 0x00, 0x00, 0x02, 0x04, 0x00, 0x2d,
            ]
        );

        let parsed = Packet::parse(out, &Config::default()).unwrap();
        assert_eq!(
            parsed.payload(),
            Some(&IpPayload::Tcp {
                repr: TcpRepr {
                    max_seg_size: Some(45),
                    ..repr
                },
                options: Some(vec![0x02, 0x04, 0x00, 0x2d]),
                payload: vec![],
            })
        );
    }

    #[test]
    fn tcp_options_survive_reserialize() {
        // ACK with NOP, NOP, timestamps and "hi".
        let mut segment = vec![
            0x30, 0x39, 0x00, 0x50, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x20, 0x80, 0x10,
            0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x01, 0x08, 0x0a, 0x00, 0x00, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x02, 0x68, 0x69,
        ];
        TcpPacket::new_unchecked(&mut segment).fill_checksum(&MOCK_IP_ADDR_1, &MOCK_IP_ADDR_2);
        let mut bytes = vec![0u8; IPV6_HEADER_LEN];
        Ipv6Repr {
            payload_len: segment.len(),
            ..header(IpProtocol::Tcp)
        }
        .emit(&mut Ipv6Packet::new_unchecked(&mut bytes));
        bytes.extend_from_slice(&segment);

        let mut packet = Packet::parse(ByteFrame::from_bytes(&bytes), &Config::default()).unwrap();
        assert!(packet.diagnostics().is_empty());
        assert_eq!(
            packet.payload().map(IpPayload::buffer_len),
            Some(packet.header().payload_len)
        );

        let mut out = ByteFrame::new();
        let len = packet
            .serialize(&mut out, &ChecksumCapabilities::default())
            .unwrap();
        assert_eq!(len, bytes.len());
        assert_eq!(out.as_bytes(), &bytes[..]);
    }

    #[test]
    fn serialize_rejects_oversized_hop_by_hop() {
        let mut packet = Packet::new(header(IpProtocol::HopByHop));
        packet.set_payload(IpPayload::HopByHop {
            options: vec![0; 2100],
            next: Some(alloc::boxed::Box::new(udp_payload())),
        });

        let mut out = ByteFrame::from_bytes(&[0xffu8; 4]);
        assert_eq!(
            packet.serialize(&mut out, &ChecksumCapabilities::default()),
            Err(Error::MalformedFrame {
                offset: IPV6_HEADER_LEN + 1
            })
        );
        assert_eq!(out.as_bytes(), &[0xffu8; 4][..]);
    }

    #[test]
    fn upper_layer_checksum() {
        let packet = Packet::parse(ByteFrame::from_bytes(&UDP_PACKET), &Config::default()).unwrap();
        let mut segment = UDP_PACKET[40..].to_vec();
        segment[6] = 0;
        segment[7] = 0;
        let sum = checksum::running_sum(packet.upper_layer_checksum(IpProtocol::Udp), &segment);
        assert_eq!(checksum::finalize(sum), 0x3727);

        let mut packet = Packet::new(header(IpProtocol::Udp));
        packet.set_payload(IpPayload::HopByHop {
            options: vec![0x01, 0x04, 0x00, 0x00, 0x00, 0x00],
            next: Some(alloc::boxed::Box::new(udp_payload())),
        });
        assert_eq!(
            packet.upper_layer_checksum(IpProtocol::Udp),
            checksum::pseudo_header_sum(&MOCK_IP_ADDR_1, &MOCK_IP_ADDR_2, IpProtocol::Udp, 12)
        );
    }

    #[test]
    fn address_classes() {
        assert!(Packet::is_link_local(&MOCK_IP_ADDR_1));
        assert!(Packet::is_link_local(&Ipv6Address::new(
            0xfebf, 0, 0, 0, 0, 0, 0, 1
        )));
        assert!(!Packet::is_link_local(&Ipv6Address::new(
            0xfec0, 0, 0, 0, 0, 0, 0, 1
        )));
        assert!(Packet::is_multicast(&Ipv6Address::new(
            0xff02, 0, 0, 0, 0, 0, 0, 1
        )));
        assert!(!Packet::is_multicast(&MOCK_IP_ADDR_1));
    }

    #[test]
    fn display() {
        let packet = Packet::parse(ByteFrame::from_bytes(&UDP_PACKET), &Config::default()).unwrap();
        assert_eq!(
            format!("{packet}"),
            "IPv6 src=fe80::1 dst=fe80::2 nxt_hdr=UDP hop_limit=64\n\
             \\ UDP src=61616 dst=5683 len=4 data=\"abcd\""
        );
    }
}
