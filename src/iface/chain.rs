//! The payload chain of an IPv6 packet.
//!
//! The bytes after the fixed IPv6 header are a sequence of segments, each
//! announced by the next header byte of the one before it. A chain is
//! parsed iteratively through a registry of per-protocol parsers: extension
//! headers hand over to their successor, transports end the walk. Anything
//! the registry does not know becomes a [IpPayload::Raw] node holding the rest
//! of the bytes.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use super::packet::{record, Diagnostic, Diagnostics};
use super::ChecksumCapabilities;
use crate::wire::{
    Icmpv6Packet, Icmpv6Repr, IpProtocol, Ipv6Address, Ipv6HopByHopHeader, Ipv6HopByHopRepr,
    Ipv6Option, Ipv6OptionRepr, TcpPacket, TcpRepr, UdpPacket, UdpRepr, TCP_MAX_OPTIONS_LEN,
    UDP_HEADER_LEN,
};
use crate::{Error, Result};

/// Number of payload bytes shown by the `Display` implementation.
const PREVIEW_LEN: usize = 8;

/// The largest Hop-by-Hop header its length field can describe.
const MAX_HOP_BY_HOP_LEN: usize = 8 * 256;

/// One segment of an IPv6 payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpPayload {
    /// A Hop-by-Hop Options header.
    ///
    /// `options` holds the encoded options. They are padded to a multiple of
    /// 8 octets when emitted.
    HopByHop {
        options: Vec<u8>,
        next: Option<Box<IpPayload>>,
    },
    /// A TCP segment.
    ///
    /// `options` holds the options area as received. When it is `None` the
    /// options are generated from `repr`, which only gives them to SYN
    /// segments.
    Tcp {
        repr: TcpRepr,
        options: Option<Vec<u8>>,
        payload: Vec<u8>,
    },
    Udp {
        repr: UdpRepr,
        payload: Vec<u8>,
    },
    Icmpv6 {
        repr: Icmpv6Repr,
        payload: Vec<u8>,
    },
    /// Bytes that were not decoded, announced by `next_header`.
    Raw {
        next_header: IpProtocol,
        data: Vec<u8>,
    },
}

impl IpPayload {
    /// Return the next header value that announces this segment.
    pub fn dispatch(&self) -> IpProtocol {
        match self {
            IpPayload::HopByHop { .. } => IpProtocol::HopByHop,
            IpPayload::Tcp { .. } => IpProtocol::Tcp,
            IpPayload::Udp { .. } => IpProtocol::Udp,
            IpPayload::Icmpv6 { .. } => IpProtocol::Icmpv6,
            IpPayload::Raw { next_header, .. } => *next_header,
        }
    }

    /// Return the segment following this one.
    pub fn next(&self) -> Option<&IpPayload> {
        match self {
            IpPayload::HopByHop { next, .. } => next.as_deref(),
            _ => None,
        }
    }

    /// Iterate over this segment and all of its successors.
    pub fn iter(&self) -> impl Iterator<Item = &IpPayload> + '_ {
        core::iter::successors(Some(self), |node| node.next())
    }

    /// Return the next header value this segment writes for its successor.
    fn next_header(&self) -> IpProtocol {
        self.next()
            .map_or(IpProtocol::Ipv6NoNxt, |next| next.dispatch())
    }

    /// Return the length of the header of this segment alone.
    pub fn header_len(&self) -> usize {
        match self {
            IpPayload::HopByHop { options, .. } => (2 + options.len() + 7) / 8 * 8,
            IpPayload::Tcp {
                repr,
                options: None,
                ..
            } => repr.header_len(),
            IpPayload::Tcp {
                options: Some(options),
                ..
            } => TcpRepr::header_len_with_options(options),
            IpPayload::Udp { .. } => UDP_HEADER_LEN,
            IpPayload::Icmpv6 { repr, .. } => repr.header_len(),
            IpPayload::Raw { .. } => 0,
        }
    }

    /// Return the data carried after the header of this segment.
    pub fn payload(&self) -> &[u8] {
        match self {
            IpPayload::HopByHop { .. } => &[],
            IpPayload::Tcp { payload, .. }
            | IpPayload::Udp { payload, .. }
            | IpPayload::Icmpv6 { payload, .. } => payload,
            IpPayload::Raw { data, .. } => data,
        }
    }

    fn segment_len(&self) -> usize {
        self.header_len() + self.payload().len()
    }

    /// Return the length of this segment and all of its successors.
    pub fn buffer_len(&self) -> usize {
        self.iter().map(IpPayload::segment_len).sum()
    }

    /// Check that every segment of the chain fits the length fields it will
    /// be emitted with.
    ///
    /// `offset` is where the chain starts; errors point at the offending
    /// length field from there.
    ///
    /// # Errors
    /// Returns [Error::MalformedFrame] for a Hop-by-Hop header longer than
    /// 2048 octets or for TCP options longer than 40 octets.
    pub fn check_emit(&self, mut offset: usize) -> Result<()> {
        for node in self.iter() {
            match node {
                IpPayload::HopByHop { .. } if node.header_len() > MAX_HOP_BY_HOP_LEN => {
                    return Err(Error::MalformedFrame { offset: offset + 1 })
                }
                IpPayload::Tcp {
                    options: Some(options),
                    ..
                } if options.len() > TCP_MAX_OPTIONS_LEN => {
                    return Err(Error::MalformedFrame { offset: offset + 12 })
                }
                _ => (),
            }
            offset += node.segment_len();
        }
        Ok(())
    }

    /// Emit this segment and its successors into `buffer`, which must be
    /// exactly [buffer_len](#method.buffer_len) octets long and must have
    /// passed [check_emit](#method.check_emit).
    ///
    /// Transport checksums are computed over the given addresses as
    /// `checksum_caps` asks.
    pub fn emit(
        &self,
        buffer: &mut [u8],
        src_addr: &Ipv6Address,
        dst_addr: &Ipv6Address,
        checksum_caps: &ChecksumCapabilities,
    ) {
        let mut buffer = buffer;
        for node in self.iter() {
            let (segment, rest) = core::mem::take(&mut buffer).split_at_mut(node.segment_len());
            node.emit_segment(segment, src_addr, dst_addr, checksum_caps);
            buffer = rest;
        }
    }

    fn emit_segment(
        &self,
        segment: &mut [u8],
        src_addr: &Ipv6Address,
        dst_addr: &Ipv6Address,
        checksum_caps: &ChecksumCapabilities,
    ) {
        match self {
            IpPayload::HopByHop { options, .. } => {
                let length_field = (segment.len() / 8 - 1) as u8;
                let mut header = Ipv6HopByHopHeader::new_unchecked(segment);
                header.set_next_header(self.next_header());
                header.set_length_field(length_field);
                let (data, padding) = header.options_mut().split_at_mut(options.len());
                data.copy_from_slice(options);
                pad(padding);
            }
            IpPayload::Tcp {
                repr,
                options: None,
                payload,
            } => repr.emit(
                &mut TcpPacket::new_unchecked(segment),
                src_addr,
                dst_addr,
                |buf| buf.copy_from_slice(payload),
                checksum_caps,
            ),
            IpPayload::Tcp {
                repr,
                options: Some(options),
                payload,
            } => repr.emit_with_options(
                &mut TcpPacket::new_unchecked(segment),
                options,
                src_addr,
                dst_addr,
                |buf| buf.copy_from_slice(payload),
                checksum_caps,
            ),
            IpPayload::Udp { repr, payload } => repr.emit(
                &mut UdpPacket::new_unchecked(segment),
                src_addr,
                dst_addr,
                payload.len(),
                |buf| buf.copy_from_slice(payload),
                checksum_caps,
            ),
            IpPayload::Icmpv6 { repr, payload } => repr.emit(
                &mut Icmpv6Packet::new_unchecked(segment),
                src_addr,
                dst_addr,
                |buf| buf.copy_from_slice(payload),
                checksum_caps,
            ),
            IpPayload::Raw { data, .. } => segment.copy_from_slice(data),
        }
    }
}

/// Fill `buffer` with a single Pad1 or PadN option.
fn pad(buffer: &mut [u8]) {
    let repr = match buffer.len() {
        0 => return,
        1 => Ipv6OptionRepr::Pad1,
        len => Ipv6OptionRepr::PadN((len - 2) as u8),
    };
    repr.emit(&mut Ipv6Option::new_unchecked(buffer));
}

struct Preview<'a>(&'a [u8]);

impl<'a> fmt::Display for Preview<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for &byte in self.0.iter().take(PREVIEW_LEN) {
            let c = if byte.is_ascii_graphic() || byte == b' ' {
                byte as char
            } else {
                '.'
            };
            write!(f, "{c}")?;
        }
        if self.0.len() > PREVIEW_LEN {
            write!(f, "...")?;
        }
        Ok(())
    }
}

impl fmt::Display for IpPayload {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IpPayload::HopByHop { options, .. } => {
                let repr = Ipv6HopByHopRepr {
                    next_header: self.next_header(),
                    options,
                };
                write!(f, "{repr}")?;
                for option in repr.options().flatten() {
                    write!(f, " {option}")?;
                }
                return Ok(());
            }
            IpPayload::Tcp { repr, .. } => write!(f, "{repr}")?,
            IpPayload::Udp { repr, .. } => write!(f, "{repr}")?,
            IpPayload::Icmpv6 { repr, .. } => write!(f, "{repr}")?,
            IpPayload::Raw { next_header, .. } => write!(f, "Raw nxt_hdr={next_header}")?,
        }
        let payload = self.payload();
        write!(f, " len={}", payload.len())?;
        if !payload.is_empty() {
            write!(f, " data=\"{}\"", Preview(payload))?;
        }
        Ok(())
    }
}

/// Parsing state shared by the registered parsers.
pub(crate) struct Cursor<'a> {
    pub src_addr: Ipv6Address,
    pub dst_addr: Ipv6Address,
    pub checksum_caps: &'a ChecksumCapabilities,
    pub diagnostics: &'a mut Diagnostics,
    /// Offset of the next unparsed byte, from the start of the IPv6 header.
    pub offset: usize,
}

impl<'a> Cursor<'a> {
    fn report(&mut self, error: Error) {
        record(
            self.diagnostics,
            Diagnostic {
                offset: self.offset,
                error,
            },
        );
    }
}

/// What a registered parser recognized at the cursor.
enum Segment {
    /// An extension header of `len` octets, followed by `next_header`.
    Extension {
        options: Vec<u8>,
        next_header: IpProtocol,
        len: usize,
    },
    /// A segment ending the chain, spanning `len` octets.
    Last { node: IpPayload, len: usize },
}

type Parser = fn(&[u8], &mut Cursor) -> Result<Segment>;

static PARSERS: [(IpProtocol, Parser); 5] = [
    (IpProtocol::HopByHop, parse_hop_by_hop),
    (IpProtocol::Tcp, parse_tcp),
    (IpProtocol::Udp, parse_udp),
    (IpProtocol::Icmpv6, parse_icmpv6),
    (IpProtocol::Ipv6NoNxt, parse_no_next_header),
];

fn lookup(next_header: IpProtocol) -> Option<Parser> {
    PARSERS
        .iter()
        .find(|(protocol, _)| *protocol == next_header)
        .map(|(_, parser)| *parser)
}

/// Move error offsets from the start of a segment to the start of the packet.
fn at(offset: usize, err: Error) -> Error {
    match err {
        Error::MalformedFrame { offset: inner } => Error::MalformedFrame {
            offset: offset + inner,
        },
        Error::OutOfRange { offset: inner, len } => Error::OutOfRange {
            offset: offset + inner,
            len,
        },
        err => err,
    }
}

/// Parse `data`, the payload of an IPv6 packet, starting with `next_header`.
///
/// On return the cursor is past the last byte that belongs to the chain.
pub(crate) fn parse(
    mut next_header: IpProtocol,
    data: &[u8],
    cursor: &mut Cursor,
) -> Result<IpPayload> {
    let start = cursor.offset;
    let mut extensions = Vec::new();

    let last = loop {
        let rest = &data[cursor.offset - start..];
        let Some(parser) = lookup(next_header) else {
            net_debug!("chain: unknown next header {} at {}", next_header, cursor.offset);
            cursor.report(Error::UnknownDispatch(next_header.into()));
            cursor.offset += rest.len();
            break IpPayload::Raw {
                next_header,
                data: rest.to_vec(),
            };
        };

        let offset = cursor.offset;
        match parser(rest, cursor).map_err(|err| at(offset, err))? {
            Segment::Extension {
                options,
                next_header: next,
                len,
            } => {
                extensions.push(options);
                cursor.offset += len;
                next_header = next;
            }
            Segment::Last { node, len } => {
                cursor.offset += len;
                break node;
            }
        }
    };

    Ok(extensions
        .into_iter()
        .rfold(last, |next, options| IpPayload::HopByHop {
            options,
            next: Some(Box::new(next)),
        }))
}

fn parse_hop_by_hop(data: &[u8], _cursor: &mut Cursor) -> Result<Segment> {
    let header = Ipv6HopByHopHeader::new_checked(data)?;
    let repr = Ipv6HopByHopRepr::parse(&header)?;
    Ok(Segment::Extension {
        options: repr.options.to_vec(),
        next_header: repr.next_header,
        len: header.header_len(),
    })
}

fn parse_tcp(data: &[u8], cursor: &mut Cursor) -> Result<Segment> {
    let packet = TcpPacket::new_checked(data)?;
    let repr = TcpRepr::parse(&packet)?;
    if cursor.checksum_caps.tcp.rx() && !packet.verify_checksum(&cursor.src_addr, &cursor.dst_addr)
    {
        let computed = packet.expected_checksum(&cursor.src_addr, &cursor.dst_addr);
        cursor.report(Error::ChecksumMismatch {
            expected: packet.checksum(),
            computed,
        });
    }
    Ok(Segment::Last {
        node: IpPayload::Tcp {
            repr,
            options: Some(packet.options().to_vec()),
            payload: packet.payload().to_vec(),
        },
        len: data.len(),
    })
}

fn parse_udp(data: &[u8], cursor: &mut Cursor) -> Result<Segment> {
    let packet = UdpPacket::new_checked(data)?;
    let repr = UdpRepr::parse(&packet);
    if cursor.checksum_caps.udp.rx() && !packet.verify_checksum(&cursor.src_addr, &cursor.dst_addr)
    {
        let computed = packet.expected_checksum(&cursor.src_addr, &cursor.dst_addr);
        cursor.report(Error::ChecksumMismatch {
            expected: packet.checksum(),
            computed,
        });
    }
    Ok(Segment::Last {
        node: IpPayload::Udp {
            repr,
            payload: packet.payload().to_vec(),
        },
        len: packet.len() as usize,
    })
}

fn parse_icmpv6(data: &[u8], cursor: &mut Cursor) -> Result<Segment> {
    let packet = Icmpv6Packet::new_checked(data)?;
    let repr = Icmpv6Repr::parse(&packet)?;
    if cursor.checksum_caps.icmpv6.rx()
        && !packet.verify_checksum(&cursor.src_addr, &cursor.dst_addr)
    {
        let computed = packet.expected_checksum(&cursor.src_addr, &cursor.dst_addr);
        cursor.report(Error::ChecksumMismatch {
            expected: packet.checksum(),
            computed,
        });
    }
    Ok(Segment::Last {
        node: IpPayload::Icmpv6 {
            repr,
            payload: data[repr.header_len()..].to_vec(),
        },
        len: data.len(),
    })
}

fn parse_no_next_header(data: &[u8], _cursor: &mut Cursor) -> Result<Segment> {
    Ok(Segment::Last {
        node: IpPayload::Raw {
            next_header: IpProtocol::Ipv6NoNxt,
            data: data.to_vec(),
        },
        len: data.len(),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::wire::ipv6::test::{MOCK_IP_ADDR_1, MOCK_IP_ADDR_2};
    use crate::wire::IPV6_HEADER_LEN;

    static UDP_SEGMENT: [u8; 12] = [
        0xf0, 0xb0, 0x16, 0x33, 0x00, 0x0c, 0x37, 0x27, 0x61, 0x62, 0x63, 0x64,
    ];

    fn run(next_header: IpProtocol, data: &[u8]) -> (Result<IpPayload>, usize, Diagnostics) {
        let caps = ChecksumCapabilities::default();
        let mut diagnostics = Diagnostics::new();
        let mut cursor = Cursor {
            src_addr: MOCK_IP_ADDR_1,
            dst_addr: MOCK_IP_ADDR_2,
            checksum_caps: &caps,
            diagnostics: &mut diagnostics,
            offset: IPV6_HEADER_LEN,
        };
        let result = parse(next_header, data, &mut cursor);
        let offset = cursor.offset;
        (result, offset, diagnostics)
    }

    fn udp_node() -> IpPayload {
        IpPayload::Udp {
            repr: UdpRepr {
                src_port: 61616,
                dst_port: 5683,
            },
            payload: b"abcd".to_vec(),
        }
    }

    #[test]
    fn udp_segment() {
        let (chain, offset, diagnostics) = run(IpProtocol::Udp, &UDP_SEGMENT);
        assert_eq!(chain, Ok(udp_node()));
        assert_eq!(offset, IPV6_HEADER_LEN + 12);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn udp_bad_checksum_is_reported() {
        let mut bytes = UDP_SEGMENT;
        bytes[7] = 0x28;
        let (chain, _, diagnostics) = run(IpProtocol::Udp, &bytes);
        assert_eq!(chain, Ok(udp_node()));
        assert_eq!(
            diagnostics.as_slice(),
            &[Diagnostic {
                offset: IPV6_HEADER_LEN,
                error: Error::ChecksumMismatch {
                    expected: 0x3728,
                    computed: 0x3727
                }
            }]
        );
    }

    #[test]
    fn udp_bad_length() {
        let mut bytes = UDP_SEGMENT;
        bytes[5] = 0x20;
        let (chain, _, _) = run(IpProtocol::Udp, &bytes);
        assert_eq!(
            chain,
            Err(Error::MalformedFrame {
                offset: IPV6_HEADER_LEN + 4
            })
        );
    }

    #[test]
    fn hop_by_hop_then_udp() {
        let mut bytes = vec![0x11, 0x00, 0x05, 0x02, 0x00, 0x00, 0x01, 0x00];
        bytes.extend_from_slice(&UDP_SEGMENT);
        let (chain, offset, diagnostics) = run(IpProtocol::HopByHop, &bytes);
        let chain = chain.unwrap();

        assert_eq!(chain.dispatch(), IpProtocol::HopByHop);
        assert_eq!(chain.next(), Some(&udp_node()));
        assert_eq!(chain.iter().count(), 2);
        assert_eq!(chain.header_len(), 8);
        assert_eq!(chain.buffer_len(), bytes.len());
        assert_eq!(offset, IPV6_HEADER_LEN + bytes.len());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn hop_by_hop_overrun() {
        // The PadN option claims more octets than the header holds.
        let bytes = [0x3b, 0x00, 0x01, 0x09, 0x00, 0x00, 0x00, 0x00];
        let (chain, _, _) = run(IpProtocol::HopByHop, &bytes);
        assert!(matches!(chain, Err(Error::MalformedFrame { .. })));
    }

    #[test]
    fn unknown_next_header() {
        let mut bytes = vec![0x2b, 0x00, 0x01, 0x04, 0x00, 0x00, 0x00, 0x00];
        bytes.extend_from_slice(&[0xaa, 0xbb]);
        let (chain, offset, diagnostics) = run(IpProtocol::HopByHop, &bytes);
        let chain = chain.unwrap();

        assert_eq!(
            chain.next(),
            Some(&IpPayload::Raw {
                next_header: IpProtocol::Ipv6Route,
                data: vec![0xaa, 0xbb],
            })
        );
        assert_eq!(offset, IPV6_HEADER_LEN + bytes.len());
        assert_eq!(
            diagnostics.as_slice(),
            &[Diagnostic {
                offset: IPV6_HEADER_LEN + 8,
                error: Error::UnknownDispatch(0x2b),
            }]
        );
    }

    #[test]
    fn no_next_header() {
        let (chain, offset, diagnostics) = run(IpProtocol::Ipv6NoNxt, &[]);
        assert_eq!(
            chain,
            Ok(IpPayload::Raw {
                next_header: IpProtocol::Ipv6NoNxt,
                data: vec![],
            })
        );
        assert_eq!(offset, IPV6_HEADER_LEN);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn emit_pads_hop_by_hop() {
        let chain = IpPayload::HopByHop {
            options: vec![0x05, 0x02, 0x00, 0x00],
            next: Some(Box::new(udp_node())),
        };
        let mut buffer = vec![0u8; chain.buffer_len()];
        chain.emit(
            &mut buffer,
            &MOCK_IP_ADDR_1,
            &MOCK_IP_ADDR_2,
            &ChecksumCapabilities::default(),
        );
        assert_eq!(&buffer[..8], &[0x11, 0x00, 0x05, 0x02, 0x00, 0x00, 0x01, 0x00]);
        assert_eq!(&buffer[8..], &UDP_SEGMENT[..]);

        let chain = IpPayload::HopByHop {
            options: vec![0x05, 0x02, 0x00, 0x00, 0x00],
            next: None,
        };
        let mut buffer = vec![0u8; chain.buffer_len()];
        chain.emit(
            &mut buffer,
            &MOCK_IP_ADDR_1,
            &MOCK_IP_ADDR_2,
            &ChecksumCapabilities::default(),
        );
        assert_eq!(buffer, [0x3b, 0x00, 0x05, 0x02, 0x00, 0x00, 0x00, 0x00]);
    }

    /// ACK with NOP, NOP, timestamps and "hi", checksummed over the mock addresses.
    fn tcp_segment_with_timestamps() -> Vec<u8> {
        let mut bytes = vec![
            0x30, 0x39, 0x00, 0x50, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x20, 0x80, 0x10,
            0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x01, 0x08, 0x0a, 0x00, 0x00, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x02, 0x68, 0x69,
        ];
        TcpPacket::new_unchecked(&mut bytes).fill_checksum(&MOCK_IP_ADDR_1, &MOCK_IP_ADDR_2);
        bytes
    }

    #[test]
    fn tcp_options_are_kept() {
        let bytes = tcp_segment_with_timestamps();
        let (chain, offset, diagnostics) = run(IpProtocol::Tcp, &bytes);
        let chain = chain.unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(offset, IPV6_HEADER_LEN + bytes.len());
        assert_eq!(chain.header_len(), 32);
        assert_eq!(chain.payload(), b"hi");
        assert_eq!(chain.buffer_len(), bytes.len());

        let mut buffer = vec![0u8; chain.buffer_len()];
        chain.emit(
            &mut buffer,
            &MOCK_IP_ADDR_1,
            &MOCK_IP_ADDR_2,
            &ChecksumCapabilities::default(),
        );
        assert_eq!(buffer, bytes);
    }

    #[test]
    fn tcp_syn_without_options_stays_short() {
        let mut bytes = tcp_segment_with_timestamps();
        bytes.truncate(20);
        bytes[12] = 0x50;
        bytes[13] = 0x02;
        TcpPacket::new_unchecked(&mut bytes).fill_checksum(&MOCK_IP_ADDR_1, &MOCK_IP_ADDR_2);

        let (chain, _, diagnostics) = run(IpProtocol::Tcp, &bytes);
        let chain = chain.unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(chain.buffer_len(), 20);
    }

    #[test]
    fn check_emit_limits() {
        let chain = IpPayload::HopByHop {
            options: vec![0; 2046],
            next: Some(Box::new(udp_node())),
        };
        assert_eq!(chain.header_len(), 2048);
        assert_eq!(chain.check_emit(IPV6_HEADER_LEN), Ok(()));

        let chain = IpPayload::HopByHop {
            options: vec![0; 2100],
            next: Some(Box::new(udp_node())),
        };
        assert_eq!(
            chain.check_emit(IPV6_HEADER_LEN),
            Err(Error::MalformedFrame {
                offset: IPV6_HEADER_LEN + 1
            })
        );

        let tcp = |options: usize| IpPayload::Tcp {
            repr: TcpRepr::parse(
                &TcpPacket::new_checked(&tcp_segment_with_timestamps()[..]).unwrap(),
            )
            .unwrap(),
            options: Some(vec![0x01; options]),
            payload: vec![],
        };
        assert_eq!(tcp(40).check_emit(0), Ok(()));
        let chain = IpPayload::HopByHop {
            options: vec![0x01, 0x00],
            next: Some(Box::new(tcp(41))),
        };
        assert_eq!(
            chain.check_emit(0),
            Err(Error::MalformedFrame { offset: 8 + 12 })
        );
    }

    #[test]
    fn display_preview() {
        assert_eq!(
            format!("{}", udp_node()),
            "UDP src=61616 dst=5683 len=4 data=\"abcd\""
        );
        let raw = IpPayload::Raw {
            next_header: IpProtocol::Unknown(0xfd),
            data: b"\x01hello world".to_vec(),
        };
        assert_eq!(
            format!("{raw}"),
            "Raw nxt_hdr=0xfd len=12 data=\".hello w...\""
        );
    }
}
