//! Implementation of [RFC 6282] which specifies a compression format for IPv6 datagrams over
//! IEEE802.154-based networks.
//!
//! [RFC 6282]: https://datatracker.ietf.org/doc/html/rfc6282

use super::{Error, Result};
use crate::wire::ieee802154::Address as LlAddress;
use crate::wire::ipv6::{self, AddressExt, Cidr};
use crate::wire::IpProtocol;

pub mod iphc;
pub mod nhc;

/// One entry of the 6LoWPAN context table: a prefix shared by every node of the
/// network, referenced from compressed headers by its 4-bit id.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct AddressContext {
    prefix: Cidr,
    compress: bool,
}

impl AddressContext {
    /// Create a context for `prefix/prefix_len`.
    ///
    /// A context with `compress` cleared is only used to expand received headers,
    /// never to shrink outgoing ones.
    ///
    /// # Errors
    /// Returns [Error::InvalidPrefixLength] if the prefix length is larger than 128.
    pub fn new(prefix: ipv6::Address, prefix_len: u8, compress: bool) -> Result<Self> {
        Ok(AddressContext {
            prefix: Cidr::new(prefix, prefix_len)?,
            compress,
        })
    }

    /// Return the prefix address.
    pub const fn prefix(&self) -> ipv6::Address {
        self.prefix.address()
    }

    /// Return the prefix length in bits.
    pub const fn prefix_len(&self) -> u8 {
        self.prefix.prefix_len()
    }

    /// Query whether the context may be used when compressing.
    pub const fn compress(&self) -> bool {
        self.compress
    }

    fn apply(&self, bytes: &mut [u8; 16]) {
        self.prefix.apply_prefix(bytes)
    }
}

impl core::fmt::Display for AddressContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.prefix)?;
        if !self.compress {
            write!(f, " (decompress only)")?;
        }
        Ok(())
    }
}

/// The representation of an unresolved address. 6LoWPAN compression of IPv6 addresses can be with
/// and without context information.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum UnresolvedAddress<'a> {
    WithoutContext(AddressMode<'a>),
    WithContext((u8, AddressMode<'a>)),
    Reserved,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AddressMode<'a> {
    /// The full address is carried in-line.
    FullInline(&'a [u8]),
    /// The first 64-bits of the address are elided. The value of those bits
    /// is the link-local prefix padded with zeros, or the context prefix.
    /// The remaining 64 bits are carried in-line.
    InLine64bits(&'a [u8]),
    /// The first 112 bits of the address are elided. The value of the first
    /// 64 bits is the link-local prefix padded with zeros, or the context prefix.
    /// The following 64 bits are 0000:00ff:fe00:XXXX, where XXXX are the 16 bits
    /// carried in-line.
    InLine16bits(&'a [u8]),
    /// The address is fully elided. The first 64 bits of the address are
    /// the link-local prefix padded with zeros, or the context prefix. The
    /// remaining 64 bits are computed from the encapsulating header
    /// (e.g., 802.15.4 or IPv6 source address) as specified in Section 3.2.2.
    FullyElided,
    /// The address takes the form ffXX::00XX:XXXX:XXXX
    Multicast48bits(&'a [u8]),
    /// The address takes the form ffXX::00XX:XXXX.
    Multicast32bits(&'a [u8]),
    /// The address takes the form ff02::00XX.
    Multicast8bits(&'a [u8]),
    /// The address takes the form ffXX:XXLL:PPPP:PPPP:PPPP:PPPP:XXXX:XXXX,
    /// where the prefix `P` and its length `L` come from the context (RFC 3306).
    UnicastPrefixMulticast(&'a [u8]),
    /// The unspecified address.
    Unspecified,
}

const LINK_LOCAL_PREFIX: [u8; 2] = [0xfe, 0x80];
const EUI64_MIDDLE_VALUE: [u8; 2] = [0xff, 0xfe];

/// Interface identifier of a link-layer address, as used for fully elided addresses.
fn ll_iid(ll_address: Option<LlAddress>) -> Result<[u8; 8]> {
    match ll_address.and_then(|addr| addr.iid()) {
        Some(iid) => Ok(iid),
        None => Err(Error::MalformedFrame { offset: 1 }),
    }
}

fn lookup_context(contexts: &[Option<AddressContext>], id: u8) -> Result<&AddressContext> {
    contexts
        .get(id as usize)
        .ok_or(Error::ContextIndexOutOfRange(id))?
        .as_ref()
        .ok_or(Error::UnknownContext(id))
}

impl<'a> UnresolvedAddress<'a> {
    /// Expand the address.
    ///
    /// `ll_address` is the link-layer address of the same end of the exchange,
    /// used when the interface identifier is elided.
    ///
    /// # Errors
    /// - [Error::ContextIndexOutOfRange] or [Error::UnknownContext] when the
    ///   referenced context is not installed.
    /// - [Error::MalformedFrame] for reserved modes, or an elided identifier
    ///   without a link-layer address to derive it from.
    pub fn resolve(
        self,
        ll_address: Option<LlAddress>,
        contexts: &[Option<AddressContext>],
    ) -> Result<ipv6::Address> {
        let mut bytes = [0; 16];

        match self {
            UnresolvedAddress::WithoutContext(mode) => match mode {
                AddressMode::FullInline(addr) => return Ok(ipv6::Address::from_bytes(addr)),
                AddressMode::InLine64bits(inline) => {
                    bytes[0..2].copy_from_slice(&LINK_LOCAL_PREFIX[..]);
                    bytes[8..].copy_from_slice(inline);
                }
                AddressMode::InLine16bits(inline) => {
                    bytes[0..2].copy_from_slice(&LINK_LOCAL_PREFIX[..]);
                    bytes[11..13].copy_from_slice(&EUI64_MIDDLE_VALUE[..]);
                    bytes[14..].copy_from_slice(inline);
                }
                AddressMode::FullyElided => {
                    bytes[0..2].copy_from_slice(&LINK_LOCAL_PREFIX[..]);
                    bytes[8..].copy_from_slice(&ll_iid(ll_address)?);
                }
                AddressMode::Multicast48bits(inline) => {
                    bytes[0] = 0xff;
                    bytes[1] = inline[0];
                    bytes[11..].copy_from_slice(&inline[1..][..5]);
                }
                AddressMode::Multicast32bits(inline) => {
                    bytes[0] = 0xff;
                    bytes[1] = inline[0];
                    bytes[13..].copy_from_slice(&inline[1..][..3]);
                }
                AddressMode::Multicast8bits(inline) => {
                    bytes[0] = 0xff;
                    bytes[1] = 0x02;
                    bytes[15] = inline[0];
                }
                AddressMode::Unspecified => return Ok(ipv6::Address::UNSPECIFIED),
                AddressMode::UnicastPrefixMulticast(_) => {
                    return Err(Error::MalformedFrame { offset: 1 })
                }
            },
            UnresolvedAddress::WithContext((id, mode)) => {
                if mode == AddressMode::Unspecified {
                    return Ok(ipv6::Address::UNSPECIFIED);
                }

                let context = lookup_context(contexts, id)?;
                match mode {
                    AddressMode::InLine64bits(inline) => {
                        bytes[8..].copy_from_slice(inline);
                        context.apply(&mut bytes);
                    }
                    AddressMode::InLine16bits(inline) => {
                        bytes[11..13].copy_from_slice(&EUI64_MIDDLE_VALUE[..]);
                        bytes[14..].copy_from_slice(inline);
                        context.apply(&mut bytes);
                    }
                    AddressMode::FullyElided => {
                        bytes[8..].copy_from_slice(&ll_iid(ll_address)?);
                        context.apply(&mut bytes);
                    }
                    AddressMode::UnicastPrefixMulticast(inline) => {
                        // Only 64 bits of network prefix fit into the address.
                        let prefix_len = context.prefix_len().min(64);
                        let prefix = context.prefix().mask(prefix_len);
                        bytes[0] = 0xff;
                        bytes[1] = inline[0];
                        bytes[2] = inline[1];
                        bytes[3] = prefix_len;
                        bytes[4..12].copy_from_slice(&prefix[..8]);
                        bytes[12..].copy_from_slice(&inline[2..][..4]);
                    }
                    _ => return Err(Error::MalformedFrame { offset: 1 }),
                }
            }
            UnresolvedAddress::Reserved => return Err(Error::MalformedFrame { offset: 1 }),
        }

        Ok(ipv6::Address::from(bytes))
    }
}

/// The dispatch classes of a 6LoWPAN payload this stack understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SixlowpanPacket {
    /// An IPv6 header carried without compression.
    Ipv6Header,
    /// An IPHC compressed header.
    IphcHeader,
}

const DISPATCH_IPV6_HEADER: u8 = 0x41;
const DISPATCH_IPHC_HEADER: u8 = 0b011;
const DISPATCH_UDP_HEADER: u8 = 0b11110;
const DISPATCH_EXT_HEADER: u8 = 0b1110;

impl SixlowpanPacket {
    /// Returns the type of the 6LoWPAN header.
    ///
    /// # Errors
    /// Returns [Error::UnknownDispatch] for every other dispatch value, fragment
    /// headers included, and [Error::MalformedFrame] for an empty buffer.
    pub fn dispatch(buffer: impl AsRef<[u8]>) -> Result<Self> {
        let raw = buffer.as_ref();

        match raw.first() {
            None => Err(Error::MalformedFrame { offset: 0 }),
            Some(&DISPATCH_IPV6_HEADER) => Ok(Self::Ipv6Header),
            Some(&byte) if byte >> 5 == DISPATCH_IPHC_HEADER => Ok(Self::IphcHeader),
            Some(&byte) => Err(Error::UnknownDispatch(byte)),
        }
    }

    /// Return the number of octets taken by the dispatch itself before the header.
    pub const fn dispatch_len(&self) -> usize {
        match self {
            Self::Ipv6Header => 1,
            Self::IphcHeader => 0,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum NextHeader {
    Compressed,
    Uncompressed(IpProtocol),
}

impl core::fmt::Display for NextHeader {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            NextHeader::Compressed => write!(f, "compressed"),
            NextHeader::Uncompressed(protocol) => write!(f, "{protocol}"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const PREFIX: ipv6::Address = ipv6::Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0);

    #[test]
    fn dispatch_classes() {
        assert_eq!(
            SixlowpanPacket::dispatch([0x41, 0x60]),
            Ok(SixlowpanPacket::Ipv6Header)
        );
        assert_eq!(
            SixlowpanPacket::dispatch([0x7a, 0x33]),
            Ok(SixlowpanPacket::IphcHeader)
        );
        // First fragment header.
        assert_eq!(
            SixlowpanPacket::dispatch([0xc0, 0xff]),
            Err(Error::UnknownDispatch(0xc0))
        );
        assert_eq!(
            SixlowpanPacket::dispatch([0u8; 0]),
            Err(Error::MalformedFrame { offset: 0 })
        );
    }

    #[test]
    fn context_rejects_long_prefix() {
        assert_eq!(
            AddressContext::new(PREFIX, 129, true),
            Err(Error::InvalidPrefixLength(129))
        );
    }

    #[test]
    fn resolve_stateless() {
        let ll = Some(LlAddress::Short([0x12, 0x34]));
        let addr = UnresolvedAddress::WithoutContext(AddressMode::FullyElided)
            .resolve(ll, &[])
            .unwrap();
        assert_eq!(addr, ipv6::Address::new(0xfe80, 0, 0, 0, 0, 0xff, 0xfe00, 0x1234));

        let addr = UnresolvedAddress::WithoutContext(AddressMode::InLine16bits(&[0xab, 0xcd]))
            .resolve(None, &[])
            .unwrap();
        assert_eq!(addr, ipv6::Address::new(0xfe80, 0, 0, 0, 0, 0xff, 0xfe00, 0xabcd));

        assert_eq!(
            UnresolvedAddress::WithoutContext(AddressMode::FullyElided).resolve(None, &[]),
            Err(Error::MalformedFrame { offset: 1 })
        );
    }

    #[test]
    fn resolve_multicast() {
        let addr = UnresolvedAddress::WithoutContext(AddressMode::Multicast8bits(&[0x01]))
            .resolve(None, &[])
            .unwrap();
        assert_eq!(addr, ipv6::Address::new(0xff02, 0, 0, 0, 0, 0, 0, 1));

        let addr = UnresolvedAddress::WithoutContext(AddressMode::Multicast32bits(&[
            0x05, 0x01, 0x02, 0x03,
        ]))
        .resolve(None, &[])
        .unwrap();
        assert_eq!(addr, ipv6::Address::new(0xff05, 0, 0, 0, 0, 0, 0x01, 0x0203));

        let addr = UnresolvedAddress::WithoutContext(AddressMode::Multicast48bits(&[
            0x0e, 0x01, 0x02, 0x03, 0x04, 0x05,
        ]))
        .resolve(None, &[])
        .unwrap();
        assert_eq!(addr, ipv6::Address::new(0xff0e, 0, 0, 0, 0, 0x01, 0x0203, 0x0405));
    }

    #[test]
    fn resolve_with_context() {
        let contexts = [
            None,
            Some(AddressContext::new(PREFIX, 64, true).unwrap()),
        ];

        let addr = UnresolvedAddress::WithContext((1, AddressMode::InLine16bits(&[0x00, 0x07])))
            .resolve(None, &contexts)
            .unwrap();
        assert_eq!(addr, ipv6::Address::new(0x2001, 0xdb8, 0, 0, 0, 0xff, 0xfe00, 0x0007));

        let ll = Some(LlAddress::Extended([0x02, 0, 0, 0, 0, 0, 0, 0x01]));
        let addr = UnresolvedAddress::WithContext((1, AddressMode::FullyElided))
            .resolve(ll, &contexts)
            .unwrap();
        assert_eq!(addr, ipv6::Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1));

        let addr = UnresolvedAddress::WithContext((1, AddressMode::UnicastPrefixMulticast(&[
            0x3e, 0x00, 0x00, 0x00, 0x00, 0x01,
        ])))
        .resolve(None, &contexts)
        .unwrap();
        assert_eq!(addr, ipv6::Address::new(0xff3e, 0x0040, 0x2001, 0xdb8, 0, 0, 0, 1));
    }

    #[test]
    fn resolve_missing_context() {
        let contexts = [None, Some(AddressContext::new(PREFIX, 64, true).unwrap())];
        let mode = AddressMode::InLine64bits(&[0; 8]);

        assert_eq!(
            UnresolvedAddress::WithContext((0, mode)).resolve(None, &contexts),
            Err(Error::UnknownContext(0))
        );
        assert_eq!(
            UnresolvedAddress::WithContext((5, mode)).resolve(None, &contexts),
            Err(Error::ContextIndexOutOfRange(5))
        );
        // The unspecified address never looks at the table.
        assert_eq!(
            UnresolvedAddress::WithContext((0, AddressMode::Unspecified)).resolve(None, &[]),
            Ok(ipv6::Address::UNSPECIFIED)
        );
        assert_eq!(
            UnresolvedAddress::Reserved.resolve(None, &contexts),
            Err(Error::MalformedFrame { offset: 1 })
        );
    }
}
