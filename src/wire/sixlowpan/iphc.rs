//! Implementation of IP Header Compression from [RFC 6282 § 3.1].
//! It defines the compression of IPv6 headers.
//!
//! [RFC 6282 § 3.1]: https://datatracker.ietf.org/doc/html/rfc6282#section-3.1

use super::{
    AddressContext, AddressMode, Error, NextHeader, Result, UnresolvedAddress, DISPATCH_IPHC_HEADER,
};
use crate::wire::{ieee802154::Address as LlAddress, ipv6, ipv6::AddressExt, IpProtocol};
use byteorder::{ByteOrder, NetworkEndian};

mod field {
    use crate::wire::field::*;

    pub const IPHC_FIELD: Field = 0..2;
    pub const CID: usize = 2;
}

/// Mask of the 20-bit flow label.
const FLOW_LABEL_MASK: u32 = 0x000f_ffff;

/// Context ids are carried in 4 bits.
const MAX_CONTEXT_ID: usize = 16;

macro_rules! get_field {
    ($name:ident, $mask:expr, $shift:expr) => {
        fn $name(&self) -> u8 {
            let data = self.buffer.as_ref();
            let raw = NetworkEndian::read_u16(&data[field::IPHC_FIELD]);
            ((raw >> $shift) & $mask) as u8
        }
    };
}

macro_rules! set_field {
    ($name:ident, $mask:expr, $shift:expr) => {
        fn $name(&mut self, val: u8) {
            let data = &mut self.buffer.as_mut()[field::IPHC_FIELD];
            let mut raw = NetworkEndian::read_u16(data);

            raw = (raw & !($mask << $shift)) | ((val as u16) << $shift);
            NetworkEndian::write_u16(data, raw);
        }
    };
}

/// Map the address control bits of the header to the address they describe.
///
/// `inline` must hold exactly [address_size] octets for the same bits.
fn unresolved_address(
    is_src: bool,
    multicast: bool,
    stateful: bool,
    context: u8,
    mode: u8,
    inline: &[u8],
) -> UnresolvedAddress {
    use UnresolvedAddress::{Reserved, WithContext, WithoutContext};

    match (multicast, stateful, mode) {
        (false, false, 0b00) => WithoutContext(AddressMode::FullInline(inline)),
        (false, false, 0b01) => WithoutContext(AddressMode::InLine64bits(inline)),
        (false, false, 0b10) => WithoutContext(AddressMode::InLine16bits(inline)),
        (false, false, _) => WithoutContext(AddressMode::FullyElided),
        (false, true, 0b00) if is_src => WithContext((context, AddressMode::Unspecified)),
        (false, true, 0b00) => Reserved,
        (false, true, 0b01) => WithContext((context, AddressMode::InLine64bits(inline))),
        (false, true, 0b10) => WithContext((context, AddressMode::InLine16bits(inline))),
        (false, true, _) => WithContext((context, AddressMode::FullyElided)),
        (true, false, 0b00) => WithoutContext(AddressMode::FullInline(inline)),
        (true, false, 0b01) => WithoutContext(AddressMode::Multicast48bits(inline)),
        (true, false, 0b10) => WithoutContext(AddressMode::Multicast32bits(inline)),
        (true, false, _) => WithoutContext(AddressMode::Multicast8bits(inline)),
        (true, true, 0b00) => WithContext((context, AddressMode::UnicastPrefixMulticast(inline))),
        (true, true, _) => Reserved,
    }
}

/// Get the size in octets of an in-line address.
fn address_size(multicast: bool, stateful: bool, mode: u8) -> usize {
    match (multicast, stateful, mode) {
        (false, false, 0b00) => 16, // The full address is carried in-line.
        (false, false, 0b01) => 8,  // The first 64 bits are elided.
        (false, false, 0b10) => 2,  // The first 112 bits are elided.
        (false, false, _) => 0,     // The address is fully elided.
        (false, true, 0b00) => 0,   // The UNSPECIFIED address, or reserved.
        (false, true, 0b01) => 8,   // Address derived using context information.
        (false, true, 0b10) => 2,   // Address derived using context information.
        (false, true, _) => 0,      // Address derived using context information.
        (true, false, 0b00) => 16,  // The full address is carried in-line.
        (true, false, 0b01) => 6,   // The address takes the form ffXX::00XX:XXXX:XXXX.
        (true, false, 0b10) => 4,   // The address takes the form ffXX::00XX:XXXX.
        (true, false, _) => 1,      // The address takes the form ff02::00XX.
        (true, true, 0b00) => 6,    // Match Unicast-Prefix-based IPv6.
        (true, true, _) => 0,       // Reserved.
    }
}

/// A read/write wrapper around a 6LoWPAN IPHC header.
/// [RFC 6282 § 3.1] specifies the format of the header.
///
/// The header always start with the following base format (from [RFC 6282 § 3.1.1]):
/// ```txt
///    0                                       1
///    0   1   2   3   4   5   6   7   8   9   0   1   2   3   4   5
///  +---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+
///  | 0 | 1 | 1 |  TF   |NH | HLIM  |CID|SAC|  SAM  | M |DAC|  DAM  |
///  +---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+
/// ```
/// With:
/// - TF: Traffic Class and Flow Label
/// - NH: Next Header
/// - HLIM: Hop Limit
/// - CID: Context Identifier Extension
/// - SAC: Source Address Compression
/// - SAM: Source Address Mode
/// - M: Multicast Compression
/// - DAC: Destination Address Compression
/// - DAM: Destination Address Mode
///
/// Depending on the flags in the base format, the following fields are added to the header:
/// - Context identifiers
/// - Traffic Class and Flow Label
/// - Next Header
/// - Hop Limit
/// - IPv6 source address
/// - IPv6 destination address
///
/// [RFC 6282 § 3.1]: https://datatracker.ietf.org/doc/html/rfc6282#section-3.1
/// [RFC 6282 § 3.1.1]: https://datatracker.ietf.org/doc/html/rfc6282#section-3.1.1
#[derive(Debug, Clone)]
pub struct Packet<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> Packet<T> {
    /// Input a raw octet buffer with a 6LoWPAN IPHC header structure.
    pub const fn new_unchecked(buffer: T) -> Self {
        Packet { buffer }
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    pub fn new_checked(buffer: T) -> Result<Self> {
        let packet = Self::new_unchecked(buffer);
        packet.check_len()?;
        Ok(packet)
    }

    /// Ensure that no accessor method will panic if called.
    /// Returns `Err(Error::MalformedFrame)` if the buffer is shorter than the
    /// header its base format announces.
    pub fn check_len(&self) -> Result<()> {
        let len = self.buffer.as_ref().len();
        if len < field::IPHC_FIELD.end || self.header_len() > len {
            return Err(Error::MalformedFrame { offset: len });
        }

        Ok(())
    }

    /// Consumes the frame, returning the underlying buffer.
    pub fn into_inner(self) -> T {
        self.buffer
    }

    /// Return the Next Header field.
    pub fn next_header(&self) -> NextHeader {
        if self.nh_field() == 1 {
            // The next header field is compressed.
            // It is also encoded using LOWPAN_NHC.
            NextHeader::Compressed
        } else {
            // The full 8 bits for Next Header are carried in-line.
            let start = self.ip_fields_start() + self.traffic_class_size();
            NextHeader::Uncompressed(IpProtocol::from(self.buffer.as_ref()[start]))
        }
    }

    /// Return the Hop Limit.
    pub fn hop_limit(&self) -> u8 {
        match self.hlim_field() {
            0b00 => {
                let start =
                    self.ip_fields_start() + self.traffic_class_size() + self.next_header_size();
                self.buffer.as_ref()[start]
            }
            0b01 => 1,
            0b10 => 64,
            _ => 255,
        }
    }

    /// Return the Source Context Identifier.
    ///
    /// Without the CID extension, stateful addresses use context 0.
    pub fn src_context_id(&self) -> u8 {
        if self.cid_field() == 1 {
            self.buffer.as_ref()[field::CID] >> 4
        } else {
            0
        }
    }

    /// Return the Destination Context Identifier.
    ///
    /// Without the CID extension, stateful addresses use context 0.
    pub fn dst_context_id(&self) -> u8 {
        if self.cid_field() == 1 {
            self.buffer.as_ref()[field::CID] & 0x0f
        } else {
            0
        }
    }

    /// Return the IPv6 traffic class.
    ///
    /// The in-line fields carry ECN first and DSCP second, the reverse of the
    /// IPv6 header. Elided parts read as zero.
    pub fn traffic_class(&self) -> u8 {
        let first = self.buffer.as_ref()[self.ip_fields_start()..]
            .first()
            .copied()
            .unwrap_or(0);
        match self.tf_field() {
            // ECN + DSCP
            0b00 | 0b10 => (first << 2) | (first >> 6),
            // ECN only
            0b01 => first >> 6,
            _ => 0,
        }
    }

    /// Return the 20-bit flow label. An elided flow label reads as zero.
    pub fn flow_label(&self) -> u32 {
        let data = &self.buffer.as_ref()[self.ip_fields_start()..];
        match self.tf_field() {
            0b00 => NetworkEndian::read_u24(&data[1..4]) & FLOW_LABEL_MASK,
            0b01 => NetworkEndian::read_u24(&data[0..3]) & FLOW_LABEL_MASK,
            _ => 0,
        }
    }

    /// Return the Source Address.
    pub fn src_addr(&self) -> UnresolvedAddress {
        let start = self.src_addr_start();
        let size = self.src_address_size();

        unresolved_address(
            true,
            false,
            self.sac_field() == 1,
            self.src_context_id(),
            self.sam_field(),
            &self.buffer.as_ref()[start..][..size],
        )
    }

    /// Return the Destination Address.
    pub fn dst_addr(&self) -> UnresolvedAddress {
        let start = self.src_addr_start() + self.src_address_size();
        let size = self.dst_address_size();

        unresolved_address(
            false,
            self.m_field() == 1,
            self.dac_field() == 1,
            self.dst_context_id(),
            self.dam_field(),
            &self.buffer.as_ref()[start..][..size],
        )
    }

    get_field!(dispatch_field, 0b111, 13);
    get_field!(tf_field, 0b11, 11);
    get_field!(nh_field, 0b1, 10);
    get_field!(hlim_field, 0b11, 8);
    get_field!(cid_field, 0b1, 7);
    get_field!(sac_field, 0b1, 6);
    get_field!(sam_field, 0b11, 4);
    get_field!(m_field, 0b1, 3);
    get_field!(dac_field, 0b1, 2);
    get_field!(dam_field, 0b11, 0);

    /// Return the start for the IP fields.
    fn ip_fields_start(&self) -> usize {
        2 + self.cid_size()
    }

    /// Get the size in octets of the traffic class field.
    fn traffic_class_size(&self) -> usize {
        match self.tf_field() {
            0b00 => 4,
            0b01 => 3,
            0b10 => 1,
            _ => 0,
        }
    }

    /// Get the size in octets of the next header field.
    fn next_header_size(&self) -> usize {
        (self.nh_field() != 1) as usize
    }

    /// Get the size in octets of the hop limit field.
    fn hop_limit_size(&self) -> usize {
        (self.hlim_field() == 0b00) as usize
    }

    /// Get the size in octets of the CID field.
    fn cid_size(&self) -> usize {
        (self.cid_field() == 1) as usize
    }

    fn src_addr_start(&self) -> usize {
        self.ip_fields_start()
            + self.traffic_class_size()
            + self.next_header_size()
            + self.hop_limit_size()
    }

    /// Get the size in octets of the source address.
    fn src_address_size(&self) -> usize {
        address_size(false, self.sac_field() == 1, self.sam_field())
    }

    /// Get the size in octets of the destination address.
    fn dst_address_size(&self) -> usize {
        address_size(self.m_field() == 1, self.dac_field() == 1, self.dam_field())
    }

    /// Return the length of the header.
    pub fn header_len(&self) -> usize {
        self.src_addr_start() + self.src_address_size() + self.dst_address_size()
    }
}

impl<'a, T: AsRef<[u8]> + ?Sized> Packet<&'a T> {
    /// Return a pointer to the payload.
    pub fn payload(&self) -> &'a [u8] {
        let len = self.header_len();
        let data = self.buffer.as_ref();
        &data[len..]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    /// Set the dispatch field to `0b011`.
    fn set_dispatch_field(&mut self) {
        let data = &mut self.buffer.as_mut()[field::IPHC_FIELD];
        let mut raw = NetworkEndian::read_u16(data);

        raw = (raw & !(0b111 << 13)) | ((DISPATCH_IPHC_HEADER as u16) << 13);
        NetworkEndian::write_u16(data, raw);
    }

    set_field!(set_tf_field, 0b11, 11);
    set_field!(set_nh_field, 0b1, 10);
    set_field!(set_hlim_field, 0b11, 8);
    set_field!(set_cid_field, 0b1, 7);
    set_field!(set_sac_field, 0b1, 6);
    set_field!(set_sam_field, 0b11, 4);
    set_field!(set_m_field, 0b1, 3);
    set_field!(set_dac_field, 0b1, 2);
    set_field!(set_dam_field, 0b11, 0);

    fn set_field(&mut self, idx: usize, value: &[u8]) -> usize {
        let raw = self.buffer.as_mut();
        raw[idx..idx + value.len()].copy_from_slice(value);
        idx + value.len()
    }

    /// Set the Traffic Class and Flow Label, using the smallest form that
    /// carries them.
    ///
    /// **NOTE**: `idx` is the offset at which the fields need to be written to.
    fn set_traffic_class(&mut self, traffic_class: u8, flow_label: u32, idx: usize) -> usize {
        let flow_label = flow_label & FLOW_LABEL_MASK;
        let ecn = traffic_class & 0b11;
        let dscp = traffic_class >> 2;
        let mode = tf_mode(traffic_class, flow_label);
        self.set_tf_field(mode);

        let mut bytes = [0u8; 4];
        NetworkEndian::write_u32(&mut bytes, flow_label);
        match mode {
            0b00 => {
                bytes[0] = (ecn << 6) | dscp;
                self.set_field(idx, &bytes)
            }
            0b01 => {
                bytes[1] |= ecn << 6;
                self.set_field(idx, &bytes[1..])
            }
            0b10 => self.set_field(idx, &[(ecn << 6) | dscp]),
            _ => idx,
        }
    }

    /// Set the Next Header.
    ///
    /// **NOTE**: `idx` is the offset at which the Next Header needs to be written to.
    fn set_next_header(&mut self, nh: NextHeader, idx: usize) -> usize {
        match nh {
            NextHeader::Uncompressed(nh) => {
                self.set_nh_field(0);
                self.set_field(idx, &[nh.into()])
            }
            NextHeader::Compressed => {
                self.set_nh_field(1);
                idx
            }
        }
    }

    /// Set the Hop Limit.
    ///
    /// **NOTE**: `idx` is the offset at which the Hop Limit needs to be written to.
    fn set_hop_limit(&mut self, hl: u8, idx: usize) -> usize {
        match hl {
            255 => self.set_hlim_field(0b11),
            64 => self.set_hlim_field(0b10),
            1 => self.set_hlim_field(0b01),
            _ => {
                self.set_hlim_field(0b00);
                return self.set_field(idx, &[hl]);
            }
        }

        idx
    }

    /// Return a mutable pointer to the payload.
    pub fn payload_mut(&mut self) -> &mut [u8] {
        let len = self.header_len();
        let data = self.buffer.as_mut();
        &mut data[len..]
    }
}

fn tf_mode(traffic_class: u8, flow_label: u32) -> u8 {
    match (traffic_class, flow_label & FLOW_LABEL_MASK) {
        (0, 0) => 0b11,
        (_, 0) => 0b10,
        (tc, _) if tc >> 2 == 0 => 0b01,
        _ => 0b00,
    }
}

/// How one address is carried in an IPHC header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AddressEncoding {
    multicast: bool,
    stateful: bool,
    context: u8,
    mode: u8,
    inline: [u8; 16],
    inline_len: usize,
}

impl AddressEncoding {
    fn new(multicast: bool, stateful: bool, context: u8, mode: u8, inline: &[u8]) -> Self {
        let mut bytes = [0u8; 16];
        bytes[..inline.len()].copy_from_slice(inline);
        AddressEncoding {
            multicast,
            stateful,
            context,
            mode,
            inline: bytes,
            inline_len: inline.len(),
        }
    }

    fn inline(&self) -> &[u8] {
        &self.inline[..self.inline_len]
    }

    /// Whether a receiver expands this encoding back into `addr`.
    fn reproduces(
        &self,
        is_src: bool,
        addr: &ipv6::Address,
        ll_addr: Option<LlAddress>,
        contexts: &[Option<AddressContext>],
    ) -> bool {
        unresolved_address(
            is_src,
            self.multicast,
            self.stateful,
            self.context,
            self.mode,
            self.inline(),
        )
        .resolve(ll_addr, contexts)
            == Ok(*addr)
    }

    /// Pick the most compact encoding for a unicast address, trying stateless
    /// link-local compression first, then every context allowed to compress
    /// in ascending id order, and falling back to the full address.
    fn unicast(
        is_src: bool,
        addr: &ipv6::Address,
        ll_addr: Option<LlAddress>,
        contexts: &[Option<AddressContext>],
    ) -> Self {
        let octets = addr.octets();

        if is_src && addr.is_unspecified() {
            return AddressEncoding::new(false, true, 0, 0b00, &[]);
        }

        let try_iid = |stateful: bool, context: u8| {
            let candidates: [(u8, &[u8]); 3] =
                [(0b11, &[]), (0b10, &octets[14..]), (0b01, &octets[8..])];
            candidates
                .iter()
                .map(|&(mode, inline)| AddressEncoding::new(false, stateful, context, mode, inline))
                .find(|encoding| encoding.reproduces(is_src, addr, ll_addr, contexts))
        };

        if addr.has_link_local_prefix() {
            if let Some(encoding) = try_iid(false, 0) {
                return encoding;
            }
        }

        let usable = contexts
            .iter()
            .take(MAX_CONTEXT_ID)
            .enumerate()
            .filter(|(_, context)| matches!(context, Some(context) if context.compress()));
        for (id, _) in usable {
            if let Some(encoding) = try_iid(true, id as u8) {
                return encoding;
            }
        }

        AddressEncoding::new(false, false, 0, 0b00, &octets)
    }

    /// Pick the most compact stateless encoding for a multicast address.
    fn multicast(addr: &ipv6::Address) -> Self {
        let o = addr.octets();
        let inline32 = [o[1], o[13], o[14], o[15]];
        let inline48 = [o[1], o[11], o[12], o[13], o[14], o[15]];
        let candidates: [(u8, &[u8]); 3] = [(0b11, &o[15..]), (0b10, &inline32), (0b01, &inline48)];

        candidates
            .iter()
            .map(|&(mode, inline)| AddressEncoding::new(true, false, 0, mode, inline))
            .find(|encoding| encoding.reproduces(false, addr, None, &[]))
            .unwrap_or_else(|| AddressEncoding::new(true, false, 0, 0b00, &o))
    }
}

/// A high-level representation of a 6LoWPAN IPHC header.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Repr {
    pub src_addr: ipv6::Address,
    pub ll_src_addr: Option<LlAddress>,
    pub dst_addr: ipv6::Address,
    pub ll_dst_addr: Option<LlAddress>,
    pub next_header: NextHeader,
    pub hop_limit: u8,
    pub traffic_class: u8,
    pub flow_label: u32,
}

impl core::fmt::Display for Repr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "IPHC src={} dst={} nxt-hdr={} hop-limit={}",
            self.src_addr, self.dst_addr, self.next_header, self.hop_limit
        )
    }
}

impl Repr {
    /// Parse a 6LoWPAN IPHC header and return a high-level representation.
    ///
    /// The `ll_src_addr` and `ll_dst_addr` are the link-layer addresses used for resolving
    /// elided interface identifiers; `contexts` is the shared context table.
    pub fn parse<T: AsRef<[u8]> + ?Sized>(
        packet: &Packet<&T>,
        ll_src_addr: Option<LlAddress>,
        ll_dst_addr: Option<LlAddress>,
        contexts: &[Option<AddressContext>],
    ) -> Result<Self> {
        match packet.buffer.as_ref().first() {
            // This is not an LOWPAN_IPHC packet.
            Some(&byte) if byte >> 5 != DISPATCH_IPHC_HEADER => {
                return Err(Error::UnknownDispatch(byte))
            }
            // Ensure basic accessors will work.
            _ => packet.check_len()?,
        }

        let src_addr = packet.src_addr().resolve(ll_src_addr, contexts)?;
        let dst_addr = packet.dst_addr().resolve(ll_dst_addr, contexts)?;

        Ok(Self {
            src_addr,
            ll_src_addr,
            dst_addr,
            ll_dst_addr,
            next_header: packet.next_header(),
            hop_limit: packet.hop_limit(),
            traffic_class: packet.traffic_class(),
            flow_label: packet.flow_label(),
        })
    }

    fn encode(&self, contexts: &[Option<AddressContext>]) -> (AddressEncoding, AddressEncoding) {
        let src = AddressEncoding::unicast(true, &self.src_addr, self.ll_src_addr, contexts);
        let dst = if self.dst_addr.is_multicast() {
            AddressEncoding::multicast(&self.dst_addr)
        } else {
            AddressEncoding::unicast(false, &self.dst_addr, self.ll_dst_addr, contexts)
        };
        (src, dst)
    }

    /// Return the context id octet, if one is needed.
    fn cid(src: &AddressEncoding, dst: &AddressEncoding) -> Option<u8> {
        let src_id = if src.stateful { src.context } else { 0 };
        let dst_id = if dst.stateful { dst.context } else { 0 };
        if src_id == 0 && dst_id == 0 {
            None
        } else {
            Some((src_id << 4) | dst_id)
        }
    }

    /// Return the length of a header that will be emitted from this high-level representation.
    pub fn buffer_len(&self, contexts: &[Option<AddressContext>]) -> usize {
        let (src, dst) = self.encode(contexts);
        let mut len = 2; // The minimal header length

        len += Self::cid(&src, &dst).is_some() as usize;

        len += match tf_mode(self.traffic_class, self.flow_label) {
            0b00 => 4,
            0b01 => 3,
            0b10 => 1,
            _ => 0,
        };

        len += match self.next_header {
            NextHeader::Compressed => 0,
            NextHeader::Uncompressed(_) => 1,
        };

        len += match self.hop_limit {
            255 | 64 | 1 => 0,
            _ => 1,
        };

        len + src.inline_len + dst.inline_len
    }

    /// Emit a high-level representation into a 6LoWPAN IPHC header.
    pub fn emit<T: AsRef<[u8]> + AsMut<[u8]>>(
        &self,
        packet: &mut Packet<T>,
        contexts: &[Option<AddressContext>],
    ) {
        let (src, dst) = self.encode(contexts);

        packet.set_dispatch_field();

        let mut idx = 2;
        match Self::cid(&src, &dst) {
            Some(cid) => {
                packet.set_cid_field(1);
                idx = packet.set_field(idx, &[cid]);
            }
            None => packet.set_cid_field(0),
        }

        let idx = packet.set_traffic_class(self.traffic_class, self.flow_label, idx);
        let idx = packet.set_next_header(self.next_header, idx);
        let idx = packet.set_hop_limit(self.hop_limit, idx);

        packet.set_sac_field(src.stateful as u8);
        packet.set_sam_field(src.mode);
        let idx = packet.set_field(idx, src.inline());

        packet.set_m_field(dst.multicast as u8);
        packet.set_dac_field(dst.stateful as u8);
        packet.set_dam_field(dst.mode);
        packet.set_field(idx, dst.inline());
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const PREFIX: ipv6::Address = ipv6::Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0);

    fn repr(src_addr: ipv6::Address, dst_addr: ipv6::Address) -> Repr {
        Repr {
            src_addr,
            ll_src_addr: None,
            dst_addr,
            ll_dst_addr: None,
            next_header: NextHeader::Uncompressed(IpProtocol::Udp),
            hop_limit: 64,
            traffic_class: 0,
            flow_label: 0,
        }
    }

    fn emit(repr: &Repr, contexts: &[Option<AddressContext>]) -> Vec<u8> {
        let mut buffer = vec![0u8; repr.buffer_len(contexts)];
        repr.emit(&mut Packet::new_unchecked(&mut buffer[..]), contexts);
        buffer
    }

    fn parse_back(repr: &Repr, bytes: &[u8], contexts: &[Option<AddressContext>]) -> Repr {
        let packet = Packet::new_checked(bytes).unwrap();
        assert_eq!(packet.header_len(), bytes.len());
        Repr::parse(&packet, repr.ll_src_addr, repr.ll_dst_addr, contexts).unwrap()
    }

    #[test]
    fn iphc_fields() {
        let bytes = [
            0x7a, 0x33, // IPHC
            0x3a, // Next header
        ];

        let packet = Packet::new_unchecked(bytes);

        assert_eq!(packet.dispatch_field(), 0b011);
        assert_eq!(packet.tf_field(), 0b11);
        assert_eq!(packet.nh_field(), 0b0);
        assert_eq!(packet.hlim_field(), 0b10);
        assert_eq!(packet.cid_field(), 0b0);
        assert_eq!(packet.sac_field(), 0b0);
        assert_eq!(packet.sam_field(), 0b11);
        assert_eq!(packet.m_field(), 0b0);
        assert_eq!(packet.dac_field(), 0b0);
        assert_eq!(packet.dam_field(), 0b11);

        assert_eq!(
            packet.next_header(),
            NextHeader::Uncompressed(IpProtocol::Icmpv6)
        );

        assert_eq!(packet.src_address_size(), 0);
        assert_eq!(packet.dst_address_size(), 0);
        assert_eq!(packet.hop_limit(), 64);

        assert_eq!(
            packet.src_addr(),
            UnresolvedAddress::WithoutContext(AddressMode::FullyElided)
        );
        assert_eq!(
            packet.dst_addr(),
            UnresolvedAddress::WithoutContext(AddressMode::FullyElided)
        );

        let bytes = [
            0x7e, 0xf7, // IPHC,
            0x00, // CID
        ];

        let packet = Packet::new_unchecked(bytes);

        assert_eq!(packet.dispatch_field(), 0b011);
        assert_eq!(packet.tf_field(), 0b11);
        assert_eq!(packet.nh_field(), 0b1);
        assert_eq!(packet.hlim_field(), 0b10);
        assert_eq!(packet.cid_field(), 0b1);
        assert_eq!(packet.sac_field(), 0b1);
        assert_eq!(packet.sam_field(), 0b11);
        assert_eq!(packet.m_field(), 0b0);
        assert_eq!(packet.dac_field(), 0b1);
        assert_eq!(packet.dam_field(), 0b11);

        assert_eq!(packet.next_header(), NextHeader::Compressed);

        assert_eq!(packet.src_address_size(), 0);
        assert_eq!(packet.dst_address_size(), 0);
        assert_eq!(packet.hop_limit(), 64);

        assert_eq!(
            packet.src_addr(),
            UnresolvedAddress::WithContext((0, AddressMode::FullyElided))
        );
        assert_eq!(
            packet.dst_addr(),
            UnresolvedAddress::WithContext((0, AddressMode::FullyElided))
        );
    }

    #[test]
    fn truncated_header() {
        // The next header is announced in-line but missing.
        assert_eq!(
            Packet::new_checked(&[0x7a, 0x33][..]).err(),
            Some(Error::MalformedFrame { offset: 2 })
        );
        assert_eq!(
            Packet::new_checked(&[0x7a][..]).err(),
            Some(Error::MalformedFrame { offset: 1 })
        );
    }

    #[test]
    fn wrong_dispatch() {
        let bytes = [0x41, 0x33, 0x3a];
        let packet = Packet::new_unchecked(&bytes[..]);
        assert_eq!(
            Repr::parse(&packet, None, None, &[]),
            Err(Error::UnknownDispatch(0x41))
        );
    }

    #[test]
    fn unknown_context() {
        let bytes = [0x7e, 0xf7, 0x00];
        let packet = Packet::new_unchecked(&bytes[..]);
        let ll = Some(LlAddress::Short([0, 1]));

        assert_eq!(
            Repr::parse(&packet, ll, ll, &[None; 16]),
            Err(Error::UnknownContext(0))
        );
        assert_eq!(
            Repr::parse(&packet, ll, ll, &[]),
            Err(Error::ContextIndexOutOfRange(0))
        );
    }

    #[test]
    fn link_local_elided_emit() {
        let mut repr = repr(
            ipv6::Address::new(0xfe80, 0, 0, 0, 0, 0x00ff, 0xfe00, 0x1234),
            ipv6::Address::new(0xff02, 0, 0, 0, 0, 0, 0, 1),
        );
        repr.ll_src_addr = Some(LlAddress::Short([0x12, 0x34]));

        let bytes = emit(&repr, &[]);
        assert_eq!(bytes, [0x7a, 0x3b, 0x11, 0x01]);
        assert_eq!(parse_back(&repr, &bytes, &[]), repr);
    }

    #[test]
    fn link_local_inline_forms() {
        // 16 bits when the link-layer address does not match.
        let mut repr = repr(
            ipv6::Address::new(0xfe80, 0, 0, 0, 0, 0x00ff, 0xfe00, 0x0001),
            ipv6::Address::new(0xfe80, 0, 0, 0, 0x0200, 0, 0, 0x0002),
        );
        repr.ll_src_addr = Some(LlAddress::Short([0x00, 0x02]));

        let bytes = emit(&repr, &[]);
        let packet = Packet::new_checked(&bytes[..]).unwrap();
        assert_eq!(packet.sam_field(), 0b10);
        assert_eq!(packet.dam_field(), 0b01);
        assert_eq!(bytes.len(), 2 + 1 + 2 + 8);
        assert_eq!(parse_back(&repr, &bytes, &[]), repr);

        // An extended link-layer address elides the EUI-64 identifier.
        repr.ll_dst_addr = Some(LlAddress::Extended([0, 0, 0, 0, 0, 0, 0, 0x02]));
        let bytes = emit(&repr, &[]);
        let packet = Packet::new_checked(&bytes[..]).unwrap();
        assert_eq!(packet.dam_field(), 0b11);
        assert_eq!(parse_back(&repr, &bytes, &[]), repr);
    }

    #[test]
    fn unspecified_source() {
        let repr = repr(
            ipv6::Address::UNSPECIFIED,
            ipv6::Address::new(0xff02, 0, 0, 0, 0, 0, 0, 2),
        );
        let bytes = emit(&repr, &[]);
        let packet = Packet::new_checked(&bytes[..]).unwrap();
        assert_eq!(packet.sac_field(), 1);
        assert_eq!(packet.sam_field(), 0b00);
        assert_eq!(packet.src_addr_start(), packet.header_len() - 1);
        assert_eq!(parse_back(&repr, &bytes, &[]), repr);
    }

    #[test]
    fn context_compression() {
        let contexts = [
            Some(AddressContext::new(PREFIX, 64, false).unwrap()),
            Some(AddressContext::new(PREFIX, 64, true).unwrap()),
        ];
        let mut repr = repr(
            ipv6::Address::new(0x2001, 0xdb8, 0, 0, 0, 0x00ff, 0xfe00, 0x0007),
            ipv6::Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1),
        );
        repr.ll_src_addr = Some(LlAddress::Short([0xab, 0xcd]));
        repr.next_header = NextHeader::Compressed;
        repr.hop_limit = 255;

        let bytes = emit(&repr, &contexts);
        assert_eq!(
            bytes,
            [
                0x7f, 0xe5, // IPHC
                0x11, // CID
                0x00, 0x07, // source
                0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01 // destination
            ]
        );
        assert_eq!(parse_back(&repr, &bytes, &contexts), repr);
    }

    #[test]
    fn context_not_for_compression() {
        let contexts = [Some(AddressContext::new(PREFIX, 64, false).unwrap())];
        let repr = repr(
            ipv6::Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1),
            ipv6::Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 2),
        );
        let bytes = emit(&repr, &contexts);
        let packet = Packet::new_checked(&bytes[..]).unwrap();
        assert_eq!(packet.sac_field(), 0);
        assert_eq!(packet.sam_field(), 0b00);
        assert_eq!(packet.dac_field(), 0);
        assert_eq!(bytes.len(), 2 + 1 + 16 + 16);
        assert_eq!(parse_back(&repr, &bytes, &contexts), repr);
    }

    #[test]
    fn multicast_forms() {
        let cases = [
            (ipv6::Address::new(0xff02, 0, 0, 0, 0, 0, 0, 0x1a), 0b11, 1),
            (ipv6::Address::new(0xff05, 0, 0, 0, 0, 0, 0x00ab, 0xcdef), 0b10, 4),
            (ipv6::Address::new(0xff0e, 0, 0, 0, 0, 0x00ab, 0xcdef, 0x0123), 0b01, 6),
            (ipv6::Address::new(0xff0e, 0x0001, 0, 0, 0, 0, 0, 1), 0b00, 16),
        ];
        let src = ipv6::Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 1);

        for (dst, dam, size) in cases {
            let repr = repr(src, dst);
            let bytes = emit(&repr, &[]);
            let packet = Packet::new_checked(&bytes[..]).unwrap();
            assert_eq!(packet.m_field(), 1);
            assert_eq!(packet.dac_field(), 0);
            assert_eq!(packet.dam_field(), dam);
            assert_eq!(packet.dst_address_size(), size);
            assert_eq!(parse_back(&repr, &bytes, &[]), repr);
        }
    }

    #[test]
    fn traffic_class_and_flow_label() {
        let src = ipv6::Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 1);
        let dst = ipv6::Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 2);

        // (traffic class, flow label, TF, in-line octets)
        let cases: [(u8, u32, u8, &[u8]); 4] = [
            (0, 0, 0b11, &[]),
            (0xb8, 0, 0b10, &[0x2e]),
            (0x01, 0x12345, 0b01, &[0x41, 0x23, 0x45]),
            (0xb9, 0xabcde, 0b00, &[0x6e, 0x0a, 0xbc, 0xde]),
        ];

        for (traffic_class, flow_label, tf, inline) in cases {
            let mut repr = repr(src, dst);
            repr.traffic_class = traffic_class;
            repr.flow_label = flow_label;

            let bytes = emit(&repr, &[]);
            let packet = Packet::new_checked(&bytes[..]).unwrap();
            assert_eq!(packet.tf_field(), tf);
            assert_eq!(&bytes[2..2 + inline.len()], inline);
            assert_eq!(packet.traffic_class(), traffic_class);
            assert_eq!(packet.flow_label(), flow_label);
        }
    }

    #[test]
    fn unicast_prefix_multicast_decode() {
        let contexts = [Some(AddressContext::new(PREFIX, 64, true).unwrap())];
        let bytes = [
            0x7e, 0xbc, // IPHC: M=1 DAC=1 DAM=00
            0x00, // CID
            0x3e, 0x00, 0x00, 0x00, 0x00, 0x01,
        ];
        let packet = Packet::new_checked(&bytes[..]).unwrap();
        let ll = Some(LlAddress::Short([0x00, 0x01]));
        let repr = Repr::parse(&packet, ll, None, &contexts).unwrap();
        assert_eq!(
            repr.dst_addr,
            ipv6::Address::new(0xff3e, 0x0040, 0x2001, 0xdb8, 0, 0, 0, 1)
        );
        assert_eq!(repr.next_header, NextHeader::Compressed);
        assert_eq!(repr.hop_limit, 64);
    }
}
