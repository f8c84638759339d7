use bitflags::bitflags;
use byteorder::{ByteOrder, NetworkEndian};
use core::fmt;

use super::{Error, Result};
use crate::iface::ChecksumCapabilities;
use crate::wire::ip::checksum;
use crate::wire::{IpProtocol, Ipv6Address, Ipv6AddressExt};

enum_with_unknown! {
    /// Internet protocol control message type.
    pub enum Message(u8) {
        /// Destination Unreachable.
        DstUnreachable  = 0x01,
        /// Packet Too Big.
        PktTooBig       = 0x02,
        /// Time Exceeded.
        TimeExceeded    = 0x03,
        /// Parameter Problem.
        ParamProblem    = 0x04,
        /// Echo Request
        EchoRequest     = 0x80,
        /// Echo Reply
        EchoReply       = 0x81,
        /// Router Solicitation
        RouterSolicit   = 0x85,
        /// Router Advertisement
        RouterAdvert    = 0x86,
        /// Neighbor Solicitation
        NeighborSolicit = 0x87,
        /// Neighbor Advertisement
        NeighborAdvert  = 0x88,
        /// Redirect
        Redirect        = 0x89,
    }
}

impl Message {
    /// Per [RFC 4443 § 2.1] ICMPv6 message types with the highest order
    /// bit set are informational messages while message types without
    /// the highest order bit set are error messages.
    ///
    /// [RFC 4443 § 2.1]: https://tools.ietf.org/html/rfc4443#section-2.1
    pub fn is_error(&self) -> bool {
        (u8::from(*self) & 0x80) != 0x80
    }

    /// Return a boolean value indicating if the given message type
    /// is an [NDISC] message type.
    ///
    /// [NDISC]: https://tools.ietf.org/html/rfc4861
    pub const fn is_ndisc(&self) -> bool {
        matches!(
            *self,
            Message::RouterSolicit
                | Message::RouterAdvert
                | Message::NeighborSolicit
                | Message::NeighborAdvert
                | Message::Redirect
        )
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Message::DstUnreachable => write!(f, "destination unreachable"),
            Message::PktTooBig => write!(f, "packet too big"),
            Message::TimeExceeded => write!(f, "time exceeded"),
            Message::ParamProblem => write!(f, "parameter problem"),
            Message::EchoReply => write!(f, "echo reply"),
            Message::EchoRequest => write!(f, "echo request"),
            Message::RouterSolicit => write!(f, "router solicitation"),
            Message::RouterAdvert => write!(f, "router advertisement"),
            Message::NeighborSolicit => write!(f, "neighbor solicitation"),
            Message::NeighborAdvert => write!(f, "neighbor advert"),
            Message::Redirect => write!(f, "redirect"),
            Message::Unknown(id) => write!(f, "{id}"),
        }
    }
}

enum_with_unknown! {
    /// Internet protocol control message subtype for type "Destination Unreachable".
    pub enum DstUnreachable(u8) {
        /// No Route to destination.
        NoRoute         = 0,
        /// Communication with destination administratively prohibited.
        AdminProhibit   = 1,
        /// Beyond scope of source address.
        BeyondScope     = 2,
        /// Address unreachable.
        AddrUnreachable = 3,
        /// Port unreachable.
        PortUnreachable = 4,
        /// Source address failed ingress/egress policy.
        FailedPolicy    = 5,
        /// Reject route to destination.
        RejectRoute     = 6,
    }
}

impl fmt::Display for DstUnreachable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DstUnreachable::NoRoute => write!(f, "no route to destination"),
            DstUnreachable::AdminProhibit => write!(
                f,
                "communication with destination administratively prohibited"
            ),
            DstUnreachable::BeyondScope => write!(f, "beyond scope of source address"),
            DstUnreachable::AddrUnreachable => write!(f, "address unreachable"),
            DstUnreachable::PortUnreachable => write!(f, "port unreachable"),
            DstUnreachable::FailedPolicy => {
                write!(f, "source address failed ingress/egress policy")
            }
            DstUnreachable::RejectRoute => write!(f, "reject route to destination"),
            DstUnreachable::Unknown(id) => write!(f, "{id}"),
        }
    }
}

enum_with_unknown! {
    /// Internet protocol control message subtype for the type "Parameter Problem".
    pub enum ParamProblem(u8) {
        /// Erroneous header field encountered.
        ErroneousHdrField  = 0,
        /// Unrecognized Next Header type encountered.
        UnrecognizedNxtHdr = 1,
        /// Unrecognized IPv6 option encountered.
        UnrecognizedOption = 2,
    }
}

impl fmt::Display for ParamProblem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ParamProblem::ErroneousHdrField => write!(f, "erroneous header field."),
            ParamProblem::UnrecognizedNxtHdr => write!(f, "unrecognized next header type."),
            ParamProblem::UnrecognizedOption => write!(f, "unrecognized IPv6 option."),
            ParamProblem::Unknown(id) => write!(f, "{id}"),
        }
    }
}

enum_with_unknown! {
    /// Internet protocol control message subtype for the type "Time Exceeded".
    pub enum TimeExceeded(u8) {
        /// Hop limit exceeded in transit.
        HopLimitExceeded    = 0,
        /// Fragment reassembly time exceeded.
        FragReassemExceeded = 1,
    }
}

impl fmt::Display for TimeExceeded {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TimeExceeded::HopLimitExceeded => write!(f, "hop limit exceeded in transit"),
            TimeExceeded::FragReassemExceeded => write!(f, "fragment reassembly time exceeded"),
            TimeExceeded::Unknown(id) => write!(f, "{id}"),
        }
    }
}

bitflags! {
    /// Flags carried by a Neighbor Advertisement.
    #[derive(Default)]
    pub struct NeighborFlags: u8 {
        const ROUTER    = 0b10000000;
        const SOLICITED = 0b01000000;
        const OVERRIDE  = 0b00100000;
    }
}

/// A read/write wrapper around an Internet Control Message Protocol version 6 packet buffer.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Packet<T: AsRef<[u8]>> {
    buffer: T,
}

// Ranges and constants describing key boundaries in the ICMPv6 header.
mod field {
    use crate::wire::field::*;

    // ICMPv6: See https://tools.ietf.org/html/rfc4443
    pub const TYPE: usize = 0;
    pub const CODE: usize = 1;
    pub const CHECKSUM: Field = 2..4;

    pub const UNUSED: Field = 4..8;
    pub const MTU: Field = 4..8;
    pub const POINTER: Field = 4..8;
    pub const ECHO_IDENT: Field = 4..6;
    pub const ECHO_SEQNO: Field = 6..8;

    // NDISC: See https://tools.ietf.org/html/rfc4861
    // Neighbor Solicitation and Advertisement message offsets
    pub const NEIGH_FLAGS: usize = 4;
    pub const TARGET_ADDR: Field = 8..24;
}

impl<T: AsRef<[u8]>> Packet<T> {
    /// Imbue a raw octet buffer with ICMPv6 packet structure.
    pub const fn new_unchecked(buffer: T) -> Packet<T> {
        Packet { buffer }
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    pub fn new_checked(buffer: T) -> Result<Packet<T>> {
        let packet = Self::new_unchecked(buffer);
        packet.check_len()?;
        Ok(packet)
    }

    /// Ensure that no accessor method will panic if called.
    /// Returns `Err(Error::OutOfRange)` if the buffer is too short for the
    /// header of its message type.
    pub fn check_len(&self) -> Result<()> {
        let len = self.buffer.as_ref().len();
        if len < field::CHECKSUM.end {
            return Err(Error::OutOfRange {
                offset: field::CHECKSUM.end - 1,
                len,
            });
        }
        let header_len = self.header_len();
        if len < header_len {
            Err(Error::OutOfRange {
                offset: header_len - 1,
                len,
            })
        } else {
            Ok(())
        }
    }

    /// Consume the packet, returning the underlying buffer.
    pub fn into_inner(self) -> T {
        self.buffer
    }

    /// Return the message type field.
    #[inline]
    pub fn msg_type(&self) -> Message {
        let data = self.buffer.as_ref();
        Message::from(data[field::TYPE])
    }

    /// Return the message code field.
    #[inline]
    pub fn msg_code(&self) -> u8 {
        let data = self.buffer.as_ref();
        data[field::CODE]
    }

    /// Return the checksum field.
    #[inline]
    pub fn checksum(&self) -> u16 {
        let data = self.buffer.as_ref();
        NetworkEndian::read_u16(&data[field::CHECKSUM])
    }

    /// Return the identifier field (for echo request and reply packets).
    #[inline]
    pub fn echo_ident(&self) -> u16 {
        let data = self.buffer.as_ref();
        NetworkEndian::read_u16(&data[field::ECHO_IDENT])
    }

    /// Return the sequence number field (for echo request and reply packets).
    #[inline]
    pub fn echo_seq_no(&self) -> u16 {
        let data = self.buffer.as_ref();
        NetworkEndian::read_u16(&data[field::ECHO_SEQNO])
    }

    /// Return the MTU field (for packet too big messages).
    #[inline]
    pub fn pkt_too_big_mtu(&self) -> u32 {
        let data = self.buffer.as_ref();
        NetworkEndian::read_u32(&data[field::MTU])
    }

    /// Return the pointer field (for parameter problem messages).
    #[inline]
    pub fn param_problem_ptr(&self) -> u32 {
        let data = self.buffer.as_ref();
        NetworkEndian::read_u32(&data[field::POINTER])
    }

    /// Return the flags field (for neighbor advertisements).
    #[inline]
    pub fn neighbor_flags(&self) -> NeighborFlags {
        let data = self.buffer.as_ref();
        NeighborFlags::from_bits_truncate(data[field::NEIGH_FLAGS])
    }

    /// Return the target address field (for neighbor solicitations and advertisements).
    #[inline]
    pub fn target_addr(&self) -> Ipv6Address {
        let data = self.buffer.as_ref();
        Ipv6Address::from_bytes(&data[field::TARGET_ADDR])
    }

    /// Return the header length. The result depends on the value of
    /// the message type field.
    pub fn header_len(&self) -> usize {
        match self.msg_type() {
            Message::DstUnreachable => field::UNUSED.end,
            Message::PktTooBig => field::MTU.end,
            Message::TimeExceeded => field::UNUSED.end,
            Message::ParamProblem => field::POINTER.end,
            Message::EchoRequest => field::ECHO_SEQNO.end,
            Message::EchoReply => field::ECHO_SEQNO.end,
            Message::RouterSolicit => field::UNUSED.end,
            Message::NeighborSolicit => field::TARGET_ADDR.end,
            Message::NeighborAdvert => field::TARGET_ADDR.end,
            // For other messages, only the type, code and checksum are
            // decoded. The rest of the header is left in the payload.
            _ => field::CHECKSUM.end,
        }
    }

    /// Validate the header checksum.
    ///
    /// # Fuzzing
    /// This function always returns `true` when fuzzing.
    pub fn verify_checksum(&self, src_addr: &Ipv6Address, dst_addr: &Ipv6Address) -> bool {
        if cfg!(fuzzing) {
            return true;
        }

        let data = self.buffer.as_ref();
        checksum::verify(src_addr, dst_addr, IpProtocol::Icmpv6, data)
    }

    /// Compute the checksum the message should carry, treating the checksum
    /// field as zero.
    pub fn expected_checksum(&self, src_addr: &Ipv6Address, dst_addr: &Ipv6Address) -> u16 {
        let data = self.buffer.as_ref();
        let accum =
            checksum::pseudo_header_sum(src_addr, dst_addr, IpProtocol::Icmpv6, data.len() as u32);
        let accum = checksum::running_sum(accum, &data[..field::CHECKSUM.start]);
        checksum::finalize(checksum::running_sum(accum, &data[field::CHECKSUM.end..]))
    }
}

impl<'a, T: AsRef<[u8]> + ?Sized> Packet<&'a T> {
    /// Return a pointer to the type-specific data.
    #[inline]
    pub fn payload(&self) -> &'a [u8] {
        let header_len = self.header_len();
        let data = self.buffer.as_ref();
        &data[header_len..]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    /// Set the message type field.
    #[inline]
    pub fn set_msg_type(&mut self, value: Message) {
        let data = self.buffer.as_mut();
        data[field::TYPE] = value.into()
    }

    /// Set the message code field.
    #[inline]
    pub fn set_msg_code(&mut self, value: u8) {
        let data = self.buffer.as_mut();
        data[field::CODE] = value
    }

    /// Clear any reserved fields in the message header.
    ///
    /// # Panics
    /// This function panics if the message type has not been set.
    /// See [set_msg_type].
    ///
    /// [set_msg_type]: #method.set_msg_type
    #[inline]
    pub fn clear_reserved(&mut self) {
        match self.msg_type() {
            Message::RouterSolicit
            | Message::NeighborSolicit
            | Message::NeighborAdvert
            | Message::DstUnreachable
            | Message::TimeExceeded => {
                let data = self.buffer.as_mut();
                NetworkEndian::write_u32(&mut data[field::UNUSED], 0);
            }
            _ => panic!("Message type `{}` does not have any reserved fields.", self.msg_type()),
        }
    }

    /// Set the checksum field.
    #[inline]
    pub fn set_checksum(&mut self, value: u16) {
        let data = self.buffer.as_mut();
        NetworkEndian::write_u16(&mut data[field::CHECKSUM], value)
    }

    /// Set the identifier field (for echo request and reply packets).
    #[inline]
    pub fn set_echo_ident(&mut self, value: u16) {
        let data = self.buffer.as_mut();
        NetworkEndian::write_u16(&mut data[field::ECHO_IDENT], value)
    }

    /// Set the sequence number field (for echo request and reply packets).
    #[inline]
    pub fn set_echo_seq_no(&mut self, value: u16) {
        let data = self.buffer.as_mut();
        NetworkEndian::write_u16(&mut data[field::ECHO_SEQNO], value)
    }

    /// Set the MTU field (for packet too big messages).
    #[inline]
    pub fn set_pkt_too_big_mtu(&mut self, value: u32) {
        let data = self.buffer.as_mut();
        NetworkEndian::write_u32(&mut data[field::MTU], value)
    }

    /// Set the pointer field (for parameter problem messages).
    #[inline]
    pub fn set_param_problem_ptr(&mut self, value: u32) {
        let data = self.buffer.as_mut();
        NetworkEndian::write_u32(&mut data[field::POINTER], value)
    }

    /// Set the flags field (for neighbor advertisements).
    #[inline]
    pub fn set_neighbor_flags(&mut self, value: NeighborFlags) {
        let data = self.buffer.as_mut();
        data[field::NEIGH_FLAGS] = value.bits();
    }

    /// Set the target address field (for neighbor solicitations and advertisements).
    #[inline]
    pub fn set_target_addr(&mut self, value: Ipv6Address) {
        let data = self.buffer.as_mut();
        data[field::TARGET_ADDR].copy_from_slice(&value.octets());
    }

    /// Compute and fill in the header checksum.
    pub fn fill_checksum(&mut self, src_addr: &Ipv6Address, dst_addr: &Ipv6Address) {
        let checksum = self.expected_checksum(src_addr, dst_addr);
        self.set_checksum(checksum)
    }

    /// Return a mutable pointer to the type-specific data.
    #[inline]
    pub fn payload_mut(&mut self) -> &mut [u8] {
        let header_len = self.header_len();
        let data = self.buffer.as_mut();
        &mut data[header_len..]
    }
}

impl<T: AsRef<[u8]>> AsRef<[u8]> for Packet<T> {
    fn as_ref(&self) -> &[u8] {
        self.buffer.as_ref()
    }
}

/// A high-level representation of an Internet Control Message Protocol version 6 header.
///
/// Message bodies (the invoking packet of an error, the echo data, NDISC
/// options) are not part of the representation and are handed to
/// [Repr::emit] separately.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Repr {
    DstUnreachable {
        reason: DstUnreachable,
    },
    PktTooBig {
        mtu: u32,
    },
    TimeExceeded {
        reason: TimeExceeded,
    },
    ParamProblem {
        reason: ParamProblem,
        pointer: u32,
    },
    EchoRequest {
        ident: u16,
        seq_no: u16,
    },
    EchoReply {
        ident: u16,
        seq_no: u16,
    },
    RouterSolicit,
    NeighborSolicit {
        target_addr: Ipv6Address,
    },
    NeighborAdvert {
        flags: NeighborFlags,
        target_addr: Ipv6Address,
    },
    /// Any message this stack does not decode beyond its type and code.
    Other {
        msg_type: Message,
        code: u8,
    },
}

impl Repr {
    /// Parse an Internet Control Message Protocol version 6 header and return
    /// a high-level representation.
    ///
    /// The checksum is left to [Packet::verify_checksum].
    pub fn parse<T>(packet: &Packet<&T>) -> Result<Repr>
    where
        T: AsRef<[u8]> + ?Sized,
    {
        packet.check_len()?;

        let repr = match (packet.msg_type(), packet.msg_code()) {
            (Message::DstUnreachable, code) => Repr::DstUnreachable {
                reason: DstUnreachable::from(code),
            },
            (Message::PktTooBig, 0) => Repr::PktTooBig {
                mtu: packet.pkt_too_big_mtu(),
            },
            (Message::TimeExceeded, code) => Repr::TimeExceeded {
                reason: TimeExceeded::from(code),
            },
            (Message::ParamProblem, code) => Repr::ParamProblem {
                reason: ParamProblem::from(code),
                pointer: packet.param_problem_ptr(),
            },
            (Message::EchoRequest, 0) => Repr::EchoRequest {
                ident: packet.echo_ident(),
                seq_no: packet.echo_seq_no(),
            },
            (Message::EchoReply, 0) => Repr::EchoReply {
                ident: packet.echo_ident(),
                seq_no: packet.echo_seq_no(),
            },
            (Message::RouterSolicit, 0) => Repr::RouterSolicit,
            (Message::NeighborSolicit, 0) => Repr::NeighborSolicit {
                target_addr: packet.target_addr(),
            },
            (Message::NeighborAdvert, 0) => Repr::NeighborAdvert {
                flags: packet.neighbor_flags(),
                target_addr: packet.target_addr(),
            },
            (msg_type, code) => Repr::Other { msg_type, code },
        };
        Ok(repr)
    }

    /// Return the message type of this representation.
    pub const fn msg_type(&self) -> Message {
        match *self {
            Repr::DstUnreachable { .. } => Message::DstUnreachable,
            Repr::PktTooBig { .. } => Message::PktTooBig,
            Repr::TimeExceeded { .. } => Message::TimeExceeded,
            Repr::ParamProblem { .. } => Message::ParamProblem,
            Repr::EchoRequest { .. } => Message::EchoRequest,
            Repr::EchoReply { .. } => Message::EchoReply,
            Repr::RouterSolicit => Message::RouterSolicit,
            Repr::NeighborSolicit { .. } => Message::NeighborSolicit,
            Repr::NeighborAdvert { .. } => Message::NeighborAdvert,
            Repr::Other { msg_type, .. } => msg_type,
        }
    }

    /// Return the length of a header that will be emitted from this high-level representation.
    ///
    /// The message body starts at this offset.
    pub const fn header_len(&self) -> usize {
        match *self {
            Repr::NeighborSolicit { .. } | Repr::NeighborAdvert { .. } => field::TARGET_ADDR.end,
            Repr::Other { .. } => field::CHECKSUM.end,
            _ => field::UNUSED.end,
        }
    }

    /// Emit a high-level representation into an Internet Control Message Protocol version 6
    /// packet. The packet buffer must be exactly `header_len()` plus the body length.
    pub fn emit<T>(
        &self,
        packet: &mut Packet<&mut T>,
        src_addr: &Ipv6Address,
        dst_addr: &Ipv6Address,
        emit_payload: impl FnOnce(&mut [u8]),
        checksum_caps: &ChecksumCapabilities,
    ) where
        T: AsRef<[u8]> + AsMut<[u8]> + ?Sized,
    {
        packet.set_msg_type(self.msg_type());
        match *self {
            Repr::DstUnreachable { reason } => {
                packet.set_msg_code(reason.into());
                packet.clear_reserved();
            }
            Repr::PktTooBig { mtu } => {
                packet.set_msg_code(0);
                packet.set_pkt_too_big_mtu(mtu);
            }
            Repr::TimeExceeded { reason } => {
                packet.set_msg_code(reason.into());
                packet.clear_reserved();
            }
            Repr::ParamProblem { reason, pointer } => {
                packet.set_msg_code(reason.into());
                packet.set_param_problem_ptr(pointer);
            }
            Repr::EchoRequest { ident, seq_no } | Repr::EchoReply { ident, seq_no } => {
                packet.set_msg_code(0);
                packet.set_echo_ident(ident);
                packet.set_echo_seq_no(seq_no);
            }
            Repr::RouterSolicit => {
                packet.set_msg_code(0);
                packet.clear_reserved();
            }
            Repr::NeighborSolicit { target_addr } => {
                packet.set_msg_code(0);
                packet.clear_reserved();
                packet.set_target_addr(target_addr);
            }
            Repr::NeighborAdvert { flags, target_addr } => {
                packet.set_msg_code(0);
                packet.clear_reserved();
                packet.set_neighbor_flags(flags);
                packet.set_target_addr(target_addr);
            }
            Repr::Other { code, .. } => packet.set_msg_code(code),
        }
        // `Other` keeps a known type's fixed fields in its body, so the body
        // starts after this representation's header rather than the packet's.
        emit_payload(&mut packet.buffer.as_mut()[self.header_len()..]);

        if checksum_caps.icmpv6.tx() {
            packet.fill_checksum(src_addr, dst_addr);
        } else {
            // make sure we get a consistently zeroed checksum, since implementations might rely on it
            packet.set_checksum(0);
        }
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ICMPv6 {}", self.msg_type())?;
        match *self {
            Repr::DstUnreachable { reason } => write!(f, " ({reason})"),
            Repr::PktTooBig { mtu } => write!(f, " mtu={mtu}"),
            Repr::TimeExceeded { reason } => write!(f, " ({reason})"),
            Repr::ParamProblem { reason, pointer } => write!(f, " ({reason}) ptr={pointer}"),
            Repr::EchoRequest { ident, seq_no } | Repr::EchoReply { ident, seq_no } => {
                write!(f, " id={ident} seq={seq_no}")
            }
            Repr::RouterSolicit => Ok(()),
            Repr::NeighborSolicit { target_addr } => write!(f, " target={target_addr}"),
            Repr::NeighborAdvert { flags, target_addr } => {
                write!(f, " target={target_addr}")?;
                if flags.contains(NeighborFlags::ROUTER) {
                    write!(f, " router")?;
                }
                if flags.contains(NeighborFlags::SOLICITED) {
                    write!(f, " solicited")?;
                }
                if flags.contains(NeighborFlags::OVERRIDE) {
                    write!(f, " override")?;
                }
                Ok(())
            }
            Repr::Other { code, .. } => write!(f, " code={code}"),
        }
    }
}

impl<'a, T: AsRef<[u8]> + ?Sized> fmt::Display for Packet<&'a T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match Repr::parse(self) {
            Ok(repr) => write!(f, "{repr} len={}", self.payload().len()),
            Err(err) => write!(f, "ICMPv6 ({err})"),
        }
    }
}
