use core::fmt;

use crate::wire::pretty_print::PrettyIndent;
use crate::wire::Ipv6Address;

enum_with_unknown! {
    /// IP datagram encapsulated protocol.
    pub enum Protocol(u8) {
        HopByHop  = 0x00,
        Tcp       = 0x06,
        Udp       = 0x11,
        Ipv6Route = 0x2b,
        Ipv6Frag  = 0x2c,
        Icmpv6    = 0x3a,
        Ipv6NoNxt = 0x3b,
        Ipv6Opts  = 0x3c,
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Protocol::HopByHop => write!(f, "Hop-by-Hop"),
            Protocol::Tcp => write!(f, "TCP"),
            Protocol::Udp => write!(f, "UDP"),
            Protocol::Ipv6Route => write!(f, "IPv6-Route"),
            Protocol::Ipv6Frag => write!(f, "IPv6-Frag"),
            Protocol::Icmpv6 => write!(f, "ICMPv6"),
            Protocol::Ipv6NoNxt => write!(f, "IPv6-NoNxt"),
            Protocol::Ipv6Opts => write!(f, "IPv6-Opts"),
            Protocol::Unknown(id) => write!(f, "0x{id:02x}"),
        }
    }
}

pub mod checksum {
    use byteorder::{ByteOrder, NetworkEndian};

    use super::*;

    fn propagate_carries(word: u32) -> u16 {
        let sum = (word >> 16) + (word & 0xffff);
        ((sum >> 16) as u16) + (sum as u16)
    }

    /// Fold 16-bit big-endian words of `data` into the running sum `acc`.
    ///
    /// A trailing odd byte is treated as the high-order byte of a final word.
    /// The returned sum is kept below 2^17, so it can be fed back in any
    /// number of times.
    pub fn running_sum(acc: u32, data: &[u8]) -> u32 {
        let mut accum = propagate_carries(acc) as u32;
        let mut words = data.chunks_exact(2);
        for word in &mut words {
            accum += NetworkEndian::read_u16(word) as u32;
            accum = (accum >> 16) + (accum & 0xffff);
        }
        if let [last] = words.remainder() {
            accum += (*last as u32) << 8;
            accum = (accum >> 16) + (accum & 0xffff);
        }
        accum
    }

    /// Fold the carries of a running sum and complement it.
    pub fn finalize(acc: u32) -> u16 {
        !propagate_carries(acc)
    }

    /// Compute an RFC 1071 compliant checksum (without the final complement).
    pub fn data(data: &[u8]) -> u16 {
        propagate_carries(running_sum(0, data))
    }

    /// Combine several RFC 1071 compliant checksums.
    pub fn combine(checksums: &[u16]) -> u16 {
        let mut accum: u32 = 0;
        for &word in checksums {
            accum += word as u32;
        }
        propagate_carries(accum)
    }

    /// Compute the IPv6 pseudo header sum for an upper-layer payload of
    /// `length` octets.
    pub fn pseudo_header_sum(
        src_addr: &Ipv6Address,
        dst_addr: &Ipv6Address,
        next_header: Protocol,
        length: u32,
    ) -> u32 {
        let mut proto_len = [0u8; 8];
        NetworkEndian::write_u32(&mut proto_len[0..4], length);
        proto_len[7] = next_header.into();

        let accum = running_sum(0, &src_addr.octets());
        let accum = running_sum(accum, &dst_addr.octets());
        running_sum(accum, &proto_len)
    }

    /// Compute an IPv6 pseudo header checksum (without the final complement).
    pub fn pseudo_header(
        src_addr: &Ipv6Address,
        dst_addr: &Ipv6Address,
        next_header: Protocol,
        length: u32,
    ) -> u16 {
        propagate_carries(pseudo_header_sum(src_addr, dst_addr, next_header, length))
    }

    /// Compute the checksum to store in an upper-layer header whose checksum
    /// field in `data` is zeroed.
    pub fn compute(
        src_addr: &Ipv6Address,
        dst_addr: &Ipv6Address,
        next_header: Protocol,
        data: &[u8],
    ) -> u16 {
        let accum = pseudo_header_sum(src_addr, dst_addr, next_header, data.len() as u32);
        finalize(running_sum(accum, data))
    }

    /// Check an upper-layer segment in `data` whose checksum field is filled in.
    pub fn verify(
        src_addr: &Ipv6Address,
        dst_addr: &Ipv6Address,
        next_header: Protocol,
        data: &[u8],
    ) -> bool {
        compute(src_addr, dst_addr, next_header, data) == 0
    }
}

pub(crate) fn pretty_print_ip_payload(
    f: &mut fmt::Formatter,
    indent: &mut PrettyIndent,
    src_addr: &Ipv6Address,
    dst_addr: &Ipv6Address,
    next_header: Protocol,
    payload: &[u8],
) -> fmt::Result {
    use crate::wire::{Icmpv6Packet, Ipv6HopByHopHeader, TcpPacket, UdpPacket};

    indent.increase(f)?;
    match next_header {
        Protocol::HopByHop => match Ipv6HopByHopHeader::new_checked(payload) {
            Err(err) => write!(f, "{indent}(Hop-by-Hop {err})"),
            Ok(header) => {
                write!(f, "{indent}{header}")?;
                let rest = &payload[header.header_len()..];
                pretty_print_ip_payload(f, indent, src_addr, dst_addr, header.next_header(), rest)
            }
        },
        Protocol::Udp => match UdpPacket::new_checked(payload) {
            Err(err) => write!(f, "{indent}(UDP {err})"),
            Ok(packet) => {
                write!(f, "{indent}{packet}")?;
                write_note(f, packet.verify_checksum(src_addr, dst_addr))
            }
        },
        Protocol::Tcp => match TcpPacket::new_checked(payload) {
            Err(err) => write!(f, "{indent}(TCP {err})"),
            Ok(packet) => {
                write!(f, "{indent}{packet}")?;
                write_note(f, packet.verify_checksum(src_addr, dst_addr))
            }
        },
        Protocol::Icmpv6 => match Icmpv6Packet::new_checked(payload) {
            Err(err) => write!(f, "{indent}(ICMPv6 {err})"),
            Ok(packet) => {
                write!(f, "{indent}{packet}")?;
                write_note(f, packet.verify_checksum(src_addr, dst_addr))
            }
        },
        other => write!(f, "{indent}{other} len={}", payload.len()),
    }
}

fn write_note(f: &mut fmt::Formatter, checksum_correct: bool) -> fmt::Result {
    if !checksum_correct {
        write!(f, " (checksum incorrect)")?;
    }
    Ok(())
}
