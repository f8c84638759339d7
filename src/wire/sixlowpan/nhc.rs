//! Implementation of Next Header Compression from [RFC 6282 § 4].
//!
//! Only the UDP header compression of [RFC 6282 § 4.3] is decoded; compressed
//! extension headers are recognized so they can be rejected.
//!
//! [RFC 6282 § 4]: https://datatracker.ietf.org/doc/html/rfc6282#section-4
//! [RFC 6282 § 4.3]: https://datatracker.ietf.org/doc/html/rfc6282#section-4.3
use super::{Error, Result, DISPATCH_EXT_HEADER, DISPATCH_UDP_HEADER};
use crate::{
    iface::ChecksumCapabilities,
    wire::{ip::checksum, ipv6, udp::Repr as UdpRepr, IpProtocol, UDP_HEADER_LEN},
};
use byteorder::{ByteOrder, NetworkEndian};
use ipv6::Address;

macro_rules! get_field {
    ($name:ident, $mask:expr, $shift:expr) => {
        fn $name(&self) -> u8 {
            let data = self.buffer.as_ref();
            let raw = &data[0];
            ((raw >> $shift) & $mask) as u8
        }
    };
}

macro_rules! set_field {
    ($name:ident, $mask:expr, $shift:expr) => {
        fn $name(&mut self, val: u8) {
            let data = self.buffer.as_mut();
            let mut raw = data[0];
            raw = (raw & !($mask << $shift)) | (val << $shift);
            data[0] = raw;
        }
    };
}

/// The kind of a LOWPAN_NHC header, as told by its first octet.
///
/// An extension header has the following format ([RFC 6282 § 4.2]):
/// ```txt
///   0   1   2   3   4   5   6   7
/// +---+---+---+---+---+---+---+---+
/// | 1 | 1 | 1 | 0 |    EID    |NH |
/// +---+---+---+---+---+---+---+---+
/// ```
///
/// [RFC 6282 § 4.2]: https://datatracker.ietf.org/doc/html/rfc6282#section-4.2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NhcPacket {
    ExtHeader,
    UdpHeader,
}

impl NhcPacket {
    /// Returns the type of the Next Header header.
    /// This can either be an Extension header or an 6LoWPAN Udp header.
    ///
    /// # Errors
    /// Returns [Error::UnknownDispatch] when neither the Extension Header dispatch or the Udp
    /// dispatch is recognized, and [Error::MalformedFrame] for an empty buffer.
    pub fn dispatch(buffer: impl AsRef<[u8]>) -> Result<Self> {
        let raw = buffer.as_ref();
        let Some(&first) = raw.first() else {
            return Err(Error::MalformedFrame { offset: 0 });
        };

        if first >> 4 == DISPATCH_EXT_HEADER {
            // We have a compressed IPv6 Extension Header.
            Ok(Self::ExtHeader)
        } else if first >> 3 == DISPATCH_UDP_HEADER {
            // We have a compressed UDP header.
            Ok(Self::UdpHeader)
        } else {
            Err(Error::UnknownDispatch(first))
        }
    }
}

/// A read/write wrapper around a 6LoWPAN_NHC UDP frame.
/// [RFC 6282 § 4.3] specifies the format of the header.
///
/// The base header has the following format:
/// ```txt
///   0   1   2   3   4   5   6   7
/// +---+---+---+---+---+---+---+---+
/// | 1 | 1 | 1 | 1 | 0 | C |   P   |
/// +---+---+---+---+---+---+---+---+
/// With:
/// - C: checksum, specifies if the checksum is elided.
/// - P: ports, specifies if the ports are elided.
/// ```
///
/// [RFC 6282 § 4.3]: https://datatracker.ietf.org/doc/html/rfc6282#section-4.3
#[derive(Debug, Clone)]
pub struct UdpNhcPacket<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> UdpNhcPacket<T> {
    /// Input a raw octet buffer with a LOWPAN_NHC frame structure for UDP.
    pub const fn new_unchecked(buffer: T) -> Self {
        Self { buffer }
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
    /// Returns `Err(Error::MalformedFrame)` if the buffer is too short.
    pub fn check_len(&self) -> Result<()> {
        let len = self.buffer.as_ref().len();

        if len == 0 || self.header_len() > len {
            return Err(Error::MalformedFrame { offset: len });
        }

        Ok(())
    }

    /// Consumes the frame, returning the underlying buffer.
    pub fn into_inner(self) -> T {
        self.buffer
    }

    get_field!(dispatch_field, 0b11111, 3);
    get_field!(checksum_field, 0b1, 2);
    get_field!(ports_field, 0b11, 0);

    /// Returns the index of the start of the next header compressed fields.
    const fn nhc_fields_start(&self) -> usize {
        1
    }

    /// Return the source port number.
    pub fn src_port(&self) -> u16 {
        let data = self.buffer.as_ref();
        let start = self.nhc_fields_start();

        match self.ports_field() {
            // The full 16 bits are carried in-line.
            0b00 | 0b01 => NetworkEndian::read_u16(&data[start..start + 2]),
            // The first 8 bits are elided.
            0b10 => 0xf000 + data[start] as u16,
            // The first 12 bits are elided.
            _ => 0xf0b0 + (data[start] >> 4) as u16,
        }
    }

    /// Return the destination port number.
    pub fn dst_port(&self) -> u16 {
        let data = self.buffer.as_ref();
        let idx = self.nhc_fields_start();

        match self.ports_field() {
            // The full 16 bits are carried in-line.
            0b00 => NetworkEndian::read_u16(&data[idx + 2..idx + 4]),
            // The first 8 bits are elided.
            0b01 => 0xf000 + data[idx + 2] as u16,
            // The full 16 bits are carried in-line, after the 8-bit source port.
            0b10 => NetworkEndian::read_u16(&data[idx + 1..idx + 3]),
            // The first 12 bits are elided.
            _ => 0xf0b0 + (data[idx] & 0x0f) as u16,
        }
    }

    /// Return the checksum, or `None` when it is elided and must be recomputed
    /// on the 6LoWPAN termination point.
    pub fn checksum(&self) -> Option<u16> {
        if self.checksum_field() == 0b0 {
            let data = self.buffer.as_ref();
            let start = self.nhc_fields_start() + self.ports_size();
            Some(NetworkEndian::read_u16(&data[start..start + 2]))
        } else {
            None
        }
    }

    /// Return the size of the checksum field.
    pub(crate) fn checksum_size(&self) -> usize {
        match self.checksum_field() {
            0b0 => 2,
            _ => 0,
        }
    }

    /// Returns the total size of both port numbers.
    pub(crate) fn ports_size(&self) -> usize {
        match self.ports_field() {
            0b00 => 4, // 16 bits + 16 bits
            0b01 => 3, // 16 bits + 8 bits
            0b10 => 3, // 8 bits + 16 bits
            _ => 1,    // 4 bits + 4 bits
        }
    }

    /// Return the length of the compressed header.
    pub fn header_len(&self) -> usize {
        self.nhc_fields_start() + self.ports_size() + self.checksum_size()
    }
}

impl<'a, T: AsRef<[u8]> + ?Sized> UdpNhcPacket<&'a T> {
    /// Return a pointer to the payload.
    pub fn payload(&self) -> &'a [u8] {
        let start = self.header_len();
        &self.buffer.as_ref()[start..]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> UdpNhcPacket<T> {
    /// Return a mutable pointer to the payload.
    pub fn payload_mut(&mut self) -> &mut [u8] {
        let start = self.header_len();
        &mut self.buffer.as_mut()[start..]
    }

    /// Set the dispatch field to `0b11110`.
    fn set_dispatch_field(&mut self) {
        let data = self.buffer.as_mut();
        data[0] = (data[0] & !(0b11111 << 3)) | (DISPATCH_UDP_HEADER << 3);
    }

    set_field!(set_checksum_field, 0b1, 2);
    set_field!(set_ports_field, 0b11, 0);

    fn set_ports(&mut self, src_port: u16, dst_port: u16) {
        let mut idx = 1;

        match (src_port, dst_port) {
            (0xf0b0..=0xf0bf, 0xf0b0..=0xf0bf) => {
                // We can compress both the source and destination ports.
                self.set_ports_field(0b11);
                let data = self.buffer.as_mut();
                data[idx] = (((src_port - 0xf0b0) as u8) << 4) | ((dst_port - 0xf0b0) as u8);
            }
            (0xf000..=0xf0ff, _) => {
                // We can compress the source port, but not the destination port.
                self.set_ports_field(0b10);
                let data = self.buffer.as_mut();
                data[idx] = (src_port - 0xf000) as u8;
                idx += 1;

                NetworkEndian::write_u16(&mut data[idx..idx + 2], dst_port);
            }
            (_, 0xf000..=0xf0ff) => {
                // We can compress the destination port, but not the source port.
                self.set_ports_field(0b01);
                let data = self.buffer.as_mut();
                NetworkEndian::write_u16(&mut data[idx..idx + 2], src_port);
                idx += 2;
                data[idx] = (dst_port - 0xf000) as u8;
            }
            (_, _) => {
                // We cannot compress any port.
                self.set_ports_field(0b00);
                let data = self.buffer.as_mut();
                NetworkEndian::write_u16(&mut data[idx..idx + 2], src_port);
                idx += 2;
                NetworkEndian::write_u16(&mut data[idx..idx + 2], dst_port);
            }
        };
    }

    fn set_checksum(&mut self, checksum: u16) {
        let idx = self.nhc_fields_start() + self.ports_size();
        let data = self.buffer.as_mut();
        NetworkEndian::write_u16(&mut data[idx..idx + 2], checksum);
    }
}

/// A high-level representation of a 6LoWPAN NHC UDP header.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct UdpNhcRepr(pub UdpRepr);

impl<'a> UdpNhcRepr {
    /// Parse a 6LoWPAN NHC UDP packet and return a high-level representation.
    ///
    /// The checksum is left to the caller, who rebuilds the UDP header and
    /// decides what a mismatch means.
    pub fn parse<T: AsRef<[u8]> + ?Sized>(packet: &UdpNhcPacket<&'a T>) -> Result<Self> {
        packet.check_len()?;

        if packet.dispatch_field() != DISPATCH_UDP_HEADER {
            return Err(Error::UnknownDispatch(packet.buffer.as_ref()[0]));
        }

        Ok(Self(UdpRepr {
            src_port: packet.src_port(),
            dst_port: packet.dst_port(),
        }))
    }

    /// Return the length of a header that will be emitted from this high-level representation.
    pub fn header_len(&self, elide_checksum: bool) -> usize {
        let len = if elide_checksum { 1 } else { 3 };

        // Check if we can compress the source and destination ports
        match (self.src_port, self.dst_port) {
            (0xf0b0..=0xf0bf, 0xf0b0..=0xf0bf) => len + 1,
            (0xf000..=0xf0ff, _) | (_, 0xf000..=0xf0ff) => len + 3,
            (_, _) => len + 4,
        }
    }

    /// Compute the checksum of the UDP datagram this header stands for.
    pub fn checksum(&self, src_addr: &Address, dst_addr: &Address, payload: &[u8]) -> u16 {
        let length = (UDP_HEADER_LEN + payload.len()) as u16;
        let sum = !checksum::combine(&[
            checksum::pseudo_header(src_addr, dst_addr, IpProtocol::Udp, length as u32),
            self.src_port,
            self.dst_port,
            length,
            checksum::data(payload),
        ]);

        // A zero checksum means "no checksum"; send all ones instead.
        if sum == 0 {
            0xffff
        } else {
            sum
        }
    }

    /// Emit a high-level representation into a LOWPAN_NHC UDP header.
    ///
    /// With `elide_checksum` the receiver recomputes the checksum from the payload.
    pub fn emit<T: AsRef<[u8]> + AsMut<[u8]>>(
        &self,
        packet: &mut UdpNhcPacket<T>,
        src_addr: &Address,
        dst_addr: &Address,
        emit_payload: impl FnOnce(&mut [u8]),
        elide_checksum: bool,
        checksum_caps: &ChecksumCapabilities,
    ) {
        packet.set_dispatch_field();
        packet.set_checksum_field(elide_checksum as u8);
        packet.set_ports(self.src_port, self.dst_port);
        emit_payload(packet.payload_mut());

        if !elide_checksum {
            let sum = if checksum_caps.udp.tx() {
                self.checksum(src_addr, dst_addr, packet.payload_mut())
            } else {
                0
            };
            packet.set_checksum(sum);
        }
    }
}

impl core::ops::Deref for UdpNhcRepr {
    type Target = UdpRepr;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl core::ops::DerefMut for UdpNhcRepr {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::wire::ipv6::test::{MOCK_IP_ADDR_1, MOCK_IP_ADDR_2};

    #[test]
    fn nhc_dispatch() {
        assert_eq!(NhcPacket::dispatch([0xf0]), Ok(NhcPacket::UdpHeader));
        assert_eq!(NhcPacket::dispatch([0xe3, 0x06]), Ok(NhcPacket::ExtHeader));
        assert_eq!(NhcPacket::dispatch([0x3a]), Err(Error::UnknownDispatch(0x3a)));
        assert_eq!(
            NhcPacket::dispatch([0u8; 0]),
            Err(Error::MalformedFrame { offset: 0 })
        );
    }

    #[test]
    fn udp_nhc_fields() {
        let bytes = [0xf0, 0x16, 0x2e, 0x22, 0x3d, 0x28, 0xc4];

        let packet = UdpNhcPacket::new_checked(&bytes[..]).unwrap();
        assert_eq!(packet.dispatch_field(), DISPATCH_UDP_HEADER);
        assert_eq!(packet.checksum(), Some(0x28c4));
        assert_eq!(packet.src_port(), 5678);
        assert_eq!(packet.dst_port(), 8765);
        assert_eq!(packet.header_len(), 7);
    }

    #[test]
    fn udp_nhc_short_ports() {
        // Both ports in 4 bits, checksum elided.
        let bytes = [0xf7, 0x1f, 0xaa];
        let packet = UdpNhcPacket::new_checked(&bytes[..]).unwrap();
        assert_eq!(packet.src_port(), 0xf0b1);
        assert_eq!(packet.dst_port(), 0xf0bf);
        assert_eq!(packet.checksum(), None);
        assert_eq!(packet.payload(), [0xaa]);

        // 16-bit source, 8-bit destination.
        let bytes = [0xf1, 0x16, 0x2e, 0x42, 0x00, 0x01];
        let packet = UdpNhcPacket::new_checked(&bytes[..]).unwrap();
        assert_eq!(packet.src_port(), 5678);
        assert_eq!(packet.dst_port(), 0xf042);
        assert_eq!(packet.checksum(), Some(0x0001));
    }

    #[test]
    fn udp_nhc_truncated() {
        assert_eq!(
            UdpNhcPacket::new_checked(&[0xf0, 0x16, 0x2e][..]).err(),
            Some(Error::MalformedFrame { offset: 3 })
        );
        assert_eq!(
            UdpNhcPacket::new_checked(&[0u8; 0][..]).err(),
            Some(Error::MalformedFrame { offset: 0 })
        );
    }

    #[test]
    fn udp_emit() {
        let udp = UdpNhcRepr(UdpRepr {
            src_port: 0xf0b1,
            dst_port: 0xf001,
        });

        let payload = b"Hello World!";

        let len = udp.header_len(false) + payload.len();
        let mut buffer = [0u8; 127];
        let mut packet = UdpNhcPacket::new_unchecked(&mut buffer[..len]);
        udp.emit(
            &mut packet,
            &MOCK_IP_ADDR_1,
            &MOCK_IP_ADDR_2,
            |buf| buf.copy_from_slice(&payload[..]),
            false,
            &ChecksumCapabilities::default(),
        );

        assert_eq!(packet.dispatch_field(), DISPATCH_UDP_HEADER);
        assert_eq!(packet.src_port(), 0xf0b1);
        assert_eq!(packet.dst_port(), 0xf001);
        assert_eq!(packet.payload_mut(), b"Hello World!");

        let expected = udp.checksum(&MOCK_IP_ADDR_1, &MOCK_IP_ADDR_2, payload);
        let packet = UdpNhcPacket::new_checked(&buffer[..len]).unwrap();
        assert_eq!(packet.checksum(), Some(expected));
        assert_eq!(UdpNhcRepr::parse(&packet), Ok(udp));
    }

    #[test]
    fn udp_emit_compressed_ports() {
        let udp = UdpNhcRepr(UdpRepr {
            src_port: 0xf0b2,
            dst_port: 0xf0b5,
        });

        let mut buffer = [0u8; 3];
        assert_eq!(udp.header_len(true) + 1, buffer.len());
        let mut packet = UdpNhcPacket::new_unchecked(&mut buffer[..]);
        udp.emit(
            &mut packet,
            &MOCK_IP_ADDR_1,
            &MOCK_IP_ADDR_2,
            |buf| buf[0] = 0x55,
            true,
            &ChecksumCapabilities::default(),
        );

        assert_eq!(buffer, [0xf7, 0x25, 0x55]);
    }

    #[test]
    fn udp_checksum_matches_uncompressed() {
        // The UDP datagram from fe80::1:61616 to fe80::2:5683 with "abcd"
        // carries checksum 0x3727.
        let udp = UdpNhcRepr(UdpRepr {
            src_port: 61616,
            dst_port: 5683,
        });
        assert_eq!(udp.checksum(&MOCK_IP_ADDR_1, &MOCK_IP_ADDR_2, b"abcd"), 0x3727);
    }
}
