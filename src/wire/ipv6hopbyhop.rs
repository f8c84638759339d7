use core::fmt;

use super::{Error, Result};
use crate::wire::ipv6option::Ipv6OptionsIterator;

pub use super::IpProtocol as Protocol;

/// A read/write wrapper around an IPv6 Hop-by-Hop Options Header.
#[derive(Debug, PartialEq, Eq)]
pub struct Header<T: AsRef<[u8]>> {
    buffer: T,
}

// Format of the Hop-by-Hop Options Header
//
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |  Next Header  |  Hdr Ext Len  |                               |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+                               +
// |                                                               |
// .                                                               .
// .                            Options                            .
// .                                                               .
// |                                                               |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//
//
// See https://tools.ietf.org/html/rfc8200#section-4.3 for details.
mod field {
    #![allow(non_snake_case)]

    use crate::wire::field::*;

    // Minimum size of the header.
    pub const MIN_HEADER_SIZE: usize = 8;

    // 8-bit identifier of the header immediately following this header.
    pub const NXT_HDR: usize = 0;
    // 8-bit unsigned integer. Length of the OPTIONS field in 8-octet units,
    // not including the first 8 octets.
    pub const LENGTH: usize = 1;
    // Variable-length field. Option-Type-specific data.
    //
    // Length of the header is in 8-octet units, not including the first 8 octets. The first two
    // octets are the next header type and the header length.
    pub const fn OPTIONS(length_field: u8) -> Field {
        let bytes = length_field as usize * 8 + 8;
        2..bytes
    }
}

impl<T: AsRef<[u8]>> Header<T> {
    /// Create a raw octet buffer with an IPv6 Hop-by-Hop Options Header structure.
    pub const fn new_unchecked(buffer: T) -> Header<T> {
        Header { buffer }
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    pub fn new_checked(buffer: T) -> Result<Header<T>> {
        let header = Self::new_unchecked(buffer);
        header.check_len()?;
        Ok(header)
    }

    /// Ensure that no accessor method will panic if called.
    ///
    /// Returns `Err(Error::OutOfRange)` if the buffer is shorter than the minimal
    /// header, and `Err(Error::MalformedFrame)` if the length field claims more
    /// octets than are present.
    ///
    /// The result of this check is invalidated by calling [set_length_field].
    ///
    /// [set_length_field]: #method.set_length_field
    pub fn check_len(&self) -> Result<()> {
        let data = self.buffer.as_ref();
        let len = data.len();

        if len < field::MIN_HEADER_SIZE {
            return Err(Error::OutOfRange {
                offset: field::MIN_HEADER_SIZE - 1,
                len,
            });
        }

        if len < field::OPTIONS(data[field::LENGTH]).end {
            return Err(Error::MalformedFrame {
                offset: field::LENGTH,
            });
        }

        Ok(())
    }

    /// Consume the header, returning the underlying buffer.
    pub fn into_inner(self) -> T {
        self.buffer
    }

    /// Return the next header field.
    #[inline]
    pub fn next_header(&self) -> Protocol {
        let data = self.buffer.as_ref();
        Protocol::from(data[field::NXT_HDR])
    }

    /// Return the raw length field: the header length in 8-octet units, not
    /// including the first 8 octets.
    #[inline]
    pub fn length_field(&self) -> u8 {
        let data = self.buffer.as_ref();
        data[field::LENGTH]
    }

    /// Return the length of the whole header in octets.
    #[inline]
    pub fn header_len(&self) -> usize {
        field::OPTIONS(self.length_field()).end
    }
}

impl<'a, T: AsRef<[u8]> + ?Sized> Header<&'a T> {
    /// Return the option data.
    #[inline]
    pub fn options(&self) -> &'a [u8] {
        let data = self.buffer.as_ref();
        &data[field::OPTIONS(data[field::LENGTH])]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Header<T> {
    /// Set the next header field.
    #[inline]
    pub fn set_next_header(&mut self, value: Protocol) {
        let data = self.buffer.as_mut();
        data[field::NXT_HDR] = value.into();
    }

    /// Set the raw length field.
    #[inline]
    pub fn set_length_field(&mut self, value: u8) {
        let data = self.buffer.as_mut();
        data[field::LENGTH] = value;
    }

    /// Return a mutable pointer to the option data.
    #[inline]
    pub fn options_mut(&mut self) -> &mut [u8] {
        let data = self.buffer.as_mut();
        let len = data[field::LENGTH];
        &mut data[field::OPTIONS(len)]
    }
}

impl<'a, T: AsRef<[u8]> + ?Sized> fmt::Display for Header<&'a T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match Repr::parse(self) {
            Ok(repr) => write!(f, "{repr}"),
            Err(err) => write!(f, "IPv6 Hop-by-Hop Options ({err})"),
        }
    }
}

/// A high-level representation of an IPv6 Hop-by-Hop Options header.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Repr<'a> {
    /// The type of header immediately following the Hop-by-Hop Options header.
    pub next_header: Protocol,
    /// The encoded options, a multiple of 8 octets minus the first two.
    pub options: &'a [u8],
}

impl<'a> Repr<'a> {
    /// Parse an IPv6 Hop-by-Hop Options Header and return a high-level representation.
    ///
    /// Every option must fit inside the header. Options of unknown type are
    /// kept as they are.
    pub fn parse<T>(header: &Header<&'a T>) -> Result<Repr<'a>>
    where
        T: AsRef<[u8]> + ?Sized,
    {
        header.check_len()?;
        let options = header.options();
        for opt in Ipv6OptionsIterator::new(options) {
            if let Err(Error::MalformedFrame { offset }) = opt {
                return Err(Error::MalformedFrame {
                    offset: field::OPTIONS(0).start + offset,
                });
            }
            opt?;
        }

        Ok(Repr {
            next_header: header.next_header(),
            options,
        })
    }

    /// Return the length, in bytes, of a header that will be emitted from this high-level
    /// representation.
    pub fn buffer_len(&self) -> usize {
        field::OPTIONS(0).start + self.options.len()
    }

    /// Emit a high-level representation into an IPv6 Hop-by-Hop Options Header.
    ///
    /// # Panics
    /// This function panics if the options do not end on an 8-octet boundary.
    pub fn emit<T: AsRef<[u8]> + AsMut<[u8]> + ?Sized>(&self, header: &mut Header<&mut T>) {
        assert_eq!(self.buffer_len() % 8, 0);
        header.set_next_header(self.next_header);
        header.set_length_field((self.buffer_len() / 8 - 1) as u8);
        header.options_mut().copy_from_slice(self.options);
    }

    /// Return an `Iterator` for the contained options.
    pub fn options(&self) -> Ipv6OptionsIterator<'a> {
        Ipv6OptionsIterator::new(self.options)
    }
}

impl<'a> fmt::Display for Repr<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "IPv6 Hop-by-Hop Options nxt_hdr={} len={}",
            self.next_header,
            self.buffer_len()
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::wire::Ipv6OptionRepr;

    // A Hop-by-Hop Option header with a PadN option of option data length 4.
    static REPR_PACKET_PAD4: [u8; 8] = [0x6, 0x0, 0x1, 0x4, 0x0, 0x0, 0x0, 0x0];

    // A Hop-by-Hop Option header with a PadN option of option data length 12.
    static REPR_PACKET_PAD12: [u8; 16] = [
        0x06, 0x1, 0x1, 0x0C, 0x0, 0x0, 0x0, 0x0, 0x0, 0x0, 0x0, 0x0, 0x0, 0x0, 0x0, 0x0,
    ];

    #[test]
    fn test_check_len() {
        // zero byte buffer
        assert!(Header::new_unchecked(&REPR_PACKET_PAD4[..0])
            .check_len()
            .is_err());
        // no length field
        assert!(Header::new_unchecked(&REPR_PACKET_PAD4[..1])
            .check_len()
            .is_err());
        // less than 8 bytes
        assert_eq!(
            Err(Error::OutOfRange { offset: 7, len: 7 }),
            Header::new_unchecked(&REPR_PACKET_PAD4[..7]).check_len()
        );
        // valid
        assert_eq!(Ok(()), Header::new_unchecked(&REPR_PACKET_PAD4).check_len());
        // valid
        assert_eq!(
            Ok(()),
            Header::new_unchecked(&REPR_PACKET_PAD12).check_len()
        );
        // length field value greater than number of bytes
        let header: [u8; 8] = [0x06, 0x1, 0x0, 0x0, 0x0, 0x0, 0x0, 0x0];
        assert_eq!(
            Err(Error::MalformedFrame { offset: 1 }),
            Header::new_unchecked(&header).check_len()
        );
    }

    #[test]
    fn test_large_length_field_does_not_overflow() {
        let mut bytes = [0u8; 16];
        bytes[1] = 0xff;
        assert_eq!(
            Header::new_checked(&bytes[..]),
            Err(Error::MalformedFrame { offset: 1 })
        );
    }

    #[test]
    fn test_header_deconstruct() {
        let header = Header::new_unchecked(&REPR_PACKET_PAD4);
        assert_eq!(header.next_header(), Protocol::Tcp);
        assert_eq!(header.length_field(), 0);
        assert_eq!(header.header_len(), 8);
        assert_eq!(header.options(), &REPR_PACKET_PAD4[2..]);

        let header = Header::new_unchecked(&REPR_PACKET_PAD12);
        assert_eq!(header.next_header(), Protocol::Tcp);
        assert_eq!(header.length_field(), 1);
        assert_eq!(header.header_len(), 16);
        assert_eq!(header.options(), &REPR_PACKET_PAD12[2..]);
    }

    #[test]
    fn test_overlong() {
        let mut bytes = vec![];
        bytes.extend(&REPR_PACKET_PAD4[..]);
        bytes.push(0);

        assert_eq!(
            Header::new_unchecked(&bytes).options().len(),
            REPR_PACKET_PAD4[2..].len()
        );
    }

    #[test]
    fn test_header_parse() {
        let header = Header::new_unchecked(&REPR_PACKET_PAD4);
        let repr = Repr::parse(&header).unwrap();
        assert_eq!(
            repr,
            Repr {
                next_header: Protocol::Tcp,
                options: &REPR_PACKET_PAD4[2..]
            }
        );
        let mut options = repr.options();
        assert_eq!(options.next(), Some(Ok(Ipv6OptionRepr::PadN(4))));
        assert_eq!(options.next(), None);
    }

    #[test]
    fn test_header_parse_rejects_overrunning_option() {
        // PadN claims 9 data octets inside a 6-octet option area.
        let bytes: [u8; 8] = [0x11, 0x0, 0x1, 0x9, 0x0, 0x0, 0x0, 0x0];
        let header = Header::new_unchecked(&bytes);
        assert_eq!(
            Repr::parse(&header),
            Err(Error::MalformedFrame { offset: 2 })
        );
    }

    #[test]
    fn test_repr_emit() {
        let repr = Repr {
            next_header: Protocol::Tcp,
            options: &REPR_PACKET_PAD12[2..],
        };
        let mut bytes = [0u8; 16];
        let mut header = Header::new_unchecked(&mut bytes);
        repr.emit(&mut header);
        assert_eq!(header.into_inner(), &REPR_PACKET_PAD12[..]);
    }
}
