use core::fmt;

use byteorder::{ByteOrder, LittleEndian};

use super::{Error, Result};
use crate::wire::ipv6::Address as Ipv6Address;

const CRC_TABLE: [u16; 256] = [
    0x0000, 0x1189, 0x2312, 0x329b, 0x4624, 0x57ad, 0x6536, 0x74bf, 0x8c48, 0x9dc1, 0xaf5a, 0xbed3,
    0xca6c, 0xdbe5, 0xe97e, 0xf8f7, 0x1081, 0x0108, 0x3393, 0x221a, 0x56a5, 0x472c, 0x75b7, 0x643e,
    0x9cc9, 0x8d40, 0xbfdb, 0xae52, 0xdaed, 0xcb64, 0xf9ff, 0xe876, 0x2102, 0x308b, 0x0210, 0x1399,
    0x6726, 0x76af, 0x4434, 0x55bd, 0xad4a, 0xbcc3, 0x8e58, 0x9fd1, 0xeb6e, 0xfae7, 0xc87c, 0xd9f5,
    0x3183, 0x200a, 0x1291, 0x0318, 0x77a7, 0x662e, 0x54b5, 0x453c, 0xbdcb, 0xac42, 0x9ed9, 0x8f50,
    0xfbef, 0xea66, 0xd8fd, 0xc974, 0x4204, 0x538d, 0x6116, 0x709f, 0x0420, 0x15a9, 0x2732, 0x36bb,
    0xce4c, 0xdfc5, 0xed5e, 0xfcd7, 0x8868, 0x99e1, 0xab7a, 0xbaf3, 0x5285, 0x430c, 0x7197, 0x601e,
    0x14a1, 0x0528, 0x37b3, 0x263a, 0xdecd, 0xcf44, 0xfddf, 0xec56, 0x98e9, 0x8960, 0xbbfb, 0xaa72,
    0x6306, 0x728f, 0x4014, 0x519d, 0x2522, 0x34ab, 0x0630, 0x17b9, 0xef4e, 0xfec7, 0xcc5c, 0xddd5,
    0xa96a, 0xb8e3, 0x8a78, 0x9bf1, 0x7387, 0x620e, 0x5095, 0x411c, 0x35a3, 0x242a, 0x16b1, 0x0738,
    0xffcf, 0xee46, 0xdcdd, 0xcd54, 0xb9eb, 0xa862, 0x9af9, 0x8b70, 0x8408, 0x9581, 0xa71a, 0xb693,
    0xc22c, 0xd3a5, 0xe13e, 0xf0b7, 0x0840, 0x19c9, 0x2b52, 0x3adb, 0x4e64, 0x5fed, 0x6d76, 0x7cff,
    0x9489, 0x8500, 0xb79b, 0xa612, 0xd2ad, 0xc324, 0xf1bf, 0xe036, 0x18c1, 0x0948, 0x3bd3, 0x2a5a,
    0x5ee5, 0x4f6c, 0x7df7, 0x6c7e, 0xa50a, 0xb483, 0x8618, 0x9791, 0xe32e, 0xf2a7, 0xc03c, 0xd1b5,
    0x2942, 0x38cb, 0x0a50, 0x1bd9, 0x6f66, 0x7eef, 0x4c74, 0x5dfd, 0xb58b, 0xa402, 0x9699, 0x8710,
    0xf3af, 0xe226, 0xd0bd, 0xc134, 0x39c3, 0x284a, 0x1ad1, 0x0b58, 0x7fe7, 0x6e6e, 0x5cf5, 0x4d7c,
    0xc60c, 0xd785, 0xe51e, 0xf497, 0x8028, 0x91a1, 0xa33a, 0xb2b3, 0x4a44, 0x5bcd, 0x6956, 0x78df,
    0x0c60, 0x1de9, 0x2f72, 0x3efb, 0xd68d, 0xc704, 0xf59f, 0xe416, 0x90a9, 0x8120, 0xb3bb, 0xa232,
    0x5ac5, 0x4b4c, 0x79d7, 0x685e, 0x1ce1, 0x0d68, 0x3ff3, 0x2e7a, 0xe70e, 0xf687, 0xc41c, 0xd595,
    0xa12a, 0xb0a3, 0x8238, 0x93b1, 0x6b46, 0x7acf, 0x4854, 0x59dd, 0x2d62, 0x3ceb, 0x0e70, 0x1ff9,
    0xf78f, 0xe606, 0xd49d, 0xc514, 0xb1ab, 0xa022, 0x92b9, 0x8330, 0x7bc7, 0x6a4e, 0x58d5, 0x495c,
    0x3de3, 0x2c6a, 0x1ef1, 0x0f78,
];

/// Compute the 16-bit frame check sequence (CRC-16/KERMIT) of `buffer`.
pub fn calculate_crc(buffer: &[u8]) -> u16 {
    fn crc_byte(crc: u16, c: u8) -> u16 {
        (crc >> 8) ^ CRC_TABLE[((crc ^ (c as u16)) & 0xff) as usize]
    }

    let mut crc = 0;

    for b in buffer {
        crc = crc_byte(crc, *b);
    }

    crc
}

/// Length of the frame check sequence trailing every frame on air.
pub const FCS_LEN: usize = 2;

enum_with_unknown! {
    /// IEEE 802.15.4 frame type.
    pub enum FrameType(u8) {
        Beacon = 0b000,
        Data = 0b001,
        Acknowledgement = 0b010,
        MacCommand = 0b011,
        Multipurpose = 0b101,
        FragmentOrFrak = 0b110,
        Extended = 0b111,
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FrameType::Beacon => write!(f, "Beacon"),
            FrameType::Data => write!(f, "Data"),
            FrameType::Acknowledgement => write!(f, "Ack"),
            FrameType::MacCommand => write!(f, "MAC command"),
            FrameType::Multipurpose => write!(f, "Multipurpose"),
            FrameType::FragmentOrFrak => write!(f, "FragmentOrFrak"),
            FrameType::Extended => write!(f, "Extended"),
            FrameType::Unknown(id) => write!(f, "0b{id:03b}"),
        }
    }
}

enum_with_unknown! {
    /// IEEE 802.15.4 addressing mode for destination and source addresses.
    pub enum AddressingMode(u8) {
        Absent    = 0b00,
        Short     = 0b10,
        Extended  = 0b11,
    }
}

impl AddressingMode {
    /// Return the size in octets of the address.
    ///
    /// The reserved mode has no size; frames using it are rejected by
    /// [Frame::check_len].
    const fn size(&self) -> usize {
        match self {
            AddressingMode::Absent => 0,
            AddressingMode::Short => 2,
            AddressingMode::Extended => 8,
            AddressingMode::Unknown(_) => 0,
        }
    }
}

impl fmt::Display for AddressingMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AddressingMode::Absent => write!(f, "Absent"),
            AddressingMode::Short => write!(f, "Short"),
            AddressingMode::Extended => write!(f, "Extended"),
            AddressingMode::Unknown(id) => write!(f, "0b{id:02b}"),
        }
    }
}

/// A IEEE 802.15.4 PAN.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub struct Pan(pub u16);

impl Pan {
    pub const BROADCAST: Self = Self(0xffff);

    /// Return the PAN ID as bytes.
    pub fn as_bytes(&self) -> [u8; 2] {
        let mut pan = [0u8; 2];
        LittleEndian::write_u16(&mut pan, self.0);
        pan
    }
}

/// A IEEE 802.15.4 address.
///
/// Octets are kept in transmission order reversed, so that the most
/// significant octet comes first, the way addresses are usually written.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum Address {
    Absent,
    Short([u8; 2]),
    Extended([u8; 8]),
}

impl Address {
    /// The broadcast address.
    pub const BROADCAST: Address = Address::Short([0xff; 2]);

    /// Query whether the address is an unicast address.
    pub fn is_unicast(&self) -> bool {
        !self.is_broadcast()
    }

    /// Query whether this address is the broadcast address.
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Build an address from its 2 or 8 octets. Any other length gives `None`.
    pub fn from_bytes(a: &[u8]) -> Option<Self> {
        match a.len() {
            2 => {
                let mut b = [0u8; 2];
                b.copy_from_slice(a);
                Some(Address::Short(b))
            }
            8 => {
                let mut b = [0u8; 8];
                b.copy_from_slice(a);
                Some(Address::Extended(b))
            }
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Address::Absent => &[],
            Address::Short(value) => value,
            Address::Extended(value) => value,
        }
    }

    /// Return the addressing mode that carries this address.
    pub const fn mode(&self) -> AddressingMode {
        match self {
            Address::Absent => AddressingMode::Absent,
            Address::Short(_) => AddressingMode::Short,
            Address::Extended(_) => AddressingMode::Extended,
        }
    }

    /// Convert the extended address to an Extended Unique Identifier (EUI-64)
    pub fn as_eui_64(&self) -> Option<[u8; 8]> {
        match self {
            Address::Absent | Address::Short(_) => None,
            Address::Extended(value) => {
                let mut bytes = [0; 8];
                bytes.copy_from_slice(&value[..]);

                bytes[0] ^= 1 << 1;

                Some(bytes)
            }
        }
    }

    /// Return the IPv6 interface identifier derived from this address.
    ///
    /// Extended addresses map to their EUI-64 (RFC 2464); short addresses
    /// map to `0000:00ff:fe00:XXXX` (RFC 6282, section 3.2.2).
    pub fn iid(&self) -> Option<[u8; 8]> {
        match self {
            Address::Absent => None,
            Address::Short(value) => Some([0, 0, 0, 0xff, 0xfe, 0, value[0], value[1]]),
            Address::Extended(_) => self.as_eui_64(),
        }
    }

    /// Convert the address to a link-local IPv6 address.
    pub fn as_link_local_address(&self) -> Option<Ipv6Address> {
        let mut bytes = [0; 16];
        bytes[0] = 0xfe;
        bytes[1] = 0x80;
        bytes[8..].copy_from_slice(&self.iid()?);

        Some(Ipv6Address::from(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "not-present"),
            Self::Short(bytes) => write!(f, "{:02x}-{:02x}", bytes[0], bytes[1]),
            Self::Extended(bytes) => write!(
                f,
                "{:02x}-{:02x}-{:02x}-{:02x}-{:02x}-{:02x}-{:02x}-{:02x}",
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7]
            ),
        }
    }
}

enum_with_unknown! {
    /// IEEE 802.15.4 frame version.
    pub enum FrameVersion(u8) {
        Ieee802154_2003 = 0b00,
        Ieee802154_2006 = 0b01,
        Ieee802154 = 0b10,
    }
}

/// A read/write wrapper around an IEEE 802.15.4 frame buffer.
#[derive(Debug, Clone)]
pub struct Frame<T: AsRef<[u8]>> {
    buffer: T,
}

mod field {
    use crate::wire::field::*;

    pub const FRAMECONTROL: Field = 0..2;
    pub const SEQUENCE_NUMBER: usize = 2;
}

macro_rules! fc_bit_field {
    ($field:ident, $bit:literal) => {
        #[inline]
        pub fn $field(&self) -> bool {
            let data = self.buffer.as_ref();
            let raw = LittleEndian::read_u16(&data[field::FRAMECONTROL]);

            ((raw >> $bit) & 0b1) == 0b1
        }
    };
}

macro_rules! set_fc_bit_field {
    ($field:ident, $bit:literal) => {
        #[inline]
        pub fn $field(&mut self, val: bool) {
            let data = &mut self.buffer.as_mut()[field::FRAMECONTROL];
            let mut raw = LittleEndian::read_u16(data);
            raw = (raw & !(1 << $bit)) | ((val as u16) << $bit);

            data.copy_from_slice(&raw.to_le_bytes());
        }
    };
}

impl<T: AsRef<[u8]>> Frame<T> {
    /// Input a raw octet buffer with IEEE 802.15.4 frame structure.
    pub const fn new_unchecked(buffer: T) -> Frame<T> {
        Frame { buffer }
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    pub fn new_checked(buffer: T) -> Result<Frame<T>> {
        let packet = Self::new_unchecked(buffer);
        packet.check_len()?;
        Ok(packet)
    }

    /// Ensure that no accessor method will panic if called.
    ///
    /// Returns `Err(Error::MalformedFrame)` if an addressing mode is
    /// reserved, or if the buffer ends before the header does. The offset
    /// is the frame control octet holding the mode, or the length of the
    /// buffer.
    pub fn check_len(&self) -> Result<()> {
        let len = self.buffer.as_ref().len();
        if len < field::FRAMECONTROL.end {
            return Err(Error::MalformedFrame { offset: len });
        }

        if matches!(self.dst_addressing_mode(), AddressingMode::Unknown(_))
            || matches!(self.src_addressing_mode(), AddressingMode::Unknown(_))
        {
            return Err(Error::MalformedFrame { offset: 1 });
        }

        if len < self.header_len() {
            return Err(Error::MalformedFrame { offset: len });
        }

        Ok(())
    }

    /// Consumes the frame, returning the underlying buffer.
    pub fn into_inner(self) -> T {
        self.buffer
    }

    /// Return the FrameType field.
    #[inline]
    pub fn frame_type(&self) -> FrameType {
        let data = self.buffer.as_ref();
        let raw = LittleEndian::read_u16(&data[field::FRAMECONTROL]);
        let ft = (raw & 0b111) as u8;
        FrameType::from(ft)
    }

    fc_bit_field!(security_enabled, 3);
    fc_bit_field!(frame_pending, 4);
    fc_bit_field!(ack_request, 5);
    fc_bit_field!(pan_id_compression, 6);

    fc_bit_field!(sequence_number_suppression, 8);
    fc_bit_field!(ie_present, 9);

    /// Return the destination addressing mode.
    #[inline]
    pub fn dst_addressing_mode(&self) -> AddressingMode {
        let data = self.buffer.as_ref();
        let raw = LittleEndian::read_u16(&data[field::FRAMECONTROL]);
        let am = ((raw >> 10) & 0b11) as u8;
        AddressingMode::from(am)
    }

    /// Return the frame version.
    #[inline]
    pub fn frame_version(&self) -> FrameVersion {
        let data = self.buffer.as_ref();
        let raw = LittleEndian::read_u16(&data[field::FRAMECONTROL]);
        let fv = ((raw >> 12) & 0b11) as u8;
        FrameVersion::from(fv)
    }

    /// Return the source addressing mode.
    #[inline]
    pub fn src_addressing_mode(&self) -> AddressingMode {
        let data = self.buffer.as_ref();
        let raw = LittleEndian::read_u16(&data[field::FRAMECONTROL]);
        let am = ((raw >> 14) & 0b11) as u8;
        AddressingMode::from(am)
    }

    /// Whether the sequence number octet is present.
    ///
    /// Only 2015 frames may suppress it.
    #[inline]
    fn has_sequence_number(&self) -> bool {
        !(self.frame_version() == FrameVersion::Ieee802154 && self.sequence_number_suppression())
    }

    /// Whether the destination PAN is present: it accompanies any destination address.
    #[inline]
    fn has_dst_pan_id(&self) -> bool {
        self.dst_addressing_mode() != AddressingMode::Absent
    }

    /// Whether the source PAN is present: it accompanies a source address
    /// unless it is compressed into the destination PAN.
    #[inline]
    fn has_src_pan_id(&self) -> bool {
        self.src_addressing_mode() != AddressingMode::Absent && !self.pan_id_compression()
    }

    fn addressing_start(&self) -> usize {
        field::SEQUENCE_NUMBER + usize::from(self.has_sequence_number())
    }

    fn dst_addr_start(&self) -> usize {
        self.addressing_start() + if self.has_dst_pan_id() { 2 } else { 0 }
    }

    fn src_pan_start(&self) -> usize {
        self.dst_addr_start() + self.dst_addressing_mode().size()
    }

    fn src_addr_start(&self) -> usize {
        self.src_pan_start() + if self.has_src_pan_id() { 2 } else { 0 }
    }

    /// Return the length of the MAC header: frame control, sequence number
    /// and addressing fields.
    #[inline]
    pub fn header_len(&self) -> usize {
        self.src_addr_start() + self.src_addressing_mode().size()
    }

    /// Return the sequence number of the frame.
    #[inline]
    pub fn sequence_number(&self) -> Option<u8> {
        if self.has_sequence_number() {
            let data = self.buffer.as_ref();
            Some(data[field::SEQUENCE_NUMBER])
        } else {
            None
        }
    }

    /// Return the destination PAN field.
    #[inline]
    pub fn dst_pan_id(&self) -> Option<Pan> {
        if !self.has_dst_pan_id() {
            return None;
        }
        let offset = self.addressing_start();
        let data = self.buffer.as_ref();
        Some(Pan(LittleEndian::read_u16(&data[offset..offset + 2])))
    }

    /// Return the destination address field.
    #[inline]
    pub fn dst_addr(&self) -> Option<Address> {
        let offset = self.dst_addr_start();
        self.read_addr(self.dst_addressing_mode(), offset)
    }

    /// Return the source PAN field.
    #[inline]
    pub fn src_pan_id(&self) -> Option<Pan> {
        if !self.has_src_pan_id() {
            return None;
        }
        let offset = self.src_pan_start();
        let data = self.buffer.as_ref();
        Some(Pan(LittleEndian::read_u16(&data[offset..offset + 2])))
    }

    /// Return the source address field.
    #[inline]
    pub fn src_addr(&self) -> Option<Address> {
        let offset = self.src_addr_start();
        self.read_addr(self.src_addressing_mode(), offset)
    }

    fn read_addr(&self, mode: AddressingMode, offset: usize) -> Option<Address> {
        let data = self.buffer.as_ref();
        match mode {
            AddressingMode::Absent => Some(Address::Absent),
            AddressingMode::Short => {
                let mut raw = [0u8; 2];
                raw.clone_from_slice(&data[offset..offset + 2]);
                raw.reverse();
                Some(Address::Short(raw))
            }
            AddressingMode::Extended => {
                let mut raw = [0u8; 8];
                raw.clone_from_slice(&data[offset..offset + 8]);
                raw.reverse();
                Some(Address::Extended(raw))
            }
            AddressingMode::Unknown(_) => None,
        }
    }
}

impl<'a, T: AsRef<[u8]> + ?Sized> Frame<&'a T> {
    /// Return a pointer to everything after the MAC header, frame check
    /// sequence included if the buffer carries one.
    #[inline]
    pub fn payload(&self) -> &'a [u8] {
        let header_len = self.header_len();
        let data = self.buffer.as_ref();
        &data[header_len..]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Frame<T> {
    /// Set the frame type.
    #[inline]
    pub fn set_frame_type(&mut self, frame_type: FrameType) {
        let data = &mut self.buffer.as_mut()[field::FRAMECONTROL];
        let mut raw = LittleEndian::read_u16(data);

        raw = (raw & !(0b111)) | (u8::from(frame_type) as u16 & 0b111);
        data.copy_from_slice(&raw.to_le_bytes());
    }

    set_fc_bit_field!(set_security_enabled, 3);
    set_fc_bit_field!(set_frame_pending, 4);
    set_fc_bit_field!(set_ack_request, 5);
    set_fc_bit_field!(set_pan_id_compression, 6);
    set_fc_bit_field!(set_sequence_number_suppression, 8);

    /// Set the frame version.
    #[inline]
    pub fn set_frame_version(&mut self, version: FrameVersion) {
        let data = &mut self.buffer.as_mut()[field::FRAMECONTROL];
        let mut raw = LittleEndian::read_u16(data);

        raw = (raw & !(0b11 << 12)) | ((u8::from(version) as u16 & 0b11) << 12);
        data.copy_from_slice(&raw.to_le_bytes());
    }

    /// Set the frame sequence number.
    #[inline]
    pub fn set_sequence_number(&mut self, value: u8) {
        let data = self.buffer.as_mut();
        data[field::SEQUENCE_NUMBER] = value;
    }

    /// Set the destination addressing mode.
    #[inline]
    pub fn set_dst_addressing_mode(&mut self, value: AddressingMode) {
        let data = &mut self.buffer.as_mut()[field::FRAMECONTROL];
        let mut raw = LittleEndian::read_u16(data);

        raw = (raw & !(0b11 << 10)) | ((u8::from(value) as u16 & 0b11) << 10);
        data.copy_from_slice(&raw.to_le_bytes());
    }

    /// Set the source addressing mode.
    #[inline]
    pub fn set_src_addressing_mode(&mut self, value: AddressingMode) {
        let data = &mut self.buffer.as_mut()[field::FRAMECONTROL];
        let mut raw = LittleEndian::read_u16(data);

        raw = (raw & !(0b11 << 14)) | ((u8::from(value) as u16 & 0b11) << 14);
        data.copy_from_slice(&raw.to_le_bytes());
    }

    /// Set the destination PAN ID.
    ///
    /// The frame control must already describe the addressing fields.
    #[inline]
    pub fn set_dst_pan_id(&mut self, value: Pan) {
        let offset = self.addressing_start();
        let data = self.buffer.as_mut();
        data[offset..offset + 2].copy_from_slice(&value.as_bytes());
    }

    /// Set the destination address.
    ///
    /// The destination addressing mode must already match the address.
    #[inline]
    pub fn set_dst_addr(&mut self, value: Address) {
        let offset = self.dst_addr_start();
        self.write_addr(value, offset);
    }

    /// Set the source PAN ID.
    ///
    /// The frame control must already describe the addressing fields.
    #[inline]
    pub fn set_src_pan_id(&mut self, value: Pan) {
        let offset = self.src_pan_start();
        let data = self.buffer.as_mut();
        data[offset..offset + 2].copy_from_slice(&value.as_bytes());
    }

    /// Set the source address.
    ///
    /// The source addressing mode must already match the address.
    #[inline]
    pub fn set_src_addr(&mut self, value: Address) {
        let offset = self.src_addr_start();
        self.write_addr(value, offset);
    }

    fn write_addr(&mut self, value: Address, offset: usize) {
        let bytes = value.as_bytes();
        let data = &mut self.buffer.as_mut()[offset..offset + bytes.len()];
        for (dst, src) in data.iter_mut().zip(bytes.iter().rev()) {
            *dst = *src;
        }
    }

    /// Return a mutable pointer to everything after the MAC header.
    #[inline]
    pub fn payload_mut(&mut self) -> &mut [u8] {
        let header_len = self.header_len();
        let data = self.buffer.as_mut();
        &mut data[header_len..]
    }
}

impl<T: AsRef<[u8]>> fmt::Display for Frame<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Err(err) = self.check_len() {
            return write!(f, "IEEE802.15.4 ({err})");
        }
        write!(f, "IEEE802.15.4 frame type={}", self.frame_type())?;
        if let Some(seq) = self.sequence_number() {
            write!(f, " seq={seq}")?;
        }
        if let Some(pan) = self.dst_pan_id() {
            write!(f, " dst_pan={:04x}", pan.0)?;
        }
        if let Some(addr) = self.dst_addr() {
            write!(f, " dst={addr}")?;
        }
        if let Some(pan) = self.src_pan_id() {
            write!(f, " src_pan={:04x}", pan.0)?;
        }
        if let Some(addr) = self.src_addr() {
            write!(f, " src={addr}")?;
        }
        Ok(())
    }
}

/// A high-level representation of an IEEE802.15.4 frame header.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Repr {
    pub frame_type: FrameType,
    pub security_enabled: bool,
    pub frame_pending: bool,
    pub ack_request: bool,
    pub sequence_number: Option<u8>,
    pub pan_id_compression: bool,
    pub frame_version: FrameVersion,
    pub dst_pan_id: Option<Pan>,
    pub dst_addr: Option<Address>,
    pub src_pan_id: Option<Pan>,
    pub src_addr: Option<Address>,
}

impl Repr {
    /// Parse an IEEE 802.15.4 frame and return a high-level representation.
    pub fn parse<T: AsRef<[u8]> + ?Sized>(packet: &Frame<&T>) -> Result<Repr> {
        // Ensure the basic accessors will work.
        packet.check_len()?;

        Ok(Repr {
            frame_type: packet.frame_type(),
            security_enabled: packet.security_enabled(),
            frame_pending: packet.frame_pending(),
            ack_request: packet.ack_request(),
            sequence_number: packet.sequence_number(),
            pan_id_compression: packet.pan_id_compression(),
            frame_version: packet.frame_version(),
            dst_pan_id: packet.dst_pan_id(),
            dst_addr: packet.dst_addr(),
            src_pan_id: packet.src_pan_id(),
            src_addr: packet.src_addr(),
        })
    }

    fn dst_mode(&self) -> AddressingMode {
        self.dst_addr.map_or(AddressingMode::Absent, |addr| addr.mode())
    }

    fn src_mode(&self) -> AddressingMode {
        self.src_addr.map_or(AddressingMode::Absent, |addr| addr.mode())
    }

    /// Return the length of the MAC header that will be emitted from this
    /// high-level representation.
    #[inline]
    pub fn buffer_len(&self) -> usize {
        let dst_mode = self.dst_mode();
        let src_mode = self.src_mode();
        let seq_suppressed =
            self.frame_version == FrameVersion::Ieee802154 && self.sequence_number.is_none();

        field::FRAMECONTROL.end
            + if seq_suppressed { 0 } else { 1 }
            + if dst_mode != AddressingMode::Absent { 2 } else { 0 }
            + dst_mode.size()
            + if src_mode != AddressingMode::Absent && !self.pan_id_compression {
                2
            } else {
                0
            }
            + src_mode.size()
    }

    /// Emit a high-level representation into an IEEE802.15.4 frame.
    ///
    /// A PAN that the addressing modes require but the representation
    /// lacks is written as the broadcast PAN.
    pub fn emit<T: AsRef<[u8]> + AsMut<[u8]>>(&self, frame: &mut Frame<T>) {
        frame.buffer.as_mut()[field::FRAMECONTROL].fill(0);
        frame.set_frame_type(self.frame_type);
        frame.set_security_enabled(self.security_enabled);
        frame.set_frame_pending(self.frame_pending);
        frame.set_ack_request(self.ack_request);
        frame.set_pan_id_compression(self.pan_id_compression);
        frame.set_frame_version(self.frame_version);
        frame.set_dst_addressing_mode(self.dst_mode());
        frame.set_src_addressing_mode(self.src_mode());

        match self.sequence_number {
            Some(sequence_number) => frame.set_sequence_number(sequence_number),
            None if self.frame_version == FrameVersion::Ieee802154 => {
                frame.set_sequence_number_suppression(true)
            }
            None => frame.set_sequence_number(0),
        }

        if frame.has_dst_pan_id() {
            frame.set_dst_pan_id(self.dst_pan_id.unwrap_or(Pan::BROADCAST));
        }
        if let Some(dst_addr) = self.dst_addr {
            frame.set_dst_addr(dst_addr);
        }
        if frame.has_src_pan_id() {
            frame.set_src_pan_id(self.src_pan_id.unwrap_or(Pan::BROADCAST));
        }
        if let Some(src_addr) = self.src_addr {
            frame.set_src_addr(src_addr);
        }
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "IEEE802.15.4 frame type={}", self.frame_type)?;
        if let Some(seq) = self.sequence_number {
            write!(f, " seq={seq}")?;
        }
        if let Some(addr) = self.dst_addr {
            write!(f, " dst={addr}")?;
        }
        if let Some(addr) = self.src_addr {
            write!(f, " src={addr}")?;
        }
        Ok(())
    }
}
