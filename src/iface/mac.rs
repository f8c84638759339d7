//! IEEE 802.15.4 MAC classification and framing.
//!
//! Incoming frames are parsed once and their classification is recorded on the
//! [ByteFrame] itself, so later stages only need the `header_len` attribute to
//! find their data.

use byteorder::{ByteOrder, LittleEndian};

use super::Config;
use crate::frame::{attr, ByteFrame};
use crate::wire::ieee802154::{calculate_crc, FCS_LEN};
use crate::wire::{Ieee802154Frame, Ieee802154Repr};
use crate::{Error, Result};

/// The largest PSDU an IEEE 802.15.4 PHY carries (aMaxPHYPacketSize).
pub const MAX_FRAME_LEN: usize = 127;

/// The outcome of classifying a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedHeader {
    pub repr: Ieee802154Repr,
    /// Length of the MAC header; the MAC payload starts here.
    pub header_len: usize,
    /// Length of the MAC payload, without the FCS.
    pub payload_len: usize,
    /// Whether the trailing FCS matched, or `None` when frames carry no FCS.
    pub fcs_valid: Option<bool>,
}

impl ParsedHeader {
    /// Return the MAC payload of the frame this header was parsed from.
    pub fn payload<'a>(&self, frame: &'a ByteFrame) -> &'a [u8] {
        &frame.as_bytes()[self.header_len..self.header_len + self.payload_len]
    }
}

/// Classify an incoming frame.
///
/// Sets the `packet_type`, `header_len` and (when present) `sequence_number`
/// attributes. A wrong FCS is not an error; it is reported in
/// [ParsedHeader::fcs_valid].
pub fn parse(frame: &mut ByteFrame, config: &Config) -> Result<ParsedHeader> {
    let body_len = if config.frame_check_sequence {
        frame
            .len()
            .checked_sub(FCS_LEN)
            .ok_or(Error::MalformedFrame { offset: frame.len() })?
    } else {
        frame.len()
    };

    let (repr, header_len, fcs_valid) = {
        let bytes = frame.as_bytes();
        let mac = Ieee802154Frame::new_checked(&bytes[..body_len])?;
        let repr = Ieee802154Repr::parse(&mac)?;

        let fcs_valid = if config.frame_check_sequence {
            let received = LittleEndian::read_u16(&bytes[body_len..]);
            let computed = calculate_crc(&bytes[..body_len]);
            if received != computed {
                net_debug!(
                    "mac: FCS mismatch (received 0x{:04x}, computed 0x{:04x})",
                    received,
                    computed
                );
            }
            Some(received == computed)
        } else {
            None
        };

        (repr, mac.header_len(), fcs_valid)
    };

    net_trace!("mac: {}", repr);
    if repr.security_enabled {
        net_debug!("mac: auxiliary security header is not supported");
    }

    frame.set_attribute(attr::PACKET_TYPE, u8::from(repr.frame_type) as u32)?;
    frame.set_attribute(attr::HEADER_LEN, header_len as u32)?;
    if let Some(seq) = repr.sequence_number {
        frame.set_attribute(attr::SEQUENCE_NUMBER, seq as u32)?;
    }

    Ok(ParsedHeader {
        repr,
        header_len,
        payload_len: body_len - header_len,
        fcs_valid,
    })
}

/// Build an outgoing frame from a MAC header and its payload.
///
/// Appends the FCS when `config.frame_check_sequence` is set. Fails with
/// [Error::OutOfRange] when the result would not fit in one PHY frame.
pub fn emit(repr: &Ieee802154Repr, payload: &[u8], config: &Config) -> Result<ByteFrame> {
    let header_len = repr.buffer_len();
    let fcs_len = if config.frame_check_sequence {
        FCS_LEN
    } else {
        0
    };
    let total_len = header_len + payload.len() + fcs_len;
    if total_len > MAX_FRAME_LEN {
        return Err(Error::OutOfRange {
            offset: total_len,
            len: MAX_FRAME_LEN,
        });
    }

    let mut frame = ByteFrame::new();
    let buffer = frame.extend_zeroed(header_len + payload.len());
    repr.emit(&mut Ieee802154Frame::new_unchecked(&mut buffer[..header_len]));
    buffer[header_len..].copy_from_slice(payload);

    if config.frame_check_sequence {
        let crc = calculate_crc(frame.as_bytes());
        frame.extend_from_slice(&crc.to_le_bytes());
    }

    Ok(frame)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::wire::{
        Ieee802154Address, Ieee802154FrameType, Ieee802154FrameVersion, Ieee802154Pan,
    };

    static ZOLERTIA: [u8; 19] = [
        0x41, 0xd8, 0x01, 0xcd, 0xab, 0xff, 0xff, 0xc7, 0xd9, 0xb5, 0x14, 0x00, 0x4b, 0x12,
        0x00, 0x2b, 0x00, 0x00, 0x00,
    ];

    fn data_repr(seq: u8) -> Ieee802154Repr {
        Ieee802154Repr {
            frame_type: Ieee802154FrameType::Data,
            security_enabled: false,
            frame_pending: false,
            ack_request: false,
            sequence_number: Some(seq),
            pan_id_compression: true,
            frame_version: Ieee802154FrameVersion::Ieee802154_2006,
            dst_pan_id: Some(Ieee802154Pan(0xabcd)),
            dst_addr: Some(Ieee802154Address::BROADCAST),
            src_pan_id: None,
            src_addr: Some(Ieee802154Address::Extended([
                0x00, 0x12, 0x4b, 0x00, 0x14, 0xb5, 0xd9, 0xc7,
            ])),
        }
    }

    #[test]
    fn classify_data_frame() {
        let mut frame = ByteFrame::from_bytes(&ZOLERTIA);
        let parsed = parse(&mut frame, &Config::default()).unwrap();

        assert_eq!(parsed.header_len, 15);
        assert_eq!(parsed.payload_len, 4);
        assert_eq!(parsed.fcs_valid, None);
        assert_eq!(parsed.payload(&frame), &[0x2b, 0x00, 0x00, 0x00]);
        assert_eq!(parsed.repr, data_repr(1));

        assert_eq!(frame.attribute(attr::PACKET_TYPE), Ok(1));
        assert_eq!(frame.attribute(attr::HEADER_LEN), Ok(15));
        assert_eq!(frame.attribute(attr::SEQUENCE_NUMBER), Ok(1));
    }

    #[test]
    fn classify_ack_frame() {
        let mut frame = ByteFrame::from_bytes(&[0x02, 0x00, 0x2a]);
        let parsed = parse(&mut frame, &Config::default()).unwrap();
        assert_eq!(parsed.repr.frame_type, Ieee802154FrameType::Acknowledgement);
        assert_eq!(parsed.header_len, 3);
        assert_eq!(parsed.payload_len, 0);
        assert_eq!(frame.attribute(attr::PACKET_TYPE), Ok(2));
        assert_eq!(frame.attribute(attr::SEQUENCE_NUMBER), Ok(42));
    }

    #[test]
    fn truncated_addressing() {
        let mut frame = ByteFrame::from_bytes(&ZOLERTIA[..9]);
        assert_eq!(
            parse(&mut frame, &Config::default()),
            Err(Error::MalformedFrame { offset: 9 })
        );
        assert!(!frame.has_attribute(attr::HEADER_LEN));
    }

    #[test]
    fn frame_check_sequence() {
        let mut config = Config::default();
        config.frame_check_sequence = true;

        let mut bytes = ZOLERTIA.to_vec();
        bytes.extend_from_slice(&[0x80, 0x5d]);
        let mut frame = ByteFrame::from_bytes(&bytes);
        let parsed = parse(&mut frame, &config).unwrap();
        assert_eq!(parsed.payload_len, 4);
        assert_eq!(parsed.fcs_valid, Some(true));

        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        let mut frame = ByteFrame::from_bytes(&bytes);
        assert_eq!(parse(&mut frame, &config).unwrap().fcs_valid, Some(false));

        let mut frame = ByteFrame::from_bytes(&[0x41]);
        assert_eq!(
            parse(&mut frame, &config),
            Err(Error::MalformedFrame { offset: 1 })
        );
    }

    #[test]
    fn emit_frame() {
        let frame = emit(&data_repr(1), &[0x2b, 0x00, 0x00, 0x00], &Config::default()).unwrap();
        assert_eq!(frame.as_bytes(), &ZOLERTIA[..]);

        let mut config = Config::default();
        config.frame_check_sequence = true;
        let frame = emit(&data_repr(1), &[0x2b, 0x00, 0x00, 0x00], &config).unwrap();
        assert_eq!(&frame.as_bytes()[ZOLERTIA.len()..], &[0x80, 0x5d]);
    }

    #[test]
    fn emit_oversized() {
        let payload = [0u8; MAX_FRAME_LEN];
        assert_eq!(
            emit(&data_repr(0), &payload, &Config::default()),
            Err(Error::OutOfRange {
                offset: 15 + MAX_FRAME_LEN,
                len: MAX_FRAME_LEN
            })
        );
    }
}
