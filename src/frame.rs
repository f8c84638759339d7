//! Owned radio frame buffer with named attributes.

use alloc::vec::Vec;
use byteorder::{ByteOrder, NetworkEndian};
use heapless::LinearMap;

use crate::config::FRAME_MAX_ATTRIBUTE_COUNT;
use crate::{Error, Result};

/// Well-known attribute names.
pub mod attr {
    /// The MAC frame type (beacon, data, ack, command).
    pub const PACKET_TYPE: &str = "packet_type";
    /// Offset of the first byte after the MAC header.
    pub const HEADER_LEN: &str = "header_len";
    /// The MAC sequence number.
    pub const SEQUENCE_NUMBER: &str = "sequence_number";
    /// The first 6LoWPAN dispatch byte of a data frame.
    pub const DISPATCH: &str = "6lowpan.dispatch";
}

/// An owned byte buffer for one received or transmitted frame.
///
/// Besides the bytes, a frame carries a small table of named integer
/// attributes. The MAC layer records its classification there so that later
/// stages know where their data starts.
///
/// All multi-byte accessors are big-endian and bounds-checked: an access that
/// does not fit returns [Error::OutOfRange] and leaves the frame untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteFrame {
    data: Vec<u8>,
    attributes: LinearMap<&'static str, u32, FRAME_MAX_ATTRIBUTE_COUNT>,
}

impl ByteFrame {
    /// Create an empty frame.
    pub fn new() -> ByteFrame {
        ByteFrame::default()
    }

    /// Create a frame holding a copy of `data`.
    pub fn from_bytes(data: &[u8]) -> ByteFrame {
        ByteFrame {
            data: data.to_vec(),
            attributes: LinearMap::new(),
        }
    }

    /// Replace the contents of the frame. Attributes are kept.
    pub fn set_bytes(&mut self, data: &[u8]) {
        self.data.clear();
        self.data.extend_from_slice(data);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Append bytes at the end of the frame.
    pub fn extend_from_slice(&mut self, data: &[u8]) {
        self.data.extend_from_slice(data);
    }

    /// Grow the frame with `count` zero bytes, returning the new region.
    pub fn extend_zeroed(&mut self, count: usize) -> &mut [u8] {
        let start = self.data.len();
        self.data.resize(start + count, 0);
        &mut self.data[start..]
    }

    /// Shorten the frame to `len` bytes. Has no effect if the frame is shorter.
    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    fn range(&self, offset: usize, size: usize) -> Result<core::ops::Range<usize>> {
        match offset.checked_add(size) {
            Some(end) if end <= self.data.len() => Ok(offset..end),
            _ => Err(Error::OutOfRange {
                offset,
                len: self.data.len(),
            }),
        }
    }

    pub fn get_byte(&self, offset: usize) -> Result<u8> {
        let range = self.range(offset, 1)?;
        Ok(self.data[range.start])
    }

    pub fn set_byte(&mut self, offset: usize, value: u8) -> Result<()> {
        let range = self.range(offset, 1)?;
        self.data[range.start] = value;
        Ok(())
    }

    pub fn get_u16(&self, offset: usize) -> Result<u16> {
        let range = self.range(offset, 2)?;
        Ok(NetworkEndian::read_u16(&self.data[range]))
    }

    pub fn set_u16(&mut self, offset: usize, value: u16) -> Result<()> {
        let range = self.range(offset, 2)?;
        NetworkEndian::write_u16(&mut self.data[range], value);
        Ok(())
    }

    pub fn get_u32(&self, offset: usize) -> Result<u32> {
        let range = self.range(offset, 4)?;
        Ok(NetworkEndian::read_u32(&self.data[range]))
    }

    pub fn set_u32(&mut self, offset: usize, value: u32) -> Result<()> {
        let range = self.range(offset, 4)?;
        NetworkEndian::write_u32(&mut self.data[range], value);
        Ok(())
    }

    /// Return the bytes in `offset..offset + len`.
    pub fn slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let range = self.range(offset, len)?;
        Ok(&self.data[range])
    }

    /// Set or overwrite a named attribute.
    ///
    /// # Errors
    /// Returns [Error::AttributeTableFull] if `name` is new and the table is full.
    pub fn set_attribute(&mut self, name: &'static str, value: u32) -> Result<()> {
        self.attributes
            .insert(name, value)
            .map(|_| ())
            .map_err(|_| Error::AttributeTableFull)
    }

    /// Read a named attribute.
    ///
    /// # Errors
    /// Returns [Error::AttributeNotFound] if the attribute was never set.
    pub fn attribute(&self, name: &str) -> Result<u32> {
        self.attributes
            .iter()
            .find(|&(key, _)| *key == name)
            .map(|(_, value)| *value)
            .ok_or(Error::AttributeNotFound)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_ok()
    }

    /// Iterate over all attributes, in no particular order.
    pub fn attributes(&self) -> impl Iterator<Item = (&'static str, u32)> + '_ {
        self.attributes.iter().map(|(key, value)| (*key, *value))
    }
}

impl AsRef<[u8]> for ByteFrame {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl AsMut<[u8]> for ByteFrame {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl From<Vec<u8>> for ByteFrame {
    fn from(data: Vec<u8>) -> ByteFrame {
        ByteFrame {
            data,
            attributes: LinearMap::new(),
        }
    }
}
