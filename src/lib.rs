#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_code)]

//! The _lowpan_ library carries IPv6 datagrams over IEEE 802.15.4 radio links,
//! using the 6LoWPAN HC06 (RFC 6282) header compression scheme.
//!
//! # Layers
//! The crate is split in the same way a receive path walks a frame.
//!
//! ## The frame layer
//! [ByteFrame](frame/struct.ByteFrame.html) owns the raw bytes of one radio frame,
//! together with a small table of named integer attributes filled in while the
//! frame is being classified.
//!
//! ## The wire layer
//! The `wire` module provides zero-copy views over buffers (the `Packet`
//! family) and high-level representations (the `Repr` family) for IEEE 802.15.4,
//! 6LoWPAN IPHC/NHC, IPv6, hop-by-hop options, TCP, UDP and ICMPv6.
//! Views never read out of bounds once `new_checked` succeeded.
//!
//! ## The interface layer
//! The `iface` module ties the wire layer together: MAC classification,
//! HC06 (de)compression against a context table, and the owned IPv6 packet
//! with its payload chain of extension headers and transport segments.
//!
//! # Minimum Supported Rust Version (MSRV)
//! This crate is guaranteed to compile on stable Rust 1.77 and up.

extern crate alloc;

#[cfg(feature = "log")]
extern crate log;

use core::fmt;

#[macro_use]
mod macros;

#[allow(unused)]
mod config {
    include!(concat!(env!("OUT_DIR"), "/config.rs"));
}

pub mod frame;
pub mod iface;
pub mod wire;

/// The error type for the 6LoWPAN stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An access fell outside the underlying buffer.
    OutOfRange { offset: usize, len: usize },
    /// A length or addressing field disagrees with the bytes that are
    /// actually present.
    MalformedFrame { offset: usize },
    /// The IPv6 version field was not 6.
    BadVersion(u8),
    /// A dispatch or next header value this stack does not understand.
    UnknownDispatch(u8),
    /// A transport checksum did not verify. `expected` is the value carried
    /// in the header, `computed` the value recomputed over the data.
    ChecksumMismatch { expected: u16, computed: u16 },
    /// A compression context id outside the context table.
    ContextIndexOutOfRange(u8),
    /// A compression context id with no installed entry.
    UnknownContext(u8),
    /// A context prefix length above 128 bits.
    InvalidPrefixLength(u8),
    /// A frame attribute was read before being set.
    AttributeNotFound,
    /// The frame attribute table has no room for another name.
    AttributeTableFull,
}

impl Error {
    /// Whether this error kind is only reported, leaving the decoded data usable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::BadVersion(_) | Error::UnknownDispatch(_) | Error::ChecksumMismatch { .. }
        )
    }
}

/// The result type for the 6LoWPAN stack.
pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::OutOfRange { offset, len } => {
                write!(f, "offset {offset} out of range for {len} bytes")
            }
            Error::MalformedFrame { offset } => write!(f, "malformed frame at offset {offset}"),
            Error::BadVersion(version) => write!(f, "bad IP version {version}"),
            Error::UnknownDispatch(value) => write!(f, "unknown dispatch 0x{value:02x}"),
            Error::ChecksumMismatch { expected, computed } => write!(
                f,
                "checksum mismatch (expected 0x{expected:04x}, computed 0x{computed:04x})"
            ),
            Error::ContextIndexOutOfRange(id) => write!(f, "context index {id} out of range"),
            Error::UnknownContext(id) => write!(f, "no compression context {id}"),
            Error::InvalidPrefixLength(len) => write!(f, "invalid prefix length {len}"),
            Error::AttributeNotFound => write!(f, "attribute not found"),
            Error::AttributeTableFull => write!(f, "attribute table full"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
