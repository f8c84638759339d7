//! The HC06 compression context table.

use super::{hc06, Config, Packet};
use crate::config::LOWPAN_CONTEXT_COUNT;
use crate::frame::ByteFrame;
use crate::wire::{Ieee802154Address, Ieee802154Repr, Ipv6Address, SixlowpanAddressContext};
use crate::{Error, Result};

/// A table of address contexts shared by the compressor and the
/// decompressor.
///
/// Context 0 is the default context. Entries are installed and removed at
/// runtime, typically from router advertisements carrying 6LoWPAN context
/// options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionContext {
    entries: [Option<SixlowpanAddressContext>; LOWPAN_CONTEXT_COUNT],
}

impl CompressionContext {
    /// Create an empty context table.
    pub fn new() -> CompressionContext {
        CompressionContext {
            entries: [None; LOWPAN_CONTEXT_COUNT],
        }
    }

    fn slot(&mut self, id: u8) -> Result<&mut Option<SixlowpanAddressContext>> {
        self.entries
            .get_mut(id as usize)
            .ok_or(Error::ContextIndexOutOfRange(id))
    }

    /// Install `prefix/prefix_len` as context `id`, replacing any previous
    /// entry. With `compress` cleared the context is only used to
    /// decompress.
    ///
    /// # Errors
    /// [Error::ContextIndexOutOfRange] if `id` is past the table, and
    /// [Error::InvalidPrefixLength] if `prefix_len` is above 128. The table is
    /// unchanged on error.
    pub fn set_context(
        &mut self,
        id: u8,
        prefix: Ipv6Address,
        prefix_len: u8,
        compress: bool,
    ) -> Result<()> {
        let slot = self.slot(id)?;
        *slot = Some(SixlowpanAddressContext::new(prefix, prefix_len, compress)?);
        net_debug!("context {}: {}/{}", id, prefix, prefix_len);
        Ok(())
    }

    /// Remove context `id`, returning the entry it held.
    pub fn clear_context(&mut self, id: u8) -> Result<Option<SixlowpanAddressContext>> {
        Ok(self.slot(id)?.take())
    }

    /// Return context `id`, or `None` if it is not installed.
    pub fn context(&self, id: u8) -> Result<Option<SixlowpanAddressContext>> {
        self.entries
            .get(id as usize)
            .copied()
            .ok_or(Error::ContextIndexOutOfRange(id))
    }

    /// Return every slot of the table, indexed by context id.
    pub fn entries(&self) -> &[Option<SixlowpanAddressContext>] {
        &self.entries
    }

    /// Decompress the 6LoWPAN payload of a received frame.
    ///
    /// `header_offset` is where the 6LoWPAN dispatch starts, i.e. the length
    /// of the MAC header; `ll_repr` gives the link-layer addresses elided
    /// interface identifiers are derived from.
    pub fn decompress(
        &self,
        frame: &ByteFrame,
        header_offset: usize,
        ll_repr: &Ieee802154Repr,
        config: &Config,
    ) -> Result<Packet> {
        hc06::decompress(frame, header_offset, ll_repr, &self.entries, config)
    }

    /// Compress `packet` into a 6LoWPAN payload for a frame sent from
    /// `ll_src_addr` to `ll_dst_addr`.
    pub fn compress(
        &self,
        packet: &Packet,
        ll_src_addr: Option<Ieee802154Address>,
        ll_dst_addr: Option<Ieee802154Address>,
        config: &Config,
    ) -> Result<ByteFrame> {
        hc06::compress(packet, ll_src_addr, ll_dst_addr, &self.entries, config)
    }
}

impl Default for CompressionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
pub use self::shared::SharedContext;

#[cfg(feature = "std")]
mod shared {
    use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

    use super::CompressionContext;

    /// A [CompressionContext] shared between threads.
    ///
    /// Receive paths take the read lock for the duration of one decompression;
    /// context updates take the write lock. Clones share the same table.
    #[derive(Debug, Clone, Default)]
    pub struct SharedContext(Arc<RwLock<CompressionContext>>);

    impl SharedContext {
        pub fn new(contexts: CompressionContext) -> SharedContext {
            SharedContext(Arc::new(RwLock::new(contexts)))
        }

        /// Lock the table for reading.
        ///
        /// A writer that panicked cannot leave a half-updated entry behind,
        /// so a poisoned lock is used as is.
        pub fn read(&self) -> RwLockReadGuard<'_, CompressionContext> {
            self.0.read().unwrap_or_else(PoisonError::into_inner)
        }

        /// Lock the table for writing.
        pub fn write(&self) -> RwLockWriteGuard<'_, CompressionContext> {
            self.0.write().unwrap_or_else(PoisonError::into_inner)
        }
    }
}
