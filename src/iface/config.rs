/// A description of checksum behavior for a particular protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Checksum {
    /// Verify checksum when receiving and compute checksum when sending.
    #[default]
    Both,
    /// Verify checksum when receiving.
    Rx,
    /// Compute checksum before sending.
    Tx,
    /// Ignore checksum completely.
    None,
}

impl Checksum {
    /// Returns whether checksum should be verified when receiving.
    pub fn rx(&self) -> bool {
        matches!(*self, Checksum::Both | Checksum::Rx)
    }

    /// Returns whether checksum should be computed when sending.
    pub fn tx(&self) -> bool {
        matches!(*self, Checksum::Both | Checksum::Tx)
    }
}

/// A description of checksum behavior for every supported transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub struct ChecksumCapabilities {
    pub udp: Checksum,
    pub tcp: Checksum,
    pub icmpv6: Checksum,
}

impl ChecksumCapabilities {
    /// Checksum behavior that results in not computing or verifying checksums
    /// for any of the supported protocols.
    pub fn ignored() -> Self {
        ChecksumCapabilities {
            udp: Checksum::None,
            tcp: Checksum::None,
            icmpv6: Checksum::None,
        }
    }
}

/// Runtime configuration of the stack.
///
/// Build-time capacities (context table size, attribute and diagnostic
/// counts) are set through environment variables read by the build script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct Config {
    /// Which transport checksums are verified on receive and computed on send.
    pub checksum: ChecksumCapabilities,

    /// Reject IPv6 headers whose version field is not 6.
    ///
    /// When cleared, a wrong version is only recorded as a diagnostic.
    pub strict_version: bool,

    /// Frames carry a trailing 2-byte FCS (CRC-16/KERMIT).
    ///
    /// Radios usually strip the FCS before handing a frame over, so this is
    /// off by default.
    pub frame_check_sequence: bool,

    /// Compress UDP headers with LOWPAN_NHC when transmitting.
    pub compress_udp: bool,

    /// Elide the UDP checksum from compressed UDP headers.
    ///
    /// RFC 6282 only allows this when an upper layer protects the datagram.
    pub elide_udp_checksum: bool,
}

impl Config {
    pub fn new() -> Self {
        Config {
            checksum: ChecksumCapabilities::default(),
            strict_version: true,
            frame_check_sequence: false,
            compress_udp: true,
            elide_udp_checksum: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn checksum_directions() {
        assert!(Checksum::Both.rx() && Checksum::Both.tx());
        assert!(Checksum::Rx.rx() && !Checksum::Rx.tx());
        assert!(!Checksum::Tx.rx() && Checksum::Tx.tx());
        assert!(!Checksum::None.rx() && !Checksum::None.tx());
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert!(config.strict_version);
        assert!(!config.frame_check_sequence);
        assert!(config.compress_udp);
        assert!(!config.elide_udp_checksum);
        assert_eq!(config.checksum.udp, Checksum::Both);
        assert_eq!(ChecksumCapabilities::ignored().icmpv6, Checksum::None);
    }
}
