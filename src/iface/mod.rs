/*! Network interface logic.

The `iface` module ties the wire layer together. It classifies incoming
IEEE 802.15.4 frames, decompresses their 6LoWPAN payloads against a context
table and decodes the resulting IPv6 packets into a payload chain; on the way
out it does the same in reverse.
*/

mod chain;
mod config;
mod context;
mod hc06;
mod interface;
pub mod mac;
mod packet;

pub use self::chain::IpPayload;
pub use self::config::{Checksum, ChecksumCapabilities, Config};
#[cfg(feature = "std")]
pub use self::context::SharedContext;
pub use self::context::CompressionContext;
pub use self::interface::{Interface, Received};
pub use self::mac::ParsedHeader;
pub use self::packet::{Diagnostic, Packet};
