/*! Low-level packet access and construction.

The `wire` module deals with the packet *representation*. It provides two levels
of functionality.

 * First, it provides functions to extract fields from sequences of octets,
   and to insert fields into sequences of octets. This happens in the `Packet`
   family of structures, e.g. [Ieee802154Frame] or [Ipv6Packet].
 * Second, in cases where the space of valid field values is much smaller than the space
   of possible field values, it provides a compact, high-level representation
   of packet data that can be parsed from and emitted into a sequence of octets.
   This happens through the `Repr` family of structs and enums, e.g. [UdpRepr] or [Ipv6Repr].

[Ieee802154Frame]: struct.Ieee802154Frame.html
[Ipv6Packet]: struct.Ipv6Packet.html
[UdpRepr]: struct.UdpRepr.html
[Ipv6Repr]: struct.Ipv6Repr.html

The `Packet` family of data structures guarantees that, if the `Packet::check_len()` method
returned `Ok(())`, then no accessor or setter method will panic; however, the guarantee
provided by `Packet::check_len()` may no longer hold after changing certain fields,
which are listed in the documentation for the specific packet.

The `Packet::new_checked` method is a shorthand for a combination of `Packet::new_unchecked`
and `Packet::check_len`.
When parsing untrusted input, it is *necessary* to use `Packet::new_checked()`;
so long as the buffer is not modified, no accessor will fail.

In the `Repr` family of data structures, the `Repr::parse()` method never panics
as long as `Packet::new_checked()` (or `Packet::check_len()`) has succeeded, and
the `Repr::emit()` method never panics as long as the underlying buffer is exactly
`Repr::buffer_len()` octets long.

# Examples

To emit a UDP header into an octet buffer, and then parse it back:

```rust
use lowpan::iface::ChecksumCapabilities;
use lowpan::wire::*;
let src_addr = Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 1);
let dst_addr = Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 2);
let repr = UdpRepr { src_port: 61616, dst_port: 5683 };
let payload = b"abcd";
let mut buffer = vec![0; repr.header_len() + payload.len()];
{ // emission
    let mut packet = UdpPacket::new_unchecked(&mut buffer);
    repr.emit(&mut packet, &src_addr, &dst_addr, payload.len(),
              |buf| buf.copy_from_slice(payload), &ChecksumCapabilities::default());
}
{ // parsing
    let packet = UdpPacket::new_checked(&buffer).expect("truncated packet");
    assert!(packet.verify_checksum(&src_addr, &dst_addr));
    assert_eq!(UdpRepr::parse(&packet), repr);
}
```
*/

mod field {
    pub type Field = ::core::ops::Range<usize>;
    pub type Rest = ::core::ops::RangeFrom<usize>;
}

pub mod pretty_print;

mod icmpv6;
pub mod ieee802154;
pub(crate) mod ip;
pub(crate) mod ipv6;
mod ipv6hopbyhop;
mod ipv6option;
pub mod sixlowpan;
mod tcp;
mod udp;

pub(crate) use crate::{Error, Result};

pub use self::pretty_print::PrettyPrinter;

pub use self::ip::{checksum, Protocol as IpProtocol};

pub use self::ipv6::{
    Address as Ipv6Address, Packet as Ipv6Packet, Repr as Ipv6Repr,
    HEADER_LEN as IPV6_HEADER_LEN,
};

pub(crate) use self::ipv6::AddressExt as Ipv6AddressExt;

pub use self::ipv6option::{
    FailureType as Ipv6OptionFailureType, Ipv6Option, Ipv6OptionsIterator,
    Repr as Ipv6OptionRepr, Type as Ipv6OptionType,
};

pub use self::ipv6hopbyhop::{Header as Ipv6HopByHopHeader, Repr as Ipv6HopByHopRepr};

pub use self::ieee802154::{
    Address as Ieee802154Address, AddressingMode as Ieee802154AddressingMode,
    Frame as Ieee802154Frame, FrameType as Ieee802154FrameType,
    FrameVersion as Ieee802154FrameVersion, Pan as Ieee802154Pan, Repr as Ieee802154Repr,
};

pub use self::sixlowpan::{
    iphc::{Packet as SixlowpanIphcPacket, Repr as SixlowpanIphcRepr},
    nhc::{
        NhcPacket as SixlowpanNhcPacket, UdpNhcPacket as SixlowpanUdpNhcPacket,
        UdpNhcRepr as SixlowpanUdpNhcRepr,
    },
    AddressContext as SixlowpanAddressContext, NextHeader as SixlowpanNextHeader,
    SixlowpanPacket,
};

pub use self::udp::{Packet as UdpPacket, Repr as UdpRepr, HEADER_LEN as UDP_HEADER_LEN};

pub use self::tcp::{
    Flags as TcpFlags, Packet as TcpPacket, Repr as TcpRepr, SeqNumber as TcpSeqNumber,
    TcpOption, DEFAULT_MSS as TCP_DEFAULT_MSS, HEADER_LEN as TCP_HEADER_LEN,
    MAX_OPTIONS_LEN as TCP_MAX_OPTIONS_LEN,
};

pub use self::icmpv6::{
    DstUnreachable as Icmpv6DstUnreachable, Message as Icmpv6Message,
    NeighborFlags as Icmpv6NeighborFlags, Packet as Icmpv6Packet,
    ParamProblem as Icmpv6ParamProblem, Repr as Icmpv6Repr,
    TimeExceeded as Icmpv6TimeExceeded,
};
