#![no_main]
use libfuzzer_sys::fuzz_target;
use lowpan::frame::ByteFrame;
use lowpan::iface::{ChecksumCapabilities, Config, IpPayload, Packet};
use lowpan::wire::{Ipv6Packet, PrettyPrinter};

fuzz_target!(|data: &[u8]| {
    let _ = format!("{}", PrettyPrinter::<Ipv6Packet<&[u8]>>::new("", &data));

    let mut config = Config::default();
    config.strict_version = false;
    if let Ok(mut packet) = Packet::parse(ByteFrame::from_bytes(data), &config) {
        let _ = format!("{packet}");

        let mut out = ByteFrame::new();
        if let Ok(len) = packet.serialize(&mut out, &ChecksumCapabilities::default()) {
            assert_eq!(len, out.len());
            assert_eq!(
                packet.payload().map(IpPayload::buffer_len),
                Some(packet.header().payload_len)
            );
            let reparsed = Packet::parse(out, &config).expect("serialized packet parses");
            assert_eq!(reparsed.payload(), packet.payload());
        }
    }
});
