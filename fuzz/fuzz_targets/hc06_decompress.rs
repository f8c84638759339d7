#![no_main]
use libfuzzer_sys::fuzz_target;
use lowpan::frame::ByteFrame;
use lowpan::iface::{CompressionContext, Config, Interface, Received};
use lowpan::wire::{Ieee802154Address, Ipv6Address};

#[derive(Debug, arbitrary::Arbitrary)]
struct ContextFuzzer {
    id: u8,
    prefix: [u8; 16],
    prefix_len: u8,
}

#[derive(Debug, arbitrary::Arbitrary)]
struct Hc06Fuzzer<'a> {
    contexts: Vec<ContextFuzzer>,
    frame: &'a [u8],
}

fuzz_target!(|fuzz: Hc06Fuzzer| {
    let mut contexts = CompressionContext::new();
    for context in fuzz.contexts {
        let _ = contexts.set_context(
            context.id,
            Ipv6Address::from(context.prefix),
            context.prefix_len,
            true,
        );
    }

    let config = Config::default();
    let mut iface = Interface::new(config, None, Ieee802154Address::Absent);
    let mut frame = ByteFrame::from_bytes(fuzz.frame);
    if let Ok(Received::Ipv6(packet)) = iface.receive(&mut frame, &contexts) {
        let _ = format!("{packet}");

        // Whatever was decoded can be sent again.
        let mut iface = Interface::new(config, None, Ieee802154Address::Absent);
        let _ = iface.transmit(&packet, Ieee802154Address::BROADCAST, &contexts);
    }
});
