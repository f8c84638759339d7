#![no_main]
use libfuzzer_sys::fuzz_target;
use lowpan::frame::ByteFrame;
use lowpan::iface::{mac, Config};

fuzz_target!(|input: (bool, &[u8])| {
    let (frame_check_sequence, data) = input;
    let mut config = Config::default();
    config.frame_check_sequence = frame_check_sequence;

    let mut frame = ByteFrame::from_bytes(data);
    if let Ok(parsed) = mac::parse(&mut frame, &config) {
        assert!(parsed.header_len + parsed.payload_len <= data.len());
        let payload = parsed.payload(&frame).to_vec();

        // Re-emitting must not panic; it may only refuse oversized frames.
        let _ = mac::emit(&parsed.repr, &payload, &config);
    }
});
