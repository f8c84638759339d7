use std::env;
use std::io::{self, BufRead};
use std::net::Ipv6Addr;
use std::process::exit;
use std::str::FromStr;

use env_logger::{Builder, Env};
use getopts::Options;

use lowpan::frame::ByteFrame;
use lowpan::iface::{CompressionContext, Config, Interface, Received};
use lowpan::wire::{Ieee802154Address, Ipv6Packet, PrettyPrinter};

fn decode_hex(line: &str) -> Option<Vec<u8>> {
    let digits: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return None;
    }
    digits
        .chunks(2)
        .map(|pair| {
            let byte: String = pair.iter().collect();
            u8::from_str_radix(&byte, 16).ok()
        })
        .collect()
}

/// Parse a context given as `ID=PREFIX/LEN`, e.g. `1=2001:db8::/64`.
fn parse_context(arg: &str) -> Option<(u8, Ipv6Addr, u8)> {
    let (id, cidr) = arg.split_once('=')?;
    let (prefix, len) = cidr.split_once('/')?;
    Some((
        u8::from_str(id).ok()?,
        Ipv6Addr::from_str(prefix).ok()?,
        u8::from_str(len).ok()?,
    ))
}

fn print_usage(program: &str, opts: Options) {
    let brief = format!("Usage: {program} [options] < FRAMES");
    print!("{}", opts.usage(&brief));
    println!("\nEach input line holding a frame reads `h:<hex bytes>`; other lines are ignored.");
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optflag("h", "help", "print this help menu");
    opts.optflag("", "fcs", "frames end with a 2-byte FCS");
    opts.optflag("", "lenient", "accept IPv6 headers with a wrong version");
    opts.optflag("", "raw", "also dump the decompressed IPv6 datagram");
    opts.optmulti("c", "context", "install a compression context", "ID=PREFIX/LEN");

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{e}");
            exit(1)
        }
    };
    if matches.opt_present("h") || !matches.free.is_empty() {
        print_usage(&program, opts);
        return;
    }

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let mut config = Config::default();
    config.frame_check_sequence = matches.opt_present("fcs");
    config.strict_version = !matches.opt_present("lenient");
    let raw = matches.opt_present("raw");

    let mut contexts = CompressionContext::new();
    for arg in matches.opt_strs("c") {
        let installed = parse_context(&arg)
            .ok_or_else(|| format!("cannot parse context {arg:?}"))
            .and_then(|(id, prefix, len)| {
                contexts
                    .set_context(id, prefix, len, true)
                    .map_err(|e| format!("context {arg}: {e}"))
            });
        if let Err(e) = installed {
            eprintln!("{e}");
            exit(1);
        }
    }

    // The sniffer never transmits, so the hardware address is never used.
    let mut iface = Interface::new(config, None, Ieee802154Address::Absent);

    for (lineno, line) in io::stdin().lock().lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("cannot read input: {e}");
                exit(1);
            }
        };
        let Some(hex) = line.trim().strip_prefix("h:") else {
            continue;
        };
        let Some(bytes) = decode_hex(hex) else {
            println!("line {}: bad hex", lineno + 1);
            continue;
        };

        let mut frame = ByteFrame::from_bytes(&bytes);
        let received = iface.receive(&mut frame, &contexts);

        let attributes: Vec<String> = frame
            .attributes()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        if !attributes.is_empty() {
            println!("line {}: [{}]", lineno + 1, attributes.join(" "));
        }

        match received {
            Ok(Received::Control(frame_type)) => {
                println!("line {}: {} frame", lineno + 1, frame_type)
            }
            Ok(Received::Empty) => println!("line {}: no IPv6 payload", lineno + 1),
            Ok(Received::Ipv6(packet)) => {
                println!("line {}:\n{}", lineno + 1, packet);
                if raw {
                    let bytes = packet.frame().as_bytes();
                    println!("{}", PrettyPrinter::<Ipv6Packet<&[u8]>>::new("raw: ", &bytes));
                }
            }
            Err(e) => println!("line {}: {}", lineno + 1, e),
        }
    }
}
