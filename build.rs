use std::collections::BTreeMap;
use std::env;
use std::fmt::Write;
use std::fs;
use std::path::PathBuf;

// (name, default, max)
static CONFIGS: &[(&str, usize, usize)] = &[
    ("LOWPAN_CONTEXT_COUNT", 16, 16),
    ("FRAME_MAX_ATTRIBUTE_COUNT", 8, 64),
    ("PACKET_MAX_DIAGNOSTIC_COUNT", 4, 64),
];

fn main() {
    let mut values = BTreeMap::new();

    for &(name, default, max) in CONFIGS {
        println!("cargo:rerun-if-env-changed={name}");

        let value = match env::var(name) {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(value) if value >= 1 && value <= max => value,
                _ => panic!("{name} must be an integer in 1..={max}, got {raw:?}"),
            },
            Err(_) => default,
        };
        values.insert(name, value);
    }

    let mut data = String::new();
    for (name, value) in values {
        writeln!(data, "pub const {name}: usize = {value};").unwrap();
    }

    let out_dir = PathBuf::from(env::var_os("OUT_DIR").unwrap());
    fs::write(out_dir.join("config.rs"), data).unwrap();
}
