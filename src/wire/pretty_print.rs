/*! One-line-per-header listings of raw datagrams.

Each nested header goes on its own line, indented under the one that
announced it. Unlike the `Display` of a decoded packet, a listing works on
bytes that may be truncated or malformed and prints as far as it can.

# Example

```rust
use lowpan::wire::*;
let buffer = vec![
    // IPv6
    0x60, 0x00, 0x00, 0x00,
    0x00, 0x0c, 0x11, 0x40,
    0xfe, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
    0xff, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
    // UDP
    0x00, 0x01, 0x00, 0x02,
    0x00, 0x0c, 0x02, 0x4e,
    0xff, 0xff, 0xff, 0xff
];

let result = "\
IPv6 src=fe80::1 dst=ff02::1 nxt_hdr=UDP hop_limit=64\n\
\\ UDP src=1 dst=2 len=4\
";

assert_eq!(
    result,
    &format!("{}", PrettyPrinter::<Ipv6Packet<&'static [u8]>>::new("", &buffer))
);
```
*/

use core::fmt;
use core::marker::PhantomData;

/// Prefix and nesting depth of the line being written.
#[derive(Debug)]
pub struct PrettyIndent {
    prefix: &'static str,
    level: usize,
}

impl PrettyIndent {
    /// Start a listing. The first line begins with `prefix`; later lines are
    /// indented by its width.
    pub fn new(prefix: &'static str) -> PrettyIndent {
        PrettyIndent { prefix, level: 0 }
    }

    /// End the current line and nest one level deeper.
    pub fn increase(&mut self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f)?;
        self.level += 1;
        Ok(())
    }
}

impl fmt::Display for PrettyIndent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.level == 0 {
            write!(f, "{}", self.prefix)
        } else {
            write!(f, "{0:1$}{0:2$}\\ ", "", self.prefix.len(), self.level - 1)
        }
    }
}

/// A header type that can list itself and whatever it carries.
pub trait PrettyPrint {
    /// Write the header found at the start of `buffer`, then recurse into
    /// its payload.
    ///
    /// Takes raw bytes because a truncated buffer has no checked view.
    fn pretty_print(
        buffer: &dyn AsRef<[u8]>,
        fmt: &mut fmt::Formatter,
        indent: &mut PrettyIndent,
    ) -> fmt::Result;
}

/// Adapts a [PrettyPrint] listing to `Display`.
pub struct PrettyPrinter<'a, T: PrettyPrint> {
    prefix: &'static str,
    buffer: &'a dyn AsRef<[u8]>,
    phantom: PhantomData<T>,
}

impl<'a, T: PrettyPrint> PrettyPrinter<'a, T> {
    /// List `buffer` as a `T`, starting with `prefix`.
    pub fn new(prefix: &'static str, buffer: &'a dyn AsRef<[u8]>) -> PrettyPrinter<'a, T> {
        PrettyPrinter {
            prefix,
            buffer,
            phantom: PhantomData,
        }
    }
}

impl<'a, T: PrettyPrint> fmt::Display for PrettyPrinter<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        T::pretty_print(&self.buffer, f, &mut PrettyIndent::new(self.prefix))
    }
}
