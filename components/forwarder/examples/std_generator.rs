//! Slow, crashing stdout producer for trying `forward` by hand:
//!
//! ```text
//! cargo run --example std_generator 2>&1 | cargo run --bin forward -- --tls=false localhost:5140
//! ```
//!
//! Prints a digit per second, then panics halfway through so the panic
//! message on stderr can be forwarded too.

#![allow(clippy::panic)]

use std::io::{self, Write};
use std::thread;
use std::time::Duration;

fn main() -> io::Result<()> {
    let mut out = io::stdout();
    for x in 0..10 {
        write!(out, "{x}")?;
        out.flush()?;
        thread::sleep(Duration::from_secs(1));

        if x == 5 {
            panic!("Pretend to hit a fatal error");
        }
    }
    writeln!(out)
}
