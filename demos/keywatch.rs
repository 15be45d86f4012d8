// Copyright (c) 2018 The rust-gpio-cdev Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use gpio_key::{AccessMode, CdevLine, Chip, KeyConfig, KeyLine, Transition};
use quicli::prelude::*;
use std::path::PathBuf;
use std::time::Duration;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
struct Cli {
    /// The gpiochip device (e.g. /dev/gpiochip0)
    chip: PathBuf,
    /// The offset of the key's GPIO line for the provided chip
    line: u32,
    /// Settle delay in milliseconds
    #[structopt(long, default_value = "15")]
    settle_ms: u64,
    /// Poll with this timeout (milliseconds) and read without blocking
    #[structopt(long)]
    poll_ms: Option<u64>,
}

fn print_transition(event: Transition) {
    match event {
        Transition::Pressed => println!("Key Press"),
        Transition::Released => println!("Key Release"),
        Transition::NoChange => {}
    }
}

fn do_main(args: Cli) -> std::io::Result<()> {
    let chip = Chip::open(&args.chip)?;
    let config = KeyConfig::build()
        .with_settle_delay(Duration::from_millis(args.settle_ms))
        .with_consumer("keywatch")?
        .done();
    let source = CdevLine::request(&chip, args.line, &config)?;
    let line = KeyLine::new(source, config)?;

    match args.poll_ms {
        None => {
            let session = line.open(AccessMode::Blocking)?;
            loop {
                print_transition(session.read()?);
            }
        }
        Some(poll_ms) => {
            let session = line.open(AccessMode::NonBlocking)?;
            let timeout = Duration::from_millis(poll_ms);
            loop {
                if !session.poll(Some(timeout))?.is_ready() {
                    println!("timeout");
                    continue;
                }
                match session.read() {
                    Ok(event) => print_transition(event),
                    // Consumed by another reader between poll and read.
                    Err(e) if e.is_would_block() => continue,
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }
}

fn main() -> CliResult {
    let args = Cli::from_args();
    do_main(args).or_else(|e| {
        error!("{:?}", e);
        Ok(())
    })
}
