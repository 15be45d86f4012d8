// Copyright (c) 2018 The rust-gpio-cdev Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Asynchronous notification: the key line signals the application, which
//! then reads without ever blocking.

use gpio_key::{AccessMode, CdevLine, Chip, KeyConfig, KeyLine, Signal, Transition};
use quicli::prelude::*;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Mutex;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
struct Cli {
    /// The gpiochip device (e.g. /dev/gpiochip0)
    chip: PathBuf,
    /// The offset of the key's GPIO line for the provided chip
    line: u32,
}

fn do_main(args: Cli) -> std::io::Result<()> {
    let chip = Chip::open(&args.chip)?;
    let config = KeyConfig::build().with_consumer("asyncnoti")?.done();
    let source = CdevLine::request(&chip, args.line, &config)?;
    let line = KeyLine::new(source, config)?;

    let session = line.open(AccessMode::NonBlocking)?;
    let (tx, rx) = mpsc::channel::<Signal>();
    let tx = Mutex::new(tx);
    session.enable_async(move |signal: Signal| {
        if let Ok(tx) = tx.lock() {
            let _ = tx.send(signal);
        }
    })?;

    for signal in rx {
        info!("signal for session {}", signal.session());
        match session.read() {
            Ok(Transition::Pressed) => println!("Key Press"),
            Ok(Transition::Released) => println!("Key Release"),
            Ok(Transition::NoChange) => {}
            Err(e) if e.is_would_block() => {}
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

fn main() -> CliResult {
    let args = Cli::from_args();
    do_main(args).or_else(|e| {
        error!("{:?}", e);
        Ok(())
    })
}
