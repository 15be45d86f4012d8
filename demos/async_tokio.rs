// Copyright (c) 2018 The rust-gpio-cdev Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use futures::stream::StreamExt;
use gpio_key::{AccessMode, CdevLine, Chip, KeyConfig, KeyLine};
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
struct Cli {
    /// The gpiochip device (e.g. /dev/gpiochip0)
    chip: PathBuf,
    /// The offset of the key's GPIO line for the provided chip
    line: u32,
}

async fn do_main(args: Cli) -> anyhow::Result<()> {
    let chip = Chip::open(&args.chip)?;
    let config = KeyConfig::build().with_consumer("async-key")?.done();
    let source = CdevLine::request(&chip, args.line, &config)?;
    let line = KeyLine::new(source, config)?;

    let mut events = line.open(AccessMode::Blocking)?.into_stream();
    while let Some(event) = events.next().await {
        println!("{:?}", event?);
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Cli::from_args();
    if let Err(e) = do_main(args).await {
        eprintln!("Error: {:?}", e);
    }
}
