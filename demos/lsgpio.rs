// Copyright (c) 2018 The rust-gpio-cdev Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! List the GPIO chips a key line can be requested from.

use gpio_key::chips;

fn main() {
    let chip_iterator = match chips() {
        Ok(chips) => chips,
        Err(e) => {
            println!("Failed to get chip iterator: {:?}", e);
            return;
        }
    };

    for chip in chip_iterator {
        let chip = match chip {
            Ok(chip) => chip,
            Err(e) => {
                eprintln!("Failed to open chip: {e}");
                continue;
            }
        };
        match chip.chip_info() {
            Ok(info) => println!(
                "{}: \"{}\", \"{}\", {} GPIO Lines",
                chip.path().display(),
                info.name(),
                info.label(),
                info.num_lines()
            ),
            Err(e) => eprintln!("{}: error {e}", chip.path().display()),
        }
    }
}
