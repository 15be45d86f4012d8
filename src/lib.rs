// Copyright (c) 2018 The rust-gpio-cdev Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The `gpio-key` crate turns a bouncing push-button input into clean
//! `Pressed`/`Released` transitions and hands them to any number of
//! consumers.
//!
//! A [`KeyLine`] owns one physical input. Every raw edge reported by its
//! [`SignalSource`] restarts a settle delay (15 ms by default); once the line
//! has been quiet for that long it is sampled, and a change from the last
//! stable level is published into a single status slot. Consumers open a
//! [`Session`] and observe transitions by
//!
//! - blocking in [`Session::read`],
//! - non-blocking reads with [`AccessMode::NonBlocking`] plus [`Session::poll`],
//! - asynchronous signals through [`Session::enable_async`],
//! - or, with the `async-tokio` feature, a `futures::Stream`.
//!
//! Each transition is consumed once: if two sessions race to read the same
//! press, one gets `Pressed` and the other keeps waiting for the next
//! transition.
//!
//! # Examples
//!
//! Waiting for presses of a key on a Linux GPIO character device:
//!
//! ```no_run
//! use gpio_key::{Chip, CdevLine, KeyConfig, KeyLine, AccessMode, Transition};
//!
//! fn watch_key(offset: u32) -> Result<(), gpio_key::Error> {
//!     let chip = Chip::open("/dev/gpiochip0")?;
//!     let config = KeyConfig::build().with_consumer("watch-key")?.done();
//!     let source = CdevLine::request(&chip, offset, &config)?;
//!     let line = KeyLine::new(source, config)?;
//!
//!     let session = line.open(AccessMode::Blocking)?;
//!     loop {
//!         match session.read()? {
//!             Transition::Pressed => println!("Key Press"),
//!             Transition::Released => println!("Key Release"),
//!             Transition::NoChange => {}
//!         }
//!     }
//! }
//!
//! # fn main() -> Result<(), gpio_key::Error> {
//! #     watch_key(4)
//! # }
//! ```
//!
//! Driving a simulated line, as a test harness would:
//!
//! ```
//! use std::time::Duration;
//! use gpio_key::{AccessMode, KeyConfig, KeyLine, Level, SimulatedLine, Transition};
//!
//! # fn main() -> Result<(), gpio_key::Error> {
//! let sim = SimulatedLine::new(Level::High);
//! let line = KeyLine::new(sim.clone(), KeyConfig::default())?;
//! let session = line.open(AccessMode::Blocking)?;
//!
//! sim.bounce(&[Level::Low, Level::High, Level::Low], Duration::from_millis(2));
//! assert_eq!(session.read()?, Transition::Pressed);
//! # Ok(()) }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

mod errors;

#[cfg(feature = "uapi-v2")]
#[allow(non_camel_case_types)]
pub mod uapi;

#[cfg(feature = "uapi-v2")]
pub mod chip;

pub mod line;

pub mod source;

pub use errors::{Error, ErrorKind};

#[cfg(feature = "uapi-v2")]
pub use chip::{chips, Chip, ChipInfo};
pub use line::{
    AccessMode, Active, AsyncNotify, Bias, EdgeDetect, KeyConfig, KeyLine, Level, LineStats,
    Readiness, Session, SessionId, SessionState, Signal, Transition,
};
#[cfg(feature = "async-tokio")]
pub use line::TransitionStream;
#[cfg(feature = "uapi-v2")]
pub use source::cdev::CdevLine;
pub use source::{sim::SimulatedLine, EdgeTrigger, SignalSource};
