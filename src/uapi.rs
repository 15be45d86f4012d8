mod common;

pub use common::*;

pub(crate) mod v2;
