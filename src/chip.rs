//! GPIO character devices (`/dev/gpiochipN`).

use std::{
    fs::File,
    os::{
        fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd},
        unix::ffi::OsStrExt,
    },
    path::{Path, PathBuf},
};

use bstr::ByteSlice;

use crate::{
    errors::{Error, Result},
    line::options::{Consumer, KeyConfig, CONSUMER_MAX},
    uapi,
};

/// A GPIO Chip maps to the actual device driver instance in hardware that
/// one interacts with to interact with individual GPIOs.
///
/// Chips are not guaranteed to enumerate in the same order across boots; use
/// [`chips()`] and match on [`ChipInfo::label`] rather than hard-coding a path
/// outside of demo work.
#[derive(Debug)]
pub struct Chip {
    path: PathBuf,
    fd: OwnedFd,
}

impl Chip {
    /// Open the GPIO Chip at the provided path (e.g. `/dev/gpiochip<N>`)
    pub fn open(p: impl AsRef<Path>) -> Result<Self> {
        let path = p.as_ref().to_path_buf();
        let f = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)?;
        let this = Self {
            path,
            fd: OwnedFd::from(f),
        };
        let _ = this.chip_info()?;
        Ok(this)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn chip_info(&self) -> Result<ChipInfo> {
        let mut info = uapi::gpio_chip_info::zeroed();
        // Error condition: -1, already handled
        let _ = unsafe { uapi::gpio_get_chipinfo(self.as_raw_fd(), &mut info)? };

        Ok(ChipInfo {
            name: name_from_bytes(&info.name),
            label: name_from_bytes(&info.label),
            lines: info.lines,
        })
    }

    /// Request the line at `offset` as an edge-detecting input for a key.
    ///
    /// The returned file yields `gpio_v2_line_event` records and answers value
    /// reads. A line already held by another consumer is reported as a
    /// configuration error.
    pub(crate) fn request_key_line(&self, offset: u32, config: &KeyConfig) -> Result<File> {
        let info = self.chip_info()?;
        if offset >= info.num_lines() {
            return Err(Error::configuration(format!(
                "offset {offset} is out of range for chip '{}' ({} lines)",
                info.name(),
                info.num_lines()
            )));
        }

        let mut req = uapi::v2::gpio_line_request::zeroed();
        req.num_lines = 1;
        req.offsets[0] = offset;
        req.config.flags = config.build_v2();

        let consumer = if config.consumer().is_empty() {
            "gpio-key"
        } else {
            config.consumer()
        };
        copy_consumer(&mut req.consumer, consumer);

        match unsafe { uapi::v2::gpio_get_line(self.as_raw_fd(), &mut req) } {
            Ok(_) => {}
            Err(nix::Error::EBUSY) => {
                return Err(Error::configuration(format!(
                    "line {offset} on chip '{}' is already in use",
                    info.name()
                )))
            }
            Err(err) => return Err(err.into()),
        }

        Ok(unsafe { File::from_raw_fd(req.fd) })
    }
}

impl AsRawFd for Chip {
    #[inline(always)]
    fn as_raw_fd(&self) -> std::os::unix::prelude::RawFd {
        self.fd.as_raw_fd()
    }
}

impl AsFd for Chip {
    #[inline(always)]
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

pub struct ChipInfo {
    name: Consumer,
    label: Consumer,
    lines: u32,
}

impl ChipInfo {
    /// The name of the device driving this GPIO chip in the kernel
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A functional name for this GPIO chip, such as a product number.  Might
    /// be an empty string.
    ///
    /// As an example, the SoC GPIO chip on a Raspberry Pi is "pinctrl-bcm2835"
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The number of lines/pins indexable through this chip
    pub const fn num_lines(&self) -> u32 {
        self.lines
    }
}

fn name_from_bytes(bytes: &[u8; uapi::v2::GPIO_MAX_NAME_SIZE]) -> Consumer {
    let nul = bytes[..].find_byte(0).unwrap_or(bytes.len());
    let mut name = Consumer::new();
    for c in bytes[..nul].to_str_lossy().chars() {
        if name.push(c).is_err() {
            break;
        }
    }
    name
}

const _: () = assert!(CONSUMER_MAX < uapi::v2::GPIO_MAX_NAME_SIZE);

/// Copies `consumer` into a kernel name field, always leaving a trailing NUL.
fn copy_consumer(field: &mut [u8; uapi::v2::GPIO_MAX_NAME_SIZE], consumer: &str) {
    let len = consumer.len().min(uapi::v2::GPIO_MAX_NAME_SIZE - 1);
    field[..len].copy_from_slice(&consumer.as_bytes()[..len]);
    field[len..].fill(0);
}

/// Iterate over all GPIO chips currently present on this system
pub fn chips() -> Result<ChipIterator> {
    Ok(ChipIterator {
        readdir: std::fs::read_dir("/dev")?,
    })
}

/// Iterator over chips
#[derive(Debug)]
pub struct ChipIterator {
    readdir: std::fs::ReadDir,
}

impl Iterator for ChipIterator {
    type Item = Result<Chip>;

    fn next(&mut self) -> Option<Result<Chip>> {
        for entry in &mut self.readdir {
            let e = match entry {
                Ok(e) => e,
                Err(e) => {
                    return Some(Err(e.into()));
                }
            };
            let p = e.path();
            let Some(f) = p.file_name() else {
                continue;
            };
            if f.as_bytes().starts_with_str("gpiochip") {
                return Some(Chip::open(&p));
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_stop_at_nul() {
        let mut raw = [0u8; uapi::v2::GPIO_MAX_NAME_SIZE];
        raw[..8].copy_from_slice(b"gpiochip");
        assert_eq!(&*name_from_bytes(&raw), "gpiochip");

        let full = [b'a'; uapi::v2::GPIO_MAX_NAME_SIZE];
        assert_eq!(name_from_bytes(&full).len(), CONSUMER_MAX);
    }

    #[test]
    fn longest_consumer_leaves_room_for_nul() {
        let label = "k".repeat(CONSUMER_MAX);
        let config = KeyConfig::build().with_consumer(&label).unwrap().done();

        let mut raw = [0u8; uapi::v2::GPIO_MAX_NAME_SIZE];
        copy_consumer(&mut raw, config.consumer());
        assert_eq!(raw[uapi::v2::GPIO_MAX_NAME_SIZE - 1], 0);
        assert_eq!(&*name_from_bytes(&raw), label);
    }

    #[test]
    fn missing_chip_is_an_io_error() {
        let err = Chip::open("/dev/gpiochip-does-not-exist").unwrap_err();
        assert!(matches!(err.kind(), crate::errors::ErrorKind::Io(_)));
    }
}
