// Copyright (c) 2018 The rust-gpio-cdev Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The subset of the GPIO v2 character-device ABI a key line needs:
//! requesting one edge-detecting input line, reading its value and
//! reading its edge events.

use core::mem::MaybeUninit;

use bitflags::bitflags;
use nix::ioctl_readwrite;

pub const GPIO_LINES_MAX: usize = 64;
pub const GPIO_MAX_NAME_SIZE: usize = 32;
pub const GPIO_LINE_NUM_ATTRS_MAX: usize = 10;

bitflags! {
    /// Line request flags
    ///
    /// Maps to kernel [`GPIO_V2_LINE_FLAG_*`] flags.
    ///
    /// [`GPIO_V2_LINE_FLAG_*`]: https://github.com/torvalds/linux/blob/v5.19/include/uapi/linux/gpio.h
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct LineFlags: u64 {
        const USED = (1 << 0);
        const ACTIVE_LOW = (1 << 1);
        const INPUT = (1 << 2);
        const OUTPUT = (1 << 3);
        const EDGE_RISING = (1 << 4);
        const EDGE_FALLING = (1 << 5);
        const OPEN_DRAIN = (1 << 6);
        const OPEN_SOURCE = (1 << 7);
        const BIAS_PULL_UP = (1 << 8);
        const BIAS_PULL_DOWN = (1 << 9);
        const BIAS_DISABLED = (1 << 10);
        const EVENT_CLOCK_REALTIME = (1 << 11);
        const EVENT_CLOCK_HTE = (1 << 12);
    }
}

#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub(crate) struct gpio_line_values {
    pub(crate) bits: u64,
    pub(crate) mask: u64,
}

bitflags! {
    /// Attribute IDs
    ///
    /// Maps to kernel [`GPIO_V2_LINE_ATTR_ID_*`] flags.
    ///
    /// [`GPIO_V2_LINE_ATTR_ID_*`]: https://github.com/torvalds/linux/blob/v5.19/include/uapi/linux/gpio.h
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LineAttrId: u32 {
        const FLAGS = 1;
        const OUTPUT_VALUES = 2;
        const DEBOUNCE = 3;
    }
}

/// a configurable attribute of a line
///
/// Never filled in by a key request; present so `gpio_line_config` has the
/// kernel's layout.
#[derive(Clone, Copy)]
#[repr(C)]
pub(crate) struct gpio_line_attribute {
    pub(crate) id: LineAttrId,
    pub(crate) _padding: u32,
    pub(crate) attribute: gpio_line_attribute_union,
}

#[derive(Clone, Copy)]
#[repr(C)]
pub(crate) union gpio_line_attribute_union {
    pub(crate) flags: LineFlags,
    pub(crate) values: u64,
    pub(crate) debounce_period: u32,
}

#[derive(Clone, Copy)]
#[repr(C)]
pub(crate) struct gpio_line_config_attribute {
    pub(crate) attr: gpio_line_attribute,
    pub(crate) mask: u64,
}

#[derive(Clone, Copy)]
#[repr(C)]
pub(crate) struct gpio_line_config {
    pub(crate) flags: LineFlags,
    pub(crate) num_attrs: u32,
    _padding: [u32; 5],
    pub(crate) attrs: [MaybeUninit<gpio_line_config_attribute>; GPIO_LINE_NUM_ATTRS_MAX],
}

impl gpio_line_config {
    pub const fn zeroed() -> Self {
        Self {
            flags: LineFlags::empty(),
            num_attrs: 0,
            _padding: [0; 5],
            attrs: [MaybeUninit::zeroed(); GPIO_LINE_NUM_ATTRS_MAX],
        }
    }
}

#[derive(Clone, Copy)]
#[repr(C)]
pub(crate) struct gpio_line_request {
    pub(crate) offsets: [u32; GPIO_LINES_MAX],
    pub(crate) consumer: [u8; GPIO_MAX_NAME_SIZE],
    pub(crate) config: gpio_line_config,
    pub(crate) num_lines: u32,
    pub(crate) event_buffer_size: u32,
    _padding: [u32; 5],
    pub(crate) fd: std::os::fd::RawFd,
}

impl gpio_line_request {
    pub const fn zeroed() -> Self {
        Self {
            offsets: [0; GPIO_LINES_MAX],
            consumer: [0; GPIO_MAX_NAME_SIZE],
            config: gpio_line_config::zeroed(),
            num_lines: 0,
            event_buffer_size: 0,
            _padding: [0; 5],
            fd: 0,
        }
    }
}

bitflags! {
    /// Line Event ID
    ///
    /// Maps to kernel [`GPIO_V2_LINE_EVENT_*`] flags.
    ///
    /// [`GPIO_V2_LINE_EVENT_*`]: https://github.com/torvalds/linux/blob/v5.19/include/uapi/linux/gpio.h
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LineEventId: u32 {
        const RISING_EDGE = 1;
        const FALLING_EDGE = 2;
    }
}

#[derive(Clone, Copy)]
#[repr(C)]
pub(crate) struct gpio_line_event {
    pub(crate) timestamp_ns: u64,
    pub(crate) id: LineEventId,
    pub(crate) offset: u32,
    pub(crate) seqno: u32,
    pub(crate) line_seqno: u32,
    /* Space reserved for future use. */
    _padding: [MaybeUninit<u32>; 6],
}

pub(crate) const LINE_EVENT_SIZE: usize = std::mem::size_of::<gpio_line_event>();

impl gpio_line_event {
    /// # Safety:
    ///
    /// Caller must ensure that the bytes were produced by the kernel for this type
    pub const unsafe fn from_bytes(bytes: [u8; LINE_EVENT_SIZE]) -> Self {
        let buf_ptr = (&bytes as *const _) as *const Self;
        unsafe { std::ptr::read_unaligned(buf_ptr) }
    }
}

ioctl_readwrite!(gpio_get_line, 0xB4, 0x07, gpio_line_request);

ioctl_readwrite!(gpio_line_get_values, 0xB4, 0x0E, gpio_line_values);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts_match_the_kernel_abi() {
        assert_eq!(std::mem::size_of::<gpio_line_attribute>(), 16);
        assert_eq!(std::mem::size_of::<gpio_line_config_attribute>(), 24);
        assert_eq!(std::mem::size_of::<gpio_line_config>(), 272);
        assert_eq!(std::mem::size_of::<gpio_line_request>(), 592);
        assert_eq!(LINE_EVENT_SIZE, 48);
    }
}
