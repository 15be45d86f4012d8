/// Monotonic time of an edge, in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn now() -> Self {
        let mut timespec = std::mem::MaybeUninit::<libc::timespec>::zeroed();
        let res = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, timespec.as_mut_ptr()) };

        if res == -1 {
            // Every Linux kernel has a realtime clock; zeroed is the last resort.
            let _ = unsafe { libc::clock_gettime(libc::CLOCK_REALTIME, timespec.as_mut_ptr()) };
        }

        let timespec = unsafe { timespec.assume_init() };

        Self(timespec.tv_sec as u64 * 1_000_000_000 + timespec.tv_nsec as u64)
    }

    pub const fn from_nanos(ns: u64) -> Self {
        Self(ns)
    }

    pub const fn as_nanos(&self) -> u64 {
        self.0
    }
}

/// A confirmed key transition, as held by a line's status slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Transition {
    Pressed = 0,
    Released = 1,
    NoChange = 2,
}

impl Transition {
    pub const fn is_change(&self) -> bool {
        !matches!(self, Transition::NoChange)
    }

    pub(crate) const fn from_u8(v: u8) -> Self {
        match v {
            0 => Transition::Pressed,
            1 => Transition::Released,
            _ => Transition::NoChange,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Rising,
    Falling,
}

/// A raw edge reported by a signal source, before debouncing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeEvent {
    timestamp: Timestamp,
    kind: EdgeKind,
    sequence: u32,
}

impl EdgeEvent {
    pub const fn new(timestamp: Timestamp, kind: EdgeKind, sequence: u32) -> Self {
        Self {
            timestamp,
            kind,
            sequence,
        }
    }

    pub const fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub const fn kind(&self) -> EdgeKind {
        self.kind
    }

    pub const fn sequence(&self) -> u32 {
        self.sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_tag_survives_u8() {
        for t in [Transition::Pressed, Transition::Released, Transition::NoChange] {
            assert_eq!(Transition::from_u8(t as u8), t);
        }
        assert_eq!(Transition::from_u8(0xff), Transition::NoChange);
        assert!(!Transition::NoChange.is_change());
    }

    #[test]
    fn monotonic_clock_advances() {
        let a = Timestamp::now();
        std::thread::sleep(std::time::Duration::from_millis(1));
        assert!(Timestamp::now() > a);
    }

    #[test]
    fn edge_event_keeps_kernel_fields() {
        let stamped = Timestamp::now();
        let event = EdgeEvent::new(stamped, EdgeKind::Falling, 42);
        assert_eq!(event.timestamp(), stamped);
        assert_eq!(event.kind(), EdgeKind::Falling);
        assert_eq!(event.sequence(), 42);
        assert!(Timestamp::now().as_nanos() >= event.timestamp().as_nanos());
    }
}
