use std::sync::atomic::{AtomicU8, Ordering};

use super::event::Transition;

/// Single-slot memory of the last confirmed transition of a line.
///
/// Only the settle context writes the slot. Consumers retrieve an event with
/// [`take`](StatusSlot::take), which hands a given transition to exactly one
/// caller: concurrent takers after one `set(Pressed)` see one `Pressed` and
/// otherwise `NoChange`.
#[derive(Debug)]
pub struct StatusSlot(AtomicU8);

impl StatusSlot {
    pub const fn new() -> Self {
        Self(AtomicU8::new(Transition::NoChange as u8))
    }

    pub fn set(&self, event: Transition) {
        self.0.store(event as u8, Ordering::SeqCst);
    }

    pub fn peek(&self) -> Transition {
        Transition::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub fn take(&self) -> Transition {
        Transition::from_u8(self.0.swap(Transition::NoChange as u8, Ordering::SeqCst))
    }
}

impl Default for StatusSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn take_resets_to_no_change() {
        let slot = StatusSlot::new();
        assert_eq!(slot.peek(), Transition::NoChange);

        slot.set(Transition::Released);
        assert_eq!(slot.peek(), Transition::Released);
        assert_eq!(slot.take(), Transition::Released);
        assert_eq!(slot.take(), Transition::NoChange);
    }

    #[test]
    fn one_set_is_taken_once_across_threads() {
        for _ in 0..200 {
            let slot = StatusSlot::new();
            let seen = AtomicUsize::new(0);
            slot.set(Transition::Pressed);

            std::thread::scope(|s| {
                for _ in 0..4 {
                    s.spawn(|| {
                        if slot.take().is_change() {
                            seen.fetch_add(1, Ordering::SeqCst);
                        }
                    });
                }
            });

            assert_eq!(seen.load(Ordering::SeqCst), 1);
        }
    }
}
