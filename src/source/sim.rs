use std::io::{Error, ErrorKind, Result};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{EdgeTrigger, SignalSource};
use crate::line::{options::EdgeDetect, values::Level};

/// An in-memory key line.
///
/// Cloning yields another handle to the same line, so a test can keep one
/// clone to drive the level while a [`KeyLine`](crate::KeyLine) owns another.
#[derive(Debug, Clone)]
pub struct SimulatedLine {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    level: AtomicU8,
    available: AtomicBool,
    subscription: Mutex<Option<(EdgeDetect, EdgeTrigger)>>,
}

impl SimulatedLine {
    pub fn new(level: Level) -> Self {
        Self {
            inner: Arc::new(Inner {
                level: AtomicU8::new(level.to_bit()),
                available: AtomicBool::new(true),
                subscription: Mutex::new(None),
            }),
        }
    }

    pub fn level(&self) -> Level {
        Level::from_bit(self.inner.level.load(Ordering::SeqCst))
    }

    /// Drive the line to `level`, raising an edge if it changed and the
    /// subscriber asked for that direction.
    pub fn set_level(&self, level: Level) {
        let previous = Level::from_bit(self.inner.level.swap(level.to_bit(), Ordering::SeqCst));
        if let Some((edges, trigger)) = &*self.inner.subscription.lock() {
            if edges.matches(previous, level) {
                trigger.on_edge();
            }
        }
    }

    /// Raise an edge without moving the level, like a glitch too short to sample.
    pub fn glitch(&self) {
        if let Some((_, trigger)) = &*self.inner.subscription.lock() {
            trigger.on_edge();
        }
    }

    /// Walk the line through `levels`, pausing `gap` after each one.
    pub fn bounce(&self, levels: &[Level], gap: Duration) {
        for level in levels {
            self.set_level(*level);
            std::thread::sleep(gap);
        }
    }

    /// Make `read_level` fail, as if the line could not be granted.
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    pub fn is_subscribed(&self) -> bool {
        self.inner.subscription.lock().is_some()
    }
}

impl Default for SimulatedLine {
    fn default() -> Self {
        Self::new(Level::High)
    }
}

impl SignalSource for SimulatedLine {
    fn read_level(&self) -> Result<Level> {
        if !self.inner.available.load(Ordering::SeqCst) {
            return Err(Error::new(ErrorKind::NotConnected, "simulated line unavailable"));
        }
        Ok(self.level())
    }

    fn on_edge_notify(&self, edges: EdgeDetect, trigger: EdgeTrigger) -> Result<()> {
        let mut subscription = self.inner.subscription.lock();
        if subscription.is_some() {
            return Err(Error::new(
                ErrorKind::AlreadyExists,
                "simulated line already has an edge subscriber",
            ));
        }
        *subscription = Some((edges, trigger));
        Ok(())
    }

    fn release(&self) {
        self.inner.subscription.lock().take();
    }
}
