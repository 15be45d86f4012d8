//! The physical side of a key line.
//!
//! A [`SignalSource`] reports the current [`Level`] on demand and calls
//! [`EdgeTrigger::on_edge`] from its interrupt context whenever the line
//! changes. [`sim::SimulatedLine`] is an in-memory source for tests and
//! harnesses; [`cdev::CdevLine`] drives a real Linux GPIO line.

use std::io::Result;
use std::sync::Arc;

use crate::line::{options::EdgeDetect, values::Level};

#[cfg(feature = "uapi-v2")]
pub mod cdev;
pub mod sim;

use crate::line::debounce::SettleTimer;

pub trait SignalSource: Send + Sync + 'static {
    /// Sample the line.
    fn read_level(&self) -> Result<Level>;

    /// Start reporting `edges` through `trigger`.
    fn on_edge_notify(&self, edges: EdgeDetect, trigger: EdgeTrigger) -> Result<()>;

    /// Stop reporting edges and give the line back. Called once, when the
    /// owning [`KeyLine`](crate::KeyLine) shuts down.
    fn release(&self) {}
}

impl<T: SignalSource + ?Sized> SignalSource for Arc<T> {
    fn read_level(&self) -> Result<Level> {
        (**self).read_level()
    }

    fn on_edge_notify(&self, edges: EdgeDetect, trigger: EdgeTrigger) -> Result<()> {
        (**self).on_edge_notify(edges, trigger)
    }

    fn release(&self) {
        (**self).release()
    }
}

/// Handle used from edge (interrupt) context to report a raw edge.
///
/// [`on_edge`](EdgeTrigger::on_edge) never blocks, locks or allocates; it
/// only restarts the line's settle delay.
#[derive(Debug, Clone)]
pub struct EdgeTrigger {
    timer: Arc<SettleTimer>,
}

impl EdgeTrigger {
    pub(crate) fn new(timer: Arc<SettleTimer>) -> Self {
        Self { timer }
    }

    #[inline]
    pub fn on_edge(&self) {
        self.timer.arm();
    }
}
