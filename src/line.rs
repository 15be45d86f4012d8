use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::{
    errors::{Error, Result},
    source::{EdgeTrigger, SignalSource},
};

pub(crate) mod debounce;
pub mod event;
mod notify;
mod option_builder;
pub mod options;
mod session;
mod status;
#[cfg(feature = "async-tokio")]
mod stream;
pub mod values;

pub use debounce::classify;
pub use event::{EdgeEvent, EdgeKind, Timestamp, Transition};
pub use notify::{AsyncNotify, SessionId, Signal};
pub use options::{AccessMode, Active, Bias, EdgeDetect, KeyConfig};
pub use session::{Readiness, Session, SessionState};
pub use status::StatusSlot;
#[cfg(feature = "async-tokio")]
pub use stream::TransitionStream;
pub use values::Level;

use debounce::{Debouncer, SettleTimer};
use notify::Broadcaster;

/// Counters describing what a line has seen so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineStats {
    /// Raw edges reported by the signal source
    pub edges: u64,
    /// Times the line was sampled after settling
    pub settles: u64,
    /// Settles that produced `Pressed` or `Released`
    pub transitions: u64,
}

/// State shared by a line, its settle thread and every session.
pub(crate) struct Shared {
    source: Box<dyn SignalSource>,
    config: KeyConfig,
    timer: Arc<SettleTimer>,
    debouncer: Debouncer,
    pub(crate) status: StatusSlot,
    pub(crate) broadcaster: Broadcaster,
    shut_down: AtomicBool,
    next_session: AtomicU64,
    settles: AtomicU64,
    transitions: AtomicU64,
}

impl Shared {
    pub(crate) fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    fn settle(&self) {
        self.settles.fetch_add(1, Ordering::Relaxed);

        let sample = match self.source.read_level() {
            Ok(level) => level,
            Err(err) => {
                warn!(consumer = %self.config.consumer(), "failed to sample key line: {err}");
                return;
            }
        };

        let event = self.debouncer.on_settle(sample);
        trace!(?sample, ?event, "key line settled");
        if event.is_change() {
            self.transitions.fetch_add(1, Ordering::Relaxed);
            debug!(consumer = %self.config.consumer(), ?event, "key transition");
        }

        self.broadcaster.publish(&self.status, event);
    }
}

/// One debounced key input line.
///
/// Construct it once per physical line with [`KeyLine::new`]; every consumer
/// then calls [`open`](KeyLine::open) to get its own [`Session`]. Dropping the
/// line stops debouncing, releases the signal source and interrupts sessions
/// blocked on it.
pub struct KeyLine {
    shared: Arc<Shared>,
    settle_thread: Option<JoinHandle<()>>,
}

impl KeyLine {
    pub fn new(source: impl SignalSource, config: KeyConfig) -> Result<Self> {
        let timer = Arc::new(SettleTimer::new(config.settle_delay()));
        let shared = Arc::new(Shared {
            source: Box::new(source),
            debouncer: Debouncer::new(config.initial_level(), config.active()),
            timer: Arc::clone(&timer),
            config,
            status: StatusSlot::new(),
            broadcaster: Broadcaster::new(),
            shut_down: AtomicBool::new(false),
            next_session: AtomicU64::new(1),
            settles: AtomicU64::new(0),
            transitions: AtomicU64::new(0),
        });

        let settle_thread = {
            let shared = Arc::clone(&shared);
            std::thread::Builder::new()
                .name(format!("{}-settle", thread_label(shared.config.consumer())))
                .spawn(move || shared.timer.run(|| shared.settle()))?
        };

        let mut line = Self {
            shared,
            settle_thread: Some(settle_thread),
        };

        let edge_detect = line.shared.config.edge_detect();
        if let Err(err) = line
            .shared
            .source
            .on_edge_notify(edge_detect, EdgeTrigger::new(timer))
        {
            // The source never took the subscription, so it is not released.
            line.stop_settling();
            return Err(Error::configuration(format!(
                "failed to subscribe to {edge_detect:?} edges: {err}"
            )));
        }

        info!(
            consumer = %line.shared.config.consumer(),
            settle_delay = ?line.shared.config.settle_delay(),
            ?edge_detect,
            "key line ready"
        );
        Ok(line)
    }

    /// Open a new session in the given access mode.
    ///
    /// Fails with a configuration error when the signal source cannot be read.
    pub fn open(&self, mode: AccessMode) -> Result<Session> {
        if self.shared.is_shut_down() {
            return Err(Error::configuration("key line is shut down"));
        }
        self.shared
            .source
            .read_level()
            .map_err(|err| Error::configuration(format!("key line unavailable: {err}")))?;

        let id = self.shared.next_session.fetch_add(1, Ordering::Relaxed);
        Ok(Session::new(id, Arc::clone(&self.shared), mode))
    }

    /// A handle the interrupt layer can use to report raw edges directly.
    pub fn edge_trigger(&self) -> EdgeTrigger {
        EdgeTrigger::new(Arc::clone(&self.shared.timer))
    }

    pub fn config(&self) -> &KeyConfig {
        &self.shared.config
    }

    pub fn settle_delay(&self) -> Duration {
        self.shared.timer.delay()
    }

    /// Change the settle delay. Applies from the next edge on.
    pub fn set_settle_delay(&self, delay: Duration) {
        self.shared.timer.set_delay(delay);
        debug!(?delay, "settle delay changed");
    }

    /// The pending transition, without consuming it.
    pub fn peek(&self) -> Transition {
        self.shared.status.peek()
    }

    /// The last level confirmed stable by the debouncer.
    pub fn stable_level(&self) -> Level {
        self.shared.debouncer.stable_level()
    }

    pub fn is_settling(&self) -> bool {
        self.shared.timer.is_pending()
    }

    pub fn stats(&self) -> LineStats {
        LineStats {
            edges: self.shared.timer.edges(),
            settles: self.shared.settles.load(Ordering::Relaxed),
            transitions: self.shared.transitions.load(Ordering::Relaxed),
        }
    }

    /// Stops the settle thread and wakes every session. Returns false if it
    /// had already been stopped.
    fn stop_settling(&mut self) -> bool {
        let Some(settle_thread) = self.settle_thread.take() else {
            return false;
        };

        self.shared.timer.stop();
        if settle_thread.join().is_err() {
            warn!("settle thread panicked");
        }
        self.shared
            .broadcaster
            .wake_all(|| self.shared.shut_down.store(true, Ordering::SeqCst));
        true
    }

    fn shutdown(&mut self) {
        if self.stop_settling() {
            self.shared.source.release();
            info!(consumer = %self.shared.config.consumer(), "key line shut down");
        }
    }
}

impl Drop for KeyLine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for KeyLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyLine")
            .field("config", &self.shared.config)
            .field("status", &self.shared.status.peek())
            .field("stats", &self.stats())
            .finish()
    }
}

fn thread_label(consumer: &str) -> &str {
    if consumer.is_empty() {
        "gpio-key"
    } else {
        consumer
    }
}
