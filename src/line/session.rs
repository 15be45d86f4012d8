use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::errors::{Error, Result};

use super::event::Transition;
use super::notify::{AsyncNotify, SessionId};
use super::options::AccessMode;
use super::Shared;

/// Lifecycle of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Open = 0,
    Reading = 1,
    Polling = 2,
    Closed = 3,
}

impl SessionState {
    const fn from_u8(v: u8) -> Self {
        match v {
            0 => SessionState::Open,
            1 => SessionState::Reading,
            2 => SessionState::Polling,
            _ => SessionState::Closed,
        }
    }
}

/// Result of [`Session::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    Timeout,
}

impl Readiness {
    pub const fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }
}

/// A consumer's view of a key line, created by [`KeyLine::open`].
///
/// All methods take `&self`, so one thread may [`close`](Session::close) or
/// [`interrupt`](Session::interrupt) a session while another is blocked in
/// [`read`](Session::read). Dropping the session closes it.
///
/// [`KeyLine::open`]: super::KeyLine::open
pub struct Session {
    id: SessionId,
    line: Arc<Shared>,
    mode: AtomicU8,
    state: AtomicU8,
    interrupt_pending: AtomicBool,
    async_enabled: AtomicBool,
}

impl Session {
    pub(crate) fn new(id: SessionId, line: Arc<Shared>, mode: AccessMode) -> Self {
        debug!(session = id, ?mode, "session opened");
        Self {
            id,
            line,
            mode: AtomicU8::new(encode_mode(mode)),
            state: AtomicU8::new(SessionState::Open as u8),
            interrupt_pending: AtomicBool::new(false),
            async_enabled: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn mode(&self) -> AccessMode {
        decode_mode(self.mode.load(Ordering::SeqCst))
    }

    /// Switch between blocking and non-blocking reads.
    pub fn set_mode(&self, mode: AccessMode) {
        self.mode.store(encode_mode(mode), Ordering::SeqCst);
        debug!(session = self.id, ?mode, "session mode changed");
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_closed(&self) -> bool {
        self.state() == SessionState::Closed
    }

    pub fn is_async_enabled(&self) -> bool {
        self.async_enabled.load(Ordering::SeqCst)
    }

    /// Consume the pending transition.
    ///
    /// In non-blocking mode this fails with `WouldBlock` when nothing is
    /// pending. In blocking mode it waits for the next transition and fails
    /// with `Interrupted` if the session is closed or interrupted, or the line
    /// shuts down, first. The returned value is never `NoChange`.
    pub fn read(&self) -> Result<Transition> {
        if self.is_closed() {
            return Err(Error::interrupted());
        }

        if !self.mode().is_blocking() {
            return match self.line.status.take() {
                Transition::NoChange => Err(Error::would_block()),
                event => Ok(event),
            };
        }

        let _guard = self.enter(SessionState::Reading)?;
        let outcome = self.line.broadcaster.wait_for(None, || {
            if let Some(err) = self.exit_condition() {
                return Some(Err(err));
            }
            match self.line.status.take() {
                Transition::NoChange => None,
                event => Some(Ok(event)),
            }
        });

        outcome.unwrap_or_else(|| Err(Error::interrupted()))
    }

    /// Wait up to `timeout` (forever if `None`) for a transition to be pending.
    ///
    /// Never consumes the transition; follow up with [`read`](Session::read).
    pub fn poll(&self, timeout: Option<Duration>) -> Result<Readiness> {
        if self.is_closed() {
            return Err(Error::interrupted());
        }
        if self.line.status.peek().is_change() {
            return Ok(Readiness::Ready);
        }

        let deadline = timeout.and_then(|timeout| Instant::now().checked_add(timeout));

        let _guard = self.enter(SessionState::Polling)?;
        let outcome = self.line.broadcaster.wait_for(deadline, || {
            if let Some(err) = self.exit_condition() {
                return Some(Err(err));
            }
            self.line
                .status
                .peek()
                .is_change()
                .then_some(Ok(Readiness::Ready))
        });

        outcome.unwrap_or(Ok(Readiness::Timeout))
    }

    /// Whether a transition is pending, without waiting or consuming it.
    pub fn is_ready(&self) -> bool {
        !self.is_closed() && self.line.status.peek().is_change()
    }

    /// Deliver a [`Signal`](super::notify::Signal) to `handler` whenever a
    /// transition is confirmed. Replaces a handler registered earlier.
    ///
    /// Once [`disable_async`](Session::disable_async) or
    /// [`close`](Session::close) returns, `handler` is not running on another
    /// thread and is not called again.
    pub fn enable_async(&self, handler: impl AsyncNotify + 'static) -> Result<()> {
        if self.is_closed() {
            return Err(Error::interrupted());
        }
        self.line.broadcaster.subscribe(self.id, Arc::new(handler));
        self.async_enabled.store(true, Ordering::SeqCst);
        debug!(session = self.id, "async notification enabled");
        Ok(())
    }

    pub fn disable_async(&self) {
        if self.line.broadcaster.unsubscribe(self.id) {
            debug!(session = self.id, "async notification disabled");
        }
        self.async_enabled.store(false, Ordering::SeqCst);
    }

    /// Make the current (or, if none, the next) blocking `read`/`poll` fail
    /// with `Interrupted`, as a process signal would.
    pub fn interrupt(&self) {
        self.line
            .broadcaster
            .wake_all(|| self.interrupt_pending.store(true, Ordering::SeqCst));
    }

    /// Deregister from every notification channel and unblock any caller
    /// waiting on this session. Idempotent.
    pub fn close(&self) {
        let previous = self.state.swap(SessionState::Closed as u8, Ordering::SeqCst);
        if previous == SessionState::Closed as u8 {
            return;
        }

        self.disable_async();
        self.line.broadcaster.wake_all(|| ());
        debug!(session = self.id, "session closed");
    }

    fn exit_condition(&self) -> Option<Error> {
        if self.is_closed() || self.line.is_shut_down() {
            return Some(Error::interrupted());
        }
        if self.interrupt_pending.swap(false, Ordering::SeqCst) {
            return Some(Error::interrupted());
        }
        None
    }

    fn enter(&self, state: SessionState) -> Result<StateGuard<'_>> {
        let entered = match self.state.compare_exchange(
            SessionState::Open as u8,
            state as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => Some(state),
            Err(current) if current == SessionState::Closed as u8 => {
                return Err(Error::interrupted())
            }
            // Another caller is already waiting on this session and owns the state.
            Err(_) => None,
        };
        Ok(StateGuard {
            state: &self.state,
            entered,
        })
    }

    #[cfg(feature = "async-tokio")]
    pub(crate) fn is_finished(&self) -> bool {
        self.is_closed() || self.line.is_shut_down()
    }

    #[cfg(feature = "async-tokio")]
    pub(crate) fn poll_read(&self, waker: &std::task::Waker) -> Option<Result<Transition>> {
        self.line.broadcaster.poll_with(waker, || {
            if let Some(err) = self.exit_condition() {
                return Some(Err(err));
            }
            match self.line.status.take() {
                Transition::NoChange => None,
                event => Some(Ok(event)),
            }
        })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("mode", &self.mode())
            .field("state", &self.state())
            .field("async", &self.is_async_enabled())
            .finish()
    }
}

/// Restores `Open` on exit unless the session was closed meanwhile.
struct StateGuard<'a> {
    state: &'a AtomicU8,
    entered: Option<SessionState>,
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        if let Some(entered) = self.entered {
            let _ = self.state.compare_exchange(
                entered as u8,
                SessionState::Open as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            );
        }
    }
}

const fn encode_mode(mode: AccessMode) -> u8 {
    match mode {
        AccessMode::Blocking => 0,
        AccessMode::NonBlocking => 1,
    }
}

const fn decode_mode(v: u8) -> AccessMode {
    match v {
        0 => AccessMode::Blocking,
        _ => AccessMode::NonBlocking,
    }
}
