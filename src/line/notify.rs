//! Fan-out of confirmed transitions to waiting consumers.
//!
//! Blocking readers and pollers park on one condition variable, task-based
//! pollers leave a [`Waker`], and sessions with asynchronous notification
//! enabled receive a [`Signal`]. A single [`Broadcaster::publish`] serves all
//! three. The status slot is written while the wait-queue lock is held, so a
//! consumer that observes a wake also observes the new status.

use std::cell::Cell;
use std::sync::Arc;
use std::task::Waker;
use std::time::Instant;

use parking_lot::{Condvar, Mutex, ReentrantMutex};

use super::event::Transition;
use super::status::StatusSlot;

pub type SessionId = u64;

/// Out-of-band "data is ready to read" notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signal {
    session: SessionId,
}

impl Signal {
    pub const fn session(&self) -> SessionId {
        self.session
    }
}

/// Receiver of asynchronous readiness signals.
///
/// Handlers run on the settle thread. They may read from the session without
/// blocking, disable notification or close the session, but must not wait
/// for the next transition.
pub trait AsyncNotify: Send + Sync {
    fn notify(&self, signal: Signal);
}

impl<F> AsyncNotify for F
where
    F: Fn(Signal) + Send + Sync,
{
    fn notify(&self, signal: Signal) {
        self(signal)
    }
}

#[derive(Default)]
struct WaitQueue {
    wakers: Vec<Waker>,
}

#[derive(Clone)]
struct Subscription {
    session: SessionId,
    handler: Arc<dyn AsyncNotify>,
    /// Held for the whole of a delivery; false once the session unsubscribed.
    live: Arc<ReentrantMutex<Cell<bool>>>,
}

impl Subscription {
    fn new(session: SessionId, handler: Arc<dyn AsyncNotify>) -> Self {
        Self {
            session,
            handler,
            live: Arc::new(ReentrantMutex::new(Cell::new(true))),
        }
    }

    fn deliver(&self) {
        let live = self.live.lock();
        if live.get() {
            self.handler.notify(Signal {
                session: self.session,
            });
        }
    }

    /// Waits out a delivery running on another thread. A handler retiring its
    /// own subscription re-enters the lock instead.
    fn retire(&self) {
        self.live.lock().set(false);
    }
}

#[derive(Default)]
pub(crate) struct Broadcaster {
    queue: Mutex<WaitQueue>,
    cond: Condvar,
    subscribers: Mutex<Vec<Subscription>>,
}

impl Broadcaster {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Write `event` into `status` and, if it is a real transition, wake every
    /// waiter and signal every asynchronous subscriber.
    pub(crate) fn publish(&self, status: &StatusSlot, event: Transition) {
        let wakers = {
            let mut queue = self.queue.lock();
            status.set(event);
            if !event.is_change() {
                return;
            }
            self.cond.notify_all();
            std::mem::take(&mut queue.wakers)
        };

        for waker in wakers {
            waker.wake();
        }

        // Delivered outside the list lock so handlers may unsubscribe.
        let subscribers = self.subscribers.lock().clone();
        for subscription in &subscribers {
            subscription.deliver();
        }
    }

    /// Wake every waiter without touching the status, so each re-checks its
    /// own exit conditions (close, interrupt, shutdown).
    pub(crate) fn wake_all(&self, update: impl FnOnce()) {
        let wakers = {
            let mut queue = self.queue.lock();
            update();
            self.cond.notify_all();
            std::mem::take(&mut queue.wakers)
        };

        for waker in wakers {
            waker.wake();
        }
    }

    /// Block until `ready` yields a value or `deadline` passes.
    ///
    /// `ready` runs with the wait-queue lock held, so it cannot miss a
    /// publish that happens between its check and the wait.
    pub(crate) fn wait_for<T>(
        &self,
        deadline: Option<Instant>,
        mut ready: impl FnMut() -> Option<T>,
    ) -> Option<T> {
        let mut queue = self.queue.lock();
        loop {
            if let Some(value) = ready() {
                return Some(value);
            }

            match deadline {
                None => self.cond.wait(&mut queue),
                Some(deadline) => {
                    if self.cond.wait_until(&mut queue, deadline).timed_out() {
                        return ready();
                    }
                }
            }
        }
    }

    /// Non-blocking counterpart of [`wait_for`](Broadcaster::wait_for) for
    /// task-based pollers: leaves `waker` queued when `ready` yields nothing.
    #[cfg(feature = "async-tokio")]
    pub(crate) fn poll_with<T>(
        &self,
        waker: &Waker,
        mut ready: impl FnMut() -> Option<T>,
    ) -> Option<T> {
        let mut queue = self.queue.lock();
        if let Some(value) = ready() {
            return Some(value);
        }

        if let Some(existing) = queue.wakers.iter_mut().find(|w| w.will_wake(waker)) {
            existing.clone_from(waker);
        } else {
            queue.wakers.push(waker.clone());
        }
        None
    }

    /// Register `handler` for `session`, replacing any previous handler.
    pub(crate) fn subscribe(&self, session: SessionId, handler: Arc<dyn AsyncNotify>) {
        let subscription = Subscription::new(session, handler);
        let replaced = {
            let mut subscribers = self.subscribers.lock();
            match subscribers.iter_mut().find(|s| s.session == session) {
                Some(entry) => Some(std::mem::replace(entry, subscription)),
                None => {
                    subscribers.push(subscription);
                    None
                }
            }
        };

        if let Some(replaced) = replaced {
            replaced.retire();
        }
    }

    /// Returns whether `session` was subscribed. Once this returns, no
    /// delivery to `session` is in progress on another thread and none
    /// follows.
    pub(crate) fn unsubscribe(&self, session: SessionId) -> bool {
        let removed = {
            let mut subscribers = self.subscribers.lock();
            subscribers
                .iter()
                .position(|s| s.session == session)
                .map(|index| subscribers.remove(index))
        };

        match removed {
            Some(subscription) => {
                subscription.retire();
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn no_change_neither_wakes_nor_signals() {
        let broadcaster = Broadcaster::new();
        let status = StatusSlot::new();
        let signals = Arc::new(AtomicUsize::new(0));
        {
            let signals = Arc::clone(&signals);
            broadcaster.subscribe(
                1,
                Arc::new(move |_: Signal| {
                    signals.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }

        status.set(Transition::Pressed);
        broadcaster.publish(&status, Transition::NoChange);
        assert_eq!(status.peek(), Transition::NoChange);
        assert_eq!(signals.load(Ordering::SeqCst), 0);

        broadcaster.publish(&status, Transition::Released);
        assert_eq!(signals.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn waiter_sees_status_written_by_publish() {
        let broadcaster = Broadcaster::new();
        let status = StatusSlot::new();

        std::thread::scope(|s| {
            let waiter = s.spawn(|| {
                broadcaster.wait_for(None, || Some(status.take()).filter(Transition::is_change))
            });
            std::thread::sleep(Duration::from_millis(20));
            broadcaster.publish(&status, Transition::Pressed);
            assert_eq!(waiter.join().unwrap(), Some(Transition::Pressed));
        });
    }

    #[test]
    fn wait_times_out() {
        let broadcaster = Broadcaster::new();
        let deadline = Instant::now() + Duration::from_millis(20);
        assert_eq!(broadcaster.wait_for(Some(deadline), || None::<()>), None);
        assert!(Instant::now() >= deadline);
    }

    #[test]
    fn subscribe_is_idempotent() {
        let broadcaster = Broadcaster::new();
        broadcaster.subscribe(7, Arc::new(|_: Signal| {}));
        broadcaster.subscribe(7, Arc::new(|_: Signal| {}));
        assert_eq!(broadcaster.subscriber_count(), 1);
        assert!(broadcaster.unsubscribe(7));
        assert!(!broadcaster.unsubscribe(7));
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[test]
    fn handler_can_unsubscribe_itself() {
        let broadcaster = Arc::new(Broadcaster::new());
        let status = StatusSlot::new();
        let signals = Arc::new(AtomicUsize::new(0));
        {
            let weak = Arc::downgrade(&broadcaster);
            let signals = Arc::clone(&signals);
            broadcaster.subscribe(
                3,
                Arc::new(move |signal: Signal| {
                    signals.fetch_add(1, Ordering::SeqCst);
                    if let Some(broadcaster) = weak.upgrade() {
                        assert!(broadcaster.unsubscribe(signal.session()));
                    }
                }),
            );
        }

        broadcaster.publish(&status, Transition::Pressed);
        broadcaster.publish(&status, Transition::Released);
        assert_eq!(signals.load(Ordering::SeqCst), 1);
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[test]
    fn unsubscribe_waits_for_delivery_in_progress() {
        let broadcaster = Broadcaster::new();
        let status = StatusSlot::new();
        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));
        {
            let started = Arc::clone(&started);
            let finished = Arc::clone(&finished);
            broadcaster.subscribe(
                5,
                Arc::new(move |_: Signal| {
                    started.fetch_add(1, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(50));
                    finished.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }

        std::thread::scope(|s| {
            s.spawn(|| broadcaster.publish(&status, Transition::Pressed));
            while started.load(Ordering::SeqCst) == 0 {
                std::thread::yield_now();
            }
            assert!(broadcaster.unsubscribe(5));
            assert_eq!(finished.load(Ordering::SeqCst), 1);
        });

        broadcaster.publish(&status, Transition::Released);
        assert_eq!(started.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn replaced_handler_is_not_called() {
        let broadcaster = Broadcaster::new();
        let status = StatusSlot::new();
        let old = Arc::new(AtomicUsize::new(0));
        let new = Arc::new(AtomicUsize::new(0));
        for counter in [&old, &new] {
            let counter = Arc::clone(counter);
            broadcaster.subscribe(
                9,
                Arc::new(move |_: Signal| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }

        broadcaster.publish(&status, Transition::Pressed);
        assert_eq!(old.load(Ordering::SeqCst), 0);
        assert_eq!(new.load(Ordering::SeqCst), 1);
    }
}
