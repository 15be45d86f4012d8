//! Contact-bounce filtering.
//!
//! An edge never samples the line. It only (re)arms a single settle deadline;
//! the settle thread samples once the deadline passes without another edge.
//! A burst of edges therefore collapses into a single settle, and the last
//! edge of the burst decides when that settle happens.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::OnceLock;
use std::thread::{self, Thread};
use std::time::{Duration, Instant};

use super::event::Transition;
use super::options::Active;
use super::values::Level;

const IDLE: u64 = 0;

/// Outcome of comparing a fresh sample with the last stable level.
pub const fn classify(previous: Level, current: Level, active: Active) -> Transition {
    match (previous.is_pressed(active), current.is_pressed(active)) {
        (false, true) => Transition::Pressed,
        (true, false) => Transition::Released,
        _ => Transition::NoChange,
    }
}

/// Re-armable one-shot deadline serviced by a dedicated settle thread.
///
/// [`arm`](SettleTimer::arm) is safe from edge context: it takes no lock and
/// never allocates.
#[derive(Debug)]
pub(crate) struct SettleTimer {
    origin: Instant,
    /// Nanoseconds past `origin`, or `IDLE` when nothing is pending.
    deadline: AtomicU64,
    delay_ns: AtomicU64,
    edges: AtomicU64,
    stopped: AtomicBool,
    worker: OnceLock<Thread>,
}

impl SettleTimer {
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            origin: Instant::now(),
            deadline: AtomicU64::new(IDLE),
            delay_ns: AtomicU64::new(duration_nanos(delay)),
            edges: AtomicU64::new(0),
            stopped: AtomicBool::new(false),
            worker: OnceLock::new(),
        }
    }

    fn now_ns(&self) -> u64 {
        duration_nanos(self.origin.elapsed())
    }

    pub(crate) fn delay(&self) -> Duration {
        Duration::from_nanos(self.delay_ns.load(Ordering::Relaxed))
    }

    pub(crate) fn set_delay(&self, delay: Duration) {
        self.delay_ns.store(duration_nanos(delay), Ordering::Relaxed);
    }

    /// Restart the settle delay from now, replacing any pending deadline.
    pub(crate) fn arm(&self) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }
        self.edges.fetch_add(1, Ordering::Relaxed);

        let deadline = self
            .now_ns()
            .saturating_add(self.delay_ns.load(Ordering::Relaxed))
            .max(IDLE + 1);
        self.deadline.store(deadline, Ordering::SeqCst);

        // A concurrent stop may have cleared the deadline before this store.
        if self.stopped.load(Ordering::SeqCst) {
            self.deadline.store(IDLE, Ordering::SeqCst);
            return;
        }

        if let Some(worker) = self.worker.get() {
            worker.unpark();
        }
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.deadline.load(Ordering::SeqCst) != IDLE
    }

    pub(crate) fn edges(&self) -> u64 {
        self.edges.load(Ordering::Relaxed)
    }

    pub(crate) fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.deadline.store(IDLE, Ordering::SeqCst);
        if let Some(worker) = self.worker.get() {
            worker.unpark();
        }
    }

    /// Body of the settle thread. Calls `on_settle` once per expired deadline
    /// until [`stop`](SettleTimer::stop) is called.
    pub(crate) fn run(&self, mut on_settle: impl FnMut()) {
        // Publish the handle before the first deadline check so an edge racing
        // with startup either sees the handle or is seen by the check below.
        let _ = self.worker.set(thread::current());

        loop {
            if self.stopped.load(Ordering::SeqCst) {
                break;
            }

            let deadline = self.deadline.load(Ordering::SeqCst);
            if deadline == IDLE {
                thread::park();
                continue;
            }

            let now = self.now_ns();
            if now < deadline {
                thread::park_timeout(Duration::from_nanos(deadline - now));
                continue;
            }

            // Lost the race against a re-arm: the newer deadline wins.
            if self
                .deadline
                .compare_exchange(deadline, IDLE, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                continue;
            }

            on_settle();
        }
    }
}

fn duration_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

/// Remembered stable level of the line plus the key's polarity.
#[derive(Debug)]
pub(crate) struct Debouncer {
    stable: AtomicU8,
    active: Active,
}

impl Debouncer {
    pub(crate) fn new(initial: Level, active: Active) -> Self {
        Self {
            stable: AtomicU8::new(initial.to_bit()),
            active,
        }
    }

    /// Compare `sample` with the remembered level and remember `sample`.
    pub(crate) fn on_settle(&self, sample: Level) -> Transition {
        let previous = Level::from_bit(self.stable.swap(sample.to_bit(), Ordering::SeqCst));
        classify(previous, sample, self.active)
    }

    pub(crate) fn stable_level(&self) -> Level {
        Level::from_bit(self.stable.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn classify_active_low() {
        assert_eq!(classify(Level::High, Level::Low, Active::Low), Transition::Pressed);
        assert_eq!(classify(Level::Low, Level::High, Active::Low), Transition::Released);
        assert_eq!(classify(Level::Low, Level::Low, Active::Low), Transition::NoChange);
        assert_eq!(classify(Level::High, Level::High, Active::Low), Transition::NoChange);
    }

    #[test]
    fn classify_active_high() {
        assert_eq!(classify(Level::Low, Level::High, Active::High), Transition::Pressed);
        assert_eq!(classify(Level::High, Level::Low, Active::High), Transition::Released);
    }

    #[test]
    fn settle_remembers_every_sample() {
        let debouncer = Debouncer::new(Level::High, Active::Low);
        assert_eq!(debouncer.on_settle(Level::Low), Transition::Pressed);
        assert_eq!(debouncer.stable_level(), Level::Low);
        assert_eq!(debouncer.on_settle(Level::Low), Transition::NoChange);
        assert_eq!(debouncer.on_settle(Level::High), Transition::Released);
        assert_eq!(debouncer.stable_level(), Level::High);
    }

    fn spawn_timer(delay: Duration) -> (Arc<SettleTimer>, Arc<AtomicUsize>, thread::JoinHandle<()>) {
        let timer = Arc::new(SettleTimer::new(delay));
        let fired = Arc::new(AtomicUsize::new(0));
        let handle = {
            let timer = Arc::clone(&timer);
            let fired = Arc::clone(&fired);
            thread::spawn(move || {
                timer.run(|| {
                    fired.fetch_add(1, Ordering::SeqCst);
                })
            })
        };
        (timer, fired, handle)
    }

    #[test]
    fn burst_collapses_to_one_settle() {
        let (timer, fired, handle) = spawn_timer(Duration::from_millis(40));

        for _ in 0..5 {
            timer.arm();
            thread::sleep(Duration::from_millis(5));
        }
        assert!(timer.is_pending());
        thread::sleep(Duration::from_millis(200));

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(timer.edges(), 5);
        assert!(!timer.is_pending());

        timer.stop();
        handle.join().unwrap();
    }

    #[test]
    fn rearm_pushes_the_deadline_out() {
        let (timer, fired, handle) = spawn_timer(Duration::from_millis(60));

        timer.arm();
        thread::sleep(Duration::from_millis(40));
        timer.arm();
        thread::sleep(Duration::from_millis(40));
        // 80ms after the first edge, but only 40ms after the last.
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        thread::sleep(Duration::from_millis(150));
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        timer.stop();
        handle.join().unwrap();
    }

    #[test]
    fn separate_bursts_settle_separately() {
        let (timer, fired, handle) = spawn_timer(Duration::from_millis(10));

        timer.arm();
        thread::sleep(Duration::from_millis(100));
        timer.arm();
        thread::sleep(Duration::from_millis(100));
        assert_eq!(fired.load(Ordering::SeqCst), 2);

        timer.stop();
        handle.join().unwrap();
    }

    #[test]
    fn stopped_timer_ignores_edges() {
        let (timer, fired, handle) = spawn_timer(Duration::from_millis(5));
        timer.stop();
        handle.join().unwrap();

        timer.arm();
        assert!(!timer.is_pending());
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn stop_racing_edges_leaves_nothing_pending() {
        for _ in 0..50 {
            let (timer, _fired, handle) = spawn_timer(Duration::from_millis(50));
            let done = AtomicBool::new(false);

            thread::scope(|s| {
                s.spawn(|| {
                    while !done.load(Ordering::SeqCst) {
                        timer.arm();
                    }
                });
                thread::sleep(Duration::from_millis(1));
                timer.stop();
                // Let the edge thread keep arming against the stopped timer.
                thread::sleep(Duration::from_millis(1));
                done.store(true, Ordering::SeqCst);
            });

            handle.join().unwrap();
            assert!(!timer.is_pending());
        }
    }
}
