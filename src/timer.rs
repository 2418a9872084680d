//! Resettable interval gate.
//!
//! A [`WaitTimer`] answers a single question: has at least its wait time
//! elapsed since it was last [reset](WaitTimer::reset)? It never sleeps and
//! never resets itself; callers poll it with [`WaitTimer::update`] and reset
//! it once the work the gate protects is done.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::trace;

/// Source of timestamps for [`WaitTimer`].
pub trait Clock {
    /// The current instant.
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually driven clock.
///
/// Clones share the same underlying instant, so a host (or a test) can keep a
/// clone and [`advance`](ManualClock::advance) time for every timer built on
/// it.
#[derive(Debug, Clone)]
pub struct ManualClock(Arc<Mutex<Instant>>);

impl ManualClock {
    /// Create a clock frozen at the current instant.
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(Instant::now())))
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) {
        *self.0.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.0.lock()
    }
}

/// Payload of the finished notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTimerFinished {
    /// When the timer was last reset, or `None` if it was stopped.
    pub started: Option<Instant>,
    /// When the timer was observed as finished.
    pub finished: Instant,
    /// The configured wait time.
    pub wait_time: Duration,
}

type FinishedCallback = Box<dyn FnMut(&WaitTimerFinished)>;

/// Interval gate. See the [module documentation](self).
pub struct WaitTimer<C: Clock = SystemClock> {
    wait_time: Duration,
    // `None` means stopped: permanently overdue until the next reset.
    start: Option<Instant>,
    // Set once `update` has reported the current cycle as finished.
    fired: bool,
    clock: C,
    on_finished: Option<FinishedCallback>,
}

impl WaitTimer<SystemClock> {
    /// Create a stopped timer on the system clock.
    pub fn new(wait_time: Duration) -> Self {
        Self::with_clock(wait_time, SystemClock)
    }
}

impl Default for WaitTimer<SystemClock> {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl<C: Clock> WaitTimer<C> {
    /// Create a stopped timer on a custom clock.
    ///
    /// A freshly created timer is stopped, so the first [`update`](Self::update)
    /// reports it as finished.
    pub fn with_clock(wait_time: Duration, clock: C) -> Self {
        Self { wait_time, start: None, fired: false, clock, on_finished: None }
    }

    /// The configured wait time.
    pub fn wait_time(&self) -> Duration {
        self.wait_time
    }

    /// Change the wait time. Takes effect immediately for the current cycle.
    pub fn set_wait_time(&mut self, wait_time: Duration) {
        self.wait_time = wait_time;
    }

    /// When the timer was last reset. `None` while stopped.
    pub fn start_time(&self) -> Option<Instant> {
        self.start
    }

    /// When the current cycle ends. `None` while stopped.
    pub fn end_time(&self) -> Option<Instant> {
        self.start.and_then(|start| start.checked_add(self.wait_time))
    }

    /// Whether the wait time has elapsed since the last reset.
    pub fn is_finished(&self) -> bool {
        match self.start {
            None => true,
            Some(start) => match start.checked_add(self.wait_time) {
                Some(end) => self.clock.now() >= end,
                None => false,
            },
        }
    }

    /// Time remaining in the current cycle; zero once finished.
    pub fn time_left(&self) -> Duration {
        self.end_time()
            .map(|end| end.saturating_duration_since(self.clock.now()))
            .unwrap_or(Duration::ZERO)
    }

    /// Start a new cycle now.
    pub fn reset(&mut self) {
        self.start = Some(self.clock.now());
        self.fired = false;
    }

    /// Force the timer into the overdue state until the next reset.
    pub fn stop(&mut self) {
        self.start = None;
        self.fired = false;
    }

    /// Register the finished notification, replacing any previous one.
    pub fn on_finished<F: FnMut(&WaitTimerFinished) + 'static>(&mut self, f: F) {
        self.on_finished = Some(Box::new(f));
    }

    /// Poll the gate.
    ///
    /// Returns `true` and emits the finished notification the first time the
    /// wait time is seen to have elapsed. Later calls return `false` until
    /// [`reset`](Self::reset) or [`stop`](Self::stop) starts a new cycle;
    /// [`is_finished`](Self::is_finished) keeps reporting the elapsed state.
    pub fn update(&mut self) -> bool {
        if self.fired || !self.is_finished() {
            return false;
        }
        self.fired = true;

        let event = WaitTimerFinished {
            started: self.start,
            finished: self.clock.now(),
            wait_time: self.wait_time,
        };
        trace!(wait_time = ?event.wait_time, "Wait timer finished");

        if let Some(on_finished) = self.on_finished.as_mut() {
            on_finished(&event);
        }

        true
    }
}

impl<C: Clock + fmt::Debug> fmt::Debug for WaitTimer<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitTimer")
            .field("wait_time", &self.wait_time)
            .field("start", &self.start)
            .field("fired", &self.fired)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
