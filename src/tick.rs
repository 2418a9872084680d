//! Cooperative tick scheduler.
//!
//! The host calls [`TickEngine::pulse`] as often as its loop runs. A pulse is
//! a single timestamp comparison unless the interval has elapsed, in which
//! case the [`TickHandler`] receives `pre_tick`, `tick` and `post_tick`, in
//! that order, before the gate is re-armed. Time that elapses while the engine
//! is not ticking is discarded: there is no catch-up.

use std::time::Duration;

use tracing::trace;

use crate::timer::{Clock, SystemClock, WaitTimer};

/// Receives the three notifications of a tick, always in declaration order.
pub trait TickHandler {
    /// Error type returned by the handler.
    type Error;

    /// First notification of a tick.
    fn pre_tick(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Second notification of a tick.
    fn tick(&mut self) -> Result<(), Self::Error>;

    /// Last notification of a tick.
    fn post_tick(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Interval-gated scheduler. See the [module documentation](self).
#[derive(Debug)]
pub struct TickEngine<C: Clock = SystemClock> {
    timer: WaitTimer<C>,
    is_ticking: bool,
}

impl TickEngine<SystemClock> {
    /// Create an idle engine on the system clock.
    pub fn new(interval: Duration) -> Self {
        Self::with_clock(interval, SystemClock)
    }
}

impl Default for TickEngine<SystemClock> {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl<C: Clock> TickEngine<C> {
    /// Create an idle engine on a custom clock.
    pub fn with_clock(interval: Duration, clock: C) -> Self {
        Self { timer: WaitTimer::with_clock(interval, clock), is_ticking: false }
    }

    /// Minimum time between two ticks.
    pub fn interval(&self) -> Duration {
        self.timer.wait_time()
    }

    /// Change the minimum time between two ticks.
    pub fn set_interval(&mut self, interval: Duration) {
        self.timer.set_wait_time(interval);
    }

    /// Whether pulses can fire ticks.
    pub fn is_ticking(&self) -> bool {
        self.is_ticking
    }

    /// Allow or forbid ticks.
    pub fn set_ticking(&mut self, is_ticking: bool) {
        self.is_ticking = is_ticking;
    }

    /// Force the gate open so the next pulse while ticking fires.
    pub fn stop(&mut self) {
        self.timer.stop();
    }

    /// Give the engine a chance to tick.
    ///
    /// Returns `Ok(true)` if a tick fired. The gate is re-armed after every
    /// fired tick, including one whose handler failed; the first handler
    /// error is returned and the remaining notifications of that tick are
    /// skipped.
    pub fn pulse<H: TickHandler>(&mut self, handler: &mut H) -> Result<bool, H::Error> {
        if !self.is_ticking {
            return Ok(false);
        }

        if !self.timer.update() {
            return Ok(false);
        }

        trace!("Tick");
        let result = handler
            .pre_tick()
            .and_then(|_| handler.tick())
            .and_then(|_| handler.post_tick());

        self.timer.reset();

        result.map(|_| true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::ManualClock;

    const INTERVAL: Duration = Duration::from_millis(16);

    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
        fail_tick: bool,
    }

    impl TickHandler for Recorder {
        type Error = &'static str;

        fn pre_tick(&mut self) -> Result<(), Self::Error> {
            self.calls.push("pre");
            Ok(())
        }

        fn tick(&mut self) -> Result<(), Self::Error> {
            self.calls.push("tick");
            if self.fail_tick {
                Err("tick failed")
            } else {
                Ok(())
            }
        }

        fn post_tick(&mut self) -> Result<(), Self::Error> {
            self.calls.push("post");
            Ok(())
        }
    }

    #[test]
    fn test_fires_in_order() {
        let mut engine = TickEngine::with_clock(INTERVAL, ManualClock::new());
        let mut recorder = Recorder::default();
        engine.set_ticking(true);

        assert_eq!(engine.pulse(&mut recorder), Ok(true));
        assert_eq!(recorder.calls, ["pre", "tick", "post"]);
    }

    #[test]
    fn test_not_ticking_never_fires() {
        let clock = ManualClock::new();
        let mut engine = TickEngine::with_clock(INTERVAL, clock.clone());
        let mut recorder = Recorder::default();

        for _ in 0..100 {
            clock.advance(INTERVAL);
            assert_eq!(engine.pulse(&mut recorder), Ok(false));
        }
        assert!(recorder.calls.is_empty());
    }

    #[test]
    fn test_rate_is_capped() {
        let clock = ManualClock::new();
        let mut engine = TickEngine::with_clock(INTERVAL, clock.clone());
        let mut recorder = Recorder::default();
        engine.set_ticking(true);

        // 1ms per pulse over 160ms: the first pulse fires on the stopped gate,
        // then one tick per elapsed interval.
        let mut fired = 0;
        for _ in 0..160 {
            if engine.pulse(&mut recorder).unwrap() {
                fired += 1;
            }
            clock.advance(Duration::from_millis(1));
        }
        assert_eq!(fired, 10);
        assert_eq!(recorder.calls.len(), 30);
        for triple in recorder.calls.chunks(3) {
            assert_eq!(triple, ["pre", "tick", "post"]);
        }
    }

    #[test]
    fn test_no_backlog_after_reenable() {
        let clock = ManualClock::new();
        let mut engine = TickEngine::with_clock(INTERVAL, clock.clone());
        let mut recorder = Recorder::default();
        engine.set_ticking(true);
        assert_eq!(engine.pulse(&mut recorder), Ok(true));

        engine.set_ticking(false);
        clock.advance(INTERVAL * 50);
        assert_eq!(engine.pulse(&mut recorder), Ok(false));

        engine.set_ticking(true);
        assert_eq!(engine.pulse(&mut recorder), Ok(true));
        assert_eq!(engine.pulse(&mut recorder), Ok(false));
        assert_eq!(recorder.calls.len(), 6);
    }

    #[test]
    fn test_handler_error_rearms_gate() {
        let mut engine = TickEngine::with_clock(INTERVAL, ManualClock::new());
        let mut recorder = Recorder { fail_tick: true, ..Default::default() };
        engine.set_ticking(true);

        assert_eq!(engine.pulse(&mut recorder), Err("tick failed"));
        assert_eq!(recorder.calls, ["pre", "tick"]);
        assert_eq!(engine.pulse(&mut recorder), Ok(false));
    }
}
