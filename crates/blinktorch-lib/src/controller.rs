//! Blink controller: drives one output with a repeating toggle.
//!
//! The controller owns its output's toggle state. It registers a single
//! repeating timer on the injected [`Scheduler`]; every tick flips the state
//! and applies it. Any output error stops the controller (fail-stop, no
//! retries) and forces the output off.
//!
//! Timer and lease callbacks only hold a weak reference, so dropping the
//! controller is enough to stop it.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::error::{BlinkError, Result};
use crate::lease::{ExecutionLease, LeaseId};
use crate::output::BlinkOutput;
use crate::scheduler::{Scheduler, TimerHandle};

/// Why a controller last stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `stop()` or a restart.
    Requested,
    /// The output reported a hardware configuration failure.
    HardwareFailure,
    /// The background-execution lease was revoked or expired.
    LeaseRevoked,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Requested => write!(f, "requested"),
            StopReason::HardwareFailure => write!(f, "hardware failure"),
            StopReason::LeaseRevoked => write!(f, "lease revoked"),
        }
    }
}

struct State<O> {
    output: O,
    half_period: Option<Duration>,
    running: bool,
    on: bool,
    timer: Option<TimerHandle>,
    lease: Option<LeaseId>,
    toggles: u64,
    last_stop: Option<StopReason>,
}

struct Shared<O> {
    scheduler: Rc<dyn Scheduler>,
    lease: Option<Rc<dyn ExecutionLease>>,
    state: RefCell<State<O>>,
}

impl<O: BlinkOutput + 'static> Shared<O> {
    fn start(self: &Rc<Self>, half_period: Duration) -> Result<()> {
        if half_period.is_zero() {
            return Err(BlinkError::InvalidInterval(half_period));
        }
        if self.state.borrow().running {
            self.stop(StopReason::Requested);
        }

        let (name, wants_lease) = {
            let mut st = self.state.borrow_mut();
            st.on = false;
            st.half_period = Some(half_period);
            st.running = true;
            st.last_stop = None;
            (st.output.name(), st.output.wants_lease())
        };

        if wants_lease && let Some(lease) = &self.lease {
            let weak = Rc::downgrade(self);
            let acquired = lease.acquire(Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.stop(StopReason::LeaseRevoked);
                }
            }));
            match acquired {
                Ok(id) => self.state.borrow_mut().lease = Some(id),
                Err(e) => log::warn!("[{name}] {e}; blinking only while in the foreground"),
            }
        }

        let weak = Rc::downgrade(self);
        let timer = self.scheduler.schedule_repeating(
            half_period,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.tick();
                }
            }),
        );
        self.state.borrow_mut().timer = Some(timer);
        log::info!("[{name}] blinking every {half_period:?}");
        Ok(())
    }

    fn tick(&self) {
        let (name, result) = {
            let mut st = self.state.borrow_mut();
            if !st.running {
                return;
            }
            st.on = !st.on;
            st.toggles += 1;
            let on = st.on;
            log::debug!("[{}] tick -> {}", st.output.name(), if on { "on" } else { "off" });
            (st.output.name(), st.output.apply(on))
        };
        if let Err(e) = result {
            log::warn!("[{name}] {e}; stopping");
            self.stop(StopReason::HardwareFailure);
        }
    }

    fn stop(&self, reason: StopReason) {
        let (name, was_running, timer, lease) = {
            let mut st = self.state.borrow_mut();
            let was_running = st.running;
            st.running = false;
            st.on = false;
            if was_running {
                st.last_stop = Some(reason);
            }
            (st.output.name(), was_running, st.timer.take(), st.lease.take())
        };

        if let Some(timer) = timer {
            self.scheduler.cancel(timer);
        }

        let off = self.state.borrow_mut().output.apply(false);
        if let Err(e) = off {
            log::warn!("[{name}] could not switch off: {e}");
        }

        if let (Some(id), Some(lease)) = (lease, &self.lease) {
            lease.release(id);
        }

        if was_running {
            log::info!("[{name}] stopped ({reason})");
        }
    }
}

/// Periodic on/off driver for a single output.
///
/// At most one timer is live per controller: every `start` begins with a
/// full stop, so restarts never overlap and the output is never left on.
pub struct BlinkController<O: BlinkOutput + 'static> {
    shared: Rc<Shared<O>>,
}

impl<O: BlinkOutput + 'static> BlinkController<O> {
    pub fn new(output: O, scheduler: Rc<dyn Scheduler>) -> Self {
        Self::build(output, scheduler, None)
    }

    /// Controller that holds `lease` while blinking, if the output asks for one.
    pub fn with_lease(
        output: O,
        scheduler: Rc<dyn Scheduler>,
        lease: Rc<dyn ExecutionLease>,
    ) -> Self {
        Self::build(output, scheduler, Some(lease))
    }

    fn build(
        output: O,
        scheduler: Rc<dyn Scheduler>,
        lease: Option<Rc<dyn ExecutionLease>>,
    ) -> Self {
        Self {
            shared: Rc::new(Shared {
                scheduler,
                lease,
                state: RefCell::new(State {
                    output,
                    half_period: None,
                    running: false,
                    on: false,
                    timer: None,
                    lease: None,
                    toggles: 0,
                    last_stop: None,
                }),
            }),
        }
    }

    /// Start toggling every `half_period`, restarting if already running.
    ///
    /// The toggle state is off until the first tick, one `half_period` from now.
    pub fn start(&self, half_period: Duration) -> Result<()> {
        self.shared.start(half_period)
    }

    /// Stop toggling and switch the output off. Safe to call repeatedly.
    pub fn stop(&self) {
        self.shared.stop(StopReason::Requested);
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.borrow().running
    }

    /// Current toggle state.
    pub fn is_on(&self) -> bool {
        self.shared.state.borrow().on
    }

    /// Interval of the current (or last) run.
    pub fn half_period(&self) -> Option<Duration> {
        self.shared.state.borrow().half_period
    }

    /// Total ticks since the controller was created.
    pub fn toggle_count(&self) -> u64 {
        self.shared.state.borrow().toggles
    }

    /// `None` while running or if never stopped since the last start.
    pub fn last_stop_reason(&self) -> Option<StopReason> {
        self.shared.state.borrow().last_stop
    }

    pub fn output(&self) -> Ref<'_, O> {
        Ref::map(self.shared.state.borrow(), |st| &st.output)
    }
}

impl<O: BlinkOutput + 'static> Drop for BlinkController<O> {
    fn drop(&mut self) {
        self.shared.stop(StopReason::Requested);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_loop::EventLoop;
    use crate::lease::BudgetLease;
    use crate::lease::mock::MockLease;
    use crate::output::OutputError;
    use crate::screen::ScreenOutput;
    use crate::torch::TorchOutput;
    use crate::torch::mock::MockLight;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// Records every applied state.
    struct Recorder {
        applied: Rc<RefCell<Vec<bool>>>,
    }

    impl BlinkOutput for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn apply(&mut self, on: bool) -> std::result::Result<(), OutputError> {
            self.applied.borrow_mut().push(on);
            Ok(())
        }
    }

    fn recorder(lp: &Rc<EventLoop>) -> (BlinkController<Recorder>, Rc<RefCell<Vec<bool>>>) {
        let applied = Rc::new(RefCell::new(Vec::new()));
        let ctl = BlinkController::new(
            Recorder {
                applied: applied.clone(),
            },
            lp.clone(),
        );
        (ctl, applied)
    }

    fn torch(
        lp: &Rc<EventLoop>,
        lease: Rc<MockLease>,
    ) -> (BlinkController<TorchOutput<MockLight>>, MockLight) {
        let light = MockLight::new();
        let ctl = BlinkController::with_lease(TorchOutput::new(light.clone()), lp.clone(), lease);
        (ctl, light)
    }

    #[test]
    fn off_before_first_tick() {
        let lp = Rc::new(EventLoop::new());
        let (ctl, applied) = recorder(&lp);
        ctl.start(ms(500)).unwrap();
        assert!(ctl.is_running());
        assert!(!ctl.is_on());
        lp.advance(ms(499));
        assert!(!ctl.is_on());
        assert!(applied.borrow().is_empty());
        lp.advance(ms(1));
        assert!(ctl.is_on());
    }

    #[test]
    fn toggles_strictly_alternate() {
        let lp = Rc::new(EventLoop::new());
        let (ctl, applied) = recorder(&lp);
        ctl.start(ms(100)).unwrap();
        lp.advance(ms(600));
        assert_eq!(
            *applied.borrow(),
            vec![true, false, true, false, true, false]
        );
        assert_eq!(ctl.toggle_count(), 6);
    }

    #[test]
    fn start_then_stop_leaves_output_off() {
        for elapsed in [0, 50, 100, 150, 1000] {
            let lp = Rc::new(EventLoop::new());
            let (ctl, applied) = recorder(&lp);
            ctl.start(ms(100)).unwrap();
            lp.advance(ms(elapsed));
            ctl.stop();
            assert!(!ctl.is_running());
            assert!(!ctl.is_on());
            assert_eq!(applied.borrow().last(), Some(&false), "elapsed {elapsed}");
            assert_eq!(lp.pending_timers(), 0);
        }
    }

    #[test]
    fn no_tick_after_stop() {
        let lp = Rc::new(EventLoop::new());
        let (ctl, applied) = recorder(&lp);
        ctl.start(ms(100)).unwrap();
        lp.advance(ms(100));
        ctl.stop();
        let len = applied.borrow().len();
        lp.advance(ms(1000));
        assert_eq!(applied.borrow().len(), len);
    }

    #[test]
    fn stop_is_idempotent() {
        let lp = Rc::new(EventLoop::new());
        let (ctl, applied) = recorder(&lp);
        ctl.stop();
        ctl.start(ms(100)).unwrap();
        ctl.stop();
        ctl.stop();
        assert!(!ctl.is_running());
        assert!(applied.borrow().iter().all(|on| !on));
        assert_eq!(ctl.last_stop_reason(), Some(StopReason::Requested));
    }

    #[test]
    fn double_start_keeps_one_timer() {
        let lp = Rc::new(EventLoop::new());
        let (ctl, applied) = recorder(&lp);
        ctl.start(ms(500)).unwrap();
        ctl.start(ms(100)).unwrap();
        assert_eq!(lp.pending_timers(), 1);

        applied.borrow_mut().clear();
        lp.advance(ms(1000));
        // 10 toggles at 100ms, none from the 500ms timer
        assert_eq!(applied.borrow().len(), 10);
        assert_eq!(ctl.half_period(), Some(ms(100)));
    }

    #[test]
    fn restart_discards_old_interval() {
        let lp = Rc::new(EventLoop::new());
        let (ctl, applied) = recorder(&lp);
        ctl.start(ms(500)).unwrap();
        lp.advance(ms(1000));
        assert_eq!(applied.borrow().len(), 2);

        ctl.start(ms(200)).unwrap();
        applied.borrow_mut().clear();

        lp.advance(ms(199));
        assert!(applied.borrow().is_empty());
        lp.advance(ms(1));
        assert_eq!(*applied.borrow(), vec![true]);
        // The old 500ms deadline at t=1500 must not produce an extra toggle
        lp.advance(ms(300));
        assert_eq!(*applied.borrow(), vec![true, false]);
    }

    #[test]
    fn rapid_start_stop_does_not_leak_timers() {
        let lp = Rc::new(EventLoop::new());
        let (ctl, applied) = recorder(&lp);
        for _ in 0..20 {
            ctl.start(ms(100)).unwrap();
            ctl.stop();
            ctl.start(ms(100)).unwrap();
        }
        assert_eq!(lp.pending_timers(), 1);
        ctl.stop();
        assert_eq!(lp.pending_timers(), 0);
        assert_eq!(applied.borrow().last(), Some(&false));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let lp = Rc::new(EventLoop::new());
        let (ctl, _) = recorder(&lp);
        let err = ctl.start(Duration::ZERO).unwrap_err();
        assert!(matches!(err, BlinkError::InvalidInterval(_)));
        assert!(!ctl.is_running());
        assert_eq!(lp.pending_timers(), 0);
    }

    #[test]
    fn drop_cancels_timer() {
        let lp = Rc::new(EventLoop::new());
        let (ctl, applied) = recorder(&lp);
        ctl.start(ms(100)).unwrap();
        drop(ctl);
        assert_eq!(lp.pending_timers(), 0);
        assert_eq!(applied.borrow().last(), Some(&false));
    }

    // ── torch ──

    #[test]
    fn torch_turn_on_failure_stops_within_the_tick() {
        let lp = Rc::new(EventLoop::new());
        let lease = Rc::new(MockLease::new());
        let (ctl, light) = torch(&lp, lease.clone());
        light.state.borrow_mut().fail_turn_on = true;

        ctl.start(ms(100)).unwrap();
        lp.advance(ms(100));

        assert!(!ctl.is_running());
        assert!(!ctl.is_on());
        assert!(!light.is_lit());
        assert_eq!(light.applied_states(), vec![false]);
        assert_eq!(ctl.last_stop_reason(), Some(StopReason::HardwareFailure));
        assert_eq!(lp.pending_timers(), 0);
        assert_eq!(lease.held_count(), 0);
    }

    #[test]
    fn torch_lock_failure_stops() {
        let lp = Rc::new(EventLoop::new());
        let (ctl, light) = torch(&lp, Rc::new(MockLease::new()));
        ctl.start(ms(100)).unwrap();
        lp.advance(ms(200));
        assert!(ctl.is_running());

        light.state.borrow_mut().fail_lock = true;
        lp.advance(ms(100));
        assert!(!ctl.is_running());
        assert_eq!(ctl.last_stop_reason(), Some(StopReason::HardwareFailure));

        // No retries afterwards
        let locks = light.state.borrow().lock_count;
        lp.advance(ms(1000));
        assert_eq!(light.state.borrow().lock_count, locks);
    }

    #[test]
    fn torch_failure_to_switch_off_is_only_logged() {
        let lp = Rc::new(EventLoop::new());
        let (ctl, light) = torch(&lp, Rc::new(MockLease::new()));
        ctl.start(ms(100)).unwrap();
        lp.advance(ms(100));
        light.state.borrow_mut().fail_turn_off = true;
        ctl.stop();
        assert!(!ctl.is_running());
        assert_eq!(lp.pending_timers(), 0);
    }

    #[test]
    fn torch_holds_lease_while_running() {
        let lp = Rc::new(EventLoop::new());
        let lease = Rc::new(MockLease::new());
        let (ctl, _) = torch(&lp, lease.clone());

        ctl.start(ms(100)).unwrap();
        assert_eq!(lease.held_count(), 1);
        ctl.start(ms(200)).unwrap();
        assert_eq!(lease.held_count(), 1);
        assert_eq!(lease.acquired.get(), 2);
        ctl.stop();
        assert_eq!(lease.held_count(), 0);
        assert_eq!(lease.released.get(), 2);
    }

    #[test]
    fn lease_revocation_stops_torch() {
        let lp = Rc::new(EventLoop::new());
        let lease = Rc::new(MockLease::new());
        let (ctl, light) = torch(&lp, lease.clone());
        ctl.start(ms(100)).unwrap();
        lp.advance(ms(100));
        assert!(light.is_lit());

        lease.revoke_all();
        assert!(!ctl.is_running());
        assert!(!light.is_lit());
        assert_eq!(ctl.last_stop_reason(), Some(StopReason::LeaseRevoked));
        assert_eq!(lp.pending_timers(), 0);
    }

    #[test]
    fn denied_lease_still_blinks() {
        let lp = Rc::new(EventLoop::new());
        let lease = Rc::new(MockLease::new());
        lease.deny.set(true);
        let (ctl, light) = torch(&lp, lease);
        ctl.start(ms(100)).unwrap();
        lp.advance(ms(100));
        assert!(ctl.is_running());
        assert!(light.is_lit());
    }

    #[test]
    fn budget_lease_expiry_stops_torch() {
        let lp = Rc::new(EventLoop::new());
        let lease = Rc::new(BudgetLease::new(lp.clone(), ms(1000)));
        let light = MockLight::new();
        let ctl =
            BlinkController::with_lease(TorchOutput::new(light.clone()), lp.clone(), lease.clone());

        ctl.start(ms(100)).unwrap();
        lp.advance(ms(999));
        assert!(ctl.is_running());
        lp.advance(ms(1));
        assert!(!ctl.is_running());
        assert!(!light.is_lit());
        assert_eq!(ctl.last_stop_reason(), Some(StopReason::LeaseRevoked));
        assert_eq!(lease.active_count(), 0);
        assert_eq!(lp.pending_timers(), 0);
    }

    #[test]
    fn absent_torch_runs_inertly() {
        let lp = Rc::new(EventLoop::new());
        let light = MockLight::absent();
        let ctl = BlinkController::new(TorchOutput::new(light.clone()), lp.clone());
        ctl.start(ms(100)).unwrap();
        lp.advance(ms(1000));
        assert!(ctl.is_running());
        assert_eq!(ctl.toggle_count(), 10);
        assert!(light.state.borrow().applied.is_empty());
    }

    #[test]
    fn screen_does_not_take_lease() {
        let lp = Rc::new(EventLoop::new());
        let lease = Rc::new(MockLease::new());
        let ctl = BlinkController::with_lease(ScreenOutput::default(), lp.clone(), lease.clone());
        ctl.start(ms(100)).unwrap();
        assert_eq!(lease.acquired.get(), 0);
        lp.advance(ms(100));
        assert_eq!(ctl.output().color(), crate::color::Color::WHITE);
        ctl.stop();
        assert_eq!(ctl.output().color(), crate::color::Color::BLACK);
    }
}
