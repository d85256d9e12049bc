//! Single-threaded serial event loop implementing [`Scheduler`].
//!
//! Time is owned by the loop. Tests drive it with [`EventLoop::advance`]
//! (virtual time, no sleeping); the CLI drives it with [`EventLoop::run`],
//! which sleeps until the next deadline and keeps virtual time in step with
//! the wall clock.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::scheduler::{Scheduler, TimerCallback, TimerHandle};

/// Repeating timers shorter than this are stretched to it.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Upper bound on one sleep in [`EventLoop::run`], so a cleared running flag is noticed.
const MAX_SLEEP: Duration = Duration::from_millis(50);

struct Timer {
    deadline: Duration,
    interval: Option<Duration>,
    /// `None` while the callback is executing.
    callback: Option<TimerCallback>,
}

#[derive(Default)]
struct LoopState {
    now: Duration,
    next_id: u64,
    timers: BTreeMap<u64, Timer>,
}

impl LoopState {
    fn insert(
        &mut self,
        deadline: Duration,
        interval: Option<Duration>,
        callback: TimerCallback,
    ) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.timers.insert(
            id,
            Timer {
                deadline,
                interval,
                callback: Some(callback),
            },
        );
        TimerHandle(id)
    }

    /// Earliest due timer at or before `until`; ties go to the oldest registration.
    fn next_due(&self, until: Duration) -> Option<u64> {
        self.timers
            .iter()
            .filter(|(_, t)| t.callback.is_some() && t.deadline <= until)
            .min_by_key(|(id, t)| (t.deadline, **id))
            .map(|(id, _)| *id)
    }

    fn next_deadline(&self) -> Option<Duration> {
        self.timers
            .values()
            .filter(|t| t.callback.is_some())
            .map(|t| t.deadline)
            .min()
    }
}

/// Serial timer loop. Not `Send`: create and drive it on one thread.
#[derive(Default)]
pub struct EventLoop {
    state: RefCell<LoopState>,
}

impl EventLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered timers (repeating and one-shot).
    pub fn pending_timers(&self) -> usize {
        self.state.borrow().timers.len()
    }

    /// Deadline of the earliest pending timer.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.state.borrow().next_deadline()
    }

    /// Move virtual time forward by `by`, firing every timer that falls due.
    ///
    /// Timers fire in deadline order; a repeating timer that is due several
    /// times within the window fires once per period. Returns the number of
    /// callbacks run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now() + by;
        self.advance_to(target)
    }

    /// Fire everything due up to and including `target`, then set `now = target`.
    pub fn advance_to(&self, target: Duration) -> usize {
        let mut fired = 0;
        loop {
            let taken = {
                let mut state = self.state.borrow_mut();
                match state.next_due(target) {
                    Some(id) => {
                        let timer = state
                            .timers
                            .get_mut(&id)
                            .map(|t| (t.deadline, t.callback.take()));
                        match timer {
                            Some((deadline, Some(callback))) => {
                                state.now = deadline;
                                Some((id, callback))
                            }
                            _ => None,
                        }
                    }
                    None => None,
                }
            };
            let Some((id, mut callback)) = taken else {
                break;
            };

            callback();
            fired += 1;

            // Put the callback back unless it was cancelled while running.
            let mut state = self.state.borrow_mut();
            let finished = match state.timers.get_mut(&id) {
                Some(timer) => match timer.interval {
                    Some(interval) => {
                        timer.deadline += interval;
                        timer.callback = Some(callback);
                        false
                    }
                    None => true,
                },
                None => false,
            };
            if finished {
                state.timers.remove(&id);
            }
        }
        let mut state = self.state.borrow_mut();
        if state.now < target {
            state.now = target;
        }
        fired
    }

    /// Run in real time until `running` is cleared or `limit` of loop time elapses.
    ///
    /// Returns the number of callbacks run.
    pub fn run(&self, running: &AtomicBool, limit: Option<Duration>) -> usize {
        let origin = Instant::now();
        let base = self.now();
        let end = limit.map(|l| base + l);
        let mut fired = 0;

        while running.load(Ordering::SeqCst) {
            let now = base + origin.elapsed();
            let mut wake = now + MAX_SLEEP;
            if let Some(deadline) = self.next_deadline() {
                wake = wake.min(deadline);
            }
            if let Some(end) = end {
                wake = wake.min(end);
            }
            if wake > now {
                std::thread::sleep(wake - now);
            }

            let mut now = base + origin.elapsed();
            if let Some(end) = end {
                now = now.min(end);
            }
            fired += self.advance_to(now);

            if end.is_some_and(|end| now >= end) {
                break;
            }
        }
        fired
    }
}

impl Scheduler for EventLoop {
    fn schedule_repeating(&self, interval: Duration, callback: TimerCallback) -> TimerHandle {
        let interval = interval.max(MIN_INTERVAL);
        let mut state = self.state.borrow_mut();
        let deadline = state.now + interval;
        state.insert(deadline, Some(interval), callback)
    }

    fn schedule_once(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let mut state = self.state.borrow_mut();
        let deadline = state.now + delay;
        state.insert(deadline, None, callback)
    }

    fn cancel(&self, handle: TimerHandle) {
        self.state.borrow_mut().timers.remove(&handle.0);
    }

    fn now(&self) -> Duration {
        self.state.borrow().now
    }
}
