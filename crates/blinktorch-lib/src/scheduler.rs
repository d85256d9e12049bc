//! Timer capability used by blink controllers and leases.
//!
//! Controllers never assume an ambient timer: they receive a [`Scheduler`]
//! and register callbacks on it. All callbacks of one scheduler run serially
//! on the same loop, so they never overlap.

use std::time::Duration;

/// Callback invoked when a timer fires.
pub type TimerCallback = Box<dyn FnMut()>;

/// Identifies a registered timer for later cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub(crate) u64);

pub trait Scheduler {
    /// Fire `callback` every `interval`, first at `now + interval`.
    fn schedule_repeating(&self, interval: Duration, callback: TimerCallback) -> TimerHandle;

    /// Fire `callback` once at `now + delay`.
    fn schedule_once(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;

    /// Cancel a timer. Unknown or already-cancelled handles are ignored.
    ///
    /// Once this returns the callback will not run again, including when
    /// called from inside a callback of the same scheduler.
    fn cancel(&self, handle: TimerHandle);

    /// Current loop time, measured from the scheduler's origin.
    fn now(&self) -> Duration;
}
