//! Background-execution leases.
//!
//! Hosts that suspend apps when they leave the foreground grant a bounded
//! "keep running" permission instead. The torch controller holds one lease
//! from `start()` until `stop()`; if the host revokes it early, the
//! controller's revocation callback stops blinking.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::scheduler::{Scheduler, TimerHandle};

/// Invoked at most once, when a lease ends before it is released.
pub type RevokeCallback = Box<dyn FnOnce()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LeaseId(u64);

#[derive(Debug, Clone, PartialEq)]
pub enum LeaseError {
    /// The host refused to grant background execution.
    Denied(String),
}

impl fmt::Display for LeaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeaseError::Denied(e) => write!(f, "Background execution denied: {e}"),
        }
    }
}

impl std::error::Error for LeaseError {}

pub trait ExecutionLease {
    fn acquire(&self, on_revoked: RevokeCallback) -> Result<LeaseId, LeaseError>;

    /// End a lease. Unknown, released or already-revoked ids are ignored.
    fn release(&self, id: LeaseId);
}

/// Lease that is never revoked, for processes that always stay in the foreground.
#[derive(Debug, Default)]
pub struct UnboundedLease {
    next_id: Cell<u64>,
}

impl UnboundedLease {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExecutionLease for UnboundedLease {
    fn acquire(&self, _on_revoked: RevokeCallback) -> Result<LeaseId, LeaseError> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        Ok(LeaseId(id))
    }

    fn release(&self, _id: LeaseId) {}
}

/// Lease that expires after a fixed budget of loop time.
///
/// Mirrors hosts that grant a limited window of background work: the
/// revocation callback fires from the scheduler once `budget` has elapsed
/// without a release.
pub struct BudgetLease {
    scheduler: Rc<dyn Scheduler>,
    budget: Duration,
    next_id: Cell<u64>,
    active: Rc<RefCell<HashMap<LeaseId, TimerHandle>>>,
}

impl BudgetLease {
    pub fn new(scheduler: Rc<dyn Scheduler>, budget: Duration) -> Self {
        Self {
            scheduler,
            budget,
            next_id: Cell::new(0),
            active: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    /// Number of leases currently held.
    pub fn active_count(&self) -> usize {
        self.active.borrow().len()
    }
}

impl ExecutionLease for BudgetLease {
    fn acquire(&self, on_revoked: RevokeCallback) -> Result<LeaseId, LeaseError> {
        let id = LeaseId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let active = Rc::downgrade(&self.active);
        let mut on_revoked = Some(on_revoked);
        let timer = self.scheduler.schedule_once(
            self.budget,
            Box::new(move || {
                let Some(active) = active.upgrade() else {
                    return;
                };
                // Drop the borrow before running the callback; it releases the lease.
                let held = active.borrow_mut().remove(&id).is_some();
                if held && let Some(cb) = on_revoked.take() {
                    log::warn!("background execution budget expired");
                    cb();
                }
            }),
        );
        self.active.borrow_mut().insert(id, timer);
        Ok(id)
    }

    fn release(&self, id: LeaseId) {
        let timer = self.active.borrow_mut().remove(&id);
        if let Some(timer) = timer {
            self.scheduler.cancel(timer);
        }
    }
}

pub mod mock {
    use super::*;

    /// Lease whose revocation is triggered by the test.
    #[derive(Default)]
    pub struct MockLease {
        next_id: Cell<u64>,
        held: RefCell<Vec<(LeaseId, RevokeCallback)>>,
        /// If true, `acquire` fails.
        pub deny: Cell<bool>,
        /// Successful acquisitions so far.
        pub acquired: Cell<u32>,
        /// Releases of held leases so far.
        pub released: Cell<u32>,
    }

    impl MockLease {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn held_count(&self) -> usize {
            self.held.borrow().len()
        }

        /// Revoke every held lease, running their callbacks.
        pub fn revoke_all(&self) {
            let held: Vec<_> = self.held.borrow_mut().drain(..).collect();
            for (_, cb) in held {
                cb();
            }
        }
    }

    impl ExecutionLease for MockLease {
        fn acquire(&self, on_revoked: RevokeCallback) -> Result<LeaseId, LeaseError> {
            if self.deny.get() {
                return Err(LeaseError::Denied("mock denial".into()));
            }
            let id = LeaseId(self.next_id.get());
            self.next_id.set(id.0 + 1);
            self.acquired.set(self.acquired.get() + 1);
            self.held.borrow_mut().push((id, on_revoked));
            Ok(id)
        }

        fn release(&self, id: LeaseId) {
            let mut held = self.held.borrow_mut();
            let before = held.len();
            held.retain(|(held_id, _)| *held_id != id);
            if held.len() < before {
                self.released.set(self.released.get() + 1);
            }
        }
    }
}
