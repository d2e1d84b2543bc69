//! Trait boundary for the I/O polling loop the scheduler is driven from.
//! Polling sockets and turning readiness into wakeups is deliberately kept
//! outside the scheduler core; this trait is the seam between the two.
//!
//! The scheduler never polls a socket; it only ever asks "what's the next
//! deadline" ([`crate::Scheduler::wake_expired_tasks`]) and "run what's
//! ready" ([`crate::Scheduler::process_runnable_tasks`]). Something outside
//! the crate has to turn actual I/O readiness into calls to
//! [`crate::Scheduler::wakeup`]. This trait names that boundary; the
//! `proxy-echo` demo binary provides a `mio`-backed implementation.

use crate::tick::Tick;
use crate::{TaskId, TaskState};

/// A source of readiness events that the caller's event loop polls each
/// cycle, in between `wake_expired_tasks` and `process_runnable_tasks`.
pub trait Reactor {
    /// Block until either a readiness event arrives or `deadline` passes,
    /// whichever is first, then return the tasks that should be woken and
    /// why. An empty vector means the wait ended because of `deadline`, not
    /// because of readiness.
    fn poll_until(&mut self, deadline: Tick) -> Vec<(TaskId, TaskState)>;
}
