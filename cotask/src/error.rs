//! Scheduler error type.
//!
//! The core scheduler is total on well-formed inputs: misuse like waking an
//! already-running task or double-unlinking is handled transparently, not
//! reported as an error. The two variants below cover the only real failure
//! modes worth naming.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    /// `new_task` could not allocate a record from the pool. Only possible
    /// when a caller has explicitly capped the pool via
    /// `SchedulerConfig::max_tasks` — an unbounded `slab::Slab` otherwise
    /// grows to fit.
    #[error("task pool exhausted (capacity {capacity})")]
    PoolExhausted { capacity: usize },

    /// Debug-only: `queue()` was called on a task whose `expire` is in the
    /// past relative to the scheduler's last observed `now`. Release builds
    /// treat this as "fire on next sweep"; in debug builds it is surfaced
    /// so misbehaving callers notice during testing.
    #[error("queuing task in the past or too far")]
    QueueingPastDeadline,
}
