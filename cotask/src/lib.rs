//! Cooperative task scheduler for event-driven network services.
//!
//! A [`Scheduler`] owns a run queue of tasks eligible to execute now and a
//! wait queue of tasks pending a future wakeup, and drives them through a
//! batched execution loop: [`Scheduler::wake_expired_tasks`] promotes
//! expired timers into the run queue and reports the next deadline, and
//! [`Scheduler::process_runnable_tasks`] drains a bounded prefix of the run
//! queue, invoking each task's handler.
//!
//! The scheduler does not perform I/O itself. A caller drives it from an
//! event loop that also polls some source of readiness (see the
//! `proxy-echo` demo for a `mio`-backed example):
//!
//! ```ignore
//! loop {
//!     let deadline = scheduler.wake_expired_tasks();
//!     poller.poll_until(deadline);
//!     scheduler.process_runnable_tasks();
//! }
//! ```

mod config;
mod ebtree;
mod error;
mod reactor;
mod runqueue;
mod scheduler;
mod state;
mod task;
mod tick;
mod waitqueue;

pub use config::SchedulerConfig;
pub use error::SchedulerError;
pub use reactor::Reactor;
pub use scheduler::Scheduler;
pub use state::TaskState;
pub use task::{Task, TaskCtx, TaskId, TaskOutcome};
pub use tick::{Clock, ManualClock, SystemClock, Tick};

pub mod prelude {
    pub use crate::{
        Clock, ManualClock, Reactor, Scheduler, SchedulerConfig, SchedulerError, SystemClock, Task,
        TaskCtx, TaskId, TaskOutcome, TaskState, Tick,
    };
}
