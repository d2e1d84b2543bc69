//! Task records.

use std::any::Any;

use crate::ebtree::EntryKey;
use crate::state::TaskState;
use crate::tick::Tick;

/// Identifies a task record in the scheduler's slab. Stable for the life of
/// the task; reused once the task is freed, same as any slab-backed id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskId(pub(crate) usize);

/// What a handler tells the scheduler to do with its task after returning.
/// A handler that wants to hand control to a different task wakes that
/// task through `TaskCtx` and returns `Delete` (or `Continue`) for itself;
/// there's no separate "ran a different task" variant, since it has no
/// observable effect beyond what waking that task already produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Keep the task alive. The scheduler re-queues it: onto the run queue
    /// immediately if wake reasons piled up while it ran, otherwise onto the
    /// wait queue per its (possibly just-updated) `expire`.
    Continue,
    /// The task is done. The scheduler unlinks it from both queues (it is
    /// guaranteed to already be absent from both) and frees its slab slot.
    /// The handler must not be invoked again.
    Delete,
}

/// One schedulable unit of work.
///
/// Queue membership is intrusive in spirit even though the actual tree
/// entries live in the scheduler's two `Tree`s: `rq`/`wq` here hold the
/// `EntryKey` a task was last inserted under, letting `unlink_rq`/`unlink_wq`
/// remove the right entry without a reverse lookup.
pub struct Task {
    pub(crate) state: TaskState,
    pub(crate) pending_state: TaskState,
    /// Signed bias in `[-1024, 1024]`; 0 is neutral.
    pub nice: i16,
    pub(crate) expire: Tick,
    /// Monotonic count of handler invocations, telemetry only.
    pub calls: u64,
    pub(crate) rq: Option<EntryKey>,
    pub(crate) wq: Option<EntryKey>,
    pub(crate) process: Box<dyn FnMut(&mut TaskCtx) -> TaskOutcome>,
    pub(crate) context: Box<dyn Any>,
}

impl Task {
    pub(crate) fn new(
        process: Box<dyn FnMut(&mut TaskCtx) -> TaskOutcome>,
        context: Box<dyn Any>,
    ) -> Self {
        Self {
            state: TaskState::WOKEN_INIT,
            pending_state: TaskState::empty(),
            nice: 0,
            expire: Tick::ETERNITY,
            calls: 0,
            rq: None,
            wq: None,
            process,
            context,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.contains(TaskState::RUNNING)
    }

    pub fn is_run_queued(&self) -> bool {
        self.rq.is_some()
    }

    pub fn is_wait_queued(&self) -> bool {
        self.wq.is_some()
    }

    pub fn expire(&self) -> Tick {
        self.expire
    }

    pub fn set_expire(&mut self, expire: Tick) {
        self.expire = expire;
    }
}

/// Handle a handler receives for the duration of one invocation. Gives it
/// safe access to its own context and a way to wake itself or adjust its
/// timer without reaching back into the scheduler's queues directly.
pub struct TaskCtx<'a> {
    pub(crate) id: TaskId,
    pub(crate) state: TaskState,
    pub(crate) context: &'a mut Box<dyn Any>,
    pub(crate) expire: &'a mut Tick,
    pub(crate) self_wake: &'a mut TaskState,
}

impl TaskId {
    /// Raw slab index, for callers that need a stable integer to key their
    /// own side tables by (e.g. a `mio::Token`).
    pub fn raw(self) -> usize {
        self.0
    }
}

impl<'a> TaskCtx<'a> {
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Wake reasons delivered for *this* invocation.
    pub fn wake_reasons(&self) -> TaskState {
        self.state
    }

    pub fn context(&self) -> &dyn Any {
        self.context.as_ref()
    }

    pub fn context_mut(&mut self) -> &mut dyn Any {
        self.context.as_mut()
    }

    pub fn expire(&self) -> Tick {
        *self.expire
    }

    /// Reschedule this task's timer. Takes effect only if the handler
    /// returns `TaskOutcome::Continue` — a deleted task's expire is moot.
    pub fn set_expire(&mut self, expire: Tick) {
        *self.expire = expire;
    }

    /// Request an immediate re-wake of this same task once the current
    /// batch finishes with it. Because the task is `RUNNING` for the
    /// duration of the call, this goes through the `pending_state`
    /// carry-bit path rather than a direct tree mutation.
    pub fn wake_self(&mut self, reason: TaskState) {
        *self.self_wake |= reason;
    }
}
