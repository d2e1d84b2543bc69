//! Run queue and nice bias.

use tracing::trace;

use crate::scheduler::Scheduler;
use crate::state::TaskState;
use crate::task::TaskId;
use crate::tick::Clock;

impl<C: Clock> Scheduler<C> {
    /// Ensures `task` ends up on the run queue with `reason` carried into
    /// `state`.
    pub fn wakeup(&mut self, id: TaskId, reason: TaskState) {
        let Some(task) = self.tasks.get_mut(id.0) else {
            return;
        };
        if task.is_running() || task.is_run_queued() {
            // Already running, or already waiting its turn: the reason is
            // recorded for the *next* wakeup rather than acted on now.
            task.pending_state.insert(reason);
            return;
        }
        self.wakeup_core(id, reason);
    }

    /// The part of `wakeup` that actually links the task into the run
    /// queue. Callable only once the caller has established the task is
    /// neither `RUNNING` nor already run-queue-linked.
    pub(crate) fn wakeup_core(&mut self, id: TaskId, reason: TaskState) {
        self.tasks_run_queue += 1;
        self.rqueue_ticks = self.rqueue_ticks.wrapping_add(1);
        let mut key = self.rqueue_ticks;

        let Some(task) = self.tasks.get_mut(id.0) else {
            // Task vanished between the membership check and here — can't
            // happen through the public API (we hold `&mut self` the whole
            // time), but guards against a future refactor reordering this.
            self.tasks_run_queue -= 1;
            self.rqueue_ticks = self.rqueue_ticks.wrapping_sub(1);
            return;
        };

        if task.nice != 0 {
            // `offset` shifts the key by roughly `nice / 32` run-queue
            // lengths, pushing a positive-nice task later in the queue.
            let offset = (self.tasks_run_queue as i64 * task.nice as i64) / 32;
            key = key.wrapping_add(offset as i32 as u32);
            self.niced_tasks += 1;
        }

        task.state = task.pending_state;
        task.pending_state = TaskState::empty();
        task.state.insert(reason);

        let entry = self.run_queue.insert(key, id);
        task.rq = Some(entry);
        trace!(task = id.0, key, ?reason, "wakeup");
    }

    /// Removes `task` from the run queue, if present. Idempotent.
    pub fn unlink_rq(&mut self, id: TaskId) {
        let Some(task) = self.tasks.get_mut(id.0) else {
            return;
        };
        if let Some(entry) = task.rq.take() {
            let nice = task.nice;
            self.run_queue.remove(entry);
            self.tasks_run_queue -= 1;
            if nice != 0 {
                self.niced_tasks -= 1;
            }
        }
    }
}
