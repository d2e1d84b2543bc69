//! Wait queue and its expiry sweep.

use tracing::trace;

use crate::scheduler::Scheduler;
use crate::state::TaskState;
use crate::task::TaskId;
use crate::tick::{Clock, Tick};

impl<C: Clock> Scheduler<C> {
    /// Places or repositions `task` in the wait queue according to its
    /// current `expire`.
    pub fn queue(&mut self, id: TaskId) {
        let Some(task) = self.tasks.get_mut(id.0) else {
            return;
        };

        if let Some(entry) = task.wq {
            // Always unlink-then-maybe-reinsert rather than special-casing
            // "already linked under the same key": cheap against a
            // `BTreeMap`, and simpler than tracking whether a reposition is
            // actually needed.
            self.wait_queue.remove(entry);
            task.wq = None;
        }

        if !task.expire().is_set() {
            return;
        }

        if cfg!(debug_assertions) {
            let now = self.clock_now();
            if task.expire().is_expired(now) {
                // Queued in the past or too far back: fire on the next
                // sweep rather than dropping the task.
                trace!(task = id.0, "queuing in the past or too far");
            }
        }

        let entry = self.wait_queue.insert(task.expire().0, id);
        task.wq = Some(entry);
    }

    /// Removes `task` from the wait queue, if present. Idempotent.
    pub fn unlink_wq(&mut self, id: TaskId) {
        let Some(task) = self.tasks.get_mut(id.0) else {
            return;
        };
        if let Some(entry) = task.wq.take() {
            self.wait_queue.remove(entry);
        }
    }

    fn clock_now(&self) -> Tick {
        self.now()
    }

    /// Sweeps the wait queue, waking every task whose deadline has passed.
    /// Returns the earliest future deadline, or `Tick::ETERNITY` if the wait
    /// queue is empty — the value the I/O poller should sleep up to.
    pub fn wake_expired_tasks(&mut self) -> Tick {
        let now = self.clock_now();
        let look_back = self.config.look_back;

        loop {
            let Some((entry_key, id)) = self
                .wait_queue
                .lookup_ge_wrapping(now.0, look_back)
            else {
                return Tick::ETERNITY;
            };

            let deadline = Tick(entry_key.0);
            if now.is_lt(deadline) {
                return deadline;
            }

            // Detach unconditionally; we decide below whether to put it
            // straight back (stale key) or actually wake it.
            self.wait_queue.remove(entry_key);
            let Some(task) = self.tasks.get_mut(id.0) else {
                continue;
            };
            task.wq = None;

            if !task.expire().is_expired(now) {
                // The tree key is stale: `expire` was pushed further out
                // (e.g. via `TaskCtx::set_expire`) without re-calling
                // `queue`, so the wait-queue entry still carries the old
                // deadline. `expire == eternity` means don't even
                // re-insert.
                if task.expire().is_set() {
                    self.queue(id);
                }
                continue;
            }

            self.wakeup(id, TaskState::WOKEN_TIMER);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::Scheduler;
    use crate::task::TaskOutcome;
    use crate::tick::ManualClock;

    fn scheduler_with_clock(start: u32) -> Scheduler<ManualClock> {
        Scheduler::with_clock(ManualClock::new(start), crate::config::SchedulerConfig::default())
    }

    #[test]
    fn single_timer_fires_exactly_once() {
        let mut sched = scheduler_with_clock(0);
        let id = sched
            .new_task(Box::new(0u32), |_ctx| TaskOutcome::Continue)
            .unwrap();
        sched.set_task_expire(id, Tick(100));
        sched.queue(id);

        // advance to just before expiry: nothing fires
        sched.clock_mut().advance(99);
        let deadline = sched.wake_expired_tasks();
        assert_eq!(deadline, Tick(100));
        assert_eq!(sched.tasks_run_queue(), 0);

        // advance to expiry: fires
        sched.clock_mut().advance(1);
        let deadline = sched.wake_expired_tasks();
        assert_eq!(deadline, Tick::ETERNITY);
        assert_eq!(sched.tasks_run_queue(), 1);

        let invoked = sched.process_runnable_tasks();
        assert_eq!(invoked, 1);
    }

    #[test]
    fn rescheduled_timer_fires_at_new_deadline() {
        let mut sched = scheduler_with_clock(0);
        let id = sched
            .new_task(Box::new(0u32), |_ctx| TaskOutcome::Continue)
            .unwrap();
        sched.set_task_expire(id, Tick(100));
        sched.queue(id);

        // reschedule further out without re-queueing (fast path)
        sched.set_task_expire(id, Tick(500));

        sched.clock_mut().advance(100);
        let deadline = sched.wake_expired_tasks();
        assert_eq!(deadline, Tick(500));
        assert_eq!(sched.tasks_run_queue(), 0);

        sched.clock_mut().advance(400);
        let deadline = sched.wake_expired_tasks();
        assert_eq!(deadline, Tick::ETERNITY);
        assert_eq!(sched.tasks_run_queue(), 1);
    }
}
